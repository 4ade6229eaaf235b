//! `web`: answers grounded in live web search.

use async_stream::try_stream;
use std::sync::Arc;

use super::{
    Command, CommandContext, CommandOptions, CommandStream, PromptPlan, check_model_has_provider,
    run_prompt, save_output,
};
use crate::registry::CommandCategory;

const WEB_SYSTEM_PROMPT: &str = "You are an expert software engineering assistant. \
Search the web to answer the question with current, accurate information. \
Cite your sources and prefer official documentation.";

pub struct WebCommand {
    ctx: Arc<CommandContext>,
}

impl WebCommand {
    pub fn new(ctx: Arc<CommandContext>) -> Self {
        Self { ctx }
    }
}

impl Command for WebCommand {
    fn execute(&self, query: &str, options: CommandOptions) -> CommandStream {
        let ctx = Arc::clone(&self.ctx);
        let query = query.to_string();
        Box::pin(try_stream! {
            let section = ctx.config.web.clone();
            check_model_has_provider(&options, &section)?;

            let mut plan =
                PromptPlan::new(&ctx, CommandCategory::Web, options.provider, section, query)?
                    .with_options(&options);
            plan.web_search = true;
            plan.system_prompt = Some(WEB_SYSTEM_PROMPT.to_string());

            let outcome = run_prompt(&ctx, &plan).await?;
            for note in outcome.notes {
                yield note;
            }
            if let Some(note) = save_output(options.save_to.as_ref(), &outcome.text).await? {
                yield note;
            }
            yield outcome.text;
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::commands::testing::*;
    use crate::error::ProviderError;
    use crate::types::{ProviderKind, WebSearchSupport};

    #[tokio::test]
    async fn substitute_model_is_announced() {
        let factory = Arc::new(ScriptedFactory::default().web_search(
            ProviderKind::OpenAi,
            WebSearchSupport::substitute(
                "gpt-4o-search-preview",
                "gpt-4.1 does not support web search.",
            ),
        ));
        let ctx = context(env_with(&[ProviderKind::OpenAi]), Arc::clone(&factory));
        let options = CommandOptions {
            provider: Some(ProviderKind::OpenAi),
            model: Some("gpt-4.1".into()),
            ..Default::default()
        };
        let lines = collect(WebCommand::new(ctx).execute("latest rust?", options))
            .await
            .unwrap();
        assert_eq!(
            lines,
            vec![
                "Note: gpt-4.1 does not support web search. Using gpt-4o-search-preview instead."
                    .to_string(),
                "answer from openai".to_string(),
            ]
        );
        let calls = factory.calls();
        assert_eq!(calls[0].2.model, "gpt-4o-search-preview");
        assert!(calls[0].2.web_search);
    }

    #[tokio::test]
    async fn unsupported_without_substitute_fails() {
        let factory = Arc::new(ScriptedFactory::default().web_search(
            ProviderKind::Anthropic,
            WebSearchSupport::unsupported("claude-2 cannot search."),
        ));
        let ctx = context(env_with(&[ProviderKind::Anthropic]), factory);
        let options = CommandOptions {
            provider: Some(ProviderKind::Anthropic),
            model: Some("claude-2".into()),
            ..Default::default()
        };
        let err = collect(WebCommand::new(ctx).execute("q", options))
            .await
            .unwrap_err();
        assert!(matches!(err, ProviderError::WebSearchUnsupported { .. }));
    }

    #[tokio::test]
    async fn prefers_perplexity_when_available() {
        let factory = Arc::new(ScriptedFactory::default());
        let ctx = context(
            env_with(&[ProviderKind::Gemini, ProviderKind::Perplexity]),
            Arc::clone(&factory),
        );
        let lines = collect(WebCommand::new(ctx).execute("q", CommandOptions::default()))
            .await
            .unwrap();
        assert_eq!(lines, vec!["answer from perplexity".to_string()]);
    }

    #[tokio::test]
    async fn model_without_provider_is_rejected() {
        let ctx = context(env_with(&[ProviderKind::Gemini]), Arc::new(ScriptedFactory::default()));
        let options = CommandOptions {
            model: Some("sonar".into()),
            ..Default::default()
        };
        let err = collect(WebCommand::new(ctx).execute("q", options))
            .await
            .unwrap_err();
        assert!(matches!(err, ProviderError::InvalidParameter(_)));
    }
}
