//! `repo`: questions about the local repository, answered with the packed source as context.

use async_stream::try_stream;
use std::sync::Arc;

use super::{
    Command, CommandContext, CommandOptions, CommandStream, PromptPlan, check_model_has_provider,
    run_prompt, save_output,
};
use crate::registry::CommandCategory;

const REPO_SYSTEM_PROMPT: &str = "You are an expert software developer analyzing a repository. \
The repository contents follow, one <file> block per file. Answer the question using this \
context, referencing specific files and code where relevant.";

/// `<packed repository>` + query
pub(crate) fn repo_prompt(packed: &str, query: &str) -> String {
    format!("{packed}\nQuery: {query}")
}

pub struct RepoCommand {
    ctx: Arc<CommandContext>,
}

impl RepoCommand {
    pub fn new(ctx: Arc<CommandContext>) -> Self {
        Self { ctx }
    }
}

impl Command for RepoCommand {
    fn execute(&self, query: &str, options: CommandOptions) -> CommandStream {
        let ctx = Arc::clone(&self.ctx);
        let query = query.to_string();
        Box::pin(try_stream! {
            let section = ctx.config.repo.clone();
            check_model_has_provider(&options, &section)?;

            let packed = ctx.pack(&options).await?;
            if packed.is_empty() {
                tracing::warn!("No files were packed from {}", ctx.pack_root(&options).display());
            }
            let content = packed.render();
            let token_count = super::packer::estimate_tokens(&content);
            if options.debug {
                yield format!("Packed {} files (~{token_count} tokens)", packed.files.len());
            }

            let mut plan = PromptPlan::new(
                &ctx,
                CommandCategory::Repo,
                options.provider,
                section,
                repo_prompt(&content, &query),
            )?
            .with_options(&options);
            plan.system_prompt = Some(REPO_SYSTEM_PROMPT.to_string());
            plan.token_count = Some(token_count);

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
    use crate::types::ProviderKind;

    #[tokio::test]
    async fn sends_packed_context_with_token_hint() {
        let factory = Arc::new(ScriptedFactory::default());
        let ctx = context(env_with(&[ProviderKind::Gemini]), Arc::clone(&factory));
        let lines = collect(RepoCommand::new(ctx).execute("what does main do?", CommandOptions::default()))
            .await
            .unwrap();
        assert_eq!(lines, vec!["answer from gemini".to_string()]);

        let calls = factory.calls();
        let (kind, prompt, options) = &calls[0];
        assert_eq!(*kind, ProviderKind::Gemini);
        assert!(prompt.contains("<file path=\"src/main.rs\">"));
        assert!(prompt.ends_with("Query: what does main do?"));
        assert!(options.token_count.is_some_and(|n| n > 0));
        assert!(options.system_prompt.is_some());
    }

    #[tokio::test]
    async fn debug_reports_pack_size_and_provider() {
        let factory = Arc::new(ScriptedFactory::default());
        let ctx = context(env_with(&[ProviderKind::OpenAi]), factory);
        let options = CommandOptions {
            debug: true,
            ..Default::default()
        };
        let lines = collect(RepoCommand::new(ctx).execute("q", options))
            .await
            .unwrap();
        assert!(lines[0].starts_with("Packed 3 files"));
        assert!(lines[1].starts_with("Using openai with model"));
    }
}
