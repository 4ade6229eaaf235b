//! `doc`: generate repository documentation, optionally written to a file.

use async_stream::try_stream;
use std::sync::Arc;

use super::packer::estimate_tokens;
use super::{
    Command, CommandContext, CommandOptions, CommandStream, PromptPlan, check_model_has_provider,
    run_prompt, save_output,
};
use crate::registry::CommandCategory;

const DOC_SYSTEM_PROMPT: &str = "You are an expert technical writer documenting a software \
repository. Produce clear Markdown documentation covering purpose, installation, \
configuration, public interfaces and usage examples. Describe only what the code does.";

fn doc_prompt(packed: &str, hint: &str) -> String {
    let focus = if hint.trim().is_empty() {
        String::new()
    } else {
        format!("\nFocus: {}", hint.trim())
    };
    format!("{packed}\nGenerate documentation for the repository above.{focus}")
}

pub struct DocCommand {
    ctx: Arc<CommandContext>,
}

impl DocCommand {
    pub fn new(ctx: Arc<CommandContext>) -> Self {
        Self { ctx }
    }
}

impl Command for DocCommand {
    fn execute(&self, query: &str, options: CommandOptions) -> CommandStream {
        let ctx = Arc::clone(&self.ctx);
        let query = query.to_string();
        Box::pin(try_stream! {
            let section = ctx.config.doc.clone();
            check_model_has_provider(&options, &section)?;

            let packed = ctx.pack(&options).await?;
            let content = packed.render();
            let token_count = estimate_tokens(&content);
            if options.debug {
                yield format!("Packed {} files (~{token_count} tokens)", packed.files.len());
            }

            let mut plan = PromptPlan::new(
                &ctx,
                CommandCategory::Doc,
                options.provider,
                section,
                doc_prompt(&content, &query),
            )?
            .with_options(&options);
            plan.system_prompt = Some(DOC_SYSTEM_PROMPT.to_string());
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

    #[test]
    fn focus_hint_is_optional() {
        assert!(!doc_prompt("<pack>", "  ").contains("Focus"));
        assert!(doc_prompt("<pack>", "the CLI").ends_with("Focus: the CLI"));
    }

    #[tokio::test]
    async fn writes_documentation_to_file() {
        let dir = tempfile::tempdir().unwrap();
        let out = dir.path().join("DOCS.md");
        let factory = Arc::new(
            ScriptedFactory::default().reply(ProviderKind::Gemini, Ok("# Demo\n".to_string())),
        );
        let ctx = context(env_with(&[ProviderKind::Gemini]), factory);
        let options = CommandOptions {
            save_to: Some(out.clone()),
            ..Default::default()
        };
        let lines = collect(DocCommand::new(ctx).execute("", options)).await.unwrap();
        assert!(lines[0].starts_with("Output saved to"));
        assert_eq!(lines[1], "# Demo\n");
        assert_eq!(std::fs::read_to_string(out).unwrap(), "# Demo\n");
    }
}
