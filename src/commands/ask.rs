//! `ask`: a direct question to an explicitly chosen model.

use async_stream::try_stream;
use std::sync::Arc;

use super::{
    Command, CommandContext, CommandOptions, CommandStream, PromptPlan, run_prompt, save_output,
};
use crate::error::ProviderError;
use crate::registry::CommandCategory;

pub struct AskCommand {
    ctx: Arc<CommandContext>,
}

impl AskCommand {
    pub fn new(ctx: Arc<CommandContext>) -> Self {
        Self { ctx }
    }
}

impl Command for AskCommand {
    fn execute(&self, query: &str, options: CommandOptions) -> CommandStream {
        let ctx = Arc::clone(&self.ctx);
        let query = query.to_string();
        Box::pin(try_stream! {
            let section = ctx.config.ask.clone();
            let provider = options.provider.or(section.provider).ok_or_else(|| {
                ProviderError::InvalidParameter(
                    "ask requires a provider: pass --provider or set ask.provider in the config"
                        .to_string(),
                )
            })?;
            let model = options
                .model
                .clone()
                .or_else(|| {
                    section
                        .model
                        .clone()
                        .filter(|_| section.provider.is_none_or(|p| p == provider))
                })
                .ok_or_else(|| {
                    ProviderError::InvalidParameter(
                        "ask requires a model: pass --model or set ask.model in the config"
                            .to_string(),
                    )
                })?;

            let mut plan =
                PromptPlan::new(&ctx, CommandCategory::Ask, Some(provider), section, query)?
                    .with_options(&options);
            plan.model = Some(model);

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
