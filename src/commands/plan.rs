//! `plan`: two-pass implementation planning.
//!
//! The file pass sends the whole packed repository and asks for the files relevant to the
//! query. The thinking pass sends only those files and asks for a step-by-step plan. Each
//! pass resolves its own provider and model and runs under a ten-minute deadline.

use async_stream::try_stream;
use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;

use super::packer::estimate_tokens;
use super::{
    Command, CommandContext, CommandOptions, CommandStream, PromptPlan, check_model_has_provider,
    run_prompt, save_output,
};
use crate::error::ProviderError;
use crate::registry::CommandCategory;

/// Deadline for each pass
pub const PLAN_PASS_TIMEOUT: Duration = Duration::from_secs(600);

const FILE_SYSTEM_PROMPT: &str = "You are an expert software developer. Given a repository \
and a task, list the repository files that are relevant to the task. Reply with one file \
path per line, exactly as it appears in the repository, and nothing else.";

const THINKING_SYSTEM_PROMPT: &str = "You are an expert software architect. Using the \
provided files, write a detailed, step-by-step implementation plan for the task. Reference \
specific files and functions, and call out risks and open questions.";

/// Repository paths named in a file-selection response, in response order.
///
/// Lines may carry list markers, numbering, backticks or a trailing description.
pub fn parse_file_list<'a, I>(response: &str, known: I) -> Vec<String>
where
    I: IntoIterator<Item = &'a str>,
{
    let known: HashSet<&str> = known.into_iter().collect();
    let mut seen = HashSet::new();
    let mut selected = Vec::new();
    for line in response.lines() {
        let line = strip_list_marker(line.trim());
        let first = line.split_whitespace().next().unwrap_or_default();
        let found = [line, first]
            .into_iter()
            .map(clean_path)
            .find(|candidate| known.contains(candidate));
        if let Some(path) = found
            && seen.insert(path.to_string())
        {
            selected.push(path.to_string());
        }
    }
    selected
}

fn strip_list_marker(line: &str) -> &str {
    let line = line.trim_start_matches(['-', '*', '•', ' ']);
    let digits = line.chars().take_while(char::is_ascii_digit).count();
    if digits > 0 {
        let rest = &line[digits..];
        if let Some(rest) = rest.strip_prefix('.').or_else(|| rest.strip_prefix(')')) {
            return rest.trim_start();
        }
    }
    line
}

fn clean_path(s: &str) -> &str {
    let s = s.trim().trim_matches(['`', '"', '\'', ',', ':', '*']);
    s.strip_prefix("./").unwrap_or(s)
}

pub struct PlanCommand {
    ctx: Arc<CommandContext>,
}

impl PlanCommand {
    pub fn new(ctx: Arc<CommandContext>) -> Self {
        Self { ctx }
    }
}

impl Command for PlanCommand {
    fn execute(&self, query: &str, options: CommandOptions) -> CommandStream {
        let ctx = Arc::clone(&self.ctx);
        let query = query.to_string();
        Box::pin(try_stream! {
            let file_section = ctx.config.plan.file_section();
            let thinking_section = ctx.config.plan.thinking_section();
            let file_options = CommandOptions {
                provider: options.file_provider,
                model: options.file_model.clone(),
                ..options.clone()
            };
            let thinking_options = CommandOptions {
                provider: options.thinking_provider,
                model: options.thinking_model.clone(),
                ..options.clone()
            };
            check_model_has_provider(&file_options, &file_section)?;
            check_model_has_provider(&thinking_options, &thinking_section)?;

            let packed = ctx.pack(&options).await?;
            let content = packed.render();
            let token_count = estimate_tokens(&content);
            if options.debug {
                yield format!("Packed {} files (~{token_count} tokens)", packed.files.len());
            }

            let mut file_plan = PromptPlan::new(
                &ctx,
                CommandCategory::PlanFile,
                file_options.provider,
                file_section,
                format!("{content}\nTask: {query}\n\nList the relevant files, one per line."),
            )?
            .with_options(&file_options);
            file_plan.system_prompt = Some(FILE_SYSTEM_PROMPT.to_string());
            file_plan.token_count = Some(token_count);
            file_plan.timeout = Some(PLAN_PASS_TIMEOUT);

            let selection = run_prompt(&ctx, &file_plan).await?;
            for note in selection.notes {
                yield note;
            }

            let files = parse_file_list(&selection.text, packed.paths());
            if files.is_empty() {
                Err::<(), _>(ProviderError::ParseError(
                    "The file-selection pass did not name any repository files".to_string(),
                ))?;
            }
            yield format!("Found {} relevant files: {}", files.len(), files.join(", "));

            let subset = packed.retain_paths(files.iter().map(String::as_str));
            let subset_content = subset.render();
            let mut thinking_plan = PromptPlan::new(
                &ctx,
                CommandCategory::PlanThinking,
                thinking_options.provider,
                thinking_section,
                format!("{subset_content}\nTask: {query}"),
            )?
            .with_options(&thinking_options);
            thinking_plan.system_prompt = Some(THINKING_SYSTEM_PROMPT.to_string());
            thinking_plan.token_count = Some(estimate_tokens(&subset_content));
            thinking_plan.timeout = Some(PLAN_PASS_TIMEOUT);

            let outcome = run_prompt(&ctx, &thinking_plan).await?;
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
