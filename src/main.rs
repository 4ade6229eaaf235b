use clap::{Args, Parser, Subcommand};
use futures::StreamExt;
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;

use vibe_tools::commands::{
    AskCommand, Command, CommandContext, CommandOptions, DocCommand, PlanCommand, RepoCommand,
    WebCommand,
};
use vibe_tools::config::Config;
use vibe_tools::env::EnvSnapshot;
use vibe_tools::error::{ProviderError, render_error};
use vibe_tools::telemetry;
use vibe_tools::types::{ProviderKind, ReasoningEffort};

#[derive(Parser, Debug)]
#[command(name = "vibe-tools")]
#[command(version)]
#[command(about = "Ask LLM providers about your repository, the web and your plans")]
struct Cli {
    #[command(subcommand)]
    command: Cmd,
}

#[derive(Subcommand, Debug)]
enum Cmd {
    /// Ask a model directly (requires --provider and --model, or config)
    Ask(QueryArgs),
    /// Search the web
    Web(QueryArgs),
    /// Ask about the current repository
    Repo(QueryArgs),
    /// Generate repository documentation
    Doc(QueryArgs),
    /// Produce an implementation plan
    Plan {
        #[command(flatten)]
        args: QueryArgs,
        /// Provider for the file-selection pass
        #[arg(long)]
        file_provider: Option<ProviderKind>,
        /// Model for the file-selection pass
        #[arg(long)]
        file_model: Option<String>,
        /// Provider for the thinking pass
        #[arg(long)]
        thinking_provider: Option<ProviderKind>,
        /// Model for the thinking pass
        #[arg(long)]
        thinking_model: Option<String>,
    },
}

#[derive(Args, Debug)]
struct QueryArgs {
    /// The question or task
    query: String,

    #[arg(long)]
    provider: Option<ProviderKind>,

    #[arg(long)]
    model: Option<String>,

    #[arg(long)]
    max_tokens: Option<u32>,

    /// Show resolved providers, models and detailed errors
    #[arg(long)]
    debug: bool,

    /// Also write the answer to this file
    #[arg(long)]
    save_to: Option<PathBuf>,

    /// low, medium or high
    #[arg(long, value_parser = parse_reasoning_effort)]
    reasoning_effort: Option<ReasoningEffort>,

    /// Pack only this subdirectory
    #[arg(long)]
    subdir: Option<PathBuf>,
}

impl QueryArgs {
    fn options(&self) -> CommandOptions {
        CommandOptions {
            provider: self.provider,
            model: self.model.clone(),
            max_tokens: self.max_tokens,
            debug: self.debug,
            reasoning_effort: self.reasoning_effort,
            subdir: self.subdir.clone(),
            save_to: self.save_to.clone(),
            ..Default::default()
        }
    }
}

fn parse_reasoning_effort(s: &str) -> Result<ReasoningEffort, String> {
    match s.to_ascii_lowercase().as_str() {
        "low" => Ok(ReasoningEffort::Low),
        "medium" => Ok(ReasoningEffort::Medium),
        "high" => Ok(ReasoningEffort::High),
        other => Err(format!("expected low, medium or high, got '{other}'")),
    }
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    let (command, query, options) = split(cli.command);
    telemetry::init_from_env(options.debug);

    let config = match std::env::current_dir()
        .map_err(|e| ProviderError::InternalError(format!("No working directory: {e}")))
        .and_then(|cwd| Config::load(&cwd).map(|config| (cwd, config)))
    {
        Ok(loaded) => loaded,
        Err(e) => {
            eprintln!("{}", render_error(&e, options.debug, Config::default().debug_log_max_length()));
            return ExitCode::FAILURE;
        }
    };
    let (cwd, config) = config;
    let max_len = config.debug_log_max_length();
    let debug = options.debug;

    let env = config.apply_api_keys(EnvSnapshot::from_process());
    telemetry::log_environment(&env);
    let ctx = Arc::new(CommandContext::new(env, config, cwd));

    let command: Box<dyn Command> = match command {
        Name::Ask => Box::new(AskCommand::new(ctx)),
        Name::Web => Box::new(WebCommand::new(ctx)),
        Name::Repo => Box::new(RepoCommand::new(ctx)),
        Name::Doc => Box::new(DocCommand::new(ctx)),
        Name::Plan => Box::new(PlanCommand::new(ctx)),
    };

    let mut lines = command.execute(&query, options);
    while let Some(line) = lines.next().await {
        match line {
            Ok(line) => println!("{line}"),
            Err(e) => {
                eprintln!("{}", render_error(&e, debug, max_len));
                return ExitCode::FAILURE;
            }
        }
    }
    ExitCode::SUCCESS
}

enum Name {
    Ask,
    Web,
    Repo,
    Doc,
    Plan,
}

fn split(cmd: Cmd) -> (Name, String, CommandOptions) {
    match cmd {
        Cmd::Ask(args) => (Name::Ask, args.query.clone(), args.options()),
        Cmd::Web(args) => (Name::Web, args.query.clone(), args.options()),
        Cmd::Repo(args) => (Name::Repo, args.query.clone(), args.options()),
        Cmd::Doc(args) => (Name::Doc, args.query.clone(), args.options()),
        Cmd::Plan {
            args,
            file_provider,
            file_model,
            thinking_provider,
            thinking_model,
        } => (
            Name::Plan,
            args.query.clone(),
            CommandOptions {
                file_provider,
                file_model,
                thinking_provider,
                thinking_model,
                ..args.options()
            },
        ),
    }
}
