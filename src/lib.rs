//! # vibe-tools
//!
//! Repository, web, planning and documentation queries dispatched across hosted LLM
//! providers: Gemini (and Vertex AI), OpenAI, OpenRouter, Perplexity, ModelBox, Anthropic,
//! xAI and Groq.
//!
#![deny(unsafe_code)]

//! ## Layers
//!
//! - **Providers**: one adapter per backend behind the [`providers::Provider`] trait, with
//!   model discovery, model-name resolution, token triage and web-search negotiation.
//! - **Registry**: which providers have keys, and in what order each command tries them.
//! - **Commands**: `ask`, `web`, `repo`, `doc`, `plan`, each streaming output lines.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use futures::StreamExt;
//! use std::sync::Arc;
//! use vibe_tools::prelude::*;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), ProviderError> {
//!     let env = EnvSnapshot::from_process();
//!     let cwd = std::env::current_dir().map_err(|e| ProviderError::InternalError(e.to_string()))?;
//!     let config = Config::load(&cwd)?;
//!     let env = config.apply_api_keys(env);
//!     let ctx = Arc::new(CommandContext::new(env, config, cwd));
//!
//!     let mut lines = RepoCommand::new(ctx).execute("Where is config loaded?", CommandOptions::default());
//!     while let Some(line) = lines.next().await {
//!         println!("{}", line?);
//!     }
//!     Ok(())
//! }
//! ```

pub mod auth;
pub mod commands;
pub mod config;
pub mod env;
pub mod error;
pub mod executors;
pub mod providers;
pub mod registry;
pub mod resolver;
pub mod retry;
pub mod telemetry;
pub mod transformers;
pub mod types;

/// Commonly used types
pub mod prelude {
    pub use crate::commands::{
        AskCommand, Command, CommandContext, CommandOptions, CommandStream, DocCommand,
        PlanCommand, RepoCommand, WebCommand,
    };
    pub use crate::config::Config;
    pub use crate::env::EnvSnapshot;
    pub use crate::error::ProviderError;
    pub use crate::providers::{Provider, create_provider};
    pub use crate::registry::{CommandCategory, get_available_providers};
    pub use crate::types::{ModelOptions, ProviderKind, ReasoningEffort};
}
