//! Tracing subscriber setup.
//!
//! Logs go to stderr so that command output on stdout stays clean. The level and format
//! come from [`SubscriberConfig`], or from `VIBE_TOOLS_LOG_LEVEL` / `VIBE_TOOLS_LOG_FORMAT`
//! via [`init_from_env`]. `RUST_LOG`, when set, overrides the level filter.

use std::str::FromStr;
use tracing::Level;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::prelude::*;

use crate::env::EnvSnapshot;

pub const LOG_LEVEL_VAR: &str = "VIBE_TOOLS_LOG_LEVEL";
pub const LOG_FORMAT_VAR: &str = "VIBE_TOOLS_LOG_FORMAT";

/// Log line format
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OutputFormat {
    #[default]
    Text,
    Json,
    JsonCompact,
}

impl FromStr for OutputFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "text" | "pretty" => Ok(Self::Text),
            "json" => Ok(Self::Json),
            "json-compact" | "json_compact" => Ok(Self::JsonCompact),
            other => Err(format!("unknown log format '{other}'")),
        }
    }
}

/// Subscriber settings
#[derive(Debug, Clone)]
pub struct SubscriberConfig {
    pub level: Level,
    pub format: OutputFormat,
    pub ansi: bool,
}

impl Default for SubscriberConfig {
    fn default() -> Self {
        Self {
            level: Level::WARN,
            format: OutputFormat::Text,
            ansi: true,
        }
    }
}

impl SubscriberConfig {
    /// Read level and format overrides from the process environment
    pub fn from_env() -> Self {
        Self::from_vars(
            std::env::var(LOG_LEVEL_VAR).ok().as_deref(),
            std::env::var(LOG_FORMAT_VAR).ok().as_deref(),
        )
    }

    /// Unparseable values fall back to the defaults
    pub fn from_vars(level: Option<&str>, format: Option<&str>) -> Self {
        let defaults = Self::default();
        Self {
            level: level
                .and_then(|l| Level::from_str(l.trim()).ok())
                .unwrap_or(defaults.level),
            format: format
                .and_then(|f| f.parse().ok())
                .unwrap_or(defaults.format),
            ansi: defaults.ansi,
        }
    }

    pub const fn with_level(mut self, level: Level) -> Self {
        self.level = level;
        self
    }

    fn filter(&self) -> EnvFilter {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| {
            EnvFilter::new(format!(
                "vibe_tools={},warn",
                self.level.as_str().to_ascii_lowercase()
            ))
        })
    }
}

/// Install the global subscriber.
///
/// Returns `false` when a subscriber was already installed (tests, repeated calls).
pub fn init_subscriber(config: &SubscriberConfig) -> bool {
    let registry = tracing_subscriber::registry().with(config.filter());
    let result = match config.format {
        OutputFormat::Text => registry
            .with(
                tracing_subscriber::fmt::layer()
                    .with_writer(std::io::stderr)
                    .with_ansi(config.ansi)
                    .with_target(false),
            )
            .try_init(),
        OutputFormat::Json => registry
            .with(
                tracing_subscriber::fmt::layer()
                    .json()
                    .with_writer(std::io::stderr),
            )
            .try_init(),
        OutputFormat::JsonCompact => registry
            .with(
                tracing_subscriber::fmt::layer()
                    .json()
                    .flatten_event(true)
                    .with_current_span(false)
                    .with_span_list(false)
                    .with_writer(std::io::stderr),
            )
            .try_init(),
    };
    result.is_ok()
}

/// Install the subscriber configured by `VIBE_TOOLS_LOG_LEVEL` / `VIBE_TOOLS_LOG_FORMAT`.
///
/// `debug` raises the level to at least DEBUG.
pub fn init_from_env(debug: bool) -> bool {
    let mut config = SubscriberConfig::from_env();
    if debug && config.level < Level::DEBUG {
        config = config.with_level(Level::DEBUG);
    }
    init_subscriber(&config)
}

/// Log which providers have keys, at debug level
pub fn log_environment(env: &EnvSnapshot) {
    let available: Vec<&str> = crate::registry::get_available_providers(env)
        .into_iter()
        .map(|p| p.provider.as_str())
        .collect();
    tracing::debug!(providers = ?available, "Providers with API keys");
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_env_values() {
        let config = SubscriberConfig::from_vars(Some("debug"), Some("json-compact"));
        assert_eq!(config.level, Level::DEBUG);
        assert_eq!(config.format, OutputFormat::JsonCompact);

        let config = SubscriberConfig::from_vars(Some("loud"), Some("xml"));
        assert_eq!(config.level, Level::WARN);
        assert_eq!(config.format, OutputFormat::Text);
    }

    #[test]
    fn reinitialisation_is_tolerated() {
        let config = SubscriberConfig::default();
        let _ = init_subscriber(&config);
        assert!(!init_subscriber(&config));
    }
}
