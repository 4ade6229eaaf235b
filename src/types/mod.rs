//! Shared data model: provider identities, per-call options, token accounting and
//! capability answers.

mod options;
mod prompt;
mod provider;
mod usage;
mod web_search;

pub use options::*;
pub use prompt::*;
pub use provider::*;
pub use usage::*;
pub use web_search::*;
