//! Error Handling Module
//!
//! This module provides the error taxonomy shared by every provider adapter and command:
//! - Core error type (`ProviderError`, `ErrorCategory`)
//! - User-facing rendering helpers with debug-mode payload truncation
//! - Conversions from common library errors
//!
//! Classification from raw HTTP responses happens once, in
//! [`ProviderError::from_http_response`], so that shared code never sniffs message strings.
//!
//! # Example
//!
//! ```rust
//! use vibe_tools::error::{ErrorCategory, ProviderError};
//!
//! let error = ProviderError::api_error(429, "Resource has been exhausted");
//! assert_eq!(error.category(), ErrorCategory::RateLimit);
//! assert!(error.is_retryable());
//! ```

mod conversions;
pub mod helpers;
pub mod types;

pub use helpers::*;
pub use types::*;
