//! Capability answers returned by provider adapters.

/// Answer to "can this model search the web?".
///
/// When `supported` is false, `model` names a substitute the provider can use instead and
/// `error` explains why the requested model was rejected.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct WebSearchSupport {
    pub supported: bool,
    pub model: Option<String>,
    pub error: Option<String>,
}

impl WebSearchSupport {
    pub const fn supported() -> Self {
        Self {
            supported: true,
            model: None,
            error: None,
        }
    }

    pub fn substitute(model: impl Into<String>, reason: impl Into<String>) -> Self {
        Self {
            supported: false,
            model: Some(model.into()),
            error: Some(reason.into()),
        }
    }

    pub fn unsupported(reason: impl Into<String>) -> Self {
        Self {
            supported: false,
            model: None,
            error: Some(reason.into()),
        }
    }
}

/// Outcome of token-limit triage before model resolution.
///
/// Empty means "proceed unchanged"; `error` vetoes the call; `model` substitutes a
/// larger-context model.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TokenTriage {
    pub model: Option<String>,
    pub error: Option<String>,
}

impl TokenTriage {
    pub fn is_empty(&self) -> bool {
        self.model.is_none() && self.error.is_none()
    }

    pub fn reject(reason: impl Into<String>) -> Self {
        Self {
            model: None,
            error: Some(reason.into()),
        }
    }

    pub fn switch_to(model: impl Into<String>) -> Self {
        Self {
            model: Some(model.into()),
            error: None,
        }
    }
}
