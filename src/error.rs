//! Error types.
//!
//! Only direct contract violations and host-facing failures surface here.
//! Lookups that find nothing (slots, refs, message receivers) resolve to an
//! absence instead of an error.

use crate::diagnostics::Diagnostic;

/// Errors returned by the component core.
#[derive(Debug, thiserror::Error)]
pub enum CoreError {
    #[error("cannot parse expression `{input}`: {message}")]
    Parse { input: String, message: String },

    #[error("invalid hydration marker: {0}")]
    Hydration(#[from] serde_json::Error),

    #[error("component `{tag}` is not registered with `{owner}`")]
    UnknownComponent { tag: String, owner: String },

    #[error(transparent)]
    Diagnostic(#[from] Diagnostic),
}

pub type Result<T> = std::result::Result<T, CoreError>;
