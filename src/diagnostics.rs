//! Development-time diagnostics.
//!
//! Schema mismatches and reserved-name collisions are not runtime failures:
//! they are reported here and the host decides, through
//! [`DiagnosticPolicy`](crate::config::DiagnosticPolicy), whether they are
//! logged, collected, dropped, returned as errors or fatal.

use std::cell::RefCell;

use crate::config::{diagnostic_policy, DiagnosticPolicy};
use crate::error::{CoreError, Result};

/// A development-time finding.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum Diagnostic {
    #[error("`{component}`: data `{key}` expects {expected}, found {found}")]
    SchemaMismatch {
        component: String,
        key: String,
        expected: String,
        found: String,
    },

    #[error("`{component}`: data `{key}` is required")]
    MissingRequired { component: String, key: String },

    #[error("`{key}` is a reserved key of components (`{component}`); overriding it may cause unknown behavior")]
    ReservedKey { component: String, key: String },
}

thread_local! {
    static COLLECTED: RefCell<Vec<Diagnostic>> = const { RefCell::new(Vec::new()) };
}

/// Route a diagnostic through the configured policy.
pub fn report(diagnostic: Diagnostic) {
    match diagnostic_policy() {
        DiagnosticPolicy::Silent => {}
        DiagnosticPolicy::Warn => tracing::warn!("{}", diagnostic),
        DiagnosticPolicy::Collect => {
            tracing::warn!("{}", diagnostic);
            COLLECTED.with(|c| c.borrow_mut().push(diagnostic));
        }
        DiagnosticPolicy::Deny => tracing::warn!("{}", diagnostic),
        DiagnosticPolicy::Panic => panic!("{}", diagnostic),
    }
}

/// Route a diagnostic found on a fallible path.
///
/// Under [`DiagnosticPolicy::Deny`] it comes back as
/// [`CoreError::Diagnostic`]; every other policy behaves like [`report`].
pub fn escalate(diagnostic: Diagnostic) -> Result<()> {
    if diagnostic_policy() == DiagnosticPolicy::Deny {
        tracing::warn!("{}", diagnostic);
        return Err(CoreError::Diagnostic(diagnostic));
    }
    report(diagnostic);
    Ok(())
}

/// Drain diagnostics gathered under [`DiagnosticPolicy::Collect`].
pub fn take_diagnostics() -> Vec<Diagnostic> {
    COLLECTED.with(|c| std::mem::take(&mut *c.borrow_mut()))
}
