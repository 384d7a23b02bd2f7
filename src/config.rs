//! Runtime configuration.
//!
//! Thread-local, signal-backed settings. Hosts configure the runtime once
//! at startup (optionally from the environment) and may flip individual
//! settings later; effects that read [`config_signal`] re-run on changes.

use std::cell::RefCell;

use spark_signals::{signal, Signal};

// =============================================================================
// Diagnostic Policy
// =============================================================================

/// How development-time diagnostics reach the host.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DiagnosticPolicy {
    /// Drop diagnostics.
    Silent,
    /// Log through `tracing::warn!`.
    #[default]
    Warn,
    /// Log and keep them for [`take_diagnostics`](crate::diagnostics::take_diagnostics).
    Collect,
    /// Fail the fallible call that found the diagnostic; elsewhere log it.
    Deny,
    /// Treat every diagnostic as fatal.
    Panic,
}

impl DiagnosticPolicy {
    fn parse(text: &str) -> Option<Self> {
        match text.trim().to_ascii_lowercase().as_str() {
            "silent" | "off" => Some(Self::Silent),
            "warn" => Some(Self::Warn),
            "collect" => Some(Self::Collect),
            "deny" => Some(Self::Deny),
            "panic" => Some(Self::Panic),
            _ => None,
        }
    }
}

// =============================================================================
// Runtime Config
// =============================================================================

/// Settings consulted by the update pipeline.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RuntimeConfig {
    /// Where diagnostics go.
    pub diagnostic_policy: DiagnosticPolicy,
    /// Run declared data type checks after construction and each mutation.
    pub type_checking: bool,
    /// Upper bound on scheduler drain rounds in one `flush_pending()` call.
    pub max_flush_rounds: usize,
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self {
            diagnostic_policy: DiagnosticPolicy::Warn,
            type_checking: true,
            max_flush_rounds: 1024,
        }
    }
}

impl RuntimeConfig {
    /// Defaults overridden by `SPARK_VIEW_*` environment variables.
    ///
    /// Unparseable values are ignored.
    pub fn from_env() -> Self {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let mut config = Self::default();

        if let Some(policy) = lookup("SPARK_VIEW_DIAGNOSTICS")
            .as_deref()
            .and_then(DiagnosticPolicy::parse)
        {
            config.diagnostic_policy = policy;
        }

        match lookup("SPARK_VIEW_TYPE_CHECK").as_deref().map(str::trim) {
            Some("0") | Some("false") => config.type_checking = false,
            Some("1") | Some("true") => config.type_checking = true,
            _ => {}
        }

        if let Some(rounds) = lookup("SPARK_VIEW_MAX_FLUSH_ROUNDS")
            .and_then(|v| v.trim().parse::<usize>().ok())
            .filter(|r| *r > 0)
        {
            config.max_flush_rounds = rounds;
        }

        config
    }
}

// =============================================================================
// State
// =============================================================================

thread_local! {
    static CONFIG: RefCell<Signal<RuntimeConfig>> = RefCell::new(signal(RuntimeConfig::default()));
}

/// Current configuration.
pub fn config() -> RuntimeConfig {
    CONFIG.with(|c| c.borrow().get())
}

/// Replace the configuration.
pub fn set_config(config: RuntimeConfig) {
    CONFIG.with(|c| c.borrow().set(config));
}

/// Configuration signal for reactive tracking.
pub fn config_signal() -> Signal<RuntimeConfig> {
    CONFIG.with(|c| c.borrow().clone())
}

/// Current diagnostic policy.
pub fn diagnostic_policy() -> DiagnosticPolicy {
    config().diagnostic_policy
}

/// Change only the diagnostic policy.
pub fn set_diagnostic_policy(policy: DiagnosticPolicy) {
    let mut next = config();
    next.diagnostic_policy = policy;
    set_config(next);
}

/// Reset configuration to defaults (for testing).
pub fn reset_config() {
    set_config(RuntimeConfig::default());
}
