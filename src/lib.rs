//! # spark-view
//!
//! Fine-grained reactive component core.
//!
//! Built on [spark-signals](https://github.com/RLabs-Inc/spark-signals) for
//! host-side reactivity.
//!
//! ## Architecture
//!
//! Every component owns a [`DataStore`](store::DataStore). Writes to it emit
//! change records; the component batches them and flushes on the next drain
//! of the scheduler. A flush patches only what the changes touch:
//!
//! ```text
//! set/splice → change record → pending batch → next_tick → update()
//!                                                 │
//!        props / text / children / slots / bindings / owner write-back
//! ```
//!
//! Change relevance is decided by the expression comparator
//! ([`expr::ExprEngine::compare`]), never by diffing trees.
//!
//! ## Modules
//!
//! - [`types`] - Core types (`Value`, `Key`, `ComponentId`)
//! - [`error`] - Error type and diagnostics escalation
//! - [`config`] - Thread-local runtime settings
//! - [`diagnostics`] - Development-time reports
//! - [`expr`] - Path expressions and the change comparator
//! - [`store`] - Data store and change records
//! - [`engine`] - Component registry and update scheduler
//! - [`dom`] - Renderer abstraction and in-memory document
//! - [`view`] - Components, templates, rendered nodes, mounting

pub mod config;
pub mod diagnostics;
pub mod dom;
pub mod engine;
pub mod error;
pub mod expr;
pub mod store;
pub mod types;
pub mod view;

// Re-export commonly used items
pub use types::*;

pub use error::{CoreError, Result};

pub use config::{
    config, config_signal, diagnostic_policy, reset_config, set_config, set_diagnostic_policy,
    DiagnosticPolicy, RuntimeConfig,
};

pub use diagnostics::{take_diagnostics, Diagnostic};

pub use engine::{
    flush_epoch, flush_epoch_signal, flush_pending, get_component, has_pending, next_tick,
    reset_registry, reset_scheduler,
};

pub use view::{
    mount, unmount, Component, ComponentClass, ComponentOptions, MountHandle, Phase, TemplateNode,
};

/// Everything needed to define, mount and drive components.
pub mod prelude {
    pub use crate::dom::{renderer, reset_renderer, DomHandle, MemoryDom, Renderer};
    pub use crate::engine::{flush_pending, next_tick};
    pub use crate::error::{CoreError, Result};
    pub use crate::expr::{parse_expr, Expr};
    pub use crate::store::{Change, ChangeOrigin, DataStore};
    pub use crate::types::{ComponentId, Value};
    pub use crate::view::{
        mount, Component, ComponentClass, ComponentOptions, Lifecycle, Message, MountHandle, Phase,
        RefTarget, TemplateNode, Transition,
    };
}
