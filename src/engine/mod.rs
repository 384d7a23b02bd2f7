//! Engine - Component registry and update scheduler.
//!
//! - Registry: id allocation, id → component resolution, release callbacks
//! - Scheduler: the deferred flush queue every component batches into
//!
//! # Architecture
//!
//! Components refer to their owner and parent by id. Ids are resolved
//! through the registry, which holds weak handles only:
//!
//! ```text
//! owner ──(Rc)──► rendered child
//!   ▲                  │
//!   └──── registry ◄───┘  owner_id: ComponentId
//! ```
//!
//! Data changes never render synchronously. Each component queues one
//! flush per batch on the scheduler; the host drains it.

mod registry;
mod scheduler;

pub use registry::{
    get_component, is_registered, live_components, live_count, on_release, reset_registry,
};
pub(crate) use registry::{allocate_id, register_component, release_component};
pub use scheduler::{
    flush_epoch, flush_epoch_signal, flush_pending, has_pending, next_tick, pending_count,
    reset_scheduler,
};
