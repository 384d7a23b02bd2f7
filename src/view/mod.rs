//! View - Components and the nodes they render.
//!
//! - [`component`]: the component itself (data, bindings, update pipeline,
//!   slots, events, lifecycle transitions)
//! - [`template`]: template nodes built as values
//! - Rendered nodes: [`ElementNode`], [`TextNode`], [`SlotNode`]
//! - [`mount`]: root mounting and the host-side flush handle
//! - [`hydrate`]: reading initial data from pre-rendered output

pub mod component;
mod element;
pub mod hydrate;
pub mod lifecycle;
pub mod mount;
mod node;
mod slot;
pub mod template;
mod text;
pub mod types;

pub use component::{
    Binding, Component, ComponentClass, ComponentClassBuilder, ComponentOptions, ComputedScope,
    EventListenerId,
};
pub(crate) use component::ComponentInner;
pub use element::ElementNode;
pub use hydrate::parse_payload;
pub use lifecycle::{Lifecycle, Phase};
pub use mount::{mount, run, tick, unmount, MountHandle};
pub use node::Node;
pub use slot::SlotNode;
pub use template::{Directives, EventDecl, PropDecl, TemplateKind, TemplateNode};
pub use text::TextNode;
pub use types::{Done, EventHandler, Message, RefTarget, Transition, WatchFn};
