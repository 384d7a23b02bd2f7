//! Mount API - Root component lifecycle and flush loop.
//!
//! Mounting creates a root component, attaches it to a target element and
//! hands back a handle that owns it. The host drives updates by ticking the
//! handle (or by calling `flush_pending` directly).
//!
//! # Example
//!
//! ```ignore
//! use spark_view::view::mount;
//!
//! let dom = spark_view::dom::reset_renderer();
//! let body = dom.create_root("body");
//!
//! let mut handle = mount::mount(&app, ComponentOptions::new(), body)?;
//! handle.on_flush(|epoch| println!("flushed #{epoch}"));
//!
//! handle.component().set("title", "hello")?;
//! mount::run(&handle);
//!
//! handle.unmount();
//! ```

use std::cell::Cell;
use std::rc::Rc;

use spark_signals::effect;

use crate::dom::DomHandle;
use crate::engine::{flush_epoch_signal, flush_pending, has_pending};
use crate::error::Result;

use super::component::{Component, ComponentClass, ComponentOptions};

// =============================================================================
// Mount Handle
// =============================================================================

/// Handle returned by [`mount`]. Owns the root component; dropping the
/// handle disposes it.
pub struct MountHandle {
    component: Component,
    stop_effect: Option<Box<dyn FnOnce()>>,
    running: Rc<Cell<bool>>,
}

impl MountHandle {
    pub fn component(&self) -> &Component {
        &self.component
    }

    /// Run `callback` with the flush epoch now and after every flush that
    /// did work. Replaces a previous callback.
    pub fn on_flush(&mut self, mut callback: impl FnMut(u64) + 'static) {
        if let Some(stop) = self.stop_effect.take() {
            stop();
        }
        let epoch = flush_epoch_signal();
        let running = self.running.clone();
        let stop_fn = effect(move || {
            let current = epoch.get();
            if running.get() {
                callback(current);
            }
        });
        self.stop_effect = Some(Box::new(stop_fn));
    }

    /// Flush pending updates. Returns whether the handle is still mounted.
    pub fn tick(&self) -> bool {
        if !self.is_running() {
            return false;
        }
        flush_pending();
        self.is_running()
    }

    pub fn is_running(&self) -> bool {
        self.running.get()
    }

    /// Stop the flush callback and dispose the root component.
    pub fn unmount(mut self) {
        self.shutdown();
    }

    fn shutdown(&mut self) {
        self.running.set(false);
        if let Some(stop) = self.stop_effect.take() {
            stop();
        }
        self.component.dispose();
    }
}

impl Drop for MountHandle {
    fn drop(&mut self) {
        if self.running.get() {
            self.shutdown();
        }
    }
}

// =============================================================================
// Mount
// =============================================================================

/// Create a root component from `class` and attach it at the end of
/// `target`.
pub fn mount(
    class: &ComponentClass,
    options: ComponentOptions,
    target: DomHandle,
) -> Result<MountHandle> {
    let adopting = options.el.is_some();
    let component = Component::new(class, options)?;
    if !adopting {
        component.attach(target, None)?;
    }
    tracing::debug!(id = %component.id(), component = class.name(), "mounted");

    Ok(MountHandle {
        component,
        stop_effect: None,
        running: Rc::new(Cell::new(true)),
    })
}

/// Unmount and clean up.
pub fn unmount(handle: MountHandle) {
    handle.unmount();
}

/// Flush once.
pub fn tick(handle: &MountHandle) -> bool {
    handle.tick()
}

/// Flush until nothing is pending or the handle is unmounted.
pub fn run(handle: &MountHandle) {
    while has_pending() && handle.tick() {}
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::RefCell;

    use serde_json::json;

    use crate::dom::reset_renderer;
    use crate::engine::reset_scheduler;
    use crate::expr::parse_expr;
    use crate::types::Value;
    use crate::view::lifecycle::Phase;
    use crate::view::TemplateNode;

    fn title_class() -> ComponentClass {
        ComponentClass::builder("x-title")
            .template(
                TemplateNode::element("h1").child(TemplateNode::text(parse_expr("title").unwrap())),
            )
            .init_data(|| Value::from(json!({"title": "a"})))
            .build()
    }

    #[test]
    fn test_mount_attaches_and_unmount_disposes() {
        let dom = reset_renderer();
        reset_scheduler();
        let body = dom.create_root("body");

        let handle = mount(&title_class(), ComponentOptions::new(), body).unwrap();
        assert_eq!(dom.to_html(body), "<body><h1>a</h1></body>");
        let component = handle.component().clone();

        handle.unmount();
        assert_eq!(component.phase(), Phase::Disposed);
        assert_eq!(dom.to_html(body), "<body></body>");
    }

    #[test]
    fn test_on_flush_follows_epoch() {
        let dom = reset_renderer();
        reset_scheduler();
        let body = dom.create_root("body");

        let mut handle = mount(&title_class(), ComponentOptions::new(), body).unwrap();
        let epochs = Rc::new(RefCell::new(Vec::new()));
        let epochs_clone = epochs.clone();
        handle.on_flush(move |epoch| epochs_clone.borrow_mut().push(epoch));
        assert_eq!(epochs.borrow().len(), 1);

        handle.component().set("title", "b").unwrap();
        run(&handle);
        assert_eq!(epochs.borrow().len(), 2);
        assert_eq!(dom.text_content(body), "b");

        assert!(handle.tick());
        assert!(!has_pending());
    }

    #[test]
    fn test_drop_disposes() {
        let dom = reset_renderer();
        reset_scheduler();
        let body = dom.create_root("body");

        let component = {
            let handle = mount(&title_class(), ComponentOptions::new(), body).unwrap();
            handle.component().clone()
        };
        assert!(component.lifecycle().is_disposed());
    }
}
