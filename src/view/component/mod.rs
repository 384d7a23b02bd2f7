//! Component - The unit of the tree.
//!
//! A component owns its data store, its rendered children and its
//! listeners. Owner and parent are ids resolved through the registry, so a
//! component never keeps its ancestors alive.
//!
//! # Construction
//!
//! `compiled → inited` happens in [`Component::new`]: slots are sorted,
//! source events registered, declared bindings read from the caller's
//! scope, computed properties evaluated and the data listener installed.
//! `created → attached` happens on [`Component::attach`] (or immediately
//! when adopting an existing element).
//!
//! # Example
//!
//! ```ignore
//! use spark_view::prelude::*;
//!
//! let class = ComponentClass::builder("x-label")
//!     .template(TemplateNode::element("span").child(TemplateNode::text(parse_expr("text")?)))
//!     .init_data(|| Value::from(serde_json::json!({"text": "hello"})))
//!     .build();
//!
//! let label = Component::new(&class, ComponentOptions::new())?;
//! label.attach(root, None)?;
//! label.set("text", "bye")?;
//! flush_pending();
//! ```

mod attach;
mod class;
mod computed;
mod events;
mod slots;
mod update;

use std::cell::{Cell, RefCell};
use std::collections::HashMap;
use std::rc::Rc;

use crate::config::config;
use crate::diagnostics;
use crate::dom::{renderer, DomHandle, DomKind, ReverseWalker};
use crate::engine::{allocate_id, get_component, next_tick, register_component, release_component};
use crate::error::Result;
use crate::expr::{parse_expr, Expr};
use crate::store::{Change, DataStore, ListenerId};
use crate::types::{ComponentId, Value};

use super::hydrate;
use super::lifecycle::{Lifecycle, Phase};
use super::node::{relation, Node, NodeContext};
use super::slot::SlotNode;
use super::template::TemplateNode;
use super::types::Transition;

pub use class::{ComponentClass, ComponentClassBuilder};
pub use computed::ComputedScope;
pub use events::EventListenerId;
pub use update::Binding;

use computed::ComputedDeps;
use events::EventRegistry;
use slots::SourceSlots;

// =============================================================================
// Options
// =============================================================================

/// Construction options.
#[derive(Clone, Default)]
pub struct ComponentOptions {
    /// Initial data merged over the class's initial data.
    pub data: Option<Value>,
    /// Component whose scope the source's expressions are evaluated in.
    pub owner: Option<ComponentId>,
    /// Caller scope. Defaults to the owner's data for components created
    /// outside a rendered tree.
    pub scope: Option<Rc<DataStore>>,
    /// Caller-side use site: props, events, directives and slot content.
    pub source: Option<Rc<TemplateNode>>,
    /// Existing element to adopt.
    pub el: Option<DomHandle>,
    pub transition: Option<Transition>,
    /// Tag the component was used under.
    pub sub_tag: Option<String>,
    pub(crate) parent: Option<ComponentId>,
}

impl ComponentOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn data(mut self, data: impl Into<Value>) -> Self {
        self.data = Some(data.into());
        self
    }

    pub fn owner(mut self, owner: &Component) -> Self {
        self.owner = Some(owner.id());
        self
    }

    pub fn scope(mut self, scope: Rc<DataStore>) -> Self {
        self.scope = Some(scope);
        self
    }

    pub fn source(mut self, source: TemplateNode) -> Self {
        self.source = Some(Rc::new(source));
        self
    }

    pub fn el(mut self, el: DomHandle) -> Self {
        self.el = Some(el);
        self
    }

    pub fn transition(mut self, transition: Transition) -> Self {
        self.transition = Some(transition);
        self
    }

    pub fn sub_tag(mut self, tag: &str) -> Self {
        self.sub_tag = Some(tag.to_string());
        self
    }
}

// =============================================================================
// Component Node
// =============================================================================

#[derive(Debug, Clone, Copy, Default)]
pub(crate) struct LeaveMode {
    pub(crate) dispose: bool,
    pub(crate) no_detach: bool,
    pub(crate) no_transition: bool,
}

pub(crate) struct ComponentInner {
    id: ComponentId,
    class: ComponentClass,
    tag: String,
    template: Rc<TemplateNode>,
    source: RefCell<Option<Rc<TemplateNode>>>,
    owner: Option<ComponentId>,
    parent_component: Option<ComponentId>,
    /// Created by a rendered tree (as opposed to by hand with an owner).
    in_tree: bool,
    scope: Option<Rc<DataStore>>,
    data: Rc<DataStore>,

    el: Cell<Option<DomHandle>>,
    lifecycle: Cell<Lifecycle>,
    phase: Cell<Phase>,
    after: Cell<u16>,

    children: RefCell<Vec<Node>>,
    slot_children: RefCell<Vec<Rc<SlotNode>>>,
    implicit_children: RefCell<Vec<Component>>,

    binds: Vec<Binding>,
    listeners: RefCell<EventRegistry>,
    computed_deps: RefCell<HashMap<String, ComputedDeps>>,
    pending: RefCell<Option<Vec<Change>>>,

    source_slots: RefCell<SourceSlots>,
    sbind_data: RefCell<Option<Value>>,
    need_reload: Cell<bool>,
    content_ready: Cell<bool>,
    transition: Option<Transition>,
    leave_mode: Cell<LeaveMode>,
}

/// Handle to a component. Cloning shares the component.
#[derive(Clone)]
pub struct Component(Rc<ComponentInner>);

impl Component {
    /// Create a component. It stays unattached until [`Component::attach`],
    /// unless `options.el` hands it an existing element to adopt.
    pub fn new(class: &ComponentClass, options: ComponentOptions) -> Result<Component> {
        Self::create(class, options, None)
    }

    pub(crate) fn create(
        class: &ComponentClass,
        mut options: ComponentOptions,
        walker: Option<&mut ReverseWalker>,
    ) -> Result<Component> {
        class.check_components()?;
        let id = allocate_id();

        if let Some(el) = options.el {
            if let Some(data) = hydrate::take_marker(el)? {
                options.data = Some(data);
            }
        }

        let in_tree = options.parent.is_some();
        let owner = options.owner.and_then(get_component);
        let scope = match (&owner, in_tree) {
            (Some(owner), false) => Some(owner.0.data.clone()),
            _ => options.scope.clone(),
        };

        let source = options.source.clone();
        let spread = match (source.as_ref().and_then(|s| s.directives().bind.as_ref()), &scope) {
            (Some(expr), Some(scope)) => Some(scope.get(expr)).filter(|v| v.as_object().is_some()),
            _ => None,
        };

        let mut initial = class.initial_data();
        if let Some(extra) = options.data.clone().or_else(|| spread.clone()) {
            merge_object(&mut initial, extra);
        }

        let template = class.template().clone();
        let tag = match (template.tag(), source.as_ref()) {
            ("", Some(source)) if !source.tag().is_empty() => source.tag().to_string(),
            ("", _) => "div".to_string(),
            (tag, _) => tag.to_string(),
        };

        let binds = source
            .as_ref()
            .map(|s| {
                s.props()
                    .iter()
                    .filter(|p| p.name != "slot")
                    .map(|p| Binding {
                        name: p.data_name(),
                        expr: p.expr.clone(),
                        two_way: p.two_way,
                    })
                    .collect()
            })
            .unwrap_or_default();

        let component = Component(Rc::new(ComponentInner {
            id,
            class: class.clone(),
            tag,
            template,
            source: RefCell::new(source),
            owner: options.owner,
            parent_component: options.parent.or(options.owner),
            in_tree,
            scope,
            data: Rc::new(DataStore::new(initial)),
            el: Cell::new(None),
            lifecycle: Cell::new(Lifecycle::empty()),
            phase: Cell::new(Phase::Start),
            after: Cell::new(0),
            children: RefCell::new(Vec::new()),
            slot_children: RefCell::new(Vec::new()),
            implicit_children: RefCell::new(Vec::new()),
            binds,
            listeners: RefCell::new(EventRegistry::new()),
            computed_deps: RefCell::new(HashMap::new()),
            pending: RefCell::new(None),
            source_slots: RefCell::new(SourceSlots::default()),
            sbind_data: RefCell::new(spread),
            need_reload: Cell::new(false),
            content_ready: Cell::new(false),
            transition: options.transition.clone().or_else(|| class.0.transition.clone()),
            leave_mode: Cell::new(LeaveMode::default()),
        }));
        register_component(&component);

        component.init_source_slots(true);
        component.register_source_events();
        component.to_phase(Phase::Compiled);

        if let Some(scope) = component.0.scope.clone() {
            for bind in &component.0.binds {
                let value = scope.get(&bind.expr);
                if !value.is_null() {
                    component.0.data.set(&Expr::path(&[bind.name.as_str()]), value, None);
                }
            }
        }

        if let Some(types) = &class.0.data_types {
            let label = options.sub_tag.as_deref().unwrap_or(class.name());
            component.0.data.set_type_checker(types.for_component(label));
            if config().type_checking {
                if let Err(diagnostic) = component.0.data.check_data_types() {
                    if let Err(err) = diagnostics::escalate(diagnostic) {
                        release_component(id);
                        return Err(err);
                    }
                }
            }
        }

        for name in class.computed_names() {
            let done = component.0.computed_deps.borrow().contains_key(&name);
            if !done {
                component.calc_computed(&name);
            }
        }

        let weak = Rc::downgrade(&component.0);
        component.0.data.listen(move |change| {
            if let Some(inner) = weak.upgrade() {
                Component(inner).data_changer(change);
            }
        });
        component.to_phase(Phase::Inited);

        if let Some(el) = options.el {
            component.0.el.set(Some(el));
            component.adopt_children(el)?;
            component.attached();
        } else if let Some(walker) = walker {
            component.adopt_from(walker)?;
        }

        Ok(component)
    }

    /// Take the node at the walker's cursor as the root element, or insert
    /// one (or a placeholder) there.
    fn adopt_from(&self, walker: &mut ReverseWalker) -> Result<()> {
        let r = renderer();
        if self.if_passes() {
            let existing = walker
                .current()
                .filter(|n| r.kind(*n) == Some(DomKind::Element));
            let el = match existing {
                Some(el) => {
                    walker.go_next();
                    el
                }
                None => {
                    let el = self.create_el();
                    walker.insert(el);
                    el
                }
            };
            self.0.el.set(Some(el));
            self.adopt_children(el)?;
        } else {
            let placeholder = r.create_comment(&self.0.id.to_string());
            walker.insert(placeholder);
            self.0.el.set(Some(placeholder));
        }
        self.attached();
        Ok(())
    }

    pub(crate) fn from_inner(inner: Rc<ComponentInner>) -> Self {
        Component(inner)
    }

    pub(crate) fn inner(&self) -> &Rc<ComponentInner> {
        &self.0
    }

    // =========================================================================
    // Lifecycle
    // =========================================================================

    /// Enter `phase`. Reaching a phase twice does nothing, except for
    /// `updated`, whose hook runs on every flush.
    pub(crate) fn to_phase(&self, phase: Phase) {
        if phase
            .flag()
            .is_some_and(|flag| self.0.lifecycle.get().contains(flag))
        {
            return;
        }
        if let Some(state) = phase.state() {
            self.0.lifecycle.set(state);
        }
        self.0.phase.set(phase);
        tracing::debug!(id = %self.0.id, component = self.0.class.name(), %phase, "lifecycle");

        if let Some(hook) = self.0.class.hook(phase) {
            hook(self);
        }
        self.0.after.set(self.0.after.get() | phase.after_bit());
    }

    /// Whether the hook of `phase` has completed at least once.
    pub(crate) fn has_after(&self, phase: Phase) -> bool {
        self.0.after.get() & phase.after_bit() != 0
    }

    pub fn lifecycle(&self) -> Lifecycle {
        self.0.lifecycle.get()
    }

    /// Most recently entered phase.
    pub fn phase(&self) -> Phase {
        self.0.phase.get()
    }

    /// Root `if` directive, evaluated on the component's data.
    pub(crate) fn if_passes(&self) -> bool {
        match &self.0.template.directives().if_ {
            Some(expr) => self.0.data.get(expr).is_truthy(),
            None => true,
        }
    }

    // =========================================================================
    // Accessors
    // =========================================================================

    pub fn id(&self) -> ComponentId {
        self.0.id
    }

    pub fn class(&self) -> &ComponentClass {
        &self.0.class
    }

    /// Tag of the root element.
    pub fn tag(&self) -> &str {
        &self.0.tag
    }

    /// Own data store.
    pub fn data(&self) -> &Rc<DataStore> {
        &self.0.data
    }

    /// Caller scope the bindings read from.
    pub fn scope(&self) -> Option<Rc<DataStore>> {
        self.0.scope.clone()
    }

    pub fn owner_id(&self) -> Option<ComponentId> {
        self.0.owner
    }

    /// Owning component, if it is still alive.
    pub fn owner(&self) -> Option<Component> {
        self.0.owner.and_then(get_component)
    }

    /// Nearest component above in the render tree (the owner for
    /// components created by hand).
    pub fn parent_component(&self) -> Option<Component> {
        self.0.parent_component.and_then(get_component)
    }

    /// Root node: the element, or the placeholder comment while the root
    /// `if` is falsy.
    pub fn el(&self) -> Option<DomHandle> {
        self.0.el.get()
    }

    pub fn binds(&self) -> &[Binding] {
        &self.0.binds
    }

    pub(crate) fn source(&self) -> Option<Rc<TemplateNode>> {
        self.0.source.borrow().clone()
    }

    /// Slot outlets registered by the rendered template.
    pub fn slot_children(&self) -> Vec<Rc<SlotNode>> {
        self.0.slot_children.borrow().clone()
    }

    /// Evaluated `ref` directive of the use site.
    pub(crate) fn ref_name(&self) -> Option<String> {
        let source = self.source()?;
        let expr = source.directives().ref_.as_ref()?;
        let scope = self.0.scope.as_ref()?;
        Some(scope.get(expr).to_string())
    }

    pub(crate) fn child_ctx(&self) -> NodeContext {
        NodeContext {
            owner: self.0.id,
            scope: self.0.data.clone(),
            parent_component: self.0.id,
        }
    }

    pub fn ptr_eq(&self, other: &Component) -> bool {
        Rc::ptr_eq(&self.0, &other.0)
    }

    // =========================================================================
    // Data
    // =========================================================================

    /// Value at `path` in the component's data.
    pub fn get(&self, path: &str) -> Result<Value> {
        Ok(self.0.data.get(&parse_expr(path)?))
    }

    pub fn set(&self, path: &str, value: impl Into<Value>) -> Result<()> {
        self.0.data.set(&parse_expr(path)?, value.into(), None);
        Ok(())
    }

    /// Splice the array at `path`, returning the removed items.
    pub fn splice(
        &self,
        path: &str,
        index: usize,
        delete_count: usize,
        insertions: Vec<Value>,
    ) -> Result<Vec<Value>> {
        Ok(self
            .0
            .data
            .splice(&parse_expr(path)?, index, delete_count, insertions, None))
    }

    pub fn push(&self, path: &str, value: impl Into<Value>) -> Result<()> {
        self.0.data.push(&parse_expr(path)?, value.into(), None);
        Ok(())
    }

    pub fn pop(&self, path: &str) -> Result<Option<Value>> {
        Ok(self.0.data.pop(&parse_expr(path)?, None))
    }

    pub fn remove_at(&self, path: &str, index: usize) -> Result<Option<Value>> {
        Ok(self.0.data.remove_at(&parse_expr(path)?, index, None))
    }

    /// Call `listener` with the new value whenever a change touches `path`.
    pub fn watch(
        &self,
        path: &str,
        listener: impl Fn(&Value, &Change) + 'static,
    ) -> Result<ListenerId> {
        let expr = parse_expr(path)?;
        let data = Rc::downgrade(&self.0.data);
        Ok(self.0.data.listen(move |change| {
            let Some(data) = data.upgrade() else {
                return;
            };
            if relation(change, &expr, &data).is_related() {
                listener(&data.get(&expr), change);
            }
        }))
    }

    /// Call a class method. Returns `false` when the class has no such
    /// method.
    pub fn call(&self, method: &str, args: &[Value]) -> bool {
        match self.0.class.method(method) {
            Some(method) => {
                method(self, args);
                true
            }
            None => false,
        }
    }

    /// Run `task` on the next flush.
    pub fn next_tick(&self, task: impl FnOnce() + 'static) {
        next_tick(task);
    }
}

impl std::fmt::Debug for Component {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Component")
            .field("id", &self.0.id)
            .field("class", &self.0.class.name())
            .field("phase", &self.0.phase.get())
            .field("children", &self.0.children.borrow().len())
            .finish()
    }
}

/// Copy the keys of `extra` over `base`. A non-object `base` is replaced.
fn merge_object(base: &mut Value, extra: Value) {
    match (base, extra) {
        (Value::Object(base), Value::Object(extra)) => {
            for (key, value) in extra {
                base.insert(key, value);
            }
        }
        (base, Value::Object(extra)) => *base = Value::Object(extra),
        _ => {}
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::RefCell;

    use serde_json::json;

    use crate::dom::reset_renderer;
    use crate::engine::{flush_pending, reset_scheduler};

    fn counter() -> ComponentClass {
        ComponentClass::builder("x-counter")
            .template(
                TemplateNode::element("button")
                    .prop("title", parse_expr("label").unwrap())
                    .child(TemplateNode::text(parse_expr("count").unwrap())),
            )
            .init_data(|| Value::from(json!({"count": 0, "label": "go"})))
            .method("increment", |me, _| {
                let next = me.get("count").ok().and_then(|v| v.as_f64()).unwrap_or(0.0) + 1.0;
                let _ = me.set("count", next);
            })
            .build()
    }

    #[test]
    fn test_new_reaches_inited_without_attach() {
        let c = Component::new(&counter(), ComponentOptions::new()).unwrap();
        assert_eq!(c.phase(), Phase::Inited);
        assert!(c.el().is_none());
        assert_eq!(c.get("count").unwrap(), Value::from(0));
    }

    #[test]
    fn test_options_data_overrides_init_data() {
        let options = ComponentOptions::new().data(json!({"count": 5}));
        let c = Component::new(&counter(), options).unwrap();
        assert_eq!(c.get("count").unwrap(), Value::from(5));
        assert_eq!(c.get("label").unwrap(), Value::from("go"));
    }

    #[test]
    fn test_attach_renders_and_flush_patches() {
        let dom = reset_renderer();
        reset_scheduler();
        let root = dom.create_root("body");

        let c = Component::new(&counter(), ComponentOptions::new()).unwrap();
        c.attach(root, None).unwrap();
        assert_eq!(dom.to_html(root), "<body><button title=\"go\">0</button></body>");

        assert!(c.call("increment", &[]));
        assert!(c.has_pending_changes());
        flush_pending();
        assert_eq!(dom.to_html(root), "<body><button title=\"go\">1</button></body>");

        c.set("label", "stop").unwrap();
        flush_pending();
        assert_eq!(dom.attr(c.el().unwrap(), "title"), Some(Value::from("stop")));
    }

    #[test]
    fn test_watch_reports_new_value() {
        let c = Component::new(&counter(), ComponentOptions::new()).unwrap();
        let seen = Rc::new(RefCell::new(Vec::new()));
        let seen_clone = seen.clone();
        c.watch("count", move |value, _| seen_clone.borrow_mut().push(value.clone()))
            .unwrap();

        c.set("count", 3).unwrap();
        c.set("label", "x").unwrap();
        assert_eq!(*seen.borrow(), vec![Value::from(3)]);
    }

    #[test]
    fn test_root_if_swaps_element_and_placeholder() {
        let dom = reset_renderer();
        reset_scheduler();
        let root = dom.create_root("body");

        let class = ComponentClass::builder("x-maybe")
            .template(TemplateNode::element("p").if_(parse_expr("shown").unwrap()))
            .init_data(|| Value::from(json!({"shown": false})))
            .build();
        let c = Component::new(&class, ComponentOptions::new()).unwrap();
        c.attach(root, None).unwrap();
        assert_eq!(renderer().kind(c.el().unwrap()), Some(DomKind::Comment));

        c.set("shown", true).unwrap();
        flush_pending();
        assert_eq!(renderer().kind(c.el().unwrap()), Some(DomKind::Element));
        assert_eq!(dom.to_html(root), "<body><p></p></body>");
    }

    #[test]
    fn test_deny_policy_fails_construction_on_schema_error() {
        use crate::config::{reset_config, set_diagnostic_policy, DiagnosticPolicy};
        use crate::diagnostics::Diagnostic;
        use crate::engine::{live_count, reset_registry};
        use crate::error::CoreError;
        use crate::store::{DataType, DataTypes};

        reset_config();
        reset_registry();
        set_diagnostic_policy(DiagnosticPolicy::Deny);

        let class = ComponentClass::builder("x-typed")
            .init_data(|| Value::from(json!({"count": "many"})))
            .data_types(DataTypes::new("x-typed").field("count", DataType::Number))
            .build();

        match Component::new(&class, ComponentOptions::new()) {
            Err(CoreError::Diagnostic(Diagnostic::SchemaMismatch { key, .. })) => {
                assert_eq!(key, "count")
            }
            Err(other) => panic!("unexpected error: {other}"),
            Ok(_) => panic!("construction should fail under deny"),
        }
        assert_eq!(live_count(), 0);

        set_diagnostic_policy(DiagnosticPolicy::Warn);
        assert!(Component::new(&class, ComponentOptions::new()).is_ok());
        reset_config();
    }
}
