//! Component classes.
//!
//! A class bundles the template, initial data, computed properties,
//! messages, methods, hooks and child component registry shared by all of
//! its instances. Reserved-name validation happens once, in
//! [`ComponentClassBuilder::build`], instead of on every construction.

use std::cell::Cell;
use std::collections::HashMap;
use std::rc::Rc;

use indexmap::IndexMap;

use crate::diagnostics::{self, Diagnostic};
use crate::error::{CoreError, Result};
use crate::store::DataTypes;
use crate::types::Value;
use crate::view::lifecycle::Phase;
use crate::view::template::TemplateNode;
use crate::view::types::{ComputedFn, HookFn, InitDataFn, Message, MessageFn, MethodFn, Transition};

use super::{Component, ComputedScope};

/// Names of framework operations on [`Component`].
const RESERVED: &[&str] = &[
    "on", "un", "fire", "watch", "dispatch", "slot", "ref", "attach", "detach", "dispose",
    "data", "get", "set", "splice", "next_tick", "nextTick", "id", "owner", "el", "update",
    "lifecycle", "phase", "call",
];

pub(crate) struct ClassDef {
    pub(crate) name: String,
    pub(crate) template: Rc<TemplateNode>,
    pub(crate) init_data: Option<InitDataFn>,
    pub(crate) computed: IndexMap<String, ComputedFn>,
    pub(crate) messages: HashMap<String, MessageFn>,
    pub(crate) methods: HashMap<String, MethodFn>,
    pub(crate) hooks: HashMap<Phase, HookFn>,
    pub(crate) components: HashMap<String, ComponentClass>,
    pub(crate) data_types: Option<DataTypes>,
    pub(crate) transition: Option<Transition>,
    components_checked: Cell<bool>,
}

/// Shared component definition.
#[derive(Clone)]
pub struct ComponentClass(pub(crate) Rc<ClassDef>);

impl ComponentClass {
    pub fn builder(name: &str) -> ComponentClassBuilder {
        ComponentClassBuilder {
            def: ClassDef {
                name: name.to_string(),
                template: Rc::new(TemplateNode::element("div")),
                init_data: None,
                computed: IndexMap::new(),
                messages: HashMap::new(),
                methods: HashMap::new(),
                hooks: HashMap::new(),
                components: HashMap::new(),
                data_types: None,
                transition: None,
                components_checked: Cell::new(false),
            },
        }
    }

    pub fn name(&self) -> &str {
        &self.0.name
    }

    pub fn template(&self) -> &Rc<TemplateNode> {
        &self.0.template
    }

    /// Registered child component class for `tag`.
    pub fn component(&self, tag: &str) -> Option<ComponentClass> {
        self.0.components.get(tag).cloned()
    }

    pub fn ptr_eq(&self, other: &ComponentClass) -> bool {
        Rc::ptr_eq(&self.0, &other.0)
    }

    pub(crate) fn initial_data(&self) -> Value {
        match &self.0.init_data {
            Some(init) => init(),
            None => Value::object(),
        }
    }

    pub(crate) fn hook(&self, phase: Phase) -> Option<HookFn> {
        self.0.hooks.get(&phase).cloned()
    }

    pub(crate) fn method(&self, name: &str) -> Option<MethodFn> {
        self.0.methods.get(name).cloned()
    }

    /// Receiver for `name`, falling back to the `*` receiver.
    pub(crate) fn receiver(&self, name: &str) -> Option<MessageFn> {
        self.0
            .messages
            .get(name)
            .or_else(|| self.0.messages.get("*"))
            .cloned()
    }

    pub(crate) fn computed_fn(&self, name: &str) -> Option<ComputedFn> {
        self.0.computed.get(name).cloned()
    }

    pub(crate) fn computed_names(&self) -> Vec<String> {
        self.0.computed.keys().cloned().collect()
    }

    /// Every component tag in the template must be registered. Checked on
    /// the first instantiation.
    pub(crate) fn check_components(&self) -> Result<()> {
        if self.0.components_checked.get() {
            return Ok(());
        }
        let mut tags = Vec::new();
        self.0.template.component_tags(&mut tags);
        if let Some(tag) = tags.into_iter().find(|t| !self.0.components.contains_key(t)) {
            return Err(CoreError::UnknownComponent {
                tag,
                owner: self.0.name.clone(),
            });
        }
        self.0.components_checked.set(true);
        Ok(())
    }
}

impl std::fmt::Debug for ComponentClass {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ComponentClass")
            .field("name", &self.0.name)
            .field("computed", &self.0.computed.keys().collect::<Vec<_>>())
            .field("methods", &self.0.methods.keys().collect::<Vec<_>>())
            .finish()
    }
}

// =============================================================================
// Builder
// =============================================================================

/// Builder for [`ComponentClass`].
///
/// # Example
///
/// ```ignore
/// let counter = ComponentClass::builder("x-counter")
///     .template(TemplateNode::element("button").child(TemplateNode::text(parse_expr("count")?)))
///     .init_data(|| Value::from(json!({"count": 0})))
///     .method("increment", |me, _| {
///         let next = me.get("count").map(|v| v.as_f64().unwrap_or(0.0) + 1.0);
///         let _ = me.set("count", next.unwrap_or(0.0));
///     })
///     .build();
/// ```
pub struct ComponentClassBuilder {
    def: ClassDef,
}

impl ComponentClassBuilder {
    /// Root template. The root node is the component's own element.
    pub fn template(mut self, template: TemplateNode) -> Self {
        self.def.template = Rc::new(template);
        self
    }

    pub fn init_data(mut self, init: impl Fn() -> Value + 'static) -> Self {
        self.def.init_data = Some(Rc::new(init));
        self
    }

    pub fn computed(
        mut self,
        name: &str,
        compute: impl Fn(&ComputedScope) -> Value + 'static,
    ) -> Self {
        self.def.computed.insert(name.to_string(), Rc::new(compute));
        self
    }

    /// Receiver for messages named `name` (`*` for any).
    pub fn message(
        mut self,
        name: &str,
        receiver: impl Fn(&Component, &Message) + 'static,
    ) -> Self {
        self.def.messages.insert(name.to_string(), Rc::new(receiver));
        self
    }

    pub fn method(mut self, name: &str, method: impl Fn(&Component, &[Value]) + 'static) -> Self {
        self.def.methods.insert(name.to_string(), Rc::new(method));
        self
    }

    pub fn hook(mut self, phase: Phase, hook: impl Fn(&Component) + 'static) -> Self {
        self.def.hooks.insert(phase, Rc::new(hook));
        self
    }

    /// Register a child component class under `tag`.
    pub fn component(mut self, tag: &str, class: &ComponentClass) -> Self {
        self.def.components.insert(tag.to_string(), class.clone());
        self
    }

    pub fn components<'a>(
        mut self,
        classes: impl IntoIterator<Item = (&'a str, &'a ComponentClass)>,
    ) -> Self {
        for (tag, class) in classes {
            self.def.components.insert(tag.to_string(), class.clone());
        }
        self
    }

    pub fn data_types(mut self, data_types: DataTypes) -> Self {
        self.def.data_types = Some(data_types);
        self
    }

    /// Default transition for instances that do not pass their own.
    pub fn transition(mut self, transition: Transition) -> Self {
        self.def.transition = Some(transition);
        self
    }

    /// Finish the class, reporting reserved-name collisions.
    pub fn build(self) -> ComponentClass {
        let def = self.def;

        let mut names: Vec<&str> = def.methods.keys().map(String::as_str).collect();
        names.extend(def.messages.keys().map(String::as_str));
        names.extend(def.computed.keys().map(String::as_str));
        names.sort_unstable();
        names.dedup();

        for name in names.into_iter().filter(|n| RESERVED.contains(n)) {
            diagnostics::report(Diagnostic::ReservedKey {
                component: def.name.clone(),
                key: name.to_string(),
            });
        }

        ComponentClass(Rc::new(def))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{reset_config, set_diagnostic_policy, DiagnosticPolicy};
    use crate::diagnostics::take_diagnostics;

    #[test]
    fn test_reserved_names_reported_once_at_build() {
        reset_config();
        take_diagnostics();
        set_diagnostic_policy(DiagnosticPolicy::Collect);

        let class = ComponentClass::builder("x-bad")
            .method("dispatch", |_, _| {})
            .method("save", |_, _| {})
            .message("fire", |_, _| {})
            .build();

        let found = take_diagnostics();
        assert_eq!(found.len(), 2);
        assert!(found.contains(&Diagnostic::ReservedKey {
            component: "x-bad".into(),
            key: "dispatch".into()
        }));
        assert!(class.method("save").is_some());

        reset_config();
    }

    #[test]
    fn test_unknown_component_tag() {
        let class = ComponentClass::builder("x-list")
            .template(TemplateNode::element("ul").child(TemplateNode::component("x-item")))
            .build();

        let err = class.check_components().unwrap_err();
        assert!(matches!(err, CoreError::UnknownComponent { ref tag, .. } if tag == "x-item"));

        let item = ComponentClass::builder("x-item").build();
        let fixed = ComponentClass::builder("x-list")
            .template(TemplateNode::element("ul").child(TemplateNode::component("x-item")))
            .component("x-item", &item)
            .build();
        assert!(fixed.check_components().is_ok());
    }

    #[test]
    fn test_wildcard_receiver() {
        let class = ComponentClass::builder("x-root")
            .message("*", |_, _| {})
            .message("save", |_, _| {})
            .build();
        assert!(class.receiver("save").is_some());
        assert!(class.receiver("anything").is_some());

        let none = ComponentClass::builder("x-leaf").build();
        assert!(none.receiver("save").is_none());
    }
}
