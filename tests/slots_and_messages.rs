//! Slot distribution, refs and upward messages across component boundaries.

use std::cell::RefCell;
use std::rc::Rc;

use serde_json::json;
use spark_view::dom::{reset_renderer, DomHandle, MemoryDom};
use spark_view::engine::{flush_pending, reset_registry, reset_scheduler};
use spark_view::expr::{parse_expr, Expr};
use spark_view::view::{Component, ComponentClass, ComponentOptions, RefTarget, TemplateNode};
use spark_view::Value;

// =============================================================================
// HELPERS
// =============================================================================

fn setup() -> (Rc<MemoryDom>, DomHandle) {
    let dom = reset_renderer();
    reset_scheduler();
    reset_registry();
    let root = dom.create_root("body");
    (dom, root)
}

fn expr(text: &str) -> Expr {
    parse_expr(text).unwrap()
}

fn child_component(parent: &Component, index: usize) -> Component {
    parent.children()[index]
        .as_component()
        .cloned()
        .expect("child component")
}

// =============================================================================
// SLOTS
// =============================================================================

fn card_app() -> ComponentClass {
    let card = ComponentClass::builder("x-card")
        .template(TemplateNode::element("article").children([
            TemplateNode::element("h2").child(TemplateNode::slot().named(expr("'title'"))),
            TemplateNode::slot(),
        ]))
        .build();

    ComponentClass::builder("x-app")
        .template(
            TemplateNode::element("div").child(TemplateNode::component("x-card").children([
                TemplateNode::element("span")
                    .named(expr("which"))
                    .child(TemplateNode::static_text("heading")),
                TemplateNode::element("p").child(TemplateNode::text(expr("body"))),
            ])),
        )
        .component("x-card", &card)
        .init_data(|| Value::from(json!({"which": "title", "body": "hello", "other": 1})))
        .build()
}

#[test]
fn test_slot_content_is_distributed_by_name() {
    let (dom, root) = setup();

    let app = Component::new(&card_app(), ComponentOptions::new()).unwrap();
    app.attach(root, None).unwrap();
    let card = child_component(&app, 0);

    assert_eq!(
        dom.to_html(root),
        "<body><div><article><h2><!--s-slot:title--><span>heading</span><!--s-slot:title--></h2>\
         <!--s-slot--><p>hello</p><!--s-slot--></article></div></body>"
    );

    let titled = card.slot(Some("title"));
    assert_eq!(titled.len(), 1);
    assert!(titled[0].is_inserted());
    assert_eq!(titled[0].name(), Some("title"));
    assert_eq!(card.slot(None).len(), 1);
    assert!(card.slot(Some("missing")).is_empty());
}

#[test]
fn test_unrelated_change_keeps_slot_identity() {
    let (dom, root) = setup();

    let app = Component::new(&card_app(), ComponentOptions::new()).unwrap();
    app.attach(root, None).unwrap();
    let card = child_component(&app, 0);
    let before = card.slot(None)[0].clone();

    app.set("other", 2).unwrap();
    flush_pending();
    assert!(Rc::ptr_eq(&before, &card.slot(None)[0]));

    app.set("body", "bye").unwrap();
    flush_pending();
    assert!(Rc::ptr_eq(&before, &card.slot(None)[0]));
    assert_eq!(dom.text_content(root), "headingbye");
}

#[test]
fn test_slot_name_change_repaints() {
    let (dom, root) = setup();

    let app = Component::new(&card_app(), ComponentOptions::new()).unwrap();
    app.attach(root, None).unwrap();
    let card = child_component(&app, 0);
    let anonymous = card.slot(None)[0].clone();

    app.set("which", "nowhere").unwrap();
    flush_pending();

    assert!(anonymous.is_disposed());
    assert!(card.slot(Some("title")).is_empty());
    let fresh = card.slot(None);
    assert_eq!(fresh.len(), 1);
    assert!(!Rc::ptr_eq(&anonymous, &fresh[0]));
    assert_eq!(dom.text_content(root), "hello");
}

// =============================================================================
// REFS
// =============================================================================

#[test]
fn test_ref_finds_elements_and_components() {
    let (_dom, root) = setup();

    let leaf = ComponentClass::builder("x-leaf")
        .template(TemplateNode::element("i"))
        .build();
    let app = ComponentClass::builder("x-app")
        .template(TemplateNode::element("div").children([
            TemplateNode::element("section")
                .child(TemplateNode::element("input").ref_(expr("'field'"))),
            TemplateNode::component("x-leaf").ref_(expr("'leaf'")),
        ]))
        .component("x-leaf", &leaf)
        .build();

    let c = Component::new(&app, ComponentOptions::new()).unwrap();
    c.attach(root, None).unwrap();

    let field = c.ref_("field").and_then(|t| t.as_element());
    assert!(field.is_some());

    match c.ref_("leaf") {
        Some(RefTarget::Component(found)) => assert_eq!(found.class().name(), "x-leaf"),
        other => panic!("expected component ref, got element: {}", other.is_some()),
    }
    assert!(c.ref_("nothing").is_none());
}

// =============================================================================
// MESSAGES
// =============================================================================

type Inbox = Rc<RefCell<Vec<(String, String, Value)>>>;

fn message_tree(inbox: Inbox, panel_receives: bool) -> ComponentClass {
    let button = ComponentClass::builder("x-button")
        .template(TemplateNode::element("button"))
        .build();

    let panel_inbox = inbox.clone();
    let mut panel = ComponentClass::builder("x-panel")
        .template(TemplateNode::element("section").child(TemplateNode::component("x-button")))
        .component("x-button", &button);
    if panel_receives {
        panel = panel.message("pick", move |me, msg| {
            panel_inbox.borrow_mut().push((
                me.class().name().to_string(),
                msg.target.class().name().to_string(),
                msg.value.clone(),
            ));
        });
    }
    let panel = panel.build();

    ComponentClass::builder("x-app")
        .template(TemplateNode::element("main").child(TemplateNode::component("x-panel")))
        .component("x-panel", &panel)
        .message("pick", move |me, msg| {
            inbox.borrow_mut().push((
                me.class().name().to_string(),
                msg.target.class().name().to_string(),
                msg.value.clone(),
            ));
        })
        .build()
}

#[test]
fn test_dispatch_reaches_nearest_receiver() {
    let (_dom, root) = setup();

    let inbox: Inbox = Rc::new(RefCell::new(Vec::new()));
    let app = Component::new(&message_tree(inbox.clone(), false), ComponentOptions::new()).unwrap();
    app.attach(root, None).unwrap();
    let button = child_component(&child_component(&app, 0), 0);

    button.dispatch("pick", 7);
    assert_eq!(
        *inbox.borrow(),
        vec![("x-app".to_string(), "x-button".to_string(), Value::from(7))]
    );

    let inbox: Inbox = Rc::new(RefCell::new(Vec::new()));
    let app = Component::new(&message_tree(inbox.clone(), true), ComponentOptions::new()).unwrap();
    app.attach(root, None).unwrap();
    let button = child_component(&child_component(&app, 0), 0);

    button.dispatch("pick", "x");
    assert_eq!(
        *inbox.borrow(),
        vec![("x-panel".to_string(), "x-button".to_string(), Value::from("x"))]
    );
}

#[test]
fn test_dispatch_without_receiver_is_dropped() {
    let (_dom, root) = setup();

    let inbox: Inbox = Rc::new(RefCell::new(Vec::new()));
    let app = Component::new(&message_tree(inbox.clone(), true), ComponentOptions::new()).unwrap();
    app.attach(root, None).unwrap();
    let button = child_component(&child_component(&app, 0), 0);

    button.dispatch("unheard", Value::Null);
    assert!(inbox.borrow().is_empty());
}

// =============================================================================
// SOURCE EVENTS
// =============================================================================

#[test]
fn test_declared_event_calls_owner_method() {
    let (_dom, root) = setup();

    let calls = Rc::new(RefCell::new(Vec::new()));
    let calls_clone = calls.clone();

    let item = ComponentClass::builder("x-item")
        .template(TemplateNode::element("li"))
        .build();
    let list = ComponentClass::builder("x-list")
        .template(TemplateNode::element("ul").children([
            TemplateNode::component("x-item").on("remove", "removeItem"),
            TemplateNode::component("x-item").on_with(
                "remove",
                "removeItem",
                vec![expr("label"), expr("$event")],
            ),
        ]))
        .component("x-item", &item)
        .init_data(|| Value::from(json!({"label": "todo"})))
        .method("removeItem", move |_, args| calls_clone.borrow_mut().push(args.to_vec()))
        .build();

    let c = Component::new(&list, ComponentOptions::new()).unwrap();
    c.attach(root, None).unwrap();

    child_component(&c, 0).fire("remove", 1);
    child_component(&c, 1).fire("remove", 2);

    assert_eq!(
        *calls.borrow(),
        vec![
            vec![Value::from(1)],
            vec![Value::from("todo"), Value::from(2)],
        ]
    );
}
