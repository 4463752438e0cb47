//! Selector-based DOM listeners.
//!
//! Renders replace the element's content, so listeners are declared against a
//! selector and re-bound to the fresh matching nodes after every render. On
//! disconnect all bindings are dropped from the document.

use tracing::trace;

use super::Element;
use crate::dom::{Document, EventHandler, HandlerId, NodeId, Selector};

struct ListenerBinding {
    selector: Selector,
    event_type: String,
    handler: EventHandler,
}

/// Declared listeners plus the handler ids currently bound in the document.
pub(crate) struct EventListenerRegistry {
    bindings: Vec<ListenerBinding>,
    bound: Vec<HandlerId>,
}

impl EventListenerRegistry {
    pub fn new() -> Self {
        Self {
            bindings: Vec::new(),
            bound: Vec::new(),
        }
    }

    fn add(&mut self, selector: &str, event_type: &str, handler: EventHandler) -> usize {
        self.bindings.push(ListenerBinding {
            selector: Selector::parse(selector),
            event_type: event_type.to_string(),
            handler,
        });
        self.bindings.len() - 1
    }

    fn bind(&mut self, doc: &Document, target: NodeId, binding: usize) {
        let Some(binding) = self.bindings.get(binding) else { return };
        for node in doc.select(target, &binding.selector) {
            let id = doc.add_event_listener(node, &binding.event_type, binding.handler.clone());
            self.bound.push(id);
        }
    }

    /// Re-bind every declared listener to the nodes under `target`.
    pub fn rendered(&mut self, doc: &Document, target: NodeId) {
        self.removed(doc);
        for binding in 0..self.bindings.len() {
            self.bind(doc, target, binding);
        }
    }

    /// Drop every bound handler from the document.
    pub fn removed(&mut self, doc: &Document) {
        for id in self.bound.drain(..) {
            doc.remove_event_listener(id);
        }
    }

    pub fn bound_count(&self) -> usize {
        self.bound.len()
    }
}

impl Element {
    /// Listen for `event_type` on rendered nodes matching `selector`.
    ///
    /// Binds to the current content right away when the element is
    /// initialized, and again after every render.
    pub fn add_event_listener(&self, selector: &str, event_type: &str, handler: EventHandler) {
        let binding = self.0.listeners.borrow_mut().add(selector, event_type, handler);
        trace!(
            tag = self.tag_name(),
            selector,
            event_type,
            initialized = self.is_initialized(),
            "listener added"
        );
        if !self.is_initialized() {
            return;
        }
        if let Ok(doc) = self.document() {
            let target = self.render_target(&doc);
            self.0.listeners.borrow_mut().bind(&doc, target, binding);
        }
    }

    /// Handlers currently bound in the document on behalf of this element.
    pub fn bound_listener_count(&self) -> usize {
        self.0.listeners.borrow().bound_count()
    }
}

#[cfg(test)]
mod tests {
    use crate::dom::{Document, Event};
    use crate::element::{Component, CustomElement, Element};
    use crate::error::Result;
    use crate::types::Value;
    use std::rc::Rc;

    #[derive(Default)]
    struct Counter;

    impl Component for Counter {
        fn defaults(&self) -> Vec<(&'static str, Value)> {
            vec![("count", Value::from(0))]
        }

        fn render(&self, el: &Element) -> Result<String> {
            Ok(format!(
                r#"<span>{}</span><button class="inc">+</button><button class="dec">-</button>"#,
                el.get("count")
            ))
        }

        fn on_init(&self, el: &Element) {
            let weak = el.downgrade();
            el.add_event_listener(
                "button.inc",
                "click",
                Rc::new(move |_: &Event| -> Result<bool> {
                    if let Some(el) = weak.upgrade() {
                        let next = el.get("count").as_f64().unwrap_or(0.0) + 1.0;
                        el.set("count", next)?;
                    }
                    Ok(true)
                }),
            );
        }
    }

    impl CustomElement for Counter {
        const TAG_NAME: &'static str = "click-counter";
        const OBSERVED_ATTRIBUTES: &'static [&'static str] = &["count"];
    }

    fn setup() -> (Document, Element) {
        let doc = Document::new();
        doc.define::<Counter>().unwrap();
        let node = doc.create_element("click-counter").unwrap();
        doc.append_child(doc.body(), node).unwrap();
        let el = doc.element(node).unwrap();
        (doc, el)
    }

    fn click(doc: &Document, el: &Element, selector: &str) -> bool {
        let button = doc.query_selector(el.node(), selector).unwrap();
        doc.dispatch_event(button, "click", Value::Null).unwrap()
    }

    #[test]
    fn test_listener_bound_after_init() {
        let (doc, el) = setup();

        assert_eq!(el.bound_listener_count(), 1);
        assert!(click(&doc, &el, "button.inc"));
        assert_eq!(el.get("count"), Value::from(1));
    }

    #[test]
    fn test_listener_rebound_after_render() {
        let (doc, el) = setup();

        click(&doc, &el, "button.inc");
        click(&doc, &el, "button.inc");

        assert_eq!(el.get("count"), Value::from(2));
        assert_eq!(el.bound_listener_count(), 1);
        assert_eq!(doc.listener_count(), 1);
        assert!(el.inner_html().unwrap().starts_with("<span>2</span>"));
    }

    #[test]
    fn test_unmatched_selector_is_not_bound() {
        let (doc, el) = setup();

        assert!(!click(&doc, &el, "button.dec"));
        assert_eq!(el.get("count"), Value::from(0));
    }

    #[test]
    fn test_listener_declared_before_connect_binds_on_first_render() {
        let doc = Document::new();
        doc.define::<Counter>().unwrap();
        let node = doc.create_element("click-counter").unwrap();
        let el = doc.element(node).unwrap();

        el.add_event_listener("button.dec", "click", Rc::new(|_: &Event| -> Result<bool> { Ok(true) }));
        assert_eq!(el.bound_listener_count(), 0);

        doc.append_child(doc.body(), node).unwrap();

        // dec declared here, inc declared by on_init
        assert_eq!(el.bound_listener_count(), 2);
        assert!(click(&doc, &el, "button.dec"));
    }

    #[test]
    fn test_disconnect_unbinds() {
        let (doc, el) = setup();

        doc.remove(el.node()).unwrap();

        assert_eq!(el.bound_listener_count(), 0);
        assert_eq!(doc.listener_count(), 0);
    }
}
