//! Render pipeline.
//!
//! ```text
//! refresh data props → stylesheet + render() → sanitize → write into target
//!                    → re-bind listeners → on_render
//! ```
//!
//! The target is the shadow root when the kind asks for one, otherwise the
//! element itself. Nothing happens before the element is initialized.

use tracing::trace;

use super::Element;
use crate::dom::{sanitize, Document, NodeId, SanitizeOptions};
use crate::error::{Error, Result};
use crate::types::Value;

impl Element {
    /// Run the full render pipeline. No-op unless initialized.
    pub fn do_render(&self) -> Result<()> {
        if !self.is_initialized() {
            return Ok(());
        }

        self.refresh_data_props()?;
        let markup = self.compose_markup()?;
        let safe = sanitize(&markup, &SanitizeOptions::default());

        let doc = self.document()?;
        let target = self.render_target(&doc);
        trace!(tag = self.tag_name(), bytes = safe.len(), "rendering");
        doc.set_inner_html(target, &safe)?;

        self.0.listeners.borrow_mut().rendered(&doc, target);
        self.0.component.on_render(self);
        Ok(())
    }

    fn compose_markup(&self) -> Result<String> {
        self.0.render_count.set(self.0.render_count.get() + 1);
        let body = self
            .0
            .component
            .render(self)
            .map_err(|err| self.attribute_render_error(err))?;

        let css = self.css_block();
        let mut markup = String::with_capacity(css.len() + body.len());
        markup.push_str(css);
        markup.push_str(&body);
        Ok(markup)
    }

    /// Fill in the tag of a render error raised by this element's component.
    fn attribute_render_error(&self, err: Error) -> Error {
        match err {
            Error::Render { tag, reason } if tag.is_empty() => Error::Render {
                tag: self.tag_name().to_string(),
                reason,
            },
            other => other,
        }
    }

    /// `<style>…</style>` for the kind's stylesheet, built once per instance.
    /// Empty when the kind has no stylesheet.
    pub fn css_block(&self) -> &str {
        self.0.css_block.get_or_init(|| {
            let css = self.0.definition.css;
            if css.is_empty() {
                String::new()
            } else {
                format!("<style>{css}</style>")
            }
        })
    }

    /// Node renders are written into.
    pub fn render_target(&self, doc: &Document) -> NodeId {
        if self.0.definition.shadow_dom {
            doc.shadow_root(self.0.node).unwrap_or(self.0.node)
        } else {
            self.0.node
        }
    }

    /// See [`template_map`].
    pub fn template_map<F>(&self, items: &Value, f: F) -> String
    where
        F: FnMut(&Value) -> String,
    {
        template_map(items, f)
    }
}

/// Render each element of `items` with `f` and concatenate without separator.
/// Non-arrays render nothing.
pub fn template_map<F>(items: &Value, f: F) -> String
where
    F: FnMut(&Value) -> String,
{
    items
        .to_vec()
        .unwrap_or_default()
        .iter()
        .map(f)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::element::{Component, CustomElement};
    use pretty_assertions::assert_eq;
    use std::cell::Cell;

    #[derive(Default)]
    struct Styled {
        rendered: Cell<usize>,
        fail: Cell<bool>,
    }

    impl Component for Styled {
        fn render(&self, el: &Element) -> Result<String> {
            if self.fail.get() {
                return Err(Error::render("no data"));
            }
            Ok(format!(
                r#"<p onclick="x()">{}</p><script>alert(1)</script>"#,
                el.get("label")
            ))
        }

        fn on_render(&self, _el: &Element) {
            self.rendered.set(self.rendered.get() + 1);
        }
    }

    impl CustomElement for Styled {
        const TAG_NAME: &'static str = "styled-el";
        const OBSERVED_ATTRIBUTES: &'static [&'static str] = &["label"];
        const CSS: &'static str = "p { color: red; }";
    }

    #[derive(Default)]
    struct Shadowed;

    impl Component for Shadowed {
        fn render(&self, _el: &Element) -> Result<String> {
            Ok("<p>in shadow</p>".into())
        }
    }

    impl CustomElement for Shadowed {
        const TAG_NAME: &'static str = "shadowed-el";
        const SHADOW_DOM: bool = true;
    }

    fn mount<T: CustomElement>(doc: &Document) -> Element {
        doc.define::<T>().unwrap();
        let node = doc.create_element(T::TAG_NAME).unwrap();
        doc.append_child(doc.body(), node).unwrap();
        doc.element(node).unwrap()
    }

    #[test]
    fn test_output_is_stylesheet_plus_sanitized_render() {
        let doc = Document::new();
        let el = mount::<Styled>(&doc);

        el.set("label", "hi").unwrap();

        assert_eq!(
            el.inner_html().unwrap(),
            "<style>p { color: red; }</style><p>hi</p>"
        );
        assert_eq!(el.css_block(), "<style>p { color: red; }</style>");
        assert_eq!(el.component::<Styled>().unwrap().rendered.get(), 2);
    }

    #[test]
    fn test_render_error_carries_tag_and_skips_write() {
        let doc = Document::new();
        let el = mount::<Styled>(&doc);
        el.set("label", "kept").unwrap();

        el.component::<Styled>().unwrap().fail.set(true);
        let err = el.set("label", "lost").unwrap_err();

        assert_eq!(err, Error::Render {
            tag: "styled-el".into(),
            reason: "no data".into(),
        });
        assert!(el.inner_html().unwrap().contains("kept"));
        // The value itself was stored
        assert_eq!(el.get("label"), Value::from("lost"));
    }

    #[test]
    fn test_shadow_render_target() {
        let doc = Document::new();
        let el = mount::<Shadowed>(&doc);

        let shadow = el.shadow_root().unwrap().unwrap();
        assert_eq!(el.render_target(&doc), shadow);
        assert_eq!(el.inner_html().unwrap(), "");
        assert_eq!(doc.inner_html(shadow), "<p>in shadow</p>");
    }

    #[test]
    fn test_render_before_connect_is_noop() {
        let doc = Document::new();
        doc.define::<Styled>().unwrap();
        let el = doc.element(doc.create_element("styled-el").unwrap()).unwrap();

        el.do_render().unwrap();

        assert_eq!(el.render_count(), 0);
        assert_eq!(el.inner_html().unwrap(), "");
    }

    #[test]
    fn test_template_map() {
        let items = Value::array(["Milk", "Eggs"]);

        assert_eq!(template_map(&items, |item| format!("<li>{item}</li>")), "<li>Milk</li><li>Eggs</li>");
        assert_eq!(template_map(&Value::array(Vec::<Value>::new()), |_| "x".into()), "");
        assert_eq!(template_map(&Value::from("Milk"), |_| "x".into()), "");
    }
}
