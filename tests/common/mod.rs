//! Element kinds shared by the integration tests.

#![allow(dead_code)]

use min_element::{Component, CustomElement, Document, Element, Result, Value};

// =============================================================================
// Tracing
// =============================================================================

/// Route crate logs to the test harness output. Safe to call from every test.
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_test_writer()
        .with_max_level(tracing::Level::TRACE)
        .try_init();
}

// =============================================================================
// Element Kinds
// =============================================================================

#[derive(Default)]
pub struct SimpleEl;

impl Component for SimpleEl {
    fn render(&self, _el: &Element) -> Result<String> {
        Ok("<p>This is a simple element</p>".into())
    }
}

impl CustomElement for SimpleEl {
    const TAG_NAME: &'static str = "simple-el";
}

#[derive(Default)]
pub struct AttrsEl;

impl Component for AttrsEl {
    fn defaults(&self) -> Vec<(&'static str, Value)> {
        vec![("first", Value::from("")), ("last", Value::from(""))]
    }

    fn render(&self, el: &Element) -> Result<String> {
        Ok(format!("<p>Name:</p><p>{} {}</p>", el.get("first"), el.get("last")))
    }
}

impl CustomElement for AttrsEl {
    const TAG_NAME: &'static str = "attrs-el";
    const OBSERVED_ATTRIBUTES: &'static [&'static str] = &["first", "last"];
}

#[derive(Default)]
pub struct GroceryList;

pub fn grocery_items() -> Value {
    Value::array(["Milk", "Bread", "Eggs", "Apples"].map(|name| {
        Value::object([("name", Value::from(name)), ("complete", Value::from(false))])
    }))
}

impl Component for GroceryList {
    fn defaults(&self) -> Vec<(&'static str, Value)> {
        vec![
            ("items", grocery_items()),
            ("titleStr", Value::from("Grocery List")),
        ]
    }

    fn render(&self, el: &Element) -> Result<String> {
        let items = el.template_map(&el.get("items"), |item| {
            let complete = item.get_field("complete").is_some_and(|c| c.is_truthy());
            format!(
                "<li>\n    {} {}\n  </li>",
                item.get_field("name").unwrap_or_default(),
                if complete { "COMPLETE" } else { "" }
            )
        });
        Ok(format!("<h3>{}</h3>\n<ul>\n  {items}\n</ul>", el.get("titleStr")))
    }
}

impl CustomElement for GroceryList {
    const TAG_NAME: &'static str = "grocery-list";
    const OBSERVED_ATTRIBUTES: &'static [&'static str] = &["items", "title-str", "store-name"];
}

#[derive(Default)]
pub struct ShadowEl;

impl Component for ShadowEl {
    fn render(&self, _el: &Element) -> Result<String> {
        Ok("<p>This is a simple shadow dom element</p>".into())
    }
}

impl CustomElement for ShadowEl {
    const TAG_NAME: &'static str = "shadow-el";
    const SHADOW_DOM: bool = true;
}

#[derive(Default)]
pub struct JunkFoodList;

impl Component for JunkFoodList {
    fn defaults(&self) -> Vec<(&'static str, Value)> {
        vec![
            ("junkTitle", Value::from("Junk Food!")),
            ("junkItems", Value::array(["fries", "pizza", "hotdog", "cheeseburger"])),
        ]
    }

    fn render(&self, _el: &Element) -> Result<String> {
        Ok(r#"<grocery-list data-title-str="junkTitle" data-items="junkItems"></grocery-list>"#.into())
    }
}

impl CustomElement for JunkFoodList {
    const TAG_NAME: &'static str = "grocery-list-parent";
}

// =============================================================================
// Helpers
// =============================================================================

/// A document with every kind above defined.
pub fn document() -> Document {
    init_tracing();
    let doc = Document::new();
    doc.define::<SimpleEl>().unwrap();
    doc.define::<AttrsEl>().unwrap();
    doc.define::<GroceryList>().unwrap();
    doc.define::<ShadowEl>().unwrap();
    doc.define::<JunkFoodList>().unwrap();
    doc
}

/// Create an element of kind `T` without connecting it.
pub fn create<T: CustomElement>(doc: &Document) -> Element {
    let node = doc.create_element(T::TAG_NAME).unwrap();
    doc.element(node).unwrap()
}

/// Create an element of kind `T` and append it to the body.
pub fn append<T: CustomElement>(doc: &Document) -> Element {
    let el = create::<T>(doc);
    doc.append_child(doc.body(), el.node()).unwrap();
    el
}
