//! Element definitions - the static descriptor of each custom element kind.
//!
//! A kind is a type implementing [`CustomElement`]: associated constants carry
//! the tag name, observed attributes, shadow-DOM flag, stylesheet text and
//! family marker, and [`Component`] carries the render function and hooks.
//! [`Document::define`](crate::Document::define) erases the type into an
//! [`ElementDefinition`] stored in the document's [`DefinitionRegistry`].
//!
//! # Example
//!
//! ```ignore
//! #[derive(Default)]
//! struct AttrsEl;
//!
//! impl Component for AttrsEl {
//!     fn render(&self, el: &Element) -> Result<String> {
//!         Ok(format!("<p>Name:</p><p>{} {}</p>", el.get("first"), el.get("last")))
//!     }
//! }
//!
//! impl CustomElement for AttrsEl {
//!     const TAG_NAME: &'static str = "attrs-el";
//!     const OBSERVED_ATTRIBUTES: &'static [&'static str] = &["first", "last"];
//! }
//!
//! doc.define::<AttrsEl>()?;
//! ```

use std::any::Any;
use std::collections::HashMap;
use std::fmt;
use std::rc::Rc;

use crate::element::Element;
use crate::error::{Error, Result};
use crate::types::Value;

/// Family marker shared by every element built on this crate. Parent-scope
/// lookup only stops at ancestors carrying the same marker.
pub const ELEMENT_FAMILY: &str = "MinFwElement";

/// Names the HTML standard reserves even though they contain a hyphen.
const RESERVED_TAG_NAMES: &[&str] = &[
    "annotation-xml",
    "color-profile",
    "font-face",
    "font-face-src",
    "font-face-uri",
    "font-face-format",
    "font-face-name",
    "missing-glyph",
];

// =============================================================================
// Component Contract
// =============================================================================

/// Per-instance behavior of a custom element.
///
/// All hooks take `&self`; components keep their own mutable bits in `Cell`s.
pub trait Component: 'static {
    /// Markup for the element's content (without the stylesheet block).
    fn render(&self, el: &Element) -> Result<String>;

    /// Initial property values, installed when the instance is created.
    fn defaults(&self) -> Vec<(&'static str, Value)> {
        Vec::new()
    }

    /// Called once per attach, after the first render.
    fn on_init(&self, _el: &Element) {}

    /// Called after every completed render.
    fn on_render(&self, _el: &Element) {}

    /// Called after detach cleanup.
    fn on_disconnect(&self, _el: &Element) {}
}

/// Static descriptor of a custom element kind.
pub trait CustomElement: Component + Default {
    /// Tag name to register under.
    const TAG_NAME: &'static str;

    /// Attribute names mirrored into reactive properties.
    const OBSERVED_ATTRIBUTES: &'static [&'static str] = &[];

    /// Render into an attached shadow root instead of the element itself.
    const SHADOW_DOM: bool = false;

    /// Stylesheet text emitted ahead of every render.
    const CSS: &'static str = "";

    /// Family marker used by parent-scope lookup.
    const ELEMENT_TYPE: &'static str = ELEMENT_FAMILY;
}

// =============================================================================
// Element Definition
// =============================================================================

type Factory = fn() -> (Rc<dyn Component>, Rc<dyn Any>);

/// Type-erased [`CustomElement`].
pub struct ElementDefinition {
    pub tag_name: &'static str,
    pub observed_attributes: &'static [&'static str],
    pub shadow_dom: bool,
    pub css: &'static str,
    pub element_type: &'static str,
    factory: Factory,
}

impl fmt::Debug for ElementDefinition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ElementDefinition")
            .field("tag_name", &self.tag_name)
            .field("observed_attributes", &self.observed_attributes)
            .field("shadow_dom", &self.shadow_dom)
            .field("element_type", &self.element_type)
            .finish_non_exhaustive()
    }
}

impl ElementDefinition {
    pub fn of<T: CustomElement>() -> Self {
        Self {
            tag_name: T::TAG_NAME,
            observed_attributes: T::OBSERVED_ATTRIBUTES,
            shadow_dom: T::SHADOW_DOM,
            css: T::CSS,
            element_type: T::ELEMENT_TYPE,
            factory: instantiate::<T>,
        }
    }

    /// Whether `attr_name` is one of the observed attributes.
    pub fn observes(&self, attr_name: &str) -> bool {
        self.observed_attributes.contains(&attr_name)
    }

    /// Whether this kind belongs to the element family.
    pub fn is_family(&self) -> bool {
        self.element_type == ELEMENT_FAMILY
    }

    pub(crate) fn instantiate(&self) -> (Rc<dyn Component>, Rc<dyn Any>) {
        (self.factory)()
    }
}

fn instantiate<T: CustomElement>() -> (Rc<dyn Component>, Rc<dyn Any>) {
    let component = Rc::new(T::default());
    (component.clone(), component)
}

// =============================================================================
// Definition Registry
// =============================================================================

/// Tag name → definition, per document.
#[derive(Debug, Default)]
pub struct DefinitionRegistry {
    by_tag: HashMap<String, Rc<ElementDefinition>>,
}

impl DefinitionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `definition`. Fails on invalid or already-registered tags.
    pub fn define(&mut self, definition: ElementDefinition) -> Result<Rc<ElementDefinition>> {
        validate_tag_name(definition.tag_name)?;
        if self.by_tag.contains_key(definition.tag_name) {
            return Err(Error::AlreadyDefined(definition.tag_name.to_string()));
        }
        let definition = Rc::new(definition);
        self.by_tag
            .insert(definition.tag_name.to_string(), definition.clone());
        Ok(definition)
    }

    pub fn get(&self, tag: &str) -> Option<Rc<ElementDefinition>> {
        self.by_tag.get(tag).cloned()
    }

    pub fn is_defined(&self, tag: &str) -> bool {
        self.by_tag.contains_key(tag)
    }

    /// Registered tag names, sorted.
    pub fn tags(&self) -> Vec<String> {
        let mut tags: Vec<String> = self.by_tag.keys().cloned().collect();
        tags.sort();
        tags
    }
}

/// Check the custom element naming rules: starts with an ASCII lowercase
/// letter, contains `-`, has no uppercase letters, and is not reserved.
pub fn validate_tag_name(tag: &str) -> Result<()> {
    let invalid = || Error::InvalidTagName(tag.to_string());

    let first = tag.chars().next().ok_or_else(invalid)?;
    if !first.is_ascii_lowercase() || !tag.contains('-') {
        return Err(invalid());
    }
    let allowed = |c: char| {
        c.is_ascii_lowercase() || c.is_ascii_digit() || matches!(c, '-' | '.' | '_') || !c.is_ascii()
    };
    if !tag.chars().all(allowed) || RESERVED_TAG_NAMES.contains(&tag) {
        return Err(invalid());
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Default)]
    struct Plain;

    impl Component for Plain {
        fn render(&self, _el: &Element) -> Result<String> {
            Ok("<p>plain</p>".into())
        }
    }

    impl CustomElement for Plain {
        const TAG_NAME: &'static str = "plain-el";
        const OBSERVED_ATTRIBUTES: &'static [&'static str] = &["title-str"];
    }

    #[derive(Default)]
    struct Foreign;

    impl Component for Foreign {
        fn render(&self, _el: &Element) -> Result<String> {
            Ok(String::new())
        }
    }

    impl CustomElement for Foreign {
        const TAG_NAME: &'static str = "foreign-el";
        const ELEMENT_TYPE: &'static str = "SomethingElse";
    }

    #[test]
    fn test_definition_captures_constants() {
        let def = ElementDefinition::of::<Plain>();

        assert_eq!(def.tag_name, "plain-el");
        assert!(def.observes("title-str"));
        assert!(!def.observes("titleStr"));
        assert!(!def.shadow_dom);
        assert!(def.is_family());
        assert!(!ElementDefinition::of::<Foreign>().is_family());
    }

    #[test]
    fn test_instantiate_builds_fresh_components() {
        let def = ElementDefinition::of::<Plain>();

        let (_, a) = def.instantiate();
        let (_, b) = def.instantiate();

        assert!(!Rc::ptr_eq(&a, &b));
        assert!(a.downcast::<Plain>().is_ok());
    }

    #[test]
    fn test_define_rejects_duplicates() {
        let mut registry = DefinitionRegistry::new();

        registry.define(ElementDefinition::of::<Plain>()).unwrap();
        let err = registry.define(ElementDefinition::of::<Plain>()).unwrap_err();

        assert_eq!(err, Error::AlreadyDefined("plain-el".into()));
        assert_eq!(registry.tags(), vec!["plain-el".to_string()]);
    }

    #[test]
    fn test_tag_name_rules() {
        assert!(validate_tag_name("grocery-list").is_ok());
        assert!(validate_tag_name("x-1.2_b").is_ok());

        for bad in ["", "grocery", "Grocery-list", "grocery-List", "1-list", "font-face", "my el-x"] {
            assert_eq!(validate_tag_name(bad), Err(Error::InvalidTagName(bad.into())), "{bad}");
        }
    }
}
