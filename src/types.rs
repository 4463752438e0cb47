//! Core types for min-element.
//!
//! These types define the foundation that everything builds on:
//! - [`Value`] - the dynamic value held by element properties
//! - [`ElementFlags`] - per-instance lifecycle bits
//! - attribute / dataset name conversion

use std::cell::RefCell;
use std::fmt;
use std::rc::Rc;

use indexmap::IndexMap;

// =============================================================================
// Value
// =============================================================================

/// Shared, mutable array storage.
pub type ArrayRef = Rc<RefCell<Vec<Value>>>;

/// Shared, mutable object storage (insertion ordered).
pub type ObjectRef = Rc<RefCell<IndexMap<String, Value>>>;

/// A dynamically typed property value.
///
/// Primitives are held inline. Arrays and objects are shared references:
/// cloning a `Value` clones the reference, never the contents, so two elements
/// holding clones of the same array see each other's mutations and compare
/// identical through [`Value::ptr_eq`].
///
/// `PartialEq` is structural (deep) equality.
#[derive(Debug, Clone, Default, PartialEq)]
pub enum Value {
    #[default]
    Undefined,
    Null,
    Bool(bool),
    Number(f64),
    String(String),
    Array(ArrayRef),
    Object(ObjectRef),
}

impl Value {
    /// Create an array value from anything convertible to values.
    pub fn array<I, V>(items: I) -> Self
    where
        I: IntoIterator<Item = V>,
        V: Into<Value>,
    {
        Value::Array(Rc::new(RefCell::new(
            items.into_iter().map(Into::into).collect(),
        )))
    }

    /// Create an object value from key/value pairs, keeping their order.
    pub fn object<I, K, V>(entries: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<Value>,
    {
        Value::Object(Rc::new(RefCell::new(
            entries
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        )))
    }

    /// Name of the value kind, used in error messages.
    pub fn type_name(&self) -> &'static str {
        match self {
            Value::Undefined => "undefined",
            Value::Null => "null",
            Value::Bool(_) => "boolean",
            Value::Number(_) => "number",
            Value::String(_) => "string",
            Value::Array(_) => "array",
            Value::Object(_) => "object",
        }
    }

    /// Scripting-style truthiness.
    ///
    /// `undefined`, `null`, `false`, `0`, `NaN` and `""` are falsy,
    /// everything else (including empty arrays and objects) is truthy.
    pub fn is_truthy(&self) -> bool {
        match self {
            Value::Undefined | Value::Null => false,
            Value::Bool(b) => *b,
            Value::Number(n) => *n != 0.0 && !n.is_nan(),
            Value::String(s) => !s.is_empty(),
            Value::Array(_) | Value::Object(_) => true,
        }
    }

    /// True for the number zero (either sign).
    pub fn is_zero(&self) -> bool {
        matches!(self, Value::Number(n) if *n == 0.0)
    }

    /// True for `undefined`.
    pub fn is_undefined(&self) -> bool {
        matches!(self, Value::Undefined)
    }

    /// True for `undefined` or `null`.
    pub fn is_nullish(&self) -> bool {
        matches!(self, Value::Undefined | Value::Null)
    }

    /// Identity comparison.
    ///
    /// Arrays and objects are identical only when they share storage.
    /// Primitives compare by value.
    pub fn ptr_eq(&self, other: &Value) -> bool {
        match (self, other) {
            (Value::Array(a), Value::Array(b)) => Rc::ptr_eq(a, b),
            (Value::Object(a), Value::Object(b)) => Rc::ptr_eq(a, b),
            (Value::Array(_), _) | (Value::Object(_), _) => false,
            (_, Value::Array(_)) | (_, Value::Object(_)) => false,
            (a, b) => a == b,
        }
    }

    /// Borrow the string contents.
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::String(s) => Some(s),
            _ => None,
        }
    }

    /// Numeric contents.
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Value::Number(n) => Some(*n),
            _ => None,
        }
    }

    /// Boolean contents.
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Value::Bool(b) => Some(*b),
            _ => None,
        }
    }

    /// Element count for arrays, entry count for objects, char count for strings.
    pub fn len(&self) -> Option<usize> {
        match self {
            Value::Array(items) => Some(items.borrow().len()),
            Value::Object(entries) => Some(entries.borrow().len()),
            Value::String(s) => Some(s.chars().count()),
            _ => None,
        }
    }

    /// Array element at `index` (shares storage with the original).
    pub fn get_index(&self, index: usize) -> Option<Value> {
        match self {
            Value::Array(items) => items.borrow().get(index).cloned(),
            _ => None,
        }
    }

    /// Object field `key` (shares storage with the original).
    pub fn get_field(&self, key: &str) -> Option<Value> {
        match self {
            Value::Object(entries) => entries.borrow().get(key).cloned(),
            _ => None,
        }
    }

    /// Shallow snapshot of an array's elements.
    pub fn to_vec(&self) -> Option<Vec<Value>> {
        match self {
            Value::Array(items) => Some(items.borrow().clone()),
            _ => None,
        }
    }

    /// Copy with fresh storage at every level.
    pub fn deep_clone(&self) -> Value {
        match self {
            Value::Array(items) => {
                Value::array(items.borrow().iter().map(Value::deep_clone).collect::<Vec<_>>())
            }
            Value::Object(entries) => Value::object(
                entries
                    .borrow()
                    .iter()
                    .map(|(k, v)| (k.clone(), v.deep_clone()))
                    .collect::<Vec<_>>(),
            ),
            other => other.clone(),
        }
    }
}

/// String conversion as a markup template sees it.
impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Undefined => f.write_str("undefined"),
            Value::Null => f.write_str("null"),
            Value::Bool(b) => write!(f, "{b}"),
            Value::Number(n) => fmt_number(*n, f),
            Value::String(s) => f.write_str(s),
            Value::Array(items) => {
                for (i, item) in items.borrow().iter().enumerate() {
                    if i > 0 {
                        f.write_str(",")?;
                    }
                    if !item.is_nullish() {
                        write!(f, "{item}")?;
                    }
                }
                Ok(())
            }
            Value::Object(_) => f.write_str("[object Object]"),
        }
    }
}

fn fmt_number(n: f64, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    if n.is_nan() {
        f.write_str("NaN")
    } else if n.is_infinite() {
        f.write_str(if n > 0.0 { "Infinity" } else { "-Infinity" })
    } else if n == 0.0 {
        // -0 prints as 0
        f.write_str("0")
    } else {
        write!(f, "{n}")
    }
}

impl From<&str> for Value {
    fn from(value: &str) -> Self {
        Value::String(value.to_string())
    }
}

impl From<String> for Value {
    fn from(value: String) -> Self {
        Value::String(value)
    }
}

impl From<&String> for Value {
    fn from(value: &String) -> Self {
        Value::String(value.clone())
    }
}

impl From<bool> for Value {
    fn from(value: bool) -> Self {
        Value::Bool(value)
    }
}

impl From<f64> for Value {
    fn from(value: f64) -> Self {
        Value::Number(value)
    }
}

impl From<i32> for Value {
    fn from(value: i32) -> Self {
        Value::Number(value as f64)
    }
}

impl From<i64> for Value {
    fn from(value: i64) -> Self {
        Value::Number(value as f64)
    }
}

impl From<u32> for Value {
    fn from(value: u32) -> Self {
        Value::Number(value as f64)
    }
}

impl From<usize> for Value {
    fn from(value: usize) -> Self {
        Value::Number(value as f64)
    }
}

impl From<Vec<Value>> for Value {
    fn from(value: Vec<Value>) -> Self {
        Value::Array(Rc::new(RefCell::new(value)))
    }
}

/// `None` maps to `null`, matching a missing attribute.
impl<T: Into<Value>> From<Option<T>> for Value {
    fn from(value: Option<T>) -> Self {
        match value {
            Some(v) => v.into(),
            None => Value::Null,
        }
    }
}

// =============================================================================
// Element Flags (bitflags)
// =============================================================================

bitflags::bitflags! {
    /// Per-instance lifecycle state.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
    pub struct ElementFlags: u8 {
        const NONE = 0;
        /// Attached under the document root.
        const CONNECTED = 1 << 0;
        /// Attach finished; renders are live.
        const INITIALIZED = 1 << 1;
        /// Inside the data-prop refresh step; property writes do not render.
        const REFRESHING_DATA_PROPS = 1 << 2;
        /// Was connected once and has since been removed.
        const DETACHED = 1 << 3;
    }
}

// =============================================================================
// Name Conversion
// =============================================================================

/// Convert an attribute name to its property name.
///
/// Every `-` followed by a character is removed and that character is
/// upper-cased (`store-name` → `storeName`). Names without `-` pass through.
pub fn attr_name_to_prop_name(attr_name: &str) -> String {
    if !attr_name.contains('-') {
        return attr_name.to_string();
    }

    let mut out = String::with_capacity(attr_name.len());
    let mut chars = attr_name.chars();
    while let Some(c) = chars.next() {
        if c == '-' {
            match chars.next() {
                Some(next) => out.extend(next.to_uppercase()),
                None => out.push('-'),
            }
        } else {
            out.push(c);
        }
    }
    out
}

/// Dataset key for a `data-*` attribute name, `None` for other attributes.
///
/// `data-title-str` → `titleStr`. Only a `-` followed by an ASCII lowercase
/// letter is folded.
pub fn dataset_key(attr_name: &str) -> Option<String> {
    let rest = attr_name.strip_prefix("data-")?;

    let mut out = String::with_capacity(rest.len());
    let mut chars = rest.chars().peekable();
    while let Some(c) = chars.next() {
        match (c, chars.peek()) {
            ('-', Some(next)) if next.is_ascii_lowercase() => {
                out.push(next.to_ascii_uppercase());
                chars.next();
            }
            _ => out.push(c),
        }
    }
    Some(out)
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    // =========================================================================
    // Value tests
    // =========================================================================

    #[test]
    fn test_truthiness() {
        assert!(!Value::Undefined.is_truthy());
        assert!(!Value::Null.is_truthy());
        assert!(!Value::from(false).is_truthy());
        assert!(!Value::from(0).is_truthy());
        assert!(!Value::Number(f64::NAN).is_truthy());
        assert!(!Value::from("").is_truthy());

        assert!(Value::from(true).is_truthy());
        assert!(Value::from(-1).is_truthy());
        assert!(Value::from("0").is_truthy());
        assert!(Value::array(Vec::<Value>::new()).is_truthy());
        assert!(Value::object(Vec::<(String, Value)>::new()).is_truthy());
    }

    #[test]
    fn test_zero() {
        assert!(Value::from(0).is_zero());
        assert!(Value::Number(-0.0).is_zero());
        assert!(!Value::from("0").is_zero());
        assert!(!Value::Null.is_zero());
    }

    #[test]
    fn test_clone_shares_storage() {
        let list = Value::array(["a", "b"]);
        let alias = list.clone();

        if let Value::Array(items) = &alias {
            items.borrow_mut().push(Value::from("c"));
        }

        assert_eq!(list.len(), Some(3));
        assert!(list.ptr_eq(&alias));
    }

    #[test]
    fn test_deep_clone_is_equal_but_not_identical() {
        let list = Value::array([Value::object([("name", "Milk")])]);
        let copy = list.deep_clone();

        assert_eq!(list, copy);
        assert!(!list.ptr_eq(&copy));
        assert!(!list.get_index(0).unwrap().ptr_eq(&copy.get_index(0).unwrap()));
    }

    #[test]
    fn test_ptr_eq_primitives_compare_by_value() {
        assert!(Value::from("x").ptr_eq(&Value::from("x")));
        assert!(!Value::from("x").ptr_eq(&Value::from("y")));
        assert!(!Value::array([1]).ptr_eq(&Value::array([1])));
    }

    #[test]
    fn test_display() {
        assert_eq!(Value::from(1).to_string(), "1");
        assert_eq!(Value::from(1.5).to_string(), "1.5");
        assert_eq!(Value::Number(-0.0).to_string(), "0");
        assert_eq!(Value::from(true).to_string(), "true");
        assert_eq!(Value::Undefined.to_string(), "undefined");
        assert_eq!(
            Value::array([Value::from("fries"), Value::Null, Value::from(2)]).to_string(),
            "fries,,2"
        );
        assert_eq!(Value::object([("a", 1)]).to_string(), "[object Object]");
    }

    #[test]
    fn test_option_conversion() {
        assert_eq!(Value::from(None::<String>), Value::Null);
        assert_eq!(Value::from(Some("x")), Value::from("x"));
    }

    // =========================================================================
    // Name conversion tests
    // =========================================================================

    #[test]
    fn test_attr_name_to_prop_name() {
        assert_eq!(attr_name_to_prop_name("first"), "first");
        assert_eq!(attr_name_to_prop_name("store-name"), "storeName");
        assert_eq!(attr_name_to_prop_name("title-str"), "titleStr");
        assert_eq!(attr_name_to_prop_name("a-b-c"), "aBC");
        assert_eq!(attr_name_to_prop_name("trailing-"), "trailing-");
    }

    #[test]
    fn test_dataset_key() {
        assert_eq!(dataset_key("data-items"), Some("items".to_string()));
        assert_eq!(dataset_key("data-title-str"), Some("titleStr".to_string()));
        assert_eq!(dataset_key("data-x-1"), Some("x-1".to_string()));
        assert_eq!(dataset_key("title"), None);
    }

    #[test]
    fn test_flags() {
        let mut flags = ElementFlags::default();
        assert!(flags.is_empty());

        flags.insert(ElementFlags::CONNECTED | ElementFlags::INITIALIZED);
        assert!(flags.contains(ElementFlags::INITIALIZED));

        flags.remove(ElementFlags::INITIALIZED);
        assert!(!flags.contains(ElementFlags::INITIALIZED));
        assert!(flags.contains(ElementFlags::CONNECTED));
    }
}
