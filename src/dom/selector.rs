//! Simple CSS selectors for element queries and listener binding.
//!
//! Supported: type (`li`, `*`), `#id`, `.class`, `[attr]`, `[attr=value]`,
//! compounds of those (`li.done[data-id]`) and comma-separated lists.
//! Combinators are not supported; a selector containing one matches nothing.

/// A parsed selector list.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Selector {
    alternatives: Vec<Compound>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
struct Compound {
    tag: Option<String>,
    id: Option<String>,
    classes: Vec<String>,
    attrs: Vec<(String, Option<String>)>,
}

impl Selector {
    /// Parse `source`. Unsupported syntax yields a selector that matches nothing.
    pub fn parse(source: &str) -> Self {
        let alternatives = source
            .split(',')
            .map(str::trim)
            .filter(|part| !part.is_empty())
            .map(parse_compound)
            .collect::<Option<Vec<_>>>()
            .unwrap_or_default();
        Self { alternatives }
    }

    /// Whether an element with `tag` and `attrs` matches.
    pub fn matches(&self, tag: &str, attrs: &[(String, String)]) -> bool {
        self.alternatives.iter().any(|c| c.matches(tag, attrs))
    }

    pub fn is_empty(&self) -> bool {
        self.alternatives.is_empty()
    }
}

impl Compound {
    fn matches(&self, tag: &str, attrs: &[(String, String)]) -> bool {
        let attr = |name: &str| attrs.iter().find(|(n, _)| n == name).map(|(_, v)| v.as_str());

        if self.tag.as_deref().is_some_and(|t| t != tag) {
            return false;
        }
        if let Some(id) = &self.id {
            if attr("id") != Some(id.as_str()) {
                return false;
            }
        }
        if !self.classes.is_empty() {
            let class_list = attr("class").unwrap_or("");
            if !self
                .classes
                .iter()
                .all(|c| class_list.split_ascii_whitespace().any(|have| have == c))
            {
                return false;
            }
        }
        self.attrs.iter().all(|(name, expected)| match (attr(name), expected) {
            (Some(_), None) => true,
            (Some(value), Some(expected)) => value == expected,
            (None, _) => false,
        })
    }
}

fn parse_compound(source: &str) -> Option<Compound> {
    let mut compound = Compound::default();
    let mut rest = source;

    let tag_len = rest
        .find(['#', '.', '['])
        .unwrap_or(rest.len());
    let tag = &rest[..tag_len];
    if !tag.is_empty() && tag != "*" {
        if !tag.chars().all(is_ident_char) {
            return None;
        }
        compound.tag = Some(tag.to_ascii_lowercase());
    }
    rest = &rest[tag_len..];

    while let Some(first) = rest.chars().next() {
        match first {
            '#' | '.' => {
                let body = &rest[1..];
                let len = body.find(|c: char| !is_ident_char(c)).unwrap_or(body.len());
                if len == 0 {
                    return None;
                }
                let name = body[..len].to_string();
                if first == '#' {
                    compound.id = Some(name);
                } else {
                    compound.classes.push(name);
                }
                rest = &body[len..];
            }
            '[' => {
                let end = rest.find(']')?;
                let inner = &rest[1..end];
                let (name, value) = match inner.split_once('=') {
                    Some((name, value)) => {
                        let value = value.trim().trim_matches(|c| c == '"' || c == '\'');
                        (name.trim(), Some(value.to_string()))
                    }
                    None => (inner.trim(), None),
                };
                if name.is_empty() {
                    return None;
                }
                compound.attrs.push((name.to_ascii_lowercase(), value));
                rest = &rest[end + 1..];
            }
            _ => return None,
        }
    }

    Some(compound)
}

fn is_ident_char(c: char) -> bool {
    c.is_alphanumeric() || c == '-' || c == '_'
}

#[cfg(test)]
mod tests {
    use super::*;

    fn attrs(pairs: &[(&str, &str)]) -> Vec<(String, String)> {
        pairs
            .iter()
            .map(|(n, v)| (n.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn test_type_selector() {
        let sel = Selector::parse("li");
        assert!(sel.matches("li", &[]));
        assert!(!sel.matches("ul", &[]));
        assert!(Selector::parse("*").matches("ul", &[]));
    }

    #[test]
    fn test_compound_selector() {
        let sel = Selector::parse("button.toggle[data-index]");
        let yes = attrs(&[("class", "big toggle"), ("data-index", "2")]);
        let no = attrs(&[("class", "big"), ("data-index", "2")]);

        assert!(sel.matches("button", &yes));
        assert!(!sel.matches("button", &no));
        assert!(!sel.matches("a", &yes));
    }

    #[test]
    fn test_id_and_attribute_value() {
        assert!(Selector::parse("#save").matches("button", &attrs(&[("id", "save")])));
        assert!(Selector::parse("[data-kind='x']").matches("li", &attrs(&[("data-kind", "x")])));
        assert!(!Selector::parse("[data-kind=x]").matches("li", &attrs(&[("data-kind", "y")])));
    }

    #[test]
    fn test_selector_list() {
        let sel = Selector::parse("h3, li");
        assert!(sel.matches("h3", &[]));
        assert!(sel.matches("li", &[]));
        assert!(!sel.matches("p", &[]));
    }

    #[test]
    fn test_combinators_match_nothing() {
        let sel = Selector::parse("ul li");
        assert!(sel.is_empty());
        assert!(!sel.matches("li", &[]));
    }
}
