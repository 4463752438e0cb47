//! Node arena types.

/// Handle to a node in a [`Document`](super::Document). Only meaningful for the
/// document that created it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(pub(crate) usize);

impl NodeId {
    pub fn index(self) -> usize {
        self.0
    }
}

/// Tag plus attributes of an element node. Attribute order is insertion order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct ElementData {
    pub tag: String,
    pub attrs: Vec<(String, String)>,
}

impl ElementData {
    pub fn new(tag: String, attrs: Vec<(String, String)>) -> Self {
        Self { tag, attrs }
    }

    pub fn attr(&self, name: &str) -> Option<&str> {
        self.attrs
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, v)| v.as_str())
    }

    /// Set `name`, returning the previous value.
    pub fn set_attr(&mut self, name: &str, value: &str) -> Option<String> {
        match self.attrs.iter_mut().find(|(n, _)| n == name) {
            Some((_, v)) => Some(std::mem::replace(v, value.to_string())),
            None => {
                self.attrs.push((name.to_string(), value.to_string()));
                None
            }
        }
    }

    pub fn remove_attr(&mut self, name: &str) -> Option<String> {
        let pos = self.attrs.iter().position(|(n, _)| n == name)?;
        Some(self.attrs.remove(pos).1)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum NodeKind {
    Document,
    Element(ElementData),
    Text(String),
    Comment(String),
    /// Root of a shadow tree. Not listed among the host's children.
    ShadowRoot { host: NodeId },
}

#[derive(Debug, Clone)]
pub(crate) struct Node {
    pub parent: Option<NodeId>,
    pub children: Vec<NodeId>,
    pub kind: NodeKind,
    pub shadow_root: Option<NodeId>,
}

impl Node {
    pub fn new(kind: NodeKind) -> Self {
        Self {
            parent: None,
            children: Vec::new(),
            kind,
            shadow_root: None,
        }
    }

    pub fn element(&self) -> Option<&ElementData> {
        match &self.kind {
            NodeKind::Element(data) => Some(data),
            _ => None,
        }
    }

    pub fn element_mut(&mut self) -> Option<&mut ElementData> {
        match &mut self.kind {
            NodeKind::Element(data) => Some(data),
            _ => None,
        }
    }

    /// Elements, shadow roots and the document root can hold children.
    pub fn is_container(&self) -> bool {
        !matches!(self.kind, NodeKind::Text(_) | NodeKind::Comment(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_set_attr_keeps_position() {
        let mut data = ElementData::new("li".into(), vec![("a".into(), "1".into()), ("b".into(), "2".into())]);

        assert_eq!(data.set_attr("a", "3"), Some("1".to_string()));
        assert_eq!(data.set_attr("c", "4"), None);

        assert_eq!(data.attrs[0], ("a".to_string(), "3".to_string()));
        assert_eq!(data.attr("c"), Some("4"));
        assert_eq!(data.remove_attr("b"), Some("2".to_string()));
        assert_eq!(data.attr("b"), None);
    }
}
