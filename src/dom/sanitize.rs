//! Markup sanitizer applied to every render before it reaches the document.
//!
//! No script, no inline event handlers, no script URLs. Everything else is
//! structure and styles and passes through, including custom element tags and
//! their arbitrary attributes (so `data-*` bindings survive).

use tracing::debug;

use super::parser::{parse_fragment, ParsedNode};
use super::serialize::serialize_fragment;

/// Elements removed together with their content.
const FORBIDDEN_TAGS: &[&str] = &[
    "script", "iframe", "object", "embed", "frame", "frameset", "base", "noscript", "applet",
];

/// Attributes whose value is a URL.
const URL_ATTRIBUTES: &[&str] = &["href", "src", "action", "formaction", "xlink:href", "poster", "background"];

/// What the sanitizer keeps.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SanitizeOptions {
    /// Keep tags containing `-`. When false they are unwrapped (children kept).
    pub allow_custom_elements: bool,
    /// Drop `on*` attributes.
    pub strip_event_handlers: bool,
    /// Drop URL attributes whose scheme is `javascript:` or `vbscript:`.
    pub strip_script_urls: bool,
    /// Keep comment nodes.
    pub keep_comments: bool,
}

impl Default for SanitizeOptions {
    fn default() -> Self {
        Self {
            allow_custom_elements: true,
            strip_event_handlers: true,
            strip_script_urls: true,
            keep_comments: false,
        }
    }
}

/// Sanitize `html` and return normalized markup.
pub fn sanitize(html: &str, options: &SanitizeOptions) -> String {
    let nodes = parse_fragment(html);
    serialize_fragment(&clean_nodes(nodes, options))
}

fn clean_nodes(nodes: Vec<ParsedNode>, options: &SanitizeOptions) -> Vec<ParsedNode> {
    let mut out = Vec::with_capacity(nodes.len());
    for node in nodes {
        match node {
            ParsedNode::Element { tag, .. } if FORBIDDEN_TAGS.contains(&tag.as_str()) => {
                debug!(tag = %tag, "sanitizer removed element");
            }
            ParsedNode::Element { tag, children, .. } if !options.allow_custom_elements && tag.contains('-') => {
                debug!(tag = %tag, "sanitizer unwrapped custom element");
                out.extend(clean_nodes(children, options));
            }
            ParsedNode::Element { tag, attrs, children } => {
                let attrs = clean_attrs(&tag, attrs, options);
                let children = clean_nodes(children, options);
                out.push(ParsedNode::Element { tag, attrs, children });
            }
            ParsedNode::Comment(_) if !options.keep_comments => {}
            other => out.push(other),
        }
    }
    out
}

fn clean_attrs(tag: &str, attrs: Vec<(String, String)>, options: &SanitizeOptions) -> Vec<(String, String)> {
    attrs
        .into_iter()
        .filter(|(name, value)| {
            if options.strip_event_handlers && name.starts_with("on") {
                debug!(tag, attr = %name, "sanitizer removed event handler attribute");
                return false;
            }
            if options.strip_script_urls && URL_ATTRIBUTES.contains(&name.as_str()) && is_script_url(value) {
                debug!(tag, attr = %name, "sanitizer removed script url");
                return false;
            }
            true
        })
        .collect()
}

/// Scheme check that ignores whitespace and control characters, as browsers do.
fn is_script_url(value: &str) -> bool {
    let compact: String = value
        .chars()
        .filter(|c| !c.is_ascii_whitespace() && !c.is_control())
        .take(16)
        .collect::<String>()
        .to_ascii_lowercase();
    compact.starts_with("javascript:") || compact.starts_with("vbscript:")
}
