//! HTML serialization helpers shared by the document and the sanitizer.

use super::parser::ParsedNode;

/// Elements that never have content or an end tag.
pub fn is_void(tag: &str) -> bool {
    matches!(
        tag,
        "area"
            | "base"
            | "br"
            | "col"
            | "embed"
            | "hr"
            | "img"
            | "input"
            | "link"
            | "meta"
            | "param"
            | "source"
            | "track"
            | "wbr"
    )
}

/// Elements whose text children serialize without escaping.
pub fn is_raw_text_container(tag: &str) -> bool {
    matches!(tag, "style" | "script" | "xmp" | "iframe" | "noembed" | "noframes" | "plaintext")
}

pub fn escape_text(text: &str, out: &mut String) {
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '\u{a0}' => out.push_str("&nbsp;"),
            _ => out.push(c),
        }
    }
}

pub fn escape_attr(value: &str, out: &mut String) {
    for c in value.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '"' => out.push_str("&quot;"),
            '\u{a0}' => out.push_str("&nbsp;"),
            _ => out.push(c),
        }
    }
}

pub fn write_start_tag(tag: &str, attrs: &[(String, String)], out: &mut String) {
    out.push('<');
    out.push_str(tag);
    for (name, value) in attrs {
        out.push(' ');
        out.push_str(name);
        out.push_str("=\"");
        escape_attr(value, out);
        out.push('"');
    }
    out.push('>');
}

pub fn write_end_tag(tag: &str, out: &mut String) {
    if !is_void(tag) {
        out.push_str("</");
        out.push_str(tag);
        out.push('>');
    }
}

pub fn write_comment(body: &str, out: &mut String) {
    out.push_str("<!--");
    out.push_str(body);
    out.push_str("-->");
}

/// Serialize a parsed fragment back to markup.
pub fn serialize_fragment(nodes: &[ParsedNode]) -> String {
    let mut out = String::new();
    for node in nodes {
        write_parsed(node, None, &mut out);
    }
    out
}

fn write_parsed(node: &ParsedNode, parent_tag: Option<&str>, out: &mut String) {
    match node {
        ParsedNode::Element { tag, attrs, children } => {
            write_start_tag(tag, attrs, out);
            for child in children {
                write_parsed(child, Some(tag.as_str()), out);
            }
            write_end_tag(tag, out);
        }
        ParsedNode::Text(text) if parent_tag.is_some_and(is_raw_text_container) => out.push_str(text),
        ParsedNode::Text(text) => escape_text(text, out),
        ParsedNode::Comment(body) => write_comment(body, out),
    }
}
