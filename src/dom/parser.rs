//! Lenient HTML fragment parser.
//!
//! Produces a small owned tree ([`ParsedNode`]) that the sanitizer filters and
//! the document materializes into arena nodes. Malformed input never fails:
//! stray `<` becomes text, unmatched end tags are dropped, unclosed elements
//! are closed at the end of input.

use super::serialize::is_void;

/// One node of a parsed fragment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ParsedNode {
    Element {
        tag: String,
        attrs: Vec<(String, String)>,
        children: Vec<ParsedNode>,
    },
    Text(String),
    Comment(String),
}

impl ParsedNode {
    pub fn element(tag: &str, attrs: Vec<(String, String)>, children: Vec<ParsedNode>) -> Self {
        ParsedNode::Element {
            tag: tag.to_string(),
            attrs,
            children,
        }
    }

    pub fn tag(&self) -> Option<&str> {
        match self {
            ParsedNode::Element { tag, .. } => Some(tag),
            _ => None,
        }
    }
}

/// Elements whose content is raw text up to the matching end tag.
fn is_raw_text(tag: &str) -> bool {
    matches!(tag, "script" | "style" | "textarea" | "title")
}

/// Opening `next` while `open` is the current element closes `open` first.
fn closes_implicitly(open: &str, next: &str) -> bool {
    match open {
        "li" => next == "li",
        "p" => matches!(
            next,
            "p" | "div" | "ul" | "ol" | "table" | "h1" | "h2" | "h3" | "h4" | "h5" | "h6"
        ),
        "option" => matches!(next, "option" | "optgroup"),
        "tr" => next == "tr",
        "td" | "th" => matches!(next, "td" | "th" | "tr"),
        _ => false,
    }
}

// =============================================================================
// Tree Builder
// =============================================================================

struct OpenElement {
    tag: String,
    attrs: Vec<(String, String)>,
    children: Vec<ParsedNode>,
}

#[derive(Default)]
struct TreeBuilder {
    roots: Vec<ParsedNode>,
    stack: Vec<OpenElement>,
}

impl TreeBuilder {
    fn current_children(&mut self) -> &mut Vec<ParsedNode> {
        match self.stack.last_mut() {
            Some(open) => &mut open.children,
            None => &mut self.roots,
        }
    }

    fn push(&mut self, node: ParsedNode) {
        self.current_children().push(node);
    }

    fn text(&mut self, text: String) {
        if text.is_empty() {
            return;
        }
        let children = self.current_children();
        if let Some(ParsedNode::Text(prev)) = children.last_mut() {
            prev.push_str(&text);
        } else {
            children.push(ParsedNode::Text(text));
        }
    }

    fn open(&mut self, tag: String, attrs: Vec<(String, String)>, self_closing: bool) {
        while self
            .stack
            .last()
            .is_some_and(|open| closes_implicitly(&open.tag, &tag))
        {
            self.pop();
        }
        if self_closing || is_void(&tag) {
            self.push(ParsedNode::Element {
                tag,
                attrs,
                children: Vec::new(),
            });
        } else {
            self.stack.push(OpenElement {
                tag,
                attrs,
                children: Vec::new(),
            });
        }
    }

    /// Close the nearest open `tag`, and everything opened after it.
    fn close(&mut self, tag: &str) {
        let Some(pos) = self.stack.iter().rposition(|open| open.tag == tag) else {
            return;
        };
        while self.stack.len() > pos {
            self.pop();
        }
    }

    fn pop(&mut self) {
        if let Some(open) = self.stack.pop() {
            self.push(ParsedNode::Element {
                tag: open.tag,
                attrs: open.attrs,
                children: open.children,
            });
        }
    }

    fn finish(mut self) -> Vec<ParsedNode> {
        while !self.stack.is_empty() {
            self.pop();
        }
        self.roots
    }
}

// =============================================================================
// Parsing
// =============================================================================

/// Parse an HTML fragment.
pub fn parse_fragment(html: &str) -> Vec<ParsedNode> {
    let mut builder = TreeBuilder::default();
    let bytes = html.as_bytes();
    let mut i = 0usize;

    while i < bytes.len() {
        if bytes[i] != b'<' {
            let start = i;
            while i < bytes.len() && bytes[i] != b'<' {
                i += 1;
            }
            builder.text(decode_entities(&html[start..i]));
            continue;
        }

        if starts_with_at(bytes, i, b"<!--") {
            let end = find_subslice(bytes, i + 4, b"-->");
            let body_end = end.unwrap_or(bytes.len());
            builder.push(ParsedNode::Comment(html[i + 4..body_end].to_string()));
            i = end.map_or(bytes.len(), |end| end + 3);
            continue;
        }

        if starts_with_at(bytes, i, b"</") {
            if bytes.get(i + 2).is_some_and(u8::is_ascii_alphabetic) {
                let (tag, next) = parse_end_tag(html, i);
                builder.close(&tag);
                i = next;
            } else {
                // `</>` and `</ ...>` are dropped
                i = skip_past(bytes, i, b'>');
            }
            continue;
        }

        if starts_with_at(bytes, i, b"<!") || starts_with_at(bytes, i, b"<?") {
            // Doctype and processing instructions
            i = skip_past(bytes, i, b'>');
            continue;
        }

        if !bytes.get(i + 1).is_some_and(u8::is_ascii_alphabetic) {
            builder.text("<".to_string());
            i += 1;
            continue;
        }

        let (tag, attrs, self_closing, next) = parse_start_tag(html, i);
        i = next;

        if is_raw_text(&tag) && !self_closing {
            let close = find_end_tag(bytes, i, tag.as_bytes()).unwrap_or(bytes.len());
            let raw = &html[i..close];
            builder.open(tag.clone(), attrs, false);
            if matches!(tag.as_str(), "textarea" | "title") {
                builder.text(decode_entities(raw));
            } else {
                builder.text(raw.to_string());
            }
            builder.close(&tag);
            i = if close < bytes.len() {
                parse_end_tag(html, close).1
            } else {
                close
            };
            continue;
        }

        builder.open(tag, attrs, self_closing);
    }

    builder.finish()
}

fn parse_start_tag(html: &str, at: usize) -> (String, Vec<(String, String)>, bool, usize) {
    let bytes = html.as_bytes();
    let mut i = at + 1;

    let tag_start = i;
    while i < bytes.len() && !is_tag_terminator(bytes[i]) {
        i += 1;
    }
    let tag = html[tag_start..i].to_ascii_lowercase();

    let mut attrs: Vec<(String, String)> = Vec::new();
    let mut self_closing = false;

    loop {
        skip_ws(bytes, &mut i);
        if i >= bytes.len() {
            break;
        }
        if bytes[i] == b'>' {
            i += 1;
            break;
        }
        if bytes[i] == b'/' {
            i += 1;
            if bytes.get(i) == Some(&b'>') {
                self_closing = true;
                i += 1;
                break;
            }
            continue;
        }

        let name_start = i;
        // A leading `=` belongs to the name
        i += 1;
        while i < bytes.len() && !is_tag_terminator(bytes[i]) && bytes[i] != b'=' {
            i += 1;
        }
        let name = html[name_start..i].to_ascii_lowercase();

        skip_ws(bytes, &mut i);
        let value = if bytes.get(i) == Some(&b'=') {
            i += 1;
            skip_ws(bytes, &mut i);
            parse_attr_value(html, &mut i)
        } else {
            String::new()
        };

        // First occurrence wins
        if !attrs.iter().any(|(n, _)| *n == name) {
            attrs.push((name, value));
        }
    }

    (tag, attrs, self_closing, i)
}

fn parse_attr_value(html: &str, i: &mut usize) -> String {
    let bytes = html.as_bytes();
    if *i >= bytes.len() {
        return String::new();
    }

    if bytes[*i] == b'"' || bytes[*i] == b'\'' {
        let quote = bytes[*i];
        *i += 1;
        let start = *i;
        while *i < bytes.len() && bytes[*i] != quote {
            *i += 1;
        }
        let value = decode_entities(&html[start..*i]);
        if *i < bytes.len() {
            *i += 1;
        }
        return value;
    }

    let start = *i;
    while *i < bytes.len() && !bytes[*i].is_ascii_whitespace() && bytes[*i] != b'>' {
        *i += 1;
    }
    decode_entities(&html[start..*i])
}

fn parse_end_tag(html: &str, at: usize) -> (String, usize) {
    let bytes = html.as_bytes();
    let mut i = at + 2;
    let tag_start = i;
    while i < bytes.len() && !is_tag_terminator(bytes[i]) {
        i += 1;
    }
    let tag = html[tag_start..i].to_ascii_lowercase();
    (tag, skip_past(bytes, i, b'>'))
}

// =============================================================================
// Byte Helpers
// =============================================================================

fn is_tag_terminator(b: u8) -> bool {
    b.is_ascii_whitespace() || b == b'/' || b == b'>'
}

fn skip_ws(bytes: &[u8], i: &mut usize) {
    while *i < bytes.len() && bytes[*i].is_ascii_whitespace() {
        *i += 1;
    }
}

/// Position just after the next `needle` byte at or after `from` (or the end).
fn skip_past(bytes: &[u8], from: usize, needle: u8) -> usize {
    bytes[from..]
        .iter()
        .position(|&b| b == needle)
        .map_or(bytes.len(), |p| from + p + 1)
}

fn starts_with_at(bytes: &[u8], at: usize, needle: &[u8]) -> bool {
    bytes.len() >= at + needle.len() && &bytes[at..at + needle.len()] == needle
}

fn find_subslice(bytes: &[u8], from: usize, needle: &[u8]) -> Option<usize> {
    if from > bytes.len() {
        return None;
    }
    bytes[from..]
        .windows(needle.len())
        .position(|w| w == needle)
        .map(|p| from + p)
}

/// Start of the `</tag` that ends a raw-text element (case-insensitive).
fn find_end_tag(bytes: &[u8], from: usize, tag: &[u8]) -> Option<usize> {
    let mut i = from;
    while let Some(pos) = find_subslice(bytes, i, b"</") {
        let name_start = pos + 2;
        let name_end = name_start + tag.len();
        if name_end <= bytes.len()
            && bytes[name_start..name_end].eq_ignore_ascii_case(tag)
            && bytes.get(name_end).is_none_or(|&b| is_tag_terminator(b))
        {
            return Some(pos);
        }
        i = pos + 2;
    }
    None
}

// =============================================================================
// Character References
// =============================================================================

/// Decode character references. Unknown or malformed references are kept verbatim.
pub fn decode_entities(src: &str) -> String {
    if !src.contains('&') {
        return src.to_string();
    }

    let mut out = String::with_capacity(src.len());
    let mut rest = src;
    while let Some(amp) = rest.find('&') {
        out.push_str(&rest[..amp]);
        let tail = &rest[amp + 1..];
        match tail.find(';').filter(|&end| end > 0 && end <= 32) {
            Some(end) => match decode_reference(&tail[..end]) {
                Some(ch) => {
                    out.push(ch);
                    rest = &tail[end + 1..];
                }
                None => {
                    out.push('&');
                    rest = tail;
                }
            },
            None => {
                out.push('&');
                rest = tail;
            }
        }
    }
    out.push_str(rest);
    out
}

fn decode_reference(name: &str) -> Option<char> {
    if let Some(num) = name.strip_prefix('#') {
        let code = match num.strip_prefix(['x', 'X']) {
            Some(hex) => u32::from_str_radix(hex, 16).ok()?,
            None => num.parse::<u32>().ok()?,
        };
        return char::from_u32(code);
    }
    match name {
        "amp" => Some('&'),
        "lt" => Some('<'),
        "gt" => Some('>'),
        "quot" => Some('"'),
        "apos" => Some('\''),
        "nbsp" => Some('\u{00A0}'),
        "copy" => Some('©'),
        "reg" => Some('®'),
        "trade" => Some('™'),
        "hellip" => Some('…'),
        "mdash" => Some('\u{2014}'),
        "ndash" => Some('\u{2013}'),
        "laquo" => Some('«'),
        "raquo" => Some('»'),
        "middot" => Some('·'),
        "deg" => Some('°'),
        "times" => Some('×'),
        "euro" => Some('€'),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn text(s: &str) -> ParsedNode {
        ParsedNode::Text(s.to_string())
    }

    fn attrs(pairs: &[(&str, &str)]) -> Vec<(String, String)> {
        pairs
            .iter()
            .map(|(n, v)| (n.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn test_nested_elements() {
        let nodes = parse_fragment("<h3>Title</h3><ul><li>Milk </li><li>Eggs </li></ul>");

        assert_eq!(nodes, vec![
            ParsedNode::element("h3", vec![], vec![text("Title")]),
            ParsedNode::element("ul", vec![], vec![
                ParsedNode::element("li", vec![], vec![text("Milk ")]),
                ParsedNode::element("li", vec![], vec![text("Eggs ")]),
            ]),
        ]);
    }

    #[test]
    fn test_attribute_forms() {
        let nodes = parse_fragment(
            r#"<grocery-list DATA-Title-Str="junkTitle" data-items='junkItems' hidden tabindex=3 data-items="dup"></grocery-list>"#,
        );

        assert_eq!(nodes, vec![ParsedNode::element(
            "grocery-list",
            attrs(&[
                ("data-title-str", "junkTitle"),
                ("data-items", "junkItems"),
                ("hidden", ""),
                ("tabindex", "3"),
            ]),
            vec![],
        )]);
    }

    #[test]
    fn test_void_and_self_closing() {
        let nodes = parse_fragment("<p>a<br>b<img src=x.png/></p><x-icon/>c");

        assert_eq!(nodes, vec![
            ParsedNode::element("p", vec![], vec![
                text("a"),
                ParsedNode::element("br", vec![], vec![]),
                text("b"),
                ParsedNode::element("img", attrs(&[("src", "x.png/")]), vec![]),
            ]),
            ParsedNode::element("x-icon", vec![], vec![]),
            text("c"),
        ]);
    }

    #[test]
    fn test_implicit_li_close() {
        let nodes = parse_fragment("<ul><li>one<li>two</ul>");

        assert_eq!(nodes, vec![ParsedNode::element("ul", vec![], vec![
            ParsedNode::element("li", vec![], vec![text("one")]),
            ParsedNode::element("li", vec![], vec![text("two")]),
        ])]);
    }

    #[test]
    fn test_raw_text_and_comments() {
        let nodes = parse_fragment("<style>p > a { color: red }</style><!-- note --><script>if (a < b) {}</script>");

        assert_eq!(nodes, vec![
            ParsedNode::element("style", vec![], vec![text("p > a { color: red }")]),
            ParsedNode::Comment(" note ".to_string()),
            ParsedNode::element("script", vec![], vec![text("if (a < b) {}")]),
        ]);
    }

    #[test]
    fn test_malformed_input_is_tolerated() {
        let nodes = parse_fragment("<!DOCTYPE html>a < b</div><p>open");

        assert_eq!(nodes, vec![
            text("a < b"),
            ParsedNode::element("p", vec![], vec![text("open")]),
        ]);
    }

    #[test]
    fn test_entities() {
        assert_eq!(decode_entities("a &amp; b &lt;c&gt; &#39;d&#x27; &nbsp;"), "a & b <c> 'd' \u{a0}");
        assert_eq!(decode_entities("AT&T &bogus; & done"), "AT&T &bogus; & done");
    }
}
