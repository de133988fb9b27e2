use anyhow::{bail, Context, Result};
use quick_xml::events::{BytesStart, Event};
use quick_xml::Reader;

// ── Types ────────────────────────────────────────────────────────────

/// One node of an owned, mutable markup tree.
#[derive(Debug, Clone, PartialEq)]
pub enum Node {
    Element(Element),
    Text(String),
}

/// An element with its attributes and children, in document order.
#[derive(Debug, Clone, PartialEq)]
pub struct Element {
    pub name: String,
    pub attrs: Vec<(String, String)>,
    pub children: Vec<Node>,
}

impl Element {
    pub fn new(name: &str) -> Self {
        Element {
            name: name.to_string(),
            attrs: Vec::new(),
            children: Vec::new(),
        }
    }

    /// Look up an attribute value by key.
    pub fn attr(&self, key: &str) -> Option<&str> {
        self.attrs
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }
}

// ── Parsing ──────────────────────────────────────────────────────────

fn element_from_start(e: &BytesStart) -> Element {
    let name = String::from_utf8_lossy(e.name().as_ref()).to_string();
    let mut attrs = Vec::new();
    for attr in e.attributes().flatten() {
        let key = String::from_utf8_lossy(attr.key.as_ref()).to_string();
        let val = String::from_utf8_lossy(&attr.value).to_string();
        attrs.push((key, val));
    }
    Element {
        name,
        attrs,
        children: Vec::new(),
    }
}

/// Parse an XML document into a synthetic root element holding the
/// top-level nodes. Comments, processing instructions, doctype and the
/// XML declaration are dropped; text entities are unescaped.
pub fn parse_document(xml: &str) -> Result<Element> {
    let mut reader = Reader::from_str(xml);
    reader.config_mut().trim_text(false);
    let mut buf = Vec::new();

    // Stack of open elements; index 0 is the synthetic document root.
    let mut stack: Vec<Element> = vec![Element::new("#document")];

    loop {
        match reader.read_event_into(&mut buf) {
            Ok(Event::Start(ref e)) => {
                stack.push(element_from_start(e));
            }
            Ok(Event::Empty(ref e)) => {
                let el = element_from_start(e);
                stack
                    .last_mut()
                    .context("empty element outside document")?
                    .children
                    .push(Node::Element(el));
            }
            Ok(Event::End(_)) => {
                let done = stack.pop().context("unbalanced end tag")?;
                match stack.last_mut() {
                    Some(parent) => parent.children.push(Node::Element(done)),
                    None => bail!("unbalanced end tag </{}>", done.name),
                }
            }
            Ok(Event::Text(ref e)) => {
                let text = e.unescape().context("invalid entity in text")?;
                if !text.is_empty() {
                    stack
                        .last_mut()
                        .context("text outside document")?
                        .children
                        .push(Node::Text(text.to_string()));
                }
            }
            Ok(Event::CData(ref e)) => {
                let text = String::from_utf8_lossy(e).to_string();
                stack
                    .last_mut()
                    .context("cdata outside document")?
                    .children
                    .push(Node::Text(text));
            }
            Ok(Event::Eof) => break,
            Err(e) => bail!("XML parse error at byte {}: {e}", reader.buffer_position()),
            // Comment, PI, DocType, Decl
            _ => {}
        }
        buf.clear();
    }

    if stack.len() != 1 {
        bail!("unclosed element <{}>", stack.last().map(|e| e.name.as_str()).unwrap_or("?"));
    }
    Ok(stack.remove(0))
}

/// Detach and return the first element named `tag`, searching the tree
/// depth-first in document order.
pub fn take_element(root: &mut Element, tag: &str) -> Option<Element> {
    for i in 0..root.children.len() {
        if let Node::Element(e) = &root.children[i] {
            if e.name == tag {
                if let Node::Element(e) = root.children.remove(i) {
                    return Some(e);
                }
                unreachable!();
            }
        }
        if let Node::Element(e) = &mut root.children[i] {
            if let Some(found) = take_element(e, tag) {
                return Some(found);
            }
        }
    }
    None
}

// ── Serialization ────────────────────────────────────────────────────

fn escape_text(s: &str) -> String {
    s.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
}

fn escape_attr(s: &str) -> String {
    escape_text(s).replace('"', "&quot;")
}

fn push_tokens(node: &Node, out: &mut Vec<String>) {
    match node {
        Node::Text(t) => {
            // Collapse runs of whitespace: each word becomes one token.
            for word in escape_text(t).split_whitespace() {
                out.push(word.to_string());
            }
        }
        Node::Element(e) => {
            let mut open = format!("<{}", e.name);
            for (k, v) in &e.attrs {
                open.push_str(&format!(" {}=\"{}\"", k, escape_attr(v)));
            }
            open.push('>');
            out.push(open);
            for child in &e.children {
                push_tokens(child, out);
            }
            out.push(format!("</{}>", e.name));
        }
    }
}

/// Render the element's children (the wrapper tag itself is not emitted)
/// as a single line: tags and words separated by single spaces, all runs
/// of whitespace collapsed, ends trimmed.
pub fn serialize(el: &Element) -> String {
    let mut tokens = Vec::new();
    for child in &el.children {
        push_tokens(child, &mut tokens);
    }
    tokens.join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_nested_elements() {
        let root = parse_document("<a><b type=\"x\">hi</b>there</a>").unwrap();
        assert_eq!(root.children.len(), 1);
        let a = match &root.children[0] {
            Node::Element(e) => e,
            _ => panic!("expected element"),
        };
        assert_eq!(a.name, "a");
        assert_eq!(a.children.len(), 2);
        let b = match &a.children[0] {
            Node::Element(e) => e,
            _ => panic!("expected element"),
        };
        assert_eq!(b.attr("type"), Some("x"));
        assert_eq!(b.children, vec![Node::Text("hi".into())]);
    }

    #[test]
    fn test_parse_self_closing() {
        let root = parse_document("<p>one<lb/>two</p>").unwrap();
        let p = match &root.children[0] {
            Node::Element(e) => e,
            _ => panic!(),
        };
        assert_eq!(p.children.len(), 3);
        assert!(matches!(&p.children[1], Node::Element(e) if e.name == "lb"));
    }

    #[test]
    fn test_parse_unbalanced_is_error() {
        assert!(parse_document("<a><b></a>").is_err());
        assert!(parse_document("<a>").is_err());
    }

    #[test]
    fn test_parse_unescapes_entities() {
        let root = parse_document("<p>salt &amp; pepper</p>").unwrap();
        let p = match &root.children[0] {
            Node::Element(e) => e,
            _ => panic!(),
        };
        assert_eq!(p.children, vec![Node::Text("salt & pepper".into())]);
    }

    #[test]
    fn test_take_element_depth_first() {
        let mut root = parse_document("<doc><front/><text><p>hi</p></text></doc>").unwrap();
        let text = take_element(&mut root, "text").unwrap();
        assert_eq!(text.name, "text");
        assert_eq!(text.children.len(), 1);
        // The node was detached from the tree.
        assert!(take_element(&mut root, "text").is_none());
    }

    #[test]
    fn test_serialize_collapses_whitespace() {
        let mut root = parse_document("<d><p>  the\n  river \t bridge </p></d>").unwrap();
        let d = take_element(&mut root, "d").unwrap();
        assert_eq!(serialize(&d), "<p> the river bridge </p>");
    }

    #[test]
    fn test_serialize_attrs_and_escaping() {
        let mut root = parse_document("<d><h1 type=\"main\">A &lt; B</h1></d>").unwrap();
        let d = take_element(&mut root, "d").unwrap();
        assert_eq!(serialize(&d), "<h1 type=\"main\"> A &lt; B </h1>");
    }

    #[test]
    fn test_serialize_deterministic() {
        let xml = "<d><h1>Title</h1> <p>body   text</p></d>";
        let mut r1 = parse_document(xml).unwrap();
        let mut r2 = parse_document(xml).unwrap();
        let d1 = take_element(&mut r1, "d").unwrap();
        let d2 = take_element(&mut r2, "d").unwrap();
        assert_eq!(serialize(&d1), serialize(&d2));
    }
}
