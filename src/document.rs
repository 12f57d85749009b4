use html_escape::{encode_double_quoted_attribute, encode_text};

/// Style sheet embedded in every converted page.
pub const PAGE_CSS: &str = "blockquote { border-left: 2px solid #ddd; color: #666; margin: 0; padding-left: 16px; } \
code, pre { background: #f4f4f4; } \
pre, h2 { margin: 0; } \
ul { margin: 0 0 0 16px; padding: 8px 0; } \
ol { margin: 0 0 0 28px; padding: 8px 0; } \
li { margin: 0 0 8px; } ";

const VOID_ELEMENTS: &[&str] = &[
    "area", "base", "br", "col", "embed", "hr", "img", "input", "link", "meta", "source",
    "track", "wbr",
];

/// Elements whose text children are written without entity escaping.
const RAW_TEXT_ELEMENTS: &[&str] = &[
    "iframe", "noembed", "noframes", "noscript", "script", "style", "xmp",
];

/// Node of a freshly built output tree.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Node {
    Text(String),
    Element(Element),
    /// `<img>` produced by the image handler; the only kind of image that gets downloaded.
    Image { src: String, alt: String },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Element {
    pub name: String,
    pub attrs: Vec<(String, String)>,
    pub children: Vec<Node>,
}

impl Element {
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            attrs: Vec::new(),
            children: Vec::new(),
        }
    }

    pub fn attr(&self, name: &str) -> Option<&str> {
        self.attrs
            .iter()
            .find(|(k, _)| k == name)
            .map(|(_, v)| v.as_str())
    }

    /// Replace an attribute in place, or append it.
    pub fn set_attr(&mut self, name: &str, value: impl Into<String>) {
        let value = value.into();
        match self.attrs.iter_mut().find(|(k, _)| k == name) {
            Some((_, v)) => *v = value,
            None => self.attrs.push((name.to_string(), value)),
        }
    }

    pub fn with_attr(mut self, name: &str, value: impl Into<String>) -> Self {
        self.set_attr(name, value);
        self
    }

    pub fn with_child(mut self, child: Node) -> Self {
        self.children.push(child);
        self
    }
}

impl From<Element> for Node {
    fn from(el: Element) -> Self {
        Node::Element(el)
    }
}

/// Serialize a node list as HTML.
pub fn to_html(nodes: &[Node]) -> String {
    let mut out = String::new();
    for node in nodes {
        write_node(&mut out, node);
    }
    out
}

fn write_node(out: &mut String, node: &Node) {
    match node {
        Node::Text(text) => out.push_str(&encode_text(text)),
        Node::Image { src, alt } => {
            out.push_str("<img");
            write_attr(out, "src", src);
            write_attr(out, "alt", alt);
            out.push('>');
        }
        Node::Element(el) => {
            out.push('<');
            out.push_str(&el.name);
            for (name, value) in &el.attrs {
                write_attr(out, name, value);
            }
            out.push('>');
            if VOID_ELEMENTS.contains(&el.name.as_str()) {
                return;
            }
            let raw = RAW_TEXT_ELEMENTS.contains(&el.name.as_str());
            for child in &el.children {
                match child {
                    Node::Text(text) if raw => out.push_str(text),
                    _ => write_node(out, child),
                }
            }
            out.push_str("</");
            out.push_str(&el.name);
            out.push('>');
        }
    }
}

fn write_attr(out: &mut String, name: &str, value: &str) {
    out.push(' ');
    out.push_str(name);
    out.push_str("=\"");
    out.push_str(&encode_double_quoted_attribute(value));
    out.push('"');
}

/// Wrap a cleaned body in a standalone page with title, charset and style sheet.
pub fn render_page(title: Option<&str>, body: &[Node]) -> String {
    let mut out = String::from("<!DOCTYPE html><html><head>");
    if let Some(title) = title {
        out.push_str("<title>");
        out.push_str(&encode_text(title));
        out.push_str("</title>");
    }
    out.push_str("<meta charset=\"utf-8\">");
    out.push_str("<style type=\"text/css\">");
    out.push_str(PAGE_CSS);
    out.push_str("</style></head><body>");
    out.push_str(&to_html(body));
    out.push_str("</body></html>");
    out
}

// ── Tests ──
