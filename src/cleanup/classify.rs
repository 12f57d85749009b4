use ego_tree::NodeRef;
use scraper::Node as SourceNode;

use crate::config::CleanOptions;

const VOID_TAGS: &[&str] = &["br", "hr"];
const PASSTHROUGH_TAGS: &[&str] = &["b", "i", "u", "h2", "ol", "ul", "li", "blockquote", "wbr"];
const WRAPPER_TAGS: &[&str] = &["span", "div"];

/// Which code markup an element carries.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CodeMarkup {
    /// `class="inline_codeblock"`: div → pre → span → text.
    InlineCodeblock,
    /// Plain `<code>`.
    CodeTag,
    /// `class="codeblocktable"`: one `div` per line, code inside spans.
    CodeBlockTable,
    /// Plain `<pre>`.
    PreTag,
}

impl CodeMarkup {
    pub fn is_block(self) -> bool {
        matches!(self, CodeMarkup::CodeBlockTable | CodeMarkup::PreTag)
    }
}

/// Category of a source node. Exactly one applies, first match wins.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NodeClass<'a> {
    Text(&'a str),
    Void,
    Passthrough(&'a str),
    Embed(&'a str),
    Code(CodeMarkup),
    Skip,
    Wrapper,
    Link { href: Option<&'a str> },
    Image { src: &'a str, alt: &'a str },
    Unrecognized(&'a str),
    /// Comments, doctypes and processing instructions.
    Ignored,
}

pub fn classify<'a>(node: NodeRef<'a, SourceNode>, opts: &CleanOptions) -> NodeClass<'a> {
    let el = match node.value() {
        SourceNode::Text(text) => return NodeClass::Text(&**text),
        SourceNode::Element(el) => el,
        _ => return NodeClass::Ignored,
    };

    let name = el.name();
    let class = el.attr("class").unwrap_or("");

    if VOID_TAGS.contains(&name) {
        return NodeClass::Void;
    }
    if PASSTHROUGH_TAGS.contains(&name) || (opts.keep_paragraphs && name == "p") {
        return NodeClass::Passthrough(name);
    }
    if let Some(embed) = el.attr("data-embed").filter(|v| !v.is_empty()) {
        return NodeClass::Embed(embed);
    }
    if let Some(markup) = code_markup(name, class) {
        return NodeClass::Code(markup);
    }
    if class.contains("ContentFooter") || class.contains("hidden") {
        return NodeClass::Skip;
    }
    if WRAPPER_TAGS.contains(&name) {
        return NodeClass::Wrapper;
    }

    match name {
        "a" => NodeClass::Link {
            href: el.attr("href"),
        },
        "img" => {
            let src = if class.contains("math") {
                el.attr("src")
            } else {
                el.attr("master_src")
                    .filter(|s| !s.is_empty())
                    .or_else(|| el.attr("src"))
            };
            NodeClass::Image {
                src: src.unwrap_or(""),
                alt: el.attr("alt").unwrap_or(""),
            }
        }
        _ => NodeClass::Unrecognized(name),
    }
}

fn code_markup(name: &str, class: &str) -> Option<CodeMarkup> {
    if class.contains("inline_codeblock") {
        Some(CodeMarkup::InlineCodeblock)
    } else if class.contains("codeblocktable") {
        Some(CodeMarkup::CodeBlockTable)
    } else if name == "code" {
        Some(CodeMarkup::CodeTag)
    } else if name == "pre" {
        Some(CodeMarkup::PreTag)
    } else {
        None
    }
}

// ── Tests ──
