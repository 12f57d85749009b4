use scraper::{ElementRef, Node as SourceNode};

use super::classify::CodeMarkup;
use crate::document::{Element, Node};
use crate::error::{Error, Result};

/// Rewrite platform code markup into `<code>` or `<pre><code>`.
pub fn normalize_code(el: ElementRef<'_>, markup: CodeMarkup) -> Result<Node> {
    let text = match markup {
        CodeMarkup::InlineCodeblock => inline_codeblock_text(el)?,
        CodeMarkup::CodeTag => descendant_text(el),
        CodeMarkup::CodeBlockTable => {
            let lines = line_texts(el);
            if lines.is_empty() {
                return Err(Error::Validation("code block has no line containers".into()));
            }
            lines.join("\n")
        }
        CodeMarkup::PreTag => {
            let lines = line_texts(el);
            if lines.is_empty() {
                descendant_text(el)
            } else {
                lines.join("\n")
            }
        }
    };

    let code = Element::new("code").with_child(Node::Text(text));
    if markup.is_block() {
        Ok(Element::new("pre").with_child(code.into()).into())
    } else {
        Ok(code.into())
    }
}

/// div > pre > span > (text)
fn inline_codeblock_text(el: ElementRef<'_>) -> Result<String> {
    let span = el
        .first_child()
        .and_then(ElementRef::wrap)
        .and_then(|pre| pre.first_child())
        .and_then(ElementRef::wrap)
        .filter(|span| span.value().name() == "span")
        .ok_or_else(|| Error::Validation("inline code is not div > pre > span".into()))?;
    Ok(own_text(span))
}

/// One entry per descendant `div`: the direct text of every span inside it.
fn line_texts(el: ElementRef<'_>) -> Vec<String> {
    descendant_elements(el, "div")
        .map(|line| descendant_elements(line, "span").map(own_text).collect::<String>())
        .collect()
}

fn descendant_elements<'a>(
    el: ElementRef<'a>,
    name: &'static str,
) -> impl Iterator<Item = ElementRef<'a>> {
    el.descendants()
        .skip(1)
        .filter_map(ElementRef::wrap)
        .filter(move |e| e.value().name() == name)
}

/// Text nodes that are direct children of `el`.
fn own_text(el: ElementRef<'_>) -> String {
    el.children()
        .filter_map(|child| match child.value() {
            SourceNode::Text(text) => Some(&**text),
            _ => None,
        })
        .collect()
}

fn descendant_text(el: ElementRef<'_>) -> String {
    el.text().collect()
}

// ── Tests ──

#[cfg(test)]
mod tests {
    use super::*;
    use crate::document::to_html;
    use scraper::{Html, Selector};

    fn normalize(html: &str, markup: CodeMarkup) -> Result<String> {
        let doc = Html::parse_document(&format!("<div id=\"root\">{}</div>", html));
        let selector = Selector::parse("#root > *").unwrap();
        let el = doc.select(&selector).next().unwrap();
        normalize_code(el, markup).map(|node| to_html(&[node]))
    }

    #[test]
    fn inline_codeblock_keeps_span_text() {
        let out = normalize(
            "<div class=\"inline_codeblock\"><pre><span>x &lt; y</span></pre></div>",
            CodeMarkup::InlineCodeblock,
        );
        assert_eq!(out.unwrap(), "<code>x &lt; y</code>");
    }

    #[test]
    fn inline_codeblock_shape_mismatch() {
        let out = normalize(
            "<div class=\"inline_codeblock\"><pre><b>x</b></pre></div>",
            CodeMarkup::InlineCodeblock,
        );
        assert!(matches!(out, Err(Error::Validation(_))));
        let out = normalize(
            "<div class=\"inline_codeblock\">loose text</div>",
            CodeMarkup::InlineCodeblock,
        );
        assert!(matches!(out, Err(Error::Validation(_))));
    }

    #[test]
    fn block_table_joins_lines() {
        let out = normalize(
            "<table class=\"codeblocktable\"><tbody><tr><td>\
             <div><span>int </span><span>main()</span></div>\
             <div><span>{}</span></div>\
             </td></tr></tbody></table>",
            CodeMarkup::CodeBlockTable,
        );
        assert_eq!(out.unwrap(), "<pre><code>int main()\n{}</code></pre>");
    }

    #[test]
    fn block_table_without_lines_fails() {
        let out = normalize(
            "<table class=\"codeblocktable\"><tbody><tr><td>x</td></tr></tbody></table>",
            CodeMarkup::CodeBlockTable,
        );
        assert!(out.is_err());
    }

    #[test]
    fn plain_tags() {
        assert_eq!(
            normalize("<code>a<b>b</b></code>", CodeMarkup::CodeTag).unwrap(),
            "<code>ab</code>"
        );
        assert_eq!(
            normalize("<pre><span>fn</span> main</pre>", CodeMarkup::PreTag).unwrap(),
            "<pre><code>fn main</code></pre>"
        );
    }
}
