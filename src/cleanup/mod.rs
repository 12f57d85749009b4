pub mod classify;
pub mod code;
pub mod embed;

use ego_tree::NodeRef;
use scraper::{ElementRef, Node as SourceNode};
use tracing::{debug, warn};

use crate::config::CleanOptions;
use crate::document::{Element, Node};
use crate::error::Error;
use classify::NodeClass;

/// Elements never carried into a converted page, even by a verbatim copy.
const STRIPPED_TAGS: &[&str] = &["script", "style"];
/// Reference attributes made absolute inside verbatim copies.
const URL_ATTRS: &[(&str, &str)] = &[("a", "href"), ("img", "src"), ("iframe", "src")];

/// Rewrite the children of `src` into a normalized node list.
///
/// Wrappers are flattened, attributes are dropped except where a handler
/// keeps them, and any node a handler cannot make sense of is copied
/// verbatim. Images come out as [`Node::Image`] still pointing at their
/// remote source; downloading them is a separate pass.
pub fn clean(src: ElementRef<'_>, opts: &CleanOptions) -> Vec<Node> {
    let mut dest = Vec::new();
    clean_children(*src, opts, &mut dest);
    dest
}

fn clean_children(src: NodeRef<'_, SourceNode>, opts: &CleanOptions, dest: &mut Vec<Node>) {
    for child in src.children() {
        match classify::classify(child, opts) {
            NodeClass::Text(text) => dest.push(Node::Text(text.to_string())),
            NodeClass::Void => dest.extend(copy_shallow(child)),
            NodeClass::Passthrough(name) => {
                let mut el = Element::new(name);
                clean_children(child, opts, &mut el.children);
                dest.push(el.into());
            }
            NodeClass::Embed(markup) => match embed::video_frame(markup) {
                Ok(frame) => dest.push(frame.into()),
                Err(e) => {
                    warn!("Failed to parse video embed code: {}", e);
                    dest.extend(copy_verbatim(child, &opts.site_origin));
                }
            },
            NodeClass::Code(markup) => {
                let normalized = ElementRef::wrap(child)
                    .ok_or_else(|| Error::Validation("code node is not an element".into()))
                    .and_then(|el| code::normalize_code(el, markup));
                match normalized {
                    Ok(node) => dest.push(node),
                    Err(e) => {
                        warn!("Failed to parse code block: {}", e);
                        dest.extend(copy_verbatim(child, &opts.site_origin));
                    }
                }
            }
            NodeClass::Skip => {}
            NodeClass::Wrapper => clean_children(child, opts, dest),
            NodeClass::Link { href } => {
                let mut link = Element::new("a");
                if let Some(href) = href {
                    link.set_attr("href", absolute_url(href, &opts.site_origin));
                }
                clean_children(child, opts, &mut link.children);
                dest.push(link.into());
            }
            NodeClass::Image { src, alt } => dest.push(Node::Image {
                src: absolute_url(src, &opts.site_origin),
                alt: alt.to_string(),
            }),
            NodeClass::Unrecognized(name) => {
                warn!("Unrecognized node <{}>, copying as-is", name);
                dest.extend(copy_verbatim(child, &opts.site_origin));
            }
            NodeClass::Ignored => debug!("Dropping non-content node"),
        }
    }
}

/// Make a link target absolute: `//host/x` gets `http:`, `/x` gets the site origin.
pub fn absolute_url(href: &str, site_origin: &str) -> String {
    if href.starts_with("//") {
        format!("http:{}", href)
    } else if href.starts_with('/') {
        format!("{}{}", site_origin.trim_end_matches('/'), href)
    } else {
        href.to_string()
    }
}

/// Copy a source node with its attributes but without children.
fn copy_shallow(node: NodeRef<'_, SourceNode>) -> Option<Node> {
    match node.value() {
        SourceNode::Text(text) => Some(Node::Text(text.to_string())),
        SourceNode::Element(el) => {
            let mut copy = Element::new(el.name());
            copy.attrs = copy_attrs(el);
            Some(copy.into())
        }
        _ => None,
    }
}

/// Source attributes in name order, so output does not depend on parser internals.
fn copy_attrs(el: &scraper::node::Element) -> Vec<(String, String)> {
    let mut attrs: Vec<(String, String)> = el
        .attrs()
        .map(|(name, value)| (name.to_string(), value.to_string()))
        .collect();
    attrs.sort();
    attrs
}

/// Deep copy of a source subtree, minus scripts, styles and comments.
///
/// Link and media references inside the copy are made absolute.
pub fn copy_verbatim(node: NodeRef<'_, SourceNode>, site_origin: &str) -> Option<Node> {
    if let SourceNode::Element(el) = node.value() {
        if STRIPPED_TAGS.contains(&el.name()) {
            return None;
        }
    }
    let mut copy = copy_shallow(node)?;
    if let Node::Element(el) = &mut copy {
        if let Some((_, attr)) = URL_ATTRS.iter().find(|(tag, _)| el.name == **tag) {
            if let Some(url) = el.attr(attr).map(|url| absolute_url(url, site_origin)) {
                el.set_attr(attr, url);
            }
        }
        el.children = node
            .children()
            .filter_map(|child| copy_verbatim(child, site_origin))
            .collect();
    }
    Some(copy)
}

// ── Tests ──
