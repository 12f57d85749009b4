use scraper::{ElementRef, Html};

use crate::document::Element;
use crate::error::{Error, Result};

/// Display size forced onto every imported video frame.
pub const EMBED_WIDTH: &str = "525";
pub const EMBED_HEIGHT: &str = "295";

/// Parse embed code (an `<iframe>` stored in an attribute) and import the frame.
///
/// The fragment is parsed as a standalone document; the frame must be the
/// first child of its `<body>`. Only the frame's attributes are imported.
pub fn import_embed(markup: &str) -> Result<Element> {
    let doc = Html::parse_document(markup);
    let body = doc
        .root_element()
        .children()
        .nth(1)
        .and_then(ElementRef::wrap)
        .ok_or_else(|| Error::Validation("embed code has no body".into()))?;
    let frame = body
        .first_child()
        .and_then(ElementRef::wrap)
        .ok_or_else(|| Error::Validation("embed body does not start with an element".into()))?;

    let name = frame.value().name();
    if name != "iframe" {
        return Err(Error::Validation(format!(
            "expected <iframe> in embed code, found <{}>",
            name
        )));
    }

    let mut imported = Element::new(name);
    imported.attrs = super::copy_attrs(frame.value());
    Ok(imported)
}

/// Import a video frame and normalize its source and size.
pub fn video_frame(markup: &str) -> Result<Element> {
    let mut frame = import_embed(markup)?;
    if let Some(src) = frame.attr("src").filter(|s| s.starts_with("//")) {
        let absolute = format!("http:{}", src);
        frame.set_attr("src", absolute);
    }
    frame.set_attr("width", EMBED_WIDTH);
    frame.set_attr("height", EMBED_HEIGHT);
    Ok(frame)
}

// ── Tests ──

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn imports_iframe_attributes() {
        let frame = import_embed(
            r#"<iframe src="https://www.youtube.com/embed/abc" frameborder="0" allowfullscreen></iframe>"#,
        )
        .unwrap();
        assert_eq!(frame.name, "iframe");
        assert_eq!(frame.attr("src"), Some("https://www.youtube.com/embed/abc"));
        assert_eq!(frame.attr("frameborder"), Some("0"));
        assert!(frame.children.is_empty());
    }

    #[test]
    fn protocol_relative_source_gets_http() {
        let frame =
            video_frame(r#"<iframe src="//www.youtube.com/embed/abc" width="640" height="360"></iframe>"#)
                .unwrap();
        assert_eq!(frame.attr("src"), Some("http://www.youtube.com/embed/abc"));
        assert_eq!(frame.attr("width"), Some("525"));
        assert_eq!(frame.attr("height"), Some("295"));
    }

    #[test]
    fn absolute_source_is_kept() {
        let frame = video_frame(r#"<iframe src="https://player.vimeo.com/video/1"></iframe>"#).unwrap();
        assert_eq!(frame.attr("src"), Some("https://player.vimeo.com/video/1"));
        assert_eq!(frame.attr("width"), Some("525"));
    }

    #[test]
    fn rejects_non_frame_markup() {
        assert!(matches!(
            import_embed("<div>not a video</div>"),
            Err(Error::Validation(_))
        ));
        assert!(matches!(import_embed("just text"), Err(Error::Validation(_))));
        assert!(matches!(import_embed(""), Err(Error::Validation(_))));
    }
}
