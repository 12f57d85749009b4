use std::fs::{self, OpenOptions};
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};
use std::sync::LazyLock;
use std::time::Duration;

use regex::Regex;
use tracing::{debug, warn};

use crate::document::Node;
use crate::error::{Error, Result};
use crate::http::Transport;

const DEFAULT_EXTENSION: &str = ".png";
const IMAGE_EXTENSIONS: &[&str] = &[".png", ".jpg", ".jpeg", ".gif", ".svg", ".webp", ".bmp"];

static LAST_SEGMENT_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"/([^/?]+)(\?|$)").unwrap());

/// Downloads images into an output directory, once per derived filename.
///
/// The directory listing is the only record of what has been fetched: if a
/// file with the derived name exists, the image counts as downloaded and the
/// network is not touched. Failed downloads leave no file behind, so they are
/// retried on the next run.
pub struct ImageFetcher<'a, T> {
    transport: &'a T,
    output_dir: PathBuf,
    delay: Duration,
}

impl<'a, T: Transport> ImageFetcher<'a, T> {
    pub fn new(transport: &'a T, output_dir: impl Into<PathBuf>, delay: Duration) -> Self {
        Self {
            transport,
            output_dir: output_dir.into(),
            delay,
        }
    }

    /// Save `url` locally and return the filename to reference it by.
    pub async fn fetch(&self, url: &str) -> Result<String> {
        let filename = image_filename(url)?;
        let path = self.output_dir.join(&filename);

        let mut file = match OpenOptions::new().write(true).create_new(true).open(&path) {
            Ok(file) => file,
            Err(e) if e.kind() == ErrorKind::AlreadyExists => {
                debug!("Image {} has already been saved; skipping", filename);
                return Ok(filename);
            }
            Err(e) => return Err(download_error(url, format!("cannot create {}: {}", filename, e))),
        };

        debug!("Downloading image from {}", url);
        let body = match self.transport.get_bytes(url).await {
            Ok(body) => body,
            Err(e) => {
                drop(file);
                discard(&path);
                return Err(download_error(url, e.to_string()));
            }
        };
        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }

        if let Err(e) = file.write_all(&body).and_then(|_| file.sync_all()) {
            drop(file);
            discard(&path);
            return Err(download_error(url, format!("cannot write {}: {}", filename, e)));
        }
        Ok(filename)
    }
}

/// Derive a local filename from the last path segment of `url`.
pub fn image_filename(url: &str) -> Result<String> {
    let mut filename = LAST_SEGMENT_RE
        .captures(url)
        .map(|caps| caps[1].to_string())
        .filter(|name| name != "." && name != "..")
        .ok_or_else(|| Error::Naming(url.to_string()))?;

    let lower = filename.to_ascii_lowercase();
    if !IMAGE_EXTENSIONS.iter().any(|ext| lower.ends_with(ext)) {
        filename.push_str(DEFAULT_EXTENSION);
    }
    Ok(filename)
}

/// Download every handler-emitted image in `nodes`, in document order, and
/// point it at the local copy. Failures leave the remote URL in place.
pub async fn localize_images<T: Transport>(nodes: &mut [Node], fetcher: &ImageFetcher<'_, T>) -> usize {
    let mut sources = Vec::new();
    collect_sources(nodes, &mut sources);

    let mut saved = 0;
    for src in sources {
        match fetcher.fetch(src.as_str()).await {
            Ok(filename) => {
                *src = filename;
                saved += 1;
            }
            Err(e) => warn!("Leaving image at its remote URL: {}", e),
        }
    }
    saved
}

fn collect_sources<'a>(nodes: &'a mut [Node], out: &mut Vec<&'a mut String>) {
    for node in nodes {
        match node {
            Node::Image { src, .. } => out.push(src),
            Node::Element(el) => collect_sources(&mut el.children, out),
            Node::Text(_) => {}
        }
    }
}

fn download_error(url: &str, reason: String) -> Error {
    Error::Download {
        url: url.to_string(),
        reason,
    }
}

fn discard(path: &Path) {
    if let Err(e) = fs::remove_file(path) {
        warn!("Failed to remove incomplete file {}: {}", path.display(), e);
    }
}

// ── Tests ──
