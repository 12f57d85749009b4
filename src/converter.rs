use std::borrow::Cow;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::LazyLock;

use anyhow::{bail, Context, Result};
use indicatif::{ProgressBar, ProgressStyle};
use scraper::{Html, Selector};
use tracing::{debug, error, info, warn};

use crate::cleanup;
use crate::config::{CleanOptions, ConvertOptions};
use crate::document::{self, Node};
use crate::error::Error;
use crate::http::Transport;
use crate::images::{self, ImageFetcher};

/// Class token marking the container that holds the answer itself.
const ANSWER_CLASS: &str = "ExpandedAnswer";

static TITLE_SELECTOR: LazyLock<Selector> = LazyLock::new(|| Selector::parse("title").unwrap());
static DIV_SELECTOR: LazyLock<Selector> = LazyLock::new(|| Selector::parse("div").unwrap());

/// Convert stats returned after completion.
pub struct ConvertStats {
    pub total: usize,
    pub converted: usize,
    pub failed: usize,
    pub images: usize,
}

/// The cleaned answer of one saved page.
#[derive(Debug)]
pub struct Answer {
    pub title: Option<String>,
    pub body: Vec<Node>,
}

/// Locate the answer on a saved page and rewrite it.
pub fn extract_answer(html: &str, opts: &CleanOptions) -> Result<Answer, Error> {
    let doc = Html::parse_document(html);
    let title = doc
        .select(&TITLE_SELECTOR)
        .next()
        .map(|t| t.text().collect::<String>());

    let answer = doc
        .select(&DIV_SELECTOR)
        .find(|div| div.value().classes().any(|c| c == ANSWER_CLASS))
        .ok_or_else(|| Error::Parse("no answer container on page".into()))?;

    Ok(Answer {
        title,
        body: cleanup::clean(answer, opts),
    })
}

/// Every `*.html` file in `dir`, sorted by name.
pub fn list_pages(dir: &Path) -> Result<Vec<PathBuf>> {
    let mut pages: Vec<PathBuf> = fs::read_dir(dir)
        .with_context(|| format!("Failed to read input directory {}", dir.display()))?
        .filter_map(|entry| entry.ok().map(|e| e.path()))
        .filter(|path| path.is_file() && path.extension().is_some_and(|ext| ext == "html"))
        .collect();
    pages.sort();
    Ok(pages)
}

/// Convert every saved page in the input directory.
pub async fn convert_all<T: Transport>(opts: &ConvertOptions, transport: &T, show_progress: bool) -> Result<ConvertStats> {
    let pages = list_pages(&opts.input_dir)?;
    if pages.is_empty() {
        bail!("No .html files found in directory {}", opts.input_dir.display());
    }
    info!("Found {} answers", pages.len());

    debug!("Creating directory {}", opts.output_dir.display());
    fs::create_dir_all(&opts.output_dir)
        .with_context(|| format!("Failed to create output directory {}", opts.output_dir.display()))?;

    let fetcher = ImageFetcher::new(transport, &opts.output_dir, opts.delay);
    let pb = if show_progress {
        ProgressBar::new(pages.len() as u64)
    } else {
        ProgressBar::hidden()
    };
    pb.set_style(
        ProgressStyle::default_bar()
            .template("[{elapsed_precise}] {bar:40} {pos}/{len} {msg}")?
            .progress_chars("=> "),
    );

    let mut stats = ConvertStats {
        total: pages.len(),
        converted: 0,
        failed: 0,
        images: 0,
    };

    for path in &pages {
        let Some(filename) = path.file_name() else {
            continue;
        };
        info!("Filename: {}", filename.to_string_lossy());
        pb.set_message(filename.to_string_lossy().into_owned());

        match convert_one(path, &opts.output_dir.join(filename), opts, &fetcher).await {
            Ok(images) => {
                stats.converted += 1;
                stats.images += images;
            }
            Err(e) => {
                error!("{:#}", e);
                stats.failed += 1;
            }
        }
        pb.inc(1);
    }

    pb.finish_and_clear();
    info!(
        "Converted {} answers ({} ok, {} failed)",
        stats.total, stats.converted, stats.failed
    );
    Ok(stats)
}

/// Convert one page; returns how many images were saved locally.
async fn convert_one<T: Transport>(
    input: &Path,
    output: &Path,
    opts: &ConvertOptions,
    fetcher: &ImageFetcher<'_, T>,
) -> Result<usize> {
    let bytes = fs::read(input).with_context(|| format!("Failed to read {}", input.display()))?;
    let html = String::from_utf8_lossy(&bytes);
    if let Cow::Owned(_) = html {
        warn!("Page {} is not valid UTF-8; replacing bad bytes", input.display());
    }

    let mut answer = extract_answer(&html, &opts.clean)
        .with_context(|| format!("Failed to locate answer on page {}", input.display()))?;
    debug!(
        "Title: {}",
        answer.title.as_deref().unwrap_or("(could not be determined)")
    );

    let images = if opts.download_images {
        images::localize_images(&mut answer.body, fetcher).await
    } else {
        0
    };

    let page = document::render_page(answer.title.as_deref(), &answer.body);
    fs::write(output, page).with_context(|| format!("Failed to save to file {}", output.display()))?;
    Ok(images)
}

// ── Tests ──

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    use crate::document::to_html;
    use crate::http::testing::MockTransport;

    const IMG: &str = "https://qph.fs.quoracdn.net/main-qimg-5f1e2d";

    fn fixture() -> String {
        std::fs::read_to_string("tests/fixtures/answer.html").unwrap()
    }

    fn options(input: &Path, output: &Path, download_images: bool) -> ConvertOptions {
        ConvertOptions {
            input_dir: input.to_path_buf(),
            output_dir: output.to_path_buf(),
            delay: Duration::ZERO,
            download_images,
            clean: CleanOptions::default(),
        }
    }

    #[test]
    fn fixture_answer_is_cleaned() {
        let answer = extract_answer(&fixture(), &CleanOptions::default()).unwrap();
        assert_eq!(
            answer.title.as_deref(),
            Some("Example Person's answer to What is ownership in Rust? - Quora")
        );

        let body = to_html(&answer.body);
        assert!(body.starts_with("<p>Ownership means every value has <b>one</b> owner."));
        assert!(body.contains("<a href=\"http://quora.com/Example-Person\">Example Person</a>"));
        assert!(body.contains("<code>Box&lt;T&gt;</code>"));
        assert!(body.contains("<pre><code>fn main() {\n    let s = String::new();\n}</code></pre>"));
        assert!(body.contains(&format!("<img src=\"{}\" alt=\"diagram\">", IMG)));
        assert!(body.contains(
            "<iframe allowfullscreen=\"\" frameborder=\"0\" height=\"295\" \
             src=\"http://www.youtube.com/embed/VFIOSWy93H0\" width=\"525\"></iframe>"
        ));
        assert!(body.contains("<ul><li>moves</li><li>borrows</li></ul>"));
        assert!(!body.contains("Upvote"));
        assert!(!body.contains("<span"));
        assert!(!body.contains("<script"));
        assert!(!body.contains("class="));
    }

    #[test]
    fn page_without_answer_is_a_parse_error() {
        let err = extract_answer("<html><body><div class=\"Answer\">x</div></body></html>", &CleanOptions::default())
            .unwrap_err();
        assert!(matches!(err, Error::Parse(_)));
    }

    #[test]
    fn answer_class_is_matched_as_a_token() {
        let html = "<div class=\"ExpandedAnswerWrapper\">no</div><div class=\"Answer ExpandedAnswer\">yes</div>";
        let answer = extract_answer(html, &CleanOptions::default()).unwrap();
        assert_eq!(answer.body, vec![Node::Text("yes".into())]);
        assert_eq!(answer.title, None);
    }

    #[tokio::test]
    async fn converts_directory_and_saves_images() {
        let input = tempfile::tempdir().unwrap();
        let output = tempfile::tempdir().unwrap();
        fs::write(input.path().join("2020-03-10 What-is-ownership-in-Rust.html"), fixture()).unwrap();
        fs::write(input.path().join("broken.html"), "<html><body>nothing</body></html>").unwrap();
        fs::write(input.path().join("notes.txt"), "ignored").unwrap();

        let transport = MockTransport::default().with(IMG, b"img");
        let stats = convert_all(&options(input.path(), output.path(), true), &transport, false)
            .await
            .unwrap();

        assert_eq!(stats.total, 2);
        assert_eq!(stats.converted, 1);
        assert_eq!(stats.failed, 1);
        assert_eq!(stats.images, 1);
        assert!(output.path().join("main-qimg-5f1e2d.png").exists());

        let page = fs::read_to_string(output.path().join("2020-03-10 What-is-ownership-in-Rust.html")).unwrap();
        assert!(page.starts_with("<!DOCTYPE html><html><head><title>"));
        assert!(page.contains("<img src=\"main-qimg-5f1e2d.png\" alt=\"diagram\">"));
        assert!(!output.path().join("broken.html").exists());
    }

    #[tokio::test]
    async fn no_download_keeps_remote_images() {
        let input = tempfile::tempdir().unwrap();
        let output = tempfile::tempdir().unwrap();
        fs::write(input.path().join("a.html"), fixture()).unwrap();

        let transport = MockTransport::default().with(IMG, b"img");
        let stats = convert_all(&options(input.path(), output.path(), false), &transport, false)
            .await
            .unwrap();

        assert_eq!(stats.converted, 1);
        assert_eq!(transport.call_count(), 0);
        let page = fs::read_to_string(output.path().join("a.html")).unwrap();
        assert!(page.contains(&format!("<img src=\"{}\" alt=\"diagram\">", IMG)));
    }

    #[tokio::test]
    async fn invalid_utf8_page_is_still_converted() {
        let input = tempfile::tempdir().unwrap();
        let output = tempfile::tempdir().unwrap();
        fs::write(
            input.path().join("a.html"),
            b"<html><body><div class=\"ExpandedAnswer\">caf\xE9 ok</div></body></html>",
        )
        .unwrap();

        let transport = MockTransport::default();
        let stats = convert_all(&options(input.path(), output.path(), true), &transport, false)
            .await
            .unwrap();

        assert_eq!(stats.converted, 1);
        assert_eq!(stats.failed, 0);
        let page = fs::read_to_string(output.path().join("a.html")).unwrap();
        assert!(page.contains("caf\u{FFFD} ok"));
    }

    #[tokio::test]
    async fn empty_input_directory_is_fatal() {
        let input = tempfile::tempdir().unwrap();
        let output = tempfile::tempdir().unwrap();
        let transport = MockTransport::default();
        assert!(convert_all(&options(input.path(), output.path(), true), &transport, false)
            .await
            .is_err());
    }
}
