use std::fs;
use std::path::Path;
use std::sync::LazyLock;

use anyhow::{Context, Result};
use indicatif::{ProgressBar, ProgressStyle};
use regex::Regex;
use serde::Deserialize;
use tracing::{debug, error, info, warn};

use crate::config::CrawlOptions;
use crate::dates;
use crate::http::Transport;

/// Longest filename most filesystems accept, in bytes.
const MAX_FILENAME_BYTES: usize = 255;
const EXTENSION: &str = ".html";
/// Date part of the filename when the label cannot be resolved.
const UNKNOWN_DATE: &str = "xxxx-xx-xx";

static QUESTION_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"quora\.com/([^/]+)/answer").unwrap());
static TOPIC_QUESTION_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"quora\.com/[^/]+/([^/]+)/answer").unwrap());

/// One `[url, dateLabel]` entry of the crawl list.
#[derive(Debug, Deserialize)]
pub struct AnswerEntry(pub String, pub String);

/// Crawl stats returned after completion.
pub struct CrawlStats {
    pub total: usize,
    pub downloaded: usize,
    pub skipped: usize,
    pub failed: usize,
}

/// Read the JSON list of `[url, dateLabel]` pairs.
pub fn load_answer_list(path: &Path) -> Result<Vec<AnswerEntry>> {
    debug!("Loading input file {}", path.display());
    let raw = fs::read_to_string(path)
        .with_context(|| format!("Failed to read input file {}", path.display()))?;
    parse_answer_list(&raw)
}

fn parse_answer_list(raw: &str) -> Result<Vec<AnswerEntry>> {
    serde_json::from_str(raw).context("Incorrect input format: expected a list of [url, date] pairs")
}

/// `<date> <question-slug>.html`, or `None` when the URL has no question part.
pub fn answer_filename(url: &str, date: &str) -> Option<String> {
    let slug = QUESTION_RE
        .captures(url)
        .or_else(|| TOPIC_QUESTION_RE.captures(url))?
        .get(1)?
        .as_str();
    Some(truncate_filename(format!("{} {}", date, slug)))
}

/// Append the extension, trimming the stem so the whole name fits in 255 bytes.
fn truncate_filename(mut stem: String) -> String {
    let max_stem = MAX_FILENAME_BYTES - EXTENSION.len();
    if stem.len() > max_stem {
        let mut cut = max_stem;
        while !stem.is_char_boundary(cut) {
            cut -= 1;
        }
        stem.truncate(cut);
        debug!("Filename was truncated to {} bytes", MAX_FILENAME_BYTES);
    }
    stem.push_str(EXTENSION);
    stem
}

/// Download every listed answer page into the output directory.
pub async fn crawl<T: Transport>(opts: &CrawlOptions, transport: &T, show_progress: bool) -> Result<CrawlStats> {
    let answers = load_answer_list(&opts.input_file)?;
    info!("Found {} answers", answers.len());

    debug!("Creating directory {}", opts.output_dir.display());
    fs::create_dir_all(&opts.output_dir)
        .with_context(|| format!("Failed to create output directory {}", opts.output_dir.display()))?;

    let pb = if show_progress {
        ProgressBar::new(answers.len() as u64)
    } else {
        ProgressBar::hidden()
    };
    pb.set_style(
        ProgressStyle::default_bar()
            .template("[{elapsed_precise}] {bar:40} {pos}/{len} ({per_sec}, eta {eta})")?
            .progress_chars("=> "),
    );

    let mut stats = CrawlStats {
        total: answers.len(),
        downloaded: 0,
        skipped: 0,
        failed: 0,
    };

    for AnswerEntry(url, label) in &answers {
        info!("URL: {}", url);
        let date = match dates::parse_relative_date(opts.origin, label) {
            Ok(date) => date,
            Err(e) => {
                warn!("Failed to parse date: {}", e);
                UNKNOWN_DATE.to_string()
            }
        };
        info!("Date: {}", date);

        let Some(filename) = answer_filename(url, &date) else {
            error!("Could not find question part of URL {}; skipping", url);
            stats.failed += 1;
            pb.inc(1);
            continue;
        };
        debug!("Filename: {}", filename);

        let path = opts.output_dir.join(&filename);
        if !opts.overwrite && path.is_file() {
            debug!("Answer file {} already exists; skipping", filename);
            stats.skipped += 1;
            pb.inc(1);
            continue;
        }

        debug!("Downloading answer from URL {}", url);
        match save_page(transport, url, &path).await {
            Ok(()) => {
                stats.downloaded += 1;
                if !opts.delay.is_zero() {
                    tokio::time::sleep(opts.delay).await;
                }
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
        "Crawled {} answers ({} downloaded, {} skipped, {} failed)",
        stats.total, stats.downloaded, stats.skipped, stats.failed
    );
    Ok(stats)
}

async fn save_page<T: Transport>(transport: &T, url: &str, path: &Path) -> Result<()> {
    let page = transport
        .get_bytes(url)
        .await
        .with_context(|| format!("Failed to download answer from URL {}", url))?;
    fs::write(path, page).with_context(|| format!("Failed to save answer to file {}", path.display()))?;
    Ok(())
}

// ── Tests ──
