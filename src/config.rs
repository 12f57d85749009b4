use std::path::PathBuf;
use std::time::Duration;

use anyhow::{bail, Result};
use chrono::{Local, Utc};
use tracing::debug;

/// Canonical origin prefixed to site-relative links.
pub const SITE_ORIGIN: &str = "http://quora.com";

/// Request timeout used when `--timeout` is not given.
pub const DEFAULT_TIMEOUT_SECS: u64 = 60;

/// Knobs for the tree cleanup pass.
#[derive(Debug, Clone)]
pub struct CleanOptions {
    /// Prefix for links such as `/Some-Person`.
    pub site_origin: String,
    /// Treat `<p>` like the other structural tags instead of copying it raw.
    pub keep_paragraphs: bool,
}

impl Default for CleanOptions {
    fn default() -> Self {
        Self {
            site_origin: SITE_ORIGIN.to_string(),
            keep_paragraphs: true,
        }
    }
}

#[derive(Debug, Clone)]
pub struct ConvertOptions {
    pub input_dir: PathBuf,
    pub output_dir: PathBuf,
    /// Pause after every image actually downloaded.
    pub delay: Duration,
    pub download_images: bool,
    pub clean: CleanOptions,
}

#[derive(Debug, Clone)]
pub struct CrawlOptions {
    pub input_file: PathBuf,
    pub output_dir: PathBuf,
    /// Pause after every page actually downloaded.
    pub delay: Duration,
    /// Local wall-clock time as epoch seconds; relative date labels resolve against it.
    pub origin: i64,
    pub overwrite: bool,
}

/// Convert a user-supplied delay in seconds.
pub fn delay_from_secs(secs: f64) -> Result<Duration> {
    match Duration::try_from_secs_f64(secs) {
        Ok(d) => Ok(d),
        Err(_) => bail!("delay must be a non-negative number of seconds, got {}", secs),
    }
}

/// `0` disables the timeout.
pub fn timeout_from_secs(secs: u64) -> Option<Duration> {
    (secs > 0).then(|| Duration::from_secs(secs))
}

/// Resolve the origin for relative dates.
///
/// `timestamp_ms` is a JavaScript timestamp taken when the URL list was
/// collected; `timezone_min` is the browser's `getTimezoneOffset()` (minutes
/// west of UTC). Missing values fall back to the current time and the local
/// system offset.
pub fn resolve_origin(timestamp_ms: Option<i64>, timezone_min: Option<i64>) -> Result<i64> {
    let timestamp = match timestamp_ms {
        Some(ms) => ms.div_euclid(1000),
        None => {
            debug!("Using current time");
            Utc::now().timestamp()
        }
    };
    let west_secs = match timezone_min {
        Some(min) => match min.checked_mul(60) {
            Some(secs) => secs,
            None => bail!("time zone offset {} minutes is out of range", min),
        },
        None => {
            debug!("Using system time zone");
            -i64::from(Local::now().offset().local_minus_utc())
        }
    };
    match timestamp.checked_sub(west_secs) {
        Some(origin) => Ok(origin),
        None => bail!("origin timestamp {} is out of range", timestamp),
    }
}

// ── Tests ──
