/// Errors raised while rewriting a page or fetching its images.
///
/// Every variant is recoverable at the scope that raises it: the caller logs
/// a warning and falls back (verbatim copy, remote URL, placeholder date).
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Input did not have the expected structure (date label, answer page).
    #[error("parse error: {0}")]
    Parse(String),

    /// No filename could be derived from a URL.
    #[error("cannot derive a filename from {0:?}")]
    Naming(String),

    /// Network fetch or file write failed.
    #[error("download of {url} failed: {reason}")]
    Download { url: String, reason: String },

    /// A node did not have the shape its handler expects.
    #[error("unexpected node shape: {0}")]
    Validation(String),
}

pub type Result<T> = std::result::Result<T, Error>;
