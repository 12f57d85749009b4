use std::time::Duration;

use anyhow::{Context, Result};

const USER_AGENT: &str = concat!("quora_archive/", env!("CARGO_PKG_VERSION"));

/// Whole-body GET. Calls are made one at a time; nothing here retries.
#[allow(async_fn_in_trait)]
pub trait Transport {
    async fn get_bytes(&self, url: &str) -> Result<Vec<u8>>;
}

/// `reqwest`-backed transport shared by the crawler and the image fetcher.
pub struct HttpClient {
    client: reqwest::Client,
}

impl HttpClient {
    pub fn new(timeout: Option<Duration>) -> Result<Self> {
        let mut builder = reqwest::Client::builder().user_agent(USER_AGENT);
        if let Some(timeout) = timeout {
            builder = builder.timeout(timeout);
        }
        let client = builder.build().context("Failed to build HTTP client")?;
        Ok(Self { client })
    }
}

impl Transport for HttpClient {
    async fn get_bytes(&self, url: &str) -> Result<Vec<u8>> {
        let body = self
            .client
            .get(url)
            .send()
            .await?
            .error_for_status()?
            .bytes()
            .await?;
        Ok(body.to_vec())
    }
}
