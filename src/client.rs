use std::time::Duration;

use anyhow::Context as _;
use reqwest::blocking::Client;
use reqwest::header::{ACCEPT, USER_AGENT};
use url::Url;

use crate::index::{self, ChapterEntry};
use crate::normalize;

static USER_AGENT_VALUE: &str = concat!("novelpack/", env!("CARGO_PKG_VERSION"));

/// Blocking HTTP client bound to one novel's index page. The site serves chapter
/// URLs relative to its origin, so the origin is remembered from the index URL.
///
/// Every request is a single synchronous attempt: a non-success status aborts the
/// run rather than being retried.
pub struct SiteClient {
    client: Client,
    index_url: Url,
    origin: String,
}

impl SiteClient {
    pub fn new(index_url: &str) -> anyhow::Result<Self> {
        let index_url = Url::parse(index_url).context("parse index url")?;
        if index_url.scheme() != "http" && index_url.scheme() != "https" {
            anyhow::bail!("index url must be http/https: {index_url}");
        }
        let origin = site_origin(&index_url)?;

        let client = Client::builder()
            .timeout(Duration::from_secs(30))
            .build()
            .context("build http client")?;

        Ok(Self {
            client,
            index_url,
            origin,
        })
    }

    /// Fetches and parses the chapter listing. Called once per run.
    pub fn fetch_index(&self) -> anyhow::Result<Vec<ChapterEntry>> {
        let body = self.get(self.index_url.as_str())?;
        index::parse_index(&body)
    }

    /// Fetches one chapter page, already normalized to ASCII.
    pub fn fetch_chapter(&self, relative_url: &str) -> anyhow::Result<String> {
        let full_url = format!("{}{}", self.origin, relative_url);
        self.get(&full_url)
    }

    fn get(&self, url: &str) -> anyhow::Result<String> {
        tracing::debug!(%url, "GET");
        let response = self
            .client
            .get(url)
            .header(USER_AGENT, USER_AGENT_VALUE)
            .header(ACCEPT, "text/html,application/xhtml+xml;q=0.9,*/*;q=0.8")
            .send()
            .with_context(|| format!("GET {url}"))?;

        let status = response.status();
        if !status.is_success() {
            anyhow::bail!("GET {url} returned {status}");
        }

        let bytes = response
            .bytes()
            .with_context(|| format!("read body: {url}"))?;
        normalize::normalize_bytes(&bytes).with_context(|| format!("normalize body: {url}"))
    }
}

fn site_origin(url: &Url) -> anyhow::Result<String> {
    let host = url
        .host_str()
        .ok_or_else(|| anyhow::anyhow!("index url must have host: {url}"))?;

    Ok(match url.port() {
        Some(port) => format!("{}://{host}:{port}", url.scheme()),
        None => format!("{}://{host}", url.scheme()),
    })
}
