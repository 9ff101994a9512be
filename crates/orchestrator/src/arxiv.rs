//! arXiv paper search
//!
//! Queries the public Atom API and turns each `<entry>` into a [`Paper`].
//! The feed is read by scanning for tags; arXiv's Atom output is regular
//! enough that a full XML parser is not needed.

use std::collections::HashSet;
use std::time::Duration;

use async_trait::async_trait;
use chrono::DateTime;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{debug, info, warn};

use crate::capabilities::input_text;
use crate::registry::{
    Capability, CapabilityError, CapabilityInputs, CapabilityOutput, CapabilityResult,
};

pub const ARXIV_API_URL: &str = "https://export.arxiv.org/api/query";

/// Task name the search capability is registered under.
pub const SEARCH_PAPERS: &str = "search_papers";
/// Alias planners use for the reranked search.
pub const SEMANTIC_RERANK: &str = "semantic_rerank";

const USER_AGENT: &str = concat!("researcher/", env!("CARGO_PKG_VERSION"));
const DEFAULT_RESULTS: usize = 5;
const DEFAULT_ATTEMPTS: u32 = 3;
const DEFAULT_PAUSE_MS: u64 = 1000;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Paper {
    pub title: String,
    pub summary: String,
    pub authors: Vec<String>,
    /// `YYYY-MM-DD`, empty when the feed has no date
    pub published: String,
    pub pdf_url: Option<String>,
    /// Full id including version, e.g. `2301.12345v1`
    pub arxiv_id: Option<String>,
}

#[derive(Debug, Clone)]
pub struct ArxivClient {
    client: Client,
    base_url: String,
    attempts: u32,
    pause: Duration,
}

impl ArxivClient {
    pub fn new() -> Result<Self, CapabilityError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(30))
            .connect_timeout(Duration::from_secs(10))
            .user_agent(USER_AGENT)
            .build()?;

        Ok(Self {
            client,
            base_url: ARXIV_API_URL.to_string(),
            attempts: DEFAULT_ATTEMPTS,
            pause: Duration::from_millis(DEFAULT_PAUSE_MS),
        })
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    /// Total attempts per search and the pause between them.
    pub fn with_retry(mut self, attempts: u32, pause: Duration) -> Self {
        self.attempts = attempts.max(1);
        self.pause = pause;
        self
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Up to `max_results` papers for `query`, most relevant first.
    ///
    /// A blank query returns no papers without touching the network.
    pub async fn search(
        &self,
        query: &str,
        max_results: usize,
    ) -> Result<Vec<Paper>, CapabilityError> {
        let query = normalize_whitespace(query);
        if query.is_empty() {
            return Ok(Vec::new());
        }

        let mut attempt = 0;
        loop {
            attempt += 1;
            match self.search_once(&query, max_results).await {
                Ok(papers) => {
                    info!(query = %query, papers = papers.len(), "arXiv search complete");
                    return Ok(papers);
                }
                Err(e) if attempt < self.attempts => {
                    warn!(
                        attempt,
                        max_attempts = self.attempts,
                        error = %e,
                        "arXiv search failed, retrying in {:?}",
                        self.pause
                    );
                    tokio::time::sleep(self.pause).await;
                }
                Err(e) => return Err(e),
            }
        }
    }

    async fn search_once(
        &self,
        query: &str,
        max_results: usize,
    ) -> Result<Vec<Paper>, CapabilityError> {
        debug!(url = %self.base_url, query = %query, "Querying arXiv");
        let max_results = max_results.to_string();

        let response = self
            .client
            .get(&self.base_url)
            .query(&[
                ("search_query", query),
                ("start", "0"),
                ("max_results", max_results.as_str()),
                ("sortBy", "relevance"),
                ("sortOrder", "descending"),
            ])
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            return Err(CapabilityError::Failed(format!(
                "arXiv API returned status {}",
                status
            )));
        }

        let body = response.text().await?;
        Ok(parse_feed(&body))
    }
}

/// `search_papers`: looks up the run's query on arXiv.
///
/// Reads the `query` input, falling back to the other inputs as text, and
/// returns the papers as a JSON array deduplicated by arXiv id.
pub struct SearchPapersCapability {
    client: ArxivClient,
    max_results: usize,
}

impl SearchPapersCapability {
    pub fn new(client: ArxivClient) -> Self {
        Self {
            client,
            max_results: DEFAULT_RESULTS,
        }
    }

    pub fn with_max_results(mut self, max_results: usize) -> Self {
        self.max_results = max_results;
        self
    }
}

#[async_trait]
impl Capability for SearchPapersCapability {
    async fn call(&self, inputs: CapabilityInputs) -> CapabilityResult {
        let query = match inputs.get("query").and_then(Value::as_str) {
            Some(query) => query.to_string(),
            None => input_text(&inputs),
        };

        let mut seen = HashSet::new();
        let papers: Vec<Paper> = self
            .client
            .search(&query, self.max_results)
            .await?
            .into_iter()
            .filter(|p| match &p.arxiv_id {
                Some(id) => seen.insert(id.clone()),
                None => true,
            })
            .collect();

        Ok(CapabilityOutput::Value(serde_json::to_value(papers).map_err(
            |e| CapabilityError::Failed(format!("Failed to encode papers: {}", e)),
        )?))
    }
}

/// Every `<entry>` of an Atom feed that has an id and a title.
pub fn parse_feed(xml: &str) -> Vec<Paper> {
    blocks(xml, "<entry>", "</entry>")
        .filter_map(parse_entry)
        .collect()
}

fn parse_entry(entry: &str) -> Option<Paper> {
    let id_url = tag_text(entry, "id")?;
    let title = normalize_whitespace(&unescape(&tag_text(entry, "title")?));

    let authors = blocks(entry, "<author>", "</author>")
        .filter_map(|block| tag_text(block, "name"))
        .map(|name| unescape(&name))
        .collect();

    let published = tag_text(entry, "published")
        .map(|raw| match DateTime::parse_from_rfc3339(&raw) {
            Ok(dt) => dt.format("%Y-%m-%d").to_string(),
            Err(_) => raw.chars().take(10).collect(),
        })
        .unwrap_or_default();

    let pdf_url = blocks(entry, "<link", ">")
        .find(|link| {
            attribute(link, "title").as_deref() == Some("pdf")
                || attribute(link, "type").as_deref() == Some("application/pdf")
        })
        .and_then(|link| attribute(link, "href"));

    Some(Paper {
        title,
        summary: normalize_whitespace(&unescape(&tag_text(entry, "summary").unwrap_or_default())),
        authors,
        published,
        pdf_url,
        arxiv_id: arxiv_id_from_url(&id_url),
    })
}

/// Non-overlapping `open ... close` slices, delimiters included.
fn blocks<'a>(xml: &'a str, open: &'a str, close: &'a str) -> impl Iterator<Item = &'a str> + 'a {
    let mut from = 0;
    std::iter::from_fn(move || {
        let start = from + xml[from..].find(open)?;
        let end = start + xml[start..].find(close)? + close.len();
        from = end;
        Some(&xml[start..end])
    })
}

/// Text of the first `<tag ...>text</tag>`.
fn tag_text(xml: &str, tag: &str) -> Option<String> {
    let open = format!("<{}", tag);
    let close = format!("</{}>", tag);

    let mut from = 0;
    loop {
        let start = from + xml[from..].find(&open)?;
        let after = xml[start + open.len()..].chars().next()?;
        // `<id` must not match `<idx`
        if after == '>' || after.is_whitespace() {
            let content_start = start + xml[start..].find('>')? + 1;
            let content_end = content_start + xml[content_start..].find(&close)?;
            return Some(xml[content_start..content_end].trim().to_string());
        }
        from = start + open.len();
    }
}

fn attribute(tag: &str, name: &str) -> Option<String> {
    let needle = format!(" {}=\"", name);
    let start = tag.find(&needle)? + needle.len();
    let end = start + tag[start..].find('"')?;
    Some(unescape(&tag[start..end]))
}

/// `http://arxiv.org/abs/2301.12345v1` -> `2301.12345v1`
fn arxiv_id_from_url(url: &str) -> Option<String> {
    let pos = url.find("arxiv.org/abs/")?;
    let id = &url[pos + "arxiv.org/abs/".len()..];
    (!id.is_empty()).then(|| id.to_string())
}

fn normalize_whitespace(s: &str) -> String {
    s.split_whitespace().collect::<Vec<_>>().join(" ")
}

fn unescape(s: &str) -> String {
    s.replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&quot;", "\"")
        .replace("&apos;", "'")
        .replace("&amp;", "&")
}
