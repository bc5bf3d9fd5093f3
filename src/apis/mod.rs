pub mod arxiv;
pub mod google_patents;
pub mod normalize;
pub mod patentsview;
pub mod retry;
pub mod rss;
pub mod semantic_scholar;

use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

pub const USER_AGENT: &str = "research-feed/0.1";

/// A paper or web article in the shape every provider normalizes into.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ArticleRecord {
    pub id: String,
    pub title: String,
    pub authors: Vec<String>,
    #[serde(rename = "abstract")]
    pub abstract_text: String,
    pub url: String,
    pub published_date: String,
    pub source: String,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub category: Option<String>,
}

/// A patent; `authors` holds the inventors.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PatentRecord {
    pub id: String,
    pub title: String,
    pub authors: Vec<String>,
    pub assignees: Vec<String>,
    #[serde(rename = "abstract")]
    pub abstract_text: String,
    pub url: String,
    pub published_date: String,
    pub source: String,
}

/// One RSS/Atom feed the caller wants aggregated.
#[derive(Debug, Clone, Serialize, Deserialize, schemars::JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct RssSourceSpec {
    pub rss_url: String,
    pub name: String,
    #[serde(default)]
    pub category: Option<String>,
    #[serde(default)]
    pub enabled: Option<bool>,
}

impl RssSourceSpec {
    pub fn is_enabled(&self) -> bool {
        self.enabled.unwrap_or(true)
    }
}

/// Article search criteria: a domain label and free-text keywords, both optional.
#[derive(Debug, Clone, Default)]
pub struct ArticleQuery {
    pub field: String,
    pub keywords: String,
}

impl ArticleQuery {
    pub fn text(text: impl Into<String>) -> Self {
        Self {
            field: String::new(),
            keywords: text.into(),
        }
    }
}

#[derive(Debug, Error)]
pub enum SourceError {
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),
    #[error("Unexpected status: {0}")]
    Status(u16),
    #[error("Parse error: {0}")]
    Parse(String),
    #[error("API error: {0}")]
    Api(String),
}

#[async_trait]
pub trait ArticleSource: Send + Sync {
    fn name(&self) -> &str;

    async fn search(&self, query: &ArticleQuery) -> Result<Vec<ArticleRecord>, SourceError>;

    /// Like `search`, but never fails: errors are logged and become an empty list.
    async fn fetch(&self, query: &ArticleQuery) -> Vec<ArticleRecord> {
        match self.search(query).await {
            Ok(articles) => {
                tracing::info!("{} returned {} articles", self.name(), articles.len());
                articles
            }
            Err(e) => {
                tracing::warn!("{} search failed: {}", self.name(), e);
                Vec::new()
            }
        }
    }
}

#[async_trait]
pub trait PatentSource: Send + Sync {
    fn name(&self) -> &str;

    async fn search(&self, query: &str, limit: usize) -> Result<Vec<PatentRecord>, SourceError>;

    /// Like `search`, but never fails: errors are logged and become an empty list.
    async fn fetch(&self, query: &str, limit: usize) -> Vec<PatentRecord> {
        match self.search(query, limit).await {
            Ok(patents) => {
                tracing::info!("{} returned {} patents", self.name(), patents.len());
                patents
            }
            Err(e) => {
                tracing::warn!("{} search failed: {}", self.name(), e);
                Vec::new()
            }
        }
    }
}

pub(crate) fn http_client(timeout: Duration) -> Result<reqwest::Client, SourceError> {
    Ok(reqwest::Client::builder()
        .user_agent(USER_AGENT)
        .timeout(timeout)
        .build()?)
}

/// Fails with `SourceError::Status` unless the response is a 2xx.
pub(crate) fn ensure_success(resp: reqwest::Response) -> Result<reqwest::Response, SourceError> {
    let status = resp.status();
    if status.is_success() {
        Ok(resp)
    } else {
        Err(SourceError::Status(status.as_u16()))
    }
}
