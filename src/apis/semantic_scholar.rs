use super::normalize::{non_blank, or_placeholder, NO_ABSTRACT, NO_URL, UNTITLED};
use super::{ensure_success, http_client, ArticleQuery, ArticleRecord, ArticleSource, SourceError};
use async_trait::async_trait;
use serde::Deserialize;
use std::time::Duration;

pub const BASE_URL: &str = "https://api.semanticscholar.org/graph/v1";
const FIELDS: &str = "title,abstract,authors,year,url,tldr";
const LIMIT: &str = "20";

pub struct SemanticScholarClient {
    client: reqwest::Client,
    base_url: String,
    api_key: Option<String>,
}

impl SemanticScholarClient {
    pub fn new(
        base_url: String,
        api_key: Option<String>,
        timeout: Duration,
    ) -> Result<Self, SourceError> {
        Ok(Self {
            client: http_client(timeout)?,
            base_url,
            api_key,
        })
    }

    fn add_auth(&self, req: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        match &self.api_key {
            Some(key) => req.header("x-api-key", key),
            None => req,
        }
    }
}

#[derive(Deserialize)]
struct S2SearchResponse {
    data: Option<Vec<S2Paper>>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct S2Paper {
    paper_id: Option<String>,
    title: Option<String>,
    authors: Option<Vec<S2Author>>,
    #[serde(rename = "abstract")]
    abstract_text: Option<String>,
    tldr: Option<S2Tldr>,
    year: Option<u32>,
    url: Option<String>,
}

#[derive(Deserialize)]
struct S2Author {
    name: Option<String>,
}

#[derive(Deserialize)]
struct S2Tldr {
    text: Option<String>,
}

fn s2_to_article(p: S2Paper, index: usize) -> ArticleRecord {
    // abstract, then the auto-generated TL;DR, then the placeholder
    let abstract_text = non_blank(p.abstract_text.as_deref())
        .or_else(|| non_blank(p.tldr.as_ref().and_then(|t| t.text.as_deref())))
        .unwrap_or(NO_ABSTRACT)
        .to_string();
    ArticleRecord {
        id: non_blank(p.paper_id.as_deref())
            .map(str::to_string)
            .unwrap_or_else(|| format!("semantic-{}", index)),
        title: or_placeholder(p.title.as_deref(), UNTITLED),
        authors: p
            .authors
            .unwrap_or_default()
            .into_iter()
            .filter_map(|a| a.name)
            .collect(),
        abstract_text,
        url: or_placeholder(p.url.as_deref(), NO_URL),
        published_date: p.year.map(|y| format!("{}-01-01", y)).unwrap_or_default(),
        source: "Semantic Scholar".to_string(),
        category: None,
    }
}

#[async_trait]
impl ArticleSource for SemanticScholarClient {
    fn name(&self) -> &str {
        "Semantic Scholar"
    }

    async fn search(&self, query: &ArticleQuery) -> Result<Vec<ArticleRecord>, SourceError> {
        let url = format!("{}/paper/search", self.base_url);
        tracing::debug!("Searching Semantic Scholar for: {}", query.keywords);
        let resp = self
            .add_auth(self.client.get(&url).query(&[
                ("query", query.keywords.as_str()),
                ("limit", LIMIT),
                ("fields", FIELDS),
            ]))
            .send()
            .await?;
        let resp: S2SearchResponse = ensure_success(resp)?.json().await?;
        Ok(resp
            .data
            .unwrap_or_default()
            .into_iter()
            .enumerate()
            .map(|(i, p)| s2_to_article(p, i))
            .collect())
    }
}
