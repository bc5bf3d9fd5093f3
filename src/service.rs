//! Request/response contract exposed to the tool layer.

use std::any::Any;
use std::future::Future;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;

use futures::FutureExt;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::apis::{
    ArticleQuery, ArticleRecord, ArticleSource, PatentRecord, PatentSource, RssSourceSpec,
    SourceError,
};
use crate::config::Config;
use crate::feeds::{self, FeedFetcher};
use crate::search;
use crate::summarize::{self, Summarizer};

const NO_PAPERS: &str = "No papers found. Try different keywords.";
const NO_SOURCES: &str = "No sources specified";
const NO_WEB_ARTICLES: &str = "No articles found";
const EMPTY_PATENT_QUERY: &str = "Please enter a search query";
const NO_PATENTS: &str = "No patents found. Try different keywords.";
const MISSING_SUMMARY_INPUT: &str = "Title and abstract are required";

#[derive(Debug, Default, Deserialize, JsonSchema)]
pub struct ArticleSearchRequest {
    #[serde(default)]
    #[schemars(description = "Research field label, e.g. \"machine learning\" or \"quantum computing\"")]
    pub field: String,
    #[serde(default)]
    #[schemars(description = "Free-text keywords")]
    pub keywords: String,
}

#[derive(Debug, Default, Deserialize, JsonSchema)]
pub struct WebArticlesRequest {
    #[serde(default)]
    #[schemars(description = "RSS/Atom feeds to aggregate: {rssUrl, name, category?, enabled?}")]
    pub sources: Vec<RssSourceSpec>,
}

#[derive(Debug, Default, Deserialize, JsonSchema)]
pub struct PatentSearchRequest {
    #[serde(default)]
    #[schemars(description = "Patent search keywords")]
    pub query: String,
    #[schemars(description = "Maximum patents to return (default 20)")]
    pub limit: Option<usize>,
}

#[derive(Debug, Default, Deserialize, JsonSchema)]
pub struct SummarizeRequest {
    #[serde(default)]
    #[schemars(description = "Paper title")]
    pub title: String,
    #[serde(default, rename = "abstract")]
    #[schemars(description = "Paper abstract")]
    pub abstract_text: String,
}

#[derive(Debug, Serialize)]
pub struct ArticlesResponse {
    pub articles: Vec<ArticleRecord>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct PatentsResponse {
    pub patents: Vec<PatentRecord>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct SummaryResponse {
    pub summary: String,
}

#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<String>,
}

impl ArticlesResponse {
    fn from_articles(articles: Vec<ArticleRecord>, empty_message: &str) -> Self {
        let message = articles.is_empty().then(|| empty_message.to_string());
        Self { articles, message }
    }
}

/// Every provider the boundary operations orchestrate.
#[derive(Clone)]
pub struct ResearchFeed {
    pub(crate) papers: Arc<dyn ArticleSource>,
    pub(crate) papers_fallback: Arc<dyn ArticleSource>,
    pub(crate) feeds: Arc<dyn FeedFetcher>,
    pub(crate) patents: Arc<dyn PatentSource>,
    pub(crate) patents_top_up: Arc<dyn PatentSource>,
    pub(crate) summarizer: Arc<dyn Summarizer>,
}

impl ResearchFeed {
    pub fn from_config(config: &Config) -> Result<Self, SourceError> {
        Ok(Self {
            papers: Arc::new(config.build_arxiv()?),
            papers_fallback: Arc::new(config.build_semantic_scholar()?),
            feeds: Arc::new(config.build_rss()?),
            patents: Arc::new(config.build_google_patents()?),
            patents_top_up: Arc::new(config.build_patentsview()?),
            summarizer: config.build_summarizer()?,
        })
    }

    pub async fn search_articles(
        &self,
        req: ArticleSearchRequest,
    ) -> Result<ArticlesResponse, ErrorResponse> {
        let query = ArticleQuery {
            field: req.field,
            keywords: req.keywords,
        };
        let articles = guarded(
            "Failed to fetch papers",
            search::search_articles(self.papers.as_ref(), self.papers_fallback.as_ref(), &query),
        )
        .await?;
        Ok(ArticlesResponse::from_articles(articles, NO_PAPERS))
    }

    pub async fn search_web_articles(
        &self,
        req: WebArticlesRequest,
    ) -> Result<ArticlesResponse, ErrorResponse> {
        if req.sources.is_empty() {
            return Ok(ArticlesResponse::from_articles(Vec::new(), NO_SOURCES));
        }
        let articles = guarded(
            "Failed to fetch web articles",
            feeds::fetch_feeds(Arc::clone(&self.feeds), &req.sources),
        )
        .await?;
        Ok(ArticlesResponse::from_articles(articles, NO_WEB_ARTICLES))
    }

    pub async fn search_patents(
        &self,
        req: PatentSearchRequest,
    ) -> Result<PatentsResponse, ErrorResponse> {
        if req.query.trim().is_empty() {
            return Ok(PatentsResponse {
                patents: Vec::new(),
                message: Some(EMPTY_PATENT_QUERY.to_string()),
            });
        }
        let limit = req.limit.unwrap_or(search::DEFAULT_PATENT_LIMIT);
        let patents = guarded(
            "Failed to fetch patents",
            search::search_patents(
                self.patents.as_ref(),
                self.patents_top_up.as_ref(),
                &req.query,
                limit,
            ),
        )
        .await?;
        let message = patents.is_empty().then(|| NO_PATENTS.to_string());
        Ok(PatentsResponse { patents, message })
    }

    pub async fn summarize(&self, req: SummarizeRequest) -> Result<SummaryResponse, ErrorResponse> {
        if req.title.trim().is_empty() || req.abstract_text.trim().is_empty() {
            return Err(ErrorResponse {
                error: MISSING_SUMMARY_INPUT.to_string(),
                details: None,
            });
        }
        let summary = guarded(
            "Failed to generate summary",
            summarize::summarize_or_template(self.summarizer.as_ref(), &req.title, &req.abstract_text),
        )
        .await?;
        Ok(SummaryResponse { summary })
    }
}

/// Run `fut`, turning a panic into an error response carrying the panic text.
async fn guarded<T>(context: &str, fut: impl Future<Output = T>) -> Result<T, ErrorResponse> {
    match AssertUnwindSafe(fut).catch_unwind().await {
        Ok(value) => Ok(value),
        Err(panic) => {
            let details = panic_message(panic.as_ref());
            tracing::error!("{}: {}", context, details);
            Err(ErrorResponse {
                error: context.to_string(),
                details: Some(details),
            })
        }
    }
}

fn panic_message(panic: &(dyn Any + Send)) -> String {
    if let Some(s) = panic.downcast_ref::<&str>() {
        s.to_string()
    } else if let Some(s) = panic.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown error".to_string()
    }
}
