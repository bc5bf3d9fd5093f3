use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::Semaphore;
use tokio::task::JoinSet;

use crate::apis::rss::RssClient;
use crate::apis::{ArticleRecord, RssSourceSpec};

/// Most feed fetches in flight at once for one aggregation call.
pub const MAX_CONCURRENT_FETCHES: usize = 5;
/// Cap on the merged article list.
pub const MAX_MERGED_ARTICLES: usize = 50;

/// Fetches the articles of a single feed. Implementations must not fail.
#[async_trait]
pub trait FeedFetcher: Send + Sync {
    async fn fetch_feed(&self, source: &RssSourceSpec) -> Vec<ArticleRecord>;
}

#[async_trait]
impl FeedFetcher for RssClient {
    async fn fetch_feed(&self, source: &RssSourceSpec) -> Vec<ArticleRecord> {
        self.fetch(source).await
    }
}

/// Fetch every enabled feed concurrently, merge, sort newest first and cap.
///
/// Dates are compared as plain strings, so feeds mixing RFC 822 and ISO 8601
/// dates do not interleave chronologically.
pub async fn fetch_feeds(
    fetcher: Arc<dyn FeedFetcher>,
    sources: &[RssSourceSpec],
) -> Vec<ArticleRecord> {
    let enabled: Vec<RssSourceSpec> = sources.iter().filter(|s| s.is_enabled()).cloned().collect();
    if enabled.is_empty() {
        return Vec::new();
    }

    tracing::info!("Fetching {} feeds", enabled.len());
    let permits = Arc::new(Semaphore::new(MAX_CONCURRENT_FETCHES));
    let mut tasks = JoinSet::new();
    for source in enabled {
        let fetcher = Arc::clone(&fetcher);
        let permits = Arc::clone(&permits);
        tasks.spawn(async move {
            let Ok(_permit) = permits.acquire_owned().await else {
                return Vec::new();
            };
            fetcher.fetch_feed(&source).await
        });
    }

    // Completion order, not submission order.
    let mut articles = Vec::new();
    while let Some(joined) = tasks.join_next().await {
        match joined {
            Ok(batch) => articles.extend(batch),
            Err(e) => tracing::warn!("Feed task failed: {}", e),
        }
    }

    sort_and_cap(articles)
}

fn sort_and_cap(mut articles: Vec<ArticleRecord>) -> Vec<ArticleRecord> {
    articles.sort_by(|a, b| b.published_date.cmp(&a.published_date));
    articles.truncate(MAX_MERGED_ARTICLES);
    articles
}
