use crate::apis::{ArticleQuery, ArticleRecord, ArticleSource, PatentRecord, PatentSource};

pub const MAX_ARTICLES: usize = 20;
pub const DEFAULT_PATENT_LIMIT: usize = 20;
/// Below this many primary patents the secondary provider tops the list up.
pub const PATENT_TOP_UP_THRESHOLD: usize = 5;
const FALLBACK_TERM: &str = "artificial intelligence";

/// Query for the secondary article provider: keywords, else field, else a generic term.
pub fn fallback_query(query: &ArticleQuery) -> ArticleQuery {
    let text = [query.keywords.trim(), query.field.trim()]
        .into_iter()
        .find(|s| !s.is_empty())
        .unwrap_or(FALLBACK_TERM);
    ArticleQuery::text(text)
}

/// Ask the primary provider; only if it returns nothing, ask the secondary.
/// Results are never merged.
pub async fn search_articles(
    primary: &dyn ArticleSource,
    secondary: &dyn ArticleSource,
    query: &ArticleQuery,
) -> Vec<ArticleRecord> {
    tracing::info!(
        "Searching articles: field={:?}, keywords={:?}",
        query.field,
        query.keywords
    );
    let mut articles = primary.fetch(query).await;
    if articles.is_empty() {
        let fallback = fallback_query(query);
        tracing::info!(
            "{} returned nothing, falling back to {} with {:?}",
            primary.name(),
            secondary.name(),
            fallback.keywords
        );
        articles = secondary.fetch(&fallback).await;
    }
    articles.truncate(MAX_ARTICLES);
    articles
}

/// Ask the primary provider for `limit` patents and top up from the secondary
/// when fewer than [`PATENT_TOP_UP_THRESHOLD`] came back. Duplicates across the
/// two providers are kept.
pub async fn search_patents(
    primary: &dyn PatentSource,
    secondary: &dyn PatentSource,
    query: &str,
    limit: usize,
) -> Vec<PatentRecord> {
    if query.trim().is_empty() {
        return Vec::new();
    }

    tracing::info!("Searching patents: query={:?}, limit={}", query, limit);
    let mut patents = primary.fetch(query, limit).await;
    if patents.len() < PATENT_TOP_UP_THRESHOLD {
        let remaining = limit.saturating_sub(patents.len());
        if remaining > 0 {
            tracing::info!(
                "{} returned {} patents, requesting {} more from {}",
                primary.name(),
                patents.len(),
                remaining,
                secondary.name()
            );
            patents.extend(secondary.fetch(query, remaining).await);
        }
    }
    patents.truncate(limit);
    patents
}
