use super::normalize::{
    collapse_whitespace, html_to_text, non_blank, or_placeholder, truncate_chars, ABSTRACT_CAP,
    NO_ABSTRACT, NO_URL, UNCATEGORIZED, UNTITLED,
};
use super::{ensure_success, http_client, ArticleRecord, RssSourceSpec, SourceError};
use chrono::SecondsFormat;
use std::time::Duration;

const MAX_ENTRIES: usize = 20;

/// Fetches one syndication feed (RSS 2.0, or Atom as a fallback) per call.
pub struct RssClient {
    client: reqwest::Client,
}

impl RssClient {
    pub fn new(timeout: Duration) -> Result<Self, SourceError> {
        Ok(Self {
            client: http_client(timeout)?,
        })
    }

    pub async fn fetch_feed(&self, source: &RssSourceSpec) -> Result<Vec<ArticleRecord>, SourceError> {
        tracing::debug!("Fetching feed {} from {}", source.name, source.rss_url);
        let resp = self.client.get(&source.rss_url).send().await?;
        let body = ensure_success(resp)?.bytes().await?;
        parse_feed(&body, source)
    }

    /// Like `fetch_feed`, but failures are logged and yield no articles.
    pub async fn fetch(&self, source: &RssSourceSpec) -> Vec<ArticleRecord> {
        match self.fetch_feed(source).await {
            Ok(articles) => {
                tracing::info!("Fetched {} articles from {}", articles.len(), source.name);
                articles
            }
            Err(e) => {
                tracing::warn!("Error fetching {}: {}", source.name, e);
                Vec::new()
            }
        }
    }
}

/// Entry fields common to both syndication formats, before normalization.
struct RawEntry<'a> {
    title: Option<&'a str>,
    link: Option<&'a str>,
    description: Option<&'a str>,
    published: Option<String>,
    author: Option<&'a str>,
}

pub fn parse_feed(body: &[u8], source: &RssSourceSpec) -> Result<Vec<ArticleRecord>, SourceError> {
    if let Ok(channel) = rss::Channel::read_from(body) {
        return Ok(channel
            .items()
            .iter()
            .take(MAX_ENTRIES)
            .map(rss_entry)
            .enumerate()
            .map(|(i, raw)| to_record(raw, i, source))
            .collect());
    }

    match atom_syndication::Feed::read_from(body) {
        Ok(feed) => Ok(feed
            .entries()
            .iter()
            .take(MAX_ENTRIES)
            .map(atom_entry)
            .enumerate()
            .map(|(i, raw)| to_record(raw, i, source))
            .collect()),
        Err(e) => Err(SourceError::Parse(format!("not an RSS or Atom feed: {}", e))),
    }
}

fn rss_entry(item: &rss::Item) -> RawEntry<'_> {
    let dublin_core = item.dublin_core_ext();
    RawEntry {
        title: item.title(),
        link: item.link(),
        description: item.description().or_else(|| item.content()),
        published: item
            .pub_date()
            .or_else(|| dublin_core.and_then(|dc| dc.dates().first().map(String::as_str)))
            .map(str::to_string),
        author: item
            .author()
            .or_else(|| dublin_core.and_then(|dc| dc.creators().first().map(String::as_str))),
    }
}

fn atom_entry(entry: &atom_syndication::Entry) -> RawEntry<'_> {
    let link = entry
        .links()
        .iter()
        .find(|l| l.rel() == "alternate")
        .or_else(|| entry.links().first())
        .map(|l| l.href());
    let published = entry.published().unwrap_or_else(|| entry.updated());
    RawEntry {
        title: Some(entry.title().as_str()),
        link,
        description: entry
            .summary()
            .map(|s| s.as_str())
            .or_else(|| entry.content().and_then(|c| c.value())),
        published: Some(published.to_rfc3339_opts(SecondsFormat::Secs, true)),
        author: entry.authors().first().map(|p| p.name()),
    }
}

fn to_record(raw: RawEntry<'_>, index: usize, source: &RssSourceSpec) -> ArticleRecord {
    let description = collapse_whitespace(&html_to_text(raw.description.unwrap_or_default()));
    let description = or_placeholder(Some(description.as_str()), NO_ABSTRACT);
    ArticleRecord {
        id: format!("{}-{}", source.name, index),
        title: or_placeholder(raw.title, UNTITLED),
        authors: non_blank(raw.author).map(str::to_string).into_iter().collect(),
        abstract_text: truncate_chars(&description, ABSTRACT_CAP),
        url: or_placeholder(raw.link, NO_URL),
        published_date: raw.published.unwrap_or_default().trim().to_string(),
        source: source.name.clone(),
        category: Some(or_placeholder(source.category.as_deref(), UNCATEGORIZED)),
    }
}
