use super::normalize::{collapse_whitespace, NO_ABSTRACT, NO_URL, UNTITLED};
use super::retry::{fetch_with_failover, RetryPolicy};
use super::{http_client, ArticleQuery, ArticleRecord, ArticleSource, SourceError};
use async_trait::async_trait;
use quick_xml::events::Event;
use quick_xml::Reader;
use std::time::Duration;

pub const DEFAULT_ENDPOINTS: [&str; 2] = [
    "http://export.arxiv.org/api/query",
    "https://export.arxiv.org/api/query",
];
const MAX_RESULTS: usize = 20;
const DEFAULT_TERM: &str = "artificial intelligence";

/// Domain labels offered by the dashboard and the search phrase each one maps to.
const FIELD_TERMS: [(&str, &str); 10] = [
    ("machine learning", "machine learning"),
    ("natural language processing", "natural language processing NLP"),
    ("computer vision", "computer vision"),
    ("data science", "data science"),
    ("web development", "web development"),
    ("mobile development", "mobile development"),
    ("cloud computing", "cloud computing"),
    ("blockchain", "blockchain"),
    ("cybersecurity", "cybersecurity security"),
    ("quantum computing", "quantum computing"),
];

pub struct ArxivClient {
    client: reqwest::Client,
    endpoints: Vec<String>,
    retry: RetryPolicy,
}

impl ArxivClient {
    pub fn new(
        endpoints: Vec<String>,
        retry: RetryPolicy,
        timeout: Duration,
    ) -> Result<Self, SourceError> {
        Ok(Self {
            client: http_client(timeout)?,
            endpoints,
            retry,
        })
    }

    fn candidate_urls(&self, query: &ArticleQuery) -> Vec<String> {
        let search_query = search_query(&query.field, &query.keywords);
        self.endpoints
            .iter()
            .map(|base| {
                format!(
                    "{}?search_query=all:{}&start=0&max_results={}&sortBy=submittedDate&sortOrder=descending",
                    base, search_query, MAX_RESULTS
                )
            })
            .collect()
    }
}

#[async_trait]
impl ArticleSource for ArxivClient {
    fn name(&self) -> &str {
        "arXiv"
    }

    async fn search(&self, query: &ArticleQuery) -> Result<Vec<ArticleRecord>, SourceError> {
        let urls = self.candidate_urls(query);
        let mut articles = fetch_with_failover(&self.client, &urls, &self.retry, |body| {
            parse_atom_feed(body)
        })
        .await;
        articles.truncate(MAX_RESULTS);
        Ok(articles)
    }
}

/// English search phrase for a domain label; unknown labels pass through unchanged.
pub fn field_term(field: &str) -> &str {
    FIELD_TERMS
        .iter()
        .find(|(label, _)| label.eq_ignore_ascii_case(field.trim()))
        .map(|(_, term)| *term)
        .unwrap_or(field)
}

/// Keyword and field terms, in that order. Falls back to a generic AI term when both are blank.
pub fn search_terms(field: &str, keywords: &str) -> Vec<String> {
    let mut terms = Vec::new();
    if !keywords.trim().is_empty() {
        terms.push(keywords.trim().to_string());
    }
    if !field.trim().is_empty() {
        terms.push(field_term(field).trim().to_string());
    }
    if terms.is_empty() {
        terms.push(DEFAULT_TERM.to_string());
    }
    terms
}

fn search_query(field: &str, keywords: &str) -> String {
    search_terms(field, keywords)
        .iter()
        .map(|t| urlencoded(t))
        .collect::<Vec<_>>()
        .join("+AND+")
}

fn urlencoded(s: &str) -> String {
    s.replace('%', "%25")
        .replace('&', "%26")
        .replace('#', "%23")
        .replace(':', "%3A")
        .replace('/', "%2F")
        .replace(' ', "+")
}

#[derive(Default)]
struct EntryFields {
    id: String,
    title: String,
    summary: String,
    published: String,
    authors: Vec<String>,
}

impl EntryFields {
    fn is_empty(&self) -> bool {
        self.id.trim().is_empty() && self.title.trim().is_empty() && self.summary.trim().is_empty()
    }

    fn into_record(self, index: usize) -> ArticleRecord {
        let url = self.id.trim().to_string();
        let id = url
            .rsplit('/')
            .next()
            .filter(|s| !s.is_empty())
            .map(str::to_string)
            .unwrap_or_else(|| format!("arxiv-{}", index));
        let title = collapse_whitespace(&self.title);
        let summary = collapse_whitespace(&self.summary);
        ArticleRecord {
            id,
            title: if title.is_empty() { UNTITLED.to_string() } else { title },
            authors: self.authors,
            abstract_text: if summary.is_empty() { NO_ABSTRACT.to_string() } else { summary },
            url: if url.is_empty() { NO_URL.to_string() } else { url },
            published_date: self.published.trim().to_string(),
            source: "arXiv".to_string(),
            category: None,
        }
    }
}

/// Parse an arXiv Atom response. Tags are matched by local name so prefixed
/// namespaces work too. A parse error keeps every entry completed before it.
pub fn parse_atom_feed(xml: &str) -> Vec<ArticleRecord> {
    let mut reader = Reader::from_str(xml);
    let mut papers = Vec::new();
    let mut entry: Option<EntryFields> = None;
    let mut current_tag = String::new();
    let mut author_name = String::new();
    let mut in_author = false;
    let mut buf = Vec::new();

    loop {
        match reader.read_event_into(&mut buf) {
            Ok(Event::Start(e)) => {
                let tag = String::from_utf8_lossy(e.local_name().as_ref()).to_string();
                if tag == "entry" {
                    entry = Some(EntryFields::default());
                    in_author = false;
                } else if entry.is_some() {
                    if tag == "author" {
                        in_author = true;
                        author_name.clear();
                    }
                    current_tag = tag;
                }
            }
            Ok(Event::Text(e)) => {
                if let Some(fields) = entry.as_mut() {
                    let text = e.unescape().unwrap_or_default();
                    push_text(fields, &current_tag, in_author, &mut author_name, &text);
                }
            }
            Ok(Event::CData(e)) => {
                if let Some(fields) = entry.as_mut() {
                    let text = String::from_utf8_lossy(&e).to_string();
                    push_text(fields, &current_tag, in_author, &mut author_name, &text);
                }
            }
            Ok(Event::End(e)) => {
                let tag = String::from_utf8_lossy(e.local_name().as_ref()).to_string();
                if tag == "entry" {
                    if let Some(fields) = entry.take() {
                        if fields.is_empty() {
                            tracing::debug!("Skipping empty arXiv entry");
                        } else {
                            papers.push(fields.into_record(papers.len()));
                        }
                    }
                } else if tag == "author" && in_author {
                    in_author = false;
                    if let Some(fields) = entry.as_mut() {
                        let name = collapse_whitespace(&author_name);
                        if !name.is_empty() {
                            fields.authors.push(name);
                        }
                    }
                }
                if tag == current_tag {
                    current_tag.clear();
                }
            }
            Ok(Event::Eof) => break,
            Err(e) => {
                tracing::warn!("Error parsing arXiv response: {}", e);
                break;
            }
            _ => {}
        }
        buf.clear();
    }
    papers
}

fn push_text(
    fields: &mut EntryFields,
    tag: &str,
    in_author: bool,
    author_name: &mut String,
    text: &str,
) {
    match tag {
        "title" => fields.title.push_str(text),
        "summary" => fields.summary.push_str(text),
        "id" => fields.id.push_str(text),
        "published" => fields.published.push_str(text),
        "name" if in_author => author_name.push_str(text),
        _ => {}
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Instant;

    const SAMPLE_ATOM: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<feed xmlns="http://www.w3.org/2005/Atom" xmlns:arxiv="http://arxiv.org/schemas/atom">
  <title>ArXiv Query</title>
  <id>http://arxiv.org/api/feed</id>
  <entry>
    <id>http://arxiv.org/abs/2301.12345v1</id>
    <title>Test Paper on
      Transformers</title>
    <summary>  This is a test abstract
about attention.
</summary>
    <published>2023-01-15T00:00:00Z</published>
    <author><name>John Doe</name><arxiv:affiliation>MIT</arxiv:affiliation></author>
    <author><name>Jane Smith</name></author>
    <link href="http://arxiv.org/abs/2301.12345v1" rel="alternate" type="text/html"/>
    <arxiv:primary_category term="cs.LG"/>
  </entry>
  <entry>
    <id>http://arxiv.org/abs/2302.00001v2</id>
    <published>2023-02-01T00:00:00Z</published>
  </entry>
  <entry></entry>
</feed>"#;

    #[test]
    fn test_parse_atom_feed() {
        let papers = parse_atom_feed(SAMPLE_ATOM);
        assert_eq!(papers.len(), 2);

        let p = &papers[0];
        assert_eq!(p.id, "2301.12345v1");
        assert_eq!(p.title, "Test Paper on Transformers");
        assert_eq!(p.abstract_text, "This is a test abstract about attention.");
        assert_eq!(p.url, "http://arxiv.org/abs/2301.12345v1");
        assert_eq!(p.published_date, "2023-01-15T00:00:00Z");
        assert_eq!(p.authors, vec!["John Doe", "Jane Smith"]);
        assert_eq!(p.source, "arXiv");

        let sparse = &papers[1];
        assert_eq!(sparse.title, UNTITLED);
        assert_eq!(sparse.abstract_text, NO_ABSTRACT);
        assert!(sparse.authors.is_empty());
    }

    #[test]
    fn test_parse_keeps_entries_before_malformed_tail() {
        let xml = r#"<feed xmlns="http://www.w3.org/2005/Atom">
  <entry><id>http://arxiv.org/abs/1</id><title>Good</title></entry>
  <entry><id>http://arxiv.org/abs/2</id><title>Broken</wrong></entry>
</feed>"#;
        let papers = parse_atom_feed(xml);
        assert_eq!(papers.len(), 1);
        assert_eq!(papers[0].title, "Good");
    }

    #[test]
    fn test_parse_garbage_is_empty() {
        assert!(parse_atom_feed("not xml at all").is_empty());
        assert!(parse_atom_feed("").is_empty());
    }

    #[test]
    fn test_field_term_mapping() {
        for (label, term) in FIELD_TERMS {
            assert_eq!(field_term(label), term);
        }
        assert_eq!(field_term("cybersecurity"), "cybersecurity security");
        assert_eq!(field_term("astrophysics"), "astrophysics");
    }

    #[test]
    fn test_search_terms() {
        assert_eq!(search_terms("", ""), vec!["artificial intelligence"]);
        assert_eq!(search_terms("", "diffusion"), vec!["diffusion"]);
        assert_eq!(
            search_terms("natural language processing", "llm"),
            vec!["llm", "natural language processing NLP"]
        );
        assert_eq!(
            search_query("computer vision", "3d"),
            "3d+AND+computer+vision"
        );
    }

    #[tokio::test]
    async fn test_retries_503_then_succeeds_on_first_url() {
        let mut server = mockito::Server::new_async().await;
        let unavailable = server
            .mock("GET", "/http/query")
            .match_query(mockito::Matcher::Any)
            .with_status(503)
            .expect(2)
            .create_async()
            .await;
        let ok = server
            .mock("GET", "/http/query")
            .match_query(mockito::Matcher::Any)
            .with_status(200)
            .with_body(SAMPLE_ATOM)
            .expect(1)
            .create_async()
            .await;
        let https = server
            .mock("GET", "/https/query")
            .match_query(mockito::Matcher::Any)
            .expect(0)
            .create_async()
            .await;

        let step = Duration::from_millis(20);
        let client = ArxivClient::new(
            vec![
                format!("{}/http/query", server.url()),
                format!("{}/https/query", server.url()),
            ],
            RetryPolicy {
                max_attempts: 3,
                backoff_step: step,
            },
            Duration::from_secs(5),
        )
        .unwrap();

        let start = Instant::now();
        let papers = client.fetch(&ArticleQuery::text("attention")).await;

        assert_eq!(papers.len(), 2);
        // Two backoffs: 1 * step, then 2 * step.
        assert!(start.elapsed() >= step * 3);
        unavailable.assert_async().await;
        ok.assert_async().await;
        https.assert_async().await;
    }

    #[tokio::test]
    async fn test_request_carries_search_query() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("GET", "/api/query")
            .match_query(mockito::Matcher::AllOf(vec![
                mockito::Matcher::UrlEncoded(
                    "search_query".into(),
                    "all:graph networks AND quantum computing".into(),
                ),
                mockito::Matcher::UrlEncoded("max_results".into(), "20".into()),
                mockito::Matcher::UrlEncoded("sortBy".into(), "submittedDate".into()),
            ]))
            .with_status(200)
            .with_body(SAMPLE_ATOM)
            .expect(1)
            .create_async()
            .await;

        let client = ArxivClient::new(
            vec![format!("{}/api/query", server.url())],
            RetryPolicy::default(),
            Duration::from_secs(5),
        )
        .unwrap();
        let papers = client
            .fetch(&ArticleQuery {
                field: "quantum computing".into(),
                keywords: "graph networks".into(),
            })
            .await;

        assert_eq!(papers.len(), 2);
        mock.assert_async().await;
    }
}
