//! Google Patents search, either through SerpApi or, without a key, through the
//! public USPTO application search.

use super::normalize::{
    cap_names, non_blank, or_placeholder, truncate_chars, ABSTRACT_CAP, MAX_ASSIGNEES,
    MAX_INVENTORS, NO_ABSTRACT, UNTITLED,
};
use super::{ensure_success, http_client, PatentRecord, PatentSource, SourceError};
use async_trait::async_trait;
use serde::Deserialize;
use std::time::Duration;

pub const SERPAPI_URL: &str = "https://serpapi.com/search";
pub const USPTO_DIRECT_URL: &str = "https://developer.uspto.gov/ibd-api/v1/patent/application";
const SERPAPI_MAX: usize = 100;
const DIRECT_MAX: usize = 25;

pub enum GooglePatents {
    SerpApi(SerpApiClient),
    Direct(DirectSearchClient),
}

impl GooglePatents {
    pub fn strategy(&self) -> &'static str {
        match self {
            Self::SerpApi(_) => "serpapi",
            Self::Direct(_) => "direct",
        }
    }
}

#[async_trait]
impl PatentSource for GooglePatents {
    fn name(&self) -> &str {
        match self {
            Self::SerpApi(c) => c.name(),
            Self::Direct(c) => c.name(),
        }
    }

    async fn search(&self, query: &str, limit: usize) -> Result<Vec<PatentRecord>, SourceError> {
        match self {
            Self::SerpApi(c) => c.search(query, limit).await,
            Self::Direct(c) => c.search(query, limit).await,
        }
    }
}

// ── SerpApi ─────────────────────────────────────────────────────────────────

pub struct SerpApiClient {
    client: reqwest::Client,
    url: String,
    api_key: String,
}

impl SerpApiClient {
    pub fn new(url: String, api_key: String, timeout: Duration) -> Result<Self, SourceError> {
        Ok(Self {
            client: http_client(timeout)?,
            url,
            api_key,
        })
    }
}

#[derive(Deserialize)]
struct SerpResponse {
    organic_results: Option<Vec<SerpResult>>,
}

#[derive(Deserialize)]
struct SerpResult {
    patent_id: Option<String>,
    title: Option<String>,
    snippet: Option<String>,
    description: Option<String>,
    inventor: Option<OneOrMany>,
    assignee: Option<OneOrMany>,
    publication_date: Option<String>,
    filing_date: Option<String>,
    pdf: Option<String>,
    link: Option<String>,
}

/// SerpApi reports people and organisations either as one string or as a list.
#[derive(Deserialize)]
#[serde(untagged)]
enum OneOrMany {
    One(String),
    Many(Vec<NameEntry>),
    Other(serde_json::Value),
}

#[derive(Deserialize)]
#[serde(untagged)]
enum NameEntry {
    Plain(String),
    Named { name: Option<String> },
    Other(serde_json::Value),
}

impl OneOrMany {
    fn names(self) -> Vec<String> {
        match self {
            Self::One(name) => vec![name],
            Self::Many(entries) => entries
                .into_iter()
                .filter_map(|e| match e {
                    NameEntry::Plain(name) => Some(name),
                    NameEntry::Named { name } => name,
                    NameEntry::Other(_) => None,
                })
                .collect(),
            Self::Other(_) => Vec::new(),
        }
    }
}

fn serp_to_patent(r: SerpResult) -> PatentRecord {
    let id = r.patent_id.unwrap_or_default().trim().to_string();
    let abstract_text = non_blank(r.snippet.as_deref())
        .or_else(|| non_blank(r.description.as_deref()))
        .unwrap_or(NO_ABSTRACT);
    let url = non_blank(r.pdf.as_deref())
        .or_else(|| non_blank(r.link.as_deref()))
        .map(str::to_string)
        .unwrap_or_else(|| format!("https://patents.google.com/patent/{}", id));

    PatentRecord {
        title: or_placeholder(r.title.as_deref(), UNTITLED),
        authors: cap_names(r.inventor.map(OneOrMany::names).unwrap_or_default(), MAX_INVENTORS),
        assignees: cap_names(r.assignee.map(OneOrMany::names).unwrap_or_default(), MAX_ASSIGNEES),
        abstract_text: truncate_chars(abstract_text, ABSTRACT_CAP),
        url,
        published_date: non_blank(r.publication_date.as_deref())
            .or_else(|| non_blank(r.filing_date.as_deref()))
            .unwrap_or_default()
            .to_string(),
        source: "Google Patents".to_string(),
        id,
    }
}

#[async_trait]
impl PatentSource for SerpApiClient {
    fn name(&self) -> &str {
        "Google Patents (SerpApi)"
    }

    async fn search(&self, query: &str, limit: usize) -> Result<Vec<PatentRecord>, SourceError> {
        tracing::debug!("Searching Google Patents via SerpApi for: {}", query);
        let num = limit.min(SERPAPI_MAX).to_string();
        let resp = self
            .client
            .get(&self.url)
            .query(&[
                ("engine", "google_patents"),
                ("q", query),
                ("api_key", self.api_key.as_str()),
                ("num", num.as_str()),
            ])
            .send()
            .await?;
        let data: SerpResponse = ensure_success(resp)?.json().await?;
        let mut patents: Vec<PatentRecord> = data
            .organic_results
            .unwrap_or_default()
            .into_iter()
            .map(serp_to_patent)
            .collect();
        patents.truncate(limit);
        Ok(patents)
    }
}

// ── Direct USPTO search ─────────────────────────────────────────────────────

/// Reduced-functionality search used when no SerpApi key is configured.
pub struct DirectSearchClient {
    client: reqwest::Client,
    url: String,
}

impl DirectSearchClient {
    pub fn new(url: String, timeout: Duration) -> Result<Self, SourceError> {
        Ok(Self {
            client: http_client(timeout)?,
            url,
        })
    }
}

#[derive(Deserialize)]
struct DirectResponse {
    response: Option<DirectBody>,
}

#[derive(Deserialize)]
struct DirectBody {
    docs: Option<Vec<DirectDoc>>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct DirectDoc {
    app_number: Option<String>,
    invention_title: Option<String>,
    app_abstract: Option<String>,
    app_inventor_name: Option<String>,
    app_assignee_name: Option<String>,
    app_filing_date: Option<String>,
}

fn direct_to_patent(d: DirectDoc) -> PatentRecord {
    let number = d.app_number.unwrap_or_default().trim().to_string();
    let abstract_text = or_placeholder(d.app_abstract.as_deref(), NO_ABSTRACT);
    PatentRecord {
        url: format!("https://patents.google.com/?q={}", number),
        id: number,
        title: or_placeholder(d.invention_title.as_deref(), UNTITLED),
        authors: cap_names(d.app_inventor_name, MAX_INVENTORS),
        assignees: cap_names(d.app_assignee_name, MAX_ASSIGNEES),
        abstract_text: truncate_chars(&abstract_text, ABSTRACT_CAP),
        published_date: non_blank(d.app_filing_date.as_deref())
            .unwrap_or_default()
            .to_string(),
        source: "Google Patents (Direct)".to_string(),
    }
}

#[async_trait]
impl PatentSource for DirectSearchClient {
    fn name(&self) -> &str {
        "Google Patents (Direct)"
    }

    async fn search(&self, query: &str, limit: usize) -> Result<Vec<PatentRecord>, SourceError> {
        tracing::debug!("Direct patent search for: {} (limited functionality)", query);
        let rows = limit.min(DIRECT_MAX).to_string();
        let resp = self
            .client
            .get(&self.url)
            .query(&[("searchText", query), ("start", "0"), ("rows", rows.as_str())])
            .send()
            .await?;
        let data: DirectResponse = ensure_success(resp)?.json().await?;
        let mut patents: Vec<PatentRecord> = data
            .response
            .and_then(|r| r.docs)
            .unwrap_or_default()
            .into_iter()
            .map(direct_to_patent)
            .collect();
        patents.truncate(limit);
        Ok(patents)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mockito::Matcher;
    use serde_json::json;

    #[tokio::test]
    async fn test_serpapi_handles_scalar_and_list_shapes() {
        let payload = json!({
            "organic_results": [
                {
                    "patent_id": "patent/US1234567B2/en",
                    "title": "Widget",
                    "snippet": "s".repeat(800),
                    "inventor": "Grace Hopper",
                    "assignee": [{"name": "Acme"}, "Globex", {"name": null}, "Initech", "Hooli"],
                    "publication_date": "2020-01-02",
                    "pdf": "https://patentimages.example/US1234567.pdf"
                },
                {
                    "patent_id": "patent/US7654321A/en",
                    "inventor": [{"name": "A"}, "B", "C", "D", "E", "F"],
                    "assignee": 42,
                    "description": "Described.",
                    "filing_date": "2019-05-05",
                    "link": "https://patents.google.com/patent/US7654321A/en"
                },
                {"patent_id": "US1"}
            ]
        });

        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("GET", "/search")
            .match_query(Matcher::AllOf(vec![
                Matcher::UrlEncoded("engine".into(), "google_patents".into()),
                Matcher::UrlEncoded("q".into(), "widget".into()),
                Matcher::UrlEncoded("api_key".into(), "k".into()),
                Matcher::UrlEncoded("num".into(), "100".into()),
            ]))
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(payload.to_string())
            .expect(1)
            .create_async()
            .await;

        let client = GooglePatents::SerpApi(
            SerpApiClient::new(
                format!("{}/search", server.url()),
                "k".into(),
                Duration::from_secs(5),
            )
            .unwrap(),
        );
        let patents = client.fetch("widget", 150).await;
        mock.assert_async().await;

        assert_eq!(patents.len(), 3);
        let first = &patents[0];
        assert_eq!(first.authors, vec!["Grace Hopper"]);
        assert_eq!(first.assignees, vec!["Acme", "Globex", "Initech"]);
        assert_eq!(first.abstract_text.chars().count(), ABSTRACT_CAP);
        assert_eq!(first.url, "https://patentimages.example/US1234567.pdf");
        assert_eq!(first.published_date, "2020-01-02");

        let second = &patents[1];
        assert_eq!(second.authors, vec!["A", "B", "C", "D", "E"]);
        assert!(second.assignees.is_empty());
        assert_eq!(second.abstract_text, "Described.");
        assert_eq!(second.published_date, "2019-05-05");
        assert_eq!(second.url, "https://patents.google.com/patent/US7654321A/en");

        let third = &patents[2];
        assert_eq!(third.title, UNTITLED);
        assert_eq!(third.abstract_text, NO_ABSTRACT);
        assert_eq!(third.url, "https://patents.google.com/patent/US1");
        assert_eq!(third.source, "Google Patents");
    }

    #[tokio::test]
    async fn test_direct_search_normalizes_docs() {
        let payload = json!({
            "response": {
                "docs": [
                    {
                        "appNumber": "16123456",
                        "inventionTitle": "Drone dock",
                        "appAbstract": "a".repeat(600),
                        "appInventorName": "Jane Roe",
                        "appAssigneeName": "",
                        "appFilingDate": "2018-09-01"
                    },
                    {"appNumber": "16999999"}
                ]
            }
        });

        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("GET", "/ibd")
            .match_query(Matcher::AllOf(vec![
                Matcher::UrlEncoded("searchText".into(), "drone".into()),
                Matcher::UrlEncoded("rows".into(), "25".into()),
            ]))
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(payload.to_string())
            .expect(1)
            .create_async()
            .await;

        let client = GooglePatents::Direct(
            DirectSearchClient::new(format!("{}/ibd", server.url()), Duration::from_secs(5))
                .unwrap(),
        );
        assert_eq!(client.strategy(), "direct");
        let patents = client.fetch("drone", 40).await;
        mock.assert_async().await;

        assert_eq!(patents.len(), 2);
        assert_eq!(patents[0].authors, vec!["Jane Roe"]);
        assert!(patents[0].assignees.is_empty());
        assert_eq!(patents[0].abstract_text.chars().count(), ABSTRACT_CAP);
        assert_eq!(patents[0].url, "https://patents.google.com/?q=16123456");
        assert_eq!(patents[0].source, "Google Patents (Direct)");
        assert!(patents[1].authors.is_empty());
        assert_eq!(patents[1].abstract_text, NO_ABSTRACT);
    }

    #[tokio::test]
    async fn test_direct_search_non_success_is_empty() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("GET", "/ibd")
            .match_query(Matcher::Any)
            .with_status(404)
            .create_async()
            .await;
        let client =
            DirectSearchClient::new(format!("{}/ibd", server.url()), Duration::from_secs(5))
                .unwrap();
        assert!(client.fetch("drone", 5).await.is_empty());
    }
}
