use super::normalize::{
    cap_names, non_blank, or_placeholder, truncate_chars, ABSTRACT_CAP, MAX_ASSIGNEES,
    MAX_INVENTORS, NO_ABSTRACT, UNTITLED,
};
use super::{ensure_success, http_client, PatentRecord, PatentSource, SourceError};
use async_trait::async_trait;
use serde::Deserialize;
use serde_json::json;
use std::time::Duration;

pub const BASE_URL: &str = "https://api.patentsview.org/patents/query";
const MAX_PER_PAGE: usize = 100;

/// USPTO PatentsView query API.
pub struct PatentsViewClient {
    client: reqwest::Client,
    url: String,
}

impl PatentsViewClient {
    pub fn new(url: String, timeout: Duration) -> Result<Self, SourceError> {
        Ok(Self {
            client: http_client(timeout)?,
            url,
        })
    }
}

#[derive(Deserialize)]
struct PvResponse {
    patents: Option<Vec<PvPatent>>,
}

#[derive(Deserialize)]
struct PvPatent {
    patent_number: Option<String>,
    patent_title: Option<String>,
    patent_abstract: Option<String>,
    patent_date: Option<String>,
    inventors: Option<Vec<PvInventor>>,
    assignees: Option<Vec<PvAssignee>>,
}

#[derive(Deserialize)]
struct PvInventor {
    inventor_first_name: Option<String>,
    inventor_last_name: Option<String>,
}

#[derive(Deserialize)]
struct PvAssignee {
    assignee_organization: Option<String>,
}

fn request_body(query: &str, limit: usize) -> serde_json::Value {
    json!({
        "q": {
            "_or": [
                {"_text_any": {"patent_title": query}},
                {"_text_any": {"patent_abstract": query}}
            ]
        },
        "f": [
            "patent_number",
            "patent_title",
            "patent_abstract",
            "patent_date",
            "inventor_first_name",
            "inventor_last_name",
            "assignee_organization"
        ],
        "o": {"per_page": limit.min(MAX_PER_PAGE)}
    })
}

fn pv_to_patent(p: PvPatent) -> PatentRecord {
    let number = p.patent_number.unwrap_or_default().trim().to_string();
    let inventors = p.inventors.unwrap_or_default().into_iter().map(|inv| {
        format!(
            "{} {}",
            inv.inventor_first_name.as_deref().unwrap_or(""),
            inv.inventor_last_name.as_deref().unwrap_or("")
        )
    });
    let assignees = p
        .assignees
        .unwrap_or_default()
        .into_iter()
        .filter_map(|a| a.assignee_organization);
    let abstract_text = or_placeholder(p.patent_abstract.as_deref(), NO_ABSTRACT);

    PatentRecord {
        url: format!("https://patents.google.com/patent/US{}", number),
        id: number,
        title: or_placeholder(p.patent_title.as_deref(), UNTITLED),
        authors: cap_names(inventors, MAX_INVENTORS),
        assignees: cap_names(assignees, MAX_ASSIGNEES),
        abstract_text: truncate_chars(&abstract_text, ABSTRACT_CAP),
        published_date: non_blank(p.patent_date.as_deref())
            .unwrap_or_default()
            .to_string(),
        source: "USPTO".to_string(),
    }
}

#[async_trait]
impl PatentSource for PatentsViewClient {
    fn name(&self) -> &str {
        "PatentsView"
    }

    async fn search(&self, query: &str, limit: usize) -> Result<Vec<PatentRecord>, SourceError> {
        tracing::debug!("Searching PatentsView for: {}", query);
        let resp = self
            .client
            .post(&self.url)
            .json(&request_body(query, limit))
            .send()
            .await?;
        let data: PvResponse = ensure_success(resp)?.json().await?;
        let mut patents: Vec<PatentRecord> = data
            .patents
            .unwrap_or_default()
            .into_iter()
            .map(pv_to_patent)
            .collect();
        patents.truncate(limit);
        Ok(patents)
    }
}
