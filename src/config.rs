use std::sync::Arc;
use std::time::Duration;

use crate::apis::google_patents::{self, DirectSearchClient, GooglePatents, SerpApiClient};
use crate::apis::retry::RetryPolicy;
use crate::apis::{arxiv, patentsview, rss, semantic_scholar, SourceError};
use crate::summarize::{ChatSummarizer, Summarizer, TemplateSummarizer};

const DEFAULT_TIMEOUT_SECS: u64 = 10;
const SERPAPI_TIMEOUT: Duration = Duration::from_secs(15);
const OPENAI_BASE_URL: &str = "https://api.openai.com/v1";
const DEFAULT_OPENAI_MODEL: &str = "gpt-4o-mini";
const DEFAULT_OLLAMA_BASE_URL: &str = "http://localhost:11434";
const DEFAULT_OLLAMA_MODEL: &str = "llama3.2";

/// Upstream base URLs. Overridable so tests can point clients at a mock server.
#[derive(Debug, Clone)]
pub struct Endpoints {
    pub arxiv: Vec<String>,
    pub semantic_scholar: String,
    pub patentsview: String,
    pub serpapi: String,
    pub uspto_direct: String,
    pub openai: String,
}

impl Default for Endpoints {
    fn default() -> Self {
        Self {
            arxiv: arxiv::DEFAULT_ENDPOINTS.iter().map(|s| s.to_string()).collect(),
            semantic_scholar: semantic_scholar::BASE_URL.to_string(),
            patentsview: patentsview::BASE_URL.to_string(),
            serpapi: google_patents::SERPAPI_URL.to_string(),
            uspto_direct: google_patents::USPTO_DIRECT_URL.to_string(),
            openai: OPENAI_BASE_URL.to_string(),
        }
    }
}

/// Which backend writes paper summaries.
#[derive(Clone, PartialEq)]
pub enum LlmBackend {
    OpenAi { api_key: String, model: String },
    Ollama { base_url: String, model: String },
    Template,
}

impl std::fmt::Debug for LlmBackend {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::OpenAi { model, .. } => f
                .debug_struct("OpenAi")
                .field("api_key", &"<redacted>")
                .field("model", model)
                .finish(),
            Self::Ollama { base_url, model } => f
                .debug_struct("Ollama")
                .field("base_url", base_url)
                .field("model", model)
                .finish(),
            Self::Template => f.write_str("Template"),
        }
    }
}

/// Server configuration, read once at startup and handed to every client.
#[derive(Debug, Clone)]
pub struct Config {
    pub serpapi_key: Option<String>,
    pub semantic_scholar_api_key: Option<String>,
    pub llm: LlmBackend,
    pub timeout: Duration,
    pub retry: RetryPolicy,
    pub endpoints: Endpoints,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            serpapi_key: None,
            semantic_scholar_api_key: None,
            llm: LlmBackend::Template,
            timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
            retry: RetryPolicy::default(),
            endpoints: Endpoints::default(),
        }
    }
}

impl Config {
    /// Load configuration from environment variables.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Load configuration through `lookup`; blank values count as unset.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let var = |key: &str| lookup(key).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());

        let llm = match var("LLM_TYPE").as_deref().unwrap_or("openai") {
            "ollama" => LlmBackend::Ollama {
                base_url: var("OLLAMA_BASE_URL").unwrap_or_else(|| DEFAULT_OLLAMA_BASE_URL.into()),
                model: var("OLLAMA_MODEL").unwrap_or_else(|| DEFAULT_OLLAMA_MODEL.into()),
            },
            "openai" => match var("OPENAI_API_KEY") {
                Some(api_key) => LlmBackend::OpenAi {
                    api_key,
                    model: var("OPENAI_MODEL").unwrap_or_else(|| DEFAULT_OPENAI_MODEL.into()),
                },
                None => LlmBackend::Template,
            },
            _ => LlmBackend::Template,
        };

        let timeout = var("RESEARCH_FEED_TIMEOUT_SECS")
            .and_then(|v| v.parse::<u64>().ok())
            .filter(|secs| *secs > 0)
            .map(Duration::from_secs)
            .unwrap_or(Duration::from_secs(DEFAULT_TIMEOUT_SECS));

        Self {
            serpapi_key: var("SERPAPI_KEY"),
            semantic_scholar_api_key: var("SEMANTIC_SCHOLAR_API_KEY"),
            llm,
            timeout,
            ..Self::default()
        }
    }

    pub fn build_arxiv(&self) -> Result<arxiv::ArxivClient, SourceError> {
        arxiv::ArxivClient::new(self.endpoints.arxiv.clone(), self.retry.clone(), self.timeout)
    }

    pub fn build_semantic_scholar(
        &self,
    ) -> Result<semantic_scholar::SemanticScholarClient, SourceError> {
        semantic_scholar::SemanticScholarClient::new(
            self.endpoints.semantic_scholar.clone(),
            self.semantic_scholar_api_key.clone(),
            self.timeout,
        )
    }

    /// SerpApi when a key is configured, otherwise the direct USPTO search.
    pub fn build_google_patents(&self) -> Result<GooglePatents, SourceError> {
        let patents = match &self.serpapi_key {
            Some(key) => GooglePatents::SerpApi(SerpApiClient::new(
                self.endpoints.serpapi.clone(),
                key.clone(),
                SERPAPI_TIMEOUT,
            )?),
            None => {
                tracing::warn!("SerpApi key not found, using direct search");
                GooglePatents::Direct(DirectSearchClient::new(
                    self.endpoints.uspto_direct.clone(),
                    self.timeout,
                )?)
            }
        };
        tracing::info!("Google Patents strategy: {}", patents.strategy());
        Ok(patents)
    }

    pub fn build_patentsview(&self) -> Result<patentsview::PatentsViewClient, SourceError> {
        patentsview::PatentsViewClient::new(self.endpoints.patentsview.clone(), self.timeout)
    }

    pub fn build_rss(&self) -> Result<rss::RssClient, SourceError> {
        rss::RssClient::new(self.timeout)
    }

    pub fn build_summarizer(&self) -> Result<Arc<dyn Summarizer>, SourceError> {
        Ok(match &self.llm {
            LlmBackend::OpenAi { api_key, model } => Arc::new(ChatSummarizer::new(
                "OpenAI",
                self.endpoints.openai.clone(),
                api_key.clone(),
                model.clone(),
                self.timeout,
            )?),
            LlmBackend::Ollama { base_url, model } => Arc::new(ChatSummarizer::new(
                "Ollama",
                format!("{}/v1", base_url.trim_end_matches('/')),
                "ollama",
                model.clone(),
                self.timeout,
            )?),
            LlmBackend::Template => Arc::new(TemplateSummarizer),
        })
    }

    /// Return a list of provider status descriptions.
    pub fn source_status(&self) -> Vec<SourceStatus> {
        vec![
            SourceStatus { name: "arxiv".into(), enabled: true, note: "Primary paper source, no API key required".into() },
            SourceStatus { name: "semantic_scholar".into(), enabled: true,
                note: if self.semantic_scholar_api_key.is_some() { "Fallback paper source, API key set".into() } else { "Fallback paper source, no API key (rate limited)".into() } },
            SourceStatus { name: "google_patents".into(), enabled: true,
                note: if self.serpapi_key.is_some() { "SerpApi key set".into() } else { "Direct USPTO search (limited functionality)".into() } },
            SourceStatus { name: "patentsview".into(), enabled: true, note: "Patent top-up source, no API key required".into() },
            SourceStatus { name: "rss".into(), enabled: true, note: "Caller-supplied feeds".into() },
            SourceStatus { name: "summarizer".into(), enabled: true,
                note: match &self.llm {
                    LlmBackend::OpenAi { model, .. } => format!("OpenAI ({})", model),
                    LlmBackend::Ollama { base_url, model } => format!("Ollama ({} at {})", model, base_url),
                    LlmBackend::Template => "Template summaries (no LLM configured)".into(),
                } },
        ]
    }
}

#[derive(Debug, Clone, serde::Serialize)]
pub struct SourceStatus {
    pub name: String,
    pub enabled: bool,
    pub note: String,
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn config(vars: &[(&str, &str)]) -> Config {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        Config::from_lookup(|key| vars.get(key).cloned())
    }

    #[test]
    fn test_defaults() {
        let c = config(&[]);
        assert_eq!(c.llm, LlmBackend::Template);
        assert_eq!(c.timeout, Duration::from_secs(10));
        assert!(c.serpapi_key.is_none());
        assert_eq!(c.endpoints.arxiv.len(), 2);
        assert!(c.endpoints.arxiv[0].starts_with("http://"));
        assert!(c.endpoints.arxiv[1].starts_with("https://"));
    }

    #[test]
    fn test_llm_backend_selection() {
        assert_eq!(
            config(&[("OPENAI_API_KEY", "sk")]).llm,
            LlmBackend::OpenAi { api_key: "sk".into(), model: "gpt-4o-mini".into() }
        );
        assert_eq!(
            config(&[("LLM_TYPE", "ollama"), ("OLLAMA_MODEL", "mistral")]).llm,
            LlmBackend::Ollama { base_url: "http://localhost:11434".into(), model: "mistral".into() }
        );
        assert_eq!(config(&[("LLM_TYPE", "openai"), ("OPENAI_API_KEY", " ")]).llm, LlmBackend::Template);
        assert_eq!(config(&[("LLM_TYPE", "dummy"), ("OPENAI_API_KEY", "sk")]).llm, LlmBackend::Template);
    }

    #[test]
    fn test_patent_strategy_follows_serpapi_key() {
        let direct = config(&[("SERPAPI_KEY", "")]).build_google_patents().unwrap();
        assert_eq!(direct.strategy(), "direct");
        let serp = config(&[("SERPAPI_KEY", "abc")]).build_google_patents().unwrap();
        assert_eq!(serp.strategy(), "serpapi");
    }

    #[test]
    fn test_timeout_override() {
        assert_eq!(config(&[("RESEARCH_FEED_TIMEOUT_SECS", "3")]).timeout, Duration::from_secs(3));
        assert_eq!(config(&[("RESEARCH_FEED_TIMEOUT_SECS", "zero")]).timeout, Duration::from_secs(10));
    }

    #[test]
    fn test_source_status_reports_modes() {
        let statuses = config(&[("SERPAPI_KEY", "abc")]).source_status();
        let patents = statuses.iter().find(|s| s.name == "google_patents").unwrap();
        assert_eq!(patents.note, "SerpApi key set");
        let summarizer = statuses.iter().find(|s| s.name == "summarizer").unwrap();
        assert!(summarizer.note.starts_with("Template"));
    }

    #[test]
    fn test_api_key_is_redacted_in_debug() {
        let c = config(&[("OPENAI_API_KEY", "sk-very-secret")]);
        assert!(!format!("{:?}", c).contains("sk-very-secret"));
    }
}
