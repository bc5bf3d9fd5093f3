use std::sync::Arc;
use rmcp::{
    handler::server::tool::ToolRouter, handler::server::wrapper::Parameters,
    model::*, tool, tool_handler, tool_router,
    transport::stdio, ErrorData as McpError, ServerHandler, ServiceExt,
};
use serde::Serialize;
use tracing_subscriber::EnvFilter;

mod apis;
mod config;
mod feeds;
mod search;
mod service;
mod summarize;

use config::Config;
use service::{
    ArticleSearchRequest, ErrorResponse, PatentSearchRequest, ResearchFeed, SummarizeRequest,
    WebArticlesRequest,
};

// ── Server ──────────────────────────────────────────────────────────────────

#[derive(Clone)]
pub struct ResearchFeedServer {
    tool_router: ToolRouter<Self>,
    config: Arc<Config>,
    feed: ResearchFeed,
}

fn to_json<T: Serialize>(value: &T) -> Result<String, McpError> {
    serde_json::to_string_pretty(value)
        .map_err(|e| McpError::internal_error(format!("Serialization error: {}", e), None))
}

fn respond<T: Serialize>(outcome: Result<T, ErrorResponse>) -> Result<CallToolResult, McpError> {
    match outcome {
        Ok(body) => Ok(CallToolResult::success(vec![Content::text(to_json(&body)?)])),
        Err(err) => Ok(CallToolResult::error(vec![Content::text(to_json(&err)?)])),
    }
}

#[tool_router]
impl ResearchFeedServer {
    pub fn create() -> anyhow::Result<Self> {
        let config = Config::from_env();
        let feed = ResearchFeed::from_config(&config)?;

        tracing::info!(
            "Initialized providers, timeout={:?}, summaries via {:?}",
            config.timeout,
            config.llm
        );

        Ok(Self {
            tool_router: Self::tool_router(),
            config: Arc::new(config),
            feed,
        })
    }

    #[tool(description = "List upstream providers and the summarizer backend with their status")]
    async fn list_sources(&self) -> Result<CallToolResult, McpError> {
        let statuses = self.config.source_status();
        Ok(CallToolResult::success(vec![Content::text(to_json(&statuses)?)]))
    }

    #[tool(description = "Search research papers on arXiv, falling back to Semantic Scholar when arXiv has nothing. Returns at most 20 papers.")]
    async fn search_articles(
        &self,
        Parameters(params): Parameters<ArticleSearchRequest>,
    ) -> Result<CallToolResult, McpError> {
        respond(self.feed.search_articles(params).await)
    }

    #[tool(description = "Fetch RSS/Atom feeds concurrently and return up to 50 articles, newest first")]
    async fn search_web_articles(
        &self,
        Parameters(params): Parameters<WebArticlesRequest>,
    ) -> Result<CallToolResult, McpError> {
        respond(self.feed.search_web_articles(params).await)
    }

    #[tool(description = "Search patents on Google Patents, topped up from USPTO PatentsView when few results are found")]
    async fn search_patents(
        &self,
        Parameters(params): Parameters<PatentSearchRequest>,
    ) -> Result<CallToolResult, McpError> {
        respond(self.feed.search_patents(params).await)
    }

    #[tool(description = "Summarize a paper from its title and abstract in 3-4 sentences")]
    async fn summarize(
        &self,
        Parameters(params): Parameters<SummarizeRequest>,
    ) -> Result<CallToolResult, McpError> {
        respond(self.feed.summarize(params).await)
    }
}

#[tool_handler]
impl ServerHandler for ResearchFeedServer {
    fn get_info(&self) -> ServerInfo {
        ServerInfo {
            protocol_version: ProtocolVersion::V_2024_11_05,
            capabilities: ServerCapabilities::builder().enable_tools().build(),
            server_info: Implementation::from_build_env(),
            instructions: Some(
                "Research news aggregation: papers from arXiv and Semantic Scholar, \
                 web articles from caller-supplied RSS/Atom feeds, patents from Google \
                 Patents and USPTO PatentsView, and short paper summaries."
                    .into(),
            ),
        }
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .with_ansi(false)
        .init();

    tracing::info!("Starting research-feed MCP server");

    let server = ResearchFeedServer::create()?;
    let service = server.serve(stdio()).await?;
    service.waiting().await?;

    Ok(())
}
