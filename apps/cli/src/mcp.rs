//! MCP server exposing search and artifact resolution over stdio.

use std::collections::BTreeMap;
use std::sync::Arc;

use rmcp::handler::server::tool::ToolRouter;
use rmcp::handler::server::wrapper::Parameters;
use rmcp::model::{CallToolResult, Content, Implementation, ServerCapabilities, ServerInfo};
use rmcp::schemars;
use rmcp::{ErrorData as McpError, ServerHandler, ServiceExt, tool, tool_handler, tool_router};
use serde::{Deserialize, Serialize};
use sunbird_core::{ContentService, ToolResponse};
use sunbird_search::{FilterValue, SearchParams};
use sunbird_shared::SunbirdError;
use tracing::info;

// ---------------------------------------------------------------------------
// Tool arguments
// ---------------------------------------------------------------------------

#[derive(Debug, Default, Deserialize, schemars::JsonSchema)]
pub struct SearchContentArgs {
    /// Free-text query.
    pub query: Option<String>,

    #[schemars(
        description = "Filters as key -> value or list of values, e.g. {\"se_boards\": [\"CBSE\"], \"se_gradeLevels\": \"Class 10\"}"
    )]
    pub filters: Option<BTreeMap<String, serde_json::Value>>,

    #[schemars(description = "Maximum results to return (1-100, default 10)")]
    pub limit: Option<i64>,

    #[schemars(description = "Number of results to skip (default 0)")]
    pub offset: Option<i64>,

    #[schemars(description = "Sort order as field -> \"asc\" | \"desc\" (default lastPublishedOn desc)")]
    pub sort_by: Option<BTreeMap<String, String>>,

    #[schemars(description = "Fields to request from the catalogue")]
    pub fields: Option<Vec<String>>,
}

impl SearchContentArgs {
    fn into_params(self) -> sunbird_shared::Result<SearchParams> {
        let mut filters = BTreeMap::new();
        let mut problems = Vec::new();
        for (key, value) in self.filters.unwrap_or_default() {
            match serde_json::from_value::<FilterValue>(value) {
                Ok(v) => {
                    filters.insert(key, v);
                }
                Err(_) => problems.push(format!(
                    "Invalid value for filter '{key}': expected a string or a list of strings"
                )),
            }
        }
        if !problems.is_empty() {
            return Err(SunbirdError::validation_with(
                "Invalid search parameters",
                problems,
            ));
        }

        Ok(SearchParams {
            query: self.query,
            filters,
            limit: self.limit,
            offset: self.offset,
            sort_by: self.sort_by.unwrap_or_default(),
            fields: self.fields.unwrap_or_default(),
        })
    }
}

#[derive(Debug, Deserialize, Serialize, schemars::JsonSchema)]
pub struct ContentIdArgs {
    #[schemars(description = "Content identifier, e.g. do_31400742839137075217260")]
    pub content_id: String,
}

// ---------------------------------------------------------------------------
// Server
// ---------------------------------------------------------------------------

#[derive(Clone)]
pub struct SunbirdMcp {
    service: Arc<ContentService>,
    concurrency: Option<usize>,
    tool_router: ToolRouter<Self>,
}

impl SunbirdMcp {
    pub fn new(service: Arc<ContentService>, concurrency: Option<usize>) -> Self {
        Self {
            service,
            concurrency,
            tool_router: Self::tool_router(),
        }
    }
}

#[tool_handler]
impl ServerHandler for SunbirdMcp {
    fn get_info(&self) -> ServerInfo {
        ServerInfo {
            instructions: Some("Search the Sunbird/DIKSHA content catalogue with 'search_content', then pass a result's identifier to 'read_content_artifacts' for full artifact metadata or 'list_content_urls' for direct download URLs.".into()),
            capabilities: ServerCapabilities::builder().enable_tools().build(),
            server_info: Implementation::from_build_env(),
            ..Default::default()
        }
    }
}

fn respond<T: Serialize>(result: sunbird_shared::Result<T>) -> CallToolResult {
    let response = ToolResponse::from_result(result);
    let text = response.to_json();
    if response.is_error() {
        CallToolResult::error(vec![Content::text(text)])
    } else {
        CallToolResult::success(vec![Content::text(text)])
    }
}

#[tool_router]
impl SunbirdMcp {
    #[tool(description = "Search educational content (textbooks, courses, resources) by query and filters. Returns name, identifier, subjects, mediums, boards and grade levels for each hit, plus the total count.")]
    async fn search_content(
        &self,
        Parameters(args): Parameters<SearchContentArgs>,
    ) -> std::result::Result<CallToolResult, McpError> {
        let result = match args.into_params() {
            Ok(params) => self.service.search(&params).await,
            Err(e) => Err(e),
        };
        Ok(respond(result))
    }

    #[tool(description = "Resolve a content identifier (a textbook, unit, or single resource) into the downloadable PDF artifacts it contains, with subject, grade, medium and board metadata for each.")]
    async fn read_content_artifacts(
        &self,
        Parameters(args): Parameters<ContentIdArgs>,
    ) -> std::result::Result<CallToolResult, McpError> {
        Ok(respond(
            self.service
                .read_artifacts(&args.content_id, self.concurrency)
                .await,
        ))
    }

    #[tool(description = "Resolve a content identifier into the direct download URLs of its PDF artifacts, excluding ECML archives.")]
    async fn list_content_urls(
        &self,
        Parameters(args): Parameters<ContentIdArgs>,
    ) -> std::result::Result<CallToolResult, McpError> {
        Ok(respond(
            self.service
                .artifact_urls(&args.content_id, self.concurrency)
                .await,
        ))
    }
}

/// Serve the tools over stdin/stdout until the client disconnects.
pub async fn serve_stdio(server: SunbirdMcp) -> color_eyre::eyre::Result<()> {
    info!("starting MCP server on stdio");
    let running = server.serve(rmcp::transport::stdio()).await?;
    let reason = running.waiting().await?;
    info!(?reason, "MCP server stopped");
    Ok(())
}
