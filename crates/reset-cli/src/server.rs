use std::path::PathBuf;
use std::sync::Arc;

use rmcp::handler::server::router::tool::ToolRouter;
use rmcp::handler::server::wrapper::Parameters;
use rmcp::model::*;
use rmcp::{ErrorData as McpError, ServerHandler, tool, tool_handler, tool_router};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use reset_core::{ActivitySample, ActivitySnapshot, ActivityType, PageMetadata};
use reset_store::{StoreError, Tracker};

/// MCP server over the tracker. Holds only the data directory: every tool
/// call opens its own connection on a blocking worker, so concurrent calls
/// are serialized by SQLite transactions rather than an in-process lock.
#[derive(Clone)]
pub struct ResetServer {
    base_dir: Arc<PathBuf>,
    tool_router: ToolRouter<Self>,
}

impl ResetServer {
    pub fn new(base_dir: PathBuf) -> Self {
        Self {
            base_dir: Arc::new(base_dir),
            tool_router: Self::tool_router(),
        }
    }

    async fn run<T, F>(&self, op: F) -> Result<CallToolResult, McpError>
    where
        T: Serialize + Send + 'static,
        F: FnOnce(&Tracker) -> reset_store::Result<T> + Send + 'static,
    {
        let base_dir = Arc::clone(&self.base_dir);
        let value = tokio::task::spawn_blocking(move || {
            let tracker = Tracker::open(Some(base_dir.as_path()))?;
            op(&tracker)
        })
        .await
        .map_err(|e| McpError::internal_error(format!("worker failed: {e}"), None))?
        .map_err(to_mcp_error)?;

        Ok(CallToolResult::success(vec![Content::text(
            serde_json::to_string_pretty(&value).unwrap_or_default(),
        )]))
    }
}

fn to_mcp_error(e: StoreError) -> McpError {
    match e {
        StoreError::InvalidInput(msg) => McpError::invalid_params(msg, None),
        StoreError::NotFound(what) => McpError::resource_not_found(what, None),
        StoreError::InvalidTransition(msg) => McpError::invalid_request(msg, None),
        other => McpError::internal_error(other.to_string(), None),
    }
}

fn parse_id(field: &str, raw: &str) -> Result<Uuid, McpError> {
    Uuid::parse_str(raw.trim())
        .map_err(|e| McpError::invalid_params(format!("{field} is not a valid id: {e}"), None))
}

// --- Tool parameter types ---

#[derive(Debug, Deserialize, JsonSchema)]
struct CaptureRequest {
    /// Authenticated user the activity belongs to
    user_id: String,
    /// Optional work session the capture happened in
    session_id: Option<String>,
    /// Page URL as seen by the browser
    url: String,
    title: Option<String>,
    /// One of code, document, note, video, email, tab. Inferred from the URL when omitted.
    r#type: Option<String>,
    scroll_position: Option<u64>,
    selected_text: Option<String>,
    /// Scraped page details: headings, description, keywords
    page_metadata: Option<serde_json::Value>,
}

#[derive(Debug, Deserialize, JsonSchema)]
struct UpdateActivityRequest {
    user_id: String,
    /// URL of the resource; normalized before lookup
    normalized_url: String,
    scroll_position: Option<u64>,
}

#[derive(Debug, Deserialize, JsonSchema)]
struct DurationRequest {
    user_id: String,
    url: String,
    /// Time spent on the page in milliseconds
    duration_ms: u64,
}

#[derive(Debug, Deserialize, JsonSchema)]
struct ListRequest {
    user_id: String,
    /// Maximum number of contexts to return
    limit: Option<usize>,
}

#[derive(Debug, Deserialize, JsonSchema)]
struct RecoverRequest {
    context_id: String,
    /// When given, the context must belong to this user
    user_id: Option<String>,
}

#[derive(Debug, Deserialize, JsonSchema)]
struct ContextIdRequest {
    context_id: String,
}

#[derive(Debug, Deserialize, JsonSchema)]
struct UserRequest {
    user_id: String,
}

#[derive(Debug, Deserialize, JsonSchema)]
struct SessionIdRequest {
    session_id: String,
}

#[derive(Debug, Deserialize, JsonSchema)]
struct TimeRecoveredRequest {
    session_id: String,
    /// Seconds of work recovered
    seconds: u64,
}

#[derive(Debug, Deserialize, JsonSchema)]
struct ResumeRequest {
    user_id: String,
    /// How long the user was away, in milliseconds
    absence_duration_ms: Option<u64>,
}

#[derive(Debug, Default, Deserialize, JsonSchema)]
struct SnapshotRequest {
    /// Tab switches in the last minute
    recent_tab_switches: Option<usize>,
    idle_duration_ms: Option<u64>,
    unique_domains: Option<usize>,
    domain_changed: Option<bool>,
    /// Successive scroll offsets, oldest first
    scroll_positions: Option<Vec<i64>>,
    reread_count: Option<u32>,
    session_duration_ms: Option<u64>,
    time_since_last_interaction_ms: Option<u64>,
    /// Local hour 0-23; defaults to the server's clock
    local_hour: Option<u32>,
    /// 1 (lenient) to 10 (eager); defaults to the configured sensitivity
    sensitivity: Option<u8>,
}

impl SnapshotRequest {
    fn into_parts(self) -> (ActivitySnapshot, Option<u8>) {
        let snapshot = ActivitySnapshot {
            recent_tab_switches: self.recent_tab_switches.unwrap_or(0),
            idle_duration_ms: self.idle_duration_ms.unwrap_or(0),
            unique_domains: self.unique_domains.unwrap_or(0),
            domain_changed: self.domain_changed.unwrap_or(false),
            scroll_positions: self.scroll_positions.unwrap_or_default(),
            reread_count: self.reread_count.unwrap_or(0),
            session_duration_ms: self.session_duration_ms.unwrap_or(0),
            time_since_last_interaction_ms: self.time_since_last_interaction_ms.unwrap_or(0),
            local_hour: self.local_hour.filter(|h| *h < 24),
        };
        (snapshot, self.sensitivity)
    }
}

#[derive(Debug, Deserialize, JsonSchema)]
struct EnrichRequest {
    /// Maximum contexts to process in this pass
    limit: Option<usize>,
}

#[tool_router]
impl ResetServer {
    #[tool(
        description = "Record a page visit. Repeat visits to the same resource (same URL after normalization) update the existing context instead of creating a new one. Returns the context id and whether it was an update."
    )]
    async fn capture_activity(
        &self,
        Parameters(req): Parameters<CaptureRequest>,
    ) -> Result<CallToolResult, McpError> {
        let page_metadata = req
            .page_metadata
            .map(serde_json::from_value::<PageMetadata>)
            .transpose()
            .map_err(|e| McpError::invalid_params(format!("invalid page_metadata: {e}"), None))?;
        let sample = ActivitySample {
            url: req.url,
            title: req.title,
            activity_type: req.r#type.as_deref().map(ActivityType::parse),
            scroll_position: req.scroll_position,
            selected_text: req.selected_text,
            page_metadata,
        };
        let user_id = req.user_id;
        let session_id = req.session_id;
        self.run(move |t| t.capture_activity(&user_id, session_id.as_deref(), &sample))
            .await
    }

    #[tool(description = "Touch the active context for a URL: bump its visit count and optionally its scroll position.")]
    async fn update_activity(
        &self,
        Parameters(req): Parameters<UpdateActivityRequest>,
    ) -> Result<CallToolResult, McpError> {
        self.run(move |t| {
            let id = t.update_activity(&req.user_id, &req.normalized_url, req.scroll_position)?;
            Ok(serde_json::json!({ "contextId": id }))
        })
        .await
    }

    #[tool(description = "Add time spent on a page to its active context. Very short visits are ignored.")]
    async fn record_duration(
        &self,
        Parameters(req): Parameters<DurationRequest>,
    ) -> Result<CallToolResult, McpError> {
        self.run(move |t| {
            let applied = t.record_duration(&req.user_id, &req.url, req.duration_ms)?;
            Ok(serde_json::json!({ "applied": applied }))
        })
        .await
    }

    #[tool(description = "List the user's active (non-archived) contexts, most recently visited first.")]
    async fn list_active_contexts(
        &self,
        Parameters(req): Parameters<ListRequest>,
    ) -> Result<CallToolResult, McpError> {
        self.run(move |t| t.list_active_contexts(&req.user_id, req.limit))
            .await
    }

    #[tool(description = "List every context for the user including archived ones, newest first.")]
    async fn list_contexts(
        &self,
        Parameters(req): Parameters<ListRequest>,
    ) -> Result<CallToolResult, McpError> {
        self.run(move |t| t.list_contexts(&req.user_id, req.limit))
            .await
    }

    #[tool(description = "Mark a context as recovered after the user resumed it. Counts toward the user's recovery stats.")]
    async fn mark_recovered(
        &self,
        Parameters(req): Parameters<RecoverRequest>,
    ) -> Result<CallToolResult, McpError> {
        let id = parse_id("context_id", &req.context_id)?;
        self.run(move |t| {
            let changed = t.mark_recovered(id, req.user_id.as_deref())?;
            Ok(serde_json::json!({ "contextId": id, "changed": changed }))
        })
        .await
    }

    #[tool(description = "Archive a context. Archived contexts are never reopened; a later visit starts a new one.")]
    async fn archive_context(
        &self,
        Parameters(req): Parameters<ContextIdRequest>,
    ) -> Result<CallToolResult, McpError> {
        let id = parse_id("context_id", &req.context_id)?;
        self.run(move |t| {
            t.archive_context(id)?;
            Ok(serde_json::json!({ "contextId": id, "archived": true }))
        })
        .await
    }

    #[tool(description = "Start a work session. Returns the new session.")]
    async fn start_session(
        &self,
        Parameters(req): Parameters<UserRequest>,
    ) -> Result<CallToolResult, McpError> {
        self.run(move |t| t.start_session(&req.user_id)).await
    }

    #[tool(description = "Complete a work session and copy it into the user's history.")]
    async fn end_session(
        &self,
        Parameters(req): Parameters<SessionIdRequest>,
    ) -> Result<CallToolResult, McpError> {
        let id = parse_id("session_id", &req.session_id)?;
        self.run(move |t| t.end_session(id)).await
    }

    #[tool(description = "Count an interruption against an active session.")]
    async fn record_interruption(
        &self,
        Parameters(req): Parameters<SessionIdRequest>,
    ) -> Result<CallToolResult, McpError> {
        let id = parse_id("session_id", &req.session_id)?;
        self.run(move |t| {
            t.record_interruption(id)?;
            Ok(serde_json::json!({ "sessionId": id }))
        })
        .await
    }

    #[tool(description = "Count a context-loss event against an active session.")]
    async fn record_context_loss(
        &self,
        Parameters(req): Parameters<SessionIdRequest>,
    ) -> Result<CallToolResult, McpError> {
        let id = parse_id("session_id", &req.session_id)?;
        self.run(move |t| {
            t.record_context_loss(id)?;
            Ok(serde_json::json!({ "sessionId": id }))
        })
        .await
    }

    #[tool(description = "Credit seconds of recovered work to an active session.")]
    async fn record_time_recovered(
        &self,
        Parameters(req): Parameters<TimeRecoveredRequest>,
    ) -> Result<CallToolResult, McpError> {
        let id = parse_id("session_id", &req.session_id)?;
        self.run(move |t| {
            t.record_time_recovered(id, req.seconds)?;
            Ok(serde_json::json!({ "sessionId": id }))
        })
        .await
    }

    #[tool(description = "Aggregate the user's last 30 sessions: totals and average completed-session length in minutes.")]
    async fn get_session_stats(
        &self,
        Parameters(req): Parameters<UserRequest>,
    ) -> Result<CallToolResult, McpError> {
        self.run(move |t| t.session_stats(&req.user_id)).await
    }

    #[tool(
        description = "Today's Neuro-Flow focus score (0-100) with level, distraction count, focus streak and suggestions. The score is saved on the user's profile."
    )]
    async fn get_neuro_flow_score(
        &self,
        Parameters(req): Parameters<UserRequest>,
    ) -> Result<CallToolResult, McpError> {
        self.run(move |t| t.neuro_flow_score(&req.user_id)).await
    }

    #[tool(
        description = "Summarize what the user was doing before an absence: primary task, inferred purpose, next step and recent workspaces."
    )]
    async fn get_deep_cognitive_resume(
        &self,
        Parameters(req): Parameters<ResumeRequest>,
    ) -> Result<CallToolResult, McpError> {
        self.run(move |t| {
            t.deep_cognitive_resume(&req.user_id, req.absence_duration_ms.unwrap_or(0))
        })
        .await
    }

    #[tool(description = "Score distraction risk for a live activity snapshot. Pure computation, nothing is stored.")]
    async fn predict_distraction(
        &self,
        Parameters(req): Parameters<SnapshotRequest>,
    ) -> Result<CallToolResult, McpError> {
        let (snapshot, sensitivity) = req.into_parts();
        self.run(move |t| Ok(t.predict_distraction(&snapshot, sensitivity)))
            .await
    }

    #[tool(description = "Decide whether a context-recovery prompt should be shown for a live activity snapshot.")]
    async fn detect_context_loss(
        &self,
        Parameters(req): Parameters<SnapshotRequest>,
    ) -> Result<CallToolResult, McpError> {
        let (snapshot, sensitivity) = req.into_parts();
        self.run(move |t| Ok(t.detect_context_loss(&snapshot, sensitivity)))
            .await
    }

    #[tool(description = "Retry summary generation for contexts whose enrichment has not completed.")]
    async fn enrich_pending(
        &self,
        Parameters(req): Parameters<EnrichRequest>,
    ) -> Result<CallToolResult, McpError> {
        self.run(move |t| {
            let enriched = t.enrich_pending(req.limit.unwrap_or(50))?;
            Ok(serde_json::json!({ "enriched": enriched }))
        })
        .await
    }

    #[tool(description = "The user's recovery count, last recovery time and latest focus score.")]
    async fn get_user_stats(
        &self,
        Parameters(req): Parameters<UserRequest>,
    ) -> Result<CallToolResult, McpError> {
        self.run(move |t| t.user_stats(&req.user_id)).await
    }
}

#[tool_handler]
impl ServerHandler for ResetServer {
    fn get_info(&self) -> ServerInfo {
        ServerInfo {
            instructions: Some(
                "Tracks browsing activity as deduplicated contexts and derives focus signals.\n\n\
                 - Call capture_activity for every page visit; repeat visits merge into one context.\n\
                 - Use predict_distraction or detect_context_loss with a live snapshot to decide \
                   whether to nudge the user.\n\
                 - After an absence, get_deep_cognitive_resume explains where the user left off; \
                   call mark_recovered when they resume a context.\n\
                 - get_neuro_flow_score reports today's focus score and streak."
                    .into(),
            ),
            capabilities: ServerCapabilities::builder().enable_tools().build(),
            ..Default::default()
        }
    }
}
