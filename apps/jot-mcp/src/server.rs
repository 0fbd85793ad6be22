use std::{future::Future, net::SocketAddr, sync::Arc};

use axum::{
	Json, Router,
	extract::State,
	http::StatusCode,
	response::{IntoResponse, Response},
	routing::get,
};
use color_eyre::Result;
use rmcp::{
	ErrorData, ServerHandler,
	handler::server::router::tool::ToolRouter,
	model::{CallToolResult, JsonObject, ServerCapabilities, ServerInfo},
	transport::streamable_http_server::{
		StreamableHttpServerConfig, StreamableHttpService, session::local::LocalSessionManager,
	},
};
use serde::Serialize;
use serde_json::Value;
use tokio::net::TcpListener;

use jot_domain::{Notebook, SearchResult};
use jot_service::{
	Error, HealthStatus, JotService, ListNotebooksRequest, NoteFetchRequest,
	NotebookNotesRequest, SearchRequest,
};

#[derive(Serialize)]
struct SearchHit<'a> {
	note_id: &'a str,
	title: &'a str,
	snippet: &'a str,
	score: f32,
}

#[derive(Serialize)]
struct SearchResponse<'a> {
	results: Vec<SearchHit<'a>>,
	total_count: usize,
	has_more: bool,
	execution_time_ms: u64,
}
impl<'a> SearchResponse<'a> {
	fn new(result: &'a SearchResult) -> Self {
		Self {
			results: result
				.items
				.iter()
				.map(|item| SearchHit {
					note_id: item.note_id.as_str(),
					title: &item.title,
					snippet: &item.snippet,
					score: item.relevance_score,
				})
				.collect(),
			total_count: result.total_count,
			has_more: result.has_more,
			execution_time_ms: result.execution_time_ms,
		}
	}
}

#[derive(Serialize)]
struct NotebooksResponse {
	notebooks: Vec<Notebook>,
}

#[derive(Serialize)]
struct ToolError<'a> {
	error: &'static str,
	message: &'a str,
}

#[derive(Clone)]
struct JotMcp {
	service: Arc<JotService>,
	tool_router: ToolRouter<Self>,
}
impl JotMcp {
	fn new(service: Arc<JotService>) -> Self {
		Self { service, tool_router: Self::tool_router() }
	}
}

#[rmcp::tool_router]
impl JotMcp {
	#[rmcp::tool(
		name = "search_notes",
		description = "Search for notes in Joplin by title, content, or tags.",
		input_schema = search_notes_schema()
	)]
	async fn search_notes(&self, mut params: JsonObject) -> Result<CallToolResult, ErrorData> {
		let query = take_required_string(&mut params, "query")?;
		let limit = take_optional_i64(&mut params, "limit")?;
		let notebook_id = take_optional_string(&mut params, "notebook_id")?;
		let req =
			SearchRequest::new(&query, limit, notebook_id.as_deref()).map_err(invalid_params)?;

		tracing::info!(tool = "search_notes", query = %req.query, limit = req.limit, "Tool call.");

		match self.service.search_notes(req).await {
			Ok(result) => structured(&SearchResponse::new(&result)),
			Err(err) => tool_error("search_notes", err),
		}
	}

	#[rmcp::tool(
		name = "get_note",
		description = "Retrieve full content and metadata for a specific note.",
		input_schema = get_note_schema()
	)]
	async fn get_note(&self, mut params: JsonObject) -> Result<CallToolResult, ErrorData> {
		let note_id = take_required_string(&mut params, "note_id")?;
		let include_body = take_optional_bool(&mut params, "include_body")?;
		let req = NoteFetchRequest::new(&note_id, include_body).map_err(invalid_params)?;

		tracing::info!(tool = "get_note", note_id = %req.note_id, "Tool call.");

		match self.service.get_note(req).await {
			Ok(note) => structured(&note),
			Err(err) => tool_error("get_note", err),
		}
	}

	#[rmcp::tool(
		name = "list_notebooks",
		description = "Get all notebooks with their hierarchical structure.",
		input_schema = list_notebooks_schema()
	)]
	async fn list_notebooks(&self, mut params: JsonObject) -> Result<CallToolResult, ErrorData> {
		let parent_id = take_optional_string(&mut params, "parent_id")?;
		let recursive = take_optional_bool(&mut params, "recursive")?;
		let req =
			ListNotebooksRequest::new(parent_id.as_deref(), recursive).map_err(invalid_params)?;

		tracing::info!(tool = "list_notebooks", recursive = req.recursive, "Tool call.");

		match self.service.list_notebooks(req).await {
			Ok(notebooks) => structured(&NotebooksResponse { notebooks }),
			Err(err) => tool_error("list_notebooks", err),
		}
	}

	#[rmcp::tool(
		name = "get_notes_in_notebook",
		description = "List all notes within a specific notebook.",
		input_schema = notes_in_notebook_schema()
	)]
	async fn get_notes_in_notebook(
		&self,
		mut params: JsonObject,
	) -> Result<CallToolResult, ErrorData> {
		let notebook_id = take_required_string(&mut params, "notebook_id")?;
		let limit = take_optional_i64(&mut params, "limit")?;
		let offset = take_optional_i64(&mut params, "offset")?;
		let req =
			NotebookNotesRequest::new(&notebook_id, limit, offset).map_err(invalid_params)?;

		tracing::info!(
			tool = "get_notes_in_notebook",
			notebook_id = %req.notebook_id,
			limit = req.limit,
			offset = req.offset,
			"Tool call."
		);

		match self.service.notes_in_notebook(req).await {
			Ok(page) => structured(&page),
			Err(err) => tool_error("get_notes_in_notebook", err),
		}
	}
}

#[rmcp::tool_handler]
impl ServerHandler for JotMcp {
	fn get_info(&self) -> ServerInfo {
		ServerInfo {
			instructions: Some(
				"Read-only access to Joplin notes and notebooks with retry and rate limiting."
					.to_string(),
			),
			capabilities: ServerCapabilities::builder().enable_tools().build(),
			..Default::default()
		}
	}
}

/// MCP over streamable HTTP, plus `GET /health` for monitors.
pub fn router(service: Arc<JotService>) -> Router {
	let session_manager: Arc<LocalSessionManager> = Default::default();
	let mcp_service = service.clone();
	let mcp = StreamableHttpService::new(
		move || Ok(JotMcp::new(mcp_service.clone())),
		session_manager,
		StreamableHttpServerConfig::default(),
	);

	Router::new().route("/health", get(health)).with_state(service).fallback_service(mcp)
}

pub async fn serve_mcp<F>(
	bind_addr: SocketAddr,
	service: Arc<JotService>,
	shutdown: F,
) -> Result<()>
where
	F: Future<Output = ()> + Send + 'static,
{
	let listener = TcpListener::bind(bind_addr).await?;

	tracing::info!(%bind_addr, "MCP server listening.");

	axum::serve(listener, router(service)).with_graceful_shutdown(shutdown).await?;

	Ok(())
}

async fn health(State(service): State<Arc<JotService>>) -> Response {
	let report = service.health().await;
	let status = if report.status == HealthStatus::Unhealthy {
		StatusCode::SERVICE_UNAVAILABLE
	} else {
		StatusCode::OK
	};

	(status, Json(report)).into_response()
}

fn structured<T>(value: &T) -> Result<CallToolResult, ErrorData>
where
	T: Serialize,
{
	Ok(CallToolResult::structured(to_json(value)?))
}

fn to_json<T>(value: &T) -> Result<Value, ErrorData>
where
	T: Serialize,
{
	serde_json::to_value(value).map_err(|err| {
		ErrorData::internal_error(format!("Failed to encode tool result: {err}"), None)
	})
}

/// Validation failures are protocol errors; everything else is a tool-level error payload.
fn tool_error(tool: &'static str, err: Error) -> Result<CallToolResult, ErrorData> {
	if let Error::Validation { .. } = err {
		return Err(invalid_params(err));
	}

	tracing::warn!(tool, category = err.category(), error = %err, "Tool call failed.");

	let payload = to_json(&ToolError { error: err.category(), message: user_message(&err) })?;

	Ok(CallToolResult::structured_error(payload))
}

fn invalid_params(err: Error) -> ErrorData {
	ErrorData::invalid_params(err.to_string(), None)
}

fn user_message(err: &Error) -> &'static str {
	match err {
		Error::Connectivity { message, .. } => {
			let message = message.to_lowercase();

			if message.contains("timed out") {
				"Connection to Joplin timed out. Please check your network connection."
			} else if message.contains("refused") {
				"Cannot connect to Joplin. Please ensure Joplin is running and Web Clipper is enabled."
			} else {
				"Failed to connect to Joplin. Please check your connection settings."
			}
		},
		Error::Authentication { .. } => "Authentication failed. Please check your Joplin API token.",
		Error::NotFound { .. } => "The requested item was not found in Joplin.",
		Error::RateLimited { .. } => "Too many requests. Please wait a moment and try again.",
		Error::MalformedResponse { .. } => "Received invalid response from Joplin. Please try again.",
		Error::Validation { .. } =>
			"Invalid parameter format. Please check the parameter requirements.",
		Error::Upstream { .. } => "Joplin server error. Please try again later.",
		Error::InvalidTransition { .. } => "An internal error occurred. Please try again.",
	}
}

fn take_required_string(params: &mut JsonObject, key: &str) -> Result<String, ErrorData> {
	let value = params
		.remove(key)
		.ok_or_else(|| ErrorData::invalid_params(format!("{key} is required."), None))?;
	let text = value
		.as_str()
		.ok_or_else(|| ErrorData::invalid_params(format!("{key} must be a string."), None))?
		.trim();

	if text.is_empty() {
		return Err(ErrorData::invalid_params(format!("{key} must be non-empty."), None));
	}

	Ok(text.to_string())
}

fn take_optional_string(params: &mut JsonObject, key: &str) -> Result<Option<String>, ErrorData> {
	let Some(value) = params.remove(key).filter(|value| !value.is_null()) else {
		return Ok(None);
	};
	let text = value
		.as_str()
		.ok_or_else(|| ErrorData::invalid_params(format!("{key} must be a string."), None))?
		.trim();

	if text.is_empty() {
		return Ok(None);
	}

	Ok(Some(text.to_string()))
}

fn take_optional_i64(params: &mut JsonObject, key: &str) -> Result<Option<i64>, ErrorData> {
	let Some(value) = params.remove(key).filter(|value| !value.is_null()) else {
		return Ok(None);
	};

	value
		.as_i64()
		.map(Some)
		.ok_or_else(|| ErrorData::invalid_params(format!("{key} must be an integer."), None))
}

fn take_optional_bool(params: &mut JsonObject, key: &str) -> Result<Option<bool>, ErrorData> {
	let Some(value) = params.remove(key).filter(|value| !value.is_null()) else {
		return Ok(None);
	};

	value
		.as_bool()
		.map(Some)
		.ok_or_else(|| ErrorData::invalid_params(format!("{key} must be a boolean."), None))
}

fn search_notes_schema() -> Arc<JsonObject> {
	Arc::new(rmcp::object!({
		"type": "object",
		"additionalProperties": false,
		"required": ["query"],
		"properties": {
			"query": {
				"type": "string",
				"minLength": 1,
				"maxLength": 200,
				"description": "Search query to match against note titles and content."
			},
			"limit": {
				"type": "integer",
				"minimum": 1,
				"maximum": 50,
				"default": 10,
				"description": "Maximum number of results to return."
			},
			"notebook_id": {
				"type": "string",
				"pattern": "^[a-f0-9]{32}$",
				"description": "Limit the search to one notebook."
			}
		}
	}))
}

fn get_note_schema() -> Arc<JsonObject> {
	Arc::new(rmcp::object!({
		"type": "object",
		"additionalProperties": false,
		"required": ["note_id"],
		"properties": {
			"note_id": {
				"type": "string",
				"pattern": "^[a-f0-9]{32}$",
				"description": "Identifier of the note to retrieve."
			},
			"include_body": {
				"type": "boolean",
				"default": true,
				"description": "Whether to include the note body."
			}
		}
	}))
}

fn list_notebooks_schema() -> Arc<JsonObject> {
	Arc::new(rmcp::object!({
		"type": "object",
		"additionalProperties": false,
		"properties": {
			"parent_id": {
				"type": "string",
				"pattern": "^[a-f0-9]{32}$",
				"description": "List notebooks under this parent only."
			},
			"recursive": {
				"type": "boolean",
				"default": true,
				"description": "Include nested notebooks."
			}
		}
	}))
}

fn notes_in_notebook_schema() -> Arc<JsonObject> {
	Arc::new(rmcp::object!({
		"type": "object",
		"additionalProperties": false,
		"required": ["notebook_id"],
		"properties": {
			"notebook_id": {
				"type": "string",
				"pattern": "^[a-f0-9]{32}$",
				"description": "Notebook to list notes from."
			},
			"limit": {
				"type": "integer",
				"minimum": 1,
				"maximum": 100,
				"default": 20,
				"description": "Maximum number of notes to return."
			},
			"offset": {
				"type": "integer",
				"minimum": 0,
				"default": 0,
				"description": "Number of notes to skip."
			}
		}
	}))
}

#[cfg(test)]
mod tests {
	use std::{collections::HashSet, sync::Arc};

	use axum::{
		body::{self, Body},
		http::{Request, StatusCode},
	};
	use rmcp::model::{ErrorCode, JsonObject};
	use serde_json::Value;
	use tower::util::ServiceExt;

	use crate::server::{self, JotMcp};
	use jot_config::{Config, UpstreamMode};
	use jot_service::{Error, JotService};
	use jot_upstream::StubUpstreamClient;

	const PROJECTS_ID: &str = "7b2d1e4f3c5e4f60a1b2c3d4e5f60718";
	const MISSING_ID: &str = "ffffffffffffffffffffffffffffffff";

	fn stub_service(stub: Arc<StubUpstreamClient>) -> Arc<JotService> {
		let mut cfg = Config::default();

		cfg.upstream.mode = UpstreamMode::Stub;
		cfg.upstream.max_retries = 0;
		cfg.upstream.retry_delay_ms = 1;

		Arc::new(JotService::new(&cfg, stub))
	}

	fn params(value: Value) -> JsonObject {
		let Value::Object(map) = value else { panic!("Tool params must be a JSON object.") };

		map
	}

	fn structured_content(result: &rmcp::model::CallToolResult) -> &Value {
		result.structured_content.as_ref().expect("Tool result must carry structured content.")
	}

	async fn get(app: axum::Router, uri: &str) -> (StatusCode, Value) {
		let response = app
			.oneshot(
				Request::builder().uri(uri).body(Body::empty()).expect("Failed to build request."),
			)
			.await
			.expect("Failed to call the router.");
		let status = response.status();
		let body = body::to_bytes(response.into_body(), usize::MAX)
			.await
			.expect("Failed to read response body.");
		let json = serde_json::from_slice(&body).expect("Failed to parse response.");

		(status, json)
	}

	#[test]
	fn registers_all_tools() {
		let tools: HashSet<String> = JotMcp::tool_router()
			.list_all()
			.into_iter()
			.map(|tool| tool.name.to_string())
			.collect();
		let expected = ["search_notes", "get_note", "list_notebooks", "get_notes_in_notebook"];

		for name in expected {
			assert!(tools.contains(name), "Missing tool registration: {name}.");
		}

		assert_eq!(tools.len(), expected.len(), "Unexpected tool count for MCP registration.");
	}

	#[test]
	fn connectivity_messages_distinguish_refusal_and_timeout() {
		let refused = Error::Connectivity {
			operation: "ping",
			message: "error sending request: Connection refused (os error 111)".to_string(),
		};
		let timed_out =
			Error::Connectivity { operation: "ping", message: "The request timed out.".to_string() };

		assert!(server::user_message(&refused).starts_with("Cannot connect to Joplin."));
		assert!(server::user_message(&timed_out).starts_with("Connection to Joplin timed out."));
		assert_eq!(
			server::user_message(&Error::Authentication { operation: "search" }),
			"Authentication failed. Please check your Joplin API token."
		);
	}

	#[tokio::test]
	async fn search_tool_returns_ranked_results() {
		let mcp = JotMcp::new(stub_service(Arc::new(StubUpstreamClient::with_sample_data())));
		let result = mcp
			.search_notes(params(serde_json::json!({ "query": "project", "limit": 5 })))
			.await
			.expect("search_notes failed.");
		let content = structured_content(&result);

		assert_ne!(result.is_error, Some(true));
		assert_eq!(content["results"][0]["title"], "Project Plan");
		assert!(content["results"][0]["score"].as_f64().is_some());
		assert_eq!(content["has_more"], false);
	}

	#[tokio::test]
	async fn invalid_arguments_are_protocol_errors() {
		let mcp = JotMcp::new(stub_service(Arc::new(StubUpstreamClient::with_sample_data())));
		let err = mcp
			.get_note(params(serde_json::json!({ "note_id": "not-an-id" })))
			.await
			.expect_err("Expected invalid params.");

		assert_eq!(err.code, ErrorCode::INVALID_PARAMS);

		let err = mcp
			.search_notes(params(serde_json::json!({ "query": "x", "limit": 51 })))
			.await
			.expect_err("Expected invalid params.");

		assert_eq!(err.code, ErrorCode::INVALID_PARAMS);
	}

	#[tokio::test]
	async fn upstream_failures_are_tool_errors() {
		let mcp = JotMcp::new(stub_service(Arc::new(StubUpstreamClient::with_sample_data())));
		let result = mcp
			.get_note(params(serde_json::json!({ "note_id": MISSING_ID })))
			.await
			.expect("Tool errors are not protocol errors.");
		let content = structured_content(&result);

		assert_eq!(result.is_error, Some(true));
		assert_eq!(content["error"], "not_found");
		assert_eq!(content["message"], "The requested item was not found in Joplin.");
	}

	#[tokio::test]
	async fn notebook_tools_return_tree_and_page() {
		let mcp = JotMcp::new(stub_service(Arc::new(StubUpstreamClient::with_sample_data())));
		let result = mcp
			.list_notebooks(JsonObject::new())
			.await
			.expect("list_notebooks failed.");
		let notebooks = &structured_content(&result)["notebooks"];

		assert_eq!(notebooks[0]["title"], "Work");
		assert_eq!(notebooks[0]["children"][0]["id"], PROJECTS_ID);

		let result = mcp
			.get_notes_in_notebook(params(serde_json::json!({ "notebook_id": PROJECTS_ID })))
			.await
			.expect("get_notes_in_notebook failed.");
		let page = structured_content(&result);

		assert_eq!(page["notes"][0]["title"], "Project Plan");
		assert_eq!(page["total_count"], 1);
		assert_eq!(page["has_more"], false);
	}

	#[tokio::test]
	async fn health_route_reports_status() {
		let stub = Arc::new(StubUpstreamClient::with_sample_data());
		let (status, json) = get(server::router(stub_service(stub.clone())), "/health").await;

		assert_eq!(status, StatusCode::OK);
		assert_eq!(json["status"], "healthy");
		assert_eq!(json["checks"].as_array().map(Vec::len), Some(2));

		stub.set_reachable(false);

		let (status, json) = get(server::router(stub_service(stub)), "/health").await;

		assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
		assert_eq!(json["status"], "unhealthy");
	}
}
