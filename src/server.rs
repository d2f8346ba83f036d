//! MCP server: stdio transport, JSON-RPC 2.0, newline-delimited.
//!
//! Implements the Model Context Protocol (protocol version 2025-06-18) server over
//! stdin/stdout. Reads JSON-RPC requests from stdin (one per line),
//! dispatches to the tool router, and writes responses to stdout.
//!
//! Protocol flow:
//! 1. Client sends `initialize` → server responds with capabilities
//! 2. Client sends `notifications/initialized`
//! 3. Client sends `tools/list` → server returns tool definitions
//! 4. Client sends `tools/call` → server executes tool and returns result
//! 5. Client closes stdin → server finishes queued calls and exits
//!
//! `tools/call` requests are queued and executed one at a time in arrival
//! order. Everything else is answered straight from the read loop, so a
//! `tools/list` or `ping` is not held up by a call waiting on GitHub.

use std::sync::Arc;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncWrite, AsyncWriteExt};
use tokio::sync::mpsc;
use tracing::{debug, error, info, warn};

use crate::config::GitHubConfig;
use crate::github::GitHubClient;
use crate::schema::ToolDefinition;
use crate::tools::ToolRouter;

/// Maximum size of a single JSON-RPC line (10 MiB).
const MAX_LINE_BYTES: usize = 10 * 1024 * 1024;

const PROTOCOL_VERSION: &str = "2025-06-18";

// ---------------------------------------------------------------------------
// JSON-RPC 2.0 types
// ---------------------------------------------------------------------------

/// JSON-RPC 2.0 request.
#[derive(Debug, Deserialize)]
pub struct JsonRpcRequest {
    pub jsonrpc: String,
    pub id: Option<serde_json::Value>,
    pub method: String,
    #[serde(default)]
    pub params: serde_json::Value,
}

/// JSON-RPC 2.0 response.
#[derive(Debug, Serialize)]
pub struct JsonRpcResponse {
    pub jsonrpc: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<serde_json::Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub result: Option<serde_json::Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<JsonRpcError>,
}

/// JSON-RPC 2.0 error object.
#[derive(Debug, Serialize)]
pub struct JsonRpcError {
    pub code: i64,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<serde_json::Value>,
}

// ---------------------------------------------------------------------------
// MCP protocol types
// ---------------------------------------------------------------------------

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct ServerInfo {
    name: String,
    version: String,
}

#[derive(Debug, Serialize)]
struct ServerCapabilities {
    tools: ToolsCapability,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct ToolsCapability {
    list_changed: bool,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct InitializeResult {
    protocol_version: String,
    capabilities: ServerCapabilities,
    server_info: ServerInfo,
}

#[derive(Debug, Serialize)]
struct ToolsListResult {
    tools: Vec<ToolDefinition>,
}

#[derive(Debug, Deserialize)]
struct ToolCallParams {
    name: String,
    #[serde(default)]
    arguments: serde_json::Value,
}

/// MCP content item in tools/call response.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ContentItem {
    #[serde(rename = "type")]
    pub content_type: String,
    pub text: String,
}

/// MCP tools/call result: the envelope returned for every call.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ToolCallResult {
    pub content: Vec<ContentItem>,
    #[serde(skip_serializing_if = "std::ops::Not::not")]
    pub is_error: bool,
}

impl ToolCallResult {
    /// Single text item envelope.
    pub fn text(text: impl Into<String>, is_error: bool) -> Self {
        Self {
            content: vec![ContentItem {
                content_type: "text".to_owned(),
                text: text.into(),
            }],
            is_error,
        }
    }
}

// ---------------------------------------------------------------------------
// MCP Server configuration
// ---------------------------------------------------------------------------

/// Configuration for the MCP server.
#[derive(Debug, Clone)]
pub struct McpServerConfig {
    pub github: GitHubConfig,
}

// ---------------------------------------------------------------------------
// Server main loop
// ---------------------------------------------------------------------------

/// Run the MCP server on stdin/stdout until stdin is closed.
///
/// Drives [`serve`] on a single-threaded Tokio runtime.
///
/// # Errors
///
/// Returns an error if the runtime or HTTP client cannot be built, or if
/// stdin/stdout I/O fails fatally.
pub fn run_mcp_server(config: McpServerConfig) -> Result<()> {
    info!(base_url = config.github.base_url, "oa-github MCP server starting");

    let client = GitHubClient::with_reqwest(config.github).context("failed to build HTTP client")?;
    let router = Arc::new(ToolRouter::new(client));

    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .context("failed to start async runtime")?;

    runtime.block_on(async {
        let stdin = tokio::io::BufReader::new(tokio::io::stdin());
        serve(router, stdin, tokio::io::stdout()).await
    })?;

    info!("oa-github MCP server stopped");
    Ok(())
}

/// Serve JSON-RPC over `reader`/`writer` until `reader` reaches EOF and every
/// queued call has been answered. Returns the writer.
pub async fn serve<R, W>(router: Arc<ToolRouter>, reader: R, writer: W) -> Result<W>
where
    R: AsyncBufRead + Unpin,
    W: AsyncWrite + Unpin,
{
    let (out_tx, out_rx) = mpsc::unbounded_channel::<JsonRpcResponse>();
    let (call_tx, call_rx) = mpsc::unbounded_channel::<JsonRpcRequest>();

    let ((), (), writer) = tokio::try_join!(
        read_loop(&router, reader, call_tx, out_tx.clone()),
        call_worker(&router, call_rx, out_tx),
        write_loop(writer, out_rx),
    )?;
    Ok(writer)
}

/// Read requests, answer the cheap ones, queue `tools/call`.
async fn read_loop<R: AsyncBufRead + Unpin>(
    router: &ToolRouter,
    mut reader: R,
    calls: mpsc::UnboundedSender<JsonRpcRequest>,
    out: mpsc::UnboundedSender<JsonRpcResponse>,
) -> Result<()> {
    let mut line_buf = Vec::new();

    loop {
        line_buf.clear();
        match read_line_limited(&mut reader, &mut line_buf, MAX_LINE_BYTES)
            .await
            .context("failed to read from stdin")?
        {
            LineRead::Eof => {
                info!("stdin closed, shutting down");
                break;
            }
            LineRead::Oversized => {
                warn!(max_bytes = MAX_LINE_BYTES, "request line too large, discarded");
                let _ = out.send(error_response(
                    None,
                    -32600,
                    &format!("invalid request: line exceeds maximum size ({MAX_LINE_BYTES} bytes)"),
                ));
                continue;
            }
            LineRead::Line => {}
        }

        let Ok(line) = std::str::from_utf8(&line_buf) else {
            warn!("non-UTF-8 request line");
            let _ = out.send(error_response(None, -32700, "parse error: request is not valid UTF-8"));
            continue;
        };
        let trimmed = line.trim();
        if trimmed.is_empty() {
            continue;
        }

        debug!(raw = trimmed, "received request");

        let request: JsonRpcRequest = match serde_json::from_str(trimmed) {
            Ok(r) => r,
            Err(e) => {
                warn!(error = %e, "invalid JSON-RPC request");
                let _ = out.send(error_response(None, -32700, &format!("parse error: {e}")));
                continue;
            }
        };

        // "jsonrpc" MUST be exactly "2.0".
        if request.jsonrpc != "2.0" {
            warn!(version = request.jsonrpc, "invalid JSON-RPC version (expected \"2.0\")");
            let _ = out.send(error_response(
                request.id.clone(),
                -32600,
                &format!(
                    "invalid request: jsonrpc version must be \"2.0\", got \"{}\"",
                    request.jsonrpc
                ),
            ));
            continue;
        }

        if request.method == "tools/call" {
            if calls.send(request).is_err() {
                error!("call worker stopped, dropping request");
            }
            continue;
        }

        let is_notification = request.id.is_none();
        let response = dispatch(router, &request);

        if is_notification {
            // Notifications MUST NOT receive a response.
            debug!(method = request.method, "notification handled (no response)");
            continue;
        }

        if let Some(resp) = response {
            let _ = out.send(resp);
        }
    }

    Ok(())
}

/// Execute queued `tools/call` requests one at a time, in arrival order.
async fn call_worker(
    router: &ToolRouter,
    mut calls: mpsc::UnboundedReceiver<JsonRpcRequest>,
    out: mpsc::UnboundedSender<JsonRpcResponse>,
) -> Result<()> {
    while let Some(request) = calls.recv().await {
        let response = handle_tools_call(router, &request).await;
        if request.id.is_some() {
            let _ = out.send(response);
        }
    }
    Ok(())
}

async fn write_loop<W: AsyncWrite + Unpin>(
    mut writer: W,
    mut responses: mpsc::UnboundedReceiver<JsonRpcResponse>,
) -> Result<W> {
    while let Some(resp) = responses.recv().await {
        write_response(&mut writer, &resp).await?;
    }
    Ok(writer)
}

/// Dispatch a non-call JSON-RPC request to the appropriate handler.
fn dispatch(router: &ToolRouter, req: &JsonRpcRequest) -> Option<JsonRpcResponse> {
    match req.method.as_str() {
        "initialize" => Some(handle_initialize(req)),
        "notifications/initialized" => {
            info!("client initialized");
            None // notification, no response
        }
        "tools/list" => Some(handle_tools_list(router, req)),
        "ping" => Some(handle_ping(req)),
        _ => {
            warn!(method = req.method, "unknown method");
            Some(error_response(
                req.id.clone(),
                -32601,
                &format!("method not found: {}", req.method),
            ))
        }
    }
}

// ---------------------------------------------------------------------------
// Handlers
// ---------------------------------------------------------------------------

fn handle_initialize(req: &JsonRpcRequest) -> JsonRpcResponse {
    let result = InitializeResult {
        protocol_version: PROTOCOL_VERSION.to_owned(),
        capabilities: ServerCapabilities {
            tools: ToolsCapability {
                list_changed: false,
            },
        },
        server_info: ServerInfo {
            name: "oa-github".to_owned(),
            version: env!("CARGO_PKG_VERSION").to_owned(),
        },
    };

    success_response(req.id.clone(), &result)
}

fn handle_tools_list(router: &ToolRouter, req: &JsonRpcRequest) -> JsonRpcResponse {
    let tools = router.list_tools();
    let result = ToolsListResult { tools };
    success_response(req.id.clone(), &result)
}

async fn handle_tools_call(router: &ToolRouter, req: &JsonRpcRequest) -> JsonRpcResponse {
    let params: ToolCallParams = match serde_json::from_value(req.params.clone()) {
        Ok(p) => p,
        Err(e) => {
            return error_response(
                req.id.clone(),
                -32602,
                &format!("invalid tools/call params: {e}"),
            );
        }
    };

    let result = router.call_tool(&params.name, params.arguments).await;
    success_response(req.id.clone(), &result)
}

fn handle_ping(req: &JsonRpcRequest) -> JsonRpcResponse {
    success_response(req.id.clone(), &serde_json::json!({}))
}

// ---------------------------------------------------------------------------
// Response helpers
// ---------------------------------------------------------------------------

fn success_response(id: Option<serde_json::Value>, result: &impl Serialize) -> JsonRpcResponse {
    match serde_json::to_value(result) {
        Ok(v) => JsonRpcResponse {
            jsonrpc: "2.0".to_owned(),
            id,
            result: Some(v),
            error: None,
        },
        Err(e) => {
            error!(error = %e, "failed to serialize success response");
            JsonRpcResponse {
                jsonrpc: "2.0".to_owned(),
                id,
                result: None,
                error: Some(JsonRpcError {
                    code: -32603,
                    message: format!("internal error: failed to serialize result: {e}"),
                    data: None,
                }),
            }
        }
    }
}

fn error_response(id: Option<serde_json::Value>, code: i64, message: &str) -> JsonRpcResponse {
    JsonRpcResponse {
        jsonrpc: "2.0".to_owned(),
        id,
        result: None,
        error: Some(JsonRpcError {
            code,
            message: message.to_owned(),
            data: None,
        }),
    }
}

/// Write a JSON-RPC response as a single line.
async fn write_response(out: &mut (impl AsyncWrite + Unpin), resp: &JsonRpcResponse) -> Result<()> {
    let json = serde_json::to_string(resp).context("failed to serialize response")?;
    debug!(response = json, "sending response");
    out.write_all(json.as_bytes())
        .await
        .context("failed to write to stdout")?;
    out.write_all(b"\n")
        .await
        .context("failed to write newline to stdout")?;
    out.flush().await.context("failed to flush stdout")?;
    Ok(())
}

/// Outcome of [`read_line_limited`].
#[derive(Debug, PartialEq, Eq)]
enum LineRead {
    Eof,
    Line,
    /// The line exceeded the limit; it was consumed and discarded.
    Oversized,
}

/// Read a line from `reader` into `buf`, stopping at newline or `max_bytes`.
///
/// If the line exceeds `max_bytes`, the rest of it is consumed and
/// discarded and [`LineRead::Oversized`] is returned, leaving the reader
/// positioned at the next line.
async fn read_line_limited(
    reader: &mut (impl AsyncBufRead + Unpin),
    buf: &mut Vec<u8>,
    max_bytes: usize,
) -> std::io::Result<LineRead> {
    let mut oversized = false;
    loop {
        let available = reader.fill_buf().await?;
        if available.is_empty() {
            return Ok(match (oversized, buf.is_empty()) {
                (true, _) => LineRead::Oversized,
                (false, true) => LineRead::Eof,
                (false, false) => LineRead::Line,
            });
        }
        let (consumed, found_newline) = match available.iter().position(|&b| b == b'\n') {
            Some(pos) => (pos + 1, true),
            None => (available.len(), false),
        };
        if !oversized {
            if buf.len() + consumed > max_bytes {
                oversized = true;
                buf.clear();
            } else {
                buf.extend_from_slice(&available[..consumed]);
            }
        }
        reader.consume(consumed);
        if found_newline {
            return Ok(if oversized { LineRead::Oversized } else { LineRead::Line });
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_read_line_limited_splits_lines() {
        let mut reader = tokio::io::BufReader::new(&b"{\"a\":1}\n{\"b\":2}"[..]);
        let mut buf = Vec::new();

        assert_eq!(read_line_limited(&mut reader, &mut buf, 64).await.expect("read"), LineRead::Line);
        assert_eq!(buf, b"{\"a\":1}\n");

        buf.clear();
        assert_eq!(read_line_limited(&mut reader, &mut buf, 64).await.expect("read"), LineRead::Line);
        assert_eq!(buf, b"{\"b\":2}");

        buf.clear();
        assert_eq!(read_line_limited(&mut reader, &mut buf, 64).await.expect("read"), LineRead::Eof);
    }

    #[tokio::test]
    async fn test_read_line_limited_discards_oversized() {
        let input = format!("{}\nok\n", "x".repeat(100));
        let mut reader = tokio::io::BufReader::with_capacity(16, input.as_bytes());
        let mut buf = Vec::new();

        assert_eq!(
            read_line_limited(&mut reader, &mut buf, 32).await.expect("read"),
            LineRead::Oversized
        );
        buf.clear();
        assert_eq!(read_line_limited(&mut reader, &mut buf, 32).await.expect("read"), LineRead::Line);
        assert_eq!(buf, b"ok\n");
    }

    #[test]
    fn test_tool_call_result_skips_false_is_error() {
        let ok = serde_json::to_value(ToolCallResult::text("done", false)).expect("serialize");
        assert_eq!(ok, serde_json::json!({"content": [{"type": "text", "text": "done"}]}));

        let err = serde_json::to_value(ToolCallResult::text("boom", true)).expect("serialize");
        assert_eq!(err["isError"], true);
    }
}
