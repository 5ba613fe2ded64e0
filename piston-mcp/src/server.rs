//! Line-delimited JSON-RPC server exposing the tool registry with MCP method
//! names.

use std::sync::Arc;

use piston_tools::{ToolError, ToolRegistry};
use serde::Deserialize;
use serde_json::{Value, json};
use tokio::io::{self, AsyncBufRead, AsyncBufReadExt, AsyncWrite, AsyncWriteExt};
use tracing::{debug, info, warn};

use crate::rpc::{RpcRequest, RpcResponse};

/// Protocol revision reported when the client does not propose one.
pub const DEFAULT_PROTOCOL_VERSION: &str = "2024-11-05";

const SERVER_NAME: &str = "piston";

#[derive(Debug, Default, Deserialize)]
struct InitializeParams {
    #[serde(default, rename = "protocolVersion")]
    protocol_version: Option<String>,
}

#[derive(Debug, Deserialize)]
struct CallToolParams {
    name: String,
    #[serde(default)]
    arguments: Option<Value>,
}

/// Serves the tools of a [`ToolRegistry`] to a single client.
#[derive(Debug)]
pub struct McpServer {
    registry: Arc<ToolRegistry>,
}

impl McpServer {
    /// Creates a server over the supplied registry.
    #[must_use]
    pub fn new(registry: Arc<ToolRegistry>) -> Self {
        Self { registry }
    }

    /// Reads one JSON-RPC message per line from `reader` and writes replies
    /// to `writer` until the input is exhausted. A line that is not valid
    /// UTF-8 is answered with a parse error and the loop keeps going.
    ///
    /// # Errors
    ///
    /// Returns any I/O error raised while reading or writing.
    pub async fn serve<R, W>(&self, mut reader: R, mut writer: W) -> io::Result<()>
    where
        R: AsyncBufRead + Unpin,
        W: AsyncWrite + Unpin,
    {
        let mut buf = Vec::new();
        loop {
            buf.clear();
            if reader.read_until(b'\n', &mut buf).await? == 0 {
                break;
            }

            let response = match std::str::from_utf8(&buf) {
                Ok(line) if line.trim().is_empty() => continue,
                Ok(line) => self.handle_line(line.trim()).await,
                Err(err) => {
                    warn!(%err, "message is not valid UTF-8");
                    Some(RpcResponse::parse_error(format!("parse error: {err}")))
                }
            };

            if let Some(response) = response {
                let mut encoded = serde_json::to_vec(&response)?;
                encoded.push(b'\n');
                writer.write_all(&encoded).await?;
                writer.flush().await?;
            }
        }

        info!("input closed; shutting down");
        Ok(())
    }

    /// Handles one raw message, returning the reply if one is owed.
    pub async fn handle_line(&self, line: &str) -> Option<RpcResponse> {
        let value: Value = match serde_json::from_str(line) {
            Ok(value) => value,
            Err(err) => {
                warn!(%err, "unparsable message");
                return Some(RpcResponse::parse_error(format!("parse error: {err}")));
            }
        };

        let id = value.get("id").cloned().filter(|id| !id.is_null());
        match serde_json::from_value::<RpcRequest>(value) {
            Ok(request) => self.handle_request(request).await,
            Err(err) => Some(RpcResponse::invalid_request(id, format!("invalid request: {err}"))),
        }
    }

    /// Dispatches a decoded request. Notifications never produce a reply.
    pub async fn handle_request(&self, request: RpcRequest) -> Option<RpcResponse> {
        debug!(method = %request.method, id = ?request.id, "received request");

        if request.is_notification() {
            debug!(method = %request.method, "notification acknowledged");
            return None;
        }

        if request.jsonrpc != "2.0" {
            return Some(RpcResponse::invalid_request(
                request.id,
                "unsupported jsonrpc version (expected 2.0)",
            ));
        }

        let RpcRequest {
            method, params, id, ..
        } = request;

        let response = match method.as_str() {
            "initialize" => Self::initialize(id, params),
            "ping" => RpcResponse::success(id, json!({})),
            "tools/list" => self.list_tools(id),
            "tools/call" => self.call_tool(id, params).await,
            other => {
                warn!(method = other, "unknown method");
                RpcResponse::method_not_found(id, other)
            }
        };
        Some(response)
    }

    fn initialize(id: Option<Value>, params: Option<Value>) -> RpcResponse {
        let params: InitializeParams = match params {
            Some(params) => match serde_json::from_value(params) {
                Ok(params) => params,
                Err(err) => {
                    return RpcResponse::invalid_params(id, format!("invalid params: {err}"));
                }
            },
            None => InitializeParams::default(),
        };

        let protocol_version = params
            .protocol_version
            .unwrap_or_else(|| DEFAULT_PROTOCOL_VERSION.to_owned());
        info!(%protocol_version, "client initialized");

        RpcResponse::success(
            id,
            json!({
                "protocolVersion": protocol_version,
                "capabilities": { "tools": {} },
                "serverInfo": {
                    "name": SERVER_NAME,
                    "version": env!("CARGO_PKG_VERSION"),
                }
            }),
        )
    }

    fn list_tools(&self, id: Option<Value>) -> RpcResponse {
        let tools: Vec<Value> = self
            .registry
            .list()
            .iter()
            .map(|tool| {
                json!({
                    "name": tool.name(),
                    "description": tool.description().unwrap_or_default(),
                    "inputSchema": tool.input_schema(),
                })
            })
            .collect();

        RpcResponse::success(id, json!({ "tools": tools }))
    }

    async fn call_tool(&self, id: Option<Value>, params: Option<Value>) -> RpcResponse {
        let params: CallToolParams = match params.map(serde_json::from_value) {
            Some(Ok(params)) => params,
            Some(Err(err)) => {
                return RpcResponse::invalid_params(id, format!("invalid params: {err}"));
            }
            None => return RpcResponse::invalid_params(id, "params must name a tool"),
        };

        let arguments = params.arguments.unwrap_or_else(|| json!({}));
        info!(tool = %params.name, "calling tool");

        match self.registry.invoke(&params.name, arguments).await {
            Ok(output) => RpcResponse::success(id, tool_content(output, false)),
            Err(ToolError::UnknownTool { name }) => {
                RpcResponse::invalid_params(id, format!("unknown tool `{name}`"))
            }
            Err(err) => {
                warn!(tool = %params.name, %err, "tool call failed");
                RpcResponse::success(id, tool_content(Value::String(err.to_string()), true))
            }
        }
    }
}

fn tool_content(output: Value, is_error: bool) -> Value {
    let text = match output {
        Value::String(text) => text,
        other => other.to_string(),
    };

    json!({
        "content": [{ "type": "text", "text": text }],
        "isError": is_error,
    })
}
