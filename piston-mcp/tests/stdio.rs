use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use hyper::{Body, Request, Response, StatusCode};
use piston_client::{ClientConfig, ClientError, ClientResult, PistonClient, Transport};
use piston_mcp::McpServer;
use piston_tools::{INVALID_LANGUAGE, RUNTIMES_FAILED, RunCodeTool, ToolRegistry};
use serde_json::{Value, json};
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader, duplex};

struct CannedTransport {
    replies: Mutex<VecDeque<Option<Value>>>,
}

#[async_trait]
impl Transport for CannedTransport {
    async fn send(&self, _request: Request<Body>) -> ClientResult<Response<Body>> {
        let reply = self.replies.lock().unwrap().pop_front().expect("unexpected call");
        match reply {
            Some(body) => Ok(Response::builder()
                .status(StatusCode::OK)
                .body(Body::from(body.to_string()))
                .unwrap()),
            None => Err(ClientError::service_unavailable("dns lookup failed")),
        }
    }
}

fn server(replies: Vec<Option<Value>>) -> McpServer {
    let transport = Arc::new(CannedTransport {
        replies: Mutex::new(replies.into()),
    });
    let client = PistonClient::with_transport(ClientConfig::new(), transport);
    let registry = ToolRegistry::new();
    RunCodeTool::new(Arc::new(client))
        .register(&registry)
        .unwrap();
    McpServer::new(Arc::new(registry))
}

/// Feeds `messages` to the server one per line and collects its replies.
async fn exchange(server: McpServer, messages: &[Value]) -> Vec<Value> {
    let (client_end, server_end) = duplex(64 * 1024);
    let (server_read, server_write) = tokio::io::split(server_end);
    let (client_read, mut client_write) = tokio::io::split(client_end);

    let serving = tokio::spawn(async move {
        server
            .serve(BufReader::new(server_read), server_write)
            .await
            .unwrap();
    });

    for message in messages {
        client_write
            .write_all(format!("{message}\n").as_bytes())
            .await
            .unwrap();
    }
    client_write.shutdown().await.unwrap();
    drop(client_write);

    let mut replies = Vec::new();
    let mut lines = BufReader::new(client_read).lines();
    while let Some(line) = lines.next_line().await.unwrap() {
        replies.push(serde_json::from_str(&line).unwrap());
    }
    serving.await.unwrap();
    replies
}

fn call(id: u64, language: &str, code: &str) -> Value {
    json!({
        "jsonrpc": "2.0",
        "id": id,
        "method": "tools/call",
        "params": { "name": "run_code", "arguments": { "language": language, "code": code } }
    })
}

#[tokio::test]
async fn full_session_runs_code() {
    let server = server(vec![
        Some(json!([{ "language": "python", "version": "3.10.0", "aliases": ["py", "python3"] }])),
        Some(json!({
            "language": "python",
            "version": "3.10.0",
            "run": { "stdout": "42\n", "stderr": "", "output": "42\n", "code": 0, "signal": null }
        })),
    ]);

    let replies = exchange(
        server,
        &[
            json!({ "jsonrpc": "2.0", "id": 1, "method": "initialize", "params": { "protocolVersion": "2024-11-05" } }),
            json!({ "jsonrpc": "2.0", "method": "notifications/initialized" }),
            json!({ "jsonrpc": "2.0", "id": 2, "method": "tools/list" }),
            call(3, "python", "print(42)"),
        ],
    )
    .await;

    assert_eq!(replies.len(), 3);
    assert_eq!(replies[0]["id"], 1);
    assert_eq!(replies[0]["result"]["serverInfo"]["name"], "piston");

    let tools = replies[1]["result"]["tools"].as_array().unwrap();
    assert_eq!(tools.len(), 1);
    assert_eq!(tools[0]["name"], "run_code");
    assert_eq!(tools[0]["inputSchema"]["properties"]["code"]["type"], "string");

    assert_eq!(replies[2]["id"], 3);
    assert_eq!(replies[2]["result"]["content"][0]["text"], "42\n");
    assert_eq!(replies[2]["result"]["isError"], false);
}

#[tokio::test]
async fn failures_come_back_as_tool_text() {
    let server = server(vec![
        None,
        Some(json!([{ "language": "python", "version": "3.10.0", "aliases": [] }])),
    ]);

    let replies = exchange(
        server,
        &[call(1, "python", "print(42)"), call(2, "nosuchlang", "x")],
    )
    .await;

    assert_eq!(replies[0]["result"]["content"][0]["text"], RUNTIMES_FAILED);
    assert_eq!(replies[1]["result"]["content"][0]["text"], INVALID_LANGUAGE);
}

#[tokio::test]
async fn bad_arguments_are_flagged_as_errors() {
    let replies = exchange(
        server(Vec::new()),
        &[json!({
            "jsonrpc": "2.0",
            "id": 9,
            "method": "tools/call",
            "params": { "name": "run_code", "arguments": { "code": "print(1)" } }
        })],
    )
    .await;

    assert_eq!(replies[0]["result"]["isError"], true);
    let text = replies[0]["result"]["content"][0]["text"].as_str().unwrap();
    assert!(text.contains("language"));
}
