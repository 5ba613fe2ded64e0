use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use hyper::{Body, Request, Response, StatusCode};
use piston_client::{ClientConfig, ClientError, ClientResult, PistonClient, Transport};
use piston_tools::{
    EXECUTE_FAILED, INVALID_LANGUAGE, RUN_CODE_TOOL, RUNTIMES_FAILED, RunCodeTool, ToolError,
    ToolRegistry, run_code,
};
use serde_json::{Value, json};

/// Replays canned replies and records the path of every request it sees.
struct ScriptedTransport {
    replies: Mutex<VecDeque<ClientResult<(StatusCode, Value)>>>,
    paths: Mutex<Vec<String>>,
}

impl ScriptedTransport {
    fn new(replies: Vec<ClientResult<(StatusCode, Value)>>) -> Arc<Self> {
        Arc::new(Self {
            replies: Mutex::new(replies.into()),
            paths: Mutex::default(),
        })
    }

    fn paths(&self) -> Vec<String> {
        self.paths.lock().unwrap().clone()
    }
}

#[async_trait]
impl Transport for ScriptedTransport {
    async fn send(&self, request: Request<Body>) -> ClientResult<Response<Body>> {
        self.paths
            .lock()
            .unwrap()
            .push(request.uri().path().to_owned());
        let reply = self.replies.lock().unwrap().pop_front().expect("unexpected call");
        let (status, body) = reply?;
        Ok(Response::builder()
            .status(status)
            .body(Body::from(body.to_string()))
            .unwrap())
    }
}

fn client(transport: &Arc<ScriptedTransport>) -> PistonClient {
    let config = ClientConfig::new()
        .with_runtimes_url("http://piston.test/runtimes")
        .unwrap()
        .with_execute_url("http://piston.test/execute")
        .unwrap();
    PistonClient::with_transport(config, transport.clone())
}

fn catalog() -> ClientResult<(StatusCode, Value)> {
    Ok((
        StatusCode::OK,
        json!([{ "language": "python", "version": "3.10.0", "aliases": ["py", "python3"] }]),
    ))
}

fn printed_42() -> ClientResult<(StatusCode, Value)> {
    Ok((
        StatusCode::OK,
        json!({
            "language": "python",
            "version": "3.10.0",
            "run": {
                "stdout": "42\n",
                "stderr": "",
                "output": "42\n",
                "code": 0,
                "signal": null,
                "message": null,
                "status": null,
                "cpu_time": 9,
                "wall_time": 28,
                "memory": 6_000_000
            }
        }),
    ))
}

#[tokio::test]
async fn returns_run_output() {
    let transport = ScriptedTransport::new(vec![catalog(), printed_42()]);
    let output = run_code(&client(&transport), "python", "print(42)").await;

    assert_eq!(output, "42\n");
    assert_eq!(transport.paths(), ["/runtimes", "/execute"]);
}

#[tokio::test]
async fn resolves_aliases_case_insensitively() {
    let transport = ScriptedTransport::new(vec![catalog(), printed_42()]);
    let output = run_code(&client(&transport), "PY", "print(42)").await;
    assert_eq!(output, "42\n");
}

#[tokio::test]
async fn runtime_listing_failure_is_collapsed() {
    let transport = ScriptedTransport::new(vec![Err(ClientError::service_unavailable(
        "connection reset by peer",
    ))]);
    let output = run_code(&client(&transport), "python", "print(42)").await;

    assert_eq!(output, RUNTIMES_FAILED);
    assert_eq!(transport.paths(), ["/runtimes"]);
}

#[tokio::test]
async fn unknown_language_skips_execution() {
    let transport = ScriptedTransport::new(vec![catalog()]);
    let output = run_code(&client(&transport), "nosuchlang", "print(42)").await;

    assert_eq!(output, INVALID_LANGUAGE);
    assert_eq!(transport.paths(), ["/runtimes"]);
}

#[tokio::test]
async fn execute_failure_is_collapsed() {
    let transport = ScriptedTransport::new(vec![
        catalog(),
        Ok((
            StatusCode::INTERNAL_SERVER_ERROR,
            json!({ "message": "boom" }),
        )),
    ]);
    let output = run_code(&client(&transport), "python", "print(42)").await;
    assert_eq!(output, EXECUTE_FAILED);
}

#[tokio::test]
async fn malformed_execute_response_is_collapsed() {
    let transport = ScriptedTransport::new(vec![
        catalog(),
        Ok((StatusCode::OK, json!({ "language": "python" }))),
    ]);
    let output = run_code(&client(&transport), "python", "print(42)").await;
    assert_eq!(output, EXECUTE_FAILED);
}

#[tokio::test]
async fn registered_tool_answers_with_string() {
    let transport = ScriptedTransport::new(vec![catalog(), printed_42()]);
    let registry = ToolRegistry::new();
    RunCodeTool::new(Arc::new(client(&transport)))
        .register(&registry)
        .unwrap();

    let output = registry
        .invoke(
            RUN_CODE_TOOL,
            json!({ "language": "python", "code": "print(42)" }),
        )
        .await
        .unwrap();
    assert_eq!(output, Value::String("42\n".to_owned()));

    let metadata = registry.get(RUN_CODE_TOOL).unwrap().metadata().clone();
    assert_eq!(metadata.input_schema()["required"], json!(["language", "code"]));
}

#[tokio::test]
async fn tool_rejects_missing_arguments() {
    let transport = ScriptedTransport::new(Vec::new());
    let registry = ToolRegistry::new();
    RunCodeTool::new(Arc::new(client(&transport)))
        .register(&registry)
        .unwrap();

    let err = registry
        .invoke(RUN_CODE_TOOL, json!({ "language": "python" }))
        .await
        .unwrap_err();

    assert!(matches!(err, ToolError::InvalidInput { .. }));
    assert!(transport.paths().is_empty());
}
