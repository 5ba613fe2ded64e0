//! The `run_code` tool: resolve a language against the live catalog and run
//! a snippet on the Piston service.

use std::fmt;
use std::sync::Arc;

use async_trait::async_trait;
use piston_client::{PistonClient, resolve};
use serde::Deserialize;
use serde_json::{Value, json};
use tracing::{debug, warn};

use crate::registry::{Tool, ToolError, ToolMetadata, ToolRegistry, ToolResult};

/// Name under which the tool is registered.
pub const RUN_CODE_TOOL: &str = "run_code";

/// Returned when the runtime catalog could not be fetched.
pub const RUNTIMES_FAILED: &str = "ERROR: failed to get runtimes.";

/// Returned when no runtime matches the requested language.
pub const INVALID_LANGUAGE: &str = "ERROR: invalid language.";

/// Returned when the execute request failed.
pub const EXECUTE_FAILED: &str = "ERROR: failed to execute code.";

/// Runs `code` as `language` and returns the interleaved program output.
///
/// Never fails: client errors and unknown languages are reduced to one of
/// [`RUNTIMES_FAILED`], [`INVALID_LANGUAGE`] or [`EXECUTE_FAILED`].
pub async fn run_code(client: &PistonClient, language: &str, code: &str) -> String {
    let catalog = match client.runtimes().await {
        Ok(catalog) => catalog,
        Err(err) => {
            warn!(%err, "failed to list runtimes");
            return RUNTIMES_FAILED.to_owned();
        }
    };

    let Some(runtime) = resolve(language, &catalog) else {
        debug!(language, runtimes = catalog.len(), "no runtime matches language");
        return INVALID_LANGUAGE.to_owned();
    };

    match client
        .execute_code(runtime.requested(), runtime.version(), code)
        .await
    {
        Ok(result) => result.run.output,
        Err(err) => {
            warn!(
                %err,
                language = runtime.requested(),
                version = runtime.version(),
                "code execution failed"
            );
            EXECUTE_FAILED.to_owned()
        }
    }
}

#[derive(Debug, Deserialize)]
struct RunCodeInput {
    language: String,
    code: String,
}

/// [`Tool`] wrapper around [`run_code`].
#[derive(Clone)]
pub struct RunCodeTool {
    client: Arc<PistonClient>,
}

impl fmt::Debug for RunCodeTool {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RunCodeTool")
            .field("client", &self.client)
            .finish()
    }
}

impl RunCodeTool {
    /// Creates the tool over a shared client.
    #[must_use]
    pub fn new(client: Arc<PistonClient>) -> Self {
        Self { client }
    }

    /// Metadata advertised for the tool.
    ///
    /// # Errors
    ///
    /// Returns [`ToolError::InvalidMetadata`] if the metadata fails
    /// validation.
    pub fn metadata() -> ToolResult<ToolMetadata> {
        Ok(ToolMetadata::new(RUN_CODE_TOOL)?
            .with_description(
                "Runs given code in the given language in the Piston remote code execution \
                 engine and returns the output of the run.",
            )
            .with_input_schema(json!({
                "type": "object",
                "properties": {
                    "language": {
                        "type": "string",
                        "description": "Programming language to run code in."
                    },
                    "code": {
                        "type": "string",
                        "description": "Code to run."
                    }
                },
                "required": ["language", "code"]
            })))
    }

    /// Registers the tool with `registry`.
    ///
    /// # Errors
    ///
    /// Returns [`ToolError::DuplicateTool`] if `run_code` is already
    /// registered.
    pub fn register(self, registry: &ToolRegistry) -> ToolResult<()> {
        registry.register_tool(Self::metadata()?, self)
    }
}

#[async_trait]
impl Tool for RunCodeTool {
    async fn invoke(&self, input: Value) -> ToolResult<Value> {
        let input: RunCodeInput = serde_json::from_value(input)
            .map_err(|err| ToolError::invalid_input(err.to_string()))?;

        let output = run_code(&self.client, &input.language, &input.code).await;
        Ok(Value::String(output))
    }
}
