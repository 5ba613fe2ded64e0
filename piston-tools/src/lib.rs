//! Tool registration and the Piston-backed `run_code` tool.
//!
//! [`registry`] stores named tools with their input schema, and
//! [`run_code`] composes the Piston client and runtime resolver into a
//! single call that always answers with a string.

#![warn(missing_docs, clippy::pedantic)]

pub mod registry;
pub mod run_code;

pub use registry::{Tool, ToolError, ToolHandle, ToolMetadata, ToolRegistry, ToolResult};
pub use run_code::{
    EXECUTE_FAILED, INVALID_LANGUAGE, RUN_CODE_TOOL, RUNTIMES_FAILED, RunCodeTool, run_code,
};
