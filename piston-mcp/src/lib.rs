//! stdio tool server for Piston code execution.
//!
//! The binary wires a [`piston_client::PistonClient`] into the `run_code`
//! tool and serves it with [`McpServer`] over stdin and stdout.

#![warn(missing_docs, clippy::pedantic)]

pub mod rpc;
pub mod server;

pub use rpc::{RpcError, RpcRequest, RpcResponse};
pub use server::{DEFAULT_PROTOCOL_VERSION, McpServer};
