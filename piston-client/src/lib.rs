//! Client for the Piston remote code execution service.
//!
//! [`PistonClient`] discovers the runtimes a deployment offers and submits
//! execution requests, while [`resolver::resolve`] maps a user supplied
//! language name or alias onto a concrete runtime version.

#![warn(missing_docs, clippy::pedantic)]

pub mod client;
pub mod model;
pub mod resolver;
pub mod traits;

mod http_client;

pub use client::{ClientConfig, DEFAULT_EXECUTE_URL, DEFAULT_RUNTIMES_URL, PistonClient};
pub use http_client::HyperTransport;
pub use model::{
    ExecuteRequest, ExecuteResult, ResourceLimits, Runtime, SourceFile, StageResult,
};
pub use resolver::{ResolvedRuntime, resolve};
pub use traits::{ClientError, ClientResult, Transport};
