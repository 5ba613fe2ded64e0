//! HTTP client for the Piston runtimes and execute endpoints.

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use bytes::Bytes;
use hyper::body::to_bytes;
use hyper::header::CONTENT_TYPE;
use hyper::{Body, Request, Uri};
use tokio::time::timeout;
use tracing::debug;

use crate::http_client::HyperTransport;
use crate::model::{ExecuteRequest, ExecuteResult, Runtime, SourceFile};
use crate::traits::{ClientError, ClientResult, Transport};

/// Runtimes endpoint of the public Piston deployment.
pub const DEFAULT_RUNTIMES_URL: &str = "https://emkc.org/api/v2/piston/runtimes";

/// Execute endpoint of the public Piston deployment.
pub const DEFAULT_EXECUTE_URL: &str = "https://emkc.org/api/v2/piston/execute";

const DEFAULT_TIMEOUT: Duration = Duration::from_secs(10);

/// Configuration for [`PistonClient`].
#[derive(Clone, Debug)]
pub struct ClientConfig {
    runtimes_url: Uri,
    execute_url: Uri,
    timeout: Duration,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            runtimes_url: Uri::from_static(DEFAULT_RUNTIMES_URL),
            execute_url: Uri::from_static(DEFAULT_EXECUTE_URL),
            timeout: DEFAULT_TIMEOUT,
        }
    }
}

impl ClientConfig {
    /// Creates a configuration pointing at the public Piston deployment with
    /// a ten second timeout.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Overrides the runtimes endpoint.
    ///
    /// # Errors
    ///
    /// Returns [`ClientError::Configuration`] if the URL is not an absolute
    /// `http` or `https` URL.
    pub fn with_runtimes_url(mut self, url: impl AsRef<str>) -> ClientResult<Self> {
        self.runtimes_url = parse_endpoint(url.as_ref())?;
        Ok(self)
    }

    /// Overrides the execute endpoint.
    ///
    /// # Errors
    ///
    /// Returns [`ClientError::Configuration`] if the URL is not an absolute
    /// `http` or `https` URL.
    pub fn with_execute_url(mut self, url: impl AsRef<str>) -> ClientResult<Self> {
        self.execute_url = parse_endpoint(url.as_ref())?;
        Ok(self)
    }

    /// Sets the timeout applied to each round trip, body included.
    #[must_use]
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Returns the runtimes endpoint.
    #[must_use]
    pub fn runtimes_url(&self) -> &Uri {
        &self.runtimes_url
    }

    /// Returns the execute endpoint.
    #[must_use]
    pub fn execute_url(&self) -> &Uri {
        &self.execute_url
    }

    /// Returns the request timeout.
    #[must_use]
    pub const fn timeout(&self) -> Duration {
        self.timeout
    }
}

/// Client for a Piston deployment.
///
/// Holds only immutable configuration, so a single instance can be shared
/// across tasks. Every call is an independent round trip; nothing is cached.
pub struct PistonClient {
    transport: Arc<dyn Transport>,
    config: ClientConfig,
}

impl fmt::Debug for PistonClient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PistonClient")
            .field("runtimes_url", &self.config.runtimes_url)
            .field("execute_url", &self.config.execute_url)
            .field("timeout", &self.config.timeout)
            .finish_non_exhaustive()
    }
}

impl PistonClient {
    /// Constructs a client backed by [`HyperTransport`].
    #[must_use]
    pub fn new(config: ClientConfig) -> Self {
        Self::with_transport(config, Arc::new(HyperTransport::new()))
    }

    /// Constructs a client over a caller supplied transport.
    #[must_use]
    pub fn with_transport(config: ClientConfig, transport: Arc<dyn Transport>) -> Self {
        Self { transport, config }
    }

    /// Returns the active configuration.
    #[must_use]
    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    /// Lists the runtimes offered by the service, in service order.
    ///
    /// # Errors
    ///
    /// Returns [`ClientError::ServiceUnavailable`] on transport failure,
    /// timeout or a non-success status, and
    /// [`ClientError::MalformedResponse`] if the body is not a runtime list.
    pub async fn runtimes(&self) -> ClientResult<Vec<Runtime>> {
        let request = Request::get(self.config.runtimes_url.clone())
            .body(Body::empty())
            .map_err(|err| {
                ClientError::invalid_argument(format!("failed to build runtimes request: {err}"))
            })?;

        debug!(uri = %self.config.runtimes_url, "listing runtimes");
        let bytes = self.round_trip(request, "runtimes").await?;

        let runtimes: Vec<Runtime> = serde_json::from_slice(&bytes).map_err(|err| {
            ClientError::malformed_response(format!("failed to decode runtimes response: {err}"))
        })?;
        debug!(count = runtimes.len(), "runtimes listed");
        Ok(runtimes)
    }

    /// Submits code for execution.
    ///
    /// The request is validated before anything is sent, and unset optional
    /// fields are left out of the payload so the service applies its own
    /// defaults.
    ///
    /// # Errors
    ///
    /// Returns [`ClientError::InvalidArgument`] if the request carries no
    /// files, [`ClientError::ServiceUnavailable`] on transport failure,
    /// timeout or a non-success status, and
    /// [`ClientError::MalformedResponse`] if the body lacks `language`,
    /// `version` or `run`.
    pub async fn execute(&self, request: ExecuteRequest) -> ClientResult<ExecuteResult> {
        request.validate()?;

        let body = serde_json::to_vec(&request).map_err(|err| {
            ClientError::invalid_argument(format!("failed to encode execute request: {err}"))
        })?;

        let req = Request::post(self.config.execute_url.clone())
            .header(CONTENT_TYPE, "application/json")
            .body(Body::from(body))
            .map_err(|err| {
                ClientError::invalid_argument(format!("failed to build execute request: {err}"))
            })?;

        debug!(
            language = request.language(),
            version = request.version(),
            files = request.files().len(),
            "submitting execute request"
        );
        let bytes = self.round_trip(req, "execute").await?;

        let result: ExecuteResult = serde_json::from_slice(&bytes).map_err(|err| {
            ClientError::malformed_response(format!("failed to decode execute response: {err}"))
        })?;
        debug!(
            language = %result.language,
            version = %result.version,
            code = ?result.run.code,
            "execution finished"
        );
        Ok(result)
    }

    /// Submits a single unnamed source file.
    ///
    /// # Errors
    ///
    /// See [`PistonClient::execute`].
    pub async fn execute_code(
        &self,
        language: impl Into<String>,
        version: impl Into<String>,
        code: impl Into<String>,
    ) -> ClientResult<ExecuteResult> {
        let request = ExecuteRequest::new(language, version, vec![SourceFile::new(code)])?;
        self.execute(request).await
    }

    async fn round_trip(
        &self,
        request: Request<Body>,
        endpoint: &'static str,
    ) -> ClientResult<Bytes> {
        let exchange = async {
            let response = self.transport.send(request).await?;

            let status = response.status();
            if !status.is_success() {
                return Err(ClientError::service_unavailable(format!(
                    "{endpoint} endpoint returned {status}"
                )));
            }

            to_bytes(response.into_body()).await.map_err(|err| {
                ClientError::service_unavailable(format!("failed to read {endpoint} response: {err}"))
            })
        };

        timeout(self.config.timeout, exchange).await.map_err(|_| {
            ClientError::service_unavailable(format!(
                "{endpoint} request timed out after {:?}",
                self.config.timeout
            ))
        })?
    }
}

fn parse_endpoint(input: &str) -> ClientResult<Uri> {
    let url = input.trim();
    if !(url.starts_with("http://") || url.starts_with("https://")) {
        return Err(ClientError::configuration(
            "endpoint URL must start with http:// or https://",
        ));
    }
    url.parse::<Uri>()
        .map_err(|err| ClientError::configuration(format!("invalid endpoint URL `{url}`: {err}")))
}
