//! Wire types exchanged with the Piston API.

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Number;

use crate::traits::{ClientError, ClientResult};

/// A language and version combination offered by the execution service.
#[derive(Clone, Debug, Deserialize, Serialize, PartialEq, Eq)]
pub struct Runtime {
    #[serde(default)]
    language: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    version: Option<String>,
    #[serde(default)]
    aliases: Vec<String>,
}

impl Runtime {
    /// Creates a runtime entry.
    #[must_use]
    pub fn new(
        language: impl Into<String>,
        version: impl Into<String>,
        aliases: Vec<String>,
    ) -> Self {
        Self {
            language: language.into(),
            version: Some(version.into()),
            aliases,
        }
    }

    /// Returns the canonical language name, empty if the service omitted it.
    #[must_use]
    pub fn language(&self) -> &str {
        &self.language
    }

    /// Returns the version, if the service reported one.
    #[must_use]
    pub fn version(&self) -> Option<&str> {
        self.version.as_deref()
    }

    /// Returns the alternative names this runtime answers to.
    #[must_use]
    pub fn aliases(&self) -> &[String] {
        &self.aliases
    }
}

/// A unit of source code submitted for execution.
///
/// Decoding a file without `content` fails with
/// [`ClientError::InvalidArgument`].
#[derive(Clone, Debug, Deserialize, Serialize, PartialEq, Eq)]
#[serde(try_from = "RawSourceFile")]
pub struct SourceFile {
    #[serde(skip_serializing_if = "Option::is_none")]
    name: Option<String>,
    content: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    encoding: Option<String>,
}

impl SourceFile {
    /// Creates an unnamed file with the supplied content.
    #[must_use]
    pub fn new(content: impl Into<String>) -> Self {
        Self {
            name: None,
            content: content.into(),
            encoding: None,
        }
    }

    /// Sets the file name.
    #[must_use]
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    /// Sets the content encoding (`utf8`, `base64` or `hex`).
    #[must_use]
    pub fn with_encoding(mut self, encoding: impl Into<String>) -> Self {
        self.encoding = Some(encoding.into());
        self
    }

    /// Returns the file name, if any.
    #[must_use]
    pub fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    /// Returns the file content.
    #[must_use]
    pub fn content(&self) -> &str {
        &self.content
    }

    /// Returns the content encoding, if any.
    #[must_use]
    pub fn encoding(&self) -> Option<&str> {
        self.encoding.as_deref()
    }
}

#[derive(Deserialize)]
struct RawSourceFile {
    #[serde(default)]
    name: Option<String>,
    #[serde(default)]
    content: Option<String>,
    #[serde(default)]
    encoding: Option<String>,
}

impl TryFrom<RawSourceFile> for SourceFile {
    type Error = ClientError;

    fn try_from(raw: RawSourceFile) -> ClientResult<Self> {
        let content = raw
            .content
            .ok_or_else(|| ClientError::invalid_argument("missing content"))?;
        Ok(Self {
            name: raw.name,
            content,
            encoding: raw.encoding,
        })
    }
}

/// Optional per-stage resource limits. Unset limits defer to the service.
///
/// Timeouts and CPU times are in milliseconds, memory limits in bytes.
#[derive(Clone, Copy, Debug, Default, Deserialize, Serialize, PartialEq, Eq)]
pub struct ResourceLimits {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    compile_timeout: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    run_timeout: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    compile_cpu_time: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    run_cpu_time: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    compile_memory_limit: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    run_memory_limit: Option<i64>,
}

impl ResourceLimits {
    /// Maximum wall time for the compile stage.
    #[must_use]
    pub const fn with_compile_timeout(mut self, millis: i64) -> Self {
        self.compile_timeout = Some(millis);
        self
    }

    /// Maximum wall time for the run stage.
    #[must_use]
    pub const fn with_run_timeout(mut self, millis: i64) -> Self {
        self.run_timeout = Some(millis);
        self
    }

    /// Maximum CPU time for the compile stage.
    #[must_use]
    pub const fn with_compile_cpu_time(mut self, millis: i64) -> Self {
        self.compile_cpu_time = Some(millis);
        self
    }

    /// Maximum CPU time for the run stage.
    #[must_use]
    pub const fn with_run_cpu_time(mut self, millis: i64) -> Self {
        self.run_cpu_time = Some(millis);
        self
    }

    /// Maximum memory for the compile stage.
    #[must_use]
    pub const fn with_compile_memory_limit(mut self, bytes: i64) -> Self {
        self.compile_memory_limit = Some(bytes);
        self
    }

    /// Maximum memory for the run stage.
    #[must_use]
    pub const fn with_run_memory_limit(mut self, bytes: i64) -> Self {
        self.run_memory_limit = Some(bytes);
        self
    }

    /// Returns the compile wall-time limit.
    #[must_use]
    pub const fn compile_timeout(&self) -> Option<i64> {
        self.compile_timeout
    }

    /// Returns the run wall-time limit.
    #[must_use]
    pub const fn run_timeout(&self) -> Option<i64> {
        self.run_timeout
    }

    /// Returns the compile CPU-time limit.
    #[must_use]
    pub const fn compile_cpu_time(&self) -> Option<i64> {
        self.compile_cpu_time
    }

    /// Returns the run CPU-time limit.
    #[must_use]
    pub const fn run_cpu_time(&self) -> Option<i64> {
        self.run_cpu_time
    }

    /// Returns the compile memory limit.
    #[must_use]
    pub const fn compile_memory_limit(&self) -> Option<i64> {
        self.compile_memory_limit
    }

    /// Returns the run memory limit.
    #[must_use]
    pub const fn run_memory_limit(&self) -> Option<i64> {
        self.run_memory_limit
    }
}

/// Validated payload for the execute endpoint.
#[derive(Clone, Debug, Serialize, PartialEq, Eq)]
pub struct ExecuteRequest {
    language: String,
    version: String,
    files: Vec<SourceFile>,
    #[serde(skip_serializing_if = "Option::is_none")]
    stdin: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    args: Option<Vec<String>>,
    #[serde(flatten)]
    limits: ResourceLimits,
}

impl ExecuteRequest {
    /// Creates a request for the supplied runtime. The first file is the
    /// entry point.
    ///
    /// # Errors
    ///
    /// Returns [`ClientError::InvalidArgument`] if `files` is empty.
    pub fn new(
        language: impl Into<String>,
        version: impl Into<String>,
        files: Vec<SourceFile>,
    ) -> ClientResult<Self> {
        let request = Self {
            language: language.into(),
            version: version.into(),
            files,
            stdin: None,
            args: None,
            limits: ResourceLimits::default(),
        };
        request.validate()?;
        Ok(request)
    }

    /// Sets the data piped to the program's stdin.
    #[must_use]
    pub fn with_stdin(mut self, stdin: impl Into<String>) -> Self {
        self.stdin = Some(stdin.into());
        self
    }

    /// Sets the command-line arguments passed to the program.
    #[must_use]
    pub fn with_args(mut self, args: Vec<String>) -> Self {
        self.args = Some(args);
        self
    }

    /// Sets the resource limits applied by the service.
    #[must_use]
    pub fn with_limits(mut self, limits: ResourceLimits) -> Self {
        self.limits = limits;
        self
    }

    pub(crate) fn validate(&self) -> ClientResult<()> {
        if self.files.is_empty() {
            return Err(ClientError::invalid_argument("no files provided"));
        }
        Ok(())
    }

    /// Returns the requested language.
    #[must_use]
    pub fn language(&self) -> &str {
        &self.language
    }

    /// Returns the requested version.
    #[must_use]
    pub fn version(&self) -> &str {
        &self.version
    }

    /// Returns the submitted files.
    #[must_use]
    pub fn files(&self) -> &[SourceFile] {
        &self.files
    }

    /// Returns the configured stdin.
    #[must_use]
    pub fn stdin(&self) -> Option<&str> {
        self.stdin.as_deref()
    }

    /// Returns the configured arguments.
    #[must_use]
    pub fn args(&self) -> Option<&[String]> {
        self.args.as_deref()
    }

    /// Returns the configured resource limits.
    #[must_use]
    pub const fn limits(&self) -> &ResourceLimits {
        &self.limits
    }
}

/// Output captured for one execution stage.
#[derive(Clone, Debug, Default, Deserialize, Serialize, PartialEq, Eq)]
pub struct StageResult {
    /// Captured standard output.
    #[serde(default)]
    pub stdout: String,
    /// Captured standard error.
    #[serde(default)]
    pub stderr: String,
    /// Interleaved stdout and stderr, in the order the service observed them.
    #[serde(default)]
    pub output: String,
    /// Exit code, absent when the process was killed by a signal.
    #[serde(default)]
    pub code: Option<i32>,
    /// Signal that terminated the process.
    #[serde(default)]
    pub signal: Option<String>,
    /// Diagnostic message from the sandbox.
    #[serde(default)]
    pub message: Option<String>,
    /// Short status code from the sandbox (e.g. `TO` for timeout).
    #[serde(default)]
    pub status: Option<String>,
    /// CPU time used, in milliseconds.
    #[serde(default, deserialize_with = "lenient_metric")]
    pub cpu_time: Option<u64>,
    /// Wall time used, in milliseconds.
    #[serde(default, deserialize_with = "lenient_metric")]
    pub wall_time: Option<u64>,
    /// Peak memory used, in bytes.
    #[serde(default, deserialize_with = "lenient_metric")]
    pub memory: Option<u64>,
}

/// Accepts integer or fractional metrics; the service reports times as
/// `seconds * 1000`, which is not always a whole number. Negative values
/// decode as absent.
#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
fn lenient_metric<'de, D>(deserializer: D) -> Result<Option<u64>, D::Error>
where
    D: Deserializer<'de>,
{
    let number = Option::<Number>::deserialize(deserializer)?;
    Ok(number.and_then(|number| {
        number.as_u64().or_else(|| {
            number
                .as_f64()
                .filter(|value| value.is_finite() && *value >= 0.0)
                .map(|value| value.round() as u64)
        })
    }))
}

/// Result of an execute request.
#[derive(Clone, Debug, Deserialize, Serialize, PartialEq, Eq)]
pub struct ExecuteResult {
    /// Language the service ran.
    pub language: String,
    /// Version the service ran.
    pub version: String,
    /// Compile stage output, absent for interpreted languages.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub compile: Option<StageResult>,
    /// Run stage output.
    pub run: StageResult,
}
