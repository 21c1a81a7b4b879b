//! Invocation client.
//!
//! Two transports deliver one request to one function and hand back the
//! decoded response:
//!
//! - [`HttpInvoker`] posts to the invocation endpoint of a long-lived
//!   emulator (the one the supervisor keeps running)
//! - [`CommandInvoker`] runs a one-shot emulator command with the event
//!   written to a scratch file
//!
//! Both decode the emulator's output with [`decode_response`]. Any failure
//! comes back as an [`InvokeError`] for the runner to record against the
//! current test.

use std::path::PathBuf;
use std::process::Stdio;
use std::time::Duration;

use async_trait::async_trait;
use samtest_core::{EmulatorConfig, EnvOverrides, EnvVars, FunctionDescriptor, RequestEnvelope, ResponseEnvelope};
use samtest_platform::ScratchFile;
use serde_json::Value;
use tokio::process::Command;

use crate::error::InvokeError;

/// Prefix of a Python interpreter crash dump.
const TRACEBACK_PREFIX: &str = "Traceback ";

/// Invocation API path template of the local emulator.
const INVOKE_PATH: &str = "2015-03-31/functions";

/// Delivers one request to one function.
#[async_trait]
pub trait Invoker: Send + Sync {
    /// Invokes `function` with `request`.
    ///
    /// `env` is the test's environment; transports that restart the emulator
    /// to apply it may ignore it.
    async fn invoke(
        &self,
        function: &FunctionDescriptor,
        request: &RequestEnvelope,
        env: Option<&EnvVars>,
    ) -> Result<ResponseEnvelope, InvokeError>;
}

/// Decodes emulator output captured from a one-shot invocation.
///
/// Anything on stderr counts as a crash when stdout is empty or stderr opens
/// with an interpreter traceback.
///
/// # Errors
/// Returns [`InvokeError::Transport`] for crash-shaped output, otherwise
/// whatever [`decode_response`] reports.
pub fn decode_output(stdout: &str, stderr: &str) -> Result<ResponseEnvelope, InvokeError> {
    if !stderr.is_empty() && (stdout.trim().is_empty() || stderr.starts_with(TRACEBACK_PREFIX)) {
        return Err(InvokeError::transport(stderr.trim_end()));
    }
    decode_response(stdout)
}

/// Decodes a raw response envelope.
///
/// A string `body` is JSON-decoded when it parses and kept as a string when
/// it does not.
///
/// # Errors
/// Returns [`InvokeError::Handler`] for an `errorType` envelope and
/// [`InvokeError::Malformed`] for anything without an integer `statusCode`.
pub fn decode_response(raw: &str) -> Result<ResponseEnvelope, InvokeError> {
    let value: Value =
        serde_json::from_str(raw).map_err(|e| InvokeError::malformed(raw, e.to_string()))?;

    let Value::Object(mut envelope) = value else {
        return Err(InvokeError::malformed(raw, "response is not an object"));
    };

    if let Some(error_type) = envelope.get("errorType").filter(|v| !is_falsy(v)) {
        let error_message = envelope
            .get("errorMessage")
            .map(|m| match m {
                Value::String(s) => s.clone(),
                Value::Null => String::new(),
                other => other.to_string(),
            })
            .unwrap_or_default();
        return Err(InvokeError::Handler {
            error_type: value_text(error_type),
            error_message,
        });
    }

    let status_code = envelope
        .get("statusCode")
        .and_then(Value::as_u64)
        .and_then(|s| u16::try_from(s).ok())
        .ok_or_else(|| InvokeError::malformed(raw, "missing integer statusCode"))?;

    let body = match envelope.shift_remove("body") {
        Some(Value::String(text)) => serde_json::from_str(&text).unwrap_or(Value::String(text)),
        Some(other) => other,
        None => Value::Null,
    };

    Ok(ResponseEnvelope::new(status_code, body, raw))
}

fn is_falsy(value: &Value) -> bool {
    match value {
        Value::Null | Value::Bool(false) => true,
        Value::String(s) => s.is_empty(),
        _ => false,
    }
}

fn value_text(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

/// Invoker that calls the long-lived emulator's local invocation endpoint.
#[derive(Debug, Clone)]
pub struct HttpInvoker {
    client: reqwest::Client,
    endpoint: String,
}

impl HttpInvoker {
    /// Creates an invoker for `endpoint` (`http://host:port`).
    ///
    /// # Errors
    /// Returns an error if the HTTP client cannot be built.
    pub fn new(endpoint: impl Into<String>) -> Result<Self, InvokeError> {
        Self::with_timeout(endpoint, None)
    }

    /// Creates an invoker with an overall per-request timeout.
    ///
    /// # Errors
    /// Returns an error if the HTTP client cannot be built.
    pub fn with_timeout(
        endpoint: impl Into<String>,
        timeout: Option<Duration>,
    ) -> Result<Self, InvokeError> {
        let mut builder = reqwest::Client::builder();
        if let Some(timeout) = timeout {
            builder = builder.timeout(timeout);
        }
        let client = builder
            .build()
            .map_err(|e| InvokeError::http(format!("failed to build HTTP client: {e}")))?;

        Ok(Self {
            client,
            endpoint: endpoint.into().trim_end_matches('/').to_string(),
        })
    }

    /// URL invoking `deployed_id`.
    #[must_use]
    pub fn invocation_url(&self, deployed_id: &str) -> String {
        format!("{}/{INVOKE_PATH}/{deployed_id}/invocations", self.endpoint)
    }
}

#[async_trait]
impl Invoker for HttpInvoker {
    async fn invoke(
        &self,
        function: &FunctionDescriptor,
        request: &RequestEnvelope,
        _env: Option<&EnvVars>,
    ) -> Result<ResponseEnvelope, InvokeError> {
        let url = self.invocation_url(&function.deployed_id);
        tracing::debug!(url = %url, function = %function.logical_name, "invoking over HTTP");

        let response = self.client.post(&url).json(request).send().await?;
        let status = response.status();
        let text = response.text().await?;

        if !status.is_success() {
            // The emulator reports handler failures with a 200, so anything
            // else is the emulator itself refusing the call.
            return Err(InvokeError::http(format!("{status}: {}", text.trim())));
        }

        decode_response(&text)
    }
}

/// Invoker that runs one emulator command per test.
#[derive(Debug, Clone)]
pub struct CommandInvoker {
    config: EmulatorConfig,
    work_dir: PathBuf,
    debug: bool,
}

impl CommandInvoker {
    /// Creates an invoker writing its event and env files under `work_dir`.
    #[must_use]
    pub fn new(config: EmulatorConfig, work_dir: impl Into<PathBuf>) -> Self {
        Self {
            config,
            work_dir: work_dir.into(),
            debug: false,
        }
    }

    /// Opens the debugger port on every invocation.
    #[must_use]
    pub fn with_debug(mut self, debug: bool) -> Self {
        self.debug = debug;
        self
    }

    fn scratch(&self, name: &str, value: &impl serde::Serialize) -> Result<ScratchFile, InvokeError> {
        ScratchFile::write_json(self.work_dir.join(name), value)
            .map_err(|e| InvokeError::transport(format!("cannot write {name}: {e}")))
    }
}

#[async_trait]
impl Invoker for CommandInvoker {
    async fn invoke(
        &self,
        function: &FunctionDescriptor,
        request: &RequestEnvelope,
        env: Option<&EnvVars>,
    ) -> Result<ResponseEnvelope, InvokeError> {
        // Both files are removed when they go out of scope, on every path.
        let event = self.scratch("event.json", request)?;

        let mut args = self.config.invoke_args.clone();
        args.push(self.config.event_flag.clone());
        args.push(event.path().display().to_string());

        let env_file = match env {
            Some(vars) => {
                let overrides: EnvOverrides =
                    std::iter::once((function.deployed_id.clone(), vars.clone())).collect();
                let file = self.scratch("env.json", &overrides)?;
                args.push(self.config.env_vars_flag.clone());
                args.push(file.path().display().to_string());
                Some(file)
            }
            None => None,
        };

        if self.debug {
            args.push(self.config.debug_flag.clone());
            args.push(self.config.debug_port.to_string());
        }

        args.push(function.deployed_id.clone());

        tracing::debug!(program = %self.config.program, args = ?args, "invoking emulator command");
        let output = Command::new(&self.config.program)
            .args(&args)
            .stdin(Stdio::null())
            .output()
            .await?;

        drop(env_file);
        drop(event);

        let stdout = String::from_utf8_lossy(&output.stdout);
        let stderr = String::from_utf8_lossy(&output.stderr);
        tracing::trace!(status = %output.status, stderr = %stderr, "emulator command finished");

        decode_output(&stdout, &stderr)
    }
}
