//! Runner error types.

use samtest_core::CoreError;
use samtest_platform::PlatformError;

/// Result type alias for runner operations.
pub type Result<T> = std::result::Result<T, RunnerError>;

/// Errors that end a run, or would if not caught per test.
#[derive(Debug, thiserror::Error)]
pub enum RunnerError {
    /// Template, configuration or suite problem before any test runs.
    #[error(transparent)]
    Core(#[from] CoreError),

    /// The emulator could not be started or stopped.
    #[error(transparent)]
    Platform(#[from] PlatformError),

    /// Invalid command-line usage.
    #[error("{0}")]
    Usage(String),

    /// A setup action failed.
    #[error("setup failed: {0}")]
    Setup(String),

    /// An invocation failed.
    #[error(transparent)]
    Invoke(#[from] InvokeError),
}

impl RunnerError {
    /// Creates a usage error.
    #[must_use]
    pub fn usage(msg: impl Into<String>) -> Self {
        Self::Usage(msg.into())
    }

    /// Creates a setup error.
    #[must_use]
    pub fn setup(msg: impl Into<String>) -> Self {
        Self::Setup(msg.into())
    }

    /// Returns true if the error stops the whole run rather than one test.
    #[must_use]
    pub const fn is_fatal(&self) -> bool {
        matches!(self, Self::Core(_) | Self::Platform(_) | Self::Usage(_))
    }
}

/// Why one invocation did not produce a usable response.
#[derive(Debug, thiserror::Error)]
pub enum InvokeError {
    /// The emulator crashed instead of running the function.
    #[error("{0}")]
    Transport(String),

    /// The output was not a response envelope.
    #[error("malformed response: {raw}")]
    Malformed {
        /// Output as received.
        raw: String,
        /// Why it was rejected.
        reason: String,
    },

    /// The handler raised.
    #[error("{error_type}: {error_message}")]
    Handler {
        /// Error class reported by the runtime.
        error_type: String,
        /// Error message reported by the runtime, possibly empty.
        error_message: String,
    },

    /// The HTTP invocation endpoint failed.
    #[error("invocation request failed: {0}")]
    Http(String),

    /// The emulator command could not be run.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl InvokeError {
    /// Creates a transport error.
    #[must_use]
    pub fn transport(msg: impl Into<String>) -> Self {
        Self::Transport(msg.into())
    }

    /// Creates a malformed-response error.
    #[must_use]
    pub fn malformed(raw: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::Malformed {
            raw: raw.into(),
            reason: reason.into(),
        }
    }

    /// Creates an HTTP error.
    #[must_use]
    pub fn http(msg: impl Into<String>) -> Self {
        Self::Http(msg.into())
    }
}

impl From<reqwest::Error> for InvokeError {
    fn from(err: reqwest::Error) -> Self {
        Self::Http(err.to_string())
    }
}
