//! Platform error types.

/// Result type alias for platform operations.
pub type Result<T> = std::result::Result<T, PlatformError>;

/// Errors from process supervision and process-table access.
#[derive(Debug, thiserror::Error)]
pub enum PlatformError {
    /// The emulator process could not be created.
    #[error("failed to spawn emulator: {0}")]
    Spawn(String),

    /// The emulator exited before it became ready.
    #[error("emulator exited during startup: {0}")]
    EarlyExit(String),

    /// Signal delivery failed.
    #[error("failed to send signal: {0}")]
    Signal(String),

    /// Process table could not be read.
    #[error("process table error: {0}")]
    ProcessTable(String),

    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization error.
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl PlatformError {
    /// Creates a spawn error.
    #[must_use]
    pub fn spawn(msg: impl Into<String>) -> Self {
        Self::Spawn(msg.into())
    }

    /// Creates a signal error.
    #[must_use]
    pub fn signal(msg: impl Into<String>) -> Self {
        Self::Signal(msg.into())
    }

    /// Creates a process table error.
    #[must_use]
    pub fn process_table(msg: impl Into<String>) -> Self {
        Self::ProcessTable(msg.into())
    }

    /// Returns true if the emulator never reached the running state.
    #[must_use]
    pub const fn is_start_failure(&self) -> bool {
        matches!(self, Self::Spawn(_) | Self::EarlyExit(_))
    }
}
