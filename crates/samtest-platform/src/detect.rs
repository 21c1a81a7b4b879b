//! Process-table detection.
//!
//! Falls back to [`ProcessTable::Unsupported`] whenever `/proc` is not
//! observably present, which keeps teardown to the direct child only.

use std::path::Path;

/// Process-table introspection available on this host.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ProcessTable {
    /// Linux `/proc` filesystem.
    Procfs,
    /// No introspection; only the direct child can be reaped.
    Unsupported,
}

impl ProcessTable {
    /// Returns the name of the process table source.
    #[must_use]
    pub const fn name(&self) -> &'static str {
        match self {
            Self::Procfs => "procfs",
            Self::Unsupported => "unsupported",
        }
    }

    /// Returns true if orphaned workers can be found and reaped.
    #[must_use]
    pub const fn can_adopt(&self) -> bool {
        matches!(self, Self::Procfs)
    }
}

impl std::fmt::Display for ProcessTable {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.name())
    }
}

/// Detects the process table available on this host.
#[must_use]
pub fn detect_process_table() -> ProcessTable {
    if cfg!(target_os = "linux") && Path::new("/proc/self/stat").exists() {
        ProcessTable::Procfs
    } else {
        ProcessTable::Unsupported
    }
}
