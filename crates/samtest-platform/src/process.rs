//! Process-table access for finding interpreter processes the emulator
//! spawns but does not clean up.
//!
//! On Linux the table is read from `/proc`. Elsewhere the registry degrades
//! to [`NullRegistry`]: nothing is ever adopted, and teardown covers only the
//! directly spawned emulator process.

use std::collections::BTreeSet;

use crate::error::Result;
#[cfg(target_os = "linux")]
use crate::error::PlatformError;

/// Snapshot-and-terminate access to live processes of one kind.
pub trait ProcessRegistry: Send + Sync {
    /// Returns the ids of currently live worker processes.
    ///
    /// # Errors
    /// Returns an error if the process table cannot be read.
    fn snapshot(&self) -> Result<BTreeSet<u32>>;

    /// Forcibly terminates a process. A process that is already gone is not an error.
    ///
    /// # Errors
    /// Returns an error if the signal cannot be delivered.
    fn terminate(&self, pid: u32) -> Result<()>;

    /// Picks the most recently started process among `candidates`.
    fn newest(&self, candidates: &BTreeSet<u32>) -> Option<u32> {
        candidates.last().copied()
    }
}

/// Registry for platforms without process-table introspection.
#[derive(Debug, Default, Clone, Copy)]
pub struct NullRegistry;

impl ProcessRegistry for NullRegistry {
    fn snapshot(&self) -> Result<BTreeSet<u32>> {
        Ok(BTreeSet::new())
    }

    fn terminate(&self, _pid: u32) -> Result<()> {
        Ok(())
    }
}

/// `/proc`-backed registry matching processes by command-name prefix.
#[cfg(target_os = "linux")]
#[derive(Debug, Clone)]
pub struct ProcfsRegistry {
    name_prefix: String,
    root: std::path::PathBuf,
}

#[cfg(target_os = "linux")]
impl ProcfsRegistry {
    /// Creates a registry for processes whose `comm` starts with `name_prefix`.
    #[must_use]
    pub fn new(name_prefix: impl Into<String>) -> Self {
        Self {
            name_prefix: name_prefix.into(),
            root: std::path::PathBuf::from("/proc"),
        }
    }

    /// Reads the start time (clock ticks since boot) of a process.
    fn start_time(&self, pid: u32) -> Option<u64> {
        let content = std::fs::read_to_string(self.root.join(pid.to_string()).join("stat")).ok()?;
        parse_start_time(&content)
    }
}

#[cfg(target_os = "linux")]
impl ProcessRegistry for ProcfsRegistry {
    fn snapshot(&self) -> Result<BTreeSet<u32>> {
        let entries = std::fs::read_dir(&self.root)
            .map_err(|e| PlatformError::process_table(format!("cannot read {}: {e}", self.root.display())))?;

        let mut pids = BTreeSet::new();
        for entry in entries.flatten() {
            let Some(pid) = entry.file_name().to_str().and_then(|s| s.parse::<u32>().ok()) else {
                continue;
            };
            // Processes can vanish between listing and reading; skip them.
            let Ok(comm) = std::fs::read_to_string(entry.path().join("comm")) else {
                continue;
            };
            if comm.trim_end().starts_with(&self.name_prefix) {
                pids.insert(pid);
            }
        }
        Ok(pids)
    }

    fn terminate(&self, pid: u32) -> Result<()> {
        use nix::errno::Errno;
        use nix::sys::signal::{self, Signal};
        use nix::unistd::Pid;

        match signal::kill(Pid::from_raw(pid as i32), Signal::SIGKILL) {
            Ok(()) | Err(Errno::ESRCH) => Ok(()),
            Err(e) => Err(PlatformError::signal(format!("kill {pid} failed: {e}"))),
        }
    }

    fn newest(&self, candidates: &BTreeSet<u32>) -> Option<u32> {
        candidates
            .iter()
            .copied()
            .max_by_key(|&pid| (self.start_time(pid).unwrap_or(0), pid))
    }
}

/// Parses the `starttime` field of `/proc/{pid}/stat`.
///
/// Format: pid (comm) state ppid pgrp session tty_nr tpgid flags minflt cminflt majflt cmajflt
///         utime stime cutime cstime priority nice num_threads itrealvalue starttime ...
#[cfg(any(target_os = "linux", test))]
fn parse_start_time(content: &str) -> Option<u64> {
    // comm may itself contain spaces or parentheses
    let comm_end = content.rfind(')')?;
    let fields: Vec<&str> = content.get(comm_end + 1..)?.split_whitespace().collect();
    fields.get(19)?.parse().ok()
}

/// Returns the best registry available on this platform.
#[must_use]
pub fn default_registry(worker_process: &str) -> Box<dyn ProcessRegistry> {
    match crate::detect::detect_process_table() {
        #[cfg(target_os = "linux")]
        crate::detect::ProcessTable::Procfs => Box::new(ProcfsRegistry::new(worker_process)),
        _ => {
            tracing::info!(
                worker = worker_process,
                "no process table introspection; orphaned workers will not be reaped"
            );
            Box::new(NullRegistry)
        }
    }
}
