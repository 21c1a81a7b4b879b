// Allow unwrap/expect in tests for clear failure messages
#![cfg_attr(test, allow(clippy::unwrap_used, clippy::expect_used, clippy::panic))]

//! # samtest-platform
//!
//! Process-level plumbing for the samtest runner.
//!
//! - [`Supervisor`] owns the long-lived emulator process and restarts it
//!   whenever the environment overrides change
//! - [`ProcessRegistry`] finds and reaps interpreter processes the emulator
//!   leaves behind
//! - [`ScratchFile`] holds event and environment files for exactly as long
//!   as they are needed
//!
//! ## Platform Support
//!
//! | Platform | Emulator teardown | Worker reaping |
//! |----------|-------------------|----------------|
//! | Linux    | SIGTERM → SIGKILL | `/proc`        |
//! | macOS    | SIGTERM → SIGKILL | none           |
//! | Other    | kill              | none           |

#![deny(unsafe_code)]
#![warn(missing_docs)]

pub mod detect;
pub mod error;
pub mod process;
pub mod scratch;
pub mod supervisor;

pub use detect::{ProcessTable, detect_process_table};
pub use error::{PlatformError, Result};
#[cfg(target_os = "linux")]
pub use process::ProcfsRegistry;
pub use process::{NullRegistry, ProcessRegistry, default_registry};
pub use scratch::ScratchFile;
pub use supervisor::{DetachedEmulator, Emulator, Supervisor, SupervisorState};
