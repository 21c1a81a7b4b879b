// Allow unwrap/expect in tests for clear failure messages
#![cfg_attr(test, allow(clippy::unwrap_used, clippy::expect_used, clippy::panic))]

//! # samtest-runner
//!
//! Orchestration for the samtest conformance runner.
//!
//! - [`Runner`] executes the selected tests sequentially and keeps the
//!   [`RunState`] counters
//! - [`Invoker`] delivers requests over HTTP ([`HttpInvoker`]) or a one-shot
//!   emulator command ([`CommandInvoker`])
//! - [`Selection`] parses the `-f NAME[.INDEX|*]` selector
//! - [`ConsoleReporter`] prints per-test lines and the summary
//!
//! ## Example
//!
//! ```rust,ignore
//! use samtest_core::HarnessConfig;
//! use samtest_runner::{Runner, Selection};
//!
//! let config = HarnessConfig::load_or_default("sam-test.toml")?;
//! let mut runner = Runner::from_config(&config, Selection::All, false)?;
//! let state = runner.run().await;
//! std::process::exit(i32::from(state.exit_code()));
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]

pub mod client;
pub mod error;
pub mod report;
pub mod runner;
pub mod selection;

pub use client::{CommandInvoker, HttpInvoker, Invoker, decode_output, decode_response};
pub use error::{InvokeError, Result, RunnerError};
pub use report::{CHECK_MARK, ConsoleReporter, FAIL_MARK};
pub use runner::{Failure, Outcome, RunState, Runner};
pub use selection::Selection;
