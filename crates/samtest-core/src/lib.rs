// Allow unwrap/expect in tests for clear failure messages
#![cfg_attr(test, allow(clippy::unwrap_used, clippy::expect_used, clippy::panic))]

//! # samtest-core
//!
//! Data model and pure logic for the samtest conformance runner:
//!
//! - [`ResourceScanner`] finds function resources in a deployed template
//! - [`TestRegistry`] holds the ordered test cases for each logical function
//! - [`matcher`] decides pass/fail for a decoded response
//! - [`HarnessConfig`] describes where things live and how the emulator runs
//!
//! Nothing here touches processes or the network; see `samtest-platform`
//! and `samtest-runner` for that.

#![deny(unsafe_code)]
#![warn(missing_docs)]

pub mod config;
pub mod error;
pub mod matcher;
pub mod registry;
pub mod scanner;
pub mod types;

pub use config::{DEFAULT_CONFIG_FILE, EmulatorConfig, HarnessConfig, Transport};
pub use error::{CoreError, Result};
pub use matcher::{Verdict, evaluate, partial_match};
pub use registry::{BoxFuture, Expectation, RESERVED_FIELDS, Setup, TestCase, TestRegistry};
pub use scanner::{FUNCTION_MARKER, ResourceScanner};
pub use types::{EnvOverrides, EnvVars, FunctionDescriptor, RequestEnvelope, ResponseEnvelope};
