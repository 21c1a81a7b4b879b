//! samtest: local conformance runner for serverless functions.
//!
//! Scans a deployed template for function resources, runs each function's
//! registered tests against a locally emulated runtime, and reports a
//! pass/fail line per test plus a summary.
//!
//! # Quick Start
//!
//! ```rust,no_run
//! use samtest::prelude::*;
//!
//! # async fn demo() -> samtest::runner::Result<()> {
//! let config = HarnessConfig::load_or_default(DEFAULT_CONFIG_FILE)?;
//! let suites = TestRegistry::new().with_suite(
//!     "reverse",
//!     vec![TestCase::new("should reverse string")
//!         .with_query([("s", "foo")])
//!         .expect(Expectation::literal("oof"))],
//! );
//!
//! let mut runner = Runner::from_config(&config, Selection::All, false)?.with_registry(suites);
//! let state = runner.run().await;
//! assert!(state.succeeded());
//! # Ok(())
//! # }
//! ```

pub use samtest_core as core;
pub use samtest_platform as platform;
pub use samtest_runner as runner;

/// Prelude module for common imports.
pub mod prelude {
    pub use samtest_core::{
        DEFAULT_CONFIG_FILE, EnvVars, Expectation, FunctionDescriptor, HarnessConfig,
        ResponseEnvelope, Setup, TestCase, TestRegistry, Transport,
    };
    pub use samtest_platform::{Emulator, Supervisor, SupervisorState};
    pub use samtest_runner::{ConsoleReporter, Invoker, RunState, Runner, Selection};
}
