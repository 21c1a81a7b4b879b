//! Test runner.
//!
//! Drives scanner output through the registry, the emulator and the invoker
//! one test at a time, in template order and then registration order. A
//! test never starts before the previous invocation (and any emulator
//! restart it needed) has resolved.
//!
//! Only an emulator start failure ends a run early. Every other failure is
//! recorded against the test that hit it.

use std::process::Stdio;

use samtest_core::{
    EnvOverrides, FunctionDescriptor, HarnessConfig, RequestEnvelope, ResourceScanner, Setup,
    TestCase, TestRegistry, Transport, Verdict, evaluate,
};
use samtest_platform::{DetachedEmulator, Emulator, Supervisor, default_registry};

use crate::client::{CommandInvoker, HttpInvoker, Invoker};
use crate::error::{Result, RunnerError};
use crate::report::ConsoleReporter;
use crate::selection::Selection;

/// Counters for one run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RunState {
    test_count: usize,
    success_count: usize,
    aborted: bool,
}

impl RunState {
    /// Creates zeroed counters.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            test_count: 0,
            success_count: 0,
            aborted: false,
        }
    }

    /// Counts a test as started.
    pub fn begin_test(&mut self) {
        self.test_count += 1;
    }

    /// Counts the current test as passed.
    pub fn record_pass(&mut self) {
        self.success_count += 1;
    }

    /// Marks the run as cut short.
    pub fn abort(&mut self) {
        self.aborted = true;
    }

    /// Tests started.
    #[must_use]
    pub const fn test_count(&self) -> usize {
        self.test_count
    }

    /// Tests passed.
    #[must_use]
    pub const fn success_count(&self) -> usize {
        self.success_count
    }

    /// Tests failed.
    #[must_use]
    pub const fn failed_count(&self) -> usize {
        self.test_count.saturating_sub(self.success_count)
    }

    /// Returns true if the run was cut short.
    #[must_use]
    pub const fn aborted(&self) -> bool {
        self.aborted
    }

    /// Returns true if every started test passed and the run completed.
    #[must_use]
    pub const fn succeeded(&self) -> bool {
        !self.aborted && self.success_count == self.test_count
    }

    /// Process exit status: 0 on success, 1 otherwise.
    #[must_use]
    pub const fn exit_code(&self) -> u8 {
        if self.succeeded() { 0 } else { 1 }
    }
}

/// Result of one test.
#[derive(Debug)]
pub enum Outcome {
    /// The test passed.
    Passed {
        /// Raw response to echo, when the test asked for it.
        display: Option<String>,
    },
    /// The test failed.
    Failed(Failure),
}

impl Outcome {
    /// Returns true for [`Outcome::Passed`].
    #[must_use]
    pub const fn passed(&self) -> bool {
        matches!(self, Self::Passed { .. })
    }
}

/// Why a test failed.
#[derive(Debug)]
pub enum Failure {
    /// Setup or invocation failed before a verdict could be reached.
    Error(RunnerError),
    /// The handler returned the wrong status.
    Status {
        /// Status the test required.
        expected: u16,
        /// Status returned.
        actual: u16,
        /// Raw response.
        raw: String,
    },
    /// The body did not satisfy the expectation.
    Body {
        /// Raw response.
        raw: String,
    },
}

/// Sequential test runner.
pub struct Runner {
    functions: Vec<FunctionDescriptor>,
    registry: TestRegistry,
    selection: Selection,
    emulator: Box<dyn Emulator>,
    invoker: Box<dyn Invoker>,
    reporter: ConsoleReporter,
}

impl std::fmt::Debug for Runner {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Runner")
            .field("functions", &self.functions)
            .field("tests", &self.registry.len())
            .field("selection", &self.selection)
            .field("emulator", &self.emulator.state())
            .finish_non_exhaustive()
    }
}

impl Runner {
    /// Creates a runner over scanned functions, reporting to stdio.
    #[must_use]
    pub fn new(
        functions: Vec<FunctionDescriptor>,
        registry: TestRegistry,
        emulator: Box<dyn Emulator>,
        invoker: Box<dyn Invoker>,
    ) -> Self {
        Self {
            functions,
            registry,
            selection: Selection::All,
            emulator,
            invoker,
            reporter: ConsoleReporter::stdio(),
        }
    }

    /// Builds a runner from configuration: scans the template, loads suite
    /// files and wires the configured transport.
    ///
    /// # Errors
    /// Returns a fatal error if `debug` is set without a single-test
    /// selection, the template cannot be read, or a suite file is invalid.
    pub fn from_config(config: &HarnessConfig, selection: Selection, debug: bool) -> Result<Self> {
        if debug {
            selection.require_single()?;
        }

        let functions = ResourceScanner::with_marker(config.function_marker.as_str())
            .scan_file(&config.template)?;
        tracing::info!(
            template = %config.template.display(),
            functions = functions.len(),
            "scanned template"
        );

        let registry = TestRegistry::load_dir(&config.tests_dir)?;

        let (emulator, invoker): (Box<dyn Emulator>, Box<dyn Invoker>) = match config.transport {
            Transport::Http => {
                let supervisor = Supervisor::new(
                    config.emulator.clone(),
                    config.env_file(),
                    default_registry(&config.emulator.worker_process),
                )
                .with_debug(debug);
                let invoker = HttpInvoker::new(config.emulator.endpoint.as_str()).map_err(|e| {
                    RunnerError::Core(samtest_core::CoreError::config(e.to_string()))
                })?;
                (Box::new(supervisor), Box::new(invoker))
            }
            Transport::Command => {
                let invoker = CommandInvoker::new(config.emulator.clone(), config.work_dir.clone())
                    .with_debug(debug);
                (Box::new(DetachedEmulator), Box::new(invoker))
            }
        };

        Ok(Self::new(functions, registry, emulator, invoker).with_selection(selection))
    }

    /// Restricts the run.
    #[must_use]
    pub fn with_selection(mut self, selection: Selection) -> Self {
        self.selection = selection;
        self
    }

    /// Adds tests after those already registered.
    #[must_use]
    pub fn with_registry(mut self, registry: TestRegistry) -> Self {
        self.registry.merge(registry);
        self
    }

    /// Replaces the reporter.
    #[must_use]
    pub fn with_reporter(mut self, reporter: ConsoleReporter) -> Self {
        self.reporter = reporter;
        self
    }

    /// Functions found in the template, in document order.
    #[must_use]
    pub fn functions(&self) -> &[FunctionDescriptor] {
        &self.functions
    }

    /// Mutable access to the reporter.
    pub fn reporter_mut(&mut self) -> &mut ConsoleReporter {
        &mut self.reporter
    }

    /// Runs every selected test and stops the emulator afterwards.
    pub async fn run(&mut self) -> RunState {
        let mut state = RunState::new();
        let Self {
            functions,
            registry,
            selection,
            emulator,
            invoker,
            reporter,
        } = self;

        'functions: for function in functions.iter() {
            let selected = selection.select(&function.logical_name, registry.lookup(&function.logical_name));
            if selected.is_empty() {
                continue;
            }
            reporter.function_header(function);

            for (index, case) in selected {
                state.begin_test();
                reporter.test_started(index, &case.name);

                let env = env_overrides(function, case);
                if let Err(e) = emulator.ensure_running(env.as_ref()).await {
                    let error = RunnerError::from(e);
                    tracing::error!(error = %error, "emulator failed to start, aborting run");
                    reporter.aborted(&error);
                    state.abort();
                    break 'functions;
                }

                let outcome = execute(&**invoker, function, case).await;
                if outcome.passed() {
                    state.record_pass();
                }
                reporter.outcome(&outcome);
            }
        }

        if matches!(selection, Selection::Single { .. }) && state.test_count() == 0 {
            tracing::warn!(selection = %selection, "selector matched no test");
        }

        if let Err(e) = emulator.stop().await {
            tracing::warn!(error = %e, "failed to stop emulator");
        }

        reporter.summary(&state);
        state
    }
}

/// Environment the emulator must run with for `case`.
fn env_overrides(function: &FunctionDescriptor, case: &TestCase) -> Option<EnvOverrides> {
    case.env
        .as_ref()
        .map(|vars| EnvOverrides::from([(function.deployed_id.clone(), vars.clone())]))
}

/// Setup, invoke and match one test.
async fn execute(invoker: &dyn Invoker, function: &FunctionDescriptor, case: &TestCase) -> Outcome {
    let request = RequestEnvelope::skeleton(&function.logical_name).with_overrides(&case.overrides);

    if let Some(setup) = &case.setup {
        if let Err(e) = run_setup(setup).await {
            return Outcome::Failed(Failure::Error(e));
        }
    }

    let response = match invoker.invoke(function, &request, case.env.as_ref()).await {
        Ok(response) => response,
        Err(e) => return Outcome::Failed(Failure::Error(e.into())),
    };

    match evaluate(case, &response).await {
        Verdict::Pass => Outcome::Passed {
            display: case.display_result.then(|| response.raw.trim().to_string()),
        },
        Verdict::StatusMismatch { expected, actual } => Outcome::Failed(Failure::Status {
            expected,
            actual,
            raw: response.raw,
        }),
        Verdict::BodyMismatch => Outcome::Failed(Failure::Body { raw: response.raw }),
    }
}

async fn run_setup(setup: &Setup) -> Result<()> {
    match setup {
        Setup::Command(cmd) => {
            let output = tokio::process::Command::new("sh")
                .arg("-c")
                .arg(cmd)
                .stdin(Stdio::null())
                .output()
                .await
                .map_err(|e| RunnerError::setup(format!("{cmd}: {e}")))?;

            tracing::debug!(
                command = %cmd,
                status = %output.status,
                stdout = %String::from_utf8_lossy(&output.stdout),
                "setup finished"
            );

            if output.status.success() {
                Ok(())
            } else {
                let stderr = String::from_utf8_lossy(&output.stderr);
                Err(RunnerError::setup(format!(
                    "`{cmd}` exited with {}{}",
                    output.status,
                    if stderr.trim().is_empty() {
                        String::new()
                    } else {
                        format!(": {}", stderr.trim())
                    }
                )))
            }
        }
        Setup::Action(action) => action().await.map_err(RunnerError::setup),
    }
}
