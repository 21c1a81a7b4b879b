//! Console reporter.
//!
//! Per-test lines and the summary go to stdout; failure diagnostics go to
//! stderr, the same split the emulator's own output follows.

use std::io::{self, IsTerminal, Write};

use samtest_core::FunctionDescriptor;

use crate::error::{InvokeError, RunnerError};
use crate::runner::{Failure, Outcome, RunState};

/// Heavy check mark.
pub const CHECK_MARK: &str = "\u{2714}";
/// Heavy ballot X.
pub const FAIL_MARK: &str = "\u{2718}";

const RED: &str = "\x1b[31m";
const GREEN: &str = "\x1b[32m";
const BLUE: &str = "\x1b[34m";
const MAGENTA: &str = "\x1b[35m";
const GRAY: &str = "\x1b[90m";
const RESET: &str = "\x1b[0m";

/// Writes the human-readable run report.
pub struct ConsoleReporter {
    out: Box<dyn Write + Send>,
    err: Box<dyn Write + Send>,
    color: bool,
}

impl std::fmt::Debug for ConsoleReporter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ConsoleReporter")
            .field("color", &self.color)
            .finish_non_exhaustive()
    }
}

impl Default for ConsoleReporter {
    fn default() -> Self {
        Self::stdio()
    }
}

impl ConsoleReporter {
    /// Reports to the process's stdout and stderr, coloured when stdout is a terminal.
    #[must_use]
    pub fn stdio() -> Self {
        Self {
            color: io::stdout().is_terminal(),
            out: Box::new(io::stdout()),
            err: Box::new(io::stderr()),
        }
    }

    /// Reports to arbitrary writers, without colour.
    #[must_use]
    pub fn with_writers(out: Box<dyn Write + Send>, err: Box<dyn Write + Send>) -> Self {
        Self {
            out,
            err,
            color: false,
        }
    }

    /// Forces colour on or off.
    #[must_use]
    pub fn with_color(mut self, color: bool) -> Self {
        self.color = color;
        self
    }

    /// Announces debug mode.
    pub fn debug_mode(&mut self) {
        let text = self.paint(MAGENTA, "Debug mode");
        self.write_out(&format!("{text}\n"));
    }

    /// Function header: `name (deployedId)`.
    pub fn function_header(&mut self, function: &FunctionDescriptor) {
        let name = self.paint(BLUE, &function.logical_name);
        let id = self.paint(GRAY, &format!("({})", function.deployed_id));
        self.write_out(&format!("{name} {id}\n"));
    }

    /// Opens a test line; the verdict is appended by [`Self::outcome`].
    pub fn test_started(&mut self, index: usize, name: &str) {
        self.write_out(&format!("  {index}: {name} "));
    }

    /// Closes a test line with its verdict and prints diagnostics.
    pub fn outcome(&mut self, outcome: &Outcome) {
        match outcome {
            Outcome::Passed { display } => {
                let mark = self.paint(GREEN, CHECK_MARK);
                self.write_out(&format!("{mark}\n"));
                if let Some(raw) = display {
                    let echoed = self.paint(GREEN, &format!("    {raw}"));
                    self.write_out(&format!("{echoed}\n"));
                }
            }
            Outcome::Failed(failure) => {
                let mark = self.paint(RED, FAIL_MARK);
                self.write_out(&format!("{mark}\n"));
                for line in diagnostics(failure) {
                    let line = self.paint(RED, &format!("    {line}"));
                    self.write_err(&format!("{line}\n"));
                }
            }
        }
    }

    /// Closes the current test line and reports why the run stopped.
    pub fn aborted(&mut self, error: &RunnerError) {
        let mark = self.paint(RED, FAIL_MARK);
        self.write_out(&format!("{mark}\n"));
        let line = self.paint(RED, &format!("Aborting run: {error}"));
        self.write_err(&format!("{line}\n"));
    }

    /// Final `Test count: N, succeeded: S, failed: F` line.
    pub fn summary(&mut self, state: &RunState) {
        let mut line = format!("\nTest count: {}", state.test_count());
        if state.success_count() > 0 {
            let part = self.paint(GREEN, &format!("succeeded: {}", state.success_count()));
            line.push_str(&format!(", {part}"));
        }
        if state.failed_count() > 0 {
            let part = self.paint(RED, &format!("failed: {}", state.failed_count()));
            line.push_str(&format!(", {part}"));
        }
        self.write_out(&format!("{line}\n"));
    }

    fn paint(&self, color: &str, text: &str) -> String {
        if self.color {
            format!("{color}{text}{RESET}")
        } else {
            text.to_string()
        }
    }

    fn write_out(&mut self, text: &str) {
        if let Err(e) = self.out.write_all(text.as_bytes()).and_then(|()| self.out.flush()) {
            tracing::debug!(error = %e, "failed to write report");
        }
    }

    fn write_err(&mut self, text: &str) {
        if let Err(e) = self.err.write_all(text.as_bytes()).and_then(|()| self.err.flush()) {
            tracing::debug!(error = %e, "failed to write diagnostics");
        }
    }
}

/// Diagnostic lines for a failed test.
fn diagnostics(failure: &Failure) -> Vec<String> {
    match failure {
        Failure::Error(RunnerError::Invoke(err)) => match err {
            InvokeError::Transport(stderr) => vec![format!("Test failed: {stderr}")],
            InvokeError::Handler {
                error_type,
                error_message,
            } if error_message.is_empty() => vec![error_type.clone()],
            InvokeError::Handler {
                error_type,
                error_message,
            } => vec![format!("{error_type}: {error_message}")],
            InvokeError::Malformed { raw, reason } => {
                vec![format!("Malformed response: {}", raw.trim_end()), reason.clone()]
            }
            InvokeError::Http(msg) => vec![format!("Invocation failed: {msg}")],
            InvokeError::Io(e) => vec![format!("Invocation failed: {e}")],
        },
        Failure::Error(other) => vec![other.to_string()],
        Failure::Status {
            expected,
            actual,
            raw,
        } => vec![
            format!("status: {actual}, expected: {expected}"),
            format!("response: {}", raw.trim_end()),
        ],
        Failure::Body { raw } => vec![format!("response: {}", raw.trim_end())],
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    #[derive(Clone, Default)]
    struct Buf(Arc<parking_lot::Mutex<Vec<u8>>>);

    impl Write for Buf {
        fn write(&mut self, data: &[u8]) -> io::Result<usize> {
            self.0.lock().extend_from_slice(data);
            Ok(data.len())
        }

        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    impl Buf {
        fn text(&self) -> String {
            String::from_utf8(self.0.lock().clone()).unwrap()
        }
    }

    fn reporter() -> (ConsoleReporter, Buf, Buf) {
        let out = Buf::default();
        let err = Buf::default();
        let reporter = ConsoleReporter::with_writers(Box::new(out.clone()), Box::new(err.clone()));
        (reporter, out, err)
    }

    fn state(tests: usize, passes: usize) -> RunState {
        let mut state = RunState::new();
        for i in 0..tests {
            state.begin_test();
            if i < passes {
                state.record_pass();
            }
        }
        state
    }

    #[test]
    fn test_pass_line() {
        let (mut reporter, out, err) = reporter();
        reporter.function_header(&FunctionDescriptor::new("reverse", "reverseA1B2C3D4"));
        reporter.test_started(1, "should reverse string");
        reporter.outcome(&Outcome::Passed { display: None });

        assert_eq!(
            out.text(),
            "reverse (reverseA1B2C3D4)\n  1: should reverse string \u{2714}\n"
        );
        assert!(err.text().is_empty());
    }

    #[test]
    fn test_display_result_echoed() {
        let (mut reporter, out, _) = reporter();
        reporter.test_started(2, "t");
        reporter.outcome(&Outcome::Passed {
            display: Some(r#"{"statusCode": 200}"#.into()),
        });
        assert!(out.text().ends_with("\u{2714}\n    {\"statusCode\": 200}\n"));
    }

    #[test]
    fn test_handler_failure_diagnostic() {
        let (mut reporter, out, err) = reporter();
        reporter.test_started(1, "t");
        reporter.outcome(&Outcome::Failed(Failure::Error(RunnerError::Invoke(
            InvokeError::Handler {
                error_type: "Error".into(),
                error_message: "boom".into(),
            },
        ))));
        assert!(out.text().ends_with("\u{2718}\n"));
        assert_eq!(err.text(), "    Error: boom\n");
    }

    #[test]
    fn test_handler_failure_without_message() {
        let failure = Failure::Error(RunnerError::Invoke(InvokeError::Handler {
            error_type: "TimeoutError".into(),
            error_message: String::new(),
        }));
        assert_eq!(diagnostics(&failure), ["TimeoutError"]);
    }

    #[test]
    fn test_transport_and_malformed_diagnostics() {
        let crash = Failure::Error(RunnerError::Invoke(InvokeError::transport("Traceback ...")));
        assert_eq!(diagnostics(&crash), ["Test failed: Traceback ..."]);

        let malformed = Failure::Error(RunnerError::Invoke(InvokeError::malformed("oops\n", "expected value")));
        assert_eq!(diagnostics(&malformed), ["Malformed response: oops", "expected value"]);
    }

    #[test]
    fn test_body_and_status_diagnostics() {
        let body = Failure::Body {
            raw: r#"{"statusCode": 200, "body": "x"}"#.into(),
        };
        assert_eq!(diagnostics(&body), [r#"response: {"statusCode": 200, "body": "x"}"#]);

        let status = Failure::Status {
            expected: 200,
            actual: 500,
            raw: "{}".into(),
        };
        assert_eq!(diagnostics(&status)[0], "status: 500, expected: 200");
    }

    #[test]
    fn test_summary_omits_zero_parts() {
        let (mut reporter, out, _) = reporter();
        reporter.summary(&state(3, 3));
        reporter.summary(&state(3, 2));
        reporter.summary(&state(2, 0));
        reporter.summary(&state(0, 0));
        assert_eq!(
            out.text(),
            "\nTest count: 3, succeeded: 3\n\
             \nTest count: 3, succeeded: 2, failed: 1\n\
             \nTest count: 2, failed: 2\n\
             \nTest count: 0\n"
        );
    }

    #[test]
    fn test_color_wraps_marks() {
        let (reporter, out, _) = reporter();
        let mut reporter = reporter.with_color(true);
        reporter.outcome(&Outcome::Passed { display: None });
        assert_eq!(out.text(), "\x1b[32m\u{2714}\x1b[0m\n");
    }

    #[test]
    fn test_abort_line() {
        let (mut reporter, out, err) = reporter();
        reporter.test_started(1, "t");
        reporter.aborted(&RunnerError::from(samtest_platform::PlatformError::spawn("sam: not found")));
        assert!(out.text().ends_with("\u{2718}\n"));
        assert!(err.text().contains("Aborting run: failed to spawn emulator: sam: not found"));
    }
}
