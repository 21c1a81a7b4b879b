//! Test registry: logical function name to an ordered list of test cases.
//!
//! Test records arrive as loose JSON objects (from per-function suite files)
//! or are built in code. Six reserved control fields are pulled out into a
//! typed [`TestCase`]; every other field is kept verbatim as a request
//! payload override and never mixed with the control fields.

use std::collections::HashMap;
use std::fmt;
use std::future::Future;
use std::path::Path;
use std::pin::Pin;
use std::sync::Arc;

use serde_json::{Map, Value};

use crate::error::{CoreError, Result};
use crate::types::{EnvVars, ResponseEnvelope};

/// Boxed future used by predicates and setup actions.
pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

/// Predicate over a full decoded response.
pub type PredicateFn = dyn Fn(ResponseEnvelope) -> BoxFuture<'static, bool> + Send + Sync;

/// Zero-argument setup action run before an invocation.
pub type SetupFn = dyn Fn() -> BoxFuture<'static, std::result::Result<(), String>> + Send + Sync;

/// Control fields stripped from a record before it becomes payload.
pub const RESERVED_FIELDS: [&str; 6] = [
    "testName",
    "env",
    "setup",
    "expectedStatus",
    "expectedResult",
    "displayResult",
];

/// Status expected when a test does not name one.
pub const DEFAULT_STATUS: u16 = 200;

/// What a test expects from the response body.
#[derive(Clone)]
pub enum Expectation {
    /// Partial deep match against the decoded body.
    Literal(Value),
    /// Arbitrary check over the full response.
    Predicate(Arc<PredicateFn>),
}

impl Expectation {
    /// Expects the body to partially match `value`.
    #[must_use]
    pub fn literal(value: impl Into<Value>) -> Self {
        Self::Literal(value.into())
    }

    /// Synchronous predicate over the full response.
    #[must_use]
    pub fn predicate<F>(check: F) -> Self
    where
        F: Fn(&ResponseEnvelope) -> bool + Send + Sync + 'static,
    {
        Self::Predicate(Arc::new(
            move |response: ResponseEnvelope| -> BoxFuture<'static, bool> {
                Box::pin(std::future::ready(check(&response)))
            },
        ))
    }

    /// Asynchronous predicate over the full response.
    #[must_use]
    pub fn async_predicate<F, Fut>(check: F) -> Self
    where
        F: Fn(ResponseEnvelope) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = bool> + Send + 'static,
    {
        Self::Predicate(Arc::new(
            move |response: ResponseEnvelope| -> BoxFuture<'static, bool> {
                Box::pin(check(response))
            },
        ))
    }
}

impl fmt::Debug for Expectation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Literal(value) => f.debug_tuple("Literal").field(value).finish(),
            Self::Predicate(_) => f.write_str("Predicate(..)"),
        }
    }
}

/// Action run before a test is invoked.
#[derive(Clone)]
pub enum Setup {
    /// Shell command run in the working directory.
    Command(String),
    /// In-process action.
    Action(Arc<SetupFn>),
}

impl Setup {
    /// Wraps an async closure as a setup action.
    #[must_use]
    pub fn action<F, Fut>(action: F) -> Self
    where
        F: Fn() -> Fut + Send + Sync + 'static,
        Fut: Future<Output = std::result::Result<(), String>> + Send + 'static,
    {
        Self::Action(Arc::new(
            move || -> BoxFuture<'static, std::result::Result<(), String>> { Box::pin(action()) },
        ))
    }
}

impl fmt::Debug for Setup {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Command(cmd) => f.debug_tuple("Command").field(cmd).finish(),
            Self::Action(_) => f.write_str("Action(..)"),
        }
    }
}

/// One registered test for a function.
#[derive(Debug, Clone)]
pub struct TestCase {
    /// Display name.
    pub name: String,
    /// Fields overlaid verbatim on the request skeleton.
    pub overrides: Map<String, Value>,
    /// Environment the emulator must expose to the function.
    pub env: Option<EnvVars>,
    /// Action run before invocation.
    pub setup: Option<Setup>,
    /// Required status code.
    pub expected_status: u16,
    /// Body expectation; `None` accepts any body.
    pub expected_result: Option<Expectation>,
    /// Echo the raw response when the test passes.
    pub display_result: bool,
}

impl TestCase {
    /// Creates a test case with defaults.
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            overrides: Map::new(),
            env: None,
            setup: None,
            expected_status: DEFAULT_STATUS,
            expected_result: None,
            display_result: false,
        }
    }

    /// Adds a payload override.
    #[must_use]
    pub fn with_field(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.overrides.insert(key.into(), value.into());
        self
    }

    /// Sets `queryStringParameters`.
    #[must_use]
    pub fn with_query<I, K, V>(self, params: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        let map: Map<String, Value> = params
            .into_iter()
            .map(|(k, v)| (k.into(), Value::String(v.into())))
            .collect();
        self.with_field("queryStringParameters", Value::Object(map))
    }

    /// Adds one environment variable.
    #[must_use]
    pub fn with_env(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.env
            .get_or_insert_with(EnvVars::new)
            .insert(key.into(), value.into());
        self
    }

    /// Sets the setup action.
    #[must_use]
    pub fn with_setup(mut self, setup: Setup) -> Self {
        self.setup = Some(setup);
        self
    }

    /// Sets the expected status.
    #[must_use]
    pub fn expect_status(mut self, status: u16) -> Self {
        self.expected_status = status;
        self
    }

    /// Sets the body expectation.
    #[must_use]
    pub fn expect(mut self, expectation: Expectation) -> Self {
        self.expected_result = Some(expectation);
        self
    }

    /// Echo the raw response on success.
    #[must_use]
    pub fn display_result(mut self) -> Self {
        self.display_result = true;
        self
    }

    /// Splits a loose record into control fields and payload overrides.
    ///
    /// # Errors
    /// Returns [`CoreError::InvalidRecord`] when a control field has the wrong shape.
    pub fn from_record(function: &str, mut record: Map<String, Value>) -> Result<Self> {
        let mut case = Self::new("unnamed test");

        if let Some(value) = record.shift_remove("testName") {
            case.name = value
                .as_str()
                .map(str::to_string)
                .ok_or_else(|| CoreError::invalid_record(function, "testName must be a string"))?;
        }

        if let Some(value) = record.shift_remove("env") {
            case.env = Some(parse_env(function, value)?);
        }

        if let Some(value) = record.shift_remove("setup") {
            let cmd = value
                .as_str()
                .ok_or_else(|| CoreError::invalid_record(function, "setup must be a command string"))?;
            case.setup = Some(Setup::Command(cmd.to_string()));
        }

        if let Some(value) = record.shift_remove("expectedStatus") {
            let status = value
                .as_u64()
                .and_then(|s| u16::try_from(s).ok())
                .ok_or_else(|| {
                    CoreError::invalid_record(function, "expectedStatus must be a status code")
                })?;
            if status != 0 {
                case.expected_status = status;
            }
        }

        if let Some(value) = record.shift_remove("expectedResult") {
            case.expected_result = Some(Expectation::Literal(value));
        }

        if let Some(value) = record.shift_remove("displayResult") {
            case.display_result = value
                .as_bool()
                .ok_or_else(|| CoreError::invalid_record(function, "displayResult must be a boolean"))?;
        }

        case.overrides = record;
        Ok(case)
    }
}

fn parse_env(function: &str, value: Value) -> Result<EnvVars> {
    let Value::Object(map) = value else {
        return Err(CoreError::invalid_record(function, "env must be an object"));
    };

    map.into_iter()
        .map(|(key, value)| match value {
            Value::String(s) => Ok((key, s)),
            Value::Number(n) => Ok((key, n.to_string())),
            Value::Bool(b) => Ok((key, b.to_string())),
            _ => Err(CoreError::invalid_record(
                function,
                format!("env value for {key} must be a scalar"),
            )),
        })
        .collect()
}

/// Registered tests, keyed by logical function name.
#[derive(Debug, Clone, Default)]
pub struct TestRegistry {
    suites: HashMap<String, Vec<TestCase>>,
}

impl TestRegistry {
    /// Creates an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends tests for a function, keeping registration order.
    #[must_use]
    pub fn with_suite(mut self, function: impl Into<String>, cases: Vec<TestCase>) -> Self {
        self.register(function, cases);
        self
    }

    /// Appends tests for a function, keeping registration order.
    pub fn register(&mut self, function: impl Into<String>, cases: Vec<TestCase>) {
        self.suites.entry(function.into()).or_default().extend(cases);
    }

    /// Appends every suite of `other` after this registry's own tests.
    pub fn merge(&mut self, other: Self) {
        for (function, cases) in other.suites {
            self.register(function, cases);
        }
    }

    /// Tests registered for a function; empty if none.
    #[must_use]
    pub fn lookup(&self, function: &str) -> &[TestCase] {
        self.suites
            .get(function)
            .map(Vec::as_slice)
            .unwrap_or_default()
    }

    /// Number of registered tests across all functions.
    #[must_use]
    pub fn len(&self) -> usize {
        self.suites.values().map(Vec::len).sum()
    }

    /// Returns true if no tests are registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Parses a suite document: a JSON array of test records.
    ///
    /// # Errors
    /// Returns an error if the text is not an array of objects or a record is invalid.
    pub fn parse_suite(function: &str, text: &str) -> Result<Vec<TestCase>> {
        let records: Vec<Map<String, Value>> = serde_json::from_str(text)?;
        records
            .into_iter()
            .map(|record| TestCase::from_record(function, record))
            .collect()
    }

    /// Loads every `<logicalName>.json` suite in a directory.
    ///
    /// A missing directory yields an empty registry.
    ///
    /// # Errors
    /// Returns an error if a suite file cannot be read or parsed.
    pub fn load_dir(dir: impl AsRef<Path>) -> Result<Self> {
        let dir = dir.as_ref();
        let mut registry = Self::new();

        let entries = match std::fs::read_dir(dir) {
            Ok(entries) => entries,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                tracing::warn!(dir = %dir.display(), "suite directory not found");
                return Ok(registry);
            }
            Err(e) => return Err(e.into()),
        };

        let mut paths: Vec<_> = entries
            .filter_map(|entry| entry.ok().map(|e| e.path()))
            .filter(|p| p.extension().is_some_and(|ext| ext == "json"))
            .collect();
        paths.sort();

        for path in paths {
            let Some(function) = path.file_stem().and_then(|s| s.to_str()) else {
                continue;
            };
            // Scratch files written by the command transport share the directory.
            if function == "event" || function == "env" {
                continue;
            }
            let text = std::fs::read_to_string(&path)?;
            let cases = Self::parse_suite(function, &text).map_err(|e| CoreError::Suite {
                path: path.clone(),
                reason: e.to_string(),
            })?;
            tracing::debug!(function = function, count = cases.len(), "loaded suite");
            registry.register(function, cases);
        }

        Ok(registry)
    }
}
