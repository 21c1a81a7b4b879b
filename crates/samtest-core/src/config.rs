//! Harness configuration.
//!
//! Loaded from an optional TOML file and validated at load time; every field
//! has a default so an empty file (or no file) describes a standard SAM
//! project layout.

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{CoreError, Result};
use crate::scanner::FUNCTION_MARKER;

/// Default configuration file name looked up in the working directory.
pub const DEFAULT_CONFIG_FILE: &str = "sam-test.toml";

/// How functions are invoked.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Transport {
    /// Long-lived emulator, one HTTP invocation per test.
    #[default]
    Http,
    /// One emulator command per test, payload passed through a file.
    Command,
}

impl std::str::FromStr for Transport {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "http" => Ok(Self::Http),
            "command" => Ok(Self::Command),
            other => Err(CoreError::config(format!(
                "unknown transport {other:?} (expected \"http\" or \"command\")"
            ))),
        }
    }
}

/// Top-level harness configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct HarnessConfig {
    /// Deployed template to scan.
    pub template: PathBuf,

    /// Marker line identifying a function resource.
    pub function_marker: String,

    /// Directory holding `<logicalName>.json` suite files.
    pub tests_dir: PathBuf,

    /// Directory for generated `event.json` / `env.json`.
    pub work_dir: PathBuf,

    /// Invocation transport.
    pub transport: Transport,

    /// Emulator process settings.
    pub emulator: EmulatorConfig,
}

impl Default for HarnessConfig {
    fn default() -> Self {
        Self {
            template: PathBuf::from("template.yaml"),
            function_marker: FUNCTION_MARKER.to_string(),
            tests_dir: PathBuf::from("sam-test"),
            work_dir: PathBuf::from("sam-test"),
            transport: Transport::default(),
            emulator: EmulatorConfig::default(),
        }
    }
}

impl HarnessConfig {
    /// Loads configuration from a TOML file.
    ///
    /// # Errors
    /// Returns an error if the file cannot be read, parsed or validated.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let content = std::fs::read_to_string(path.as_ref())
            .map_err(|e| CoreError::config(format!("failed to read config: {e}")))?;
        Self::from_toml(&content)
    }

    /// Loads `path` if it exists, otherwise returns defaults.
    ///
    /// # Errors
    /// Returns an error if an existing file is invalid.
    pub fn load_or_default(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        if path.exists() {
            Self::load(path)
        } else {
            tracing::debug!(path = %path.display(), "no config file, using defaults");
            Ok(Self::default())
        }
    }

    /// Parses and validates TOML text.
    ///
    /// # Errors
    /// Returns an error if the text cannot be parsed or fails validation.
    pub fn from_toml(content: &str) -> Result<Self> {
        let config: Self = toml::from_str(content)
            .map_err(|e| CoreError::config(format!("failed to parse config: {e}")))?;
        config.validate()?;
        Ok(config)
    }

    /// Validates the configuration.
    ///
    /// # Errors
    /// Returns an error if the configuration is invalid.
    pub fn validate(&self) -> Result<()> {
        if self.template.as_os_str().is_empty() {
            return Err(CoreError::config("template cannot be empty"));
        }
        if self.function_marker.trim().is_empty() {
            return Err(CoreError::config("function_marker cannot be empty"));
        }
        self.emulator.validate()
    }

    /// Path of the environment-override file.
    #[must_use]
    pub fn env_file(&self) -> PathBuf {
        self.work_dir.join("env.json")
    }

    /// Path of the generated event file.
    #[must_use]
    pub fn event_file(&self) -> PathBuf {
        self.work_dir.join("event.json")
    }
}

/// Emulator process settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EmulatorConfig {
    /// Emulator executable.
    pub program: String,

    /// Arguments starting the long-lived emulator.
    pub start_args: Vec<String>,

    /// Arguments for a one-shot invocation.
    pub invoke_args: Vec<String>,

    /// Flag preceding the environment-override file path.
    pub env_vars_flag: String,

    /// Flag preceding the event file path.
    pub event_flag: String,

    /// Flag preceding the debugger port.
    pub debug_flag: String,

    /// Debugger port used with `-d`.
    pub debug_port: u16,

    /// Substring on the emulator's stderr that signals readiness.
    pub readiness_marker: String,

    /// Upper bound on waiting for the readiness marker.
    #[serde(with = "humantime_str")]
    pub readiness_timeout: Duration,

    /// Grace period between SIGTERM and SIGKILL on stop.
    #[serde(with = "humantime_str")]
    pub stop_timeout: Duration,

    /// Name prefix of the interpreter process the emulator leaves behind.
    pub worker_process: String,

    /// Local invocation endpoint of the long-lived emulator.
    pub endpoint: String,
}

impl Default for EmulatorConfig {
    fn default() -> Self {
        Self {
            program: "sam".to_string(),
            start_args: vec!["local".to_string(), "start-lambda".to_string()],
            invoke_args: vec!["local".to_string(), "invoke".to_string()],
            env_vars_flag: "--env-vars".to_string(),
            event_flag: "-e".to_string(),
            debug_flag: "-d".to_string(),
            debug_port: 5858,
            readiness_marker: "Running on".to_string(),
            readiness_timeout: Duration::from_secs(15),
            stop_timeout: Duration::from_secs(5),
            worker_process: "python".to_string(),
            endpoint: "http://127.0.0.1:3001".to_string(),
        }
    }
}

impl EmulatorConfig {
    /// Validates the emulator settings.
    ///
    /// # Errors
    /// Returns an error if a setting is unusable.
    pub fn validate(&self) -> Result<()> {
        if self.program.trim().is_empty() {
            return Err(CoreError::config("emulator.program cannot be empty"));
        }
        if self.readiness_marker.is_empty() {
            return Err(CoreError::config("emulator.readiness_marker cannot be empty"));
        }
        if self.readiness_timeout.is_zero() {
            return Err(CoreError::config("emulator.readiness_timeout must be positive"));
        }
        if !self.endpoint.starts_with("http://") && !self.endpoint.starts_with("https://") {
            return Err(CoreError::config(format!(
                "emulator.endpoint must be an http(s) URL, got {:?}",
                self.endpoint
            )));
        }
        Ok(())
    }
}

/// Serde adapter for human-readable durations (`"15s"`, `"500ms"`).
mod humantime_str {
    use std::time::Duration;

    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(value: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&humantime::format_duration(*value).to_string())
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Duration, D::Error> {
        let text = String::deserialize(deserializer)?;
        humantime::parse_duration(&text).map_err(serde::de::Error::custom)
    }
}
