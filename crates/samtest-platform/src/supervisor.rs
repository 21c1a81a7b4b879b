//! Emulator process supervisor.
//!
//! Owns the one live emulator subprocess, its environment-override file and
//! the interpreter process it adopts. State machine:
//!
//! ```text
//! Stopped → Starting → Running → Stopping → Stopped
//!                         └── env change: Stopping → Starting
//! ```
//!
//! Readiness is the first of: the readiness marker appearing on the
//! emulator's stderr, or the readiness timeout elapsing. An emulator that
//! exits before either fails the start.

use std::collections::BTreeSet;
use std::path::PathBuf;
use std::process::Stdio;
use std::time::Duration;

use async_trait::async_trait;
use samtest_core::{EmulatorConfig, EnvOverrides};
use tokio::io::{AsyncBufReadExt, AsyncRead, BufReader};
use tokio::process::{Child, Command};
use tokio::sync::oneshot;
use tokio::task::JoinHandle;

use crate::error::{PlatformError, Result};
use crate::process::ProcessRegistry;
use crate::scratch::ScratchFile;

/// How long an exited emulator's output is drained for a late marker.
const MARKER_DRAIN: Duration = Duration::from_millis(200);

/// Supervisor lifecycle state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SupervisorState {
    /// No emulator process.
    Stopped,
    /// Spawned, waiting for readiness.
    Starting,
    /// Ready to accept invocations.
    Running,
    /// Tearing down.
    Stopping,
}

/// Something the runner can ask to be running with a given environment.
#[async_trait]
pub trait Emulator: Send {
    /// Ensures the emulator is running with exactly `env`.
    ///
    /// # Errors
    /// Returns an error if the emulator cannot be started.
    async fn ensure_running(&mut self, env: Option<&EnvOverrides>) -> Result<()>;

    /// Stops the emulator. Calling this when already stopped is a no-op.
    ///
    /// # Errors
    /// Returns an error if teardown fails.
    async fn stop(&mut self) -> Result<()>;

    /// Current lifecycle state.
    fn state(&self) -> SupervisorState;
}

/// Stand-in used when every invocation launches its own emulator process.
#[derive(Debug, Default)]
pub struct DetachedEmulator;

#[async_trait]
impl Emulator for DetachedEmulator {
    async fn ensure_running(&mut self, _env: Option<&EnvOverrides>) -> Result<()> {
        Ok(())
    }

    async fn stop(&mut self) -> Result<()> {
        Ok(())
    }

    fn state(&self) -> SupervisorState {
        SupervisorState::Stopped
    }
}

/// How a start attempt resolved.
#[derive(Debug)]
enum Readiness {
    Marker,
    Timeout,
    Exited(std::io::Result<std::process::ExitStatus>),
}

/// Why a start replaces the current emulator.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum RestartReason {
    EnvChanged,
    Exited,
}

/// Supervisor for a long-lived emulator process.
pub struct Supervisor {
    config: EmulatorConfig,
    env_path: PathBuf,
    debug: bool,
    registry: Box<dyn ProcessRegistry>,
    state: SupervisorState,
    child: Option<Child>,
    pump: Option<JoinHandle<()>>,
    env_file: Option<ScratchFile>,
    running_env: Option<EnvOverrides>,
    baseline: Option<BTreeSet<u32>>,
    adopted: Option<u32>,
}

impl std::fmt::Debug for Supervisor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Supervisor")
            .field("program", &self.config.program)
            .field("state", &self.state)
            .field("pid", &self.pid())
            .field("adopted", &self.adopted)
            .finish_non_exhaustive()
    }
}

impl Supervisor {
    /// Creates a stopped supervisor.
    #[must_use]
    pub fn new(
        config: EmulatorConfig,
        env_path: impl Into<PathBuf>,
        registry: Box<dyn ProcessRegistry>,
    ) -> Self {
        Self {
            config,
            env_path: env_path.into(),
            debug: false,
            registry,
            state: SupervisorState::Stopped,
            child: None,
            pump: None,
            env_file: None,
            running_env: None,
            baseline: None,
            adopted: None,
        }
    }

    /// Starts the emulator with its debugger port open.
    #[must_use]
    pub fn with_debug(mut self, debug: bool) -> Self {
        self.debug = debug;
        self
    }

    /// Process id of the emulator, if one is live.
    #[must_use]
    pub fn pid(&self) -> Option<u32> {
        self.child.as_ref().and_then(Child::id)
    }

    /// Process id of the adopted worker, if any.
    #[must_use]
    pub const fn adopted_pid(&self) -> Option<u32> {
        self.adopted
    }

    /// Environment the running emulator was started with.
    #[must_use]
    pub const fn running_env(&self) -> Option<&EnvOverrides> {
        self.running_env.as_ref()
    }

    /// Current lifecycle state.
    #[must_use]
    pub const fn state(&self) -> SupervisorState {
        self.state
    }

    /// Starts the emulator, restarting it if `env` differs from the running one.
    ///
    /// # Errors
    /// Returns [`PlatformError::Spawn`] if the process cannot be created and
    /// [`PlatformError::EarlyExit`] if it dies before becoming ready.
    pub async fn start(&mut self, env: Option<&EnvOverrides>) -> Result<()> {
        match self.restart_reason(env) {
            None if self.state == SupervisorState::Running => return Ok(()),
            None => {}
            Some(RestartReason::EnvChanged) => {
                tracing::info!("environment changed; restarting emulator");
                self.stop().await?;
            }
            Some(RestartReason::Exited) => {
                tracing::warn!("emulator exited unexpectedly; restarting");
                self.stop().await?;
            }
        }

        self.state = SupervisorState::Starting;
        self.baseline = Some(self.snapshot_or_empty());

        let result = self.spawn_and_wait(env).await;
        match result {
            Ok(()) => {
                self.adopt_worker();
                self.running_env = env.cloned();
                self.state = SupervisorState::Running;
                Ok(())
            }
            Err(e) => {
                self.release().await;
                Err(e)
            }
        }
    }

    async fn spawn_and_wait(&mut self, env: Option<&EnvOverrides>) -> Result<()> {
        let mut args = self.config.start_args.clone();

        if let Some(env) = env {
            let file = ScratchFile::write_json(&self.env_path, env)?;
            args.push(self.config.env_vars_flag.clone());
            args.push(file.path().display().to_string());
            self.env_file = Some(file);
        }

        if self.debug {
            args.push(self.config.debug_flag.clone());
            args.push(self.config.debug_port.to_string());
        }

        let mut child = Command::new(&self.config.program)
            .args(&args)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| PlatformError::spawn(format!("{}: {e}", self.config.program)))?;

        let pid = child.id().unwrap_or_default();
        tracing::info!(program = %self.config.program, pid = pid, args = ?args, "spawned emulator");

        let (ready_tx, mut ready_rx) = oneshot::channel();
        if let Some(stderr) = child.stderr.take() {
            self.pump = Some(tokio::spawn(pump_output(
                stderr,
                self.config.readiness_marker.clone(),
                ready_tx,
            )));
        }

        let readiness = tokio::select! {
            biased;
            Ok(()) = &mut ready_rx => Readiness::Marker,
            status = child.wait() => Readiness::Exited(status),
            () = tokio::time::sleep(self.config.readiness_timeout) => Readiness::Timeout,
        };
        // The marker line may still sit in the pump when the exit is reaped.
        let readiness = match readiness {
            Readiness::Exited(status) => {
                match tokio::time::timeout(MARKER_DRAIN, &mut ready_rx).await {
                    Ok(Ok(())) => Readiness::Marker,
                    _ => Readiness::Exited(status),
                }
            }
            other => other,
        };
        // Whichever way it resolved, nobody listens for the marker any more.
        drop(ready_rx);

        self.child = Some(child);

        match readiness {
            Readiness::Marker => {
                tracing::info!(pid = pid, "emulator ready");
                Ok(())
            }
            Readiness::Timeout => {
                tracing::warn!(
                    pid = pid,
                    timeout = ?self.config.readiness_timeout,
                    "readiness marker not seen; assuming emulator is ready"
                );
                Ok(())
            }
            Readiness::Exited(status) => {
                let detail = match status {
                    Ok(status) => status.to_string(),
                    Err(e) => e.to_string(),
                };
                Err(PlatformError::EarlyExit(detail))
            }
        }
    }

    /// Records the newest worker process that appeared since the baseline.
    fn adopt_worker(&mut self) {
        let Some(baseline) = &self.baseline else {
            return;
        };
        let own = self.pid();
        let fresh: BTreeSet<u32> = self
            .snapshot_or_empty()
            .difference(baseline)
            .copied()
            .filter(|pid| Some(*pid) != own)
            .collect();

        self.adopted = self.registry.newest(&fresh);
        if let Some(pid) = self.adopted {
            tracing::debug!(pid = pid, "adopted worker process");
        }
    }

    fn snapshot_or_empty(&self) -> BTreeSet<u32> {
        self.registry.snapshot().unwrap_or_else(|e| {
            tracing::warn!(error = %e, "process table unavailable");
            BTreeSet::new()
        })
    }

    /// Why the live emulator cannot serve `env`, if it cannot.
    fn restart_reason(&mut self, env: Option<&EnvOverrides>) -> Option<RestartReason> {
        if self.child.is_none() && self.adopted.is_none() {
            return None;
        }
        if self.running_env.as_ref() != env {
            return Some(RestartReason::EnvChanged);
        }
        if !self.child_alive() {
            return Some(RestartReason::Exited);
        }
        None
    }

    fn child_alive(&mut self) -> bool {
        self.child
            .as_mut()
            .is_some_and(|child| matches!(child.try_wait(), Ok(None)))
    }

    /// Stops the emulator and its adopted worker.
    ///
    /// # Errors
    /// Never fails in practice; signal errors are logged and teardown continues.
    pub async fn stop(&mut self) -> Result<()> {
        if self.state == SupervisorState::Stopped && self.child.is_none() && self.adopted.is_none()
        {
            return Ok(());
        }
        self.state = SupervisorState::Stopping;
        self.release().await;
        Ok(())
    }

    /// Releases the child, the adopted worker and the env file together.
    async fn release(&mut self) {
        if let Some(mut child) = self.child.take() {
            terminate_child(&mut child, self.config.stop_timeout).await;
        }

        if let Some(pid) = self.adopted.take() {
            // The worker may already be gone.
            if let Err(e) = self.registry.terminate(pid) {
                tracing::debug!(pid = pid, error = %e, "failed to terminate adopted worker");
            }
        }

        if let Some(pump) = self.pump.take() {
            pump.abort();
        }

        self.baseline = None;
        self.running_env = None;
        self.env_file = None;
        self.state = SupervisorState::Stopped;
    }
}

#[async_trait]
impl Emulator for Supervisor {
    async fn ensure_running(&mut self, env: Option<&EnvOverrides>) -> Result<()> {
        self.start(env).await
    }

    async fn stop(&mut self) -> Result<()> {
        Self::stop(self).await
    }

    fn state(&self) -> SupervisorState {
        self.state
    }
}

impl Drop for Supervisor {
    fn drop(&mut self) {
        // The child itself is killed by kill_on_drop.
        if let Some(pid) = self.adopted.take() {
            let _ = self.registry.terminate(pid);
        }
        if let Some(pump) = self.pump.take() {
            pump.abort();
        }
    }
}

/// SIGTERM, wait up to `grace`, then SIGKILL.
async fn terminate_child(child: &mut Child, grace: Duration) {
    if !matches!(child.try_wait(), Ok(None)) {
        return;
    }
    let Some(pid) = child.id() else {
        return;
    };

    send_term(child, pid);

    match tokio::time::timeout(grace, child.wait()).await {
        Ok(Ok(status)) => tracing::info!(pid = pid, status = %status, "emulator stopped"),
        Ok(Err(e)) => tracing::debug!(pid = pid, error = %e, "wait on emulator failed"),
        Err(_) => {
            tracing::warn!(pid = pid, "emulator ignored SIGTERM, sending SIGKILL");
            if let Err(e) = child.kill().await {
                tracing::debug!(pid = pid, error = %e, "SIGKILL failed, process may be dead");
            }
        }
    }
}

#[cfg(unix)]
fn send_term(_child: &mut Child, pid: u32) {
    use nix::sys::signal::{self, Signal};
    use nix::unistd::Pid;

    if let Err(e) = signal::kill(Pid::from_raw(pid as i32), Signal::SIGTERM) {
        tracing::debug!(pid = pid, error = %e, "SIGTERM failed");
    }
}

#[cfg(not(unix))]
fn send_term(child: &mut Child, pid: u32) {
    if let Err(e) = child.start_kill() {
        tracing::debug!(pid = pid, error = %e, "kill failed");
    }
}

/// Drains the emulator's stderr, firing `ready` once on the first marker line.
async fn pump_output<R>(stream: R, marker: String, ready: oneshot::Sender<()>)
where
    R: AsyncRead + Unpin,
{
    let mut ready = Some(ready);
    let mut lines = BufReader::new(stream).lines();

    loop {
        match lines.next_line().await {
            Ok(Some(line)) => {
                tracing::trace!(target: "samtest::emulator", "{line}");
                if line.contains(&marker) {
                    if let Some(tx) = ready.take() {
                        let _ = tx.send(());
                    }
                }
            }
            Ok(None) => break,
            Err(e) => {
                tracing::debug!(error = %e, "emulator output stream failed");
                break;
            }
        }
    }
}

#[cfg(test)]
#[cfg(unix)]
mod tests {
    use super::*;
    use crate::process::NullRegistry;
    use std::sync::Arc;
    use std::time::Instant;

    const MARKER: &str = "Running on http://127.0.0.1:3001/";

    fn script_config(script: &str) -> EmulatorConfig {
        EmulatorConfig {
            program: "sh".to_string(),
            start_args: vec!["-c".to_string(), script.to_string()],
            readiness_marker: "Running on".to_string(),
            readiness_timeout: Duration::from_secs(10),
            stop_timeout: Duration::from_secs(2),
            ..EmulatorConfig::default()
        }
    }

    fn ready_script() -> String {
        format!("echo 'starting' >&2; echo '{MARKER}' >&2; exec sleep 30")
    }

    fn supervisor(config: EmulatorConfig, dir: &tempfile::TempDir) -> Supervisor {
        Supervisor::new(config, dir.path().join("env.json"), Box::new(NullRegistry))
    }

    fn env(value: &str) -> EnvOverrides {
        let mut env = EnvOverrides::new();
        env.entry("messageReceiverAAAA1111".into())
            .or_default()
            .insert("FOO".into(), value.into());
        env
    }

    fn is_alive(pid: u32) -> bool {
        nix::sys::signal::kill(nix::unistd::Pid::from_raw(pid as i32), None).is_ok()
    }

    /// Registry fed from a script of snapshots, recording terminations.
    #[derive(Default)]
    struct ScriptedRegistry {
        snapshots: parking_lot::Mutex<Vec<BTreeSet<u32>>>,
        terminated: parking_lot::Mutex<Vec<u32>>,
    }

    struct Shared(Arc<ScriptedRegistry>);

    impl ProcessRegistry for Shared {
        fn snapshot(&self) -> Result<BTreeSet<u32>> {
            let mut snapshots = self.0.snapshots.lock();
            if snapshots.len() > 1 {
                Ok(snapshots.remove(0))
            } else {
                Ok(snapshots.first().cloned().unwrap_or_default())
            }
        }

        fn terminate(&self, pid: u32) -> Result<()> {
            self.0.terminated.lock().push(pid);
            Ok(())
        }
    }

    #[tokio::test]
    async fn test_start_on_marker_and_stop() {
        let dir = tempfile::tempdir().unwrap();
        let mut sup = supervisor(script_config(&ready_script()), &dir);
        assert_eq!(sup.state(), SupervisorState::Stopped);

        let started = Instant::now();
        sup.start(None).await.unwrap();
        assert!(started.elapsed() < Duration::from_secs(10));
        assert_eq!(sup.state(), SupervisorState::Running);

        let pid = sup.pid().unwrap();
        assert!(is_alive(pid));

        sup.stop().await.unwrap();
        assert_eq!(sup.state(), SupervisorState::Stopped);
        assert!(sup.pid().is_none());
        assert!(!is_alive(pid));
    }

    #[tokio::test]
    async fn test_timeout_resolves_start() {
        let dir = tempfile::tempdir().unwrap();
        let mut config = script_config("exec sleep 30");
        config.readiness_timeout = Duration::from_millis(300);
        let mut sup = supervisor(config, &dir);

        let started = Instant::now();
        sup.start(None).await.unwrap();
        assert!(started.elapsed() >= Duration::from_millis(300));
        assert_eq!(sup.state(), SupervisorState::Running);
        sup.stop().await.unwrap();
    }

    #[tokio::test]
    async fn test_spawn_error_rejects_immediately() {
        let dir = tempfile::tempdir().unwrap();
        let mut config = script_config("");
        config.program = "/nonexistent/emulator-binary".to_string();
        let mut sup = supervisor(config, &dir);

        let started = Instant::now();
        let err = sup.start(Some(&env("bar"))).await.unwrap_err();
        assert!(matches!(err, PlatformError::Spawn(_)));
        assert!(started.elapsed() < Duration::from_secs(5));
        assert_eq!(sup.state(), SupervisorState::Stopped);
        assert!(!dir.path().join("env.json").exists());
    }

    #[tokio::test]
    async fn test_early_exit_fails_start() {
        let dir = tempfile::tempdir().unwrap();
        let mut sup = supervisor(script_config("echo boom >&2; exit 3"), &dir);
        let err = sup.start(None).await.unwrap_err();
        assert!(matches!(err, PlatformError::EarlyExit(_)));
        assert_eq!(sup.state(), SupervisorState::Stopped);
    }

    #[tokio::test]
    async fn test_same_env_is_noop() {
        let dir = tempfile::tempdir().unwrap();
        let mut sup = supervisor(script_config(&ready_script()), &dir);

        sup.start(Some(&env("bar"))).await.unwrap();
        let first = sup.pid().unwrap();
        sup.start(Some(&env("bar"))).await.unwrap();
        assert_eq!(sup.pid(), Some(first));
        sup.stop().await.unwrap();
    }

    #[tokio::test]
    async fn test_env_change_restarts() {
        let dir = tempfile::tempdir().unwrap();
        let env_path = dir.path().join("env.json");
        let mut sup = supervisor(script_config(&ready_script()), &dir);

        sup.start(Some(&env("bar"))).await.unwrap();
        let first = sup.pid().unwrap();
        let written = std::fs::read_to_string(&env_path).unwrap();
        assert!(written.contains("\"bar\""));

        sup.start(Some(&env("baz"))).await.unwrap();
        let second = sup.pid().unwrap();
        assert_ne!(first, second);
        assert!(!is_alive(first));
        assert_eq!(sup.running_env(), Some(&env("baz")));
        let written = std::fs::read_to_string(&env_path).unwrap();
        assert!(written.contains("\"baz\""));

        sup.stop().await.unwrap();
        assert!(!env_path.exists());
    }

    #[tokio::test]
    async fn test_dropping_env_restarts() {
        let dir = tempfile::tempdir().unwrap();
        let mut sup = supervisor(script_config(&ready_script()), &dir);

        sup.start(Some(&env("bar"))).await.unwrap();
        let first = sup.pid().unwrap();
        sup.start(None).await.unwrap();
        assert_ne!(sup.pid(), Some(first));
        assert!(sup.running_env().is_none());
        sup.stop().await.unwrap();
    }

    #[tokio::test]
    async fn test_restarts_dead_emulator() {
        let dir = tempfile::tempdir().unwrap();
        let script = format!("echo '{MARKER}' >&2; sleep 0.2");
        let mut sup = supervisor(script_config(&script), &dir);

        sup.start(None).await.unwrap();
        let first = sup.pid().unwrap();
        tokio::time::sleep(Duration::from_millis(600)).await;

        // The marker fires before the process ends, so this start succeeds too.
        sup.start(None).await.unwrap();
        assert_ne!(sup.pid(), Some(first));
        sup.stop().await.unwrap();
    }

    #[tokio::test]
    async fn test_adopts_newest_worker_and_terminates_it() {
        let dir = tempfile::tempdir().unwrap();
        let scripted = Arc::new(ScriptedRegistry::default());
        *scripted.snapshots.lock() = vec![
            [4_194_310].into_iter().collect(),
            [4_194_310, 4_194_341, 4_194_342].into_iter().collect(),
        ];

        let mut sup = Supervisor::new(
            script_config(&ready_script()),
            dir.path().join("env.json"),
            Box::new(Shared(Arc::clone(&scripted))),
        );

        sup.start(None).await.unwrap();
        assert_eq!(sup.adopted_pid(), Some(4_194_342));

        sup.stop().await.unwrap();
        assert_eq!(sup.adopted_pid(), None);
        assert_eq!(*scripted.terminated.lock(), vec![4_194_342]);
    }

    #[tokio::test]
    async fn test_drop_terminates_adopted_worker() {
        let dir = tempfile::tempdir().unwrap();
        let scripted = Arc::new(ScriptedRegistry::default());
        *scripted.snapshots.lock() = vec![
            BTreeSet::new(),
            [4_194_351].into_iter().collect(),
        ];

        let mut sup = Supervisor::new(
            script_config(&ready_script()),
            dir.path().join("env.json"),
            Box::new(Shared(Arc::clone(&scripted))),
        );
        sup.start(None).await.unwrap();
        assert_eq!(sup.adopted_pid(), Some(4_194_351));

        drop(sup);
        assert_eq!(*scripted.terminated.lock(), vec![4_194_351]);
    }

    #[tokio::test]
    async fn test_marker_then_exit_counts_as_ready() {
        let dir = tempfile::tempdir().unwrap();
        let script = format!("echo '{MARKER}' >&2; exit 0");
        let mut sup = supervisor(script_config(&script), &dir);

        for _ in 0..20 {
            sup.start(None).await.unwrap();
            assert_eq!(sup.state(), SupervisorState::Running);
        }
        sup.stop().await.unwrap();
    }

    #[tokio::test]
    async fn test_restart_reason_tells_env_change_from_exit() {
        let dir = tempfile::tempdir().unwrap();
        let script = format!("echo '{MARKER}' >&2; sleep 1");
        let mut sup = supervisor(script_config(&script), &dir);
        assert_eq!(sup.restart_reason(None), None);

        sup.start(Some(&env("bar"))).await.unwrap();
        assert_eq!(sup.restart_reason(Some(&env("bar"))), None);
        assert_eq!(
            sup.restart_reason(Some(&env("baz"))),
            Some(RestartReason::EnvChanged)
        );
        assert_eq!(sup.restart_reason(None), Some(RestartReason::EnvChanged));

        tokio::time::sleep(Duration::from_millis(1600)).await;
        assert_eq!(
            sup.restart_reason(Some(&env("bar"))),
            Some(RestartReason::Exited)
        );

        sup.stop().await.unwrap();
        assert_eq!(sup.restart_reason(Some(&env("bar"))), None);
    }

    #[tokio::test]
    async fn test_stop_is_idempotent() {
        let dir = tempfile::tempdir().unwrap();
        let mut sup = supervisor(script_config(&ready_script()), &dir);
        sup.stop().await.unwrap();

        sup.start(None).await.unwrap();
        sup.stop().await.unwrap();
        sup.stop().await.unwrap();
        assert_eq!(sup.state(), SupervisorState::Stopped);
    }

    #[tokio::test]
    async fn test_sigkill_after_grace() {
        let dir = tempfile::tempdir().unwrap();
        let script = format!("trap '' TERM; echo '{MARKER}' >&2; while true; do sleep 1; done");
        let mut config = script_config(&script);
        config.stop_timeout = Duration::from_millis(200);
        let mut sup = supervisor(config, &dir);

        sup.start(None).await.unwrap();
        let pid = sup.pid().unwrap();
        sup.stop().await.unwrap();
        assert!(!is_alive(pid));
    }

    #[tokio::test]
    async fn test_debug_port_passed_to_emulator() {
        let dir = tempfile::tempdir().unwrap();
        let out = dir.path().join("args.txt");
        // With `sh -c script a b`, extra args land in $0 and $1.
        let script = format!(
            "printf '%s %s' \"$0\" \"$1\" > {}; echo '{MARKER}' >&2; exec sleep 30",
            out.display()
        );
        let mut sup = supervisor(script_config(&script), &dir).with_debug(true);

        sup.start(None).await.unwrap();
        let args = std::fs::read_to_string(&out).unwrap();
        assert_eq!(args.trim(), "-d 5858");
        sup.stop().await.unwrap();
    }

    #[tokio::test]
    async fn test_detached_emulator_is_inert() {
        let mut emulator = DetachedEmulator;
        emulator.ensure_running(Some(&env("x"))).await.unwrap();
        assert_eq!(emulator.state(), SupervisorState::Stopped);
        Emulator::stop(&mut emulator).await.unwrap();
    }
}
