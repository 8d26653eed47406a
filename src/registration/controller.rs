//! Register/unregister state machine
//!
//! `Idle → Working(action) → Idle`. Only one operation runs at a time: a
//! request while working is ignored. The worker thread reports back through
//! the event channel and the control thread calls `finish` to return to idle.

use std::path::PathBuf;
use std::sync::mpsc::Sender;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};
use tracing::{error, info, warn};

use crate::constants::component::EXIT_RESTART_GRACE_MS;
use crate::logging::LogContext;
use crate::registration::poller::ForceCheck;
use crate::registration::{
    RegistrationAction, RegistrationError, RegistrationEvent, RegistrationReport,
    RegistrationResult, RegistrationState, SystemShell, query_state,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Idle,
    Working(RegistrationAction),
}

/// What happened to a request
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RequestOutcome {
    Started(RegistrationAction),
    /// Another operation is in flight; nothing was done
    Busy,
}

#[derive(Debug, Clone)]
pub struct RegistrationOptions {
    pub component: PathBuf,
    /// Pause between killing and relaunching the host
    pub settle: Duration,
}

impl RegistrationOptions {
    fn component_name(&self) -> String {
        self.component
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default()
    }
}

/// How far the worker has got, shared with the control thread so exit can
/// tell a pending command from a half-done host restart
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum WorkerStage {
    Command,
    Restarting,
    /// The panel is exiting; the worker must not start a restart
    Abandoned,
}

type SharedStage = Arc<Mutex<WorkerStage>>;

pub struct RegistrationController {
    shell: Arc<dyn SystemShell>,
    options: RegistrationOptions,
    phase: Phase,
    events: Sender<RegistrationEvent>,
    force_check: ForceCheck,
    log: LogContext,
    worker: Option<JoinHandle<()>>,
    stage: SharedStage,
}

impl RegistrationController {
    pub fn new(
        shell: Arc<dyn SystemShell>,
        options: RegistrationOptions,
        events: Sender<RegistrationEvent>,
        force_check: ForceCheck,
        log: LogContext,
    ) -> Self {
        Self {
            shell,
            options,
            phase: Phase::Idle,
            events,
            force_check,
            log,
            worker: None,
            stage: Arc::new(Mutex::new(WorkerStage::Command)),
        }
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    pub fn is_busy(&self) -> bool {
        matches!(self.phase, Phase::Working(_))
    }

    /// Flip registration based on the freshly observed state.
    ///
    /// Unknown is treated as unregistered; registering an already loaded
    /// component only restarts the host.
    pub fn toggle(&mut self, observed: RegistrationState) -> Result<RequestOutcome, RegistrationError> {
        let action = match observed {
            RegistrationState::Registered => RegistrationAction::Unregister,
            RegistrationState::Unregistered | RegistrationState::Unknown => RegistrationAction::Register,
        };
        self.request(action)
    }

    /// Start `action` on a worker thread unless one is already running
    pub fn request(&mut self, action: RegistrationAction) -> Result<RequestOutcome, RegistrationError> {
        if let Phase::Working(current) = self.phase {
            warn!(requested = %action, %current, "Registration already in progress, ignoring request");
            return Ok(RequestOutcome::Busy);
        }

        if !self.options.component.exists() {
            error!(component = %self.options.component.display(), "Native component not found");
            return Err(RegistrationError::ComponentMissing(self.options.component.clone()));
        }

        let shell = Arc::clone(&self.shell);
        let options = self.options.clone();
        let events = self.events.clone();
        let force_check = self.force_check.clone();
        let log = self.log.clone();
        let stage: SharedStage = Arc::new(Mutex::new(WorkerStage::Command));
        let worker_stage = Arc::clone(&stage);

        let handle = thread::Builder::new()
            .name(format!("{action}-worker"))
            .spawn(move || {
                log.in_scope(|| {
                    let result = run_operation(shell.as_ref(), &options, action, &worker_stage);
                    match &result {
                        Ok(report) => info!(%action, skipped = report.command_skipped, "Registration operation succeeded"),
                        Err(e) => error!(%action, error = %e, "Registration operation failed"),
                    }
                    force_check.request();
                    if events.send(RegistrationEvent::Finished(result)).is_err() {
                        warn!("Control thread gone, dropping registration result");
                    }
                })
            })
            .map_err(|source| RegistrationError::Spawn {
                command: "registration worker",
                source,
            })?;

        info!(%action, "Registration operation started");
        self.worker = Some(handle);
        self.stage = stage;
        self.phase = Phase::Working(action);
        Ok(RequestOutcome::Started(action))
    }

    /// Return to idle once the worker's result has been received
    pub fn finish(&mut self, result: &RegistrationResult) {
        if let Some(handle) = self.worker.take() {
            if handle.join().is_err() {
                error!("Registration worker panicked");
            }
        }
        match result {
            Ok(report) => info!(action = %report.action, "Registration finished"),
            Err(e) => warn!(error = %e, "Registration finished with error"),
        }
        self.phase = Phase::Idle;
    }

    /// Prepare for process exit.
    ///
    /// A worker that has already killed the host is waited for, bounded by
    /// the settle delay plus a grace period, so the host is relaunched. A
    /// worker still running its command is told to skip the restart.
    /// Returns false if a restart was still running at the deadline.
    pub fn prepare_exit(&mut self) -> bool {
        let Some(handle) = self.worker.as_ref() else {
            return true;
        };

        {
            let mut stage = lock(&self.stage);
            if *stage != WorkerStage::Restarting {
                if !handle.is_finished() {
                    warn!(phase = ?self.phase, "Exiting while a registration command is running, host restart will be skipped");
                }
                *stage = WorkerStage::Abandoned;
                return true;
            }
        }

        info!("Waiting for host restart before exit");
        let deadline =
            Instant::now() + self.options.settle + Duration::from_millis(EXIT_RESTART_GRACE_MS);
        while !handle.is_finished() {
            if Instant::now() >= deadline {
                return false;
            }
            thread::sleep(Duration::from_millis(10));
        }

        if let Some(handle) = self.worker.take() {
            if handle.join().is_err() {
                error!("Registration worker panicked");
            }
        }
        self.phase = Phase::Idle;
        true
    }
}

fn lock(stage: &Mutex<WorkerStage>) -> MutexGuard<'_, WorkerStage> {
    stage.lock().unwrap_or_else(PoisonError::into_inner)
}

/// The worker body: command, then host restart only if the command worked
fn run_operation(
    shell: &dyn SystemShell,
    options: &RegistrationOptions,
    action: RegistrationAction,
    stage: &Mutex<WorkerStage>,
) -> RegistrationResult {
    let mut command_skipped = false;

    let already_loaded = action == RegistrationAction::Register
        && matches!(
            query_state(shell, &options.component_name()),
            Ok(RegistrationState::Registered)
        );

    if already_loaded {
        info!(component = %options.component.display(), "Component already loaded, skipping registration command");
        command_skipped = true;
    } else {
        let output = shell
            .run_registration(&options.component, action)
            .map_err(|source| RegistrationError::Spawn {
                command: "regsvr32",
                source,
            })?;
        if !output.success {
            let detail = if output.diagnostics.is_empty() {
                format!("exit code {:?}", output.code)
            } else {
                output.diagnostics
            };
            return Err(RegistrationError::CommandFailed {
                action,
                output: detail,
            });
        }
    }

    {
        let mut stage = lock(stage);
        if *stage == WorkerStage::Abandoned {
            warn!(%action, "Exiting, leaving host untouched");
            return Err(RegistrationError::Abandoned(action));
        }
        *stage = WorkerStage::Restarting;
    }

    shell.kill_host().map_err(RegistrationError::HostRestart)?;
    thread::sleep(options.settle);
    shell.launch_host().map_err(RegistrationError::HostRestart)?;

    Ok(RegistrationReport {
        action,
        command_skipped,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::registration::fake::FakeShell;
    use std::sync::atomic::Ordering;
    use std::sync::mpsc::{self, Receiver};

    const TIMEOUT: Duration = Duration::from_secs(5);

    struct Harness {
        _dir: tempfile::TempDir,
        shell: Arc<FakeShell>,
        controller: RegistrationController,
        events: Receiver<RegistrationEvent>,
        force: ForceCheck,
    }

    fn harness(component_exists: bool) -> Harness {
        harness_with_settle(component_exists, Duration::ZERO)
    }

    fn harness_with_settle(component_exists: bool, settle: Duration) -> Harness {
        let dir = tempfile::tempdir().unwrap();
        let component = dir.path().join("ExplorerBlurMica.dll");
        if component_exists {
            std::fs::write(&component, b"dll").unwrap();
        }
        let shell = Arc::new(FakeShell::default());
        let (tx, rx) = mpsc::channel();
        let force = ForceCheck::default();
        let options = RegistrationOptions { component, settle };
        let controller = RegistrationController::new(
            shell.clone(),
            options,
            tx,
            force.clone(),
            LogContext::disabled(),
        );
        Harness {
            _dir: dir,
            shell,
            controller,
            events: rx,
            force,
        }
    }

    fn wait_finished(h: &mut Harness) -> RegistrationResult {
        match h.events.recv_timeout(TIMEOUT).unwrap() {
            RegistrationEvent::Finished(result) => {
                h.controller.finish(&result);
                result
            }
            other => panic!("unexpected event {other:?}"),
        }
    }

    #[test]
    fn test_missing_component_aborts_without_side_effects() {
        let mut h = harness(false);
        let result = h.controller.toggle(RegistrationState::Unregistered);
        assert!(matches!(result, Err(RegistrationError::ComponentMissing(_))));
        assert_eq!(h.controller.phase(), Phase::Idle);
        assert!(h.shell.calls().is_empty());
        assert_eq!(h.shell.count("kill"), 0);
        assert_eq!(h.shell.count("launch"), 0);
    }

    #[test]
    fn test_register_success_restarts_host_and_forces_check() {
        let mut h = harness(true);
        let outcome = h.controller.toggle(RegistrationState::Unregistered).unwrap();
        assert_eq!(outcome, RequestOutcome::Started(RegistrationAction::Register));
        assert_eq!(h.controller.phase(), Phase::Working(RegistrationAction::Register));

        let report = wait_finished(&mut h).unwrap();
        assert!(!report.command_skipped);
        assert_eq!(h.controller.phase(), Phase::Idle);

        let calls = h.shell.calls();
        assert!(calls[0].starts_with("register "));
        assert_eq!(&calls[1..], ["kill", "launch"]);
        assert!(h.force.is_requested());
    }

    #[test]
    fn test_toggle_registered_unregisters() {
        let mut h = harness(true);
        h.shell.set_loaded(true);
        let outcome = h.controller.toggle(RegistrationState::Registered).unwrap();
        assert_eq!(outcome, RequestOutcome::Started(RegistrationAction::Unregister));
        wait_finished(&mut h).unwrap();
        assert_eq!(h.shell.count("unregister"), 1);
    }

    #[test]
    fn test_command_failure_skips_restart() {
        let mut h = harness(true);
        h.shell.register_succeeds.store(false, Ordering::SeqCst);
        h.controller.request(RegistrationAction::Register).unwrap();
        let result = wait_finished(&mut h);
        match result {
            Err(RegistrationError::CommandFailed { action, output }) => {
                assert_eq!(action, RegistrationAction::Register);
                assert_eq!(output, "access denied");
            }
            other => panic!("unexpected result {other:?}"),
        }
        assert_eq!(h.shell.count("kill"), 0);
        assert_eq!(h.shell.count("launch"), 0);
        assert_eq!(h.controller.phase(), Phase::Idle);
    }

    #[test]
    fn test_register_when_loaded_only_restarts() {
        let mut h = harness(true);
        h.shell.set_loaded(true);
        h.controller.request(RegistrationAction::Register).unwrap();
        let report = wait_finished(&mut h).unwrap();
        assert!(report.command_skipped);
        assert_eq!(h.shell.calls(), vec!["kill", "launch"]);
    }

    #[test]
    fn test_second_toggle_while_working_is_ignored() {
        let mut h = harness(true);
        let (release, gate) = mpsc::channel();
        *h.shell.gate.lock().unwrap() = Some(gate);

        h.controller.toggle(RegistrationState::Unregistered).unwrap();
        let second = h.controller.toggle(RegistrationState::Unregistered).unwrap();
        assert_eq!(second, RequestOutcome::Busy);
        assert_eq!(h.controller.phase(), Phase::Working(RegistrationAction::Register));
        assert!(h.events.try_recv().is_err());

        release.send(()).unwrap();
        wait_finished(&mut h).unwrap();
        assert_eq!(h.shell.count("register"), 1);
        assert_eq!(h.shell.count("kill"), 1);
        assert!(h.events.try_recv().is_err());
    }

    #[test]
    fn test_can_run_again_after_finish() {
        let mut h = harness(true);
        h.controller.request(RegistrationAction::Register).unwrap();
        wait_finished(&mut h).unwrap();
        let again = h.controller.request(RegistrationAction::Unregister).unwrap();
        assert_eq!(again, RequestOutcome::Started(RegistrationAction::Unregister));
        wait_finished(&mut h).unwrap();
    }

    #[test]
    fn test_exit_waits_for_host_relaunch() {
        let mut h = harness_with_settle(true, Duration::from_millis(300));
        h.controller.request(RegistrationAction::Register).unwrap();

        let deadline = Instant::now() + TIMEOUT;
        while h.shell.count("kill") == 0 {
            assert!(Instant::now() < deadline, "host was never killed");
            thread::sleep(Duration::from_millis(5));
        }

        assert!(h.controller.prepare_exit());
        assert_eq!(h.shell.count("launch"), 1);
        assert_eq!(h.controller.phase(), Phase::Idle);
    }

    #[test]
    fn test_exit_during_command_skips_restart() {
        let mut h = harness(true);
        let (release, gate) = mpsc::channel();
        *h.shell.gate.lock().unwrap() = Some(gate);
        h.controller.request(RegistrationAction::Register).unwrap();

        assert!(h.controller.prepare_exit());
        release.send(()).unwrap();

        let result = wait_finished(&mut h);
        assert!(matches!(
            result,
            Err(RegistrationError::Abandoned(RegistrationAction::Register))
        ));
        assert_eq!(h.shell.count("register"), 1);
        assert_eq!(h.shell.count("kill"), 0);
        assert_eq!(h.shell.count("launch"), 0);
    }

    #[test]
    fn test_exit_when_idle_returns_immediately() {
        let mut h = harness(true);
        assert!(h.controller.prepare_exit());
        h.controller.request(RegistrationAction::Register).unwrap();
        wait_finished(&mut h).unwrap();
        assert!(h.controller.prepare_exit());
    }
}
