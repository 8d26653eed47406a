//! Native component registration
//!
//! - **shell**: the OS commands (register, kill/relaunch host, module query)
//! - **controller**: single-flight register/unregister state machine
//! - **poller**: background ground-truth status checks

pub mod controller;
pub mod poller;
pub mod shell;

use std::fmt;
use std::io;
use std::path::PathBuf;

pub use controller::{Phase, RegistrationController, RegistrationOptions, RequestOutcome};
pub use poller::{ForceCheck, PollerTiming, StatusPoller};
pub use shell::{SystemShell, WindowsShell};

/// Whether the component is loaded in the host process, as last observed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RegistrationState {
    #[default]
    Unknown,
    Registered,
    Unregistered,
}

impl RegistrationState {
    pub fn from_loaded(loaded: bool) -> Self {
        if loaded {
            RegistrationState::Registered
        } else {
            RegistrationState::Unregistered
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            RegistrationState::Unknown => "Checking...",
            RegistrationState::Registered => "Initialized",
            RegistrationState::Unregistered => "Not Initialized",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RegistrationAction {
    Register,
    Unregister,
}

impl fmt::Display for RegistrationAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RegistrationAction::Register => f.write_str("register"),
            RegistrationAction::Unregister => f.write_str("unregister"),
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum RegistrationError {
    #[error("native component not found at {0:?}")]
    ComponentMissing(PathBuf),
    #[error("{action} command failed: {output}")]
    CommandFailed {
        action: RegistrationAction,
        output: String,
    },
    #[error("failed to run {command}: {source}")]
    Spawn {
        command: &'static str,
        #[source]
        source: io::Error,
    },
    #[error("failed to restart host process: {0}")]
    HostRestart(#[source] io::Error),
    #[error("{0} finished during shutdown, host restart skipped")]
    Abandoned(RegistrationAction),
}

/// Successful (un)registration
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RegistrationReport {
    pub action: RegistrationAction,
    /// Register was requested while already loaded; only the host restarted
    pub command_skipped: bool,
}

pub type RegistrationResult = Result<RegistrationReport, RegistrationError>;

/// One-way notifications from background tasks to the control thread
#[derive(Debug)]
pub enum RegistrationEvent {
    Status(RegistrationState),
    Finished(RegistrationResult),
}

/// Query ground truth: is `component_name` among the host's loaded modules
pub fn query_state(shell: &dyn SystemShell, component_name: &str) -> io::Result<RegistrationState> {
    let listing = shell.loaded_modules()?;
    let needle = component_name.to_lowercase();
    Ok(RegistrationState::from_loaded(
        listing.to_lowercase().contains(&needle),
    ))
}

#[cfg(test)]
pub(crate) mod fake {
    //! Recording shell used by controller, poller and panel tests

    use super::*;
    use super::shell::CommandOutput;
    use std::path::Path;
    use std::sync::Mutex;
    use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
    use std::sync::mpsc::Receiver;

    pub struct FakeShell {
        pub calls: Mutex<Vec<String>>,
        pub modules: Mutex<String>,
        pub register_succeeds: AtomicBool,
        pub queries: AtomicUsize,
        pub fail_queries: AtomicBool,
        /// When set, `run_registration` blocks until a message arrives
        pub gate: Mutex<Option<Receiver<()>>>,
    }

    impl Default for FakeShell {
        fn default() -> Self {
            Self {
                calls: Mutex::new(Vec::new()),
                modules: Mutex::new(String::from("\"explorer.exe\",\"1234\",\"ntdll.dll,KERNEL32.DLL\"")),
                register_succeeds: AtomicBool::new(true),
                queries: AtomicUsize::new(0),
                fail_queries: AtomicBool::new(false),
                gate: Mutex::new(None),
            }
        }
    }

    impl FakeShell {
        pub fn calls(&self) -> Vec<String> {
            self.calls.lock().unwrap().clone()
        }

        pub fn count(&self, prefix: &str) -> usize {
            self.calls().iter().filter(|c| c.starts_with(prefix)).count()
        }

        pub fn set_loaded(&self, loaded: bool) {
            let mut modules = self.modules.lock().unwrap();
            *modules = if loaded {
                "\"explorer.exe\",\"1234\",\"ntdll.dll,ExplorerBlurMica.dll\"".to_string()
            } else {
                "\"explorer.exe\",\"1234\",\"ntdll.dll\"".to_string()
            };
        }
    }

    impl SystemShell for FakeShell {
        fn run_registration(
            &self,
            component: &Path,
            action: RegistrationAction,
        ) -> io::Result<CommandOutput> {
            let gate = self.gate.lock().unwrap().take();
            if let Some(gate) = gate {
                let _ = gate.recv();
            }
            self.calls
                .lock()
                .unwrap()
                .push(format!("{action} {}", component.display()));
            let success = self.register_succeeds.load(Ordering::SeqCst);
            Ok(CommandOutput {
                success,
                code: Some(if success { 0 } else { 5 }),
                diagnostics: if success { String::new() } else { "access denied".to_string() },
            })
        }

        fn kill_host(&self) -> io::Result<()> {
            self.calls.lock().unwrap().push("kill".to_string());
            Ok(())
        }

        fn launch_host(&self) -> io::Result<()> {
            self.calls.lock().unwrap().push("launch".to_string());
            Ok(())
        }

        fn loaded_modules(&self) -> io::Result<String> {
            self.queries.fetch_add(1, Ordering::SeqCst);
            if self.fail_queries.load(Ordering::SeqCst) {
                return Err(io::Error::other("tasklist unavailable"));
            }
            Ok(self.modules.lock().unwrap().clone())
        }
    }
}
