//! OS commands behind registration
//!
//! Everything here blocks and must only be called off the control thread.

use std::io;
use std::path::Path;
use std::process::{Command, Output};
use tracing::{debug, info, warn};

use crate::constants::component::HOST_IMAGE;
use crate::registration::RegistrationAction;

/// `ERROR_CANCELLED`, reported when the UAC prompt is dismissed
const ELEVATION_DECLINED: i32 = 1223;

/// Captured result of an external command
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandOutput {
    pub success: bool,
    pub code: Option<i32>,
    /// stderr, or stdout when stderr is empty
    pub diagnostics: String,
}

impl From<Output> for CommandOutput {
    fn from(output: Output) -> Self {
        let stderr = String::from_utf8_lossy(&output.stderr).trim().to_string();
        let diagnostics = if stderr.is_empty() {
            String::from_utf8_lossy(&output.stdout).trim().to_string()
        } else {
            stderr
        };
        Self {
            success: output.status.success(),
            code: output.status.code(),
            diagnostics,
        }
    }
}

pub trait SystemShell: Send + Sync {
    /// Run the OS (un)registration primitive against `component`
    fn run_registration(&self, component: &Path, action: RegistrationAction)
    -> io::Result<CommandOutput>;

    /// Terminate the host process by image name
    fn kill_host(&self) -> io::Result<()>;

    /// Start the host process again, without waiting for it
    fn launch_host(&self) -> io::Result<()>;

    /// Module listing of the host process
    fn loaded_modules(&self) -> io::Result<String>;
}

/// `regsvr32`, `taskkill` and `tasklist`
#[derive(Debug, Clone, Copy)]
pub struct WindowsShell {
    elevate: bool,
}

impl WindowsShell {
    pub fn new(elevate: bool) -> Self {
        Self { elevate }
    }

    fn registration_command(&self, component: &Path, action: RegistrationAction) -> Command {
        let mut args = vec!["/s".to_string()];
        if action == RegistrationAction::Unregister {
            args.push("/u".to_string());
        }

        if !self.elevate {
            let mut cmd = command("regsvr32");
            cmd.args(&args).arg(component);
            return cmd;
        }

        // regsvr32 needs admin rights; RunAs raises a UAC prompt and the
        // wrapper forwards regsvr32's exit code. A declined prompt or a
        // missing process must never exit 0.
        args.push(format!("\"{}\"", component.display()));
        let arg_list = args
            .iter()
            .map(|a| format!("'{}'", a.replace('\'', "''")))
            .collect::<Vec<_>>()
            .join(",");
        let script = format!(
            "$ErrorActionPreference = 'Stop'; \
             try {{ $p = Start-Process -FilePath 'regsvr32.exe' -ArgumentList {arg_list} \
             -Verb RunAs -Wait -PassThru }} catch {{ exit {ELEVATION_DECLINED} }}; \
             if ($null -eq $p) {{ exit 1 }}; exit $p.ExitCode"
        );
        let mut cmd = command("powershell.exe");
        cmd.args(["-NoProfile", "-NonInteractive", "-Command", &script]);
        cmd
    }
}

impl SystemShell for WindowsShell {
    fn run_registration(
        &self,
        component: &Path,
        action: RegistrationAction,
    ) -> io::Result<CommandOutput> {
        info!(component = %component.display(), %action, elevate = self.elevate, "Running registration command");
        let output = self.registration_command(component, action).output()?;
        Ok(explain_declined(output.into()))
    }

    fn kill_host(&self) -> io::Result<()> {
        let output: CommandOutput = command("taskkill")
            .args(["/f", "/im", HOST_IMAGE])
            .output()?
            .into();
        if output.success {
            info!(image = HOST_IMAGE, "Host process terminated");
        } else {
            // Not running is fine; relaunch follows either way
            warn!(image = HOST_IMAGE, code = ?output.code, diagnostics = %output.diagnostics, "taskkill reported failure");
        }
        Ok(())
    }

    fn launch_host(&self) -> io::Result<()> {
        let child = Command::new(HOST_IMAGE).spawn()?;
        info!(pid = child.id(), image = HOST_IMAGE, "Host process relaunched");
        Ok(())
    }

    fn loaded_modules(&self) -> io::Result<String> {
        let filter = format!("IMAGENAME eq {HOST_IMAGE}");
        let output = command("tasklist")
            .args(["/M", "/FI", &filter, "/FO", "CSV", "/NH"])
            .output()?;
        if !output.status.success() {
            return Err(io::Error::other(format!(
                "tasklist exited with {:?}",
                output.status.code()
            )));
        }
        let listing = String::from_utf8_lossy(&output.stdout).into_owned();
        debug!(bytes = listing.len(), "Read host module listing");
        Ok(listing)
    }
}

fn explain_declined(mut output: CommandOutput) -> CommandOutput {
    if output.code == Some(ELEVATION_DECLINED) && output.diagnostics.is_empty() {
        output.diagnostics = "administrator permission was declined".to_string();
    }
    output
}

/// Console tools run without flashing a console window
fn command(program: &str) -> Command {
    #[allow(unused_mut)]
    let mut cmd = Command::new(program);
    #[cfg(windows)]
    {
        use std::os::windows::process::CommandExt;
        const CREATE_NO_WINDOW: u32 = 0x0800_0000;
        cmd.creation_flags(CREATE_NO_WINDOW);
    }
    cmd
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::ffi::OsStr;

    fn args(cmd: &Command) -> Vec<String> {
        cmd.get_args()
            .map(|a: &OsStr| a.to_string_lossy().into_owned())
            .collect()
    }

    #[test]
    fn test_plain_register_command() {
        let shell = WindowsShell::new(false);
        let cmd = shell.registration_command(Path::new("C:/fx/comp.dll"), RegistrationAction::Register);
        assert_eq!(cmd.get_program(), "regsvr32");
        assert_eq!(args(&cmd), vec!["/s", "C:/fx/comp.dll"]);
    }

    #[test]
    fn test_plain_unregister_command() {
        let shell = WindowsShell::new(false);
        let cmd = shell.registration_command(Path::new("comp.dll"), RegistrationAction::Unregister);
        assert_eq!(args(&cmd), vec!["/s", "/u", "comp.dll"]);
    }

    #[test]
    fn test_elevated_command_wraps_in_runas() {
        let shell = WindowsShell::new(true);
        let cmd = shell.registration_command(
            Path::new("C:/Program Files/fx/it's.dll"),
            RegistrationAction::Unregister,
        );
        assert_eq!(cmd.get_program(), "powershell.exe");
        let script = args(&cmd).pop().unwrap();
        assert!(script.contains("-Verb RunAs"));
        assert!(script.contains("'/s','/u','\"C:/Program Files/fx/it''s.dll\"'"));
        assert!(script.contains("exit $p.ExitCode"));
    }

    #[test]
    fn test_elevated_script_never_exits_zero_without_regsvr32() {
        let shell = WindowsShell::new(true);
        let cmd = shell.registration_command(Path::new("comp.dll"), RegistrationAction::Register);
        let script = args(&cmd).pop().unwrap();

        assert!(script.starts_with("$ErrorActionPreference = 'Stop';"));
        let start = script.find("try { $p = Start-Process").unwrap();
        let declined = script.find("catch { exit 1223 }").unwrap();
        let missing = script.find("if ($null -eq $p) { exit 1 }").unwrap();
        let forward = script.find("exit $p.ExitCode").unwrap();
        assert!(start < declined && declined < missing && missing < forward);
    }

    #[test]
    fn test_declined_elevation_is_explained() {
        let declined = CommandOutput {
            success: false,
            code: Some(1223),
            diagnostics: String::new(),
        };
        assert_eq!(
            explain_declined(declined).diagnostics,
            "administrator permission was declined"
        );

        let other = CommandOutput {
            success: false,
            code: Some(5),
            diagnostics: String::new(),
        };
        assert_eq!(explain_declined(other).diagnostics, "");
    }

    #[test]
    fn test_output_prefers_stderr() {
        #[cfg(unix)]
        let status = {
            use std::os::unix::process::ExitStatusExt;
            std::process::ExitStatus::from_raw(0)
        };
        #[cfg(windows)]
        let status = {
            use std::os::windows::process::ExitStatusExt;
            std::process::ExitStatus::from_raw(0)
        };
        let output = Output {
            status,
            stdout: b"out".to_vec(),
            stderr: b" err \n".to_vec(),
        };
        let captured = CommandOutput::from(output);
        assert!(captured.success);
        assert_eq!(captured.diagnostics, "err");
    }
}
