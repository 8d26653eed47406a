#![forbid(unsafe_code)]

mod capability;
mod cli;
mod config;
mod constants;
mod effects;
mod gui;
mod logging;
mod panel;
mod registration;

use std::process::ExitCode;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use tracing::{Level, info, warn};

use capability::{CapabilityProbe, StaticProbe, SystemProbe};
use cli::{Cli, Command};
use config::ConfigPaths;
use logging::LogContext;
use panel::{ControlPanel, PanelOptions};
use registration::WindowsShell;

fn main() -> Result<ExitCode> {
    let cli = Cli::parse();

    let paths = ConfigPaths::resolve(cli.config_dir.clone())?;
    let log_level = cli::resolve_log_level(&cli, &paths);
    let log = LogContext::new(log_level, Some(&paths.log_file()));
    let _log_guard = log.install();
    log_startup(&paths, log_level);

    if !paths.portable {
        if let Err(e) = paths.stage_component() {
            warn!(error = ?e, "Failed to stage native component");
        }
    }

    let probe: Box<dyn CapabilityProbe> = match cli.os_version {
        Some(version) => {
            info!(%version, "Using OS version from command line");
            Box::new(StaticProbe(version))
        }
        None => Box::new(SystemProbe::detect()),
    };

    let command = cli.command.unwrap_or(Command::Gui);
    let options = PanelOptions {
        poll: command.needs_status().then(Default::default),
        ..Default::default()
    };
    let shell = Arc::new(WindowsShell::new(!cli.no_elevate));
    let mut panel = ControlPanel::start(&paths, probe.as_ref(), shell, log.clone(), options)
        .context("Failed to start control panel")?;

    if command == Command::Gui {
        gui::run_gui(panel)?;
        return Ok(ExitCode::SUCCESS);
    }

    let ok = cli::run_command(&mut panel, command, &mut std::io::stdout().lock())?;
    panel.shutdown();
    Ok(if ok { ExitCode::SUCCESS } else { ExitCode::FAILURE })
}

/// First record of a run; the subscriber must already be installed so the
/// config location reaches the log file
fn log_startup(paths: &ConfigPaths, level: Level) {
    info!(
        version = env!("CARGO_PKG_VERSION"),
        %level,
        config_dir = %paths.config_dir.display(),
        portable = paths.portable,
        "Starting explorer-fx"
    );
}
