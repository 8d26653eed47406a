//! Command-line interface
//!
//! Without a subcommand the desktop panel opens. The other subcommands run
//! against the same control panel core and print to stdout.

use std::io::Write;
use std::path::PathBuf;
use std::time::Duration;

use anyhow::Result;
use clap::{Parser, Subcommand};
use tracing::Level;

use crate::capability::OsVersion;
use crate::config::ConfigPaths;
use crate::config::document::ConfigDocument;
use crate::constants::keys;
use crate::effects::{Effect, EffectOption};
use crate::logging;
use crate::panel::ControlPanel;
use crate::registration::{RegistrationAction, RegistrationState, RequestOutcome};

/// Registration may sit behind a UAC prompt
const REGISTRATION_TIMEOUT: Duration = Duration::from_secs(120);
const STATUS_TIMEOUT: Duration = Duration::from_secs(10);

/// explorer-fx - blur and mica effects for File Explorer
#[derive(Debug, Parser)]
#[command(name = "explorer-fx")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<Command>,

    /// Directory holding config.json, the log and the staged component
    #[arg(long, global = true, value_name = "DIR")]
    pub config_dir: Option<PathBuf>,

    /// TRACE, DEBUG, INFO, WARN or ERROR (overrides LOG_LEVEL and the saved level)
    #[arg(long, global = true, value_name = "LEVEL")]
    pub log_level: Option<String>,

    /// Run the registration command without requesting elevation
    #[arg(long, global = true)]
    pub no_elevate: bool,

    /// Pretend to run on this Windows version instead of querying it
    #[arg(long, global = true, value_name = "MAJOR.MINOR.BUILD", value_parser = parse_os_version)]
    pub os_version: Option<OsVersion>,
}

#[derive(Debug, Clone, PartialEq, Eq, Subcommand)]
pub enum Command {
    /// Open the control panel window (default)
    Gui,
    /// Show whether the component is loaded in Explorer
    Status,
    /// Register the component and restart Explorer
    Install,
    /// Unregister the component and restart Explorer
    Uninstall,
    /// Install if not loaded, uninstall otherwise
    Toggle,
    /// Print a config value
    Get { section: String, key: String },
    /// Change a config value
    Set {
        section: String,
        key: String,
        value: String,
    },
    /// Manage color presets
    Preset {
        #[command(subcommand)]
        command: PresetCommand,
    },
    /// Restore default settings and presets
    Reset,
}

#[derive(Debug, Clone, PartialEq, Eq, Subcommand)]
pub enum PresetCommand {
    /// List presets, marking the active one
    List,
    /// Apply a preset to both themes
    Apply { name: String },
    /// Save the current colors as a preset
    Save { name: String },
    /// Delete a user preset
    Delete { name: String },
}

impl Command {
    /// Commands that need ground truth from the status poller
    pub fn needs_status(&self) -> bool {
        matches!(
            self,
            Command::Gui | Command::Status | Command::Install | Command::Uninstall | Command::Toggle
        )
    }
}

fn parse_os_version(text: &str) -> Result<OsVersion, String> {
    OsVersion::parse(text).ok_or_else(|| format!("expected MAJOR.MINOR.BUILD, got '{text}'"))
}

/// `--log-level`, then `LOG_LEVEL`, then the level saved in the store
pub fn resolve_log_level(cli: &Cli, paths: &ConfigPaths) -> Level {
    if let Some(level) = &cli.log_level {
        return logging::parse_level(level);
    }
    if let Ok(level) = std::env::var("LOG_LEVEL") {
        return logging::parse_level(&level);
    }
    let saved = std::fs::read_to_string(paths.config_file())
        .ok()
        .and_then(|text| ConfigDocument::from_json(&text).ok())
        .and_then(|doc| doc.get(keys::GUI, keys::LOG_LEVEL).map(str::to_owned));
    logging::parse_level(saved.as_deref().unwrap_or_default())
}

/// Run a non-GUI command; returns false when it failed
pub fn run_command(panel: &mut ControlPanel, command: Command, out: &mut impl Write) -> Result<bool> {
    let ok = match command {
        Command::Gui => anyhow::bail!("the GUI is not a console command"),
        Command::Status => {
            let state = panel.wait_for_status(STATUS_TIMEOUT);
            writeln!(out, "Component: {}", state.label())?;
            writeln!(out, "Effect:    {}", panel.selected_effect().label())?;
            writeln!(out, "Windows:   {}", panel.os_version())?;
            state != RegistrationState::Unknown
        }
        Command::Install => registration(panel, Some(RegistrationAction::Register), out)?,
        Command::Uninstall => registration(panel, Some(RegistrationAction::Unregister), out)?,
        Command::Toggle => registration(panel, None, out)?,
        Command::Get { section, key } => {
            writeln!(out, "{}", panel.store().get(&section, &key))?;
            true
        }
        Command::Set { section, key, value } => set_value(panel, &section, &key, &value, out)?,
        Command::Preset { command } => preset(panel, command, out)?,
        Command::Reset => match panel.reset_to_defaults() {
            Ok(()) => {
                writeln!(out, "Settings reset to defaults")?;
                true
            }
            Err(e) => {
                writeln!(out, "Reset failed: {e}")?;
                false
            }
        },
    };
    Ok(ok)
}

fn registration(
    panel: &mut ControlPanel,
    action: Option<RegistrationAction>,
    out: &mut impl Write,
) -> Result<bool> {
    let requested = match action {
        Some(RegistrationAction::Register) => panel.install(),
        Some(RegistrationAction::Unregister) => panel.uninstall(),
        None => {
            panel.wait_for_status(STATUS_TIMEOUT);
            panel.toggle()
        }
    };

    match requested {
        Ok(RequestOutcome::Started(action)) => writeln!(out, "Running {action}...")?,
        Ok(RequestOutcome::Busy) => {
            writeln!(out, "Another operation is already running")?;
            return Ok(false);
        }
        Err(e) => {
            writeln!(out, "Error: {e}")?;
            return Ok(false);
        }
    }

    match panel.wait_for_registration(REGISTRATION_TIMEOUT) {
        Some(Ok(report)) => {
            if report.command_skipped {
                writeln!(out, "Component already loaded, Explorer restarted")?;
            } else {
                writeln!(out, "Done: {}, Explorer restarted", report.action)?;
            }
            Ok(true)
        }
        Some(Err(e)) => {
            writeln!(out, "Error: {e}")?;
            Ok(false)
        }
        None => {
            writeln!(out, "Timed out waiting for the operation to finish")?;
            Ok(false)
        }
    }
}

/// Route `set` through the same checks as the window: gated effects and
/// options, colors written to both themes, validated flags and levels.
/// Keys without a dedicated setter are stored verbatim.
fn set_value(
    panel: &mut ControlPanel,
    section: &str,
    key: &str,
    value: &str,
    out: &mut impl Write,
) -> Result<bool> {
    match (section, key) {
        (keys::CONFIG, keys::EFFECT) => {
            let Some(effect) = Effect::from_id(value) else {
                writeln!(out, "Unknown effect id '{value}'")?;
                return Ok(false);
            };
            if !panel.set_effect(effect) {
                writeln!(out, "{} is not supported on Windows {}", effect.label(), panel.os_version())?;
                return Ok(false);
            }
        }
        (keys::CONFIG, _) => match EffectOption::from_key(key) {
            Some(option) => {
                let Some(enabled) = parse_flag(value) else {
                    writeln!(out, "Expected true or false, got '{value}'")?;
                    return Ok(false);
                };
                if !panel.set_option(option, enabled) {
                    writeln!(out, "{} is not supported on Windows {}", option.label(), panel.os_version())?;
                    return Ok(false);
                }
            }
            None => panel.store_mut().set(section, key, value),
        },
        (keys::LIGHT | keys::DARK, _) if keys::COLOR_KEYS.contains(&key) => {
            let Ok(component) = value.trim().parse::<u8>() else {
                writeln!(out, "Color components must be 0-255, got '{value}'")?;
                return Ok(false);
            };
            panel.set_color(key, component);
        }
        (keys::GUI, keys::SHOW_UNSUPPORTED_EFFECTS | keys::SHOW_UNSUPPORTED_OPTIONS) => {
            let Some(show) = parse_flag(value) else {
                writeln!(out, "Expected true or false, got '{value}'")?;
                return Ok(false);
            };
            if key == keys::SHOW_UNSUPPORTED_EFFECTS {
                panel.set_show_unsupported_effects(show);
            } else {
                panel.set_show_unsupported_options(show);
            }
        }
        (keys::GUI, keys::LOG_LEVEL) => {
            let Ok(level) = value.trim().parse::<Level>() else {
                writeln!(out, "Unknown log level '{value}'")?;
                return Ok(false);
            };
            panel.set_log_level(level);
        }
        (keys::GUI, keys::LAST_PRESET) => {
            if !panel.apply_preset(value) {
                writeln!(out, "No preset named '{value}'")?;
                return Ok(false);
            }
        }
        _ => panel.store_mut().set(section, key, value),
    }
    writeln!(out, "{section}.{key} = {}", panel.store().get(section, key))?;
    Ok(true)
}

fn parse_flag(value: &str) -> Option<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "true" | "1" | "on" => Some(true),
        "false" | "0" | "off" => Some(false),
        _ => None,
    }
}

fn preset(panel: &mut ControlPanel, command: PresetCommand, out: &mut impl Write) -> Result<bool> {
    let ok = match command {
        PresetCommand::List => {
            let current = panel.last_preset();
            for name in panel.preset_names() {
                let marker = if current.as_deref() == Some(name.as_str()) { '*' } else { ' ' };
                let colors = panel.preset(&name).map(|p| p.colors).unwrap_or_default();
                writeln!(
                    out,
                    "{marker} {name} ({}, {}, {}, {})",
                    colors.r, colors.g, colors.b, colors.a
                )?;
            }
            true
        }
        PresetCommand::Apply { name } => {
            let applied = panel.apply_preset(&name);
            if applied {
                writeln!(out, "Applied '{name}'")?;
            } else {
                writeln!(out, "No preset named '{name}'")?;
            }
            applied
        }
        PresetCommand::Save { name } => match panel.save_preset(&name) {
            Some(stored) => {
                writeln!(out, "Saved '{stored}'")?;
                true
            }
            None => {
                writeln!(out, "Preset name cannot be empty")?;
                false
            }
        },
        PresetCommand::Delete { name } => match panel.delete_preset(&name) {
            Ok(()) => {
                writeln!(out, "Deleted '{name}'")?;
                true
            }
            Err(e) => {
                writeln!(out, "Error: {e}")?;
                false
            }
        },
    };
    Ok(ok)
}
