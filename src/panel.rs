//! Control panel core shared by the GUI and the CLI
//!
//! Owns the config store and the registration machinery on the control
//! thread. Background tasks talk to it only through the event channel,
//! drained by `pump`.

use std::sync::Arc;
use std::sync::mpsc::{self, Receiver};
use std::time::{Duration, Instant};

use anyhow::{Context, Result};
use tracing::{Level, error, info, warn};

use crate::capability::{CapabilityProbe, OsVersion};
use crate::config::presets::Preset;
use crate::config::{ConfigError, ConfigPaths, ConfigStore, PresetError, Rgba};
use crate::constants::{component, keys};
use crate::effects::{self, Effect, EffectOption};
use crate::logging::{self, LogContext};
use crate::registration::{
    ForceCheck, PollerTiming, RegistrationAction, RegistrationController, RegistrationError,
    RegistrationEvent, RegistrationOptions, RegistrationResult, RegistrationState, RequestOutcome,
    StatusPoller, SystemShell,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NoticeLevel {
    Info,
    Error,
}

/// Last user-facing message
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notice {
    pub level: NoticeLevel,
    pub text: String,
}

impl Notice {
    fn info(text: impl Into<String>) -> Self {
        Self {
            level: NoticeLevel::Info,
            text: text.into(),
        }
    }

    fn error(text: impl Into<String>) -> Self {
        Self {
            level: NoticeLevel::Error,
            text: text.into(),
        }
    }
}

#[derive(Debug, Clone, Copy)]
pub struct PanelOptions {
    /// `None` disables background status checks
    pub poll: Option<PollerTiming>,
    pub settle: Duration,
}

impl Default for PanelOptions {
    fn default() -> Self {
        Self {
            poll: Some(PollerTiming::default()),
            settle: Duration::from_millis(component::HOST_SETTLE_MS),
        }
    }
}

pub struct ControlPanel {
    store: ConfigStore,
    os: OsVersion,
    controller: RegistrationController,
    poller: Option<StatusPoller>,
    events: Receiver<RegistrationEvent>,
    status: RegistrationState,
    notice: Option<Notice>,
}

impl ControlPanel {
    pub fn start(
        paths: &ConfigPaths,
        probe: &dyn CapabilityProbe,
        shell: Arc<dyn SystemShell>,
        log: LogContext,
        options: PanelOptions,
    ) -> Result<Self> {
        let mut store = ConfigStore::load(paths);
        let os = probe.capabilities();
        let mut notice = None;

        if let Some(effect) = effects::reconcile_effect(&mut store, &os) {
            notice = Some(Notice::info(format!(
                "Selected effect is not supported on this system, switched to {}",
                effect.label()
            )));
        }
        restore_last_preset(&mut store);

        let (tx, events) = mpsc::channel();
        let force_check = ForceCheck::default();
        let registration = RegistrationOptions {
            component: paths.component_file(),
            settle: options.settle,
        };
        let controller = RegistrationController::new(
            Arc::clone(&shell),
            registration,
            tx.clone(),
            force_check.clone(),
            log.clone(),
        );

        let poller = match options.poll {
            Some(timing) => Some(
                StatusPoller::spawn(
                    shell,
                    component::FILENAME.to_string(),
                    timing,
                    force_check,
                    tx,
                    log,
                )
                .context("Failed to start status poller")?,
            ),
            None => None,
        };

        info!(os = %os, polling = poller.is_some(), "Control panel started");
        Ok(Self {
            store,
            os,
            controller,
            poller,
            events,
            status: RegistrationState::Unknown,
            notice,
        })
    }

    /// Drain background events and drive the debounce timer.
    ///
    /// Returns true when something visible changed.
    pub fn pump(&mut self, now: Instant) -> bool {
        let mut changed = false;
        while let Ok(event) = self.events.try_recv() {
            self.handle_event(event);
            changed = true;
        }
        self.store.tick(now);
        changed
    }

    /// How long the owner may sleep before `pump` has work to do
    pub fn next_wakeup(&self, now: Instant, idle: Duration) -> Duration {
        self.store
            .next_deadline(now)
            .map_or(idle, |deadline| deadline.min(idle))
    }

    fn handle_event(&mut self, event: RegistrationEvent) -> Option<RegistrationResult> {
        match event {
            RegistrationEvent::Status(state) => {
                if state != self.status {
                    info!(from = ?self.status, to = ?state, "Registration state changed");
                }
                self.status = state;
                None
            }
            RegistrationEvent::Finished(result) => {
                self.controller.finish(&result);
                self.notice = Some(match &result {
                    Ok(report) if report.command_skipped => {
                        Notice::info("Already installed, Explorer restarted")
                    }
                    Ok(report) => match report.action {
                        RegistrationAction::Register => {
                            Notice::info("Installed successfully, Explorer restarted")
                        }
                        RegistrationAction::Unregister => {
                            Notice::info("Uninstalled successfully, Explorer restarted")
                        }
                    },
                    Err(e) => Notice::error(e.to_string()),
                });
                Some(result)
            }
        }
    }

    pub fn status(&self) -> RegistrationState {
        self.status
    }

    /// Busy action, if a registration operation is in flight
    pub fn working(&self) -> Option<RegistrationAction> {
        match self.controller.phase() {
            crate::registration::Phase::Working(action) => Some(action),
            crate::registration::Phase::Idle => None,
        }
    }

    pub fn notice(&self) -> Option<&Notice> {
        self.notice.as_ref()
    }

    pub fn clear_notice(&mut self) {
        self.notice = None;
    }

    pub fn os_version(&self) -> OsVersion {
        self.os
    }

    pub fn store(&self) -> &ConfigStore {
        &self.store
    }

    pub fn store_mut(&mut self) -> &mut ConfigStore {
        &mut self.store
    }

    /// Flip registration based on the latest polled state
    pub fn toggle(&mut self) -> Result<RequestOutcome, RegistrationError> {
        let outcome = self.controller.toggle(self.status);
        self.note_request(outcome)
    }

    pub fn install(&mut self) -> Result<RequestOutcome, RegistrationError> {
        let outcome = self.controller.request(RegistrationAction::Register);
        self.note_request(outcome)
    }

    pub fn uninstall(&mut self) -> Result<RequestOutcome, RegistrationError> {
        let outcome = self.controller.request(RegistrationAction::Unregister);
        self.note_request(outcome)
    }

    fn note_request(
        &mut self,
        outcome: Result<RequestOutcome, RegistrationError>,
    ) -> Result<RequestOutcome, RegistrationError> {
        match &outcome {
            Ok(RequestOutcome::Started(action)) => {
                self.notice = Some(Notice::info(match action {
                    RegistrationAction::Register => "Installing...",
                    RegistrationAction::Unregister => "Uninstalling...",
                }));
            }
            Ok(RequestOutcome::Busy) => {}
            Err(e) => self.notice = Some(Notice::error(e.to_string())),
        }
        outcome
    }

    /// Block until the in-flight operation finishes or `timeout` passes
    pub fn wait_for_registration(&mut self, timeout: Duration) -> Option<RegistrationResult> {
        let deadline = Instant::now() + timeout;
        while self.controller.is_busy() {
            let remaining = deadline.checked_duration_since(Instant::now())?;
            let event = self.events.recv_timeout(remaining).ok()?;
            if let Some(result) = self.handle_event(event) {
                return Some(result);
            }
        }
        None
    }

    /// Block until the poller reports a state or `timeout` passes
    pub fn wait_for_status(&mut self, timeout: Duration) -> RegistrationState {
        let deadline = Instant::now() + timeout;
        while let Some(remaining) = deadline.checked_duration_since(Instant::now()) {
            match self.events.recv_timeout(remaining) {
                Ok(RegistrationEvent::Status(state)) => {
                    self.handle_event(RegistrationEvent::Status(state));
                    return state;
                }
                Ok(event) => {
                    self.handle_event(event);
                }
                Err(_) => break,
            }
        }
        self.status
    }

    pub fn selected_effect(&self) -> Effect {
        effects::selected_effect(&self.store)
    }

    pub fn effect_selectable(&self, effect: Effect) -> bool {
        effects::effect_selectable(&self.store, &self.os, effect)
    }

    /// Select `effect` if it is allowed on this system
    pub fn set_effect(&mut self, effect: Effect) -> bool {
        if !self.effect_selectable(effect) {
            warn!(effect = effect.label(), os = %self.os, "Refusing unsupported effect");
            return false;
        }
        effects::select_effect(&mut self.store, effect);
        true
    }

    pub fn option_enabled(&self, option: EffectOption) -> bool {
        effects::option_enabled(&self.store, option)
    }

    pub fn option_selectable(&self, option: EffectOption) -> bool {
        effects::option_selectable(&self.store, &self.os, option)
    }

    pub fn set_option(&mut self, option: EffectOption, enabled: bool) -> bool {
        if !self.option_selectable(option) {
            warn!(option = option.key(), os = %self.os, "Refusing unsupported option");
            return false;
        }
        effects::set_option(&mut self.store, option, enabled);
        true
    }

    pub fn colors(&self) -> Rgba {
        Rgba::from_section(&self.store, keys::LIGHT)
    }

    /// Write one color component into both themes.
    ///
    /// Also clears `gui.last_preset`. Startup re-applies the remembered
    /// preset whenever the stored colors differ from it, so a name left in
    /// place would undo this edit on the next launch.
    pub fn set_color(&mut self, key: &str, value: u8) {
        if !keys::COLOR_KEYS.contains(&key) {
            warn!(key, "Ignoring unknown color component");
            return;
        }
        self.store.set(keys::LIGHT, key, value);
        self.store.set(keys::DARK, key, value);
        self.store.set(keys::GUI, keys::LAST_PRESET, "");
    }

    pub fn preset_names(&mut self) -> Vec<String> {
        self.store.preset_registry().names()
    }

    pub fn preset(&mut self, name: &str) -> Option<Preset> {
        self.store.preset_registry().get(name)
    }

    /// Name of the preset the current colors came from, if any
    pub fn last_preset(&self) -> Option<String> {
        let name = self.store.get(keys::GUI, keys::LAST_PRESET);
        self.store.presets().get(&name).map(|p| p.name.clone())
    }

    pub fn apply_preset(&mut self, name: &str) -> bool {
        let applied = self.store.preset_registry().apply(name);
        if !applied {
            self.notice = Some(Notice::error(format!("No preset named '{name}'")));
        }
        applied
    }

    /// Snapshot the current colors as `name`; returns the stored name
    pub fn save_preset(&mut self, name: &str) -> Option<String> {
        if name.trim().is_empty() {
            self.notice = Some(Notice::error("Preset name cannot be empty"));
            return None;
        }
        let stored = self.store.preset_registry().save_current(name);
        self.store.set(keys::GUI, keys::LAST_PRESET, &stored);
        self.notice = Some(Notice::info(format!("Saved preset '{stored}'")));
        Some(stored)
    }

    pub fn delete_preset(&mut self, name: &str) -> Result<(), PresetError> {
        let result = self.store.preset_registry().delete(name);
        self.notice = Some(match &result {
            Ok(()) => Notice::info(format!("Deleted preset '{name}'")),
            Err(e) => Notice::error(e.to_string()),
        });
        result
    }

    pub fn show_unsupported_effects(&self) -> bool {
        self.store.get_bool(keys::GUI, keys::SHOW_UNSUPPORTED_EFFECTS)
    }

    /// Turning the override off re-checks the selected effect
    pub fn set_show_unsupported_effects(&mut self, show: bool) {
        self.store.set(keys::GUI, keys::SHOW_UNSUPPORTED_EFFECTS, show);
        if !show {
            if let Some(effect) = effects::reconcile_effect(&mut self.store, &self.os) {
                self.notice = Some(Notice::info(format!("Switched to {}", effect.label())));
            }
        }
    }

    pub fn show_unsupported_options(&self) -> bool {
        self.store.get_bool(keys::GUI, keys::SHOW_UNSUPPORTED_OPTIONS)
    }

    pub fn set_show_unsupported_options(&mut self, show: bool) {
        self.store.set(keys::GUI, keys::SHOW_UNSUPPORTED_OPTIONS, show);
    }

    pub fn log_level(&self) -> Level {
        logging::parse_level(&self.store.get(keys::GUI, keys::LOG_LEVEL))
    }

    /// Persisted for the next start; the running subscriber is unchanged
    pub fn set_log_level(&mut self, level: Level) {
        self.store.set(keys::GUI, keys::LOG_LEVEL, level);
        self.notice = Some(Notice::info("Log level applies after restart"));
    }

    pub fn reset_to_defaults(&mut self) -> Result<(), ConfigError> {
        self.store.reset_to_defaults()?;
        effects::reconcile_effect(&mut self.store, &self.os);
        self.notice = Some(Notice::info("Settings reset to defaults"));
        Ok(())
    }

    /// Stop background checks and write any pending change.
    ///
    /// A host restart already under way is waited for. A registration
    /// command still running is left alone and will not restart the host.
    pub fn shutdown(&mut self) {
        if let Some(mut poller) = self.poller.take() {
            poller.stop();
        }
        if !self.controller.prepare_exit() {
            warn!("Host restart did not finish before exit");
        }
        if let Err(e) = self.store.flush() {
            error!(error = %e, "Failed to write config on shutdown");
        }
        info!("Control panel shut down");
    }
}

impl Drop for ControlPanel {
    fn drop(&mut self) {
        if self.poller.is_some() || self.store.has_pending_write() {
            self.shutdown();
        }
    }
}

/// Re-apply the remembered preset if the colors drifted from it
fn restore_last_preset(store: &mut ConfigStore) {
    let name = store.get(keys::GUI, keys::LAST_PRESET);
    let Some(preset) = store.presets().get(&name).cloned() else {
        return;
    };
    let current = (
        Rgba::from_section(store, keys::LIGHT),
        Rgba::from_section(store, keys::DARK),
    );
    if current == (preset.colors, preset.colors) {
        return;
    }
    info!(preset = %preset.name, "Restoring last preset");
    store.preset_registry().apply(&preset.name);
}
