//! Settings window: unsupported-feature overrides, logging, reset

use eframe::egui;
use tracing::{Level, error};

use crate::gui::Section;
use crate::gui::constants::*;
use crate::panel::ControlPanel;

const LEVELS: [Level; 5] = [
    Level::ERROR,
    Level::WARN,
    Level::INFO,
    Level::DEBUG,
    Level::TRACE,
];

#[derive(Default)]
pub struct SettingsSection {
    confirm_reset: bool,
}

impl Section for SettingsSection {
    fn ui(&mut self, ui: &mut egui::Ui, panel: &mut ControlPanel) {
        ui.label(egui::RichText::new("Compatibility").strong());
        ui.add_space(ITEM_SPACING);

        let mut show_effects = panel.show_unsupported_effects();
        if ui
            .checkbox(&mut show_effects, "Show unsupported effects")
            .on_hover_text("Allow effects not supported on this Windows build")
            .changed()
        {
            panel.set_show_unsupported_effects(show_effects);
        }

        let mut show_options = panel.show_unsupported_options();
        if ui
            .checkbox(&mut show_options, "Show unsupported options")
            .on_hover_text("Allow options not supported on this Windows build")
            .changed()
        {
            panel.set_show_unsupported_options(show_options);
        }

        ui.add_space(SECTION_SPACING);
        ui.label(egui::RichText::new("Logging").strong());
        ui.add_space(ITEM_SPACING);

        let current = panel.log_level();
        ui.horizontal(|ui| {
            ui.label("Log level:");
            egui::ComboBox::from_id_salt("log_level")
                .selected_text(current.as_str())
                .show_ui(ui, |ui| {
                    for level in LEVELS {
                        if ui.selectable_label(level == current, level.as_str()).clicked()
                            && level != current
                        {
                            panel.set_log_level(level);
                        }
                    }
                });
        });

        ui.add_space(SECTION_SPACING);
        ui.label(egui::RichText::new("About").strong());
        ui.label(format!("Windows version: {}", panel.os_version()));
        ui.label(format!("Config: {}", panel.store().path().display()));

        ui.add_space(SECTION_SPACING);
        if self.confirm_reset {
            ui.horizontal(|ui| {
                ui.colored_label(STATUS_ERROR, "Reset all settings and presets?");
                if ui.button("Yes").clicked() {
                    if let Err(err) = panel.reset_to_defaults() {
                        error!(error = %err, "Failed to reset settings");
                    }
                    self.confirm_reset = false;
                }
                if ui.button("No").clicked() {
                    self.confirm_reset = false;
                }
            });
        } else if ui.button("Reset to defaults").clicked() {
            self.confirm_reset = true;
        }
    }
}
