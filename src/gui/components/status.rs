//! Registration status line and install/uninstall buttons

use eframe::egui;
use tracing::error;

use crate::gui::Section;
use crate::gui::constants::*;
use crate::panel::{ControlPanel, NoticeLevel};
use crate::registration::{RegistrationAction, RegistrationState};

pub struct StatusSection;

fn status_line(panel: &ControlPanel) -> (egui::Color32, &'static str) {
    match (panel.working(), panel.status()) {
        (Some(RegistrationAction::Register), _) => (STATUS_PENDING, "\u{25CF}  Installing..."),
        (Some(RegistrationAction::Unregister), _) => (STATUS_PENDING, "\u{25CF}  Uninstalling..."),
        (None, RegistrationState::Registered) => (STATUS_OK, "\u{25CF}  Initialized"),
        (None, RegistrationState::Unregistered) => (STATUS_ERROR, "\u{25CF}  Not Initialized"),
        (None, RegistrationState::Unknown) => (STATUS_PENDING, "\u{25CF}  Checking..."),
    }
}

impl Section for StatusSection {
    fn ui(&mut self, ui: &mut egui::Ui, panel: &mut ControlPanel) {
        ui.group(|ui| {
            ui.label(egui::RichText::new("Explorer Effects").strong());
            let (color, text) = status_line(panel);
            ui.colored_label(color, text);

            ui.add_space(ITEM_SPACING);
            let idle = panel.working().is_none();
            ui.horizontal(|ui| {
                if ui.add_enabled(idle, egui::Button::new("Install")).clicked() {
                    if let Err(err) = panel.install() {
                        error!(error = %err, "Install request failed");
                    }
                }
                if ui.add_enabled(idle, egui::Button::new("Uninstall")).clicked() {
                    if let Err(err) = panel.uninstall() {
                        error!(error = %err, "Uninstall request failed");
                    }
                }
                if !idle {
                    ui.spinner();
                }
            });

            let mut dismiss = false;
            if let Some(notice) = panel.notice() {
                ui.add_space(ITEM_SPACING);
                ui.horizontal(|ui| {
                    let color = match notice.level {
                        NoticeLevel::Info => ui.visuals().text_color(),
                        NoticeLevel::Error => STATUS_ERROR,
                    };
                    ui.colored_label(color, &notice.text);
                    dismiss = ui.small_button("\u{2716}").clicked();
                });
            }
            if dismiss {
                panel.clear_notice();
            }
        });
    }
}
