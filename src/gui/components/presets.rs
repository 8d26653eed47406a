//! Preset picker with save and delete

use eframe::egui;

use crate::config::defaults;
use crate::gui::Section;
use crate::gui::constants::*;
use crate::panel::ControlPanel;

#[derive(Default)]
pub struct PresetsSection {
    new_name: String,
    pending_delete: Option<String>,
}

impl Section for PresetsSection {
    fn ui(&mut self, ui: &mut egui::Ui, panel: &mut ControlPanel) {
        ui.group(|ui| {
            ui.label(egui::RichText::new("Presets").strong());
            ui.add_space(ITEM_SPACING);

            let current = panel.last_preset();
            let names = panel.preset_names();
            ui.horizontal(|ui| {
                ui.label("Preset:");
                egui::ComboBox::from_id_salt("preset_selector")
                    .selected_text(current.as_deref().unwrap_or("Custom"))
                    .show_ui(ui, |ui| {
                        for name in &names {
                            let selected = current.as_deref() == Some(name.as_str());
                            if ui.selectable_label(selected, name).clicked() && !selected {
                                panel.apply_preset(name);
                            }
                        }
                    });

                let deletable = current.as_deref().is_some_and(|n| !defaults::is_builtin(n));
                if ui
                    .add_enabled(deletable, egui::Button::new("\u{1F5D1} Delete"))
                    .on_disabled_hover_text("Built-in presets cannot be deleted")
                    .clicked()
                {
                    self.pending_delete = current.clone();
                }
            });

            if let Some(name) = self.pending_delete.clone() {
                ui.horizontal(|ui| {
                    ui.label(format!("Delete '{name}'?"));
                    if ui.button("Yes").clicked() {
                        // The panel reports the outcome as a notice
                        let _ = panel.delete_preset(&name);
                        self.pending_delete = None;
                    }
                    if ui.button("No").clicked() {
                        self.pending_delete = None;
                    }
                });
            }

            ui.add_space(ITEM_SPACING);
            ui.horizontal(|ui| {
                ui.add(
                    egui::TextEdit::singleline(&mut self.new_name)
                        .hint_text("New preset name")
                        .desired_width(180.0),
                );
                let can_save = !self.new_name.trim().is_empty();
                if ui
                    .add_enabled(can_save, egui::Button::new("\u{1F4BE} Save"))
                    .on_hover_text("Save the current colors as a preset")
                    .clicked()
                    && panel.save_preset(&self.new_name).is_some()
                {
                    self.new_name.clear();
                }
            });
        });
    }
}
