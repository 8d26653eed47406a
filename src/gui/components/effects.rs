use eframe::egui;

use crate::effects::Effect;
use crate::gui::Section;
use crate::gui::constants::*;
use crate::panel::ControlPanel;

pub struct EffectsSection;

impl Section for EffectsSection {
    fn ui(&mut self, ui: &mut egui::Ui, panel: &mut ControlPanel) {
        ui.group(|ui| {
            ui.label(egui::RichText::new("Effect").strong());
            ui.add_space(ITEM_SPACING);

            let selected = panel.selected_effect();
            for effect in Effect::ALL {
                let enabled = panel.effect_selectable(effect);
                let response = ui
                    .add_enabled(enabled, egui::RadioButton::new(selected == effect, effect.label()))
                    .on_hover_text(effect.description())
                    .on_disabled_hover_text(format!(
                        "Not supported on Windows {}",
                        panel.os_version()
                    ));
                ui.indent(effect.id(), |ui| {
                    ui.label(egui::RichText::new(effect.description()).small().weak());
                });
                if response.clicked() && selected != effect {
                    panel.set_effect(effect);
                }
            }
        });
    }
}
