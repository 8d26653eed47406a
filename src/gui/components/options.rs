use eframe::egui;

use crate::effects::EffectOption;
use crate::gui::Section;
use crate::gui::constants::*;
use crate::panel::ControlPanel;

pub struct OptionsSection;

impl Section for OptionsSection {
    fn ui(&mut self, ui: &mut egui::Ui, panel: &mut ControlPanel) {
        ui.group(|ui| {
            ui.label(egui::RichText::new("Options").strong());
            ui.add_space(ITEM_SPACING);

            for option in EffectOption::ALL {
                let mut enabled = panel.option_enabled(option);
                let response = ui
                    .add_enabled(
                        panel.option_selectable(option),
                        egui::Checkbox::new(&mut enabled, option.label()),
                    )
                    .on_hover_text(option.tooltip())
                    .on_disabled_hover_text("Requires Windows 11");
                if response.changed() {
                    panel.set_option(option, enabled);
                }
            }
        });
    }
}
