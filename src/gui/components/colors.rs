//! RGBA sliders and preview swatch
//!
//! Edits go to both the light and dark themes.

use eframe::egui;

use crate::config::Rgba;
use crate::gui::Section;
use crate::gui::constants::*;
use crate::panel::ControlPanel;

pub struct ColorsSection;

impl Section for ColorsSection {
    fn ui(&mut self, ui: &mut egui::Ui, panel: &mut ControlPanel) {
        let customizable = panel.selected_effect().customizable();

        ui.group(|ui| {
            ui.label(egui::RichText::new("Colors").strong());
            if !customizable {
                ui.label(
                    egui::RichText::new("This effect uses system colors")
                        .small()
                        .weak(),
                );
            }
            ui.add_space(ITEM_SPACING);

            ui.add_enabled_ui(customizable, |ui| {
                let colors = panel.colors();
                for (key, value) in colors.components() {
                    let mut value = value;
                    ui.horizontal(|ui| {
                        ui.label(format!("{}:", key.to_uppercase()));
                        if ui.add(egui::Slider::new(&mut value, 0..=255)).changed() {
                            panel.set_color(key, value);
                        }
                    });
                }

                ui.add_space(ITEM_SPACING);
                ui.horizontal(|ui| {
                    ui.label("Preview:");
                    let Rgba { r, g, b, a } = panel.colors();
                    let mut color = egui::Color32::from_rgba_unmultiplied(r, g, b, a);
                    let (rect, _) = ui.allocate_exact_size(SWATCH_SIZE.into(), egui::Sense::hover());
                    ui.painter().rect_filled(rect, SWATCH_ROUNDING, color);

                    if ui.color_edit_button_srgba(&mut color).changed() {
                        let [r, g, b, a] = color.to_srgba_unmultiplied();
                        for (key, value) in Rgba::new(r, g, b, a).components() {
                            panel.set_color(key, value);
                        }
                    }
                });
            });
        });
    }
}
