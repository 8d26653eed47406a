//! Main window implemented with egui/eframe

use std::time::{Duration, Instant};

use anyhow::{Result, anyhow};
use eframe::{CreationContext, NativeOptions, egui};
use tracing::info;

use super::constants::*;
use super::{SectionKind, SectionRegistry};
use crate::panel::ControlPanel;

struct ControlPanelApp {
    panel: ControlPanel,
    sections: SectionRegistry,
    show_settings: bool,
}

impl ControlPanelApp {
    fn new(_cc: &CreationContext<'_>, panel: ControlPanel) -> Self {
        info!("Initializing egui control panel");
        Self {
            panel,
            sections: SectionRegistry::new(),
            show_settings: false,
        }
    }
}

impl eframe::App for ControlPanelApp {
    fn update(&mut self, ctx: &egui::Context, _frame: &mut eframe::Frame) {
        let now = Instant::now();
        self.panel.pump(now);

        egui::CentralPanel::default().show(ctx, |ui| {
            ui.add_space(PADDING);
            ui.horizontal(|ui| {
                ui.heading("Explorer FX");
                ui.with_layout(egui::Layout::right_to_left(egui::Align::Center), |ui| {
                    if ui.button("\u{2699} Settings").clicked() {
                        self.show_settings = !self.show_settings;
                    }
                });
            });
            ui.add_space(SECTION_SPACING);

            egui::ScrollArea::vertical().show(ui, |ui| {
                for kind in SectionKind::ALL.into_iter().filter(|k| k.in_main_panel()) {
                    self.sections.show(kind, ui, &mut self.panel);
                    ui.add_space(SECTION_SPACING);
                }
            });
        });

        egui::Window::new(SectionKind::Settings.title())
            .open(&mut self.show_settings)
            .resizable(false)
            .collapsible(false)
            .show(ctx, |ui| {
                self.sections.show(SectionKind::Settings, ui, &mut self.panel);
            });

        let idle = Duration::from_millis(REFRESH_INTERVAL_MS);
        ctx.request_repaint_after(self.panel.next_wakeup(Instant::now(), idle));
    }

    fn on_exit(&mut self, _gl: Option<&eframe::glow::Context>) {
        self.panel.shutdown();
        info!("Control panel exiting");
    }
}

pub fn run_gui(panel: ControlPanel) -> Result<()> {
    let options = NativeOptions {
        viewport: egui::ViewportBuilder::default()
            .with_inner_size([WINDOW_WIDTH, WINDOW_HEIGHT])
            .with_min_inner_size([WINDOW_MIN_WIDTH, WINDOW_MIN_HEIGHT])
            .with_title("Explorer FX"),
        ..Default::default()
    };

    eframe::run_native(
        "Explorer FX",
        options,
        Box::new(move |cc| Ok(Box::new(ControlPanelApp::new(cc, panel)))),
    )
    .map_err(|err| anyhow!("Failed to launch egui control panel: {err}"))
}
