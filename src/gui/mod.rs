//! Desktop panel (egui/eframe)
//!
//! The window is a stack of sections over a `ControlPanel`. Sections are
//! looked up through `SectionKind`, built once at startup.

mod components;
mod constants;
mod manager;

pub use manager::run_gui;

use eframe::egui;

use crate::panel::ControlPanel;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SectionKind {
    Status,
    Effects,
    Options,
    Presets,
    Colors,
    Settings,
}

impl SectionKind {
    pub const ALL: [SectionKind; 6] = [
        SectionKind::Status,
        SectionKind::Effects,
        SectionKind::Options,
        SectionKind::Presets,
        SectionKind::Colors,
        SectionKind::Settings,
    ];

    pub fn title(self) -> &'static str {
        match self {
            SectionKind::Status => "Status",
            SectionKind::Effects => "Effect",
            SectionKind::Options => "Options",
            SectionKind::Presets => "Presets",
            SectionKind::Colors => "Colors",
            SectionKind::Settings => "Settings",
        }
    }

    /// Settings live in their own window, everything else in the main panel
    pub fn in_main_panel(self) -> bool {
        self != SectionKind::Settings
    }

    fn build(self) -> Box<dyn Section> {
        match self {
            SectionKind::Status => Box::new(components::status::StatusSection),
            SectionKind::Effects => Box::new(components::effects::EffectsSection),
            SectionKind::Options => Box::new(components::options::OptionsSection),
            SectionKind::Presets => Box::new(components::presets::PresetsSection::default()),
            SectionKind::Colors => Box::new(components::colors::ColorsSection),
            SectionKind::Settings => Box::new(components::settings::SettingsSection::default()),
        }
    }
}

/// One block of the panel
pub trait Section {
    fn ui(&mut self, ui: &mut egui::Ui, panel: &mut ControlPanel);
}

pub struct SectionRegistry {
    sections: Vec<(SectionKind, Box<dyn Section>)>,
}

impl SectionRegistry {
    pub fn new() -> Self {
        Self {
            sections: SectionKind::ALL
                .into_iter()
                .map(|kind| (kind, kind.build()))
                .collect(),
        }
    }

    pub fn get_mut(&mut self, kind: SectionKind) -> Option<&mut (dyn Section + 'static)> {
        self.sections
            .iter_mut()
            .find(|(k, _)| *k == kind)
            .map(|(_, section)| section.as_mut())
    }

    pub fn kinds(&self) -> impl Iterator<Item = SectionKind> + '_ {
        self.sections.iter().map(|(kind, _)| *kind)
    }

    pub fn show(&mut self, kind: SectionKind, ui: &mut egui::Ui, panel: &mut ControlPanel) {
        if let Some(section) = self.get_mut(kind) {
            section.ui(ui, panel);
        }
    }
}

impl Default for SectionRegistry {
    fn default() -> Self {
        Self::new()
    }
}
