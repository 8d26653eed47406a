pub mod colors;
pub mod effects;
pub mod options;
pub mod presets;
pub mod settings;
pub mod status;
