//! Compiled-in defaults for every known section/key and the built-in presets

use crate::config::presets::{Preset, Rgba};
use crate::constants::keys;

/// Static default table: (section, [(key, value)])
pub const DEFAULTS: &[(&str, &[(&str, &str)])] = &[
    (
        keys::CONFIG,
        &[
            (keys::EFFECT, "1"),
            ("clearAddress", "true"),
            ("clearBarBg", "true"),
            ("clearWinUIBg", "true"),
            ("showLine", "false"),
        ],
    ),
    (keys::LIGHT, &[("r", "255"), ("g", "255"), ("b", "255"), ("a", "120")]),
    (keys::DARK, &[("r", "255"), ("g", "255"), ("b", "255"), ("a", "120")]),
    (
        keys::GUI,
        &[
            (keys::SHOW_UNSUPPORTED_EFFECTS, "false"),
            (keys::LAST_PRESET, "Light Mode"),
            (keys::SHOW_UNSUPPORTED_OPTIONS, "false"),
            (keys::LOG_LEVEL, "ERROR"),
        ],
    ),
];

/// Names of presets that can never be deleted
pub const BUILTIN_PRESETS: [&str; 2] = ["Light Mode", "Dark Mode"];

/// Look up the compiled default for (section, key)
pub fn lookup(section: &str, key: &str) -> Option<&'static str> {
    DEFAULTS
        .iter()
        .find(|(name, _)| *name == section)
        .and_then(|(_, entries)| entries.iter().find(|(k, _)| *k == key))
        .map(|(_, value)| *value)
}

pub fn builtin_presets() -> Vec<Preset> {
    vec![
        Preset::new("Light Mode", Rgba::new(220, 220, 220, 160)),
        Preset::new("Dark Mode", Rgba::new(0, 0, 0, 120)),
    ]
}

pub fn is_builtin(normalized_name: &str) -> bool {
    BUILTIN_PRESETS.contains(&normalized_name)
}
