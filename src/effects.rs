//! Effect catalogue and capability gating
//!
//! Each effect and gated option carries a static predicate over the OS
//! version. The persisted effect must pass its predicate unless the user
//! enabled `showUnsupportedEffects`; otherwise it is reset to Acrylic.

use tracing::{info, warn};

use crate::capability::OsVersion;
use crate::config::ConfigStore;
use crate::constants::{builds, keys};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Effect {
    Blur,
    Acrylic,
    Mica,
    BlurClear,
    MicaAlt,
}

impl Effect {
    /// Display order in the panel
    pub const ALL: [Effect; 5] = [
        Effect::Acrylic,
        Effect::Blur,
        Effect::BlurClear,
        Effect::Mica,
        Effect::MicaAlt,
    ];

    /// Supported on every OS the component runs on
    pub const FALLBACK: Effect = Effect::Acrylic;

    /// Identifier persisted under `config.effect`
    pub fn id(self) -> &'static str {
        match self {
            Effect::Blur => "0",
            Effect::Acrylic => "1",
            Effect::Mica => "2",
            Effect::BlurClear => "3",
            Effect::MicaAlt => "4",
        }
    }

    pub fn from_id(id: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|e| e.id() == id.trim())
    }

    pub fn label(self) -> &'static str {
        match self {
            Effect::Blur => "Blur",
            Effect::Acrylic => "Acrylic",
            Effect::Mica => "Mica",
            Effect::BlurClear => "Blur (Clear)",
            Effect::MicaAlt => "Mica Alt",
        }
    }

    pub fn description(self) -> &'static str {
        match self {
            Effect::Blur => "Win11 22H2 or earlier • Classic blur • Color customizable",
            Effect::Acrylic => "Win10/11 • Blur with noise • Color customizable",
            Effect::Mica => "Win11 only • System colors • No customization",
            Effect::BlurClear => "Win10/11 • Clean blur • Color customizable",
            Effect::MicaAlt => "Win11 only • Alt. system colors • No customization",
        }
    }

    /// Whether the effect uses the configured colors
    pub fn customizable(self) -> bool {
        !matches!(self, Effect::Mica | Effect::MicaAlt)
    }

    pub fn is_supported(self, os: &OsVersion) -> bool {
        match self {
            Effect::Acrylic => true,
            Effect::Blur => os.is_nt10() && os.build < builds::WIN11_23H2,
            Effect::BlurClear => os.is_nt10() && os.build < builds::WIN11_24H2,
            Effect::Mica | Effect::MicaAlt => os.is_nt10() && os.build >= builds::WIN11,
        }
    }
}

/// Boolean switches under the `config` section
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EffectOption {
    ClearAddress,
    ClearBarBg,
    ClearWinUiBg,
    ShowLine,
}

impl EffectOption {
    pub const ALL: [EffectOption; 4] = [
        EffectOption::ClearAddress,
        EffectOption::ClearBarBg,
        EffectOption::ClearWinUiBg,
        EffectOption::ShowLine,
    ];

    pub fn key(self) -> &'static str {
        match self {
            EffectOption::ClearAddress => "clearAddress",
            EffectOption::ClearBarBg => "clearBarBg",
            EffectOption::ClearWinUiBg => "clearWinUIBg",
            EffectOption::ShowLine => "showLine",
        }
    }

    pub fn from_key(key: &str) -> Option<EffectOption> {
        Self::ALL.into_iter().find(|o| o.key() == key)
    }

    pub fn label(self) -> &'static str {
        match self {
            EffectOption::ClearAddress => "Clear Address Bar",
            EffectOption::ClearBarBg => "Clear Scrollbar Bg",
            EffectOption::ClearWinUiBg => "Clear WinUI Bg",
            EffectOption::ShowLine => "Show Separator",
        }
    }

    pub fn tooltip(self) -> &'static str {
        match self {
            EffectOption::ClearAddress => "Clear the background of the address bar.",
            EffectOption::ClearBarBg => {
                "Clear the background color of the scrollbar (May differ from system style)."
            }
            EffectOption::ClearWinUiBg => {
                "Remove toolbar background color (Win11 WinUI/XamlIslands only)."
            }
            EffectOption::ShowLine => "Show split line between TreeView and DUIView.",
        }
    }

    pub fn is_supported(self, os: &OsVersion) -> bool {
        match self {
            EffectOption::ClearWinUiBg => os.is_nt10() && os.build >= builds::WIN11,
            _ => true,
        }
    }
}

/// Currently persisted effect, Acrylic if the stored id is unknown
pub fn selected_effect(store: &ConfigStore) -> Effect {
    Effect::from_id(&store.get(keys::CONFIG, keys::EFFECT)).unwrap_or(Effect::FALLBACK)
}

pub fn select_effect(store: &mut ConfigStore, effect: Effect) {
    info!(effect = effect.label(), "Effect selected");
    store.set(keys::CONFIG, keys::EFFECT, effect.id());
}

/// Whether the user may pick `effect` right now
pub fn effect_selectable(store: &ConfigStore, os: &OsVersion, effect: Effect) -> bool {
    effect.is_supported(os) || store.get_bool(keys::GUI, keys::SHOW_UNSUPPORTED_EFFECTS)
}

pub fn option_selectable(store: &ConfigStore, os: &OsVersion, option: EffectOption) -> bool {
    option.is_supported(os) || store.get_bool(keys::GUI, keys::SHOW_UNSUPPORTED_OPTIONS)
}

pub fn option_enabled(store: &ConfigStore, option: EffectOption) -> bool {
    store.get_bool(keys::CONFIG, option.key())
}

pub fn set_option(store: &mut ConfigStore, option: EffectOption, enabled: bool) {
    store.set(keys::CONFIG, option.key(), enabled);
}

/// Reset an incompatible persisted effect to the fallback.
///
/// Returns the new effect when a change was made and persisted.
pub fn reconcile_effect(store: &mut ConfigStore, os: &OsVersion) -> Option<Effect> {
    let stored = store.get(keys::CONFIG, keys::EFFECT);
    let show_unsupported = store.get_bool(keys::GUI, keys::SHOW_UNSUPPORTED_EFFECTS);
    let supported = Effect::from_id(&stored).is_some_and(|e| e.is_supported(os));
    if supported || (show_unsupported && Effect::from_id(&stored).is_some()) {
        return None;
    }

    warn!(effect = %stored, os = %os, "Selected effect unsupported, falling back");
    store.set(keys::CONFIG, keys::EFFECT, Effect::FALLBACK.id());
    if let Err(e) = store.flush() {
        tracing::error!(error = %e, "Failed to persist effect fallback");
    }
    Some(Effect::FALLBACK)
}
