//! Application-wide constants
//!
//! This module contains the magic numbers and string literals used throughout
//! the application, providing a single source of truth for constant values.

/// Config file layout and locations
pub mod config {
    /// Directory name under the per-user config dir
    pub const APP_DIR: &str = "explorer-fx";

    /// Authoritative JSON store
    pub const FILENAME: &str = "config.json";

    /// Plain key/value mirror (also the legacy store read during migration)
    pub const MIRROR_FILENAME: &str = "config.ini";

    /// Marker file beside the executable that enables portable mode
    pub const PORTABLE_MARKER: &str = "portable.ini";

    /// Log file written next to the config
    pub const LOG_FILENAME: &str = "explorer-fx.log";

    /// Current schema of the JSON store
    pub const SCHEMA_VERSION: u32 = 2;

    /// Quiet period before coalesced `set` calls hit the disk
    pub const DEBOUNCE_MS: u64 = 500;
}

/// Section and key names of the config document
pub mod keys {
    pub const CONFIG: &str = "config";
    pub const LIGHT: &str = "light";
    pub const DARK: &str = "dark";
    pub const GUI: &str = "gui";

    pub const EFFECT: &str = "effect";
    pub const LAST_PRESET: &str = "last_preset";
    pub const SHOW_UNSUPPORTED_EFFECTS: &str = "showUnsupportedEffects";
    pub const SHOW_UNSUPPORTED_OPTIONS: &str = "showUnsupportedOptions";
    pub const LOG_LEVEL: &str = "logLevel";

    /// Color components, in persisted order
    pub const COLOR_KEYS: [&str; 4] = ["r", "g", "b", "a"];
}

/// Native shell extension and its host process
pub mod component {
    /// File name of the shell extension DLL
    pub const FILENAME: &str = "ExplorerBlurMica.dll";

    /// Image name of the host process that loads the extension
    pub const HOST_IMAGE: &str = "explorer.exe";

    /// Delay between killing the host and relaunching it
    pub const HOST_SETTLE_MS: u64 = 1500;

    /// Extra time shutdown waits, beyond the settle delay, for a host
    /// restart that has already killed the host
    pub const EXIT_RESTART_GRACE_MS: u64 = 10_000;

    /// Attempts when staging the component into the config dir
    pub const STAGE_RETRIES: u32 = 3;

    /// Pause between staging attempts
    pub const STAGE_RETRY_DELAY_MS: u64 = 1000;
}

/// Registration status polling
pub mod polling {
    /// Interval between scheduled status checks
    pub const INTERVAL_MS: u64 = 15_000;

    /// Sleep granularity; bounds forced-check and shutdown latency
    pub const SLICE_MS: u64 = 100;
}

/// OS builds that gate effects and options
pub mod builds {
    /// First Windows 11 build
    pub const WIN11: u32 = 22000;

    /// Windows 11 23H2; classic blur stops working from here on
    pub const WIN11_23H2: u32 = 22621;

    /// Windows 11 24H2; clear blur stops working from here on
    pub const WIN11_24H2: u32 = 26100;
}
