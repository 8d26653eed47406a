//! Persistent config store with debounced writes
//!
//! Owned by the control thread. `set` mutates memory immediately and arms a
//! single debounce deadline; the owner calls `tick` from its loop and the
//! document is written once the deadline passes. `flush` writes any pending
//! change right away and must run before exit.

use std::fs;
use std::path::PathBuf;
use std::time::{Duration, Instant};
use tracing::{debug, error, info, warn};

use crate::config::debounce::Debounce;
use crate::config::document::ConfigDocument;
use crate::config::legacy;
use crate::config::paths::ConfigPaths;
use crate::config::presets::{PresetRegistry, PresetTable};
use crate::constants::config::{DEBOUNCE_MS, SCHEMA_VERSION};

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("config at {path:?} is unreadable: {reason}")]
    LoadCorrupt { path: PathBuf, reason: String },
    #[error("failed to write config to {path:?}: {source}")]
    WriteFailed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to serialize config: {0}")]
    Serialize(#[from] serde_json::Error),
}

pub struct ConfigStore {
    config_path: PathBuf,
    mirror_path: PathBuf,
    document: ConfigDocument,
    debounce: Debounce,
    dirty: bool,
    writes: u64,
}

impl ConfigStore {
    /// Load the store, falling back to defaults on any problem.
    ///
    /// Order: JSON store, then a legacy INI store (migrated forward), then
    /// compiled defaults. Anything not read from a current-schema JSON file
    /// is written back immediately.
    pub fn load(paths: &ConfigPaths) -> Self {
        Self::load_with_delay(paths, Duration::from_millis(DEBOUNCE_MS))
    }

    pub fn load_with_delay(paths: &ConfigPaths, delay: Duration) -> Self {
        let config_path = paths.config_file();
        let mirror_path = paths.mirror_file();

        let (document, needs_write) = match read_document(&config_path, &mirror_path) {
            Ok(Some((mut doc, migrated))) => {
                let added = doc.fill_missing_defaults();
                if !added.is_empty() {
                    debug!(keys = ?added, "Filled missing config keys from defaults");
                }
                (doc, migrated)
            }
            Ok(None) => {
                info!(path = %config_path.display(), "Config file not found, creating default config");
                (ConfigDocument::default(), true)
            }
            Err(e) => {
                error!(error = %e, "Falling back to default config");
                backup_corrupt(&config_path);
                (ConfigDocument::default(), true)
            }
        };

        let mut store = Self {
            config_path,
            mirror_path,
            document,
            debounce: Debounce::new(delay),
            dirty: needs_write,
            writes: 0,
        };

        if needs_write {
            store.document.schema_version = SCHEMA_VERSION;
            if let Err(e) = store.flush() {
                error!(error = %e, "Failed to write initial config");
            }
        }

        info!(presets = store.document.presets.len(), "Loaded config");
        store
    }

    /// Live value, else compiled default, else empty string
    pub fn get(&self, section: &str, key: &str) -> String {
        self.get_or(section, key, "")
    }

    /// Live value, else compiled default, else `fallback`
    pub fn get_or(&self, section: &str, key: &str, fallback: &str) -> String {
        self.document
            .get(section, key)
            .or_else(|| crate::config::defaults::lookup(section, key))
            .unwrap_or(fallback)
            .to_string()
    }

    pub fn get_bool(&self, section: &str, key: &str) -> bool {
        self.get(section, key).trim().eq_ignore_ascii_case("true")
    }

    /// Byte-valued key; unparsable values fall back to the default, then 0
    pub fn get_u8(&self, section: &str, key: &str) -> u8 {
        self.get(section, key)
            .trim()
            .parse()
            .ok()
            .or_else(|| {
                crate::config::defaults::lookup(section, key).and_then(|v| v.parse().ok())
            })
            .unwrap_or(0)
    }

    /// Update memory now, write to disk after the debounce delay
    pub fn set(&mut self, section: &str, key: &str, value: impl ToString) {
        self.set_at(section, key, value, Instant::now());
    }

    pub fn set_at(&mut self, section: &str, key: &str, value: impl ToString, now: Instant) {
        let value = value.to_string();
        debug!(section, key, value = %value, "Config value set");
        self.document.set(section, key, value);
        self.dirty = true;
        self.debounce.arm(now);
    }

    /// Drive the debounce timer; writes when the quiet period has elapsed
    pub fn tick(&mut self, now: Instant) {
        if self.debounce.fire_if_due(now) {
            if let Err(e) = self.flush() {
                // Memory keeps the change; the next trigger retries
                error!(error = %e, "Debounced config write failed");
            }
        }
    }

    /// Time until the pending write, for scheduling the next wakeup
    pub fn next_deadline(&self, now: Instant) -> Option<Duration> {
        self.debounce.remaining(now)
    }

    /// Write pending changes now, bypassing the timer
    pub fn flush(&mut self) -> Result<(), ConfigError> {
        self.debounce.cancel();
        if !self.dirty {
            return Ok(());
        }
        self.write()?;
        self.dirty = false;
        Ok(())
    }

    pub fn has_pending_write(&self) -> bool {
        self.dirty
    }

    /// Number of successful writes of the primary store
    pub fn write_count(&self) -> u64 {
        self.writes
    }

    pub(crate) fn mark_dirty(&mut self) {
        self.dirty = true;
    }

    pub fn presets(&self) -> &PresetTable {
        &self.document.presets
    }

    pub(crate) fn presets_mut(&mut self) -> &mut PresetTable {
        &mut self.document.presets
    }

    pub fn preset_registry(&mut self) -> PresetRegistry<'_> {
        PresetRegistry::new(self)
    }

    pub fn document(&self) -> &ConfigDocument {
        &self.document
    }

    pub fn path(&self) -> &std::path::Path {
        &self.config_path
    }

    /// Replace everything with compiled defaults and persist
    pub fn reset_to_defaults(&mut self) -> Result<(), ConfigError> {
        info!("Resetting config to defaults");
        self.document = ConfigDocument::default();
        self.dirty = true;
        self.flush()
    }

    fn write(&mut self) -> Result<(), ConfigError> {
        let json = self.document.to_json()?;
        if let Some(parent) = self.config_path.parent() {
            fs::create_dir_all(parent).map_err(|source| ConfigError::WriteFailed {
                path: parent.to_path_buf(),
                source,
            })?;
        }
        fs::write(&self.config_path, json).map_err(|source| ConfigError::WriteFailed {
            path: self.config_path.clone(),
            source,
        })?;
        self.writes += 1;
        info!(path = %self.config_path.display(), "Saved config");

        if let Err(e) = fs::write(&self.mirror_path, legacy::render(&self.document)) {
            warn!(path = %self.mirror_path.display(), error = %e, "Failed to write config mirror");
        }
        Ok(())
    }
}

/// Returns the document and whether it must be written forward
fn read_document(
    config_path: &std::path::Path,
    mirror_path: &std::path::Path,
) -> Result<Option<(ConfigDocument, bool)>, ConfigError> {
    if config_path.exists() {
        let contents = fs::read_to_string(config_path).map_err(|e| ConfigError::LoadCorrupt {
            path: config_path.to_path_buf(),
            reason: e.to_string(),
        })?;
        let doc = ConfigDocument::from_json(&contents).map_err(|e| ConfigError::LoadCorrupt {
            path: config_path.to_path_buf(),
            reason: e.to_string(),
        })?;
        let migrate = doc.needs_migration();
        if migrate {
            info!(from = doc.schema_version, to = SCHEMA_VERSION, "Migrating config schema");
        }
        return Ok(Some((doc, migrate)));
    }

    if mirror_path.exists() {
        let contents = fs::read_to_string(mirror_path).map_err(|e| ConfigError::LoadCorrupt {
            path: mirror_path.to_path_buf(),
            reason: e.to_string(),
        })?;
        info!(path = %mirror_path.display(), "Migrating legacy INI config");
        return Ok(Some((legacy::parse(&contents), true)));
    }

    Ok(None)
}

fn backup_corrupt(path: &std::path::Path) {
    if !path.exists() {
        return;
    }
    let backup = path.with_extension("json.bak");
    match fs::rename(path, &backup) {
        Ok(()) => warn!(backup = %backup.display(), "Moved unreadable config aside"),
        Err(e) => warn!(error = %e, "Failed to move unreadable config aside"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::constants::keys;

    fn temp_store() -> (tempfile::TempDir, ConfigStore) {
        let dir = tempfile::tempdir().unwrap();
        let store = ConfigStore::load(&ConfigPaths::in_dir(dir.path()));
        (dir, store)
    }

    fn after_delay() -> Instant {
        Instant::now() + Duration::from_millis(DEBOUNCE_MS + 50)
    }

    #[test]
    fn test_first_run_writes_defaults() {
        let (dir, store) = temp_store();
        assert_eq!(store.write_count(), 1);
        assert!(!store.has_pending_write());
        assert!(dir.path().join("config.json").exists());
        assert!(dir.path().join("config.ini").exists());
    }

    #[test]
    fn test_get_falls_back_to_defaults() {
        let (_dir, mut store) = temp_store();
        store.document.sections.clear();
        assert_eq!(store.get(keys::CONFIG, keys::EFFECT), "1");
        assert_eq!(store.get_u8(keys::LIGHT, "a"), 120);
        assert_eq!(store.get("nope", "nothing"), "");
        assert_eq!(store.get_or("nope", "nothing", "fb"), "fb");
        assert!(!store.get_bool("nope", "nothing"));
    }

    #[test]
    fn test_read_your_write() {
        let (_dir, mut store) = temp_store();
        store.set(keys::LIGHT, "r", 42);
        assert_eq!(store.get(keys::LIGHT, "r"), "42");
        assert_eq!(store.write_count(), 1);
    }

    #[test]
    fn test_burst_of_sets_writes_once() {
        let (dir, mut store) = temp_store();
        for value in 0..=20u8 {
            store.set(keys::LIGHT, "a", value);
            store.tick(Instant::now());
        }
        assert_eq!(store.write_count(), 1);

        store.tick(after_delay());
        assert_eq!(store.write_count(), 2);
        store.tick(after_delay());
        assert_eq!(store.write_count(), 2);

        let reloaded = ConfigStore::load(&ConfigPaths::in_dir(dir.path()));
        assert_eq!(reloaded.get(keys::LIGHT, "a"), "20");
        assert_eq!(reloaded.write_count(), 0);
    }

    #[test]
    fn test_flush_before_timer_writes_exactly_once() {
        let (_dir, mut store) = temp_store();
        store.set(keys::CONFIG, "showLine", true);
        store.flush().unwrap();
        assert_eq!(store.write_count(), 2);
        store.flush().unwrap();
        store.tick(after_delay());
        assert_eq!(store.write_count(), 2);
    }

    #[test]
    fn test_corrupt_store_falls_back_to_defaults() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("config.json"), "{ not json").unwrap();
        let store = ConfigStore::load(&ConfigPaths::in_dir(dir.path()));
        assert_eq!(store.get(keys::CONFIG, keys::EFFECT), "1");
        assert!(dir.path().join("config.json.bak").exists());
        assert_eq!(store.write_count(), 1);
    }

    #[test]
    fn test_legacy_ini_is_migrated_forward() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(
            dir.path().join("config.ini"),
            "[config]\neffect = 4\n\n[presets]\nsunset = {\"r\": \"1\", \"g\": \"2\", \"b\": \"3\", \"a\": \"4\"}\n",
        )
        .unwrap();
        let store = ConfigStore::load(&ConfigPaths::in_dir(dir.path()));
        assert_eq!(store.get(keys::CONFIG, keys::EFFECT), "4");
        assert!(store.presets().get("Sunset").is_some());
        assert_eq!(store.document().schema_version, SCHEMA_VERSION);

        let json = fs::read_to_string(dir.path().join("config.json")).unwrap();
        let doc = ConfigDocument::from_json(&json).unwrap();
        assert_eq!(doc.schema_version, SCHEMA_VERSION);
        assert_eq!(doc.get("config", "effect"), Some("4"));
    }

    #[test]
    fn test_json_wins_over_mirror() {
        let dir = tempfile::tempdir().unwrap();
        let paths = ConfigPaths::in_dir(dir.path());
        {
            let mut store = ConfigStore::load(&paths);
            store.set(keys::CONFIG, keys::EFFECT, 3);
            store.flush().unwrap();
        }
        fs::write(paths.mirror_file(), "[config]\neffect = 0\n").unwrap();
        let store = ConfigStore::load(&paths);
        assert_eq!(store.get(keys::CONFIG, keys::EFFECT), "3");
    }

    #[test]
    fn test_write_failure_keeps_memory_and_retries() {
        let dir = tempfile::tempdir().unwrap();
        let paths = ConfigPaths::in_dir(dir.path());
        let mut store = ConfigStore::load(&paths);
        // A directory where the file should be makes the write fail
        fs::remove_file(paths.config_file()).unwrap();
        fs::create_dir(paths.config_file()).unwrap();

        store.set(keys::LIGHT, "g", 7);
        assert!(matches!(store.flush(), Err(ConfigError::WriteFailed { .. })));
        assert!(store.has_pending_write());
        assert_eq!(store.get(keys::LIGHT, "g"), "7");

        fs::remove_dir(paths.config_file()).unwrap();
        store.set(keys::LIGHT, "g", 8);
        store.tick(after_delay());
        assert!(!store.has_pending_write());
        assert_eq!(store.write_count(), 2);
    }

    #[test]
    fn test_reset_to_defaults() {
        let (_dir, mut store) = temp_store();
        store.set(keys::CONFIG, keys::EFFECT, 4);
        store.preset_registry().save("Ocean", crate::config::presets::Rgba::new(1, 2, 3, 4));
        store.reset_to_defaults().unwrap();
        assert_eq!(store.get(keys::CONFIG, keys::EFFECT), "1");
        assert_eq!(store.presets().names(), vec!["Light Mode", "Dark Mode"]);
        assert!(!store.has_pending_write());
    }
}
