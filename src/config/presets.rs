//! Named color presets
//!
//! A preset is a title-cased name bound to one `{r, g, b, a}` bundle. The
//! table keeps definition order (built-ins first) and serializes as a JSON
//! object of name → decimal-string colors.

use serde::de::{MapAccess, Visitor};
use serde::ser::SerializeMap;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use tracing::{info, warn};

use crate::config::defaults;
use crate::config::store::ConfigStore;
use crate::constants::keys;

/// Four unsigned byte color components
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Rgba {
    pub r: u8,
    pub g: u8,
    pub b: u8,
    pub a: u8,
}

impl Rgba {
    pub const fn new(r: u8, g: u8, b: u8, a: u8) -> Self {
        Self { r, g, b, a }
    }

    /// Components in `COLOR_KEYS` order
    pub fn components(&self) -> [(&'static str, u8); 4] {
        [("r", self.r), ("g", self.g), ("b", self.b), ("a", self.a)]
    }

    /// Read a color section from the store, falling back per component
    pub fn from_section(store: &ConfigStore, section: &str) -> Self {
        Self {
            r: store.get_u8(section, "r"),
            g: store.get_u8(section, "g"),
            b: store.get_u8(section, "b"),
            a: store.get_u8(section, "a"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Preset {
    pub name: String,
    pub colors: Rgba,
}

impl Preset {
    pub fn new(name: &str, colors: Rgba) -> Self {
        Self {
            name: normalize_name(name),
            colors,
        }
    }
}

/// Title-case a preset name: "dark mode" → "Dark Mode"
///
/// A letter is upper-cased when the previous character is not a letter and
/// lower-cased otherwise.
pub fn normalize_name(name: &str) -> String {
    let mut out = String::with_capacity(name.len());
    let mut prev_alpha = false;
    for ch in name.trim().chars() {
        if ch.is_alphabetic() {
            if prev_alpha {
                out.extend(ch.to_lowercase());
            } else {
                out.extend(ch.to_uppercase());
            }
            prev_alpha = true;
        } else {
            out.push(ch);
            prev_alpha = false;
        }
    }
    out
}

/// On-disk shape of a color bundle: `{"r": "220", ...}`
#[derive(Debug, Serialize, Deserialize)]
struct RawColors {
    #[serde(deserialize_with = "deserialize_component")]
    r: String,
    #[serde(deserialize_with = "deserialize_component")]
    g: String,
    #[serde(deserialize_with = "deserialize_component")]
    b: String,
    #[serde(deserialize_with = "deserialize_component")]
    a: String,
}

/// Accept both `"220"` and `220` for a component
fn deserialize_component<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum StrOrInt {
        Str(String),
        Int(i64),
    }

    match StrOrInt::deserialize(deserializer)? {
        StrOrInt::Str(s) => Ok(s),
        StrOrInt::Int(i) => Ok(i.to_string()),
    }
}

impl From<Rgba> for RawColors {
    fn from(c: Rgba) -> Self {
        Self {
            r: c.r.to_string(),
            g: c.g.to_string(),
            b: c.b.to_string(),
            a: c.a.to_string(),
        }
    }
}

impl TryFrom<RawColors> for Rgba {
    type Error = std::num::ParseIntError;

    fn try_from(raw: RawColors) -> Result<Self, Self::Error> {
        Ok(Self {
            r: raw.r.trim().parse()?,
            g: raw.g.trim().parse()?,
            b: raw.b.trim().parse()?,
            a: raw.a.trim().parse()?,
        })
    }
}

/// Parse one inline JSON color bundle (used by the legacy INI reader)
pub fn parse_colors_json(text: &str) -> anyhow::Result<Rgba> {
    let raw: RawColors = serde_json::from_str(text)?;
    Ok(Rgba::try_from(raw)?)
}

/// Render one color bundle as single-line JSON (used by the INI mirror)
pub fn colors_json(colors: Rgba) -> String {
    serde_json::to_string(&RawColors::from(colors)).unwrap_or_default()
}

/// Insertion-ordered preset table
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PresetTable {
    entries: Vec<Preset>,
}

impl Default for PresetTable {
    fn default() -> Self {
        Self {
            entries: defaults::builtin_presets(),
        }
    }
}

impl PresetTable {
    pub fn names(&self) -> Vec<String> {
        self.entries.iter().map(|p| p.name.clone()).collect()
    }

    pub fn get(&self, name: &str) -> Option<&Preset> {
        let name = normalize_name(name);
        self.entries.iter().find(|p| p.name == name)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Preset> {
        self.entries.iter()
    }

    /// Insert or overwrite in place; new names go to the end
    pub fn upsert(&mut self, preset: Preset) {
        match self.entries.iter_mut().find(|p| p.name == preset.name) {
            Some(existing) => existing.colors = preset.colors,
            None => self.entries.push(preset),
        }
    }

    fn remove(&mut self, normalized_name: &str) -> bool {
        let before = self.entries.len();
        self.entries.retain(|p| p.name != normalized_name);
        self.entries.len() != before
    }

    /// Built-ins are always present and always first
    fn ensure_builtins(&mut self) {
        let mut seeded = defaults::builtin_presets();
        for preset in seeded.iter_mut() {
            if let Some(stored) = self.entries.iter().find(|p| p.name == preset.name) {
                preset.colors = stored.colors;
            }
        }
        self.entries.retain(|p| !defaults::is_builtin(&p.name));
        seeded.append(&mut self.entries);
        self.entries = seeded;
    }

    /// Build from loaded entries, seeding built-ins
    pub fn from_entries(entries: Vec<Preset>) -> Self {
        let mut table = Self { entries: Vec::new() };
        for preset in entries {
            table.upsert(preset);
        }
        table.ensure_builtins();
        table
    }
}

impl Serialize for PresetTable {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.entries.len()))?;
        for preset in &self.entries {
            map.serialize_entry(&preset.name, &RawColors::from(preset.colors))?;
        }
        map.end()
    }
}

impl<'de> Deserialize<'de> for PresetTable {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        struct TableVisitor;

        impl<'de> Visitor<'de> for TableVisitor {
            type Value = PresetTable;

            fn expecting(&self, f: &mut fmt::Formatter) -> fmt::Result {
                f.write_str("a map of preset name to color bundle")
            }

            fn visit_map<A: MapAccess<'de>>(self, mut map: A) -> Result<Self::Value, A::Error> {
                let mut entries = Vec::new();
                while let Some((name, value)) = map.next_entry::<String, serde_json::Value>()? {
                    // A single bad preset is skipped, not fatal to the whole store
                    let parsed = serde_json::from_value::<RawColors>(value)
                        .map_err(anyhow::Error::from)
                        .and_then(|raw| Rgba::try_from(raw).map_err(anyhow::Error::from));
                    match parsed {
                        Ok(colors) => entries.push(Preset::new(&name, colors)),
                        Err(e) => warn!(preset = %name, error = %e, "Skipping unreadable preset"),
                    }
                }
                Ok(PresetTable::from_entries(entries))
            }
        }

        deserializer.deserialize_map(TableVisitor)
    }
}

/// Reasons a preset operation is refused
#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum PresetError {
    #[error("preset '{0}' is built in and cannot be deleted")]
    Protected(String),
    #[error("no preset named '{0}'")]
    Unknown(String),
}

/// Preset operations layered on the config store
pub struct PresetRegistry<'a> {
    store: &'a mut ConfigStore,
}

impl<'a> PresetRegistry<'a> {
    pub fn new(store: &'a mut ConfigStore) -> Self {
        Self { store }
    }

    /// Names in definition order, built-ins first
    pub fn names(&self) -> Vec<String> {
        self.store.presets().names()
    }

    pub fn get(&self, name: &str) -> Option<Preset> {
        self.store.presets().get(name).cloned()
    }

    /// Create or overwrite `name` with `colors` and persist immediately
    pub fn save(&mut self, name: &str, colors: Rgba) -> String {
        let preset = Preset::new(name, colors);
        let stored_name = preset.name.clone();
        self.store.presets_mut().upsert(preset);
        info!(preset = %stored_name, "Saved preset");
        self.persist();
        stored_name
    }

    /// Snapshot the current light section as preset `name`
    pub fn save_current(&mut self, name: &str) -> String {
        let colors = Rgba::from_section(self.store, keys::LIGHT);
        self.save(name, colors)
    }

    /// Remove a user preset, refusing built-ins
    pub fn delete(&mut self, name: &str) -> Result<(), PresetError> {
        let normalized = normalize_name(name);
        if defaults::is_builtin(&normalized) {
            warn!(preset = %normalized, "Refusing to delete built-in preset");
            return Err(PresetError::Protected(normalized));
        }
        if !self.store.presets_mut().remove(&normalized) {
            return Err(PresetError::Unknown(normalized));
        }
        info!(preset = %normalized, "Deleted preset");
        self.persist();
        Ok(())
    }

    /// Write the preset into both light and dark sections and remember it.
    ///
    /// Both themes always share the preset colors.
    pub fn apply(&mut self, name: &str) -> bool {
        let Some(preset) = self.get(name) else {
            warn!(preset = %name, "Cannot apply unknown preset");
            return false;
        };
        for (key, value) in preset.colors.components() {
            self.store.set(keys::LIGHT, key, value);
            self.store.set(keys::DARK, key, value);
        }
        self.store.set(keys::GUI, keys::LAST_PRESET, &preset.name);
        info!(preset = %preset.name, "Applied preset");
        true
    }

    fn persist(&mut self) {
        self.store.mark_dirty();
        if let Err(e) = self.store.flush() {
            tracing::error!(error = %e, "Failed to persist presets");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::paths::ConfigPaths;

    fn temp_store() -> (tempfile::TempDir, ConfigStore) {
        let dir = tempfile::tempdir().unwrap();
        let store = ConfigStore::load(&ConfigPaths::in_dir(dir.path()));
        (dir, store)
    }

    #[test]
    fn test_normalize_name() {
        assert_eq!(normalize_name("dark mode"), "Dark Mode");
        assert_eq!(normalize_name("LIGHT MODE"), "Light Mode");
        assert_eq!(normalize_name("  my-preset 2 "), "My-Preset 2");
    }

    #[test]
    fn test_builtins_listed_first() {
        let (_dir, mut store) = temp_store();
        let mut registry = PresetRegistry::new(&mut store);
        registry.save("sunset", Rgba::new(250, 120, 60, 200));
        assert_eq!(registry.names(), vec!["Light Mode", "Dark Mode", "Sunset"]);
    }

    #[test]
    fn test_get_is_case_insensitive() {
        let (_dir, mut store) = temp_store();
        let registry = PresetRegistry::new(&mut store);
        let preset = registry.get("dark MODE").unwrap();
        assert_eq!(preset.colors, Rgba::new(0, 0, 0, 120));
        assert!(registry.get("missing").is_none());
    }

    #[test]
    fn test_delete_builtin_refused() {
        let (_dir, mut store) = temp_store();
        let mut registry = PresetRegistry::new(&mut store);
        let before = registry.names();
        assert!(registry.delete("Light Mode").is_err());
        assert_eq!(
            registry.delete("light mode"),
            Err(PresetError::Protected("Light Mode".to_string()))
        );
        assert_eq!(registry.names(), before);
    }

    #[test]
    fn test_save_then_delete_user_preset() {
        let (_dir, mut store) = temp_store();
        let mut registry = PresetRegistry::new(&mut store);
        registry.save("Ocean", Rgba::new(10, 80, 160, 140));
        assert!(registry.names().contains(&"Ocean".to_string()));
        assert!(registry.delete("ocean").is_ok());
        assert!(!registry.names().contains(&"Ocean".to_string()));
        assert!(registry.delete("ocean").is_err());
    }

    #[test]
    fn test_save_persists_immediately() {
        let (_dir, mut store) = temp_store();
        let writes = store.write_count();
        PresetRegistry::new(&mut store).save("Ocean", Rgba::new(1, 2, 3, 4));
        assert_eq!(store.write_count(), writes + 1);
        assert!(!store.has_pending_write());
    }

    #[test]
    fn test_apply_writes_both_themes() {
        let (_dir, mut store) = temp_store();
        let mut registry = PresetRegistry::new(&mut store);
        assert!(registry.apply("Dark Mode"));
        for section in [keys::LIGHT, keys::DARK] {
            assert_eq!(Rgba::from_section(&store, section), Rgba::new(0, 0, 0, 120));
        }
        assert_eq!(store.get(keys::GUI, keys::LAST_PRESET), "Dark Mode");
    }

    #[test]
    fn test_apply_unknown_preset() {
        let (_dir, mut store) = temp_store();
        let before = store.get(keys::GUI, keys::LAST_PRESET);
        assert!(!PresetRegistry::new(&mut store).apply("Nope"));
        assert_eq!(store.get(keys::GUI, keys::LAST_PRESET), before);
    }

    #[test]
    fn test_save_current_snapshots_light_section() {
        let (_dir, mut store) = temp_store();
        store.set(keys::LIGHT, "r", 12);
        store.set(keys::LIGHT, "a", 99);
        let name = PresetRegistry::new(&mut store).save_current("snap");
        let preset = store.presets().get(&name).unwrap();
        assert_eq!(preset.colors, Rgba::new(12, 255, 255, 99));
    }

    #[test]
    fn test_table_deserialize_skips_bad_entries_and_seeds_builtins() {
        let json = r#"{"sunset": {"r": "1", "g": 2, "b": "3", "a": "4"}, "broken": {"r": "x"}}"#;
        let table: PresetTable = serde_json::from_str(json).unwrap();
        assert_eq!(table.names(), vec!["Light Mode", "Dark Mode", "Sunset"]);
        assert_eq!(table.get("Sunset").unwrap().colors, Rgba::new(1, 2, 3, 4));
    }

    #[test]
    fn test_table_serializes_in_order() {
        let mut table = PresetTable::default();
        table.upsert(Preset::new("zeta", Rgba::new(1, 1, 1, 1)));
        table.upsert(Preset::new("alpha", Rgba::new(2, 2, 2, 2)));
        let json = serde_json::to_string(&table).unwrap();
        let light = json.find("Light Mode").unwrap();
        let zeta = json.find("Zeta").unwrap();
        let alpha = json.find("Alpha").unwrap();
        assert!(light < zeta && zeta < alpha);
    }
}
