//! The config document: section → key → string value, plus presets
//!
//! Serialized as JSON with a `schema_version`. Sections use `BTreeMap` so the
//! JSON and INI renderings are byte-stable for the same content.

use serde::{Deserialize, Deserializer, Serialize};
use std::collections::BTreeMap;

use crate::config::defaults;
use crate::config::presets::PresetTable;
use crate::constants::config::SCHEMA_VERSION;

pub type Section = BTreeMap<String, String>;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConfigDocument {
    /// Missing in stores written before versioning (schema 1)
    #[serde(default = "legacy_schema")]
    pub schema_version: u32,
    #[serde(default, deserialize_with = "deserialize_sections")]
    pub sections: BTreeMap<String, Section>,
    #[serde(default)]
    pub presets: PresetTable,
}

fn legacy_schema() -> u32 {
    1
}

/// Sections accept scalar JSON values and keep their string form
fn deserialize_sections<'de, D>(deserializer: D) -> Result<BTreeMap<String, Section>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = BTreeMap::<String, BTreeMap<String, serde_json::Value>>::deserialize(deserializer)?;
    Ok(raw
        .into_iter()
        .map(|(name, entries)| {
            let entries = entries
                .into_iter()
                .map(|(key, value)| {
                    let value = match value {
                        serde_json::Value::String(s) => s,
                        serde_json::Value::Null => String::new(),
                        other => other.to_string(),
                    };
                    (key, value)
                })
                .collect();
            (name, entries)
        })
        .collect())
}

impl Default for ConfigDocument {
    fn default() -> Self {
        let sections = defaults::DEFAULTS
            .iter()
            .map(|(name, entries)| {
                let section = entries
                    .iter()
                    .map(|(k, v)| (k.to_string(), v.to_string()))
                    .collect();
                (name.to_string(), section)
            })
            .collect();
        Self {
            schema_version: SCHEMA_VERSION,
            sections,
            presets: PresetTable::default(),
        }
    }
}

impl ConfigDocument {
    /// Empty sections, built-in presets only
    pub fn empty() -> Self {
        Self {
            schema_version: SCHEMA_VERSION,
            sections: BTreeMap::new(),
            presets: PresetTable::default(),
        }
    }

    pub fn get(&self, section: &str, key: &str) -> Option<&str> {
        self.sections
            .get(section)
            .and_then(|s| s.get(key))
            .map(String::as_str)
    }

    /// Last write wins
    pub fn set(&mut self, section: &str, key: &str, value: String) {
        self.sections
            .entry(section.to_string())
            .or_default()
            .insert(key.to_string(), value);
    }

    pub fn needs_migration(&self) -> bool {
        self.schema_version < SCHEMA_VERSION
    }

    /// Fill keys the default table knows but the document lacks
    pub fn fill_missing_defaults(&mut self) -> Vec<String> {
        let mut added = Vec::new();
        for (section, entries) in defaults::DEFAULTS {
            for (key, value) in entries.iter() {
                if self.get(section, key).is_none() {
                    self.set(section, key, value.to_string());
                    added.push(format!("{section}.{key}"));
                }
            }
        }
        added
    }

    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(self)
    }

    pub fn from_json(text: &str) -> serde_json::Result<Self> {
        serde_json::from_str(text)
    }
}
