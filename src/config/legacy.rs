//! Plain INI form of the config
//!
//! Older releases stored everything in `config.ini`; the current release
//! writes the same file as a read-only mirror of the JSON store. Reading is
//! only done once, to migrate a store that has no JSON file yet.
//!
//! Keys written by those releases were lower-cased on save, so known keys are
//! matched case-insensitively back to their canonical spelling.

use std::fmt::Write as _;
use tracing::warn;

use crate::config::defaults;
use crate::config::document::ConfigDocument;
use crate::config::presets::{self, Preset, PresetTable};

const PRESETS_SECTION: &str = "presets";

/// Render the mirror: one `[section]` block per section, then `[presets]`
pub fn render(doc: &ConfigDocument) -> String {
    let mut out = String::new();
    for (section, entries) in &doc.sections {
        let _ = writeln!(out, "[{section}]");
        for (key, value) in entries {
            let _ = writeln!(out, "{key} = {value}");
        }
        out.push('\n');
    }
    let _ = writeln!(out, "[{PRESETS_SECTION}]");
    for preset in doc.presets.iter() {
        let _ = writeln!(out, "{} = {}", preset.name, presets::colors_json(preset.colors));
    }
    out
}

/// Parse a legacy INI store into a schema-1 document
pub fn parse(text: &str) -> ConfigDocument {
    let mut doc = ConfigDocument::empty();
    doc.schema_version = 1;
    let mut loaded_presets = Vec::new();

    let mut section: Option<String> = None;
    // Multi-line preset bodies (`Name = {` ... `}`) are accumulated here
    let mut pending: Option<(String, String)> = None;

    for line in text.lines() {
        let trimmed = line.trim();

        if let Some((name, body)) = pending.as_mut() {
            body.push_str(trimmed);
            if trimmed == "}" {
                let (name, body) = (name.clone(), body.clone());
                pending = None;
                push_preset(&mut loaded_presets, &name, &body);
            }
            continue;
        }

        if trimmed.is_empty() || trimmed.starts_with('#') || trimmed.starts_with(';') {
            continue;
        }

        if trimmed.starts_with('[') && trimmed.ends_with(']') {
            section = Some(trimmed[1..trimmed.len() - 1].trim().to_string());
            continue;
        }

        let Some((key, value)) = split_entry(trimmed) else {
            warn!(line = %trimmed, "Ignoring malformed config line");
            continue;
        };

        match section.as_deref() {
            Some(PRESETS_SECTION) => {
                if value.starts_with('{') && !value.ends_with('}') {
                    pending = Some((key.to_string(), value.to_string()));
                } else {
                    push_preset(&mut loaded_presets, key, value);
                }
            }
            Some(name) => {
                let key = canonical_key(name, key);
                doc.set(name, &key, value.to_string());
            }
            None => warn!(key = %key, "Ignoring config entry outside any section"),
        }
    }

    if let Some((name, _)) = pending {
        warn!(preset = %name, "Unterminated preset entry");
    }

    doc.presets = PresetTable::from_entries(loaded_presets);
    doc
}

fn split_entry(line: &str) -> Option<(&str, &str)> {
    let idx = line.find(['=', ':'])?;
    let key = line[..idx].trim();
    if key.is_empty() {
        return None;
    }
    Some((key, line[idx + 1..].trim()))
}

fn canonical_key(section: &str, key: &str) -> String {
    defaults::DEFAULTS
        .iter()
        .find(|(name, _)| *name == section)
        .and_then(|(_, entries)| {
            entries
                .iter()
                .find(|(k, _)| k.eq_ignore_ascii_case(key))
                .map(|(k, _)| k.to_string())
        })
        .unwrap_or_else(|| key.to_string())
}

fn push_preset(out: &mut Vec<Preset>, name: &str, body: &str) {
    match presets::parse_colors_json(body) {
        Ok(colors) => out.push(Preset::new(name, colors)),
        Err(e) => warn!(preset = %name, error = %e, "Failed to load preset"),
    }
}
