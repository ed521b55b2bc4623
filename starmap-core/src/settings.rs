//! Persisted client state: the form snapshot and the MRU histories.
//!
//! Values are stored as JSON strings in `localStorage`. Anything that fails to
//! parse is treated as absent.

use std::collections::BTreeMap;

use log::warn;
use serde::{Deserialize, Serialize};

pub const SETTINGS_KEY: &str = "starMapSettings";
pub const TEXT_HISTORY_KEY: &str = "starMapTextHistory";
pub const ZIP_HISTORY_KEY: &str = "starMapZipHistory";
pub const ADDRESS_HISTORY_KEY: &str = "starMapAddressHistory";

pub const HISTORY_LIMIT: usize = 10;

/// Form values keyed by element id.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct FormSnapshot {
    pub fields: BTreeMap<String, String>,
    pub checks: BTreeMap<String, bool>,
}

impl FormSnapshot {
    pub fn from_json(json: &str) -> Self {
        serde_json::from_str(json).unwrap_or_else(|e| {
            warn!("ignoring unreadable saved settings: {e}");
            Self::default()
        })
    }

    pub fn to_json(&self) -> String {
        // maps of strings and bools always serialize
        serde_json::to_string(self).unwrap_or_default()
    }

    pub fn field(&self, id: &str) -> Option<&str> {
        self.fields.get(id).map(String::as_str)
    }

    pub fn check(&self, id: &str) -> Option<bool> {
        self.checks.get(id).copied()
    }

    pub fn set_field(&mut self, id: impl Into<String>, value: impl Into<String>) {
        self.fields.insert(id.into(), value.into());
    }

    pub fn set_check(&mut self, id: impl Into<String>, value: bool) {
        self.checks.insert(id.into(), value);
    }
}

/// Most-recent-first list of distinct entries.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct History {
    entries: Vec<String>,
}

impl History {
    pub fn from_json(json: &str) -> Self {
        let mut h: Self = serde_json::from_str(json).unwrap_or_else(|e| {
            warn!("ignoring unreadable history: {e}");
            Self::default()
        });
        h.entries.truncate(HISTORY_LIMIT);
        h
    }

    pub fn to_json(&self) -> String {
        serde_json::to_string(self).unwrap_or_default()
    }

    /// Move `entry` to the front. Blank entries are ignored.
    pub fn push(&mut self, entry: &str) -> bool {
        let entry = entry.trim();
        if entry.is_empty() {
            return false;
        }
        let lower = entry.to_lowercase();
        self.entries.retain(|e| e.to_lowercase() != lower);
        self.entries.insert(0, entry.to_string());
        self.entries.truncate(HISTORY_LIMIT);
        true
    }

    pub fn entries(&self) -> &[String] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn history_is_mru_and_case_insensitive() {
        let mut h = History::default();
        h.push("Charleston");
        h.push("29401");
        h.push("  charleston ");
        assert_eq!(h.entries(), ["charleston", "29401"]);
        assert!(!h.push("   "));
    }

    #[test]
    fn history_is_capped() {
        let mut h = History::default();
        for i in 0..25 {
            h.push(&format!("entry {i}"));
        }
        assert_eq!(h.len(), HISTORY_LIMIT);
        assert_eq!(h.entries()[0], "entry 24");
        let back = History::from_json(&h.to_json());
        assert_eq!(back, h);
    }

    #[test]
    fn unreadable_json_is_empty() {
        assert!(History::from_json("{not json").is_empty());
        assert_eq!(FormSnapshot::from_json("42"), FormSnapshot::default());
    }

    #[test]
    fn snapshot_round_trip() {
        let mut s = FormSnapshot::default();
        s.set_field("latitude", "N32°55.93211′");
        s.set_check("grid", true);
        let back = FormSnapshot::from_json(&s.to_json());
        assert_eq!(back.field("latitude"), Some("N32°55.93211′"));
        assert_eq!(back.check("grid"), Some(true));
        assert_eq!(back.check("milkyWay"), None);
    }

    #[test]
    fn partial_snapshot_fills_defaults() {
        let s = FormSnapshot::from_json(r#"{"fields":{"date":"2024-06-21"}}"#);
        assert_eq!(s.field("date"), Some("2024-06-21"));
        assert!(s.checks.is_empty());
    }
}
