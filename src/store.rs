use std::path::Path;

use anyhow::{Context, Result};
use rusqlite::{Connection, OptionalExtension, params};
use serde::{Deserialize, Serialize};
use tracing::warn;

pub const HISTORY_KEY: &str = "animeHistory";
pub const PROFILE_KEY: &str = "userProfile";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResumePoint {
    pub title_id: String,
    pub episode_number: u32,
    pub position_seconds: f64,
    pub episode_ref: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub episode_label: Option<String>,
    pub updated_at: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserProfile {
    pub name: String,
    #[serde(default)]
    pub photo: Option<String>,
    #[serde(default)]
    pub email: Option<String>,
    pub id: String,
    pub last_updated: String,
}

pub struct Store {
    conn: Connection,
}

impl Store {
    pub fn open(path: &Path) -> Result<Self> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("failed to create store directory {}", parent.display()))?;
        }
        let conn = Connection::open(path)
            .with_context(|| format!("failed to open store at {}", path.display()))?;
        Ok(Self { conn })
    }

    #[cfg(test)]
    pub fn open_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory().context("failed to open in-memory store")?;
        Ok(Self { conn })
    }

    pub fn migrate(&self) -> Result<()> {
        self.conn.execute_batch(
            r#"
            CREATE TABLE IF NOT EXISTS kv_store (
                key TEXT PRIMARY KEY,
                value TEXT NOT NULL
            );
            "#,
        )?;
        Ok(())
    }

    fn read_key(&self, key: &str) -> Result<Option<String>> {
        let value = self
            .conn
            .query_row("SELECT value FROM kv_store WHERE key = ?1", params![key], |row| {
                row.get(0)
            })
            .optional()
            .with_context(|| format!("failed to read key {key}"))?;
        Ok(value)
    }

    fn write_key(&self, key: &str, value: &str) -> Result<()> {
        self.conn
            .execute(
                r#"
                INSERT INTO kv_store (key, value)
                VALUES (?1, ?2)
                ON CONFLICT(key) DO UPDATE SET value = excluded.value
                "#,
                params![key, value],
            )
            .with_context(|| format!("failed to write key {key}"))?;
        Ok(())
    }

    fn delete_key(&self, key: &str) -> Result<()> {
        self.conn
            .execute("DELETE FROM kv_store WHERE key = ?1", params![key])
            .with_context(|| format!("failed to delete key {key}"))?;
        Ok(())
    }

    // A missing or unreadable history value degrades to an empty list; the
    // resume history is never worth failing startup over.
    pub fn load_history(&self) -> Vec<ResumePoint> {
        let raw = match self.read_key(HISTORY_KEY) {
            Ok(raw) => raw,
            Err(err) => {
                warn!("failed to read stored history: {err:#}");
                return Vec::new();
            }
        };
        let Some(raw) = raw else {
            return Vec::new();
        };
        match serde_json::from_str(&raw) {
            Ok(list) => list,
            Err(err) => {
                warn!("stored history is malformed, starting empty: {err}");
                Vec::new()
            }
        }
    }

    pub fn save_history(&self, list: &[ResumePoint]) -> Result<()> {
        let encoded = serde_json::to_string(list).context("failed to serialize history")?;
        self.write_key(HISTORY_KEY, &encoded)
    }

    pub fn delete_entry(&self, title_id: &str) -> Result<bool> {
        let mut list = self.load_history();
        let before_len = list.len();
        list.retain(|entry| entry.title_id != title_id);
        if list.len() == before_len {
            return Ok(false);
        }
        self.save_history(&list)?;
        Ok(true)
    }

    pub fn load_user_profile(&self) -> Option<UserProfile> {
        let raw = match self.read_key(PROFILE_KEY) {
            Ok(raw) => raw?,
            Err(err) => {
                warn!("failed to read stored profile: {err:#}");
                return None;
            }
        };
        match serde_json::from_str(&raw) {
            Ok(profile) => Some(profile),
            Err(err) => {
                warn!("stored profile is malformed, ignoring it: {err}");
                None
            }
        }
    }

    pub fn save_user_profile(&self, profile: &UserProfile) -> Result<()> {
        let encoded = serde_json::to_string(profile).context("failed to serialize profile")?;
        self.write_key(PROFILE_KEY, &encoded)
    }

    pub fn clear_user_profile(&self) -> Result<()> {
        self.delete_key(PROFILE_KEY)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_point(title_id: &str) -> ResumePoint {
        ResumePoint {
            title_id: title_id.to_string(),
            episode_number: 3,
            position_seconds: 120.5,
            episode_ref: format!("{title_id}-ep-3"),
            episode_label: Some("Episode 3".to_string()),
            updated_at: 1_700_000_000_000,
        }
    }

    fn open_store() -> Store {
        let store = Store::open_in_memory().expect("open store");
        store.migrate().expect("migrate store");
        store
    }

    #[test]
    fn history_round_trips_through_storage() {
        let store = open_store();
        let list = vec![sample_point("anime-1"), sample_point("anime-2")];

        store.save_history(&list).expect("save history");
        assert_eq!(store.load_history(), list);
    }

    #[test]
    fn missing_history_loads_as_empty() {
        let store = open_store();
        assert!(store.load_history().is_empty());
    }

    #[test]
    fn malformed_history_degrades_to_empty() {
        let store = open_store();
        store
            .write_key(HISTORY_KEY, "{not valid json")
            .expect("write raw value");
        assert!(store.load_history().is_empty());
    }

    #[test]
    fn history_uses_wire_field_names() {
        let store = open_store();
        store
            .save_history(&[sample_point("anime-1")])
            .expect("save history");

        let raw = store
            .read_key(HISTORY_KEY)
            .expect("read raw history")
            .expect("history present");
        assert!(raw.contains("\"titleId\""));
        assert!(raw.contains("\"episodeNumber\""));
        assert!(raw.contains("\"positionSeconds\""));
        assert!(raw.contains("\"episodeRef\""));
        assert!(raw.contains("\"updatedAt\""));
    }

    #[test]
    fn history_entry_without_label_still_parses() {
        let store = open_store();
        let raw = r#"[{"titleId":"anime-1","episodeNumber":1,"positionSeconds":5.0,"episodeRef":"ep-1","updatedAt":1}]"#;
        store.write_key(HISTORY_KEY, raw).expect("write raw value");

        let list = store.load_history();
        assert_eq!(list.len(), 1);
        assert!(list[0].episode_label.is_none());
    }

    #[test]
    fn delete_entry_removes_only_matching_title() {
        let store = open_store();
        store
            .save_history(&[sample_point("anime-1"), sample_point("anime-2")])
            .expect("save history");

        assert!(store.delete_entry("anime-1").expect("delete entry"));
        let remaining = store.load_history();
        assert_eq!(remaining.len(), 1);
        assert_eq!(remaining[0].title_id, "anime-2");

        assert!(!store.delete_entry("anime-1").expect("repeat delete"));
    }

    #[test]
    fn profile_round_trips_and_clears() {
        let store = open_store();
        let profile = UserProfile {
            name: "Rin".to_string(),
            photo: None,
            email: Some("rin@example.test".to_string()),
            id: "user-77".to_string(),
            last_updated: "2026-08-01T10:00:00+00:00".to_string(),
        };

        store.save_user_profile(&profile).expect("save profile");
        assert_eq!(store.load_user_profile(), Some(profile));

        store.clear_user_profile().expect("clear profile");
        assert!(store.load_user_profile().is_none());
    }

    #[test]
    fn malformed_profile_is_ignored() {
        let store = open_store();
        store
            .write_key(PROFILE_KEY, "[]")
            .expect("write raw value");
        assert!(store.load_user_profile().is_none());
    }
}
