use anyhow::{Context, Result};
use rusqlite::{params, Connection};
use serde::{de::DeserializeOwned, Serialize};
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

use crate::models::UserProfile;

const SESSION_KEY: &str = "session.user";
const GUIDE_KEY: &str = "session.guide";

/// Local key/value storage backing the session and catalog stores.
pub struct Database {
    conn: Connection,
    path: PathBuf,
}

impl Database {
    pub fn open(path: &Path) -> Result<Self> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create data directory {}", parent.display()))?;
        }
        let conn = Connection::open(path)
            .with_context(|| format!("Failed to open database at {}", path.display()))?;
        let db = Self {
            conn,
            path: path.to_path_buf(),
        };
        db.init()?;
        Ok(db)
    }

    #[cfg(test)]
    pub fn open_in_memory() -> Result<Self> {
        let db = Self {
            conn: Connection::open_in_memory()?,
            path: PathBuf::from(":memory:"),
        };
        db.init()?;
        Ok(db)
    }

    pub fn path(&self) -> &PathBuf {
        &self.path
    }

    pub fn default_path() -> PathBuf {
        // Use XDG data directory or fallback
        if let Some(proj_dirs) = directories::ProjectDirs::from("", "", "careeros") {
            proj_dirs.data_dir().join("careeros.db")
        } else {
            PathBuf::from("careeros.db")
        }
    }

    fn init(&self) -> Result<()> {
        self.conn.execute_batch(
            r#"
            CREATE TABLE IF NOT EXISTS kv (
                key TEXT PRIMARY KEY,
                value TEXT NOT NULL,
                updated_at TEXT NOT NULL DEFAULT (datetime('now'))
            );
            "#,
        )?;
        Ok(())
    }

    // --- Raw key/value operations ---

    pub fn get_raw(&self, key: &str) -> Result<Option<String>> {
        let result = self
            .conn
            .query_row("SELECT value FROM kv WHERE key = ?1", [key], |row| row.get(0));
        match result {
            Ok(value) => Ok(Some(value)),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    pub fn put_raw(&self, key: &str, value: &str) -> Result<()> {
        self.conn.execute(
            "INSERT INTO kv (key, value) VALUES (?1, ?2)
             ON CONFLICT(key) DO UPDATE SET value = excluded.value, updated_at = datetime('now')",
            params![key, value],
        )?;
        Ok(())
    }

    pub fn remove(&self, key: &str) -> Result<()> {
        self.conn.execute("DELETE FROM kv WHERE key = ?1", [key])?;
        Ok(())
    }

    /// Reads a JSON document. A stored value that fails to parse is an error;
    /// callers decide whether to fall back.
    pub fn get_json<T: DeserializeOwned>(&self, key: &str) -> Result<Option<T>> {
        match self.get_raw(key)? {
            Some(raw) => {
                let value = serde_json::from_str(&raw)
                    .with_context(|| format!("Stored value for '{}' is malformed", key))?;
                Ok(Some(value))
            }
            None => Ok(None),
        }
    }

    pub fn put_json<T: Serialize>(&self, key: &str, value: &T) -> Result<()> {
        let raw = serde_json::to_string(value)?;
        self.put_raw(key, &raw)
    }

    // --- Session persistence ---

    /// Restores the persisted profile. A corrupted record counts as no session.
    pub fn restore_session(&self) -> Result<Option<UserProfile>> {
        match self.get_json::<UserProfile>(SESSION_KEY) {
            Ok(profile) => Ok(profile),
            Err(e) => {
                warn!(error = %e, "discarding unreadable session record");
                Ok(None)
            }
        }
    }

    pub fn update_user(&self, profile: &UserProfile) -> Result<()> {
        debug!(name = %profile.name, "persisting session profile");
        self.put_json(SESSION_KEY, profile)
    }

    pub fn logout(&self) -> Result<()> {
        self.remove(SESSION_KEY)?;
        self.remove(GUIDE_KEY)
    }

    /// Marks the getting-started guide as owed to the next screen that can
    /// show it, surviving process restarts.
    pub fn set_guide_pending(&self, pending: bool) -> Result<()> {
        if pending {
            self.put_raw(GUIDE_KEY, "1")
        } else {
            self.remove(GUIDE_KEY)
        }
    }

    pub fn guide_pending(&self) -> Result<bool> {
        Ok(self.get_raw(GUIDE_KEY)?.is_some())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Persona;

    #[test]
    fn test_session_round_trip_and_logout() {
        let db = Database::open_in_memory().unwrap();
        assert!(db.restore_session().unwrap().is_none());

        let profile = UserProfile {
            name: "Ada".to_string(),
            industry: Some("Mining".to_string()),
            primary_focus: Some(Persona::Contractor),
            ..Default::default()
        };
        db.update_user(&profile).unwrap();
        assert_eq!(db.restore_session().unwrap(), Some(profile));

        db.logout().unwrap();
        assert!(db.restore_session().unwrap().is_none());
    }

    #[test]
    fn test_guide_flag_is_cleared_by_logout() {
        let db = Database::open_in_memory().unwrap();
        assert!(!db.guide_pending().unwrap());
        db.set_guide_pending(true).unwrap();
        assert!(db.guide_pending().unwrap());
        db.logout().unwrap();
        assert!(!db.guide_pending().unwrap());
    }

    #[test]
    fn test_corrupted_session_is_ignored() {
        let db = Database::open_in_memory().unwrap();
        db.put_raw(SESSION_KEY, "{not json").unwrap();
        assert!(db.restore_session().unwrap().is_none());
    }

    #[test]
    fn test_get_json_reports_malformed_value() {
        let db = Database::open_in_memory().unwrap();
        db.put_raw("catalog.courses", "[1, 2").unwrap();
        let result: Result<Option<Vec<u32>>> = db.get_json("catalog.courses");
        assert!(result.is_err());
    }

    #[test]
    fn test_put_overwrites_last_writer_wins() {
        let db = Database::open_in_memory().unwrap();
        db.put_raw("k", "one").unwrap();
        db.put_raw("k", "two").unwrap();
        assert_eq!(db.get_raw("k").unwrap().as_deref(), Some("two"));
    }

    #[test]
    fn test_session_survives_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("careeros.db");
        {
            let db = Database::open(&path).unwrap();
            db.update_user(&UserProfile {
                name: "Grace".to_string(),
                ..Default::default()
            })
            .unwrap();
        }
        let db = Database::open(&path).unwrap();
        assert_eq!(db.restore_session().unwrap().unwrap().name, "Grace");
        assert_eq!(db.path(), &path);
    }
}
