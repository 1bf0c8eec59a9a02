//! Household profiles persisted in SQLite.

use crate::storage::error::ProfileError;
use log::debug;
use rusqlite::{params, Connection, OptionalExtension};
use std::path::{Path, PathBuf};

const SCHEMA: &str = "
CREATE TABLE IF NOT EXISTS users (
    id TEXT PRIMARY KEY,
    display_name TEXT,
    created_at TEXT NOT NULL DEFAULT CURRENT_TIMESTAMP
);
CREATE TABLE IF NOT EXISTS profiles (
    user_id TEXT PRIMARY KEY REFERENCES users(id),
    location_text TEXT NOT NULL,
    lat REAL NOT NULL,
    lon REAL NOT NULL,
    area_m2 REAL NOT NULL,
    occupants INTEGER NOT NULL,
    heating_type TEXT,
    updated_at TEXT NOT NULL DEFAULT CURRENT_TIMESTAMP
);
";

/// A household's location and dwelling characteristics.
#[derive(Debug, Clone, PartialEq)]
pub struct Profile {
    pub user_id: String,
    pub location_text: String,
    pub lat: f64,
    pub lon: f64,
    pub area_m2: f64,
    pub occupants: u32,
    pub heating_type: Option<String>,
}

pub trait ProfileStore {
    fn get(&self, user_id: &str) -> Result<Option<Profile>, ProfileError>;

    /// Inserts the profile or replaces every field of the existing one.
    /// A user that was never registered is created without a display name.
    fn upsert(&self, profile: &Profile) -> Result<(), ProfileError>;

    /// Registers a user; an existing user is left untouched.
    fn upsert_user(&self, user_id: &str, display_name: Option<&str>) -> Result<(), ProfileError>;
}

/// [`ProfileStore`] over an SQLite file, one connection per call.
#[derive(Debug, Clone)]
pub struct SqliteProfileStore {
    path: PathBuf,
}

impl SqliteProfileStore {
    /// Opens the store at `db_url`, either `sqlite:///path/to/file.db` or a
    /// bare path. The file, its directory and the schema are created as needed.
    pub fn open(db_url: &str) -> Result<Self, ProfileError> {
        let path = PathBuf::from(db_url.strip_prefix("sqlite:///").unwrap_or(db_url));
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)
                .map_err(|e| ProfileError::DirCreation(parent.to_path_buf(), e))?;
        }
        let store = Self { path };
        store.connect()?.execute_batch(SCHEMA)?;
        debug!("Profile store ready at {}", store.path.display());
        Ok(store)
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn connect(&self) -> Result<Connection, ProfileError> {
        Connection::open(&self.path).map_err(|e| ProfileError::Open(self.path.clone(), e))
    }
}

impl ProfileStore for SqliteProfileStore {
    fn get(&self, user_id: &str) -> Result<Option<Profile>, ProfileError> {
        let conn = self.connect()?;
        let profile = conn
            .query_row(
                "SELECT user_id, location_text, lat, lon, area_m2, occupants, heating_type
                 FROM profiles WHERE user_id = ?1",
                params![user_id],
                |row| {
                    Ok(Profile {
                        user_id: row.get(0)?,
                        location_text: row.get(1)?,
                        lat: row.get(2)?,
                        lon: row.get(3)?,
                        area_m2: row.get(4)?,
                        occupants: row.get(5)?,
                        heating_type: row.get(6)?,
                    })
                },
            )
            .optional()?;
        Ok(profile)
    }

    fn upsert(&self, profile: &Profile) -> Result<(), ProfileError> {
        let mut conn = self.connect()?;
        let tx = conn.transaction()?;
        tx.execute(
            "INSERT OR IGNORE INTO users (id) VALUES (?1)",
            params![profile.user_id],
        )?;
        tx.execute(
            "INSERT INTO profiles (user_id, location_text, lat, lon, area_m2, occupants, heating_type)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
             ON CONFLICT(user_id) DO UPDATE SET
                 location_text = excluded.location_text,
                 lat = excluded.lat,
                 lon = excluded.lon,
                 area_m2 = excluded.area_m2,
                 occupants = excluded.occupants,
                 heating_type = excluded.heating_type,
                 updated_at = CURRENT_TIMESTAMP",
            params![
                profile.user_id,
                profile.location_text,
                profile.lat,
                profile.lon,
                profile.area_m2,
                profile.occupants,
                profile.heating_type,
            ],
        )?;
        tx.commit()?;
        debug!("Upserted profile for {}", profile.user_id);
        Ok(())
    }

    fn upsert_user(&self, user_id: &str, display_name: Option<&str>) -> Result<(), ProfileError> {
        self.connect()?.execute(
            "INSERT OR IGNORE INTO users (id, display_name) VALUES (?1, ?2)",
            params![user_id, display_name],
        )?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn profile(user_id: &str) -> Profile {
        Profile {
            user_id: user_id.to_string(),
            location_text: "Budapest".to_string(),
            lat: 47.4979,
            lon: 19.0402,
            area_m2: 72.5,
            occupants: 3,
            heating_type: Some("gas".to_string()),
        }
    }

    #[test]
    fn test_upsert_then_get() -> Result<(), ProfileError> {
        let dir = tempdir().map_err(|e| ProfileError::DirCreation("tmp".into(), e))?;
        let url = format!("sqlite:///{}", dir.path().join("db").join("app.db").display());
        let store = SqliteProfileStore::open(&url)?;

        store.upsert_user("u1", Some("Anna"))?;
        store.upsert(&profile("u1"))?;

        assert_eq!(store.get("u1")?, Some(profile("u1")));
        assert_eq!(store.get("nobody")?, None);
        Ok(())
    }

    #[test]
    fn test_upsert_overwrites_every_field() -> Result<(), ProfileError> {
        let dir = tempdir().map_err(|e| ProfileError::DirCreation("tmp".into(), e))?;
        let store = SqliteProfileStore::open(&dir.path().join("app.db").display().to_string())?;

        store.upsert(&profile("u1"))?;
        let updated = Profile {
            location_text: "Szeged".to_string(),
            occupants: 1,
            heating_type: None,
            ..profile("u1")
        };
        store.upsert(&updated)?;

        assert_eq!(store.get("u1")?, Some(updated));
        Ok(())
    }

    #[test]
    fn test_upsert_registers_unknown_user() -> Result<(), ProfileError> {
        let dir = tempdir().map_err(|e| ProfileError::DirCreation("tmp".into(), e))?;
        let store = SqliteProfileStore::open(&dir.path().join("app.db").display().to_string())?;

        store.upsert(&profile("fresh"))?;
        assert_eq!(store.get("fresh")?, Some(profile("fresh")));

        let conn = store.connect()?;
        let name: Option<String> = conn.query_row(
            "SELECT display_name FROM users WHERE id = ?1",
            params!["fresh"],
            |row| row.get(0),
        )?;
        assert_eq!(name, None);

        // a later registration keeps the row created by the profile upsert
        store.upsert_user("fresh", Some("Late"))?;
        store.upsert(&profile("fresh"))?;
        let users: i64 = conn.query_row("SELECT COUNT(*) FROM users", [], |row| row.get(0))?;
        assert_eq!(users, 1);
        Ok(())
    }

    #[test]
    fn test_existing_user_is_not_replaced() -> Result<(), ProfileError> {
        let dir = tempdir().map_err(|e| ProfileError::DirCreation("tmp".into(), e))?;
        let store = SqliteProfileStore::open(&dir.path().join("app.db").display().to_string())?;

        store.upsert_user("u1", Some("First"))?;
        store.upsert_user("u1", Some("Second"))?;

        let conn = store.connect()?;
        let name: Option<String> = conn.query_row(
            "SELECT display_name FROM users WHERE id = ?1",
            params!["u1"],
            |row| row.get(0),
        )?;
        assert_eq!(name.as_deref(), Some("First"));
        Ok(())
    }
}
