//! SQLite database implementation for persistent storage

use std::path::PathBuf;
use std::sync::Mutex;

use anyhow::{Context, Result};
use rusqlite::{params, Connection, OptionalExtension};
use tracing::{debug, error, info};

use crate::core::{Profile, ProfileBindings, Settings};

/// Database wrapper for SQLite operations
pub struct Database {
    conn: Mutex<Connection>,
}

impl Database {
    /// Create a new database connection
    pub fn new() -> Result<Self> {
        let db_path = Self::get_database_path()?;

        // Ensure parent directory exists
        if let Some(parent) = db_path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let conn = Connection::open(&db_path)
            .context(format!("Failed to open database at {:?}", db_path))?;

        conn.execute_batch("PRAGMA journal_mode=WAL; PRAGMA foreign_keys=ON;")?;

        info!("Database opened at {:?}", db_path);
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    /// Private database that disappears with the connection
    pub fn open_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory().context("Failed to open in-memory database")?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    /// Get the database file path
    fn get_database_path() -> Result<PathBuf> {
        let data_dir = dirs::data_dir()
            .context("Failed to get data directory")?
            .join(crate::APP_NAME);
        Ok(data_dir.join("trackpilot.db"))
    }

    fn lock(&self) -> Result<std::sync::MutexGuard<'_, Connection>> {
        self.conn
            .lock()
            .map_err(|e| anyhow::anyhow!("Database lock poisoned: {}", e))
    }

    /// Initialize database schema
    pub fn initialize(&self) -> Result<()> {
        let conn = self.lock()?;
        conn.execute_batch(
            r#"
            -- Settings table
            CREATE TABLE IF NOT EXISTS settings (
                key TEXT PRIMARY KEY,
                value TEXT NOT NULL
            );

            -- Profiles table
            CREATE TABLE IF NOT EXISTS profiles (
                name TEXT PRIMARY KEY,
                data TEXT NOT NULL
            );

            -- Executable to profile bindings
            CREATE TABLE IF NOT EXISTS process_bindings (
                executable TEXT PRIMARY KEY,
                profile TEXT NOT NULL
            );
            "#,
        )?;

        info!("Database schema initialized");
        Ok(())
    }

    // === Settings ===

    /// Load settings from database
    pub fn load_settings(&self) -> Result<Option<Settings>> {
        let conn = self.lock()?;
        let mut stmt = conn.prepare("SELECT value FROM settings WHERE key = 'app_settings'")?;
        let result: Option<String> = stmt.query_row([], |row| row.get(0)).optional()?;

        match result {
            Some(json) => {
                let mut settings: Settings =
                    serde_json::from_str(&json).context("Failed to deserialize settings")?;
                settings.validate();
                Ok(Some(settings))
            }
            None => Ok(None),
        }
    }

    /// Save settings to database
    pub fn save_settings(&self, settings: &Settings) -> Result<()> {
        let conn = self.lock()?;
        let json = serde_json::to_string(settings)?;
        conn.execute(
            "INSERT OR REPLACE INTO settings (key, value) VALUES ('app_settings', ?1)",
            params![json],
        )?;
        debug!("Settings saved");
        Ok(())
    }

    // === Profiles ===

    /// Save a profile to database
    pub fn save_profile(&self, profile: &Profile) -> Result<()> {
        let conn = self.lock()?;
        let json = serde_json::to_string(profile)?;
        conn.execute(
            "INSERT OR REPLACE INTO profiles (name, data) VALUES (?1, ?2)",
            params![profile.name, json],
        )?;
        debug!("Profile '{}' saved", profile.name);
        Ok(())
    }

    /// Load all profiles from database
    pub fn load_all_profiles(&self) -> Result<Vec<Profile>> {
        let conn = self.lock()?;
        let mut stmt = conn.prepare("SELECT data FROM profiles ORDER BY name")?;
        let profiles = stmt.query_map([], |row| {
            let json: String = row.get(0)?;
            Ok(json)
        })?;

        let mut result = Vec::new();
        for json in profiles {
            let json = json?;
            match serde_json::from_str::<Profile>(&json) {
                Ok(profile) => result.push(profile),
                Err(e) => error!("Failed to deserialize profile: {}", e),
            }
        }

        Ok(result)
    }

    /// Delete a profile and every binding that points at it
    pub fn delete_profile(&self, name: &str) -> Result<()> {
        let conn = self.lock()?;
        conn.execute("DELETE FROM profiles WHERE name = ?1", params![name])?;
        conn.execute(
            "DELETE FROM process_bindings WHERE profile = ?1",
            params![name],
        )?;
        debug!("Profile '{}' deleted", name);
        Ok(())
    }

    // === Process bindings ===

    /// Replace all stored bindings
    pub fn save_bindings(&self, bindings: &ProfileBindings) -> Result<()> {
        let mut conn = self.lock()?;
        let tx = conn.transaction()?;
        tx.execute("DELETE FROM process_bindings", [])?;
        for (executable, profile) in bindings.iter() {
            tx.execute(
                "INSERT INTO process_bindings (executable, profile) VALUES (?1, ?2)",
                params![executable, profile],
            )?;
        }
        tx.commit()?;
        debug!("{} process bindings saved", bindings.len());
        Ok(())
    }

    pub fn load_bindings(&self) -> Result<ProfileBindings> {
        let conn = self.lock()?;
        let mut stmt = conn.prepare("SELECT executable, profile FROM process_bindings")?;
        let rows = stmt.query_map([], |row| {
            Ok((row.get::<_, String>(0)?, row.get::<_, String>(1)?))
        })?;

        let mut bindings = ProfileBindings::new();
        for row in rows {
            let (executable, profile) = row?;
            bindings.bind(&executable, profile);
        }
        Ok(bindings)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::ModuleCategory;

    fn db() -> Database {
        let db = Database::open_in_memory().unwrap();
        db.initialize().unwrap();
        db
    }

    #[test]
    fn test_settings_absent_until_saved() {
        let db = db();
        assert!(db.load_settings().unwrap().is_none());

        let settings = Settings {
            last_profile: Some("racing".to_string()),
            detector_interval_ms: 2000,
            ..Default::default()
        };
        db.save_settings(&settings).unwrap();

        assert_eq!(db.load_settings().unwrap(), Some(settings));
    }

    #[test]
    fn test_loaded_settings_are_validated() {
        let db = db();
        let settings = Settings {
            pipeline_interval_ms: 0,
            ..Default::default()
        };
        db.save_settings(&settings).unwrap();

        assert_eq!(db.load_settings().unwrap().unwrap().pipeline_interval_ms, 1);
    }

    #[test]
    fn test_profiles_are_keyed_by_name() {
        let db = db();
        let mut profile = Profile::new("racing");
        db.save_profile(&profile).unwrap();
        profile.set_module(ModuleCategory::Tracker, Some("sine".to_string()));
        db.save_profile(&profile).unwrap();
        db.save_profile(&Profile::new("flight")).unwrap();

        let profiles = db.load_all_profiles().unwrap();

        assert_eq!(profiles.len(), 2);
        assert_eq!(profiles[0].name, "flight");
        assert_eq!(profiles[1].tracker.as_deref(), Some("sine"));
    }

    #[test]
    fn test_deleting_profile_drops_its_bindings() {
        let db = db();
        db.save_profile(&Profile::new("racing")).unwrap();
        let mut bindings = ProfileBindings::new();
        bindings.bind("Game.exe", "racing");
        bindings.bind("sim.exe", "flight");
        db.save_bindings(&bindings).unwrap();

        db.delete_profile("racing").unwrap();

        let loaded = db.load_bindings().unwrap();
        assert_eq!(loaded.lookup("game.exe"), None);
        assert_eq!(loaded.lookup("SIM.EXE"), Some("flight"));
        assert!(db.load_all_profiles().unwrap().is_empty());
    }
}
