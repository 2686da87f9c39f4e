//! Settings repository
//!
//! The daemon re-reads settings on every arbitration decision, so edits made
//! through the API take effect on the next trigger event.

use rusqlite::OptionalExtension;
use serde::{Deserialize, Serialize};

use super::DbPool;
use crate::{Error, Result};

/// Assistant settings snapshot
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Settings {
    /// Wake word matched case-insensitively against transcripts
    pub wake_word: String,

    /// Speak replies through the audio output
    pub voice_enabled: bool,

    /// Personality tag forwarded to the inference backend
    pub personality: String,

    /// Allow proximity readings to activate the assistant
    pub sensor_enabled: bool,

    /// Seconds of inactivity before an active session lapses
    pub activation_timeout_secs: u64,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            wake_word: "hello".to_string(),
            voice_enabled: true,
            personality: "Default".to_string(),
            sensor_enabled: true,
            activation_timeout_secs: 120,
        }
    }
}

/// Settings repository
#[derive(Clone)]
pub struct SettingsRepo {
    pool: DbPool,
}

impl SettingsRepo {
    /// Create a new settings repository
    #[must_use]
    #[allow(clippy::missing_const_for_fn)]
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }

    /// Read the current settings, inserting defaults on first run
    ///
    /// # Errors
    ///
    /// Returns error if database operation fails
    pub fn get(&self) -> Result<Settings> {
        let conn = self
            .pool
            .get()
            .map_err(|e| Error::Database(e.to_string()))?;

        let existing = conn
            .query_row(
                "SELECT wake_word, voice_enabled, personality, sensor_enabled, activation_timeout_secs
                 FROM settings WHERE id = 1",
                [],
                |row| {
                    Ok(Settings {
                        wake_word: row.get(0)?,
                        voice_enabled: row.get::<_, i64>(1)? != 0,
                        personality: row.get(2)?,
                        sensor_enabled: row.get::<_, i64>(3)? != 0,
                        activation_timeout_secs: row.get::<_, u64>(4)?,
                    })
                },
            )
            // Only a missing row means first run; read failures propagate
            // instead of clobbering the stored row with defaults.
            .optional()?;

        if let Some(settings) = existing {
            return Ok(settings);
        }

        let defaults = Settings::default();
        Self::insert(&conn, &defaults)?;
        tracing::info!("default settings inserted");
        Ok(defaults)
    }

    /// Replace the settings row
    ///
    /// # Errors
    ///
    /// Returns error if database operation fails
    pub fn set(&self, settings: &Settings) -> Result<()> {
        let conn = self
            .pool
            .get()
            .map_err(|e| Error::Database(e.to_string()))?;

        Self::insert(&conn, settings)?;
        tracing::info!(wake_word = %settings.wake_word, "settings updated");
        Ok(())
    }

    fn insert(conn: &rusqlite::Connection, settings: &Settings) -> Result<()> {
        conn.execute(
            "INSERT INTO settings (id, wake_word, voice_enabled, personality, sensor_enabled, activation_timeout_secs)
             VALUES (1, ?1, ?2, ?3, ?4, ?5)
             ON CONFLICT(id) DO UPDATE SET
                wake_word = excluded.wake_word,
                voice_enabled = excluded.voice_enabled,
                personality = excluded.personality,
                sensor_enabled = excluded.sensor_enabled,
                activation_timeout_secs = excluded.activation_timeout_secs",
            rusqlite::params![
                settings.wake_word,
                i64::from(settings.voice_enabled),
                settings.personality,
                i64::from(settings.sensor_enabled),
                settings.activation_timeout_secs,
            ],
        )?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::init_memory;

    #[test]
    fn test_get_inserts_defaults() {
        let repo = SettingsRepo::new(init_memory().unwrap());

        let settings = repo.get().unwrap();
        assert_eq!(settings.wake_word, "hello");
        assert!(settings.voice_enabled);
        assert_eq!(settings.activation_timeout_secs, 120);
    }

    #[test]
    fn test_get_propagates_read_errors_without_resetting() {
        let pool = init_memory().unwrap();
        let repo = SettingsRepo::new(pool.clone());

        let updated = Settings {
            wake_word: "computer".to_string(),
            ..Settings::default()
        };
        repo.set(&updated).unwrap();

        // Make the stored row unreadable
        {
            let conn = pool.get().unwrap();
            conn.execute(
                "UPDATE settings SET activation_timeout_secs = 'garbage' WHERE id = 1",
                [],
            )
            .unwrap();
        }
        assert!(repo.get().is_err());

        // Restore the column; the rest of the row must have survived
        {
            let conn = pool.get().unwrap();
            conn.execute(
                "UPDATE settings SET activation_timeout_secs = 600 WHERE id = 1",
                [],
            )
            .unwrap();
        }
        let settings = repo.get().unwrap();
        assert_eq!(settings.wake_word, "computer");
        assert_eq!(settings.activation_timeout_secs, 600);
    }

    #[test]
    fn test_set_then_get_roundtrip() {
        let repo = SettingsRepo::new(init_memory().unwrap());

        let updated = Settings {
            wake_word: "computer".to_string(),
            voice_enabled: false,
            personality: "Professional".to_string(),
            sensor_enabled: false,
            activation_timeout_secs: 300,
        };
        repo.set(&updated).unwrap();

        let settings = repo.get().unwrap();
        assert_eq!(settings.wake_word, "computer");
        assert!(!settings.voice_enabled);
        assert_eq!(settings.personality, "Professional");
        assert!(!settings.sensor_enabled);
        assert_eq!(settings.activation_timeout_secs, 300);
    }
}
