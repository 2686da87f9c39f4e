//! Chat history repository
//!
//! Append-only log of user/assistant exchanges. Concurrent pipeline runs may
//! append in any order; each exchange is written as one atomic row.

use chrono::{DateTime, Utc};
use serde::Serialize;

use super::DbPool;
use crate::{Error, Result};

/// One user-query/assistant-reply pair
#[derive(Debug, Clone, Serialize)]
pub struct Exchange {
    pub user_text: String,
    pub assistant_text: String,
    pub created_at: DateTime<Utc>,
}

impl Exchange {
    /// Create an exchange stamped with the current time
    #[must_use]
    pub fn new(user_text: impl Into<String>, assistant_text: impl Into<String>) -> Self {
        Self {
            user_text: user_text.into(),
            assistant_text: assistant_text.into(),
            created_at: Utc::now(),
        }
    }
}

/// Chat history repository
#[derive(Clone)]
pub struct HistoryRepo {
    pool: DbPool,
}

impl HistoryRepo {
    /// Create a new history repository
    #[must_use]
    #[allow(clippy::missing_const_for_fn)]
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }

    /// Append an exchange to history
    ///
    /// # Errors
    ///
    /// Returns error if database operation fails
    pub fn append(&self, exchange: &Exchange) -> Result<()> {
        let conn = self
            .pool
            .get()
            .map_err(|e| Error::Database(e.to_string()))?;

        conn.execute(
            "INSERT INTO exchanges (user_text, assistant_text, created_at)
             VALUES (?1, ?2, ?3)",
            rusqlite::params![
                exchange.user_text,
                exchange.assistant_text,
                exchange.created_at.to_rfc3339(),
            ],
        )?;

        Ok(())
    }

    /// Get the most recent exchanges, newest first
    ///
    /// # Errors
    ///
    /// Returns error if database operation fails
    pub fn recent(&self, limit: usize) -> Result<Vec<Exchange>> {
        let conn = self
            .pool
            .get()
            .map_err(|e| Error::Database(e.to_string()))?;

        let mut stmt = conn.prepare(
            "SELECT user_text, assistant_text, created_at
             FROM exchanges ORDER BY id DESC LIMIT ?1",
        )?;

        #[allow(clippy::cast_possible_wrap)]
        let exchanges = stmt
            .query_map([limit as i64], |row| {
                Ok(Exchange {
                    user_text: row.get(0)?,
                    assistant_text: row.get(1)?,
                    created_at: parse_datetime(&row.get::<_, String>(2)?),
                })
            })?
            .filter_map(std::result::Result::ok)
            .collect();

        Ok(exchanges)
    }

    /// Count stored exchanges
    ///
    /// # Errors
    ///
    /// Returns error if database operation fails
    pub fn count(&self) -> Result<usize> {
        let conn = self
            .pool
            .get()
            .map_err(|e| Error::Database(e.to_string()))?;

        let count: i64 = conn.query_row("SELECT COUNT(*) FROM exchanges", [], |row| row.get(0))?;

        Ok(usize::try_from(count).unwrap_or(0))
    }
}

fn parse_datetime(s: &str) -> DateTime<Utc> {
    DateTime::parse_from_rfc3339(s).map_or_else(|_| Utc::now(), |dt| dt.with_timezone(&Utc))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::init_memory;

    #[test]
    fn test_append_and_recent() {
        let repo = HistoryRepo::new(init_memory().unwrap());

        repo.append(&Exchange::new("hello", "Hi there!")).unwrap();
        repo.append(&Exchange::new("what time is it", "It is noon."))
            .unwrap();

        let recent = repo.recent(10).unwrap();
        assert_eq!(recent.len(), 2);
        // Newest first
        assert_eq!(recent[0].user_text, "what time is it");
        assert_eq!(recent[1].assistant_text, "Hi there!");
    }

    #[test]
    fn test_recent_limit() {
        let repo = HistoryRepo::new(init_memory().unwrap());

        for i in 0..5 {
            repo.append(&Exchange::new(format!("q{i}"), format!("a{i}")))
                .unwrap();
        }

        let recent = repo.recent(3).unwrap();
        assert_eq!(recent.len(), 3);
        assert_eq!(recent[0].user_text, "q4");
    }

    #[test]
    fn test_count() {
        let repo = HistoryRepo::new(init_memory().unwrap());
        assert_eq!(repo.count().unwrap(), 0);

        repo.append(&Exchange::new("a", "b")).unwrap();
        assert_eq!(repo.count().unwrap(), 1);
    }
}
