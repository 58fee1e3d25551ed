//! Fault injection for exercising cache error paths in tests.
//!
//! Each hook installs a SQLite trigger that aborts the matching statement,
//! so the failure surfaces through the same `Error::Database` path a full
//! disk or a locked row would take.

use super::{CacheDb, storage_hash};
use crate::Error;

impl CacheDb {
    /// Make every subsequent store fail.
    pub async fn fail_inserts(&self) -> Result<(), Error> {
        self.install_trigger(
            "CREATE TRIGGER IF NOT EXISTS fail_inserts BEFORE INSERT ON cache_entries
             BEGIN SELECT RAISE(ABORT, 'quota exceeded'); END;"
                .to_string(),
        )
        .await
    }

    /// Make deleting the entry stored under `key` fail, in any cache.
    pub async fn fail_delete_of(&self, key: &str) -> Result<(), Error> {
        // Trigger bodies cannot take bound parameters.
        let literal = key.replace('\'', "''");
        self.install_trigger(format!(
            "CREATE TRIGGER IF NOT EXISTS \"fail_delete_{}\" BEFORE DELETE ON cache_entries
             WHEN old.cache_key = '{literal}'
             BEGIN SELECT RAISE(ABORT, 'entry locked'); END;",
            storage_hash("fault", key)
        ))
        .await
    }

    async fn install_trigger(&self, sql: String) -> Result<(), Error> {
        self.conn
            .call(move |conn| -> Result<(), Error> {
                conn.execute_batch(&sql)?;
                Ok(())
            })
            .await
            .map_err(Error::from)
    }
}
