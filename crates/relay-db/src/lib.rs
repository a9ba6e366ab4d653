//! # relay-db
//!
//! libSQL storage for Relay: organizations and members, the lead and referral
//! boards with their custom columns, support tickets, subscriptions, the
//! activity log and the email queue.
//!
//! All repositories are methods on [`service::RelayService`]. The service owns
//! one shared connection; mutations take the write lock through
//! [`RelayDb::begin`] so multi-statement transactions never interleave.

pub mod error;
pub mod events;
pub mod helpers;
mod migrations;
pub mod repos;
pub mod service;
pub mod updates;

#[cfg(test)]
mod test_support;

use std::ops::Deref;

use error::DatabaseError;
use libsql::Builder;
use tokio::sync::{Mutex, MutexGuard};

/// Central database handle.
///
/// Wraps a libSQL database and connection. Provides ID generation and the
/// write lock.
pub struct RelayDb {
    #[allow(dead_code)]
    db: libsql::Database,
    conn: libsql::Connection,
    write_lock: Mutex<()>,
}

/// An open transaction holding the write lock.
///
/// Dereferences to the connection so statements run inside the transaction.
/// A transaction dropped without [`WriteTxn::commit`] is rolled back at the
/// latest by the next [`RelayDb::begin`].
pub struct WriteTxn<'a> {
    tx: libsql::Transaction,
    _guard: MutexGuard<'a, ()>,
}

impl WriteTxn<'_> {
    /// Commit and release the write lock.
    ///
    /// # Errors
    ///
    /// Returns `DatabaseError::LibSql` if the commit fails.
    pub async fn commit(self) -> Result<(), DatabaseError> {
        self.tx.commit().await?;
        Ok(())
    }

    /// Roll back and release the write lock.
    ///
    /// # Errors
    ///
    /// Returns `DatabaseError::LibSql` if the rollback fails.
    pub async fn rollback(self) -> Result<(), DatabaseError> {
        self.tx.rollback().await?;
        Ok(())
    }
}

impl Deref for WriteTxn<'_> {
    type Target = libsql::Connection;

    fn deref(&self) -> &Self::Target {
        &self.tx
    }
}

impl RelayDb {
    /// Open a local database at the given path (`":memory:"` for tests).
    ///
    /// Runs migrations automatically on open.
    ///
    /// # Errors
    ///
    /// Returns `DatabaseError` if the database cannot be opened or
    /// migrations fail.
    pub async fn open_local(path: &str) -> Result<Self, DatabaseError> {
        let db = Builder::new_local(path).build().await?;
        Self::init(db).await
    }

    /// Open a remote libSQL database (e.g., Turso).
    ///
    /// # Errors
    ///
    /// Returns `DatabaseError` if the connection or migrations fail.
    pub async fn open_remote(url: &str, auth_token: &str) -> Result<Self, DatabaseError> {
        let db = Builder::new_remote(url.to_string(), auth_token.to_string())
            .build()
            .await?;
        Self::init(db).await
    }

    async fn init(db: libsql::Database) -> Result<Self, DatabaseError> {
        let conn = db.connect()?;

        // Enable foreign keys (must be per-connection in SQLite)
        conn.execute("PRAGMA foreign_keys = ON", ())
            .await
            .map_err(|e| DatabaseError::Migration(format!("PRAGMA foreign_keys: {e}")))?;

        let relay_db = Self {
            db,
            conn,
            write_lock: Mutex::new(()),
        };
        relay_db.run_migrations().await?;
        Ok(relay_db)
    }

    /// Access the underlying libSQL connection for reads.
    #[must_use]
    pub const fn conn(&self) -> &libsql::Connection {
        &self.conn
    }

    /// Take the write lock and open a transaction.
    ///
    /// # Errors
    ///
    /// Returns `DatabaseError::LibSql` if `BEGIN` fails.
    pub async fn begin(&self) -> Result<WriteTxn<'_>, DatabaseError> {
        let guard = self.write_lock.lock().await;
        if !self.conn.is_autocommit() {
            // A previous transaction was dropped mid-flight.
            tracing::warn!("rolling back abandoned transaction");
            self.conn.execute("ROLLBACK", ()).await?;
        }
        let tx = self.conn.transaction().await?;
        Ok(WriteTxn { tx, _guard: guard })
    }

    /// Generate a prefixed ID via libSQL. Returns e.g., `"led-a3f8b2c1"`.
    ///
    /// # Errors
    ///
    /// Returns `DatabaseError` if the query fails or returns no rows.
    pub async fn generate_id(&self, prefix: &str) -> Result<String, DatabaseError> {
        let mut rows = self
            .conn
            .query(
                &format!("SELECT '{prefix}-' || lower(hex(randomblob(4)))"),
                (),
            )
            .await?;
        let row = rows.next().await?.ok_or(DatabaseError::NoResult)?;
        Ok(row.get::<String>(0)?)
    }
}
