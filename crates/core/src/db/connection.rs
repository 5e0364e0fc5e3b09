//! Database connection management with pragma configuration.
//!
//! This module handles opening the SQLite database, applying required pragmas
//! for performance and concurrency (WAL mode), and running migrations.
//! [`Database`] defers the open until the first data operation asks for it.

use super::migrations;
use crate::Error;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::sync::OnceCell;
use tokio_rusqlite::Connection;

const PRAGMAS: &str = "PRAGMA journal_mode=WAL;
     PRAGMA synchronous=NORMAL;
     PRAGMA temp_store=MEMORY;
     PRAGMA foreign_keys=ON;";

/// Open database handle.
///
/// Wraps a tokio-rusqlite Connection that runs database operations
/// on a background thread.
#[derive(Clone, Debug)]
pub struct StoreDb {
    pub(crate) conn: Connection,
}

impl StoreDb {
    /// Open a database at the specified path.
    ///
    /// Creates the file if it doesn't exist, applies performance pragmas,
    /// and runs any pending migrations.
    pub async fn open(path: impl AsRef<Path>) -> Result<Self, Error> {
        let conn = Connection::open(path).await.map_err(|e| Error::Database(e.into()))?;
        Self::prepare(conn).await
    }

    /// Open an in-memory database for testing.
    ///
    /// Creates a temporary in-memory SQLite database with the same
    /// pragma configuration as file-based databases.
    pub async fn open_in_memory() -> Result<Self, Error> {
        let conn = Connection::open_in_memory()
            .await
            .map_err(|e| Error::Database(e.into()))?;
        Self::prepare(conn).await
    }

    async fn prepare(conn: Connection) -> Result<Self, Error> {
        conn.call(|conn| {
            conn.execute_batch(PRAGMAS)?;
            Ok(())
        })
        .await
        .map_err(Error::Database)?;

        migrations::run(&conn).await?;

        Ok(Self { conn })
    }
}

/// Where a [`Database`] opens its connection.
#[derive(Clone, Debug, PartialEq, Eq)]
enum Location {
    File(PathBuf),
    Memory,
}

/// Lazily connected database shared by the document store and the cache.
///
/// Cloning is cheap; all clones share one connection. [`Database::connect`]
/// must be awaited before every data operation: the first call opens the
/// connection (pragmas plus migrations), later calls return the open handle.
/// Concurrent first calls open it once.
#[derive(Clone, Debug)]
pub struct Database {
    location: Location,
    handle: Arc<OnceCell<StoreDb>>,
}

impl Database {
    /// Database backed by a file. `:memory:` selects an in-memory database.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let location = if path.as_os_str() == ":memory:" { Location::Memory } else { Location::File(path) };
        Self { location, handle: Arc::new(OnceCell::new()) }
    }

    /// In-memory database, mainly for tests.
    pub fn in_memory() -> Self {
        Self { location: Location::Memory, handle: Arc::new(OnceCell::new()) }
    }

    /// Ensure the connection exists and return it.
    pub async fn connect(&self) -> Result<&StoreDb, Error> {
        self.handle
            .get_or_try_init(|| async {
                match &self.location {
                    Location::File(path) => {
                        tracing::info!(path = %path.display(), "opening catalog database");
                        StoreDb::open(path).await
                    }
                    Location::Memory => {
                        tracing::info!("opening in-memory catalog database");
                        StoreDb::open_in_memory().await
                    }
                }
            })
            .await
    }

    /// Whether the connection has been opened yet.
    pub fn is_connected(&self) -> bool {
        self.handle.initialized()
    }
}
