//! Opening sessions against a named schema, creating the schema on first use.

use crate::error::ConnectionError;
use diesel::connection::SimpleConnection;
use diesel::prelude::*;
use diesel::sql_types::Text;
use std::fs;
use std::path::PathBuf;
use tracing::{debug, info};

/// Scoped session opens attempted before giving up (the first one plus one retry).
const MAX_ATTEMPTS: u32 = 2;

/// How long a statement waits on a locked database before failing.
const BUSY_TIMEOUT_MS: u32 = 5_000;

/// Where a schema lives: one SQLite database file per schema under a root directory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionTarget {
    pub root: PathBuf,
    pub schema: String,
}

impl SessionTarget {
    pub fn new(root: impl Into<PathBuf>, schema: impl Into<String>) -> Self {
        Self {
            root: root.into(),
            schema: schema.into(),
        }
    }

    /// The database file backing this schema.
    pub fn database_path(&self) -> PathBuf {
        self.root.join(format!("{}.sqlite3", self.schema))
    }

    /// Connection string for a session scoped to the schema.
    ///
    /// `mode=rw` makes the open fail instead of silently creating a missing schema.
    pub fn connection_string(&self) -> String {
        format!("sqlite://{}?mode=rw", self.database_path().display())
    }
}

/// Opens a session scoped to `target`, creating the schema first if it does not exist.
///
/// Only a missing schema is recovered from, and only once. Every other failure is returned as is.
pub fn ensure_session(target: &SessionTarget) -> Result<SqliteConnection, ConnectionError> {
    let mut attempt = 1;

    loop {
        match open_scoped(target) {
            Ok(conn) => return prepare(conn),
            Err(ConnectionError::SchemaMissing { .. }) if attempt < MAX_ATTEMPTS => {
                info!(schema = %target.schema, "schema does not exist, creating it");
                create_schema(target)?;
                attempt += 1;
            }
            Err(err) => return Err(err),
        }
    }
}

fn open_scoped(target: &SessionTarget) -> Result<SqliteConnection, ConnectionError> {
    let url = target.connection_string();
    debug!(%url, "opening session");

    SqliteConnection::establish(&url).map_err(|source| {
        let path = target.database_path();
        if path.exists() {
            ConnectionError::Open { url, source }
        } else {
            ConnectionError::SchemaMissing {
                schema: target.schema.clone(),
                path,
            }
        }
    })
}

/// Creates the schema's database file from an unscoped session.
fn create_schema(target: &SessionTarget) -> Result<(), ConnectionError> {
    let failed = |reason: String| ConnectionError::CreateSchema {
        schema: target.schema.clone(),
        reason,
    };

    fs::create_dir_all(&target.root).map_err(|err| failed(err.to_string()))?;

    let mut unscoped =
        SqliteConnection::establish(":memory:").map_err(|err| failed(err.to_string()))?;

    // Attaching a database file that does not exist yet creates it.
    let path = target.database_path().display().to_string();
    diesel::sql_query("ATTACH DATABASE ? AS new_schema")
        .bind::<Text, _>(&path)
        .execute(&mut unscoped)
        .map_err(|err| failed(err.to_string()))?;
    unscoped
        .batch_execute("DETACH DATABASE new_schema")
        .map_err(|err| failed(err.to_string()))?;

    Ok(())
}

fn prepare(mut conn: SqliteConnection) -> Result<SqliteConnection, ConnectionError> {
    conn.batch_execute(&format!(
        "PRAGMA foreign_keys = ON; PRAGMA busy_timeout = {BUSY_TIMEOUT_MS};"
    ))?;
    Ok(conn)
}
