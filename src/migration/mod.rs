//! Versioned schema migrations for the store file.
//!
//! The recorded version lives in SQLite's `user_version` pragma. Opening a
//! store applies every step above the recorded version, each in its own
//! transaction, stamping the pragma as it goes. Steps after the baseline
//! must be column-preserving (`ALTER TABLE ... ADD COLUMN` and the like);
//! the only destructive path is the explicit [`crate::Store::recreate`].

use crate::error::{Result, StoreError};
use crate::schema;
use log::info;
use rusqlite::Connection;

/// A single schema change, applied when the recorded version is below
/// `version`.
pub struct Migration {
    pub version: i64,
    pub description: &'static str,
    pub sql: &'static str,
}

/// All migrations in version order. The last entry's version must equal
/// [`schema::SCHEMA_VERSION`].
pub const MIGRATIONS: &[Migration] = &[Migration {
    version: 1,
    description: "create student and user tables",
    sql: schema::CREATE_TABLES,
}];

/// The schema version recorded in the store file (0 for a fresh file).
pub fn recorded_version(conn: &Connection) -> Result<i64> {
    let version = conn.pragma_query_value(None, "user_version", |row| row.get(0))?;
    Ok(version)
}

/// Bring the store file up to [`schema::SCHEMA_VERSION`]. Refuses stores
/// recorded at a newer version; downgrade is not supported.
pub fn apply(conn: &mut Connection) -> Result<()> {
    let recorded = recorded_version(conn)?;
    if recorded > schema::SCHEMA_VERSION {
        return Err(StoreError::Migration(format!(
            "store file is at schema version {recorded}, but this library supports \
             at most {}; downgrade is not supported",
            schema::SCHEMA_VERSION
        )));
    }

    for migration in MIGRATIONS.iter().filter(|m| m.version > recorded) {
        let tx = conn.transaction()?;
        tx.execute_batch(migration.sql)?;
        tx.pragma_update(None, "user_version", migration.version)?;
        tx.commit()?;
        info!(
            "applied store migration v{}: {}",
            migration.version, migration.description
        );
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fresh_store_migrates_to_current() {
        let mut conn = Connection::open_in_memory().unwrap();
        assert_eq!(recorded_version(&conn).unwrap(), 0);

        apply(&mut conn).unwrap();
        assert_eq!(recorded_version(&conn).unwrap(), schema::SCHEMA_VERSION);

        // Tables exist afterwards
        conn.execute("INSERT INTO student (rollNumber) VALUES ('R-1')", [])
            .unwrap();
    }

    #[test]
    fn test_apply_is_idempotent() {
        let mut conn = Connection::open_in_memory().unwrap();
        apply(&mut conn).unwrap();
        apply(&mut conn).unwrap();
        assert_eq!(recorded_version(&conn).unwrap(), schema::SCHEMA_VERSION);
    }

    #[test]
    fn test_newer_store_refused() {
        let mut conn = Connection::open_in_memory().unwrap();
        conn.pragma_update(None, "user_version", schema::SCHEMA_VERSION + 1)
            .unwrap();

        let err = apply(&mut conn).unwrap_err();
        assert!(matches!(err, StoreError::Migration(_)));
    }

    #[test]
    fn test_migrations_end_at_current_version() {
        assert_eq!(
            MIGRATIONS.last().map(|m| m.version),
            Some(schema::SCHEMA_VERSION)
        );
    }
}
