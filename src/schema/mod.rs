//! Static schema for the roster store file: table names, creation
//! statements, and the schema version recorded in `user_version`.

use crate::error::{Result, StoreError};

/// Suffix appended to the application name to form the on-disk store
/// file name, e.g. `RollcallLocalDB`.
pub const STORE_FILE_SUFFIX: &str = "LocalDB";

/// Current schema version. Opening a store stamps this into SQLite's
/// `user_version` pragma; stores recorded at a newer version are refused.
pub const SCHEMA_VERSION: i64 = 1;

pub const STUDENT_TABLE: &str = "student";
pub const USER_TABLE: &str = "user";

/// Tables that make up the store file.
pub const TABLES: &[&str] = &[STUDENT_TABLE, USER_TABLE];

/// Idempotent table creation. `rollNumber` is the business key and is
/// unique; `_id` is physical row identity only and is never reused.
pub const CREATE_TABLES: &str = "
    CREATE TABLE IF NOT EXISTS student (
        _id INTEGER PRIMARY KEY AUTOINCREMENT NOT NULL,
        firstName TEXT,
        lastName TEXT,
        rollNumber TEXT NOT NULL UNIQUE,
        picture BLOB
    );

    CREATE TABLE IF NOT EXISTS user (
        _id INTEGER PRIMARY KEY AUTOINCREMENT NOT NULL,
        username TEXT,
        email TEXT,
        password TEXT
    );
";

pub const DROP_TABLES: &str = "
    DROP TABLE IF EXISTS student;
    DROP TABLE IF EXISTS user;
";

/// The on-disk store file name for a given application name.
pub fn store_file_name(app_name: &str) -> String {
    format!("{app_name}{STORE_FILE_SUFFIX}")
}

/// Validate a caller-supplied table name against the static table list.
/// Table names cannot be bound as SQL parameters, so operations that take
/// one (`clear_table`, `count`) must only ever interpolate the returned
/// static string.
pub fn known_table(name: &str) -> Result<&'static str> {
    TABLES
        .iter()
        .copied()
        .find(|t| *t == name)
        .ok_or_else(|| StoreError::UnknownTable {
            table: name.to_string(),
        })
}
