use crate::error::{Result, StoreError};
use crate::migration;
use crate::record::{Student, User};
use crate::schema;
use log::{debug, info, warn};
use rusqlite::{params, Connection, ErrorCode, OptionalExtension, Row};
use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard, PoisonError};

/// Where the store file lives and what it is called.
#[derive(Debug, Clone)]
pub struct StoreConfig {
    dir: PathBuf,
    app_name: String,
    asset_dir: Option<PathBuf>,
}

impl StoreConfig {
    /// Configure a store in `dir`, named after the application
    /// (`<app_name>LocalDB`).
    pub fn new(dir: impl Into<PathBuf>, app_name: impl Into<String>) -> Self {
        StoreConfig {
            dir: dir.into(),
            app_name: app_name.into(),
            asset_dir: None,
        }
    }

    /// Directory holding read-only assets bundled with the application.
    /// Required for [`Store::import_from_bundled_asset`], which reads
    /// `<asset_dir>/databases/<store file name>`.
    pub fn with_asset_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.asset_dir = Some(dir.into());
        self
    }

    /// Full path of the on-disk store file.
    pub fn store_file(&self) -> PathBuf {
        self.dir.join(schema::store_file_name(&self.app_name))
    }
}

/// Handle to the roster store: one SQLite file holding the `student` and
/// `user` tables, accessed through a single long-lived connection behind a
/// mutex. Construct one explicitly and pass it to whatever needs it; the
/// mutex serializes all access, so a shared `Arc<Store>` is safe to use
/// from multiple threads.
///
/// The connection slot is an `Option` so whole-store import can quiesce
/// the connection (close, overwrite the file, reopen) while holding the
/// lock; see the transfer operations.
#[derive(Debug)]
pub struct Store {
    config: StoreConfig,
    conn: Mutex<Option<Connection>>,
}

impl Store {
    /// Open the store, creating the file and applying schema migrations as
    /// needed. Refuses files recorded at a newer schema version.
    pub fn open(config: StoreConfig) -> Result<Self> {
        std::fs::create_dir_all(&config.dir)?;

        let path = config.store_file();
        let fresh = !path.exists();
        let mut conn = Connection::open(&path)?;
        migration::apply(&mut conn)?;

        if fresh {
            info!("store created at {}", path.display());
        } else {
            info!("store opened at {}", path.display());
        }

        Ok(Store {
            config,
            conn: Mutex::new(Some(conn)),
        })
    }

    /// Full path of the on-disk store file.
    pub fn store_file(&self) -> PathBuf {
        self.config.store_file()
    }

    pub(crate) fn asset_dir(&self) -> Option<&Path> {
        self.config.asset_dir.as_deref()
    }

    pub(crate) fn lock_slot(&self) -> MutexGuard<'_, Option<Connection>> {
        self.conn.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn with_conn<T>(&self, f: impl FnOnce(&Connection) -> Result<T>) -> Result<T> {
        let guard = self.lock_slot();
        let conn = guard.as_ref().ok_or(StoreError::Closed)?;
        f(conn)
    }

    // ── Student CRUD ─────────────────────────────────────────────────

    /// Insert a student and return the assigned row id. The transient
    /// record's `id` field is ignored; fields are stored as supplied.
    pub fn insert(&self, student: &Student) -> Result<i64> {
        self.with_conn(|conn| {
            conn.execute(
                "INSERT INTO student (firstName, lastName, rollNumber, picture)
                 VALUES (?1, ?2, ?3, ?4)",
                params![
                    student.first_name,
                    student.last_name,
                    student.roll_number,
                    student.picture
                ],
            )
            .map_err(|e| map_constraint(e, &student.roll_number))?;

            let id = conn.last_insert_rowid();
            debug!("inserted student {} with id {id}", student.roll_number);
            Ok(id)
        })
    }

    /// All students in insertion order (`_id` ascending; ids are never
    /// reused). An empty table is `Ok(vec![])`, not an error.
    pub fn get_all(&self) -> Result<Vec<Student>> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare(
                "SELECT _id, firstName, lastName, rollNumber, picture
                 FROM student ORDER BY _id",
            )?;
            let rows = stmt.query_map([], student_from_row)?;

            let mut students = Vec::new();
            for row in rows {
                students.push(row?);
            }
            Ok(students)
        })
    }

    /// Look up a student by the business key.
    pub fn get_by_roll_number(&self, roll_number: &str) -> Result<Option<Student>> {
        self.with_conn(|conn| {
            let student = conn
                .query_row(
                    "SELECT _id, firstName, lastName, rollNumber, picture
                     FROM student WHERE rollNumber = ?1",
                    params![roll_number],
                    student_from_row,
                )
                .optional()?;
            Ok(student)
        })
    }

    /// Look up a student by physical row id.
    pub fn get_by_id(&self, id: i64) -> Result<Option<Student>> {
        self.with_conn(|conn| {
            let student = conn
                .query_row(
                    "SELECT _id, firstName, lastName, rollNumber, picture
                     FROM student WHERE _id = ?1",
                    params![id],
                    student_from_row,
                )
                .optional()?;
            Ok(student)
        })
    }

    /// Whether a student with this roll number exists.
    pub fn exists_by_roll_number(&self, roll_number: &str) -> Result<bool> {
        Ok(self.get_by_roll_number(roll_number)?.is_some())
    }

    /// Overwrite first name, last name, and picture of the row whose roll
    /// number matches `student.roll_number`. The roll number and id are
    /// never updated through this path. `Ok(false)` when nothing matched.
    pub fn update(&self, student: &Student) -> Result<bool> {
        self.with_conn(|conn| {
            let affected = conn.execute(
                "UPDATE student SET firstName = ?1, lastName = ?2, picture = ?3
                 WHERE rollNumber = ?4",
                params![
                    student.first_name,
                    student.last_name,
                    student.picture,
                    student.roll_number
                ],
            )?;
            Ok(affected > 0)
        })
    }

    /// Delete the student with this roll number. `Ok(true)` iff a row was
    /// removed.
    pub fn delete(&self, roll_number: &str) -> Result<bool> {
        self.with_conn(|conn| {
            let affected = conn.execute(
                "DELETE FROM student WHERE rollNumber = ?1",
                params![roll_number],
            )?;
            Ok(affected > 0)
        })
    }

    /// Remove all rows from a known table. `Ok(false)` when the table was
    /// already empty, so clearing twice is safe.
    pub fn clear_table(&self, table: &str) -> Result<bool> {
        let table = schema::known_table(table)?;
        self.with_conn(|conn| {
            let affected = conn.execute(&format!("DELETE FROM {table}"), [])?;
            debug!("cleared {affected} rows from {table}");
            Ok(affected > 0)
        })
    }

    /// Substring search on first name only (`LIKE '%needle%'`,
    /// engine-default case behavior). No matches is `Ok(vec![])`.
    pub fn search(&self, needle: &str) -> Result<Vec<Student>> {
        self.with_conn(|conn| {
            let pattern = format!("%{needle}%");
            let mut stmt = conn.prepare(
                "SELECT _id, firstName, lastName, rollNumber, picture
                 FROM student WHERE firstName LIKE ?1 ORDER BY _id",
            )?;
            let rows = stmt.query_map(params![pattern], student_from_row)?;

            let mut students = Vec::new();
            for row in rows {
                students.push(row?);
            }
            Ok(students)
        })
    }

    /// Total row count of a known table.
    pub fn count(&self, table: &str) -> Result<u64> {
        let table = schema::known_table(table)?;
        self.with_conn(|conn| {
            let count: i64 =
                conn.query_row(&format!("SELECT COUNT(*) FROM {table}"), [], |row| {
                    row.get(0)
                })?;
            Ok(count as u64)
        })
    }

    /// The highest assigned student id, 0 when the table is empty. Ids are
    /// never reused, so this also bounds every id ever assigned.
    pub fn last_id(&self) -> Result<i64> {
        self.with_conn(|conn| {
            let id = conn
                .query_row(
                    "SELECT _id FROM student ORDER BY _id DESC LIMIT 1",
                    [],
                    |row| row.get(0),
                )
                .optional()?;
            Ok(id.unwrap_or(0))
        })
    }

    // ── User table ───────────────────────────────────────────────────

    /// Insert a user and return the assigned row id.
    pub fn insert_user(&self, user: &User) -> Result<i64> {
        self.with_conn(|conn| {
            conn.execute(
                "INSERT INTO user (username, email, password) VALUES (?1, ?2, ?3)",
                params![user.username, user.email, user.password],
            )?;
            Ok(conn.last_insert_rowid())
        })
    }

    /// Whether a user with this email is registered.
    pub fn email_exists(&self, email: &str) -> Result<bool> {
        self.with_conn(|conn| {
            let found: Option<i64> = conn
                .query_row(
                    "SELECT _id FROM user WHERE email = ?1 LIMIT 1",
                    params![email],
                    |row| row.get(0),
                )
                .optional()?;
            Ok(found.is_some())
        })
    }

    // ── Destructive reset ────────────────────────────────────────────

    /// Drop and recreate both tables, **destroying all data** in the
    /// store. This is the only destructive schema path; routine version
    /// upgrades are column-preserving migrations applied by [`Store::open`].
    pub fn recreate(&self) -> Result<()> {
        self.with_conn(|conn| {
            warn!("recreating store: all rows in student and user are destroyed");
            conn.execute_batch(schema::DROP_TABLES)?;
            conn.execute_batch(schema::CREATE_TABLES)?;
            conn.pragma_update(None, "user_version", schema::SCHEMA_VERSION)?;
            Ok(())
        })
    }
}

fn student_from_row(row: &Row<'_>) -> rusqlite::Result<Student> {
    Ok(Student {
        id: row.get(0)?,
        first_name: row.get(1)?,
        last_name: row.get(2)?,
        roll_number: row.get(3)?,
        picture: row.get(4)?,
    })
}

/// Translate a unique-constraint failure on insert into the dedicated
/// duplicate-key error; everything else stays an engine error.
fn map_constraint(err: rusqlite::Error, roll_number: &str) -> StoreError {
    if err.sqlite_error_code() == Some(ErrorCode::ConstraintViolation) {
        StoreError::DuplicateRollNumber {
            roll_number: roll_number.to_string(),
        }
    } else {
        StoreError::Engine(err)
    }
}
