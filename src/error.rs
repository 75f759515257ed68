use thiserror::Error;

#[derive(Error, Debug)]
pub enum StoreError {
    #[error("store engine error: {0}")]
    Engine(#[from] rusqlite::Error),

    #[error("transfer I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("duplicate roll number: {roll_number}")]
    DuplicateRollNumber { roll_number: String },

    #[error("unknown table: {table}")]
    UnknownTable { table: String },

    #[error("store connection is closed")]
    Closed,

    #[error("migration error: {0}")]
    Migration(String),
}

pub type Result<T> = std::result::Result<T, StoreError>;
