//! Record types stored in the roster: one row per type.

use serde::{Deserialize, Serialize};

/// One row of the `student` table.
///
/// `id` is assigned by the store on insert and never mutated or reused; a
/// value of 0 marks a transient, not-yet-persisted record. `roll_number`
/// is the business key used for lookup, update, and delete. The store
/// performs no field validation; empty strings and empty blobs are stored
/// as supplied.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Student {
    pub id: i64,
    pub first_name: String,
    pub last_name: String,
    pub roll_number: String,
    pub picture: Option<Vec<u8>>,
}

impl Student {
    /// A transient record (id 0) ready for insertion.
    pub fn new(
        first_name: impl Into<String>,
        last_name: impl Into<String>,
        roll_number: impl Into<String>,
        picture: Option<Vec<u8>>,
    ) -> Self {
        Student {
            id: 0,
            first_name: first_name.into(),
            last_name: last_name.into(),
            roll_number: roll_number.into(),
            picture,
        }
    }

    /// True while the record has not been persisted.
    pub fn is_transient(&self) -> bool {
        self.id == 0
    }
}

/// One row of the `user` table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    pub id: i64,
    pub username: String,
    pub email: String,
    pub password: String,
}

impl User {
    pub fn new(
        username: impl Into<String>,
        email: impl Into<String>,
        password: impl Into<String>,
    ) -> Self {
        User {
            id: 0,
            username: username.into(),
            email: email.into(),
            password: password.into(),
        }
    }
}
