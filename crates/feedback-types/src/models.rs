use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A registered account. The password hash never leaves the storage layer,
/// so it has no field here.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    pub username: String,
    pub email: String,
    pub first_name: String,
    pub last_name: String,
}

impl User {
    pub fn full_name(&self) -> String {
        format!("{} {}", self.first_name, self.last_name)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Feedback {
    pub id: i64,
    pub title: String,
    pub content: String,
    /// Owning user.
    pub username: String,
    pub created_at: DateTime<Utc>,
}
