pub mod messages;
pub mod rooms;
pub mod users;

use serde::Serialize;

/// Profile fields safe to show to other users.
#[derive(Debug, Clone, PartialEq, Serialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct UserPublic {
    pub id: String,
    pub username: String,
    pub profile_image: Option<String>,
}

pub fn unique_violation(err: &sqlx::Error) -> bool {
    matches!(err, sqlx::Error::Database(db) if db.is_unique_violation())
}
