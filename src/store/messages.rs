use serde::Serialize;
use sqlx::SqlitePool;
use time::OffsetDateTime;
use uuid::Uuid;

use super::UserPublic;

#[derive(Debug, sqlx::FromRow)]
struct MessageRow {
    id: String,
    content: String,
    created_at: OffsetDateTime,
    room_id: String,
    user_id: String,
    username: String,
    profile_image: Option<String>,
}

/// A persisted message joined with its sender's public profile: the
/// payload every recipient sees, server-assigned id and timestamp included.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MessageView {
    pub id: String,
    pub content: String,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
    pub room_id: String,
    pub user_id: String,
    pub user: UserPublic,
}

impl From<MessageRow> for MessageView {
    fn from(row: MessageRow) -> Self {
        MessageView {
            id: row.id,
            content: row.content,
            created_at: row.created_at,
            room_id: row.room_id,
            user_id: row.user_id.clone(),
            user: UserPublic {
                id: row.user_id,
                username: row.username,
                profile_image: row.profile_image,
            },
        }
    }
}

/// Messages are immutable once written; the timestamp is assigned here.
pub async fn insert(
    pool: &SqlitePool,
    room_id: &str,
    user_id: &str,
    content: &str,
) -> sqlx::Result<String> {
    let id = Uuid::now_v7().to_string();
    sqlx::query("INSERT INTO messages (id,room_id,user_id,content,created_at) VALUES (?,?,?,?,?)")
        .bind(&id)
        .bind(room_id)
        .bind(user_id)
        .bind(content)
        .bind(OffsetDateTime::now_utc())
        .execute(pool)
        .await?;
    Ok(id)
}

pub async fn fetch(pool: &SqlitePool, id: &str) -> sqlx::Result<MessageView> {
    let row: MessageRow = sqlx::query_as(
        "SELECT m.id,m.content,m.created_at,m.room_id,m.user_id,u.username,u.profile_image \
         FROM messages m JOIN users u ON u.id = m.user_id WHERE m.id=?",
    )
    .bind(id)
    .fetch_one(pool)
    .await?;
    Ok(row.into())
}

/// Full history, oldest first. The id tiebreak keeps insert order within a
/// timestamp (ids are time-ordered).
pub async fn history(pool: &SqlitePool, room_id: &str) -> sqlx::Result<Vec<MessageView>> {
    let rows: Vec<MessageRow> = sqlx::query_as(
        "SELECT m.id,m.content,m.created_at,m.room_id,m.user_id,u.username,u.profile_image \
         FROM messages m JOIN users u ON u.id = m.user_id \
         WHERE m.room_id=? ORDER BY m.created_at ASC, m.id ASC",
    )
    .bind(room_id)
    .fetch_all(pool)
    .await?;
    Ok(rows.into_iter().map(Into::into).collect())
}
