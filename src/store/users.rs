use sqlx::SqlitePool;
use uuid::Uuid;

use crate::auth::Identity;

use super::UserPublic;

#[derive(Debug, Clone, sqlx::FromRow)]
pub struct User {
    pub id: String,
    pub username: String,
    pub password_hash: Option<String>,
    pub is_guest: bool,
    pub profile_image: Option<String>,
    pub bio: Option<String>,
}

impl From<User> for Identity {
    fn from(user: User) -> Self {
        Identity {
            id: user.id,
            username: user.username,
            is_guest: user.is_guest,
            profile_image: user.profile_image,
            bio: user.bio,
        }
    }
}

pub async fn find_by_id(pool: &SqlitePool, id: &str) -> sqlx::Result<Option<User>> {
    sqlx::query_as("SELECT id,username,password_hash,is_guest,profile_image,bio FROM users WHERE id=?")
        .bind(id)
        .fetch_optional(pool)
        .await
}

pub async fn find_by_username(pool: &SqlitePool, username: &str) -> sqlx::Result<Option<User>> {
    sqlx::query_as("SELECT id,username,password_hash,is_guest,profile_image,bio FROM users WHERE username=?")
        .bind(username)
        .fetch_optional(pool)
        .await
}

/// Guests never get a password hash.
pub async fn create(
    pool: &SqlitePool,
    username: &str,
    password_hash: Option<&str>,
    is_guest: bool,
) -> sqlx::Result<User> {
    let id = Uuid::now_v7().to_string();
    sqlx::query("INSERT INTO users (id,username,password_hash,is_guest) VALUES (?,?,?,?)")
        .bind(&id)
        .bind(username)
        .bind(password_hash)
        .bind(is_guest)
        .execute(pool)
        .await?;

    find_by_id(pool, &id).await?.ok_or(sqlx::Error::RowNotFound)
}

pub async fn update_username(pool: &SqlitePool, id: &str, username: &str) -> sqlx::Result<User> {
    sqlx::query("UPDATE users SET username=? WHERE id=?")
        .bind(username)
        .bind(id)
        .execute(pool)
        .await?;

    find_by_id(pool, id).await?.ok_or(sqlx::Error::RowNotFound)
}

/// Everyone a user can invite somewhere: registered accounts, minus them.
pub async fn list_known(pool: &SqlitePool, exclude_id: &str) -> sqlx::Result<Vec<UserPublic>> {
    sqlx::query_as(
        "SELECT id,username,profile_image FROM users WHERE id <> ? AND is_guest = 0 ORDER BY username",
    )
    .bind(exclude_id)
    .fetch_all(pool)
    .await
}

/// How many of `ids` exist as registered (non-guest) accounts. Used for
/// all-or-nothing invite validation.
pub async fn count_non_guest(pool: &SqlitePool, ids: &[String]) -> sqlx::Result<i64> {
    if ids.is_empty() {
        return Ok(0);
    }
    let placeholders = vec!["?"; ids.len()].join(",");
    let sql = format!("SELECT COUNT(*) FROM users WHERE is_guest = 0 AND id IN ({placeholders})");
    let mut query = sqlx::query_scalar(&sql);
    for id in ids {
        query = query.bind(id);
    }
    query.fetch_one(pool).await
}
