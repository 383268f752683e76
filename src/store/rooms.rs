use serde::Serialize;
use sqlx::SqlitePool;
use uuid::Uuid;

use super::UserPublic;

/// Three disjoint kinds hide behind the two flags: public
/// (`is_dm=0, is_memo=0`), private/group (`is_dm=1, is_memo=0`) and memo
/// (`is_memo=1`, owned, single-member by convention).
#[derive(Debug, Clone, PartialEq, sqlx::FromRow)]
pub struct Room {
    pub id: String,
    pub name: String,
    pub is_dm: bool,
    pub is_memo: bool,
    pub owner_id: Option<String>,
}

/// A room plus its member profiles, as clients see it.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RoomView {
    pub id: String,
    pub name: String,
    #[serde(rename = "isDM")]
    pub is_dm: bool,
    pub is_memo: bool,
    pub owner_id: Option<String>,
    pub users: Vec<UserPublic>,
}

pub async fn find_by_id(pool: &SqlitePool, id: &str) -> sqlx::Result<Option<Room>> {
    sqlx::query_as("SELECT id,name,is_dm,is_memo,owner_id FROM rooms WHERE id=?")
        .bind(id)
        .fetch_optional(pool)
        .await
}

pub async fn find_public_by_name(pool: &SqlitePool, name: &str) -> sqlx::Result<Option<Room>> {
    sqlx::query_as(
        "SELECT id,name,is_dm,is_memo,owner_id FROM rooms \
         WHERE name=? AND is_dm=0 AND is_memo=0 AND owner_id IS NULL",
    )
    .bind(name)
    .fetch_optional(pool)
    .await
}

pub async fn find_private_by_name(pool: &SqlitePool, name: &str) -> sqlx::Result<Option<Room>> {
    sqlx::query_as(
        "SELECT id,name,is_dm,is_memo,owner_id FROM rooms \
         WHERE name=? AND is_dm=1 AND is_memo=0 AND owner_id IS NULL",
    )
    .bind(name)
    .fetch_optional(pool)
    .await
}

pub async fn find_memo_by_owner(pool: &SqlitePool, owner_id: &str) -> sqlx::Result<Option<Room>> {
    sqlx::query_as("SELECT id,name,is_dm,is_memo,owner_id FROM rooms WHERE is_memo=1 AND owner_id=?")
        .bind(owner_id)
        .fetch_optional(pool)
        .await
}

/// Room and initial membership land in one transaction, so a failed insert
/// leaves neither behind.
pub async fn create(
    pool: &SqlitePool,
    name: &str,
    is_dm: bool,
    is_memo: bool,
    owner_id: Option<&str>,
    member_ids: &[&str],
) -> sqlx::Result<Room> {
    let id = Uuid::now_v7().to_string();
    let mut tx = pool.begin().await?;
    sqlx::query("INSERT INTO rooms (id,name,is_dm,is_memo,owner_id) VALUES (?,?,?,?,?)")
        .bind(&id)
        .bind(name)
        .bind(is_dm)
        .bind(is_memo)
        .bind(owner_id)
        .execute(&mut *tx)
        .await?;
    for user_id in member_ids {
        sqlx::query("INSERT OR IGNORE INTO room_members (room_id,user_id) VALUES (?,?)")
            .bind(&id)
            .bind(user_id)
            .execute(&mut *tx)
            .await?;
    }
    tx.commit().await?;

    find_by_id(pool, &id).await?.ok_or(sqlx::Error::RowNotFound)
}

/// Idempotent: adding an existing member is a no-op.
pub async fn add_member(pool: &SqlitePool, room_id: &str, user_id: &str) -> sqlx::Result<()> {
    sqlx::query("INSERT OR IGNORE INTO room_members (room_id,user_id) VALUES (?,?)")
        .bind(room_id)
        .bind(user_id)
        .execute(pool)
        .await?;
    Ok(())
}

pub async fn is_member(pool: &SqlitePool, room_id: &str, user_id: &str) -> sqlx::Result<bool> {
    Ok(
        sqlx::query("SELECT 1 FROM room_members WHERE room_id=? AND user_id=?")
            .bind(room_id)
            .bind(user_id)
            .fetch_optional(pool)
            .await?
            .is_some(),
    )
}

pub async fn member_ids(pool: &SqlitePool, room_id: &str) -> sqlx::Result<Vec<String>> {
    sqlx::query_scalar("SELECT user_id FROM room_members WHERE room_id=?")
        .bind(room_id)
        .fetch_all(pool)
        .await
}

pub async fn members(pool: &SqlitePool, room_id: &str) -> sqlx::Result<Vec<UserPublic>> {
    sqlx::query_as(
        "SELECT u.id,u.username,u.profile_image FROM users u \
         JOIN room_members rm ON rm.user_id = u.id \
         WHERE rm.room_id=? ORDER BY u.username",
    )
    .bind(room_id)
    .fetch_all(pool)
    .await
}

pub async fn view(pool: &SqlitePool, room: Room) -> sqlx::Result<RoomView> {
    let users = members(pool, &room.id).await?;
    Ok(RoomView {
        id: room.id,
        name: room.name,
        is_dm: room.is_dm,
        is_memo: room.is_memo,
        owner_id: room.owner_id,
        users,
    })
}

/// What a user sees in their room list: everything they are a member of
/// plus every joinable public room, name ascending.
pub async fn visible_to(pool: &SqlitePool, user_id: &str) -> sqlx::Result<Vec<Room>> {
    sqlx::query_as(
        "SELECT id,name,is_dm,is_memo,owner_id FROM rooms \
         WHERE id IN (SELECT room_id FROM room_members WHERE user_id=?) \
            OR (is_dm=0 AND is_memo=0) \
         ORDER BY name ASC",
    )
    .bind(user_id)
    .fetch_all(pool)
    .await
}
