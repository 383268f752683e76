use std::collections::HashSet;

use axum::extract::{Path, State};
use axum::{debug_handler, Json};
use serde::Deserialize;
use sqlx::SqlitePool;

use crate::auth::AuthUser;
use crate::{store, ApiError, AppResult, AppState};

use super::create::RoomResponse;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct AddMembersRequest {
    pub(crate) user_ids: Vec<String>,
}

/// Growing a private/group room. Membership never shrinks here.
#[debug_handler(state = AppState)]
pub(crate) async fn add_members(
    State(db_pool): State<SqlitePool>,
    AuthUser(user): AuthUser,
    Path(room_id): Path<String>,
    Json(req): Json<AddMembersRequest>,
) -> AppResult<Json<RoomResponse>> {
    if req.user_ids.is_empty() {
        return Err(ApiError::BadRequest(
            "select at least one user to add".to_owned(),
        ));
    }
    if user.is_guest {
        return Err(ApiError::Forbidden(
            "guest users cannot add members".to_owned(),
        ));
    }

    let Some(room) = store::rooms::find_by_id(&db_pool, &room_id).await? else {
        return Err(ApiError::NotFound("room not found".to_owned()));
    };
    if !store::rooms::is_member(&db_pool, &room.id, &user.id).await? {
        return Err(ApiError::Forbidden("no access to this room".to_owned()));
    }
    if !room.is_dm || room.is_memo {
        return Err(ApiError::Forbidden(
            "members cannot be added to this kind of room".to_owned(),
        ));
    }

    let existing: HashSet<String> = store::rooms::member_ids(&db_pool, &room.id)
        .await?
        .into_iter()
        .collect();
    let mut new_ids: Vec<String> = req
        .user_ids
        .into_iter()
        .filter(|id| !existing.contains(id))
        .collect();
    new_ids.sort();
    new_ids.dedup();

    if new_ids.is_empty() {
        let room = store::rooms::view(&db_pool, room).await?;
        return Ok(Json(RoomResponse {
            message: "those users are already members".to_owned(),
            room,
        }));
    }

    // all-or-nothing, same rule as room creation
    let known = store::users::count_non_guest(&db_pool, &new_ids).await?;
    if known as usize != new_ids.len() {
        return Err(ApiError::BadRequest(
            "the list contains unknown or guest users".to_owned(),
        ));
    }

    for id in &new_ids {
        store::rooms::add_member(&db_pool, &room.id, id).await?;
    }
    tracing::info!(room = %room.name, added = new_ids.len(), "members added");

    let room = store::rooms::view(&db_pool, room).await?;
    Ok(Json(RoomResponse {
        message: "members added".to_owned(),
        room,
    }))
}
