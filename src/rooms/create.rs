use axum::extract::State;
use axum::http::StatusCode;
use axum::{debug_handler, Json};
use serde::{Deserialize, Serialize};
use sqlx::SqlitePool;

use crate::auth::AuthUser;
use crate::store::rooms::RoomView;
use crate::{store, ApiError, AppResult, AppState};

#[derive(Debug, Deserialize)]
pub(crate) struct PublicRoomRequest {
    pub(crate) name: String,
}

#[derive(Debug, Serialize)]
pub(crate) struct RoomResponse {
    pub(crate) message: String,
    pub(crate) room: RoomView,
}

#[debug_handler(state = AppState)]
pub(crate) async fn public_room(
    State(db_pool): State<SqlitePool>,
    AuthUser(user): AuthUser,
    Json(req): Json<PublicRoomRequest>,
) -> AppResult<(StatusCode, Json<RoomResponse>)> {
    let name = req.name.trim();
    if name.is_empty() {
        return Err(ApiError::BadRequest("room name is required".to_owned()));
    }
    if user.is_guest {
        return Err(ApiError::Forbidden(
            "guest users cannot create public rooms".to_owned(),
        ));
    }
    if store::rooms::find_public_by_name(&db_pool, name).await?.is_some() {
        return Err(ApiError::Conflict(
            "a room with this name already exists".to_owned(),
        ));
    }

    let room = store::rooms::create(&db_pool, name, false, false, None, &[&user.id])
        .await
        .map_err(conflict_on_duplicate)?;
    tracing::info!(room = %room.name, creator = %user.username, "public room created");

    let room = store::rooms::view(&db_pool, room).await?;
    Ok((
        StatusCode::CREATED,
        Json(RoomResponse {
            message: "public room created".to_owned(),
            room,
        }),
    ))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct PrivateRoomRequest {
    pub(crate) name: String,
    pub(crate) participant_ids: Vec<String>,
}

#[debug_handler(state = AppState)]
pub(crate) async fn private_room(
    State(db_pool): State<SqlitePool>,
    AuthUser(user): AuthUser,
    Json(req): Json<PrivateRoomRequest>,
) -> AppResult<(StatusCode, Json<RoomResponse>)> {
    let name = req.name.trim();
    if name.is_empty() {
        return Err(ApiError::BadRequest("room name is required".to_owned()));
    }
    if req.participant_ids.is_empty() {
        return Err(ApiError::BadRequest(
            "select at least one user to invite".to_owned(),
        ));
    }
    if user.is_guest {
        return Err(ApiError::Forbidden(
            "guest users cannot create private rooms".to_owned(),
        ));
    }
    if req.participant_ids.contains(&user.id) {
        return Err(ApiError::BadRequest(
            "the invite list cannot include yourself".to_owned(),
        ));
    }

    let mut invitees = req.participant_ids;
    invitees.sort();
    invitees.dedup();

    // all-or-nothing: every invitee must exist and be a registered user
    let known = store::users::count_non_guest(&db_pool, &invitees).await?;
    if known as usize != invitees.len() {
        return Err(ApiError::BadRequest(
            "the invite list contains unknown or guest users".to_owned(),
        ));
    }

    if store::rooms::find_private_by_name(&db_pool, name).await?.is_some() {
        return Err(ApiError::Conflict(
            "a private room with this name already exists".to_owned(),
        ));
    }

    let mut member_ids: Vec<&str> = invitees.iter().map(String::as_str).collect();
    member_ids.push(&user.id);
    let room = store::rooms::create(&db_pool, name, true, false, None, &member_ids)
        .await
        .map_err(conflict_on_duplicate)?;
    tracing::info!(room = %room.name, creator = %user.username, "private room created");

    let room = store::rooms::view(&db_pool, room).await?;
    Ok((
        StatusCode::CREATED,
        Json(RoomResponse {
            message: "private room created".to_owned(),
            room,
        }),
    ))
}

/// The check-then-create race loses to the unique index, not to a 500.
fn conflict_on_duplicate(e: sqlx::Error) -> ApiError {
    if store::unique_violation(&e) {
        ApiError::Conflict("a room with this name already exists".to_owned())
    } else {
        ApiError::from(e)
    }
}
