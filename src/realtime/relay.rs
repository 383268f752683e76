//! Validates, persists and fans out chat messages.
//!
//! Broadcast only ever follows a committed write: the delivered payload is
//! re-read from storage, so every recipient (the sender included) sees the
//! server-assigned id and timestamp.

use sqlx::SqlitePool;

use crate::auth::Identity;
use crate::store::messages::MessageView;
use crate::{store, ApiError, AppResult, AppState};

use super::bus::Target;
use super::events::ServerEvent;

pub async fn send_message(
    state: &AppState,
    user: &Identity,
    room_id: &str,
    content: &str,
) -> AppResult<()> {
    if content.trim().is_empty() {
        return Err(ApiError::BadRequest(
            "message content cannot be empty".to_owned(),
        ));
    }

    let id = store::messages::insert(&state.db_pool, room_id, &user.id, content).await?;
    let message = store::messages::fetch(&state.db_pool, &id).await?;

    state
        .bus
        .publish(Target::Room(room_id.to_owned()), ServerEvent::NewMessage(message));
    Ok(())
}

/// Membership-gated history retrieval, oldest first. Unlike the live join
/// path, this one refuses non-members.
pub async fn history(
    pool: &SqlitePool,
    user: &Identity,
    room_id: &str,
) -> AppResult<Vec<MessageView>> {
    if !store::rooms::is_member(pool, room_id, &user.id).await? {
        return Err(ApiError::Forbidden("no access to this room".to_owned()));
    }
    store::messages::history(pool, room_id).await.map_err(Into::into)
}
