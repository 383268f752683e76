use axum::extract::{Path, State};
use axum::{debug_handler, Json};
use sqlx::SqlitePool;

use crate::auth::AuthUser;
use crate::realtime::relay;
use crate::store::messages::MessageView;
use crate::{store, ApiError, AppResult, AppState};

#[debug_handler(state = AppState)]
pub(crate) async fn room_messages(
    State(db_pool): State<SqlitePool>,
    AuthUser(user): AuthUser,
    Path(room_id): Path<String>,
) -> AppResult<Json<Vec<MessageView>>> {
    if store::rooms::find_by_id(&db_pool, &room_id).await?.is_none() {
        return Err(ApiError::NotFound("room not found".to_owned()));
    }
    Ok(Json(relay::history(&db_pool, &user, &room_id).await?))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_util;

    #[tokio::test]
    async fn members_read_history_oldest_first() {
        let state = test_util::state().await;
        let alice = test_util::user(&state.db_pool, "alice", false).await;
        let room = test_util::room(&state.db_pool, "Team", &[&alice.id]).await;
        for content in ["one", "two"] {
            store::messages::insert(&state.db_pool, &room.id, &alice.id, content)
                .await
                .unwrap();
        }

        let response = room_messages(
            State(state.db_pool.clone()),
            AuthUser(alice),
            Path(room.id),
        )
        .await
        .unwrap();

        let contents: Vec<&str> = response.iter().map(|m| m.content.as_str()).collect();
        assert_eq!(contents, ["one", "two"]);
    }

    #[tokio::test]
    async fn non_members_get_forbidden_and_unknown_rooms_404() {
        let state = test_util::state().await;
        let alice = test_util::user(&state.db_pool, "alice", false).await;
        let mallory = test_util::user(&state.db_pool, "mallory", false).await;
        let room = test_util::room(&state.db_pool, "Team", &[&alice.id]).await;

        let result = room_messages(
            State(state.db_pool.clone()),
            AuthUser(mallory.clone()),
            Path(room.id),
        )
        .await;
        assert!(matches!(result, Err(ApiError::Forbidden(_))));

        let result = room_messages(
            State(state.db_pool.clone()),
            AuthUser(mallory),
            Path("no-such-room".to_owned()),
        )
        .await;
        assert!(matches!(result, Err(ApiError::NotFound(_))));
    }
}
