use axum::extract::State;
use axum::{debug_handler, Json};
use sqlx::SqlitePool;

use crate::auth::AuthUser;
use crate::store::rooms::RoomView;
use crate::store::UserPublic;
use crate::{store, AppResult, AppState};

/// Everything the user can open: rooms they are in, plus joinable public
/// rooms, name ascending.
#[debug_handler(state = AppState)]
pub(crate) async fn rooms(
    State(db_pool): State<SqlitePool>,
    AuthUser(user): AuthUser,
) -> AppResult<Json<Vec<RoomView>>> {
    let rooms = store::rooms::visible_to(&db_pool, &user.id).await?;
    let mut views = Vec::with_capacity(rooms.len());
    for room in rooms {
        views.push(store::rooms::view(&db_pool, room).await?);
    }
    Ok(Json(views))
}

#[debug_handler(state = AppState)]
pub(crate) async fn users(
    State(db_pool): State<SqlitePool>,
    AuthUser(user): AuthUser,
) -> AppResult<Json<Vec<UserPublic>>> {
    Ok(Json(store::users::list_known(&db_pool, &user.id).await?))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_util;

    #[tokio::test]
    async fn room_list_unions_memberships_and_public_rooms() {
        let state = test_util::state().await;
        let alice = test_util::user(&state.db_pool, "alice", false).await;
        let bob = test_util::user(&state.db_pool, "bob", false).await;

        // bob's public room is joinable, his private room is invisible
        store::rooms::create(&state.db_pool, "Lobby", false, false, None, &[&bob.id])
            .await
            .unwrap();
        store::rooms::create(&state.db_pool, "Secret", true, false, None, &[&bob.id])
            .await
            .unwrap();
        store::rooms::create(&state.db_pool, "Alpha", true, false, None, &[&alice.id, &bob.id])
            .await
            .unwrap();

        let response = rooms(State(state.db_pool.clone()), AuthUser(alice)).await.unwrap();
        let names: Vec<&str> = response.iter().map(|r| r.name.as_str()).collect();
        assert_eq!(names, ["Alpha", "Lobby"]);
    }

    #[tokio::test]
    async fn user_list_excludes_self_and_guests() {
        let state = test_util::state().await;
        let alice = test_util::user(&state.db_pool, "alice", false).await;
        test_util::user(&state.db_pool, "bob", false).await;
        test_util::user(&state.db_pool, "visitor", true).await;

        let response = users(State(state.db_pool.clone()), AuthUser(alice)).await.unwrap();
        let names: Vec<&str> = response.iter().map(|u| u.username.as_str()).collect();
        assert_eq!(names, ["bob"]);
    }
}
