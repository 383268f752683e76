//! Reconciles persistent room membership with live subscriptions.
//!
//! Membership is a storage mutation, subscription a registry mutation.
//! Both are idempotent, and the join flow is the only place that performs
//! both together.

use sqlx::SqlitePool;

use crate::auth::Identity;
use crate::store::rooms::Room;
use crate::{store, ApiError, AppResult, AppState};

use super::events::ServerEvent;
use super::registry::ConnId;

pub const GENERAL_ROOM: &str = "General";

/// Fetch the General room, creating it on first use. Concurrent creators
/// race on the unique index; the loser re-fetches the winner's row.
pub async fn ensure_general_room(pool: &SqlitePool) -> AppResult<Room> {
    if let Some(room) = store::rooms::find_public_by_name(pool, GENERAL_ROOM).await? {
        return Ok(room);
    }
    match store::rooms::create(pool, GENERAL_ROOM, false, false, None, &[]).await {
        Ok(room) => {
            tracing::info!("created the {GENERAL_ROOM} room");
            Ok(room)
        }
        Err(e) if store::unique_violation(&e) => store::rooms::find_public_by_name(pool, GENERAL_ROOM)
            .await?
            .ok_or_else(|| ApiError::NotFound("room not found".to_owned())),
        Err(e) => Err(e.into()),
    }
}

/// Runs once per fresh connection: the identity always ends up a member of
/// General, and the socket subscribed to it.
pub async fn bootstrap_connection(state: &AppState, conn: ConnId, user: &Identity) -> AppResult<()> {
    let general = ensure_general_room(&state.db_pool).await?;
    store::rooms::add_member(&state.db_pool, &general.id, &user.id).await?;
    state.registry.subscribe(conn, &general.id);
    Ok(())
}

/// The join flow: subscribe the socket (idempotent), reconcile persistent
/// membership, then acknowledge with the room's history.
///
/// Membership is advisory here: any authenticated identity that knows a
/// room id gets the live traffic. Only history retrieval over REST is
/// membership-gated.
pub async fn join_room(state: &AppState, conn: ConnId, user: &Identity, room_id: &str) -> AppResult<()> {
    let Some(room) = store::rooms::find_by_id(&state.db_pool, room_id).await? else {
        return Err(ApiError::NotFound("room not found".to_owned()));
    };
    state.registry.subscribe(conn, &room.id);
    store::rooms::add_member(&state.db_pool, &room.id, &user.id).await?;

    let messages = store::messages::history(&state.db_pool, &room.id).await?;
    state.registry.send_to(
        conn,
        ServerEvent::RoomMessages {
            room_id: room.id,
            messages,
        },
    );
    Ok(())
}

/// Lazily creates the caller's single memo room, announces it, then runs
/// the join flow on it.
pub async fn open_memo_room(state: &AppState, conn: ConnId, user: &Identity) -> AppResult<()> {
    let room = match store::rooms::find_memo_by_owner(&state.db_pool, &user.id).await? {
        Some(room) => room,
        None => {
            let name = format!("{}のメモ", user.username);
            match store::rooms::create(&state.db_pool, &name, false, true, Some(&user.id), &[&user.id])
                .await
            {
                Ok(room) => {
                    tracing::info!(username = %user.username, "memo room created");
                    room
                }
                // lost the creation race: somebody was faster on another
                // connection of the same identity
                Err(e) if store::unique_violation(&e) => {
                    store::rooms::find_memo_by_owner(&state.db_pool, &user.id)
                        .await?
                        .ok_or_else(|| ApiError::NotFound("room not found".to_owned()))?
                }
                Err(e) => return Err(e.into()),
            }
        }
    };
    store::rooms::add_member(&state.db_pool, &room.id, &user.id).await?;

    let view = store::rooms::view(&state.db_pool, room).await?;
    let room_id = view.id.clone();
    state.registry.send_to(conn, ServerEvent::MemoRoomInfo(view));
    join_room(state, conn, user, &room_id).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_util;

    #[tokio::test]
    async fn general_room_is_created_once() {
        let state = test_util::state().await;
        let first = ensure_general_room(&state.db_pool).await.unwrap();
        let second = ensure_general_room(&state.db_pool).await.unwrap();
        assert_eq!(first, second);
        assert!(!first.is_dm);
        assert!(!first.is_memo);
    }

    #[tokio::test]
    async fn bootstrap_makes_every_identity_a_general_member() {
        let state = test_util::state().await;
        let user = test_util::user(&state.db_pool, "alice", false).await;
        let (conn, _rx) = state.registry.register(&user);

        bootstrap_connection(&state, conn, &user).await.unwrap();

        let general = store::rooms::find_public_by_name(&state.db_pool, GENERAL_ROOM)
            .await
            .unwrap()
            .unwrap();
        assert!(
            store::rooms::is_member(&state.db_pool, &general.id, &user.id)
                .await
                .unwrap()
        );
        assert!(state.registry.is_subscribed(conn, &general.id));
    }

    #[tokio::test]
    async fn joining_twice_keeps_one_subscription_and_acks_both_times() {
        let state = test_util::state().await;
        let user = test_util::user(&state.db_pool, "alice", false).await;
        let room = test_util::room(&state.db_pool, "Team", &[&user.id]).await;
        let (conn, mut rx) = state.registry.register(&user);

        join_room(&state, conn, &user, &room.id).await.unwrap();
        join_room(&state, conn, &user, &room.id).await.unwrap();

        assert!(state.registry.is_subscribed(conn, &room.id));
        let first = rx.try_recv().unwrap();
        let second = rx.try_recv().unwrap();
        assert_eq!(first, second);
        assert!(matches!(first, ServerEvent::RoomMessages { room_id, .. } if room_id == room.id));
        assert!(rx.try_recv().is_err());
    }

    #[tokio::test]
    async fn joining_reconciles_persistent_membership() {
        let state = test_util::state().await;
        let alice = test_util::user(&state.db_pool, "alice", false).await;
        let bob = test_util::user(&state.db_pool, "bob", false).await;
        let room = test_util::room(&state.db_pool, "Team", &[&alice.id]).await;
        let (conn, _rx) = state.registry.register(&bob);

        join_room(&state, conn, &bob, &room.id).await.unwrap();

        assert!(
            store::rooms::is_member(&state.db_pool, &room.id, &bob.id)
                .await
                .unwrap()
        );
    }

    #[tokio::test]
    async fn joining_an_unknown_room_fails_without_side_effects() {
        let state = test_util::state().await;
        let user = test_util::user(&state.db_pool, "alice", false).await;
        let (conn, mut rx) = state.registry.register(&user);

        let result = join_room(&state, conn, &user, "no-such-room").await;

        assert!(matches!(result, Err(ApiError::NotFound(_))));
        assert!(!state.registry.is_subscribed(conn, "no-such-room"));
        assert!(rx.try_recv().is_err());
    }

    #[tokio::test]
    async fn memo_room_is_created_lazily_and_only_once() {
        let state = test_util::state().await;
        let user = test_util::user(&state.db_pool, "alice", false).await;
        let (conn, mut rx) = state.registry.register(&user);

        open_memo_room(&state, conn, &user).await.unwrap();

        let room = store::rooms::find_memo_by_owner(&state.db_pool, &user.id)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(room.name, "aliceのメモ");
        assert!(room.is_memo);
        assert_eq!(room.owner_id.as_deref(), Some(user.id.as_str()));
        assert!(
            store::rooms::is_member(&state.db_pool, &room.id, &user.id)
                .await
                .unwrap()
        );

        let info = rx.try_recv().unwrap();
        assert!(matches!(&info, ServerEvent::MemoRoomInfo(view) if view.id == room.id));
        let ack = rx.try_recv().unwrap();
        assert!(matches!(&ack, ServerEvent::RoomMessages { room_id, .. } if *room_id == room.id));

        // second request finds the same room
        open_memo_room(&state, conn, &user).await.unwrap();
        let again = store::rooms::find_memo_by_owner(&state.db_pool, &user.id)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(again.id, room.id);
    }
}
