use sqlx::sqlite::SqlitePoolOptions;
use sqlx::SqlitePool;

use crate::auth::token::Keys;
use crate::auth::Identity;
use crate::store::rooms::Room;
use crate::{store, AppState};

/// A fresh in-memory database per test. One connection, or each checkout
/// would see a different empty database.
pub(crate) async fn state() -> AppState {
    let db_pool = SqlitePoolOptions::new()
        .max_connections(1)
        .connect("sqlite::memory:")
        .await
        .unwrap();
    sqlx::migrate!().run(&db_pool).await.unwrap();
    AppState::new(db_pool, Keys::new(b"test-secret"))
}

pub(crate) async fn user(pool: &SqlitePool, username: &str, is_guest: bool) -> Identity {
    let hash = if is_guest {
        None
    } else {
        // minimum cost keeps the suite fast
        Some(bcrypt::hash("hunter2", 4).unwrap())
    };
    store::users::create(pool, username, hash.as_deref(), is_guest)
        .await
        .unwrap()
        .into()
}

pub(crate) async fn room(pool: &SqlitePool, name: &str, member_ids: &[&str]) -> Room {
    store::rooms::create(pool, name, false, false, None, member_ids)
        .await
        .unwrap()
}

pub(crate) async fn private_room(pool: &SqlitePool, name: &str, member_ids: &[&str]) -> Room {
    store::rooms::create(pool, name, true, false, None, member_ids)
        .await
        .unwrap()
}
