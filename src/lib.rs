pub mod auth;
pub mod error;
pub mod realtime;
pub mod rooms;
pub mod store;

#[cfg(test)]
pub(crate) mod test_util;

use axum::extract::FromRef;
use sqlx::SqlitePool;

use crate::auth::token::Keys;
use crate::realtime::{bus::Bus, registry::Registry};

pub use error::{ApiError, AppResult};

#[derive(Clone, FromRef)]
pub struct AppState {
    pub db_pool: SqlitePool,
    pub keys: Keys,
    pub bus: Bus,
    pub registry: Registry,
}

impl AppState {
    pub fn new(db_pool: SqlitePool, keys: Keys) -> Self {
        Self {
            db_pool,
            keys,
            bus: Bus::new(),
            registry: Registry::new(),
        }
    }
}
