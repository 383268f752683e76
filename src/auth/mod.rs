mod guard;
mod login;
mod profile;
pub mod token;

use axum::routing::{get, post, put};
use axum::Router;
use serde::{Deserialize, Serialize};

use crate::AppState;

pub use guard::AuthUser;

/// An authenticated principal, as embedded in a verified token. Attached to
/// a connection once at handshake time and never re-derived mid-connection.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Identity {
    pub id: String,
    pub username: String,
    pub is_guest: bool,
    pub profile_image: Option<String>,
    pub bio: Option<String>,
}

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/login", post(login::login))
        .route("/logout", post(login::logout))
        .route("/me", get(login::me))
        .route("/profile", put(profile::update))
}
