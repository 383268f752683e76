mod create;
mod history;
mod list;
mod members;

use axum::routing::{get, post};
use axum::Router;

use crate::AppState;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/rooms", get(list::rooms))
        .route("/rooms/public", post(create::public_room))
        .route("/rooms/private", post(create::private_room))
        .route("/rooms/{room_id}/messages", get(history::room_messages))
        .route("/rooms/{room_id}/members", post(members::add_members))
        .route("/users", get(list::users))
}
