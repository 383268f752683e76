use axum::extract::State;
use axum::{debug_handler, Json};
use serde::Deserialize;

use crate::{store, ApiError, AppResult, AppState};

use super::login::AuthResponse;
use super::{token, AuthUser, Identity};

/// Only the username is editable for now.
#[derive(Debug, Deserialize)]
pub(crate) struct ProfileUpdate {
    pub(crate) username: Option<String>,
}

#[debug_handler(state = AppState)]
pub(crate) async fn update(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
    Json(req): Json<ProfileUpdate>,
) -> AppResult<Json<AuthResponse>> {
    let username = req
        .username
        .as_deref()
        .map(str::trim)
        .filter(|u| !u.is_empty());
    let Some(username) = username else {
        return Err(ApiError::BadRequest("nothing to update".to_owned()));
    };
    if user.is_guest {
        return Err(ApiError::Forbidden(
            "guest users cannot change their username".to_owned(),
        ));
    }

    let updated = store::users::update_username(&state.db_pool, &user.id, username)
        .await
        .map_err(|e| {
            if store::unique_violation(&e) {
                ApiError::Conflict("this username is already taken".to_owned())
            } else {
                ApiError::from(e)
            }
        })?;

    // the token embeds the identity snapshot, so a change reissues it
    let updated = Identity::from(updated);
    let token = token::issue(&state.keys, &updated)?;
    tracing::info!(username = %updated.username, "profile updated");
    Ok(Json(AuthResponse {
        message: "profile updated".to_owned(),
        user: updated,
        token,
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_util;

    fn body(username: Option<&str>) -> Json<ProfileUpdate> {
        Json(ProfileUpdate {
            username: username.map(str::to_owned),
        })
    }

    #[tokio::test]
    async fn rename_reissues_a_working_token() {
        let state = test_util::state().await;
        let user = test_util::user(&state.db_pool, "alice", false).await;

        let response = update(State(state.clone()), AuthUser(user), body(Some("alicia")))
            .await
            .unwrap();
        assert_eq!(response.user.username, "alicia");
        assert_eq!(
            token::verify(&state.keys, &response.token),
            Some(response.user.clone())
        );
    }

    #[tokio::test]
    async fn guests_cannot_rename() {
        let state = test_util::state().await;
        let guest = test_util::user(&state.db_pool, "visitor", true).await;

        let result = update(State(state), AuthUser(guest), body(Some("regular"))).await;
        assert!(matches!(result, Err(ApiError::Forbidden(_))));
    }

    #[tokio::test]
    async fn taken_username_conflicts() {
        let state = test_util::state().await;
        test_util::user(&state.db_pool, "alice", false).await;
        let bob = test_util::user(&state.db_pool, "bob", false).await;

        let result = update(State(state), AuthUser(bob), body(Some("alice"))).await;
        assert!(matches!(result, Err(ApiError::Conflict(_))));
    }

    #[tokio::test]
    async fn empty_update_is_rejected() {
        let state = test_util::state().await;
        let user = test_util::user(&state.db_pool, "alice", false).await;

        let result = update(State(state.clone()), AuthUser(user.clone()), body(None)).await;
        assert!(matches!(result, Err(ApiError::BadRequest(_))));
        let result = update(State(state), AuthUser(user), body(Some("   "))).await;
        assert!(matches!(result, Err(ApiError::BadRequest(_))));
    }
}
