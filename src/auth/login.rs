use axum::extract::State;
use axum::{debug_handler, Json};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use crate::realtime::membership;
use crate::{store, ApiError, AppResult, AppState};

use super::{token, AuthUser, Identity};

/// Login doubles as registration: an unknown username creates the account.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct LoginRequest {
    pub(crate) username: String,
    pub(crate) password: Option<String>,
    #[serde(default)]
    pub(crate) is_guest: bool,
}

#[derive(Debug, Serialize)]
pub(crate) struct AuthResponse {
    pub(crate) message: String,
    pub(crate) user: Identity,
    pub(crate) token: String,
}

#[debug_handler(state = AppState)]
pub(crate) async fn login(
    State(state): State<AppState>,
    Json(req): Json<LoginRequest>,
) -> AppResult<Json<AuthResponse>> {
    let username = req.username.trim();
    if username.is_empty() {
        return Err(ApiError::BadRequest("username is required".to_owned()));
    }

    let user = match store::users::find_by_username(&state.db_pool, username).await? {
        None => register(&state, username, req.password.as_deref(), req.is_guest).await?,
        Some(user) => {
            // a username belongs to exactly one kind of account
            if user.is_guest != req.is_guest {
                let message = if user.is_guest {
                    "this guest name already exists; pick another username for a regular login"
                } else {
                    "this username is already registered as a regular user"
                };
                return Err(ApiError::BadRequest(message.to_owned()));
            }
            if let Some(hash) = &user.password_hash {
                let password = req.password.as_deref().unwrap_or("");
                if !bcrypt::verify(password, hash)? {
                    return Err(ApiError::Unauthorized(
                        "wrong username or password".to_owned(),
                    ));
                }
            }
            user
        }
    };

    let user = Identity::from(user);
    let token = token::issue(&state.keys, &user)?;
    tracing::info!(username = %user.username, guest = user.is_guest, "logged in");
    Ok(Json(AuthResponse {
        message: "logged in".to_owned(),
        user,
        token,
    }))
}

async fn register(
    state: &AppState,
    username: &str,
    password: Option<&str>,
    is_guest: bool,
) -> AppResult<store::users::User> {
    let password_hash = if is_guest {
        None
    } else {
        let password = password.unwrap_or("").trim();
        if password.is_empty() {
            return Err(ApiError::BadRequest(
                "a password is required for a regular login".to_owned(),
            ));
        }
        Some(bcrypt::hash(password, bcrypt::DEFAULT_COST)?)
    };

    let user = store::users::create(&state.db_pool, username, password_hash.as_deref(), is_guest)
        .await
        .map_err(|e| {
            if store::unique_violation(&e) {
                ApiError::Conflict("this username is already taken".to_owned())
            } else {
                ApiError::from(e)
            }
        })?;

    // every account starts out in General
    let general = membership::ensure_general_room(&state.db_pool).await?;
    store::rooms::add_member(&state.db_pool, &general.id, &user.id).await?;

    tracing::info!(username = %user.username, guest = user.is_guest, "registered");
    Ok(user)
}

/// Tokens are stateless, so logout is an acknowledgement: the client drops
/// its copy and the token ages out.
#[debug_handler(state = AppState)]
pub(crate) async fn logout(AuthUser(user): AuthUser) -> Json<Value> {
    tracing::info!(username = %user.username, "logged out");
    Json(json!({ "message": "logged out" }))
}

#[debug_handler(state = AppState)]
pub(crate) async fn me(AuthUser(user): AuthUser) -> Json<Identity> {
    Json(user)
}
