use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use time::{Duration, OffsetDateTime};

use super::Identity;

pub const TOKEN_TTL: Duration = Duration::days(1);

/// Signing material, derived once from `JWT_SECRET` and held in app state.
#[derive(Clone)]
pub struct Keys {
    encoding: EncodingKey,
    decoding: DecodingKey,
}

impl Keys {
    pub fn new(secret: &[u8]) -> Self {
        Self {
            encoding: EncodingKey::from_secret(secret),
            decoding: DecodingKey::from_secret(secret),
        }
    }
}

/// The identity snapshot travels inside the token; no server-side session
/// state backs it, and no revocation list exists. A reissued token (after a
/// profile update) supersedes the payload without invalidating old tokens.
#[derive(Debug, Serialize, Deserialize)]
struct Claims {
    sub: String,
    username: String,
    is_guest: bool,
    profile_image: Option<String>,
    bio: Option<String>,
    iat: i64,
    exp: i64,
}

pub fn issue(keys: &Keys, user: &Identity) -> Result<String, jsonwebtoken::errors::Error> {
    let now = OffsetDateTime::now_utc();
    let claims = Claims {
        sub: user.id.clone(),
        username: user.username.clone(),
        is_guest: user.is_guest,
        profile_image: user.profile_image.clone(),
        bio: user.bio.clone(),
        iat: now.unix_timestamp(),
        exp: (now + TOKEN_TTL).unix_timestamp(),
    };
    encode(&Header::default(), &claims, &keys.encoding)
}

/// Expired, malformed and tampered tokens are indistinguishable to the
/// caller: all come back as `None`.
pub fn verify(keys: &Keys, token: &str) -> Option<Identity> {
    let data = decode::<Claims>(token, &keys.decoding, &Validation::default()).ok()?;
    let claims = data.claims;
    Some(Identity {
        id: claims.sub,
        username: claims.username,
        is_guest: claims.is_guest,
        profile_image: claims.profile_image,
        bio: claims.bio,
    })
}
