use std::time::{SystemTime, UNIX_EPOCH};

use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, Validation};
use quill_core::SessionIdentity;
use serde::{Deserialize, Serialize};

#[derive(Debug, Serialize, Deserialize)]
pub struct Claims {
    /// Account email.
    pub sub: String,
    #[serde(default)]
    pub name: String,
    /// Token id, used for revocation on logout.
    pub jti: String,
    pub exp: usize,
}

impl Claims {
    pub fn identity(&self) -> SessionIdentity {
        SessionIdentity::new(self.sub.clone(), self.name.clone())
    }
}

pub fn now_secs() -> anyhow::Result<u64> {
    Ok(SystemTime::now().duration_since(UNIX_EPOCH)?.as_secs())
}

/// Issues a session token for `identity`. Returns the token and its expiry
/// as unix seconds.
pub fn create_token(
    jwt_secret: &str,
    ttl_hours: u64,
    identity: &SessionIdentity,
) -> anyhow::Result<(String, u64)> {
    let expires_at = now_secs()? + ttl_hours * 3600;

    let claims = Claims {
        sub: identity.email.clone(),
        name: identity.name.clone(),
        jti: uuid::Uuid::new_v4().to_string(),
        exp: expires_at as usize,
    };

    let token = encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(jwt_secret.as_bytes()),
    )?;

    Ok((token, expires_at))
}

pub fn verify_token(jwt_secret: &str, token: &str) -> anyhow::Result<Claims> {
    let token_data = decode::<Claims>(
        token,
        &DecodingKey::from_secret(jwt_secret.as_bytes()),
        &Validation::default(),
    )?;

    Ok(token_data.claims)
}
