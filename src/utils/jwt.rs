use jsonwebtoken::{decode, DecodingKey, Validation};
use serde::{Deserialize, Serialize};

use crate::error::{AppError, AppResult};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Admin,
    Staff,
    Customer,
}

impl Role {
    /// Admins and staff may use the back-office API.
    pub fn is_staff(&self) -> bool {
        matches!(self, Role::Admin | Role::Staff)
    }
}

/// Claims of tokens issued by the identity service.
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct Claims {
    pub sub: i64,        // user id
    pub username: String,
    pub role: Role,
    pub exp: i64,        // expiration timestamp
    pub iat: i64,        // issued at timestamp
}

pub fn verify_token(token: &str, secret: &str) -> AppResult<Claims> {
    decode::<Claims>(
        token,
        &DecodingKey::from_secret(secret.as_bytes()),
        &Validation::default(),
    )
    .map(|data| data.claims)
    .map_err(|e| AppError::Unauthorized(format!("Invalid token: {}", e)))
}

#[cfg(test)]
pub(crate) fn create_token(user_id: i64, username: &str, role: Role, secret: &str) -> String {
    use chrono::{Duration, Utc};
    use jsonwebtoken::{encode, EncodingKey, Header};

    let now = Utc::now();
    let claims = Claims {
        sub: user_id,
        username: username.to_string(),
        role,
        exp: (now + Duration::hours(1)).timestamp(),
        iat: now.timestamp(),
    };

    encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(secret.as_bytes()),
    )
    .unwrap()
}
