// Bearer tokens HS256 délivrés à la création d'un utilisateur

use std::env;
use std::sync::OnceLock;

use chrono::{Duration, Utc};
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use thiserror::Error;

const TOKEN_TTL_HOURS: i64 = 24;
const INSECURE_SECRET: &str = "default-insecure-key-change-this";

#[derive(Debug, Error)]
pub enum TokenError {
    #[error("failed to sign token: {0}")]
    Signing(String),

    #[error("invalid token: {0}")]
    Invalid(String),

    #[error("token subject {0:?} is not a user id")]
    Subject(String),
}

/// Contenu du token: `sub` porte l'id utilisateur (chaîne, comme le veut JWT)
#[derive(Debug, Serialize, Deserialize)]
pub struct Claims {
    pub sub: String,
    pub email: String,
    pub iat: i64,
    pub exp: i64,
}

impl Claims {
    pub fn for_user(user_id: i32, email: &str) -> Self {
        let now = Utc::now();
        Claims {
            sub: user_id.to_string(),
            email: email.to_string(),
            iat: now.timestamp(),
            exp: (now + Duration::hours(TOKEN_TTL_HOURS)).timestamp(),
        }
    }

    pub fn user_id(&self) -> Result<i32, TokenError> {
        self.sub
            .parse()
            .map_err(|_| TokenError::Subject(self.sub.clone()))
    }
}

/// Lue une seule fois; JWT_SECRET absent → clé par défaut (avec avertissement)
fn secret() -> &'static [u8] {
    static SECRET: OnceLock<String> = OnceLock::new();
    SECRET
        .get_or_init(|| {
            env::var("JWT_SECRET").unwrap_or_else(|_| {
                tracing::warn!("⚠️  JWT_SECRET not set, using default (INSECURE)");
                INSECURE_SECRET.to_string()
            })
        })
        .as_bytes()
}

pub fn issue_token(user_id: i32, email: &str) -> Result<String, TokenError> {
    let claims = Claims::for_user(user_id, email);
    encode(&Header::new(Algorithm::HS256), &claims, &EncodingKey::from_secret(secret()))
        .map_err(|e| TokenError::Signing(e.to_string()))
}

/// Signature + expiration vérifiées
pub fn decode_token(token: &str) -> Result<Claims, TokenError> {
    decode::<Claims>(token, &DecodingKey::from_secret(secret()), &Validation::new(Algorithm::HS256))
        .map(|data| data.claims)
        .map_err(|e| TokenError::Invalid(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_issued_token_decodes_to_same_user() {
        let token = issue_token(123, "alice@example.com").unwrap();
        let claims = decode_token(&token).unwrap();

        assert_eq!(claims.user_id().unwrap(), 123);
        assert_eq!(claims.email, "alice@example.com");
        assert!(claims.exp > claims.iat);
    }

    #[test]
    fn test_garbage_and_tampered_tokens_are_rejected() {
        assert!(matches!(decode_token("invalid.token.here"), Err(TokenError::Invalid(_))));

        let mut tampered = issue_token(1, "bob@example.com").unwrap();
        tampered.push('x');
        assert!(decode_token(&tampered).is_err());
    }

    #[test]
    fn test_non_numeric_subject_is_rejected() {
        let claims = Claims { sub: "admin".to_string(), ..Claims::for_user(1, "eve@example.com") };
        assert!(matches!(claims.user_id(), Err(TokenError::Subject(_))));
    }
}
