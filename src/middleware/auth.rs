use actix_web::{dev::Payload, Error, FromRequest, HttpRequest, HttpResponse};
use futures::future::{ready, Ready};
use serde::{Deserialize, Serialize};

use crate::error::AppError;
use crate::utils::jwt;

/// Utilisateur authentifié par son bearer token.
/// Utilisé comme extracteur dans les routes protégées
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuthUser {
    pub user_id: i32,
    pub email: String,
}

fn unauthorized(message: String) -> Error {
    let response = HttpResponse::Unauthorized().json(serde_json::json!({
        "error": message
    }));
    actix_web::error::InternalError::from_response("", response).into()
}

impl FromRequest for AuthUser {
    type Error = Error;
    type Future = Ready<Result<Self, Self::Error>>;

    fn from_request(req: &HttpRequest, _payload: &mut Payload) -> Self::Future {
        // 1. Header Authorization
        let Some(auth_header) = req.headers().get("Authorization") else {
            return ready(Err(unauthorized("Missing Authorization header".to_string())));
        };

        let Ok(auth_str) = auth_header.to_str() else {
            return ready(Err(unauthorized("Invalid Authorization header".to_string())));
        };

        // 2. Format "Bearer <token>"
        let Some(token) = auth_str.strip_prefix("Bearer ") else {
            return ready(Err(unauthorized(
                "Invalid Authorization format (expected: Bearer <token>)".to_string(),
            )));
        };

        // 3. Vérification du JWT
        let user = jwt::decode_token(token.trim()).and_then(|claims| {
            Ok(AuthUser {
                user_id: claims.user_id()?,
                email: claims.email,
            })
        });

        ready(user.map_err(|e| unauthorized(e.to_string())))
    }
}

/// Un utilisateur ne peut agir que sur ses propres ressources
pub fn ensure_owner(auth_user: &AuthUser, user_id: i32) -> Result<(), AppError> {
    if auth_user.user_id == user_id {
        Ok(())
    } else {
        tracing::warn!(
            "User {} tried to access resources of user {}",
            auth_user.user_id,
            user_id
        );
        Err(AppError::Forbidden)
    }
}
