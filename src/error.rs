// ============================================================================
// ERREURS APPLICATIVES
// ============================================================================
//
// Description:
//   Taxonomie unique des erreurs remontées par les services.
//   Chaque erreur est convertie en réponse HTTP structurée {"error": "..."}.
//
// Points d'attention:
//   - Les erreurs métier (solde, quantité, introuvable) donnent le détail
//     nécessaire pour corriger la requête
//   - Les erreurs de base de données restent génériques côté client
//   - La contention de verrous devient PersistenceConflict (409, rejouable)
//
// ============================================================================

use actix_web::{HttpResponse, ResponseError, http::StatusCode};
use rust_decimal::Decimal;
use sea_orm::{DbErr, RuntimeErr};
use thiserror::Error;

use crate::utils::jwt::TokenError;

#[derive(Debug, Error)]
pub enum AppError {
    #[error("User {0} not found")]
    UserNotFound(i32),

    #[error("Market {0} not found")]
    MarketNotFound(String),

    #[error("Market with ID {0} not found")]
    MarketIdNotFound(i32),

    #[error("Holding not found")]
    HoldingNotFound,

    #[error("Alert {0} not found")]
    AlertNotFound(i32),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Insufficient balance: {available} available, {required} required")]
    InsufficientBalance { required: Decimal, available: Decimal },

    #[error("No holdings found for market {symbol}")]
    NoHolding { symbol: String },

    #[error("Insufficient quantity: requested {requested}, available {available}")]
    InsufficientQuantity { requested: Decimal, available: Decimal },

    #[error("Concurrent update conflict, please retry: {0}")]
    PersistenceConflict(String),

    #[error("Access to another user's resources is forbidden")]
    Forbidden,

    #[error(transparent)]
    Token(#[from] TokenError),

    #[error("Database error: {0}")]
    Database(DbErr),
}

impl AppError {
    pub fn is_conflict(&self) -> bool {
        matches!(self, AppError::PersistenceConflict(_))
    }
}

/// Codes de contention: sérialisation / deadlock / lock_not_available (Postgres),
/// BUSY / LOCKED et variantes étendues (SQLite)
const CONFLICT_CODES: [&str; 8] = ["40001", "40P01", "55P03", "5", "6", "261", "262", "517"];

fn is_lock_contention(err: &DbErr) -> bool {
    let runtime = match err {
        DbErr::Exec(e) | DbErr::Query(e) | DbErr::Conn(e) => e,
        _ => return false,
    };

    match runtime {
        RuntimeErr::SqlxError(sqlx::Error::Database(db_err)) => db_err
            .code()
            .map(|code| CONFLICT_CODES.contains(&code.as_ref()))
            .unwrap_or(false),
        _ => false,
    }
}

impl From<DbErr> for AppError {
    fn from(err: DbErr) -> Self {
        if is_lock_contention(&err) {
            AppError::PersistenceConflict(err.to_string())
        } else {
            AppError::Database(err)
        }
    }
}

impl ResponseError for AppError {
    fn status_code(&self) -> StatusCode {
        match self {
            AppError::UserNotFound(_)
            | AppError::MarketNotFound(_)
            | AppError::MarketIdNotFound(_)
            | AppError::HoldingNotFound
            | AppError::AlertNotFound(_)
            | AppError::NoHolding { .. } => StatusCode::NOT_FOUND,
            AppError::Validation(_)
            | AppError::InsufficientBalance { .. }
            | AppError::InsufficientQuantity { .. } => StatusCode::BAD_REQUEST,
            AppError::Forbidden => StatusCode::FORBIDDEN,
            AppError::PersistenceConflict(_) => StatusCode::CONFLICT,
            AppError::Token(_) | AppError::Database(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn error_response(&self) -> HttpResponse {
        let message = match self {
            AppError::Database(e) => {
                tracing::error!("Database error: {}", e);
                "Internal database error, please retry later".to_string()
            }
            AppError::PersistenceConflict(_) => {
                "Concurrent update conflict, please retry".to_string()
            }
            other => other.to_string(),
        };

        HttpResponse::build(self.status_code()).json(serde_json::json!({
            "error": message
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_status_mapping() {
        assert_eq!(AppError::UserNotFound(1).status_code(), StatusCode::NOT_FOUND);
        assert_eq!(
            AppError::NoHolding { symbol: "BTC/USDT".into() }.status_code(),
            StatusCode::NOT_FOUND
        );
        assert_eq!(
            AppError::InsufficientBalance { required: dec!(10), available: dec!(5) }.status_code(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(AppError::Forbidden.status_code(), StatusCode::FORBIDDEN);
        assert_eq!(
            AppError::PersistenceConflict("busy".into()).status_code(),
            StatusCode::CONFLICT
        );
    }

    #[test]
    fn test_business_errors_carry_detail() {
        let err = AppError::InsufficientQuantity { requested: dec!(1.0), available: dec!(0.5) };
        assert_eq!(err.to_string(), "Insufficient quantity: requested 1.0, available 0.5");
    }

    #[test]
    fn test_plain_db_error_is_not_a_conflict() {
        let err: AppError = DbErr::Custom("boom".into()).into();
        assert!(matches!(err, AppError::Database(_)));
        assert!(!err.is_conflict());
    }
}
