use actix_web::{get, web, HttpResponse};
use sea_orm::DatabaseConnection;

use crate::error::AppError;
use crate::middleware::{AuthUser, ensure_owner};
use crate::services::trade_service::TradeService;

/// GET /api/transactions/user/{id} - Historique, plus récent en premier
#[get("/user/{id}")]
pub async fn get_user_transactions(
    db: web::Data<DatabaseConnection>,
    auth_user: AuthUser,
    path: web::Path<i32>,
) -> Result<HttpResponse, AppError> {
    let user_id = path.into_inner();
    ensure_owner(&auth_user, user_id)?;

    let transactions = TradeService::list_transactions(&db, user_id).await?;
    Ok(HttpResponse::Ok().json(transactions))
}

pub fn transactions_routes(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/transactions")
            .service(get_user_transactions)
    );
}
