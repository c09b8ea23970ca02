use actix_web::{get, post, web, HttpResponse};
use sea_orm::DatabaseConnection;
use validator::Validate;

use crate::error::AppError;
use crate::middleware::{AuthUser, ensure_owner};
use crate::models::dto::TradeRequest;
use crate::services::trade_service::TradeService;

/// POST /api/holdings/trade - Achat / vente pour l'utilisateur authentifié (201 + transaction créée)
#[post("/trade")]
pub async fn execute_trade(
    db: web::Data<DatabaseConnection>,
    auth_user: AuthUser,
    request: web::Json<TradeRequest>,
) -> Result<HttpResponse, AppError> {
    if let Err(errors) = request.validate() {
        return Ok(HttpResponse::BadRequest().json(errors));
    }

    let response = TradeService::execute_trade(&db, auth_user.user_id, request.into_inner()).await?;
    Ok(HttpResponse::Created().json(response))
}

#[get("/user/{id}")]
pub async fn get_user_holdings(
    db: web::Data<DatabaseConnection>,
    auth_user: AuthUser,
    path: web::Path<i32>,
) -> Result<HttpResponse, AppError> {
    let user_id = path.into_inner();
    ensure_owner(&auth_user, user_id)?;

    let holdings = TradeService::list_holdings(&db, user_id).await?;
    Ok(HttpResponse::Ok().json(holdings))
}

pub fn holdings_routes(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/holdings")
            .service(execute_trade)
            .service(get_user_holdings)
    );
}
