use actix_web::{get, web, HttpResponse};
use chrono::Utc;
use sea_orm::DatabaseConnection;
use crate::error::AppError;
use crate::models::health::HealthResponse;
use crate::services::market_service::MarketService;
use crate::services::market_stream::MarketStreamRegistry;

#[get("/health")]
pub async fn health_check(
    db: web::Data<DatabaseConnection>,
    registry: web::Data<MarketStreamRegistry>,
) -> Result<HttpResponse, AppError> {
    let response = HealthResponse {
        status: "ok".to_string(),
        service: env!("CARGO_PKG_NAME").to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        markets: MarketService::count(&db).await?,
        stream_subscribers: registry.len(),
        time: Utc::now(),
    };

    Ok(HttpResponse::Ok().json(response))
}
