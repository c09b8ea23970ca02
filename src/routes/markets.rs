use std::sync::Arc;

use actix_web::{get, post, put, delete, web, HttpResponse};
use futures::stream;
use sea_orm::DatabaseConnection;
use tokio::sync::mpsc;
use validator::Validate;

use crate::error::AppError;
use crate::middleware::AuthUser;
use crate::models::dto::{MarketPriceUpdate, MarketRequest, SymbolQuery};
use crate::services::market_service::MarketService;
use crate::services::market_stream::{MarketStreamRegistry, SubscriberId};

/// POST /api/markets - Crée le marché ou met à jour son prix
#[post("")]
pub async fn upsert_market(
    db: web::Data<DatabaseConnection>,
    _auth_user: AuthUser,
    request: web::Json<MarketRequest>,
) -> Result<HttpResponse, AppError> {
    if let Err(errors) = request.validate() {
        return Ok(HttpResponse::BadRequest().json(errors));
    }

    let (market, created) = MarketService::upsert_market(&db, request.into_inner()).await?;
    if created {
        Ok(HttpResponse::Created().json(market))
    } else {
        Ok(HttpResponse::Ok().json(market))
    }
}

#[get("")]
pub async fn list_markets(
    db: web::Data<DatabaseConnection>,
    _auth_user: AuthUser,
) -> Result<HttpResponse, AppError> {
    let markets = MarketService::list_markets(&db).await?;
    Ok(HttpResponse::Ok().json(markets))
}

/// GET /api/markets/symbol?symbol=BTC/USDT
#[get("/symbol")]
pub async fn get_market(
    db: web::Data<DatabaseConnection>,
    _auth_user: AuthUser,
    query: web::Query<SymbolQuery>,
) -> Result<HttpResponse, AppError> {
    let market = MarketService::get_market(&db, &query.symbol).await?;
    Ok(HttpResponse::Ok().json(market))
}

/// PUT /api/markets?symbol=BTC/USDT - Mise à jour manuelle du prix
#[put("")]
pub async fn update_price(
    db: web::Data<DatabaseConnection>,
    _auth_user: AuthUser,
    query: web::Query<SymbolQuery>,
    body: web::Json<MarketPriceUpdate>,
) -> Result<HttpResponse, AppError> {
    let market = MarketService::update_price(&db, &query.symbol, body.price).await?;
    Ok(HttpResponse::Ok().json(market))
}

#[delete("/{id}")]
pub async fn delete_market(
    db: web::Data<DatabaseConnection>,
    _auth_user: AuthUser,
    path: web::Path<i32>,
) -> Result<HttpResponse, AppError> {
    let deleted = MarketService::delete_market(&db, path.into_inner()).await?;
    Ok(HttpResponse::Ok().json(serde_json::json!({
        "message": format!("Market {} deleted", deleted.symbol),
        "id": deleted.id
    })))
}

/// Désinscrit l'abonné quand le client se déconnecte
struct Subscription {
    registry: Arc<MarketStreamRegistry>,
    id: SubscriberId,
    rx: mpsc::Receiver<Arc<str>>,
}

impl Drop for Subscription {
    fn drop(&mut self) {
        self.registry.remove(self.id);
    }
}

/// GET /api/markets/stream - Prix courants en Server-Sent Events (PUBLIC)
#[get("/stream")]
pub async fn market_stream(registry: web::Data<MarketStreamRegistry>) -> HttpResponse {
    let registry = registry.into_inner();
    let (id, rx) = registry.add();
    let subscription = Subscription { registry, id, rx };

    let events = stream::unfold(subscription, |mut sub| async move {
        let message = sub.rx.recv().await?;
        let frame = web::Bytes::from(format!("data: {}\n\n", message));
        Some((Ok::<_, std::convert::Infallible>(frame), sub))
    });

    HttpResponse::Ok()
        .content_type("text/event-stream")
        .insert_header(("Cache-Control", "no-cache"))
        .streaming(events)
}

pub fn markets_routes(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/markets")
            .service(market_stream)
            .service(get_market)
            .service(list_markets)
            .service(upsert_market)
            .service(update_price)
            .service(delete_market)
    );
}
