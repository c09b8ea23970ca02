pub mod health;
pub mod users;
pub mod markets;
pub mod holdings;
pub mod transactions;
pub mod alerts;

use actix_web::web;

pub fn configure_routes(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/api")
            .service(health::health_check)
            .configure(users::users_routes)
            .configure(markets::markets_routes)
            .configure(holdings::holdings_routes)
            .configure(transactions::transactions_routes)
            .configure(alerts::alerts_routes)
    );
}
