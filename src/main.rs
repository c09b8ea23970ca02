mod config;
mod db;
mod error;
mod middleware;
mod models;
mod routes;
mod services;
mod utils;

use std::sync::Arc;

use actix_web::{App, HttpServer, web};
use anyhow::Context;
use tokio::sync::watch;
use tracing_subscriber::EnvFilter;

use crate::config::Settings;
use crate::services::market_stream::{self, MarketStreamRegistry};
use crate::services::notification::{AlertNotifier, LogNotifier};
use crate::services::scheduler;

#[actix_web::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("info,crypto_tracker=debug")),
        )
        .init();

    let settings = Settings::from_env().context("Invalid configuration")?;

    tracing::info!("🔌 Connecting to database...");
    let db = db::establish_connection(&settings)
        .await
        .context("Failed to connect to database")?;
    db::create_schema(&db).await.context("Failed to create schema")?;
    tracing::info!("✅ Database connected!");

    if settings.seed_on_startup {
        db::seed(&db).await.context("Failed to seed database")?;
    }

    let registry = Arc::new(MarketStreamRegistry::new(settings.stream_buffer));
    let notifier: Arc<dyn AlertNotifier> = Arc::new(LogNotifier);
    let (shutdown_tx, shutdown_rx) = watch::channel(false);

    let price_task = tokio::spawn(scheduler::run_price_loop(
        db.clone(),
        settings.clone(),
        notifier,
        shutdown_rx.clone(),
    ));
    let stream_task = tokio::spawn(market_stream::run_market_stream(
        db.clone(),
        registry.clone(),
        settings.stream_interval,
        shutdown_rx,
    ));

    tracing::info!("🚀 Starting server on http://{}:{}", settings.host, settings.port);

    let bind_addr = (settings.host.clone(), settings.port);
    let app_settings = web::Data::new(settings);
    let app_registry = web::Data::from(registry);

    HttpServer::new(move || {
        App::new()
            .wrap(actix_web::middleware::Logger::default())
            .app_data(web::Data::new(db.clone()))
            .app_data(app_registry.clone())
            .app_data(app_settings.clone())
            .configure(routes::configure_routes)
    })
        .bind(bind_addr)
        .context("Failed to bind server address")?
        .run()
        .await?;

    // Serveur arrêté (Ctrl-C): on coupe les tâches de fond
    tracing::info!("🛑 Shutting down background tasks...");
    let _ = shutdown_tx.send(true);
    let _ = tokio::join!(price_task, stream_task);

    Ok(())
}
