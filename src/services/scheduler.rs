// Boucle périodique: simulation des prix puis vérification des alertes

use std::sync::Arc;

use sea_orm::DatabaseConnection;
use tokio::sync::watch;
use tokio::time::MissedTickBehavior;

use crate::config::Settings;
use crate::services::alert_service::AlertService;
use crate::services::notification::AlertNotifier;
use crate::services::price_simulator::PriceSimulator;

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct TickReport {
    pub prices_updated: usize,
    pub alerts_triggered: usize,
}

/// Un tour complet. Les alertes sont vérifiées seulement si les prix
/// ont été commités; une erreur est loggée et le tour suivant repart.
pub async fn run_tick(
    db: &DatabaseConnection,
    settings: &Settings,
    notifier: &dyn AlertNotifier,
) -> TickReport {
    let mut report = TickReport::default();

    match PriceSimulator::simulate_tick(db, &settings.variation).await {
        Ok(updated) => report.prices_updated = updated,
        Err(e) => {
            tracing::error!("❌ Price simulation failed: {}", e);
            return report;
        }
    }

    match AlertService::check_alerts(db, notifier, settings.notification_timeout).await {
        Ok(triggered) => report.alerts_triggered = triggered,
        Err(e) => tracing::error!("❌ Alert check failed: {}", e),
    }

    report
}

pub async fn run_price_loop(
    db: DatabaseConnection,
    settings: Settings,
    notifier: Arc<dyn AlertNotifier>,
    mut shutdown: watch::Receiver<bool>,
) {
    let mut ticker = tokio::time::interval(settings.price_update_interval);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

    tracing::info!(
        "⏱️  Price simulation started (every {:?}, variation {}%..{}%)",
        settings.price_update_interval,
        settings.variation.min_percent,
        settings.variation.max_percent
    );

    loop {
        tokio::select! {
            _ = ticker.tick() => {}
            _ = shutdown.changed() => break,
        }

        let report = run_tick(&db, &settings, notifier.as_ref()).await;
        tracing::debug!(
            prices_updated = report.prices_updated,
            alerts_triggered = report.alerts_triggered,
            "Simulation tick done"
        );
    }

    tracing::info!("⏱️  Price simulation stopped");
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;
    use rust_decimal_macros::dec;
    use crate::db::test_support::{insert_market, insert_user, setup_db};
    use crate::models::alert::AlertDirection;
    use crate::models::dto::AlertCreate;
    use crate::services::notification::testing::RecordingNotifier;

    #[tokio::test]
    async fn test_tick_moves_prices_and_fires_alerts() {
        let db = setup_db().await;
        let user = insert_user(&db, "alice@example.com", dec!(10000)).await;
        insert_market(&db, "BTC/USDT", dec!(62000)).await;
        insert_market(&db, "ETH/USDT", dec!(3200)).await;

        // Le prix reste > 1 après un tick: l'alerte part forcément
        let request = AlertCreate {
            symbol: "BTC/USDT".to_string(),
            direction: AlertDirection::Above,
            target_price: dec!(1),
        };
        AlertService::create_alert(&db, user.id, request).await.unwrap();

        let notifier = RecordingNotifier::default();
        let report = run_tick(&db, &Settings::default(), &notifier).await;

        assert_eq!(report, TickReport { prices_updated: 2, alerts_triggered: 1 });
        assert_eq!(notifier.events.lock().len(), 1);

        let second = run_tick(&db, &Settings::default(), &notifier).await;
        assert_eq!(second.alerts_triggered, 0);
    }

    #[tokio::test]
    async fn test_price_loop_stops_on_shutdown() {
        let db = setup_db().await;
        let settings = Settings {
            price_update_interval: Duration::from_millis(10),
            ..Settings::default()
        };
        let notifier: Arc<dyn AlertNotifier> = Arc::new(RecordingNotifier::default());
        let (shutdown_tx, shutdown_rx) = watch::channel(false);

        let task = tokio::spawn(run_price_loop(db, settings, notifier, shutdown_rx));
        tokio::time::sleep(Duration::from_millis(30)).await;

        shutdown_tx.send(true).unwrap();
        tokio::time::timeout(Duration::from_secs(5), task).await.unwrap().unwrap();
    }
}
