// Notifications d'alertes déclenchées (best-effort)

use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::Serialize;
use thiserror::Error;

use crate::models::alert::AlertDirection;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AlertEvent {
    pub alert_id: i32,
    pub user_id: i32,
    pub symbol: String,
    pub direction: AlertDirection,
    pub target_price: Decimal,
    pub current_price: Decimal,
    pub triggered_at: DateTime<Utc>,
}

#[derive(Debug, Error)]
#[error("Notification failed: {0}")]
pub struct NotificationError(pub String);

/// Destination des alertes déclenchées (console, email, webhook...)
#[async_trait]
pub trait AlertNotifier: Send + Sync {
    async fn notify(&self, event: &AlertEvent) -> Result<(), NotificationError>;
}

/// Notifier par défaut: écrit l'alerte dans les logs
pub struct LogNotifier;

#[async_trait]
impl AlertNotifier for LogNotifier {
    async fn notify(&self, event: &AlertEvent) -> Result<(), NotificationError> {
        tracing::warn!(
            alert_id = event.alert_id,
            user_id = event.user_id,
            "🚨 ALERT TRIGGERED: {} price {} {} (current {}) at {}",
            event.symbol,
            event.direction.as_str(),
            event.target_price,
            event.current_price,
            event.triggered_at
        );
        Ok(())
    }
}

/// Envoie tous les événements en parallèle, chacun borné par `timeout`.
/// Les échecs sont loggés puis abandonnés (aucune file d'attente).
/// Retourne le nombre de notifications livrées.
pub async fn dispatch(notifier: &dyn AlertNotifier, events: &[AlertEvent], timeout: Duration) -> usize {
    let attempts = events.iter().map(|event| async move {
        match tokio::time::timeout(timeout, notifier.notify(event)).await {
            Ok(Ok(())) => true,
            Ok(Err(e)) => {
                tracing::error!(alert_id = event.alert_id, "{}", e);
                false
            }
            Err(_) => {
                tracing::error!(alert_id = event.alert_id, "Notification timed out after {:?}", timeout);
                false
            }
        }
    });

    futures::future::join_all(attempts)
        .await
        .into_iter()
        .filter(|delivered| *delivered)
        .count()
}
