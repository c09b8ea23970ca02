// Diffusion périodique des prix aux clients connectés (SSE)
//
// Chaque abonné a sa propre file bornée: un client lent perd des
// photos de prix au lieu de bloquer les autres.

use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use parking_lot::Mutex;
use sea_orm::DatabaseConnection;
use tokio::sync::{mpsc, watch};
use tokio::time::MissedTickBehavior;

use crate::services::market_service::MarketService;

pub type SubscriberId = u64;

pub struct MarketStreamRegistry {
    subscribers: Mutex<HashMap<SubscriberId, mpsc::Sender<Arc<str>>>>,
    next_id: AtomicU64,
    buffer: usize,
}

impl MarketStreamRegistry {
    pub fn new(buffer: usize) -> Self {
        Self {
            subscribers: Mutex::new(HashMap::new()),
            next_id: AtomicU64::new(1),
            buffer: buffer.max(1),
        }
    }

    /// Enregistre un abonné et retourne sa file de réception
    pub fn add(&self) -> (SubscriberId, mpsc::Receiver<Arc<str>>) {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let (tx, rx) = mpsc::channel(self.buffer);
        self.subscribers.lock().insert(id, tx);

        tracing::info!(subscriber = id, "Market stream client connected");
        (id, rx)
    }

    pub fn remove(&self, id: SubscriberId) {
        if self.subscribers.lock().remove(&id).is_some() {
            tracing::info!(subscriber = id, "Market stream client disconnected");
        }
    }

    pub fn len(&self) -> usize {
        self.subscribers.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Envoie le message à chaque abonné sans jamais attendre.
    /// File pleine → message perdu pour cet abonné; file fermée → abonné retiré.
    /// Retourne le nombre d'abonnés servis.
    pub fn broadcast(&self, message: Arc<str>) -> usize {
        let mut subscribers = self.subscribers.lock();
        let mut delivered = 0;
        let mut closed = Vec::new();

        for (id, tx) in subscribers.iter() {
            match tx.try_send(message.clone()) {
                Ok(()) => delivered += 1,
                Err(mpsc::error::TrySendError::Full(_)) => {
                    tracing::debug!(subscriber = *id, "Market stream client lagging, message dropped");
                }
                Err(mpsc::error::TrySendError::Closed(_)) => closed.push(*id),
            }
        }

        for id in closed {
            subscribers.remove(&id);
            tracing::info!(subscriber = id, "Market stream client gone");
        }

        delivered
    }
}

/// Boucle de diffusion: une photo des prix à chaque intervalle, tant que
/// l'arrêt n'est pas demandé. Une lecture ratée saute simplement ce tour.
pub async fn run_market_stream(
    db: DatabaseConnection,
    registry: Arc<MarketStreamRegistry>,
    every: Duration,
    mut shutdown: watch::Receiver<bool>,
) {
    let mut ticker = tokio::time::interval(every);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

    tracing::info!("📡 Market stream started (every {:?})", every);

    loop {
        tokio::select! {
            _ = ticker.tick() => {}
            _ = shutdown.changed() => break,
        }

        if registry.is_empty() {
            continue;
        }

        let snapshot = match MarketService::price_snapshot(&db).await {
            Ok(snapshot) => snapshot,
            Err(e) => {
                tracing::error!("Failed to read market prices for stream: {}", e);
                continue;
            }
        };

        match serde_json::to_string(&snapshot) {
            Ok(payload) => {
                registry.broadcast(Arc::from(payload));
            }
            Err(e) => tracing::error!("Failed to encode market snapshot: {}", e),
        }
    }

    tracing::info!("📡 Market stream stopped");
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;
    use crate::db::test_support::{insert_market, setup_db};

    #[test]
    fn test_add_and_remove_subscribers() {
        let registry = MarketStreamRegistry::new(4);
        let (a, _rx_a) = registry.add();
        let (b, _rx_b) = registry.add();

        assert_ne!(a, b);
        assert_eq!(registry.len(), 2);

        registry.remove(a);
        assert_eq!(registry.len(), 1);
        registry.remove(a);
        assert_eq!(registry.len(), 1);
    }

    #[tokio::test]
    async fn test_slow_subscriber_does_not_block_others() {
        let registry = MarketStreamRegistry::new(1);
        let (_slow, mut slow_rx) = registry.add();
        let (_fast, mut fast_rx) = registry.add();

        assert_eq!(registry.broadcast(Arc::from("first")), 2);
        assert_eq!(fast_rx.recv().await.as_deref(), Some("first"));

        // La file du lent est pleine: seul le rapide reçoit
        assert_eq!(registry.broadcast(Arc::from("second")), 1);
        assert_eq!(fast_rx.recv().await.as_deref(), Some("second"));

        assert_eq!(slow_rx.recv().await.as_deref(), Some("first"));
        assert!(slow_rx.try_recv().is_err());
        assert_eq!(registry.len(), 2);
    }

    #[tokio::test]
    async fn test_closed_subscriber_is_removed() {
        let registry = MarketStreamRegistry::new(2);
        let (_gone, gone_rx) = registry.add();
        let (_kept, _kept_rx) = registry.add();
        drop(gone_rx);

        assert_eq!(registry.broadcast(Arc::from("tick")), 1);
        assert_eq!(registry.len(), 1);
    }

    #[tokio::test]
    async fn test_stream_loop_pushes_snapshots_until_shutdown() {
        let db = setup_db().await;
        insert_market(&db, "BTC/USDT", dec!(62000)).await;

        let registry = Arc::new(MarketStreamRegistry::new(4));
        let (_id, mut rx) = registry.add();
        let (shutdown_tx, shutdown_rx) = watch::channel(false);

        let task = tokio::spawn(run_market_stream(
            db,
            registry.clone(),
            Duration::from_millis(10),
            shutdown_rx,
        ));

        let payload = tokio::time::timeout(Duration::from_secs(5), rx.recv())
            .await
            .unwrap()
            .unwrap();
        let json: serde_json::Value = serde_json::from_str(&payload).unwrap();
        assert_eq!(json["markets"][0]["symbol"], "BTC/USDT");

        shutdown_tx.send(true).unwrap();
        tokio::time::timeout(Duration::from_secs(5), task).await.unwrap().unwrap();
    }
}
