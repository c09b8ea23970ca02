use sea_orm::*;
use sea_orm::sea_query::Expr;
use rust_decimal::Decimal;
use chrono::Utc;
use std::time::Duration;
use crate::error::AppError;
use crate::models::{users, market, alert};
use crate::models::alert::AlertDirection;
use crate::models::dto::AlertCreate;
use crate::services::notification::{self, AlertEvent, AlertNotifier};
use crate::utils::money::ensure_positive;

pub struct AlertService;

/// above → prix >= cible, below → prix <= cible
pub fn should_trigger(direction: AlertDirection, current_price: Decimal, target_price: Decimal) -> bool {
    match direction {
        AlertDirection::Above => current_price >= target_price,
        AlertDirection::Below => current_price <= target_price,
    }
}

impl AlertService {
    pub async fn create_alert(
        db: &DatabaseConnection,
        user_id: i32,
        request: AlertCreate,
    ) -> Result<alert::Model, AppError> {
        let target_price = ensure_positive("target_price", request.target_price)?;
        let symbol = request.symbol.trim();

        users::Entity::find_by_id(user_id)
            .one(db)
            .await?
            .ok_or(AppError::UserNotFound(user_id))?;

        let market = market::Entity::find()
            .filter(market::Column::Symbol.eq(symbol))
            .one(db)
            .await?
            .ok_or_else(|| AppError::MarketNotFound(symbol.to_string()))?;

        let created = alert::ActiveModel {
            user_id: Set(user_id),
            market_id: Set(market.id),
            target_price: Set(target_price.into()),
            direction: Set(request.direction),
            triggered: Set(false),
            created_at: Set(Utc::now()),
            triggered_at: Set(None),
            ..Default::default()
        }
        .insert(db)
        .await?;

        tracing::info!(
            alert_id = created.id,
            user_id,
            "Alert created: {} {} {}",
            market.symbol,
            created.direction.as_str(),
            created.target_price
        );

        Ok(created)
    }

    /// Alertes d'un utilisateur; `active_only` garde les non déclenchées
    pub async fn list_alerts(
        db: &DatabaseConnection,
        user_id: i32,
        active_only: bool,
    ) -> Result<Vec<alert::Model>, AppError> {
        users::Entity::find_by_id(user_id)
            .one(db)
            .await?
            .ok_or(AppError::UserNotFound(user_id))?;

        let mut query = alert::Entity::find().filter(alert::Column::UserId.eq(user_id));
        if active_only {
            query = query.filter(alert::Column::Triggered.eq(false));
        }

        Ok(query.order_by_asc(alert::Column::Id).all(db).await?)
    }

    /// Supprime une alerte appartenant à l'utilisateur
    pub async fn delete_alert(
        db: &DatabaseConnection,
        user_id: i32,
        alert_id: i32,
    ) -> Result<(), AppError> {
        let result = alert::Entity::delete_many()
            .filter(alert::Column::Id.eq(alert_id))
            .filter(alert::Column::UserId.eq(user_id))
            .exec(db)
            .await?;

        if result.rows_affected == 0 {
            return Err(AppError::AlertNotFound(alert_id));
        }

        Ok(())
    }

    /// Évalue toutes les alertes non déclenchées contre le prix courant.
    ///
    /// Les passages à `triggered = true` sont commités ensemble, puis les
    /// notifications sont tentées (bornées par `notify_timeout`).
    /// Une alerte déjà déclenchée n'est jamais réévaluée.
    pub async fn check_alerts(
        db: &DatabaseConnection,
        notifier: &dyn AlertNotifier,
        notify_timeout: Duration,
    ) -> Result<usize, AppError> {
        let txn = db.begin().await?;

        let pending = alert::Entity::find()
            .filter(alert::Column::Triggered.eq(false))
            .find_also_related(market::Entity)
            .order_by_asc(alert::Column::Id)
            .all(&txn)
            .await?;

        if pending.is_empty() {
            return Ok(0);
        }

        let mut events = Vec::new();

        for (pending_alert, market) in pending {
            let Some(market) = market else {
                tracing::warn!(alert_id = pending_alert.id, "Alert references a missing market, skipped");
                continue;
            };

            if !should_trigger(pending_alert.direction, market.current_price.amount(), pending_alert.target_price.amount()) {
                continue;
            }

            let triggered_at = Utc::now();

            // Le filtre triggered = false rend la transition idempotente
            let result = alert::Entity::update_many()
                .col_expr(alert::Column::Triggered, Expr::value(true))
                .col_expr(alert::Column::TriggeredAt, Expr::value(triggered_at))
                .filter(alert::Column::Id.eq(pending_alert.id))
                .filter(alert::Column::Triggered.eq(false))
                .exec(&txn)
                .await?;

            if result.rows_affected == 0 {
                continue;
            }

            events.push(AlertEvent {
                alert_id: pending_alert.id,
                user_id: pending_alert.user_id,
                symbol: market.symbol,
                direction: pending_alert.direction,
                target_price: pending_alert.target_price.amount(),
                current_price: market.current_price.amount(),
                triggered_at,
            });
        }

        if events.is_empty() {
            return Ok(0);
        }

        txn.commit().await?;
        tracing::info!("✅ Triggered {} alerts", events.len());

        notification::dispatch(notifier, &events, notify_timeout).await;

        Ok(events.len())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;
    use crate::db::test_support::{insert_market, insert_user, setup_db};
    use crate::services::notification::testing::{FailingNotifier, RecordingNotifier};

    const TIMEOUT: Duration = Duration::from_secs(1);

    fn above(symbol: &str, target: Decimal) -> AlertCreate {
        AlertCreate {
            symbol: symbol.to_string(),
            direction: AlertDirection::Above,
            target_price: target,
        }
    }

    async fn set_price(db: &DatabaseConnection, market: &market::Model, price: Decimal) {
        let mut active: market::ActiveModel = market.clone().into();
        active.current_price = Set(price.into());
        active.update(db).await.unwrap();
    }

    #[test]
    fn test_trigger_conditions() {
        assert!(!should_trigger(AlertDirection::Above, dec!(99.99), dec!(100)));
        assert!(should_trigger(AlertDirection::Above, dec!(100), dec!(100)));
        assert!(should_trigger(AlertDirection::Above, dec!(150), dec!(100)));

        assert!(!should_trigger(AlertDirection::Below, dec!(100.01), dec!(100)));
        assert!(should_trigger(AlertDirection::Below, dec!(100), dec!(100)));
        assert!(should_trigger(AlertDirection::Below, dec!(50), dec!(100)));
    }

    #[tokio::test]
    async fn test_alert_triggers_exactly_once() {
        let db = setup_db().await;
        let user = insert_user(&db, "alice@example.com", dec!(10000)).await;
        let btc = insert_market(&db, "BTC/USDT", dec!(95)).await;
        let created = AlertService::create_alert(&db, user.id, above("BTC/USDT", dec!(100))).await.unwrap();
        let notifier = RecordingNotifier::default();

        assert_eq!(AlertService::check_alerts(&db, &notifier, TIMEOUT).await.unwrap(), 0);

        set_price(&db, &btc, dec!(100)).await;
        assert_eq!(AlertService::check_alerts(&db, &notifier, TIMEOUT).await.unwrap(), 1);

        let fired = alert::Entity::find_by_id(created.id).one(&db).await.unwrap().unwrap();
        assert!(fired.triggered);
        let first_stamp = fired.triggered_at.unwrap();

        set_price(&db, &btc, dec!(120)).await;
        assert_eq!(AlertService::check_alerts(&db, &notifier, TIMEOUT).await.unwrap(), 0);

        let again = alert::Entity::find_by_id(created.id).one(&db).await.unwrap().unwrap();
        assert_eq!(again.triggered_at, Some(first_stamp));

        let events = notifier.events.lock();
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].symbol, "BTC/USDT");
        assert_eq!(events[0].current_price, dec!(100));
    }

    #[tokio::test]
    async fn test_failed_notification_still_records_trigger() {
        let db = setup_db().await;
        let user = insert_user(&db, "bob@example.com", dec!(10000)).await;
        insert_market(&db, "ETH/USDT", dec!(3000)).await;
        let request = AlertCreate {
            symbol: "ETH/USDT".to_string(),
            direction: AlertDirection::Below,
            target_price: dec!(3100),
        };
        let created = AlertService::create_alert(&db, user.id, request).await.unwrap();

        assert_eq!(AlertService::check_alerts(&db, &FailingNotifier, TIMEOUT).await.unwrap(), 1);

        let fired = alert::Entity::find_by_id(created.id).one(&db).await.unwrap().unwrap();
        assert!(fired.triggered);
    }

    #[tokio::test]
    async fn test_list_and_delete_alerts() {
        let db = setup_db().await;
        let user = insert_user(&db, "carol@example.com", dec!(10000)).await;
        let other = insert_user(&db, "dave@example.com", dec!(10000)).await;
        insert_market(&db, "BTC/USDT", dec!(60000)).await;

        let hit = AlertService::create_alert(&db, user.id, above("BTC/USDT", dec!(50000))).await.unwrap();
        let waiting = AlertService::create_alert(&db, user.id, above("BTC/USDT", dec!(70000))).await.unwrap();
        AlertService::check_alerts(&db, &RecordingNotifier::default(), TIMEOUT).await.unwrap();

        assert_eq!(AlertService::list_alerts(&db, user.id, false).await.unwrap().len(), 2);
        let active = AlertService::list_alerts(&db, user.id, true).await.unwrap();
        assert_eq!(active.len(), 1);
        assert_eq!(active[0].id, waiting.id);

        // Seul le propriétaire peut supprimer
        assert!(matches!(
            AlertService::delete_alert(&db, other.id, hit.id).await,
            Err(AppError::AlertNotFound(_))
        ));
        AlertService::delete_alert(&db, user.id, hit.id).await.unwrap();
        assert_eq!(AlertService::list_alerts(&db, user.id, false).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_create_alert_validation() {
        let db = setup_db().await;
        let user = insert_user(&db, "erin@example.com", dec!(10000)).await;
        insert_market(&db, "BTC/USDT", dec!(60000)).await;

        assert!(matches!(
            AlertService::create_alert(&db, user.id, above("BTC/USDT", dec!(0))).await,
            Err(AppError::Validation(_))
        ));
        assert!(matches!(
            AlertService::create_alert(&db, user.id, above("SOL/USDT", dec!(10))).await,
            Err(AppError::MarketNotFound(_))
        ));
        assert!(matches!(
            AlertService::create_alert(&db, 404, above("BTC/USDT", dec!(10))).await,
            Err(AppError::UserNotFound(404))
        ));
    }
}
