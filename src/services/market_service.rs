use sea_orm::*;
use rust_decimal::Decimal;
use chrono::Utc;
use crate::error::AppError;
use crate::models::{market, holding, alert, transaction_log};
use crate::models::dto::{MarketRequest, MarketSnapshot, MarketTick};
use crate::utils::money::ensure_positive;

pub struct MarketService;

impl MarketService {
    /// Crée le marché, ou met à jour son prix s'il existe déjà.
    /// Retourne (marché, créé ?)
    pub async fn upsert_market(
        db: &DatabaseConnection,
        request: MarketRequest,
    ) -> Result<(market::Model, bool), AppError> {
        let price = ensure_positive("price", request.price)?;
        let symbol = request.symbol.trim();
        if symbol.is_empty() {
            return Err(AppError::Validation("symbol cannot be empty".to_string()));
        }

        let existing = market::Entity::find()
            .filter(market::Column::Symbol.eq(symbol))
            .one(db)
            .await?;

        match existing {
            Some(current) => {
                let updated = Self::set_price(db, current, price).await?;
                Ok((updated, false))
            }
            None => {
                let created = market::ActiveModel {
                    symbol: Set(symbol.to_string()),
                    current_price: Set(price.into()),
                    created_at: Set(Utc::now()),
                    updated_at: Set(None),
                    ..Default::default()
                }
                .insert(db)
                .await?;

                tracing::info!("Market {} created at {}", created.symbol, created.current_price);
                Ok((created, true))
            }
        }
    }

    pub async fn list_markets(db: &DatabaseConnection) -> Result<Vec<market::Model>, AppError> {
        Ok(market::Entity::find()
            .order_by_asc(market::Column::Symbol)
            .all(db)
            .await?)
    }

    pub async fn get_market(db: &DatabaseConnection, symbol: &str) -> Result<market::Model, AppError> {
        let symbol = symbol.trim();
        market::Entity::find()
            .filter(market::Column::Symbol.eq(symbol))
            .one(db)
            .await?
            .ok_or_else(|| AppError::MarketNotFound(symbol.to_string()))
    }

    /// Mise à jour manuelle du prix
    pub async fn update_price(
        db: &DatabaseConnection,
        symbol: &str,
        price: Decimal,
    ) -> Result<market::Model, AppError> {
        let price = ensure_positive("price", price)?;
        let current = Self::get_market(db, symbol).await?;
        Self::set_price(db, current, price).await
    }

    async fn set_price(
        db: &DatabaseConnection,
        current: market::Model,
        price: Decimal,
    ) -> Result<market::Model, AppError> {
        let mut active: market::ActiveModel = current.into();
        active.current_price = Set(price.into());
        active.updated_at = Set(Some(Utc::now()));

        let updated = active.update(db).await?;
        tracing::info!("Market {} price set to {}", updated.symbol, updated.current_price);
        Ok(updated)
    }

    /// Supprime un marché et tout ce qui le référence (transactions,
    /// alertes, positions), dans une seule transaction
    pub async fn delete_market(db: &DatabaseConnection, market_id: i32) -> Result<market::Model, AppError> {
        let txn = db.begin().await?;

        let existing = market::Entity::find_by_id(market_id)
            .one(&txn)
            .await?
            .ok_or(AppError::MarketIdNotFound(market_id))?;

        transaction_log::Entity::delete_many()
            .filter(transaction_log::Column::MarketId.eq(market_id))
            .exec(&txn)
            .await?;
        alert::Entity::delete_many()
            .filter(alert::Column::MarketId.eq(market_id))
            .exec(&txn)
            .await?;
        holding::Entity::delete_many()
            .filter(holding::Column::MarketId.eq(market_id))
            .exec(&txn)
            .await?;

        existing.clone().delete(&txn).await?;
        txn.commit().await?;

        tracing::info!("Market {} deleted", existing.symbol);
        Ok(existing)
    }

    /// Photo des prix courants pour le flux temps réel
    pub async fn price_snapshot(db: &DatabaseConnection) -> Result<MarketSnapshot, AppError> {
        let markets = market::Entity::find()
            .order_by_asc(market::Column::Id)
            .all(db)
            .await?;

        Ok(MarketSnapshot {
            timestamp: Utc::now(),
            markets: markets
                .into_iter()
                .map(|m| MarketTick {
                    id: m.id,
                    symbol: m.symbol,
                    price: m.current_price.amount(),
                })
                .collect(),
        })
    }

    pub async fn count(db: &DatabaseConnection) -> Result<u64, AppError> {
        Ok(market::Entity::find().count(db).await?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;
    use crate::db::test_support::{insert_user, setup_db};
    use crate::models::alert::AlertDirection;
    use crate::models::dto::{AlertCreate, TradeRequest};
    use crate::models::transaction_log::TradeType;
    use crate::services::alert_service::AlertService;
    use crate::services::trade_service::TradeService;

    fn request(symbol: &str, price: Decimal) -> MarketRequest {
        MarketRequest { symbol: symbol.to_string(), price }
    }

    #[tokio::test]
    async fn test_upsert_creates_then_updates() {
        let db = setup_db().await;

        let (created, is_new) = MarketService::upsert_market(&db, request("BTC/USDT", dec!(62000))).await.unwrap();
        assert!(is_new);
        assert!(created.updated_at.is_none());

        let (updated, is_new) = MarketService::upsert_market(&db, request("BTC/USDT", dec!(63000))).await.unwrap();
        assert!(!is_new);
        assert_eq!(updated.id, created.id);
        assert_eq!(updated.current_price, dec!(63000));
        assert_eq!(MarketService::count(&db).await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_invalid_prices_are_rejected() {
        let db = setup_db().await;

        assert!(matches!(
            MarketService::upsert_market(&db, request("BTC/USDT", dec!(-5))).await,
            Err(AppError::Validation(_))
        ));
        MarketService::upsert_market(&db, request("BTC/USDT", dec!(1))).await.unwrap();
        assert!(matches!(
            MarketService::update_price(&db, "BTC/USDT", Decimal::ZERO).await,
            Err(AppError::Validation(_))
        ));
        assert!(matches!(
            MarketService::update_price(&db, "ETH/USDT", dec!(1)).await,
            Err(AppError::MarketNotFound(_))
        ));
    }

    #[tokio::test]
    async fn test_snapshot_lists_current_prices() {
        let db = setup_db().await;
        MarketService::upsert_market(&db, request("BTC/USDT", dec!(62000))).await.unwrap();
        MarketService::upsert_market(&db, request("ETH/USDT", dec!(3200))).await.unwrap();
        MarketService::update_price(&db, "ETH/USDT", dec!(3300)).await.unwrap();

        let snapshot = MarketService::price_snapshot(&db).await.unwrap();
        let prices: Vec<(String, Decimal)> = snapshot.markets.into_iter().map(|t| (t.symbol, t.price)).collect();
        assert_eq!(
            prices,
            vec![("BTC/USDT".to_string(), dec!(62000)), ("ETH/USDT".to_string(), dec!(3300))]
        );
    }

    #[tokio::test]
    async fn test_delete_market_cascades() {
        let db = setup_db().await;
        let user = insert_user(&db, "alice@example.com", dec!(10000)).await;
        let (btc, _) = MarketService::upsert_market(&db, request("BTC/USDT", dec!(60000))).await.unwrap();

        let trade = TradeRequest {
            symbol: "BTC/USDT".to_string(),
            trade_type: TradeType::Buy,
            price: dec!(60000),
            quantity: dec!(0.1),
        };
        TradeService::execute_trade(&db, user.id, trade).await.unwrap();
        let alert_request = AlertCreate {
            symbol: "BTC/USDT".to_string(),
            direction: AlertDirection::Above,
            target_price: dec!(70000),
        };
        AlertService::create_alert(&db, user.id, alert_request).await.unwrap();

        MarketService::delete_market(&db, btc.id).await.unwrap();

        assert_eq!(holding::Entity::find().count(&db).await.unwrap(), 0);
        assert_eq!(alert::Entity::find().count(&db).await.unwrap(), 0);
        assert_eq!(transaction_log::Entity::find().count(&db).await.unwrap(), 0);
        assert!(matches!(
            MarketService::delete_market(&db, btc.id).await,
            Err(AppError::MarketIdNotFound(_))
        ));
    }
}
