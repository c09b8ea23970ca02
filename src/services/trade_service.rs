use sea_orm::*;
use rust_decimal::Decimal;
use chrono::Utc;
use crate::error::AppError;
use crate::models::{users, market, holding, transaction_log};
use crate::models::transaction_log::TradeType;
use crate::models::dto::{TradeRequest, TradeResponse};
use crate::utils::money::{ensure_positive, to_money, MONEY_SCALE};

pub struct TradeService;

/// Position (user, market) telle que lue avant le trade
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Position {
    pub quantity: Decimal,
    pub avg_buy_price: Decimal,
}

impl From<&holding::Model> for Position {
    fn from(h: &holding::Model) -> Self {
        Position {
            quantity: h.quantity.amount(),
            avg_buy_price: h.avg_buy_price.amount(),
        }
    }
}

/// Effet d'un trade sur la position
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum PositionChange {
    Open(Position),
    Update(Position),
    Close,
}

/// Résultat calculé d'un trade, avant toute écriture
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TradePlan {
    pub total_amount: Decimal,
    pub new_balance: Decimal,
    pub position: PositionChange,
}

fn out_of_range(what: &str) -> AppError {
    AppError::Validation(format!("{} is out of the supported numeric range", what))
}

/// Calcule l'effet d'un achat / d'une vente sur le solde et la position.
///
/// Le total `price * quantity` est exact; un total qui dépasse 8 décimales
/// est refusé.
/// - Achat: refusé si solde < total, sinon débit et prix moyen pondéré
///   `(avg * qty + price * quantity) / (qty + quantity)`
/// - Vente: refusée sans position ou si quantité insuffisante, sinon crédit;
///   le prix moyen ne bouge jamais, la position est fermée à zéro exact
pub fn plan_trade(
    trade_type: TradeType,
    symbol: &str,
    price: Decimal,
    quantity: Decimal,
    balance: Decimal,
    position: Option<Position>,
) -> Result<TradePlan, AppError> {
    let total_amount = price
        .checked_mul(quantity)
        .ok_or_else(|| out_of_range("trade total"))?
        .normalize();

    // Le total est enregistré tel quel: il doit tenir dans l'échelle monétaire
    if total_amount.scale() > MONEY_SCALE {
        return Err(AppError::Validation(format!(
            "trade total {} x {} = {} exceeds {} decimal places",
            price, quantity, total_amount, MONEY_SCALE
        )));
    }

    match trade_type {
        TradeType::Buy => {
            if balance < total_amount {
                return Err(AppError::InsufficientBalance {
                    required: total_amount,
                    available: balance,
                });
            }

            let new_balance = balance - total_amount;

            let position = match position {
                Some(current) => {
                    let new_quantity = current
                        .quantity
                        .checked_add(quantity)
                        .ok_or_else(|| out_of_range("holding quantity"))?;
                    let cost = current
                        .avg_buy_price
                        .checked_mul(current.quantity)
                        .and_then(|c| c.checked_add(total_amount))
                        .ok_or_else(|| out_of_range("holding cost basis"))?;
                    let avg_buy_price = cost
                        .checked_div(new_quantity)
                        .ok_or_else(|| out_of_range("average buy price"))?;

                    PositionChange::Update(Position {
                        quantity: new_quantity,
                        avg_buy_price: to_money(avg_buy_price),
                    })
                }
                None => PositionChange::Open(Position {
                    quantity,
                    avg_buy_price: price,
                }),
            };

            Ok(TradePlan { total_amount, new_balance, position })
        }
        TradeType::Sell => {
            let current = position.ok_or_else(|| AppError::NoHolding {
                symbol: symbol.to_string(),
            })?;

            if current.quantity < quantity {
                return Err(AppError::InsufficientQuantity {
                    requested: quantity,
                    available: current.quantity,
                });
            }

            let new_balance = balance
                .checked_add(total_amount)
                .ok_or_else(|| out_of_range("balance"))?;
            let remaining = current.quantity - quantity;

            let position = if remaining.is_zero() {
                PositionChange::Close
            } else {
                PositionChange::Update(Position {
                    quantity: remaining,
                    avg_buy_price: current.avg_buy_price,
                })
            };

            Ok(TradePlan { total_amount, new_balance, position })
        }
    }
}

impl TradeService {
    /// Exécute un achat ou une vente pour l'utilisateur authentifié.
    /// Solde, position et journal sont écrits dans une seule transaction.
    /// Une contention de verrou est rejouée une fois.
    pub async fn execute_trade(
        db: &DatabaseConnection,
        user_id: i32,
        request: TradeRequest,
    ) -> Result<TradeResponse, AppError> {
        let price = ensure_positive("price", request.price)?;
        let quantity = ensure_positive("quantity", request.quantity)?;
        let symbol = request.symbol.trim();

        match Self::try_execute(db, user_id, symbol, request.trade_type, price, quantity).await {
            Err(e) if e.is_conflict() => {
                tracing::warn!(user_id, symbol, "Trade conflicted, retrying once: {}", e);
                Self::try_execute(db, user_id, symbol, request.trade_type, price, quantity).await
            }
            result => result,
        }
    }

    async fn try_execute(
        db: &DatabaseConnection,
        user_id: i32,
        symbol: &str,
        trade_type: TradeType,
        price: Decimal,
        quantity: Decimal,
    ) -> Result<TradeResponse, AppError> {
        // Toute sortie anticipée (?) abandonne la transaction → rollback
        let txn = db.begin().await?;

        let user = users::Entity::find_by_id(user_id)
            .lock_exclusive()
            .one(&txn)
            .await?
            .ok_or(AppError::UserNotFound(user_id))?;

        let market = market::Entity::find()
            .filter(market::Column::Symbol.eq(symbol))
            .one(&txn)
            .await?
            .ok_or_else(|| AppError::MarketNotFound(symbol.to_string()))?;

        let existing = holding::Entity::find()
            .filter(holding::Column::UserId.eq(user.id))
            .filter(holding::Column::MarketId.eq(market.id))
            .lock_exclusive()
            .one(&txn)
            .await?;

        let plan = plan_trade(
            trade_type,
            &market.symbol,
            price,
            quantity,
            user.balance.amount(),
            existing.as_ref().map(Position::from),
        )?;

        let mut active_user: users::ActiveModel = user.into();
        active_user.balance = Set(plan.new_balance.into());
        active_user.update(&txn).await?;

        match plan.position {
            PositionChange::Open(position) => {
                holding::ActiveModel {
                    user_id: Set(user_id),
                    market_id: Set(market.id),
                    quantity: Set(position.quantity.into()),
                    avg_buy_price: Set(position.avg_buy_price.into()),
                    ..Default::default()
                }
                .insert(&txn)
                .await?;
            }
            PositionChange::Update(position) => {
                let current = existing.ok_or(AppError::HoldingNotFound)?;
                let mut active: holding::ActiveModel = current.into();
                active.quantity = Set(position.quantity.into());
                active.avg_buy_price = Set(position.avg_buy_price.into());
                active.update(&txn).await?;
            }
            PositionChange::Close => {
                let current = existing.ok_or(AppError::HoldingNotFound)?;
                current.delete(&txn).await?;
            }
        }

        let logged = transaction_log::ActiveModel {
            user_id: Set(user_id),
            market_id: Set(market.id),
            trade_type: Set(trade_type),
            price: Set(price.into()),
            quantity: Set(quantity.into()),
            total_amount: Set(plan.total_amount.into()),
            timestamp: Set(Utc::now()),
            ..Default::default()
        }
        .insert(&txn)
        .await?;

        txn.commit().await?;

        tracing::info!(
            user_id,
            symbol = %market.symbol,
            "{} {} @ {} (total {}), balance now {}",
            trade_type.as_str(),
            quantity,
            price,
            plan.total_amount,
            plan.new_balance
        );

        let action = match trade_type {
            TradeType::Buy => "Buy",
            TradeType::Sell => "Sell",
        };

        Ok(TradeResponse {
            message: format!("{} order executed successfully", action),
            trade_type,
            symbol: market.symbol,
            quantity,
            price,
            total_amount: plan.total_amount,
            new_balance: plan.new_balance,
            transaction_id: logged.id,
        })
    }

    /// Positions ouvertes d'un utilisateur
    pub async fn list_holdings(
        db: &DatabaseConnection,
        user_id: i32,
    ) -> Result<Vec<holding::Model>, AppError> {
        users::Entity::find_by_id(user_id)
            .one(db)
            .await?
            .ok_or(AppError::UserNotFound(user_id))?;

        let holdings = holding::Entity::find()
            .filter(holding::Column::UserId.eq(user_id))
            .order_by_asc(holding::Column::Id)
            .all(db)
            .await?;

        Ok(holdings)
    }

    /// Historique des trades, du plus récent au plus ancien
    pub async fn list_transactions(
        db: &DatabaseConnection,
        user_id: i32,
    ) -> Result<Vec<transaction_log::Model>, AppError> {
        users::Entity::find_by_id(user_id)
            .one(db)
            .await?
            .ok_or(AppError::UserNotFound(user_id))?;

        let transactions = transaction_log::Entity::find()
            .filter(transaction_log::Column::UserId.eq(user_id))
            .order_by_desc(transaction_log::Column::Timestamp)
            .order_by_desc(transaction_log::Column::Id)
            .all(db)
            .await?;

        Ok(transactions)
    }
}
