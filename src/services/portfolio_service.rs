use sea_orm::*;
use rust_decimal::Decimal;
use crate::error::AppError;
use crate::models::{users, market, holding};
use crate::models::dto::{HoldingDetail, PortfolioResponse};

pub struct PortfolioService;

fn out_of_range() -> AppError {
    AppError::Validation("portfolio value is out of the supported numeric range".to_string())
}

/// Valorise les positions au prix courant (lecture seule, sans arrondi).
///
/// `unrealized_pnl = (current_price - avg_buy_price) * quantity`,
/// `value = current_price * quantity`, `total_value = balance + Σ value`.
pub fn value_portfolio(
    balance: Decimal,
    positions: &[(holding::Model, market::Model)],
) -> Result<PortfolioResponse, AppError> {
    let mut holdings = Vec::with_capacity(positions.len());
    let mut total_value = balance;

    for (h, m) in positions {
        let (price, quantity) = (m.current_price.amount(), h.quantity.amount());

        let value = price.checked_mul(quantity).ok_or_else(out_of_range)?;
        let unrealized_pnl = price
            .checked_sub(h.avg_buy_price.amount())
            .and_then(|diff| diff.checked_mul(quantity))
            .ok_or_else(out_of_range)?;

        total_value = total_value.checked_add(value).ok_or_else(out_of_range)?;

        holdings.push(HoldingDetail {
            symbol: m.symbol.clone(),
            quantity,
            avg_buy_price: h.avg_buy_price.amount(),
            current_price: price,
            unrealized_pnl,
            value,
        });
    }

    Ok(PortfolioResponse {
        balance,
        holdings,
        total_value,
    })
}

impl PortfolioService {
    /// Résumé du portefeuille: solde, positions avec P&L latent, valeur totale
    pub async fn get_portfolio(
        db: &DatabaseConnection,
        user_id: i32,
    ) -> Result<PortfolioResponse, AppError> {
        // Une seule transaction pour lire solde et prix de façon cohérente
        let txn = db.begin().await?;

        let user = users::Entity::find_by_id(user_id)
            .one(&txn)
            .await?
            .ok_or(AppError::UserNotFound(user_id))?;

        let rows = holding::Entity::find()
            .filter(holding::Column::UserId.eq(user_id))
            .find_also_related(market::Entity)
            .order_by_asc(holding::Column::Id)
            .all(&txn)
            .await?;

        txn.commit().await?;

        let positions: Vec<(holding::Model, market::Model)> = rows
            .into_iter()
            .filter_map(|(h, m)| match m {
                Some(m) => Some((h, m)),
                None => {
                    tracing::warn!(holding_id = h.id, "Holding references a missing market, skipped");
                    None
                }
            })
            .collect();

        value_portfolio(user.balance.amount(), &positions)
    }
}
