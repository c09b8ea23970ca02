use sea_orm::*;
use rand::Rng;
use rust_decimal::Decimal;
use chrono::Utc;
use crate::config::VariationBand;
use crate::error::AppError;
use crate::models::market;
use crate::utils::money::to_money;

pub struct PriceSimulator;

/// Plus petit prix admis (1e-8)
pub const MIN_PRICE: Decimal = Decimal::from_parts(1, 0, 0, false, 8);

/// Décote de 1% appliquée quand la variation passerait sous MIN_PRICE
const MARKDOWN: Decimal = Decimal::from_parts(99, 0, 0, false, 2);

/// Finesse du tirage uniforme dans la bande (1e-6)
const VARIATION_STEPS: i64 = 1_000_000;

/// Variation tirée pour un marché lors d'un tick
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PriceMove {
    pub variation_percent: Decimal,
    pub direction: i8, // +1 ou -1
}

impl PriceMove {
    /// Tirage uniforme de la variation dans [min, max] et du sens dans {+1, -1}
    pub fn sample<R: Rng + ?Sized>(band: &VariationBand, rng: &mut R) -> Self {
        let step = rng.gen_range(0..=VARIATION_STEPS);
        let span = band.max_percent - band.min_percent;
        let variation_percent = band.min_percent + span * Decimal::new(step, 6);
        let direction = if rng.gen_bool(0.5) { 1 } else { -1 };

        PriceMove { variation_percent, direction }
    }
}

/// `new = current + current * variation / 100 * sens`, avec plancher à MIN_PRICE
pub fn next_price(current: Decimal, price_move: PriceMove) -> Decimal {
    let change = current
        .checked_mul(price_move.variation_percent)
        .and_then(|c| c.checked_div(Decimal::ONE_HUNDRED))
        .map(|c| c * Decimal::from(price_move.direction));

    // Dépassement numérique: le prix reste inchangé pour ce tick
    let Some(change) = change else {
        return current;
    };

    let candidate = current + change;
    if candidate < MIN_PRICE {
        to_money(current * MARKDOWN).max(MIN_PRICE)
    } else {
        to_money(candidate).max(MIN_PRICE)
    }
}

impl PriceSimulator {
    /// Un tick de simulation: tous les prix sont mis à jour dans une seule
    /// transaction. En cas d'erreur rien n'est commité; le tick suivant
    /// repartira des prix précédents.
    pub async fn simulate_tick(
        db: &DatabaseConnection,
        band: &VariationBand,
    ) -> Result<usize, AppError> {
        let txn = db.begin().await?;

        let markets = market::Entity::find()
            .order_by_asc(market::Column::Id)
            .all(&txn)
            .await?;

        if markets.is_empty() {
            tracing::warn!("⚠️  No markets found to update");
            return Ok(0);
        }

        let moves: Vec<PriceMove> = {
            let mut rng = rand::thread_rng();
            markets.iter().map(|_| PriceMove::sample(band, &mut rng)).collect()
        };

        let now = Utc::now();
        let mut updated_count = 0;

        for (current, price_move) in markets.into_iter().zip(moves) {
            let new_price = next_price(current.current_price.amount(), price_move);

            tracing::debug!(
                "📊 {}: {} → {} ({}{}%)",
                current.symbol,
                current.current_price,
                new_price,
                if price_move.direction > 0 { "+" } else { "-" },
                price_move.variation_percent.round_dp(2)
            );

            let mut active: market::ActiveModel = current.into();
            active.current_price = Set(new_price.into());
            active.updated_at = Set(Some(now));
            active.update(&txn).await?;
            updated_count += 1;
        }

        txn.commit().await?;
        tracing::info!("✅ Updated {} market prices", updated_count);

        Ok(updated_count)
    }
}
