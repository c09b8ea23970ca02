//pour les requêtes / réponses structurées
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use validator::Validate;

use crate::models::alert::AlertDirection;
use crate::models::transaction_log::TradeType;

// ---------------------------------------------------------------- users

#[derive(Debug, Deserialize, Validate)]
pub struct CreateUserRequest {
    #[validate(length(min = 1, max = 100))]
    pub name: String,
    #[validate(email)]
    pub email: String,
    pub balance: Option<Decimal>, // défaut: DEFAULT_BALANCE
}

#[derive(Debug, Serialize)]
pub struct CreateUserResponse {
    pub user: crate::models::users::Model,
    pub access_token: String,
    pub token_type: String,
}

// ---------------------------------------------------------------- markets

#[derive(Debug, Deserialize, Validate)]
pub struct MarketRequest {
    #[validate(length(min = 1, max = 50))]
    pub symbol: String,
    pub price: Decimal,
}

#[derive(Debug, Deserialize)]
pub struct MarketPriceUpdate {
    pub price: Decimal,
}

#[derive(Debug, Deserialize)]
pub struct SymbolQuery {
    pub symbol: String,
}

/// Prix courant d'un marché, tel que diffusé sur le flux temps réel
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MarketTick {
    pub id: i32,
    pub symbol: String,
    pub price: Decimal,
}

#[derive(Debug, Clone, Serialize)]
pub struct MarketSnapshot {
    pub timestamp: DateTime<Utc>,
    pub markets: Vec<MarketTick>,
}

// ---------------------------------------------------------------- trades

#[derive(Debug, Clone, Deserialize, Validate)]
pub struct TradeRequest {
    #[validate(length(min = 1, max = 50))]
    pub symbol: String,
    #[serde(rename = "type")]
    pub trade_type: TradeType,
    pub price: Decimal,
    pub quantity: Decimal,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TradeResponse {
    pub message: String,
    pub trade_type: TradeType,
    pub symbol: String,
    pub quantity: Decimal,
    pub price: Decimal,
    pub total_amount: Decimal,
    pub new_balance: Decimal,
    pub transaction_id: i32,
}

// ---------------------------------------------------------------- portfolio

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct HoldingDetail {
    pub symbol: String,
    pub quantity: Decimal,
    pub avg_buy_price: Decimal,
    pub current_price: Decimal,
    pub unrealized_pnl: Decimal, // (current_price - avg_buy_price) * quantity
    pub value: Decimal,          // current_price * quantity
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PortfolioResponse {
    pub balance: Decimal,
    pub holdings: Vec<HoldingDetail>,
    pub total_value: Decimal, // balance + somme des valeurs des positions
}

// ---------------------------------------------------------------- alerts

#[derive(Debug, Deserialize, Validate)]
pub struct AlertCreate {
    #[validate(length(min = 1, max = 50))]
    pub symbol: String,
    pub direction: AlertDirection,
    pub target_price: Decimal,
}
