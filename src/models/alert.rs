// ============================================================================
// MODÈLE : ALERTS
// ============================================================================
//
// Cycle de vie:
//   1. Création avec triggered = false
//   2. Le job périodique compare current_price à target_price
//   3. Condition remplie → triggered = true + triggered_at (une seule fois)
//   4. Une alerte déclenchée n'est plus jamais réévaluée ni réarmée
//
// Points d'attention:
//   - Suppression explicite par l'utilisateur, ou en cascade (user / market)
//
// ============================================================================

use serde::{Serialize, Deserialize};
use sea_orm::entity::prelude::*;
use crate::utils::money::Money;

#[derive(Debug, Clone, Copy, PartialEq, Eq, EnumIter, DeriveActiveEnum, Serialize, Deserialize)]
#[sea_orm(rs_type = "String", db_type = "Text")]
#[serde(rename_all = "lowercase")]
pub enum AlertDirection {
    #[sea_orm(string_value = "above")]
    Above,
    #[sea_orm(string_value = "below")]
    Below,
}

impl AlertDirection {
    pub fn as_str(&self) -> &'static str {
        match self {
            AlertDirection::Above => "above",
            AlertDirection::Below => "below",
        }
    }
}

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "alerts")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,
    pub user_id: i32,
    pub market_id: i32,
    #[sea_orm(column_type = "Text")]
    pub target_price: Money,
    pub direction: AlertDirection,
    pub triggered: bool,
    pub created_at: DateTimeUtc,
    pub triggered_at: Option<DateTimeUtc>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::users::Entity",
        from = "Column::UserId",
        to = "super::users::Column::Id",
        on_delete = "Cascade"
    )]
    User,

    #[sea_orm(
        belongs_to = "super::market::Entity",
        from = "Column::MarketId",
        to = "super::market::Column::Id",
        on_delete = "Cascade"
    )]
    Market,
}

impl Related<super::users::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::User.def()
    }
}

impl Related<super::market::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Market.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
