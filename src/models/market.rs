use serde::{Serialize, Deserialize};
use sea_orm::entity::prelude::*;
use crate::utils::money::Money;

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "markets")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,
    #[sea_orm(unique)]
    pub symbol: String, // ex: BTC/USDT, ETH/USDT
    #[sea_orm(column_type = "Text")]
    pub current_price: Money,
    pub created_at: DateTimeUtc,
    pub updated_at: Option<DateTimeUtc>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(has_many = "super::holding::Entity")]
    Holding,

    #[sea_orm(has_many = "super::alert::Entity")]
    Alert,

    #[sea_orm(has_many = "super::transaction_log::Entity")]
    TransactionLog,
}

impl Related<super::holding::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Holding.def()
    }
}

impl Related<super::alert::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Alert.def()
    }
}

impl Related<super::transaction_log::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::TransactionLog.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
