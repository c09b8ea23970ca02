use serde::{Serialize, Deserialize};
use sea_orm::entity::prelude::*;
use crate::utils::money::Money;

// Position d'un utilisateur sur un marché.
// Une seule ligne par (user_id, market_id) : index unique créé dans db::create_schema.
// La ligne est supprimée quand la quantité tombe exactement à zéro.
#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "holdings")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,
    pub user_id: i32,
    pub market_id: i32,
    #[sea_orm(column_type = "Text")]
    pub quantity: Money,
    #[sea_orm(column_type = "Text")]
    pub avg_buy_price: Money, // Prix de revient moyen pondéré
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
