// connexion BD + création du schéma + données de démo

use rust_decimal::Decimal;
use sea_orm::sea_query::Index;
use sea_orm::{
    ActiveModelTrait, ConnectOptions, ConnectionTrait, Database, DatabaseConnection, DbErr,
    EntityTrait, PaginatorTrait, Schema, Set, TransactionTrait,
};

use crate::config::Settings;
use crate::error::AppError;
use crate::models::{alert, holding, market, transaction_log, users};
use crate::utils::jwt;

pub async fn establish_connection(settings: &Settings) -> Result<DatabaseConnection, DbErr> {
    let mut options = ConnectOptions::new(settings.database_url.clone());
    options.sqlx_logging(false);

    Database::connect(options).await
}

/// Crée les tables (si absentes) dans l'ordre des clés étrangères,
/// puis les index utilisés par les services.
pub async fn create_schema(db: &DatabaseConnection) -> Result<(), DbErr> {
    let backend = db.get_database_backend();
    let schema = Schema::new(backend);

    let mut tables = vec![
        schema.create_table_from_entity(users::Entity),
        schema.create_table_from_entity(market::Entity),
        schema.create_table_from_entity(holding::Entity),
        schema.create_table_from_entity(alert::Entity),
        schema.create_table_from_entity(transaction_log::Entity),
    ];

    for table in tables.iter_mut() {
        table.if_not_exists();
        db.execute(backend.build(&*table)).await?;
    }

    // Au plus une position par (user, market)
    let holding_pair = Index::create()
        .name("idx_holdings_user_market")
        .table(holding::Entity)
        .col(holding::Column::UserId)
        .col(holding::Column::MarketId)
        .unique()
        .if_not_exists()
        .to_owned();

    let pending_alerts = Index::create()
        .name("idx_alerts_triggered")
        .table(alert::Entity)
        .col(alert::Column::Triggered)
        .if_not_exists()
        .to_owned();

    let user_transactions = Index::create()
        .name("idx_transactions_user_timestamp")
        .table(transaction_log::Entity)
        .col(transaction_log::Column::UserId)
        .col(transaction_log::Column::Timestamp)
        .if_not_exists()
        .to_owned();

    for index in [holding_pair, pending_alerts, user_transactions] {
        db.execute(backend.build(&index)).await?;
    }

    Ok(())
}

fn seed_markets() -> Vec<(&'static str, Decimal)> {
    vec![
        ("BTC/USDT", Decimal::new(62000, 0)),
        ("ETH/USDT", Decimal::new(3200, 0)),
        ("SOL/USDT", Decimal::new(1455, 1)),
        ("BNB/USDT", Decimal::new(42075, 2)),
        ("XRP/USDT", Decimal::new(55, 2)),
        ("ADA/USDT", Decimal::new(48, 2)),
        ("DOGE/USDT", Decimal::new(12, 2)),
        ("MATIC/USDT", Decimal::new(85, 2)),
    ]
}

fn seed_users() -> Vec<(&'static str, &'static str, Decimal)> {
    vec![
        ("Alice Johnson", "alice@example.com", Decimal::new(10000, 0)),
        ("Bob Smith", "bob@example.com", Decimal::new(15000, 0)),
        ("Charlie Brown", "charlie@example.com", Decimal::new(20000, 0)),
    ]
}

/// Insère les marchés et utilisateurs de démo si la base est vide.
/// Retourne le nombre de lignes créées (0 si déjà peuplée).
pub async fn seed(db: &DatabaseConnection) -> Result<usize, AppError> {
    let existing_users = users::Entity::find().count(db).await?;
    let existing_markets = market::Entity::find().count(db).await?;
    if existing_users > 0 || existing_markets > 0 {
        tracing::info!("⚠️  Database already contains data. Skipping seed.");
        return Ok(0);
    }

    tracing::info!("🌱 Seeding database...");
    let txn = db.begin().await?;
    let now = chrono::Utc::now();
    let mut created = 0;

    for (symbol, price) in seed_markets() {
        market::ActiveModel {
            symbol: Set(symbol.to_string()),
            current_price: Set(price.into()),
            created_at: Set(now),
            updated_at: Set(None),
            ..Default::default()
        }
        .insert(&txn)
        .await?;
        created += 1;
    }

    let mut seeded_users = Vec::new();
    for (name, email, balance) in seed_users() {
        let user = users::ActiveModel {
            name: Set(name.to_string()),
            email: Set(email.to_string()),
            balance: Set(balance.into()),
            ..Default::default()
        }
        .insert(&txn)
        .await?;
        seeded_users.push(user);
        created += 1;
    }

    txn.commit().await?;

    for user in seeded_users {
        match jwt::issue_token(user.id, &user.email) {
            Ok(token) => tracing::info!("  ✓ {} ({}) token: {}", user.name, user.email, token),
            Err(e) => tracing::warn!("  ✗ {} ({}): {}", user.name, user.email, e),
        }
    }

    tracing::info!("✅ Database seeding completed ({} rows)", created);
    Ok(created)
}
