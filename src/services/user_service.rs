use sea_orm::*;
use rust_decimal::Decimal;
use crate::error::AppError;
use crate::models::{users, holding, alert, transaction_log};
use crate::models::dto::{CreateUserRequest, CreateUserResponse};
use crate::utils::jwt;
use crate::utils::money::MONEY_SCALE;

pub struct UserService;

impl UserService {
    /// Crée un utilisateur et lui délivre son bearer token
    pub async fn create_user(
        db: &DatabaseConnection,
        request: CreateUserRequest,
        default_balance: Decimal,
    ) -> Result<CreateUserResponse, AppError> {
        let balance = request.balance.unwrap_or(default_balance).normalize();
        if balance < Decimal::ZERO {
            return Err(AppError::Validation("balance cannot be negative".to_string()));
        }
        if balance.scale() > MONEY_SCALE {
            return Err(AppError::Validation(format!(
                "balance supports at most {} decimal places",
                MONEY_SCALE
            )));
        }

        let email = request.email.trim().to_lowercase();

        let inserted = users::ActiveModel {
            name: Set(request.name.trim().to_string()),
            email: Set(email.clone()),
            balance: Set(balance.into()),
            ..Default::default()
        }
        .insert(db)
        .await;

        let user = match inserted {
            Ok(user) => user,
            Err(e) if matches!(e.sql_err(), Some(SqlErr::UniqueConstraintViolation(_))) => {
                return Err(AppError::Validation(format!("Email {} is already registered", email)));
            }
            Err(e) => return Err(e.into()),
        };

        let access_token = jwt::issue_token(user.id, &user.email)?;
        tracing::info!(user_id = user.id, "User {} created", user.email);

        Ok(CreateUserResponse {
            user,
            access_token,
            token_type: "bearer".to_string(),
        })
    }

    pub async fn get_user(db: &DatabaseConnection, user_id: i32) -> Result<users::Model, AppError> {
        users::Entity::find_by_id(user_id)
            .one(db)
            .await?
            .ok_or(AppError::UserNotFound(user_id))
    }

    /// Supprime l'utilisateur avec ses transactions, alertes et positions
    pub async fn delete_user(db: &DatabaseConnection, user_id: i32) -> Result<(), AppError> {
        let txn = db.begin().await?;

        let user = users::Entity::find_by_id(user_id)
            .one(&txn)
            .await?
            .ok_or(AppError::UserNotFound(user_id))?;

        transaction_log::Entity::delete_many()
            .filter(transaction_log::Column::UserId.eq(user_id))
            .exec(&txn)
            .await?;
        alert::Entity::delete_many()
            .filter(alert::Column::UserId.eq(user_id))
            .exec(&txn)
            .await?;
        holding::Entity::delete_many()
            .filter(holding::Column::UserId.eq(user_id))
            .exec(&txn)
            .await?;

        user.delete(&txn).await?;
        txn.commit().await?;

        tracing::info!(user_id, "User deleted");
        Ok(())
    }
}
