use actix_web::{get, post, delete, web, HttpResponse};
use sea_orm::DatabaseConnection;
use validator::Validate;

use crate::config::Settings;
use crate::error::AppError;
use crate::middleware::{AuthUser, ensure_owner};
use crate::models::dto::CreateUserRequest;
use crate::services::portfolio_service::PortfolioService;
use crate::services::user_service::UserService;

/// POST /api/users - Créer un utilisateur (PUBLIC), retourne son token
#[post("")]
pub async fn create_user(
    db: web::Data<DatabaseConnection>,
    settings: web::Data<Settings>,
    request: web::Json<CreateUserRequest>,
) -> Result<HttpResponse, AppError> {
    if let Err(errors) = request.validate() {
        return Ok(HttpResponse::BadRequest().json(errors));
    }

    let created = UserService::create_user(&db, request.into_inner(), settings.default_balance).await?;
    Ok(HttpResponse::Created().json(created))
}

#[get("/{id}")]
pub async fn get_user(
    db: web::Data<DatabaseConnection>,
    auth_user: AuthUser,
    path: web::Path<i32>,
) -> Result<HttpResponse, AppError> {
    let user_id = path.into_inner();
    ensure_owner(&auth_user, user_id)?;

    let user = UserService::get_user(&db, user_id).await?;
    Ok(HttpResponse::Ok().json(user))
}

#[delete("/{id}")]
pub async fn delete_user(
    db: web::Data<DatabaseConnection>,
    auth_user: AuthUser,
    path: web::Path<i32>,
) -> Result<HttpResponse, AppError> {
    let user_id = path.into_inner();
    ensure_owner(&auth_user, user_id)?;

    UserService::delete_user(&db, user_id).await?;
    Ok(HttpResponse::NoContent().finish())
}

/// GET /api/users/{id}/portfolio - Solde, positions et P&L latent
#[get("/{id}/portfolio")]
pub async fn get_portfolio(
    db: web::Data<DatabaseConnection>,
    auth_user: AuthUser,
    path: web::Path<i32>,
) -> Result<HttpResponse, AppError> {
    let user_id = path.into_inner();
    ensure_owner(&auth_user, user_id)?;

    let portfolio = PortfolioService::get_portfolio(&db, user_id).await?;
    Ok(HttpResponse::Ok().json(portfolio))
}

pub fn users_routes(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/users")
            .service(create_user)
            .service(get_portfolio)
            .service(get_user)
            .service(delete_user)
    );
}
