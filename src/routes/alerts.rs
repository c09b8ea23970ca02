use actix_web::{get, post, delete, web, HttpResponse};
use sea_orm::DatabaseConnection;
use validator::Validate;

use crate::error::AppError;
use crate::middleware::{AuthUser, ensure_owner};
use crate::models::dto::AlertCreate;
use crate::services::alert_service::AlertService;

#[post("")]
pub async fn create_alert(
    db: web::Data<DatabaseConnection>,
    auth_user: AuthUser,
    request: web::Json<AlertCreate>,
) -> Result<HttpResponse, AppError> {
    if let Err(errors) = request.validate() {
        return Ok(HttpResponse::BadRequest().json(errors));
    }

    let created = AlertService::create_alert(&db, auth_user.user_id, request.into_inner()).await?;
    Ok(HttpResponse::Created().json(created))
}

#[get("/user/{id}")]
pub async fn get_user_alerts(
    db: web::Data<DatabaseConnection>,
    auth_user: AuthUser,
    path: web::Path<i32>,
) -> Result<HttpResponse, AppError> {
    let user_id = path.into_inner();
    ensure_owner(&auth_user, user_id)?;

    let alerts = AlertService::list_alerts(&db, user_id, false).await?;
    Ok(HttpResponse::Ok().json(alerts))
}

/// Alertes pas encore déclenchées
#[get("/user/{id}/active")]
pub async fn get_active_alerts(
    db: web::Data<DatabaseConnection>,
    auth_user: AuthUser,
    path: web::Path<i32>,
) -> Result<HttpResponse, AppError> {
    let user_id = path.into_inner();
    ensure_owner(&auth_user, user_id)?;

    let alerts = AlertService::list_alerts(&db, user_id, true).await?;
    Ok(HttpResponse::Ok().json(alerts))
}

#[delete("/{id}")]
pub async fn delete_alert(
    db: web::Data<DatabaseConnection>,
    auth_user: AuthUser,
    path: web::Path<i32>,
) -> Result<HttpResponse, AppError> {
    AlertService::delete_alert(&db, auth_user.user_id, path.into_inner()).await?;
    Ok(HttpResponse::NoContent().finish())
}

pub fn alerts_routes(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/alerts")
            .service(create_alert)
            .service(get_active_alerts)
            .service(get_user_alerts)
            .service(delete_alert)
    );
}
