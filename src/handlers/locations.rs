use actix_web::{HttpResponse, web};
use chrono::Utc;
use serde::Deserialize;
use sqlx::SqlitePool;

use crate::AppState;
use crate::auth::{Claims, OptionalClaims};
use crate::config::Config;
use crate::database::models::LocationInput;
use crate::database::repositories::LocationRepository;
use crate::error::AppError;
use crate::handlers::shared::ApiResponse;
use crate::services::{DomainEvent, Outbox};

/// Anyone may register a collection location; submissions from
/// unauthenticated visitors are flagged for review.
pub async fn create_location(
    input: web::Json<LocationInput>,
    claims: OptionalClaims,
    pool: web::Data<SqlitePool>,
    locations: web::Data<LocationRepository>,
    config: web::Data<Config>,
    state: web::Data<AppState>,
) -> Result<HttpResponse, AppError> {
    let input = input.into_inner();
    if input.name.trim().is_empty() {
        return Err(AppError::BadRequest("Name must not be empty".to_string()));
    }
    if input.address.trim().is_empty() {
        return Err(AppError::BadRequest("Address must not be empty".to_string()));
    }

    let user_id = claims.0.as_ref().map(|c| c.user_id());
    let needs_check = user_id.is_none();
    let today = Utc::now().with_timezone(&config.local_offset()).date_naive();

    let mut outbox = Outbox::new();
    let mut tx = pool.begin().await?;

    let location = locations
        .create(&mut tx, input, user_id, needs_check, today)
        .await?;
    outbox.push(DomainEvent::LocationCreated {
        location_id: location.id,
    });

    tx.commit().await?;
    state.dispatcher.dispatch(outbox);

    Ok(ApiResponse::created(location))
}

pub async fn get_location(
    path: web::Path<i64>,
    locations: web::Data<LocationRepository>,
) -> Result<HttpResponse, AppError> {
    let location = locations
        .find_by_id(path.into_inner())
        .await?
        .ok_or_else(|| AppError::NotFound("Location not found".to_string()))?;
    Ok(ApiResponse::success(location))
}

#[derive(Debug, Deserialize)]
pub struct ReportRequest {
    pub report: String,
}

/// Prepends a timestamped entry to the report log and flags the location.
pub async fn report_location(
    path: web::Path<i64>,
    input: web::Json<ReportRequest>,
    pool: web::Data<SqlitePool>,
    locations: web::Data<LocationRepository>,
    state: web::Data<AppState>,
) -> Result<HttpResponse, AppError> {
    let location_id = path.into_inner();
    let report = input.into_inner().report;
    if report.trim().is_empty() {
        return Err(AppError::BadRequest("Report must not be empty".to_string()));
    }

    let mut outbox = Outbox::new();
    let mut tx = pool.begin().await?;

    let location = locations
        .append_report(&mut tx, location_id, &report, Utc::now())
        .await?
        .ok_or_else(|| AppError::NotFound("Location not found".to_string()))?;
    outbox.push(DomainEvent::LocationReported {
        location_id: location.id,
    });

    tx.commit().await?;
    state.dispatcher.dispatch(outbox);

    Ok(ApiResponse::success_with_message(
        location,
        "Thanks! Someone will look into it.",
    ))
}

/// One-time material shipment request; repeating it is a no-op.
pub async fn request_material(
    path: web::Path<i64>,
    claims: Claims,
    pool: web::Data<SqlitePool>,
    locations: web::Data<LocationRepository>,
    state: web::Data<AppState>,
) -> Result<HttpResponse, AppError> {
    claims.requires_staff()?;

    let location_id = path.into_inner();
    locations
        .find_by_id(location_id)
        .await?
        .ok_or_else(|| AppError::NotFound("Location not found".to_string()))?;

    let mut outbox = Outbox::new();
    let mut tx = pool.begin().await?;

    let requested = locations.mark_material_requested(&mut tx, location_id).await?;
    if requested {
        outbox.push(DomainEvent::MaterialRequested { location_id });
    }

    tx.commit().await?;
    state.dispatcher.dispatch(outbox);

    if requested {
        Ok(ApiResponse::message("Material requested"))
    } else {
        Ok(ApiResponse::message("Material was already requested"))
    }
}

/// Confirms the shipment went out; notifies the location contact.
pub async fn confirm_material_sent(
    path: web::Path<i64>,
    claims: Claims,
    locations: web::Data<LocationRepository>,
    state: web::Data<AppState>,
) -> Result<HttpResponse, AppError> {
    claims.requires_staff()?;

    let location_id = path.into_inner();
    locations
        .find_by_id(location_id)
        .await?
        .ok_or_else(|| AppError::NotFound("Location not found".to_string()))?;

    let mut outbox = Outbox::new();
    outbox.push(DomainEvent::MaterialSent { location_id });
    state.dispatcher.dispatch(outbox);

    Ok(ApiResponse::message("Shipment confirmation queued"))
}
