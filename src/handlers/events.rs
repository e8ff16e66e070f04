use actix_web::{HttpResponse, web};
use chrono::{NaiveDate, NaiveTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::SqlitePool;

use crate::AppState;
use crate::auth::Claims;
use crate::config::Config;
use crate::database::models::{EventMember, EventWithWindow};
use crate::database::repositories::EventRepository;
use crate::error::AppError;
use crate::handlers::shared::ApiResponse;
use crate::services::{DomainEvent, Outbox, Scheduler};

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EventDetail {
    pub event: EventWithWindow,
    pub members: Vec<EventMember>,
}

pub async fn get_event(
    path: web::Path<i64>,
    events: web::Data<EventRepository>,
) -> Result<HttpResponse, AppError> {
    let event_id = path.into_inner();
    let event = events
        .find_by_id(event_id)
        .await?
        .ok_or_else(|| AppError::NotFound("Event not found".to_string()))?;
    let members = events.members(event_id).await?;

    Ok(ApiResponse::success(EventDetail { event, members }))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct JoinEventRequest {
    /// Local wall-clock times on the event's date.
    pub start: NaiveTime,
    pub end: NaiveTime,
    #[serde(default)]
    pub note: String,
}

/// Sign up for a sub-window of the event. Existing sign-ups by the same
/// user that cover the new end are merged into one record spanning the
/// combined range; see [`EventRepository::overlapping_members`] for the
/// exact (asymmetric) overlap test.
pub async fn join_event(
    path: web::Path<i64>,
    input: web::Json<JoinEventRequest>,
    claims: Claims,
    pool: web::Data<SqlitePool>,
    events: web::Data<EventRepository>,
    config: web::Data<Config>,
    state: web::Data<AppState>,
) -> Result<HttpResponse, AppError> {
    let event_id = path.into_inner();
    let input = input.into_inner();

    let event = events
        .find_by_id(event_id)
        .await?
        .ok_or_else(|| AppError::NotFound("Event not found".to_string()))?;

    let offset = config.local_offset();
    let local_start = event.start.with_timezone(&offset);
    let local_end = event.end.with_timezone(&offset);

    // The sign-up window must lie within the occurrence's bounds.
    if input.start < local_start.time() {
        return Err(AppError::BadRequest(format!(
            "Participation cannot start before {}",
            local_start.format("%H:%M")
        )));
    }
    if input.end > local_end.time() {
        return Err(AppError::BadRequest(format!(
            "Participation cannot end after {}",
            local_end.format("%H:%M")
        )));
    }
    if input.start >= input.end {
        return Err(AppError::BadRequest(
            "Participation must end after it starts".to_string(),
        ));
    }

    let date = local_start.date_naive();
    let to_utc = |time: NaiveTime| {
        date.and_time(time)
            .and_local_timezone(offset)
            .single()
            .map(|t| t.with_timezone(&Utc))
            .ok_or_else(|| AppError::BadRequest("Invalid local time".to_string()))
    };
    let mut start = to_utc(input.start)?;
    let mut end = to_utc(input.end)?;

    let mut outbox = Outbox::new();
    let mut tx = pool.begin().await?;

    let overlapping = events
        .overlapping_members(&mut tx, event_id, claims.user_id(), start, end)
        .await?;
    for member in &overlapping {
        start = start.min(member.start);
        end = end.max(member.end);
        events.delete_member_tx(&mut tx, member.id).await?;
    }

    let member = events
        .add_member(&mut tx, event_id, claims.user_id(), start, end, &input.note)
        .await?;
    outbox.push(DomainEvent::EventMemberJoined {
        event_id,
        user_id: claims.user_id(),
    });

    tx.commit().await?;
    state.dispatcher.dispatch(outbox);

    Ok(ApiResponse::created(member))
}

/// Cancel a sign-up. Only the member who owns the record may delete it.
pub async fn leave_event(
    path: web::Path<(i64, i64)>,
    claims: Claims,
    pool: web::Data<SqlitePool>,
    events: web::Data<EventRepository>,
    state: web::Data<AppState>,
) -> Result<HttpResponse, AppError> {
    let (event_id, member_id) = path.into_inner();

    let member = events
        .find_member(member_id)
        .await?
        .filter(|m| m.event_id == event_id)
        .ok_or_else(|| AppError::NotFound("Sign-up not found".to_string()))?;

    if member.user_id != claims.user_id() {
        return Err(AppError::PermissionDenied(
            "You can only cancel your own sign-up".to_string(),
        ));
    }

    let mut outbox = Outbox::new();
    let mut tx = pool.begin().await?;

    events.delete_member_tx(&mut tx, member.id).await?;
    outbox.push(DomainEvent::EventMemberLeft {
        event_id,
        user_id: claims.user_id(),
    });

    tx.commit().await?;
    state.dispatcher.dispatch(outbox);

    Ok(ApiResponse::message("Sign-up cancelled"))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MaterializeRequest {
    pub definition_id: i64,
    /// Required for recurring definitions; ignored meaningfully only there.
    pub date: Option<NaiveDate>,
}

/// Turn a calendar occurrence into a joinable event. Idempotent per
/// occurrence: repeating the call returns the existing event.
pub async fn materialize_event(
    input: web::Json<MaterializeRequest>,
    claims: Claims,
    scheduler: web::Data<Scheduler>,
    state: web::Data<AppState>,
) -> Result<HttpResponse, AppError> {
    claims.requires_staff()?;

    let input = input.into_inner();
    let (event, created) = scheduler.materialize(input.definition_id, input.date).await?;

    if created {
        let mut outbox = Outbox::new();
        outbox.push(DomainEvent::EventCreated { event_id: event.id });
        state.dispatcher.dispatch(outbox);
        Ok(ApiResponse::created(event))
    } else {
        Ok(ApiResponse::success(event))
    }
}
