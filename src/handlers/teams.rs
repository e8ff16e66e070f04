use actix_web::{HttpResponse, web};
use serde::{Deserialize, Serialize};
use sqlx::SqlitePool;

use crate::AppState;
use crate::auth::{Claims, OptionalClaims};
use crate::database::models::{EventWithWindow, Team, TeamMember, UserInput};
use crate::database::repositories::{EventRepository, TeamRepository, UserRepository};
use crate::error::AppError;
use crate::handlers::shared::ApiResponse;
use crate::services::mailer::{DeliveryLane, build_email};
use crate::services::{DomainEvent, Outbox};

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TeamDetail {
    pub team: Team,
    pub events: Vec<EventWithWindow>,
    pub is_member: Option<bool>,
}

pub async fn get_teams(teams: web::Data<TeamRepository>) -> Result<HttpResponse, AppError> {
    let teams = teams.all().await?;
    Ok(ApiResponse::success(teams))
}

pub async fn get_team(
    path: web::Path<i64>,
    teams: web::Data<TeamRepository>,
    events: web::Data<EventRepository>,
    claims: OptionalClaims,
) -> Result<HttpResponse, AppError> {
    let team_id = path.into_inner();
    let team = teams
        .find_by_id(team_id)
        .await?
        .ok_or_else(|| AppError::NotFound("Team not found".to_string()))?;

    let events = events.by_team(team_id).await?;
    let is_member = match claims.0 {
        Some(claims) => Some(teams.is_member(team_id, claims.user_id()).await?),
        None => None,
    };

    Ok(ApiResponse::success(TeamDetail {
        team,
        events,
        is_member,
    }))
}

/// Idempotent join for an authenticated user; a repeated join returns the
/// existing membership without firing another notification.
pub async fn join_team(
    path: web::Path<i64>,
    claims: Claims,
    pool: web::Data<SqlitePool>,
    teams: web::Data<TeamRepository>,
    state: web::Data<AppState>,
) -> Result<HttpResponse, AppError> {
    let team_id = path.into_inner();
    teams
        .find_by_id(team_id)
        .await?
        .ok_or_else(|| AppError::NotFound("Team not found".to_string()))?;

    let mut outbox = Outbox::new();
    let mut tx = pool.begin().await?;

    let (member, created) = teams.add_member(&mut tx, team_id, claims.user_id()).await?;
    if created {
        outbox.push(DomainEvent::TeamJoined {
            team_id,
            user_id: claims.user_id(),
        });
    }

    tx.commit().await?;
    state.dispatcher.dispatch(outbox);

    Ok(ApiResponse::success(member))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TeamSignupRequest {
    pub name: String,
    pub email: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TeamSignupResponse {
    pub user_id: i64,
    pub member: TeamMember,
}

/// Signup flow for unauthenticated visitors: account and membership are
/// created as one transaction, then an autologin link is mailed so the new
/// member can reach their team page without a password.
pub async fn signup_and_join(
    path: web::Path<i64>,
    input: web::Json<TeamSignupRequest>,
    pool: web::Data<SqlitePool>,
    teams: web::Data<TeamRepository>,
    users: web::Data<UserRepository>,
    state: web::Data<AppState>,
) -> Result<HttpResponse, AppError> {
    let team_id = path.into_inner();
    let input = input.into_inner();

    let team = teams
        .find_by_id(team_id)
        .await?
        .ok_or_else(|| AppError::NotFound("Team not found".to_string()))?;

    if input.email.trim().is_empty() || !input.email.contains('@') {
        return Err(AppError::BadRequest("A valid email is required".to_string()));
    }
    if users.find_by_email(&input.email).await?.is_some() {
        return Err(AppError::BadRequest(
            "An account with this email already exists".to_string(),
        ));
    }

    let mut outbox = Outbox::new();
    let mut tx = pool.begin().await?;

    let user = users
        .create(
            &mut tx,
            UserInput {
                name: input.name,
                email: input.email,
            },
        )
        .await?;
    let (member, _) = teams.add_member(&mut tx, team_id, user.id).await?;
    outbox.push(DomainEvent::TeamJoined {
        team_id,
        user_id: user.id,
    });

    tx.commit().await?;
    state.dispatcher.dispatch(outbox);

    // Welcome mail with the autologin link; delivery failure must not fail
    // the signup that already committed.
    let link = state
        .auth_service
        .autologin_url(&user, &format!("teams/{}", team.id));
    let body = format!(
        "Hi {name},\n\nwelcome to team {team}! Use this link to get to your \
         team page:\n\n{link}\n",
        name = user.name,
        team = team.name,
        link = link,
    );
    if let Err(err) = state
        .mail
        .send(build_email(
            &user.email,
            &state.mail_from,
            &format!("Welcome to team {}", team.name),
            &body,
            DeliveryLane::Priority,
            &state.mail_bulk_queue,
        ))
        .await
    {
        log::warn!("Failed to send signup mail to user {}: {}", user.id, err);
    }

    Ok(ApiResponse::created(TeamSignupResponse {
        user_id: user.id,
        member,
    }))
}
