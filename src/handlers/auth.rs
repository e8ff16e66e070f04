use actix_web::{
    HttpResponse,
    cookie::{Cookie, SameSite},
    web,
};
use chrono::Utc;
use serde::{Deserialize, Serialize};

use crate::AppState;
use crate::auth::{AUTH_COOKIE, Claims, OptionalClaims};
use crate::database::models::User;
use crate::database::repositories::UserRepository;
use crate::error::AppError;
use crate::handlers::shared::ApiResponse;

#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AuthResponse {
    pub token: String,
    pub user: User,
}

pub async fn login(
    input: web::Json<LoginRequest>,
    state: web::Data<AppState>,
) -> Result<HttpResponse, AppError> {
    let input = input.into_inner();
    let (user, token) = state
        .auth_service
        .login(&input.email, &input.password)
        .await
        .map_err(|_| AppError::Unauthorized)?;

    Ok(ApiResponse::success(AuthResponse { token, user }))
}

pub async fn me(
    claims: Claims,
    users: web::Data<UserRepository>,
) -> Result<HttpResponse, AppError> {
    let user = users
        .find_by_id(claims.user_id())
        .await?
        .ok_or_else(|| AppError::NotFound("User not found".to_string()))?;
    Ok(ApiResponse::success(user))
}

/// Autologin deep link: `/go/{user_id}/{secret}/{path}`. The secret is an
/// HMAC over the user id and their last login, so it expires on the next
/// login without any server-side state. Invalid links still redirect to
/// the target, just without logging anyone in.
pub async fn link_login(
    path: web::Path<(i64, String, String)>,
    claims: OptionalClaims,
    users: web::Data<UserRepository>,
    state: web::Data<AppState>,
) -> Result<HttpResponse, AppError> {
    let (user_id, secret, target) = path.into_inner();
    let target = format!("/{}", target);

    // Already logged in: never switch accounts via a link.
    if claims.0.is_some() {
        return Ok(HttpResponse::Found()
            .insert_header(("Location", target))
            .finish());
    }

    let Some(user) = users.find_by_id(user_id).await? else {
        return Err(AppError::NotFound("User not found".to_string()));
    };

    if !state.auth_service.check_autologin_secret(&user, &secret) {
        return Ok(HttpResponse::Found()
            .insert_header(("Location", target))
            .finish());
    }

    // The link came from a mail we sent, so it also confirms the account.
    if !user.is_active {
        users.activate(user.id).await?;
    }
    users.update_last_login(user.id, Utc::now()).await?;

    let token = state.auth_service.generate_token(&user)?;
    let cookie = Cookie::build(AUTH_COOKIE, token)
        .path("/")
        .http_only(true)
        .same_site(SameSite::Lax)
        .finish();

    Ok(HttpResponse::Found()
        .insert_header(("Location", target))
        .cookie(cookie)
        .finish())
}
