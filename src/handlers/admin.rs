use actix_web::{HttpResponse, web};
use serde::Deserialize;

use crate::AppState;
use crate::auth::Claims;
use crate::database::repositories::UserRepository;
use crate::error::AppError;
use crate::handlers::shared::ApiResponse;
use crate::services::mailer;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BulkMailRequest {
    pub user_ids: Vec<i64>,
    pub subject: String,
    pub body: String,
}

/// Staff bulk mail to an explicit recipient list, delivered on the bulk
/// lane so it never starves transactional mail.
pub async fn send_bulk_mail(
    input: web::Json<BulkMailRequest>,
    claims: Claims,
    users: web::Data<UserRepository>,
    state: web::Data<AppState>,
) -> Result<HttpResponse, AppError> {
    claims.requires_staff()?;

    let input = input.into_inner();
    if input.subject.trim().is_empty() {
        return Err(AppError::BadRequest("Subject must not be empty".to_string()));
    }

    let sent = mailer::send_bulk_mail(
        &users,
        state.mail.as_ref(),
        &input.user_ids,
        &input.subject,
        &input.body,
        &state.mail_from,
        &state.mail_bulk_queue,
    )
    .await?;

    Ok(ApiResponse::message(&format!("{} mails queued", sent)))
}
