use actix_web::{HttpResponse, web};

use crate::auth::{Claims, OptionalClaims};
use crate::database::models::CollectionResultInput;
use crate::database::repositories::ResultRepository;
use crate::error::AppError;
use crate::handlers::shared::ApiResponse;

/// After-the-fact reporting of a collection run. Open to anonymous
/// submissions; an authenticated caller is recorded as the reporter.
pub async fn create_result(
    input: web::Json<CollectionResultInput>,
    claims: OptionalClaims,
    results: web::Data<ResultRepository>,
) -> Result<HttpResponse, AppError> {
    let input = input.into_inner();
    if input.amount < 0 {
        return Err(AppError::BadRequest(
            "Amount must not be negative".to_string(),
        ));
    }

    let user_id = claims.0.as_ref().map(|c| c.user_id());
    let result = results.create(input, user_id).await?;

    Ok(ApiResponse::created(result))
}

pub async fn get_results(
    claims: Claims,
    results: web::Data<ResultRepository>,
) -> Result<HttpResponse, AppError> {
    claims.requires_staff()?;
    let results = results.all().await?;
    Ok(ApiResponse::success(results))
}
