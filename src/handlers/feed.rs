use actix_web::{HttpResponse, web};
use chrono::Utc;

use crate::error::AppError;
use crate::services::FeedService;

/// The map feed: one GeoJSON FeatureCollection over teams, upcoming
/// events, and currently valid locations. Read-only; "now" is implicit.
pub async fn map_feed(feed: web::Data<FeedService>) -> Result<HttpResponse, AppError> {
    let collection = feed.build_feed(Utc::now()).await?;
    Ok(HttpResponse::Ok().json(collection))
}
