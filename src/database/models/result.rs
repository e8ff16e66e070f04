use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// After-the-fact reporting of collected signatures, independent of the
/// live signup flow. Any subset of the references may be set.
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct CollectionResult {
    pub id: i64,
    pub amount: i64,
    pub start: Option<DateTime<Utc>>,
    pub end: Option<DateTime<Utc>>,
    pub comment: String,
    pub user_id: Option<i64>,
    pub team_id: Option<i64>,
    pub location_id: Option<i64>,
    pub event_id: Option<i64>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CollectionResultInput {
    pub amount: i64,
    pub start: Option<DateTime<Utc>>,
    pub end: Option<DateTime<Utc>>,
    #[serde(default)]
    pub comment: String,
    pub team_id: Option<i64>,
    pub location_id: Option<i64>,
    pub event_id: Option<i64>,
}
