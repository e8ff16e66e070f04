use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Event {
    pub id: i64,
    pub name: String,
    pub description: String,
    pub lat: Option<f64>,
    pub lng: Option<f64>,
    pub team_id: Option<i64>,
    pub occurrence_id: i64,
}

/// An event joined with its occurrence window; this is the shape most
/// callers want since the outer time bounds live on the occurrence.
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct EventWithWindow {
    pub id: i64,
    pub name: String,
    pub description: String,
    pub lat: Option<f64>,
    pub lng: Option<f64>,
    pub team_id: Option<i64>,
    pub occurrence_id: i64,
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct EventMember {
    pub id: i64,
    pub event_id: i64,
    pub user_id: i64,
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
    pub note: String,
}
