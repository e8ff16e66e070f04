use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Location {
    pub id: i64,
    pub name: String,
    pub description: String,
    pub address: String,
    pub lat: Option<f64>,
    pub lng: Option<f64>,
    /// Validity window; a null end means open-ended.
    pub start: Option<NaiveDate>,
    pub end: Option<NaiveDate>,
    /// Recurring drop point rather than a one-off table.
    pub accumulation: bool,
    pub email: String,
    pub user_id: Option<i64>,
    pub needs_check: bool,
    /// Append-only report log, newest entry first.
    pub report: String,
    pub send_material: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LocationInput {
    pub name: String,
    pub address: String,
    #[serde(default)]
    pub description: String,
    pub lat: Option<f64>,
    pub lng: Option<f64>,
    #[serde(default)]
    pub email: String,
}
