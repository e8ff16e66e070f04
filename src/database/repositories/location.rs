use chrono::{DateTime, NaiveDate, Utc};
use sqlx::{Sqlite, SqlitePool, Transaction};

use crate::database::models::{Location, LocationInput};

#[derive(Clone)]
pub struct LocationRepository {
    pool: SqlitePool,
}

const LOCATION_COLUMNS: &str = r#"id, name, description, address, lat, lng, start, "end",
    accumulation, email, user_id, needs_check, report, send_material"#;

impl LocationRepository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    pub async fn create(
        &self,
        tx: &mut Transaction<'_, Sqlite>,
        input: LocationInput,
        user_id: Option<i64>,
        needs_check: bool,
        start: NaiveDate,
    ) -> Result<Location, sqlx::Error> {
        let location = sqlx::query_as::<_, Location>(&format!(
            r#"
            INSERT INTO locations (name, description, address, lat, lng, start, email,
                                   user_id, needs_check)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)
            RETURNING {LOCATION_COLUMNS}
            "#
        ))
        .bind(input.name)
        .bind(input.description)
        .bind(input.address)
        .bind(input.lat)
        .bind(input.lng)
        .bind(start)
        .bind(input.email)
        .bind(user_id)
        .bind(needs_check)
        .fetch_one(&mut **tx)
        .await?;

        Ok(location)
    }

    pub async fn find_by_id(&self, id: i64) -> Result<Option<Location>, sqlx::Error> {
        sqlx::query_as::<_, Location>(&format!(
            "SELECT {LOCATION_COLUMNS} FROM locations WHERE id = ?"
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await
    }

    /// Locations whose validity window covers `today`.
    pub async fn currently_valid(&self, today: NaiveDate) -> Result<Vec<Location>, sqlx::Error> {
        sqlx::query_as::<_, Location>(&format!(
            r#"
            SELECT {LOCATION_COLUMNS}
            FROM locations
            WHERE start <= ? AND ("end" IS NULL OR "end" >= ?)
            "#
        ))
        .bind(today)
        .bind(today)
        .fetch_all(&self.pool)
        .await
    }

    /// Prepend a timestamped report entry and flag the location for review.
    pub async fn append_report(
        &self,
        tx: &mut Transaction<'_, Sqlite>,
        id: i64,
        text: &str,
        at: DateTime<Utc>,
    ) -> Result<Option<Location>, sqlx::Error> {
        let Some(location) = sqlx::query_as::<_, Location>(&format!(
            "SELECT {LOCATION_COLUMNS} FROM locations WHERE id = ?"
        ))
        .bind(id)
        .fetch_optional(&mut **tx)
        .await?
        else {
            return Ok(None);
        };

        let report = format!(
            "{date}\n{text}\n\n---\n\n{rest}",
            date = at.to_rfc3339(),
            text = text,
            rest = location.report
        );

        let updated = sqlx::query_as::<_, Location>(&format!(
            r#"
            UPDATE locations SET report = ?, needs_check = 1 WHERE id = ?
            RETURNING {LOCATION_COLUMNS}
            "#
        ))
        .bind(report)
        .bind(id)
        .fetch_one(&mut **tx)
        .await?;

        Ok(Some(updated))
    }

    /// One-time gate: returns false when a shipment was already requested.
    pub async fn mark_material_requested(
        &self,
        tx: &mut Transaction<'_, Sqlite>,
        id: i64,
    ) -> Result<bool, sqlx::Error> {
        let result =
            sqlx::query("UPDATE locations SET send_material = 1 WHERE id = ? AND send_material = 0")
                .bind(id)
                .execute(&mut **tx)
                .await?;
        Ok(result.rows_affected() > 0)
    }

    pub async fn delete(&self, id: i64) -> Result<Option<()>, sqlx::Error> {
        let result = sqlx::query("DELETE FROM locations WHERE id = ?")
            .bind(id)
            .execute(&self.pool)
            .await?;

        Ok(if result.rows_affected() > 0 {
            Some(())
        } else {
            None
        })
    }
}
