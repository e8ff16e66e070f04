use chrono::{DateTime, NaiveDate, Utc};
use sqlx::{Sqlite, SqlitePool, Transaction};

use crate::database::models::{Calendar, EventDefinition, Occurrence, RepeatRule};

#[derive(Clone)]
pub struct ScheduleRepository {
    pool: SqlitePool,
}

const DEFINITION_COLUMNS: &str =
    r#"id, calendar_id, title, description, start, "end", repeat_rule, repeat_until"#;

impl ScheduleRepository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    pub async fn create_calendar(&self, name: &str) -> Result<Calendar, sqlx::Error> {
        sqlx::query_as::<_, Calendar>("INSERT INTO calendars (name) VALUES (?) RETURNING id, name")
            .bind(name)
            .fetch_one(&self.pool)
            .await
    }

    #[allow(clippy::too_many_arguments)]
    pub async fn create_definition(
        &self,
        calendar_id: Option<i64>,
        title: &str,
        description: &str,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
        repeat_rule: Option<RepeatRule>,
        repeat_until: Option<NaiveDate>,
    ) -> Result<EventDefinition, sqlx::Error> {
        sqlx::query_as::<_, EventDefinition>(&format!(
            r#"
            INSERT INTO event_definitions
                (calendar_id, title, description, start, "end", repeat_rule, repeat_until)
            VALUES (?, ?, ?, ?, ?, ?, ?)
            RETURNING {DEFINITION_COLUMNS}
            "#
        ))
        .bind(calendar_id)
        .bind(title)
        .bind(description)
        .bind(start)
        .bind(end)
        .bind(repeat_rule)
        .bind(repeat_until)
        .fetch_one(&self.pool)
        .await
    }

    pub async fn find_definition(&self, id: i64) -> Result<Option<EventDefinition>, sqlx::Error> {
        sqlx::query_as::<_, EventDefinition>(&format!(
            "SELECT {DEFINITION_COLUMNS} FROM event_definitions WHERE id = ?"
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await
    }

    /// Persist a resolved occurrence; re-materializing the same instant
    /// returns the existing row.
    pub async fn get_or_create_occurrence(
        &self,
        tx: &mut Transaction<'_, Sqlite>,
        definition_id: i64,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Result<Occurrence, sqlx::Error> {
        let existing = sqlx::query_as::<_, Occurrence>(
            r#"SELECT id, definition_id, start, "end" FROM occurrences
               WHERE definition_id = ? AND start = ?"#,
        )
        .bind(definition_id)
        .bind(start)
        .fetch_optional(&mut **tx)
        .await?;

        if let Some(occurrence) = existing {
            return Ok(occurrence);
        }

        sqlx::query_as::<_, Occurrence>(
            r#"
            INSERT INTO occurrences (definition_id, start, "end")
            VALUES (?, ?, ?)
            RETURNING id, definition_id, start, "end"
            "#,
        )
        .bind(definition_id)
        .bind(start)
        .bind(end)
        .fetch_one(&mut **tx)
        .await
    }
}
