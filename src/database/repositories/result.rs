use sqlx::SqlitePool;

use crate::database::models::{CollectionResult, CollectionResultInput};

#[derive(Clone)]
pub struct ResultRepository {
    pool: SqlitePool,
}

impl ResultRepository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    pub async fn create(
        &self,
        input: CollectionResultInput,
        user_id: Option<i64>,
    ) -> Result<CollectionResult, sqlx::Error> {
        sqlx::query_as::<_, CollectionResult>(
            r#"
            INSERT INTO results (amount, start, "end", comment, user_id, team_id, location_id, event_id)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?)
            RETURNING id, amount, start, "end", comment, user_id, team_id, location_id, event_id
            "#,
        )
        .bind(input.amount)
        .bind(input.start)
        .bind(input.end)
        .bind(input.comment)
        .bind(user_id)
        .bind(input.team_id)
        .bind(input.location_id)
        .bind(input.event_id)
        .fetch_one(&self.pool)
        .await
    }

    pub async fn all(&self) -> Result<Vec<CollectionResult>, sqlx::Error> {
        sqlx::query_as::<_, CollectionResult>(
            r#"
            SELECT id, amount, start, "end", comment, user_id, team_id, location_id, event_id
            FROM results
            ORDER BY start DESC
            "#,
        )
        .fetch_all(&self.pool)
        .await
    }

    pub async fn find_by_id(&self, id: i64) -> Result<Option<CollectionResult>, sqlx::Error> {
        sqlx::query_as::<_, CollectionResult>(
            r#"
            SELECT id, amount, start, "end", comment, user_id, team_id, location_id, event_id
            FROM results
            WHERE id = ?
            "#,
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await
    }
}
