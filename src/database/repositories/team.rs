use chrono::Utc;
use sqlx::{Sqlite, SqlitePool, Transaction};

use crate::database::models::{Team, TeamInput, TeamMember};
use crate::services::geo;

#[derive(Clone)]
pub struct TeamRepository {
    pool: SqlitePool,
}

const TEAM_COLUMNS: &str = "id, name, description, channel, lat, lng, calendar_id";

impl TeamRepository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    pub async fn create(&self, input: TeamInput) -> Result<Team, sqlx::Error> {
        sqlx::query_as::<_, Team>(
            r#"
            INSERT INTO teams (name, description, channel, lat, lng, calendar_id)
            VALUES (?, ?, ?, ?, ?, ?)
            RETURNING id, name, description, channel, lat, lng, calendar_id
            "#,
        )
        .bind(input.name)
        .bind(input.description)
        .bind(input.channel)
        .bind(input.lat)
        .bind(input.lng)
        .bind(input.calendar_id)
        .fetch_one(&self.pool)
        .await
    }

    pub async fn all(&self) -> Result<Vec<Team>, sqlx::Error> {
        sqlx::query_as::<_, Team>(&format!(
            "SELECT {TEAM_COLUMNS} FROM teams ORDER BY name"
        ))
        .fetch_all(&self.pool)
        .await
    }

    pub async fn find_by_id(&self, id: i64) -> Result<Option<Team>, sqlx::Error> {
        sqlx::query_as::<_, Team>(&format!("SELECT {TEAM_COLUMNS} FROM teams WHERE id = ?"))
            .bind(id)
            .fetch_optional(&self.pool)
            .await
    }

    pub async fn find_by_calendar(&self, calendar_id: i64) -> Result<Option<Team>, sqlx::Error> {
        sqlx::query_as::<_, Team>(&format!(
            "SELECT {TEAM_COLUMNS} FROM teams WHERE calendar_id = ?"
        ))
        .bind(calendar_id)
        .fetch_optional(&self.pool)
        .await
    }

    pub async fn delete(&self, id: i64) -> Result<Option<()>, sqlx::Error> {
        let result = sqlx::query("DELETE FROM teams WHERE id = ?")
            .bind(id)
            .execute(&self.pool)
            .await?;

        Ok(if result.rows_affected() > 0 {
            Some(())
        } else {
            None
        })
    }

    /// Team whose registered point is closest to the given one, by
    /// great-circle distance. Best-effort enrichment only; `None` when the
    /// input point is absent or no team has a point.
    pub async fn nearest(
        &self,
        lat: Option<f64>,
        lng: Option<f64>,
    ) -> Result<Option<Team>, sqlx::Error> {
        let (Some(lat), Some(lng)) = (lat, lng) else {
            return Ok(None);
        };

        let teams = self.all().await?;
        Ok(teams
            .into_iter()
            .filter_map(|t| match (t.lat, t.lng) {
                (Some(tlat), Some(tlng)) => {
                    let d = geo::haversine_distance(lat, lng, tlat, tlng);
                    Some((t, d))
                }
                _ => None,
            })
            .min_by(|a, b| a.1.total_cmp(&b.1))
            .map(|(t, _)| t))
    }

    pub async fn is_member(&self, team_id: i64, user_id: i64) -> Result<bool, sqlx::Error> {
        let row: Option<(i64,)> =
            sqlx::query_as("SELECT id FROM team_members WHERE team_id = ? AND user_id = ?")
                .bind(team_id)
                .bind(user_id)
                .fetch_optional(&self.pool)
                .await?;
        Ok(row.is_some())
    }

    /// Idempotent join: an existing membership is returned as-is.
    pub async fn add_member(
        &self,
        tx: &mut Transaction<'_, Sqlite>,
        team_id: i64,
        user_id: i64,
    ) -> Result<(TeamMember, bool), sqlx::Error> {
        let existing = sqlx::query_as::<_, TeamMember>(
            "SELECT id, team_id, user_id, joined, responsible FROM team_members \
             WHERE team_id = ? AND user_id = ?",
        )
        .bind(team_id)
        .bind(user_id)
        .fetch_optional(&mut **tx)
        .await?;

        if let Some(member) = existing {
            return Ok((member, false));
        }

        let member = sqlx::query_as::<_, TeamMember>(
            r#"
            INSERT INTO team_members (team_id, user_id, joined, responsible)
            VALUES (?, ?, ?, 0)
            RETURNING id, team_id, user_id, joined, responsible
            "#,
        )
        .bind(team_id)
        .bind(user_id)
        .bind(Utc::now())
        .fetch_one(&mut **tx)
        .await?;

        Ok((member, true))
    }
}
