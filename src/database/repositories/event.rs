use chrono::{DateTime, Utc};
use sqlx::{Sqlite, SqlitePool, Transaction};

use crate::database::models::{Event, EventMember, EventWithWindow};

#[derive(Clone)]
pub struct EventRepository {
    pool: SqlitePool,
}

const WINDOW_COLUMNS: &str = r#"
    e.id, e.name, e.description, e.lat, e.lng, e.team_id, e.occurrence_id,
    o.start AS start, o."end" AS "end"
"#;

impl EventRepository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    pub async fn create(
        &self,
        tx: &mut Transaction<'_, Sqlite>,
        name: &str,
        description: &str,
        lat: Option<f64>,
        lng: Option<f64>,
        team_id: Option<i64>,
        occurrence_id: i64,
    ) -> Result<Event, sqlx::Error> {
        sqlx::query_as::<_, Event>(
            r#"
            INSERT INTO events (name, description, lat, lng, team_id, occurrence_id)
            VALUES (?, ?, ?, ?, ?, ?)
            RETURNING id, name, description, lat, lng, team_id, occurrence_id
            "#,
        )
        .bind(name)
        .bind(description)
        .bind(lat)
        .bind(lng)
        .bind(team_id)
        .bind(occurrence_id)
        .fetch_one(&mut **tx)
        .await
    }

    pub async fn find_by_id(&self, id: i64) -> Result<Option<EventWithWindow>, sqlx::Error> {
        sqlx::query_as::<_, EventWithWindow>(&format!(
            r#"
            SELECT {WINDOW_COLUMNS}
            FROM events e
            INNER JOIN occurrences o ON o.id = e.occurrence_id
            WHERE e.id = ?
            "#
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await
    }

    pub async fn find_by_occurrence(
        &self,
        tx: &mut Transaction<'_, Sqlite>,
        occurrence_id: i64,
    ) -> Result<Option<Event>, sqlx::Error> {
        sqlx::query_as::<_, Event>(
            "SELECT id, name, description, lat, lng, team_id, occurrence_id \
             FROM events WHERE occurrence_id = ?",
        )
        .bind(occurrence_id)
        .fetch_optional(&mut **tx)
        .await
    }

    /// Upcoming events for the map feed: not yet over, starting within the
    /// look-ahead window, in chronological order.
    pub async fn in_window(
        &self,
        now: DateTime<Utc>,
        until: DateTime<Utc>,
    ) -> Result<Vec<EventWithWindow>, sqlx::Error> {
        sqlx::query_as::<_, EventWithWindow>(&format!(
            r#"
            SELECT {WINDOW_COLUMNS}
            FROM events e
            INNER JOIN occurrences o ON o.id = e.occurrence_id
            WHERE o."end" >= ? AND o.start <= ?
            ORDER BY o.start
            "#
        ))
        .bind(now)
        .bind(until)
        .fetch_all(&self.pool)
        .await
    }

    /// Events whose occurrence starts in `[from, to)`; the reminder sweep
    /// uses this with a one-hour-wide window a day ahead.
    pub async fn starting_between(
        &self,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
    ) -> Result<Vec<EventWithWindow>, sqlx::Error> {
        sqlx::query_as::<_, EventWithWindow>(&format!(
            r#"
            SELECT {WINDOW_COLUMNS}
            FROM events e
            INNER JOIN occurrences o ON o.id = e.occurrence_id
            WHERE o.start >= ? AND o.start < ?
            ORDER BY o.start
            "#
        ))
        .bind(from)
        .bind(to)
        .fetch_all(&self.pool)
        .await
    }

    pub async fn by_team(&self, team_id: i64) -> Result<Vec<EventWithWindow>, sqlx::Error> {
        sqlx::query_as::<_, EventWithWindow>(&format!(
            r#"
            SELECT {WINDOW_COLUMNS}
            FROM events e
            INNER JOIN occurrences o ON o.id = e.occurrence_id
            WHERE e.team_id = ?
            ORDER BY o.start
            "#
        ))
        .bind(team_id)
        .fetch_all(&self.pool)
        .await
    }

    pub async fn delete(&self, id: i64) -> Result<Option<()>, sqlx::Error> {
        let result = sqlx::query("DELETE FROM events WHERE id = ?")
            .bind(id)
            .execute(&self.pool)
            .await?;

        Ok(if result.rows_affected() > 0 {
            Some(())
        } else {
            None
        })
    }

    // Member sign-ups

    pub async fn members(&self, event_id: i64) -> Result<Vec<EventMember>, sqlx::Error> {
        sqlx::query_as::<_, EventMember>(
            r#"
            SELECT id, event_id, user_id, start, "end", note
            FROM event_members
            WHERE event_id = ?
            ORDER BY start, "end" DESC
            "#,
        )
        .bind(event_id)
        .fetch_all(&self.pool)
        .await
    }

    pub async fn find_member(&self, member_id: i64) -> Result<Option<EventMember>, sqlx::Error> {
        sqlx::query_as::<_, EventMember>(
            r#"SELECT id, event_id, user_id, start, "end", note FROM event_members WHERE id = ?"#,
        )
        .bind(member_id)
        .fetch_optional(&self.pool)
        .await
    }

    /// Existing sign-ups by the same user that a new interval absorbs. A
    /// candidate `[s, e]` matches when it covers the new end instant
    /// (`s <= new_end <= e`); sign-ups that only cross the new start stay
    /// separate, as do intervals strictly inside the new one. Asymmetric
    /// on purpose, matching the long-standing merge behavior.
    pub async fn overlapping_members(
        &self,
        tx: &mut Transaction<'_, Sqlite>,
        event_id: i64,
        user_id: i64,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Result<Vec<EventMember>, sqlx::Error> {
        sqlx::query_as::<_, EventMember>(
            r#"
            SELECT id, event_id, user_id, start, "end", note
            FROM event_members
            WHERE event_id = ? AND user_id = ?
              AND ((start >= ? AND "end" <= ?) OR (start <= ? AND "end" >= ?))
            "#,
        )
        .bind(event_id)
        .bind(user_id)
        .bind(start)
        .bind(start)
        .bind(end)
        .bind(end)
        .fetch_all(&mut **tx)
        .await
    }

    pub async fn delete_member_tx(
        &self,
        tx: &mut Transaction<'_, Sqlite>,
        member_id: i64,
    ) -> Result<(), sqlx::Error> {
        sqlx::query("DELETE FROM event_members WHERE id = ?")
            .bind(member_id)
            .execute(&mut **tx)
            .await?;
        Ok(())
    }

    pub async fn add_member(
        &self,
        tx: &mut Transaction<'_, Sqlite>,
        event_id: i64,
        user_id: i64,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
        note: &str,
    ) -> Result<EventMember, sqlx::Error> {
        sqlx::query_as::<_, EventMember>(
            r#"
            INSERT INTO event_members (event_id, user_id, start, "end", note)
            VALUES (?, ?, ?, ?, ?)
            RETURNING id, event_id, user_id, start, "end", note
            "#,
        )
        .bind(event_id)
        .bind(user_id)
        .bind(start)
        .bind(end)
        .bind(note)
        .fetch_one(&mut **tx)
        .await
    }

    /// Team members who have not signed up for this event.
    pub async fn non_attendee_user_ids(&self, event_id: i64) -> Result<Vec<i64>, sqlx::Error> {
        let rows: Vec<(i64,)> = sqlx::query_as(
            r#"
            SELECT tm.user_id
            FROM team_members tm
            INNER JOIN events e ON e.team_id = tm.team_id
            WHERE e.id = ?
              AND tm.user_id NOT IN (
                  SELECT user_id FROM event_members WHERE event_id = e.id
              )
            "#,
        )
        .bind(event_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.into_iter().map(|(id,)| id).collect())
    }
}
