use chrono::{DateTime, FixedOffset, NaiveDate, Utc};
use sqlx::SqlitePool;

use crate::database::models::{Event, EventDefinition, RepeatRule};
use crate::database::repositories::{EventRepository, ScheduleRepository, TeamRepository};
use crate::error::AppError;

/// Resolve the concrete start/end instants of a definition on a target
/// date, or `None` when the definition has no occurrence that day.
///
/// Recurrence is evaluated in local time: "weekly at 10:00" means the same
/// wall-clock time on each matching date.
pub fn resolve_occurrence(
    definition: &EventDefinition,
    date: NaiveDate,
    offset: FixedOffset,
) -> Option<(DateTime<Utc>, DateTime<Utc>)> {
    let local_start = definition.start.with_timezone(&offset);
    let first_date = local_start.date_naive();
    let duration = definition.end - definition.start;

    let matches = match definition.repeat_rule {
        None => date == first_date,
        Some(rule) => {
            if date < first_date {
                false
            } else if definition.repeat_until.is_some_and(|until| date > until) {
                false
            } else {
                match rule {
                    RepeatRule::Daily => true,
                    RepeatRule::Weekly => (date - first_date).num_days() % 7 == 0,
                }
            }
        }
    };
    if !matches {
        return None;
    }

    let start = date
        .and_time(local_start.time())
        .and_local_timezone(offset)
        .single()?
        .with_timezone(&Utc);
    Some((start, start + duration))
}

/// Materializes calendar occurrences into domain events.
pub struct Scheduler {
    pool: SqlitePool,
    schedules: ScheduleRepository,
    events: EventRepository,
    teams: TeamRepository,
    offset: FixedOffset,
}

impl Scheduler {
    pub fn new(
        pool: SqlitePool,
        schedules: ScheduleRepository,
        events: EventRepository,
        teams: TeamRepository,
        offset: FixedOffset,
    ) -> Self {
        Self {
            pool,
            schedules,
            events,
            teams,
            offset,
        }
    }

    /// Persist the occurrence of `definition_id` on `date` (the definition's
    /// own start date when omitted) and get-or-create the Event wrapping it.
    /// Returns the event and whether it was newly created; a date with no
    /// scheduled occurrence is a user-facing error, not a crash.
    pub async fn materialize(
        &self,
        definition_id: i64,
        date: Option<NaiveDate>,
    ) -> Result<(Event, bool), AppError> {
        let definition = self
            .schedules
            .find_definition(definition_id)
            .await?
            .ok_or_else(|| AppError::NotFound("Event definition not found".to_string()))?;

        let target = date.unwrap_or_else(|| {
            definition
                .start
                .with_timezone(&self.offset)
                .date_naive()
        });

        let Some((start, end)) = resolve_occurrence(&definition, target, self.offset) else {
            return Err(AppError::BadRequest(
                "Could not find a scheduled date for this day".to_string(),
            ));
        };

        // Owning team is the one sharing the definition's calendar.
        let team = match definition.calendar_id {
            Some(calendar_id) => self.teams.find_by_calendar(calendar_id).await?,
            None => None,
        };

        let mut tx = self.pool.begin().await?;

        let occurrence = self
            .schedules
            .get_or_create_occurrence(&mut tx, definition.id, start, end)
            .await?;

        if let Some(existing) = self.events.find_by_occurrence(&mut tx, occurrence.id).await? {
            tx.commit().await?;
            return Ok((existing, false));
        }

        let (lat, lng) = team
            .as_ref()
            .map(|t| (t.lat, t.lng))
            .unwrap_or((None, None));
        let event = self
            .events
            .create(
                &mut tx,
                &definition.title,
                &definition.description,
                lat,
                lng,
                team.as_ref().map(|t| t.id),
                occurrence.id,
            )
            .await?;

        tx.commit().await?;
        Ok((event, true))
    }
}
