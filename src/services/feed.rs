use chrono::{DateTime, Duration, FixedOffset, Utc};
use serde_json::{Value, json};

use crate::database::models::{EventWithWindow, Location, Team};
use crate::database::repositories::{EventRepository, LocationRepository, TeamRepository};
use crate::error::AppError;

/// One entry of the unified map feed. Each kind keeps its natural shape and
/// is mapped into GeoJSON at the edge; the merge happens in application
/// code, so no cross-entity column alignment is ever required.
#[derive(Debug, Clone)]
pub enum FeedItem {
    Team(Team),
    Event(EventWithWindow),
    Location(Location),
}

impl FeedItem {
    fn kind(&self) -> &'static str {
        match self {
            FeedItem::Team(_) => "group",
            FeedItem::Event(_) => "event",
            FeedItem::Location(_) => "location",
        }
    }

    fn id(&self) -> i64 {
        match self {
            FeedItem::Team(t) => t.id,
            FeedItem::Event(e) => e.id,
            FeedItem::Location(l) => l.id,
        }
    }

    fn point(&self) -> (Option<f64>, Option<f64>) {
        match self {
            FeedItem::Team(t) => (t.lat, t.lng),
            FeedItem::Event(e) => (e.lat, e.lng),
            FeedItem::Location(l) => (l.lat, l.lng),
        }
    }

    fn name(&self) -> &str {
        match self {
            FeedItem::Team(t) => &t.name,
            FeedItem::Event(e) => &e.name,
            FeedItem::Location(l) => &l.name,
        }
    }

    fn description(&self) -> &str {
        match self {
            FeedItem::Team(t) => &t.description,
            FeedItem::Event(e) => &e.description,
            FeedItem::Location(l) => &l.description,
        }
    }
}

/// Per-kind action path; joined onto the site URL for the feature `url`
/// property. Kinds without an action keep an empty string.
fn action_path(kind: &str, id: i64) -> String {
    match kind {
        "group" => format!("/teams/{}", id),
        "event" => format!("/events/{}", id),
        "location" => format!("/locations/{}/report", id),
        _ => String::new(),
    }
}

fn details(item: &FeedItem, offset: FixedOffset) -> Value {
    match item {
        FeedItem::Team(_) => json!({}),
        FeedItem::Location(l) => json!({ "address": l.address }),
        FeedItem::Event(e) => {
            let start_local = e.start.with_timezone(&offset);
            let end_local = e.end.with_timezone(&offset);
            json!({
                "group": e.team_id,
                "start": e.start,
                "end": e.end,
                "start_format": start_local.format("%d.%m.%Y %H:%M").to_string(),
                "end_format": end_local.format("%H:%M").to_string(),
            })
        }
    }
}

/// Map one feed item to a GeoJSON Feature. Null geometry is passed through
/// as null, never omitted.
pub fn feature(item: &FeedItem, site_url: &str, offset: FixedOffset) -> Value {
    let kind = item.kind();
    let geometry = match item.point() {
        (Some(lat), Some(lng)) => json!({
            "type": "Point",
            "coordinates": [lng, lat],
        }),
        _ => Value::Null,
    };

    let path = action_path(kind, item.id());
    let url = if path.is_empty() {
        String::new()
    } else {
        format!("{}{}", site_url, path)
    };

    json!({
        "id": format!("{}_{}", kind, item.id()),
        "type": "Feature",
        "geometry": geometry,
        "properties": {
            "name": item.name(),
            "description": item.description(),
            "details": details(item, offset),
            "kind": kind,
            "url": url,
        },
    })
}

pub struct FeedService {
    teams: TeamRepository,
    events: EventRepository,
    locations: LocationRepository,
    site_url: String,
    lookahead_days: i64,
    offset: FixedOffset,
}

impl FeedService {
    pub fn new(
        teams: TeamRepository,
        events: EventRepository,
        locations: LocationRepository,
        site_url: String,
        lookahead_days: i64,
        offset: FixedOffset,
    ) -> Self {
        Self {
            teams,
            events,
            locations,
            site_url,
            lookahead_days,
            offset,
        }
    }

    /// The unified map projection: all teams, upcoming events in
    /// chronological order, currently valid locations.
    pub async fn build_feed(&self, now: DateTime<Utc>) -> Result<Value, AppError> {
        let today = now.with_timezone(&self.offset).date_naive();
        let until = now + Duration::days(self.lookahead_days);

        let mut items: Vec<FeedItem> = Vec::new();
        items.extend(self.teams.all().await?.into_iter().map(FeedItem::Team));
        items.extend(
            self.events
                .in_window(now, until)
                .await?
                .into_iter()
                .map(FeedItem::Event),
        );
        items.extend(
            self.locations
                .currently_valid(today)
                .await?
                .into_iter()
                .map(FeedItem::Location),
        );

        let features: Vec<Value> = items
            .iter()
            .map(|item| feature(item, &self.site_url, self.offset))
            .collect();

        Ok(json!({
            "type": "FeatureCollection",
            "features": features,
        }))
    }
}
