use std::sync::Arc;

use anyhow::Result;
use chrono::{DateTime, Duration, FixedOffset, Utc};

use crate::database::models::{EventWithWindow, Team, groups};
use crate::database::repositories::{
    EventRepository, LocationRepository, TeamRepository, UserRepository,
};
use crate::services::chat::{ChatMessage, ChatSink};
use crate::services::mailer::{DeliveryLane, MailSink, build_email, deliverable};
use crate::services::outbox::DomainEvent;

/// Settings the notifier needs from [`crate::config::Config`], kept as a
/// plain struct so tests can build one without touching the environment.
#[derive(Debug, Clone)]
pub struct NotifierSettings {
    pub site_url: String,
    pub default_channel: String,
    pub bot_name: String,
    pub mail_from: String,
    pub bulk_queue: String,
    pub local_offset: FixedOffset,
}

/// Executes notification jobs. Every job re-fetches its subject by id and
/// silently no-ops when the subject has been deleted in the meantime.
pub struct Notifier {
    users: UserRepository,
    teams: TeamRepository,
    locations: LocationRepository,
    events: EventRepository,
    chat: Arc<dyn ChatSink>,
    mail: Arc<dyn MailSink>,
    settings: NotifierSettings,
}

impl Notifier {
    pub fn new(
        users: UserRepository,
        teams: TeamRepository,
        locations: LocationRepository,
        events: EventRepository,
        chat: Arc<dyn ChatSink>,
        mail: Arc<dyn MailSink>,
        settings: NotifierSettings,
    ) -> Self {
        Self {
            users,
            teams,
            locations,
            events,
            chat,
            mail,
            settings,
        }
    }

    pub async fn handle(&self, event: DomainEvent) -> Result<()> {
        match event {
            DomainEvent::TeamJoined { team_id, user_id } => {
                self.team_joined(team_id, user_id).await
            }
            DomainEvent::LocationCreated { location_id } => {
                self.location_created(location_id).await
            }
            DomainEvent::LocationReported { location_id } => {
                self.location_reported(location_id).await
            }
            DomainEvent::EventCreated { event_id } => self.event_created(event_id).await,
            DomainEvent::MaterialRequested { location_id } => {
                self.material_requested(location_id).await
            }
            DomainEvent::MaterialSent { location_id } => self.material_sent(location_id).await,
            DomainEvent::EventMemberJoined { event_id, user_id } => {
                self.event_membership_changed(event_id, user_id, true).await
            }
            DomainEvent::EventMemberLeft { event_id, user_id } => {
                self.event_membership_changed(event_id, user_id, false)
                    .await
            }
        }
    }

    async fn send_chat(&self, text: String, team: Option<&Team>) -> Result<()> {
        let channel = match team {
            Some(team) if !team.channel.is_empty() => team.channel.clone(),
            _ => self.settings.default_channel.clone(),
        };
        self.chat
            .send(ChatMessage {
                channel,
                username: self.settings.bot_name.clone(),
                text,
                icon_emoji: ":robot_face:".to_string(),
            })
            .await
    }

    fn location_admin_url(&self, location_id: i64) -> String {
        format!("{}/admin/locations/{}", self.settings.site_url, location_id)
    }

    fn event_url(&self, event_id: i64) -> String {
        format!("{}/events/{}", self.settings.site_url, event_id)
    }

    async fn location_created(&self, location_id: i64) -> Result<()> {
        let Some(location) = self.locations.find_by_id(location_id).await? else {
            return Ok(());
        };

        let team = self.teams.nearest(location.lat, location.lng).await?;

        let mut message = format!(
            "A new collection location was registered: \"<{url}|{name}>\"!",
            url = self.location_admin_url(location.id),
            name = location.name
        );
        if let Some(ref team) = team {
            message.push_str(&format!(" Team {} is closest.", team.name));
        }
        self.send_chat(message, team.as_ref()).await
    }

    async fn location_reported(&self, location_id: i64) -> Result<()> {
        let Some(location) = self.locations.find_by_id(location_id).await? else {
            return Ok(());
        };

        let team = self.teams.nearest(location.lat, location.lng).await?;

        let mut message = format!(
            "Uh oh, a problem was reported at \"<{url}|{name}>\".",
            url = self.location_admin_url(location.id),
            name = location.name
        );
        if let Some(ref team) = team {
            message.push_str(&format!(" Team {} is closest.", team.name));
        }
        self.send_chat(message, team.as_ref()).await
    }

    async fn team_joined(&self, team_id: i64, user_id: i64) -> Result<()> {
        let Some(team) = self.teams.find_by_id(team_id).await? else {
            return Ok(());
        };
        let Some(user) = self.users.find_by_id(user_id).await? else {
            return Ok(());
        };

        let message = format!("Hooray! Team {} has a new member: {}", team.name, user.name);
        self.send_chat(message, Some(&team)).await
    }

    async fn event_created(&self, event_id: i64) -> Result<()> {
        let Some(event) = self.events.find_by_id(event_id).await? else {
            return Ok(());
        };

        let date = self.short_date(event.start);
        let url = self.event_url(event.id);

        match self.event_team(&event).await? {
            Some(team) => {
                let message = format!(
                    "Team {} has its next collection date: <{}|{}>",
                    team.name, url, date
                );
                self.send_chat(message, Some(&team)).await
            }
            None => {
                let message = format!("New collection date: <{}|{}>", url, date);
                self.send_chat(message, None).await
            }
        }
    }

    async fn material_requested(&self, location_id: i64) -> Result<()> {
        let Some(location) = self.locations.find_by_id(location_id).await? else {
            return Ok(());
        };

        let recipients = self.users.in_group(groups::MATERIAL).await?;
        for user in recipients {
            if !deliverable(&user) {
                continue;
            }
            let body = format!(
                "Hi {name},\n\nmaterial was requested for the collection location \
                 \"{location}\".\n\n{url}\n",
                name = user.name,
                location = location.name,
                url = self.location_admin_url(location.id),
            );
            self.mail
                .send(build_email(
                    &user.email,
                    &self.settings.mail_from,
                    "Material requested",
                    &body,
                    DeliveryLane::Priority,
                    &self.settings.bulk_queue,
                ))
                .await?;
        }
        Ok(())
    }

    async fn material_sent(&self, location_id: i64) -> Result<()> {
        let Some(location) = self.locations.find_by_id(location_id).await? else {
            return Ok(());
        };
        if location.email.is_empty() {
            return Ok(());
        }

        let body = format!(
            "Good news! The collection material for \"{}\" has been shipped.\n",
            location.name
        );
        self.mail
            .send(build_email(
                &location.email,
                &self.settings.mail_from,
                "Collection material on its way!",
                &body,
                DeliveryLane::Priority,
                &self.settings.bulk_queue,
            ))
            .await
    }

    async fn event_membership_changed(
        &self,
        event_id: i64,
        user_id: i64,
        joined: bool,
    ) -> Result<()> {
        let Some(event) = self.events.find_by_id(event_id).await? else {
            return Ok(());
        };
        let Some(acting_user) = self.users.find_by_id(user_id).await? else {
            return Ok(());
        };

        let watchers = self.users.in_group(groups::PARTICIPATION_WATCHERS).await?;
        for user in watchers {
            if user.id == acting_user.id || !deliverable(&user) {
                continue;
            }
            let (subject, verb) = if joined {
                (format!("New sign-up for {}", event.name), "signed up for")
            } else {
                (format!("Cancellation for {}", event.name), "backed out of")
            };
            let body = format!(
                "Hi {name},\n\n{actor} has {verb} the event \"{event}\" on {date}.\n\n{url}\n",
                name = user.name,
                actor = acting_user.name,
                verb = verb,
                event = event.name,
                date = self.short_date(event.start),
                url = self.event_url(event.id),
            );
            self.mail
                .send(build_email(
                    &user.email,
                    &self.settings.mail_from,
                    &subject,
                    &body,
                    DeliveryLane::Priority,
                    &self.settings.bulk_queue,
                ))
                .await?;
        }
        Ok(())
    }

    /// Reminder pass for events starting a day from now, within one sweep
    /// interval. Called hourly, so the window is [now+24h, now+25h).
    pub async fn remind_upcoming_events(&self, now: DateTime<Utc>) -> Result<()> {
        let from = now + Duration::hours(24);
        let to = from + Duration::hours(1);

        let events = self.events.starting_between(from, to).await?;
        for event in events {
            if let Err(err) = self.announce_event_tomorrow(&event).await {
                log::error!("Reminder for event {} failed: {}", event.id, err);
            }
        }
        Ok(())
    }

    async fn announce_event_tomorrow(&self, event: &EventWithWindow) -> Result<()> {
        let url = self.event_url(event.id);
        let team = self.event_team(event).await?;

        match team {
            Some(ref team) => {
                self.send_chat(
                    format!(
                        "Team {} collects tomorrow! <{}|Here is the event>",
                        team.name, url
                    ),
                    Some(team),
                )
                .await?;
            }
            None => {
                self.send_chat(
                    format!(
                        "The open collection event \"{}\" happens tomorrow! <{}|Sign up here>",
                        event.name, url
                    ),
                    None,
                )
                .await?;
            }
        }

        // Current members get a reminder mail.
        for member in self.events.members(event.id).await? {
            let Some(user) = self.users.find_by_id(member.user_id).await? else {
                continue;
            };
            if !deliverable(&user) {
                continue;
            }
            let body = format!(
                "Hi {name},\n\nyou are signed up for \"{event}\" tomorrow, \
                 {start} to {end}.\n\n{url}\n",
                name = user.name,
                event = event.name,
                start = self.short_datetime(member.start),
                end = self.short_time(member.end),
                url = url,
            );
            self.mail
                .send(build_email(
                    &user.email,
                    &self.settings.mail_from,
                    "Collecting tomorrow",
                    &body,
                    DeliveryLane::Priority,
                    &self.settings.bulk_queue,
                ))
                .await?;
        }

        // Team members without a sign-up get a nudge.
        if let Some(team) = team {
            for user_id in self.events.non_attendee_user_ids(event.id).await? {
                let Some(user) = self.users.find_by_id(user_id).await? else {
                    continue;
                };
                if !deliverable(&user) {
                    continue;
                }
                let body = format!(
                    "Hi {name},\n\nteam {team} collects tomorrow and could use more \
                     hands: \"{event}\" at {start}.\n\n{url}\n",
                    name = user.name,
                    team = team.name,
                    event = event.name,
                    start = self.short_datetime(event.start),
                    url = url,
                );
                self.mail
                    .send(build_email(
                        &user.email,
                        &self.settings.mail_from,
                        "Spontaneously free tomorrow?",
                        &body,
                        DeliveryLane::Bulk,
                        &self.settings.bulk_queue,
                    ))
                    .await?;
            }
        }

        Ok(())
    }

    async fn event_team(&self, event: &EventWithWindow) -> Result<Option<Team>> {
        match event.team_id {
            Some(team_id) => Ok(self.teams.find_by_id(team_id).await?),
            None => Ok(None),
        }
    }

    fn short_date(&self, at: DateTime<Utc>) -> String {
        at.with_timezone(&self.settings.local_offset)
            .format("%d.%m.%Y")
            .to_string()
    }

    fn short_datetime(&self, at: DateTime<Utc>) -> String {
        at.with_timezone(&self.settings.local_offset)
            .format("%d.%m.%Y %H:%M")
            .to_string()
    }

    fn short_time(&self, at: DateTime<Utc>) -> String {
        at.with_timezone(&self.settings.local_offset)
            .format("%H:%M")
            .to_string()
    }
}
