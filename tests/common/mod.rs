#![allow(dead_code)]

use std::sync::{Arc, Mutex};

use anyhow::Result;
use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use sqlx::SqlitePool;
use tempfile::TempDir;

use collectmob::AppState;
use collectmob::auth::AuthService;
use collectmob::config::Config;
use collectmob::database::init_database;
use collectmob::database::models::{EventWithWindow, Location, LocationInput, Team, TeamInput, User, UserInput};
use collectmob::database::repositories::{
    EventRepository, LocationRepository, ScheduleRepository, TeamRepository, UserRepository,
};
use collectmob::services::chat::{ChatMessage, ChatSink};
use collectmob::services::mailer::{Email, MailSink};
use collectmob::services::{Dispatcher, Notifier, NotifierSettings};

/// Chat sink double that records messages instead of delivering them.
#[derive(Default)]
pub struct RecordingChat {
    messages: Mutex<Vec<ChatMessage>>,
}

impl RecordingChat {
    pub fn sent(&self) -> Vec<ChatMessage> {
        self.messages.lock().unwrap().clone()
    }
}

#[async_trait]
impl ChatSink for RecordingChat {
    async fn send(&self, message: ChatMessage) -> Result<()> {
        self.messages.lock().unwrap().push(message);
        Ok(())
    }
}

/// Mail sink double that records outbound mail.
#[derive(Default)]
pub struct RecordingMail {
    messages: Mutex<Vec<Email>>,
}

impl RecordingMail {
    pub fn sent(&self) -> Vec<Email> {
        self.messages.lock().unwrap().clone()
    }
}

#[async_trait]
impl MailSink for RecordingMail {
    async fn send(&self, email: Email) -> Result<()> {
        self.messages.lock().unwrap().push(email);
        Ok(())
    }
}

pub struct TestContext {
    pub pool: SqlitePool,
    pub config: Config,
    pub chat: Arc<RecordingChat>,
    pub mail: Arc<RecordingMail>,
    pub notifier: Arc<Notifier>,
    pub auth_service: AuthService,
    _temp_dir: TempDir,
}

impl TestContext {
    pub async fn new() -> Result<Self> {
        let temp_dir = TempDir::new()?;
        let database_url = format!("sqlite:{}/test.db", temp_dir.path().display());

        let config = Config {
            database_url: database_url.clone(),
            jwt_secret: "test-jwt-secret-key-that-is-long-enough".to_string(),
            jwt_expiration_days: 1,
            host: "127.0.0.1".to_string(),
            port: 0,
            environment: "test".to_string(),
            site_url: "http://test.local".to_string(),
            chat_webhook_url: String::new(),
            chat_default_channel: "#organizing".to_string(),
            chat_bot_name: "orga-bot".to_string(),
            mail_api_url: String::new(),
            mail_from: "noreply@test.local".to_string(),
            mail_bulk_queue: "bulk".to_string(),
            utc_offset_minutes: 60,
            feed_lookahead_days: 15,
            reminder_interval_secs: 3600,
        };

        let pool = init_database(&database_url).await?;
        let chat = Arc::new(RecordingChat::default());
        let mail = Arc::new(RecordingMail::default());

        let notifier = Arc::new(Notifier::new(
            UserRepository::new(pool.clone()),
            TeamRepository::new(pool.clone()),
            LocationRepository::new(pool.clone()),
            EventRepository::new(pool.clone()),
            chat.clone(),
            mail.clone(),
            NotifierSettings {
                site_url: config.site_url.clone(),
                default_channel: config.chat_default_channel.clone(),
                bot_name: config.chat_bot_name.clone(),
                mail_from: config.mail_from.clone(),
                bulk_queue: config.mail_bulk_queue.clone(),
                local_offset: config.local_offset(),
            },
        ));
        let auth_service = AuthService::new(UserRepository::new(pool.clone()), config.clone());

        Ok(TestContext {
            pool,
            config,
            chat,
            mail,
            notifier,
            auth_service,
            _temp_dir: temp_dir,
        })
    }

    pub fn app_state(&self) -> actix_web::web::Data<AppState> {
        actix_web::web::Data::new(AppState {
            auth_service: self.auth_service.clone(),
            dispatcher: Dispatcher::new(self.notifier.clone()),
            mail: self.mail.clone(),
            mail_from: self.config.mail_from.clone(),
            mail_bulk_queue: self.config.mail_bulk_queue.clone(),
        })
    }

    pub fn token_for(&self, user: &User) -> String {
        self.auth_service
            .generate_token(user)
            .expect("Failed to generate test token")
    }

    /// Let spawned notification tasks run to completion before asserting
    /// on the recording sinks.
    pub async fn settle(&self) {
        tokio::time::sleep(std::time::Duration::from_millis(50)).await;
    }
}

pub fn setup_test_env() {
    let _ = env_logger::builder().is_test(true).try_init();
}

pub fn auth_header(token: &str) -> (&'static str, String) {
    ("Authorization", format!("Bearer {}", token))
}

// Fixture helpers

pub async fn create_user(pool: &SqlitePool, name: &str, email: &str) -> User {
    let users = UserRepository::new(pool.clone());
    let mut tx = pool.begin().await.expect("Failed to open transaction");
    let user = users
        .create(
            &mut tx,
            UserInput {
                name: name.to_string(),
                email: email.to_string(),
            },
        )
        .await
        .expect("Failed to create test user");
    tx.commit().await.expect("Failed to commit test user");
    user
}

pub async fn create_staff(pool: &SqlitePool, name: &str, email: &str, password: &str) -> User {
    let hash = bcrypt::hash(password, 4).expect("Failed to hash password");
    UserRepository::new(pool.clone())
        .create_with_password(name, email, &hash, true)
        .await
        .expect("Failed to create staff user")
}

pub async fn create_login_user(pool: &SqlitePool, name: &str, email: &str, password: &str) -> User {
    let hash = bcrypt::hash(password, 4).expect("Failed to hash password");
    UserRepository::new(pool.clone())
        .create_with_password(name, email, &hash, false)
        .await
        .expect("Failed to create user")
}

pub async fn create_team(pool: &SqlitePool, name: &str, channel: &str) -> Team {
    TeamRepository::new(pool.clone())
        .create(TeamInput {
            name: name.to_string(),
            description: String::new(),
            channel: channel.to_string(),
            lat: None,
            lng: None,
            calendar_id: None,
        })
        .await
        .expect("Failed to create test team")
}

/// Team that owns a calendar, so materialized dates get attributed to it.
pub async fn create_team_with_calendar(pool: &SqlitePool, name: &str, channel: &str) -> (Team, i64) {
    let calendar = ScheduleRepository::new(pool.clone())
        .create_calendar(name)
        .await
        .expect("Failed to create calendar");
    let team = TeamRepository::new(pool.clone())
        .create(TeamInput {
            name: name.to_string(),
            description: String::new(),
            channel: channel.to_string(),
            lat: None,
            lng: None,
            calendar_id: Some(calendar.id),
        })
        .await
        .expect("Failed to create test team");
    (team, calendar.id)
}

pub async fn create_team_at(pool: &SqlitePool, name: &str, lat: f64, lng: f64) -> Team {
    TeamRepository::new(pool.clone())
        .create(TeamInput {
            name: name.to_string(),
            description: String::new(),
            channel: String::new(),
            lat: Some(lat),
            lng: Some(lng),
            calendar_id: None,
        })
        .await
        .expect("Failed to create test team")
}

/// One-off event with a concrete occurrence window.
pub async fn create_event(
    pool: &SqlitePool,
    name: &str,
    team_id: Option<i64>,
    start: DateTime<Utc>,
    end: DateTime<Utc>,
) -> EventWithWindow {
    let schedules = ScheduleRepository::new(pool.clone());
    let events = EventRepository::new(pool.clone());

    let definition = schedules
        .create_definition(None, name, "", start, end, None, None)
        .await
        .expect("Failed to create event definition");

    let mut tx = pool.begin().await.expect("Failed to open transaction");
    let occurrence = schedules
        .get_or_create_occurrence(&mut tx, definition.id, start, end)
        .await
        .expect("Failed to create occurrence");
    let event = events
        .create(&mut tx, name, "", None, None, team_id, occurrence.id)
        .await
        .expect("Failed to create event");
    tx.commit().await.expect("Failed to commit event");

    events
        .find_by_id(event.id)
        .await
        .expect("Failed to load event")
        .expect("Event missing after insert")
}

pub async fn create_location(pool: &SqlitePool, name: &str, email: &str) -> Location {
    let locations = LocationRepository::new(pool.clone());
    let mut tx = pool.begin().await.expect("Failed to open transaction");
    let today = Utc::now().date_naive();
    let location = locations
        .create(
            &mut tx,
            LocationInput {
                name: name.to_string(),
                address: "Somewhere 1".to_string(),
                description: String::new(),
                lat: None,
                lng: None,
                email: email.to_string(),
            },
            None,
            false,
            today,
        )
        .await
        .expect("Failed to create test location");
    tx.commit().await.expect("Failed to commit location");
    location
}

/// Adjust a location's validity window directly; the public API never
/// exposes this but the feed tests need expired and future windows.
pub async fn set_location_window(
    pool: &SqlitePool,
    location_id: i64,
    start: NaiveDate,
    end: Option<NaiveDate>,
) {
    sqlx::query(r#"UPDATE locations SET start = ?, "end" = ? WHERE id = ?"#)
        .bind(start)
        .bind(end)
        .bind(location_id)
        .execute(pool)
        .await
        .expect("Failed to update location window");
}

pub async fn count_rows(pool: &SqlitePool, table: &str) -> i64 {
    let query = format!("SELECT COUNT(*) FROM {}", table);
    sqlx::query_scalar::<_, i64>(&query)
        .fetch_one(pool)
        .await
        .expect("Failed to count rows")
}
