use anyhow::Result;
use std::env;

#[derive(Debug, Clone)]
pub struct Config {
    pub database_url: String,
    pub jwt_secret: String,
    pub jwt_expiration_days: i64,
    pub host: String,
    pub port: u16,
    pub environment: String,
    /// Public base URL used to build absolute links in chat/mail text.
    pub site_url: String,
    /// Chat webhook endpoint; empty disables the chat sink (log-only).
    pub chat_webhook_url: String,
    pub chat_default_channel: String,
    pub chat_bot_name: String,
    /// Mail relay endpoint; empty disables the mail sink (log-only).
    pub mail_api_url: String,
    pub mail_from: String,
    pub mail_bulk_queue: String,
    /// Local UTC offset in minutes, used for feed dates and sign-up times.
    pub utc_offset_minutes: i32,
    pub feed_lookahead_days: i64,
    pub reminder_interval_secs: u64,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        // Load .env file if it exists
        dotenvy::dotenv().ok();
        Self::from_env_only()
    }

    /// Read configuration from environment variables only, without touching
    /// .env files. Used by tests that control the environment directly.
    pub fn from_env_only() -> Result<Self> {
        Ok(Config {
            database_url: env::var("DATABASE_URL")
                .unwrap_or_else(|_| "sqlite:collectmob.db".to_string()),
            jwt_secret: env::var("JWT_SECRET")
                .unwrap_or_else(|_| "change-this-secret-before-deploying-12345".to_string()),
            jwt_expiration_days: env::var("JWT_EXPIRATION_DAYS")
                .unwrap_or_else(|_| "30".to_string())
                .parse()
                .unwrap_or(30),
            host: env::var("HOST").unwrap_or_else(|_| "127.0.0.1".to_string()),
            port: env::var("PORT")
                .unwrap_or_else(|_| "8080".to_string())
                .parse()
                .unwrap_or(8080),
            environment: env::var("ENVIRONMENT").unwrap_or_else(|_| "development".to_string()),
            site_url: env::var("SITE_URL").unwrap_or_else(|_| "http://localhost:8080".to_string()),
            chat_webhook_url: env::var("CHAT_WEBHOOK_URL").unwrap_or_default(),
            chat_default_channel: env::var("CHAT_DEFAULT_CHANNEL")
                .unwrap_or_else(|_| "#organizing".to_string()),
            chat_bot_name: env::var("CHAT_BOT_NAME").unwrap_or_else(|_| "orga-bot".to_string()),
            mail_api_url: env::var("MAIL_API_URL").unwrap_or_default(),
            mail_from: env::var("MAIL_FROM").unwrap_or_else(|_| "noreply@localhost".to_string()),
            mail_bulk_queue: env::var("MAIL_BULK_QUEUE").unwrap_or_else(|_| "bulk".to_string()),
            utc_offset_minutes: env::var("UTC_OFFSET_MINUTES")
                .unwrap_or_else(|_| "60".to_string())
                .parse()
                .unwrap_or(60),
            feed_lookahead_days: env::var("FEED_LOOKAHEAD_DAYS")
                .unwrap_or_else(|_| "15".to_string())
                .parse()
                .unwrap_or(15),
            reminder_interval_secs: env::var("REMINDER_INTERVAL_SECS")
                .unwrap_or_else(|_| "3600".to_string())
                .parse()
                .unwrap_or(3600),
        })
    }

    pub fn is_production(&self) -> bool {
        self.environment == "production"
    }

    pub fn server_address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    /// Fixed local offset for rendering times to users.
    pub fn local_offset(&self) -> chrono::FixedOffset {
        chrono::FixedOffset::east_opt(self.utc_offset_minutes * 60)
            .unwrap_or_else(|| chrono::FixedOffset::east_opt(0).unwrap())
    }
}
