use std::sync::Arc;

pub mod auth;
pub mod config;
pub mod database;
pub mod error;
pub mod handlers;
pub mod services;

pub use auth::AuthService;
pub use config::Config;
pub use services::{Dispatcher, FeedService, Notifier, Scheduler};

use services::mailer::MailSink;

pub struct AppState {
    pub auth_service: AuthService,
    pub dispatcher: Dispatcher,
    pub mail: Arc<dyn MailSink>,
    pub mail_from: String,
    pub mail_bulk_queue: String,
}
