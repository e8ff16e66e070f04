pub mod chat;
pub mod feed;
pub mod geo;
pub mod mailer;
pub mod notifier;
pub mod outbox;
pub mod schedule;
pub mod sweep;

pub use chat::{ChatMessage, ChatSink, SlackWebhook};
pub use feed::FeedService;
pub use mailer::{HttpMailer, MailSink};
pub use notifier::{Notifier, NotifierSettings};
pub use outbox::{Dispatcher, DomainEvent, Outbox};
pub use schedule::Scheduler;
