use anyhow::Result;
use async_trait::async_trait;
use serde::Serialize;

use crate::database::models::User;
use crate::database::repositories::UserRepository;

/// Outbound delivery lane. Bulk mail goes through a separate queue so large
/// fan-outs never delay transactional mail.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeliveryLane {
    Priority,
    Bulk,
}

#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct Email {
    pub to: String,
    pub from: String,
    pub subject: String,
    pub body: String,
    pub headers: Vec<(String, String)>,
    /// Queue name; empty means the priority lane.
    pub queue: String,
}

#[async_trait]
pub trait MailSink: Send + Sync {
    async fn send(&self, email: Email) -> Result<()>;
}

/// HTTP mail relay. Log-only when no endpoint is configured.
pub struct HttpMailer {
    client: reqwest::Client,
    api_url: String,
}

impl HttpMailer {
    pub fn new(api_url: String) -> Self {
        Self {
            client: reqwest::Client::new(),
            api_url,
        }
    }
}

#[async_trait]
impl MailSink for HttpMailer {
    async fn send(&self, email: Email) -> Result<()> {
        log::info!("Sending mail to {}: {}", email.to, email.subject);
        if self.api_url.is_empty() {
            return Ok(());
        }

        self.client
            .post(&self.api_url)
            .json(&email)
            .send()
            .await?
            .error_for_status()?;

        Ok(())
    }
}

/// Compose an outbound mail. Every message gets auto-response-suppression
/// headers so out-of-office replies never bounce back at us.
pub fn build_email(
    to: &str,
    from: &str,
    subject: &str,
    body: &str,
    lane: DeliveryLane,
    bulk_queue: &str,
) -> Email {
    let queue = match lane {
        DeliveryLane::Priority => String::new(),
        DeliveryLane::Bulk => bulk_queue.to_string(),
    };
    Email {
        to: to.to_string(),
        from: from.to_string(),
        subject: subject.to_string(),
        body: body.to_string(),
        headers: vec![
            ("X-Auto-Response-Suppress".to_string(), "All".to_string()),
            ("Auto-Submitted".to_string(), "auto-generated".to_string()),
        ],
        queue,
    }
}

const BULK_CHUNK_SIZE: usize = 200;

/// Resolve recipients in chunks and push one bulk-lane mail per user.
/// Inactive users and users without an address are skipped.
pub async fn send_bulk_mail(
    users: &UserRepository,
    sink: &dyn MailSink,
    user_ids: &[i64],
    subject: &str,
    body: &str,
    from: &str,
    bulk_queue: &str,
) -> Result<usize> {
    let mut sent = 0;
    for chunk in user_ids.chunks(BULK_CHUNK_SIZE) {
        let recipients = users.find_by_ids(chunk).await?;
        for user in recipients {
            if !deliverable(&user) {
                continue;
            }
            sink.send(build_email(
                &user.email,
                from,
                subject,
                body,
                DeliveryLane::Bulk,
                bulk_queue,
            ))
            .await?;
            sent += 1;
        }
    }
    Ok(sent)
}

pub fn deliverable(user: &User) -> bool {
    user.is_active && !user.email.is_empty()
}
