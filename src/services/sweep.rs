use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;

use crate::services::notifier::Notifier;

/// Periodic reminder sweep. Runs for the lifetime of the server; each tick
/// scans for events starting a day ahead and fires their reminders.
pub async fn run_reminder_loop(notifier: Arc<Notifier>, interval_secs: u64) {
    let mut ticker = tokio::time::interval(Duration::from_secs(interval_secs));
    // The first tick fires immediately; skip it so a restart does not
    // re-send reminders outside the hourly cadence.
    ticker.tick().await;

    loop {
        ticker.tick().await;
        log::debug!("Running upcoming-event reminder sweep");
        if let Err(err) = notifier.remind_upcoming_events(Utc::now()).await {
            log::error!("Reminder sweep failed: {}", err);
        }
    }
}
