use std::sync::Arc;

use crate::services::notifier::Notifier;

/// Domain events that trigger asynchronous side effects. Events carry ids,
/// never live records: the job runs after the request and re-fetches its
/// subject, which may already be gone.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DomainEvent {
    TeamJoined { team_id: i64, user_id: i64 },
    LocationCreated { location_id: i64 },
    LocationReported { location_id: i64 },
    EventCreated { event_id: i64 },
    MaterialRequested { location_id: i64 },
    MaterialSent { location_id: i64 },
    EventMemberJoined { event_id: i64, user_id: i64 },
    EventMemberLeft { event_id: i64, user_id: i64 },
}

/// Per-request accumulator for domain events. Handlers push into the outbox
/// while the transaction is open and hand it to the dispatcher only after a
/// successful commit, so a rollback enqueues nothing.
#[derive(Debug, Default)]
pub struct Outbox {
    events: Vec<DomainEvent>,
}

impl Outbox {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, event: DomainEvent) {
        self.events.push(event);
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    pub fn drain(self) -> Vec<DomainEvent> {
        self.events
    }
}

/// Fans committed events out to background jobs. One detached task per
/// event; no ordering between jobs, failures are logged and dropped
/// (at-least-once side effects are acceptable here).
#[derive(Clone)]
pub struct Dispatcher {
    notifier: Arc<Notifier>,
}

impl Dispatcher {
    pub fn new(notifier: Arc<Notifier>) -> Self {
        Self { notifier }
    }

    pub fn dispatch(&self, outbox: Outbox) {
        for event in outbox.drain() {
            let notifier = self.notifier.clone();
            tokio::spawn(async move {
                if let Err(err) = notifier.handle(event).await {
                    log::error!("Notification job for {:?} failed: {}", event, err);
                }
            });
        }
    }
}
