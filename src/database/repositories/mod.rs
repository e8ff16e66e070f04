pub mod event;
pub mod location;
pub mod result;
pub mod schedule;
pub mod team;
pub mod user;

// Re-export all repositories for easy importing
pub use event::EventRepository;
pub use location::LocationRepository;
pub use result::ResultRepository;
pub use schedule::ScheduleRepository;
pub use team::TeamRepository;
pub use user::UserRepository;
