pub mod event;
pub mod location;
pub mod result;
pub mod schedule;
pub mod team;
pub mod user;

// Re-export all models for easy importing
pub use event::*;
pub use location::*;
pub use result::*;
pub use schedule::*;
pub use team::*;
pub use user::*;
