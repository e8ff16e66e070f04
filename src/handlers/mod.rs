pub mod admin;
pub mod auth;
pub mod events;
pub mod feed;
pub mod locations;
pub mod results;
pub mod shared;
pub mod teams;
