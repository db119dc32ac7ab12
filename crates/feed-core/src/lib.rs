pub mod cache;
pub mod clock;
pub mod config;
pub mod entity;
pub mod entity_link;
pub mod error;
pub mod feed;
pub mod filter;
pub mod generation;
pub mod guard;
pub mod incident;
pub mod io;
pub mod notification;
pub mod patch;
pub mod permission;
pub mod reaction;
pub mod reconcile;
pub mod reference;
pub mod suggestion;
pub mod task;
pub mod types;
pub mod wire;

pub use error::{FeedError, Result};
