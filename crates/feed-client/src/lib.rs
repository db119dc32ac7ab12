//! Async client for the catalog-feed API.
//!
//! ```text
//! FeedApi          typed REST calls, HTTP errors mapped to FeedError
//! TaskEngine       task lifecycle + entity cache for the viewed entity
//! Conversations    replies and reactions on any thread
//! IncidentManager  incident list filter, paging and row updates
//! ```

pub mod conversation;
pub mod http;
pub mod incidents;
pub mod lifecycle;
pub mod session;

pub use conversation::Conversations;
pub use http::FeedApi;
pub use incidents::IncidentManager;
pub use lifecycle::TaskEngine;
pub use session::Session;
