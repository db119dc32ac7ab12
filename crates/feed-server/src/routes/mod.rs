pub mod feed;
pub mod incidents;
pub mod search;
pub mod tables;
pub mod tasks;
