pub mod config;
pub mod incident;
pub mod serve;
pub mod task;
pub mod thread;
