pub mod config;
pub mod hooks;
pub mod log;
pub mod notifier;
pub mod runtime;
pub mod submission;
pub mod title;
pub mod transport;
