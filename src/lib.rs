//! Batch transactional email dispatcher.
//!
//! This crate provides functionality to:
//! - Classify raw recipient input into valid and invalid addresses
//! - Send individual messages through a delivery API with timeout and bounded retry
//! - Fan batches of sends out with bounded concurrency and inter-batch delay
//! - Render a deterministic aggregate report and forward it to a notification sink

pub mod address;
pub mod config;
pub mod dispatcher;
pub mod engine;
pub mod error;
pub mod logging;
pub mod message;
pub mod notify;
pub mod report;
pub mod schedule;
pub mod sender;
pub mod server;

// Re-export core types
pub use address::{Classification, Recipient};
pub use config::Config;
pub use dispatcher::{BatchPolicy, DispatchStats, Dispatcher, SendOutcome};
pub use engine::{Engine, RunOutcome, Submission};
pub use error::{ConfigError, FatalError, SendError, ValidationError};
pub use message::Message;
pub use notify::NotificationSink;
pub use sender::{ApiSender, RetryPolicy, Sender};
