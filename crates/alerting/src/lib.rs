//! Alerting System
//!
//! Turns raised wellness alerts into desktop notifications behind a
//! permission check and a cooldown gate.

mod gate;
mod notifier;

pub use gate::{AlertConfig, CooldownPolicy, NotificationGate, NotifyOutcome, SuppressReason};
pub use notifier::{CommandNotifier, LogNotifier, MemoryNotifier, Notifier, Permission};

use thiserror::Error;

/// Alerting error types
#[derive(Error, Debug)]
pub enum AlertError {
    #[error("Notification delivery failed: {0}")]
    Delivery(String),

    #[error("Notifications not supported: {0}")]
    Unsupported(String),
}
