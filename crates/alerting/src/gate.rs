//! Notification Gate Implementation

use crate::notifier::{Notifier, Permission};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};

/// Which notifications share a cooldown clock
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CooldownPolicy {
    /// One clock for every alert kind
    #[default]
    Global,
    /// One clock per alert kind
    PerKind,
}

/// Alert configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AlertConfig {
    /// Minimum time between fired notifications (seconds)
    pub cooldown_seconds: u64,
    /// Cooldown sharing policy
    pub policy: CooldownPolicy,
}

impl Default for AlertConfig {
    fn default() -> Self {
        Self {
            cooldown_seconds: 15,
            policy: CooldownPolicy::Global,
        }
    }
}

impl AlertConfig {
    pub fn cooldown(&self) -> Duration {
        Duration::from_secs(self.cooldown_seconds)
    }
}

/// Why a notification did not go out
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SuppressReason {
    PermissionDenied,
    Cooldown,
    DeliveryFailed,
}

/// Result of one notification attempt
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NotifyOutcome {
    Fired,
    Suppressed(SuppressReason),
}

impl NotifyOutcome {
    pub fn fired(&self) -> bool {
        matches!(self, NotifyOutcome::Fired)
    }

    /// Get string representation
    pub fn as_str(&self) -> &'static str {
        match self {
            NotifyOutcome::Fired => "fired",
            NotifyOutcome::Suppressed(SuppressReason::PermissionDenied) => "permission_denied",
            NotifyOutcome::Suppressed(SuppressReason::Cooldown) => "cooldown",
            NotifyOutcome::Suppressed(SuppressReason::DeliveryFailed) => "delivery_failed",
        }
    }
}

/// Permission and cooldown gate in front of a notifier
pub struct NotificationGate<N: Notifier> {
    config: AlertConfig,
    notifier: N,
    permission: Permission,
    /// Last successful fire of any kind
    last_fired: Option<Instant>,
    /// Last successful fire per kind
    last_fired_by_kind: HashMap<String, Instant>,
    fired_count: usize,
}

impl<N: Notifier> NotificationGate<N> {
    /// Create a gate; permission starts undecided
    pub fn new(config: AlertConfig, notifier: N) -> Self {
        info!("Creating notification gate with config: {:?}", config);
        Self {
            config,
            notifier,
            permission: Permission::Default,
            last_fired: None,
            last_fired_by_kind: HashMap::new(),
            fired_count: 0,
        }
    }

    /// Ask the notifier for permission (done once at startup)
    pub fn request_permission(&mut self) -> Permission {
        self.permission = self.notifier.request_permission();
        info!("Notification permission: {:?}", self.permission);
        self.permission
    }

    pub fn permission(&self) -> Permission {
        self.permission
    }

    /// Check whether a notification of `kind` may fire at `now`
    pub fn should_fire(&self, kind: &str, now: Instant) -> bool {
        if self.permission != Permission::Granted {
            return false;
        }

        let last = match self.config.policy {
            CooldownPolicy::Global => self.last_fired,
            CooldownPolicy::PerKind => self.last_fired_by_kind.get(kind).copied(),
        };

        match last {
            Some(last) => now.saturating_duration_since(last) > self.config.cooldown(),
            None => true,
        }
    }

    /// Attempt a notification at an explicit instant
    pub fn notify_at(&mut self, kind: &str, title: &str, body: &str, now: Instant) -> NotifyOutcome {
        if self.permission != Permission::Granted {
            debug!("Notification suppressed: permission {:?}", self.permission);
            return NotifyOutcome::Suppressed(SuppressReason::PermissionDenied);
        }

        if !self.should_fire(kind, now) {
            debug!("Notification suppressed: {} in cooldown period", kind);
            return NotifyOutcome::Suppressed(SuppressReason::Cooldown);
        }

        if let Err(e) = self.notifier.show(title, body) {
            warn!("Notification delivery failed: {}", e);
            return NotifyOutcome::Suppressed(SuppressReason::DeliveryFailed);
        }

        self.last_fired = Some(now);
        self.last_fired_by_kind.insert(kind.to_string(), now);
        self.fired_count += 1;
        info!("Notification fired: {} (count: {})", kind, self.fired_count);
        NotifyOutcome::Fired
    }

    /// Attempt a notification now
    pub fn notify(&mut self, kind: &str, title: &str, body: &str) -> NotifyOutcome {
        self.notify_at(kind, title, body, Instant::now())
    }

    /// Notifications fired so far
    pub fn fired_count(&self) -> usize {
        self.fired_count
    }

    pub fn notifier(&self) -> &N {
        &self.notifier
    }
}
