//! Notification backends

use crate::AlertError;
use std::process::Command;
use std::sync::{Arc, Mutex};
use tokio::runtime::Handle;
use tracing::{debug, info, warn};

/// Notification permission state
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Permission {
    /// Not yet requested
    Default,
    Granted,
    Denied,
}

/// A notification backend
pub trait Notifier {
    /// Ask the platform for permission to show notifications
    fn request_permission(&mut self) -> Permission;

    /// Show one notification
    fn show(&mut self, title: &str, body: &str) -> Result<(), AlertError>;
}

/// Writes notifications to the log
#[derive(Debug, Clone, Default)]
pub struct LogNotifier;

impl Notifier for LogNotifier {
    fn request_permission(&mut self) -> Permission {
        Permission::Granted
    }

    fn show(&mut self, title: &str, body: &str) -> Result<(), AlertError> {
        info!(target: "notification", "{}: {}", title, body);
        Ok(())
    }
}

/// Desktop notifications through an external command such as `notify-send`.
///
/// `show` launches the command and returns; the exit status is collected on
/// the tokio runtime, so the caller's loop never waits for the desktop.
#[derive(Debug, Clone)]
pub struct CommandNotifier {
    program: String,
    app_name: String,
}

impl CommandNotifier {
    pub fn new(program: impl Into<String>, app_name: impl Into<String>) -> Self {
        Self {
            program: program.into(),
            app_name: app_name.into(),
        }
    }
}

impl Default for CommandNotifier {
    fn default() -> Self {
        Self::new("notify-send", "FaceTheFacts")
    }
}

impl Notifier for CommandNotifier {
    fn request_permission(&mut self) -> Permission {
        match Command::new(&self.program).arg("--version").output() {
            Ok(output) if output.status.success() => Permission::Granted,
            Ok(_) | Err(_) => {
                warn!("{} unavailable, desktop notifications disabled", self.program);
                Permission::Denied
            }
        }
    }

    fn show(&mut self, title: &str, body: &str) -> Result<(), AlertError> {
        let runtime = Handle::try_current()
            .map_err(|_| AlertError::Unsupported("desktop notifications need a tokio runtime".into()))?;

        let mut child = tokio::process::Command::new(&self.program)
            .arg("--app-name")
            .arg(&self.app_name)
            .arg(title)
            .arg(body)
            .spawn()
            .map_err(|e| AlertError::Delivery(format!("{}: {}", self.program, e)))?;

        let program = self.program.clone();
        runtime.spawn(async move {
            match child.wait().await {
                Ok(status) if status.success() => debug!("{} finished", program),
                Ok(status) => warn!("{} exited with {}", program, status),
                Err(e) => warn!("{} could not be awaited: {}", program, e),
            }
        });
        Ok(())
    }
}

/// Keeps notifications in memory; clones share the same record
#[derive(Debug, Clone)]
pub struct MemoryNotifier {
    permission: Permission,
    sent: Arc<Mutex<Vec<(String, String)>>>,
    fail_next: Arc<Mutex<bool>>,
}

impl MemoryNotifier {
    pub fn granted() -> Self {
        Self::with_permission(Permission::Granted)
    }

    pub fn denied() -> Self {
        Self::with_permission(Permission::Denied)
    }

    fn with_permission(permission: Permission) -> Self {
        Self {
            permission,
            sent: Arc::new(Mutex::new(Vec::new())),
            fail_next: Arc::new(Mutex::new(false)),
        }
    }

    /// Make the next `show` fail
    pub fn fail_next(&self) {
        if let Ok(mut flag) = self.fail_next.lock() {
            *flag = true;
        }
    }

    /// (title, body) of every delivered notification
    pub fn sent(&self) -> Vec<(String, String)> {
        self.sent.lock().map(|s| s.clone()).unwrap_or_default()
    }
}

impl Notifier for MemoryNotifier {
    fn request_permission(&mut self) -> Permission {
        self.permission
    }

    fn show(&mut self, title: &str, body: &str) -> Result<(), AlertError> {
        let mut fail = self
            .fail_next
            .lock()
            .map_err(|e| AlertError::Delivery(format!("Lock error: {}", e)))?;
        if *fail {
            *fail = false;
            return Err(AlertError::Delivery("injected failure".into()));
        }

        self.sent
            .lock()
            .map_err(|e| AlertError::Delivery(format!("Lock error: {}", e)))?
            .push((title.to_string(), body.to_string()));
        Ok(())
    }
}
