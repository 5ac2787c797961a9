//! Notification side channel.
//!
//! Two delivery paths exist: a native system notification, which needs
//! permission and may be missing entirely, and an in-app toast, which is
//! always shown. [`Alerts`] wraps a [`Notifier`] and applies that policy so
//! engines only ever say "notify".

use std::sync::{Arc, Mutex};

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Native notification permission as reported by the platform.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Permission {
    Granted,
    Denied,
    /// Not asked yet.
    Default,
    /// Platform has no native notifications.
    Unsupported,
}

/// Delivery channel of a notification.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NotificationChannel {
    Native,
    Toast,
}

/// Audio cue played on state transitions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Cue {
    SessionComplete,
    BreakComplete,
    Reminder,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Notification {
    pub title: String,
    pub body: String,
}

impl Notification {
    pub fn new(title: impl Into<String>, body: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            body: body.into(),
        }
    }
}

#[derive(Debug, Error)]
pub enum NotifyError {
    #[error("native notifications unavailable")]
    Unavailable,
    #[error("native notification failed: {0}")]
    Failed(String),
}

/// Platform port for user-visible acknowledgements.
pub trait Notifier: Send + Sync {
    fn permission(&self) -> Permission;

    /// Ask for native permission. Returns the resulting state.
    fn request_permission(&self) -> Permission {
        self.permission()
    }

    fn native(&self, notification: &Notification) -> Result<(), NotifyError>;

    fn toast(&self, notification: &Notification);

    fn cue(&self, _cue: Cue) {}
}

/// Dispatch policy over a [`Notifier`].
#[derive(Clone)]
pub struct Alerts {
    notifier: Arc<dyn Notifier>,
    native_enabled: bool,
}

impl Alerts {
    pub fn new(notifier: Arc<dyn Notifier>) -> Self {
        Self {
            notifier,
            native_enabled: true,
        }
    }

    pub fn with_native(mut self, enabled: bool) -> Self {
        self.native_enabled = enabled;
        self
    }

    /// Best-effort native notification, then the unconditional toast.
    ///
    /// Returns the channels that delivered.
    pub fn dispatch(&self, notification: &Notification) -> Vec<NotificationChannel> {
        let mut delivered = Vec::with_capacity(2);
        if self.native_enabled && self.notifier.permission() == Permission::Granted {
            match self.notifier.native(notification) {
                Ok(()) => delivered.push(NotificationChannel::Native),
                Err(e) => tracing::warn!(error = %e, title = %notification.title, "native notification skipped"),
            }
        }
        self.notifier.toast(notification);
        delivered.push(NotificationChannel::Toast);
        delivered
    }

    /// Toast only, for acknowledgements that never warrant a system popup.
    pub fn acknowledge(&self, notification: &Notification) {
        self.notifier.toast(notification);
    }

    pub fn request_permission(&self) -> Permission {
        if !self.native_enabled {
            return Permission::Denied;
        }
        match self.notifier.permission() {
            Permission::Default => self.notifier.request_permission(),
            other => other,
        }
    }

    pub fn cue(&self, cue: Cue) {
        self.notifier.cue(cue);
    }
}

impl std::fmt::Debug for Alerts {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Alerts")
            .field("native_enabled", &self.native_enabled)
            .finish_non_exhaustive()
    }
}

/// What a [`RecordingNotifier`] saw.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Delivery {
    Native(Notification),
    Toast(Notification),
    Cue(Cue),
}

/// Notifier that records deliveries, for tests and dry runs.
#[derive(Debug)]
pub struct RecordingNotifier {
    permission: Mutex<Permission>,
    grant_on_request: bool,
    fail_native: bool,
    log: Mutex<Vec<Delivery>>,
}

impl RecordingNotifier {
    pub fn new(permission: Permission) -> Self {
        Self {
            permission: Mutex::new(permission),
            grant_on_request: true,
            fail_native: false,
            log: Mutex::new(Vec::new()),
        }
    }

    /// Native calls return an error even when permission is granted.
    pub fn failing_native(mut self) -> Self {
        self.fail_native = true;
        self
    }

    /// A permission prompt is answered with "deny".
    pub fn denying_requests(mut self) -> Self {
        self.grant_on_request = false;
        self
    }

    pub fn deliveries(&self) -> Vec<Delivery> {
        self.log.lock().map(|l| l.clone()).unwrap_or_default()
    }

    pub fn toasts(&self) -> Vec<Notification> {
        self.deliveries()
            .into_iter()
            .filter_map(|d| match d {
                Delivery::Toast(n) => Some(n),
                _ => None,
            })
            .collect()
    }

    pub fn natives(&self) -> Vec<Notification> {
        self.deliveries()
            .into_iter()
            .filter_map(|d| match d {
                Delivery::Native(n) => Some(n),
                _ => None,
            })
            .collect()
    }

    pub fn cues(&self) -> Vec<Cue> {
        self.deliveries()
            .into_iter()
            .filter_map(|d| match d {
                Delivery::Cue(c) => Some(c),
                _ => None,
            })
            .collect()
    }

    fn push(&self, delivery: Delivery) {
        if let Ok(mut log) = self.log.lock() {
            log.push(delivery);
        }
    }
}

impl Notifier for RecordingNotifier {
    fn permission(&self) -> Permission {
        self.permission
            .lock()
            .map(|p| *p)
            .unwrap_or(Permission::Unsupported)
    }

    fn request_permission(&self) -> Permission {
        let Ok(mut permission) = self.permission.lock() else {
            return Permission::Unsupported;
        };
        if *permission == Permission::Default {
            *permission = if self.grant_on_request {
                Permission::Granted
            } else {
                Permission::Denied
            };
        }
        *permission
    }

    fn native(&self, notification: &Notification) -> Result<(), NotifyError> {
        if self.fail_native {
            return Err(NotifyError::Failed("simulated".into()));
        }
        self.push(Delivery::Native(notification.clone()));
        Ok(())
    }

    fn toast(&self, notification: &Notification) {
        self.push(Delivery::Toast(notification.clone()));
    }

    fn cue(&self, cue: Cue) {
        self.push(Delivery::Cue(cue));
    }
}
