//! # Notifications
//!
//! Transient user-facing notifications. A notification carrying a key replaces
//! whatever currently occupies that key's slot rather than queueing behind it.

use std::fmt;
use std::sync::{Arc, Mutex, PoisonError};

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Identifies a single notification slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct NotificationKey(Uuid);

impl NotificationKey {
    /// Allocate a fresh, unused slot key.
    #[must_use]
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for NotificationKey {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for NotificationKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Level {
    Loading,
    Success,
    Error,
    Blank,
}

/// Recovery action offered alongside a notification.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Action {
    /// Full page/application reload.
    Reload,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Notification {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub key: Option<NotificationKey>,
    pub level: Level,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub action: Option<Action>,

    /// Stays visible until replaced or dismissed.
    pub persistent: bool,
}

impl Notification {
    fn new(level: Level, message: impl Into<String>) -> Self {
        Self { key: None, level, message: message.into(), action: None, persistent: false }
    }

    #[must_use]
    pub fn loading(message: impl Into<String>) -> Self {
        Self::new(Level::Loading, message)
    }

    #[must_use]
    pub fn success(message: impl Into<String>) -> Self {
        Self::new(Level::Success, message)
    }

    #[must_use]
    pub fn error(message: impl Into<String>) -> Self {
        Self::new(Level::Error, message)
    }

    #[must_use]
    pub fn blank(message: impl Into<String>) -> Self {
        Self::new(Level::Blank, message)
    }

    #[must_use]
    pub const fn key(mut self, key: NotificationKey) -> Self {
        self.key = Some(key);
        self
    }

    #[must_use]
    pub const fn action(mut self, action: Action) -> Self {
        self.action = Some(action);
        self
    }

    #[must_use]
    pub const fn persistent(mut self) -> Self {
        self.persistent = true;
        self
    }
}

/// The `Notifier` trait defines how notifications reach the user.
pub trait Notifier: Send + Sync {
    /// Show a notification, replacing the slot named by its key (if any).
    fn notify(&self, notification: Notification);

    /// Remove the notification occupying `key`.
    fn dismiss(&self, key: NotificationKey);
}

impl<N: Notifier + ?Sized> Notifier for Arc<N> {
    fn notify(&self, notification: Notification) {
        (**self).notify(notification);
    }

    fn dismiss(&self, key: NotificationKey) {
        (**self).dismiss(key);
    }
}

/// In-memory keyed notification channel.
#[derive(Debug, Clone, Default)]
pub struct NotificationCenter {
    slots: Arc<Mutex<Vec<Notification>>>,
}

impl NotificationCenter {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Notifications currently on screen, oldest first.
    #[must_use]
    pub fn active(&self) -> Vec<Notification> {
        self.slots.lock().unwrap_or_else(PoisonError::into_inner).clone()
    }

    /// The notification occupying `key`'s slot.
    #[must_use]
    pub fn get(&self, key: NotificationKey) -> Option<Notification> {
        let slots = self.slots.lock().unwrap_or_else(PoisonError::into_inner);
        slots.iter().find(|n| n.key == Some(key)).cloned()
    }

    pub fn clear(&self) {
        self.slots.lock().unwrap_or_else(PoisonError::into_inner).clear();
    }
}

impl Notifier for NotificationCenter {
    fn notify(&self, notification: Notification) {
        let mut slots = self.slots.lock().unwrap_or_else(PoisonError::into_inner);

        if let Some(key) = notification.key
            && let Some(slot) = slots.iter_mut().find(|n| n.key == Some(key))
        {
            *slot = notification;
            return;
        }
        slots.push(notification);
    }

    fn dismiss(&self, key: NotificationKey) {
        let mut slots = self.slots.lock().unwrap_or_else(PoisonError::into_inner);
        slots.retain(|n| n.key != Some(key));
    }
}
