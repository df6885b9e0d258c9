//! Notification queue: the console's render feed and audit trail.
//!
//! History is kept newest first and never trimmed; the view only shows the newest
//! `display_window` entries.

use std::collections::VecDeque;
use std::fmt;

use bevy_ecs::prelude::Resource;
use serde::Serialize;

use crate::clock::{ONE_HOUR_MS, ONE_MIN_MS};
use crate::ecs::RideId;

pub const DEFAULT_DISPLAY_WINDOW: usize = 5;

/// Time-based id: wall-clock milliseconds at creation, bumped past the previous id on collision.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct NotificationId(pub u64);

impl fmt::Display for NotificationId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum NotificationCategory {
    System,
    RideRequest,
    RideAccepted,
    RideRejected,
    RideCompleted,
    RideCancelled,
    ReassignmentRequested,
    ReassignmentSuccess,
    ReassignmentFailed,
    Support,
}

impl NotificationCategory {
    pub fn is_reassignment(self) -> bool {
        matches!(
            self,
            Self::ReassignmentRequested | Self::ReassignmentSuccess | Self::ReassignmentFailed
        )
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Priority {
    Info,
    Success,
    Warning,
    Urgent,
    Emergency,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum NotificationAction {
    Accept,
    Reject,
    View,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Notification {
    pub id: NotificationId,
    pub category: NotificationCategory,
    pub title: String,
    pub message: String,
    pub priority: Priority,
    pub created_at_ms: i64,
    pub read: bool,
    /// Only ride requests carry actions.
    pub actions: Vec<NotificationAction>,
    pub ride: Option<RideId>,
}

#[derive(Debug, Resource)]
pub struct NotificationQueue {
    entries: VecDeque<Notification>,
    last_id: u64,
    display_window: usize,
}

impl Default for NotificationQueue {
    fn default() -> Self {
        Self::with_display_window(DEFAULT_DISPLAY_WINDOW)
    }
}

impl NotificationQueue {
    pub fn with_display_window(display_window: usize) -> Self {
        Self {
            entries: VecDeque::new(),
            last_id: 0,
            display_window,
        }
    }

    pub fn push(
        &mut self,
        now_ms: i64,
        category: NotificationCategory,
        title: impl Into<String>,
        message: impl Into<String>,
        priority: Priority,
    ) -> NotificationId {
        self.insert(now_ms, category, title.into(), message.into(), priority, None)
    }

    pub fn push_for_ride(
        &mut self,
        now_ms: i64,
        ride: RideId,
        category: NotificationCategory,
        title: impl Into<String>,
        message: impl Into<String>,
        priority: Priority,
    ) -> NotificationId {
        self.insert(
            now_ms,
            category,
            title.into(),
            message.into(),
            priority,
            Some(ride),
        )
    }

    fn insert(
        &mut self,
        now_ms: i64,
        category: NotificationCategory,
        title: String,
        message: String,
        priority: Priority,
        ride: Option<RideId>,
    ) -> NotificationId {
        let stamp = u64::try_from(now_ms).unwrap_or(0);
        self.last_id = stamp.max(self.last_id + 1);
        let id = NotificationId(self.last_id);
        let actions = if category == NotificationCategory::RideRequest {
            vec![NotificationAction::Accept, NotificationAction::Reject]
        } else {
            Vec::new()
        };
        self.entries.push_front(Notification {
            id,
            category,
            title,
            message,
            priority,
            created_at_ms: now_ms,
            read: false,
            actions,
            ride,
        });
        id
    }

    pub fn get(&self, id: NotificationId) -> Option<&Notification> {
        self.entries.iter().find(|n| n.id == id)
    }

    /// Returns `false` for an unknown id.
    pub fn mark_read(&mut self, id: NotificationId) -> bool {
        match self.entries.iter_mut().find(|n| n.id == id) {
            Some(notification) => {
                notification.read = true;
                true
            }
            None => false,
        }
    }

    /// Removes one notification; used after its action has been handled.
    pub fn take(&mut self, id: NotificationId) -> Option<Notification> {
        let idx = self.entries.iter().position(|n| n.id == id)?;
        self.entries.remove(idx)
    }

    pub fn clear_all(&mut self) {
        self.entries.clear();
    }

    /// The rendered view: newest first, at most `display_window` entries.
    pub fn recent(&self) -> impl Iterator<Item = &Notification> {
        self.entries.iter().take(self.display_window)
    }

    /// Full history, newest first.
    pub fn history(&self) -> impl Iterator<Item = &Notification> {
        self.entries.iter()
    }

    pub fn latest(&self) -> Option<&Notification> {
        self.entries.front()
    }

    pub fn latest_of(&self, category: NotificationCategory) -> Option<&Notification> {
        self.entries.iter().find(|n| n.category == category)
    }

    pub fn count_of(&self, category: NotificationCategory) -> usize {
        self.entries.iter().filter(|n| n.category == category).count()
    }

    pub fn unread_count(&self) -> usize {
        self.entries.iter().filter(|n| !n.read).count()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn display_window(&self) -> usize {
        self.display_window
    }
}

/// Relative age label: "Just now", "12m ago", "3h ago", "2d ago".
pub fn time_ago_label(created_at_ms: i64, now_ms: i64) -> String {
    let elapsed = u64::try_from(now_ms.saturating_sub(created_at_ms)).unwrap_or(0);
    let minutes = elapsed / ONE_MIN_MS;
    let hours = elapsed / ONE_HOUR_MS;
    if minutes < 1 {
        "Just now".to_string()
    } else if minutes < 60 {
        format!("{minutes}m ago")
    } else if hours < 24 {
        format!("{hours}h ago")
    } else {
        format!("{}d ago", hours / 24)
    }
}
