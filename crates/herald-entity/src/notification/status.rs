//! Notification lifecycle status.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Summary status of a notification.
///
/// ```text
/// pending ──> processing ──> delivered
///                 ^    └──> partially_delivered ─┐
///                 |    └──> failed ──────────────┤
///                 └──────── retry re-entry ──────┘
/// ```
///
/// After a retry the terminal status is recomputed from the current
/// delivery attempts, so terminal states may also move between each other.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "notification_status", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum NotificationStatus {
    /// Persisted, waiting for immediate processing or its scheduled time.
    Pending,
    /// Claimed by the dispatcher; channel sends in flight.
    Processing,
    /// The required delivery succeeded.
    Delivered,
    /// Some channels succeeded and some failed.
    PartiallyDelivered,
    /// No channel succeeded.
    Failed,
}

impl NotificationStatus {
    /// Whether this status ends a processing cycle.
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            Self::Delivered | Self::PartiallyDelivered | Self::Failed
        )
    }

    /// Whether failed channel attempts of a notification in this state may
    /// be retried.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::PartiallyDelivered | Self::Failed)
    }

    /// Every status, in declaration order.
    pub const ALL: [NotificationStatus; 5] = [
        Self::Pending,
        Self::Processing,
        Self::Delivered,
        Self::PartiallyDelivered,
        Self::Failed,
    ];

    /// Whether moving from `self` to `next` is a legal transition.
    pub fn can_transition_to(&self, next: NotificationStatus) -> bool {
        match self {
            Self::Pending => next == Self::Processing,
            Self::Processing => next.is_terminal(),
            Self::PartiallyDelivered | Self::Failed => {
                next == Self::Processing || next.is_terminal()
            }
            Self::Delivered => false,
        }
    }

    /// Statuses from which `next` may be entered.
    pub fn predecessors(next: NotificationStatus) -> Vec<NotificationStatus> {
        Self::ALL
            .into_iter()
            .filter(|from| from.can_transition_to(next))
            .collect()
    }

    /// Return the status as a snake_case string.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Processing => "processing",
            Self::Delivered => "delivered",
            Self::PartiallyDelivered => "partially_delivered",
            Self::Failed => "failed",
        }
    }
}

impl fmt::Display for NotificationStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}
