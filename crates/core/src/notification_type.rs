//! Notification type catalogue and priorities.
//!
//! [`NotificationType`] is a closed enum; [`NotificationType::template`] is
//! an exhaustive match so adding a variant without a template fails to
//! compile.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::CoreError;

// ---------------------------------------------------------------------------
// Priority
// ---------------------------------------------------------------------------

/// Notification urgency. Queue entries are dispatched highest rank first.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NotificationPriority {
    Low,
    Medium,
    High,
    Urgent,
}

impl NotificationPriority {
    pub fn as_str(self) -> &'static str {
        match self {
            NotificationPriority::Low => "low",
            NotificationPriority::Medium => "medium",
            NotificationPriority::High => "high",
            NotificationPriority::Urgent => "urgent",
        }
    }

    /// Numeric rank stored in the queue tables' `priority` column.
    pub fn rank(self) -> i16 {
        match self {
            NotificationPriority::Low => 0,
            NotificationPriority::Medium => 1,
            NotificationPriority::High => 2,
            NotificationPriority::Urgent => 3,
        }
    }
}

impl fmt::Display for NotificationPriority {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for NotificationPriority {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "low" => Ok(NotificationPriority::Low),
            "medium" => Ok(NotificationPriority::Medium),
            "high" => Ok(NotificationPriority::High),
            "urgent" => Ok(NotificationPriority::Urgent),
            other => Err(CoreError::Validation(format!(
                "Unknown notification priority '{other}'"
            ))),
        }
    }
}

// ---------------------------------------------------------------------------
// NotificationType
// ---------------------------------------------------------------------------

/// Every kind of notification the engine can create.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NotificationType {
    TaskAssignment,
    TaskUnassignment,
    TaskUpdate,
    DueDateReminder,
    CommentMention,
    MembershipAdded,
    MembershipRemoved,
    ApprovalRequest,
    ApprovalDecision,
    OrganizationInvitation,
    OrganizationAnnouncement,
}

/// Static presentation and defaults for one [`NotificationType`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TypeTemplate {
    /// Human-readable label shown in the preferences screen.
    pub label: &'static str,
    /// Icon key understood by the web client.
    pub icon: &'static str,
    /// Priority used when the event does not override it.
    pub default_priority: NotificationPriority,
    /// Prefix prepended to the title to form the email subject.
    pub email_subject_prefix: &'static str,
    /// Days until the notification expires, if it expires at all.
    pub ttl_days: Option<i64>,
}

impl NotificationType {
    pub const ALL: [NotificationType; 11] = [
        NotificationType::TaskAssignment,
        NotificationType::TaskUnassignment,
        NotificationType::TaskUpdate,
        NotificationType::DueDateReminder,
        NotificationType::CommentMention,
        NotificationType::MembershipAdded,
        NotificationType::MembershipRemoved,
        NotificationType::ApprovalRequest,
        NotificationType::ApprovalDecision,
        NotificationType::OrganizationInvitation,
        NotificationType::OrganizationAnnouncement,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            NotificationType::TaskAssignment => "task_assignment",
            NotificationType::TaskUnassignment => "task_unassignment",
            NotificationType::TaskUpdate => "task_update",
            NotificationType::DueDateReminder => "due_date_reminder",
            NotificationType::CommentMention => "comment_mention",
            NotificationType::MembershipAdded => "membership_added",
            NotificationType::MembershipRemoved => "membership_removed",
            NotificationType::ApprovalRequest => "approval_request",
            NotificationType::ApprovalDecision => "approval_decision",
            NotificationType::OrganizationInvitation => "organization_invitation",
            NotificationType::OrganizationAnnouncement => "organization_announcement",
        }
    }

    pub fn template(self) -> TypeTemplate {
        use NotificationPriority::*;

        match self {
            NotificationType::TaskAssignment => TypeTemplate {
                label: "Task assigned to you",
                icon: "clipboard-check",
                default_priority: High,
                email_subject_prefix: "[Task]",
                ttl_days: None,
            },
            NotificationType::TaskUnassignment => TypeTemplate {
                label: "Task unassigned from you",
                icon: "clipboard-x",
                default_priority: Low,
                email_subject_prefix: "[Task]",
                ttl_days: Some(30),
            },
            NotificationType::TaskUpdate => TypeTemplate {
                label: "Task updated",
                icon: "clipboard-edit",
                default_priority: Medium,
                email_subject_prefix: "[Task]",
                ttl_days: Some(30),
            },
            NotificationType::DueDateReminder => TypeTemplate {
                label: "Due date reminder",
                icon: "alarm-clock",
                default_priority: High,
                email_subject_prefix: "[Reminder]",
                ttl_days: Some(7),
            },
            NotificationType::CommentMention => TypeTemplate {
                label: "Mentioned in a comment",
                icon: "at-sign",
                default_priority: Medium,
                email_subject_prefix: "[Comment]",
                ttl_days: None,
            },
            NotificationType::MembershipAdded => TypeTemplate {
                label: "Added to a team",
                icon: "user-plus",
                default_priority: Medium,
                email_subject_prefix: "[Team]",
                ttl_days: None,
            },
            NotificationType::MembershipRemoved => TypeTemplate {
                label: "Removed from a team",
                icon: "user-minus",
                default_priority: Medium,
                email_subject_prefix: "[Team]",
                ttl_days: None,
            },
            NotificationType::ApprovalRequest => TypeTemplate {
                label: "Approval requested",
                icon: "stamp",
                default_priority: High,
                email_subject_prefix: "[Approval]",
                ttl_days: None,
            },
            NotificationType::ApprovalDecision => TypeTemplate {
                label: "Approval decided",
                icon: "badge-check",
                default_priority: Medium,
                email_subject_prefix: "[Approval]",
                ttl_days: None,
            },
            NotificationType::OrganizationInvitation => TypeTemplate {
                label: "Organization invitation",
                icon: "mail-plus",
                default_priority: High,
                email_subject_prefix: "[Invitation]",
                ttl_days: Some(14),
            },
            NotificationType::OrganizationAnnouncement => TypeTemplate {
                label: "Organization announcement",
                icon: "megaphone",
                default_priority: Medium,
                email_subject_prefix: "[Announcement]",
                ttl_days: Some(30),
            },
        }
    }
}

impl fmt::Display for NotificationType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for NotificationType {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        NotificationType::ALL
            .into_iter()
            .find(|t| t.as_str() == s)
            .ok_or_else(|| CoreError::UnknownNotificationType(s.to_string()))
    }
}
