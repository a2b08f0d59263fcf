//! Domain event envelope consumed by the notification translator.
//!
//! Business operations (task mutation, approvals, invitations, membership)
//! emit a [`DomainEvent`] after their write commits. The envelope is
//! deliberately loose (`event_type` is a string, `payload` is free-form
//! JSON) so that an unknown or malformed event is a translation problem the
//! notification engine logs, not a deserialization failure the caller sees.

use std::fmt;
use std::str::FromStr;

use chrono::Utc;
use serde::{Deserialize, Serialize};

use crate::error::CoreError;
use crate::notification_type::NotificationType;
use crate::types::{DbId, Timestamp};

// ---------------------------------------------------------------------------
// Event types
// ---------------------------------------------------------------------------

/// Every domain event the translator understands.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DomainEventType {
    TaskAssigned,
    TaskUnassigned,
    TaskUpdated,
    TaskDueSoon,
    CommentPosted,
    MembershipAdded,
    MembershipRemoved,
    ApprovalRequested,
    ApprovalDecided,
    InvitationSent,
    OrganizationAnnouncement,
}

impl DomainEventType {
    pub const ALL: [DomainEventType; 11] = [
        DomainEventType::TaskAssigned,
        DomainEventType::TaskUnassigned,
        DomainEventType::TaskUpdated,
        DomainEventType::TaskDueSoon,
        DomainEventType::CommentPosted,
        DomainEventType::MembershipAdded,
        DomainEventType::MembershipRemoved,
        DomainEventType::ApprovalRequested,
        DomainEventType::ApprovalDecided,
        DomainEventType::InvitationSent,
        DomainEventType::OrganizationAnnouncement,
    ];

    /// Dot-separated wire name, e.g. `"task.assigned"`.
    pub fn as_str(self) -> &'static str {
        match self {
            DomainEventType::TaskAssigned => "task.assigned",
            DomainEventType::TaskUnassigned => "task.unassigned",
            DomainEventType::TaskUpdated => "task.updated",
            DomainEventType::TaskDueSoon => "task.due_soon",
            DomainEventType::CommentPosted => "comment.posted",
            DomainEventType::MembershipAdded => "membership.added",
            DomainEventType::MembershipRemoved => "membership.removed",
            DomainEventType::ApprovalRequested => "approval.requested",
            DomainEventType::ApprovalDecided => "approval.decided",
            DomainEventType::InvitationSent => "invitation.sent",
            DomainEventType::OrganizationAnnouncement => "organization.announcement",
        }
    }

    /// The notification type produced for this event.
    pub fn notification_type(self) -> NotificationType {
        match self {
            DomainEventType::TaskAssigned => NotificationType::TaskAssignment,
            DomainEventType::TaskUnassigned => NotificationType::TaskUnassignment,
            DomainEventType::TaskUpdated => NotificationType::TaskUpdate,
            DomainEventType::TaskDueSoon => NotificationType::DueDateReminder,
            DomainEventType::CommentPosted => NotificationType::CommentMention,
            DomainEventType::MembershipAdded => NotificationType::MembershipAdded,
            DomainEventType::MembershipRemoved => NotificationType::MembershipRemoved,
            DomainEventType::ApprovalRequested => NotificationType::ApprovalRequest,
            DomainEventType::ApprovalDecided => NotificationType::ApprovalDecision,
            DomainEventType::InvitationSent => NotificationType::OrganizationInvitation,
            DomainEventType::OrganizationAnnouncement => {
                NotificationType::OrganizationAnnouncement
            }
        }
    }
}

impl fmt::Display for DomainEventType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for DomainEventType {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        DomainEventType::ALL
            .into_iter()
            .find(|t| t.as_str() == s)
            .ok_or_else(|| CoreError::Validation(format!("Unknown event type '{s}'")))
    }
}

// ---------------------------------------------------------------------------
// Entity reference
// ---------------------------------------------------------------------------

/// Entity kinds a notification may link to.
pub const KNOWN_ENTITY_TYPES: [&str; 7] = [
    "task",
    "project",
    "comment",
    "approval",
    "invitation",
    "organization",
    "form",
];

/// Pointer from a notification to the business entity it concerns.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EntityRef {
    pub entity_type: String,
    pub entity_id: DbId,
}

impl EntityRef {
    pub fn new(entity_type: impl Into<String>, entity_id: DbId) -> Self {
        Self {
            entity_type: entity_type.into(),
            entity_id,
        }
    }

    /// Reject unknown entity kinds and non-positive ids.
    pub fn validate(&self) -> Result<(), CoreError> {
        if !KNOWN_ENTITY_TYPES.contains(&self.entity_type.as_str()) {
            return Err(CoreError::Validation(format!(
                "Unknown entity type '{}'",
                self.entity_type
            )));
        }
        if self.entity_id <= 0 {
            return Err(CoreError::Validation(format!(
                "Invalid {} id {}",
                self.entity_type, self.entity_id
            )));
        }
        Ok(())
    }

    /// Client route for the entity, e.g. `/tasks/42`.
    pub fn action_path(&self) -> String {
        format!("/{}s/{}", self.entity_type, self.entity_id)
    }
}

// ---------------------------------------------------------------------------
// DomainEvent
// ---------------------------------------------------------------------------

/// A business event raised after its originating write committed.
///
/// Constructed via [`DomainEvent::new`] and enriched with
/// [`with_actor`](DomainEvent::with_actor),
/// [`with_target`](DomainEvent::with_target) and
/// [`with_payload`](DomainEvent::with_payload).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DomainEvent {
    /// Dot-separated event name, e.g. `"task.assigned"`.
    pub event_type: String,

    /// The user who performed the action, excluded from recipients.
    #[serde(default)]
    pub actor_id: Option<DbId>,

    /// The entity the event is about.
    #[serde(default)]
    pub target_entity: Option<EntityRef>,

    /// Event-specific data (recipient ids, titles, names).
    #[serde(default = "empty_object")]
    pub payload: serde_json::Value,

    /// When the business operation happened (UTC).
    #[serde(default = "Utc::now")]
    pub occurred_at: Timestamp,
}

fn empty_object() -> serde_json::Value {
    serde_json::Value::Object(Default::default())
}

impl DomainEvent {
    pub fn new(event_type: impl Into<String>) -> Self {
        Self {
            event_type: event_type.into(),
            actor_id: None,
            target_entity: None,
            payload: empty_object(),
            occurred_at: Utc::now(),
        }
    }

    pub fn with_actor(mut self, user_id: DbId) -> Self {
        self.actor_id = Some(user_id);
        self
    }

    pub fn with_target(mut self, entity_type: impl Into<String>, entity_id: DbId) -> Self {
        self.target_entity = Some(EntityRef::new(entity_type, entity_id));
        self
    }

    pub fn with_payload(mut self, payload: serde_json::Value) -> Self {
        self.payload = payload;
        self
    }

    /// Parse the string event type into the closed enum.
    pub fn kind(&self) -> Result<DomainEventType, CoreError> {
        self.event_type.parse()
    }
}
