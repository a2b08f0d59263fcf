//! Typed event payloads and the notification content built from them.

use serde::de::DeserializeOwned;
use serde::Deserialize;
use sitewire_core::event::{DomainEvent, DomainEventType};
use sitewire_core::notification_type::{NotificationPriority, NotificationType};
use sitewire_core::types::DbId;

use super::TranslationError;

/// Longest comment excerpt quoted in a mention notification.
const MAX_EXCERPT_CHARS: usize = 140;

/// Name used when the event does not say who acted.
const UNKNOWN_ACTOR: &str = "Someone";

/// Who a notification goes to, before actor exclusion and activity filtering.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum Audience {
    Users { ids: Vec<DbId>, exclude_actor: bool },
    /// Every active member of the organization.
    Organization(DbId),
}

/// Notification content for one event, prior to recipient resolution.
#[derive(Debug, Clone, PartialEq)]
pub(crate) struct Draft {
    pub notification_type: NotificationType,
    pub title: String,
    pub message: String,
    pub priority: NotificationPriority,
    pub audience: Audience,
}

// ---------------------------------------------------------------------------
// Payloads
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize)]
struct TaskAssigned {
    assignee_ids: Vec<DbId>,
    task_title: String,
    #[serde(default)]
    project_name: Option<String>,
}

#[derive(Debug, Deserialize)]
struct TaskUnassigned {
    unassigned_ids: Vec<DbId>,
    task_title: String,
}

#[derive(Debug, Deserialize)]
struct TaskUpdated {
    assignee_ids: Vec<DbId>,
    task_title: String,
    #[serde(default)]
    changed_fields: Vec<String>,
}

#[derive(Debug, Deserialize)]
struct TaskDueSoon {
    assignee_ids: Vec<DbId>,
    task_title: String,
    /// Preformatted due date, e.g. `"Mar 14"`.
    #[serde(default)]
    due_date: Option<String>,
    #[serde(default)]
    overdue: bool,
}

#[derive(Debug, Deserialize)]
struct CommentPosted {
    mentioned_user_ids: Vec<DbId>,
    #[serde(default)]
    excerpt: Option<String>,
    #[serde(default)]
    context_title: Option<String>,
}

#[derive(Debug, Deserialize)]
struct Membership {
    member_id: DbId,
    project_name: String,
    #[serde(default)]
    role: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ApprovalRequested {
    approver_ids: Vec<DbId>,
    subject: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "snake_case")]
enum Decision {
    Approved,
    Rejected,
    ChangesRequested,
}

#[derive(Debug, Deserialize)]
struct ApprovalDecided {
    requester_id: DbId,
    subject: String,
    decision: Decision,
    #[serde(default)]
    comment: Option<String>,
}

#[derive(Debug, Deserialize)]
struct InvitationSent {
    /// Absent when the invitee has no account yet.
    #[serde(default)]
    invitee_user_id: Option<DbId>,
    organization_name: String,
}

#[derive(Debug, Deserialize)]
struct Announcement {
    organization_id: DbId,
    title: String,
    message: String,
    #[serde(default)]
    priority: Option<NotificationPriority>,
}

fn parse<T: DeserializeOwned>(
    kind: DomainEventType,
    payload: &serde_json::Value,
) -> Result<T, TranslationError> {
    T::deserialize(payload).map_err(|source| TranslationError::Payload {
        event_type: kind.as_str(),
        source,
    })
}

fn actor_name(event: &DomainEvent) -> &str {
    event
        .payload
        .get("actor_name")
        .and_then(|v| v.as_str())
        .filter(|s| !s.trim().is_empty())
        .unwrap_or(UNKNOWN_ACTOR)
}

fn excerpt(text: &str) -> String {
    let trimmed = text.trim();
    match trimmed.char_indices().nth(MAX_EXCERPT_CHARS) {
        Some((idx, _)) => format!("{}...", &trimmed[..idx]),
        None => trimmed.to_string(),
    }
}

// ---------------------------------------------------------------------------
// Draft construction
// ---------------------------------------------------------------------------

/// Build the notification content for an event.
///
/// Returns `Ok(None)` when the event is well formed but addresses nobody
/// who can receive notifications (an invitation to an email address
/// without an account).
pub(crate) fn draft(
    kind: DomainEventType,
    event: &DomainEvent,
) -> Result<Option<Draft>, TranslationError> {
    let notification_type = kind.notification_type();
    let default_priority = notification_type.template().default_priority;
    let actor = actor_name(event);
    let users = |ids: Vec<DbId>| Audience::Users {
        ids,
        exclude_actor: true,
    };

    let draft = match kind {
        DomainEventType::TaskAssigned => {
            let p: TaskAssigned = parse(kind, &event.payload)?;
            let mut message = format!("{actor} assigned you to \"{}\"", p.task_title);
            if let Some(project) = p.project_name {
                message.push_str(&format!(" in {project}"));
            }
            Draft {
                notification_type,
                title: "New task assigned".into(),
                message,
                priority: default_priority,
                audience: users(p.assignee_ids),
            }
        }
        DomainEventType::TaskUnassigned => {
            let p: TaskUnassigned = parse(kind, &event.payload)?;
            Draft {
                notification_type,
                title: "Task unassigned".into(),
                message: format!("{actor} removed you from \"{}\"", p.task_title),
                priority: default_priority,
                audience: users(p.unassigned_ids),
            }
        }
        DomainEventType::TaskUpdated => {
            let p: TaskUpdated = parse(kind, &event.payload)?;
            let mut message = format!("{actor} updated \"{}\"", p.task_title);
            if !p.changed_fields.is_empty() {
                message.push_str(&format!(" ({})", p.changed_fields.join(", ")));
            }
            Draft {
                notification_type,
                title: "Task updated".into(),
                message,
                priority: default_priority,
                audience: users(p.assignee_ids),
            }
        }
        DomainEventType::TaskDueSoon => {
            let p: TaskDueSoon = parse(kind, &event.payload)?;
            let (title, message, priority) = if p.overdue {
                (
                    "Task overdue",
                    format!("\"{}\" is past its due date", p.task_title),
                    NotificationPriority::Urgent,
                )
            } else {
                let when = p.due_date.as_deref().unwrap_or("soon");
                (
                    "Task due soon",
                    format!("\"{}\" is due {when}", p.task_title),
                    default_priority,
                )
            };
            Draft {
                notification_type,
                title: title.into(),
                message,
                priority,
                // Reminders are system generated; the actor field, if any,
                // is not a reason to skip an assignee.
                audience: Audience::Users {
                    ids: p.assignee_ids,
                    exclude_actor: false,
                },
            }
        }
        DomainEventType::CommentPosted => {
            let p: CommentPosted = parse(kind, &event.payload)?;
            let mut message = match p.context_title {
                Some(ctx) => format!("{actor} mentioned you on \"{ctx}\""),
                None => format!("{actor} mentioned you in a comment"),
            };
            if let Some(text) = p.excerpt.as_deref().filter(|t| !t.trim().is_empty()) {
                message.push_str(&format!(": \"{}\"", excerpt(text)));
            }
            Draft {
                notification_type,
                title: "You were mentioned".into(),
                message,
                priority: default_priority,
                audience: users(p.mentioned_user_ids),
            }
        }
        DomainEventType::MembershipAdded => {
            let p: Membership = parse(kind, &event.payload)?;
            let mut message = format!("{actor} added you to {}", p.project_name);
            if let Some(role) = p.role {
                message.push_str(&format!(" as {role}"));
            }
            Draft {
                notification_type,
                title: format!("Added to {}", p.project_name),
                message,
                priority: default_priority,
                audience: users(vec![p.member_id]),
            }
        }
        DomainEventType::MembershipRemoved => {
            let p: Membership = parse(kind, &event.payload)?;
            Draft {
                notification_type,
                title: format!("Removed from {}", p.project_name),
                message: format!("{actor} removed you from {}", p.project_name),
                priority: default_priority,
                audience: users(vec![p.member_id]),
            }
        }
        DomainEventType::ApprovalRequested => {
            let p: ApprovalRequested = parse(kind, &event.payload)?;
            Draft {
                notification_type,
                title: "Approval requested".into(),
                message: format!("{actor} requested your approval for \"{}\"", p.subject),
                priority: default_priority,
                audience: users(p.approver_ids),
            }
        }
        DomainEventType::ApprovalDecided => {
            let p: ApprovalDecided = parse(kind, &event.payload)?;
            let (title, verb, priority) = match p.decision {
                Decision::Approved => ("Approval granted", "approved", default_priority),
                Decision::Rejected => ("Approval rejected", "rejected", NotificationPriority::High),
                Decision::ChangesRequested => (
                    "Changes requested",
                    "requested changes to",
                    NotificationPriority::High,
                ),
            };
            let mut message = format!("{actor} {verb} \"{}\"", p.subject);
            if let Some(comment) = p.comment.as_deref().filter(|c| !c.trim().is_empty()) {
                message.push_str(&format!(": \"{}\"", excerpt(comment)));
            }
            Draft {
                notification_type,
                title: title.into(),
                message,
                priority,
                audience: users(vec![p.requester_id]),
            }
        }
        DomainEventType::InvitationSent => {
            let p: InvitationSent = parse(kind, &event.payload)?;
            let Some(invitee) = p.invitee_user_id else {
                tracing::info!(
                    organization = %p.organization_name,
                    "Invitee has no account, skipping in-app invitation"
                );
                return Ok(None);
            };
            Draft {
                notification_type,
                title: format!("Invitation to {}", p.organization_name),
                message: format!("{actor} invited you to join {}", p.organization_name),
                priority: default_priority,
                audience: users(vec![invitee]),
            }
        }
        DomainEventType::OrganizationAnnouncement => {
            let p: Announcement = parse(kind, &event.payload)?;
            Draft {
                notification_type,
                title: p.title,
                message: p.message,
                priority: p.priority.unwrap_or(default_priority),
                audience: Audience::Organization(p.organization_id),
            }
        }
    };

    Ok(Some(draft))
}

/// Sorted, de-duplicated recipient ids with the actor and invalid ids removed.
pub(crate) fn recipient_set(ids: &[DbId], exclude: Option<DbId>) -> Vec<DbId> {
    let mut out: Vec<DbId> = ids
        .iter()
        .copied()
        .filter(|id| *id > 0 && Some(*id) != exclude)
        .collect();
    out.sort_unstable();
    out.dedup();
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;
    use serde_json::json;

    fn event(kind: &str, payload: serde_json::Value) -> DomainEvent {
        DomainEvent::new(kind).with_actor(1).with_payload(payload)
    }

    fn build(e: &DomainEvent) -> Result<Option<Draft>, TranslationError> {
        draft(e.kind().unwrap(), e)
    }

    #[test]
    fn task_assignment_names_actor_and_project() {
        let e = event(
            "task.assigned",
            json!({"assignee_ids": [3, 2], "task_title": "Pour footing 3B",
                   "project_name": "Harbor Tower", "actor_name": "Dana"}),
        );
        let d = build(&e).unwrap().unwrap();
        assert_eq!(d.notification_type, NotificationType::TaskAssignment);
        assert_eq!(d.message, "Dana assigned you to \"Pour footing 3B\" in Harbor Tower");
        assert_eq!(d.priority, NotificationPriority::High);
        assert_eq!(
            d.audience,
            Audience::Users {
                ids: vec![3, 2],
                exclude_actor: true
            }
        );
    }

    #[test]
    fn missing_actor_name_falls_back() {
        let e = event(
            "approval.requested",
            json!({"approver_ids": [4], "subject": "Change order 12"}),
        );
        let d = build(&e).unwrap().unwrap();
        assert_eq!(d.message, "Someone requested your approval for \"Change order 12\"");
    }

    #[test]
    fn due_soon_does_not_exclude_actor_and_overdue_is_urgent() {
        let e = event(
            "task.due_soon",
            json!({"assignee_ids": [1], "task_title": "Inspect rebar", "overdue": true}),
        );
        let d = build(&e).unwrap().unwrap();
        assert_eq!(d.priority, NotificationPriority::Urgent);
        assert_matches!(d.audience, Audience::Users { exclude_actor: false, .. });
    }

    #[test]
    fn long_comment_is_excerpted() {
        let long = "a".repeat(500);
        let e = event(
            "comment.posted",
            json!({"mentioned_user_ids": [2], "excerpt": long}),
        );
        let d = build(&e).unwrap().unwrap();
        assert!(d.message.ends_with("...\""));
        assert!(d.message.len() < 200);
    }

    #[test]
    fn rejected_approval_is_high_priority() {
        let e = event(
            "approval.decided",
            json!({"requester_id": 5, "subject": "RFI 7", "decision": "rejected"}),
        );
        let d = build(&e).unwrap().unwrap();
        assert_eq!(d.title, "Approval rejected");
        assert_eq!(d.priority, NotificationPriority::High);
    }

    #[test]
    fn invitation_without_account_is_skipped() {
        let e = event("invitation.sent", json!({"organization_name": "Acme Builders"}));
        assert!(build(&e).unwrap().is_none());
    }

    #[test]
    fn announcement_targets_organization_with_override_priority() {
        let e = event(
            "organization.announcement",
            json!({"organization_id": 9, "title": "Site closed", "message": "Storm warning",
                   "priority": "urgent"}),
        );
        let d = build(&e).unwrap().unwrap();
        assert_eq!(d.audience, Audience::Organization(9));
        assert_eq!(d.priority, NotificationPriority::Urgent);
    }

    #[test]
    fn missing_required_field_is_a_payload_error() {
        let e = event("task.assigned", json!({"task_title": "No assignees"}));
        assert_matches!(
            build(&e),
            Err(TranslationError::Payload { event_type: "task.assigned", .. })
        );
    }

    #[test]
    fn recipient_set_is_sorted_deduped_and_excludes_actor() {
        assert_eq!(recipient_set(&[5, 3, 5, 1, 0, -2], Some(1)), vec![3, 5]);
        assert_eq!(recipient_set(&[7, 7], None), vec![7]);
        assert!(recipient_set(&[1], Some(1)).is_empty());
    }
}
