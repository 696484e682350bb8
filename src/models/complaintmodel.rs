use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::types::BigDecimal;
use uuid::Uuid;

#[derive(Debug, Serialize, Deserialize, Clone, Copy, sqlx::Type, PartialEq, Eq)]
#[sqlx(type_name = "complaint_status", rename_all = "snake_case")]
#[serde(rename_all = "kebab-case")]
pub enum ComplaintStatus {
    Pending,
    InProgress,
    AwaitingConfirmation,
    Resolved,
    Rejected,
    ServiceUnavailable,
}

/// Who is asking for a complaint transition.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ComplaintActor {
    Staff,
    Owner,
    /// Cascades and background sweeps.
    System,
}

impl ComplaintStatus {
    pub fn to_str(&self) -> &str {
        match self {
            ComplaintStatus::Pending => "pending",
            ComplaintStatus::InProgress => "in-progress",
            ComplaintStatus::AwaitingConfirmation => "awaiting-confirmation",
            ComplaintStatus::Resolved => "resolved",
            ComplaintStatus::Rejected => "rejected",
            ComplaintStatus::ServiceUnavailable => "service-unavailable",
        }
    }

    /// Unresolved complaints block deletion of the user or service they touch.
    pub fn is_active(&self) -> bool {
        matches!(
            self,
            ComplaintStatus::Pending
                | ComplaintStatus::InProgress
                | ComplaintStatus::AwaitingConfirmation
        )
    }

    pub fn active_statuses() -> [ComplaintStatus; 3] {
        [
            ComplaintStatus::Pending,
            ComplaintStatus::InProgress,
            ComplaintStatus::AwaitingConfirmation,
        ]
    }

    pub fn can_transition(&self, to: ComplaintStatus, actor: ComplaintActor) -> bool {
        use ComplaintStatus::*;

        match actor {
            ComplaintActor::Staff => matches!(
                (self, to),
                (Pending, InProgress)
                    | (Pending, AwaitingConfirmation)
                    | (Pending, Rejected)
                    | (InProgress, AwaitingConfirmation)
                    | (InProgress, Rejected)
            ),
            ComplaintActor::Owner => matches!(
                (self, to),
                (AwaitingConfirmation, Resolved) | (AwaitingConfirmation, InProgress)
            ),
            ComplaintActor::System => {
                (self.is_active() && to == ServiceUnavailable)
                    || (*self == AwaitingConfirmation && to == Resolved)
            }
        }
    }
}

#[derive(Debug, Serialize, Deserialize, sqlx::FromRow, Clone)]
pub struct Complaint {
    pub id: Uuid,
    pub user_id: Uuid,
    pub service_id: Option<Uuid>,
    pub booking_id: Option<Uuid>,
    pub subject: String,
    pub description: String,
    pub status: ComplaintStatus,
    pub admin_response: Option<String>,
    pub resolved_at: Option<DateTime<Utc>>,
    pub snapshot_service_name: String,
    pub snapshot_service_category: String,
    pub snapshot_service_price: BigDecimal,
    pub snapshot_company_name: String,
    #[serde(rename = "createdAt")]
    pub created_at: DateTime<Utc>,
    #[serde(rename = "updatedAt")]
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Serialize, Deserialize, sqlx::FromRow, Clone)]
pub struct ComplaintImage {
    pub id: Uuid,
    pub complaint_id: Uuid,
    pub url: String,
    pub delete_handle: Option<String>,
}

/// Service details frozen into a complaint when it is filed.
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct ServiceSnapshot {
    pub service_name: String,
    pub service_category: String,
    pub service_price: BigDecimal,
    pub company_name: String,
}

#[cfg(test)]
mod tests {
    use super::*;
    use ComplaintStatus::*;

    const ALL: [ComplaintStatus; 6] = [
        Pending,
        InProgress,
        AwaitingConfirmation,
        Resolved,
        Rejected,
        ServiceUnavailable,
    ];

    #[test]
    fn staff_moves_work_forward() {
        assert!(Pending.can_transition(InProgress, ComplaintActor::Staff));
        assert!(Pending.can_transition(Rejected, ComplaintActor::Staff));
        assert!(InProgress.can_transition(AwaitingConfirmation, ComplaintActor::Staff));
        assert!(!InProgress.can_transition(Resolved, ComplaintActor::Staff));
        assert!(!AwaitingConfirmation.can_transition(Resolved, ComplaintActor::Staff));
        assert!(!Resolved.can_transition(InProgress, ComplaintActor::Staff));
    }

    #[test]
    fn owner_confirms_or_reopens() {
        assert!(AwaitingConfirmation.can_transition(Resolved, ComplaintActor::Owner));
        assert!(AwaitingConfirmation.can_transition(InProgress, ComplaintActor::Owner));
        assert!(!Pending.can_transition(Resolved, ComplaintActor::Owner));
        assert!(!InProgress.can_transition(Resolved, ComplaintActor::Owner));
    }

    #[test]
    fn system_only_closes_active_complaints() {
        for from in ALL {
            assert_eq!(
                from.can_transition(ServiceUnavailable, ComplaintActor::System),
                from.is_active()
            );
        }
        assert!(AwaitingConfirmation.can_transition(Resolved, ComplaintActor::System));
        assert!(!Pending.can_transition(Resolved, ComplaintActor::System));
    }

    #[test]
    fn terminal_states_are_final() {
        for from in ALL.into_iter().filter(|s| !s.is_active()) {
            for to in ALL {
                assert!(!from.can_transition(to, ComplaintActor::Staff));
                assert!(!from.can_transition(to, ComplaintActor::Owner));
                assert!(!from.can_transition(to, ComplaintActor::System));
            }
        }
    }

    #[test]
    fn wire_names_are_kebab_case() {
        assert_eq!(
            serde_json::to_string(&AwaitingConfirmation).unwrap(),
            "\"awaiting-confirmation\""
        );
        let parsed: ComplaintStatus = serde_json::from_str("\"service-unavailable\"").unwrap();
        assert_eq!(parsed, ServiceUnavailable);
        assert_eq!(InProgress.to_str(), "in-progress");
    }
}
