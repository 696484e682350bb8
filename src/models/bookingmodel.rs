use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Serialize, Deserialize, Clone, Copy, sqlx::Type, PartialEq, Eq)]
#[sqlx(type_name = "booking_status", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum BookingStatus {
    Pending,
    Accepted,
    Rejected,
    Completed,
    Cancelled,
}

/// Who is asking for a booking transition.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BookingActor {
    /// Owner of the company the booking was made with.
    Provider,
    /// The user who made the booking.
    Customer,
}

impl BookingStatus {
    pub fn to_str(&self) -> &str {
        match self {
            BookingStatus::Pending => "pending",
            BookingStatus::Accepted => "accepted",
            BookingStatus::Rejected => "rejected",
            BookingStatus::Completed => "completed",
            BookingStatus::Cancelled => "cancelled",
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            BookingStatus::Rejected | BookingStatus::Completed | BookingStatus::Cancelled
        )
    }

    pub fn can_transition(&self, to: BookingStatus, actor: BookingActor) -> bool {
        use BookingStatus::*;

        match actor {
            BookingActor::Provider => matches!(
                (self, to),
                (Pending, Accepted)
                    | (Pending, Rejected)
                    | (Accepted, Completed)
                    | (Accepted, Cancelled)
            ),
            BookingActor::Customer => matches!((self, to), (Pending, Cancelled)),
        }
    }
}

#[derive(Debug, Serialize, Deserialize, sqlx::FromRow, Clone)]
pub struct Booking {
    pub id: Uuid,
    pub user_id: Uuid,
    pub company_id: Option<Uuid>,
    pub service_id: Option<Uuid>,
    pub date: DateTime<Utc>,
    pub notes: Option<String>,
    pub status: BookingStatus,
    #[serde(rename = "createdAt")]
    pub created_at: DateTime<Utc>,
    #[serde(rename = "updatedAt")]
    pub updated_at: DateTime<Utc>,
}

/// Booking row joined with the names shown in booking lists.
#[derive(Debug, Serialize, Deserialize, sqlx::FromRow, Clone)]
pub struct BookingDetails {
    pub id: Uuid,
    pub user_id: Uuid,
    pub user_name: String,
    pub company_id: Option<Uuid>,
    pub company_name: Option<String>,
    pub service_id: Option<Uuid>,
    pub service_name: Option<String>,
    pub date: DateTime<Utc>,
    pub notes: Option<String>,
    pub status: BookingStatus,
    #[serde(rename = "createdAt")]
    pub created_at: DateTime<Utc>,
    #[serde(rename = "updatedAt")]
    pub updated_at: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use BookingStatus::*;

    const ALL: [BookingStatus; 5] = [Pending, Accepted, Rejected, Completed, Cancelled];

    #[test]
    fn provider_drives_the_lifecycle() {
        assert!(Pending.can_transition(Accepted, BookingActor::Provider));
        assert!(Pending.can_transition(Rejected, BookingActor::Provider));
        assert!(Accepted.can_transition(Completed, BookingActor::Provider));
        assert!(Accepted.can_transition(Cancelled, BookingActor::Provider));
        assert!(!Pending.can_transition(Completed, BookingActor::Provider));
        assert!(!Accepted.can_transition(Pending, BookingActor::Provider));
    }

    #[test]
    fn customer_may_only_cancel_pending() {
        for from in ALL {
            for to in ALL {
                let allowed = from.can_transition(to, BookingActor::Customer);
                assert_eq!(allowed, from == Pending && to == Cancelled, "{:?} -> {:?}", from, to);
            }
        }
    }

    #[test]
    fn terminal_states_never_move() {
        for from in ALL.into_iter().filter(|s| s.is_terminal()) {
            for to in ALL {
                assert!(!from.can_transition(to, BookingActor::Provider));
                assert!(!from.can_transition(to, BookingActor::Customer));
            }
        }
    }

    #[test]
    fn status_uses_snake_case_on_the_wire() {
        let json = serde_json::to_string(&Accepted).unwrap();
        assert_eq!(json, "\"accepted\"");
        assert_eq!(Cancelled.to_str(), "cancelled");
    }
}
