//! Membership of users in events.
//!
//! A membership joins a user and an event with a role. The pair
//! `(event_id, user_id)` is the identity: a user holds at most one
//! membership per event, and joining twice is a no-op.

use serde::{Deserialize, Serialize};

use crate::types::{EventId, Timestamp, UserId};

/// The role a user holds on an event.
///
/// Roles are assigned by the platform's organizing workflow; the engine only
/// consumes them for gating mutations.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    /// The event's creator; full control, including deletion.
    Owner,
    /// A delegated organizer who may edit the event.
    Lead,
    /// A regular attendee.
    Member,
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Owner => f.write_str("owner"),
            Self::Lead => f.write_str("lead"),
            Self::Member => f.write_str("member"),
        }
    }
}

/// A user's membership in a single event.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Membership {
    /// The event joined.
    pub event_id: EventId,
    /// The joined user.
    pub user_id: UserId,
    /// The role held.
    pub role: Role,
    /// When the membership was created.
    pub joined_at: Timestamp,
}

impl Membership {
    /// Creates a membership record.
    pub const fn new(event_id: EventId, user_id: UserId, role: Role, joined_at: Timestamp) -> Self {
        Self {
            event_id,
            user_id,
            role,
            joined_at,
        }
    }
}
