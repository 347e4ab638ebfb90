//! Core identifier and value types for the Gather lifecycle engine.
//!
//! All constrained values use smart constructors so that invalid states are
//! unrepresentable after construction, following the "parse, don't validate"
//! principle. Handlers at the platform edge parse incoming strings into these
//! types once; everything behind the service boundary can then rely on them.

use chrono::{DateTime, Utc};
use nutype::nutype;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A globally unique event identifier using UUIDv7 format.
///
/// UUIDv7 gives time-based ordering, which keeps listings and store indexes
/// roughly chronological without a separate sort key.
#[nutype(
    validate(predicate = |id: &Uuid| id.get_version() == Some(uuid::Version::SortRand)),
    derive(
        Debug,
        Clone,
        Copy,
        PartialEq,
        Eq,
        PartialOrd,
        Ord,
        Hash,
        AsRef,
        Deref,
        Display,
        Serialize,
        Deserialize
    )
)]
pub struct EventId(Uuid);

impl EventId {
    /// Creates a new `EventId` with the current timestamp.
    pub fn new() -> Self {
        // This will always succeed as Uuid::now_v7() always returns a valid v7 UUID
        Self::try_new(Uuid::now_v7()).expect("Uuid::now_v7() should always return a valid v7 UUID")
    }
}

impl Default for EventId {
    fn default() -> Self {
        Self::new()
    }
}

/// Identifier of a platform user.
///
/// Users are minted by the platform's account service; the engine treats the
/// value as opaque and imposes no version constraint.
#[nutype(derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    Hash,
    AsRef,
    Deref,
    Display,
    Serialize,
    Deserialize
))]
pub struct UserId(Uuid);

impl UserId {
    /// Creates a random `UserId`, mainly useful in tests and fixtures.
    pub fn random() -> Self {
        Self::new(Uuid::now_v7())
    }
}

/// Display name of an event. Non-empty after trimming, at most 200 characters.
#[nutype(
    sanitize(trim),
    validate(not_empty, len_char_max = 200),
    derive(
        Debug,
        Clone,
        PartialEq,
        Eq,
        Hash,
        AsRef,
        Deref,
        Display,
        Serialize,
        Deserialize
    )
)]
pub struct EventName(String);

/// Free-form event description. Non-empty after trimming.
#[nutype(
    sanitize(trim),
    validate(not_empty, len_char_max = 10_000),
    derive(Debug, Clone, PartialEq, Eq, AsRef, Deref, Display, Serialize, Deserialize)
)]
pub struct EventDescription(String);

/// The organizing body shown on the event page (a committee or department
/// name, not a user account).
#[nutype(
    sanitize(trim),
    validate(not_empty, len_char_max = 200),
    derive(Debug, Clone, PartialEq, Eq, AsRef, Deref, Display, Serialize, Deserialize)
)]
pub struct Organizer(String);

/// Venue description for an event.
#[nutype(
    sanitize(trim),
    validate(not_empty, len_char_max = 500),
    derive(Debug, Clone, PartialEq, Eq, AsRef, Deref, Display, Serialize, Deserialize)
)]
pub struct Location(String);

/// Reference to an uploaded event image.
///
/// The engine stores the reference only; upload, resizing and serving are the
/// media service's concern.
#[nutype(
    sanitize(trim),
    validate(not_empty, len_char_max = 2_000),
    derive(Debug, Clone, PartialEq, Eq, AsRef, Deref, Display, Serialize, Deserialize)
)]
pub struct ImageUrl(String);

/// A short opaque token that lets a user attach themselves to an event.
///
/// Codes are printable ASCII alphanumerics, between [`CodeLength`] bounds.
/// Uniqueness among live events is a store-level constraint, not a property
/// of the type.
#[nutype(
    validate(predicate = |code: &str| {
        (4..=16).contains(&code.len()) && code.chars().all(|c| c.is_ascii_alphanumeric())
    }),
    derive(
        Debug,
        Clone,
        PartialEq,
        Eq,
        Hash,
        AsRef,
        Deref,
        Display,
        Serialize,
        Deserialize
    )
)]
pub struct JoinCode(String);

/// Length of generated join codes, bounded to the range the [`JoinCode`]
/// predicate accepts.
#[nutype(
    validate(greater_or_equal = 4, less_or_equal = 16),
    derive(
        Debug,
        Clone,
        Copy,
        PartialEq,
        Eq,
        PartialOrd,
        Ord,
        Into,
        Display,
        Serialize,
        Deserialize
    )
)]
pub struct CodeLength(usize);

impl Default for CodeLength {
    fn default() -> Self {
        Self::try_new(8).expect("8 is within the valid code length range")
    }
}

/// An instant on the platform timeline.
///
/// This wrapper keeps timestamp handling consistent across the engine and
/// lets the store ports stay independent of the chrono API surface.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Timestamp(DateTime<Utc>);

impl Timestamp {
    /// Creates a new timestamp from a UTC `DateTime`.
    pub const fn new(datetime: DateTime<Utc>) -> Self {
        Self(datetime)
    }

    /// Creates a timestamp representing the current moment.
    pub fn now() -> Self {
        Self(Utc::now())
    }

    /// Returns the underlying `DateTime`.
    pub const fn as_datetime(&self) -> &DateTime<Utc> {
        &self.0
    }

    /// Converts the timestamp into the underlying `DateTime`.
    pub const fn into_datetime(self) -> DateTime<Utc> {
        self.0
    }
}

impl From<DateTime<Utc>> for Timestamp {
    fn from(datetime: DateTime<Utc>) -> Self {
        Self::new(datetime)
    }
}

impl From<Timestamp> for DateTime<Utc> {
    fn from(timestamp: Timestamp) -> Self {
        timestamp.into_datetime()
    }
}

impl std::fmt::Display for Timestamp {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        self.0.fmt(f)
    }
}
