//! Error types for the lifecycle engine.
//!
//! Two layers, mirroring the engine's seams:
//!
//! - [`LifecycleError`]: business-level failures returned by
//!   [`EventLifecycleService`](crate::service::EventLifecycleService)
//!   operations. Each variant is machine-checkable so callers can map it to
//!   a transport response without string matching.
//! - [`StoreError`]: persistence-port failures raised by
//!   [`EventStore`](crate::store::EventStore) and
//!   [`MembershipStore`](crate::store::MembershipStore) implementations.
//!
//! Background reconciliation writes have no error surface at all: by policy
//! their failures are logged and discarded, never returned to a reader.

use thiserror::Error;

use crate::membership::Role;
use crate::types::{EventId, JoinCode};
use crate::visibility::PublicField;

/// Result alias for service operations.
pub type LifecycleResult<T> = Result<T, LifecycleError>;

/// Result alias for store-port operations.
pub type StoreResult<T> = Result<T, StoreError>;

/// Business-level failures of lifecycle operations.
#[derive(Debug, Error)]
pub enum LifecycleError {
    /// Malformed input: the named field violates the stated constraint.
    /// Local to the request; never retried automatically.
    #[error("validation failed for `{field}`: {constraint}")]
    Validation {
        /// The offending input field.
        field: &'static str,
        /// Human-readable description of the violated constraint.
        constraint: String,
    },

    /// The event cannot become public: the listed fields are absent.
    /// Always the complete list, not just the first deficiency.
    #[error("cannot publish event, missing required fields: {}", format_fields(.0))]
    MissingFields(Vec<PublicField>),

    /// The join-code retry budget was exhausted without finding a free code.
    /// A server-side condition (code-space saturation), not a client mistake.
    #[error("join code generation exhausted after {attempts} attempts")]
    GenerationExhausted {
        /// How many codes were tried.
        attempts: u32,
    },

    /// The referenced event does not exist.
    #[error("event {0} not found")]
    EventNotFound(EventId),

    /// No live event carries the supplied join code.
    #[error("no event matches the supplied join code")]
    UnknownJoinCode,

    /// The caller's pre-checked role is insufficient for the operation.
    /// The engine never derives this itself; it only enforces the role
    /// assertion computed by the membership collaborator.
    #[error("operation requires one of roles: {}", format_roles(.required))]
    Forbidden {
        /// Roles that would have been accepted.
        required: Vec<Role>,
    },

    /// The persistence layer failed.
    #[error("store error: {0}")]
    Store(#[from] StoreError),
}

/// Persistence-port failures.
#[derive(Debug, Error)]
pub enum StoreError {
    /// The event targeted by a write does not exist.
    #[error("event {0} not found in store")]
    EventNotFound(EventId),

    /// The store's unique-join-code constraint rejected a write.
    /// Treated as a retryable collision by the issuance path.
    #[error("join code `{0}` is already in use")]
    DuplicateJoinCode(JoinCode),

    /// The storage backend itself failed (connection, I/O, timeout).
    #[error("storage backend failure: {0}")]
    Backend(String),
}

fn format_fields(fields: &[PublicField]) -> String {
    fields
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(", ")
}

fn format_roles(roles: &[Role]) -> String {
    roles
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(", ")
}
