//! `Gather` - Event lifecycle and visibility engine
//!
//! This library implements the lifecycle core of the Gather event-management
//! platform: deriving an event's temporal phase, lazily reconciling the
//! stored phase on every read without blocking callers, issuing
//! collision-free join codes, and gating the private→public visibility
//! transition behind a completeness check. Transport, rendering and
//! notification layers live elsewhere and talk to this crate through
//! [`service::EventLifecycleService`] and the store ports in [`store`].

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod clock;
pub mod errors;
pub mod event;
pub mod join_code;
pub mod membership;
pub mod phase;
pub mod reconciler;
pub mod service;
pub mod store;
pub mod types;
pub mod visibility;

pub use clock::{Clock, ManualClock, SystemClock};
pub use errors::{LifecycleError, LifecycleResult, StoreError, StoreResult};
pub use event::{Event, EventKind, EventPatch, NewEvent};
pub use join_code::{CodeSource, FixedCodeSource, JoinCodeIssuer, JoinCodePolicy, RandomCodeSource};
pub use membership::{Membership, Role};
pub use phase::{derive_phase, DerivedPhase, EventPhase};
pub use reconciler::{LifecycleReconciler, PhaseWriteIntent, ReconcilerConfig};
pub use service::{EventLifecycleService, ServiceConfig};
pub use store::{EventStore, MembershipStore, Page, PublicEventFilter};
pub use types::{
    CodeLength, EventDescription, EventId, EventName, ImageUrl, JoinCode, Location, Organizer,
    Timestamp, UserId,
};
pub use visibility::{ensure_publishable, missing_for_publish, PublicField};
