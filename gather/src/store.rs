//! Persistence ports for the lifecycle engine.
//!
//! These traits are the backend-independent seam between the engine and the
//! platform's document store. The engine only requires document-style CRUD,
//! a unique-field lookup for join codes, a filtered public listing with
//! pagination, and one atomic conditional update used by the reconciler.
//!
//! Adapters own the join-code uniqueness invariant: `insert` and `update`
//! must reject a write that would duplicate a live event's code with
//! [`StoreError::DuplicateJoinCode`](crate::errors::StoreError::DuplicateJoinCode).
//! The issuance path treats that rejection as a retryable collision, so the
//! invariant holds even when two creations race past the pre-check.

use async_trait::async_trait;

use crate::errors::StoreResult;
use crate::event::Event;
use crate::membership::{Membership, Role};
use crate::phase::EventPhase;
use crate::types::{EventId, JoinCode, UserId};

/// Default page size for listings.
pub const DEFAULT_PAGE_LIMIT: usize = 50;

/// Upper bound a single page may request.
pub const MAX_PAGE_LIMIT: usize = 200;

/// Pagination window for listings.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Page {
    /// Maximum number of records to return, clamped to [`MAX_PAGE_LIMIT`].
    pub limit: usize,
    /// Number of records to skip.
    pub offset: usize,
}

impl Page {
    /// Creates a page, clamping the limit into `1..=MAX_PAGE_LIMIT`.
    pub fn new(limit: usize, offset: usize) -> Self {
        Self {
            limit: limit.clamp(1, MAX_PAGE_LIMIT),
            offset,
        }
    }
}

impl Default for Page {
    fn default() -> Self {
        Self {
            limit: DEFAULT_PAGE_LIMIT,
            offset: 0,
        }
    }
}

/// Filter for the public listing.
///
/// The phase filter is applied by the service after reconciliation, not by
/// the store: stored phases may lag real time, so filtering at the store
/// would key off stale values.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PublicEventFilter {
    /// Keep only events whose reconciled phase matches.
    pub phase: Option<EventPhase>,
}

impl PublicEventFilter {
    /// Restricts the listing to a reconciled phase.
    #[must_use]
    pub const fn with_phase(mut self, phase: EventPhase) -> Self {
        self.phase = Some(phase);
        self
    }
}

/// Port for persisting event records.
#[async_trait]
pub trait EventStore: Send + Sync {
    /// Inserts a new event. Fails with `DuplicateJoinCode` if another live
    /// event already holds the record's join code.
    async fn insert(&self, event: &Event) -> StoreResult<()>;

    /// Loads an event by id.
    async fn get(&self, id: &EventId) -> StoreResult<Option<Event>>;

    /// Replaces an existing event record in full. Fails with
    /// `EventNotFound` if absent, and with `DuplicateJoinCode` if the write
    /// would duplicate another live event's code.
    async fn update(&self, event: &Event) -> StoreResult<()>;

    /// Atomically sets the cached phase of an event, unless the stored
    /// record is cancelled (or gone) at write time.
    ///
    /// Returns `true` when the phase was written and `false` when the write
    /// was skipped. This is the reconciler's conditional primitive: it keeps
    /// a stale derived-phase write from clobbering a concurrent
    /// cancellation.
    async fn set_phase_unless_cancelled(
        &self,
        id: &EventId,
        phase: EventPhase,
    ) -> StoreResult<bool>;

    /// Looks up the live event holding a join code.
    async fn find_by_join_code(&self, code: &JoinCode) -> StoreResult<Option<Event>>;

    /// Lists public events ordered by window start (unscheduled last),
    /// within the pagination window.
    async fn list_public(&self, filter: &PublicEventFilter, page: &Page)
        -> StoreResult<Vec<Event>>;

    /// Removes an event. Returns whether a record was removed.
    async fn delete(&self, id: &EventId) -> StoreResult<bool>;
}

/// Port for persisting memberships.
#[async_trait]
pub trait MembershipStore: Send + Sync {
    /// Inserts a membership unless the `(event, user)` pair already has one.
    /// Returns whether a record was inserted; an existing membership is left
    /// untouched (idempotent join).
    async fn insert_if_absent(&self, membership: Membership) -> StoreResult<bool>;

    /// Loads the membership for a `(event, user)` pair.
    async fn find(&self, event_id: &EventId, user_id: &UserId)
        -> StoreResult<Option<Membership>>;

    /// Returns the user's membership on the event if its role is among
    /// `roles`. This is the pre-check collaborators run before invoking a
    /// gated operation.
    async fn has_role(
        &self,
        user_id: &UserId,
        event_id: &EventId,
        roles: &[Role],
    ) -> StoreResult<Option<Membership>>;

    /// Lists all memberships of an event.
    async fn list_for_event(&self, event_id: &EventId) -> StoreResult<Vec<Membership>>;

    /// Removes a single membership. Returns whether a record was removed.
    async fn delete(&self, event_id: &EventId, user_id: &UserId) -> StoreResult<bool>;

    /// Removes every membership of an event, returning how many were
    /// removed. Called when the event itself is deleted so no orphan
    /// memberships remain.
    async fn delete_for_event(&self, event_id: &EventId) -> StoreResult<u64>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn page_clamps_limit_into_bounds() {
        assert_eq!(Page::new(0, 0).limit, 1);
        assert_eq!(Page::new(10_000, 0).limit, MAX_PAGE_LIMIT);
        assert_eq!(Page::new(25, 5), Page { limit: 25, offset: 5 });
    }

    #[test]
    fn default_page_uses_default_limit() {
        let page = Page::default();
        assert_eq!(page.limit, DEFAULT_PAGE_LIMIT);
        assert_eq!(page.offset, 0);
    }

    #[test]
    fn filter_builder_sets_phase() {
        let filter = PublicEventFilter::default().with_phase(EventPhase::Ongoing);
        assert_eq!(filter.phase, Some(EventPhase::Ongoing));
    }
}
