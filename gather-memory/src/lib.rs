//! In-memory store adapters for the Gather lifecycle engine
//!
//! This crate provides in-memory implementations of the `EventStore` and
//! `MembershipStore` ports from the gather crate, useful for testing and
//! development scenarios where persistence is not required.
//!
//! The event store owns the join-code uniqueness invariant the same way a
//! real backend would, with a unique index checked inside the write lock:
//! `insert` and `update` fail with `DuplicateJoinCode` rather than trusting
//! callers to have pre-checked. It also supports injecting failures into the
//! conditional phase write, so tests can verify that background
//! reconciliation failures never reach readers.

#![forbid(unsafe_code)]
#![warn(missing_docs)]
#![allow(clippy::significant_drop_tightening)]

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, RwLock};

use async_trait::async_trait;

use gather::errors::{StoreError, StoreResult};
use gather::event::Event;
use gather::membership::{Membership, Role};
use gather::phase::EventPhase;
use gather::store::{EventStore, MembershipStore, Page, PublicEventFilter};
use gather::types::{EventId, JoinCode, UserId};

#[derive(Default)]
struct EventTable {
    events: HashMap<EventId, Event>,
    // Unique index over join codes of live events
    codes: HashMap<JoinCode, EventId>,
}

/// Thread-safe in-memory event store for testing.
#[derive(Clone, Default)]
pub struct InMemoryEventStore {
    table: Arc<RwLock<EventTable>>,
    fail_phase_writes: Arc<AtomicBool>,
}

impl InMemoryEventStore {
    /// Creates a new empty in-memory event store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Makes every subsequent conditional phase write fail with a backend
    /// error (or stops doing so). Lets tests assert the reconciler's
    /// discard-on-failure policy.
    pub fn fail_phase_writes(&self, fail: bool) {
        self.fail_phase_writes.store(fail, Ordering::SeqCst);
    }

    /// Reads the stored record without going through the engine, for
    /// asserting on cached (possibly stale) state in tests.
    pub fn stored(&self, id: &EventId) -> Option<Event> {
        let table = self.table.read().expect("RwLock poisoned");
        table.events.get(id).cloned()
    }
}

#[async_trait]
impl EventStore for InMemoryEventStore {
    async fn insert(&self, event: &Event) -> StoreResult<()> {
        let mut table = self.table.write().expect("RwLock poisoned");

        if let Some(holder) = table.codes.get(&event.join_code) {
            if *holder != event.id {
                return Err(StoreError::DuplicateJoinCode(event.join_code.clone()));
            }
        }
        if table.events.contains_key(&event.id) {
            return Err(StoreError::Backend(format!(
                "event {} already exists",
                event.id
            )));
        }

        table.codes.insert(event.join_code.clone(), event.id);
        table.events.insert(event.id, event.clone());
        Ok(())
    }

    async fn get(&self, id: &EventId) -> StoreResult<Option<Event>> {
        let table = self.table.read().expect("RwLock poisoned");
        Ok(table.events.get(id).cloned())
    }

    async fn update(&self, event: &Event) -> StoreResult<()> {
        let mut table = self.table.write().expect("RwLock poisoned");

        let Some(previous) = table.events.get(&event.id).cloned() else {
            return Err(StoreError::EventNotFound(event.id));
        };

        if previous.join_code != event.join_code {
            if let Some(holder) = table.codes.get(&event.join_code) {
                if *holder != event.id {
                    return Err(StoreError::DuplicateJoinCode(event.join_code.clone()));
                }
            }
            table.codes.remove(&previous.join_code);
            table.codes.insert(event.join_code.clone(), event.id);
        }

        table.events.insert(event.id, event.clone());
        Ok(())
    }

    async fn set_phase_unless_cancelled(
        &self,
        id: &EventId,
        phase: EventPhase,
    ) -> StoreResult<bool> {
        if self.fail_phase_writes.load(Ordering::SeqCst) {
            return Err(StoreError::Backend("injected phase write failure".into()));
        }

        let mut table = self.table.write().expect("RwLock poisoned");
        match table.events.get_mut(id) {
            Some(event) if !event.phase.is_cancelled() => {
                event.phase = phase;
                Ok(true)
            }
            _ => Ok(false),
        }
    }

    async fn find_by_join_code(&self, code: &JoinCode) -> StoreResult<Option<Event>> {
        let table = self.table.read().expect("RwLock poisoned");
        Ok(table
            .codes
            .get(code)
            .and_then(|id| table.events.get(id))
            .cloned())
    }

    async fn list_public(
        &self,
        _filter: &PublicEventFilter,
        page: &Page,
    ) -> StoreResult<Vec<Event>> {
        let table = self.table.read().expect("RwLock poisoned");

        let mut listed: Vec<Event> = table
            .events
            .values()
            .filter(|event| event.kind.is_public())
            .cloned()
            .collect();

        // Soonest-starting first, unscheduled records last; id as tiebreak
        // for a stable page sequence.
        listed.sort_by_key(|event| (event.starts_at.is_none(), event.starts_at, event.id));

        Ok(listed
            .into_iter()
            .skip(page.offset)
            .take(page.limit)
            .collect())
    }

    async fn delete(&self, id: &EventId) -> StoreResult<bool> {
        let mut table = self.table.write().expect("RwLock poisoned");
        match table.events.remove(id) {
            Some(event) => {
                table.codes.remove(&event.join_code);
                Ok(true)
            }
            None => Ok(false),
        }
    }
}

/// Thread-safe in-memory membership store for testing.
#[derive(Clone, Default)]
pub struct InMemoryMembershipStore {
    rows: Arc<RwLock<HashMap<(EventId, UserId), Membership>>>,
}

impl InMemoryMembershipStore {
    /// Creates a new empty in-memory membership store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored memberships, across all events.
    pub fn len(&self) -> usize {
        self.rows.read().expect("RwLock poisoned").len()
    }

    /// Whether no memberships are stored.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[async_trait]
impl MembershipStore for InMemoryMembershipStore {
    async fn insert_if_absent(&self, membership: Membership) -> StoreResult<bool> {
        let mut rows = self.rows.write().expect("RwLock poisoned");
        let key = (membership.event_id, membership.user_id);
        if rows.contains_key(&key) {
            return Ok(false);
        }
        rows.insert(key, membership);
        Ok(true)
    }

    async fn find(
        &self,
        event_id: &EventId,
        user_id: &UserId,
    ) -> StoreResult<Option<Membership>> {
        let rows = self.rows.read().expect("RwLock poisoned");
        Ok(rows.get(&(*event_id, *user_id)).cloned())
    }

    async fn has_role(
        &self,
        user_id: &UserId,
        event_id: &EventId,
        roles: &[Role],
    ) -> StoreResult<Option<Membership>> {
        let rows = self.rows.read().expect("RwLock poisoned");
        Ok(rows
            .get(&(*event_id, *user_id))
            .filter(|membership| roles.contains(&membership.role))
            .cloned())
    }

    async fn list_for_event(&self, event_id: &EventId) -> StoreResult<Vec<Membership>> {
        let rows = self.rows.read().expect("RwLock poisoned");
        let mut listed: Vec<Membership> = rows
            .values()
            .filter(|membership| membership.event_id == *event_id)
            .cloned()
            .collect();
        listed.sort_by_key(|membership| (membership.joined_at, membership.user_id));
        Ok(listed)
    }

    async fn delete(&self, event_id: &EventId, user_id: &UserId) -> StoreResult<bool> {
        let mut rows = self.rows.write().expect("RwLock poisoned");
        Ok(rows.remove(&(*event_id, *user_id)).is_some())
    }

    async fn delete_for_event(&self, event_id: &EventId) -> StoreResult<u64> {
        let mut rows = self.rows.write().expect("RwLock poisoned");
        let before = rows.len();
        rows.retain(|(event, _), _| event != event_id);
        Ok((before - rows.len()) as u64)
    }
}
