//! The event lifecycle service.
//!
//! `EventLifecycleService` orchestrates creation, update, cancellation,
//! deletion, joining and the private→public visibility transition, composing
//! the phase deriver, the reconciler, the join-code issuer and the
//! visibility guard over the persistence ports.
//!
//! Authorization is a collaborator's job: the platform resolves the caller's
//! membership through [`MembershipStore::has_role`] before invoking a gated
//! operation and passes the resulting role assertion in. The service only
//! enforces that assertion against the operation's required roles; it never
//! re-derives permissions itself.

use std::sync::Arc;

use tracing::{debug, instrument};

use crate::clock::Clock;
use crate::errors::{LifecycleError, LifecycleResult, StoreError};
use crate::event::{Event, EventKind, EventPatch, NewEvent};
use crate::join_code::{CodeSource, JoinCodeIssuer, JoinCodePolicy};
use crate::membership::{Membership, Role};
use crate::phase::{derive_phase, EventPhase};
use crate::reconciler::{LifecycleReconciler, ReconcilerConfig};
use crate::store::{EventStore, MembershipStore, Page, PublicEventFilter};
use crate::types::{EventId, JoinCode, Timestamp, UserId};
use crate::visibility::ensure_publishable;

/// Roles allowed to edit an event.
const UPDATE_ROLES: &[Role] = &[Role::Owner, Role::Lead];

/// Roles allowed to delete an event or rotate its join code.
const OWNER_ONLY: &[Role] = &[Role::Owner];

/// Tunables for the service and the components it owns.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ServiceConfig {
    /// Join-code issuance policy.
    pub join_codes: JoinCodePolicy,
    /// Reconciler queue configuration.
    pub reconciler: ReconcilerConfig,
}

/// Orchestrates the event lifecycle over pluggable stores and clock.
///
/// Construction spawns the reconciler's background writer and therefore
/// requires a running Tokio runtime.
pub struct EventLifecycleService<ES, MS, C> {
    events: Arc<ES>,
    memberships: Arc<MS>,
    clock: C,
    issuer: JoinCodeIssuer<ES>,
    reconciler: LifecycleReconciler<C>,
}

impl<ES, MS, C> EventLifecycleService<ES, MS, C>
where
    ES: EventStore + 'static,
    MS: MembershipStore,
    C: Clock + Clone,
{
    /// Creates a service with default configuration.
    pub fn new(events: Arc<ES>, memberships: Arc<MS>, clock: C) -> Self {
        Self::with_config(events, memberships, clock, ServiceConfig::default())
    }

    /// Creates a service with explicit configuration.
    pub fn with_config(
        events: Arc<ES>,
        memberships: Arc<MS>,
        clock: C,
        config: ServiceConfig,
    ) -> Self {
        let issuer = JoinCodeIssuer::new(Arc::clone(&events), config.join_codes);
        let reconciler =
            LifecycleReconciler::spawn(Arc::clone(&events), clock.clone(), config.reconciler);
        Self {
            events,
            memberships,
            clock,
            issuer,
            reconciler,
        }
    }

    /// Replaces the join-code source (deterministic sources for tests).
    #[must_use]
    pub fn with_code_source(mut self, source: Box<dyn CodeSource>) -> Self {
        self.issuer.set_source(source);
        self
    }

    /// Creates an event and its creator's Owner membership.
    ///
    /// The window must be well-ordered and must not lie in the past at
    /// creation time (a deliberately stricter rule than update applies). A
    /// creation that requests public visibility must already satisfy the
    /// public-required field set. Nothing is persisted when any validation
    /// or the join-code budget fails.
    #[instrument(skip(self, new), fields(creator = %creator))]
    pub async fn create(&self, new: NewEvent, creator: UserId) -> LifecycleResult<Event> {
        let now = self.clock.now();
        validate_window_order(Some(new.starts_at), Some(new.ends_at))?;
        validate_window_not_past(new.starts_at, new.ends_at, now)?;

        let phase = EventPhase::from(derive_phase(Some(new.starts_at), Some(new.ends_at), now));
        let mut event = Event {
            id: EventId::new(),
            kind: new.kind,
            phase,
            name: new.name,
            description: new.description,
            organizer: new.organizer,
            starts_at: Some(new.starts_at),
            ends_at: Some(new.ends_at),
            location: new.location,
            images: new.images,
            join_code: self.issuer.issue().await?,
            created_at: now,
        };

        if event.kind.is_public() {
            ensure_publishable(&event)?;
        }

        let max_attempts = self.issuer.policy().max_attempts;
        let mut attempt = 0u32;
        loop {
            attempt += 1;
            match self.events.insert(&event).await {
                Ok(()) => break,
                // The store constraint caught a race the pre-check missed;
                // a fresh code is just another collision retry.
                Err(StoreError::DuplicateJoinCode(_)) if attempt < max_attempts => {
                    debug!(attempt, "insert hit join code constraint, reissuing");
                    event.join_code = self.issuer.issue().await?;
                }
                Err(StoreError::DuplicateJoinCode(_)) => {
                    return Err(LifecycleError::GenerationExhausted {
                        attempts: max_attempts,
                    });
                }
                Err(other) => return Err(other.into()),
            }
        }

        let owner = Membership::new(event.id, creator, Role::Owner, now);
        self.memberships.insert_if_absent(owner).await?;

        debug!(event_id = %event.id, "event created");
        Ok(event)
    }

    /// Applies a partial update.
    ///
    /// Cancellation always wins: a patch with the cancel flag set moves the
    /// event to `Cancelled` and forces it private regardless of any other
    /// patch content. Otherwise the phase is recomputed from the merged
    /// window, so an update can move a stale cached phase forward even
    /// though the caller did not ask for it. A cancelled event's phase is
    /// never touched (there is no uncancel).
    ///
    /// A transition into public visibility runs the completeness guard on
    /// the fully merged candidate; failure rejects the whole update with
    /// the complete missing-field list and nothing is written.
    #[instrument(skip(self, patch), fields(event_id = %id))]
    pub async fn update(
        &self,
        id: EventId,
        patch: EventPatch,
        caller_role: Option<Role>,
    ) -> LifecycleResult<Event> {
        authorize(caller_role, UPDATE_ROLES)?;

        let current = self
            .events
            .get(&id)
            .await?
            .ok_or(LifecycleError::EventNotFound(id))?;

        let mut merged = patch.apply_to(&current);
        validate_window_order(merged.starts_at, merged.ends_at)?;

        if patch.cancel {
            merged.phase = EventPhase::Cancelled;
            merged.kind = EventKind::Private;
        } else if !current.phase.is_cancelled() {
            merged.phase = EventPhase::from(derive_phase(
                merged.starts_at,
                merged.ends_at,
                self.clock.now(),
            ));
        }

        if merged.kind.is_public() && !current.kind.is_public() {
            ensure_publishable(&merged)?;
        }

        self.events
            .update(&merged)
            .await
            .map_err(map_missing_event)?;

        Ok(self.reconciler.reconcile(merged))
    }

    /// Deletes an event and all of its memberships.
    #[instrument(skip(self), fields(event_id = %id))]
    pub async fn delete(&self, id: EventId, caller_role: Option<Role>) -> LifecycleResult<()> {
        authorize(caller_role, OWNER_ONLY)?;

        if self.events.get(&id).await?.is_none() {
            return Err(LifecycleError::EventNotFound(id));
        }

        let removed = self.memberships.delete_for_event(&id).await?;
        debug!(event_id = %id, removed, "memberships removed with event");
        self.events.delete(&id).await?;
        Ok(())
    }

    /// Attaches a user to the event holding `code` with the Member role.
    ///
    /// Idempotent: a user who already holds a membership (of any role) is
    /// left untouched and the call still succeeds.
    #[instrument(skip(self, code), fields(user = %user))]
    pub async fn join(&self, code: &JoinCode, user: UserId) -> LifecycleResult<EventId> {
        let event = self
            .events
            .find_by_join_code(code)
            .await?
            .ok_or(LifecycleError::UnknownJoinCode)?;

        let membership = Membership::new(event.id, user, Role::Member, self.clock.now());
        let inserted = self.memberships.insert_if_absent(membership).await?;
        debug!(event_id = %event.id, inserted, "join processed");
        Ok(event.id)
    }

    /// Detaches a user from an event.
    ///
    /// Idempotent like [`join`](Self::join). The Owner cannot leave their
    /// own event; ownership transfer is not an engine operation.
    #[instrument(skip(self), fields(event_id = %id, user = %user))]
    pub async fn leave(&self, id: EventId, user: UserId) -> LifecycleResult<()> {
        if self.events.get(&id).await?.is_none() {
            return Err(LifecycleError::EventNotFound(id));
        }

        if let Some(membership) = self.memberships.find(&id, &user).await? {
            if membership.role == Role::Owner {
                return Err(LifecycleError::Validation {
                    field: "user_id",
                    constraint: "the owner cannot leave their own event".to_string(),
                });
            }
            self.memberships.delete(&id, &user).await?;
        }
        Ok(())
    }

    /// Lists the memberships of an event.
    #[instrument(skip(self), fields(event_id = %id))]
    pub async fn members(&self, id: EventId) -> LifecycleResult<Vec<Membership>> {
        if self.events.get(&id).await?.is_none() {
            return Err(LifecycleError::EventNotFound(id));
        }
        Ok(self.memberships.list_for_event(&id).await?)
    }

    /// Issues a fresh join code for an event, invalidating the old one.
    #[instrument(skip(self), fields(event_id = %id))]
    pub async fn regenerate_join_code(
        &self,
        id: EventId,
        caller_role: Option<Role>,
    ) -> LifecycleResult<Event> {
        authorize(caller_role, OWNER_ONLY)?;

        let mut event = self
            .events
            .get(&id)
            .await?
            .ok_or(LifecycleError::EventNotFound(id))?;

        let max_attempts = self.issuer.policy().max_attempts;
        let mut attempt = 0u32;
        loop {
            attempt += 1;
            event.join_code = self.issuer.issue().await?;
            match self.events.update(&event).await {
                Ok(()) => break,
                Err(StoreError::DuplicateJoinCode(_)) if attempt < max_attempts => {
                    debug!(attempt, "update hit join code constraint, reissuing");
                }
                Err(StoreError::DuplicateJoinCode(_)) => {
                    return Err(LifecycleError::GenerationExhausted {
                        attempts: max_attempts,
                    });
                }
                Err(other) => return Err(map_missing_event(other)),
            }
        }

        Ok(self.reconciler.reconcile(event))
    }

    /// Loads a single event with its phase reconciled to the current
    /// moment.
    #[instrument(skip(self), fields(event_id = %id))]
    pub async fn get_one(&self, id: EventId) -> LifecycleResult<Event> {
        let event = self
            .events
            .get(&id)
            .await?
            .ok_or(LifecycleError::EventNotFound(id))?;
        Ok(self.reconciler.reconcile(event))
    }

    /// Lists public events, each phase reconciled.
    ///
    /// The filter's phase predicate is applied to the reconciled values
    /// within the fetched page, since stored phases may lag real time.
    #[instrument(skip(self))]
    pub async fn list_public(
        &self,
        filter: &PublicEventFilter,
        page: &Page,
    ) -> LifecycleResult<Vec<Event>> {
        let stored = self.events.list_public(filter, page).await?;
        let mut reconciled = self.reconciler.reconcile_all(stored);
        if let Some(phase) = filter.phase {
            reconciled.retain(|event| event.phase == phase);
        }
        Ok(reconciled)
    }
}

impl<ES, MS, C> std::fmt::Debug for EventLifecycleService<ES, MS, C> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EventLifecycleService")
            .field("issuer", &self.issuer)
            .finish_non_exhaustive()
    }
}

/// Enforces an externally computed role assertion against the roles an
/// operation accepts.
fn authorize(caller_role: Option<Role>, required: &[Role]) -> LifecycleResult<()> {
    match caller_role {
        Some(role) if required.contains(&role) => Ok(()),
        _ => Err(LifecycleError::Forbidden {
            required: required.to_vec(),
        }),
    }
}

/// Both bounds present implies `ends_at >= starts_at`.
fn validate_window_order(
    starts_at: Option<Timestamp>,
    ends_at: Option<Timestamp>,
) -> LifecycleResult<()> {
    if let (Some(starts_at), Some(ends_at)) = (starts_at, ends_at) {
        if ends_at < starts_at {
            return Err(LifecycleError::Validation {
                field: "ends_at",
                constraint: "must not precede starts_at".to_string(),
            });
        }
    }
    Ok(())
}

/// Creation-only strictness: neither bound may lie in the past. Update
/// deliberately re-validates only ordering.
fn validate_window_not_past(
    starts_at: Timestamp,
    ends_at: Timestamp,
    now: Timestamp,
) -> LifecycleResult<()> {
    if starts_at < now {
        return Err(LifecycleError::Validation {
            field: "starts_at",
            constraint: "must not be in the past".to_string(),
        });
    }
    if ends_at < now {
        return Err(LifecycleError::Validation {
            field: "ends_at",
            constraint: "must not be in the past".to_string(),
        });
    }
    Ok(())
}

fn map_missing_event(error: StoreError) -> LifecycleError {
    match error {
        StoreError::EventNotFound(id) => LifecycleError::EventNotFound(id),
        other => other.into(),
    }
}
