//! Lazy phase reconciliation.
//!
//! Stored phases are cached values: nothing advances them while an event
//! sits untouched in the store. Instead of a sweeper job, every read passes
//! through [`LifecycleReconciler::reconcile`], which recomputes the phase
//! from the time window and returns the corrected record synchronously. When
//! the stored value is stale, a write-intent is pushed onto a bounded queue
//! and a background task persists it best-effort.
//!
//! The persisted store may therefore lag the returned truth by a short
//! window; that is eventual consistency by design. Two rules keep it safe:
//! the background write is conditioned on the stored record still not being
//! cancelled (so it cannot clobber a concurrent cancellation), and its
//! failures are logged and discarded; a reader already holds the correct
//! value, so nothing is gained by surfacing a persistence error to it.

use std::sync::Arc;

use tokio::sync::mpsc;
use tracing::{debug, warn};

use crate::clock::Clock;
use crate::event::Event;
use crate::phase::{derive_phase, EventPhase};
use crate::store::EventStore;
use crate::types::EventId;

/// Default capacity of the write-intent queue.
pub const DEFAULT_QUEUE_CAPACITY: usize = 256;

/// Tunables for the reconciler.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReconcilerConfig {
    /// Capacity of the bounded write-intent queue. When the queue is full,
    /// further intents are dropped (and logged); they are advisory, and the
    /// next read of the same record re-derives and re-enqueues.
    pub queue_capacity: usize,
}

impl Default for ReconcilerConfig {
    fn default() -> Self {
        Self {
            queue_capacity: DEFAULT_QUEUE_CAPACITY,
        }
    }
}

/// A pending cached-phase correction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PhaseWriteIntent {
    /// The event whose cached phase is stale.
    pub event_id: EventId,
    /// The freshly derived phase.
    pub phase: EventPhase,
}

/// Recomputes event phases on read and lazily syncs the store.
///
/// Created with [`LifecycleReconciler::spawn`], which starts the background
/// writer task; construction therefore requires a running Tokio runtime.
/// The writer stops when the reconciler (and every clone of its queue
/// sender) is dropped; intents still queued at shutdown are lost, which is
/// acceptable for advisory writes.
pub struct LifecycleReconciler<C> {
    clock: C,
    intents: mpsc::Sender<PhaseWriteIntent>,
}

impl<C> LifecycleReconciler<C>
where
    C: Clock,
{
    /// Creates a reconciler over `store` and starts its writer task.
    pub fn spawn<ES>(store: Arc<ES>, clock: C, config: ReconcilerConfig) -> Self
    where
        ES: EventStore + 'static,
    {
        let (intents, queue) = mpsc::channel(config.queue_capacity.max(1));
        tokio::spawn(run_phase_writer(store, queue));
        Self { clock, intents }
    }

    /// Returns the record with its phase corrected to the current moment.
    ///
    /// Synchronous and non-blocking: the caller gets the corrected value
    /// immediately, without waiting for (or learning about) persistence.
    ///
    /// - A cancelled record is returned unchanged; cancellation is
    ///   authoritative and never recomputed.
    /// - A record whose cached phase already matches is returned unchanged
    ///   and no write is scheduled.
    /// - Otherwise the corrected copy is returned and a write-intent is
    ///   enqueued for the background writer.
    pub fn reconcile(&self, event: Event) -> Event {
        if event.phase.is_cancelled() {
            return event;
        }

        let computed = EventPhase::from(derive_phase(
            event.starts_at,
            event.ends_at,
            self.clock.now(),
        ));
        if computed == event.phase {
            return event;
        }

        let mut corrected = event;
        corrected.phase = computed;
        self.schedule_write(PhaseWriteIntent {
            event_id: corrected.id,
            phase: computed,
        });
        corrected
    }

    /// Reconciles each record of a collection independently.
    pub fn reconcile_all(&self, events: Vec<Event>) -> Vec<Event> {
        events.into_iter().map(|event| self.reconcile(event)).collect()
    }

    fn schedule_write(&self, intent: PhaseWriteIntent) {
        match self.intents.try_send(intent) {
            Ok(()) => {}
            Err(mpsc::error::TrySendError::Full(intent)) => {
                warn!(
                    event_id = %intent.event_id,
                    phase = %intent.phase,
                    "phase write queue full, dropping intent"
                );
            }
            Err(mpsc::error::TrySendError::Closed(intent)) => {
                warn!(
                    event_id = %intent.event_id,
                    phase = %intent.phase,
                    "phase writer stopped, dropping intent"
                );
            }
        }
    }
}

impl<C> std::fmt::Debug for LifecycleReconciler<C> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LifecycleReconciler").finish_non_exhaustive()
    }
}

/// Drains write-intents and persists them best-effort.
///
/// This is the engine's named no-op-on-failure policy: a failed conditional
/// write is logged at `warn` and discarded, never retried and never
/// surfaced to the reader that triggered it. A skipped write (`Ok(false)`)
/// means the record was cancelled or deleted after the intent was queued;
/// the condition did its job and the intent is simply obsolete.
async fn run_phase_writer<ES>(store: Arc<ES>, mut queue: mpsc::Receiver<PhaseWriteIntent>)
where
    ES: EventStore,
{
    while let Some(intent) = queue.recv().await {
        match store
            .set_phase_unless_cancelled(&intent.event_id, intent.phase)
            .await
        {
            Ok(true) => {
                debug!(event_id = %intent.event_id, phase = %intent.phase, "cached phase updated");
            }
            Ok(false) => {
                debug!(
                    event_id = %intent.event_id,
                    "phase write skipped, record cancelled or removed"
                );
            }
            Err(error) => {
                warn!(
                    event_id = %intent.event_id,
                    %error,
                    "discarding failed phase write"
                );
            }
        }
    }
    debug!("phase writer stopped");
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::ManualClock;
    use crate::errors::StoreResult;
    use crate::event::EventKind;
    use crate::store::{Page, PublicEventFilter};
    use crate::types::{EventName, JoinCode, Timestamp};
    use async_trait::async_trait;
    use chrono::Duration;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use tokio::sync::Notify;

    /// Records conditional phase writes; all other operations are unused
    /// by these tests.
    #[derive(Default)]
    struct PhaseWriteProbe {
        writes: AtomicUsize,
        notify: Notify,
    }

    #[async_trait]
    impl EventStore for PhaseWriteProbe {
        async fn insert(&self, _event: &Event) -> StoreResult<()> {
            unimplemented!("not exercised")
        }

        async fn get(&self, _id: &EventId) -> StoreResult<Option<Event>> {
            unimplemented!("not exercised")
        }

        async fn update(&self, _event: &Event) -> StoreResult<()> {
            unimplemented!("not exercised")
        }

        async fn set_phase_unless_cancelled(
            &self,
            _id: &EventId,
            _phase: EventPhase,
        ) -> StoreResult<bool> {
            self.writes.fetch_add(1, Ordering::SeqCst);
            self.notify.notify_one();
            Ok(true)
        }

        async fn find_by_join_code(&self, _code: &JoinCode) -> StoreResult<Option<Event>> {
            unimplemented!("not exercised")
        }

        async fn list_public(
            &self,
            _filter: &PublicEventFilter,
            _page: &Page,
        ) -> StoreResult<Vec<Event>> {
            unimplemented!("not exercised")
        }

        async fn delete(&self, _id: &EventId) -> StoreResult<bool> {
            unimplemented!("not exercised")
        }
    }

    fn event_with_window(phase: EventPhase, start_offset_h: i64, end_offset_h: i64) -> Event {
        let now = Timestamp::now();
        Event {
            id: EventId::new(),
            kind: EventKind::Private,
            phase,
            name: EventName::try_new("probe").unwrap(),
            description: None,
            organizer: None,
            starts_at: Some(Timestamp::new(
                *now.as_datetime() + Duration::hours(start_offset_h),
            )),
            ends_at: Some(Timestamp::new(
                *now.as_datetime() + Duration::hours(end_offset_h),
            )),
            location: None,
            images: vec![],
            join_code: JoinCode::try_new("RC00TEST").unwrap(),
            created_at: now,
        }
    }

    #[tokio::test]
    async fn cancelled_records_pass_through_untouched() {
        let store = Arc::new(PhaseWriteProbe::default());
        let clock = ManualClock::starting_at(Timestamp::now());
        let reconciler =
            LifecycleReconciler::spawn(Arc::clone(&store), clock, ReconcilerConfig::default());

        // Window long past; derivation would say Completed.
        let event = event_with_window(EventPhase::Cancelled, -48, -24);
        let out = reconciler.reconcile(event);

        assert_eq!(out.phase, EventPhase::Cancelled);
        tokio::task::yield_now().await;
        assert_eq!(store.writes.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn matching_phase_schedules_no_write() {
        let store = Arc::new(PhaseWriteProbe::default());
        let clock = ManualClock::starting_at(Timestamp::now());
        let reconciler =
            LifecycleReconciler::spawn(Arc::clone(&store), clock, ReconcilerConfig::default());

        let event = event_with_window(EventPhase::Ongoing, -1, 1);
        let out = reconciler.reconcile(event.clone());

        assert_eq!(out, event);
        tokio::task::yield_now().await;
        assert_eq!(store.writes.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn stale_phase_is_corrected_synchronously_and_persisted_later() {
        let store = Arc::new(PhaseWriteProbe::default());
        let clock = ManualClock::starting_at(Timestamp::now());
        let reconciler =
            LifecycleReconciler::spawn(Arc::clone(&store), clock, ReconcilerConfig::default());

        let event = event_with_window(EventPhase::Scheduled, -2, -1);
        let out = reconciler.reconcile(event);

        // Correct value is returned before any persistence happened.
        assert_eq!(out.phase, EventPhase::Completed);

        tokio::time::timeout(std::time::Duration::from_secs(1), store.notify.notified())
            .await
            .expect("background write should land");
        assert_eq!(store.writes.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn batches_reconcile_independently() {
        let store = Arc::new(PhaseWriteProbe::default());
        let clock = ManualClock::starting_at(Timestamp::now());
        let reconciler =
            LifecycleReconciler::spawn(Arc::clone(&store), clock, ReconcilerConfig::default());

        let events = vec![
            event_with_window(EventPhase::Scheduled, -2, -1),
            event_with_window(EventPhase::Cancelled, -2, -1),
            event_with_window(EventPhase::Scheduled, 1, 2),
        ];
        let out = reconciler.reconcile_all(events);

        assert_eq!(out[0].phase, EventPhase::Completed);
        assert_eq!(out[1].phase, EventPhase::Cancelled);
        assert_eq!(out[2].phase, EventPhase::Scheduled);
    }
}
