//! Shared fixtures for the integration tests.

#![allow(dead_code)]

use std::sync::Arc;
use std::time::Duration as StdDuration;

use chrono::{Duration, TimeZone, Utc};
use gather::event::{Event, EventKind, NewEvent};
use gather::phase::EventPhase;
use gather::service::EventLifecycleService;
use gather::types::{
    EventDescription, EventId, EventName, ImageUrl, JoinCode, Location, Organizer, Timestamp,
    UserId,
};
use gather::ManualClock;
use gather_memory::{InMemoryEventStore, InMemoryMembershipStore};

pub type TestService =
    EventLifecycleService<InMemoryEventStore, InMemoryMembershipStore, ManualClock>;

/// Everything a test needs: the service plus direct handles on its
/// collaborators for seeding and for asserting on stored state.
pub struct Harness {
    pub events: Arc<InMemoryEventStore>,
    pub memberships: Arc<InMemoryMembershipStore>,
    pub clock: ManualClock,
    pub service: TestService,
}

/// A fixed, readable starting instant for the manual clock.
pub fn test_epoch() -> Timestamp {
    Timestamp::new(
        Utc.with_ymd_and_hms(2025, 6, 1, 12, 0, 0)
            .single()
            .expect("valid fixed instant"),
    )
}

pub fn harness() -> Harness {
    let events = Arc::new(InMemoryEventStore::new());
    let memberships = Arc::new(InMemoryMembershipStore::new());
    let clock = ManualClock::starting_at(test_epoch());
    let service = EventLifecycleService::new(
        Arc::clone(&events),
        Arc::clone(&memberships),
        clock.clone(),
    );
    Harness {
        events,
        memberships,
        clock,
        service,
    }
}

/// An instant offset from the harness clock's current moment.
pub fn at(clock: &ManualClock, offset: Duration) -> Timestamp {
    use gather::Clock;
    Timestamp::new(*clock.now().as_datetime() + offset)
}

/// A minimal private event starting one hour from the clock's now and
/// running for two hours.
pub fn minimal_new_event(clock: &ManualClock) -> NewEvent {
    NewEvent::new(
        EventName::try_new("Board games night").unwrap(),
        at(clock, Duration::hours(1)),
        at(clock, Duration::hours(3)),
    )
}

/// A creation input that satisfies the whole public-required field set.
pub fn complete_new_event(clock: &ManualClock) -> NewEvent {
    minimal_new_event(clock)
        .with_description(EventDescription::try_new("An open evening of board games.").unwrap())
        .with_organizer(Organizer::try_new("Student Union").unwrap())
        .with_location(Location::try_new("Common room, building 4").unwrap())
        .with_image(ImageUrl::try_new("media/games-night.png").unwrap())
}

/// Seeds a raw event record directly into the store, bypassing the
/// service, the way records written by other platform components appear.
pub fn seeded_event(code: &str, clock: &ManualClock) -> Event {
    use gather::Clock;
    Event {
        id: EventId::new(),
        kind: EventKind::Private,
        phase: EventPhase::Scheduled,
        name: EventName::try_new("Seeded record").unwrap(),
        description: None,
        organizer: None,
        starts_at: Some(at(clock, Duration::hours(1))),
        ends_at: Some(at(clock, Duration::hours(2))),
        location: None,
        images: vec![],
        join_code: JoinCode::try_new(code.to_string()).unwrap(),
        created_at: clock.now(),
    }
}

pub fn user() -> UserId {
    UserId::random()
}

/// Polls the store until the cached phase of `id` equals `expected`,
/// failing the test after a generous timeout. Used to observe the
/// reconciler's fire-and-forget persistence landing.
pub async fn wait_for_stored_phase(
    store: &InMemoryEventStore,
    id: &EventId,
    expected: EventPhase,
) {
    for _ in 0..100 {
        if store.stored(id).map(|event| event.phase) == Some(expected) {
            return;
        }
        tokio::time::sleep(StdDuration::from_millis(10)).await;
    }
    panic!("stored phase of {id} never became {expected}");
}
