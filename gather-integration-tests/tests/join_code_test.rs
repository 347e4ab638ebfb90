//! Join-code issuance and membership-by-code behavior: bounded collision
//! retry, store-wide uniqueness, idempotent joins and code rotation.

mod common;

use std::collections::HashSet;
use std::sync::Arc;

use common::{harness, minimal_new_event, seeded_event, user, Harness};
use gather::join_code::FixedCodeSource;
use gather::service::EventLifecycleService;
use gather::types::JoinCode;
use gather::{EventStore, LifecycleError, MembershipStore, Role};

/// A harness whose service always generates the same pinned join code.
fn harness_with_pinned_code(code: &str) -> Harness {
    let base = harness();
    let pinned = JoinCode::try_new(code.to_string()).unwrap();
    let service = EventLifecycleService::new(
        Arc::clone(&base.events),
        Arc::clone(&base.memberships),
        base.clock.clone(),
    )
    .with_code_source(Box::new(FixedCodeSource::new(pinned)));
    Harness {
        events: base.events,
        memberships: base.memberships,
        clock: base.clock,
        service,
    }
}

#[tokio::test]
async fn exhausted_code_generation_aborts_creation_entirely() {
    let h = harness_with_pinned_code("PINNED01");

    // The only code the source can produce is already taken.
    let occupant = seeded_event("PINNED01", &h.clock);
    h.events.insert(&occupant).await.unwrap();

    let err = h
        .service
        .create(minimal_new_event(&h.clock), user())
        .await
        .unwrap_err();
    match err {
        LifecycleError::GenerationExhausted { attempts } => assert_eq!(attempts, 5),
        other => panic!("expected GenerationExhausted, got {other:?}"),
    }

    // Nothing was persisted: the occupant is still the only event, and no
    // membership was created for the would-be owner.
    assert!(h.events.stored(&occupant.id).is_some());
    assert!(h.memberships.is_empty());
}

#[tokio::test]
async fn created_events_carry_pairwise_distinct_codes() {
    let h = harness();
    let mut codes = HashSet::new();
    for _ in 0..32 {
        let event = h
            .service
            .create(minimal_new_event(&h.clock), user())
            .await
            .unwrap();
        assert!(
            codes.insert(event.join_code.clone()),
            "duplicate join code issued: {}",
            event.join_code
        );
    }
    assert_eq!(codes.len(), 32);
}

#[tokio::test]
async fn joining_by_code_creates_a_member_membership() {
    let h = harness();
    let owner = user();
    let joiner = user();
    let event = h
        .service
        .create(minimal_new_event(&h.clock), owner)
        .await
        .unwrap();

    let joined_id = h.service.join(&event.join_code, joiner).await.unwrap();
    assert_eq!(joined_id, event.id);

    let membership = h
        .memberships
        .find(&event.id, &joiner)
        .await
        .unwrap()
        .expect("joiner should hold a membership");
    assert_eq!(membership.role, Role::Member);
}

#[tokio::test]
async fn joining_twice_leaves_a_single_membership() {
    let h = harness();
    let joiner = user();
    let event = h
        .service
        .create(minimal_new_event(&h.clock), user())
        .await
        .unwrap();

    h.service.join(&event.join_code, joiner).await.unwrap();
    h.service.join(&event.join_code, joiner).await.unwrap();

    let members = h.service.members(event.id).await.unwrap();
    let of_joiner: Vec<_> = members
        .iter()
        .filter(|membership| membership.user_id == joiner)
        .collect();
    assert_eq!(of_joiner.len(), 1);
}

#[tokio::test]
async fn joining_with_an_unknown_code_is_not_found() {
    let h = harness();
    let code = JoinCode::try_new("NOSUCH01").unwrap();
    let err = h.service.join(&code, user()).await.unwrap_err();
    assert!(matches!(err, LifecycleError::UnknownJoinCode));
}

#[tokio::test]
async fn rotating_the_join_code_invalidates_the_old_one() {
    let h = harness();
    let event = h
        .service
        .create(minimal_new_event(&h.clock), user())
        .await
        .unwrap();
    let old_code = event.join_code.clone();

    let rotated = h
        .service
        .regenerate_join_code(event.id, Some(Role::Owner))
        .await
        .unwrap();
    assert_ne!(rotated.join_code, old_code);

    let err = h.service.join(&old_code, user()).await.unwrap_err();
    assert!(matches!(err, LifecycleError::UnknownJoinCode));

    h.service.join(&rotated.join_code, user()).await.unwrap();
}

#[tokio::test]
async fn code_rotation_is_owner_only() {
    let h = harness();
    let event = h
        .service
        .create(minimal_new_event(&h.clock), user())
        .await
        .unwrap();

    for role in [Some(Role::Lead), Some(Role::Member), None] {
        let err = h
            .service
            .regenerate_join_code(event.id, role)
            .await
            .unwrap_err();
        assert!(matches!(err, LifecycleError::Forbidden { .. }));
    }
}
