//! Lifecycle phase derivation.
//!
//! An event's phase is a function of its time window and the current moment,
//! except for cancellation, which is an explicit, sticky state. That split is
//! encoded in the types: [`derive_phase`] returns a [`DerivedPhase`], which
//! has no `Cancelled` variant, so automatic derivation can never produce or
//! overwrite a cancellation by construction.

use serde::{Deserialize, Serialize};

use crate::types::Timestamp;

/// The lifecycle phase of an event as stored and exposed to callers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EventPhase {
    /// The event has not started yet (or its window is not fully known).
    Scheduled,
    /// The current moment lies within the event's window, bounds inclusive.
    Ongoing,
    /// The event's window has passed.
    Completed,
    /// The event was explicitly cancelled. Sticky: never produced or
    /// replaced by derivation.
    Cancelled,
}

impl EventPhase {
    /// Whether this phase is the sticky cancelled state.
    pub const fn is_cancelled(self) -> bool {
        matches!(self, Self::Cancelled)
    }
}

impl std::fmt::Display for EventPhase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::Scheduled => "scheduled",
            Self::Ongoing => "ongoing",
            Self::Completed => "completed",
            Self::Cancelled => "cancelled",
        };
        f.write_str(s)
    }
}

/// A phase produced by time-window derivation.
///
/// Deliberately a separate type from [`EventPhase`]: derivation is total over
/// the three temporal phases and cannot express cancellation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DerivedPhase {
    /// Not started yet.
    Scheduled,
    /// In progress.
    Ongoing,
    /// Over.
    Completed,
}

impl From<DerivedPhase> for EventPhase {
    fn from(derived: DerivedPhase) -> Self {
        match derived {
            DerivedPhase::Scheduled => Self::Scheduled,
            DerivedPhase::Ongoing => Self::Ongoing,
            DerivedPhase::Completed => Self::Completed,
        }
    }
}

/// Derives the temporal phase of a time window at a given moment.
///
/// Pure and total. Both bounds are inclusive: an event is `Ongoing` at
/// exactly `starts_at` and at exactly `ends_at`. A window with either bound
/// absent derives as `Scheduled`, the conservative default for records whose
/// schedule has not been fully filled in.
pub fn derive_phase(
    starts_at: Option<Timestamp>,
    ends_at: Option<Timestamp>,
    now: Timestamp,
) -> DerivedPhase {
    let (Some(starts_at), Some(ends_at)) = (starts_at, ends_at) else {
        return DerivedPhase::Scheduled;
    };

    if now > ends_at {
        DerivedPhase::Completed
    } else if now >= starts_at {
        DerivedPhase::Ongoing
    } else {
        DerivedPhase::Scheduled
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{DateTime, Duration, TimeZone, Utc};
    use proptest::prelude::*;

    fn ts(secs: i64) -> Timestamp {
        Timestamp::new(Utc.timestamp_opt(secs, 0).single().expect("valid instant"))
    }

    #[test]
    fn absent_bounds_derive_as_scheduled() {
        let now = ts(1_000);
        assert_eq!(derive_phase(None, None, now), DerivedPhase::Scheduled);
        assert_eq!(derive_phase(Some(ts(0)), None, now), DerivedPhase::Scheduled);
        assert_eq!(derive_phase(None, Some(ts(2_000)), now), DerivedPhase::Scheduled);
    }

    #[test]
    fn boundaries_are_inclusive_on_both_ends() {
        let start = ts(100);
        let end = ts(200);

        assert_eq!(derive_phase(Some(start), Some(end), start), DerivedPhase::Ongoing);
        assert_eq!(derive_phase(Some(start), Some(end), end), DerivedPhase::Ongoing);

        let just_before = Timestamp::new(*start.as_datetime() - Duration::nanoseconds(1));
        let just_after = Timestamp::new(*end.as_datetime() + Duration::nanoseconds(1));
        assert_eq!(
            derive_phase(Some(start), Some(end), just_before),
            DerivedPhase::Scheduled
        );
        assert_eq!(
            derive_phase(Some(start), Some(end), just_after),
            DerivedPhase::Completed
        );
    }

    #[test]
    fn zero_length_window_is_ongoing_at_its_instant() {
        let at = ts(500);
        assert_eq!(derive_phase(Some(at), Some(at), at), DerivedPhase::Ongoing);
    }

    #[test]
    fn derived_phase_never_converts_to_cancelled() {
        for derived in [
            DerivedPhase::Scheduled,
            DerivedPhase::Ongoing,
            DerivedPhase::Completed,
        ] {
            assert_ne!(EventPhase::from(derived), EventPhase::Cancelled);
        }
    }

    prop_compose! {
        fn arb_instant()(secs in -4_102_444_800i64..4_102_444_800i64) -> DateTime<Utc> {
            Utc.timestamp_opt(secs, 0).single().expect("in-range instant")
        }
    }

    proptest! {
        #[test]
        fn derivation_is_deterministic(
            start in arb_instant(),
            end in arb_instant(),
            now in arb_instant(),
        ) {
            let a = derive_phase(Some(start.into()), Some(end.into()), now.into());
            let b = derive_phase(Some(start.into()), Some(end.into()), now.into());
            prop_assert_eq!(a, b);
        }

        #[test]
        fn derivation_partitions_the_timeline(
            start in arb_instant(),
            len_secs in 0i64..(86_400 * 30),
            now in arb_instant(),
        ) {
            let end = start + Duration::seconds(len_secs);
            let derived = derive_phase(Some(start.into()), Some(end.into()), now.into());
            let expected = if now > end {
                DerivedPhase::Completed
            } else if now < start {
                DerivedPhase::Scheduled
            } else {
                DerivedPhase::Ongoing
            };
            prop_assert_eq!(derived, expected);
        }
    }
}
