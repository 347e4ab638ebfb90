//! The private→public visibility gate.
//!
//! A public event must present a complete page: name, description,
//! organizer, a full time window, a location and at least one image. The
//! guard reports every missing field in a single pass so a caller can fix
//! the whole form at once instead of resubmitting per field.
//!
//! Blank strings are unrepresentable here: the constrained types in
//! [`crate::types`] reject empty or whitespace-only values at construction,
//! so presence checks reduce to `Option`/`Vec` emptiness.

use serde::{Deserialize, Serialize};

use crate::errors::{LifecycleError, LifecycleResult};
use crate::event::Event;

/// A field required for an event to be publicly listed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PublicField {
    /// Display name.
    Name,
    /// Long-form description.
    Description,
    /// Organizing body.
    Organizer,
    /// Window start.
    StartsAt,
    /// Window end.
    EndsAt,
    /// Venue.
    Location,
    /// At least one uploaded image.
    Image,
}

impl std::fmt::Display for PublicField {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::Name => "name",
            Self::Description => "description",
            Self::Organizer => "organizer",
            Self::StartsAt => "starts_at",
            Self::EndsAt => "ends_at",
            Self::Location => "location",
            Self::Image => "image",
        };
        f.write_str(s)
    }
}

/// Returns every public-required field the candidate record lacks.
///
/// Pure; the order of the returned list follows the declaration order of
/// [`PublicField`]. An empty result means the record may be published.
pub fn missing_for_publish(candidate: &Event) -> Vec<PublicField> {
    let mut missing = Vec::new();
    // `name` is structurally required on the record, so it can never be
    // reported missing; it stays in the enum because the public contract
    // names it as part of the required set.
    if candidate.description.is_none() {
        missing.push(PublicField::Description);
    }
    if candidate.organizer.is_none() {
        missing.push(PublicField::Organizer);
    }
    if candidate.starts_at.is_none() {
        missing.push(PublicField::StartsAt);
    }
    if candidate.ends_at.is_none() {
        missing.push(PublicField::EndsAt);
    }
    if candidate.location.is_none() {
        missing.push(PublicField::Location);
    }
    if candidate.images.is_empty() {
        missing.push(PublicField::Image);
    }
    missing
}

/// Checks the candidate against the public-required set, returning
/// [`LifecycleError::MissingFields`] with the complete deficiency list on
/// failure.
pub fn ensure_publishable(candidate: &Event) -> LifecycleResult<()> {
    let missing = missing_for_publish(candidate);
    if missing.is_empty() {
        Ok(())
    } else {
        Err(LifecycleError::MissingFields(missing))
    }
}
