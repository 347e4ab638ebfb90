//! The event record and its creation/update inputs.

use serde::{Deserialize, Serialize};

use crate::phase::EventPhase;
use crate::types::{
    EventDescription, EventId, EventName, ImageUrl, JoinCode, Location, Organizer, Timestamp,
};

/// Visibility of an event on the platform.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EventKind {
    /// Reachable only through its join code.
    Private,
    /// Listed publicly; requires the public-required field set to be complete.
    Public,
}

impl EventKind {
    /// Whether this is the public kind.
    pub const fn is_public(self) -> bool {
        matches!(self, Self::Public)
    }
}

impl std::fmt::Display for EventKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Private => f.write_str("private"),
            Self::Public => f.write_str("public"),
        }
    }
}

/// An event as persisted by the platform store.
///
/// The time window bounds are optional on the record: other platform
/// components may persist partially scheduled events, and phase derivation
/// treats an incomplete window as `Scheduled`. The stored `phase` is a cached
/// value that may lag real time; readers go through the reconciler.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Event {
    /// Unique identifier.
    pub id: EventId,
    /// Private or public visibility.
    pub kind: EventKind,
    /// Cached lifecycle phase as of the last write.
    pub phase: EventPhase,
    /// Display name.
    pub name: EventName,
    /// Long-form description.
    pub description: Option<EventDescription>,
    /// The organizing body shown on the event page.
    pub organizer: Option<Organizer>,
    /// Start of the event window.
    pub starts_at: Option<Timestamp>,
    /// End of the event window; never before `starts_at` when both are set.
    pub ends_at: Option<Timestamp>,
    /// Venue.
    pub location: Option<Location>,
    /// Uploaded image references.
    pub images: Vec<ImageUrl>,
    /// Unique short token for joining the event.
    pub join_code: JoinCode,
    /// When the record was created.
    pub created_at: Timestamp,
}

/// Fields supplied when creating an event.
///
/// Unlike the stored record, creation requires a complete time window; the
/// service validates ordering and rejects windows already in the past.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewEvent {
    /// Display name.
    pub name: EventName,
    /// Long-form description.
    pub description: Option<EventDescription>,
    /// The organizing body.
    pub organizer: Option<Organizer>,
    /// Venue.
    pub location: Option<Location>,
    /// Uploaded image references.
    pub images: Vec<ImageUrl>,
    /// Start of the event window.
    pub starts_at: Timestamp,
    /// End of the event window.
    pub ends_at: Timestamp,
    /// Requested visibility.
    pub kind: EventKind,
}

impl NewEvent {
    /// Creates a minimal private event input with the given window.
    pub const fn new(name: EventName, starts_at: Timestamp, ends_at: Timestamp) -> Self {
        Self {
            name,
            description: None,
            organizer: None,
            location: None,
            images: Vec::new(),
            starts_at,
            ends_at,
            kind: EventKind::Private,
        }
    }

    /// Sets the description.
    #[must_use]
    pub fn with_description(mut self, description: EventDescription) -> Self {
        self.description = Some(description);
        self
    }

    /// Sets the organizer.
    #[must_use]
    pub fn with_organizer(mut self, organizer: Organizer) -> Self {
        self.organizer = Some(organizer);
        self
    }

    /// Sets the location.
    #[must_use]
    pub fn with_location(mut self, location: Location) -> Self {
        self.location = Some(location);
        self
    }

    /// Adds an image reference.
    #[must_use]
    pub fn with_image(mut self, image: ImageUrl) -> Self {
        self.images.push(image);
        self
    }

    /// Sets the requested visibility.
    #[must_use]
    pub const fn with_kind(mut self, kind: EventKind) -> Self {
        self.kind = kind;
        self
    }
}

/// A partial update to an event.
///
/// Absent fields are left unchanged; there is no way to clear an optional
/// field back to empty through a patch. Cancellation is an explicit flag
/// rather than a phase value, since `Cancelled` is the only phase a caller
/// may request directly.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EventPatch {
    /// Replacement display name.
    pub name: Option<EventName>,
    /// Replacement description.
    pub description: Option<EventDescription>,
    /// Replacement organizer.
    pub organizer: Option<Organizer>,
    /// Replacement venue.
    pub location: Option<Location>,
    /// Replacement image list.
    pub images: Option<Vec<ImageUrl>>,
    /// Replacement window start.
    pub starts_at: Option<Timestamp>,
    /// Replacement window end.
    pub ends_at: Option<Timestamp>,
    /// Replacement visibility.
    pub kind: Option<EventKind>,
    /// Request the one-way cancellation transition. Always wins over any
    /// other patch content.
    pub cancel: bool,
}

impl EventPatch {
    /// A patch that requests cancellation and nothing else.
    pub fn cancellation() -> Self {
        Self {
            cancel: true,
            ..Self::default()
        }
    }

    /// Applies the patch's present fields onto a copy of `event`.
    ///
    /// Phase and cancellation are not handled here; the service owns that
    /// branch since it depends on the stored phase and on real time.
    #[must_use]
    pub fn apply_to(&self, event: &Event) -> Event {
        let mut merged = event.clone();
        if let Some(name) = &self.name {
            merged.name = name.clone();
        }
        if let Some(description) = &self.description {
            merged.description = Some(description.clone());
        }
        if let Some(organizer) = &self.organizer {
            merged.organizer = Some(organizer.clone());
        }
        if let Some(location) = &self.location {
            merged.location = Some(location.clone());
        }
        if let Some(images) = &self.images {
            merged.images.clone_from(images);
        }
        if let Some(starts_at) = self.starts_at {
            merged.starts_at = Some(starts_at);
        }
        if let Some(ends_at) = self.ends_at {
            merged.ends_at = Some(ends_at);
        }
        if let Some(kind) = self.kind {
            merged.kind = kind;
        }
        merged
    }
}
