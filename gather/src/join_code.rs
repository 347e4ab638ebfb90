//! Join-code issuance.
//!
//! Codes are short random alphanumeric tokens, unique among live events.
//! Issuance is optimistic: generate, pre-check against the store, retry a
//! bounded number of times. The pre-check is a cheap filter, not the
//! uniqueness guarantee. The store enforces the constraint on write, and
//! the service retries a constraint violation within the same budget, so a
//! race between two creations cannot leak a duplicate code.

use std::sync::Arc;

use rand::distr::Alphanumeric;
use rand::Rng;
use tracing::debug;

use crate::errors::{LifecycleError, LifecycleResult};
use crate::store::EventStore;
use crate::types::{CodeLength, JoinCode};

/// Default number of codes tried before giving up.
pub const DEFAULT_MAX_ATTEMPTS: u32 = 5;

/// Tunables for join-code issuance.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct JoinCodePolicy {
    /// Length of generated codes.
    pub length: CodeLength,
    /// Retry budget for collisions, shared by the pre-check loop and the
    /// insert-conflict path.
    pub max_attempts: u32,
}

impl Default for JoinCodePolicy {
    fn default() -> Self {
        Self {
            length: CodeLength::default(),
            max_attempts: DEFAULT_MAX_ATTEMPTS,
        }
    }
}

/// Source of candidate codes.
///
/// The default [`RandomCodeSource`] samples uniformly; tests substitute a
/// deterministic source to exercise collision handling.
pub trait CodeSource: Send + Sync {
    /// Produces one candidate code of the requested length.
    fn next_code(&self, length: CodeLength) -> JoinCode;
}

/// Uniform random alphanumeric codes.
#[derive(Debug, Clone, Copy, Default)]
pub struct RandomCodeSource;

impl CodeSource for RandomCodeSource {
    fn next_code(&self, length: CodeLength) -> JoinCode {
        let length: usize = length.into();
        let raw: String = rand::rng()
            .sample_iter(&Alphanumeric)
            .take(length)
            .map(char::from)
            .collect();
        // Alphanumeric sampling at a CodeLength is always a valid JoinCode
        JoinCode::try_new(raw).expect("sampled code should satisfy the JoinCode predicate")
    }
}

/// A source that always yields the same code.
///
/// Useful for deterministic tests of collision and exhaustion behavior.
#[derive(Debug, Clone)]
pub struct FixedCodeSource {
    code: JoinCode,
}

impl FixedCodeSource {
    /// Creates a source pinned to `code`.
    pub const fn new(code: JoinCode) -> Self {
        Self { code }
    }
}

impl CodeSource for FixedCodeSource {
    fn next_code(&self, _length: CodeLength) -> JoinCode {
        self.code.clone()
    }
}

/// Issues store-wide-unique join codes with bounded retry.
pub struct JoinCodeIssuer<ES> {
    store: Arc<ES>,
    policy: JoinCodePolicy,
    source: Box<dyn CodeSource>,
}

impl<ES> JoinCodeIssuer<ES>
where
    ES: EventStore,
{
    /// Creates an issuer over the given store with the default random
    /// source.
    pub fn new(store: Arc<ES>, policy: JoinCodePolicy) -> Self {
        Self {
            store,
            policy,
            source: Box::new(RandomCodeSource),
        }
    }

    /// Replaces the code source.
    pub fn set_source(&mut self, source: Box<dyn CodeSource>) {
        self.source = source;
    }

    /// The active policy.
    pub const fn policy(&self) -> JoinCodePolicy {
        self.policy
    }

    /// Replaces the policy.
    pub fn set_policy(&mut self, policy: JoinCodePolicy) {
        self.policy = policy;
    }

    /// Produces a code that no live event held at check time.
    ///
    /// Fails with [`LifecycleError::GenerationExhausted`] once the retry
    /// budget is spent. The caller must abort whatever creation the code was
    /// for; the error indicates code-space saturation rather than a client
    /// mistake.
    pub async fn issue(&self) -> LifecycleResult<JoinCode> {
        for attempt in 1..=self.policy.max_attempts {
            let candidate = self.source.next_code(self.policy.length);
            if self.store.find_by_join_code(&candidate).await?.is_none() {
                return Ok(candidate);
            }
            debug!(attempt, "join code collision, retrying");
        }
        Err(LifecycleError::GenerationExhausted {
            attempts: self.policy.max_attempts,
        })
    }
}

impl<ES> std::fmt::Debug for JoinCodeIssuer<ES> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("JoinCodeIssuer")
            .field("policy", &self.policy)
            .finish_non_exhaustive()
    }
}
