//! Entry expiration policy.
//!
//! A policy is a value object describing when a cache entry stops being valid.
//! It stores the three independent dimensions and validates relative durations;
//! each backend decides how the dimensions combine via [`ResolvedExpiration`].

use crate::{CacheError, CacheResult};
use chrono::{DateTime, Utc};
use std::time::Duration;

/// When a cache entry becomes invalid.
///
/// All fields are optional and may be set together. An empty policy means the
/// entry lives until it is removed or evicted.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct EntryExpirationPolicy {
    absolute_expiration: Option<DateTime<Utc>>,
    absolute_expiration_relative_to_now: Option<Duration>,
    sliding_expiration: Option<Duration>,
}

impl EntryExpirationPolicy {
    /// Creates an empty policy.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            absolute_expiration: None,
            absolute_expiration_relative_to_now: None,
            sliding_expiration: None,
        }
    }

    /// Sets an absolute expiration date. Past dates are accepted as-is.
    #[must_use]
    pub fn with_absolute_expiration(mut self, at: DateTime<Utc>) -> Self {
        self.absolute_expiration = Some(at);
        self
    }

    /// Sets an absolute expiration relative to the time the entry is written.
    ///
    /// # Errors
    ///
    /// Returns [`CacheError::InvalidArgument`] when `duration` is not positive.
    pub fn with_absolute_expiration_relative_to_now(
        mut self,
        duration: chrono::Duration,
    ) -> CacheResult<Self> {
        self.set_absolute_expiration_relative_to_now(duration)?;
        Ok(self)
    }

    /// Sets how long the entry may stay unread before it expires.
    ///
    /// # Errors
    ///
    /// Returns [`CacheError::InvalidArgument`] when `duration` is not positive.
    pub fn with_sliding_expiration(mut self, duration: chrono::Duration) -> CacheResult<Self> {
        self.set_sliding_expiration(duration)?;
        Ok(self)
    }

    /// Replaces the absolute expiration date.
    pub fn set_absolute_expiration(&mut self, at: Option<DateTime<Utc>>) {
        self.absolute_expiration = at;
    }

    /// Replaces the relative absolute expiration.
    ///
    /// # Errors
    ///
    /// Returns [`CacheError::InvalidArgument`] when `duration` is not positive.
    pub fn set_absolute_expiration_relative_to_now(
        &mut self,
        duration: chrono::Duration,
    ) -> CacheResult<()> {
        self.absolute_expiration_relative_to_now = Some(positive(
            duration,
            "The relative expiration value must be positive.",
        )?);
        Ok(())
    }

    /// Replaces the sliding expiration.
    ///
    /// # Errors
    ///
    /// Returns [`CacheError::InvalidArgument`] when `duration` is not positive.
    pub fn set_sliding_expiration(&mut self, duration: chrono::Duration) -> CacheResult<()> {
        self.sliding_expiration = Some(positive(
            duration,
            "The sliding expiration value must be positive.",
        )?);
        Ok(())
    }

    /// Returns the absolute expiration date.
    #[must_use]
    pub const fn absolute_expiration(&self) -> Option<DateTime<Utc>> {
        self.absolute_expiration
    }

    /// Returns the absolute expiration relative to now.
    #[must_use]
    pub const fn absolute_expiration_relative_to_now(&self) -> Option<Duration> {
        self.absolute_expiration_relative_to_now
    }

    /// Returns the sliding expiration.
    #[must_use]
    pub const fn sliding_expiration(&self) -> Option<Duration> {
        self.sliding_expiration
    }

    /// Returns true if no dimension is set.
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.absolute_expiration.is_none()
            && self.absolute_expiration_relative_to_now.is_none()
            && self.sliding_expiration.is_none()
    }

    /// Pins the policy to a write time.
    ///
    /// The relative duration wins over the absolute date when both are set.
    #[must_use]
    pub fn resolve(&self, now: DateTime<Utc>) -> ResolvedExpiration {
        let deadline = match self.absolute_expiration_relative_to_now {
            Some(relative) => chrono::Duration::from_std(relative)
                .ok()
                .and_then(|relative| now.checked_add_signed(relative)),
            None => self.absolute_expiration,
        };

        ResolvedExpiration {
            deadline,
            sliding: self.sliding_expiration,
        }
    }
}

/// Expiration of a concrete entry, pinned to the time it was written.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ResolvedExpiration {
    deadline: Option<DateTime<Utc>>,
    sliding: Option<Duration>,
}

impl ResolvedExpiration {
    /// An entry that never expires on its own.
    pub const NEVER: Self = Self {
        deadline: None,
        sliding: None,
    };

    /// Creates a resolved expiration from its parts.
    #[must_use]
    pub const fn new(deadline: Option<DateTime<Utc>>, sliding: Option<Duration>) -> Self {
        Self { deadline, sliding }
    }

    /// Returns the absolute deadline.
    #[must_use]
    pub const fn deadline(&self) -> Option<DateTime<Utc>> {
        self.deadline
    }

    /// Returns the sliding window.
    #[must_use]
    pub const fn sliding(&self) -> Option<Duration> {
        self.sliding
    }

    /// Returns true if the deadline has already passed at `now`.
    #[must_use]
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        self.deadline.is_some_and(|deadline| deadline <= now)
    }

    /// How long the entry stays valid when written or read at `now`.
    ///
    /// Sliding windows never extend past the deadline. `None` means no expiry.
    #[must_use]
    pub fn time_to_live(&self, now: DateTime<Utc>) -> Option<Duration> {
        let until_deadline = self
            .deadline
            .map(|deadline| (deadline - now).to_std().unwrap_or(Duration::ZERO));

        match (until_deadline, self.sliding) {
            (Some(remaining), Some(sliding)) => Some(remaining.min(sliding)),
            (Some(remaining), None) => Some(remaining),
            (None, sliding) => sliding,
        }
    }
}

fn positive(duration: chrono::Duration, message: &str) -> CacheResult<Duration> {
    if duration <= chrono::Duration::zero() {
        return Err(CacheError::invalid_argument(message));
    }
    duration
        .to_std()
        .map_err(|_| CacheError::invalid_argument(message))
}
