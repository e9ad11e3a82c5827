//! Rate-limited broadcast coalescer.
//!
//! Local state changes arrive in bursts (cursor moves fire on every frame);
//! the wire should see at most one message per channel per flush window.
//! The coalescer records only the latest pending value: recording while a
//! flush is already scheduled overwrites the slot without scheduling a
//! second flush.
//!
//! # Guarantees
//!
//! - Within any window of `1000 / updates_per_second` ms, at most one value
//!   is delivered.
//! - The last value recorded before a window closes is always eventually
//!   delivered; a terminal value is never silently dropped.
//! - NOT guaranteed: intermediate values between two flushes may never be
//!   observed (at-most-latest, not at-least-once per change).
//!
//! This is a pure deadline holder in the sans-IO style: `record`/`update`
//! arm a deadline, the driver calls [`Coalescer::poll`] at or after
//! [`Coalescer::next_deadline`].

use std::{ops::Add, time::Duration};

/// Last-value-wins coalescer for one logical channel.
///
/// `T` is the pending value; `I` the instant type from the environment.
#[derive(Debug, Clone)]
pub struct Coalescer<T, I> {
    interval: Duration,
    pending: Option<T>,
    deadline: Option<I>,
}

impl<T, I> Coalescer<T, I>
where
    I: Copy + Ord + Add<Duration, Output = I>,
{
    /// Create a coalescer flushing at most `updates_per_second` times per
    /// second. A zero rate is clamped to one update per second.
    pub fn new(updates_per_second: u32) -> Self {
        let interval = Duration::from_millis(1000 / u64::from(updates_per_second.max(1)));
        Self { interval, pending: None, deadline: None }
    }

    /// Record `value` as the latest pending value.
    ///
    /// Arms the flush deadline if none is pending; otherwise only the slot
    /// is overwritten.
    pub fn record(&mut self, now: I, value: T) {
        self.pending = Some(value);
        self.arm(now);
    }

    /// Merge into the pending value (created via `Default` if the slot is
    /// empty), arming the deadline like [`Coalescer::record`].
    ///
    /// Used where one channel carries several independently-queued
    /// sub-fields that must leave in a single message.
    pub fn update(&mut self, now: I, apply: impl FnOnce(&mut T))
    where
        T: Default,
    {
        apply(self.pending.get_or_insert_with(T::default));
        self.arm(now);
    }

    /// Deliver the pending value if the deadline has passed.
    ///
    /// Clears both the slot and the deadline; the next `record` starts a
    /// fresh window.
    pub fn poll(&mut self, now: I) -> Option<T> {
        match self.deadline {
            Some(deadline) if now >= deadline => {
                self.deadline = None;
                self.pending.take()
            },
            _ => None,
        }
    }

    /// The armed flush deadline, if a value is pending.
    pub fn next_deadline(&self) -> Option<I> {
        self.deadline
    }

    /// Peek at the pending value without flushing it.
    pub fn pending(&self) -> Option<&T> {
        self.pending.as_ref()
    }

    /// Drop any pending value and deadline.
    ///
    /// After `clear`, a previously-armed wakeup polls into nothing.
    pub fn clear(&mut self) {
        self.pending = None;
        self.deadline = None;
    }

    fn arm(&mut self, now: I) {
        if self.deadline.is_none() {
            self.deadline = Some(now + self.interval);
        }
    }
}
