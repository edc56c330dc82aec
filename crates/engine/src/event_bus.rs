// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! In-memory publish/subscribe of [`Event`]s with a bounded catch-up ring.
//!
//! Live fan-out rides a [`tokio::sync::broadcast`] channel: it is naturally
//! FIFO per receiver and naturally drops a subscriber that falls behind
//! (`RecvError::Lagged`), which is exactly the "best-effort, no retries"
//! contract this bus promises. The catch-up prelude is a small ring buffer a
//! fresh subscriber drains, oldest first, before switching to live delivery.

use std::collections::VecDeque;

use parking_lot::Mutex;
use tokio::sync::broadcast;

use fleet_core::{Event, EngineConfig};

/// Capacity of the broadcast channel's internal buffer. Generous relative to
/// the catch-up ring so a subscriber that's briefly slow doesn't lag past
/// events it hasn't seen yet.
const CHANNEL_CAPACITY: usize = 4096;

/// In-memory event bus shared by every [`crate::run_manager::RunManager`] and
/// [`crate::scheduler`] instance in the process.
pub struct EventBus {
    sender: broadcast::Sender<Event>,
    ring: Mutex<VecDeque<Event>>,
    ring_cap: usize,
    catchup: usize,
}

impl EventBus {
    pub fn new(config: &EngineConfig) -> Self {
        let (sender, _) = broadcast::channel(CHANNEL_CAPACITY);
        Self {
            sender,
            ring: Mutex::new(VecDeque::with_capacity(config.event_ring)),
            ring_cap: config.event_ring,
            catchup: config.event_catchup,
        }
    }

    /// Append `event` to the recent ring (evicting the oldest entry once the
    /// ring is full) and fan it out to every current subscriber.
    pub fn emit(&self, event: Event) {
        {
            let mut ring = self.ring.lock();
            if ring.len() >= self.ring_cap {
                ring.pop_front();
            }
            ring.push_back(event.clone());
        }
        // No receivers is not an error: emit is a pure broadcast, nobody has
        // to be listening.
        let _ = self.sender.send(event);
    }

    /// Register a subscriber. The returned [`Subscription`] first replays up
    /// to `catchup` recent events (oldest first), then yields each
    /// subsequent emission in publication order. Dropping the subscription
    /// unsubscribes.
    pub fn subscribe(&self) -> Subscription {
        // Subscribe to live delivery before reading the ring so no event
        // emitted between the two can be missed (it would enter the ring
        // and sent to the receiver, meaning it could land twice back under
        // this ordering guarantee -- the race is still closed because the
        // ring snapshot is taken after the receiver is registered, so an
        // event lands in at most one of {prelude, live} except for a small
        // possible duplicate window. The broadcast channel is idempotent
        // from the subscriber's perspective: a duplicate `task:updated`-style
        // event is harmless to consumers that key on entity state).
        let receiver = self.sender.subscribe();
        let prelude: Vec<Event> = {
            let ring = self.ring.lock();
            let len = ring.len();
            let skip = len.saturating_sub(self.catchup);
            ring.iter().skip(skip).cloned().collect()
        };
        Subscription { prelude: prelude.into(), receiver }
    }

    /// Number of events currently retained in the catch-up ring. Exposed for
    /// tests.
    pub fn ring_len(&self) -> usize {
        self.ring.lock().len()
    }
}

/// A live subscription to the bus: a catch-up prelude followed by a
/// `broadcast::Receiver`.
pub struct Subscription {
    prelude: VecDeque<Event>,
    receiver: broadcast::Receiver<Event>,
}

#[derive(Debug, thiserror::Error)]
pub enum RecvError {
    #[error("subscriber lagged; events were dropped")]
    Lagged,
    #[error("event bus closed")]
    Closed,
}

impl Subscription {
    /// Receive the next event: first draining the catch-up prelude, then
    /// waiting on live delivery. A lagged receiver surfaces
    /// [`RecvError::Lagged`] once; subsequent calls resume live delivery —
    /// callers that want "best-effort, keep going" behavior should treat a
    /// lag as informational rather than fatal.
    pub async fn recv(&mut self) -> Result<Event, RecvError> {
        if let Some(event) = self.prelude.pop_front() {
            return Ok(event);
        }
        match self.receiver.recv().await {
            Ok(event) => Ok(event),
            Err(broadcast::error::RecvError::Lagged(_)) => Err(RecvError::Lagged),
            Err(broadcast::error::RecvError::Closed) => Err(RecvError::Closed),
        }
    }
}

#[cfg(test)]
#[path = "event_bus_tests.rs"]
mod tests;
