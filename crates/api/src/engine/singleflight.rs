//! Single-flight guard: collapse concurrent identical computations.
//!
//! An in-process map from key to a pending computation. The first caller
//! for a key becomes the owner and runs the work; every concurrent
//! caller for the same key subscribes to the owner's broadcast channel
//! and awaits one shared outcome. The map entry is cleared when the
//! owner settles — including via `Drop`, so a panicked or cancelled
//! owner never leaves a permanently-pending guard behind.
//!
//! This is deliberately single-process. Across instances, duplicate
//! computation is tolerated: the cache write it leads to is an
//! idempotent upsert.

use std::collections::HashMap;
use std::sync::{Mutex, PoisonError};

use tokio::sync::broadcast;

/// Either side of a joined flight.
pub enum Flight<'a, T: Clone> {
    /// This caller runs the computation and must call
    /// [`FlightGuard::finish`] with the outcome.
    Owner(FlightGuard<'a, T>),
    /// Another caller owns the computation; await the broadcast.
    Waiter(broadcast::Receiver<T>),
}

/// In-process registry of pending computations, keyed by string.
pub struct FlightGroup<T: Clone> {
    flights: Mutex<HashMap<String, broadcast::Sender<T>>>,
}

impl<T: Clone> FlightGroup<T> {
    pub fn new() -> Self {
        Self {
            flights: Mutex::new(HashMap::new()),
        }
    }

    /// Join the flight for `key`, becoming its owner if none is pending.
    pub fn join(&self, key: &str) -> Flight<'_, T> {
        let mut flights = self.lock();
        if let Some(sender) = flights.get(key) {
            return Flight::Waiter(sender.subscribe());
        }
        // Capacity 1: exactly one outcome is ever broadcast per flight.
        let (sender, _) = broadcast::channel(1);
        flights.insert(key.to_string(), sender.clone());
        Flight::Owner(FlightGuard {
            group: self,
            key: key.to_string(),
            sender: Some(sender),
        })
    }

    /// Number of computations currently in flight.
    pub fn in_flight(&self) -> usize {
        self.lock().len()
    }

    fn clear(&self, key: &str) {
        self.lock().remove(key);
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, HashMap<String, broadcast::Sender<T>>> {
        // A poisoned map just means some owner panicked mid-insert; the
        // data (a channel registry) is still structurally sound.
        self.flights.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl<T: Clone> Default for FlightGroup<T> {
    fn default() -> Self {
        Self::new()
    }
}

/// Owner handle for a pending computation.
///
/// Call [`finish`](Self::finish) with the outcome. If the owner is
/// dropped without finishing (panic, cancellation), the map entry is
/// cleared and waiters observe a closed channel, which they surface as a
/// retryable error.
pub struct FlightGuard<'a, T: Clone> {
    group: &'a FlightGroup<T>,
    key: String,
    sender: Option<broadcast::Sender<T>>,
}

impl<T: Clone> FlightGuard<'_, T> {
    /// Publish the outcome to all waiters and clear the flight entry.
    ///
    /// The entry is cleared before the broadcast so a caller arriving
    /// after the outcome settles starts a fresh flight instead of
    /// waiting on a finished one.
    pub fn finish(mut self, outcome: T) {
        self.group.clear(&self.key);
        if let Some(sender) = self.sender.take() {
            // No receivers is fine: nobody joined this flight.
            let _ = sender.send(outcome);
        }
    }
}

impl<T: Clone> Drop for FlightGuard<'_, T> {
    fn drop(&mut self) {
        // finish() already cleared the entry and took the sender; this
        // path only runs when the owner never settled.
        if self.sender.take().is_some() {
            self.group.clear(&self.key);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn owner_then_waiter_share_one_outcome() {
        let group: FlightGroup<i32> = FlightGroup::new();

        let Flight::Owner(guard) = group.join("k") else {
            panic!("first join must own the flight");
        };
        let Flight::Waiter(mut rx) = group.join("k") else {
            panic!("second join must wait");
        };

        guard.finish(42);
        assert_eq!(rx.recv().await.unwrap(), 42);
        assert_eq!(group.in_flight(), 0);
    }

    #[tokio::test]
    async fn finish_clears_entry_for_subsequent_joins() {
        let group: FlightGroup<i32> = FlightGroup::new();

        let Flight::Owner(guard) = group.join("k") else {
            panic!("expected owner");
        };
        guard.finish(1);

        // The key is free again: a new join owns a fresh flight.
        assert!(matches!(group.join("k"), Flight::Owner(_)));
    }

    #[tokio::test]
    async fn dropped_owner_clears_entry_and_closes_waiters() {
        let group: FlightGroup<i32> = FlightGroup::new();

        let Flight::Owner(guard) = group.join("k") else {
            panic!("expected owner");
        };
        let Flight::Waiter(mut rx) = group.join("k") else {
            panic!("expected waiter");
        };

        drop(guard);
        assert_eq!(group.in_flight(), 0);
        assert!(rx.recv().await.is_err());
    }

    #[tokio::test]
    async fn distinct_keys_do_not_interfere() {
        let group: FlightGroup<i32> = FlightGroup::new();

        let Flight::Owner(a) = group.join("a") else {
            panic!("expected owner for a");
        };
        let Flight::Owner(b) = group.join("b") else {
            panic!("expected owner for b");
        };
        assert_eq!(group.in_flight(), 2);
        a.finish(0);
        b.finish(1);
        assert_eq!(group.in_flight(), 0);
    }
}
