//! Render gate: bounds in-flight edits of one artifact.
//!
//! Acquire a slot before editing; the returned [`RenderPermit`] releases it
//! when dropped, whichever way the edit ends.

use std::sync::Arc;

use tokio::sync::{OwnedSemaphorePermit, Semaphore};

/// Default number of concurrent renders per session.
pub const DEFAULT_CONCURRENCY: usize = 2;

/// Counting semaphore owned by one session.
#[derive(Debug, Clone)]
pub struct RenderGate {
    capacity: usize,
    slots: Arc<Semaphore>,
}

/// RAII guard returned by [`RenderGate::acquire`] and [`RenderGate::try_acquire`].
/// Owned, so it can travel into a spawned render task.
#[derive(Debug)]
pub struct RenderPermit {
    _permit: OwnedSemaphorePermit,
}

impl RenderGate {
    /// Creates a gate with the given capacity. Enforces a minimum of 1.
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            capacity,
            slots: Arc::new(Semaphore::new(capacity)),
        }
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Slots currently free.
    pub fn available(&self) -> usize {
        self.slots.available_permits()
    }

    /// True when every slot is taken and `acquire` would wait.
    pub fn would_block(&self) -> bool {
        self.available() == 0
    }

    /// Takes a slot without waiting, or `None` if the gate is saturated.
    pub fn try_acquire(&self) -> Option<RenderPermit> {
        self.slots
            .clone()
            .try_acquire_owned()
            .ok()
            .map(|permit| RenderPermit { _permit: permit })
    }

    /// Waits until a slot is free.
    pub async fn acquire(&self) -> RenderPermit {
        // The semaphore is never closed, so `acquire_owned` does not fail.
        loop {
            if let Ok(permit) = self.slots.clone().acquire_owned().await {
                return RenderPermit { _permit: permit };
            }
            tokio::task::yield_now().await;
        }
    }
}

impl Default for RenderGate {
    fn default() -> Self {
        Self::new(DEFAULT_CONCURRENCY)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn try_acquire_succeeds_until_capacity() {
        let gate = RenderGate::new(2);
        let _p1 = gate.try_acquire().expect("slot 1");
        assert!(!gate.would_block());
        let _p2 = gate.try_acquire().expect("slot 2");
        assert!(gate.would_block());
        assert!(gate.try_acquire().is_none());
    }

    #[test]
    fn dropping_a_permit_frees_its_slot() {
        let gate = RenderGate::new(1);
        let permit = gate.try_acquire().expect("slot");
        assert!(gate.try_acquire().is_none());
        drop(permit);
        assert!(gate.try_acquire().is_some());
    }

    #[test]
    fn new_enforces_minimum_one() {
        let gate = RenderGate::new(0);
        assert_eq!(gate.capacity(), 1);
        let _p = gate.try_acquire().expect("slot");
        assert!(gate.would_block());
    }

    #[test]
    fn default_capacity_is_two() {
        let gate = RenderGate::default();
        assert_eq!(gate.capacity(), DEFAULT_CONCURRENCY);
        assert_eq!(gate.available(), 2);
    }

    #[test]
    fn clones_share_slots() {
        let gate = RenderGate::new(1);
        let other = gate.clone();
        let _p = gate.try_acquire().expect("slot");
        assert!(other.would_block());
    }

    #[tokio::test(start_paused = true)]
    async fn acquire_waits_for_a_release() {
        let gate = RenderGate::new(1);
        let held = gate.try_acquire().expect("slot");

        let waiter = {
            let gate = gate.clone();
            tokio::spawn(async move {
                let _p = gate.acquire().await;
            })
        };

        tokio::time::sleep(Duration::from_millis(50)).await;
        assert!(!waiter.is_finished());

        drop(held);
        waiter.await.unwrap();
        assert_eq!(gate.available(), 1);
    }

    #[tokio::test]
    async fn permit_is_released_when_the_guarded_work_fails() {
        let gate = RenderGate::new(1);
        let result: Result<(), &str> = async {
            let _permit = gate.acquire().await;
            Err("edit failed")
        }
        .await;
        assert!(result.is_err());
        assert_eq!(gate.available(), 1);
    }
}
