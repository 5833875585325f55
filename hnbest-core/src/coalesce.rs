//! Keyed TTL cache with single-flight fetches.
//!
//! Each key maps to a slot that is either a settled value with an absolute
//! expiry, or an in-flight fetch. Callers that miss while a fetch is in flight
//! attach to it through a `watch` channel and receive the same outcome, so the
//! fetch function runs once per miss no matter how many callers race.
//!
//! Failures are never stored: the slot is removed before waiters are woken, so
//! the next call fetches again. Expiry is checked lazily on access, and a miss
//! sweeps every expired value out of the map at most once per
//! [`SWEEP_INTERVAL`], so keys that are never requested again do not pile up.

use std::collections::HashMap;
use std::fmt::Debug;
use std::future::Future;
use std::hash::Hash;
use std::sync::{PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};
use std::time::Duration;

use tokio::sync::watch;
use tokio::time::Instant;

use crate::HnError;

/// Minimum time between two sweeps of expired values.
pub const SWEEP_INTERVAL: Duration = Duration::from_secs(60);

type Published<V, E> = Option<Result<V, E>>;

enum Slot<V, E> {
    Ready {
        value: V,
        expires_at: Instant,
    },
    InFlight {
        generation: u64,
        rx: watch::Receiver<Published<V, E>>,
    },
}

struct State<K, V, E> {
    slots: HashMap<K, Slot<V, E>>,
    next_generation: u64,
    last_sweep: Instant,
}

enum Claim<V, E> {
    Hit(V),
    Wait(watch::Receiver<Published<V, E>>),
    Lead {
        tx: watch::Sender<Published<V, E>>,
        generation: u64,
    },
}

/// Single-flight TTL cache.
///
/// `V` and `E` are cloned out to every caller, so they should be cheap to clone
/// (wrap large values in `Arc`).
pub struct CoalescingCache<K, V, E = HnError> {
    state: RwLock<State<K, V, E>>,
}

impl<K, V, E> Default for CoalescingCache<K, V, E> {
    fn default() -> Self {
        Self {
            state: RwLock::new(State {
                slots: HashMap::new(),
                next_generation: 0,
                last_sweep: Instant::now(),
            }),
        }
    }
}

impl<K, V, E> CoalescingCache<K, V, E>
where
    K: Eq + Hash + Clone + Debug,
    V: Clone,
    E: Clone,
{
    /// Create an empty cache.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Return the live value for `key`, or run `fetch` to produce it.
    ///
    /// - A live value is returned without calling `fetch`.
    /// - If another caller is already fetching `key`, this call waits for that
    ///   fetch and returns its outcome; `fetch` is not called.
    /// - Otherwise `fetch` runs; on success the value is stored until
    ///   `now + ttl` (a zero `ttl` stores nothing), on failure nothing is stored.
    ///
    /// If the caller driving a fetch is cancelled, the slot is released and the
    /// waiters race again for the key.
    ///
    /// # Errors
    /// Returns the error produced by `fetch`, whether it ran in this call or in
    /// the in-flight call this one attached to.
    pub async fn get_or_fetch<F, Fut>(&self, key: K, ttl: Duration, fetch: F) -> Result<V, E>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<V, E>>,
    {
        if let Some(value) = self.fresh(&key) {
            return Ok(value);
        }

        let (tx, generation) = loop {
            match self.claim(&key) {
                Claim::Hit(value) => return Ok(value),
                Claim::Lead { tx, generation } => break (tx, generation),
                Claim::Wait(mut rx) => {
                    #[cfg(feature = "tracing")]
                    tracing::trace!(key = ?key, "coalescing onto in-flight fetch");
                    let published = match rx.wait_for(Option::is_some).await {
                        Ok(outcome) => (*outcome).clone(),
                        Err(_) => None,
                    };
                    if let Some(outcome) = published {
                        return outcome;
                    }
                    // The fetching caller went away without publishing; race again.
                }
            }
        };

        #[cfg(feature = "tracing")]
        tracing::debug!(key = ?key, "cache miss, fetching");

        let mut guard = InFlightGuard {
            cache: self,
            key: &key,
            generation,
            tx: Some(tx),
        };
        let outcome = fetch().await;
        guard.settle(&outcome, ttl);
        outcome
    }

    /// Number of slots (live, expired-but-not-yet-replaced, and in-flight).
    #[must_use]
    pub fn len(&self) -> usize {
        self.read().slots.len()
    }

    /// Whether the cache holds no slots at all.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Drop a settled value so the next call fetches again.
    ///
    /// In-flight fetches are left alone.
    pub fn invalidate(&self, key: &K) {
        let mut state = self.write();
        if matches!(state.slots.get(key), Some(Slot::Ready { .. })) {
            state.slots.remove(key);
        }
    }

    /// Drop every settled value, keeping in-flight fetches.
    pub fn clear(&self) {
        self.write()
            .slots
            .retain(|_, slot| matches!(slot, Slot::InFlight { .. }));
    }

    fn fresh(&self, key: &K) -> Option<V> {
        let state = self.read();
        match state.slots.get(key) {
            Some(Slot::Ready { value, expires_at }) if Instant::now() < *expires_at => {
                Some(value.clone())
            }
            _ => None,
        }
    }

    fn claim(&self, key: &K) -> Claim<V, E> {
        let mut state = self.write();
        let now = Instant::now();
        match state.slots.get(key) {
            Some(Slot::Ready { value, expires_at }) if now < *expires_at => {
                return Claim::Hit(value.clone());
            }
            Some(Slot::InFlight { rx, .. }) => return Claim::Wait(rx.clone()),
            _ => {}
        }
        if now.duration_since(state.last_sweep) >= SWEEP_INTERVAL {
            state.slots.retain(|_, slot| match slot {
                Slot::Ready { expires_at, .. } => now < *expires_at,
                Slot::InFlight { .. } => true,
            });
            state.last_sweep = now;
        }
        let generation = state.next_generation;
        state.next_generation = state.next_generation.wrapping_add(1);
        let (tx, rx) = watch::channel(None);
        state
            .slots
            .insert(key.clone(), Slot::InFlight { generation, rx });
        Claim::Lead { tx, generation }
    }

    fn read(&self) -> RwLockReadGuard<'_, State<K, V, E>> {
        self.state.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> RwLockWriteGuard<'_, State<K, V, E>> {
        self.state.write().unwrap_or_else(PoisonError::into_inner)
    }
}

/// Owns the in-flight slot for one fetch.
///
/// `settle` stores the outcome and wakes waiters; dropping without settling
/// (cancellation) removes the slot, and dropping the sender wakes waiters with
/// a closed channel so they retry.
struct InFlightGuard<'a, K, V, E>
where
    K: Eq + Hash + Clone + Debug,
    V: Clone,
    E: Clone,
{
    cache: &'a CoalescingCache<K, V, E>,
    key: &'a K,
    generation: u64,
    tx: Option<watch::Sender<Published<V, E>>>,
}

impl<K, V, E> InFlightGuard<'_, K, V, E>
where
    K: Eq + Hash + Clone + Debug,
    V: Clone,
    E: Clone,
{
    fn settle(&mut self, outcome: &Result<V, E>, ttl: Duration) {
        {
            let mut state = self.cache.write();
            if self.owns_slot(&state) {
                match outcome {
                    Ok(value) if !ttl.is_zero() => {
                        state.slots.insert(
                            self.key.clone(),
                            Slot::Ready {
                                value: value.clone(),
                                expires_at: Instant::now() + ttl,
                            },
                        );
                    }
                    _ => {
                        state.slots.remove(self.key);
                    }
                }
            }
        }
        if let Some(tx) = self.tx.take() {
            tx.send_replace(Some(outcome.clone()));
        }
    }

    fn owns_slot(&self, state: &State<K, V, E>) -> bool {
        matches!(
            state.slots.get(self.key),
            Some(Slot::InFlight { generation, .. }) if *generation == self.generation
        )
    }
}

impl<K, V, E> Drop for InFlightGuard<'_, K, V, E>
where
    K: Eq + Hash + Clone + Debug,
    V: Clone,
    E: Clone,
{
    fn drop(&mut self) {
        if self.tx.is_none() {
            return;
        }
        let mut state = self.cache.write();
        if self.owns_slot(&state) {
            state.slots.remove(self.key);
        }
        drop(state);
        #[cfg(feature = "tracing")]
        tracing::debug!(key = ?self.key, "in-flight fetch abandoned");
        self.tx = None;
    }
}
