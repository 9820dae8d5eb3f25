//! Per-key debouncing of asynchronous actions.
//!
//! Each key gets one task. Values scheduled for the key replace each other
//! until the key has been quiet for the configured delay; then the action
//! runs with the latest value. The task keeps the key while the action is in
//! flight, so anything scheduled meanwhile waits for the next quiet window
//! instead of racing the running action. At most one action per key runs at
//! a time.

use std::collections::HashMap;
use std::future::Future;
use std::hash::Hash;
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tokio_util::task::TaskTracker;
use tracing::debug;

enum Msg<V> {
    Value(V),
    /// Forget the latest value without giving up the key.
    Drop,
}

impl<V> Msg<V> {
    fn into_value(self) -> Option<V> {
        match self {
            Self::Value(value) => Some(value),
            Self::Drop => None,
        }
    }
}

struct Slot<V> {
    generation: u64,
    in_flight: bool,
    tx: mpsc::UnboundedSender<Msg<V>>,
}

struct Slots<K, V> {
    next_generation: u64,
    by_key: HashMap<K, Slot<V>>,
}

/// Coalesces values per key and runs an action once per quiet period.
pub struct Debouncer<K, V> {
    delay: Duration,
    slots: Arc<Mutex<Slots<K, V>>>,
    cancel: Mutex<CancellationToken>,
    tracker: TaskTracker,
}

impl<K, V> Debouncer<K, V>
where
    K: Eq + Hash + Clone + Send + std::fmt::Debug + 'static,
    V: Send + 'static,
{
    #[must_use]
    pub fn new(delay: Duration) -> Self {
        Self {
            delay,
            slots: Arc::new(Mutex::new(Slots {
                next_generation: 0,
                by_key: HashMap::new(),
            })),
            cancel: Mutex::new(CancellationToken::new()),
            tracker: TaskTracker::new(),
        }
    }

    #[must_use]
    pub const fn delay(&self) -> Duration {
        self.delay
    }

    /// Schedule `value` for `key`.
    ///
    /// If the key already has a task, the value joins it and `action` is
    /// dropped; the task keeps the action it was started with.
    pub fn schedule<F, Fut>(&self, key: K, value: V, action: F)
    where
        F: Fn(V) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = ()> + Send + 'static,
    {
        let mut slots = self.slots.lock().unwrap_or_else(PoisonError::into_inner);

        let first = match slots.by_key.get(&key) {
            Some(slot) => match slot.tx.send(Msg::Value(value)) {
                Ok(()) => return,
                // The task is on its way out; start a new one.
                Err(mpsc::error::SendError(msg)) => msg,
            },
            None => Msg::Value(value),
        };

        let (tx, rx) = mpsc::unbounded_channel();
        let generation = slots.next_generation;
        slots.next_generation += 1;
        slots.by_key.insert(
            key.clone(),
            Slot {
                generation,
                in_flight: false,
                tx,
            },
        );
        drop(slots);

        let cancel = self
            .cancel
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone();

        self.tracker.spawn(run_key(
            key,
            generation,
            first,
            rx,
            self.delay,
            Arc::clone(&self.slots),
            cancel,
            action,
        ));
    }

    /// Whether `key` has a value waiting or an action in flight.
    #[must_use]
    pub fn is_pending(&self, key: &K) -> bool {
        self.slots
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .by_key
            .contains_key(key)
    }

    /// Drop the value waiting for `key`, if any.
    ///
    /// An action already in flight for the key still completes, and the key
    /// stays with its task until then: values scheduled meanwhile run after
    /// it, never alongside it.
    pub fn cancel(&self, key: &K) -> bool {
        let mut slots = self.slots.lock().unwrap_or_else(PoisonError::into_inner);
        match slots.by_key.get(key) {
            Some(slot) if slot.in_flight => {
                let _ = slot.tx.send(Msg::Drop);
                true
            }
            Some(_) => {
                slots.by_key.remove(key);
                true
            }
            None => false,
        }
    }

    /// Drop every pending value and abort running actions.
    pub fn cancel_all(&self) {
        let previous = {
            let mut guard = self.cancel.lock().unwrap_or_else(PoisonError::into_inner);
            std::mem::replace(&mut *guard, CancellationToken::new())
        };
        previous.cancel();
        self.slots
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .by_key
            .clear();
    }

    /// Wait until every key task has finished.
    pub async fn settle(&self) {
        self.tracker.close();
        self.tracker.wait().await;
        self.tracker.reopen();
    }
}

fn owns<K: Eq + Hash, V>(slots: &Slots<K, V>, key: &K, generation: u64) -> bool {
    slots
        .by_key
        .get(key)
        .is_some_and(|slot| slot.generation == generation)
}

#[allow(clippy::too_many_arguments)]
async fn run_key<K, V, F, Fut>(
    key: K,
    generation: u64,
    first: Msg<V>,
    mut rx: mpsc::UnboundedReceiver<Msg<V>>,
    delay: Duration,
    slots: Arc<Mutex<Slots<K, V>>>,
    cancel: CancellationToken,
    action: F,
) where
    K: Eq + Hash + std::fmt::Debug,
    F: Fn(V) -> Fut,
    Fut: Future<Output = ()>,
{
    let mut latest = first.into_value();

    loop {
        // Quiet period: every new value restarts the timer.
        loop {
            tokio::select! {
                biased;
                () = cancel.cancelled() => {
                    debug!(?key, "Debounced action cancelled before firing");
                    return;
                }
                received = tokio::time::timeout(delay, rx.recv()) => match received {
                    Ok(Some(msg)) => latest = msg.into_value(),
                    Ok(None) => return,
                    Err(_elapsed) => break,
                },
            }
        }

        // Claim the key for the action, or give it up if nothing is left.
        // Done under the lock so `cancel` sees a consistent `in_flight`.
        let value = {
            let mut guard = slots.lock().unwrap_or_else(PoisonError::into_inner);
            if !owns(&guard, &key, generation) {
                debug!(?key, "Debounced value dropped before firing");
                return;
            }
            while let Ok(msg) = rx.try_recv() {
                latest = msg.into_value();
            }
            let Some(value) = latest.take() else {
                guard.by_key.remove(&key);
                return;
            };
            if let Some(slot) = guard.by_key.get_mut(&key) {
                slot.in_flight = true;
            }
            value
        };

        tokio::select! {
            biased;
            () = cancel.cancelled() => {
                debug!(?key, "Debounced action cancelled in flight");
                return;
            }
            () = action(value) => {}
        }

        // Values that arrived while the action ran open the next window.
        // Checked under the lock so `schedule` cannot slip a value in between.
        let mut guard = slots.lock().unwrap_or_else(PoisonError::into_inner);
        while let Ok(msg) = rx.try_recv() {
            latest = msg.into_value();
        }
        if !owns(&guard, &key, generation) {
            return;
        }
        if latest.is_none() {
            guard.by_key.remove(&key);
            return;
        }
        if let Some(slot) = guard.by_key.get_mut(&key) {
            slot.in_flight = false;
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};

    use super::*;

    type Calls = Arc<Mutex<Vec<(&'static str, u32)>>>;

    fn recorder(
        calls: &Calls,
        key: &'static str,
        work: Duration,
    ) -> impl Fn(u32) -> std::pin::Pin<Box<dyn Future<Output = ()> + Send>> + Send + Sync + 'static
    {
        let calls = Arc::clone(calls);
        move |value| {
            let calls = Arc::clone(&calls);
            Box::pin(async move {
                tokio::time::sleep(work).await;
                calls.lock().unwrap().push((key, value));
            })
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_rapid_values_coalesce_to_last() {
        let debouncer = Debouncer::new(Duration::from_millis(1500));
        let calls: Calls = Arc::default();

        for value in [2, 3, 4, 5] {
            debouncer.schedule("c1", value, recorder(&calls, "c1", Duration::ZERO));
            tokio::time::sleep(Duration::from_millis(200)).await;
        }
        assert!(calls.lock().unwrap().is_empty());
        assert!(debouncer.is_pending(&"c1"));

        debouncer.settle().await;
        assert_eq!(*calls.lock().unwrap(), vec![("c1", 5)]);
        assert!(!debouncer.is_pending(&"c1"));
    }

    #[tokio::test(start_paused = true)]
    async fn test_keys_are_independent() {
        let debouncer = Debouncer::new(Duration::from_millis(100));
        let calls: Calls = Arc::default();

        debouncer.schedule("a", 1, recorder(&calls, "a", Duration::ZERO));
        debouncer.schedule("b", 7, recorder(&calls, "b", Duration::ZERO));
        debouncer.settle().await;

        let mut seen = calls.lock().unwrap().clone();
        seen.sort_unstable();
        assert_eq!(seen, vec![("a", 1), ("b", 7)]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_values_during_flight_wait_for_next_window() {
        let debouncer = Arc::new(Debouncer::new(Duration::from_millis(100)));
        let in_flight = Arc::new(AtomicUsize::new(0));
        let max_in_flight = Arc::new(AtomicUsize::new(0));
        let calls: Calls = Arc::default();

        let action = {
            let in_flight = Arc::clone(&in_flight);
            let max_in_flight = Arc::clone(&max_in_flight);
            let calls = Arc::clone(&calls);
            move |value: u32| {
                let in_flight = Arc::clone(&in_flight);
                let max_in_flight = Arc::clone(&max_in_flight);
                let calls = Arc::clone(&calls);
                async move {
                    let now = in_flight.fetch_add(1, Ordering::SeqCst) + 1;
                    max_in_flight.fetch_max(now, Ordering::SeqCst);
                    tokio::time::sleep(Duration::from_millis(500)).await;
                    calls.lock().unwrap().push(("c1", value));
                    in_flight.fetch_sub(1, Ordering::SeqCst);
                }
            }
        };

        debouncer.schedule("c1", 1, action.clone());
        // Past the quiet window, so the first action is running.
        tokio::time::sleep(Duration::from_millis(200)).await;
        debouncer.schedule("c1", 2, action.clone());
        debouncer.schedule("c1", 3, action);
        debouncer.settle().await;

        assert_eq!(*calls.lock().unwrap(), vec![("c1", 1), ("c1", 3)]);
        assert_eq!(max_in_flight.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_cancel_single_key() {
        let debouncer = Debouncer::new(Duration::from_millis(100));
        let calls: Calls = Arc::default();

        debouncer.schedule("a", 1, recorder(&calls, "a", Duration::ZERO));
        debouncer.schedule("b", 2, recorder(&calls, "b", Duration::ZERO));
        assert!(debouncer.cancel(&"a"));
        assert!(!debouncer.cancel(&"a"));
        debouncer.settle().await;

        assert_eq!(*calls.lock().unwrap(), vec![("b", 2)]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_cancel_in_flight_keeps_key_until_action_finishes() {
        let debouncer = Debouncer::new(Duration::from_millis(100));
        let in_flight = Arc::new(AtomicUsize::new(0));
        let max_in_flight = Arc::new(AtomicUsize::new(0));
        let calls: Calls = Arc::default();

        let action = {
            let in_flight = Arc::clone(&in_flight);
            let max_in_flight = Arc::clone(&max_in_flight);
            let calls = Arc::clone(&calls);
            move |value: u32| {
                let in_flight = Arc::clone(&in_flight);
                let max_in_flight = Arc::clone(&max_in_flight);
                let calls = Arc::clone(&calls);
                async move {
                    let now = in_flight.fetch_add(1, Ordering::SeqCst) + 1;
                    max_in_flight.fetch_max(now, Ordering::SeqCst);
                    tokio::time::sleep(Duration::from_secs(1)).await;
                    calls.lock().unwrap().push(("c1", value));
                    in_flight.fetch_sub(1, Ordering::SeqCst);
                }
            }
        };

        debouncer.schedule("c1", 2, action.clone());
        tokio::time::sleep(Duration::from_millis(150)).await;
        assert!(debouncer.cancel(&"c1"));
        // The running action still owns the key.
        assert!(debouncer.is_pending(&"c1"));

        debouncer.schedule("c1", 3, action);
        tokio::time::sleep(Duration::from_millis(300)).await;
        assert_eq!(in_flight.load(Ordering::SeqCst), 1);

        debouncer.settle().await;
        assert_eq!(*calls.lock().unwrap(), vec![("c1", 2), ("c1", 3)]);
        assert_eq!(max_in_flight.load(Ordering::SeqCst), 1);
        assert!(!debouncer.is_pending(&"c1"));
    }

    #[tokio::test(start_paused = true)]
    async fn test_cancel_in_flight_drops_queued_value() {
        let debouncer = Debouncer::new(Duration::from_millis(100));
        let calls: Calls = Arc::default();

        debouncer.schedule("c1", 2, recorder(&calls, "c1", Duration::from_secs(1)));
        tokio::time::sleep(Duration::from_millis(150)).await;
        debouncer.schedule("c1", 3, recorder(&calls, "c1", Duration::from_secs(1)));
        assert!(debouncer.cancel(&"c1"));
        debouncer.settle().await;

        assert_eq!(*calls.lock().unwrap(), vec![("c1", 2)]);
        assert!(!debouncer.is_pending(&"c1"));
    }

    #[tokio::test(start_paused = true)]
    async fn test_cancel_all_drops_pending_values() {
        let debouncer = Debouncer::new(Duration::from_millis(1500));
        let calls: Calls = Arc::default();

        debouncer.schedule("c1", 4, recorder(&calls, "c1", Duration::ZERO));
        debouncer.cancel_all();
        assert!(!debouncer.is_pending(&"c1"));
        debouncer.settle().await;
        assert!(calls.lock().unwrap().is_empty());

        // Still usable afterwards.
        debouncer.schedule("c1", 6, recorder(&calls, "c1", Duration::ZERO));
        debouncer.settle().await;
        assert_eq!(*calls.lock().unwrap(), vec![("c1", 6)]);
    }
}
