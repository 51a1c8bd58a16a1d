//! [`Subscription`]: the composite teardown registry (spec §4.1, C1).

use std::{
    any::Any,
    panic::{self, AssertUnwindSafe},
    sync::{
        atomic::{AtomicBool, Ordering},
        Arc,
    },
};

use event_listener::Event;
use parking_lot::Mutex;

use crate::error::RoError;

/// A nullary cleanup callback registered with a [`Subscription`].
pub type Teardown = Box<dyn FnOnce() + Send + 'static>;

struct Inner {
    closed: AtomicBool,
    teardowns: Mutex<Option<Vec<Teardown>>>,
    closed_event: Event,
}

/// The handle controlling the lifetime of a `subscribe` call.
///
/// Cloning a `Subscription` shares the same underlying registry: every
/// clone sees the same `closed` state and contributes teardowns to the
/// same list.
#[derive(Clone)]
pub struct Subscription(Arc<Inner>);

impl Default for Subscription {
    fn default() -> Self {
        Self::new()
    }
}

impl Subscription {
    /// Creates a fresh, open `Subscription` with no registered teardowns.
    pub fn new() -> Self {
        Self(Arc::new(Inner {
            closed: AtomicBool::new(false),
            teardowns: Mutex::new(Some(Vec::new())),
            closed_event: Event::new(),
        }))
    }

    /// Registers `teardown`. If this subscription is already closed,
    /// `teardown` runs immediately instead of being queued.
    pub fn add(&self, teardown: impl FnOnce() + Send + 'static) {
        let mut guard = self.0.teardowns.lock();
        match guard.as_mut() {
            Some(list) => list.push(Box::new(teardown)),
            None => {
                drop(guard);
                teardown();
            }
        }
    }

    /// Registers `other.unsubscribe()` as a teardown of this subscription,
    /// cascading cancellation downward to an owned child.
    pub fn add_child(&self, other: Subscription) {
        self.add(move || other.unsubscribe());
    }

    /// Non-blocking read of whether every registered teardown has finished
    /// running.
    pub fn is_closed(&self) -> bool {
        self.0.closed.load(Ordering::Acquire)
    }

    /// Blocks the calling thread until this subscription is closed.
    pub fn wait(&self) {
        loop {
            if self.is_closed() {
                return;
            }
            let listener = self.0.closed_event.listen();
            if self.is_closed() {
                return;
            }
            listener.wait();
        }
    }

    /// Idempotently runs every registered teardown exactly once, in
    /// registration order, even if an earlier teardown panics. Panics are
    /// collected; the first is re-raised (wrapped as [`RoError::Unsubscription`])
    /// once every teardown has run. Calling `unsubscribe` again (including
    /// concurrently, from another thread) is a no-op.
    pub fn unsubscribe(&self) {
        let Some(teardowns) = self.0.teardowns.lock().take() else {
            return;
        };
        let mut first_panic: Option<Box<dyn Any + Send>> = None;
        for teardown in teardowns {
            if let Err(payload) = panic::catch_unwind(AssertUnwindSafe(teardown)) {
                first_panic.get_or_insert(payload);
            }
        }
        self.0.closed.store(true, Ordering::Release);
        self.0.closed_event.notify(usize::MAX);
        if let Some(payload) = first_panic {
            let message = panic_message(&payload);
            panic::resume_unwind(Box::new(RoError::Unsubscription(message)));
        }
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "teardown panicked with a non-string payload".to_string()
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};

    use super::*;

    #[test]
    fn runs_every_teardown_exactly_once() {
        let subscription = Subscription::new();
        let calls = Arc::new(AtomicUsize::new(0));
        for _ in 0..5 {
            let calls = calls.clone();
            subscription.add(move || {
                calls.fetch_add(1, Ordering::SeqCst);
            });
        }
        subscription.unsubscribe();
        subscription.unsubscribe();
        subscription.unsubscribe();
        assert_eq!(calls.load(Ordering::SeqCst), 5);
        assert!(subscription.is_closed());
    }

    #[test]
    fn add_after_unsubscribe_runs_immediately() {
        let subscription = Subscription::new();
        subscription.unsubscribe();
        let ran = Arc::new(AtomicUsize::new(0));
        let ran2 = ran.clone();
        subscription.add(move || {
            ran2.fetch_add(1, Ordering::SeqCst);
        });
        assert_eq!(ran.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn panics_are_collected_and_first_is_reraised() {
        let subscription = Subscription::new();
        let ran_second = Arc::new(AtomicUsize::new(0));
        let ran_second_clone = ran_second.clone();
        subscription.add(|| panic!("first"));
        subscription.add(move || {
            ran_second_clone.fetch_add(1, Ordering::SeqCst);
        });
        subscription.add(|| panic!("third"));
        let result = panic::catch_unwind(AssertUnwindSafe(|| subscription.unsubscribe()));
        assert!(result.is_err());
        assert_eq!(ran_second.load(Ordering::SeqCst), 1);
        assert!(subscription.is_closed());
    }

    #[test]
    fn wait_unblocks_after_unsubscribe() {
        let subscription = Subscription::new();
        let other = subscription.clone();
        let handle = std::thread::spawn(move || other.wait());
        std::thread::sleep(std::time::Duration::from_millis(20));
        subscription.unsubscribe();
        handle.join().unwrap();
    }
}
