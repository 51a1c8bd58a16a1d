//! [`Subscriber`]: an [`Observer`] wrapped with a [`Subscription`],
//! enforcing serialization and terminal finality (spec §4.2/§4.3, C3).

use std::{
    any::Any,
    panic::{self, AssertUnwindSafe},
    sync::{
        atomic::{AtomicU8, Ordering},
        Arc,
    },
};

use parking_lot::{Mutex, MutexGuard};

use crate::{
    context::Context,
    error::{BoxError, RoError},
    hooks::{on_dropped_notification, on_unhandled_error, DroppedNotification},
    observer::Observer,
    subscription::Subscription,
};

/// How a [`Subscriber`] serializes calls into its wrapped [`Observer`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SubscriberMode {
    /// A mutex guards every notification; producers may run concurrently
    /// but never execute two callbacks of the same observer at once.
    Safe,
    /// No synchronization. The producer must guarantee single-threaded
    /// emission itself.
    Unsafe,
    /// Try-lock; on contention the notification is reported as dropped.
    /// Intended for real-time pipelines that favor latency over
    /// completeness.
    EventuallySafe,
}

/// How a `Safe`-mode [`Subscriber`] behaves when its serialization lock is
/// contended.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Backpressure {
    /// Wait on the lock (the default).
    Block,
    /// Try-lock, then drop the notification on contention.
    Drop,
}

const ACTIVE: u8 = 0;
const ERRORED: u8 = 1;
const COMPLETED: u8 = 2;

enum Guard<'a> {
    None,
    Held(#[allow(dead_code)] MutexGuard<'a, ()>),
}

/// Adapter wrapping an [`Observer`] with a [`Subscription`], enforcing
/// terminal finality (at most one of `Error`/`Complete` ever reaches the
/// observer) and the serialization mode chosen at construction.
///
/// `Subscriber` itself implements [`Observer`], so operators can treat the
/// terminal sink of a chain exactly like any other observer.
pub struct Subscriber<T> {
    observer: Arc<dyn Observer<T>>,
    subscription: Subscription,
    status: AtomicU8,
    lock: Option<Mutex<()>>,
    mode: SubscriberMode,
    backpressure: Backpressure,
}

impl<T: 'static + Send> Subscriber<T> {
    /// Wraps `observer` with a fresh [`Subscription`] in `Safe` mode with
    /// `Block` backpressure, the default combination per spec §4.2.
    pub fn new(observer: Arc<dyn Observer<T>>) -> Self {
        Self::with_mode(
            observer,
            Subscription::new(),
            SubscriberMode::Safe,
            Backpressure::Block,
        )
    }

    /// Wraps `observer` with the given subscription, mode and backpressure
    /// policy.
    pub fn with_mode(
        observer: Arc<dyn Observer<T>>,
        subscription: Subscription,
        mode: SubscriberMode,
        backpressure: Backpressure,
    ) -> Self {
        let lock = match mode {
            SubscriberMode::Unsafe => None,
            SubscriberMode::Safe | SubscriberMode::EventuallySafe => Some(Mutex::new(())),
        };
        Self {
            observer,
            subscription,
            status: AtomicU8::new(ACTIVE),
            lock,
            mode,
            backpressure,
        }
    }

    /// The subscription that will be unsubscribed on the first terminal
    /// notification, or that the caller may unsubscribe directly.
    pub fn subscription(&self) -> &Subscription {
        &self.subscription
    }

    /// Non-blocking status query: true once a terminal notification has
    /// been accepted, or the subscription has otherwise been closed.
    /// Safe to call from within the observer's own callback.
    pub fn is_closed(&self) -> bool {
        self.status.load(Ordering::Acquire) != ACTIVE || self.subscription.is_closed()
    }

    /// True once an `Error` notification has been accepted.
    pub fn has_thrown(&self) -> bool {
        self.status.load(Ordering::Acquire) == ERRORED
    }

    /// True once a `Complete` notification has been accepted.
    pub fn is_completed(&self) -> bool {
        self.status.load(Ordering::Acquire) == COMPLETED
    }

    fn try_acquire(&self) -> Option<Guard<'_>> {
        match self.mode {
            SubscriberMode::Unsafe => Some(Guard::None),
            SubscriberMode::Safe => match self.backpressure {
                Backpressure::Block => {
                    Some(Guard::Held(self.lock.as_ref().unwrap().lock()))
                }
                Backpressure::Drop => self
                    .lock
                    .as_ref()
                    .unwrap()
                    .try_lock()
                    .map(Guard::Held),
            },
            SubscriberMode::EventuallySafe => {
                self.lock.as_ref().unwrap().try_lock().map(Guard::Held)
            }
        }
    }

    fn deliver_next(&self, ctx: &Context, value: T) {
        if self.status.load(Ordering::Acquire) != ACTIVE {
            on_dropped_notification(ctx, DroppedNotification::Next(&value));
            return;
        }
        let Some(guard) = self.try_acquire() else {
            on_dropped_notification(ctx, DroppedNotification::Next(&value));
            return;
        };
        if self.status.load(Ordering::Acquire) != ACTIVE {
            drop(guard);
            on_dropped_notification(ctx, DroppedNotification::Next(&value));
            return;
        }
        let result = panic::catch_unwind(AssertUnwindSafe(|| self.observer.on_next(ctx, value)));
        drop(guard);
        if let Err(payload) = result {
            let message = panic_message(&payload);
            self.deliver_error(ctx, RoError::Observer(message).boxed());
        }
    }

    fn deliver_error(&self, ctx: &Context, err: BoxError) {
        if self
            .status
            .compare_exchange(ACTIVE, ERRORED, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            on_dropped_notification(ctx, DroppedNotification::Error(&err));
            return;
        }
        match self.try_acquire() {
            Some(guard) => {
                let result =
                    panic::catch_unwind(AssertUnwindSafe(|| self.observer.on_error(ctx, err)));
                drop(guard);
                if let Err(payload) = result {
                    let message = panic_message(&payload);
                    on_unhandled_error(ctx, &RoError::Observer(message).boxed());
                }
            }
            None => on_dropped_notification(ctx, DroppedNotification::Error(&err)),
        }
        self.subscription.unsubscribe();
    }

    fn deliver_complete(&self, ctx: &Context) {
        if self
            .status
            .compare_exchange(ACTIVE, COMPLETED, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            on_dropped_notification(ctx, DroppedNotification::Complete);
            return;
        }
        match self.try_acquire() {
            Some(guard) => {
                let result =
                    panic::catch_unwind(AssertUnwindSafe(|| self.observer.on_complete(ctx)));
                drop(guard);
                if let Err(payload) = result {
                    let message = panic_message(&payload);
                    on_unhandled_error(ctx, &RoError::Observer(message).boxed());
                }
            }
            None => on_dropped_notification(ctx, DroppedNotification::Complete),
        }
        self.subscription.unsubscribe();
    }
}

impl<T: 'static + Send> Observer<T> for Subscriber<T> {
    fn on_next(&self, ctx: &Context, value: T) {
        self.deliver_next(ctx, value);
    }

    fn on_error(&self, ctx: &Context, err: BoxError) {
        self.deliver_error(ctx, err);
    }

    fn on_complete(&self, ctx: &Context) {
        self.deliver_complete(ctx);
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "observer callback panicked with a non-string payload".to_string()
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};

    use super::*;
    use crate::observer::observer_fn;

    fn counting_observer() -> (Arc<dyn Observer<i32>>, Arc<AtomicUsize>, Arc<AtomicUsize>) {
        let nexts = Arc::new(AtomicUsize::new(0));
        let terminals = Arc::new(AtomicUsize::new(0));
        let n = nexts.clone();
        let t1 = terminals.clone();
        let t2 = terminals.clone();
        let observer = observer_fn(
            move |_ctx, _v: i32| {
                n.fetch_add(1, Ordering::SeqCst);
            },
            move |_ctx, _e| {
                t1.fetch_add(1, Ordering::SeqCst);
            },
            move |_ctx| {
                t2.fetch_add(1, Ordering::SeqCst);
            },
        );
        (Arc::new(observer), nexts, terminals)
    }

    #[test]
    fn only_one_terminal_notification_reaches_the_observer() {
        let (observer, nexts, terminals) = counting_observer();
        let subscriber = Subscriber::new(observer);
        let ctx = Context::background();
        subscriber.on_next(&ctx, 1);
        subscriber.on_complete(&ctx);
        subscriber.on_complete(&ctx);
        subscriber.on_error(&ctx, RoError::UnicastAlreadyObserved.boxed());
        subscriber.on_next(&ctx, 2);
        assert_eq!(nexts.load(Ordering::SeqCst), 1);
        assert_eq!(terminals.load(Ordering::SeqCst), 1);
        assert!(subscriber.is_completed());
        assert!(subscriber.is_closed());
    }

    #[test]
    fn on_next_panic_is_delivered_as_observer_error() {
        let terminals = Arc::new(AtomicUsize::new(0));
        let t = terminals.clone();
        let observer = observer_fn(
            |_ctx, _v: i32| panic!("boom"),
            move |_ctx, err| {
                assert!(err.to_string().contains("ro.Observer"));
                t.fetch_add(1, Ordering::SeqCst);
            },
            |_ctx| {},
        );
        let subscriber = Subscriber::new(Arc::new(observer));
        let ctx = Context::background();
        subscriber.on_next(&ctx, 1);
        assert_eq!(terminals.load(Ordering::SeqCst), 1);
        assert!(subscriber.has_thrown());
    }

    #[test]
    fn unsafe_mode_skips_locking_without_crashing() {
        let (observer, nexts, _) = counting_observer();
        let subscriber = Subscriber::with_mode(
            observer,
            Subscription::new(),
            SubscriberMode::Unsafe,
            Backpressure::Block,
        );
        let ctx = Context::background();
        for i in 0..10 {
            subscriber.on_next(&ctx, i);
        }
        assert_eq!(nexts.load(Ordering::SeqCst), 10);
    }
}
