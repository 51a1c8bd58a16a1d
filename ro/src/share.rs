//! `Share` (spec §4.5): a refcounted multicast operator that connects
//! automatically when the first subscriber arrives and (optionally)
//! disconnects when the last one leaves, unlike [`crate::connectable`]'s
//! explicit `connect()`.

use std::sync::{
    atomic::{AtomicUsize, Ordering},
    Arc,
};

use parking_lot::Mutex;
use ro_core::{observer_fn, BoxError, Context, Observer, Subscription, Teardown};

use crate::subject::{publish, replay, Subject};
use crate::Observable;

/// Configuration for [`share_with_config`].
pub struct ShareConfig<T> {
    /// Builds the `Subject` used to multicast the source.
    pub connector: Arc<dyn Fn() -> Subject<T> + Send + Sync>,
    /// Discard the shared subject and upstream subscription after the
    /// source errors, so the next subscriber triggers a fresh attempt
    /// instead of replaying the stale error.
    pub reset_on_error: bool,
    /// As `reset_on_error`, but for `Complete`.
    pub reset_on_complete: bool,
    /// Discard the shared subject and disconnect from the source once the
    /// last downstream subscriber unsubscribes, even if the source never
    /// terminated on its own.
    pub reset_on_ref_count_zero: bool,
}

impl<T: 'static + Send + Clone> Default for ShareConfig<T> {
    fn default() -> Self {
        Self {
            connector: Arc::new(publish),
            reset_on_error: true,
            reset_on_complete: false,
            reset_on_ref_count_zero: false,
        }
    }
}

/// Configuration for [`share_replay_with_config`]; `reset_on_error: true`
/// and `reset_on_complete: false` are fixed, matching a `ReplaySubject`'s
/// usual role of also caching errors for late subscribers.
pub struct ShareReplayConfig {
    pub reset_on_ref_count_zero: bool,
}

impl Default for ShareReplayConfig {
    fn default() -> Self {
        Self {
            reset_on_ref_count_zero: false,
        }
    }
}

struct Shared<T> {
    source: Observable<T>,
    config: ShareConfig<T>,
    subject: Mutex<Option<Subject<T>>>,
    upstream: Mutex<Option<Subscription>>,
    ref_count: AtomicUsize,
}

impl<T: 'static + Send + Clone> Shared<T> {
    fn current_subject(self: &Arc<Self>) -> Subject<T> {
        self.subject
            .lock()
            .get_or_insert_with(|| (self.config.connector)())
            .clone()
    }

    fn ensure_connected(self: &Arc<Self>) {
        let mut upstream = self.upstream.lock();
        if upstream.is_some() {
            return;
        }
        let subject = self.current_subject();
        let next_subject = subject.clone();
        let error_subject = subject.clone();
        let complete_subject = subject.clone();
        let error_shared = self.clone();
        let complete_shared = self.clone();
        let observer = observer_fn(
            move |ctx: &Context, value: T| next_subject.on_next(ctx, value),
            move |ctx: &Context, err: BoxError| {
                error_subject.on_error(ctx, err);
                *error_shared.upstream.lock() = None;
                if error_shared.config.reset_on_error {
                    *error_shared.subject.lock() = None;
                }
            },
            move |ctx: &Context| {
                complete_subject.on_complete(ctx);
                *complete_shared.upstream.lock() = None;
                if complete_shared.config.reset_on_complete {
                    *complete_shared.subject.lock() = None;
                }
            },
        );
        let subscription = self
            .source
            .subscribe_with_context(Context::background(), observer);
        *upstream = Some(subscription);
    }

    fn release(self: &Arc<Self>) {
        if self.ref_count.fetch_sub(1, Ordering::SeqCst) == 1 && self.config.reset_on_ref_count_zero {
            if let Some(upstream) = self.upstream.lock().take() {
                upstream.unsubscribe();
            }
            *self.subject.lock() = None;
        }
    }
}

/// A refcounted, auto-(dis)connecting multicast wrapper over a cold
/// `Observable<T>`.
pub struct Share<T> {
    shared: Arc<Shared<T>>,
}

impl<T> Clone for Share<T> {
    fn clone(&self) -> Self {
        Self {
            shared: self.shared.clone(),
        }
    }
}

impl<T: 'static + Send + Clone> Share<T> {
    pub fn as_observable(&self) -> Observable<T> {
        let shared = self.shared.clone();
        Observable::new(move |ctx, subscriber| -> Option<Teardown> {
            let subject = shared.current_subject();
            let downstream = subject.as_observable().subscribe_with_context(ctx, subscriber.clone());
            if shared.ref_count.fetch_add(1, Ordering::SeqCst) == 0 {
                shared.ensure_connected();
            }
            let teardown_shared = shared.clone();
            Some(Box::new(move || {
                downstream.unsubscribe();
                teardown_shared.release();
            }) as Teardown)
        })
    }
}

/// Wraps `source` as a [`Share`] using the given configuration.
pub fn share_with_config<T: 'static + Send + Clone>(
    source: Observable<T>,
    config: ShareConfig<T>,
) -> Share<T> {
    Share {
        shared: Arc::new(Shared {
            source,
            config,
            subject: Mutex::new(None),
            upstream: Mutex::new(None),
            ref_count: AtomicUsize::new(0),
        }),
    }
}

/// Wraps `source` as a [`Share`] using a plain [`publish`] subject and the
/// default reset policy (`reset_on_error: true`, everything else `false`).
pub fn share<T: 'static + Send + Clone>(source: Observable<T>) -> Share<T> {
    share_with_config(source, ShareConfig::default())
}

/// Wraps `source` as a [`Share`] backed by a `Replay` subject of the given
/// capacity.
pub fn share_replay_with_config<T: 'static + Send + Clone>(
    source: Observable<T>,
    capacity: usize,
    config: ShareReplayConfig,
) -> Share<T> {
    share_with_config(
        source,
        ShareConfig {
            connector: Arc::new(move || replay(capacity)),
            reset_on_error: true,
            reset_on_complete: false,
            reset_on_ref_count_zero: config.reset_on_ref_count_zero,
        },
    )
}

/// As [`share_replay_with_config`], with the default `ShareReplayConfig`.
pub fn share_replay<T: 'static + Send + Clone>(source: Observable<T>, capacity: usize) -> Share<T> {
    share_replay_with_config(source, capacity, ShareReplayConfig::default())
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};

    use super::*;

    #[test]
    fn share_connects_once_for_concurrent_subscribers() {
        let subscribes = Arc::new(AtomicUsize::new(0));
        let subscribes2 = subscribes.clone();
        let source: Observable<i32> = Observable::new(move |ctx, subscriber| {
            subscribes2.fetch_add(1, Ordering::SeqCst);
            subscriber.on_next(&ctx, 1);
            subscriber.on_complete(&ctx);
            None
        });
        let shared = share(source);
        let _a = shared.as_observable().subscribe(observer_fn(
            |_c, _v: i32| {},
            |_c, _e| {},
            |_c| {},
        ));
        assert_eq!(subscribes.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn share_replay_reconnects_after_ref_count_zero_when_configured() {
        let subscribes = Arc::new(AtomicUsize::new(0));
        let subscribes2 = subscribes.clone();
        let source: Observable<i32> = Observable::new(move |ctx, subscriber| {
            subscribes2.fetch_add(1, Ordering::SeqCst);
            subscriber.on_next(&ctx, 1);
            None
        });
        let shared = share_replay_with_config(
            source,
            1,
            ShareReplayConfig {
                reset_on_ref_count_zero: true,
            },
        );
        let first = shared.as_observable().subscribe(observer_fn(
            |_c, _v: i32| {},
            |_c, _e| {},
            |_c| {},
        ));
        first.unsubscribe();
        let _second = shared.as_observable().subscribe(observer_fn(
            |_c, _v: i32| {},
            |_c, _e| {},
            |_c| {},
        ));
        assert_eq!(subscribes.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn share_with_no_reset_flags_latches_the_error_for_late_subscribers() {
        // spec.md §8: "Share with error, no reset". A sees 1,2,E; B,
        // subscribing after termination, sees only the latched E; the
        // source is subscribed exactly once.
        let subscribes = Arc::new(AtomicUsize::new(0));
        let subscribes2 = subscribes.clone();
        let source: Observable<i32> = Observable::new(move |ctx, subscriber| {
            subscribes2.fetch_add(1, Ordering::SeqCst);
            subscriber.on_next(&ctx, 1);
            subscriber.on_next(&ctx, 2);
            subscriber.on_error(&ctx, ro_core::RoError::Observable("boom".into()).boxed());
            None
        });
        let shared = share_with_config(
            source,
            ShareConfig {
                connector: Arc::new(publish),
                reset_on_error: false,
                reset_on_complete: false,
                reset_on_ref_count_zero: false,
            },
        );
        let a_values = Arc::new(Mutex::new(Vec::new()));
        let a_values2 = a_values.clone();
        let a_errors = Arc::new(AtomicUsize::new(0));
        let a_errors2 = a_errors.clone();
        let _a = shared.as_observable().subscribe(observer_fn(
            move |_c, v: i32| a_values2.lock().push(v),
            move |_c, _e| {
                a_errors2.fetch_add(1, Ordering::SeqCst);
            },
            |_c| {},
        ));
        assert_eq!(*a_values.lock(), vec![1, 2]);
        assert_eq!(a_errors.load(Ordering::SeqCst), 1);

        let b_values = Arc::new(Mutex::new(Vec::new()));
        let b_values2 = b_values.clone();
        let b_errors = Arc::new(AtomicUsize::new(0));
        let b_errors2 = b_errors.clone();
        let _b = shared.as_observable().subscribe(observer_fn(
            move |_c, v: i32| b_values2.lock().push(v),
            move |_c, _e| {
                b_errors2.fetch_add(1, Ordering::SeqCst);
            },
            |_c| {},
        ));
        assert!(b_values.lock().is_empty());
        assert_eq!(b_errors.load(Ordering::SeqCst), 1);
        assert_eq!(subscribes.load(Ordering::SeqCst), 1);
    }
}
