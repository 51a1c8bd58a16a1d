//! `interval`, `timer`, `delay`, `timeout` (spec §4.9 time operators).
//!
//! Every timer here is a real OS thread sleeping in wall-clock time, the
//! same model `ro_core::Context::with_deadline` uses. There is no
//! virtualized scheduler to fast-forward in tests.

use std::{
    sync::{
        atomic::{AtomicBool, Ordering},
        mpsc, Arc,
    },
    thread,
    time::{Duration, Instant},
};

use parking_lot::Mutex;
use ro::{observer_fn, BoxError, Context, Observer, RoError, Subscriber, Subscription, Teardown};
use ro::Observable;

/// Emits `0, 1, 2, ...` every `period`, starting after one `period` has
/// elapsed, until unsubscribed. Never completes on its own.
pub fn interval(period: Duration) -> Observable<u64> {
    interval_with_initial(period, period)
}

/// As [`interval`], but the first emission happens after `initial_delay`
/// rather than after `period`.
pub fn interval_with_initial(initial_delay: Duration, period: Duration) -> Observable<u64> {
    Observable::new(move |ctx, subscriber: Arc<Subscriber<u64>>| -> Option<Teardown> {
        let stop = Arc::new(AtomicBool::new(false));
        let thread_stop = stop.clone();
        let thread_subscriber = subscriber.clone();
        let thread_ctx = ctx.clone();
        let spawned = thread::Builder::new()
            .name("ro-interval".into())
            .spawn(move || {
                thread::sleep(initial_delay);
                let mut n: u64 = 0;
                loop {
                    if thread_stop.load(Ordering::SeqCst) || thread_subscriber.is_closed() {
                        return;
                    }
                    thread_subscriber.on_next(&thread_ctx, n);
                    n += 1;
                    thread::sleep(period);
                }
            });
        if spawned.is_err() {
            subscriber.on_error(
                &ctx,
                RoError::Observable("failed to spawn interval thread".into()).boxed(),
            );
        }
        Some(Box::new(move || stop.store(true, Ordering::SeqCst)) as Teardown)
    })
}

/// Emits a single `()` after `duration`, then completes. The building
/// block behind `ro::operators`-level timeouts and throttling.
pub fn timer(duration: Duration) -> Observable<()> {
    Observable::new(move |ctx, subscriber: Arc<Subscriber<()>>| -> Option<Teardown> {
        let stop = Arc::new(AtomicBool::new(false));
        let thread_stop = stop.clone();
        let thread_subscriber = subscriber.clone();
        let thread_ctx = ctx.clone();
        let spawned = thread::Builder::new()
            .name("ro-timer".into())
            .spawn(move || {
                thread::sleep(duration);
                if thread_stop.load(Ordering::SeqCst) || thread_subscriber.is_closed() {
                    return;
                }
                thread_subscriber.on_next(&thread_ctx, ());
                thread_subscriber.on_complete(&thread_ctx);
            });
        if spawned.is_err() {
            subscriber.on_error(
                &ctx,
                RoError::Observable("failed to spawn timer thread".into()).boxed(),
            );
        }
        Some(Box::new(move || stop.store(true, Ordering::SeqCst)) as Teardown)
    })
}

enum DelayedMsg<T> {
    Next(Context, T),
    Error(Context, BoxError),
    Complete(Context),
}

/// Shifts every notification from `source` later by `duration`, preserving
/// order. Implemented with a dedicated delivery thread fed by an unbounded
/// channel, so the upstream producer is never blocked waiting for the
/// delay to elapse.
pub fn delay<T: 'static + Send>(source: Observable<T>, duration: Duration) -> Observable<T> {
    Observable::new(move |ctx: Context, subscriber| -> Option<Teardown> {
        let (tx, rx) = mpsc::channel::<(Instant, DelayedMsg<T>)>();

        let delivery_subscriber = subscriber.clone();
        thread::Builder::new()
            .name("ro-delay".into())
            .spawn(move || {
                for (due, msg) in rx {
                    let now = Instant::now();
                    if due > now {
                        thread::sleep(due - now);
                    }
                    if delivery_subscriber.is_closed() {
                        continue;
                    }
                    match msg {
                        DelayedMsg::Next(ctx, value) => delivery_subscriber.on_next(&ctx, value),
                        DelayedMsg::Error(ctx, err) => {
                            delivery_subscriber.on_error(&ctx, err);
                            return;
                        }
                        DelayedMsg::Complete(ctx) => {
                            delivery_subscriber.on_complete(&ctx);
                            return;
                        }
                    }
                }
            })
            .ok();

        let next_tx = tx.clone();
        let error_tx = tx.clone();
        let observer = observer_fn(
            move |ctx: &Context, value: T| {
                let _ = next_tx.send((Instant::now() + duration, DelayedMsg::Next(ctx.clone(), value)));
            },
            move |ctx: &Context, err: BoxError| {
                let _ = error_tx.send((Instant::now() + duration, DelayedMsg::Error(ctx.clone(), err)));
            },
            move |ctx: &Context| {
                let _ = tx.send((Instant::now() + duration, DelayedMsg::Complete(ctx.clone())));
            },
        );
        let upstream = source.subscribe_with_context(ctx, observer);
        Some(Box::new(move || upstream.unsubscribe()) as Teardown)
    })
}

struct Deadline {
    instant: Instant,
}

/// Errors with `RoError::Timeout` if no `Next` (or the initial
/// subscription) is followed by another `Next` within `duration`. The
/// timer resets on every `Next`.
pub fn timeout<T: 'static + Send>(source: Observable<T>, duration: Duration) -> Observable<T> {
    Observable::new(move |ctx: Context, subscriber| -> Option<Teardown> {
        let deadline = Arc::new(Mutex::new(Deadline {
            instant: Instant::now() + duration,
        }));
        let upstream_slot: Arc<Mutex<Option<Subscription>>> = Arc::new(Mutex::new(None));

        let watcher_deadline = deadline.clone();
        let watcher_subscriber = subscriber.clone();
        let watcher_ctx = ctx.clone();
        let watcher_upstream = upstream_slot.clone();
        thread::Builder::new()
            .name("ro-timeout".into())
            .spawn(move || loop {
                if watcher_subscriber.is_closed() {
                    return;
                }
                let due = watcher_deadline.lock().instant;
                let now = Instant::now();
                if due > now {
                    thread::sleep(due - now);
                    continue;
                }
                if watcher_subscriber.is_closed() {
                    return;
                }
                watcher_subscriber.on_error(&watcher_ctx, RoError::Timeout(duration).boxed());
                if let Some(upstream) = watcher_upstream.lock().take() {
                    upstream.unsubscribe();
                }
                return;
            })
            .ok();

        let next_deadline = deadline.clone();
        let next_subscriber = subscriber.clone();
        let error_subscriber = subscriber.clone();
        let complete_subscriber = subscriber.clone();
        let observer = observer_fn(
            move |ctx: &Context, value: T| {
                next_deadline.lock().instant = Instant::now() + duration;
                next_subscriber.on_next(ctx, value);
            },
            move |ctx: &Context, err: BoxError| error_subscriber.on_error(ctx, err),
            move |ctx: &Context| complete_subscriber.on_complete(ctx),
        );
        let upstream = source.subscribe_with_context(ctx, observer);
        *upstream_slot.lock() = Some(upstream.clone());
        Some(Box::new(move || upstream.unsubscribe()) as Teardown)
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn timer_emits_once_then_completes() {
        let (values, _, err) = ro::collect(&timer(Duration::from_millis(5)));
        assert_eq!(values, vec![()]);
        assert!(err.is_none());
    }

    #[test]
    fn delay_preserves_order() {
        let source = ro::of(vec![1, 2, 3]);
        let (values, _, err) = ro::collect(&delay(source, Duration::from_millis(5)));
        assert_eq!(values, vec![1, 2, 3]);
        assert!(err.is_none());
    }

    #[test]
    fn timeout_errors_when_source_never_emits() {
        let never: Observable<i32> = Observable::new(|_ctx, _subscriber| None);
        let (values, _, err) = ro::collect(&timeout(never, Duration::from_millis(5)));
        assert!(values.is_empty());
        assert!(err.is_some());
    }
}
