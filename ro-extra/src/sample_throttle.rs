//! `sample_when`, `throttle_when`, `throttle_time` (spec §4.9 rate-shaping
//! operators).

use std::{
    sync::{
        atomic::{AtomicBool, Ordering},
        Arc,
    },
    time::Duration,
};

use parking_lot::Mutex;
use ro::{observer_fn, BoxError, Context, Observer, Teardown};
use ro::Observable;

use crate::time::timer;

/// Emits the most recently seen source value every time `notifier` emits a
/// `Next`. Nothing is emitted before the first source value arrives; the
/// same value may be sampled more than once if the source is quiet between
/// notifier ticks.
pub fn sample_when<T: 'static + Send + Clone>(
    source: Observable<T>,
    notifier: Observable<()>,
) -> Observable<T> {
    Observable::new(move |ctx: Context, subscriber| -> Option<Teardown> {
        let latest: Arc<Mutex<Option<T>>> = Arc::new(Mutex::new(None));

        let source_latest = latest.clone();
        let error_subscriber = subscriber.clone();
        let complete_subscriber = subscriber.clone();
        let source_observer = observer_fn(
            move |_ctx: &Context, value: T| *source_latest.lock() = Some(value),
            move |ctx: &Context, err: BoxError| error_subscriber.on_error(ctx, err),
            move |ctx: &Context| complete_subscriber.on_complete(ctx),
        );
        let source_subscription = source.subscribe_with_context(ctx.clone(), source_observer);

        let notifier_latest = latest;
        let notifier_subscriber = subscriber.clone();
        let notifier_observer = observer_fn(
            move |ctx: &Context, _unit: ()| {
                if let Some(value) = notifier_latest.lock().clone() {
                    notifier_subscriber.on_next(ctx, value);
                }
            },
            move |_ctx: &Context, _err: BoxError| {},
            move |_ctx: &Context| {},
        );
        let notifier_subscription = notifier.subscribe_with_context(ctx, notifier_observer);

        Some(Box::new(move || {
            source_subscription.unsubscribe();
            notifier_subscription.unsubscribe();
        }) as Teardown)
    })
}

/// Leading-edge throttle: forwards a value, then ignores further values
/// until the observable returned by `duration_selector` for that value
/// emits or completes. Each gate observable is fire-and-forget (it is not
/// torn down early if the outer subscription unsubscribes first), the same
/// bounded-leak tradeoff `ro_core::Context::with_deadline` documents for
/// its own timer thread.
pub fn throttle_when<T: 'static + Send>(
    source: Observable<T>,
    duration_selector: impl Fn(&T) -> Observable<()> + Send + Sync + 'static,
) -> Observable<T> {
    let duration_selector = Arc::new(duration_selector);
    Observable::new(move |ctx: Context, subscriber| -> Option<Teardown> {
        let duration_selector = duration_selector.clone();
        let silenced = Arc::new(AtomicBool::new(false));
        let next_subscriber = subscriber.clone();
        let next_silenced = silenced;
        let error_subscriber = subscriber.clone();
        let complete_subscriber = subscriber.clone();
        let observer = observer_fn(
            move |ctx: &Context, value: T| {
                if next_silenced.swap(true, Ordering::SeqCst) {
                    return;
                }
                let gate = duration_selector(&value);
                next_subscriber.on_next(ctx, value);
                let gate_silenced_next = next_silenced.clone();
                let gate_silenced_complete = next_silenced.clone();
                let gate_observer = observer_fn(
                    move |_ctx: &Context, _unit: ()| {
                        gate_silenced_next.store(false, Ordering::SeqCst)
                    },
                    move |_ctx: &Context, _err: BoxError| {},
                    move |_ctx: &Context| gate_silenced_complete.store(false, Ordering::SeqCst),
                );
                let _ = gate.subscribe_with_context(ctx.clone(), gate_observer);
            },
            move |ctx: &Context, err: BoxError| error_subscriber.on_error(ctx, err),
            move |ctx: &Context| complete_subscriber.on_complete(ctx),
        );
        let upstream = source.subscribe_with_context(ctx, observer);
        Some(Box::new(move || upstream.unsubscribe()) as Teardown)
    })
}

/// `throttle_when` with a fixed-duration gate: forwards a value, then
/// ignores further values for `duration`.
pub fn throttle_time<T: 'static + Send>(source: Observable<T>, duration: Duration) -> Observable<T> {
    throttle_when(source, move |_value| timer(duration))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sample_when_emits_the_latest_value_per_tick() {
        // `publish` subjects let the test control the interleaving of
        // source values and notifier ticks directly, rather than relying
        // on two synchronous cold sources racing each other.
        let source = ro::publish::<i32>();
        let notifier = ro::publish::<()>();
        let sampled = sample_when(source.as_observable(), notifier.as_observable());
        let received = Arc::new(Mutex::new(Vec::new()));
        let received2 = received.clone();
        let _subscription = sampled.subscribe(ro::observer_fn(
            move |_ctx, v: i32| received2.lock().push(v),
            |_ctx, _e| {},
            |_ctx| {},
        ));
        source.next(1);
        source.next(2);
        notifier.next(());
        source.next(3);
        notifier.next(());
        notifier.next(());
        assert_eq!(*received.lock(), vec![2, 3, 3]);
    }

    #[test]
    fn throttle_when_drops_values_during_the_gate() {
        let source = ro::of(vec![1, 2, 3]);
        // A gate that never fires: every value after the first is dropped.
        let never_gate: Observable<()> = Observable::new(|_ctx, _subscriber| None);
        let throttled = throttle_when(source, move |_v| never_gate.clone());
        let (values, _, err) = ro::collect(&throttled);
        assert_eq!(values, vec![1]);
        assert!(err.is_none());
    }
}
