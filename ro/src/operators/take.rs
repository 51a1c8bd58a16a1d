//! `take` and `skip` (spec §4.9).

use std::sync::{
    atomic::{AtomicUsize, Ordering},
    Arc,
};

use parking_lot::Mutex;
use ro_core::{observer_fn, BoxError, Context, Observer, Subscription, Teardown};

use crate::Observable;

/// Forwards at most the first `count` `Next` values, then unsubscribes from
/// the source and completes. `count == 0` completes immediately without
/// subscribing upstream.
pub fn take<T: 'static + Send>(source: Observable<T>, count: usize) -> Observable<T> {
    Observable::new(move |ctx: Context, subscriber| -> Option<Teardown> {
        if count == 0 {
            subscriber.on_complete(&ctx);
            return None;
        }
        let remaining = Arc::new(AtomicUsize::new(count));
        let upstream_slot: Arc<Mutex<Option<Subscription>>> = Arc::new(Mutex::new(None));

        let remaining_next = remaining.clone();
        let upstream_next = upstream_slot.clone();
        let next_subscriber = subscriber.clone();
        let error_subscriber = subscriber.clone();
        let complete_subscriber = subscriber.clone();
        let observer = observer_fn(
            move |ctx: &Context, value: T| {
                if remaining_next.load(Ordering::SeqCst) == 0 {
                    return;
                }
                next_subscriber.on_next(ctx, value);
                if remaining_next.fetch_sub(1, Ordering::SeqCst) == 1 {
                    next_subscriber.on_complete(ctx);
                    if let Some(upstream) = upstream_next.lock().take() {
                        upstream.unsubscribe();
                    }
                }
            },
            move |ctx: &Context, err: BoxError| error_subscriber.on_error(ctx, err),
            move |ctx: &Context| complete_subscriber.on_complete(ctx),
        );
        let upstream = source.subscribe_with_context(ctx, observer);
        *upstream_slot.lock() = Some(upstream.clone());
        Some(Box::new(move || upstream.unsubscribe()) as Teardown)
    })
}

/// Drops the first `count` `Next` values, forwarding everything after.
pub fn skip<T: 'static + Send>(source: Observable<T>, count: usize) -> Observable<T> {
    Observable::new(move |ctx: Context, subscriber| -> Option<Teardown> {
        let remaining = Arc::new(AtomicUsize::new(count));
        let next_subscriber = subscriber.clone();
        let error_subscriber = subscriber.clone();
        let complete_subscriber = subscriber.clone();
        let observer = observer_fn(
            move |ctx: &Context, value: T| {
                if remaining.load(Ordering::SeqCst) > 0 {
                    remaining.fetch_sub(1, Ordering::SeqCst);
                    return;
                }
                next_subscriber.on_next(ctx, value);
            },
            move |ctx: &Context, err: BoxError| error_subscriber.on_error(ctx, err),
            move |ctx: &Context| complete_subscriber.on_complete(ctx),
        );
        let upstream = source.subscribe_with_context(ctx, observer);
        Some(Box::new(move || upstream.unsubscribe()) as Teardown)
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn take_stops_after_count_values() {
        let source = crate::operators::of(vec![1, 2, 3, 4, 5]);
        let (values, _, err) = crate::collect(&take(source, 3));
        assert_eq!(values, vec![1, 2, 3]);
        assert!(err.is_none());
    }

    #[test]
    fn take_zero_completes_without_subscribing() {
        let (values, _, err) = crate::collect(&take(crate::operators::of(vec![1, 2, 3]), 0));
        assert!(values.is_empty());
        assert!(err.is_none());
    }

    #[test]
    fn skip_drops_the_leading_values() {
        let source = crate::operators::of(vec![1, 2, 3, 4, 5]);
        let (values, _, err) = crate::collect(&skip(source, 2));
        assert_eq!(values, vec![3, 4, 5]);
        assert!(err.is_none());
    }
}
