//! `scan` and `reduce`/`sum` (spec §4.9).

use std::sync::Arc;

use parking_lot::Mutex;
use ro_core::{observer_fn, BoxError, Context, Observer, Teardown};

use crate::Observable;

/// Emits every intermediate accumulator value: `initial`, then
/// `f(initial, v0)`, `f(f(initial, v0), v1)`, and so on.
pub fn scan<T: 'static + Send, Acc: 'static + Send + Clone>(
    source: Observable<T>,
    initial: Acc,
    f: impl Fn(Acc, T) -> Acc + Send + Sync + 'static,
) -> Observable<Acc> {
    let f = Arc::new(f);
    Observable::new(move |ctx: Context, subscriber| -> Option<Teardown> {
        let f = f.clone();
        let acc = Arc::new(Mutex::new(initial.clone()));
        let next_subscriber = subscriber.clone();
        let error_subscriber = subscriber.clone();
        let complete_subscriber = subscriber.clone();
        let observer = observer_fn(
            move |ctx: &Context, value: T| {
                let mut guard = acc.lock();
                *guard = f(guard.clone(), value);
                next_subscriber.on_next(ctx, guard.clone());
            },
            move |ctx: &Context, err: BoxError| error_subscriber.on_error(ctx, err),
            move |ctx: &Context| complete_subscriber.on_complete(ctx),
        );
        let upstream = source.subscribe_with_context(ctx, observer);
        Some(Box::new(move || upstream.unsubscribe()) as Teardown)
    })
}

/// Emits a single final accumulator value on source completion; never emits
/// on error, since there is no final value to report.
pub fn reduce<T: 'static + Send, Acc: 'static + Send + Clone>(
    source: Observable<T>,
    initial: Acc,
    f: impl Fn(Acc, T) -> Acc + Send + Sync + 'static,
) -> Observable<Acc> {
    let f = Arc::new(f);
    Observable::new(move |ctx: Context, subscriber| -> Option<Teardown> {
        let f = f.clone();
        let acc = Arc::new(Mutex::new(initial.clone()));
        let next_acc = acc.clone();
        let error_subscriber = subscriber.clone();
        let complete_subscriber = subscriber.clone();
        let complete_acc = acc;
        let observer = observer_fn(
            move |_ctx: &Context, value: T| {
                let mut guard = next_acc.lock();
                *guard = f(guard.clone(), value);
            },
            move |ctx: &Context, err: BoxError| error_subscriber.on_error(ctx, err),
            move |ctx: &Context| {
                complete_subscriber.on_next(ctx, complete_acc.lock().clone());
                complete_subscriber.on_complete(ctx);
            },
        );
        let upstream = source.subscribe_with_context(ctx, observer);
        Some(Box::new(move || upstream.unsubscribe()) as Teardown)
    })
}

/// `reduce` specialized to addition, starting from `T::default()`.
pub fn sum<T>(source: Observable<T>) -> Observable<T>
where
    T: 'static + Send + Clone + Default + std::ops::Add<Output = T>,
{
    reduce(source, T::default(), |acc, v| acc + v)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn scan_emits_every_partial_sum() {
        let source = crate::operators::of(vec![1, 2, 3]);
        let (values, _, err) = crate::collect(&scan(source, 0, |acc, v| acc + v));
        assert_eq!(values, vec![1, 3, 6]);
        assert!(err.is_none());
    }

    #[test]
    fn sum_emits_the_total_once() {
        let source = crate::operators::of(vec![1, 2, 3, 4]);
        let (values, _, err) = crate::collect(&sum(source));
        assert_eq!(values, vec![10]);
        assert!(err.is_none());
    }
}
