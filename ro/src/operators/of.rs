//! `of`: a simple synchronous source (spec §4.9 example sources).

use std::sync::Arc;

use ro_core::{Subscriber, Teardown};

use crate::Observable;

/// Builds an `Observable` that synchronously emits every element of
/// `values`, in order, then completes. Each subscription replays the whole
/// sequence from the start; the source is as cold as any other `Observable`.
pub fn of<T: 'static + Send + Clone>(values: Vec<T>) -> Observable<T> {
    Observable::new(move |ctx, subscriber: Arc<Subscriber<T>>| -> Option<Teardown> {
        for value in values.clone() {
            if subscriber.is_closed() {
                return None;
            }
            subscriber.on_next(&ctx, value);
        }
        if !subscriber.is_closed() {
            subscriber.on_complete(&ctx);
        }
        None
    })
}

/// Builds an `Observable` that emits a single value then completes.
pub fn just<T: 'static + Send + Clone>(value: T) -> Observable<T> {
    of(vec![value])
}

/// Builds an `Observable` that immediately completes without emitting.
pub fn empty<T: 'static + Send>() -> Observable<T> {
    Observable::new(|ctx, subscriber: Arc<Subscriber<T>>| -> Option<Teardown> {
        subscriber.on_complete(&ctx);
        None
    })
}

/// Builds an `Observable` that immediately errors without emitting.
pub fn throw<T: 'static + Send>(
    error: impl Fn() -> ro_core::BoxError + Send + Sync + 'static,
) -> Observable<T> {
    Observable::new(move |ctx, subscriber: Arc<Subscriber<T>>| -> Option<Teardown> {
        subscriber.on_error(&ctx, error());
        None
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn of_replays_the_sequence_per_subscription() {
        let source = of(vec![1, 2, 3]);
        let (first, _, _) = crate::collect(&source);
        let (second, _, _) = crate::collect(&source);
        assert_eq!(first, vec![1, 2, 3]);
        assert_eq!(second, vec![1, 2, 3]);
    }

    #[test]
    fn empty_completes_without_values() {
        let (values, _, err) = crate::collect(&empty::<i32>());
        assert!(values.is_empty());
        assert!(err.is_none());
    }
}
