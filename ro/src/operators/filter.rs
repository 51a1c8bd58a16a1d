//! `filter` (spec §4.9).

use std::sync::Arc;

use ro_core::{observer_fn, BoxError, Context, Observer, Teardown};

use crate::Observable;

/// Forwards only the `Next` values for which `predicate` returns `true`.
pub fn filter<T: 'static + Send>(
    source: Observable<T>,
    predicate: impl Fn(&T) -> bool + Send + Sync + 'static,
) -> Observable<T> {
    let predicate = Arc::new(predicate);
    Observable::new(move |ctx: Context, subscriber| -> Option<Teardown> {
        let predicate = predicate.clone();
        let next_subscriber = subscriber.clone();
        let error_subscriber = subscriber.clone();
        let complete_subscriber = subscriber.clone();
        let observer = observer_fn(
            move |ctx: &Context, value: T| {
                if predicate(&value) {
                    next_subscriber.on_next(ctx, value);
                }
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
    fn filter_drops_values_failing_the_predicate() {
        let source = crate::operators::of(vec![1, 2, 3, 4, 5]);
        let filtered = filter(source, |v| v % 2 == 0);
        let (values, _, err) = crate::collect(&filtered);
        assert_eq!(values, vec![2, 4]);
        assert!(err.is_none());
    }
}
