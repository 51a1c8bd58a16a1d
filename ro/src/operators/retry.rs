//! `retry`/`retry_with_config` (spec §4.9, §8 retry scenario).

use std::{
    sync::{
        atomic::{AtomicUsize, Ordering},
        Arc,
    },
    time::Duration,
};

use parking_lot::Mutex;
use ro_core::{observer_fn, BoxError, Context, Observer, Subscriber, Subscription, Teardown};

use crate::Observable;

/// Configuration for [`retry_with_config`].
///
/// `max_retries` counts resubscriptions after the first attempt, so
/// `max_retries: 2` allows up to 3 total attempts. `delay` is slept on the
/// attempting thread before each resubscription. When `reset_on_success` is
/// set, any `Next` value resets the retry budget back to `max_retries`
/// remaining, so a source that fails intermittently between long healthy
/// stretches is never penalized for earlier, already-forgiven errors.
#[derive(Debug, Clone)]
pub struct RetryConfig {
    pub max_retries: usize,
    pub delay: Duration,
    pub reset_on_success: bool,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_retries: 0,
            delay: Duration::ZERO,
            reset_on_success: false,
        }
    }
}

/// Resubscribes on error with no delay, no retries: equivalent to the
/// source itself. Use [`retry_with_config`] for anything more interesting.
pub fn retry<T: 'static + Send>(source: Observable<T>) -> Observable<T> {
    retry_with_config(source, RetryConfig::default())
}

struct Attempt<T> {
    source: Observable<T>,
    config: RetryConfig,
    attempts: AtomicUsize,
    ctx: Context,
    subscriber: Arc<Subscriber<T>>,
    upstream_slot: Mutex<Option<Subscription>>,
}

impl<T: 'static + Send> Attempt<T> {
    fn run(self: Arc<Self>) {
        if self.subscriber.is_closed() {
            return;
        }
        let next_self = self.clone();
        let error_self = self.clone();
        let complete_subscriber = self.subscriber.clone();
        let observer = observer_fn(
            move |ctx: &Context, value: T| {
                if next_self.config.reset_on_success {
                    next_self.attempts.store(0, Ordering::SeqCst);
                }
                next_self.subscriber.on_next(ctx, value);
            },
            move |ctx: &Context, err: BoxError| {
                let attempt_number = error_self.attempts.fetch_add(1, Ordering::SeqCst);
                if attempt_number < error_self.config.max_retries && !error_self.subscriber.is_closed() {
                    if !error_self.config.delay.is_zero() {
                        std::thread::sleep(error_self.config.delay);
                    }
                    error_self.clone().run();
                } else {
                    error_self.subscriber.on_error(ctx, err);
                }
            },
            move |ctx: &Context| complete_subscriber.on_complete(ctx),
        );
        let upstream = self.source.subscribe_with_context(self.ctx.clone(), observer);
        *self.upstream_slot.lock() = Some(upstream);
    }
}

/// Resubscribes to `source` on `Error`, up to `config.max_retries` times,
/// waiting `config.delay` between attempts, before finally forwarding the
/// last error to the subscriber.
pub fn retry_with_config<T: 'static + Send>(
    source: Observable<T>,
    config: RetryConfig,
) -> Observable<T> {
    Observable::new(move |ctx: Context, subscriber| -> Option<Teardown> {
        let attempt = Arc::new(Attempt {
            source: source.clone(),
            config: config.clone(),
            attempts: AtomicUsize::new(0),
            ctx,
            subscriber,
            upstream_slot: Mutex::new(None),
        });
        attempt.clone().run();
        Some(Box::new(move || {
            if let Some(upstream) = attempt.upstream_slot.lock().take() {
                upstream.unsubscribe();
            }
        }) as Teardown)
    })
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};

    use ro_core::RoError;

    use super::*;

    #[test]
    fn retries_up_to_max_then_surfaces_the_error() {
        let calls = Arc::new(AtomicUsize::new(0));
        let calls2 = calls.clone();
        let source: Observable<i32> = Observable::new(move |ctx, subscriber: Arc<Subscriber<i32>>| {
            calls2.fetch_add(1, Ordering::SeqCst);
            subscriber.on_next(&ctx, 1);
            subscriber.on_next(&ctx, 2);
            subscriber.on_error(&ctx, RoError::Observable("boom".into()).boxed());
            None
        });
        let retried = retry_with_config(
            source,
            RetryConfig {
                max_retries: 2,
                delay: Duration::ZERO,
                reset_on_success: false,
            },
        );
        let (values, _, err) = crate::collect(&retried);
        assert_eq!(calls.load(Ordering::SeqCst), 3);
        assert_eq!(values, vec![1, 2, 1, 2, 1, 2]);
        assert!(err.is_some());
    }
}
