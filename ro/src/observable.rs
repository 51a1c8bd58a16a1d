//! [`Observable`]: the cold stream factory (spec §4.3, C4).

use std::{
    any::Any,
    panic::{self, AssertUnwindSafe},
    sync::Arc,
};

use ro_core::{
    Backpressure, BoxError, Context, Observer, RoError, Subscriber, SubscriberMode, Subscription,
    Teardown,
};

type Factory<T> = dyn Fn(Context, Arc<Subscriber<T>>) -> Option<Teardown> + Send + Sync;

/// A cold factory producing a stream on demand: `subscribe(observer)` runs
/// the producer again for every subscriber.
///
/// Construction receives a factory `(ctx, subscriber) -> teardown`. On
/// `subscribe`, the runtime wraps the given observer in a `Subscriber` of
/// this `Observable`'s declared concurrency mode, invokes the factory
/// inside a panic barrier, and registers any returned teardown with the
/// subscription.
pub struct Observable<T> {
    factory: Arc<Factory<T>>,
    mode: SubscriberMode,
    backpressure: Backpressure,
}

impl<T> Clone for Observable<T> {
    fn clone(&self) -> Self {
        Self {
            factory: self.factory.clone(),
            mode: self.mode,
            backpressure: self.backpressure,
        }
    }
}

impl<T: 'static + Send> Observable<T> {
    /// Builds an `Observable` with the default `Safe`/`Block` subscriber
    /// configuration.
    pub fn new(
        factory: impl Fn(Context, Arc<Subscriber<T>>) -> Option<Teardown> + Send + Sync + 'static,
    ) -> Self {
        Self::with_mode(SubscriberMode::Safe, Backpressure::Block, factory)
    }

    /// Builds an `Observable` whose subscribers are wrapped with the given
    /// serialization mode and backpressure policy.
    pub fn with_mode(
        mode: SubscriberMode,
        backpressure: Backpressure,
        factory: impl Fn(Context, Arc<Subscriber<T>>) -> Option<Teardown> + Send + Sync + 'static,
    ) -> Self {
        Self {
            factory: Arc::new(factory),
            mode,
            backpressure,
        }
    }

    /// Subscribes `observer`, using a fresh background [`Context`].
    pub fn subscribe(&self, observer: impl Observer<T> + 'static) -> Subscription {
        self.subscribe_with_context(Context::background(), observer)
    }

    /// Subscribes `observer` under the given context.
    pub fn subscribe_with_context(
        &self,
        ctx: Context,
        observer: impl Observer<T> + 'static,
    ) -> Subscription {
        let subscription = Subscription::new();
        let subscriber = Arc::new(Subscriber::with_mode(
            Arc::new(observer),
            subscription.clone(),
            self.mode,
            self.backpressure,
        ));
        let factory = self.factory.clone();
        let factory_ctx = ctx.clone();
        let factory_subscriber = subscriber.clone();
        let result =
            panic::catch_unwind(AssertUnwindSafe(|| factory(factory_ctx, factory_subscriber)));
        match result {
            Ok(Some(teardown)) => subscription.add(teardown),
            Ok(None) => {}
            Err(payload) => {
                let message = panic_message(&payload);
                subscriber.on_error(&ctx, RoError::Observable(message).boxed());
            }
        }
        subscription
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "producer factory panicked with a non-string payload".to_string()
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};

    use ro_core::observer_fn;

    use super::*;

    #[test]
    fn factory_panic_becomes_observable_error() {
        let observable: Observable<i32> = Observable::new(|_ctx, _subscriber| -> Option<Teardown> {
            panic!("producer exploded");
        });
        let errors = Arc::new(AtomicUsize::new(0));
        let errors2 = errors.clone();
        let observer = observer_fn(
            |_ctx, _v: i32| {},
            move |_ctx, err| {
                assert!(err.to_string().contains("ro.Observable"));
                errors2.fetch_add(1, Ordering::SeqCst);
            },
            |_ctx| {},
        );
        observable.subscribe(observer);
        assert_eq!(errors.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn synchronous_terminal_closes_subscription_before_teardown_runs() {
        let torn_down = Arc::new(AtomicUsize::new(0));
        let torn_down2 = torn_down.clone();
        let observable: Observable<i32> = Observable::new(move |ctx, subscriber| {
            subscriber.on_complete(&ctx);
            let torn_down = torn_down2.clone();
            Some(Box::new(move || {
                torn_down.fetch_add(1, Ordering::SeqCst);
            }) as Teardown)
        });
        let subscription = observable.subscribe(observer_fn(
            |_ctx, _v: i32| {},
            |_ctx, _e| {},
            |_ctx| {},
        ));
        assert!(subscription.is_closed());
        assert_eq!(torn_down.load(Ordering::SeqCst), 1);
    }
}
