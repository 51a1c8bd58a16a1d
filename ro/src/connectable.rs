//! `Connectable` (spec §4.5): turns a cold `Observable<T>` into a hot one
//! that only actually subscribes to its source once `connect()` is called,
//! and multicasts that one upstream subscription to every downstream
//! subscriber via a [`Subject`].

use std::sync::Arc;

use parking_lot::Mutex;
use ro_core::{Context, Subscription, Teardown};

use crate::subject::{publish, Subject};
use crate::Observable;

/// Configuration for [`connectable`].
pub struct ConnectableConfig<T> {
    /// Builds the `Subject` used to multicast the source. Defaults to
    /// [`publish`] when using [`connectable`] directly.
    pub connector: Arc<dyn Fn() -> Subject<T> + Send + Sync>,
    /// When `true`, a fresh connector (and thus a fresh upstream
    /// subscription) is created the next time `connect()` is called after a
    /// disconnect, rather than reusing the subject's buffered state.
    pub reset_on_disconnect: bool,
}

impl<T: 'static + Send + Clone> Default for ConnectableConfig<T> {
    fn default() -> Self {
        Self {
            connector: Arc::new(publish),
            reset_on_disconnect: true,
        }
    }
}

struct Shared<T> {
    source: Observable<T>,
    config: ConnectableConfig<T>,
    subject: Mutex<Option<Subject<T>>>,
    upstream: Mutex<Option<Subscription>>,
}

/// A hot, connectable wrapper over a cold `Observable<T>`.
pub struct Connectable<T> {
    shared: Arc<Shared<T>>,
    observable: Observable<T>,
}

impl<T> Clone for Connectable<T> {
    fn clone(&self) -> Self {
        Self {
            shared: self.shared.clone(),
            observable: self.observable.clone(),
        }
    }
}

impl<T: 'static + Send + Clone> Connectable<T> {
    /// Exposes the multicasting `Observable<T>`. Subscribing here never
    /// touches the source by itself; only [`Connectable::connect`] does.
    pub fn as_observable(&self) -> Observable<T> {
        self.observable.clone()
    }

    /// Subscribes to the source exactly once (idempotent while connected),
    /// routing its notifications through the shared subject. Returns a
    /// `Subscription` that, when unsubscribed, tears down the upstream
    /// connection and, if `reset_on_disconnect`, discards the subject so the
    /// next `connect()` starts from a clean buffer.
    pub fn connect(&self) -> Subscription {
        let mut upstream = self.shared.upstream.lock();
        if let Some(existing) = upstream.as_ref() {
            return existing.clone();
        }
        let subject = self
            .shared
            .subject
            .lock()
            .get_or_insert_with(|| (self.shared.config.connector)())
            .clone();
        let subscription =
            self.shared
                .source
                .subscribe_with_context(Context::background(), subject.clone());
        *upstream = Some(subscription.clone());
        drop(upstream);
        let shared = self.shared.clone();
        subscription.add(move || {
            *shared.upstream.lock() = None;
            if shared.config.reset_on_disconnect {
                *shared.subject.lock() = None;
            }
        });
        subscription
    }
}

/// Wraps `source` as a [`Connectable`] using the given configuration.
pub fn connectable_with_config<T: 'static + Send + Clone>(
    source: Observable<T>,
    config: ConnectableConfig<T>,
) -> Connectable<T> {
    let shared = Arc::new(Shared {
        source,
        config,
        subject: Mutex::new(None),
        upstream: Mutex::new(None),
    });
    let factory_shared = shared.clone();
    let observable = Observable::new(move |ctx, subscriber| -> Option<Teardown> {
        let subject = factory_shared
            .subject
            .lock()
            .get_or_insert_with(|| (factory_shared.config.connector)())
            .clone();
        let subscription = subject
            .as_observable()
            .subscribe_with_context(ctx, subscriber.clone());
        Some(Box::new(move || subscription.unsubscribe()) as Teardown)
    });
    Connectable { shared, observable }
}

/// Wraps `source` as a [`Connectable`] using a plain [`publish`] subject and
/// `reset_on_disconnect: true`.
pub fn connectable<T: 'static + Send + Clone>(source: Observable<T>) -> Connectable<T> {
    connectable_with_config(source, ConnectableConfig::default())
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};

    use super::*;

    #[test]
    fn connect_subscribes_upstream_exactly_once() {
        let subscribes = Arc::new(AtomicUsize::new(0));
        let subscribes2 = subscribes.clone();
        let source: Observable<i32> = Observable::new(move |ctx, subscriber| {
            subscribes2.fetch_add(1, Ordering::SeqCst);
            subscriber.on_next(&ctx, 1);
            subscriber.on_complete(&ctx);
            None
        });
        let connectable = connectable(source);
        let _a = connectable.as_observable().subscribe(ro_core::observer_fn(
            |_c, _v: i32| {},
            |_c, _e| {},
            |_c| {},
        ));
        let _b = connectable.as_observable().subscribe(ro_core::observer_fn(
            |_c, _v: i32| {},
            |_c, _e| {},
            |_c| {},
        ));
        connectable.connect();
        connectable.connect();
        assert_eq!(subscribes.load(Ordering::SeqCst), 1);
    }
}
