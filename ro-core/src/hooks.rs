//! Process-wide, atomically-replaceable hooks (spec §6).
//!
//! Both hooks default to silent. Call [`install_default_logging_hooks`]
//! (requires the `default-hooks` feature) before starting any pipelines to
//! route them through the `log` facade instead.

use std::{
    any::Any,
    sync::{Arc, OnceLock},
};

use parking_lot::RwLock;

use crate::{context::Context, error::BoxError};

/// A notification reported as dropped: produced after the observer is
/// closed, including replay-buffer evictions and `EventuallySafe`/`Drop`
/// backpressure discards. The `Next` payload is type-erased because this
/// hook is a single process-wide entry point shared by every `Observable<T>`
/// regardless of `T`.
#[non_exhaustive]
pub enum DroppedNotification<'a> {
    /// A dropped `Next` value.
    Next(&'a (dyn Any + Send)),
    /// A dropped `Error` notification.
    Error(&'a BoxError),
    /// A dropped `Complete` notification.
    Complete,
}

type UnhandledErrorFn = dyn Fn(&Context, &BoxError) + Send + Sync;
type DroppedNotificationFn = dyn for<'a> Fn(&Context, DroppedNotification<'a>) + Send + Sync;

fn unhandled_error_hook() -> &'static RwLock<Arc<UnhandledErrorFn>> {
    static HOOK: OnceLock<RwLock<Arc<UnhandledErrorFn>>> = OnceLock::new();
    HOOK.get_or_init(|| RwLock::new(Arc::new(|_ctx, _err| {})))
}

fn dropped_notification_hook() -> &'static RwLock<Arc<DroppedNotificationFn>> {
    static HOOK: OnceLock<RwLock<Arc<DroppedNotificationFn>>> = OnceLock::new();
    HOOK.get_or_init(|| RwLock::new(Arc::new(|_ctx, _notification| {})))
}

/// Replaces the process-wide `onUnhandledError` hook. Fires when an
/// observer terminates by panic in `on_error`/`on_complete`, or a teardown
/// panic chain has no other catcher.
pub fn set_on_unhandled_error(hook: impl Fn(&Context, &BoxError) + Send + Sync + 'static) {
    *unhandled_error_hook().write() = Arc::new(hook);
}

/// Replaces the process-wide `onDroppedNotification` hook.
pub fn set_on_dropped_notification(
    hook: impl for<'a> Fn(&Context, DroppedNotification<'a>) + Send + Sync + 'static,
) {
    *dropped_notification_hook().write() = Arc::new(hook);
}

/// Invokes the current `onUnhandledError` hook.
pub fn on_unhandled_error(ctx: &Context, err: &BoxError) {
    let hook = unhandled_error_hook().read().clone();
    hook(ctx, err);
}

/// Invokes the current `onDroppedNotification` hook.
pub fn on_dropped_notification(ctx: &Context, notification: DroppedNotification<'_>) {
    let hook = dropped_notification_hook().read().clone();
    hook(ctx, notification);
}

/// Installs hooks that log unhandled errors and dropped notifications via
/// the `log` facade, matching the "DefaultOn…" variants from spec §6.
/// Setup must happen before starting pipelines: the hooks are snapshotted
/// per call, not watched live.
#[cfg(feature = "default-hooks")]
pub fn install_default_logging_hooks() {
    set_on_unhandled_error(|ctx, err| {
        log::error!("ro: unhandled error (context cancelled: {}): {err}", ctx.is_cancelled());
    });
    set_on_dropped_notification(|_ctx, notification| match notification {
        DroppedNotification::Next(_) => log::warn!("ro: dropped Next notification"),
        DroppedNotification::Error(err) => log::warn!("ro: dropped Error notification: {err}"),
        DroppedNotification::Complete => log::warn!("ro: dropped Complete notification"),
    });
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};

    use super::*;

    #[test]
    fn custom_hooks_receive_what_is_reported() {
        static UNHANDLED: AtomicUsize = AtomicUsize::new(0);
        static DROPPED: AtomicUsize = AtomicUsize::new(0);
        set_on_unhandled_error(|_ctx, _err| {
            UNHANDLED.fetch_add(1, Ordering::SeqCst);
        });
        set_on_dropped_notification(|_ctx, _notification| {
            DROPPED.fetch_add(1, Ordering::SeqCst);
        });
        let ctx = Context::background();
        on_unhandled_error(&ctx, &crate::error::RoError::Observable("boom".into()).boxed());
        on_dropped_notification(&ctx, DroppedNotification::Complete);
        assert_eq!(UNHANDLED.load(Ordering::SeqCst), 1);
        assert_eq!(DROPPED.load(Ordering::SeqCst), 1);
        // Leave the process-wide hooks silent again for any test run after
        // this one in the same binary.
        set_on_unhandled_error(|_ctx, _err| {});
        set_on_dropped_notification(|_ctx, _notification| {});
    }

    #[cfg(feature = "default-hooks")]
    #[test]
    fn default_logging_hooks_do_not_panic() {
        let _ = env_logger::builder().is_test(true).try_init();
        install_default_logging_hooks();
        let ctx = Context::background();
        on_unhandled_error(&ctx, &crate::error::RoError::Observable("boom".into()).boxed());
        on_dropped_notification(&ctx, DroppedNotification::Next(&42i32));
        on_dropped_notification(&ctx, DroppedNotification::Complete);
        set_on_unhandled_error(|_ctx, _err| {});
        set_on_dropped_notification(|_ctx, _notification| {});
    }
}
