#![warn(clippy::pedantic)]
#![doc = include_str!("../README.md")]

mod collect;
mod connectable;
mod context_ops;
mod observable;
mod share;
mod subject;
mod util;

pub mod operators;
pub mod pipe;

pub use collect::{collect, collect_with_context};
pub use context_ops::{
    context_map, context_reset, context_with_deadline, context_with_timeout, context_with_value,
    throw_on_context_cancel,
};
pub use connectable::{connectable, connectable_with_config, Connectable, ConnectableConfig};
pub use observable::Observable;
pub use operators::{
    empty, filter, just, map, of, on_error_resume_next_with, on_error_return, reduce, retry,
    retry_with_config, scan, skip, sum, take, tap, throw, ObservableExt, RetryConfig, SumExt,
};
pub use pipe::{pipe_dyn, DynStage};
pub use share::{share, share_replay, share_replay_with_config, share_with_config, Share,
    ShareConfig, ShareReplayConfig};
pub use subject::{
    async_subject, behavior, publish, replay, unicast, Subject, REPLAY_SUBJECT_UNLIMITED_BUFFER_SIZE,
    UNICAST_SUBJECT_UNLIMITED_BUFFER_SIZE,
};

pub use ro_core::{
    observer_fn, relay_error, share_error, Backpressure, BoxError, Context, FnObserver,
    Notification, Observer, RoError, SharedError, Subscriber, SubscriberMode, Subscription,
    Teardown,
};
