#![warn(clippy::pedantic)]
#![doc = include_str!("../README.md")]

//! `ro-core` is the notification-delivery runtime backing the `ro` reactive
//! streams library: [`Context`], [`Subscription`], the [`Observer`]
//! contract, [`Subscriber`] and the process-wide hooks and error taxonomy
//! that every higher-level `ro` crate builds on.
//!
//! Nothing in this crate is specific to any one operator family; it exists
//! to fix the handful of invariants every operator must preserve
//! (termination finality, at-most-one terminal notification, guaranteed
//! teardown, safe late subscription).

pub mod context;
pub mod error;
pub mod hooks;
pub mod notification;
pub mod observer;
pub mod subscriber;
pub mod subscription;

pub use context::Context;
pub use error::{relay_error, share_error, BoxError, RoError, SharedError};
pub use notification::Notification;
pub use observer::{observer_fn, FnObserver, Observer};
pub use subscriber::{Backpressure, Subscriber, SubscriberMode};
pub use subscription::{Subscription, Teardown};
