#![warn(clippy::pedantic)]
#![doc = include_str!("../README.md")]

mod scheduling;

pub use scheduling::{observe_on, subscribe_on, ObservableScheduleExt};
