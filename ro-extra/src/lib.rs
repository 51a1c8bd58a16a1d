#![warn(clippy::pedantic)]
#![doc = include_str!("../README.md")]

mod buffer;
mod sample_throttle;
mod time;
mod window;

pub use buffer::{buffer_count, buffer_time, buffer_time_or_count, buffer_when};
pub use sample_throttle::{sample_when, throttle_time, throttle_when};
pub use time::{delay, interval, interval_with_initial, timeout, timer};
pub use window::window_when;
