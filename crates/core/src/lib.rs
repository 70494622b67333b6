#![forbid(unsafe_code)]

pub mod adaptive;
pub mod error;
pub mod model;
pub mod time;

pub use adaptive::{AdaptiveState, Difficulty};
pub use error::Error;
pub use time::Clock;
