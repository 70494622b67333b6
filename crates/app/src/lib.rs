#![forbid(unsafe_code)]

pub mod config;
pub mod error;
pub mod extract;
pub mod routes;
pub mod seed;
pub mod telemetry;

pub use error::ApiError;
pub use routes::router;
