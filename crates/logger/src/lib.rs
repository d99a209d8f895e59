//! Shared tracing setup for checkwatch binaries.

mod subscriber;

pub use subscriber::{InitError, LogFormat, init, try_init_with_level};
