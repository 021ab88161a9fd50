//! Shared tracing setup for the openping binaries.

mod subscriber;

pub use subscriber::{init_tracing, init_tracing_with, parse_level};
