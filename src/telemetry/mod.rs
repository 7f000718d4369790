//! Telemetry
//!
//! Logging support for OAuth operations. Events are emitted through
//! `tracing`; this module only decides what may be logged.

pub mod logging;

pub use logging::{TokenLogFilter, MASK, TOKEN_FILTER_ENV};
