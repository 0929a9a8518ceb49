//! System-level modules
//!
//! Currently only the tracing/logging bootstrap lives here.

pub mod logging;

pub use logging::init_logging;
