//! Service layer
//!
//! Request-level orchestration that an HTTP or CLI front end calls into.

mod link_service;

pub use link_service::*;
