//! ShortVault - the persistence core of a URL shortener
//!
//! Short link records live in one of several interchangeable backends while
//! per-process read caches stay coherent through an invalidation bus.
//!
//! # Features
//! - **cli**: Command-line interface (default)
//!
//! # Architecture
//! - `storage`: Record / stats store contracts and backends (file, database, redis, memory)
//! - `cache`: Local cache and the bus-coherent shared cache
//! - `bus`: Invalidation bus (redis pub/sub, in-process)
//! - `expiration`: Expiration sweeper for backends without native TTL
//! - `health`: Heartbeat probes for every configured backend
//! - `services`: Link service (create / resolve / delete / stats)
//! - `runtime`: Component wiring, background tasks and shutdown
//! - `config`: Configuration management

pub mod bus;
pub mod cache;
#[cfg(feature = "cli")]
pub mod cli;
pub mod config;
pub mod errors;
pub mod expiration;
pub mod health;
#[cfg(feature = "cli")]
pub mod interfaces;
pub mod runtime;
pub mod services;
pub mod storage;
pub mod system;
pub mod utils;
