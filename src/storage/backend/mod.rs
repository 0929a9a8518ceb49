//! 记录存储后端
//!
//! - `file`：单文件 JSON 存储，依赖过期扫描
//! - `database`：SeaORM（SQLite / MySQL / PostgreSQL），依赖过期扫描
//! - `redis`：原生 TTL，同时实现统计计数
//! - `memory`：进程内 moka 缓存，原生 TTL，同时实现统计计数

pub mod database;
pub mod file;
pub mod memory;
mod redis;

pub use self::database::DatabaseStore;
pub use self::file::FileStore;
pub use self::memory::{MemoryStats, MemoryStore};
pub use self::redis::RedisStore;

/// 统计中“最近访问”窗口长度
pub const RECENT_WINDOW_SECS: u64 = 3600;
