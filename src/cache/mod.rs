//! 记录缓存：进程内缓存与通过失效总线保持一致的共享缓存

mod local;
pub mod message;
mod shared;
mod traits;

pub use local::LocalCache;
pub use message::{InvalidationMessage, InvalidationOp};
pub use shared::SharedCache;
pub use traits::{CacheResult, RecordCache};
