//! 过期扫描：只对没有原生 TTL 的后端运行

mod sweeper;

pub use sweeper::{ExpirationSweeper, SweepReport};
