//! 心跳与健康检查

mod monitor;

pub use monitor::{ComponentStatus, HealthMonitor, HealthReport};
