//! 命令行子命令模块

pub mod config_management;
pub mod link_management;
pub mod maintenance;

pub use config_management::{generate_config, show_config};
pub use link_management::{create_link, delete_link, get_link, show_stats};
pub use maintenance::{run_health, run_sweep};
