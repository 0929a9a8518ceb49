//! 进程生命周期：组件装配、后台任务与优雅关闭

pub mod lifetime;
pub mod modes;

pub use lifetime::shutdown::{listen_for_shutdown, shutdown};
pub use lifetime::startup::{BackgroundTasks, StartupContext, build_context, prepare_startup};
