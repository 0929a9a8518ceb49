use clap::Parser;
use tracing::debug;

use shortvault::cli::{Cli, Commands};
use shortvault::config::init_config;
use shortvault::runtime::modes;
use shortvault::system::init_logging;

fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    let cli = Cli::parse();
    let config = init_config(cli.config.as_deref());

    // guard 必须存活到进程结束，否则文件日志会丢失
    let _log_guard = init_logging(&config.logging)?;
    debug!("Backends: {:?}", config.backends);

    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()?;

    runtime.block_on(async {
        match cli.command.unwrap_or(Commands::Serve) {
            Commands::Serve => modes::run_serve(&config).await,
            cmd => {
                if let Err(e) = modes::run_cli(cmd, &config).await {
                    eprintln!("{}", e.format_colored());
                    std::process::exit(1);
                }
                Ok(())
            }
        }
    })
}
