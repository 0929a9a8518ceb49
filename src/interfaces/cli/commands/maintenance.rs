//! 维护命令：单次过期清理与健康检查

use colored::Colorize;

use crate::expiration::ExpirationSweeper;
use crate::interfaces::cli::CliError;
use crate::runtime::StartupContext;

pub async fn run_sweep(ctx: &StartupContext, dry_run: bool) -> Result<(), CliError> {
    if ctx.store.supports_native_ttl() {
        println!(
            "{} Backend {} expires records natively, nothing to sweep",
            "ℹ".bold().blue(),
            ctx.store.backend_name().cyan()
        );
        return Ok(());
    }

    let mut expiration = ctx.config.expiration.clone();
    expiration.dry_run |= dry_run;
    let sweeper = ExpirationSweeper::new(ctx.store.clone(), ctx.stats.clone(), &expiration);
    let report = sweeper.sweep_once().await?;

    if sweeper.is_dry_run() {
        println!(
            "{} {} expired link(s) would be deleted",
            "ℹ".bold().blue(),
            report.expired_found.to_string().yellow()
        );
        for id in &report.dry_run_candidates {
            println!("  {}", id.cyan());
        }
    } else {
        println!(
            "{} Deleted {} of {} expired link(s)",
            "✓".bold().green(),
            report.deleted.to_string().green(),
            report.expired_found
        );
        if report.failed > 0 {
            println!(
                "{} {} deletion(s) failed, see logs",
                "⚠".bold().yellow(),
                report.failed
            );
        }
    }
    Ok(())
}

pub async fn run_health(ctx: &StartupContext, json: bool) -> Result<(), CliError> {
    let report = ctx.health.check_health().await;

    if json {
        let output = serde_json::to_string_pretty(&report)
            .map_err(|e| CliError::CommandError(format!("Failed to serialize report: {}", e)))?;
        println!("{}", output);
    } else {
        for (name, status) in &report.components {
            let mark = if status.healthy {
                "✓".bold().green()
            } else {
                "✗".bold().red()
            };
            print!(
                "{} {:<6} {} ({} ms)",
                mark,
                name,
                status.backend.cyan(),
                status.latency_ms
            );
            match &status.error {
                Some(err) => println!(" {}", err.red()),
                None => println!(),
            }
        }
    }

    if report.healthy {
        Ok(())
    } else {
        Err(CliError::CommandError(
            "One or more backends are unhealthy".to_string(),
        ))
    }
}
