//! 短链接命令：create / get / delete / stats

use colored::Colorize;

use crate::interfaces::cli::CliError;
use crate::runtime::StartupContext;
use crate::services::CreateLinkRequest;

pub async fn create_link(
    ctx: &StartupContext,
    target_url: String,
    alias: Option<String>,
    expire_after: i64,
) -> Result<(), CliError> {
    let result = ctx
        .link_service
        .create(CreateLinkRequest {
            target_url,
            preferred_alias: alias,
            expire_after_seconds: expire_after,
        })
        .await?;

    let record = &result.record;
    if result.generated_id {
        println!(
            "{} Generated short code: {}",
            "ℹ".bold().blue(),
            record.id.magenta()
        );
    }
    println!(
        "{} Created short link: {} -> {}",
        "✓".bold().green(),
        record.id.cyan(),
        record.target_url.blue().underline()
    );
    if let Some(expires_at) = record.expires_at {
        println!(
            "  {} {}",
            "Expires at:".dimmed(),
            expires_at.format("%Y-%m-%d %H:%M:%S UTC").to_string().yellow()
        );
    }
    println!("  {} {}", "Secret:".dimmed(), record.secret.yellow());
    Ok(())
}

pub async fn get_link(ctx: &StartupContext, id: &str) -> Result<(), CliError> {
    let record = ctx.link_service.resolve(id).await?;
    println!(
        "{} -> {}",
        record.id.cyan(),
        record.target_url.blue().underline()
    );
    match record.expires_at {
        Some(expires_at) => println!(
            "  {} {}",
            "Expires at:".dimmed(),
            expires_at.format("%Y-%m-%d %H:%M:%S UTC").to_string().yellow()
        ),
        None => println!("  {}", "Permanent".dimmed()),
    }
    Ok(())
}

pub async fn delete_link(ctx: &StartupContext, id: &str, secret: &str) -> Result<(), CliError> {
    ctx.link_service.delete(id, secret).await?;
    println!("{} Deleted short link: {}", "✓".bold().green(), id.cyan());
    Ok(())
}

pub async fn show_stats(ctx: &StartupContext, id: &str) -> Result<(), CliError> {
    if ctx.stats.is_none() {
        println!(
            "{} Stats backend is disabled, counters are always zero",
            "⚠".bold().yellow()
        );
    }
    let stats = ctx.link_service.stats(id).await?;
    println!("{} {}", "Stats for".bold(), id.cyan());
    println!("  {} {}", "Total: ".dimmed(), stats.total.to_string().green());
    println!("  {} {}", "Recent:".dimmed(), stats.recent.to_string().green());
    Ok(())
}
