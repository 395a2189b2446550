use crate::context::Context;
use colored::Colorize;
use vpsflow_cloud_hetzner::{CacheState, CatalogService, RefreshOutcome};

/// キャッシュを破棄してAPIから再取得する
pub async fn update(ctx: &Context) -> anyhow::Result<()> {
    println!("{}", "カタログキャッシュを更新中...".blue());
    if let Some(credential) = ctx.config.credential() {
        println!("  APIトークン: {}", credential.preview().dimmed());
    }

    let catalog = ctx.catalog()?;
    let report = match catalog.refresh().await {
        Ok(report) => report,
        Err(e) => super::fail("キャッシュを更新できません", &e),
    };

    for (key, outcome) in report.outcomes() {
        match outcome {
            RefreshOutcome::Refreshed { count } => {
                println!("  {} {}: {}件", "✓".green(), key, count)
            }
            RefreshOutcome::Fallback { reason } => {
                println!("  {} {}: 更新できませんでした ({})", "⚠".yellow(), key, reason)
            }
        }
    }

    println!();
    print_status(&catalog).await;
    Ok(())
}

pub async fn status(ctx: &Context) -> anyhow::Result<()> {
    let catalog = ctx.catalog()?;
    print_status(&catalog).await;
    Ok(())
}

async fn print_status(catalog: &CatalogService) {
    println!("{}", "キャッシュ状態:".bold());
    for status in catalog.status().await {
        match status.state {
            CacheState::Cached { items, expires_at } => println!(
                "  {}: {}件 (有効期限: {})",
                status.key.cyan(),
                items,
                expires_at
                    .with_timezone(&chrono::Local)
                    .format("%Y-%m-%d %H:%M:%S")
            ),
            CacheState::Expired { items, .. } => println!(
                "  {}: {}件 ({})",
                status.key.cyan(),
                items,
                "期限切れ".yellow()
            ),
            CacheState::NotCached => {
                println!("  {}: {}", status.key.cyan(), "未キャッシュ".dimmed())
            }
        }
    }
}
