use crate::context::Context;
use colored::Colorize;

pub fn handle(ctx: &Context) -> anyhow::Result<()> {
    println!("{}", "設定を検証中...".blue());

    let problems = ctx.config.problems();
    if problems.is_empty() {
        println!("{}", "✓ 設定は正常です！".green().bold());
        println!();
        println!("サマリー:");
        println!("  ロケーション: {}", ctx.config.default_location.cyan());
        println!("  バックアップ: {}", on_off(ctx.config.enable_backups));
        println!("  モニタリング: {}", on_off(ctx.config.enable_monitoring));
        println!("  キャッシュTTL: {}秒", ctx.config.cache_ttl_secs);
        println!(
            "  データディレクトリ: {}",
            ctx.layout.root().display().to_string().cyan()
        );
        return Ok(());
    }

    eprintln!();
    eprintln!("{}", "✗ 設定エラー".red().bold());
    for problem in &problems {
        eprintln!("  - {}", problem);
    }
    std::process::exit(1);
}

fn on_off(enabled: bool) -> &'static str {
    if enabled { "有効" } else { "無効" }
}
