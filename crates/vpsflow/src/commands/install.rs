use crate::context::Context;
use colored::Colorize;

/// データディレクトリを作成する（既にあれば何もしない）
pub fn handle(ctx: &Context) -> anyhow::Result<()> {
    println!(
        "データディレクトリ: {}",
        ctx.layout.root().display().to_string().cyan()
    );

    let report = ctx.layout.install()?;
    for dir in &report.created {
        println!("  {} {}", "✓ 作成:".green(), dir.display());
    }
    for dir in &report.existing {
        println!("  {} {}", "- 既存:".dimmed(), dir.display());
    }

    println!();
    println!("{}", "✓ インストールが完了しました".green().bold());
    println!();
    println!("{}", "キャッシュの定期更新 (crontab):".bold());
    println!("  0 */6 * * * vpsflow update-cache");
    Ok(())
}
