use crate::context::Context;
use colored::Colorize;

pub async fn handle(ctx: &Context) -> anyhow::Result<()> {
    println!("{}", "Hetzner Cloud API への接続を確認中...".blue());

    let catalog = ctx.catalog()?;
    match catalog.test_connection().await {
        Ok(()) => {
            println!("{}", "✓ 接続に成功しました".green().bold());
            Ok(())
        }
        Err(e) => super::fail("接続に失敗しました", &e),
    }
}
