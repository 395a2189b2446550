use crate::context::Context;
use colored::Colorize;

/// サーバータイプ・ロケーション・イメージの選択肢を表示
pub async fn handle(ctx: &Context) -> anyhow::Result<()> {
    if !ctx.has_credential() {
        println!(
            "{}",
            "APIトークンが未設定のため、組み込みの一覧を表示します".yellow()
        );
        println!();
    }

    let options = ctx.catalog()?.config_options().await;
    for option in options.iter() {
        println!("{} ({})", option.friendly_name.bold(), option.name.cyan());
        for choice in &option.choices {
            println!("  {}", choice);
        }
        println!();
    }
    Ok(())
}
