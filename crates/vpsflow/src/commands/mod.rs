pub mod cache;
pub mod connection;
pub mod install;
pub mod options;
pub mod server;
pub mod validate;

use colored::Colorize;
use vpsflow_cloud::CloudError;

/// エラーを表示して終了する
pub(crate) fn fail(title: &str, err: &CloudError) -> ! {
    eprintln!();
    eprintln!("{}", format!("✗ {}", title).red().bold());
    eprintln!("  {}", err);
    if err.is_auth() {
        eprintln!();
        eprintln!(
            "{}",
            "ヒント: HCLOUD_TOKEN 環境変数または設定ファイルの api_token を確認してください"
                .yellow()
        );
    }
    std::process::exit(1);
}
