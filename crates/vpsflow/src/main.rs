mod commands;
mod context;

use clap::{Parser, Subcommand};
use context::Context;
use std::path::PathBuf;
use vpsflow_cloud::ServerAction;

#[derive(Parser)]
#[command(name = "vpsflow")]
#[command(about = "Hetzner Cloud の VPS をプロビジョニングする", long_about = None)]
struct Cli {
    /// 設定ファイルのパス (VPSFLOW_CONFIG_PATH 環境変数でも指定可能)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// データディレクトリ (VPSFLOW_DATA_DIR より優先)
    #[arg(long, global = true)]
    data_dir: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// APIトークンで接続できるか確認
    #[command(name = "test-connection")]
    TestConnection,
    /// サーバーを作成
    Create {
        /// サービスID
        service_id: String,
        /// サーバー名（ホスト名）
        #[arg(short, long)]
        name: String,
        /// サーバータイプ（デフォルト: cpx11）
        #[arg(short = 't', long)]
        server_type: Option<String>,
        /// ロケーション（デフォルト: 設定の default_location）
        #[arg(short, long)]
        location: Option<String>,
        /// OSイメージ（デフォルト: ubuntu-20.04）
        #[arg(short, long)]
        image: Option<String>,
        /// バックアップを有効化
        #[arg(long)]
        backups: bool,
        /// モニタリングを有効化
        #[arg(long)]
        monitoring: bool,
    },
    /// サーバーを停止（サスペンド）
    Suspend {
        /// サービスID
        service_id: String,
    },
    /// サーバーを起動（サスペンド解除）
    Resume {
        /// サービスID
        service_id: String,
    },
    /// サーバーを削除
    Terminate {
        /// サービスID
        service_id: String,
    },
    /// サーバーを再起動
    Reboot {
        /// サービスID
        service_id: String,
    },
    /// rootパスワードをリセット
    #[command(name = "reset-password")]
    ResetPassword {
        /// サービスID
        service_id: String,
    },
    /// サーバーの詳細を表示
    Details {
        /// サービスID
        service_id: String,
        /// rootパスワードも表示
        #[arg(long)]
        show_password: bool,
    },
    /// 管理中のサーバー一覧を表示
    List,
    /// カタログキャッシュを更新（cron向け: 0 */6 * * *）
    #[command(name = "update-cache")]
    UpdateCache,
    /// キャッシュの状態を表示
    #[command(name = "cache-status")]
    CacheStatus,
    /// 注文フォーム用の選択肢を表示
    Options,
    /// 設定を検証
    Validate,
    /// データディレクトリを作成
    Install,
    /// バージョン情報を表示
    Version,
}

fn init_tracing() {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn"));
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(filter)
        .init();
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_tracing();

    // Versionコマンドは設定ファイル不要
    if matches!(cli.command, Commands::Version) {
        println!("vpsflow {}", env!("CARGO_PKG_VERSION"));
        return Ok(());
    }

    let ctx = Context::load(cli.config.as_deref(), cli.data_dir)?;

    // コマンドディスパッチ
    match cli.command {
        Commands::TestConnection => commands::connection::handle(&ctx).await?,
        Commands::Create {
            service_id,
            name,
            server_type,
            location,
            image,
            backups,
            monitoring,
        } => {
            let args = commands::server::CreateArgs {
                service_id,
                name,
                server_type,
                location,
                image,
                backups,
                monitoring,
            };
            commands::server::create(&ctx, args).await?;
        }
        Commands::Suspend { service_id } => {
            commands::server::action(&ctx, &service_id, ServerAction::PowerOff).await?
        }
        Commands::Resume { service_id } => {
            commands::server::action(&ctx, &service_id, ServerAction::PowerOn).await?
        }
        Commands::Reboot { service_id } => {
            commands::server::action(&ctx, &service_id, ServerAction::Reboot).await?
        }
        Commands::ResetPassword { service_id } => {
            commands::server::action(&ctx, &service_id, ServerAction::ResetPassword).await?
        }
        Commands::Terminate { service_id } => {
            commands::server::terminate(&ctx, &service_id).await?
        }
        Commands::Details {
            service_id,
            show_password,
        } => commands::server::details(&ctx, &service_id, show_password).await?,
        Commands::List => commands::server::list(&ctx).await?,
        Commands::UpdateCache => commands::cache::update(&ctx).await?,
        Commands::CacheStatus => commands::cache::status(&ctx).await?,
        Commands::Options => commands::options::handle(&ctx).await?,
        Commands::Validate => commands::validate::handle(&ctx)?,
        Commands::Install => commands::install::handle(&ctx)?,
        Commands::Version => {
            unreachable!("Version is handled before config loading");
        }
    }

    Ok(())
}
