use crate::context::Context;
use colored::Colorize;
use vpsflow_cloud::{ActionOutcome, ServerAction, ServerRecord};
use vpsflow_cloud_hetzner::{CreateOptions, CreateServerRequest, TerminateOutcome};

pub struct CreateArgs {
    pub service_id: String,
    pub name: String,
    pub server_type: Option<String>,
    pub location: Option<String>,
    pub image: Option<String>,
    pub backups: bool,
    pub monitoring: bool,
}

pub async fn create(ctx: &Context, args: CreateArgs) -> anyhow::Result<()> {
    let mut request = CreateServerRequest::new(&args.service_id, &args.name)
        .location(args.location.unwrap_or_else(|| ctx.config.default_location.clone()))
        .options(CreateOptions {
            enable_backups: args.backups || ctx.config.enable_backups,
            enable_monitoring: args.monitoring || ctx.config.enable_monitoring,
        });
    if let Some(server_type) = args.server_type {
        request = request.server_type(server_type);
    }
    if let Some(image) = args.image {
        request = request.image(image);
    }

    println!(
        "サーバーを作成中: {} ({}, {}, {})",
        request.name.cyan(),
        request.server_type,
        request.location,
        request.image
    );

    let provisioner = ctx.provisioner()?;
    match provisioner.create(&request).await {
        Ok(record) => {
            println!("{}", "✓ サーバーを作成しました".green().bold());
            print_record(&record, true);
            Ok(())
        }
        Err(e) => super::fail("サーバーの作成に失敗しました", &e),
    }
}

pub async fn action(ctx: &Context, service_id: &str, action: ServerAction) -> anyhow::Result<()> {
    let label = match action {
        ServerAction::PowerOff => "停止",
        ServerAction::PowerOn => "起動",
        ServerAction::Reboot => "再起動",
        ServerAction::ResetPassword => "パスワードリセット",
    };
    println!("サービス {} のサーバーを{}中...", service_id.cyan(), label);

    let provisioner = ctx.provisioner()?;
    match provisioner.perform_action(service_id, action).await {
        Ok(ActionOutcome::Done) => {
            println!("{}", format!("✓ {}しました", label).green().bold());
            Ok(())
        }
        Ok(ActionOutcome::PasswordReset { root_password }) => {
            println!("{}", "✓ rootパスワードをリセットしました".green().bold());
            println!("  新しいパスワード: {}", root_password.yellow());
            Ok(())
        }
        Err(e) => super::fail(&format!("{}に失敗しました", label), &e),
    }
}

pub async fn terminate(ctx: &Context, service_id: &str) -> anyhow::Result<()> {
    println!("サービス {} のサーバーを削除中...", service_id.cyan());

    let provisioner = ctx.provisioner()?;
    match provisioner.terminate(service_id).await {
        Ok(TerminateOutcome::AlreadyAbsent) => {
            println!("{}", "✓ サーバーは既に削除されています".green());
            Ok(())
        }
        Ok(TerminateOutcome::Deleted) => {
            println!("{}", "✓ サーバーを削除しました".green().bold());
            Ok(())
        }
        Ok(TerminateOutcome::DeletedLocally { provider_error }) => {
            println!("{}", "✓ ローカルのレコードを削除しました".green().bold());
            println!(
                "  {} {}",
                "⚠ API側の削除は失敗しました:".yellow(),
                provider_error
            );
            Ok(())
        }
        Err(e) => super::fail("サーバーの削除に失敗しました", &e),
    }
}

pub async fn details(ctx: &Context, service_id: &str, show_password: bool) -> anyhow::Result<()> {
    let provisioner = ctx.provisioner()?;
    match provisioner.server_details(service_id).await {
        Ok(record) => {
            print_record(&record, show_password);
            Ok(())
        }
        Err(e) => super::fail("サーバー情報を取得できません", &e),
    }
}

pub async fn list(ctx: &Context) -> anyhow::Result<()> {
    let records = ctx.provisioner()?.list_servers().await?;

    if records.is_empty() {
        println!("{}", "管理中のサーバーはありません".dimmed());
        return Ok(());
    }

    println!(
        "{:<16} {:<12} {:<28} {}",
        "SERVICE".bold(),
        "SERVER ID".bold(),
        "NAME".bold(),
        "IP".bold()
    );
    for record in &records {
        println!(
            "{:<16} {:<12} {:<28} {}",
            record.service_id.cyan(),
            record.provider_instance_id,
            record.name,
            record.ip_address.as_deref().unwrap_or("-")
        );
    }
    println!();
    println!("{}台", records.len());
    Ok(())
}

fn print_record(record: &ServerRecord, show_password: bool) {
    println!("  サービスID: {}", record.service_id.cyan());
    println!("  サーバーID: {}", record.provider_instance_id);
    println!("  名前:       {}", record.name);
    println!(
        "  IPアドレス: {}",
        record.ip_address.as_deref().unwrap_or("(未割り当て)")
    );
    if show_password {
        if let Some(password) = &record.initial_root_password {
            println!("  rootパスワード: {}", password.expose().yellow());
        }
    }
    println!(
        "  作成日時:   {}",
        record
            .created_at
            .with_timezone(&chrono::Local)
            .format("%Y-%m-%d %H:%M:%S")
    );
}
