use clap::Parser;
use colored::Colorize;
use rigger_aws::{EcrRegistry, SsmSecretStore, load_sdk_config};
use rigger_build::{BuildError, BuildRequest, DockerRuntime, Pipeline, PipelineError};
use std::process::ExitCode;

#[derive(Parser)]
#[command(name = "rigger", version)]
#[command(
    about = "git リポジトリからイメージをビルドして ECR にプッシュする",
    long_about = None
)]
struct Cli {
    /// ソースリポジトリ (例: github.com/org/app.git, github.com/org/mono.git#main:docker/app)
    #[arg(short = 'r', long = "repo", env = "RIGGER_REPO")]
    repo: String,

    /// イメージ名（省略時はリポジトリ名 / ブランチ名 / サブディレクトリ名から導出）
    #[arg(short = 'n', long, env = "RIGGER_IMAGE_NAME")]
    name: Option<String>,

    /// リポジトリの認証情報を格納した SSM パラメータ名（公開リポジトリなら不要）
    #[arg(short = 'c', long = "credentials-key", env = "RIGGER_CREDENTIALS_KEY")]
    credentials_key: Option<String>,

    /// AWS リージョン
    #[arg(long, env = "RIGGER_REGION")]
    region: Option<String>,

    /// 認証トークンを発行するレジストリ ID（省略時はアカウントのデフォルト）
    #[arg(long, env = "RIGGER_REGISTRY_ID")]
    registry_id: Option<String>,

    /// デバッグログを出力
    #[arg(short, long)]
    verbose: bool,
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    // ログは stderr に出力
    let default_level = if cli.verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(default_level)),
        )
        .init();

    tracing::debug!("rigger {}", env!("CARGO_PKG_VERSION"));

    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("{} {}", "✗".red(), user_message(&e));
            ExitCode::FAILURE
        }
    }
}

async fn run(cli: Cli) -> anyhow::Result<()> {
    // ネットワークに触れる前に参照を検証
    let request = BuildRequest::new(&cli.repo, cli.name)?
        .with_credentials_key(cli.credentials_key)
        .with_registry_id(cli.registry_id);

    let runtime = DockerRuntime::connect()?;
    let sdk_config = load_sdk_config(cli.region).await;
    let registry = EcrRegistry::new(&sdk_config);
    let secrets = SsmSecretStore::new(&sdk_config);

    println!("{} {}", "→".blue(), request.source.display_url().cyan());

    let outcome = Pipeline::new(&registry, &secrets, &runtime)
        .run(&request)
        .await?;

    println!(
        "{} {} (repository {})",
        "✓".green(),
        outcome.push.reference.cyan(),
        outcome.repository
    );
    let skipped = outcome.image.skipped_records + outcome.push.skipped_records;
    if skipped > 0 {
        println!(
            "  {} 読めなかった進捗レコードが {} 件あります（結果が不完全な可能性）",
            "!".yellow(),
            skipped
        );
    }
    for tag in &outcome.push.tags {
        println!(
            "  {} {} {} ({} bytes)",
            tag.tag.bold(),
            "→".dimmed(),
            tag.digest,
            tag.size
        );
    }

    Ok(())
}

fn user_message(err: &anyhow::Error) -> String {
    if let Some(e) = err.downcast_ref::<PipelineError>() {
        return format!("[{}] {}", e.stage, e.source.user_message());
    }
    if let Some(e) = err.downcast_ref::<BuildError>() {
        return e.user_message();
    }
    format!("{:#}", err)
}
