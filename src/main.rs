use clap::Parser;
use std::process::ExitCode;
use tracing_subscriber::EnvFilter;
use vision_assistant::{build_clients, cli, config, error, interactive, WorkflowController};
use cli::{Cli, Commands};
use config::{ClientMode, Config, MockKind};
use error::Result;

fn init_tracing(verbose: bool) {
    let default = if verbose { "vision_assistant=debug,info" } else { "warn" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}

/// コマンドライン指定で設定を上書きする（保存はしない）
fn with_overrides(
    mut config: Config,
    mock: bool,
    mock_kind: Option<MockKind>,
    endpoint: Option<String>,
) -> Result<Config> {
    if mock {
        config.client = ClientMode::Mock;
    }
    if let Some(kind) = mock_kind {
        config.mock_kind = kind;
    }
    if let Some(url) = endpoint {
        Config::check_endpoint(&url)?;
        config.endpoint_url = url;
    }
    Ok(config)
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    match run(cli).await {
        Ok(code) => code,
        Err(e) => {
            eprintln!("❌ {}", e);
            ExitCode::FAILURE
        }
    }
}

async fn run(cli: Cli) -> Result<ExitCode> {
    let config = Config::load()?;

    match cli.command {
        Commands::Analyze { file, chat, json } => {
            let config = with_overrides(config, cli.mock, cli.mock_kind, cli.endpoint)?;
            // --json のときは標準出力をJSONだけにする
            if !json {
                println!("🔍 vision-assistant - 画像解析\n");
            }

            let mut wf = WorkflowController::new(build_clients(&config)?);
            match wf.select_path(&file) {
                Ok(selected) if !json => println!(
                    "✔ {} ({} • {})\n",
                    selected.name(),
                    selected.size_label(),
                    selected.mime_type()
                ),
                Ok(_) => {}
                Err(e) => {
                    println!("❌ {}", e);
                    return Ok(ExitCode::FAILURE);
                }
            }

            let succeeded = match interactive::run_analysis(&mut wf, json).await {
                Ok(succeeded) => succeeded,
                Err(e) => {
                    println!("❌ {}", interactive::error_message(&wf, &e));
                    return Ok(ExitCode::FAILURE);
                }
            };

            if chat {
                println!();
                interactive::run_chat_loop(&mut wf).await?;
            } else if !succeeded {
                return Ok(ExitCode::FAILURE);
            }
        }

        Commands::Probe { file } => {
            let config = with_overrides(config, cli.mock, cli.mock_kind, cli.endpoint)?;
            println!("🔌 vision-assistant - 接続確認\n");

            let mut wf = WorkflowController::new(build_clients(&config)?);
            if let Err(e) = wf.select_path(&file) {
                println!("❌ {}", e);
                return Ok(ExitCode::FAILURE);
            }

            if let Err(e) = interactive::run_probe(&wf).await {
                println!("❌ {}", interactive::error_message(&wf, &e));
                return Ok(ExitCode::FAILURE);
            }
        }

        Commands::Config { set_endpoint, set_client, show } => {
            let mut config = config;

            if let Some(url) = set_endpoint {
                config.set_endpoint(url)?;
                println!("✔ エンドポイントを設定しました");
            }

            if let Some(client) = set_client {
                config.set_client(client)?;
                println!("✔ クライアント種別を設定しました");
            }

            if show {
                println!("設定:");
                println!("  エンドポイント: {}", config.endpoint_url);
                println!("  クライアント: {:?}", config.client);
                println!("  モック応答: {:?}", config.mock_kind);
                println!("  タイムアウト: {}秒", config.timeout_seconds);
                println!("  再試行回数: {}", config.max_retries);
                if let Ok(path) = Config::config_path() {
                    println!("  設定ファイル: {}", path.display());
                }
            }
        }
    }

    Ok(ExitCode::SUCCESS)
}
