/// ローカル開発用API Gatewayブリッジ
///
/// マウントプレフィックス配下のHTTPリクエストをハンドラー呼び出しに変換し、
/// ハンドラーの結果をそのままHTTPレスポンスとして返す。
/// このバイナリはリクエスト内容をJSONで返すEchoHandlerを呼び出し対象とする。
/// 任意のハンドラーを使う場合はライブラリの`serve`に`InvocationHandler`を渡す。
///
/// # 環境変数
/// - PORT: リッスンポート（デフォルト: 8080）
/// - BIND_HOST: リッスンアドレス（デフォルト: 0.0.0.0）
/// - MOUNT_PREFIX: マウントプレフィックス（デフォルト: /cgm-api）
/// - INVOCATION_TIMEOUT_MS: 呼び出しタイムアウト（デフォルト: 29000）
/// - RUST_LOG: ログレベル（デフォルト: info）
///
/// # ローカル実行
/// ```bash
/// cargo run --bin local-gateway
///
/// # ポートとプレフィックスを指定
/// cargo run --bin local-gateway -- --port 3001 --mount-prefix /api
///
/// curl -i http://localhost:8080/cgm-api/users/42?active=true
/// ```
use std::net::IpAddr;
use std::process::ExitCode;
use std::sync::Arc;
use std::time::Duration;

use clap::Parser;
use local_gateway::application::EchoHandler;
use local_gateway::domain::MountPrefix;
use local_gateway::infrastructure::{init_logging, serve, BridgeConfig};
use tracing::error;

/// コマンドライン引数
///
/// いずれも環境変数より優先される。
#[derive(Parser, Debug)]
#[command(name = "local-gateway")]
#[command(about = "サーバーレス関数ハンドラーをローカルHTTPサーバーとして公開する")]
struct CliArgs {
    /// リッスンポート
    #[arg(long, short = 'p')]
    port: Option<u16>,

    /// リッスンアドレス
    #[arg(long)]
    host: Option<IpAddr>,

    /// マウントプレフィックス（例: /cgm-api）
    #[arg(long, short = 'm')]
    mount_prefix: Option<MountPrefix>,

    /// 呼び出しタイムアウト（ミリ秒）
    #[arg(long)]
    timeout_ms: Option<u64>,
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> ExitCode {
    init_logging();

    let args = CliArgs::parse();

    let mut config = match BridgeConfig::from_env() {
        Ok(config) => config,
        Err(e) => {
            error!(error = %e, "設定の読み込みに失敗しました");
            return ExitCode::FAILURE;
        }
    };

    if let Some(port) = args.port {
        config = config.with_port(port);
    }
    if let Some(host) = args.host {
        config = config.with_host(host);
    }
    if let Some(mount_prefix) = args.mount_prefix {
        config = config.with_mount_prefix(mount_prefix);
    }
    if let Some(timeout_ms) = args.timeout_ms {
        config = config.with_invocation_timeout(Duration::from_millis(timeout_ms));
    }

    match serve(&config, Arc::new(EchoHandler)).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!(error = %e, "サーバーの起動または実行に失敗しました");
            ExitCode::FAILURE
        }
    }
}
