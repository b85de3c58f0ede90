//! HTTP Front Door
//!
//! リッスンソケットを所有し、ワイヤー上のHTTPリクエストを`InboundRequest`に変換して
//! Invocation Adapterへ委譲する。Adapterから返された (ステータス, ヘッダー, ボディ) を
//! デフォルトヘッダーの追加やステータス変換なしでそのまま書き戻す。
//!
//! ルーティング:
//! - `{prefix}`, `{prefix}/`, `{prefix}/{*rest}`: 全メソッドをAdapterへ委譲
//! - それ以外: 404 (JSON)

use std::collections::hash_map::Entry;
use std::collections::HashMap;
use std::future::Future;
use std::net::SocketAddr;
use std::sync::Arc;

use axum::{
    body::{Body, Bytes},
    extract::{DefaultBodyLimit, State},
    http::{HeaderMap, HeaderName, HeaderValue, Method, StatusCode, Uri},
    response::{IntoResponse, Response},
    routing::any,
    Router,
};
use thiserror::Error;
use tokio::net::TcpListener;
use tokio::signal;
use tower_http::trace::TraceLayer;
use tracing::{error, info, warn};

use super::config::BridgeConfig;
use super::error::ApiError;
use crate::application::{InvocationAdapter, InvocationHandler};
use crate::domain::{parse_query, InboundRequest, InvocationResult, MountPrefix};

/// サーバー起動・実行のエラー型
#[derive(Debug, Error)]
pub enum ServeError {
    /// 設定されたアドレスにバインドできない（起動時の致命的エラー、リトライしない）
    #[error("アドレスのバインドに失敗しました: {addr}: {source}")]
    Bind {
        addr: SocketAddr,
        #[source]
        source: std::io::Error,
    },

    /// サーバーの実行中にI/Oエラーが発生した
    #[error("サーバーの実行に失敗しました: {0}")]
    Serve(#[source] std::io::Error),
}

/// ルーターを構築する
///
/// マウントプレフィックス配下のルートファミリーだけを登録し、全メソッドを受け付ける。
/// ボディはJSONとして解析せず生のバイト列のまま受け取るため、サイズ上限も設けない。
/// TraceLayerによりリクエスト/レスポンスの構造化ログを自動記録する。
///
/// # Arguments
/// * `mount_prefix` - マウントプレフィックス
/// * `adapter` - リクエストを委譲するInvocation Adapter
pub fn create_router(mount_prefix: &MountPrefix, adapter: InvocationAdapter) -> Router {
    let base = mount_prefix.to_string();

    Router::new()
        .route(&base, any(invoke))
        // `{*rest}`は空セグメントにマッチしないため末尾スラッシュを別途登録する
        .route(&format!("{base}/"), any(invoke))
        .route(&format!("{base}/{{*rest}}"), any(invoke))
        .fallback(route_not_found)
        .layer(DefaultBodyLimit::disable())
        .layer(TraceLayer::new_for_http())
        .with_state(adapter)
}

/// マウントプレフィックス配下の全リクエストを処理する
async fn invoke(
    State(adapter): State<InvocationAdapter>,
    method: Method,
    uri: Uri,
    headers: HeaderMap,
    body: Bytes,
) -> Response {
    let request = InboundRequest {
        method: method.as_str().to_string(),
        path: uri.path().to_string(),
        headers: collect_headers(&headers),
        query_parameters: parse_query(uri.query()),
        body: if body.is_empty() {
            None
        } else {
            Some(body.to_vec())
        },
    };

    let result = adapter.handle(request).await;
    into_http_response(result)
}

/// マウントプレフィックス外のリクエスト
async fn route_not_found(method: Method, uri: Uri) -> ApiError {
    warn!(method = %method, path = %uri.path(), "マウントプレフィックス外へのリクエスト");
    ApiError::not_found(format!("ルートが見つかりません: {} {}", method, uri.path()))
}

/// HeaderMapを文字列マップに変換する
///
/// 同名ヘッダーが複数ある場合は到着順に`, `で連結する。
/// UTF-8でない値は置換文字を含む文字列になる。
fn collect_headers(headers: &HeaderMap) -> HashMap<String, String> {
    let mut collected: HashMap<String, String> = HashMap::new();

    for (name, value) in headers {
        let value = String::from_utf8_lossy(value.as_bytes()).into_owned();
        match collected.entry(name.as_str().to_string()) {
            Entry::Occupied(mut entry) => {
                let joined = entry.get_mut();
                joined.push_str(", ");
                joined.push_str(&value);
            }
            Entry::Vacant(entry) => {
                entry.insert(value);
            }
        }
    }

    collected
}

/// 呼び出し結果をHTTPレスポンスに変換する
///
/// ステータス・ヘッダー・ボディをそのまま書き出す。
/// ワイヤーに書き出せないステータス（100〜999の範囲外）は500 `malformed_result`とし、
/// 書き出せないヘッダーは警告ログを出してスキップする。
pub fn into_http_response(result: InvocationResult) -> Response {
    let Ok(status) = StatusCode::from_u16(result.status_code) else {
        warn!(status = result.status_code, "HTTPとして書き出せないステータスコード");
        return ApiError::malformed_result(format!(
            "statusCodeをHTTPレスポンスとして書き出せません: {}",
            result.status_code
        ))
        .into_response();
    };

    let mut response = Response::new(Body::from(result.body));
    *response.status_mut() = status;

    let response_headers = response.headers_mut();
    for (name, value) in result.headers {
        match (
            HeaderName::from_bytes(name.as_bytes()),
            HeaderValue::from_str(&value),
        ) {
            (Ok(header_name), Ok(header_value)) => {
                response_headers.append(header_name, header_value);
            }
            _ => warn!(header = %name, "書き出せないレスポンスヘッダーをスキップ"),
        }
    }

    response
}

/// 指定アドレスにバインドする
///
/// 失敗は起動時の致命的エラーとして返し、リトライやフォールバックは行わない。
pub async fn bind(addr: SocketAddr) -> Result<TcpListener, ServeError> {
    TcpListener::bind(addr)
        .await
        .map_err(|source| ServeError::Bind { addr, source })
}

/// バインド済みのリスナーでサーバーを実行する
///
/// `shutdown`が完了すると新規コネクションの受付を停止し、処理中のリクエストの完了を待って戻る。
pub async fn serve_with_shutdown<F>(
    listener: TcpListener,
    router: Router,
    shutdown: F,
) -> Result<(), ServeError>
where
    F: Future<Output = ()> + Send + 'static,
{
    axum::serve(listener, router)
        .with_graceful_shutdown(shutdown)
        .await
        .map_err(ServeError::Serve)
}

/// 設定に従ってブリッジを起動し、シャットダウンシグナルを受信するまで実行する
///
/// リスナーはプロセス起動時に一度だけ取得し、シャットダウン時に解放される。
pub async fn serve(
    config: &BridgeConfig,
    handler: Arc<dyn InvocationHandler>,
) -> Result<(), ServeError> {
    let listener = bind(config.socket_addr()).await?;
    let local_addr = listener.local_addr().map_err(ServeError::Serve)?;

    let adapter = InvocationAdapter::new(handler, config.invocation_timeout());
    let router = create_router(config.mount_prefix(), adapter);

    info!(
        timeout_ms = u64::try_from(config.invocation_timeout().as_millis()).unwrap_or(u64::MAX),
        "listening on http://{}{}",
        local_addr,
        config.mount_prefix()
    );

    serve_with_shutdown(listener, router, shutdown_signal()).await?;

    info!("サーバーが正常に停止しました");
    Ok(())
}

/// シャットダウンシグナルを待機する
///
/// SIGTERMまたはCtrl+C (SIGINT) を待機し、いずれかを受信したらリターンする。
/// シグナルハンドラーを登録できなかった側は待機し続ける。
pub async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            error!(error = %e, "Ctrl+C シグナルハンドラーの登録に失敗しました");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
            }
            Err(e) => {
                error!(error = %e, "SIGTERM シグナルハンドラーの登録に失敗しました");
                std::future::pending::<()>().await;
            }
        }
    };

    // Windows等の非Unix環境ではSIGTERMは利用不可
    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("Ctrl+C (SIGINT) を受信しました。graceful shutdownを開始します");
        }
        _ = terminate => {
            info!("SIGTERM を受信しました。graceful shutdownを開始します");
        }
    }
}
