// Invocation Adapter
//
// 受信リクエスト → エンベロープ → ハンドラー呼び出し → 呼び出し結果 の変換を担う。
// リクエスト間で状態を持たず、1リクエストにつき received → invoking → responding の
// 3状態を経る。ハンドラーの失敗・パニック・タイムアウトはここで5xx系の結果に変換され、
// クライアントには必ず整形済みのレスポンスが返る。

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

use super::handler::{HandlerError, InvocationHandler};
use crate::domain::{InboundRequest, InvocationEnvelope, InvocationResult};

/// デフォルトの呼び出しタイムアウト（API Gatewayの統合タイムアウト上限と同じ29秒）
pub const DEFAULT_INVOCATION_TIMEOUT: Duration = Duration::from_millis(29_000);

/// 1リクエスト内の処理段階
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InvocationPhase {
    /// 受信リクエストを構築済み
    Received,
    /// エンベロープをハンドラーへ渡し、結果を待機中
    Invoking,
    /// 結果を変換してレスポンスを書き出し中
    Responding,
}

impl InvocationPhase {
    /// ログ出力用の名前
    pub fn as_str(&self) -> &'static str {
        match self {
            InvocationPhase::Received => "received",
            InvocationPhase::Invoking => "invoking",
            InvocationPhase::Responding => "responding",
        }
    }
}

impl fmt::Display for InvocationPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// ドロップ時に実行中のハンドラータスクを中断するガード
///
/// クライアント切断でリクエストのFutureが破棄された場合も、ハンドラーを残さない。
struct AbortOnDrop<T>(JoinHandle<T>);

impl<T> Drop for AbortOnDrop<T> {
    fn drop(&mut self) {
        self.0.abort();
    }
}

/// Invocation Adapter
///
/// ハンドラーへの参照とタイムアウト設定のみを保持する。
/// クローンは同じハンドラーを共有する。
#[derive(Clone)]
pub struct InvocationAdapter {
    /// 呼び出し対象ハンドラー
    handler: Arc<dyn InvocationHandler>,
    /// 1リクエストあたりの呼び出しタイムアウト
    timeout: Duration,
}

impl InvocationAdapter {
    /// 新しいAdapterを作成
    ///
    /// # Arguments
    /// * `handler` - 呼び出し対象ハンドラー
    /// * `timeout` - 1リクエストあたりの呼び出しタイムアウト
    pub fn new(handler: Arc<dyn InvocationHandler>, timeout: Duration) -> Self {
        Self { handler, timeout }
    }

    /// 呼び出しタイムアウトを取得
    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// 受信リクエストからエンベロープを構築する
    pub fn build_envelope(&self, request: InboundRequest) -> InvocationEnvelope {
        InvocationEnvelope::from_inbound(request)
    }

    /// ハンドラーを1回だけ呼び出す
    ///
    /// ハンドラーは専用タスクで実行し、その完了を待つ間は他のリクエストに制御を譲る。
    /// リトライは行わない。
    ///
    /// # Returns
    /// - ハンドラーが返した結果（そのまま）
    /// - 500 `invocation_failed`: ハンドラーがエラーを返した、またはパニックした
    /// - 500 `malformed_result`: ハンドラーの結果が不正な形式だった
    /// - 504 `invocation_timeout`: タイムアウトまでに結果が返らなかった（タスクは中断される）
    ///
    /// 戻り値を待たずにこのFutureが破棄された場合もハンドラータスクは中断される。
    pub async fn invoke(&self, envelope: InvocationEnvelope) -> InvocationResult {
        let handler = Arc::clone(&self.handler);
        let mut task = AbortOnDrop(tokio::spawn(async move { handler.invoke(envelope).await }));

        match tokio::time::timeout(self.timeout, &mut task.0).await {
            Ok(Ok(Ok(result))) => result,
            Ok(Ok(Err(HandlerError::MalformedResult(e)))) => {
                warn!(error = %e, "ハンドラーが不正な形式の結果を返しました");
                InvocationResult::error(500, "malformed_result", e.to_string())
            }
            Ok(Ok(Err(e))) => {
                error!(error = %e, "ハンドラーの呼び出しに失敗しました");
                InvocationResult::error(500, "invocation_failed", e.to_string())
            }
            Ok(Err(join_error)) => {
                error!(error = %join_error, "ハンドラーの実行タスクが異常終了しました");
                InvocationResult::error(500, "invocation_failed", "ハンドラーが異常終了しました")
            }
            Err(_) => {
                task.0.abort();
                let timeout_ms = u64::try_from(self.timeout.as_millis()).unwrap_or(u64::MAX);
                error!(timeout_ms, "ハンドラーの呼び出しがタイムアウトしました");
                InvocationResult::error(
                    504,
                    "invocation_timeout",
                    format!("ハンドラーが{timeout_ms}ミリ秒以内に応答しませんでした"),
                )
            }
        }
    }

    /// 1リクエストを処理する（エンベロープ構築 → 呼び出し → 結果返却）
    pub async fn handle(&self, request: InboundRequest) -> InvocationResult {
        debug!(
            phase = %InvocationPhase::Received,
            method = %request.method,
            path = %request.path,
            "リクエストを受信"
        );
        let envelope = self.build_envelope(request);

        debug!(
            phase = %InvocationPhase::Invoking,
            method = %envelope.method,
            path = %envelope.path,
            "ハンドラーを呼び出し"
        );
        let method = envelope.method.clone();
        let path = envelope.path.clone();
        let result = self.invoke(envelope).await;

        info!(
            phase = %InvocationPhase::Responding,
            method = %method,
            path = %path,
            status = result.status_code,
            "呼び出し結果を返却"
        );
        result
    }
}
