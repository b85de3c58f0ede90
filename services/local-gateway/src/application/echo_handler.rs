// エコーハンドラー
//
// 受け取ったエンベロープをそのままJSONで返す。
// ブリッジ単体の動作確認（デプロイ後のスモークテスト等）に使うデフォルトの呼び出し先。

use async_trait::async_trait;

use super::handler::{HandlerError, InvocationHandler};
use crate::domain::{InvocationEnvelope, InvocationResult};

/// エンベロープをJSONで返すハンドラー
///
/// UTF-8でないボディはBase64で返し、`isBase64Encoded`を`true`にする。
#[derive(Debug, Clone, Copy, Default)]
pub struct EchoHandler;

#[async_trait]
impl InvocationHandler for EchoHandler {
    async fn invoke(&self, envelope: InvocationEnvelope) -> Result<InvocationResult, HandlerError> {
        let body = serde_json::to_vec(&envelope)
            .map_err(|e| HandlerError::failed(format!("エンベロープのシリアライズに失敗: {e}")))?;

        Ok(InvocationResult::new(200)
            .with_header("content-type", "application/json")
            .with_body(body))
    }
}
