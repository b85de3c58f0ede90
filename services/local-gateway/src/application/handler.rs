/// 呼び出し対象ハンドラーの抽象
///
/// ブリッジにとってハンドラーは不透明な呼び出し可能オブジェクトであり、
/// エンベロープを受け取り、呼び出し結果または失敗を非同期に返す。
use std::future::Future;

use async_trait::async_trait;
use serde_json::Value;
use thiserror::Error;

use crate::domain::{InvocationEnvelope, InvocationResult, MalformedResultError};

/// ハンドラー呼び出しのエラー型
#[derive(Debug, Error)]
pub enum HandlerError {
    /// ハンドラーが結果を返さずに失敗した
    #[error("ハンドラーの実行に失敗しました: {0}")]
    Failed(String),

    /// ハンドラーが不正な形式の結果を返した
    #[error(transparent)]
    MalformedResult(#[from] MalformedResultError),
}

impl HandlerError {
    /// 任意のメッセージから失敗エラーを作成
    pub fn failed(message: impl Into<String>) -> Self {
        HandlerError::Failed(message.into())
    }
}

// lambda_runtime::Error（Box<dyn Error + Send + Sync>）を返すハンドラーを`?`で扱うため
impl From<Box<dyn std::error::Error + Send + Sync>> for HandlerError {
    fn from(error: Box<dyn std::error::Error + Send + Sync>) -> Self {
        HandlerError::Failed(error.to_string())
    }
}

/// 呼び出し対象ハンドラー用トレイト
///
/// 同時に複数のリクエストから呼ばれるため再入可能であること。
/// ハンドラー内部の共有状態はハンドラー自身の責務とする。
#[async_trait]
pub trait InvocationHandler: Send + Sync {
    /// エンベロープを渡してハンドラーを1回呼び出す
    ///
    /// # 戻り値
    /// * 成功時は`Ok(InvocationResult)`
    /// * 失敗時は`Err(HandlerError)`
    async fn invoke(&self, envelope: InvocationEnvelope) -> Result<InvocationResult, HandlerError>;
}

/// 非同期クロージャを`InvocationHandler`として扱うラッパー
pub struct HandlerFn<F> {
    f: F,
}

/// 非同期クロージャからハンドラーを作成する
///
/// # 使用例
/// ```ignore
/// let handler = handler_fn(|envelope: InvocationEnvelope| async move {
///     Ok::<_, HandlerError>(InvocationResult::new(200).with_body(envelope.path))
/// });
/// ```
pub fn handler_fn<F>(f: F) -> HandlerFn<F> {
    HandlerFn { f }
}

#[async_trait]
impl<F, Fut, E> InvocationHandler for HandlerFn<F>
where
    F: Fn(InvocationEnvelope) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<InvocationResult, E>> + Send + 'static,
    E: Into<HandlerError> + Send + 'static,
{
    async fn invoke(&self, envelope: InvocationEnvelope) -> Result<InvocationResult, HandlerError> {
        (self.f)(envelope).await.map_err(Into::into)
    }
}

/// 型なしJSONの結果を返す非同期クロージャのラッパー
///
/// 戻り値は`InvocationResult::from_json`で検証される。
pub struct JsonHandlerFn<F> {
    f: F,
}

/// 型なしJSONの結果を返す非同期クロージャからハンドラーを作成する
pub fn json_handler_fn<F>(f: F) -> JsonHandlerFn<F> {
    JsonHandlerFn { f }
}

#[async_trait]
impl<F, Fut, E> InvocationHandler for JsonHandlerFn<F>
where
    F: Fn(InvocationEnvelope) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<Value, E>> + Send + 'static,
    E: Into<HandlerError> + Send + 'static,
{
    async fn invoke(&self, envelope: InvocationEnvelope) -> Result<InvocationResult, HandlerError> {
        let value = (self.f)(envelope).await.map_err(Into::into)?;
        Ok(InvocationResult::from_json(value)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn envelope(path: &str) -> InvocationEnvelope {
        InvocationEnvelope {
            method: "GET".to_string(),
            path: path.to_string(),
            headers: Default::default(),
            body: None,
            query_parameters: Default::default(),
        }
    }

    #[tokio::test]
    async fn test_handler_fn_returns_result() {
        let handler = handler_fn(|envelope: InvocationEnvelope| async move {
            Ok::<_, HandlerError>(InvocationResult::new(200).with_body(envelope.path))
        });

        let result = handler.invoke(envelope("/users/42")).await.unwrap();

        assert_eq!(result.status_code, 200);
        assert_eq!(result.body_text(), Some("/users/42"));
    }

    #[tokio::test]
    async fn test_handler_fn_propagates_failure() {
        let handler = handler_fn(|_envelope: InvocationEnvelope| async move {
            Err::<InvocationResult, _>(HandlerError::failed("boom"))
        });

        let error = handler.invoke(envelope("/")).await.unwrap_err();

        assert!(matches!(error, HandlerError::Failed(ref message) if message == "boom"));
    }

    #[tokio::test]
    async fn test_handler_fn_accepts_boxed_errors() {
        let handler = handler_fn(|_envelope: InvocationEnvelope| async move {
            let error: Box<dyn std::error::Error + Send + Sync> = "database unavailable".into();
            Err::<InvocationResult, _>(error)
        });

        let error = handler.invoke(envelope("/")).await.unwrap_err();

        assert!(error.to_string().contains("database unavailable"));
    }

    #[tokio::test]
    async fn test_json_handler_fn_converts_value() {
        let handler = json_handler_fn(|_envelope: InvocationEnvelope| async move {
            Ok::<_, HandlerError>(json!({
                "statusCode": 201,
                "headers": {"Location": "/users/1"},
                "body": ""
            }))
        });

        let result = handler.invoke(envelope("/users")).await.unwrap();

        assert_eq!(result.status_code, 201);
        assert_eq!(result.headers["Location"], "/users/1");
    }

    #[tokio::test]
    async fn test_json_handler_fn_missing_status_code_is_malformed() {
        let handler = json_handler_fn(|_envelope: InvocationEnvelope| async move {
            Ok::<_, HandlerError>(json!({"body": "no status"}))
        });

        let error = handler.invoke(envelope("/")).await.unwrap_err();

        assert!(matches!(
            error,
            HandlerError::MalformedResult(MalformedResultError::MissingStatusCode)
        ));
    }
}
