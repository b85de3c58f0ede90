//! Front Doorのエラーハンドリング
//!
//! ブリッジがハンドラーを呼び出さずに自ら返すエラー（マウントプレフィックス外のリクエスト、
//! ワイヤーに書き出せない呼び出し結果）を統一されたJSON形式で返却する。

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};

use crate::domain::ErrorBody;

/// Front Doorのエラー
///
/// ステータスコードとJSON形式のエラーボディを含む。
#[derive(Debug, Clone)]
pub struct ApiError {
    /// HTTPステータスコード
    status: StatusCode,
    /// エラーレスポンスボディ
    body: ErrorBody,
}

impl ApiError {
    /// 新しいApiErrorを作成
    pub fn new(status: StatusCode, error: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            status,
            body: ErrorBody::new(error, message),
        }
    }

    /// 404 Not Foundエラーを作成
    pub fn not_found(message: impl Into<String>) -> Self {
        Self::new(StatusCode::NOT_FOUND, "not_found", message)
    }

    /// 500 Internal Server Error（不正な呼び出し結果）を作成
    pub fn malformed_result(message: impl Into<String>) -> Self {
        Self::new(StatusCode::INTERNAL_SERVER_ERROR, "malformed_result", message)
    }

    /// エラー種別を取得
    pub fn error(&self) -> &str {
        &self.body.error
    }

    /// エラーメッセージを取得
    pub fn message(&self) -> &str {
        &self.body.message
    }

    /// ステータスコードを取得
    pub fn status(&self) -> StatusCode {
        self.status
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (self.status, Json(self.body)).into_response()
    }
}
