// 呼び出し結果
//
// ハンドラーが返す構造化レスポンス（API Gatewayプロキシ統合のレスポンスに相当）。
// ステータス・ヘッダー・ボディはFront Doorによってそのままワイヤーに書き出される。

use std::collections::HashMap;

use base64::{engine::general_purpose::STANDARD, Engine as _};
use serde_json::Value;
use thiserror::Error;

use super::error_body::ErrorBody;

/// 呼び出し結果の形式エラー
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum MalformedResultError {
    /// 結果がJSONオブジェクトではない
    #[error("呼び出し結果がオブジェクトではありません: {0}")]
    NotAnObject(String),

    /// statusCodeが存在しない
    #[error("呼び出し結果にstatusCodeがありません")]
    MissingStatusCode,

    /// statusCodeが整数でない、または範囲外
    #[error("statusCodeが不正です: {0}")]
    InvalidStatusCode(String),

    /// headersがオブジェクトではない
    #[error("headersがオブジェクトではありません: {0}")]
    InvalidHeaders(String),

    /// isBase64Encodedが指定されたがボディをデコードできない
    #[error("Base64ボディのデコードに失敗しました: {0}")]
    InvalidBase64(String),
}

/// 呼び出し結果
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InvocationResult {
    /// HTTPステータスコード（妥当性は検証しない）
    pub status_code: u16,
    /// レスポンスヘッダー（デフォルトは空）
    pub headers: HashMap<String, String>,
    /// レスポンスボディ（デフォルトは空）
    pub body: Vec<u8>,
}

impl InvocationResult {
    /// ヘッダー・ボディが空の結果を作成
    pub fn new(status_code: u16) -> Self {
        Self {
            status_code,
            headers: HashMap::new(),
            body: Vec::new(),
        }
    }

    /// ヘッダーを追加した結果を返す
    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.insert(name.into(), value.into());
        self
    }

    /// ボディを設定した結果を返す
    pub fn with_body(mut self, body: impl Into<Vec<u8>>) -> Self {
        self.body = body.into();
        self
    }

    /// ブリッジ自身が合成するエラー結果を作成
    ///
    /// ボディは`{"error": ..., "message": ...}`形式のJSON。
    ///
    /// # Arguments
    /// * `status_code` - 5xx系のステータスコード
    /// * `error` - エラー種別（例: "invocation_failed"）
    /// * `message` - 詳細メッセージ
    pub fn error(status_code: u16, error: &str, message: impl Into<String>) -> Self {
        Self::new(status_code)
            .with_header("content-type", "application/json")
            .with_body(ErrorBody::new(error, message).to_json_bytes())
    }

    /// ボディをUTF-8文字列として取得（UTF-8でない場合はNone）
    pub fn body_text(&self) -> Option<&str> {
        std::str::from_utf8(&self.body).ok()
    }

    /// 型なしJSON値から呼び出し結果を検証・構築する
    ///
    /// JavaScript製ハンドラーのように`{statusCode, headers, body}`を
    /// 任意のオブジェクトとして返すハンドラー向け。
    ///
    /// - `statusCode`: 必須。0〜65535の整数
    /// - `headers`: 省略可。文字列値はそのまま、数値・真偽値は文字列化、nullは無視
    /// - `body`: 省略可。文字列はそのまま、null/省略は空、それ以外はJSONテキスト
    /// - `isBase64Encoded`: trueの場合はボディ文字列をBase64デコードする
    pub fn from_json(value: Value) -> Result<Self, MalformedResultError> {
        let mut object = match value {
            Value::Object(object) => object,
            other => return Err(MalformedResultError::NotAnObject(other.to_string())),
        };

        let status_code = match object.remove("statusCode") {
            None | Some(Value::Null) => return Err(MalformedResultError::MissingStatusCode),
            Some(Value::Number(number)) => number
                .as_u64()
                .and_then(|code| u16::try_from(code).ok())
                .ok_or_else(|| MalformedResultError::InvalidStatusCode(number.to_string()))?,
            Some(other) => return Err(MalformedResultError::InvalidStatusCode(other.to_string())),
        };

        let headers = match object.remove("headers") {
            None | Some(Value::Null) => HashMap::new(),
            Some(Value::Object(map)) => map
                .into_iter()
                .filter_map(|(name, value)| match value {
                    Value::Null => None,
                    Value::String(text) => Some((name, text)),
                    other => Some((name, other.to_string())),
                })
                .collect(),
            Some(other) => return Err(MalformedResultError::InvalidHeaders(other.to_string())),
        };

        let is_base64_encoded = matches!(object.remove("isBase64Encoded"), Some(Value::Bool(true)));

        let body = match object.remove("body") {
            None | Some(Value::Null) => Vec::new(),
            Some(Value::String(text)) if is_base64_encoded => STANDARD
                .decode(text.as_bytes())
                .map_err(|e| MalformedResultError::InvalidBase64(e.to_string()))?,
            Some(Value::String(text)) => text.into_bytes(),
            Some(other) => other.to_string().into_bytes(),
        };

        Ok(Self {
            status_code,
            headers,
            body,
        })
    }
}
