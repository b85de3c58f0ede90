//! エラーレスポンスのボディ
//!
//! ブリッジ自身が生成するエラー（ルート外リクエスト、ハンドラー失敗、タイムアウト等）は
//! すべてこの形式のJSONで返却される。

use serde::{Deserialize, Serialize};

/// エラーレスポンスのボディ
///
/// JSON形式で`error`（エラー種別）と`message`（詳細メッセージ）を含む。
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ErrorBody {
    /// エラー種別（例: "not_found", "invocation_failed", "invocation_timeout", "malformed_result"）
    pub error: String,
    /// 詳細なエラーメッセージ
    pub message: String,
}

impl ErrorBody {
    /// 新しいErrorBodyを作成
    pub fn new(error: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            error: error.into(),
            message: message.into(),
        }
    }

    /// JSONバイト列に変換
    ///
    /// 文字列フィールドのみの構造体なのでシリアライズは失敗しない。
    pub fn to_json_bytes(&self) -> Vec<u8> {
        serde_json::to_vec(self).unwrap_or_default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_body_serializes_to_json() {
        let body = ErrorBody::new("invocation_failed", "ハンドラーが失敗しました");
        let json = String::from_utf8(body.to_json_bytes()).unwrap();

        assert!(json.contains("\"error\":\"invocation_failed\""));
        assert!(json.contains("\"message\":\"ハンドラーが失敗しました\""));
    }

    #[test]
    fn test_error_body_deserializes_from_json() {
        let json = r#"{"error":"not_found","message":"ルートが見つかりません"}"#;
        let body: ErrorBody = serde_json::from_str(json).unwrap();

        assert_eq!(body, ErrorBody::new("not_found", "ルートが見つかりません"));
    }
}
