// 呼び出しエンベロープ
//
// API Gatewayがプロキシ統合時に構築するイベントに相当する、
// ハンドラーへ渡す正規化済みリクエスト。

use std::collections::HashMap;

use base64::{engine::general_purpose::STANDARD, Engine as _};
use serde::ser::SerializeStruct;
use serde::{Serialize, Serializer};

use super::inbound_request::{InboundRequest, QueryValue};

/// マウントプレフィックスを除去したパスを計算する
///
/// 完全なパスを`/`で分割し、先頭2セグメント（先頭`/`による空セグメントと
/// マウントプレフィックス自身）を捨て、残りを`/`で連結して先頭に`/`を付ける。
/// 残りのセグメントがない場合は`/`を返す。
///
/// プレフィックスが2番目のセグメントを占めていることはFront Doorのルーティングが保証する。
///
/// # 例
/// - `/cgm-api/users/42` → `/users/42`
/// - `/cgm-api` → `/`
/// - `/cgm-api/` → `/`
pub fn strip_mount_prefix(full_path: &str) -> String {
    let remaining: Vec<&str> = full_path.split('/').skip(2).collect();
    format!("/{}", remaining.join("/"))
}

/// 呼び出しエンベロープ
///
/// マウントプレフィックスのセグメントを決して含まない。
/// ヘッダー・クエリパラメータ・ボディは受信リクエストのまま転送され、再エンコードされない。
///
/// JSON表現（`method`, `path`, `headers`, `body`, `queryParameters`, `isBase64Encoded`）では、
/// UTF-8として解釈できないボディのみBase64エンコードし`isBase64Encoded`を`true`にする。
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InvocationEnvelope {
    /// HTTPメソッド
    pub method: String,
    /// マウントプレフィックス除去後のパス
    pub path: String,
    /// リクエストヘッダー
    pub headers: HashMap<String, String>,
    /// 生のボディバイト列
    pub body: Option<Vec<u8>>,
    /// クエリパラメータ
    pub query_parameters: HashMap<String, QueryValue>,
}

impl InvocationEnvelope {
    /// 受信リクエストからエンベロープを構築する
    pub fn from_inbound(request: InboundRequest) -> Self {
        Self {
            path: strip_mount_prefix(&request.path),
            method: request.method,
            headers: request.headers,
            body: request.body,
            query_parameters: request.query_parameters,
        }
    }

    /// ボディをUTF-8文字列として取得（UTF-8でない場合はNone）
    pub fn body_text(&self) -> Option<&str> {
        self.body
            .as_deref()
            .and_then(|bytes| std::str::from_utf8(bytes).ok())
    }
}

impl Serialize for InvocationEnvelope {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        let (body, is_base64_encoded) = match self.body.as_deref() {
            None => (None, false),
            Some(bytes) => match std::str::from_utf8(bytes) {
                Ok(text) => (Some(text.to_string()), false),
                Err(_) => (Some(STANDARD.encode(bytes)), true),
            },
        };

        let mut state = serializer.serialize_struct("InvocationEnvelope", 6)?;
        state.serialize_field("method", &self.method)?;
        state.serialize_field("path", &self.path)?;
        state.serialize_field("headers", &self.headers)?;
        state.serialize_field("body", &body)?;
        state.serialize_field("queryParameters", &self.query_parameters)?;
        state.serialize_field("isBase64Encoded", &is_base64_encoded)?;
        state.end()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::inbound_request::parse_query;

    fn inbound(method: &str, path: &str) -> InboundRequest {
        InboundRequest {
            method: method.to_string(),
            path: path.to_string(),
            ..Default::default()
        }
    }

    // ========================================
    // strip_mount_prefix のテスト
    // ========================================

    #[test]
    fn test_strip_mount_prefix_nested_path() {
        assert_eq!(strip_mount_prefix("/cgm-api/users/42"), "/users/42");
        assert_eq!(strip_mount_prefix("/cgm-api/a/b/c/d/e"), "/a/b/c/d/e");
    }

    #[test]
    fn test_strip_mount_prefix_single_segment() {
        assert_eq!(strip_mount_prefix("/cgm-api/users"), "/users");
    }

    #[test]
    fn test_strip_mount_prefix_prefix_only_is_root() {
        assert_eq!(strip_mount_prefix("/cgm-api"), "/");
    }

    #[test]
    fn test_strip_mount_prefix_trailing_slash() {
        assert_eq!(strip_mount_prefix("/cgm-api/"), "/");
        assert_eq!(strip_mount_prefix("/cgm-api/users/"), "/users/");
    }

    #[test]
    fn test_strip_mount_prefix_keeps_empty_inner_segments() {
        assert_eq!(strip_mount_prefix("/cgm-api/a//b"), "/a//b");
    }

    #[test]
    fn test_strip_mount_prefix_is_independent_of_prefix_name() {
        // 任意の深さで /{prefix}/{a}/.../{n} → /{a}/.../{n}
        for prefix in ["cgm-api", "api", "x"] {
            for depth in 0..6 {
                let segments: Vec<String> = (0..depth).map(|i| format!("s{i}")).collect();
                let full = if segments.is_empty() {
                    format!("/{prefix}")
                } else {
                    format!("/{prefix}/{}", segments.join("/"))
                };
                let expected = format!("/{}", segments.join("/"));

                assert_eq!(strip_mount_prefix(&full), expected, "full path: {full}");
            }
        }
    }

    #[test]
    fn test_strip_mount_prefix_does_not_decode() {
        assert_eq!(strip_mount_prefix("/cgm-api/a%2Fb"), "/a%2Fb");
    }

    // ========================================
    // from_inbound のテスト
    // ========================================

    #[test]
    fn test_from_inbound_get_passthrough() {
        let mut request = inbound("GET", "/cgm-api/users/42");
        request
            .headers
            .insert("x-test".to_string(), "1".to_string());
        request.query_parameters = parse_query(Some("active=true"));

        let envelope = InvocationEnvelope::from_inbound(request);

        assert_eq!(envelope.method, "GET");
        assert_eq!(envelope.path, "/users/42");
        assert_eq!(envelope.headers.get("x-test").map(String::as_str), Some("1"));
        assert_eq!(
            envelope.query_parameters.get("active"),
            Some(&QueryValue::from("true"))
        );
        assert_eq!(envelope.body, None);
    }

    #[test]
    fn test_from_inbound_copies_headers_and_body_verbatim() {
        let mut headers = HashMap::new();
        headers.insert("content-type".to_string(), "application/json".to_string());
        headers.insert("x-custom".to_string(), "a, b".to_string());
        let body = b"{ \"b\": 1,\n  \"a\": 2 }".to_vec();

        let request = InboundRequest {
            method: "POST".to_string(),
            path: "/cgm-api/items".to_string(),
            headers: headers.clone(),
            query_parameters: HashMap::new(),
            body: Some(body.clone()),
        };

        let envelope = InvocationEnvelope::from_inbound(request);

        assert_eq!(envelope.headers, headers);
        assert_eq!(envelope.body, Some(body));
    }

    #[test]
    fn test_from_inbound_does_not_normalize_method() {
        let envelope = InvocationEnvelope::from_inbound(inbound("PATCH", "/cgm-api"));

        assert_eq!(envelope.method, "PATCH");
        assert_eq!(envelope.path, "/");
    }

    #[test]
    fn test_body_text() {
        let mut request = inbound("POST", "/cgm-api");
        request.body = Some(b"hello".to_vec());
        let envelope = InvocationEnvelope::from_inbound(request);
        assert_eq!(envelope.body_text(), Some("hello"));

        let mut request = inbound("POST", "/cgm-api");
        request.body = Some(vec![0xff, 0xfe]);
        let envelope = InvocationEnvelope::from_inbound(request);
        assert_eq!(envelope.body_text(), None);
    }

    // ========================================
    // JSON表現のテスト
    // ========================================

    #[test]
    fn test_envelope_serializes_with_camel_case_fields() {
        let mut request = inbound("GET", "/cgm-api/users/42");
        request.query_parameters = parse_query(Some("active=true"));
        request.body = Some(b"{\"id\":42}".to_vec());

        let envelope = InvocationEnvelope::from_inbound(request);
        let json = serde_json::to_value(&envelope).unwrap();

        assert_eq!(json["method"], "GET");
        assert_eq!(json["path"], "/users/42");
        assert_eq!(json["queryParameters"]["active"], "true");
        assert_eq!(json["body"], "{\"id\":42}");
        assert_eq!(json["isBase64Encoded"], false);
        assert!(json["headers"].is_object());
    }

    #[test]
    fn test_envelope_serializes_missing_body_as_null() {
        let envelope = InvocationEnvelope::from_inbound(inbound("GET", "/cgm-api"));
        let json = serde_json::to_value(&envelope).unwrap();

        assert!(json["body"].is_null());
        assert_eq!(json["isBase64Encoded"], false);
    }

    #[test]
    fn test_envelope_serializes_binary_body_as_base64() {
        let mut request = inbound("PUT", "/cgm-api/upload");
        request.body = Some(vec![0xff, 0x00, 0xfe]);

        let envelope = InvocationEnvelope::from_inbound(request);
        let json = serde_json::to_value(&envelope).unwrap();

        assert_eq!(json["body"], "/wD+");
        assert_eq!(json["isBase64Encoded"], true);
        // エンベロープ自体のボディは変換されない
        assert_eq!(envelope.body, Some(vec![0xff, 0x00, 0xfe]));
    }
}
