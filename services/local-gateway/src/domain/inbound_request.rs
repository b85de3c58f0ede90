// 受信HTTPリクエスト
//
// Front Doorがヘッダーとボディを受信し終えた時点で作成し、
// Invocation Adapterが一度だけ消費する。リクエスト間で共有されることはない。

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

/// クエリパラメータの値
///
/// 1回だけ指定されたキーは`Single`、繰り返し指定されたキーは到着順に`Multiple`となる。
/// JSONでは文字列または文字列配列として表現される。
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum QueryValue {
    /// 単一値
    Single(String),
    /// 複数値（到着順）
    Multiple(Vec<String>),
}

impl QueryValue {
    /// 値を追加する（Singleは2つ目の値でMultipleに昇格）
    fn push(&mut self, value: String) {
        match self {
            QueryValue::Single(first) => {
                *self = QueryValue::Multiple(vec![std::mem::take(first), value]);
            }
            QueryValue::Multiple(values) => values.push(value),
        }
    }

    /// 全ての値を到着順で取得
    pub fn values(&self) -> Vec<&str> {
        match self {
            QueryValue::Single(value) => vec![value.as_str()],
            QueryValue::Multiple(values) => values.iter().map(String::as_str).collect(),
        }
    }
}

impl From<&str> for QueryValue {
    fn from(value: &str) -> Self {
        QueryValue::Single(value.to_string())
    }
}

/// クエリ文字列をパラメータマップに変換する
///
/// `application/x-www-form-urlencoded`としてデコードする。
/// `None`や空文字列の場合は空のマップを返す。
///
/// # Arguments
/// * `raw` - `?`を含まないクエリ文字列（例: "active=true&tag=a&tag=b"）
pub fn parse_query(raw: Option<&str>) -> HashMap<String, QueryValue> {
    let mut parameters: HashMap<String, QueryValue> = HashMap::new();

    let Some(raw) = raw else {
        return parameters;
    };

    for (key, value) in url::form_urlencoded::parse(raw.as_bytes()) {
        let value = value.into_owned();
        match parameters.get_mut(key.as_ref()) {
            Some(existing) => existing.push(value),
            None => {
                parameters.insert(key.into_owned(), QueryValue::Single(value));
            }
        }
    }

    parameters
}

/// 受信HTTPリクエスト
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct InboundRequest {
    /// HTTPメソッド（トランスポートが保証する表記のまま）
    pub method: String,
    /// マウントプレフィックスを含む完全なリクエストパス（クエリ文字列を除く）
    pub path: String,
    /// リクエストヘッダー（キーはトランスポートにより小文字化済み）
    pub headers: HashMap<String, String>,
    /// クエリパラメータ
    pub query_parameters: HashMap<String, QueryValue>,
    /// 生のボディバイト列（ボディなしの場合はNone）
    pub body: Option<Vec<u8>>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_query_none_returns_empty() {
        assert!(parse_query(None).is_empty());
        assert!(parse_query(Some("")).is_empty());
    }

    #[test]
    fn test_parse_query_single_value() {
        let parameters = parse_query(Some("active=true"));

        assert_eq!(parameters.len(), 1);
        assert_eq!(parameters["active"], QueryValue::from("true"));
    }

    #[test]
    fn test_parse_query_repeated_key_becomes_multiple_in_order() {
        let parameters = parse_query(Some("tag=b&tag=a&tag=c"));

        assert_eq!(
            parameters["tag"],
            QueryValue::Multiple(vec!["b".to_string(), "a".to_string(), "c".to_string()])
        );
    }

    #[test]
    fn test_parse_query_decodes_percent_encoding() {
        let parameters = parse_query(Some("q=hello%20world&name=%E3%81%82&plus=a+b"));

        assert_eq!(parameters["q"], QueryValue::from("hello world"));
        assert_eq!(parameters["name"], QueryValue::from("あ"));
        assert_eq!(parameters["plus"], QueryValue::from("a b"));
    }

    #[test]
    fn test_parse_query_key_without_value() {
        let parameters = parse_query(Some("flag&x=1"));

        assert_eq!(parameters["flag"], QueryValue::from(""));
        assert_eq!(parameters["x"], QueryValue::from("1"));
    }

    #[test]
    fn test_query_value_serializes_as_string_or_array() {
        let single = serde_json::to_string(&QueryValue::from("1")).unwrap();
        let multiple =
            serde_json::to_string(&QueryValue::Multiple(vec!["1".to_string(), "2".to_string()]))
                .unwrap();

        assert_eq!(single, r#""1""#);
        assert_eq!(multiple, r#"["1","2"]"#);
    }

    #[test]
    fn test_query_value_values() {
        assert_eq!(QueryValue::from("x").values(), vec!["x"]);
        assert_eq!(
            QueryValue::Multiple(vec!["a".to_string(), "b".to_string()]).values(),
            vec!["a", "b"]
        );
    }
}
