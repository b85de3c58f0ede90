//! API Gatewayプロキシ統合との相互変換
//!
//! `LambdaEvent<ApiGatewayProxyRequest>`を受け取る既存のLambda関数を、
//! 変更なしでブリッジのハンドラーとして呼び出せるようにする。

use std::collections::HashMap;
use std::future::Future;

use async_trait::async_trait;
use aws_lambda_events::encodings::Body;
use aws_lambda_events::event::apigw::{ApiGatewayProxyRequest, ApiGatewayProxyResponse};
use aws_lambda_events::query_map::QueryMap;
use axum::http::{HeaderMap, HeaderName, HeaderValue, Method};
use base64::{engine::general_purpose::STANDARD, Engine};
use lambda_runtime::{Context, LambdaEvent};
use thiserror::Error;

use crate::application::{HandlerError, InvocationHandler};
use crate::domain::{InvocationEnvelope, InvocationResult, MalformedResultError};

/// ローカル実行時のステージ名
const LOCAL_STAGE: &str = "local";

/// プロキシ統合のリソースパス
const PROXY_RESOURCE: &str = "/{proxy+}";

/// エンベロープからプロキシリクエストへの変換エラー
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ApiGatewayConversionError {
    /// HTTPメソッドとして解釈できない
    #[error("HTTPメソッドが不正です: {0}")]
    InvalidMethod(String),

    /// ヘッダー名または値がHTTPヘッダーとして不正
    #[error("ヘッダーが不正です: {0}")]
    InvalidHeader(String),
}

impl From<ApiGatewayConversionError> for HandlerError {
    fn from(error: ApiGatewayConversionError) -> Self {
        HandlerError::Failed(error.to_string())
    }
}

/// エンベロープをAPI Gatewayプロキシリクエストに変換する
///
/// - パスはマウントプレフィックス除去後のものをそのまま使い、`proxy`パスパラメータにも設定する
/// - `multi_value_headers`には`, `区切りの値を分割して1値ずつ入れる
/// - UTF-8として解釈できないボディはBase64エンコードし`is_base64_encoded`を立てる
pub fn to_proxy_request(
    envelope: &InvocationEnvelope,
) -> Result<ApiGatewayProxyRequest, ApiGatewayConversionError> {
    let method = Method::from_bytes(envelope.method.as_bytes())
        .map_err(|_| ApiGatewayConversionError::InvalidMethod(envelope.method.clone()))?;

    let mut headers = HeaderMap::new();
    let mut multi_value_headers = HeaderMap::new();
    for (name, value) in &envelope.headers {
        let header_name = HeaderName::from_bytes(name.as_bytes())
            .map_err(|_| ApiGatewayConversionError::InvalidHeader(name.clone()))?;
        let header_value = HeaderValue::from_str(value)
            .map_err(|_| ApiGatewayConversionError::InvalidHeader(name.clone()))?;
        // Front Doorが`, `で連結した同名ヘッダーを個別の値に戻す
        for part in value.split(", ") {
            let part_value = HeaderValue::from_str(part)
                .map_err(|_| ApiGatewayConversionError::InvalidHeader(name.clone()))?;
            multi_value_headers.append(header_name.clone(), part_value);
        }
        headers.insert(header_name, header_value);
    }

    let mut single_values: HashMap<String, Vec<String>> = HashMap::new();
    let mut multi_values: HashMap<String, Vec<String>> = HashMap::new();
    for (key, value) in &envelope.query_parameters {
        let values: Vec<String> = value.values().into_iter().map(str::to_string).collect();
        // 単一値マップは最後の値を採用する（API Gatewayと同じ挙動）
        if let Some(last) = values.last() {
            single_values.insert(key.clone(), vec![last.clone()]);
        }
        multi_values.insert(key.clone(), values);
    }

    let mut path_parameters = HashMap::new();
    let proxy = envelope.path.trim_start_matches('/');
    if !proxy.is_empty() {
        path_parameters.insert("proxy".to_string(), proxy.to_string());
    }

    let (body, is_base64_encoded) = match envelope.body.as_deref() {
        None => (None, false),
        Some(bytes) => match std::str::from_utf8(bytes) {
            Ok(text) => (Some(text.to_string()), false),
            Err(_) => (Some(STANDARD.encode(bytes)), true),
        },
    };

    let mut request = ApiGatewayProxyRequest::default();
    request.resource = Some(PROXY_RESOURCE.to_string());
    request.path = Some(envelope.path.clone());
    request.http_method = method.clone();
    request.multi_value_headers = multi_value_headers;
    request.headers = headers;
    request.query_string_parameters = QueryMap::from(single_values);
    request.multi_value_query_string_parameters = QueryMap::from(multi_values);
    request.path_parameters = path_parameters;
    request.body = body;
    request.is_base64_encoded = is_base64_encoded;
    request.request_context.stage = Some(LOCAL_STAGE.to_string());
    request.request_context.http_method = method;

    Ok(request)
}

/// API Gatewayプロキシレスポンスを呼び出し結果に変換する
///
/// API Gatewayと同様に`multi_value_headers`を優先し、同名の値は`, `で連結する。
/// `headers`の値は`multi_value_headers`に同名キーがない場合のみ使う。
pub fn from_proxy_response(
    response: ApiGatewayProxyResponse,
) -> Result<InvocationResult, MalformedResultError> {
    let status_code = u16::try_from(response.status_code)
        .map_err(|_| MalformedResultError::InvalidStatusCode(response.status_code.to_string()))?;

    let mut headers: HashMap<String, String> = HashMap::new();
    for (name, value) in response.multi_value_headers.iter() {
        let value = header_text(name, value)?;
        headers
            .entry(name.as_str().to_string())
            .and_modify(|joined| {
                joined.push_str(", ");
                joined.push_str(value);
            })
            .or_insert_with(|| value.to_string());
    }
    for (name, value) in response.headers.iter() {
        if !headers.contains_key(name.as_str()) {
            headers.insert(name.as_str().to_string(), header_text(name, value)?.to_string());
        }
    }

    let body = match response.body {
        None | Some(Body::Empty) => Vec::new(),
        Some(Body::Text(text)) if response.is_base64_encoded => STANDARD
            .decode(text.as_bytes())
            .map_err(|e| MalformedResultError::InvalidBase64(e.to_string()))?,
        Some(Body::Text(text)) => text.into_bytes(),
        Some(Body::Binary(bytes)) => bytes,
    };

    Ok(InvocationResult {
        status_code,
        headers,
        body,
    })
}

fn header_text<'a>(
    name: &HeaderName,
    value: &'a HeaderValue,
) -> Result<&'a str, MalformedResultError> {
    value
        .to_str()
        .map_err(|_| MalformedResultError::InvalidHeaders(name.as_str().to_string()))
}

/// API Gatewayプロキシ統合形式のLambda関数を`InvocationHandler`として扱うラッパー
pub struct LambdaFn<F> {
    f: F,
}

/// `LambdaEvent<ApiGatewayProxyRequest>`を受け取る非同期関数からハンドラーを作成する
///
/// Lambda上で`service_fn`に渡しているハンドラー関数をそのまま渡せる。
/// `Context`はローカル実行用のデフォルト値になる。
pub fn lambda_fn<F>(f: F) -> LambdaFn<F> {
    LambdaFn { f }
}

#[async_trait]
impl<F, Fut> InvocationHandler for LambdaFn<F>
where
    F: Fn(LambdaEvent<ApiGatewayProxyRequest>) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<ApiGatewayProxyResponse, lambda_runtime::Error>> + Send + 'static,
{
    async fn invoke(&self, envelope: InvocationEnvelope) -> Result<InvocationResult, HandlerError> {
        let request = to_proxy_request(&envelope)?;
        let response = (self.f)(LambdaEvent::new(request, Context::default())).await?;
        Ok(from_proxy_response(response)?)
    }
}
