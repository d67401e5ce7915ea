// src/logging/mod.rs

use axum::{
    body::Body,
    http::{HeaderName, HeaderValue, Request, StatusCode},
    middleware::Next,
    response::Response,
};
use std::time::Instant;
use tracing::Level;
use uuid::Uuid;

#[macro_export]
macro_rules! log_with_context {
    ($level:expr, $msg:expr $(, $($key:expr => $value:expr),* $(,)?)?) => {
        match $level {
            tracing::Level::ERROR => {
                tracing::error!(
                    message = $msg
                    $(, $($key = ?$value,)*)?
                );
            }
            tracing::Level::WARN => {
                tracing::warn!(
                    message = $msg
                    $(, $($key = ?$value,)*)?
                );
            }
            tracing::Level::INFO => {
                tracing::info!(
                    message = $msg
                    $(, $($key = ?$value,)*)?
                );
            }
            tracing::Level::DEBUG => {
                tracing::debug!(
                    message = $msg
                    $(, $($key = ?$value,)*)?
                );
            }
            _ => {}
        }
    };
}

pub static REQUEST_ID_HEADER: HeaderName = HeaderName::from_static("x-request-id");

const MAX_REQUEST_ID_LEN: usize = 64;

/// リクエスト単位のログ情報
///
/// パスのみを保持する。クエリ文字列にはログイン保留トークンが含まれ得る。
#[derive(Clone, Debug)]
pub struct RequestContext {
    pub request_id: String,
    pub path: String,
    pub method: String,
}

impl RequestContext {
    fn from_request(req: &Request<Body>) -> Self {
        let request_id = req
            .headers()
            .get(&REQUEST_ID_HEADER)
            .and_then(|value| value.to_str().ok())
            .map(str::trim)
            .filter(|id| !id.is_empty() && id.len() <= MAX_REQUEST_ID_LEN)
            .map(str::to_string)
            .unwrap_or_else(|| Uuid::new_v4().to_string());

        Self {
            request_id,
            path: req.uri().path().to_string(),
            method: req.method().to_string(),
        }
    }
}

/// 応答ステータスに応じたログレベル
pub fn status_level(status: StatusCode) -> Level {
    if status.is_server_error() {
        Level::ERROR
    } else if status.is_client_error() {
        Level::WARN
    } else {
        Level::INFO
    }
}

// ロギングミドルウェア
pub async fn logging_middleware(req: Request<Body>, next: Next) -> Response {
    let start = Instant::now();
    let Some(context) = req.extensions().get::<RequestContext>().cloned() else {
        return next.run(req).await;
    };

    log_with_context!(
        Level::DEBUG,
        "Request started",
        "request_id" => &context.request_id,
        "method" => &context.method,
        "path" => &context.path,
    );

    let response = next.run(req).await;
    let status = response.status();

    log_with_context!(
        status_level(status),
        "Request completed",
        "request_id" => &context.request_id,
        "method" => &context.method,
        "path" => &context.path,
        "status" => status.as_u16(),
        "duration_ms" => start.elapsed().as_millis(),
    );

    response
}

/// RequestContextを生成し、リクエストIDを応答ヘッダーに返す
pub async fn inject_request_context(mut req: Request<Body>, next: Next) -> Response {
    let context = RequestContext::from_request(&req);
    let request_id = HeaderValue::from_str(&context.request_id).ok();

    req.extensions_mut().insert(context);
    let mut response = next.run(req).await;

    if let Some(value) = request_id {
        response
            .headers_mut()
            .insert(REQUEST_ID_HEADER.clone(), value);
    }
    response
}
