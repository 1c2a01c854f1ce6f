use std::any::Any;
use std::sync::Arc;

use axum::Json;
use axum::body::Body;
use axum::extract::State;
use axum::extract::rejection::BytesRejection;
use axum::http::{HeaderMap, HeaderValue, StatusCode};
use axum::response::{IntoResponse, Response};
use bytes::Bytes;
use http::header::{
    ACCESS_CONTROL_ALLOW_HEADERS, ACCESS_CONTROL_ALLOW_METHODS, ACCESS_CONTROL_ALLOW_ORIGIN,
    CONTENT_TYPE,
};
use tracing::{error, info, warn};

use tokenrelay_protocol::relay::error::ErrorBody;
use tokenrelay_provider_core::{CallContext, ProxyResponse};

use crate::classify::{body_rejection, classify_request};
use crate::core::CoreState;
use crate::error::ProxyError;

/// CORS preflight. Touches neither the body, the token source nor upstream.
pub async fn preflight_handler() -> Response {
    let mut resp = Response::new(Body::empty());
    *resp.status_mut() = StatusCode::OK;
    let headers = resp.headers_mut();
    headers.insert(ACCESS_CONTROL_ALLOW_ORIGIN, HeaderValue::from_static("*"));
    headers.insert(
        ACCESS_CONTROL_ALLOW_METHODS,
        HeaderValue::from_static("POST, OPTIONS"),
    );
    headers.insert(
        ACCESS_CONTROL_ALLOW_HEADERS,
        HeaderValue::from_static("Content-Type, Authorization"),
    );
    resp
}

pub async fn generate_handler(
    State(state): State<Arc<CoreState>>,
    headers: HeaderMap,
    body: Result<Bytes, BytesRejection>,
) -> Response {
    let ctx = CallContext::new(trace_id(&headers));

    let pool = match state.tokens.load() {
        Ok(pool) => pool,
        Err(err) => {
            error!(event = "token_source_error", trace_id = %ctx.trace_id, error = %err);
            return error_response(ProxyError::internal(err));
        }
    };
    if pool.is_empty() {
        error!(event = "no_tokens", trace_id = %ctx.trace_id);
        return error_response(ProxyError::no_tokens());
    }

    let request = match body
        .map_err(|rejection| body_rejection(&rejection))
        .and_then(|body| classify_request(&body))
    {
        Ok(request) => request,
        Err(err) => {
            info!(
                event = "request_rejected",
                trace_id = %ctx.trace_id,
                status = err.status.as_u16(),
                reason = %err.message
            );
            return error_response(err);
        }
    };

    info!(
        event = "relay_request",
        trace_id = %ctx.trace_id,
        provider = %state.provider.name(),
        credentials = pool.len(),
        prompt_chars = request.inputs.chars().count()
    );

    let provider = &state.provider;
    let result = pool
        .execute(&ctx, |credential| {
            let request = &request;
            let ctx = &ctx;
            async move { provider.attempt(request, &credential, ctx).await }
        })
        .await;

    match result {
        Ok(response) => proxy_response(response),
        Err(err) => {
            warn!(event = "relay_failed", trace_id = %ctx.trace_id, error = %err);
            error_response(ProxyError::exhausted())
        }
    }
}

fn proxy_response(response: ProxyResponse) -> Response {
    let mut resp = Response::new(Body::from(response.body));
    *resp.status_mut() = response.status;
    let headers = resp.headers_mut();
    headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
    headers.insert(ACCESS_CONTROL_ALLOW_ORIGIN, HeaderValue::from_static("*"));
    resp
}

pub(crate) fn error_response(err: ProxyError) -> Response {
    let mut resp = (err.status, Json(ErrorBody::new(err.message))).into_response();
    resp.headers_mut()
        .insert(ACCESS_CONTROL_ALLOW_ORIGIN, HeaderValue::from_static("*"));
    resp
}

pub(crate) fn panic_response(err: Box<dyn Any + Send + 'static>) -> Response {
    let detail = if let Some(detail) = err.downcast_ref::<String>() {
        detail.clone()
    } else if let Some(detail) = err.downcast_ref::<&str>() {
        detail.to_string()
    } else {
        "handler panicked".to_string()
    };
    error!(event = "handler_panic", detail = %detail);
    error_response(ProxyError::internal(detail))
}

fn trace_id(headers: &HeaderMap) -> String {
    headers
        .get("x-request-id")
        .or_else(|| headers.get("request-id"))
        .and_then(|value| value.to_str().ok())
        .map(|value| value.to_string())
        .unwrap_or_else(|| uuid::Uuid::new_v4().to_string())
}
