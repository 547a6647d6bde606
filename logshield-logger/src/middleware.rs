//! Request/response logging middleware with trace propagation
//!
//! ```rust,ignore
//! use logshield_logger::{request_logging_middleware, Logger, LoggerConfig, RequestLoggingState};
//! use std::sync::Arc;
//!
//! let state = RequestLoggingState::new(Arc::new(Logger::new(LoggerConfig::from_env())));
//! let app = Router::new()
//!     .route("/", get(handler))
//!     .layer(axum::middleware::from_fn_with_state(state, request_logging_middleware));
//! ```

use axum::{
    extract::{ConnectInfo, Request, State},
    http::{header::USER_AGENT, HeaderMap, HeaderValue},
    middleware::Next,
    response::Response,
};
use logshield_core::TraceContext;
use serde_json::json;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Instant;
use uuid::Uuid;

use crate::level::Level;
use crate::logger::Logger;

/// Incoming and echoed trace id header
pub const TRACE_ID_HEADER: &str = "x-trace-id";

/// Incoming parent span header
pub const SPAN_ID_HEADER: &str = "x-span-id";

const FORWARDED_FOR_HEADER: &str = "x-forwarded-for";

/// Middleware state for request logging
#[derive(Clone)]
pub struct RequestLoggingState {
    logger: Arc<Logger>,
}

impl RequestLoggingState {
    pub fn new(logger: Arc<Logger>) -> Self {
        Self { logger }
    }

    pub fn logger(&self) -> &Arc<Logger> {
        &self.logger
    }
}

fn header_str(headers: &HeaderMap, name: &str) -> Option<String> {
    headers
        .get(name)
        .and_then(|v| v.to_str().ok())
        .filter(|v| !v.is_empty())
        .map(|v| v.to_string())
}

/// Child span of the caller's context when `x-trace-id` is present, otherwise
/// a fresh root.
fn incoming_context(headers: &HeaderMap) -> TraceContext {
    match header_str(headers, TRACE_ID_HEADER) {
        Some(trace_id) => match header_str(headers, SPAN_ID_HEADER) {
            Some(span_id) => TraceContext::new(trace_id, span_id, None).child(),
            None => TraceContext::new(trace_id, Uuid::new_v4().to_string(), None),
        },
        None => TraceContext::new_root(),
    }
}

fn client_ip(request: &Request) -> Option<String> {
    header_str(request.headers(), FORWARDED_FOR_HEADER).or_else(|| {
        request
            .extensions()
            .get::<ConnectInfo<SocketAddr>>()
            .map(|ConnectInfo(addr)| addr.ip().to_string())
    })
}

/// Logs `"HTTP Request"` once the inner service has responded
pub async fn request_logging_middleware(
    State(state): State<RequestLoggingState>,
    request: Request,
    next: Next,
) -> Response {
    let start = Instant::now();

    let method = request.method().to_string();
    let url = request.uri().to_string();
    let user_agent = header_str(request.headers(), USER_AGENT.as_str());
    let ip = client_ip(&request);
    let context = incoming_context(request.headers());

    let traces = state.logger.traces().clone();
    traces
        .scope_with(context, async move {
            let mut response = next.run(request).await;
            let duration = start.elapsed().as_millis() as u64;

            state.logger.log_at(
                Level::Info,
                None,
                "HTTP Request",
                json!({
                    "method": method,
                    "url": url,
                    "statusCode": response.status().as_u16(),
                    "duration": duration,
                    "userAgent": user_agent,
                    "ip": ip,
                }),
                None,
            );

            let trace_id = state.logger.traces().get_trace_context().trace_id;
            if let Ok(value) = HeaderValue::from_str(&trace_id) {
                response.headers_mut().insert(TRACE_ID_HEADER, value);
            }

            response
        })
        .await
}
