use anyhow::Result;
use bytes::Bytes;
use http_body_util::{BodyExt, Limited};
use hyper::body::Incoming;
use hyper::header::{HeaderMap, HeaderValue};
use hyper::server::conn::http1;
use hyper::service::service_fn;
use hyper::{Method, Request, Response, StatusCode};
use hyper_util::rt::TokioIo;
use hyper_util::server::graceful::GracefulShutdown;
use std::convert::Infallible;
use std::future::Future;
use std::net::SocketAddr;
use std::time::Instant;
use tokio::net::TcpListener;
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use super::handlers::{dispatch, empty_response, error_response, BoxBody};
use super::routes::{parse_query, ApiRoute, RouteMatch};
use crate::core::Core;

/// Largest JSON request body accepted
const MAX_BODY_BYTES: usize = 1024 * 1024;

const REQUEST_ID: &str = "x-request-id";
const ALLOWED_METHODS: &str = "GET, POST, DELETE, OPTIONS";

/// Accept connections on `listener` until `shutdown` resolves, then drain
/// in-flight connections for up to the configured grace period.
pub async fn serve<F>(listener: TcpListener, core: Core, shutdown: F) -> Result<()>
where
    F: Future<Output = ()>,
{
    let graceful = GracefulShutdown::new();
    tokio::pin!(shutdown);

    loop {
        let (stream, remote_addr) = tokio::select! {
            accepted = listener.accept() => match accepted {
                Ok(conn) => conn,
                Err(e) => {
                    error!("Failed to accept connection: {}", e);
                    continue;
                }
            },
            _ = &mut shutdown => {
                info!("shutdown signal received, no longer accepting connections");
                break;
            }
        };

        let io = TokioIo::new(stream);
        let core_for_conn = core.clone();
        let service = service_fn(move |req| {
            let core = core_for_conn.clone();
            async move { Ok::<_, Infallible>(handle_request(core, req, remote_addr).await) }
        });

        let conn = http1::Builder::new()
            .keep_alive(true)
            .serve_connection(io, service);
        let conn = graceful.watch(conn);

        tokio::spawn(async move {
            if let Err(e) = conn.await {
                // Filter out benign connection reset errors
                let err_str = format!("{}", e);
                if !err_str.contains("connection reset") && !err_str.contains("broken pipe") {
                    error!("Error serving connection from {}: {}", remote_addr, e);
                }
            }
        });
    }

    drop(listener);

    let grace = core.shutdown_timeout();
    tokio::select! {
        _ = graceful.shutdown() => {
            info!("all connections drained");
        }
        _ = tokio::time::sleep(grace) => {
            warn!(grace_secs = grace.as_secs(), "shutdown grace period elapsed, closing remaining connections");
        }
    }

    Ok(())
}

/// Route, time-bound and log one request
async fn handle_request(
    core: Core,
    req: Request<Incoming>,
    remote_addr: SocketAddr,
) -> Response<BoxBody> {
    let start = Instant::now();
    let method = req.method().clone();
    let path = req.uri().path().to_string();
    let request_id = request_id(req.headers());

    let mut response = if method == Method::OPTIONS {
        preflight_response(req.headers())
    } else {
        match ApiRoute::resolve(&method, &path) {
            RouteMatch::Found(route) => {
                let timeout = core.request_timeout();
                match tokio::time::timeout(timeout, run_route(&core, route, req)).await {
                    Ok(response) => response,
                    Err(_) => {
                        warn!(%method, %path, request_id = %request_id, "request_timed_out");
                        error_response(StatusCode::SERVICE_UNAVAILABLE, "Request timed out")
                    }
                }
            }
            RouteMatch::MethodNotAllowed => {
                error_response(StatusCode::METHOD_NOT_ALLOWED, "Method Not Allowed")
            }
            RouteMatch::NotFound => error_response(StatusCode::NOT_FOUND, "Not Found"),
            RouteMatch::BadPath => {
                error_response(StatusCode::BAD_REQUEST, "Invalid path encoding")
            }
        }
    };

    let headers = response.headers_mut();
    headers.insert("access-control-allow-origin", HeaderValue::from_static("*"));
    if let Ok(value) = HeaderValue::from_str(&request_id) {
        headers.insert(REQUEST_ID, value);
    }

    let status = response.status();
    let duration_ms = start.elapsed().as_millis() as u64;
    if status.is_server_error() {
        warn!(
            %method,
            %path,
            status = status.as_u16(),
            duration_ms,
            request_id = %request_id,
            remote = %remote_addr,
            "http_request"
        );
    } else {
        info!(
            %method,
            %path,
            status = status.as_u16(),
            duration_ms,
            request_id = %request_id,
            remote = %remote_addr,
            "http_request"
        );
    }

    response
}

async fn run_route(core: &Core, route: ApiRoute, req: Request<Incoming>) -> Response<BoxBody> {
    let query = parse_query(req.uri().query());

    // Only POST routes carry a JSON body
    let body = if req.method() == Method::POST {
        match Limited::new(req.into_body(), MAX_BODY_BYTES).collect().await {
            Ok(collected) => collected.to_bytes(),
            Err(e) => {
                debug!(error = %e, "request_body_rejected");
                return error_response(StatusCode::BAD_REQUEST, "Invalid request body");
            }
        }
    } else {
        Bytes::new()
    };

    dispatch(core, route, query, body).await
}

/// Incoming `x-request-id`, or a fresh UUID
fn request_id(headers: &HeaderMap) -> String {
    headers
        .get(REQUEST_ID)
        .and_then(|v| v.to_str().ok())
        .filter(|v| !v.is_empty())
        .map(str::to_string)
        .unwrap_or_else(|| Uuid::new_v4().to_string())
}

/// CORS preflight: any origin, the standard methods, and whatever headers were asked for
fn preflight_response(request_headers: &HeaderMap) -> Response<BoxBody> {
    let mut response = empty_response(StatusCode::NO_CONTENT);
    let headers = response.headers_mut();
    headers.insert(
        "access-control-allow-methods",
        HeaderValue::from_static(ALLOWED_METHODS),
    );
    if let Some(requested) = request_headers.get("access-control-request-headers") {
        headers.insert("access-control-allow-headers", requested.clone());
    }
    headers.insert("vary", HeaderValue::from_static("Origin"));
    response
}
