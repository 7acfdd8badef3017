use axum::{extract::Request, middleware::Next, response::Response};
use log::*;
use tokio::time::Instant;

/// Logs method, path, status and time-to-headers of every request.
///
/// For stream requests the time covers attaching to the broker, not the life of the stream.
pub async fn log_request(request: Request, next: Next) -> Response {
    let method = request.method().clone();
    let uri = request.uri().clone();
    let started = Instant::now();

    let response = next.run(request).await;

    info!(
        "{} {} -> {} ({:?})",
        method,
        uri.path(),
        response.status().as_u16(),
        started.elapsed()
    );
    response
}
