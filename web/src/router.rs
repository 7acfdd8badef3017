use crate::{controller::stream_controller, middleware::request_log::log_request, AppState};
use axum::{
    http::{
        header::{ACCEPT, AUTHORIZATION, CONTENT_TYPE},
        HeaderName, HeaderValue, Method,
    },
    middleware::from_fn,
    routing::get,
    Router,
};
use log::*;
use service::config::Config;
use tower_http::catch_panic::CatchPanicLayer;
use tower_http::cors::{AllowOrigin, CorsLayer};

pub fn define_routes(app_state: AppState) -> Router {
    let cors = cors_layer(&app_state.config);

    Router::new()
        .merge(stream_routes(app_state))
        .layer(from_fn(log_request))
        // A panic while handling one request becomes a 500 for that request only.
        .layer(CatchPanicLayer::new())
        .layer(cors)
}

fn stream_routes(app_state: AppState) -> Router {
    Router::new()
        .route("/", get(stream_controller::missing_topic))
        .route("/:topic", get(stream_controller::stream))
        .with_state(app_state)
}

fn cors_layer(config: &Config) -> CorsLayer {
    let origins: Vec<HeaderValue> = config
        .allowed_origins
        .iter()
        .filter_map(|origin| match origin.parse::<HeaderValue>() {
            Ok(value) => Some(value),
            Err(e) => {
                warn!("Ignoring invalid CORS origin {origin}: {e}");
                None
            }
        })
        .collect();

    CorsLayer::new()
        .allow_origin(AllowOrigin::list(origins))
        .allow_methods([Method::GET, Method::OPTIONS])
        .allow_headers([
            ACCEPT,
            AUTHORIZATION,
            CONTENT_TYPE,
            HeaderName::from_static("x-csrf-token"),
        ])
        .allow_credentials(true)
}
