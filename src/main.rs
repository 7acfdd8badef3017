use log::{error, info};
use service::{config::Config, logging::Logger};

#[tokio::main]
async fn main() {
    let config = Config::new();
    if let Err(e) = Logger::init_logger(&config) {
        eprintln!("Failed to initialize logger: {e}");
    }

    info!(
        "Starting kafka_sse_bridge in {} mode...",
        config.runtime_env()
    );

    let connector = match service::init_broker(&config).await {
        Ok(connector) => connector,
        Err(e) => {
            error!("Failed to connect to the Kafka broker: {e}");
            std::process::exit(1);
        }
    };

    let app_state = web::AppState::new(config, &connector);

    if let Err(e) = web::init_server(app_state).await {
        error!("Server stopped with an error: {e}");
        std::process::exit(1);
    }
}
