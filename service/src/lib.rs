use broker::{Connector, KafkaConnector};
use config::Config;
use log::info;
use std::sync::Arc;

pub mod config;
pub mod logging;

/// Validates the broker settings and proves they work with one metadata round trip.
/// Any failure here is fatal: the process must not start serving requests.
pub async fn init_broker(config: &Config) -> Result<Arc<dyn Connector>, broker::Error> {
    let endpoint = Arc::new(config.broker_endpoint()?);
    info!(
        "Broker config: address={}, user={}, mechanism={}, metadata_timeout={}s",
        endpoint.address(),
        endpoint.username(),
        endpoint.security().mechanism,
        config.kafka_metadata_timeout_secs,
    );

    let connector = KafkaConnector::new(endpoint, config.kafka_metadata_timeout());
    connector.verify().await?;

    Ok(Arc::new(connector))
}

// Service-level state containing only infrastructure concerns
// Needs to implement Clone to be able to be passed into Router as State
#[derive(Clone)]
pub struct AppState {
    pub connector: Arc<dyn Connector>,
    pub sse_manager: Arc<sse::Manager>,
    pub config: Config,
}

impl AppState {
    pub fn new(app_config: Config, connector: &Arc<dyn Connector>) -> Self {
        Self {
            connector: Arc::clone(connector),
            sse_manager: Arc::new(sse::Manager::new(app_config.session_policy())),
            config: app_config,
        }
    }

    pub fn connector_ref(&self) -> &dyn Connector {
        self.connector.as_ref()
    }
}
