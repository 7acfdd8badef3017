use broker::{BrokerEndpoint, SaslMechanism, StartPolicy, TransportSecurity};
use clap::builder::TypedValueParser as _;
use clap::Parser;
use dotenvy::dotenv;
use log::LevelFilter;
use sse::{RetryPolicy, SessionPolicy};
use std::fmt;
use std::str::FromStr;
use std::time::Duration;

const MAX_SESSION_LIFETIME_SECS: u64 = 30 * 24 * 60 * 60;

#[derive(Clone, Debug, PartialEq)]
pub enum RustEnv {
    Development,
    Production,
    Staging,
}

#[derive(Debug, PartialEq, Eq)]
pub struct RustEnvParseError;

impl FromStr for RustEnv {
    type Err = RustEnvParseError;
    fn from_str(level: &str) -> Result<RustEnv, Self::Err> {
        match level.to_lowercase().as_str() {
            "development" => Ok(RustEnv::Development),
            "production" => Ok(RustEnv::Production),
            "staging" => Ok(RustEnv::Staging),
            _ => Err(RustEnvParseError),
        }
    }
}

impl fmt::Display for RustEnv {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            RustEnv::Development => write!(f, "development"),
            RustEnv::Production => write!(f, "production"),
            RustEnv::Staging => write!(f, "staging"),
        }
    }
}

#[derive(Clone, Debug, Parser)]
#[command(author, version, about, long_about = None)]
pub struct Config {
    /// A list of full CORS origin URLs that allowed to receive server responses.
    #[arg(
        long,
        env,
        value_delimiter = ',',
        use_value_delimiter = true,
        default_value = "http://localhost:3000,https://localhost:3000"
    )]
    pub allowed_origins: Vec<String>,

    /// Kafka bootstrap address (host:port) to consume from
    #[arg(long, env)]
    kafka_broker: Option<String>,

    /// SASL username used to authenticate against the broker
    #[arg(long, env)]
    kafka_username: Option<String>,

    /// SASL password used to authenticate against the broker
    #[arg(long, env, hide_env_values = true)]
    kafka_password: Option<String>,

    /// SASL mechanism used over the TLS connection to the broker
    #[arg(
        long,
        env,
        default_value_t = SaslMechanism::ScramSha512,
        value_parser = clap::builder::PossibleValuesParser::new([
            "SCRAM-SHA-512", "SCRAM-SHA-256", "PLAIN",
            "scram-sha-512", "scram-sha-256", "plain"
        ])
            .map(|s| s.parse::<SaslMechanism>().unwrap()),
    )]
    pub kafka_sasl_mechanism: SaslMechanism,

    /// Path to a CA bundle used to verify the broker certificates
    #[arg(long, env)]
    kafka_ssl_ca_location: Option<String>,

    /// Timeout in seconds for broker metadata requests (startup probe and attach)
    #[arg(long, env, default_value_t = 10)]
    pub kafka_metadata_timeout_secs: u64,

    /// Number of most recent messages per partition replayed to a newly connected client
    #[arg(long, env, default_value_t = 2)]
    pub start_offset_window: u32,

    /// Upper bound in seconds on the lifetime of one streaming session (at most 30 days)
    #[arg(
        long,
        env,
        default_value_t = 3600,
        value_parser = clap::value_parser!(u64).range(1..=MAX_SESSION_LIFETIME_SECS),
    )]
    pub session_max_lifetime_secs: u64,

    /// Consecutive retries of a failed broker read before the session is closed
    #[arg(long, env, default_value_t = 3)]
    pub max_read_retries: u32,

    /// Delay in milliseconds before retrying a failed broker read
    #[arg(long, env, default_value_t = 100)]
    pub read_retry_delay_ms: u64,

    /// Events buffered per session while waiting for a slow client
    #[arg(long, env, default_value_t = 16)]
    pub outbound_buffer: usize,

    /// Seconds a session may wait for a slow client before it is closed
    #[arg(long, env, default_value_t = 10)]
    pub flush_timeout_secs: u64,

    /// Interval in seconds between keep-alive comments on idle streams
    #[arg(
        long,
        env,
        default_value_t = 15,
        value_parser = clap::value_parser!(u64).range(1..=3600),
    )]
    pub keep_alive_secs: u64,

    /// The host interface to listen for incoming connections
    #[arg(short, long, env, default_value = "0.0.0.0")]
    pub interface: Option<String>,

    /// The host TCP port to listen for incoming connections
    #[arg(short, long, env, default_value_t = 8080)]
    pub port: u16,

    /// Set the log level verbosity threshold (level) to control what gets displayed on console output
    #[arg(
        short,
        long,
        env,
        default_value_t = LevelFilter::Info,
        value_parser = clap::builder::PossibleValuesParser::new(["OFF", "ERROR", "WARN", "INFO", "DEBUG", "TRACE"])
            .map(|s| s.parse::<LevelFilter>().unwrap()),
        )]
    pub log_level_filter: LevelFilter,

    /// Set the Rust runtime environment to use.
    #[arg(
    short,
    long,
    env,
    default_value_t = RustEnv::Development,
    value_parser = clap::builder::PossibleValuesParser::new([
        "DEVELOPMENT", "PRODUCTION", "STAGING",
        "development", "production", "staging"
    ])
        .map(|s| s.parse::<RustEnv>().unwrap()),
    )]
    pub runtime_env: RustEnv,
}

impl Default for Config {
    fn default() -> Self {
        Self::new()
    }
}

impl Config {
    pub fn new() -> Self {
        // Load .env file first
        dotenv().ok();
        // Then parse the command line parameters and flags
        Config::parse()
    }

    /// Validates the broker settings. Any of address, username or password missing is
    /// a startup failure.
    pub fn broker_endpoint(&self) -> Result<BrokerEndpoint, broker::Error> {
        BrokerEndpoint::new(
            self.kafka_broker.clone(),
            self.kafka_username.clone(),
            self.kafka_password.clone(),
            TransportSecurity {
                mechanism: self.kafka_sasl_mechanism,
                ca_location: self.kafka_ssl_ca_location.clone(),
            },
        )
    }

    pub fn kafka_metadata_timeout(&self) -> Duration {
        Duration::from_secs(self.kafka_metadata_timeout_secs)
    }

    pub fn session_policy(&self) -> SessionPolicy {
        SessionPolicy {
            start: StartPolicy::Tail {
                window: self.start_offset_window,
            },
            max_lifetime: Duration::from_secs(self.session_max_lifetime_secs),
            outbound_buffer: self.outbound_buffer,
            flush_timeout: Duration::from_secs(self.flush_timeout_secs),
            retry: RetryPolicy::new(
                self.max_read_retries,
                Duration::from_millis(self.read_retry_delay_ms),
            ),
            keep_alive: Duration::from_secs(self.keep_alive_secs),
        }
    }

    pub fn interface(&self) -> &str {
        self.interface.as_deref().unwrap_or("0.0.0.0")
    }

    pub fn runtime_env(&self) -> RustEnv {
        self.runtime_env.clone()
    }

    pub fn is_production(&self) -> bool {
        self.runtime_env() == RustEnv::Production
    }
}
