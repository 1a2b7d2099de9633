use clap::{builder::BoolishValueParser, Parser, ValueEnum};
use ephem_api::{Pastes, ServiceConfig, StoreConfig};
use std::path::PathBuf;

/// Log output format
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum LogFormat {
    Pretty,
    Json,
}

#[derive(Parser, Debug, Clone)]
#[command(name = "ephem-server")]
#[command(about = "Ephem paste server", long_about = None)]
pub struct ServerConfig {
    /// Host to bind to
    #[arg(long, env = "EPHEM_HOST", default_value = "127.0.0.1")]
    pub host: String,

    /// Port to listen on
    #[arg(short, long, env = "PORT", default_value = "5000")]
    pub port: u16,

    /// Directory for the paste log; pastes are kept in memory only when unset
    #[arg(short, long, env = "EPHEM_DATA_DIR", value_name = "PATH")]
    pub data_dir: Option<PathBuf>,

    /// Public base URL used to build paste links, e.g. https://paste.example.com
    #[arg(long, env = "BASE_URL")]
    pub base_url: Option<String>,

    /// Honor the x-test-now-ms request header as the current time
    #[arg(long, env = "TEST_MODE", value_parser = BoolishValueParser::new())]
    pub test_mode: bool,

    /// Skip fsync after each write
    #[arg(long, env = "EPHEM_NO_SYNC", value_parser = BoolishValueParser::new())]
    pub no_sync: bool,

    /// Reject pastes larger than this many bytes
    #[arg(long, env = "EPHEM_MAX_CONTENT_BYTES")]
    pub max_content_bytes: Option<usize>,

    /// Log output format
    #[arg(long, env = "EPHEM_LOG_FORMAT", value_enum, default_value_t = LogFormat::Pretty)]
    pub log_format: LogFormat,
}

/// Settings the request handlers need
#[derive(Debug, Clone)]
pub struct HttpSettings {
    pub base_url: Option<String>,
    pub test_mode: bool,
    pub port: u16,
}

impl Default for HttpSettings {
    fn default() -> Self {
        Self {
            base_url: None,
            test_mode: false,
            port: 5000,
        }
    }
}

impl ServerConfig {
    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    pub fn http_settings(&self) -> HttpSettings {
        HttpSettings {
            base_url: self
                .base_url
                .as_ref()
                .map(|url| url.trim_end_matches('/').to_string()),
            test_mode: self.test_mode,
            port: self.port,
        }
    }

    pub fn store_config(&self) -> StoreConfig {
        StoreConfig::default().with_sync_writes(!self.no_sync)
    }

    pub fn service_config(&self) -> ServiceConfig {
        let config = ServiceConfig::default();
        match self.max_content_bytes {
            Some(max) => config.with_max_content_bytes(max),
            None => config,
        }
    }

    /// Open the paste service this configuration describes
    pub fn build_pastes(&self) -> ephem_api::Result<Pastes> {
        let pastes = match &self.data_dir {
            Some(dir) => Pastes::open_with_config(dir, self.store_config())?,
            None => Pastes::in_memory(),
        };
        pastes.with_config(self.service_config())
    }
}
