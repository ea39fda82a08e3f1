use std::path::PathBuf;

use crate::error::Result;
pub use clap::Parser;
use movies_app::{
    poster::{PosterPolicy, DEFAULT_MAX_POSTER_BYTES},
    state::AppConfig,
};
use url::Url;

#[derive(Debug, Clone, clap::Parser)]
pub struct ServerConfig {
    #[arg(
        short,
        long,
        default_value_t = 3000,
        env = "MOVIES_LISTEN_PORT",
        help = "Port to listen on"
    )]
    pub port: u16,
    #[arg(
        short,
        long,
        default_value = "127.0.0.1",
        env = "MOVIES_LISTEN_ADDRESS",
        help = "Address to listen on"
    )]
    pub listen_address: String,

    #[arg(
        long,
        env = "MOVIES_BASE_URL",
        default_value = "http://localhost:3000",
        help = "Base URL of server, as visible to users"
    )]
    pub base_url: Url,

    #[arg(
        long,
        env = "MOVIES_DATABASE_URL",
        help = "Database URL e.g. sqlite://file.db, default is sqlite://[data-dir]/movies.db, where data-dir is set by --data-dir"
    )]
    database_url: Option<String>,

    #[arg(
        long,
        env = "MOVIES_DATA_DIR",
        help = "Data directory (database), default is system default like ~/.local/share/movies",
        default_value_os_t = default_data_dir()
    )]
    data_dir: PathBuf,

    #[arg(
        long,
        env = "MOVIES_UPLOAD_LIMIT_MB",
        default_value = "10",
        help = "Maximum size of submitted form in MB"
    )]
    pub upload_limit_mb: usize,

    #[arg(
        long,
        env = "MOVIES_MAX_POSTER_BYTES",
        default_value_t = DEFAULT_MAX_POSTER_BYTES,
        help = "Maximum size of poster image in bytes"
    )]
    pub max_poster_bytes: u64,

    #[arg(
        long,
        env = "MOVIES_POSTER_EXTENSIONS",
        default_value = "jpg,png",
        value_delimiter = ',',
        help = "Allowed poster file extensions"
    )]
    pub poster_extensions: Vec<String>,

    #[arg(long, env = "MOVIES_CORS", help = "Enable permissive CORS")]
    pub cors: bool,
}

fn default_data_dir() -> PathBuf {
    dirs::data_dir()
        .map(|p| p.join("movies"))
        .unwrap_or_else(|| PathBuf::from("movies"))
}

impl ServerConfig {
    pub fn load() -> Result<Self> {
        ServerConfig::try_parse().map_err(|e| e.into())
    }

    pub fn data_dir(&self) -> PathBuf {
        self.data_dir.clone()
    }

    pub fn database_url(&self) -> String {
        self.database_url
            .clone()
            .unwrap_or_else(|| format!("sqlite://{}/movies.db", self.data_dir.display()))
    }

    pub fn poster_policy(&self) -> PosterPolicy {
        PosterPolicy::new(&self.poster_extensions, self.max_poster_bytes)
    }
}

impl From<&ServerConfig> for AppConfig {
    fn from(config: &ServerConfig) -> Self {
        AppConfig {
            upload_limit_mb: config.upload_limit_mb,
            poster_policy: config.poster_policy(),
        }
    }
}
