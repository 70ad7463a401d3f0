pub mod schema;

pub use schema::{
    default_config_path, ApiConfig, Config, LoggingConfig, StorageConfig, ENV_API_URL, ENV_LOG,
    ENV_TOKEN,
};
