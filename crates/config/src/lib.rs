pub mod loader;
pub mod schema;
pub mod store_key;

use std::path::PathBuf;

pub use {
    loader::{discover_config_path, load_config, load_config_file},
    schema::{BirdhouseConfig, CallbackConfig, ProviderConfig, StoreConfig},
    store_key::{INSECURE_DEFAULT_STORE_KEY, STORE_KEY_ENV, StoreKeySource, store_passphrase},
};

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("failed to read config {path}: {source}")]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("invalid config {path}: {source}")]
    Parse {
        path: PathBuf,
        source: toml::de::Error,
    },
}

pub type Result<T> = std::result::Result<T, Error>;
