pub mod client;
pub mod error;
pub mod types;

pub use {
    client::{DEFAULT_API_BASE, HttpProviderClient, ProviderClient},
    error::{ProviderError, Result},
    types::{CreatedPost, UserInfo},
};
