//! Account records, their encrypted fields, and the JSON file that holds them.

pub mod crypto;
pub mod error;
pub mod store;
pub mod types;

pub use {
    crypto::{SealedValue, TokenCipher},
    error::{Error, Result},
    store::{AccountStore, StoreDocument},
    types::{AccountIdentity, AccountRecord, AccountSecrets, AuthType},
};
