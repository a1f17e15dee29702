use std::path::PathBuf;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// The sealed value is not `iv:tag:ciphertext` hex, or a segment has the wrong size.
    #[error("malformed ciphertext: {0}")]
    MalformedCiphertext(String),

    /// Tag verification failed: the value was tampered with or the key is wrong.
    #[error("ciphertext failed integrity check (tampered data or wrong store key)")]
    Integrity,

    #[error("encryption failed")]
    Encrypt,

    #[error("decrypted value is not valid UTF-8")]
    InvalidUtf8(#[from] std::string::FromUtf8Error),

    #[error("failed to write account store {path}: {source}")]
    Write {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("failed to serialize account store: {0}")]
    Serialize(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, Error>;
