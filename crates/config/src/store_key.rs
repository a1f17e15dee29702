use secrecy::SecretString;

/// Environment variable holding the account store passphrase.
pub const STORE_KEY_ENV: &str = "ACCOUNT_STORE_KEY";

/// Fallback passphrase used when `ACCOUNT_STORE_KEY` is unset. Anyone with this
/// source can decrypt a store sealed with it; override it in real deployments.
pub const INSECURE_DEFAULT_STORE_KEY: &str = "dev-key-change-in-production-32b";

/// Where the store passphrase came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StoreKeySource {
    Environment,
    InsecureDefault,
}

/// Resolve the store passphrase from the environment.
pub fn store_passphrase() -> (SecretString, StoreKeySource) {
    resolve_passphrase(std::env::var(STORE_KEY_ENV).ok())
}

fn resolve_passphrase(value: Option<String>) -> (SecretString, StoreKeySource) {
    match value {
        Some(v) if !v.is_empty() => (SecretString::new(v), StoreKeySource::Environment),
        _ => {
            tracing::warn!(
                env = STORE_KEY_ENV,
                "store passphrase not set, using insecure built-in default"
            );
            (
                SecretString::new(INSECURE_DEFAULT_STORE_KEY.to_string()),
                StoreKeySource::InsecureDefault,
            )
        },
    }
}

#[cfg(test)]
mod tests {
    use {super::*, secrecy::ExposeSecret};

    #[test]
    fn test_env_value_wins() {
        let (key, source) = resolve_passphrase(Some("hunter2".into()));
        assert_eq!(key.expose_secret(), "hunter2");
        assert_eq!(source, StoreKeySource::Environment);
    }

    #[test]
    fn test_unset_or_empty_falls_back() {
        for value in [None, Some(String::new())] {
            let (key, source) = resolve_passphrase(value);
            assert_eq!(key.expose_secret(), INSECURE_DEFAULT_STORE_KEY);
            assert_eq!(source, StoreKeySource::InsecureDefault);
        }
    }
}
