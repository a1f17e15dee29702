use std::path::{Path, PathBuf};

use {
    serde_json::{Value, json},
    tracing::{debug, warn},
};

use crate::{AccountRecord, Error, Result};

/// A store entry that did not parse as an [`AccountRecord`]. Kept verbatim and
/// written back near its original position.
#[derive(Debug, Clone, PartialEq)]
struct PreservedEntry {
    index: usize,
    raw: Value,
}

impl PreservedEntry {
    fn id(&self) -> Option<&str> {
        self.raw.get("id").and_then(Value::as_str)
    }
}

/// In-memory form of the store document: `{ "accounts": [ ... ] }`.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct StoreDocument {
    pub accounts: Vec<AccountRecord>,
    preserved: Vec<PreservedEntry>,
}

impl From<Vec<AccountRecord>> for StoreDocument {
    fn from(accounts: Vec<AccountRecord>) -> Self {
        Self {
            accounts,
            preserved: Vec::new(),
        }
    }
}

impl StoreDocument {
    /// Parse a raw document. A file that is not a store degrades to an empty
    /// store; entries that are not readable records are carried through untouched.
    pub fn parse(raw: &str) -> Self {
        let value: Value = match serde_json::from_str(raw) {
            Ok(v) => v,
            Err(e) => {
                if !raw.trim().is_empty() {
                    warn!(error = %e, "account store is not valid JSON, treating as empty");
                }
                return Self::default();
            },
        };

        let Some(entries) = value.get("accounts").and_then(Value::as_array) else {
            warn!("account store has no accounts array, treating as empty");
            return Self::default();
        };

        let mut doc = Self::default();
        for (index, entry) in entries.iter().enumerate() {
            match serde_json::from_value(entry.clone()) {
                Ok(record) => doc.accounts.push(record),
                Err(e) => {
                    warn!(index, error = %e, "keeping unreadable account record as-is");
                    doc.preserved.push(PreservedEntry {
                        index,
                        raw: entry.clone(),
                    });
                },
            }
        }
        doc
    }

    /// Serialize back to the on-disk shape, re-inserting preserved entries.
    pub fn to_json(&self) -> Result<String> {
        let mut entries = self
            .accounts
            .iter()
            .map(serde_json::to_value)
            .collect::<serde_json::Result<Vec<Value>>>()?;
        for entry in &self.preserved {
            let at = entry.index.min(entries.len());
            entries.insert(at, entry.raw.clone());
        }
        Ok(serde_json::to_string_pretty(&json!({ "accounts": entries }))?)
    }

    /// Insert a record, replacing any existing entry with the same id, readable
    /// or not. The new record always ends up last among the readable records.
    pub fn upsert(&mut self, record: AccountRecord) {
        self.accounts.retain(|existing| existing.id != record.id);
        self.preserved
            .retain(|entry| entry.id() != Some(record.id.as_str()));
        self.accounts.push(record);
    }

    /// Remove the record matching an id or username. Returns the removed record.
    pub fn remove(&mut self, key: &str) -> Option<AccountRecord> {
        let index = self.accounts.iter().position(|a| a.matches(key))?;
        Some(self.accounts.remove(index))
    }

    /// Find a record by id or username, or the first record when `key` is `None`.
    pub fn select(&self, key: Option<&str>) -> Option<&AccountRecord> {
        match key {
            Some(key) => self.accounts.iter().find(|a| a.matches(key)),
            None => self.accounts.first(),
        }
    }

    /// True when there is no readable record.
    pub fn is_empty(&self) -> bool {
        self.accounts.is_empty()
    }

    /// Entries kept verbatim because they did not parse as records.
    pub fn unreadable_count(&self) -> usize {
        self.preserved.len()
    }
}

/// JSON file holding every connected account.
///
/// Reads never fail: a missing or corrupt file behaves like a first run. Writes
/// overwrite the whole file and are not atomic.
#[derive(Debug, Clone)]
pub struct AccountStore {
    path: PathBuf,
}

impl AccountStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn read(&self) -> StoreDocument {
        match std::fs::read_to_string(&self.path) {
            Ok(raw) => StoreDocument::parse(&raw),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                debug!(path = %self.path.display(), "account store not found, starting empty");
                StoreDocument::default()
            },
            Err(e) => {
                warn!(path = %self.path.display(), error = %e, "failed to read account store, treating as empty");
                StoreDocument::default()
            },
        }
    }

    pub fn write(&self, doc: &StoreDocument) -> Result<()> {
        let json = doc.to_json()?;
        let io_err = |source: std::io::Error| Error::Write {
            path: self.path.clone(),
            source,
        };

        if let Some(parent) = self.path.parent()
            && !parent.as_os_str().is_empty()
        {
            std::fs::create_dir_all(parent).map_err(io_err)?;
        }
        std::fs::write(&self.path, json).map_err(io_err)?;

        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            std::fs::set_permissions(&self.path, std::fs::Permissions::from_mode(0o600))
                .map_err(io_err)?;
        }

        debug!(path = %self.path.display(), accounts = doc.accounts.len(), "wrote account store");
        Ok(())
    }

    /// Read, insert-or-replace by id, write.
    pub fn upsert(&self, record: AccountRecord) -> Result<()> {
        let mut doc = self.read();
        doc.upsert(record);
        self.write(&doc)
    }

    /// Read, remove by id or username, write if something was removed.
    pub fn remove(&self, key: &str) -> Result<Option<AccountRecord>> {
        let mut doc = self.read();
        let removed = doc.remove(key);
        if removed.is_some() {
            self.write(&doc)?;
        }
        Ok(removed)
    }
}

#[cfg(test)]
mod tests {
    use {super::*, crate::AuthType, serde_json::Map};

    fn record(id: &str, username: &str) -> AccountRecord {
        AccountRecord {
            id: id.into(),
            username: username.into(),
            display_name: format!("{username} display"),
            auth_type: AuthType::OAuth2,
            encrypted_access_token: Some("aa:bb:cc".into()),
            encrypted_refresh_token: None,
            encrypted_client_id: None,
            expires_at: None,
            verified: true,
            added_at: None,
            extra: Map::new(),
        }
    }

    #[test]
    fn test_missing_empty_and_invalid_files_read_empty() {
        let tmp = tempfile::tempdir().unwrap();

        let missing = AccountStore::new(tmp.path().join("missing.json"));
        assert!(missing.read().is_empty());

        let empty_path = tmp.path().join("empty.json");
        std::fs::write(&empty_path, "").unwrap();
        assert!(AccountStore::new(&empty_path).read().is_empty());

        let invalid_path = tmp.path().join("invalid.json");
        std::fs::write(&invalid_path, r#"{"not":"valid"}"#).unwrap();
        assert!(AccountStore::new(&invalid_path).read().is_empty());
    }

    #[test]
    fn test_non_array_accounts_and_garbage_read_empty() {
        for raw in [r#"{"accounts": {}}"#, r#"{"accounts": null}"#, "[1,2", "null", "[]"] {
            assert!(StoreDocument::parse(raw).is_empty(), "{raw}");
        }
    }

    #[test]
    fn test_unreadable_entries_are_kept_aside() {
        let raw = r#"{"accounts": [
            {"id": "1", "username": "a", "name": "A", "authType": "oauth2"},
            {"unexpected": true},
            {"id": "2", "username": "b", "name": "B", "authType": "oauth2"}
        ]}"#;
        let doc = StoreDocument::parse(raw);
        let ids: Vec<&str> = doc.accounts.iter().map(|a| a.id.as_str()).collect();
        assert_eq!(ids, vec!["1", "2"]);
        assert_eq!(doc.unreadable_count(), 1);

        let written: Value = serde_json::from_str(&doc.to_json().unwrap()).unwrap();
        assert_eq!(written["accounts"][1], json!({"unexpected": true}));
        assert_eq!(written["accounts"].as_array().unwrap().len(), 3);
    }

    #[test]
    fn test_upsert_keeps_unreadable_neighbours() {
        let tmp = tempfile::tempdir().unwrap();
        let store = AccountStore::new(tmp.path().join("accounts.json"));
        let legacy = json!({
            "id": "1",
            "username": "legacy",
            "name": "Legacy",
            "displayName": "Legacy Display",
            "authType": "oauth2",
            "encryptedAccessToken": "00:11:22",
            "verified": true
        });
        let bearer = json!({
            "id": "2",
            "username": "bearer",
            "authType": "bearer",
            "encryptedBearerToken": "aa:bb:cc"
        });
        let no_type = json!({"id": "4", "username": "untyped"});
        let original = json!({ "accounts": [legacy.clone(), bearer.clone(), no_type.clone()] });
        std::fs::write(store.path(), original.to_string()).unwrap();

        store.upsert(record("3", "new")).unwrap();

        let written: Value =
            serde_json::from_str(&std::fs::read_to_string(store.path()).unwrap()).unwrap();
        let entries = written["accounts"].as_array().unwrap();
        assert_eq!(entries.len(), 4);
        assert_eq!(entries[0], legacy);
        assert_eq!(entries[1], bearer);
        assert_eq!(entries[2], no_type);
        assert_eq!(entries[3]["id"], "3");
    }

    #[test]
    fn test_upsert_replaces_unreadable_entry_with_same_id() {
        let mut doc = StoreDocument::parse(
            r#"{"accounts": [{"id": "7", "username": "old", "authType": "bearer"}]}"#,
        );
        assert_eq!(doc.unreadable_count(), 1);
        doc.upsert(record("7", "fresh"));
        assert_eq!(doc.unreadable_count(), 0);

        let written: Value = serde_json::from_str(&doc.to_json().unwrap()).unwrap();
        assert_eq!(written["accounts"].as_array().unwrap().len(), 1);
        assert_eq!(written["accounts"][0]["username"], "fresh");
    }

    #[test]
    fn test_unknown_record_keys_survive_file_rewrite() {
        let tmp = tempfile::tempdir().unwrap();
        let store = AccountStore::new(tmp.path().join("accounts.json"));
        std::fs::write(
            store.path(),
            r#"{"accounts": [{
                "id": "1",
                "username": "keeper",
                "name": "Keeper",
                "authType": "oauth1",
                "encryptedApiKey": "aa:bb:cc",
                "tags": ["news", "ops"]
            }]}"#,
        )
        .unwrap();

        store.upsert(record("2", "other")).unwrap();
        store.remove("other").unwrap();

        let written: Value =
            serde_json::from_str(&std::fs::read_to_string(store.path()).unwrap()).unwrap();
        let kept = &written["accounts"][0];
        assert_eq!(kept["encryptedApiKey"], "aa:bb:cc");
        assert_eq!(kept["tags"], json!(["news", "ops"]));
        assert_eq!(kept["authType"], "oauth1");
        assert_eq!(written["accounts"].as_array().unwrap().len(), 1);
    }

    #[test]
    fn test_upsert_replaces_same_id() {
        let mut doc = StoreDocument::default();
        doc.upsert(record("1", "first"));
        doc.upsert(record("2", "second"));

        let mut replacement = record("1", "renamed");
        replacement.verified = false;
        doc.upsert(replacement);

        let with_id: Vec<_> = doc.accounts.iter().filter(|a| a.id == "1").collect();
        assert_eq!(with_id.len(), 1);
        assert_eq!(with_id[0].username, "renamed");
        assert!(!with_id[0].verified);
        assert_eq!(doc.accounts.len(), 2);
        assert_eq!(doc.accounts.last().unwrap().id, "1");
    }

    #[test]
    fn test_write_then_read_through_file() {
        let tmp = tempfile::tempdir().unwrap();
        let store = AccountStore::new(tmp.path().join("nested/dir/accounts.json"));
        store.upsert(record("1", "one")).unwrap();
        store.upsert(record("2", "two")).unwrap();
        store.upsert(record("1", "uno")).unwrap();

        let doc = store.read();
        assert_eq!(doc.accounts.len(), 2);
        assert_eq!(doc.accounts[0].id, "2");
        assert_eq!(doc.accounts[1].username, "uno");

        let raw = std::fs::read_to_string(store.path()).unwrap();
        assert!(raw.contains("\n  \"accounts\""), "pretty-printed: {raw}");
    }

    #[cfg(unix)]
    #[test]
    fn test_write_restricts_permissions() {
        use std::os::unix::fs::PermissionsExt;

        let tmp = tempfile::tempdir().unwrap();
        let store = AccountStore::new(tmp.path().join("accounts.json"));
        store.write(&StoreDocument::default()).unwrap();
        let mode = std::fs::metadata(store.path()).unwrap().permissions().mode();
        assert_eq!(mode & 0o777, 0o600);
    }

    #[test]
    fn test_select_and_remove() {
        let tmp = tempfile::tempdir().unwrap();
        let store = AccountStore::new(tmp.path().join("accounts.json"));
        store.upsert(record("1", "one")).unwrap();
        store.upsert(record("2", "two")).unwrap();

        let doc = store.read();
        assert_eq!(doc.select(None).unwrap().id, "1");
        assert_eq!(doc.select(Some("@two")).unwrap().id, "2");
        assert!(doc.select(Some("three")).is_none());

        assert_eq!(store.remove("two").unwrap().unwrap().id, "2");
        assert!(store.remove("two").unwrap().is_none());
        assert_eq!(store.read().accounts.len(), 1);
    }
}
