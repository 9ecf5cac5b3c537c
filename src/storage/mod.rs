use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::Rc;
use thiserror::Error;

pub(crate) const TOKEN_KEY: &str = "token";
pub(crate) const USERNAME_KEY: &str = "username";

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StorageError {
    #[error("local storage is not available in this context")]
    Unavailable,
    #[error("failed to write `{key}` to local storage: {message}")]
    Write { key: String, message: String },
    #[error("failed to read `{key}` from local storage: {message}")]
    Read { key: String, message: String },
}

/// Minimal string key-value storage, shaped after `window.localStorage`.
pub trait KeyValueStorage {
    fn get(&self, key: &str) -> Result<Option<String>, StorageError>;
    fn set(&self, key: &str, value: &str) -> Result<(), StorageError>;
    fn remove(&self, key: &str) -> Result<(), StorageError>;
}

/// `window.localStorage`. Only usable inside a browser.
#[derive(Clone, Copy, Debug, Default)]
pub struct BrowserStorage;

impl BrowserStorage {
    fn storage() -> Result<web_sys::Storage, StorageError> {
        web_sys::window()
            .and_then(|w| w.local_storage().ok().flatten())
            .ok_or(StorageError::Unavailable)
    }
}

impl KeyValueStorage for BrowserStorage {
    fn get(&self, key: &str) -> Result<Option<String>, StorageError> {
        Self::storage()?
            .get_item(key)
            .map_err(|e| StorageError::Read {
                key: key.to_string(),
                message: format!("{e:?}"),
            })
    }

    fn set(&self, key: &str, value: &str) -> Result<(), StorageError> {
        Self::storage()?
            .set_item(key, value)
            .map_err(|e| StorageError::Write {
                key: key.to_string(),
                message: format!("{e:?}"),
            })
    }

    fn remove(&self, key: &str) -> Result<(), StorageError> {
        Self::storage()?
            .remove_item(key)
            .map_err(|e| StorageError::Write {
                key: key.to_string(),
                message: format!("{e:?}"),
            })
    }
}

/// In-process storage. Clones share the same map, so a clone can play the
/// role of "the same browser profile" across a simulated reload.
#[derive(Clone, Debug, Default)]
pub struct MemoryStorage {
    items: Rc<RefCell<HashMap<String, String>>>,
}

impl MemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }
}

impl KeyValueStorage for MemoryStorage {
    fn get(&self, key: &str) -> Result<Option<String>, StorageError> {
        Ok(self.items.borrow().get(key).cloned())
    }

    fn set(&self, key: &str, value: &str) -> Result<(), StorageError> {
        self.items
            .borrow_mut()
            .insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<(), StorageError> {
        self.items.borrow_mut().remove(key);
        Ok(())
    }
}

#[derive(Clone, PartialEq, Eq, Debug)]
pub struct StoredCredentials {
    pub token: String,
    pub username: String,
}

/// Persists the session token and username across reloads.
///
/// The token is opaque; nothing here inspects it.
#[derive(Clone, Debug)]
pub struct CredentialStore<S> {
    storage: S,
}

impl<S: KeyValueStorage> CredentialStore<S> {
    pub fn new(storage: S) -> Self {
        Self { storage }
    }

    /// Writes both entries. If the username write fails the token write is
    /// undone, so callers never observe half a credential pair.
    pub fn save(&self, token: &str, username: &str) -> Result<(), StorageError> {
        self.storage.set(TOKEN_KEY, token)?;
        if let Err(e) = self.storage.set(USERNAME_KEY, username) {
            let _ = self.storage.remove(TOKEN_KEY);
            return Err(e);
        }
        Ok(())
    }

    pub fn clear(&self) -> Result<(), StorageError> {
        let token = self.storage.remove(TOKEN_KEY);
        let username = self.storage.remove(USERNAME_KEY);
        token.and(username)
    }

    /// Returns the stored pair only if both halves are present.
    pub fn load(&self) -> Option<StoredCredentials> {
        let read = |key: &str| match self.storage.get(key) {
            Ok(v) => v.filter(|s| !s.trim().is_empty()),
            Err(e) => {
                log::warn!("{e}");
                None
            }
        };

        Some(StoredCredentials {
            token: read(TOKEN_KEY)?,
            username: read(USERNAME_KEY)?,
        })
    }
}


// WASM-only tests (run with `cargo test --target wasm32-unknown-unknown` + wasm-bindgen-test-runner)
#[cfg(all(test, target_arch = "wasm32"))]
mod wasm_tests {
    use super::*;
    use wasm_bindgen_test::*;

    wasm_bindgen_test_configure!(run_in_browser);

    #[wasm_bindgen_test]
    fn test_browser_credentials_roundtrip() {
        let store = CredentialStore::new(BrowserStorage);
        store.clear().expect("clear");
        assert!(store.load().is_none());

        store.save("t1", "alice").expect("save");
        let loaded = store.load().expect("credentials should load from localStorage");
        assert_eq!(loaded.token, "t1");
        assert_eq!(loaded.username, "alice");

        store.clear().expect("clear");
        assert!(store.load().is_none());
    }
}
