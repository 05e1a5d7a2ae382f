use crate::services::identity_client::TokenSet;
use secrecy::ExposeSecret;
use std::collections::HashMap;
use std::sync::{Arc, Mutex};

pub const ID_TOKEN_KEY: &str = "idToken";
pub const ACCESS_TOKEN_KEY: &str = "accessToken";
pub const REFRESH_TOKEN_KEY: &str = "refreshToken";

/// Key/value store scoped to one client session.
pub trait SessionStorage: Send + Sync {
    fn get(&self, key: &str) -> Option<String>;
    fn set(&self, key: &str, value: String);
    fn clear(&self);
}

/// Session storage that lives as long as the process.
#[derive(Default)]
pub struct MemorySessionStorage {
    values: Mutex<HashMap<String, String>>,
}

impl MemorySessionStorage {
    pub fn new() -> Self {
        Self::default()
    }

    fn values(&self) -> std::sync::MutexGuard<'_, HashMap<String, String>> {
        self.values.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

impl SessionStorage for MemorySessionStorage {
    fn get(&self, key: &str) -> Option<String> {
        self.values().get(key).cloned()
    }

    fn set(&self, key: &str, value: String) {
        self.values().insert(key.to_string(), value);
    }

    fn clear(&self) {
        self.values().clear();
    }
}

/// Token persistence on top of a [`SessionStorage`].
#[derive(Clone)]
pub struct Session {
    storage: Arc<dyn SessionStorage>,
}

impl Session {
    pub fn new(storage: Arc<dyn SessionStorage>) -> Self {
        Self { storage }
    }

    pub fn in_memory() -> Self {
        Self::new(Arc::new(MemorySessionStorage::new()))
    }

    pub fn save_tokens(&self, tokens: &TokenSet) {
        self.storage
            .set(ID_TOKEN_KEY, tokens.id_token.expose_secret().clone());
        self.storage
            .set(ACCESS_TOKEN_KEY, tokens.access_token.expose_secret().clone());
        if let Some(refresh) = &tokens.refresh_token {
            self.storage
                .set(REFRESH_TOKEN_KEY, refresh.expose_secret().clone());
        }
    }

    pub fn id_token(&self) -> Option<String> {
        self.storage.get(ID_TOKEN_KEY)
    }

    pub fn access_token(&self) -> Option<String> {
        self.storage.get(ACCESS_TOKEN_KEY)
    }

    pub fn refresh_token(&self) -> Option<String> {
        self.storage.get(REFRESH_TOKEN_KEY)
    }

    /// Both tokens needed to resume a session are present.
    pub fn has_tokens(&self) -> bool {
        self.id_token().is_some() && self.access_token().is_some()
    }

    pub fn clear(&self) {
        self.storage.clear();
    }
}
