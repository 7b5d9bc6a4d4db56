//! Session state for the auth client.
//!
//! The access token lives only in process memory. The refresh token and the
//! last known user record are mirrored into durable storage, so a fresh process
//! sees a "logged-in looking" user without a bearer token until the first API
//! call goes through a refresh cycle. Token material is held as `SecretString`
//! and must never be logged.

pub mod storage;

use crate::error::{Error, Result};
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::{
    collections::BTreeSet,
    sync::{PoisonError, RwLock},
};
use storage::DurableStorage;
use tracing::{debug, warn};

pub const REFRESH_TOKEN_KEY: &str = "refreshToken";
pub const USER_KEY: &str = "user";

/// User record returned by the auth API and mirrored into storage.
#[derive(Clone, Debug, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct UserRecord {
    pub id: Value,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub first_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_name: Option<String>,
    #[serde(default)]
    pub email_verified: bool,
    #[serde(default)]
    pub roles: BTreeSet<String>,
    /// Profile fields this client does not interpret.
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl UserRecord {
    #[must_use]
    pub fn has_role(&self, role: &str) -> bool {
        self.roles.contains(role)
    }
}

pub struct SessionStore {
    access_token: RwLock<Option<SecretString>>,
    storage: Box<dyn DurableStorage>,
}

impl SessionStore {
    pub fn new(storage: impl DurableStorage + 'static) -> Self {
        Self {
            access_token: RwLock::new(None),
            storage: Box::new(storage),
        }
    }

    /// Stores the access token in memory and persists the refresh token.
    /// An absent refresh token leaves the stored one untouched.
    /// # Errors
    /// Returns `Error::Storage` if the refresh token cannot be persisted.
    pub fn set_session(
        &self,
        access_token: Option<SecretString>,
        refresh_token: Option<SecretString>,
    ) -> Result<()> {
        self.set_access_token(access_token);

        match refresh_token {
            Some(token) => self
                .storage
                .set_item(REFRESH_TOKEN_KEY, token.expose_secret()),
            None => {
                debug!("session update without refresh token, keeping stored value");
                Ok(())
            }
        }
    }

    /// Replaces only the in-memory access token.
    pub fn set_access_token(&self, access_token: Option<SecretString>) {
        let mut current = self
            .access_token
            .write()
            .unwrap_or_else(PoisonError::into_inner);
        *current = access_token;
    }

    /// Wipes the access token and the durable refresh token and user record.
    /// Safe to call repeatedly.
    /// # Errors
    /// Returns `Error::Storage` if a durable key cannot be removed; the
    /// in-memory token is cleared regardless.
    pub fn clear_session(&self) -> Result<()> {
        self.set_access_token(None);

        let refresh = self.storage.remove_item(REFRESH_TOKEN_KEY);
        let user = self.storage.remove_item(USER_KEY);
        refresh.and(user)
    }

    #[must_use]
    pub fn current_access_token(&self) -> Option<SecretString> {
        self.access_token
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Reads the refresh token from durable storage.
    #[must_use]
    pub fn current_refresh_token(&self) -> Option<SecretString> {
        match self.storage.get_item(REFRESH_TOKEN_KEY) {
            Ok(token) => token.filter(|t| !t.is_empty()).map(SecretString::from),
            Err(err) => {
                warn!("failed to read refresh token: {}", err);
                None
            }
        }
    }

    /// Replaces the stored user record wholesale.
    /// # Errors
    /// Returns `Error::Storage` if the record cannot be encoded or persisted.
    pub fn set_user(&self, user: &UserRecord) -> Result<()> {
        let encoded = serde_json::to_string(user)
            .map_err(|err| Error::Storage(format!("failed to encode user: {err}")))?;
        self.storage.set_item(USER_KEY, &encoded)
    }

    /// # Errors
    /// Returns `Error::Storage` if the durable record cannot be removed.
    pub fn clear_user(&self) -> Result<()> {
        self.storage.remove_item(USER_KEY)
    }

    /// Rehydrates the last known user record from durable storage.
    #[must_use]
    pub fn current_user(&self) -> Option<UserRecord> {
        let raw = match self.storage.get_item(USER_KEY) {
            Ok(raw) => raw?,
            Err(err) => {
                warn!("failed to read user record: {}", err);
                return None;
            }
        };

        match serde_json::from_str(&raw) {
            Ok(user) => Some(user),
            Err(err) => {
                warn!("ignoring malformed user record: {}", err);
                None
            }
        }
    }

    /// A session counts as authenticated while a user record is present,
    /// whether or not an access token is currently held.
    #[must_use]
    pub fn is_authenticated(&self) -> bool {
        self.current_user().is_some()
    }

    #[must_use]
    pub fn roles(&self) -> BTreeSet<String> {
        self.current_user().map(|user| user.roles).unwrap_or_default()
    }
}

#[cfg(test)]
mod tests {
    use super::storage::MemoryStorage;
    use super::*;
    use serde_json::json;
    use std::sync::Arc;

    /// Storage handle shared with the store so tests can inspect raw keys.
    #[derive(Clone, Default)]
    struct SharedStorage(Arc<MemoryStorage>);

    impl DurableStorage for SharedStorage {
        fn get_item(&self, key: &str) -> Result<Option<String>> {
            self.0.get_item(key)
        }
        fn set_item(&self, key: &str, value: &str) -> Result<()> {
            self.0.set_item(key, value)
        }
        fn remove_item(&self, key: &str) -> Result<()> {
            self.0.remove_item(key)
        }
    }

    fn secret(value: &str) -> SecretString {
        SecretString::from(value.to_string())
    }

    fn exposed(token: Option<SecretString>) -> Option<String> {
        token.map(|t| t.expose_secret().to_string())
    }

    fn admin() -> UserRecord {
        serde_json::from_value(json!({
            "id": 7,
            "email": "ada@example.com",
            "firstName": "Ada",
            "lastName": "Lovelace",
            "emailVerified": true,
            "roles": ["ROLE_USER", "ROLE_ADMIN"],
            "department": "engines"
        }))
        .unwrap()
    }

    #[test]
    fn set_session_then_read_back() {
        let store = SessionStore::new(MemoryStorage::new());
        store
            .set_session(Some(secret("a1")), Some(secret("r1")))
            .unwrap();

        assert_eq!(exposed(store.current_access_token()), Some("a1".into()));
        assert_eq!(exposed(store.current_refresh_token()), Some("r1".into()));
    }

    #[test]
    fn set_session_without_refresh_keeps_stored_token() {
        let store = SessionStore::new(MemoryStorage::new());
        store
            .set_session(Some(secret("a1")), Some(secret("r1")))
            .unwrap();
        store.set_session(Some(secret("a2")), None).unwrap();

        assert_eq!(exposed(store.current_access_token()), Some("a2".into()));
        assert_eq!(exposed(store.current_refresh_token()), Some("r1".into()));
    }

    #[test]
    fn access_token_is_never_persisted() {
        let storage = SharedStorage::default();
        let store = SessionStore::new(storage.clone());
        store
            .set_session(Some(secret("a1")), Some(secret("r1")))
            .unwrap();
        store.set_user(&admin()).unwrap();

        let reloaded = SessionStore::new(storage.clone());
        assert!(reloaded.current_access_token().is_none());
        assert_eq!(exposed(reloaded.current_refresh_token()), Some("r1".into()));
        assert_eq!(reloaded.current_user(), Some(admin()));
        assert!(reloaded.is_authenticated());
    }

    #[test]
    fn clear_session_is_idempotent() {
        let storage = SharedStorage::default();
        let store = SessionStore::new(storage.clone());
        store
            .set_session(Some(secret("a1")), Some(secret("r1")))
            .unwrap();
        store.set_user(&admin()).unwrap();

        store.clear_session().unwrap();
        store.clear_session().unwrap();

        assert!(store.current_access_token().is_none());
        assert!(store.current_refresh_token().is_none());
        assert!(store.current_user().is_none());
        assert_eq!(storage.get_item(REFRESH_TOKEN_KEY).unwrap(), None);
        assert_eq!(storage.get_item(USER_KEY).unwrap(), None);
    }

    #[test]
    fn user_record_keeps_unknown_profile_fields() {
        let user = admin();
        assert!(user.has_role("ROLE_ADMIN"));
        assert_eq!(user.extra.get("department"), Some(&json!("engines")));

        let store = SessionStore::new(MemoryStorage::new());
        store.set_user(&user).unwrap();
        assert_eq!(store.roles(), user.roles);
    }

    #[test]
    fn malformed_user_record_is_ignored() {
        let storage = SharedStorage::default();
        storage.set_item(USER_KEY, "not json").unwrap();

        let store = SessionStore::new(storage);
        assert!(store.current_user().is_none());
        assert!(!store.is_authenticated());
        assert!(store.roles().is_empty());
    }

    #[test]
    fn empty_refresh_token_reads_as_absent() {
        let storage = SharedStorage::default();
        storage.set_item(REFRESH_TOKEN_KEY, "").unwrap();

        let store = SessionStore::new(storage);
        assert!(store.current_refresh_token().is_none());
    }
}
