//! Persistent client-side session state.
//!
//! [`KeyValueStorage`] abstracts the browser's local storage. [`SessionStore`]
//! is the typed view over it used by the reconciler. Storage failures never
//! escape the store: reads degrade to "absent", writes to no-ops, and both
//! are logged.

use std::collections::HashMap;

use secondhand_core::{GuestCartId, SessionToken, TokenError};
use tracing::{debug, warn};

use crate::error::StorageError;
use crate::scroll::ScrollMemory;

/// Storage keys shared with the server-rendered pages.
pub mod keys {
    pub const TOKEN: &str = "jwtToken";
    pub const GUEST_CART_ID: &str = "guestCartId";
    pub const SCROLL_RESTORATION: &str = "scrollRestoration";
}

/// A string key/value store.
pub trait KeyValueStorage {
    /// Read the value stored under `key`.
    ///
    /// # Errors
    ///
    /// Returns a [`StorageError`] if the backend cannot be read.
    fn get(&self, key: &str) -> Result<Option<String>, StorageError>;

    /// Store `value` under `key`.
    ///
    /// # Errors
    ///
    /// Returns a [`StorageError`] if the backend rejects the write.
    fn set(&mut self, key: &str, value: &str) -> Result<(), StorageError>;

    /// Delete `key`. Deleting a missing key succeeds.
    ///
    /// # Errors
    ///
    /// Returns a [`StorageError`] if the backend rejects the write.
    fn remove(&mut self, key: &str) -> Result<(), StorageError>;
}

/// In-memory storage used by tests and the replay tool.
///
/// Can be switched into a failing mode to mimic disabled browser storage.
#[derive(Debug, Clone, Default)]
pub struct MemoryStorage {
    entries: HashMap<String, String>,
    failing: bool,
}

impl MemoryStorage {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Pre-populate an entry.
    #[must_use]
    pub fn with_entry(mut self, key: &str, value: &str) -> Self {
        self.entries.insert(key.to_string(), value.to_string());
        self
    }

    /// Make every subsequent operation fail.
    pub fn set_failing(&mut self, failing: bool) {
        self.failing = failing;
    }

    /// Raw entry lookup that ignores the failing flag.
    #[must_use]
    pub fn peek(&self, key: &str) -> Option<&str> {
        self.entries.get(key).map(String::as_str)
    }

    fn check(&self) -> Result<(), StorageError> {
        if self.failing {
            return Err(StorageError::Unavailable("storage disabled".to_string()));
        }
        Ok(())
    }
}

impl KeyValueStorage for MemoryStorage {
    fn get(&self, key: &str) -> Result<Option<String>, StorageError> {
        self.check()?;
        Ok(self.entries.get(key).cloned())
    }

    fn set(&mut self, key: &str, value: &str) -> Result<(), StorageError> {
        self.check()?;
        self.entries.insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn remove(&mut self, key: &str) -> Result<(), StorageError> {
        self.check()?;
        self.entries.remove(key);
        Ok(())
    }
}

/// Typed access to the token, guest cart id and scroll memory.
#[derive(Debug, Clone)]
pub struct SessionStore<S> {
    backend: S,
}

impl<S: KeyValueStorage> SessionStore<S> {
    pub const fn new(backend: S) -> Self {
        Self { backend }
    }

    // =========================================================================
    // Token
    // =========================================================================

    /// The stored token entry, if there is one.
    ///
    /// A blank entry yields `Some(Err(TokenError::Empty))` so callers can
    /// tell a corrupt entry from an absent one.
    pub fn token_entry(&self) -> Option<Result<SessionToken, TokenError>> {
        self.read(keys::TOKEN).map(SessionToken::new)
    }

    /// The stored token, treating blank entries as absent.
    pub fn token(&self) -> Option<SessionToken> {
        self.token_entry().and_then(Result::ok)
    }

    pub fn set_token(&mut self, token: &SessionToken) {
        self.write(keys::TOKEN, token.expose());
    }

    pub fn clear_token(&mut self) {
        self.delete(keys::TOKEN);
    }

    // =========================================================================
    // Guest cart
    // =========================================================================

    /// The stored guest cart id. Unparsable entries are treated as absent.
    pub fn guest_cart_id(&self) -> Option<GuestCartId> {
        let raw = self.read(keys::GUEST_CART_ID)?;
        match GuestCartId::parse(&raw) {
            Ok(id) => Some(id),
            Err(e) => {
                warn!(error = %e, "Ignoring stored guest cart id");
                None
            }
        }
    }

    pub fn set_guest_cart_id(&mut self, id: GuestCartId) {
        self.write(keys::GUEST_CART_ID, &id.to_string());
    }

    pub fn clear_guest_cart_id(&mut self) {
        self.delete(keys::GUEST_CART_ID);
    }

    // =========================================================================
    // Scroll memory
    // =========================================================================

    /// The stored scroll memory.
    ///
    /// # Errors
    ///
    /// Returns the JSON error if the stored entry is corrupt.
    pub fn scroll_memory(&self) -> Result<Option<ScrollMemory>, serde_json::Error> {
        self.read(keys::SCROLL_RESTORATION)
            .map(|raw| serde_json::from_str(&raw))
            .transpose()
    }

    pub fn set_scroll_memory(&mut self, memory: &ScrollMemory) {
        match serde_json::to_string(memory) {
            Ok(raw) => self.write(keys::SCROLL_RESTORATION, &raw),
            Err(e) => warn!(error = %e, "Failed to encode scroll memory"),
        }
    }

    pub fn clear_scroll_memory(&mut self) {
        self.delete(keys::SCROLL_RESTORATION);
    }

    // =========================================================================
    // Backend
    // =========================================================================

    pub const fn backend(&self) -> &S {
        &self.backend
    }

    pub fn into_backend(self) -> S {
        self.backend
    }

    fn read(&self, key: &str) -> Option<String> {
        match self.backend.get(key) {
            Ok(value) => value,
            Err(e) => {
                warn!(key, error = %e, "Storage read failed");
                None
            }
        }
    }

    fn write(&mut self, key: &str, value: &str) {
        if let Err(e) = self.backend.set(key, value) {
            warn!(key, error = %e, "Storage write failed");
        } else {
            debug!(key, "Stored");
        }
    }

    fn delete(&mut self, key: &str) {
        if let Err(e) = self.backend.remove(key) {
            warn!(key, error = %e, "Storage delete failed");
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn store() -> SessionStore<MemoryStorage> {
        SessionStore::new(MemoryStorage::new())
    }

    #[test]
    fn test_token_roundtrip() {
        let mut store = store();
        assert!(store.token().is_none());

        let token = SessionToken::new("a.b.c").unwrap();
        store.set_token(&token);
        assert_eq!(store.token(), Some(token));
        assert_eq!(store.backend().peek(keys::TOKEN), Some("a.b.c"));

        store.clear_token();
        assert!(store.token().is_none());
        assert!(store.token_entry().is_none());
    }

    #[test]
    fn test_blank_token_entry_is_reported() {
        let store = SessionStore::new(MemoryStorage::new().with_entry(keys::TOKEN, "  "));
        assert_eq!(store.token_entry(), Some(Err(TokenError::Empty)));
        assert!(store.token().is_none());
    }

    #[test]
    fn test_guest_cart_id_garbage_is_absent() {
        let store =
            SessionStore::new(MemoryStorage::new().with_entry(keys::GUEST_CART_ID, "not-a-uuid"));
        assert!(store.guest_cart_id().is_none());
    }

    #[test]
    fn test_guest_cart_id_roundtrip() {
        let mut store = store();
        let id = GuestCartId::random();
        store.set_guest_cart_id(id);
        assert_eq!(store.guest_cart_id(), Some(id));
        store.clear_guest_cart_id();
        assert!(store.guest_cart_id().is_none());
    }

    #[test]
    fn test_scroll_memory_corrupt_entry() {
        let store =
            SessionStore::new(MemoryStorage::new().with_entry(keys::SCROLL_RESTORATION, "{oops"));
        assert!(store.scroll_memory().is_err());
    }

    #[test]
    fn test_failing_backend_degrades() {
        let mut backend = MemoryStorage::new().with_entry(keys::TOKEN, "a.b.c");
        backend.set_failing(true);
        let mut store = SessionStore::new(backend);

        assert!(store.token().is_none());
        store.set_token(&SessionToken::new("x.y.z").unwrap());
        store.clear_token();

        // Nothing changed underneath.
        assert_eq!(store.backend().peek(keys::TOKEN), Some("a.b.c"));
    }
}
