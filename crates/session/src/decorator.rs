//! Outbound request decoration.

use http::header::{AUTHORIZATION, HeaderName};
use http::{HeaderMap, HeaderValue};
use secondhand_core::GuestCartId;
use tracing::warn;

use crate::store::{KeyValueStorage, SessionStore};

/// Attach the guest cart id and bearer token currently in `store`.
///
/// Both values are marked sensitive. Values that cannot be sent as a header
/// are skipped.
pub fn decorate<S: KeyValueStorage>(store: &SessionStore<S>, headers: &mut HeaderMap) {
    if let Some(id) = store.guest_cart_id() {
        insert(
            headers,
            HeaderName::from_static("x-guest-cart-id"),
            &id.to_string(),
            GuestCartId::HEADER,
        );
    }
    if let Some(token) = store.token() {
        insert(
            headers,
            AUTHORIZATION,
            &format!("Bearer {}", token.expose()),
            "Authorization",
        );
    }
}

fn insert(headers: &mut HeaderMap, name: HeaderName, value: &str, label: &str) {
    match HeaderValue::from_str(value) {
        Ok(mut value) => {
            value.set_sensitive(true);
            headers.insert(name, value);
        }
        Err(e) => warn!(header = label, error = %e, "Skipping invalid header value"),
    }
}
