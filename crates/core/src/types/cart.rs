//! Guest cart types.

use core::fmt;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Errors that can occur when parsing a [`GuestCartId`].
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
#[error("invalid guest cart id: {0}")]
pub struct GuestCartIdError(String);

/// Identifier of an anonymous shopping cart.
///
/// The server mints these as UUIDs and reads them back from the
/// `X-Guest-Cart-Id` request header.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct GuestCartId(Uuid);

impl GuestCartId {
    /// Request header carrying the guest cart id.
    pub const HEADER: &'static str = "X-Guest-Cart-Id";

    /// Wrap an existing UUID.
    #[must_use]
    pub const fn new(id: Uuid) -> Self {
        Self(id)
    }

    /// Mint a fresh random id.
    #[must_use]
    pub fn random() -> Self {
        Self(Uuid::new_v4())
    }

    /// Parse a guest cart id from its hyphenated string form.
    ///
    /// # Errors
    ///
    /// Returns an error if the input is not a UUID.
    pub fn parse(s: &str) -> Result<Self, GuestCartIdError> {
        Uuid::parse_str(s.trim())
            .map(Self)
            .map_err(|_| GuestCartIdError(s.to_string()))
    }

    /// Get the underlying UUID.
    #[must_use]
    pub const fn as_uuid(&self) -> &Uuid {
        &self.0
    }
}

impl fmt::Display for GuestCartId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl std::str::FromStr for GuestCartId {
    type Err = GuestCartIdError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

/// Cart summary pushed by the server after cart mutations.
///
/// Field names follow the `updateCartCount` trigger payload. Prices are in
/// minor currency units.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct CartSnapshot {
    /// Number of items in the cart.
    #[serde(rename = "newCount", default)]
    pub count: u32,
    /// Cart total in minor units.
    #[serde(rename = "newCartTotalPrice", default)]
    pub total_price: i64,
    /// Guest cart id minted or confirmed by the server, if any.
    #[serde(
        rename = "newGuestCartId",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub guest_cart_id: Option<GuestCartId>,
}

impl CartSnapshot {
    /// An empty cart.
    #[must_use]
    pub const fn empty() -> Self {
        Self {
            count: 0,
            total_price: 0,
            guest_cart_id: None,
        }
    }
}
