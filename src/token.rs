//! Ownership tokens: one transferable custody certificate per product.

use crate::error::{LedgerError, Result};
use crate::host::Principal;
use crate::product::ProductId;
use std::collections::HashMap;

#[derive(Debug, Clone)]
struct Token {
    owner: Principal,
    uri: String,
}

/// Registry of ownership tokens keyed by product id.
///
/// Each product id is minted at most once and has exactly one owner at a
/// time.
#[derive(Debug, Default)]
pub struct OwnershipRegistry {
    tokens: HashMap<ProductId, Token>,
}

impl OwnershipRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Mints the token for `id` to `owner`.
    pub fn mint(&mut self, id: ProductId, owner: Principal, uri: String) -> Result<()> {
        if self.tokens.contains_key(&id) {
            return Err(LedgerError::AlreadyExists {
                kind: "token",
                key: id.to_string(),
            });
        }
        self.tokens.insert(id, Token { owner, uri });
        Ok(())
    }

    /// Current holder of the token for `id`.
    pub fn owner_of(&self, id: ProductId) -> Option<&Principal> {
        self.tokens.get(&id).map(|t| &t.owner)
    }

    /// Token URI (the product's QR hash).
    pub fn uri_of(&self, id: ProductId) -> Option<&str> {
        self.tokens.get(&id).map(|t| t.uri.as_str())
    }

    /// Checks that `from` currently holds the token for `id`.
    pub fn check_holder(&self, id: ProductId, from: &Principal) -> Result<()> {
        let token = self
            .tokens
            .get(&id)
            .ok_or_else(|| LedgerError::not_found("token", id))?;
        if &token.owner != from {
            return Err(LedgerError::NotTokenOwner {
                product_id: id,
                claimed: from.clone(),
            });
        }
        Ok(())
    }

    /// Moves the token for `id` from `from` to `to`.
    pub fn transfer(&mut self, id: ProductId, from: &Principal, to: Principal) -> Result<()> {
        self.check_holder(id, from)?;
        if let Some(token) = self.tokens.get_mut(&id) {
            token.owner = to;
        }
        Ok(())
    }
}
