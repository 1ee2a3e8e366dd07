//! Collaborators supplied by the hosting environment.
//!
//! The ledger never authenticates callers or keeps time itself. Each call
//! arrives with a [`CallContext`] naming the caller and the current logical
//! time, and value movement is delegated to a [`Settlement`] implementation.

use serde::Serialize;
use std::collections::HashMap;
use std::fmt;
use thiserror::Error;

/// Logical clock value (e.g. block height). Non-decreasing across calls.
pub type LogicalTime = u64;

/// Opaque caller identity.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(transparent)]
pub struct Principal(String);

impl Principal {
    /// Creates a principal from any string-like identifier.
    pub fn new(id: impl Into<String>) -> Self {
        Principal(id.into())
    }

    /// Returns the identifier as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Principal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for Principal {
    fn from(id: &str) -> Self {
        Principal::new(id)
    }
}

impl From<String> for Principal {
    fn from(id: String) -> Self {
        Principal(id)
    }
}

/// Identity and clock reading for a single call.
#[derive(Debug, Clone)]
pub struct CallContext {
    /// The invoking identity.
    pub caller: Principal,

    /// Logical time at which the call executes.
    pub now: LogicalTime,
}

impl CallContext {
    pub fn new(caller: impl Into<Principal>, now: LogicalTime) -> Self {
        CallContext {
            caller: caller.into(),
            now,
        }
    }
}

/// Failure reported by the settlement primitive.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("{reason}")]
pub struct SettlementFailure {
    pub reason: String,
}

impl SettlementFailure {
    pub fn new(reason: impl Into<String>) -> Self {
        SettlementFailure {
            reason: reason.into(),
        }
    }
}

/// Atomic funds-transfer primitive.
///
/// A transfer either moves the full `amount` or reports failure and leaves
/// every balance untouched.
pub trait Settlement {
    fn transfer(
        &mut self,
        amount: u128,
        from: &Principal,
        to: &Principal,
    ) -> std::result::Result<(), SettlementFailure>;
}

/// Balance book keyed by principal.
///
/// Used by the CLI to stand in for the real payment rail.
#[derive(Debug, Default, Clone)]
pub struct InMemorySettlement {
    balances: HashMap<Principal, u128>,
}

impl InMemorySettlement {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds `amount` to the balance of `who`. Saturates at `u128::MAX`.
    pub fn credit(&mut self, who: &Principal, amount: u128) {
        let balance = self.balances.entry(who.clone()).or_insert(0);
        *balance = balance.saturating_add(amount);
    }

    /// Current balance of `who` (zero if never credited).
    pub fn balance_of(&self, who: &Principal) -> u128 {
        self.balances.get(who).copied().unwrap_or(0)
    }
}

impl Settlement for InMemorySettlement {
    fn transfer(
        &mut self,
        amount: u128,
        from: &Principal,
        to: &Principal,
    ) -> std::result::Result<(), SettlementFailure> {
        let available = self.balance_of(from);
        if available < amount {
            return Err(SettlementFailure::new(format!(
                "insufficient funds: {} holds {}, needs {}",
                from, available, amount
            )));
        }
        if from == to {
            return Ok(());
        }
        let credited = self
            .balance_of(to)
            .checked_add(amount)
            .ok_or_else(|| SettlementFailure::new(format!("balance overflow for {}", to)))?;

        self.balances.insert(from.clone(), available - amount);
        self.balances.insert(to.clone(), credited);
        Ok(())
    }
}
