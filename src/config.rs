//! Runtime configuration for the ledger binary.
//!
//! Defaults can be overridden with environment variables:
//!
//! - `CARBON_LEDGER_OWNER`: identity holding owner rights
//! - `CARBON_LEDGER_OFFSET_RATE`: initial offset price per gram (minor units)

use crate::engine::DEFAULT_OFFSET_RATE;
use crate::error::{LedgerError, Result};
use crate::host::Principal;

pub const OWNER_ENV: &str = "CARBON_LEDGER_OWNER";
pub const OFFSET_RATE_ENV: &str = "CARBON_LEDGER_OFFSET_RATE";

/// Settings fixed when a ledger is created.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LedgerConfig {
    pub owner: Principal,
    pub offset_rate: u64,
}

impl Default for LedgerConfig {
    fn default() -> Self {
        LedgerConfig {
            owner: Principal::from("owner"),
            offset_rate: DEFAULT_OFFSET_RATE,
        }
    }
}

impl LedgerConfig {
    /// Loads the configuration from the process environment.
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Builds the configuration from an arbitrary variable lookup.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = LedgerConfig::default();

        if let Some(owner) = lookup(OWNER_ENV) {
            let owner = owner.trim();
            if owner.is_empty() {
                return Err(LedgerError::Config(format!("{} is empty", OWNER_ENV)));
            }
            config.owner = Principal::new(owner);
        }

        if let Some(raw) = lookup(OFFSET_RATE_ENV) {
            let rate: u64 = raw.trim().parse().map_err(|_| {
                LedgerError::Config(format!("{} '{}' is not a number", OFFSET_RATE_ENV, raw))
            })?;
            if rate == 0 {
                return Err(LedgerError::Config(format!(
                    "{} must be greater than zero",
                    OFFSET_RATE_ENV
                )));
            }
            config.offset_rate = rate;
        }

        Ok(config)
    }
}
