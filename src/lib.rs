//! # Carbon Ledger
//!
//! An authorization-gated ledger that records the carbon footprint of
//! products as they move from manufacture through logistics to retail, and
//! lets consumers buy offsets and track usage against a personal budget.
//!
//! ## Design Principles
//!
//! - **Validate, then commit**: every operation checks all preconditions
//!   before writing, so a failed call leaves no partial state
//! - **Capabilities, not hierarchies**: role-gated operations check a
//!   participant's role tag and verification flag
//! - **Provenance vs custody**: a product's manufacturer never changes, its
//!   ownership token can be transferred
//! - **Host-supplied context**: caller identity, logical time and funds
//!   transfer come from the environment
//!
//! ## Example
//!
//! ```
//! use carbon_ledger::{CallContext, CarbonLedger, InMemorySettlement, Principal, Role};
//!
//! let mut ledger = CarbonLedger::new(Principal::from("owner"), InMemorySettlement::new());
//! ledger.register(&CallContext::new("maker", 1), Role::Manufacturer, "Acme").unwrap();
//! ledger.verify(&CallContext::new("owner", 2), &Principal::from("maker")).unwrap();
//!
//! let id = ledger
//!     .create_product(&CallContext::new("maker", 3), "Shoe", 5000, "qr1")
//!     .unwrap();
//! assert_eq!(id, 1);
//! assert_eq!(ledger.get_product(id).unwrap().total_carbon_grams, 5000);
//! ```

pub mod command;
pub mod config;
pub mod consumer;
pub mod engine;
pub mod error;
pub mod host;
pub mod mass;
pub mod participant;
pub mod product;
pub mod token;

pub use command::{CommandKind, CommandRecord, ParsedCommand};
pub use config::LedgerConfig;
pub use consumer::{ConsumerBudget, ConsumerOffsetAccount};
pub use engine::{CarbonLedger, DEFAULT_OFFSET_RATE};
pub use error::{LedgerError, Result};
pub use host::{
    CallContext, InMemorySettlement, LogicalTime, Principal, Settlement, SettlementFailure,
};
pub use mass::CarbonKg;
pub use participant::{Participant, Role};
pub use product::{LogisticsEntry, Product, ProductId, RetailListing};
pub use token::OwnershipRegistry;
