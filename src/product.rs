//! Product records, logistics legs and retail listings.

use crate::host::{LogicalTime, Principal};
use serde::Serialize;

/// Globally unique product id. Assigned from 1 upward, never reused.
pub type ProductId = u64;

/// A manufactured item and its accumulated carbon footprint.
///
/// # Invariants
///
/// - `total_carbon_grams >= production_carbon_grams`
/// - Once `finalized == true`, `total_carbon_grams` never changes again
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Product {
    pub id: ProductId,

    /// Immutable provenance. Custody lives in the ownership registry.
    pub manufacturer: Principal,

    pub name: String,
    pub production_carbon_grams: u64,
    pub total_carbon_grams: u64,
    pub finalized: bool,
    pub created_at: LogicalTime,

    /// QR code hash, also served as the ownership token URI.
    pub qr_hash: String,
}

impl Product {
    pub fn new(
        id: ProductId,
        manufacturer: Principal,
        name: String,
        production_carbon_grams: u64,
        qr_hash: String,
        created_at: LogicalTime,
    ) -> Self {
        Product {
            id,
            manufacturer,
            name,
            production_carbon_grams,
            total_carbon_grams: production_carbon_grams,
            finalized: false,
            created_at,
            qr_hash,
        }
    }

    /// Total after adding `grams` of transport carbon, or `None` on overflow.
    pub fn total_with(&self, grams: u64) -> Option<u64> {
        self.total_carbon_grams.checked_add(grams)
    }

    /// `true` if `who` is the product's manufacturer.
    pub fn is_manufactured_by(&self, who: &Principal) -> bool {
        &self.manufacturer == who
    }
}

/// One transport leg's contribution to a product. Immutable once recorded.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LogisticsEntry {
    pub provider: Principal,
    pub transport_carbon_grams: u64,
    pub distance_km: u64,
    pub mode: String,
    pub timestamp: LogicalTime,
}

/// A retailer's disclosure of a finalized product's footprint.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RetailListing {
    pub listed_carbon_grams: u64,
    pub listed_at: LogicalTime,
    pub disclosed: bool,
}
