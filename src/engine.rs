//! Core ledger engine.
//!
//! Owns every persistent collection and routes all mutation through the
//! transition methods below. Each transition checks all of its preconditions
//! before writing anything, so a failed call leaves the ledger untouched.

use crate::command::{CommandKind, CommandRecord, ParsedCommand};
use crate::consumer::{ConsumerBudget, ConsumerOffsetAccount};
use crate::error::{LedgerError, Result};
use crate::host::{CallContext, InMemorySettlement, LogicalTime, Principal, Settlement};
use crate::mass::CarbonKg;
use crate::participant::{is_verified_as, Participant, Role};
use crate::product::{LogisticsEntry, Product, ProductId, RetailListing};
use crate::token::OwnershipRegistry;
use csv::{ReaderBuilder, Trim, WriterBuilder};
use log::{debug, info, warn};
use serde::Serialize;
use std::collections::HashMap;
use std::io::{Read, Write};

/// Default offset price per gram of CO2, in minor currency units.
pub const DEFAULT_OFFSET_RATE: u64 = 1_000_000;

/// The carbon provenance ledger.
///
/// Generic over the settlement primitive that moves funds when consumers buy
/// offsets.
pub struct CarbonLedger<S: Settlement> {
    /// Fixed identity with owner rights (verification, offset rate).
    owner: Principal,

    participants: HashMap<Principal, Participant>,
    products: HashMap<ProductId, Product>,

    /// Append-only logistics log per product. Its length is the next entry
    /// index.
    logistics: HashMap<ProductId, Vec<LogisticsEntry>>,

    listings: HashMap<(ProductId, Principal), RetailListing>,
    offsets: HashMap<Principal, ConsumerOffsetAccount>,
    budgets: HashMap<Principal, ConsumerBudget>,
    tokens: OwnershipRegistry,

    /// Next product id to assign. Starts at 1.
    next_product_id: ProductId,

    offset_rate: u64,
    settlement: S,
}

impl<S: Settlement> CarbonLedger<S> {
    /// Creates an empty ledger owned by `owner`.
    pub fn new(owner: Principal, settlement: S) -> Self {
        Self::with_offset_rate(owner, DEFAULT_OFFSET_RATE, settlement)
    }

    /// Creates an empty ledger with an initial offset rate.
    pub fn with_offset_rate(owner: Principal, offset_rate: u64, settlement: S) -> Self {
        CarbonLedger {
            owner,
            participants: HashMap::new(),
            products: HashMap::new(),
            logistics: HashMap::new(),
            listings: HashMap::new(),
            offsets: HashMap::new(),
            budgets: HashMap::new(),
            tokens: OwnershipRegistry::new(),
            next_product_id: 1,
            offset_rate,
            settlement,
        }
    }

    // ------------------------------------------------------------------
    // Identity & role registry
    // ------------------------------------------------------------------

    /// Registers the caller as an unverified participant.
    pub fn register(&mut self, ctx: &CallContext, role: Role, name: &str) -> Result<()> {
        if self.participants.contains_key(&ctx.caller) {
            return Err(LedgerError::AlreadyExists {
                kind: "participant",
                key: ctx.caller.to_string(),
            });
        }

        let participant = Participant::new(ctx.caller.clone(), role, name.to_string(), ctx.now);
        self.participants.insert(ctx.caller.clone(), participant);

        debug!("Registered {} as {} ({})", ctx.caller, role, name);
        Ok(())
    }

    /// Marks `identity` as verified. Owner only.
    pub fn verify(&mut self, ctx: &CallContext, identity: &Principal) -> Result<()> {
        self.require_owner(ctx)?;
        let participant = self
            .participants
            .get_mut(identity)
            .ok_or_else(|| LedgerError::not_found("participant", identity))?;

        participant.verify();
        info!("Verified {} as {}", identity, participant.role);
        Ok(())
    }

    /// Participant record for `identity`, if registered.
    pub fn get_participant(&self, identity: &Principal) -> Option<&Participant> {
        self.participants.get(identity)
    }

    // ------------------------------------------------------------------
    // Product lifecycle
    // ------------------------------------------------------------------

    /// Creates a product and mints its ownership token to the caller.
    ///
    /// Returns the new product id.
    pub fn create_product(
        &mut self,
        ctx: &CallContext,
        name: &str,
        production_carbon_grams: u64,
        qr_hash: &str,
    ) -> Result<ProductId> {
        match self.participants.get(&ctx.caller) {
            Some(p) if p.role == Role::Manufacturer => {
                if !p.verified {
                    return Err(LedgerError::unauthorized(&ctx.caller, "create products"));
                }
            }
            _ => {
                return Err(LedgerError::NotManufacturer {
                    caller: ctx.caller.clone(),
                })
            }
        }
        if production_carbon_grams == 0 {
            return Err(LedgerError::invalid("production carbon", "must be greater than zero"));
        }

        let id = self.next_product_id;
        let next = id
            .checked_add(1)
            .ok_or_else(|| LedgerError::invalid("product id", "counter exhausted"))?;

        self.tokens.mint(id, ctx.caller.clone(), qr_hash.to_string())?;
        self.products.insert(
            id,
            Product::new(
                id,
                ctx.caller.clone(),
                name.to_string(),
                production_carbon_grams,
                qr_hash.to_string(),
                ctx.now,
            ),
        );
        self.logistics.insert(id, Vec::new());
        self.next_product_id = next;

        debug!(
            "Created product {} '{}' for {} with {} g",
            id, name, ctx.caller, production_carbon_grams
        );
        Ok(id)
    }

    /// Appends a transport leg to an open product.
    ///
    /// Returns the entry index used.
    pub fn add_logistics_entry(
        &mut self,
        ctx: &CallContext,
        product_id: ProductId,
        transport_carbon_grams: u64,
        distance_km: u64,
        mode: &str,
    ) -> Result<u64> {
        if !is_verified_as(self.participants.get(&ctx.caller), Role::Logistics) {
            return Err(LedgerError::unauthorized(&ctx.caller, "record logistics entries"));
        }
        let product = self.product(product_id)?;
        if product.finalized {
            return Err(LedgerError::ProductFinalized { product_id });
        }
        if transport_carbon_grams == 0 {
            return Err(LedgerError::invalid("transport carbon", "must be greater than zero"));
        }
        let new_total = product
            .total_with(transport_carbon_grams)
            .ok_or_else(|| LedgerError::invalid("transport carbon", "total carbon overflows"))?;

        let log = self.logistics.entry(product_id).or_default();
        let index = log.len() as u64;
        log.push(LogisticsEntry {
            provider: ctx.caller.clone(),
            transport_carbon_grams,
            distance_km,
            mode: mode.to_string(),
            timestamp: ctx.now,
        });
        if let Some(product) = self.products.get_mut(&product_id) {
            product.total_carbon_grams = new_total;
        }

        debug!(
            "Product {}: logistics entry {} by {} adds {} g over {} km by {}, total {} g",
            product_id, index, ctx.caller, transport_carbon_grams, distance_km, mode, new_total
        );
        Ok(index)
    }

    /// Freezes a product's carbon total. Manufacturer only, exactly once.
    pub fn finalize(&mut self, ctx: &CallContext, product_id: ProductId) -> Result<()> {
        let product = self.product(product_id)?;
        if !product.is_manufactured_by(&ctx.caller) {
            return Err(LedgerError::unauthorized(&ctx.caller, "finalize this product"));
        }
        if product.finalized {
            return Err(LedgerError::ProductFinalized { product_id });
        }

        if let Some(product) = self.products.get_mut(&product_id) {
            product.finalized = true;
            debug!(
                "Finalized product {} at {} g",
                product_id, product.total_carbon_grams
            );
        }
        Ok(())
    }

    /// Product record for `product_id`, if created.
    pub fn get_product(&self, product_id: ProductId) -> Option<&Product> {
        self.products.get(&product_id)
    }

    /// Logistics entry `index` of a product, if recorded.
    pub fn get_logistics_entry(
        &self,
        product_id: ProductId,
        index: u64,
    ) -> Option<&LogisticsEntry> {
        let index = usize::try_from(index).ok()?;
        self.logistics.get(&product_id)?.get(index)
    }

    /// Number of logistics entries recorded for a product (zero if unknown).
    pub fn get_logistics_count(&self, product_id: ProductId) -> u64 {
        self.logistics
            .get(&product_id)
            .map(|log| log.len() as u64)
            .unwrap_or(0)
    }

    /// Current holder of the product's ownership token.
    pub fn get_owner(&self, product_id: ProductId) -> Option<&Principal> {
        self.tokens.owner_of(product_id)
    }

    /// Token URI of the product (its QR hash).
    pub fn get_token_uri(&self, product_id: ProductId) -> Option<&str> {
        self.tokens.uri_of(product_id)
    }

    /// Most recently assigned product id, or zero if none exist.
    pub fn get_last_token_id(&self) -> ProductId {
        self.next_product_id - 1
    }

    // ------------------------------------------------------------------
    // Retail disclosure
    // ------------------------------------------------------------------

    /// Lists a finalized product for retail, disclosing its carbon total.
    ///
    /// Listing again overwrites the caller's previous listing.
    pub fn list_for_retail(&mut self, ctx: &CallContext, product_id: ProductId) -> Result<()> {
        if !is_verified_as(self.participants.get(&ctx.caller), Role::Retailer) {
            return Err(LedgerError::unauthorized(&ctx.caller, "list products"));
        }
        let product = self.product(product_id)?;
        if !product.finalized {
            return Err(LedgerError::ProductNotFinalized { product_id });
        }

        let listing = RetailListing {
            listed_carbon_grams: product.total_carbon_grams,
            listed_at: ctx.now,
            disclosed: true,
        };
        debug!(
            "Retailer {} listed product {} at {} g",
            ctx.caller, product_id, listing.listed_carbon_grams
        );
        self.listings.insert((product_id, ctx.caller.clone()), listing);
        Ok(())
    }

    /// Listing of a product by `retailer`, if any.
    pub fn get_retail_listing(
        &self,
        product_id: ProductId,
        retailer: &Principal,
    ) -> Option<&RetailListing> {
        self.listings.get(&(product_id, retailer.clone()))
    }

    // ------------------------------------------------------------------
    // Consumer offsets & budgets
    // ------------------------------------------------------------------

    /// Buys `carbon_amount_grams` of offsets at the current rate.
    ///
    /// The cost is paid to the ledger owner through the settlement primitive.
    /// If the transfer fails nothing is recorded.
    pub fn purchase_offset(&mut self, ctx: &CallContext, carbon_amount_grams: u64) -> Result<()> {
        if carbon_amount_grams == 0 {
            return Err(LedgerError::invalid("offset amount", "must be greater than zero"));
        }
        let cost = u128::from(carbon_amount_grams) * u128::from(self.offset_rate);
        let updated = self
            .offsets
            .get(&ctx.caller)
            .copied()
            .unwrap_or_default()
            .after_purchase(carbon_amount_grams, cost)
            .ok_or_else(|| LedgerError::invalid("offset amount", "offset totals overflow"))?;

        self.settlement
            .transfer(cost, &ctx.caller, &self.owner)
            .map_err(|failure| LedgerError::TransferFailed {
                amount: cost,
                reason: failure.reason,
            })?;
        self.offsets.insert(ctx.caller.clone(), updated);

        debug!(
            "{} bought {} g of offsets for {}",
            ctx.caller, carbon_amount_grams, cost
        );
        Ok(())
    }

    /// Sets the caller's budget and restarts its period with zero usage.
    pub fn set_carbon_budget(
        &mut self,
        ctx: &CallContext,
        monthly_budget_grams: u64,
    ) -> Result<()> {
        if monthly_budget_grams == 0 {
            return Err(LedgerError::invalid("monthly budget", "must be greater than zero"));
        }

        self.budgets.insert(
            ctx.caller.clone(),
            ConsumerBudget::new(monthly_budget_grams, ctx.now),
        );
        debug!(
            "{} set a budget of {} g starting at {}",
            ctx.caller, monthly_budget_grams, ctx.now
        );
        Ok(())
    }

    /// Adds a finalized product's carbon total to the caller's usage.
    ///
    /// Usage is not capped by the budget.
    pub fn track_purchase(&mut self, ctx: &CallContext, product_id: ProductId) -> Result<()> {
        let product = self.product(product_id)?;
        if !product.finalized {
            return Err(LedgerError::ProductNotFinalized { product_id });
        }
        let grams = product.total_carbon_grams;
        let budget = self
            .budgets
            .get_mut(&ctx.caller)
            .ok_or_else(|| LedgerError::not_found("budget", &ctx.caller))?;
        let usage = budget
            .usage_with(grams)
            .ok_or_else(|| LedgerError::invalid("usage", "budget usage overflows"))?;

        budget.current_usage_grams = usage;
        if budget.is_over_budget() {
            debug!(
                "{} is over budget: {} of {} g",
                ctx.caller, usage, budget.monthly_budget_grams
            );
        }
        Ok(())
    }

    /// Changes the offset price per gram. Owner only.
    pub fn set_offset_rate(&mut self, ctx: &CallContext, new_rate: u64) -> Result<()> {
        self.require_owner(ctx)?;
        if new_rate == 0 {
            return Err(LedgerError::invalid("offset rate", "must be greater than zero"));
        }

        info!("Offset rate changed from {} to {}", self.offset_rate, new_rate);
        self.offset_rate = new_rate;
        Ok(())
    }

    /// Offset totals bought by `identity`, if any.
    pub fn get_consumer_offsets(&self, identity: &Principal) -> Option<&ConsumerOffsetAccount> {
        self.offsets.get(identity)
    }

    /// Current budget declared by `identity`, if any.
    pub fn get_consumer_budget(&self, identity: &Principal) -> Option<&ConsumerBudget> {
        self.budgets.get(identity)
    }

    /// Offset price per gram, in minor currency units.
    pub fn get_offset_rate(&self) -> u64 {
        self.offset_rate
    }

    // ------------------------------------------------------------------
    // Ownership token transfer
    // ------------------------------------------------------------------

    /// Moves custody of a product's token. The caller must be `from`.
    pub fn transfer_ownership(
        &mut self,
        ctx: &CallContext,
        product_id: ProductId,
        from: &Principal,
        to: &Principal,
    ) -> Result<()> {
        if &ctx.caller != from {
            return Err(LedgerError::unauthorized(&ctx.caller, "transfer on behalf of another"));
        }
        self.tokens.transfer(product_id, from, to.clone())?;

        debug!("Product {} custody moved from {} to {}", product_id, from, to);
        Ok(())
    }

    // ------------------------------------------------------------------
    // Helpers
    // ------------------------------------------------------------------

    /// The fixed owner identity.
    pub fn owner(&self) -> &Principal {
        &self.owner
    }

    pub fn settlement(&self) -> &S {
        &self.settlement
    }

    pub fn settlement_mut(&mut self) -> &mut S {
        &mut self.settlement
    }

    fn require_owner(&self, ctx: &CallContext) -> Result<()> {
        if ctx.caller != self.owner {
            return Err(LedgerError::OwnerOnly {
                caller: ctx.caller.clone(),
            });
        }
        Ok(())
    }

    fn product(&self, product_id: ProductId) -> Result<&Product> {
        self.products
            .get(&product_id)
            .ok_or_else(|| LedgerError::not_found("product", product_id))
    }

    /// Writes the product report as CSV, sorted by product id.
    pub fn write_products<W: Write>(&self, writer: W) -> Result<()> {
        let mut csv_writer = WriterBuilder::new().has_headers(false).from_writer(writer);

        csv_writer.write_record([
            "product",
            "name",
            "manufacturer",
            "owner",
            "production_g",
            "total_g",
            "total_kg",
            "finalized",
            "logistics_entries",
        ])?;

        let mut products: Vec<_> = self.products.values().collect();
        products.sort_by_key(|p| p.id);

        for product in products {
            csv_writer.serialize(ProductRow {
                product: product.id,
                name: &product.name,
                manufacturer: &product.manufacturer,
                owner: self.tokens.owner_of(product.id).unwrap_or(&product.manufacturer),
                production_g: product.production_carbon_grams,
                total_g: product.total_carbon_grams,
                total_kg: CarbonKg::from_grams(product.total_carbon_grams),
                finalized: product.finalized,
                logistics_entries: self.get_logistics_count(product.id),
            })?;
        }

        csv_writer.flush()?;
        Ok(())
    }

    /// Writes the consumer report as CSV, sorted by identity.
    ///
    /// Covers every identity holding an offset account or a budget.
    pub fn write_consumers<W: Write>(&self, writer: W) -> Result<()> {
        let mut csv_writer = WriterBuilder::new().has_headers(false).from_writer(writer);

        csv_writer.write_record([
            "consumer",
            "total_offset_g",
            "total_spent",
            "budget_g",
            "usage_g",
            "period_start",
        ])?;

        let mut consumers: Vec<&Principal> =
            self.offsets.keys().chain(self.budgets.keys()).collect();
        consumers.sort();
        consumers.dedup();

        for consumer in consumers {
            let offsets = self.offsets.get(consumer).copied().unwrap_or_default();
            let budget = self.budgets.get(consumer);
            csv_writer.serialize(ConsumerRow {
                consumer,
                total_offset_g: offsets.total_offset_grams,
                total_spent: offsets.total_spent,
                budget_g: budget.map(|b| b.monthly_budget_grams),
                usage_g: budget.map(|b| b.current_usage_grams),
                period_start: budget.map(|b| b.period_start),
            })?;
        }

        csv_writer.flush()?;
        Ok(())
    }
}

impl CarbonLedger<InMemorySettlement> {
    /// Replays calls from a CSV reader in streaming fashion.
    ///
    /// Records are read one at a time. Malformed records and failing calls
    /// are logged at warn level and skipped.
    pub fn process_csv<R: Read>(&mut self, reader: R) -> Result<()> {
        let mut csv_reader = ReaderBuilder::new()
            .trim(Trim::All)
            .flexible(true)
            .from_reader(reader);

        let mut clock: LogicalTime = 0;
        for (row_idx, result) in csv_reader.deserialize::<CommandRecord>().enumerate() {
            let row_num = row_idx + 2; // 1-indexed, accounting for header row

            let record = match result {
                Ok(record) => record,
                Err(e) => {
                    warn!("Row {}: CSV parse error: {}", row_num, e);
                    continue;
                }
            };
            if record.time < clock {
                warn!(
                    "Row {}: logical time {} is before {}, ignoring",
                    row_num, record.time, clock
                );
                continue;
            }

            match record.parse(row_num) {
                Ok(command) => {
                    clock = record.time;
                    if let Err(e) = self.apply(command) {
                        warn!("Row {}: {}", row_num, e);
                    }
                }
                Err(e) => warn!("Row {}: {}", row_num, e),
            }
        }

        Ok(())
    }

    /// Dispatches a single parsed command.
    fn apply(&mut self, command: ParsedCommand) -> Result<()> {
        let ctx = &command.ctx;
        match command.kind {
            CommandKind::Register { role, name } => self.register(ctx, role, &name),
            CommandKind::Verify { identity } => self.verify(ctx, &identity),
            CommandKind::CreateProduct {
                name,
                production_carbon_grams,
                qr_hash,
            } => self
                .create_product(ctx, &name, production_carbon_grams, &qr_hash)
                .map(|_| ()),
            CommandKind::AddLogistics {
                product_id,
                transport_carbon_grams,
                distance_km,
                mode,
            } => self
                .add_logistics_entry(ctx, product_id, transport_carbon_grams, distance_km, &mode)
                .map(|_| ()),
            CommandKind::Finalize { product_id } => self.finalize(ctx, product_id),
            CommandKind::ListForRetail { product_id } => self.list_for_retail(ctx, product_id),
            CommandKind::Fund { amount } => {
                self.settlement.credit(&ctx.caller, amount);
                debug!("Credited {} with {}", ctx.caller, amount);
                Ok(())
            }
            CommandKind::PurchaseOffset {
                carbon_amount_grams,
            } => self.purchase_offset(ctx, carbon_amount_grams),
            CommandKind::SetBudget {
                monthly_budget_grams,
            } => self.set_carbon_budget(ctx, monthly_budget_grams),
            CommandKind::TrackPurchase { product_id } => self.track_purchase(ctx, product_id),
            CommandKind::SetOffsetRate { rate } => self.set_offset_rate(ctx, rate),
            CommandKind::Transfer {
                product_id,
                from,
                to,
            } => self.transfer_ownership(ctx, product_id, &from, &to),
        }
    }
}

#[derive(Serialize)]
struct ProductRow<'a> {
    product: ProductId,
    name: &'a str,
    manufacturer: &'a Principal,
    owner: &'a Principal,
    production_g: u64,
    total_g: u64,
    total_kg: CarbonKg,
    finalized: bool,
    logistics_entries: u64,
}

#[derive(Serialize)]
struct ConsumerRow<'a> {
    consumer: &'a Principal,
    total_offset_g: u64,
    total_spent: u128,
    budget_g: Option<u64>,
    usage_g: Option<u64>,
    period_start: Option<LogicalTime>,
}
