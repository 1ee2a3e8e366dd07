//! Command models for CSV replay and their typed representation.

use crate::error::{LedgerError, Result};
use crate::host::{CallContext, LogicalTime, Principal};
use crate::participant::Role;
use crate::product::ProductId;
use serde::Deserialize;
use std::str::FromStr;

/// Raw command record as read from CSV.
///
/// Positional arguments are kept as strings because their meaning depends on
/// `op`; trailing ones may be absent.
#[derive(Debug, Deserialize)]
pub struct CommandRecord {
    /// Operation name, e.g. `create_product`
    pub op: String,

    /// Invoking identity
    pub caller: String,

    /// Logical clock value at which the call runs
    pub time: LogicalTime,

    pub arg1: Option<String>,
    pub arg2: Option<String>,
    pub arg3: Option<String>,
    pub arg4: Option<String>,
}

impl CommandRecord {
    /// Parses the raw CSV record into a typed command.
    ///
    /// `row` is only used for error reporting.
    pub fn parse(&self, row: usize) -> Result<ParsedCommand> {
        let caller = self.caller.trim();
        if caller.is_empty() {
            return Err(invalid(row, "empty caller"));
        }

        let op = self.op.trim().to_lowercase();
        let kind = match op.as_str() {
            "register" => CommandKind::Register {
                role: Role::from_str(self.text(row, 1, "role")?)?,
                name: self.text(row, 2, "name")?.to_string(),
            },
            "verify" => CommandKind::Verify {
                identity: Principal::new(self.text(row, 1, "identity")?),
            },
            "create_product" => CommandKind::CreateProduct {
                name: self.text(row, 1, "name")?.to_string(),
                production_carbon_grams: self.number(row, 2, "production grams")?,
                qr_hash: self.text(row, 3, "qr hash")?.to_string(),
            },
            "add_logistics" => CommandKind::AddLogistics {
                product_id: self.number(row, 1, "product id")?,
                transport_carbon_grams: self.number(row, 2, "transport grams")?,
                distance_km: self.number(row, 3, "distance km")?,
                mode: self.text(row, 4, "mode")?.to_string(),
            },
            "finalize" => CommandKind::Finalize {
                product_id: self.number(row, 1, "product id")?,
            },
            "list_retail" => CommandKind::ListForRetail {
                product_id: self.number(row, 1, "product id")?,
            },
            "fund" => CommandKind::Fund {
                amount: self.number(row, 1, "amount")?,
            },
            "purchase_offset" => CommandKind::PurchaseOffset {
                carbon_amount_grams: self.number(row, 1, "grams")?,
            },
            "set_budget" => CommandKind::SetBudget {
                monthly_budget_grams: self.number(row, 1, "monthly grams")?,
            },
            "track_purchase" => CommandKind::TrackPurchase {
                product_id: self.number(row, 1, "product id")?,
            },
            "set_offset_rate" => CommandKind::SetOffsetRate {
                rate: self.number(row, 1, "rate")?,
            },
            "transfer" => CommandKind::Transfer {
                product_id: self.number(row, 1, "product id")?,
                from: Principal::new(self.text(row, 2, "from")?),
                to: Principal::new(self.text(row, 3, "to")?),
            },
            other => return Err(invalid(row, format!("unknown op '{}'", other))),
        };

        Ok(ParsedCommand {
            ctx: CallContext::new(caller, self.time),
            kind,
        })
    }

    fn arg(&self, position: usize) -> Option<&str> {
        let raw = match position {
            1 => self.arg1.as_deref(),
            2 => self.arg2.as_deref(),
            3 => self.arg3.as_deref(),
            4 => self.arg4.as_deref(),
            _ => None,
        };
        raw.map(str::trim).filter(|s| !s.is_empty())
    }

    fn text(&self, row: usize, position: usize, label: &str) -> Result<&str> {
        self.arg(position)
            .ok_or_else(|| invalid(row, format!("missing {}", label)))
    }

    fn number<T: FromStr>(&self, row: usize, position: usize, label: &str) -> Result<T> {
        let raw = self.text(row, position, label)?;
        raw.parse()
            .map_err(|_| invalid(row, format!("{} '{}' is not a valid number", label, raw)))
    }
}

fn invalid(row: usize, message: impl Into<String>) -> LedgerError {
    LedgerError::InvalidRecord {
        row,
        message: message.into(),
    }
}

/// A parsed command ready for dispatch.
#[derive(Debug, Clone)]
pub struct ParsedCommand {
    /// Caller and logical time of the call
    pub ctx: CallContext,

    /// Operation with its arguments
    pub kind: CommandKind,
}

/// Command variants with associated arguments.
#[derive(Debug, Clone)]
pub enum CommandKind {
    Register {
        role: Role,
        name: String,
    },
    Verify {
        identity: Principal,
    },
    CreateProduct {
        name: String,
        production_carbon_grams: u64,
        qr_hash: String,
    },
    AddLogistics {
        product_id: ProductId,
        transport_carbon_grams: u64,
        distance_km: u64,
        mode: String,
    },
    Finalize {
        product_id: ProductId,
    },
    ListForRetail {
        product_id: ProductId,
    },

    /// Credits the caller in the settlement book. Not a ledger operation.
    Fund {
        amount: u128,
    },

    PurchaseOffset {
        carbon_amount_grams: u64,
    },
    SetBudget {
        monthly_budget_grams: u64,
    },
    TrackPurchase {
        product_id: ProductId,
    },
    SetOffsetRate {
        rate: u64,
    },
    Transfer {
        product_id: ProductId,
        from: Principal,
        to: Principal,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(op: &str, args: &[&str]) -> CommandRecord {
        let arg = |i: usize| args.get(i).map(|s| s.to_string());
        CommandRecord {
            op: op.to_string(),
            caller: "maker".to_string(),
            time: 5,
            arg1: arg(0),
            arg2: arg(1),
            arg3: arg(2),
            arg4: arg(3),
        }
    }

    #[test]
    fn test_parse_create_product() {
        let parsed = record("create_product", &["Shoe", "5000", "qr1"])
            .parse(2)
            .unwrap();

        assert_eq!(parsed.ctx.caller, Principal::from("maker"));
        assert_eq!(parsed.ctx.now, 5);
        match parsed.kind {
            CommandKind::CreateProduct {
                name,
                production_carbon_grams,
                qr_hash,
            } => {
                assert_eq!(name, "Shoe");
                assert_eq!(production_carbon_grams, 5000);
                assert_eq!(qr_hash, "qr1");
            }
            _ => panic!("Expected CreateProduct"),
        }
    }

    #[test]
    fn test_parse_add_logistics() {
        let parsed = record("add_logistics", &["1", "2000", "300", "truck"])
            .parse(2)
            .unwrap();
        match parsed.kind {
            CommandKind::AddLogistics {
                product_id,
                transport_carbon_grams,
                distance_km,
                mode,
            } => {
                assert_eq!(product_id, 1);
                assert_eq!(transport_carbon_grams, 2000);
                assert_eq!(distance_km, 300);
                assert_eq!(mode, "truck");
            }
            _ => panic!("Expected AddLogistics"),
        }
    }

    #[test]
    fn test_parse_handles_whitespace_and_case() {
        let parsed = record("  Register ", &[" 1 ", "  Acme  "]).parse(2).unwrap();
        match parsed.kind {
            CommandKind::Register { role, name } => {
                assert_eq!(role, Role::Manufacturer);
                assert_eq!(name, "Acme");
            }
            _ => panic!("Expected Register"),
        }
    }

    #[test]
    fn test_parse_rejects_unknown_op() {
        let err = record("mint", &["1"]).parse(7).unwrap_err();
        match err {
            LedgerError::InvalidRecord { row, message } => {
                assert_eq!(row, 7);
                assert!(message.contains("unknown op"));
            }
            other => panic!("unexpected error {other:?}"),
        }
    }

    #[test]
    fn test_parse_rejects_missing_argument() {
        let err = record("transfer", &["1", "maker"]).parse(3).unwrap_err();
        assert!(matches!(err, LedgerError::InvalidRecord { row: 3, .. }));
    }

    #[test]
    fn test_parse_rejects_non_numeric_argument() {
        let err = record("finalize", &["one"]).parse(2).unwrap_err();
        assert!(matches!(err, LedgerError::InvalidRecord { .. }));
    }

    #[test]
    fn test_parse_rejects_invalid_role() {
        let err = record("register", &["9", "Nobody"]).parse(2).unwrap_err();
        assert!(matches!(err, LedgerError::InvalidRole(_)));
    }

    #[test]
    fn test_parse_rejects_empty_caller() {
        let mut rec = record("finalize", &["1"]);
        rec.caller = "   ".to_string();
        assert!(matches!(
            rec.parse(2),
            Err(LedgerError::InvalidRecord { .. })
        ));
    }
}
