//! Consumer offset accounts and advisory carbon budgets.

use crate::host::LogicalTime;
use serde::Serialize;

/// Running totals of offsets a consumer has bought.
///
/// Both fields only ever grow.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct ConsumerOffsetAccount {
    pub total_offset_grams: u64,

    /// Minor currency units paid so far.
    pub total_spent: u128,
}

impl ConsumerOffsetAccount {
    /// Totals after buying `grams` for `cost`, or `None` on overflow.
    pub fn after_purchase(&self, grams: u64, cost: u128) -> Option<Self> {
        Some(ConsumerOffsetAccount {
            total_offset_grams: self.total_offset_grams.checked_add(grams)?,
            total_spent: self.total_spent.checked_add(cost)?,
        })
    }
}

/// A consumer's self-declared monthly carbon budget.
///
/// The budget is informational. Usage may exceed it, and usage is only
/// reset when the consumer sets a budget again.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ConsumerBudget {
    pub monthly_budget_grams: u64,
    pub current_usage_grams: u64,
    pub period_start: LogicalTime,
}

impl ConsumerBudget {
    /// Fresh budget with zero usage starting at `now`.
    pub fn new(monthly_budget_grams: u64, now: LogicalTime) -> Self {
        ConsumerBudget {
            monthly_budget_grams,
            current_usage_grams: 0,
            period_start: now,
        }
    }

    /// Usage after tracking `grams`, or `None` on overflow.
    pub fn usage_with(&self, grams: u64) -> Option<u64> {
        self.current_usage_grams.checked_add(grams)
    }

    /// `true` once usage is above the declared budget.
    pub fn is_over_budget(&self) -> bool {
        self.current_usage_grams > self.monthly_budget_grams
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_offset_account_accumulates() {
        let account = ConsumerOffsetAccount::default();
        let account = account.after_purchase(10, 10_000_000).unwrap();
        let account = account.after_purchase(5, 5_000_000).unwrap();

        assert_eq!(account.total_offset_grams, 15);
        assert_eq!(account.total_spent, 15_000_000);
    }

    #[test]
    fn test_offset_account_overflow() {
        let account = ConsumerOffsetAccount {
            total_offset_grams: u64::MAX,
            total_spent: 0,
        };
        assert!(account.after_purchase(1, 1).is_none());
    }

    #[test]
    fn test_budget_starts_empty_and_is_advisory() {
        let mut budget = ConsumerBudget::new(1000, 42);
        assert_eq!(budget.current_usage_grams, 0);
        assert_eq!(budget.period_start, 42);
        assert!(!budget.is_over_budget());

        budget.current_usage_grams = budget.usage_with(7000).unwrap();
        assert_eq!(budget.current_usage_grams, 7000);
        assert!(budget.is_over_budget());
    }
}
