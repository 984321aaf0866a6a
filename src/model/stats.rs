use crate::model::month::{self, MonthSelector};
use crate::model::Amount;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// The balance figures for one month as computed by the service's aggregation.
///
/// `remaining_balance` is `previous_balance + salary - current_expenses`, but it is taken from the
/// service as-is and never recomputed here.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BalanceSnapshot {
    /// The carry-forward balance of every month strictly before the selected one.
    #[serde(default)]
    pub previous_balance: Amount,
    #[serde(default)]
    pub salary: Amount,
    #[serde(default)]
    pub current_expenses: Amount,
    #[serde(default)]
    pub remaining_balance: Amount,
}

impl BalanceSnapshot {
    pub fn hint(&self) -> BalanceHint {
        if self.remaining_balance.is_negative() {
            BalanceHint::Deficit
        } else {
            BalanceHint::Surplus
        }
    }
}

/// A display marker for the remaining balance. It does not affect any computation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BalanceHint {
    Surplus,
    Deficit,
}

serde_plain::derive_display_from_serialize!(BalanceHint);

/// The response of the dashboard stats endpoint.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DashboardStats {
    #[serde(flatten)]
    pub balance: BalanceSnapshot,
    /// Months that have at least one record or salary entry, newest first.
    #[serde(default, deserialize_with = "month::list")]
    pub available_months: Vec<MonthSelector>,
    /// The month the service actually computed, which may be a default it chose.
    #[serde(default, deserialize_with = "month::optional")]
    pub current_filter: Option<MonthSelector>,
}

/// Expense totals per category for one month, used for the chart.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CategoryTotals(BTreeMap<String, Amount>);

impl CategoryTotals {
    pub fn new(totals: BTreeMap<String, Amount>) -> Self {
        Self(totals)
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn get(&self, category: &str) -> Option<Amount> {
        self.0.get(category).copied()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, Amount)> {
        self.0.iter().map(|(name, amount)| (name.as_str(), *amount))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decode_stats_with_extra_fields() {
        let json = r#"{
            "current_filter": "Dec 2025",
            "salary": 5000.0,
            "previous_balance": 1000.0,
            "current_expenses": 2000.0,
            "total_available": 6000.0,
            "remaining_balance": 4000.0,
            "available_months": ["Dec 2025", "Nov 2025"]
        }"#;
        let stats: DashboardStats = serde_json::from_str(json).unwrap();
        assert_eq!(stats.balance.remaining_balance, Amount::from(4000));
        assert_eq!(stats.balance.hint(), BalanceHint::Surplus);
        assert_eq!(stats.current_filter, MonthSelector::new("Dec 2025"));
        assert_eq!(stats.available_months.len(), 2);
    }

    #[test]
    fn negative_remaining_is_a_deficit() {
        let json = r#"{"previous_balance": 0, "salary": 0, "current_expenses": 500,
                       "remaining_balance": -500, "available_months": [], "current_filter": ""}"#;
        let stats: DashboardStats = serde_json::from_str(json).unwrap();
        assert_eq!(stats.balance.remaining_balance, Amount::from(-500));
        assert_eq!(stats.balance.hint(), BalanceHint::Deficit);
        assert!(stats.current_filter.is_none());
    }

    #[test]
    fn null_amounts_read_as_zero() {
        let stats: DashboardStats =
            serde_json::from_str(r#"{"salary": null, "remaining_balance": 0}"#).unwrap();
        assert!(stats.balance.salary.is_zero());
        assert_eq!(stats.balance.hint(), BalanceHint::Surplus);
    }

    #[test]
    fn decode_category_totals() {
        let totals: CategoryTotals =
            serde_json::from_str(r#"{"Food": 120, "Travel": 300.5}"#).unwrap();
        assert_eq!(totals.get("Food"), Some(Amount::from(120)));
        assert_eq!(totals.iter().count(), 2);
    }
}
