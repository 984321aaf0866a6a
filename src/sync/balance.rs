use crate::model::{BalanceHint, BalanceSnapshot, DashboardStats, MonthSelector};

/// Holds what the service computed for the active month. Nothing here is recomputed locally.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BalanceEngine {
    snapshot: BalanceSnapshot,
    available: Vec<MonthSelector>,
    active: Option<MonthSelector>,
}

impl BalanceEngine {
    pub fn new() -> Self {
        Self::default()
    }

    /// Stores a stats response for a request made with `requested`, and returns the month the
    /// service resolved (its `current_filter`) so the caller can adopt it. When the service does
    /// not say, the requested month stays active and `None` is returned.
    pub fn apply(
        &mut self,
        requested: Option<&MonthSelector>,
        stats: DashboardStats,
    ) -> Option<MonthSelector> {
        self.snapshot = stats.balance;
        self.available = stats.available_months;
        self.active = stats.current_filter.clone().or_else(|| requested.cloned());
        stats.current_filter
    }

    pub fn snapshot(&self) -> &BalanceSnapshot {
        &self.snapshot
    }

    pub fn hint(&self) -> BalanceHint {
        self.snapshot.hint()
    }

    pub fn active_month(&self) -> Option<&MonthSelector> {
        self.active.as_ref()
    }

    /// The months to offer in a scope selector: the service's list, with the active month in
    /// front when the service did not list it (a month with no data yet).
    pub fn month_choices(&self) -> Vec<MonthSelector> {
        let mut choices = Vec::with_capacity(self.available.len() + 1);
        if let Some(active) = &self.active {
            if !self.available.contains(active) {
                choices.push(active.clone());
            }
        }
        choices.extend(self.available.iter().cloned());
        choices
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::Amount;

    fn stats(previous: i64, salary: i64, expenses: i64, remaining: i64) -> DashboardStats {
        DashboardStats {
            balance: BalanceSnapshot {
                previous_balance: Amount::from(previous),
                salary: Amount::from(salary),
                current_expenses: Amount::from(expenses),
                remaining_balance: Amount::from(remaining),
            },
            available_months: vec![
                MonthSelector::new("Nov 2025").unwrap(),
                MonthSelector::new("Oct 2025").unwrap(),
            ],
            current_filter: MonthSelector::new("Dec 2025"),
        }
    }

    #[test]
    fn surplus_and_deficit() {
        let mut engine = BalanceEngine::new();
        engine.apply(None, stats(1000, 5000, 2000, 4000));
        assert_eq!(engine.snapshot().remaining_balance, Amount::from(4000));
        assert_eq!(engine.hint(), BalanceHint::Surplus);

        engine.apply(None, stats(0, 0, 500, -500));
        assert_eq!(engine.snapshot().remaining_balance, Amount::from(-500));
        assert_eq!(engine.hint(), BalanceHint::Deficit);
    }

    #[test]
    fn remaining_is_taken_as_sent() {
        let mut engine = BalanceEngine::new();
        engine.apply(None, stats(1, 1, 1, 42));
        assert_eq!(engine.snapshot().remaining_balance, Amount::from(42));
    }

    #[test]
    fn resolves_and_lists_active_month() {
        let mut engine = BalanceEngine::new();
        let resolved = engine.apply(None, stats(0, 0, 0, 0));
        assert_eq!(resolved, MonthSelector::new("Dec 2025"));
        assert_eq!(engine.active_month(), resolved.as_ref());

        let choices: Vec<String> = engine.month_choices().iter().map(|m| m.to_string()).collect();
        assert_eq!(choices, vec!["Dec 2025", "Nov 2025", "Oct 2025"]);
    }

    #[test]
    fn requested_month_stays_when_unresolved() {
        let mut engine = BalanceEngine::new();
        let mut response = stats(0, 0, 0, 0);
        response.current_filter = None;
        let requested = MonthSelector::new("Oct 2025");
        assert_eq!(engine.apply(requested.as_ref(), response), None);
        assert_eq!(engine.active_month(), requested.as_ref());
        assert_eq!(engine.month_choices().len(), 2);
    }
}
