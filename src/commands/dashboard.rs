use crate::api::Mode;
use crate::args::ScopeArgs;
use crate::commands::{coordinator, Out};
use crate::model::AmountStyle;
use crate::sync::{SessionView, SyncCoordinator};
use crate::{Config, Result};
use std::fmt::Write;

/// Loads the scope given by `scope`, `pages` pages deep, and renders the session.
pub async fn dashboard(
    config: Config,
    mode: Mode,
    scope: &ScopeArgs,
    pages: u32,
) -> Result<Out<SessionView>> {
    let sync = coordinator(&config, mode)?;
    open(&sync, scope).await;
    for _ in 1..pages {
        if !sync.load_more().await? {
            break;
        }
    }
    let view = sync.view().await;
    Ok(Out::new(render(&view, &config.amount_style()), view))
}

/// Applies the scope and runs the first refresh. Read failures are kept in the session.
pub(super) async fn open(sync: &SyncCoordinator, scope: &ScopeArgs) {
    if let Some(month) = scope.month() {
        sync.select_month(Some(month)).await;
    } else {
        sync.refresh_all().await;
    }
    if let Some(text) = scope.search() {
        // The failure, if any, is recorded in the session and shown by `render`.
        let _ = sync.search(text).await;
    }
}

/// Renders a session as text.
pub(crate) fn render(view: &SessionView, style: &AmountStyle) -> String {
    let mut s = String::new();
    let balance = &view.balance;
    let month = view
        .active_month
        .as_ref()
        .map(ToString::to_string)
        .unwrap_or_else(|| "-".to_string());
    let _ = writeln!(s, "Month: {month}");
    if !view.month_choices.is_empty() {
        let choices: Vec<&str> = view.month_choices.iter().map(|m| m.as_str()).collect();
        let _ = writeln!(s, "Months: {}", choices.join(", "));
    }
    let _ = writeln!(s, "Previous balance:  {}", balance.previous_balance.render(style));
    let _ = writeln!(s, "Salary:            {}", balance.salary.render(style));
    let _ = writeln!(s, "Expenses:          {}", balance.current_expenses.render(style));
    let _ = writeln!(
        s,
        "Remaining balance: {} ({})",
        balance.remaining_balance.render(style),
        view.hint
    );
    if !view.category_totals.is_empty() {
        let _ = writeln!(s, "By category:");
        for (name, total) in view.category_totals.iter() {
            let _ = writeln!(s, "  {name}: {}", total.render(style));
        }
    }
    if let Some(search) = &view.search {
        let _ = writeln!(s, "Search: {search}");
    }
    let _ = writeln!(s, "{}", view.showing());
    for record in &view.records {
        let _ = writeln!(
            s,
            "  [{}] {}  {}  {}  {}",
            record.id(),
            record.display_date(),
            record.item(),
            record.category(),
            record.amount().render(style)
        );
    }
    if view.has_more {
        let _ = writeln!(s, "(more available)");
    }
    if let Some(e) = &view.last_error {
        let _ = writeln!(s, "Error: {e}");
    }
    s.trim_end().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test::TestEnv;

    #[tokio::test]
    async fn dashboard_renders_balance_and_records() {
        let env = TestEnv::new().await;
        env.service().seed_salary("Dec 2025", 150000);
        env.service()
            .seed_expense("Rent", 23456, "Utilities", env.day(2));
        let sync = env.coordinator();
        open(&sync, &ScopeArgs::default()).await;
        let view = sync.view().await;
        let text = render(&view, &AmountStyle::default());
        assert!(text.contains("Month: Dec 2025"), "{text}");
        assert!(text.contains("Remaining balance: ₹1,26,544 (surplus)"), "{text}");
        assert!(text.contains("Showing 1 of 1"), "{text}");
        assert!(text.contains("Rent"), "{text}");
    }

    #[tokio::test]
    async fn dashboard_runs_in_test_mode() {
        let env = TestEnv::new().await;
        let scope = ScopeArgs::new(Some("Dec 2025".into()), None);
        let out = dashboard(env.config(), Mode::Test, &scope, 2).await.unwrap();
        let view = out.structure().unwrap();
        assert_eq!(view.active_month.as_ref().map(|m| m.as_str()), Some("Dec 2025"));
        assert_eq!(view.records.len(), 4);
        assert!(view.last_error.is_none());
    }

    #[tokio::test]
    async fn dashboard_applies_search() {
        let env = TestEnv::new().await;
        env.service().seed_expense("Tea", 20, "Food", env.day(2));
        env.service().seed_expense("Rent", 900, "Home", env.day(3));
        let sync = env.coordinator();
        open(&sync, &ScopeArgs::new(None, Some("tea".into()))).await;
        let view = sync.view().await;
        assert_eq!(view.records.len(), 1);
        assert_eq!(view.search.as_deref(), Some("tea"));
    }
}
