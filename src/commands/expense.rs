use crate::api::Mode;
use crate::args::{DuplicateArgs, EditArgs, ExpenseArgs, SalaryArgs};
use crate::commands::{coordinator, report, today, Out};
use crate::model::{ExpenseForm, MonthSelector, RecordId, SalaryForm};
use crate::sync::{SessionView, SyncCoordinator};
use crate::{Config, Result};
use anyhow::bail;

/// Adds an expense. A missing date means today.
pub async fn add(config: Config, mode: Mode, args: &ExpenseArgs) -> Result<Out<SessionView>> {
    let sync = coordinator(&config, mode)?;
    let mut form = ExpenseForm {
        date: Some(today()),
        ..ExpenseForm::default()
    };
    merge(&mut form, args);
    let refresh = sync.create_expense(&form).await?;
    report(&refresh);
    Ok(Out::new("Expense added", sync.view().await))
}

/// Changes the fields given in `args` and keeps the rest.
pub async fn edit(config: Config, mode: Mode, args: &EditArgs) -> Result<Out<SessionView>> {
    let sync = coordinator(&config, mode)?;
    let Some(mut form) = locate(&sync, args.id(), args.month(), Draft::Edit).await? else {
        bail!("Expense {} was not found", args.id());
    };
    merge(&mut form, args.fields());
    let refresh = sync.update_expense(args.id(), &form).await?;
    report(&refresh);
    Ok(Out::new(
        format!("Expense {} updated", args.id()),
        sync.view().await,
    ))
}

/// Adds a copy of an expense.
pub async fn duplicate(
    config: Config,
    mode: Mode,
    args: &DuplicateArgs,
) -> Result<Out<SessionView>> {
    let sync = coordinator(&config, mode)?;
    let Some(mut form) = locate(&sync, args.id(), args.month(), Draft::Duplicate).await? else {
        bail!("Expense {} was not found", args.id());
    };
    if let Some(date) = args.date() {
        form.date = Some(date);
    }
    let refresh = sync.create_expense(&form).await?;
    report(&refresh);
    Ok(Out::new(
        format!("Expense {} duplicated", args.id()),
        sync.view().await,
    ))
}

pub async fn delete(config: Config, mode: Mode, id: &RecordId) -> Result<Out<SessionView>> {
    let sync = coordinator(&config, mode)?;
    let refresh = sync.delete_expense(id).await?;
    report(&refresh);
    Ok(Out::new(format!("Expense {id} deleted"), sync.view().await))
}

pub async fn clear(config: Config, mode: Mode, yes: bool) -> Result<Out<SessionView>> {
    if !yes {
        bail!("This deletes every expense and salary. Pass --yes to confirm.");
    }
    let sync = coordinator(&config, mode)?;
    let refresh = sync.clear_all().await?;
    report(&refresh);
    Ok(Out::new("All data cleared", sync.view().await))
}

pub async fn salary(config: Config, mode: Mode, args: &SalaryArgs) -> Result<Out<SessionView>> {
    let sync = coordinator(&config, mode)?;
    let form = SalaryForm {
        month: args.month().clone(),
        amount: args.amount().to_string(),
    };
    let refresh = sync.save_salary(&form).await?;
    report(&refresh);
    Ok(Out::new(
        format!("Salary for {} saved", args.month()),
        sync.view().await,
    ))
}

#[derive(Debug, Clone, Copy)]
enum Draft {
    Edit,
    Duplicate,
}

/// Loads pages of `month` (or the default scope) until the record is found or the pages run out,
/// then pre-fills a form from it.
async fn locate(
    sync: &SyncCoordinator,
    id: &RecordId,
    month: Option<MonthSelector>,
    draft: Draft,
) -> Result<Option<ExpenseForm>> {
    sync.select_month(month).await;
    loop {
        let form = match draft {
            Draft::Edit => sync.edit_draft(id, today()).await,
            Draft::Duplicate => sync.duplicate_draft(id, today()).await,
        };
        if form.is_some() {
            return Ok(form);
        }
        if !sync.load_more().await? {
            return Ok(None);
        }
    }
}

fn merge(form: &mut ExpenseForm, args: &ExpenseArgs) {
    if let Some(item) = args.item() {
        form.item = item.to_string();
    }
    if let Some(amount) = args.amount() {
        form.amount = amount.to_string();
    }
    if let Some(category) = args.category() {
        form.category = Some(category.to_string());
    }
    if let Some(date) = args.date() {
        form.date = Some(date);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::Endpoint;
    use crate::test::TestEnv;

    #[tokio::test]
    async fn locate_pages_until_found() {
        let env = TestEnv::with_page_limit(2).await;
        for d in 1..=5 {
            env.service()
                .seed_expense(&format!("item {d}"), i64::from(d), "Food", env.day(d));
        }
        let sync = env.coordinator();
        // Oldest record is on the third page.
        let id = RecordId::new("1001");
        let form = locate(&sync, &id, None, Draft::Edit)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(form.item, "item 1");
        assert_eq!(env.service().count(Endpoint::ListExpenses), 3);

        let missing = locate(&sync, &RecordId::new("nope"), None, Draft::Duplicate)
            .await
            .unwrap();
        assert!(missing.is_none());
    }

    #[test]
    fn merge_keeps_unset_fields() {
        let mut form = ExpenseForm {
            item: "Tea".into(),
            amount: "20".into(),
            category: Some("Food".into()),
            date: None,
        };
        let args = ExpenseArgs::new(None, Some("25".into()), None, None);
        merge(&mut form, &args);
        assert_eq!(form.item, "Tea");
        assert_eq!(form.amount, "25");
        assert_eq!(form.category.as_deref(), Some("Food"));
    }
}
