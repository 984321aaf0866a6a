use crate::api::Mode;
use crate::args::ScopeArgs;
use crate::commands::dashboard::{open, render};
use crate::commands::{coordinator, Out};
use crate::model::{AmountStyle, MonthSelector};
use crate::sync::SyncCoordinator;
use crate::{Config, Result};
use anyhow::Context;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, BufReader};
use tokio::task::JoinSet;
use tracing::{info, warn};

const HELP: &str = "Commands: search <text> | more | month [<month>] | refresh | show | help | quit";

/// One line of interactive input.
#[derive(Debug, Clone, PartialEq, Eq)]
enum Input {
    Search(String),
    More,
    Month(Option<MonthSelector>),
    Refresh,
    Show,
    Help,
    Quit,
    Unknown(String),
}

impl Input {
    fn parse(line: &str) -> Option<Self> {
        let line = line.trim();
        if line.is_empty() {
            return None;
        }
        let (word, rest) = line.split_once(' ').unwrap_or((line, ""));
        let rest = rest.trim();
        Some(match word {
            "search" | "s" => Input::Search(rest.to_string()),
            "more" | "m" => Input::More,
            "month" => Input::Month(MonthSelector::new(rest)),
            "refresh" | "r" => Input::Refresh,
            "show" => Input::Show,
            "help" | "?" => Input::Help,
            "quit" | "exit" | "q" => Input::Quit,
            _ => Input::Unknown(line.to_string()),
        })
    }
}

/// Runs an interactive session on stdin. Searches are debounced, so typing several `search`
/// lines in quick succession only sends the last one. The heartbeat runs until the session ends.
pub async fn session(config: Config, mode: Mode, scope: &ScopeArgs) -> Result<Out<()>> {
    let sync = coordinator(&config, mode)?;
    let style = config.amount_style();
    let _heartbeat = sync.heartbeat();
    open(&sync, scope).await;
    show(&sync, &style).await;
    info!("{HELP}");

    let stdin = BufReader::new(tokio::io::stdin());
    run(&sync, &style, stdin).await?;
    Ok("Session ended".into())
}

async fn run<R>(sync: &SyncCoordinator, style: &AmountStyle, input: R) -> Result<()>
where
    R: AsyncBufRead + Unpin,
{
    let mut lines = input.lines();
    let mut searches = JoinSet::new();
    while let Some(line) = lines.next_line().await.context("Unable to read input")? {
        let Some(input) = Input::parse(&line) else {
            continue;
        };
        match input {
            Input::Search(text) => {
                let search = sync.debounced_search(&text);
                let sync = sync.clone();
                let style = style.clone();
                searches.spawn(async move {
                    match search.await {
                        Ok(true) => show(&sync, &style).await,
                        Ok(false) => {}
                        Err(e) => warn!("Search failed: {e}"),
                    }
                });
            }
            Input::More => match sync.load_more().await {
                Ok(true) => show(sync, style).await,
                Ok(false) => info!("Nothing more to load"),
                Err(e) => warn!("Unable to load more: {e}"),
            },
            Input::Month(month) => {
                sync.select_month(month).await;
                show(sync, style).await;
            }
            Input::Refresh => {
                sync.refresh_all().await;
                show(sync, style).await;
            }
            Input::Show => show(sync, style).await,
            Input::Help => info!("{HELP}"),
            Input::Quit => break,
            Input::Unknown(line) => warn!("Unknown command '{line}'. {HELP}"),
        }
    }
    // Let a pending search finish so its result is not lost at end of input.
    while searches.join_next().await.is_some() {}
    Ok(())
}

async fn show(sync: &SyncCoordinator, style: &AmountStyle) {
    info!("\n{}", render(&sync.view().await, style));
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::Endpoint;
    use crate::test::TestEnv;

    #[test]
    fn parse_input() {
        assert_eq!(Input::parse("  "), None);
        assert_eq!(
            Input::parse("search  morning tea "),
            Some(Input::Search("morning tea".into()))
        );
        assert_eq!(Input::parse("month"), Some(Input::Month(None)));
        assert_eq!(
            Input::parse("month Nov 2025"),
            Some(Input::Month(MonthSelector::new("Nov 2025")))
        );
        assert_eq!(Input::parse("q"), Some(Input::Quit));
        assert!(matches!(Input::parse("dance"), Some(Input::Unknown(_))));
    }

    #[tokio::test(start_paused = true)]
    async fn rapid_searches_send_one_request() {
        let env = TestEnv::new().await;
        env.service().seed_expense("Tea", 20, "Food", env.day(1));
        let sync = env.coordinator();
        sync.refresh_all().await;

        let input: &[u8] = b"search t\nsearch te\nsearch tea\n";
        run(&sync, &AmountStyle::default(), input).await.unwrap();

        let searches: Vec<_> = env
            .service()
            .requests_to(Endpoint::ListExpenses)
            .into_iter()
            .filter_map(|r| r.param("search").map(str::to_string))
            .collect();
        assert_eq!(searches, vec!["tea".to_string()]);
        assert_eq!(sync.view().await.search.as_deref(), Some("tea"));
    }
}
