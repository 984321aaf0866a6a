use clap::Parser;
use expense_sync::args::{Args, CategoryCommand, Command};
use expense_sync::{commands, Config, Mode, Result};
use std::process::ExitCode;
use tracing::{debug, error, trace};
use tracing_subscriber::filter::LevelFilter;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> ExitCode {
    let args = Args::parse();
    let log_level = args.common().log_level();
    init_logger(log_level);
    debug!("Log level set to {}", log_level.to_string().to_lowercase());

    match main_inner(args).await {
        Ok(_) => ExitCode::SUCCESS,
        Err(e) => {
            error!("Exiting with error: {e:#}");
            ExitCode::FAILURE
        }
    }
}

pub async fn main_inner(args: Args) -> Result<()> {
    trace!("{args:?}");
    let home = args.common().expense_home().path();

    // This allows for running the program without an expense service. When
    // EXPENSE_SYNC_IN_TEST_MODE is set and non-zero in length, then the mode will be Mode::Test,
    // otherwise it will be Mode::Http.
    let mode = Mode::from_env();

    let _: () = match args.command() {
        Command::Init(init_args) => commands::init(home, init_args.base_url()).await?.print(),

        Command::Dashboard(dashboard_args) => {
            let config = Config::load(home).await?;
            commands::dashboard(config, mode, dashboard_args.scope(), dashboard_args.pages())
                .await?
                .print()
        }

        Command::Add(expense_args) => {
            let config = Config::load(home).await?;
            commands::add(config, mode, expense_args).await?.print()
        }

        Command::Edit(edit_args) => {
            let config = Config::load(home).await?;
            commands::edit(config, mode, edit_args).await?.print()
        }

        Command::Duplicate(duplicate_args) => {
            let config = Config::load(home).await?;
            commands::duplicate(config, mode, duplicate_args)
                .await?
                .print()
        }

        Command::Delete(id_args) => {
            let config = Config::load(home).await?;
            commands::delete(config, mode, id_args.id()).await?.print()
        }

        Command::Clear(clear_args) => {
            let config = Config::load(home).await?;
            commands::clear(config, mode, clear_args.yes())
                .await?
                .print()
        }

        Command::Salary(salary_args) => {
            let config = Config::load(home).await?;
            commands::salary(config, mode, salary_args).await?.print()
        }

        Command::Category(category_command) => {
            let config = Config::load(home).await?;
            match category_command {
                CategoryCommand::List => commands::list_categories(config, mode).await?.print(),
                CategoryCommand::Add(name_args) => {
                    commands::add_category(config, mode, name_args.name())
                        .await?
                        .print()
                }
                CategoryCommand::Delete(id_args) => {
                    commands::delete_category(config, mode, id_args.id())
                        .await?
                        .print()
                }
            }
        }

        Command::Import(import_args) => {
            let config = Config::load(home).await?;
            commands::import(config, mode, import_args.file())
                .await?
                .print()
        }

        Command::Export(export_args) => {
            let config = Config::load(home).await?;
            commands::export(config, mode, export_args).await?.print()
        }

        Command::Session(scope_args) => {
            let config = Config::load(home).await?;
            commands::session(config, mode, scope_args).await?.print()
        }
    };
    Ok(())
}

/// Initializes the tracing subscriber.
pub fn init_logger(level: LevelFilter) {
    let filter = match std::env::var("RUST_LOG").ok() {
        Some(_) => {
            // RUST_LOG exists; use it.
            EnvFilter::from_default_env()
        }
        None => {
            // RUST_LOG does not exist; use default log level for this crate only.
            EnvFilter::new(format!(
                "{}={},{}={}",
                env!("CARGO_PKG_NAME").replace('-', "_"),
                level,
                env!("CARGO_BIN_NAME"),
                level
            ))
        }
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}
