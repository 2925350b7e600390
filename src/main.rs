use anyhow::{Context, Result, bail};
use chrono::Utc;
use clap::Parser;
use stipend::cli::{Cli, Command, LoadArgs, ReportArgs};
use stipend::config::Settings;
use stipend::display;
use stipend::manager::RecordsManager;
use stipend::source::DirectoryCatalog;
use tracing_subscriber::EnvFilter;

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let settings = Settings::load(cli.config.as_deref())?;
    let mut manager = stipend::create_default_manager(&settings)?;

    match cli.command {
        Command::Run { load, report } => {
            manager.reset_schema()?;
            load_sources(&mut manager, &settings, &load)?;
            show_report(&mut manager, &settings, &report)?;
        }
        Command::Reset => manager.reset_schema()?,
        Command::Load(load) => load_sources(&mut manager, &settings, &load)?,
        Command::Report(report) => show_report(&mut manager, &settings, &report)?,
        Command::Check => {
            let violations = manager.foreign_key_violations()?;
            display::show_violations(&violations);
            if !violations.is_empty() {
                bail!("{} foreign keys do not resolve", violations.len());
            }
        }
    }

    Ok(())
}

fn load_sources(manager: &mut RecordsManager, settings: &Settings, args: &LoadArgs) -> Result<()> {
    let data_dir = args
        .data_dir
        .clone()
        .unwrap_or_else(|| settings.import.data_dir.clone());

    let report = manager
        .reload(&DirectoryCatalog::new(&data_dir))
        .with_context(|| format!("could not load sources from {}", data_dir.display()))?;

    display::show_import_summary(&report);
    Ok(())
}

fn show_report(manager: &mut RecordsManager, settings: &Settings, args: &ReportArgs) -> Result<()> {
    let as_of = args.as_of.unwrap_or_else(|| Utc::now().date_naive());
    let rows = manager.stipends(as_of, settings.tiers())?;

    if args.table {
        display::show_stipends_table(&rows);
    } else {
        display::print_stipends(&rows);
    }

    Ok(())
}
