//! This module contains the command-line interface [`Cli`] parser for rebuilding the academic
//! records schema and reporting stipends.

use chrono::NaiveDate;
use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

/// The command line configuration struct, where the command-line interface parser is automatically
/// derived by [`clap::Parser`].
#[derive(Parser, Debug)]
#[command(version, about)]
pub struct Cli {
    /// Configuration file to use instead of `config.toml` in the working directory.
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// The different stages of the pipeline.
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Reset the schema, load every source, and print the stipend report.
    Run {
        #[command(flatten)]
        load: LoadArgs,
        #[command(flatten)]
        report: ReportArgs,
    },

    /// Drop and recreate every table.
    Reset,

    /// Replace the contents of every table with the source files.
    Load(LoadArgs),

    /// Print the stipend report for the current semester.
    Report(ReportArgs),

    /// List foreign keys that do not resolve.
    Check,
}

#[derive(Args, Debug)]
pub struct LoadArgs {
    /// Directory containing the source files, overriding `import.data_dir`.
    #[arg(long)]
    pub data_dir: Option<PathBuf>,
}

#[derive(Args, Debug)]
pub struct ReportArgs {
    /// Evaluate the report as of this date (YYYY-MM-DD) instead of today.
    #[arg(long)]
    pub as_of: Option<NaiveDate>,

    /// Render the report as a table.
    #[arg(long)]
    pub table: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cli_is_well_formed() {
        use clap::CommandFactory;
        Cli::command().debug_assert();
    }

    #[test]
    fn report_accepts_an_evaluation_date() {
        let cli = Cli::parse_from(["stipend", "report", "--as-of", "2024-04-01", "--table"]);

        match cli.command {
            Command::Report(args) => {
                assert_eq!(args.as_of, NaiveDate::from_ymd_opt(2024, 4, 1));
                assert!(args.table);
            }
            other => panic!("unexpected command {other:?}"),
        }
    }
}
