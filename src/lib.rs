use anyhow::{Context, Result};

pub mod cli;
pub mod config;
pub mod ddl;
pub mod display;
pub mod error;
pub mod import;
pub mod integrity;
pub mod manager;
pub mod mapping;
pub mod models;
pub mod schema;
pub mod session;
pub mod source;
pub mod stipend;

use crate::config::Settings;
use crate::manager::RecordsManager;

/// Connects to the schema named in `settings`, creating it if it does not exist yet.
pub fn create_default_manager(settings: &Settings) -> Result<RecordsManager> {
    let target = settings.session_target();

    RecordsManager::connect(&target, settings.import.attempt_history)
        .with_context(|| format!("could not open schema `{}`", target.schema))
}
