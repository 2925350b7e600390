//! Runtime configuration.
//!
//! Settings are read from an optional `config.toml` in the working directory (or the file given
//! on the command line), then overridden by `STIPEND__<SECTION>__<KEY>` environment variables.
//! A `.env` file is loaded first, so overrides can live there too.

use crate::error::ConfigError;
use crate::session::SessionTarget;
use crate::stipend::StipendTiers;
use config::{Config, Environment, File};
use serde::Deserialize;
use std::path::{Path, PathBuf};

/// The default configuration file name, without extension.
pub const DEFAULT_CONFIG: &str = "config";

#[derive(Debug, Clone, Default, Deserialize)]
pub struct Settings {
    #[serde(default)]
    pub database: DatabaseSettings,
    #[serde(default)]
    pub import: ImportSettings,
    #[serde(default)]
    pub stipend: StipendSettings,
}

#[derive(Debug, Clone, Deserialize)]
pub struct DatabaseSettings {
    /// Directory holding one database file per schema.
    #[serde(default = "default_root")]
    pub root: PathBuf,
    #[serde(default = "default_schema")]
    pub schema: String,
}

impl Default for DatabaseSettings {
    fn default() -> Self {
        Self {
            root: default_root(),
            schema: default_schema(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct ImportSettings {
    /// Directory containing the nine source files.
    #[serde(default = "default_data_dir")]
    pub data_dir: PathBuf,
    #[serde(default)]
    pub attempt_history: AttemptHistory,
}

impl Default for ImportSettings {
    fn default() -> Self {
        Self {
            data_dir: default_data_dir(),
            attempt_history: AttemptHistory::default(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct StipendSettings {
    #[serde(default = "default_tier_a_min")]
    pub tier_a_min_score: i32,
    #[serde(default = "default_tier_a_amount")]
    pub tier_a_amount: i32,
    #[serde(default = "default_tier_b_min")]
    pub tier_b_min_score: i32,
    #[serde(default = "default_tier_b_amount")]
    pub tier_b_amount: i32,
}

impl Default for StipendSettings {
    fn default() -> Self {
        let tiers = StipendTiers::default();
        Self {
            tier_a_min_score: tiers.tier_a_min,
            tier_a_amount: tiers.tier_a_amount,
            tier_b_min_score: tiers.tier_b_min,
            tier_b_amount: tiers.tier_b_amount,
        }
    }
}

/// What happens to earlier attempts when a student retakes the same curriculum subject.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AttemptHistory {
    /// One row per student and subject; the attempt imported last replaces earlier ones.
    #[default]
    Latest,
    /// One row per student, subject and attempt.
    Keep,
}

impl AttemptHistory {
    /// Primary key columns of `academic_performance` under this policy.
    pub fn key_columns(self) -> &'static [&'static str] {
        match self {
            AttemptHistory::Latest => &["student_id", "curriculum_subject_id"],
            AttemptHistory::Keep => &["student_id", "curriculum_subject_id", "attempt"],
        }
    }
}

fn default_root() -> PathBuf {
    PathBuf::from("db")
}

fn default_schema() -> String {
    "university".to_string()
}

fn default_data_dir() -> PathBuf {
    PathBuf::from("data")
}

fn default_tier_a_min() -> i32 {
    StipendTiers::default().tier_a_min
}

fn default_tier_a_amount() -> i32 {
    StipendTiers::default().tier_a_amount
}

fn default_tier_b_min() -> i32 {
    StipendTiers::default().tier_b_min
}

fn default_tier_b_amount() -> i32 {
    StipendTiers::default().tier_b_amount
}

impl Settings {
    /// Loads settings from `path` (if it exists) and the environment.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok();

        let file = match path {
            Some(path) => File::from(path).required(true),
            None => File::with_name(DEFAULT_CONFIG).required(false),
        };

        let settings: Settings = Config::builder()
            .add_source(file)
            .add_source(Environment::with_prefix("STIPEND").separator("__"))
            .build()?
            .try_deserialize()?;

        settings.validate()?;
        Ok(settings)
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if self.database.schema.trim().is_empty() {
            return Err(ConfigError::Invalid("database.schema must not be empty".into()));
        }

        let stipend = &self.stipend;
        if stipend.tier_a_min_score > stipend.tier_b_min_score {
            return Err(ConfigError::Invalid(format!(
                "stipend.tier_a_min_score ({}) exceeds stipend.tier_b_min_score ({})",
                stipend.tier_a_min_score, stipend.tier_b_min_score
            )));
        }

        Ok(())
    }

    pub fn session_target(&self) -> SessionTarget {
        SessionTarget::new(&self.database.root, &self.database.schema)
    }

    pub fn tiers(&self) -> StipendTiers {
        StipendTiers {
            tier_a_min: self.stipend.tier_a_min_score,
            tier_a_amount: self.stipend.tier_a_amount,
            tier_b_min: self.stipend.tier_b_min_score,
            tier_b_amount: self.stipend.tier_b_amount,
        }
    }
}
