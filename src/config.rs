//! Settings, layered from defaults, an optional TOML file and the environment.
//!
//! ```toml
//! [rows]
//! bare_expressions = false
//!
//! [search]
//! fuzzy_cutoff = 0.6
//! fuzzy_limit = 10
//! fuzzy_min_length = 3
//! browse_threshold = 20
//! browse_group_size = 15
//!
//! [logging]
//! filter = "warn"
//! ```
//!
//! Environment variables override the file: `TABSIEVE_SEARCH__FUZZY_CUTOFF=0.7`.

use std::path::Path;

use config::{Config, Environment, File, FileFormat};
use serde::{Deserialize, Serialize};

use crate::error::{Result, SieveError};
use crate::query::RowFilterOptions;
use crate::search::SearchOptions;

pub const DEFAULT_FILE: &str = "tabsieve.toml";
pub const ENV_PREFIX: &str = "TABSIEVE";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingSettings {
    /// An `EnvFilter` directive; `RUST_LOG` wins when set.
    pub filter: String,
}

impl Default for LoggingSettings {
    fn default() -> Self {
        Self { filter: "warn".to_string() }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub rows: RowFilterOptions,
    pub search: SearchOptions,
    pub logging: LoggingSettings,
}

fn environment() -> Environment {
    Environment::with_prefix(ENV_PREFIX)
        .prefix_separator("_")
        .separator("__")
        .try_parsing(true)
}

impl Settings {
    /// Reads `path`, which must exist, or else `tabsieve.toml` in the working
    /// directory if there is one, then applies `TABSIEVE_*` variables.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        Self::load_with(path, environment())
    }

    fn load_with(path: Option<&Path>, env: Environment) -> Result<Self> {
        let file = match path {
            Some(path) => File::from(path).required(true),
            None => File::with_name(DEFAULT_FILE).required(false),
        };
        let settings: Settings = Config::builder().add_source(file).add_source(env).build()?.try_deserialize()?;
        settings.validate()?;
        tracing::debug!(?settings, "settings loaded");
        Ok(settings)
    }

    pub fn from_toml_str(toml: &str) -> Result<Self> {
        let settings: Settings = Config::builder()
            .add_source(File::from_str(toml, FileFormat::Toml))
            .build()?
            .try_deserialize()?;
        settings.validate()?;
        Ok(settings)
    }

    pub fn validate(&self) -> Result<()> {
        let search = &self.search;
        if !(0.0..=1.0).contains(&search.fuzzy_cutoff) {
            return Err(SieveError::Config(format!(
                "search.fuzzy_cutoff must lie in 0..=1, got {}",
                search.fuzzy_cutoff
            )));
        }
        if search.browse_group_size == 0 {
            return Err(SieveError::Config("search.browse_group_size must be positive".into()));
        }
        if self.logging.filter.trim().is_empty() {
            return Err(SieveError::Config("logging.filter must not be empty".into()));
        }
        Ok(())
    }
}
