//! Run configuration: which accounts to copy, the content rating ceiling,
//! and where the database lives.
//!
//! Loaded once from a TOML file and/or command-line flags before the run,
//! then passed by reference to every unit body.
//!
//! ```toml
//! include = [3, 5, 1014]        # or "all"
//! maximum_rating = "moderate"
//!
//! [database]
//! url = "postgres://weasyl@localhost/weasyl"
//! source_schema = "public"
//! schema_script = "schema.sql"
//! ```

use std::collections::BTreeSet;
use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::{ImportError, ImportResult};

/// Keyword that selects every account.
pub const INCLUDE_ALL: &str = "all";

/// Schema that receives the copy.
pub const TARGET_SCHEMA: &str = "smallcopy";

/// Which accounts are eligible for copying.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "IncludeRepr", into = "IncludeRepr")]
pub enum Include {
    /// Every account in the source database.
    All,
    /// Only the listed account ids.
    Accounts(BTreeSet<i32>),
}

impl Include {
    /// Account ids as a bindable array; `None` means no filter.
    pub fn account_ids(&self) -> Option<Vec<i32>> {
        match self {
            Include::All => None,
            Include::Accounts(ids) => Some(ids.iter().copied().collect()),
        }
    }

    fn accounts(ids: BTreeSet<i32>) -> ImportResult<Self> {
        if ids.is_empty() {
            return Err(ImportError::Config(
                "include must be \"all\" or at least one account id".to_string(),
            ));
        }
        Ok(Include::Accounts(ids))
    }
}

impl FromStr for Include {
    type Err = ImportError;

    /// Parses `all` or a comma-separated list of account ids.
    fn from_str(s: &str) -> ImportResult<Self> {
        let s = s.trim();
        if s.eq_ignore_ascii_case(INCLUDE_ALL) {
            return Ok(Include::All);
        }

        let ids = s
            .split(',')
            .map(str::trim)
            .filter(|part| !part.is_empty())
            .map(|part| {
                part.parse::<i32>()
                    .map_err(|_| ImportError::Config(format!("invalid account id {part:?}")))
            })
            .collect::<ImportResult<BTreeSet<i32>>>()?;

        Include::accounts(ids)
    }
}

impl fmt::Display for Include {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Include::All => f.write_str(INCLUDE_ALL),
            Include::Accounts(ids) => {
                let ids: Vec<String> = ids.iter().map(i32::to_string).collect();
                f.write_str(&ids.join(","))
            }
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
enum IncludeRepr {
    Keyword(String),
    Accounts(Vec<i32>),
}

impl TryFrom<IncludeRepr> for Include {
    type Error = ImportError;

    fn try_from(repr: IncludeRepr) -> ImportResult<Self> {
        match repr {
            IncludeRepr::Keyword(keyword) => keyword.parse(),
            IncludeRepr::Accounts(ids) => Include::accounts(ids.into_iter().collect()),
        }
    }
}

impl From<Include> for IncludeRepr {
    fn from(include: Include) -> Self {
        match include {
            Include::All => IncludeRepr::Keyword(INCLUDE_ALL.to_string()),
            Include::Accounts(ids) => IncludeRepr::Accounts(ids.into_iter().collect()),
        }
    }
}

/// Content maturity rating, ordered from least to most mature.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Rating {
    General,
    Moderate,
    Mature,
    Explicit,
}

impl Rating {
    pub const ALL: [Rating; 4] = [
        Rating::General,
        Rating::Moderate,
        Rating::Mature,
        Rating::Explicit,
    ];

    /// Numeric rating code stored in the `rating` columns.
    pub fn ceiling(self) -> i32 {
        match self {
            Rating::General => 10,
            Rating::Moderate => 20,
            Rating::Mature => 30,
            Rating::Explicit => 40,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            Rating::General => "general",
            Rating::Moderate => "moderate",
            Rating::Mature => "mature",
            Rating::Explicit => "explicit",
        }
    }
}

impl FromStr for Rating {
    type Err = ImportError;

    fn from_str(s: &str) -> ImportResult<Self> {
        Rating::ALL
            .into_iter()
            .find(|rating| rating.name().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| {
                ImportError::Config(format!(
                    "unknown rating {s:?} (expected general, moderate, mature or explicit)"
                ))
            })
    }
}

impl fmt::Display for Rating {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Connection and schema parameters for the database holding both the
/// source data and the target schema.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DatabaseConfig {
    /// PostgreSQL connection URL.
    #[serde(default)]
    pub url: Option<String>,

    /// Schema the source tables live in.
    #[serde(default = "default_source_schema")]
    pub source_schema: String,

    /// Script that creates the target schema.
    #[serde(default = "default_schema_script")]
    pub schema_script: PathBuf,
}

fn default_source_schema() -> String {
    "public".to_string()
}

fn default_schema_script() -> PathBuf {
    PathBuf::from("schema.sql")
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            url: None,
            source_schema: default_source_schema(),
            schema_script: default_schema_script(),
        }
    }
}

/// Full configuration for one import run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunConfig {
    pub include: Include,
    pub maximum_rating: Rating,
    #[serde(default)]
    pub database: DatabaseConfig,
}

impl RunConfig {
    pub fn new(include: Include, maximum_rating: Rating) -> Self {
        Self {
            include,
            maximum_rating,
            database: DatabaseConfig::default(),
        }
    }

    /// Set the connection URL
    pub fn with_database_url(mut self, url: impl Into<String>) -> Self {
        self.database.url = Some(url.into());
        self
    }

    /// Set the source schema
    pub fn with_source_schema(mut self, schema: impl Into<String>) -> Self {
        self.database.source_schema = schema.into();
        self
    }

    /// Parse a TOML configuration document.
    pub fn from_toml_str(source: &str) -> ImportResult<Self> {
        Ok(toml::from_str(source)?)
    }

    /// Read and parse a TOML configuration file.
    pub fn load(path: &Path) -> ImportResult<Self> {
        let source = std::fs::read_to_string(path).map_err(|e| {
            ImportError::Config(format!("cannot read {}: {}", path.display(), e))
        })?;
        Self::from_toml_str(&source)
    }

    /// Rating ceiling as stored in the database.
    pub fn max_rating(&self) -> i32 {
        self.maximum_rating.ceiling()
    }

    /// Connection URL, or a configuration error if none was given.
    pub fn database_url(&self) -> ImportResult<&str> {
        self.database
            .url
            .as_deref()
            .ok_or_else(|| ImportError::Config("no database url configured".to_string()))
    }
}
