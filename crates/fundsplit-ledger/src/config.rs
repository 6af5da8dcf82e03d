//! Fund manager configuration
//!
//! Sources, lowest priority first:
//! 1. Built-in defaults
//! 2. Optional config file (TOML, JSON, or YAML by extension)
//! 3. `FUNDSPLIT_`-prefixed environment variables, `__` between levels
//!    (e.g. `FUNDSPLIT_FAILURE_POLICY=continue`)
//!
//! A `.env` file in the working directory is loaded first when present.

use fundsplit_common::{Address, AddressKind, FailurePolicy, FundError, Result, Weight};
use serde::{Deserialize, Serialize};

/// Environment variable prefix
pub const ENV_PREFIX: &str = "FUNDSPLIT";

/// Category seeded at startup
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CategorySeed {
    pub id: String,
    pub destination: String,
    pub weight: Weight,
}

/// Fund manager configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LedgerConfig {
    /// Owner address allowed to change the registry
    pub owner: String,
    /// Display name, also used as the event source
    pub service_name: String,
    /// What to do when a payout transfer fails
    pub failure_policy: FailurePolicy,
    /// Categories registered at startup, in order
    pub categories: Vec<CategorySeed>,
    /// Register Prometheus metrics
    pub metrics_enabled: bool,
}

impl Default for LedgerConfig {
    fn default() -> Self {
        Self {
            owner: Address::derive(AddressKind::Account, b"owner").to_string(),
            service_name: crate::DEFAULT_SERVICE_NAME.to_string(),
            failure_policy: FailurePolicy::Abort,
            categories: Vec::new(),
            metrics_enabled: true,
        }
    }
}

impl LedgerConfig {
    /// Load configuration from `.env`, an optional file, and the environment
    pub fn load(path: Option<&str>) -> Result<Self> {
        let _ = dotenvy::dotenv();

        let mut builder = config::Config::builder();
        if let Some(path) = path {
            builder = builder.add_source(config::File::with_name(path).required(true));
        }
        builder = builder.add_source(
            config::Environment::with_prefix(ENV_PREFIX)
                .separator("__")
                .try_parsing(true),
        );

        let cfg: Self = builder
            .build()
            .and_then(|c| c.try_deserialize())
            .map_err(|e| FundError::Config(e.to_string()))?;

        cfg.validate()?;
        Ok(cfg)
    }

    /// Parse a configuration document held in memory
    pub fn from_toml(source: &str) -> Result<Self> {
        let cfg: Self = config::Config::builder()
            .add_source(config::File::from_str(source, config::FileFormat::Toml))
            .build()
            .and_then(|c| c.try_deserialize())
            .map_err(|e| FundError::Config(e.to_string()))?;

        cfg.validate()?;
        Ok(cfg)
    }

    /// Check addresses and category ids
    pub fn validate(&self) -> Result<()> {
        self.owner_address()?;
        self.category_addresses()?;

        let mut seen = std::collections::HashSet::new();
        for seed in &self.categories {
            if seed.id.trim().is_empty() {
                return Err(FundError::Config("category id must not be empty".into()));
            }
            if !seen.insert(seed.id.as_str()) {
                return Err(FundError::Config(format!("duplicate category id: {}", seed.id)));
            }
        }
        Ok(())
    }

    pub fn owner_address(&self) -> Result<Address> {
        Address::parse(&self.owner).map_err(|e| FundError::Config(format!("owner: {}", e)))
    }

    /// Seeds with parsed destinations, in order
    pub fn category_addresses(&self) -> Result<Vec<(String, Address, Weight)>> {
        self.categories
            .iter()
            .map(|seed| {
                let destination = Address::parse(&seed.destination)
                    .map_err(|e| FundError::Config(format!("category {}: {}", seed.id, e)))?;
                Ok((seed.id.clone(), destination, seed.weight))
            })
            .collect()
    }
}
