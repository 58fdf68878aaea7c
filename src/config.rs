//! Attribute tables consumed through the resolver
//!
//! Configuration is split into three symbol tables:
//! - `CFG` - installation layout, platform detection and identity patterns
//! - `DSCRPTR` - per-entity descriptors (ID ranges, data files, CSV files)
//! - `VOC` - message vocabulary
//!
//! A table value is a cascading mapping keyed by dash-joined identity
//! context (`"GC-US-GEAE"`, `"GC"`, `"*"`). Every other value is a scalar
//! and is returned unchanged by the resolver.

use crate::error::Result;
use serde::Deserialize;
use std::path::Path;

pub use toml::Value;

/// Default configuration shipped with the binary
pub const DEFAULT_CONFIG: &str = include_str!("../config/alx.toml");

/// Read-only source of named attributes
pub trait ConfigSource {
    /// Symbol used in log lines and as part of the resolution cache key
    fn symbol(&self) -> &str;

    /// Raw attribute value, either a scalar or a cascading mapping
    fn get(&self, attribute: &str) -> Option<&Value>;
}

/// One attribute table
#[derive(Debug, Clone)]
pub struct Etc {
    symbol: &'static str,
    table: toml::Table,
}

impl Etc {
    pub fn new(symbol: &'static str, table: toml::Table) -> Self {
        Etc { symbol, table }
    }

    /// Attribute names in table order
    pub fn attributes(&self) -> impl Iterator<Item = &str> {
        self.table.keys().map(String::as_str)
    }
}

impl ConfigSource for Etc {
    fn symbol(&self) -> &str {
        self.symbol
    }

    fn get(&self, attribute: &str) -> Option<&Value> {
        self.table.get(attribute)
    }
}

#[derive(Debug, Default, Deserialize)]
struct RawConfig {
    #[serde(default)]
    cfg: toml::Table,
    #[serde(default)]
    dscrptr: toml::Table,
    #[serde(default)]
    voc: toml::Table,
}

/// Complete configuration
#[derive(Debug, Clone)]
pub struct Config {
    pub cfg: Etc,
    pub dscrptr: Etc,
    pub voc: Etc,
}

impl Config {
    /// Parse a configuration from TOML text
    pub fn parse(text: &str) -> Result<Self> {
        let raw: RawConfig = toml::from_str(text)?;
        Ok(Config {
            cfg: Etc::new("CFG", raw.cfg),
            dscrptr: Etc::new("DSCRPTR", raw.dscrptr),
            voc: Etc::new("VOC", raw.voc),
        })
    }

    /// The configuration embedded in the binary
    pub fn embedded() -> Result<Self> {
        Self::parse(DEFAULT_CONFIG)
    }

    /// Load a configuration file
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let text = std::fs::read_to_string(path)?;
        Self::parse(&text)
    }
}
