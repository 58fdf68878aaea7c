use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum AlxError {
    /// Root is not loaded or failed validation
    #[error("Installation invalid: {0}")]
    InstallationInvalid(String),

    /// Attribute has no value for the current context
    #[error("Configuration missing: {symbol}.{attribute} has no value for context [{context}]")]
    ConfigurationMissing {
        symbol: String,
        attribute: String,
        context: String,
    },

    /// Value of the wrong kind or out of bounds for its type
    #[error("Type mismatch: {0}")]
    TypeMismatch(String),

    /// Required file does not exist
    #[error("File missing: {}", .0.display())]
    FileMissing(PathBuf),

    /// Entry ID outside the resolved range
    #[error("Record out of range: ID {id} not in {min}...{max}")]
    RecordOutOfRange { id: i64, min: i64, max: i64 },

    /// Container could not be compressed or decompressed
    #[error("Codec failure: {0}")]
    CodecFailure(String),

    /// Dependent store failed to load
    #[error("Dependency load failed: {kind}")]
    DependencyLoadFailure { kind: String },

    /// File contents disagree with the declared layout
    #[error("Input integrity: {0}")]
    InputIntegrity(String),

    /// Underlying I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// CSV reader or writer error
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    /// Malformed TOML configuration
    #[error("Config parse error: {0}")]
    ConfigParse(#[from] toml::de::Error),

    /// Malformed identity snapshot
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Malformed identity pattern
    #[error("Invalid pattern: {0}")]
    Pattern(#[from] regex::Error),

    /// Malformed file glob
    #[error("Invalid glob: {0}")]
    Glob(#[from] globset::Error),
}

pub type Result<T> = std::result::Result<T, AlxError>;
