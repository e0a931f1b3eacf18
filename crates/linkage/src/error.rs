use std::fmt;

use townlink_address::AddressError;

#[derive(Debug)]
pub enum LinkageError {
    /// TOML parse / deserialization error.
    ConfigParse(String),
    /// Config validation error (empty city, address block without street, etc.).
    ConfigValidation(String),
    /// A required source table is not configured.
    MissingSource(String),
    /// A configured column header is absent from the source table.
    MissingColumn { source: String, column: String },
    /// Address outside the canonical vocabulary. Fatal: the run aborts
    /// before anything is written.
    Address {
        source: String,
        row: usize,
        error: AddressError,
    },
    /// IO error (file read, CSV decode, etc.).
    Io(String),
}

impl LinkageError {
    /// True for data-quality violations, which need a human to extend the
    /// canonicalization tables rather than a config fix.
    pub fn is_data_quality(&self) -> bool {
        matches!(self, Self::Address { .. })
    }
}

impl fmt::Display for LinkageError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::ConfigParse(msg) => write!(f, "config parse error: {msg}"),
            Self::ConfigValidation(msg) => write!(f, "config validation error: {msg}"),
            Self::MissingSource(name) => write!(f, "missing required source '{name}'"),
            Self::MissingColumn { source, column } => {
                write!(f, "source '{source}': missing column '{column}'")
            }
            Self::Address { source, row, error } => {
                write!(f, "source '{source}', row {row}: {error}")
            }
            Self::Io(msg) => write!(f, "IO error: {msg}"),
        }
    }
}

impl std::error::Error for LinkageError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Address { error, .. } => Some(error),
            _ => None,
        }
    }
}
