use std::path::PathBuf;

use miette::Diagnostic;
use thiserror::Error;

#[derive(Debug, Error, Diagnostic)]
pub enum EnrichError {
    #[error("input spreadsheet {0} has no 'cnpj' column")]
    #[diagnostic(help("add a header cell named CNPJ (any case) to the first row"))]
    MissingCnpjColumn(PathBuf),

    #[error("spreadsheet error: {0}")]
    Spreadsheet(String),

    #[error("failed to read config file at {0}")]
    ConfigRead(PathBuf),

    #[error("failed to parse JSON config: {0}")]
    ConfigParse(String),

    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("registry request failed: {0}")]
    RegistryHttp(String),

    #[error("registry returned status {status}: {message}")]
    RegistryStatus { status: u16, message: String },

    #[error("registry rejected {cnpj}: {message}")]
    RegistryRejected { cnpj: String, message: String },

    #[error("registry payload is missing field '{0}'")]
    MissingField(String),

    #[error("filesystem error: {0}")]
    Filesystem(String),
}
