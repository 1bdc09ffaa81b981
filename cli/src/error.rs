use std::path::PathBuf;

use simple_counter::{Address, ContractVersion, DecodeError};
use simple_counter_sandbox::SandboxError;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, CliError>;

#[derive(Debug, Error)]
pub enum CliError {
    #[error("{0}")]
    Message(String),

    #[error("contract at address {0} is not deployed")]
    NotDeployed(Address),

    #[error("invalid address '{input}': {source}")]
    InvalidAddress {
        input: String,
        #[source]
        source: DecodeError,
    },

    #[error("invalid value '{input}': {source}")]
    InvalidValue {
        input: String,
        #[source]
        source: DecodeError,
    },

    #[error(
        "{version} cannot read the current data cell ({source}); \
         use --all to replace the data or --force to install anyway"
    )]
    LayoutMismatch {
        version: ContractVersion,
        #[source]
        source: DecodeError,
    },

    #[error("gave up waiting for {what} after {attempts} attempts")]
    Timeout { what: &'static str, attempts: u32 },

    #[error("config file not found: {0}")]
    MissingConfig(PathBuf),

    #[error(transparent)]
    Client(#[from] simple_counter::Error),

    #[error(transparent)]
    Sandbox(#[from] SandboxError),

    #[error("encode error: {0}")]
    Encode(#[from] simple_counter::EncodeError),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("TOML parse error: {0}")]
    Toml(#[from] toml::de::Error),
}
