//! CLI error type.

use std::path::PathBuf;

use bubblemart_core::FieldErrors;
use bubblemart_storefront::{CommerceError, ConfigError};
use thiserror::Error;

/// Errors that end a command.
#[derive(Debug, Error)]
pub enum CliError {
    /// The environment does not describe a usable client.
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// A commerce operation failed.
    #[error(transparent)]
    Commerce(#[from] CommerceError),

    /// A commerce operation failed, with the message to show already chosen.
    #[error("{message}")]
    Reported {
        message: String,
        #[source]
        source: CommerceError,
    },

    /// A local file could not be read.
    #[error("Failed to read {}: {source}", path.display())]
    ReadFile {
        path: PathBuf,
        source: std::io::Error,
    },

    /// The signed-in account is not an admin.
    #[error("This command needs an admin account")]
    NotAdmin,

    /// An argument that clap accepted but the command cannot use.
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),
}

impl CliError {
    /// Attach the message a command picked for `source`.
    #[must_use]
    pub fn reported(source: CommerceError, message: impl Into<String>) -> Self {
        Self::Reported {
            message: message.into(),
            source,
        }
    }

    /// What to tell the user, with `fallback` for failed requests that carry
    /// no message of their own.
    #[must_use]
    pub fn user_message(&self, fallback: &str) -> String {
        match self {
            Self::Commerce(err) => err.user_message(fallback),
            other => other.to_string(),
        }
    }

    /// Per-field messages to list under the error, if any.
    #[must_use]
    pub fn field_errors(&self) -> Option<&FieldErrors> {
        match self {
            Self::Commerce(err) | Self::Reported { source: err, .. } => err.field_errors(),
            _ => None,
        }
    }
}
