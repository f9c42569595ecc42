//! Provisioning error types.

use std::fmt;
use thiserror::Error;

/// Result type for provisioning operations.
pub type ProvisionResult<T> = Result<T, ProvisionError>;

/// Errors that can occur while provisioning or verifying an operator.
#[derive(Debug, Error)]
pub enum ProvisionError {
    #[error("invalid operator request: {0}")]
    Validation(String),

    #[error("invalid configuration: {0}")]
    Config(String),

    #[error("backend returned HTTP {status}: {message}")]
    Remote { status: u16, message: String },

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("credential error: {0}")]
    Crypto(#[from] mould_crypto::CryptoError),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("not found: {0}")]
    NotFound(String),

    #[error("expected at most one row in {table}, found {count}")]
    DuplicateRow { table: String, count: usize },

    #[error("PIN {0} is already assigned to another operator")]
    PinTaken(u32),

    #[error("unexpected backend response: {0}")]
    UnexpectedResponse(String),

    #[error("verification failed at {check}: {reason}")]
    Verification { check: VerifyCheck, reason: String },

    #[error("provisioning stopped at {step}{}: {source}", leftovers(.identity_id, .operator_id))]
    Saga {
        step: ProvisionStep,
        identity_id: Option<String>,
        operator_id: Option<i64>,
        #[source]
        source: Box<ProvisionError>,
    },
}

impl ProvisionError {
    /// The step a saga failure stopped at, if this is one.
    pub fn failed_step(&self) -> Option<ProvisionStep> {
        match self {
            Self::Saga { step, .. } => Some(*step),
            _ => None,
        }
    }
}

fn leftovers(identity_id: &Option<String>, operator_id: &Option<i64>) -> String {
    match (identity_id, operator_id) {
        (Some(identity), Some(operator)) => {
            format!(" (left in place: identity {identity}, operator {operator})")
        }
        (Some(identity), None) => format!(" (left in place: identity {identity})"),
        _ => String::new(),
    }
}

/// Steps of the provisioning saga, in execution order.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ProvisionStep {
    Credentials,
    PinAvailability,
    Identity,
    Profile,
    Operator,
    FastAccess,
}

impl fmt::Display for ProvisionStep {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Credentials => "credential sealing",
            Self::PinAvailability => "PIN availability check",
            Self::Identity => "identity creation",
            Self::Profile => "profile row",
            Self::Operator => "operator row",
            Self::FastAccess => "fast-access row",
        })
    }
}

/// Checks run by the verifier, in execution order.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum VerifyCheck {
    Identity,
    OperatorRow,
    ProfileRow,
    FastAccessRow,
    Decryption,
}

impl fmt::Display for VerifyCheck {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Identity => "identity",
            Self::OperatorRow => "operator row",
            Self::ProfileRow => "profile row",
            Self::FastAccessRow => "fast-access row",
            Self::Decryption => "credential decryption",
        })
    }
}
