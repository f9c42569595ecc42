//! Operator provisioning for Mould.
//!
//! Creates everything a shop-floor operator needs to log in with a PIN:
//! - a pre-confirmed identity in the auth service
//! - a profile row carrying company and authorization level
//! - an operator row
//! - a fast-access row holding the PIN and the sealed credentials
//!
//! Also verifies a provisioned operator end to end and resolves a PIN to its
//! credentials the same way the shop-floor client does.

pub mod api_client;
pub mod config;
pub mod error;
pub mod provision;
pub mod types;
pub mod verify;

pub use api_client::BackendClient;
pub use config::ProvisionConfig;
pub use error::{ProvisionError, ProvisionResult, ProvisionStep, VerifyCheck};
pub use provision::Provisioner;
pub use types::*;
pub use verify::{Verifier, lookup_credentials};
