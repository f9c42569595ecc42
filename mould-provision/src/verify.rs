//! Post-provisioning checks and PIN credential lookup.

use crate::api_client::BackendClient;
use crate::error::{ProvisionError, ProvisionResult, VerifyCheck};
use crate::types::{
    FAST_ACCESS_TABLE, FastAccessRecord, OPERATOR_TABLE, OperatorRecord, PROFILE_TABLE,
    ProfileRecord, ProvisionedOperator, RowFilter,
};
use mould_crypto::{CredentialPayload, Pin};
use std::sync::Arc;
use tracing::{debug, info};

/// Resolves a PIN to login credentials, the way the shop-floor client does.
///
/// Looks up the fast-access row by the PIN's integer form and opens its
/// envelope with the PIN itself.
pub async fn lookup_credentials(
    api: &BackendClient,
    pin: &str,
) -> ProvisionResult<CredentialPayload> {
    let pin = Pin::parse(pin)?;
    let record: FastAccessRecord = api
        .fetch_row(FAST_ACCESS_TABLE, &RowFilter::eq("PIN", pin.as_number()))
        .await?
        .ok_or_else(|| {
            ProvisionError::NotFound(format!("no fast access for PIN {}", pin.as_number()))
        })?;

    let envelope = record.envelope.ok_or_else(|| {
        ProvisionError::NotFound(format!("fast access for PIN {} has no credentials", record.pin))
    })?;
    Ok(mould_crypto::decrypt(pin.as_str(), &envelope)?)
}

/// Confirms that every record of a provisioned operator is in place.
pub struct Verifier {
    api: Arc<BackendClient>,
}

impl Verifier {
    pub fn new(api: Arc<BackendClient>) -> Self {
        Self { api }
    }

    /// Runs the checks in order and stops at the first failure.
    pub async fn verify(&self, operator: &ProvisionedOperator) -> ProvisionResult<()> {
        let identity = self.api.fetch_identity(&operator.identity_id).await?.ok_or_else(|| {
            failed(VerifyCheck::Identity, format!("identity {} not found", operator.identity_id))
        })?;
        if identity.email_confirmed_at.is_none() {
            return Err(failed(
                VerifyCheck::Identity,
                "identity email is not confirmed".to_string(),
            ));
        }
        debug!("identity {} present", identity.id);

        let op: OperatorRecord = self
            .api
            .fetch_row(OPERATOR_TABLE, &RowFilter::eq("id", operator.operator_id))
            .await?
            .ok_or_else(|| {
                failed(
                    VerifyCheck::OperatorRow,
                    format!("operator {} not found", operator.operator_id),
                )
            })?;
        if op.identity_id.as_deref() != Some(operator.identity_id.as_str()) {
            return Err(failed(
                VerifyCheck::OperatorRow,
                "operator row points at a different identity".to_string(),
            ));
        }

        let profile: ProfileRecord = self
            .api
            .fetch_row(PROFILE_TABLE, &RowFilter::eq("id", &operator.identity_id))
            .await?
            .ok_or_else(|| failed(VerifyCheck::ProfileRow, "profile row not found".to_string()))?;
        if profile.email.as_deref().is_none_or(str::is_empty) || profile.company_id.is_none() {
            return Err(failed(
                VerifyCheck::ProfileRow,
                "profile row is missing email or company".to_string(),
            ));
        }

        let access: FastAccessRecord = self
            .api
            .fetch_row(FAST_ACCESS_TABLE, &RowFilter::eq("PIN", operator.pin))
            .await?
            .ok_or_else(|| {
                failed(VerifyCheck::FastAccessRow, "fast-access row not found".to_string())
            })?;
        let envelope = access
            .envelope
            .ok_or_else(|| {
                failed(
                    VerifyCheck::FastAccessRow,
                    "fast-access row has no credentials".to_string(),
                )
            })?;

        // The stored integer drops leading zeros; the key uses all four digits.
        let pin = format!("{:04}", operator.pin);
        let payload = mould_crypto::decrypt(&pin, &envelope)
            .map_err(|e| failed(VerifyCheck::Decryption, e.to_string()))?;
        if payload.email != operator.email || payload.password != operator.password {
            return Err(failed(
                VerifyCheck::Decryption,
                "decrypted credentials do not match the operator".to_string(),
            ));
        }

        info!("operator {} verified", operator.operator_id);
        Ok(())
    }
}

fn failed(check: VerifyCheck, reason: String) -> ProvisionError {
    ProvisionError::Verification { check, reason }
}
