//! Operator provisioning saga.
//!
//! Creating an operator touches the identity service and three tables, in an
//! order fixed by data dependencies: the identity id is needed by the profile,
//! operator and fast-access rows, and the operator id by the fast-access row.
//! The backend offers no transaction across these calls, and nothing here
//! compensates for a late failure. Whatever was already created stays in
//! place and is named in the returned [`ProvisionError::Saga`] so it can be
//! cleaned up or reconciled by hand.

use crate::api_client::BackendClient;
use crate::error::{ProvisionError, ProvisionResult, ProvisionStep};
use crate::types::{
    FAST_ACCESS_TABLE, FastAccessRecord, FastAccessRow, NewOperator, OPERATOR_TABLE,
    OperatorRow, PROFILE_TABLE, ProfileRow, ProvisionedOperator, RowFilter, UpsertOutcome,
};
use chrono::Utc;
use serde_json::Value;
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Runs the provisioning steps against a backend.
pub struct Provisioner {
    api: Arc<BackendClient>,
}

/// Ids created so far, reported when a later step fails.
#[derive(Default)]
struct Progress {
    identity_id: Option<String>,
    operator_id: Option<i64>,
}

impl Progress {
    fn fail(&self, step: ProvisionStep, source: ProvisionError) -> ProvisionError {
        warn!("provisioning failed at {step}: {source}");
        ProvisionError::Saga {
            step,
            identity_id: self.identity_id.clone(),
            operator_id: self.operator_id,
            source: Box::new(source),
        }
    }
}

impl Provisioner {
    pub fn new(api: Arc<BackendClient>) -> Self {
        Self { api }
    }

    /// Creates the identity, profile row, operator row and fast-access row
    /// for one operator.
    ///
    /// Input validation and credential sealing happen before any request is
    /// sent, and a PIN already present in the fast-access table stops the
    /// saga before anything is created.
    pub async fn provision(&self, request: &NewOperator) -> ProvisionResult<ProvisionedOperator> {
        let pin = request.validate()?;
        let config = self.api.config();
        let password = config.default_password.as_str();
        let mut progress = Progress::default();

        info!("provisioning operator {}", request.email);

        let sealed = mould_crypto::self_test(pin.as_str(), &request.email, password)
            .map_err(|e| progress.fail(ProvisionStep::Credentials, e.into()))?;
        debug!("credentials sealed and verified locally");

        let existing: Option<FastAccessRecord> = self
            .api
            .fetch_row(FAST_ACCESS_TABLE, &RowFilter::eq("PIN", sealed.pin))
            .await
            .map_err(|e| progress.fail(ProvisionStep::PinAvailability, e))?;
        if existing.is_some() {
            return Err(progress.fail(
                ProvisionStep::PinAvailability,
                ProvisionError::PinTaken(sealed.pin),
            ));
        }

        let identity_id = self
            .api
            .create_identity(&request.email, password)
            .await
            .map_err(|e| progress.fail(ProvisionStep::Identity, e))?;
        progress.identity_id = Some(identity_id.clone());
        info!("created identity {identity_id}");

        let profile = ProfileRow::new(
            &identity_id,
            &request.email,
            &request.name,
            config.company_id,
            config.operator_level,
        );
        let outcome = self
            .api
            .upsert_row(PROFILE_TABLE, &RowFilter::eq("id", &identity_id), &profile)
            .await
            .map_err(|e| progress.fail(ProvisionStep::Profile, e))?;
        match outcome {
            UpsertOutcome::Updated(n) => info!("updated {n} existing profile row(s)"),
            UpsertOutcome::Inserted => info!("inserted profile row"),
        }

        let operator =
            OperatorRow::new(&request.name, &request.role, &identity_id, config.company_id);
        let operator_id = self
            .api
            .insert_row(OPERATOR_TABLE, &operator)
            .await
            .and_then(|rows| first_id(&rows))
            .map_err(|e| progress.fail(ProvisionStep::Operator, e))?;
        progress.operator_id = Some(operator_id);
        info!("created operator {operator_id}");

        let fast_access = FastAccessRow {
            pin: sealed.pin,
            envelope: sealed.envelope,
            identity_id: identity_id.clone(),
            operator_id,
        };
        self.api
            .insert_row(FAST_ACCESS_TABLE, &fast_access)
            .await
            .map_err(|e| progress.fail(ProvisionStep::FastAccess, e))?;
        info!("fast access enabled for operator {operator_id}");

        Ok(ProvisionedOperator {
            name: request.name.clone(),
            email: request.email.clone(),
            role: request.role.clone(),
            pin: sealed.pin,
            password: password.to_string(),
            identity_id,
            operator_id,
            company_id: config.company_id,
            created_at: Utc::now(),
        })
    }
}

/// Reads the generated `id` of the first returned row.
fn first_id(rows: &[Value]) -> ProvisionResult<i64> {
    rows.first()
        .and_then(|row| row.get("id"))
        .and_then(Value::as_i64)
        .ok_or_else(|| {
            ProvisionError::UnexpectedResponse("insert did not return a row id".to_string())
        })
}
