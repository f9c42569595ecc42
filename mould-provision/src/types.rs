//! Rows, requests and results exchanged with the backend.
//!
//! Column names follow the backend schema, which is why several fields carry
//! a `serde(rename)`.

use crate::error::{ProvisionError, ProvisionResult};
use chrono::{DateTime, Utc};
use mould_crypto::Pin;
use serde::{Deserialize, Serialize};

/// Profile / authorization-level table, keyed by identity id.
pub const PROFILE_TABLE: &str = "users";

/// Operator profile table.
pub const OPERATOR_TABLE: &str = "operador";

/// PIN fast-access table.
pub const FAST_ACCESS_TABLE: &str = "operator_fast_acess";

/// Equality filter on a single column (`?column=eq.value`).
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RowFilter {
    pub column: String,
    pub value: String,
}

impl RowFilter {
    pub fn eq(column: impl Into<String>, value: impl ToString) -> Self {
        Self {
            column: column.into(),
            value: value.to_string(),
        }
    }

    /// The `(column, "eq.value")` query pair.
    pub fn query_pair(&self) -> (String, String) {
        (self.column.clone(), format!("eq.{}", self.value))
    }
}

/// What an upsert ended up doing.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum UpsertOutcome {
    /// An existing row matched the key and was updated.
    Updated(usize),
    /// No row matched, so a new one was inserted.
    Inserted,
}

/// Identity as returned by the auth admin API.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct IdentityRecord {
    pub id: String,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub email_confirmed_at: Option<DateTime<Utc>>,
}

/// Row written to the profile table.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct ProfileRow {
    pub id: String,
    pub email: String,
    pub first_name: String,
    pub last_name: String,
    #[serde(rename = "id_empresa")]
    pub company_id: i64,
    #[serde(rename = "Nivel")]
    pub level: i64,
}

impl ProfileRow {
    pub fn new(
        identity_id: &str,
        email: &str,
        full_name: &str,
        company_id: i64,
        level: i64,
    ) -> Self {
        let (first_name, last_name) = split_name(full_name);
        Self {
            id: identity_id.to_string(),
            email: email.to_string(),
            first_name,
            last_name,
            company_id,
            level,
        }
    }
}

/// Profile row as read back; columns may be null.
#[derive(Clone, Debug, Deserialize)]
pub struct ProfileRecord {
    pub id: String,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default, rename = "id_empresa")]
    pub company_id: Option<i64>,
    #[serde(default, rename = "Nivel")]
    pub level: Option<i64>,
}

/// Row written to the operator table.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct OperatorRow {
    #[serde(rename = "nome")]
    pub name: String,
    #[serde(rename = "empresa")]
    pub company_id: i64,
    #[serde(rename = "cargo")]
    pub role: String,
    #[serde(rename = "user")]
    pub identity_id: String,
    #[serde(rename = "em_trabalho")]
    pub on_shift: bool,
    #[serde(rename = "Delete")]
    pub deleted: bool,
    pub dashboard_view_style: String,
}

impl OperatorRow {
    /// A new operator: off shift, not deleted, grid dashboard.
    pub fn new(name: &str, role: &str, identity_id: &str, company_id: i64) -> Self {
        Self {
            name: name.to_string(),
            company_id,
            role: role.to_string(),
            identity_id: identity_id.to_string(),
            on_shift: false,
            deleted: false,
            dashboard_view_style: "grid".to_string(),
        }
    }
}

/// Operator row as read back.
#[derive(Clone, Debug, Deserialize)]
pub struct OperatorRecord {
    pub id: i64,
    #[serde(default, rename = "nome")]
    pub name: Option<String>,
    #[serde(default, rename = "user")]
    pub identity_id: Option<String>,
}

/// Row in the fast-access table: integer PIN plus the sealed envelope.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct FastAccessRow {
    #[serde(rename = "PIN")]
    pub pin: u32,
    #[serde(rename = "encrypted_acess")]
    pub envelope: String,
    #[serde(rename = "user")]
    pub identity_id: String,
    #[serde(rename = "operador")]
    pub operator_id: i64,
}

/// Fast-access row as read back; only the PIN is guaranteed.
#[derive(Clone, Debug, Deserialize)]
pub struct FastAccessRecord {
    #[serde(rename = "PIN")]
    pub pin: u32,
    #[serde(default, rename = "encrypted_acess")]
    pub envelope: Option<String>,
    #[serde(default, rename = "user")]
    pub identity_id: Option<String>,
    #[serde(default, rename = "operador")]
    pub operator_id: Option<i64>,
}

/// Input for provisioning one operator.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewOperator {
    pub name: String,
    pub email: String,
    pub role: String,
    pub pin: String,
}

impl NewOperator {
    /// Builds a request with surrounding whitespace stripped from every field.
    pub fn new(name: &str, email: &str, role: &str, pin: &str) -> Self {
        Self {
            name: name.trim().to_string(),
            email: email.trim().to_string(),
            role: role.trim().to_string(),
            pin: pin.trim().to_string(),
        }
    }

    /// Checks the form rules and returns the parsed PIN.
    pub fn validate(&self) -> ProvisionResult<Pin> {
        if self.name.trim().is_empty() {
            return Err(ProvisionError::Validation("name is required".to_string()));
        }
        if self.email.trim().is_empty() || !self.email.contains('@') {
            return Err(ProvisionError::Validation(format!(
                "invalid email: {:?}",
                self.email
            )));
        }
        if self.role.trim().is_empty() {
            return Err(ProvisionError::Validation("role is required".to_string()));
        }
        Pin::parse(&self.pin).map_err(|_| {
            ProvisionError::Validation("PIN must be exactly 4 digits".to_string())
        })
    }
}

/// Everything created for one operator.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProvisionedOperator {
    pub name: String,
    pub email: String,
    pub role: String,
    pub pin: u32,
    pub password: String,
    pub identity_id: String,
    pub operator_id: i64,
    pub company_id: i64,
    pub created_at: DateTime<Utc>,
}

/// Splits a full name into the first word and the rest.
pub fn split_name(full_name: &str) -> (String, String) {
    let mut parts = full_name.split_whitespace();
    let first = parts.next().unwrap_or_default().to_string();
    let rest = parts.collect::<Vec<_>>().join(" ");
    (first, rest)
}
