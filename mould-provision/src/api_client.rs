//! HTTP client for the hosted backend.
//!
//! Covers the two collaborators provisioning needs: the auth admin API
//! (identity service) and the PostgREST table API (structured storage).
//! Every request authenticates with the configured service key. Nothing is
//! retried; a non-success status becomes [`ProvisionError::Remote`] carrying
//! the backend's own message.

use crate::config::ProvisionConfig;
use crate::error::{ProvisionError, ProvisionResult};
use crate::types::{IdentityRecord, RowFilter, UpsertOutcome};
use reqwest::{Client, Method, RequestBuilder, Response, StatusCode};
use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::Value;
use std::sync::Arc;
use tracing::{debug, warn};

const IDENTITY_PATH: &str = "/auth/v1/admin/users";
const TABLE_PATH: &str = "/rest/v1";
const RETURN_REPRESENTATION: &str = "return=representation";

/// Longest raw body excerpt quoted in an error message.
const MAX_ERROR_BODY: usize = 200;

/// HTTP client for the identity service and structured storage.
pub struct BackendClient {
    client: Client,
    config: Arc<ProvisionConfig>,
}

impl BackendClient {
    /// Validates the config and builds the underlying HTTP client.
    pub fn new(config: Arc<ProvisionConfig>) -> ProvisionResult<Self> {
        config.validate()?;
        let client = Client::builder()
            .timeout(config.request_timeout())
            .build()?;
        Ok(Self { client, config })
    }

    pub fn config(&self) -> &ProvisionConfig {
        &self.config
    }

    fn request(&self, method: Method, path: &str) -> RequestBuilder {
        let url = format!("{}{}", self.config.base_url(), path);
        self.client
            .request(method, url)
            .bearer_auth(&self.config.service_key)
            .header("apikey", &self.config.service_key)
    }

    // ── Identity ──

    /// Creates a pre-confirmed identity and returns its id.
    pub async fn create_identity(&self, email: &str, password: &str) -> ProvisionResult<String> {
        debug!("POST {IDENTITY_PATH} for {email}");
        let resp = self
            .request(Method::POST, IDENTITY_PATH)
            .json(&serde_json::json!({
                "email": email,
                "password": password,
                "email_confirm": true,
            }))
            .send()
            .await?;

        let resp = expect_status(resp, &[StatusCode::OK, StatusCode::CREATED]).await?;
        let identity: IdentityRecord = resp.json().await?;
        if identity.id.is_empty() {
            return Err(ProvisionError::UnexpectedResponse(
                "identity created without an id".to_string(),
            ));
        }
        Ok(identity.id)
    }

    /// Fetches an identity by id. `None` when the backend reports 404.
    pub async fn fetch_identity(
        &self,
        identity_id: &str,
    ) -> ProvisionResult<Option<IdentityRecord>> {
        let path = format!("{IDENTITY_PATH}/{identity_id}");
        debug!("GET {path}");
        let resp = self.request(Method::GET, &path).send().await?;

        if resp.status() == StatusCode::NOT_FOUND {
            return Ok(None);
        }
        let resp = expect_status(resp, &[StatusCode::OK]).await?;
        Ok(Some(resp.json().await?))
    }

    // ── Storage ──

    /// Inserts one row and returns the rows the backend echoes back.
    pub async fn insert_row<T>(&self, table: &str, row: &T) -> ProvisionResult<Vec<Value>>
    where
        T: Serialize + ?Sized,
    {
        let path = format!("{TABLE_PATH}/{table}");
        debug!("POST {path}");
        let resp = self
            .request(Method::POST, &path)
            .header("Prefer", RETURN_REPRESENTATION)
            .json(row)
            .send()
            .await?;

        let resp = expect_status(resp, &[StatusCode::OK, StatusCode::CREATED]).await?;
        read_rows(resp).await
    }

    /// Patches every row matching `filter` and returns the updated rows.
    pub async fn update_rows<T>(
        &self,
        table: &str,
        filter: &RowFilter,
        patch: &T,
    ) -> ProvisionResult<Vec<Value>>
    where
        T: Serialize + ?Sized,
    {
        let path = format!("{TABLE_PATH}/{table}");
        debug!("PATCH {path} where {} = {}", filter.column, filter.value);
        let resp = self
            .request(Method::PATCH, &path)
            .query(&[filter.query_pair()])
            .header("Prefer", RETURN_REPRESENTATION)
            .json(patch)
            .send()
            .await?;

        let resp = expect_status(resp, &[StatusCode::OK]).await?;
        read_rows(resp).await
    }

    /// Updates the row matching `filter`, inserting it when none exists.
    pub async fn upsert_row<T>(
        &self,
        table: &str,
        filter: &RowFilter,
        row: &T,
    ) -> ProvisionResult<UpsertOutcome>
    where
        T: Serialize + ?Sized,
    {
        let updated = self.update_rows(table, filter, row).await?;
        if !updated.is_empty() {
            return Ok(UpsertOutcome::Updated(updated.len()));
        }

        debug!("no {table} row matched, inserting");
        self.insert_row(table, row).await?;
        Ok(UpsertOutcome::Inserted)
    }

    /// Returns every row matching `filter`.
    pub async fn select_rows(
        &self,
        table: &str,
        filter: &RowFilter,
    ) -> ProvisionResult<Vec<Value>> {
        let path = format!("{TABLE_PATH}/{table}");
        debug!("GET {path} where {} = {}", filter.column, filter.value);
        let resp = self
            .request(Method::GET, &path)
            .query(&[filter.query_pair()])
            .send()
            .await?;

        let resp = expect_status(resp, &[StatusCode::OK]).await?;
        read_rows(resp).await
    }

    /// Returns the single row matching `filter`, if any.
    ///
    /// More than one match is an error: callers use this for keys that the
    /// schema treats as unique.
    pub async fn fetch_row<R>(&self, table: &str, filter: &RowFilter) -> ProvisionResult<Option<R>>
    where
        R: DeserializeOwned,
    {
        let mut rows = self.select_rows(table, filter).await?;
        match rows.len() {
            0 => Ok(None),
            1 => Ok(Some(serde_json::from_value(rows.remove(0))?)),
            count => Err(ProvisionError::DuplicateRow {
                table: table.to_string(),
                count,
            }),
        }
    }
}

/// Passes the response through if its status is accepted, otherwise turns
/// the body into a `Remote` error.
async fn expect_status(resp: Response, accepted: &[StatusCode]) -> ProvisionResult<Response> {
    let status = resp.status();
    if accepted.contains(&status) {
        return Ok(resp);
    }

    let body = resp.text().await.unwrap_or_default();
    let message = error_message(&body);
    warn!("backend rejected request with {status}: {message}");
    Err(ProvisionError::Remote {
        status: status.as_u16(),
        message,
    })
}

/// Picks the human-readable part of a backend error body.
fn error_message(body: &str) -> String {
    if let Ok(Value::Object(map)) = serde_json::from_str::<Value>(body) {
        for key in ["message", "msg", "error_description", "error"] {
            if let Some(Value::String(text)) = map.get(key) {
                return text.clone();
            }
        }
        return "unknown error".to_string();
    }

    let trimmed = body.trim();
    if trimmed.is_empty() {
        return "unknown error".to_string();
    }
    trimmed.chars().take(MAX_ERROR_BODY).collect()
}

/// Reads a PostgREST body as a list of rows. An empty body is zero rows.
async fn read_rows(resp: Response) -> ProvisionResult<Vec<Value>> {
    let body = resp.text().await?;
    if body.trim().is_empty() {
        return Ok(Vec::new());
    }

    match serde_json::from_str::<Value>(&body)? {
        Value::Array(rows) => Ok(rows),
        row @ Value::Object(_) => Ok(vec![row]),
        other => Err(ProvisionError::UnexpectedResponse(format!(
            "expected rows, got {other}"
        ))),
    }
}
