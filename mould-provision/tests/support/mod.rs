//! Shared helpers for tests against a mocked backend.

#![allow(dead_code)]

use mould_provision::{BackendClient, ProvisionConfig};
use serde_json::{Value, json};
use std::sync::Arc;
use uuid::Uuid;
use wiremock::matchers::{method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

pub const SERVICE_KEY: &str = "service-role-test-key";

pub fn test_config(server: &MockServer) -> ProvisionConfig {
    ProvisionConfig {
        backend_url: server.uri(),
        service_key: SERVICE_KEY.into(),
        default_password: "indus1234".into(),
        company_id: 5,
        operator_level: 2,
        request_timeout_secs: 5,
    }
}

pub fn client(server: &MockServer) -> Arc<BackendClient> {
    Arc::new(BackendClient::new(Arc::new(test_config(server))).unwrap())
}

pub fn new_identity_id() -> String {
    Uuid::new_v4().to_string()
}

pub fn identity_body(id: &str, email: &str) -> Value {
    json!({
        "id": id,
        "email": email,
        "email_confirmed_at": "2025-01-01T00:00:00Z",
        "role": "authenticated"
    })
}

/// Mounts every endpoint the saga touches, answering as a healthy backend
/// with no existing rows.
pub async fn mount_happy_backend(server: &MockServer, identity_id: &str, operator_id: i64) {
    Mock::given(method("GET"))
        .and(path("/rest/v1/operator_fast_acess"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
        .mount(server)
        .await;

    Mock::given(method("POST"))
        .and(path("/auth/v1/admin/users"))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(identity_body(identity_id, "ignored@x.io")),
        )
        .mount(server)
        .await;

    Mock::given(method("PATCH"))
        .and(path("/rest/v1/users"))
        .and(query_param("id", format!("eq.{identity_id}")))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
        .mount(server)
        .await;

    Mock::given(method("POST"))
        .and(path("/rest/v1/users"))
        .respond_with(ResponseTemplate::new(201).set_body_json(json!([{ "id": identity_id }])))
        .mount(server)
        .await;

    Mock::given(method("POST"))
        .and(path("/rest/v1/operador"))
        .respond_with(
            ResponseTemplate::new(201).set_body_json(json!([{ "id": operator_id, "nome": "x" }])),
        )
        .mount(server)
        .await;

    Mock::given(method("POST"))
        .and(path("/rest/v1/operator_fast_acess"))
        .respond_with(ResponseTemplate::new(201).set_body_json(json!([{ "id": 1 }])))
        .mount(server)
        .await;
}

/// Bodies of all requests received on `method path`, in arrival order.
pub async fn bodies_for(server: &MockServer, verb: &str, route: &str) -> Vec<Value> {
    server
        .received_requests()
        .await
        .unwrap_or_default()
        .into_iter()
        .filter(|r| r.method.as_str() == verb && r.url.path() == route)
        .map(|r| r.body_json::<Value>().unwrap())
        .collect()
}
