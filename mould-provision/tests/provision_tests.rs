mod support;

use mould_provision::{NewOperator, ProvisionError, ProvisionStep, Provisioner};
use pretty_assertions::assert_eq;
use serde_json::json;
use support::{bodies_for, client, mount_happy_backend, new_identity_id};
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn ana() -> NewOperator {
    NewOperator::new("Ana Paula Souza", "ana@plant.io", "Operadora", "0427")
}

#[tokio::test]
async fn provisions_all_records() {
    let server = MockServer::start().await;
    let identity_id = new_identity_id();
    mount_happy_backend(&server, &identity_id, 31).await;

    let provisioner = Provisioner::new(client(&server));
    let created = provisioner.provision(&ana()).await.unwrap();

    assert_eq!(created.identity_id, identity_id);
    assert_eq!(created.operator_id, 31);
    assert_eq!(created.pin, 427);
    assert_eq!(created.password, "indus1234");
    assert_eq!(created.company_id, 5);
    assert_eq!(created.name, "Ana Paula Souza");

    let identities = bodies_for(&server, "POST", "/auth/v1/admin/users").await;
    assert_eq!(
        identities,
        vec![json!({
            "email": "ana@plant.io",
            "password": "indus1234",
            "email_confirm": true
        })]
    );
}

#[tokio::test]
async fn writes_profile_and_operator_columns() {
    let server = MockServer::start().await;
    let identity_id = new_identity_id();
    mount_happy_backend(&server, &identity_id, 8).await;

    Provisioner::new(client(&server)).provision(&ana()).await.unwrap();

    // PATCH matched nothing, so the profile was inserted with the same body.
    let patched = bodies_for(&server, "PATCH", "/rest/v1/users").await;
    let inserted = bodies_for(&server, "POST", "/rest/v1/users").await;
    let expected_profile = json!({
        "id": identity_id,
        "email": "ana@plant.io",
        "first_name": "Ana",
        "last_name": "Paula Souza",
        "id_empresa": 5,
        "Nivel": 2
    });
    assert_eq!(patched, vec![expected_profile.clone()]);
    assert_eq!(inserted, vec![expected_profile]);

    let operators = bodies_for(&server, "POST", "/rest/v1/operador").await;
    assert_eq!(
        operators,
        vec![json!({
            "nome": "Ana Paula Souza",
            "empresa": 5,
            "cargo": "Operadora",
            "user": identity_id,
            "em_trabalho": false,
            "Delete": false,
            "dashboard_view_style": "grid"
        })]
    );
}

#[tokio::test]
async fn fast_access_row_opens_with_the_pin() {
    let server = MockServer::start().await;
    let identity_id = new_identity_id();
    mount_happy_backend(&server, &identity_id, 12).await;

    Provisioner::new(client(&server)).provision(&ana()).await.unwrap();

    let rows = bodies_for(&server, "POST", "/rest/v1/operator_fast_acess").await;
    assert_eq!(rows.len(), 1);
    let row = &rows[0];
    assert_eq!(row["PIN"], 427);
    assert_eq!(row["user"], identity_id.as_str());
    assert_eq!(row["operador"], 12);

    let envelope = row["encrypted_acess"].as_str().unwrap();
    let payload = mould_crypto::decrypt("0427", envelope).unwrap();
    assert_eq!(payload.email, "ana@plant.io");
    assert_eq!(payload.password, "indus1234");

    // The integer form alone does not open it.
    assert!(mould_crypto::decrypt("427", envelope).is_err());
}

#[tokio::test]
async fn existing_profile_is_updated_not_inserted() {
    let server = MockServer::start().await;
    let identity_id = new_identity_id();

    // Mounted first, so it wins over the empty PATCH answer below.
    Mock::given(method("PATCH"))
        .and(path("/rest/v1/users"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([{ "id": identity_id }])))
        .mount(&server)
        .await;
    mount_happy_backend(&server, &identity_id, 4).await;

    Provisioner::new(client(&server)).provision(&ana()).await.unwrap();

    assert_eq!(bodies_for(&server, "PATCH", "/rest/v1/users").await.len(), 1);
    assert!(bodies_for(&server, "POST", "/rest/v1/users").await.is_empty());
}

#[tokio::test]
async fn invalid_request_sends_nothing() {
    let server = MockServer::start().await;
    let provisioner = Provisioner::new(client(&server));

    let bad_pin = NewOperator::new("Ana", "ana@plant.io", "Op", "12a4");
    let err = provisioner.provision(&bad_pin).await.unwrap_err();
    assert!(matches!(err, ProvisionError::Validation(_)));
    assert_eq!(err.failed_step(), None);

    let bad_email = NewOperator::new("Ana", "ana.plant.io", "Op", "1234");
    assert!(matches!(
        provisioner.provision(&bad_email).await,
        Err(ProvisionError::Validation(_))
    ));

    let received = server.received_requests().await.unwrap();
    assert!(received.is_empty());
}

#[tokio::test]
async fn taken_pin_stops_before_identity_creation() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/rest/v1/operator_fast_acess"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            { "PIN": 427, "encrypted_acess": "{}", "user": "other", "operador": 1 }
        ])))
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/auth/v1/admin/users"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&server)
        .await;

    let err = Provisioner::new(client(&server))
        .provision(&ana())
        .await
        .unwrap_err();

    match err {
        ProvisionError::Saga {
            step,
            identity_id,
            operator_id,
            source,
        } => {
            assert_eq!(step, ProvisionStep::PinAvailability);
            assert_eq!(identity_id, None);
            assert_eq!(operator_id, None);
            assert!(matches!(*source, ProvisionError::PinTaken(427)));
        }
        other => panic!("expected saga failure, got {other:?}"),
    }
}

#[tokio::test]
async fn identity_failure_carries_remote_message() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/auth/v1/admin/users"))
        .respond_with(ResponseTemplate::new(422).set_body_json(json!({
            "msg": "A user with this email address has already been registered"
        })))
        .mount(&server)
        .await;
    mount_happy_backend(&server, "unused", 1).await;

    let err = Provisioner::new(client(&server))
        .provision(&ana())
        .await
        .unwrap_err();

    assert_eq!(err.failed_step(), Some(ProvisionStep::Identity));
    assert_eq!(
        err.to_string(),
        "provisioning stopped at identity creation: backend returned HTTP 422: \
         A user with this email address has already been registered"
    );
    assert!(bodies_for(&server, "POST", "/rest/v1/operador").await.is_empty());
}

#[tokio::test]
async fn operator_failure_reports_created_identity() {
    let server = MockServer::start().await;
    let identity_id = new_identity_id();
    Mock::given(method("POST"))
        .and(path("/rest/v1/operador"))
        .respond_with(ResponseTemplate::new(400).set_body_json(json!({
            "message": "null value in column \"cargo\""
        })))
        .mount(&server)
        .await;
    mount_happy_backend(&server, &identity_id, 1).await;

    let err = Provisioner::new(client(&server))
        .provision(&ana())
        .await
        .unwrap_err();

    match &err {
        ProvisionError::Saga {
            step,
            identity_id: left_identity,
            operator_id,
            ..
        } => {
            assert_eq!(*step, ProvisionStep::Operator);
            assert_eq!(left_identity.as_deref(), Some(identity_id.as_str()));
            assert_eq!(*operator_id, None);
        }
        other => panic!("expected saga failure, got {other:?}"),
    }
    assert!(err.to_string().contains(&format!("left in place: identity {identity_id}")));
    assert!(bodies_for(&server, "POST", "/rest/v1/operator_fast_acess").await.is_empty());
}

#[tokio::test]
async fn operator_insert_without_id_is_a_saga_failure() {
    let server = MockServer::start().await;
    let identity_id = new_identity_id();
    Mock::given(method("POST"))
        .and(path("/rest/v1/operador"))
        .respond_with(ResponseTemplate::new(201))
        .mount(&server)
        .await;
    mount_happy_backend(&server, &identity_id, 1).await;

    let err = Provisioner::new(client(&server))
        .provision(&ana())
        .await
        .unwrap_err();

    assert_eq!(err.failed_step(), Some(ProvisionStep::Operator));
    match err {
        ProvisionError::Saga { source, .. } => {
            assert!(matches!(*source, ProvisionError::UnexpectedResponse(_)));
        }
        other => panic!("expected saga failure, got {other:?}"),
    }
}

#[tokio::test]
async fn fast_access_failure_reports_both_ids() {
    let server = MockServer::start().await;
    let identity_id = new_identity_id();
    Mock::given(method("POST"))
        .and(path("/rest/v1/operator_fast_acess"))
        .respond_with(ResponseTemplate::new(409).set_body_json(json!({
            "message": "duplicate key value violates unique constraint"
        })))
        .mount(&server)
        .await;
    mount_happy_backend(&server, &identity_id, 77).await;

    let err = Provisioner::new(client(&server))
        .provision(&ana())
        .await
        .unwrap_err();

    match &err {
        ProvisionError::Saga {
            step,
            identity_id: left_identity,
            operator_id,
            source,
        } => {
            assert_eq!(*step, ProvisionStep::FastAccess);
            assert_eq!(left_identity.as_deref(), Some(identity_id.as_str()));
            assert_eq!(*operator_id, Some(77));
            assert!(matches!(**source, ProvisionError::Remote { status: 409, .. }));
        }
        other => panic!("expected saga failure, got {other:?}"),
    }
    assert!(
        err.to_string()
            .contains(&format!("identity {identity_id}, operator 77"))
    );
}

#[tokio::test]
async fn pin_check_failure_stops_the_saga() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/rest/v1/operator_fast_acess"))
        .respond_with(
            ResponseTemplate::new(401).set_body_json(json!({ "message": "Invalid API key" })),
        )
        .mount(&server)
        .await;

    let err = Provisioner::new(client(&server))
        .provision(&ana())
        .await
        .unwrap_err();

    assert_eq!(err.failed_step(), Some(ProvisionStep::PinAvailability));
    assert_eq!(server.received_requests().await.unwrap().len(), 1);
}
