//! Lifecycle of `github_actions_secret` against a mock GitHub.

mod support;

use base64::Engine;
use hubform_github::{Error, Provider};
use hubform_protocol::{ReadOutcome, Record};
use serde_json::{Value, json};
use support::{attrs, client, not_found, public_key};
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

const SECRET_PATH: &str = "/repos/octo-org/hello-world/actions/secrets/DEPLOY_KEY";

fn metadata(updated_at: &str) -> Value {
    json!({
        "name": "DEPLOY_KEY",
        "created_at": "2024-01-10T10:00:00Z",
        "updated_at": updated_at,
    })
}

fn stored(updated_at: &str) -> Record {
    let mut record = Record::new("hello-world:DEPLOY_KEY");
    record.set("repository", "hello-world");
    record.set("secret_name", "DEPLOY_KEY");
    record.set("destroy_on_drift", true);
    record.set("updated_at", updated_at);
    record
}

#[tokio::test]
async fn create_seals_plaintext_to_the_repository_key() {
    let server = MockServer::start().await;
    let (secret_key, key) = public_key();

    Mock::given(method("GET"))
        .and(path("/repos/octo-org/hello-world/actions/secrets/public-key"))
        .respond_with(ResponseTemplate::new(200).set_body_json(key))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("PUT"))
        .and(path(SECRET_PATH))
        .respond_with(ResponseTemplate::new(201))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path(SECRET_PATH))
        .respond_with(ResponseTemplate::new(200).set_body_json(metadata("2024-01-10T10:00:00Z")))
        .mount(&server)
        .await;

    let record = Provider::new()
        .create(
            &client(&server),
            "github_actions_secret",
            &attrs(json!({
                "repository": "hello-world",
                "secret_name": "DEPLOY_KEY",
                "plaintext_value": "hunter2",
            })),
        )
        .await
        .unwrap();

    assert_eq!(record.id, "hello-world:DEPLOY_KEY");
    assert_eq!(record.get_str("updated_at"), Some("2024-01-10T10:00:00Z"));
    assert_eq!(record.get_bool("destroy_on_drift"), Some(true));

    let requests = server.received_requests().await.unwrap();
    let put = requests
        .iter()
        .find(|r| r.method.as_str() == "PUT")
        .unwrap();
    let body: Value = serde_json::from_slice(&put.body).unwrap();
    assert_eq!(body["key_id"], "568250167242549743");

    let sealed = base64::engine::general_purpose::STANDARD
        .decode(body["encrypted_value"].as_str().unwrap())
        .unwrap();
    assert_eq!(sealed.len(), "hunter2".len() + 48);
    assert_eq!(secret_key.unseal(&sealed).unwrap(), b"hunter2");
}

#[tokio::test]
async fn invalid_configuration_never_reaches_github() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(500))
        .expect(0)
        .mount(&server)
        .await;

    let err = Provider::new()
        .create(
            &client(&server),
            "github_actions_secret",
            &attrs(json!({
                "repository": "hello-world",
                "secret_name": "DEPLOY_KEY",
                "plaintext_value": "hunter2",
                "encrypted_value": "c2VhbGVk",
            })),
        )
        .await
        .unwrap_err();

    let Error::Validation(diags) = err else {
        panic!("expected a validation error, got {err:?}");
    };
    assert!(diags.mentions("encrypted_value"));
    assert!(diags.mentions("plaintext_value"));
}

#[tokio::test]
async fn read_of_deleted_secret_clears_identity() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path(SECRET_PATH))
        .respond_with(not_found())
        .mount(&server)
        .await;

    let mut record = stored("2024-01-10T10:00:00Z");
    let outcome = Provider::new()
        .read(&client(&server), "github_actions_secret", &mut record)
        .await
        .unwrap();

    assert_eq!(outcome, ReadOutcome::Removed);
    assert!(!record.exists());
}

#[tokio::test]
async fn changed_marker_forces_replacement() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path(SECRET_PATH))
        .respond_with(ResponseTemplate::new(200).set_body_json(metadata("2024-02-01T08:30:00Z")))
        .mount(&server)
        .await;

    let mut record = stored("2024-01-10T10:00:00Z");
    let outcome = Provider::new()
        .read(&client(&server), "github_actions_secret", &mut record)
        .await
        .unwrap();

    assert_eq!(outcome, ReadOutcome::Drifted);
    assert!(!record.exists());
    // The stale marker is left alone rather than overwritten.
    assert_eq!(record.get_str("updated_at"), Some("2024-01-10T10:00:00Z"));
}

#[tokio::test]
async fn drift_is_accepted_when_opted_out() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path(SECRET_PATH))
        .respond_with(ResponseTemplate::new(200).set_body_json(metadata("2024-02-01T08:30:00Z")))
        .mount(&server)
        .await;

    let mut record = stored("2024-01-10T10:00:00Z");
    record.set("destroy_on_drift", false);
    let outcome = Provider::new()
        .read(&client(&server), "github_actions_secret", &mut record)
        .await
        .unwrap();

    assert_eq!(outcome, ReadOutcome::Refreshed);
    assert_eq!(record.id, "hello-world:DEPLOY_KEY");
    assert_eq!(record.get_str("updated_at"), Some("2024-02-01T08:30:00Z"));
}

#[tokio::test]
async fn same_instant_in_another_notation_is_not_drift() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path(SECRET_PATH))
        .respond_with(ResponseTemplate::new(200).set_body_json(metadata("2024-01-10T11:00:00+01:00")))
        .mount(&server)
        .await;

    let mut record = stored("2024-01-10T10:00:00Z");
    let outcome = Provider::new()
        .read(&client(&server), "github_actions_secret", &mut record)
        .await
        .unwrap();

    assert_eq!(outcome, ReadOutcome::Refreshed);
    assert!(record.exists());
}

#[tokio::test]
async fn server_errors_are_fatal_and_name_the_endpoint() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path(SECRET_PATH))
        .respond_with(ResponseTemplate::new(403).set_body_json(json!({
            "message": "Resource not accessible by integration",
        })))
        .mount(&server)
        .await;

    let mut record = stored("2024-01-10T10:00:00Z");
    let err = Provider::new()
        .read(&client(&server), "github_actions_secret", &mut record)
        .await
        .unwrap_err();

    assert!(matches!(&err, Error::Api { endpoint, .. } if endpoint == SECRET_PATH), "{err:?}");
    assert!(record.exists());
}

#[tokio::test]
async fn delete_treats_missing_secret_as_deleted() {
    let server = MockServer::start().await;
    Mock::given(method("DELETE"))
        .and(path(SECRET_PATH))
        .respond_with(not_found())
        .expect(1)
        .mount(&server)
        .await;

    Provider::new()
        .delete(&client(&server), "github_actions_secret", &stored("2024-01-10T10:00:00Z"))
        .await
        .unwrap();
}

#[tokio::test]
async fn import_reads_the_secret_back() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path(SECRET_PATH))
        .respond_with(ResponseTemplate::new(200).set_body_json(metadata("2024-01-10T10:00:00Z")))
        .mount(&server)
        .await;

    let record = Provider::new()
        .import(&client(&server), "github_actions_secret", "hello-world/DEPLOY_KEY")
        .await
        .unwrap();

    assert_eq!(record.id, "hello-world:DEPLOY_KEY");
    assert_eq!(record.get_str("created_at"), Some("2024-01-10T10:00:00Z"));
    assert_eq!(record.get_str("repository"), Some("hello-world"));
    assert!(record.get("plaintext_value").is_none());
}

#[tokio::test]
async fn update_is_refused() {
    let server = MockServer::start().await;
    let err = Provider::new()
        .update(
            &client(&server),
            "github_actions_secret",
            &stored("2024-01-10T10:00:00Z"),
            &attrs(json!({"repository": "hello-world", "secret_name": "DEPLOY_KEY", "plaintext_value": "x"})),
        )
        .await
        .unwrap_err();
    assert!(err.to_string().contains("does not support in-place updates"));
}
