//! Shared fixtures for tests against a mock GitHub server.

#![allow(dead_code)]

use hubform_github::GitHubClient;
use hubform_protocol::Attributes;
use secrecy::SecretString;
use serde_json::{Value, json};
use wiremock::MockServer;
use wiremock::ResponseTemplate;

pub const OWNER: &str = "octo-org";

/// A client authenticated with a dummy token against `server`.
pub fn client(server: &MockServer) -> GitHubClient {
    GitHubClient::builder()
        .base_url(server.uri())
        .token(SecretString::from("test-token".to_string()))
        .owner(OWNER)
        .build()
        .unwrap()
}

/// Converts a JSON object literal into attributes.
pub fn attrs(value: Value) -> Attributes {
    match value {
        Value::Object(map) => map,
        other => panic!("expected an object, got {other}"),
    }
}

/// GitHub's 404 body.
pub fn not_found() -> ResponseTemplate {
    ResponseTemplate::new(404).set_body_json(json!({
        "message": "Not Found",
        "documentation_url": "https://docs.github.com/rest",
    }))
}

/// A repository public key whose secret half the test keeps.
pub fn public_key() -> (crypto_box::SecretKey, Value) {
    use base64::Engine;

    let secret = crypto_box::SecretKey::generate(&mut crypto_box::aead::OsRng);
    let key = base64::engine::general_purpose::STANDARD.encode(secret.public_key().as_bytes());
    (secret, json!({"key_id": "568250167242549743", "key": key}))
}
