//! Resource lifecycles against a mock GitHub.

mod support;

use hubform_github::Provider;
use hubform_protocol::{Attributes, PlanAction, ReadOutcome, Record};
use serde_json::{Value, json};
use support::{attrs, client, not_found, public_key};
use wiremock::matchers::{body_json, body_partial_json, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

const HOOKS: &str = "/repos/octo-org/hello-world/hooks";
const PERMISSIONS: &str = "/repos/octo-org/hello-world/actions/permissions";
const ORG_SECRET: &str = "/orgs/octo-org/actions/secrets/SHARED_TOKEN";
const PROPERTY_VALUES: &str = "/repos/octo-org/hello-world/properties/values";

/// Plans `config` against freshly created or imported state.
fn plan_after(provider: &Provider, type_name: &str, record: &Record, config: &Attributes) -> PlanAction {
    provider.plan(type_name, Some(record), config).unwrap()
}

fn hook(secret: &str) -> Value {
    json!({
        "id": 12345678,
        "url": "https://api.github.com/repos/octo-org/hello-world/hooks/12345678",
        "active": true,
        "events": ["push", "pull_request"],
        "config": {
            "url": "https://example.com/webhook",
            "content_type": "json",
            "secret": secret,
            "insecure_ssl": "0",
        },
    })
}

#[tokio::test]
async fn webhook_create_uses_the_hook_id() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path(HOOKS))
        .and(body_partial_json(json!({
            "name": "web",
            "config": {"url": "https://example.com/webhook", "secret": "s3cr3t"},
        })))
        .respond_with(ResponseTemplate::new(201).set_body_json(hook("********")))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path(format!("{HOOKS}/12345678")))
        .respond_with(ResponseTemplate::new(200).set_body_json(hook("********")))
        .mount(&server)
        .await;

    let provider = Provider::new();
    let config = attrs(json!({
        "repository": "hello-world",
        "events": ["push", "pull_request"],
        "configuration": {"url": "https://example.com/webhook", "secret": "s3cr3t"},
    }));
    let record = provider
        .create(&client(&server), "github_repository_webhook", &config)
        .await
        .unwrap();

    assert_eq!(record.id, "12345678");
    assert_eq!(record.get_bool("active"), Some(true));
    assert_eq!(record.get("configuration").unwrap()["content_type"], "json");
    assert_eq!(
        plan_after(&provider, "github_repository_webhook", &record, &config),
        PlanAction::NoOp
    );
}

#[tokio::test]
async fn webhook_read_keeps_the_secret_from_state() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path(format!("{HOOKS}/12345678")))
        .respond_with(ResponseTemplate::new(200).set_body_json(hook("********")))
        .mount(&server)
        .await;

    let mut record = Record::new("12345678");
    record.set("repository", "hello-world");
    record.set(
        "configuration",
        json!({"url": "https://example.com/webhook", "secret": "s3cr3t"}),
    );

    let outcome = Provider::new()
        .read(&client(&server), "github_repository_webhook", &mut record)
        .await
        .unwrap();

    assert_eq!(outcome, ReadOutcome::Refreshed);
    let configuration = record.get("configuration").unwrap();
    assert_eq!(configuration["secret"], "s3cr3t");
    assert_eq!(configuration["insecure_ssl"], false);
    assert_eq!(record.get("events"), Some(&json!(["push", "pull_request"])));
}

#[tokio::test]
async fn imported_webhook_has_no_secret() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path(format!("{HOOKS}/12345678")))
        .respond_with(ResponseTemplate::new(200).set_body_json(hook("********")))
        .mount(&server)
        .await;

    let record = Provider::new()
        .import(&client(&server), "github_repository_webhook", "hello-world/12345678")
        .await
        .unwrap();

    assert_eq!(record.id, "12345678");
    assert_eq!(record.get_str("repository"), Some("hello-world"));
    assert!(record.get("configuration").unwrap().get("secret").is_none());
}

#[tokio::test]
async fn selected_actions_are_written_and_read_back() {
    let server = MockServer::start().await;
    let selected = json!({"github_owned_allowed": true, "patterns_allowed": ["octo-org/*"]});

    Mock::given(method("PUT"))
        .and(path(PERMISSIONS))
        .and(body_json(json!({"enabled": true, "allowed_actions": "selected"})))
        .respond_with(ResponseTemplate::new(204))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("PUT"))
        .and(path(format!("{PERMISSIONS}/selected-actions")))
        .and(body_json(selected.clone()))
        .respond_with(ResponseTemplate::new(204))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path(PERMISSIONS))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(json!({"enabled": true, "allowed_actions": "selected"})),
        )
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path(format!("{PERMISSIONS}/selected-actions")))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "github_owned_allowed": true,
            "verified_allowed": false,
            "patterns_allowed": ["octo-org/*"],
        })))
        .mount(&server)
        .await;

    let provider = Provider::new();
    let client = client(&server);
    let mut record = provider
        .create(
            &client,
            "github_actions_repository_permissions",
            &attrs(json!({
                "repository": "hello-world",
                "allowed_actions": "selected",
                "allowed_actions_config": selected,
            })),
        )
        .await
        .unwrap();
    assert_eq!(record.id, "hello-world");

    let outcome = provider
        .read(&client, "github_actions_repository_permissions", &mut record)
        .await
        .unwrap();
    assert_eq!(outcome, ReadOutcome::Refreshed);
    assert_eq!(
        record.get("allowed_actions_config").unwrap()["verified_allowed"],
        false
    );
}

#[tokio::test]
async fn default_permissions_settle_after_create() {
    let server = MockServer::start().await;
    Mock::given(method("PUT"))
        .and(path(PERMISSIONS))
        .and(body_json(json!({"enabled": true})))
        .respond_with(ResponseTemplate::new(204))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path(PERMISSIONS))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "enabled": true,
            "allowed_actions": "all",
            "selected_actions_url": "https://api.github.com/repos/octo-org/hello-world/actions/permissions/selected-actions",
        })))
        .mount(&server)
        .await;

    let provider = Provider::new();
    let config = attrs(json!({"repository": "hello-world"}));
    let record = provider
        .create(&client(&server), "github_actions_repository_permissions", &config)
        .await
        .unwrap();

    assert_eq!(record.get_str("allowed_actions"), Some("all"));
    assert_eq!(
        plan_after(&provider, "github_actions_repository_permissions", &record, &config),
        PlanAction::NoOp
    );

    let local_only = attrs(json!({"repository": "hello-world", "allowed_actions": "local_only"}));
    assert_eq!(
        plan_after(&provider, "github_actions_repository_permissions", &record, &local_only),
        PlanAction::Replace {
            attributes: vec!["allowed_actions".to_string()],
        }
    );
}

#[tokio::test]
async fn deleting_permissions_restores_defaults() {
    let server = MockServer::start().await;
    Mock::given(method("PUT"))
        .and(path(PERMISSIONS))
        .and(body_json(json!({"enabled": true, "allowed_actions": "all"})))
        .respond_with(ResponseTemplate::new(204))
        .expect(1)
        .mount(&server)
        .await;

    let mut record = Record::new("hello-world");
    record.set("repository", "hello-world");
    record.set("enabled", false);

    Provider::new()
        .delete(&client(&server), "github_actions_repository_permissions", &record)
        .await
        .unwrap();
}

#[tokio::test]
async fn label_lifecycle() {
    let server = MockServer::start().await;
    let label = json!({
        "name": "bug",
        "color": "d73a4a",
        "description": "",
        "url": "https://api.github.com/repos/octo-org/hello-world/labels/bug",
    });

    Mock::given(method("POST"))
        .and(path("/repos/octo-org/hello-world/labels"))
        .and(body_json(json!({"name": "bug", "color": "d73a4a"})))
        .respond_with(ResponseTemplate::new(201).set_body_json(label.clone()))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/repos/octo-org/hello-world/labels/bug"))
        .respond_with(ResponseTemplate::new(200).set_body_json(label))
        .mount(&server)
        .await;
    Mock::given(method("DELETE"))
        .and(path("/repos/octo-org/hello-world/labels/bug"))
        .respond_with(ResponseTemplate::new(204))
        .expect(1)
        .mount(&server)
        .await;

    let provider = Provider::new();
    let client = client(&server);
    let config = attrs(json!({"repository": "hello-world", "name": "bug", "color": "d73a4a"}));
    let mut record = provider.create(&client, "github_issue_label", &config).await.unwrap();
    assert_eq!(record.id, "hello-world:bug");
    assert_eq!(plan_after(&provider, "github_issue_label", &record, &config), PlanAction::NoOp);

    let outcome = provider.read(&client, "github_issue_label", &mut record).await.unwrap();
    assert_eq!(outcome, ReadOutcome::Refreshed);
    assert_eq!(record.get_str("color"), Some("d73a4a"));
    assert!(record.get("description").is_none());

    provider.delete(&client, "github_issue_label", &record).await.unwrap();
}

#[tokio::test]
async fn hash_prefixed_label_color_is_rejected_before_any_request() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(201))
        .expect(0)
        .mount(&server)
        .await;

    let err = Provider::new()
        .create(
            &client(&server),
            "github_issue_label",
            &attrs(json!({"repository": "hello-world", "name": "bug", "color": "#d73a4a"})),
        )
        .await
        .unwrap_err();
    assert!(matches!(err, hubform_github::Error::Validation(ref d) if d.mentions("color")), "{err:?}");
}

#[tokio::test]
async fn missing_label_is_removed_from_state() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/repos/octo-org/hello-world/labels/wontfix"))
        .respond_with(not_found())
        .mount(&server)
        .await;

    let mut record = Record::new("hello-world:wontfix");
    let outcome = Provider::new()
        .read(&client(&server), "github_issue_label", &mut record)
        .await
        .unwrap();
    assert_eq!(outcome, ReadOutcome::Removed);
    assert!(!record.exists());
}

#[tokio::test]
async fn organization_secret_reads_every_selected_repository() {
    let server = MockServer::start().await;
    let repos = |ids: std::ops::Range<i64>| -> Vec<Value> { ids.map(|id| json!({"id": id})).collect() };

    Mock::given(method("GET"))
        .and(path(ORG_SECRET))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "name": "SHARED_TOKEN",
            "created_at": "2024-01-10T10:00:00Z",
            "updated_at": "2024-01-10T10:00:00Z",
            "visibility": "selected",
        })))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path(format!("{ORG_SECRET}/repositories")))
        .and(query_param("page", "1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "total_count": 130,
            "repositories": repos(0..100),
        })))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path(format!("{ORG_SECRET}/repositories")))
        .and(query_param("page", "2"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "total_count": 130,
            "repositories": repos(100..130),
        })))
        .expect(1)
        .mount(&server)
        .await;

    let mut record = Record::new("SHARED_TOKEN");
    record.set("secret_name", "SHARED_TOKEN");
    record.set("visibility", "selected");
    record.set("destroy_on_drift", true);
    record.set("updated_at", "2024-01-10T10:00:00Z");

    let outcome = Provider::new()
        .read(&client(&server), "github_actions_organization_secret", &mut record)
        .await
        .unwrap();

    assert_eq!(outcome, ReadOutcome::Refreshed);
    let ids = record.get("selected_repository_ids").unwrap().as_array().unwrap();
    assert_eq!(ids.len(), 130);
    assert_eq!(ids[129], 129);
}

#[tokio::test]
async fn organization_secret_create_sends_visibility() {
    let server = MockServer::start().await;
    let (_, key) = public_key();

    Mock::given(method("GET"))
        .and(path("/orgs/octo-org/actions/secrets/public-key"))
        .respond_with(ResponseTemplate::new(200).set_body_json(key))
        .mount(&server)
        .await;
    Mock::given(method("PUT"))
        .and(path(ORG_SECRET))
        .and(body_partial_json(json!({
            "key_id": "568250167242549743",
            "visibility": "selected",
            "selected_repository_ids": [1296269],
        })))
        .respond_with(ResponseTemplate::new(201))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path(ORG_SECRET))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "name": "SHARED_TOKEN",
            "created_at": "2024-01-10T10:00:00Z",
            "updated_at": "2024-01-10T10:00:00Z",
            "visibility": "selected",
        })))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path(format!("{ORG_SECRET}/repositories")))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "total_count": 1,
            "repositories": [{"id": 1296269}],
        })))
        .mount(&server)
        .await;

    let record = Provider::new()
        .create(
            &client(&server),
            "github_actions_organization_secret",
            &attrs(json!({
                "secret_name": "SHARED_TOKEN",
                "plaintext_value": "hunter2",
                "visibility": "selected",
                "selected_repository_ids": [1296269],
            })),
        )
        .await
        .unwrap();
    assert_eq!(record.id, "SHARED_TOKEN");
    assert_eq!(record.get("selected_repository_ids"), Some(&json!([1296269])));
    assert_eq!(record.get_str("updated_at"), Some("2024-01-10T10:00:00Z"));
}

#[tokio::test]
async fn multi_select_custom_property_round_trips() {
    let server = MockServer::start().await;

    Mock::given(method("PATCH"))
        .and(path(PROPERTY_VALUES))
        .and(body_json(json!({
            "properties": [{"property_name": "teams", "value": ["platform", "security"]}],
        })))
        .respond_with(ResponseTemplate::new(204))
        .expect(1)
        .mount(&server)
        .await;
    mount_property_values(&server).await;
    mount_property_definition(&server, "teams", "multi_select").await;

    let provider = Provider::new();
    let config = attrs(json!({
        "repository": "hello-world",
        "property_name": "teams",
        "property_type": "multi_select",
        "property_value": ["platform", "security"],
    }));
    let record = provider
        .create(&client(&server), "github_repository_custom_property", &config)
        .await
        .unwrap();

    assert_eq!(record.id, "octo-org/hello-world/teams");
    assert_eq!(record.get_str("property_type"), Some("multi_select"));
    assert_eq!(record.get("property_value"), Some(&json!(["platform", "security"])));
    assert_eq!(
        plan_after(&provider, "github_repository_custom_property", &record, &config),
        PlanAction::NoOp
    );
}

async fn mount_property_values(server: &MockServer) {
    Mock::given(method("GET"))
        .and(path(PROPERTY_VALUES))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            {"property_name": "environment", "value": "production"},
            {"property_name": "teams", "value": ["platform", "security"]},
        ])))
        .mount(server)
        .await;
}

async fn mount_property_definition(server: &MockServer, name: &str, value_type: &str) {
    Mock::given(method("GET"))
        .and(path(format!("/orgs/octo-org/properties/schema/{name}")))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "property_name": name,
            "value_type": value_type,
            "required": false,
            "values_editable_by": "org_actors",
        })))
        .mount(server)
        .await;
}

#[tokio::test]
async fn imported_custom_property_resolves_its_type() {
    let server = MockServer::start().await;
    mount_property_values(&server).await;
    mount_property_definition(&server, "environment", "single_select").await;

    let provider = Provider::new();
    let record = provider
        .import(&client(&server), "github_repository_custom_property", "octo-org/hello-world/environment")
        .await
        .unwrap();

    assert_eq!(record.get_str("property_type"), Some("single_select"));
    let config = attrs(json!({
        "repository": "hello-world",
        "property_name": "environment",
        "property_type": "single_select",
        "property_value": ["production"],
    }));
    assert_eq!(
        plan_after(&provider, "github_repository_custom_property", &record, &config),
        PlanAction::NoOp
    );
}

#[tokio::test]
async fn custom_property_without_definition_reads_as_removed() {
    let server = MockServer::start().await;
    mount_property_values(&server).await;
    Mock::given(method("GET"))
        .and(path("/orgs/octo-org/properties/schema/environment"))
        .respond_with(not_found())
        .mount(&server)
        .await;

    let mut record = Record::new("octo-org/hello-world/environment");
    let outcome = Provider::new()
        .read(&client(&server), "github_repository_custom_property", &mut record)
        .await
        .unwrap();
    assert_eq!(outcome, ReadOutcome::Removed);
}

#[tokio::test]
async fn unset_custom_property_reads_as_removed() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path(PROPERTY_VALUES))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            {"property_name": "teams", "value": null},
        ])))
        .mount(&server)
        .await;

    let mut record = Record::new("octo-org/hello-world/teams");
    let outcome = Provider::new()
        .read(&client(&server), "github_repository_custom_property", &mut record)
        .await
        .unwrap();
    assert_eq!(outcome, ReadOutcome::Removed);
}

#[tokio::test]
async fn ruleset_changed_elsewhere_is_replaced() {
    let server = MockServer::start().await;
    let ruleset = |updated_at: &str| {
        json!({
            "id": 42,
            "node_id": "RRS_lACqUmVwb3NpdG9yec4Hc",
            "name": "protect-main",
            "target": "branch",
            "enforcement": "active",
            "bypass_actors": [],
            "rules": [{"type": "deletion"}],
            "updated_at": updated_at,
        })
    };

    Mock::given(method("GET"))
        .and(path("/orgs/octo-org/rulesets/42"))
        .respond_with(ResponseTemplate::new(200).set_body_json(ruleset("2024-03-01T09:00:00.000Z")))
        .mount(&server)
        .await;

    let mut record = Record::new("42");
    record.set("name", "protect-main");
    record.set("updated_at", "2024-02-01T09:00:00.000Z");

    let outcome = Provider::new()
        .read(&client(&server), "github_organization_ruleset", &mut record)
        .await
        .unwrap();
    assert_eq!(outcome, ReadOutcome::Drifted);
    assert!(!record.exists());
}

#[tokio::test]
async fn created_ruleset_settles_with_server_filled_review_parameters() {
    let server = MockServer::start().await;
    let ruleset = json!({
        "id": 42,
        "node_id": "RRS_lACqUmVwb3NpdG9yec4Hc",
        "name": "protect-main",
        "target": "branch",
        "source_type": "Organization",
        "source": "octo-org",
        "enforcement": "active",
        "bypass_actors": [],
        "conditions": {"ref_name": {"include": ["~DEFAULT_BRANCH"], "exclude": []}},
        "rules": [
            {"type": "deletion"},
            {"type": "pull_request", "parameters": {
                "required_approving_review_count": 1,
                "dismiss_stale_reviews_on_push": false,
                "require_code_owner_review": false,
                "require_last_push_approval": false,
                "required_review_thread_resolution": false,
            }},
        ],
        "updated_at": "2024-03-01T09:00:00.000Z",
    });

    Mock::given(method("POST"))
        .and(path("/orgs/octo-org/rulesets"))
        .and(body_partial_json(json!({
            "name": "protect-main",
            "rules": [
                {"type": "deletion"},
                {"type": "pull_request", "parameters": {"required_approving_review_count": 1}},
            ],
        })))
        .respond_with(ResponseTemplate::new(201).set_body_json(ruleset.clone()))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/orgs/octo-org/rulesets/42"))
        .respond_with(ResponseTemplate::new(200).set_body_json(ruleset))
        .mount(&server)
        .await;

    let provider = Provider::new();
    let config = attrs(json!({
        "name": "protect-main",
        "target": "branch",
        "enforcement": "active",
        "conditions": {"ref_name": {"include": ["~DEFAULT_BRANCH"], "exclude": []}},
        "rules": {
            "deletion": true,
            "pull_request": {"required_approving_review_count": 1},
        },
    }));
    let record = provider
        .create(&client(&server), "github_organization_ruleset", &config)
        .await
        .unwrap();

    assert_eq!(record.id, "42");
    assert_eq!(record.get("ruleset_id"), Some(&json!(42)));
    assert_eq!(record.get_str("updated_at"), Some("2024-03-01T09:00:00.000Z"));
    assert_eq!(
        plan_after(&provider, "github_organization_ruleset", &record, &config),
        PlanAction::NoOp
    );

    let mut stricter = config.clone();
    stricter["rules"]["pull_request"]["require_code_owner_review"] = json!(true);
    assert_eq!(
        plan_after(&provider, "github_organization_ruleset", &record, &stricter),
        PlanAction::Replace {
            attributes: vec!["rules".to_string()],
        }
    );
}
