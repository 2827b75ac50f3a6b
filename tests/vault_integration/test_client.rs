//! HTTP client, mount catalog, lister and reader against a mock Vault

use std::time::Duration;

use serde_json::json;
use vaultsearch::errors::VaultError;
use vaultsearch::vault::{
    discover_mounts, list_children, read_secret, KvTransport, KvVersion, KvVersionCache,
    ListOutcome, Mount, VaultClient, VaultRequest, FALLBACK_MOUNT,
};
use wiremock::matchers::{header, method, path, query_param};
use wiremock::{Mock, ResponseTemplate};

use crate::support::{MockVault, TOKEN};

const TIMEOUT: Duration = Duration::from_secs(2);

fn client() -> VaultClient {
    VaultClient::new().expect("client")
}

#[tokio::test]
async fn test_list_sends_token_namespace_and_list_query() {
    let vault = MockVault::start().await;
    Mock::given(method("GET"))
        .and(path("/v1/secret/metadata/prod/"))
        .and(query_param("list", "true"))
        .and(header("X-Vault-Token", TOKEN))
        .and(header("X-Vault-Namespace", "team-a"))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(json!({ "data": { "keys": ["db", "app/"] } })),
        )
        .expect(1)
        .mount(&vault.server)
        .await;

    let credentials = vault.credentials().with_namespace("team-a");
    let mount = Mount::new("secret/", KvVersion::V2);
    let outcome = list_children(&client(), &credentials, &mount, "prod/", TIMEOUT).await.unwrap();

    assert_eq!(outcome, ListOutcome::Keys(vec!["db".to_string(), "app/".to_string()]));
}

#[tokio::test]
async fn test_status_codes_are_classified() {
    let vault = MockVault::start().await;
    vault.status("secret/data/forbidden", 403).await;
    vault.status("secret/data/broken", 500).await;
    let credentials = vault.credentials();
    let client = client();

    let forbidden = client
        .get(&credentials, VaultRequest::read("read", "secret/data/forbidden", TIMEOUT))
        .await
        .unwrap_err();
    assert!(forbidden.is_forbidden());

    let missing = client
        .get(&credentials, VaultRequest::read("read", "secret/data/missing", TIMEOUT))
        .await
        .unwrap_err();
    assert!(missing.is_not_found());

    let broken = client
        .get(&credentials, VaultRequest::read("read", "secret/data/broken", TIMEOUT))
        .await
        .unwrap_err();
    assert!(matches!(broken, VaultError::Status { status: 500, .. }));
}

#[tokio::test]
async fn test_slow_response_times_out() {
    let vault = MockVault::start().await;
    let body = json!({ "data": { "data": {} } });
    vault.read("secret/data/slow", body, Some(Duration::from_secs(2))).await;

    let request = VaultRequest::read("read", "secret/data/slow", Duration::from_millis(100));
    let err = client().get(&vault.credentials(), request).await.unwrap_err();

    assert_eq!(err, VaultError::Timeout { path: "secret/data/slow".to_string() });
}

#[tokio::test]
async fn test_list_404_and_403_handling() {
    let vault = MockVault::start().await;
    vault.status("secret/metadata/locked/", 403).await;
    let credentials = vault.credentials();
    let client = client();

    let v2 = Mount::new("secret/", KvVersion::V2);
    assert_eq!(
        list_children(&client, &credentials, &v2, "gone/", TIMEOUT).await.unwrap(),
        ListOutcome::VersionMismatch
    );
    assert_eq!(
        list_children(&client, &credentials, &v2, "locked/", TIMEOUT).await.unwrap(),
        ListOutcome::Keys(vec![])
    );

    let v1 = Mount::new("legacy/", KvVersion::V1);
    assert_eq!(
        list_children(&client, &credentials, &v1, "empty/", TIMEOUT).await.unwrap(),
        ListOutcome::Keys(vec![])
    );
}

#[tokio::test]
async fn test_mount_catalog_parses_kv_mounts() {
    let vault = MockVault::start().await;
    vault
        .mounts(&[
            ("secret/", "kv", "2"),
            ("legacy/", "kv", "1"),
            ("old/", "generic", ""),
            ("pki/", "pki", ""),
        ])
        .await;

    let discovery = discover_mounts(&client(), &vault.credentials(), TIMEOUT).await;
    assert!(discovery.warning.is_none());

    let mut mounts = discovery.mounts;
    mounts.sort_by(|a, b| a.path.cmp(&b.path));
    assert_eq!(
        mounts,
        vec![
            Mount::new("legacy/", KvVersion::V1),
            Mount::new("old/", KvVersion::V1),
            Mount::new("secret/", KvVersion::V2),
        ]
    );
}

#[tokio::test]
async fn test_mount_catalog_failure_falls_back() {
    let vault = MockVault::start().await;
    vault.status("sys/mounts", 503).await;

    let discovery = discover_mounts(&client(), &vault.credentials(), TIMEOUT).await;

    assert_eq!(discovery.mounts, vec![Mount::new(FALLBACK_MOUNT, KvVersion::V2)]);
    assert!(discovery.warning.is_some());
}

#[tokio::test]
async fn test_read_unwraps_both_envelopes() {
    let vault = MockVault::start().await;
    vault.secret_v2("secret/", "app", json!({ "password": "hunter2" })).await;
    vault.secret_v1("legacy/", "app", json!({ "token": "abc" })).await;
    let credentials = vault.credentials();
    let versions = KvVersionCache::new();
    let client = client();

    let v2 = read_secret(
        &client,
        &credentials,
        &versions,
        &Mount::new("secret/", KvVersion::V2),
        "app",
        TIMEOUT,
    )
    .await
    .unwrap();
    assert_eq!(v2.get("password"), Some(&json!("hunter2")));

    let v1 = read_secret(
        &client,
        &credentials,
        &versions,
        &Mount::new("legacy/", KvVersion::V1),
        "app",
        TIMEOUT,
    )
    .await
    .unwrap();
    assert_eq!(v1.get("token"), Some(&json!("abc")));
}
