//! End-to-end searches against a mock Vault

use std::time::Duration;

use serde_json::json;
use vaultsearch::search::{MatchKind, SearchPhase};
use vaultsearch::{MatchMode, SearchEvent, SearchQuery, TaskStatus};

use crate::support::{engine, wait_terminal, MockVault};

#[tokio::test]
async fn test_path_and_key_match_on_kv2() {
    let vault = MockVault::start().await;
    vault.mounts(&[("secret/", "kv", "2")]).await;
    vault.list("secret/metadata/", &["prod/", "readme"]).await;
    vault.list("secret/metadata/prod/", &["db-pass"]).await;
    vault.secret_v2("secret/", "prod/db-pass", json!({ "password": "hunter2" })).await;

    let engine = engine();
    let id = engine.start(&vault.credentials(), SearchQuery::new("pass")).unwrap();
    let snapshot = wait_terminal(&engine, &id).await;

    assert_eq!(snapshot.status, TaskStatus::Completed);
    let hits: Vec<_> = snapshot.path_hits.iter().map(|c| c.full_path.as_str()).collect();
    assert_eq!(hits, vec!["secret/prod/db-pass"]);

    assert_eq!(snapshot.deep_results.len(), 1);
    let result = &snapshot.deep_results[0];
    assert_eq!(result.key_matches[0].field_path, "password");
    assert_eq!(result.key_matches[0].value, "hunter2");
    assert_eq!(result.key_matches[0].kind, MatchKind::KeyMatch);
    assert_eq!(
        result.open_url,
        format!("{}/ui/vault/secrets/secret/kv/prod%2Fdb-pass", vault.server.uri())
    );
    assert_eq!(snapshot.progress.units_listed, 2);
}

#[tokio::test]
async fn test_mount_answering_v1_is_corrected_once() {
    let vault = MockVault::start().await;
    vault.mounts(&[("legacy/", "kv", "2")]).await;
    vault.list("legacy/", &["team/"]).await;
    vault.list("legacy/team/", &["db-pass", "notes"]).await;
    vault.secret_v1("legacy/", "team/db-pass", json!({ "password": "x" })).await;

    let engine = engine();
    let id = engine.start(&vault.credentials(), SearchQuery::new("pass")).unwrap();
    let snapshot = wait_terminal(&engine, &id).await;

    assert_eq!(snapshot.status, TaskStatus::Completed);
    assert_eq!(snapshot.path_hits.len(), 1);
    assert_eq!(snapshot.deep_results.len(), 1);
    assert!(!snapshot.deep_results[0].is_kv2);

    let requests = vault.requests().await;
    let v2_probes = requests.iter().filter(|r| r.starts_with("/v1/legacy/metadata/")).count();
    assert_eq!(v2_probes, 1);
    assert!(requests.contains(&"/v1/legacy/?list=true".to_string()));
    assert!(requests.contains(&"/v1/legacy/team/?list=true".to_string()));
    assert!(!requests.iter().any(|r| r.starts_with("/v1/legacy/data/")));
}

#[tokio::test]
async fn test_unreachable_catalog_uses_fallback_mount() {
    let vault = MockVault::start().await;
    vault.status("sys/mounts", 500).await;
    vault.list("secret/metadata/", &["api-token"]).await;
    vault.secret_v2("secret/", "api-token", json!({ "token": "abc" })).await;

    let engine = engine();
    let id = engine.start(&vault.credentials(), SearchQuery::new("token")).unwrap();
    let snapshot = wait_terminal(&engine, &id).await;

    assert_eq!(snapshot.status, TaskStatus::Completed);
    assert!(snapshot.error.is_none());
    assert_eq!(snapshot.warnings.len(), 1);
    assert_eq!(snapshot.path_hits.len(), 1);
    assert_eq!(snapshot.deep_results.len(), 1);
}

#[tokio::test]
async fn test_failing_units_are_skipped() {
    let vault = MockVault::start().await;
    vault.mounts(&[("secret/", "kv", "2")]).await;
    vault.list("secret/metadata/", &["broken/", "locked/", "db-pass", "cache-pass"]).await;
    vault.status("secret/metadata/broken/", 500).await;
    vault.status("secret/metadata/locked/", 403).await;
    vault.secret_v2("secret/", "db-pass", json!({ "password": "x" })).await;
    vault.status("secret/data/cache-pass", 500).await;

    let engine = engine();
    let id = engine.start(&vault.credentials(), SearchQuery::new("pass")).unwrap();
    let snapshot = wait_terminal(&engine, &id).await;

    assert_eq!(snapshot.status, TaskStatus::Completed);
    assert_eq!(snapshot.path_hits.len(), 2);
    assert_eq!(snapshot.deep_results.len(), 1);
    assert_eq!(snapshot.deep_results[0].full_path, "secret/db-pass");
    assert_eq!(snapshot.progress.list_failures, 1);
    assert_eq!(snapshot.progress.read_failures, 1);
}

#[tokio::test]
async fn test_namespace_reaches_vault_and_deep_link() {
    let vault = MockVault::start().await;
    vault.mounts(&[("secret/", "kv", "2")]).await;
    vault.list("secret/metadata/", &["db-pass"]).await;
    vault.secret_v2("secret/", "db-pass", json!({ "password": "x" })).await;

    let engine = engine();
    let credentials = vault.credentials().with_namespace("team-a");
    let id = engine.start(&credentials, SearchQuery::new("pass")).unwrap();
    let snapshot = wait_terminal(&engine, &id).await;

    assert!(snapshot.deep_results[0].open_url.ends_with("/kv/db-pass?namespace=team-a"));

    let received = vault.server.received_requests().await.unwrap();
    assert!(received
        .iter()
        .all(|r| r.headers.get("X-Vault-Namespace").is_some_and(|v| v == "team-a")));
}

#[tokio::test]
async fn test_regex_and_exact_modes() {
    let vault = MockVault::start().await;
    vault.mounts(&[("secret/", "kv", "2")]).await;
    vault.list("secret/metadata/", &["api_key_v2", "api_key"]).await;
    vault.secret_v2("secret/", "api_key_v2", json!({ "owner": "team" })).await;
    vault.secret_v2("secret/", "api_key", json!({ "api_key": "k" })).await;

    let engine = engine();
    let query = SearchQuery::new(r"^api_key$").with_mode(MatchMode::Regex);
    let id = engine.start(&vault.credentials(), query).unwrap();
    let regex = wait_terminal(&engine, &id).await;
    let hits: Vec<_> = regex.path_hits.iter().map(|c| c.full_path.as_str()).collect();
    assert_eq!(hits, vec!["secret/api_key"]);
    assert_eq!(regex.deep_results.len(), 1);

    let query = SearchQuery::new("API_KEY_V2").with_mode(MatchMode::Exact);
    let id = engine.start(&vault.credentials(), query).unwrap();
    let exact = wait_terminal(&engine, &id).await;
    let hits: Vec<_> = exact.path_hits.iter().map(|c| c.full_path.as_str()).collect();
    assert_eq!(hits, vec!["secret/api_key_v2"]);
    assert!(exact.deep_results.is_empty());
}

#[tokio::test]
async fn test_cancel_during_scan_stops_results() {
    let vault = MockVault::start().await;
    vault.mounts(&[("secret/", "kv", "2")]).await;
    let keys: Vec<String> = (0..32).map(|n| format!("pass-{}", n)).collect();
    let key_refs: Vec<&str> = keys.iter().map(String::as_str).collect();
    vault.list("secret/metadata/", &key_refs).await;
    for key in &keys {
        vault
            .read(
                &format!("secret/data/{}", key),
                json!({ "data": { "data": { "password": "x" } } }),
                Some(Duration::from_millis(200)),
            )
            .await;
    }

    let engine = engine();
    let query = SearchQuery::new("pass").with_worker_count(8);
    let id = engine.start(&vault.credentials(), query).unwrap();

    for _ in 0..200 {
        let snapshot = engine.status(id.as_str()).await.unwrap();
        if snapshot.progress.phase == SearchPhase::Scanning {
            break;
        }
        tokio::time::sleep(Duration::from_millis(5)).await;
    }

    assert!(engine.cancel(id.as_str()).await);
    let at_cancel = engine.status(id.as_str()).await.unwrap();
    assert_eq!(at_cancel.status, TaskStatus::Cancelled);
    assert_eq!(at_cancel.path_hits.len(), 32);

    tokio::time::sleep(Duration::from_millis(500)).await;
    let later = engine.status(id.as_str()).await.unwrap();
    assert_eq!(later.status, TaskStatus::Cancelled);
    assert_eq!(later.deep_results.len(), at_cancel.deep_results.len());
    assert!(later.deep_results.len() < 32);
}

#[tokio::test]
async fn test_stream_then_poll_after_completion() {
    let vault = MockVault::start().await;
    vault.mounts(&[("secret/", "kv", "2")]).await;
    vault.list("secret/metadata/", &["db-pass"]).await;
    vault.secret_v2("secret/", "db-pass", json!({ "password": "x" })).await;

    let engine = engine();
    let (id, mut events) =
        engine.start_streaming(&vault.credentials(), SearchQuery::new("pass")).unwrap();

    let mut streamed = Vec::new();
    while let Ok(event) = tokio::time::timeout(Duration::from_secs(5), events.recv()).await {
        let event = event.unwrap();
        let finished = matches!(event, SearchEvent::Finished { .. });
        streamed.push(event);
        if finished {
            break;
        }
    }
    assert_eq!(streamed.last(), Some(&SearchEvent::Finished { status: TaskStatus::Completed }));

    let first = engine.status(id.as_str()).await.unwrap();
    let second = engine.status(id.as_str()).await.unwrap();
    assert_eq!(first, second);
    assert_eq!(first.path_hits.len(), 1);

    assert!(engine.forget(id.as_str()).await);
    assert!(engine.status(id.as_str()).await.is_none());
}
