//! Integration tests for rampart-csrf

use rampart_core::HttpRequest;
use rampart_csrf::*;
use rampart_session::{Session, SessionHandle};
use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;

fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

fn session() -> SessionHandle {
    SessionHandle::new(Session::new("sess-test", Duration::from_secs(3600)))
}

fn submit(fields: &TokenFields) -> HttpRequest {
    HttpRequest::new("POST", "/inventory/items")
        .with_form(&[
            (fields.name_key.as_str(), fields.name.as_str()),
            (fields.value_key.as_str(), fields.value.as_str()),
            ("sku", "AB-12"),
        ])
        .unwrap()
}

fn flip_one_bit(value: &str) -> String {
    let mut bytes = hex::decode(value).unwrap();
    bytes[0] ^= 0x01;
    hex::encode(bytes)
}

#[test]
fn test_generated_names_are_unique() {
    let store = shared(MemoryTokenStore::new());
    let mut guard =
        TokenGuard::with_store(GuardConfig::new("csrf").persistent(), store.clone()).unwrap();

    let names: HashSet<String> = (0..500)
        .map(|_| guard.generate_token().unwrap().name)
        .collect();

    assert_eq!(names.len(), 500);
    assert_eq!(store.lock().len(), 500);
}

#[test]
fn test_single_use_token_cannot_be_replayed() {
    init_tracing();
    let mut guard = TokenGuard::new(GuardConfig::new("csrf").with_storage_limit(10)).unwrap();
    let token = guard.get_token().unwrap();
    let request = submit(&token);

    assert!(guard.validate(&request).unwrap());
    assert_eq!(
        guard.check(&request).unwrap(),
        Verdict::Rejected(RejectReason::UnknownToken)
    );
}

#[test]
fn test_persistent_token_survives_validation() {
    let mut guard = TokenGuard::new(GuardConfig::new("csrf").persistent()).unwrap();
    let token = guard.get_token().unwrap();
    let request = submit(&token);

    assert!(guard.validate(&request).unwrap());
    assert!(guard.validate(&request).unwrap());
    assert_eq!(
        guard.storage().lock().get(&token.name).as_deref(),
        Some(token.value.as_str())
    );
}

#[test]
fn test_tampered_value_is_rejected_and_purged() {
    for config in [
        GuardConfig::new("csrf").with_storage_limit(10),
        GuardConfig::new("csrf").persistent(),
    ] {
        let mut guard = TokenGuard::new(config).unwrap();
        let mut token = guard.get_token().unwrap();
        let original_name = token.name.clone();
        token.value = flip_one_bit(&token.value);

        assert_eq!(
            guard.check(&submit(&token)).unwrap(),
            Verdict::Rejected(RejectReason::Mismatch)
        );
        assert!(guard.storage().lock().get(&original_name).is_none());
    }
}

#[test]
fn test_limit_keeps_most_recent_tokens() {
    const K: usize = 4;
    const M: usize = 3;

    let store = shared(MemoryTokenStore::new());
    let mut guard = TokenGuard::with_store(
        GuardConfig::new("csrf").with_storage_limit(K as i64),
        store.clone(),
    )
    .unwrap();

    let issued: Vec<String> = (0..K + M)
        .map(|_| guard.generate_token().unwrap().name)
        .collect();

    assert_eq!(store.lock().len(), K);
    assert_eq!(store.lock().names(), issued[M..].to_vec());
}

#[test]
fn test_limit_is_enforced_on_exempt_requests() {
    let store = shared(MemoryTokenStore::new());
    for i in 0..6 {
        store.lock().insert(format!("csrf{}", i), format!("{:032x}", i));
    }

    let mut guard =
        TokenGuard::with_store(GuardConfig::new("csrf").with_storage_limit(2), store.clone())
            .unwrap();
    assert_eq!(
        guard.check(&HttpRequest::new("GET", "/")).unwrap(),
        Verdict::Exempt
    );

    assert_eq!(store.lock().names(), vec!["csrf4", "csrf5"]);
}

#[test]
fn test_ensure_storage_is_idempotent() {
    let store = shared(MemoryTokenStore::new());
    let mut guard = TokenGuard::with_store(GuardConfig::default(), store.clone()).unwrap();
    guard.get_token().unwrap();
    let before = store.lock().names();

    guard.ensure_storage();
    guard.ensure_storage();

    assert!(Arc::ptr_eq(&guard.storage(), &store));
    assert_eq!(store.lock().names(), before);
}

#[test]
fn test_session_ensure_is_idempotent() {
    let session = session();
    let mut guard = TokenGuard::with_session(GuardConfig::default(), session.clone()).unwrap();
    let token = guard.get_token().unwrap();
    let before = session.lock().data.clone();

    guard.ensure_storage();
    guard.ensure_storage();

    assert_eq!(session.lock().data, before);
    assert!(guard.storage().lock().session().ptr_eq(&session));
    assert_eq!(
        guard.storage().lock().get(&token.name).as_deref(),
        Some(token.value.as_str())
    );
}

#[test]
fn test_end_to_end_bounded_scenario() {
    init_tracing();
    let store = shared(MemoryTokenStore::new());
    let mut guard =
        TokenGuard::with_store(GuardConfig::new("csrf").with_storage_limit(5), store.clone())
            .unwrap();

    let tokens: Vec<TokenFields> = (0..6).map(|_| guard.generate_token().unwrap()).collect();
    let (t1, t3) = (&tokens[0], &tokens[2]);

    assert_eq!(store.lock().len(), 5);
    assert!(!store.lock().contains(&t1.name));
    for t in &tokens[1..] {
        assert!(store.lock().contains(&t.name));
    }

    let request = submit(t3);
    assert!(guard.validate(&request).unwrap());
    assert_eq!(store.lock().len(), 4);
    assert!(!store.lock().contains(&t3.name));

    assert!(!guard.validate(&request).unwrap());
}

#[test]
fn test_session_tokens_cross_requests() {
    let session = session();
    let config = GuardConfig::new("csrf").with_storage_limit(3);

    let token = {
        let mut guard = TokenGuard::with_session(config.clone(), session.clone()).unwrap();
        guard.get_token().unwrap()
    };

    let mut guard = TokenGuard::with_session(config.clone(), session.clone()).unwrap();
    assert_eq!(guard.check(&submit(&token)).unwrap(), Verdict::Accepted);

    let mut guard = TokenGuard::with_session(config, session).unwrap();
    assert!(!guard.validate(&submit(&token)).unwrap());
}

#[test]
fn test_session_regenerated_between_requests() {
    let session = session();
    let config = GuardConfig::new("csrf");

    let token = TokenGuard::with_session(config.clone(), session.clone())
        .unwrap()
        .get_token()
        .unwrap();

    session.regenerate();

    let mut guard = TokenGuard::with_session(config, session.clone()).unwrap();
    assert_eq!(
        guard.check(&submit(&token)).unwrap(),
        Verdict::Rejected(RejectReason::UnknownToken)
    );
    // The retry token lives in the recreated region
    assert_eq!(guard.storage().lock().len(), 1);
}

#[test]
fn test_guards_with_different_prefixes_share_a_session() {
    let session = session();
    let mut forms = TokenGuard::with_session(GuardConfig::new("forms"), session.clone()).unwrap();
    let mut api = TokenGuard::with_session(GuardConfig::new("api"), session.clone()).unwrap();

    let form_token = forms.get_token().unwrap();
    let api_token = api.get_token().unwrap();
    assert_eq!(form_token.name_key, "forms_name");
    assert_eq!(api_token.name_key, "api_name");

    // Submitting the form token under the api field names is not a valid api token
    let crossed = HttpRequest::new("POST", "/")
        .with_form(&[
            ("api_name", form_token.name.as_str()),
            ("api_value", form_token.value.as_str()),
        ])
        .unwrap();
    assert!(!api.validate(&crossed).unwrap());

    assert!(forms.validate(&submit(&form_token)).unwrap());
}

#[test]
fn test_persistent_get_token_reuses_newest_entry() {
    let session = session();
    let config = GuardConfig::new("csrf").persistent();

    let first = TokenGuard::with_session(config.clone(), session.clone())
        .unwrap()
        .get_token()
        .unwrap();

    let mut guard = TokenGuard::with_session(config.clone(), session.clone()).unwrap();
    assert_eq!(guard.get_token().unwrap(), first);

    let newer = guard.generate_token().unwrap();
    let mut guard = TokenGuard::with_session(config, session).unwrap();
    assert_eq!(guard.get_token().unwrap(), newer);
}

#[test]
fn test_bounded_get_token_issues_per_guard() {
    let session = session();
    let config = GuardConfig::new("csrf");

    let first = TokenGuard::with_session(config.clone(), session.clone())
        .unwrap()
        .get_token()
        .unwrap();
    let second = TokenGuard::with_session(config, session.clone())
        .unwrap()
        .get_token()
        .unwrap();

    assert_ne!(first.name, second.name);
}

#[test]
fn test_config_from_json() {
    let config: GuardConfig = serde_json::from_str(
        r#"{"prefix": "inventory_", "storage_limit": -1, "exclude_paths": ["/hooks"]}"#,
    )
    .unwrap();

    assert_eq!(config.normalized_prefix(), "inventory");
    assert_eq!(config.retention(), Retention::Persistent);
    assert_eq!(config.strength, MIN_STRENGTH);
    assert_eq!(config.safe_methods.len(), 4);
    assert!(config.validate().is_ok());
}

#[test]
fn test_require_error_converts_to_forbidden() {
    let mut guard = TokenGuard::new(GuardConfig::default()).unwrap();
    let err: rampart_core::Error = guard
        .require(&HttpRequest::new("PATCH", "/inventory/1"))
        .unwrap_err()
        .into();

    assert_eq!(err.status_code(), 403);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_replay_accepts_once() {
    init_tracing();

    for _ in 0..20 {
        let session = session();
        let config = GuardConfig::new("csrf").with_storage_limit(50);
        let token = TokenGuard::with_session(config.clone(), session.clone())
            .unwrap()
            .get_token()
            .unwrap();

        let tasks: Vec<_> = (0..4)
            .map(|_| {
                let session = session.clone();
                let config = config.clone();
                let request = submit(&token);
                tokio::task::spawn_blocking(move || {
                    let mut guard = TokenGuard::with_session(config, session).unwrap();
                    guard.validate(&request).unwrap()
                })
            })
            .collect();

        let mut accepted = 0;
        for task in tasks {
            if task.await.unwrap() {
                accepted += 1;
            }
        }

        assert_eq!(accepted, 1);
    }
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_shared_memory_store_keeps_limit_under_contention() {
    let store = shared(MemoryTokenStore::new());
    let config = GuardConfig::new("csrf").with_storage_limit(8);

    let tasks: Vec<_> = (0..8)
        .map(|_| {
            let store = store.clone();
            let config = config.clone();
            tokio::task::spawn_blocking(move || {
                let mut guard = TokenGuard::with_store(config, store).unwrap();
                for _ in 0..25 {
                    guard.generate_token().unwrap();
                }
            })
        })
        .collect();

    for task in tasks {
        task.await.unwrap();
    }

    assert_eq!(store.lock().len(), 8);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_session_store_never_evicts_below_limit_under_contention() {
    const LIMIT: usize = 8;

    let session = session();
    let config = GuardConfig::new("csrf").with_storage_limit(LIMIT as i64);
    {
        let mut guard = TokenGuard::with_session(config.clone(), session.clone()).unwrap();
        for _ in 0..LIMIT {
            guard.generate_token().unwrap();
        }
    }

    let tasks: Vec<_> = (0..8)
        .map(|_| {
            let session = session.clone();
            let config = config.clone();
            tokio::task::spawn_blocking(move || {
                let mut lowest = usize::MAX;
                for _ in 0..50 {
                    let mut guard = TokenGuard::with_session(config.clone(), session.clone())
                        .unwrap();
                    guard.generate_token().unwrap();
                    lowest = lowest.min(guard.storage().lock().len());
                }
                lowest
            })
        })
        .collect();

    // Nothing is consumed, so every observed count stays at or above the limit
    for task in tasks {
        assert!(task.await.unwrap() >= LIMIT);
    }

    let store = SessionTokenStore::new(session, "csrf");
    assert_eq!(store.len(), LIMIT);
}
