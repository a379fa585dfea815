use super::*;
use crate::credentials::RefreshError;
use crate::testing::{blob, FakeExchanger, FakeStore};

const NOW_MS: i64 = 1_760_000_000_000;

#[test]
fn test_empty_store_resolves_nothing() {
    let store = FakeStore::empty();
    let exchanger = FakeExchanger::new();
    let service = TokenService::new(&store, &exchanger);

    assert_eq!(service.resolve_at(NOW_MS), None);
    assert!(exchanger.calls().is_empty());
}

#[test]
fn test_blank_access_token_resolves_nothing() {
    let store = FakeStore::with_blob(blob("", Some("refresh"), None));
    let exchanger = FakeExchanger::new();
    let service = TokenService::new(&store, &exchanger);

    assert_eq!(service.resolve_at(NOW_MS), None);
}

#[test]
fn test_missing_expiry_is_valid_without_exchange() {
    let store = FakeStore::with_blob(blob("live", Some("refresh"), None));
    let exchanger = FakeExchanger::new();
    let service = TokenService::new(&store, &exchanger);

    let resolved = service.resolve_at(NOW_MS).unwrap();
    assert_eq!(resolved.access_token, "live");
    assert_eq!(resolved.plan, "max");
    assert!(exchanger.calls().is_empty());
    assert!(store.writes().is_empty());
}

#[test]
fn test_future_expiry_is_valid_without_exchange() {
    let store = FakeStore::with_blob(blob("live", Some("refresh"), Some(NOW_MS + 60_000)));
    let exchanger = FakeExchanger::new();
    let service = TokenService::new(&store, &exchanger);

    assert_eq!(service.resolve_at(NOW_MS).unwrap().access_token, "live");
    assert!(exchanger.calls().is_empty());
}

#[test]
fn test_expired_token_is_refreshed_exactly_once_and_persisted() {
    let store = FakeStore::with_blob(blob("stale", Some("refresh-1"), Some(NOW_MS - 1)));
    let exchanger = FakeExchanger::succeeding("fresh", Some(NOW_MS + 3_600_000));
    let service = TokenService::new(&store, &exchanger);

    let resolved = service.resolve_at(NOW_MS).unwrap();

    assert_eq!(resolved.access_token, "fresh");
    assert_eq!(exchanger.calls(), vec!["refresh-1".to_string()]);
    let writes = store.writes();
    assert_eq!(writes.len(), 1);
    assert_eq!(writes[0].oauth.access_token, "fresh");
    assert_eq!(writes[0].oauth.expires_at, Some(NOW_MS + 3_600_000));
    assert_eq!(writes[0].oauth.refresh_token(), Some("refresh-1"));
}

#[test]
fn test_failed_exchange_returns_stale_token_without_writing() {
    let store = FakeStore::with_blob(blob("stale", Some("refresh"), Some(NOW_MS - 1)));
    let exchanger = FakeExchanger::failing(RefreshError::Status { code: 400 });
    let service = TokenService::new(&store, &exchanger);

    let resolved = service.resolve_at(NOW_MS).unwrap();

    assert_eq!(resolved.access_token, "stale");
    assert_eq!(exchanger.calls().len(), 1);
    assert!(store.writes().is_empty());
}

#[test]
fn test_expired_without_refresh_token_returns_stale_token() {
    let store = FakeStore::with_blob(blob("stale", None, Some(NOW_MS - 1)));
    let exchanger = FakeExchanger::new();
    let service = TokenService::new(&store, &exchanger);

    assert_eq!(service.resolve_at(NOW_MS).unwrap().access_token, "stale");
    assert!(exchanger.calls().is_empty());
}

#[test]
fn test_unpersisted_refresh_still_returns_new_token() {
    let store = FakeStore::with_blob(blob("stale", Some("refresh"), Some(NOW_MS - 1)))
        .rejecting_writes();
    let exchanger = FakeExchanger::succeeding("fresh", None);
    let service = TokenService::new(&store, &exchanger);

    assert_eq!(service.resolve_at(NOW_MS).unwrap().access_token, "fresh");
    assert_eq!(store.writes().len(), 1);
}

#[test]
fn test_force_refresh_rereads_the_store() {
    let store = FakeStore::with_blob(blob("old", Some("refresh-old"), None));
    let exchanger = FakeExchanger::succeeding("forced", None);
    let service = TokenService::new(&store, &exchanger);

    // Another process rotates the entry between resolution and the 401 path.
    store.replace(blob("rotated", Some("refresh-rotated"), None));

    assert_eq!(service.force_refresh().as_deref(), Some("forced"));
    assert_eq!(exchanger.calls(), vec!["refresh-rotated".to_string()]);
    assert_eq!(store.current().unwrap().oauth.access_token, "forced");
}

#[test]
fn test_force_refresh_without_refresh_token_is_none() {
    let store = FakeStore::with_blob(blob("old", None, None));
    let exchanger = FakeExchanger::new();
    let service = TokenService::new(&store, &exchanger);

    assert_eq!(service.force_refresh(), None);
    assert!(exchanger.calls().is_empty());
}
