use super::*;
use proptest::prelude::*;
use tempfile::TempDir;

fn store_in(temp_dir: &TempDir) -> ProfileStore {
    ProfileStore::new(temp_dir.path().join("config.json"))
}

fn snapshot(token: &str, plan: &str) -> ResolvedToken {
    ResolvedToken {
        access_token: token.to_string(),
        plan: plan.to_string(),
    }
}

#[test]
fn test_missing_file_loads_default_state() {
    let temp_dir = TempDir::new().unwrap();
    let state = store_in(&temp_dir).load();

    assert_eq!(state.active_profile, AUTO_PROFILE);
    assert_eq!(state.refresh_seconds, DEFAULT_REFRESH_SECONDS);
    assert_eq!(state.profiles.get(AUTO_PROFILE), Some(&Profile::auto()));
}

#[test]
fn test_unparsable_file_loads_default_state() {
    let temp_dir = TempDir::new().unwrap();
    let store = store_in(&temp_dir);
    fs::write(store.path(), "{ not json").unwrap();

    assert_eq!(store.load(), ProfileState::default());
}

#[test]
fn test_updates_never_overwrite_an_unparsable_file() {
    let temp_dir = TempDir::new().unwrap();
    let store = store_in(&temp_dir);
    let broken = r#"{"profiles": {"work": {"label": "Work", "source": "token", "token": "tok"}"#;
    fs::write(store.path(), broken).unwrap();

    assert!(store
        .add_or_update_profile("personal", "Personal", &snapshot("new", "pro"))
        .is_err());
    assert!(store.set_active(AUTO_PROFILE).is_err());
    assert!(store.refresh_profile("work", &snapshot("new", "pro")).is_err());

    assert_eq!(fs::read_to_string(store.path()).unwrap(), broken);
}

#[test]
fn test_hand_edited_values_are_tolerated() {
    let temp_dir = TempDir::new().unwrap();
    let store = store_in(&temp_dir);
    fs::write(
        store.path(),
        r#"{
            "active_profile": null,
            "refresh_seconds": 60.5,
            "profiles": {
                "work": {"label": null, "source": "token", "token": "tok", "plan": null}
            }
        }"#,
    )
    .unwrap();

    let state = store.try_load().unwrap();
    assert_eq!(state.active_profile, AUTO_PROFILE);
    assert_eq!(state.refresh_seconds, 60);
    assert_eq!(state.profiles["work"].display_label("work"), "work");

    store
        .add_or_update_profile("personal", "Personal", &snapshot("new", "pro"))
        .unwrap();

    let state = store.load();
    assert_eq!(
        state.profiles["work"].source,
        ProfileSource::Pinned {
            token: "tok".to_string(),
            plan: "unknown".to_string()
        }
    );
    assert!(state.profiles.contains_key("personal"));
    assert_eq!(state.refresh_seconds, 60);
}

#[test]
fn test_unusable_refresh_seconds_fall_back_to_default() {
    for raw in [r#""90""#, "-5", "null", r#""soon""#] {
        let json = format!(r#"{{"refresh_seconds": {}}}"#, raw);
        let state: ProfileState = serde_json::from_str(&json).unwrap();
        let expected = if raw == r#""90""# {
            90
        } else {
            DEFAULT_REFRESH_SECONDS
        };
        assert_eq!(state.refresh_seconds, expected, "input {}", raw);
    }
}

#[test]
fn test_load_injects_missing_auto_profile() {
    let temp_dir = TempDir::new().unwrap();
    let store = store_in(&temp_dir);
    fs::write(
        store.path(),
        r#"{
            "active_profile": "work",
            "refresh_seconds": 60,
            "profiles": {
                "work": {"label": "Work", "source": "token", "token": "tok", "plan": "enterprise"}
            }
        }"#,
    )
    .unwrap();

    let state = store.load();

    assert_eq!(state.active_profile, "work");
    assert_eq!(state.refresh_seconds, 60);
    assert!(state.profiles.get(AUTO_PROFILE).unwrap().is_delegated());
    assert_eq!(
        state.profiles["work"].source,
        ProfileSource::Pinned {
            token: "tok".to_string(),
            plan: "enterprise".to_string()
        }
    );
}

#[test]
fn test_file_format_uses_source_tags() {
    let temp_dir = TempDir::new().unwrap();
    let store = store_in(&temp_dir);
    store
        .add_or_update_profile("work", "Work", &snapshot("tok", "team"))
        .unwrap();

    let json: serde_json::Value =
        serde_json::from_str(&fs::read_to_string(store.path()).unwrap()).unwrap();

    assert_eq!(json["profiles"]["auto"]["source"], "keychain");
    assert!(json["profiles"]["auto"].get("token").is_none());
    assert_eq!(json["profiles"]["work"]["source"], "token");
    assert_eq!(json["profiles"]["work"]["token"], "tok");
    assert_eq!(json["profiles"]["work"]["plan"], "team");
    assert_eq!(json["active_profile"], "auto");
}

#[test]
fn test_dangling_active_profile_resolves_to_auto() {
    let state = ProfileState {
        active_profile: "gone".to_string(),
        ..ProfileState::default()
    };

    let (name, profile) = state.resolve_active();

    assert_eq!(name, AUTO_PROFILE);
    assert!(profile.is_delegated());
    assert_eq!(state.active_label(), AUTO_LABEL);
}

#[test]
fn test_empty_label_displays_as_name() {
    let profile = Profile::pinned("", &snapshot("tok", "pro"));
    assert_eq!(profile.display_label("personal"), "personal");
}

#[test]
fn test_poll_interval_has_a_floor() {
    let state = ProfileState {
        refresh_seconds: 1,
        ..ProfileState::default()
    };
    assert_eq!(state.poll_interval(), Duration::from_secs(MIN_REFRESH_SECONDS));

    let state = ProfileState {
        refresh_seconds: 300,
        ..ProfileState::default()
    };
    assert_eq!(state.poll_interval(), Duration::from_secs(300));
}

#[test]
fn test_add_profile_keeps_active_profile() {
    let temp_dir = TempDir::new().unwrap();
    let store = store_in(&temp_dir);

    let state = store
        .add_or_update_profile("personal", "Personal (Pro)", &snapshot("tok", "pro"))
        .unwrap();

    assert_eq!(state.active_profile, AUTO_PROFILE);
    assert_eq!(store.load(), state);
}

#[test]
fn test_add_profile_rejects_reserved_name() {
    let temp_dir = TempDir::new().unwrap();
    let store = store_in(&temp_dir);

    assert!(store
        .add_or_update_profile(AUTO_PROFILE, "x", &snapshot("tok", "pro"))
        .is_err());
    assert!(!store.path().exists());
}

#[test]
fn test_refresh_profile_keeps_label() {
    let temp_dir = TempDir::new().unwrap();
    let store = store_in(&temp_dir);
    store
        .add_or_update_profile("work", "Work", &snapshot("old", "team"))
        .unwrap();

    let state = store
        .refresh_profile("work", &snapshot("new", "enterprise"))
        .unwrap();

    let work = &state.profiles["work"];
    assert_eq!(work.label, "Work");
    assert_eq!(
        work.source,
        ProfileSource::Pinned {
            token: "new".to_string(),
            plan: "enterprise".to_string()
        }
    );
}

#[test]
fn test_refresh_profile_rejects_unknown_and_delegated() {
    let temp_dir = TempDir::new().unwrap();
    let store = store_in(&temp_dir);

    assert!(store
        .refresh_profile("missing", &snapshot("tok", "pro"))
        .is_err());
    assert!(store
        .refresh_profile(AUTO_PROFILE, &snapshot("tok", "pro"))
        .is_err());
}

#[test]
fn test_set_active_persists_and_rejects_unknown() {
    let temp_dir = TempDir::new().unwrap();
    let store = store_in(&temp_dir);
    store
        .add_or_update_profile("work", "Work", &snapshot("tok", "team"))
        .unwrap();

    store.set_active("work").unwrap();
    assert_eq!(store.load().active_profile, "work");

    assert!(store.set_active("nope").is_err());
    assert_eq!(store.load().active_profile, "work");
}

#[test]
fn test_ensure_exists_writes_once() {
    let temp_dir = TempDir::new().unwrap();
    let store = store_in(&temp_dir);

    store.ensure_exists().unwrap();
    assert_eq!(store.load(), ProfileState::default());

    fs::write(store.path(), r#"{"refresh_seconds": 30}"#).unwrap();
    store.ensure_exists().unwrap();
    assert_eq!(store.load().refresh_seconds, 30);
}

#[cfg(unix)]
#[test]
fn test_saved_config_is_owner_only() {
    use std::os::unix::fs::PermissionsExt;

    let temp_dir = TempDir::new().unwrap();
    let store = store_in(&temp_dir);
    store.save(&ProfileState::default()).unwrap();

    let mode = fs::metadata(store.path()).unwrap().permissions().mode();
    assert_eq!(mode & 0o777, 0o600);
}

fn profile_strategy() -> impl Strategy<Value = Profile> {
    let pinned = ("[a-zA-Z ()]{0,12}", "[a-zA-Z0-9_-]{1,24}", "[a-z]{1,10}").prop_map(
        |(label, token, plan)| Profile {
            label,
            source: ProfileSource::Pinned { token, plan },
        },
    );
    let delegated = "[a-zA-Z ]{0,12}".prop_map(|label| Profile {
        label,
        source: ProfileSource::Delegated,
    });
    prop_oneof![pinned, delegated]
}

proptest! {
    #[test]
    fn prop_save_then_load_round_trips(
        profiles in proptest::collection::btree_map("[a-z]{1,8}", profile_strategy(), 0..5),
        refresh_seconds in 0u64..100_000,
        active_index in 0usize..6,
    ) {
        let temp_dir = TempDir::new().unwrap();
        let store = store_in(&temp_dir);

        let names: Vec<String> = profiles.keys().cloned().collect();
        let active_profile = names
            .get(active_index)
            .cloned()
            .unwrap_or_else(|| AUTO_PROFILE.to_string());
        let state = ProfileState { active_profile, refresh_seconds, profiles };

        store.save(&state).unwrap();
        let loaded = store.load();

        let mut expected = state.clone();
        expected.ensure_auto();
        prop_assert_eq!(loaded, expected);
    }
}
