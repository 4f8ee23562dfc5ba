use std::sync::Arc;

use chrono::NaiveDate;

use aurum::error::AppError;
use aurum::kv::{KeyValue, MemoryKv};
use aurum::models::test::Difficulty;
use aurum::models::user::User;
use aurum::repositories::users::ProfilePatch;
use aurum::repositories::{index, users};
use aurum::services::users as user_service;

fn date(year: i32, month: u32, day: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(year, month, day).unwrap()
}

fn difficulty(level: u8) -> Difficulty {
    Difficulty::new(level).unwrap()
}

/// Creates a user with a profile and one scheduled test, returning the state.
async fn seed_user_with_test(kv: &MemoryKv, email: &str, subject: &str) -> User {
    let user = user_service::create_or_get_user(kv, email, Some("Seed"))
        .await
        .unwrap();
    user_service::add_test(
        kv,
        &user.id,
        subject.to_string(),
        None,
        date(2024, 3, 15),
        difficulty(2),
    )
    .await
    .unwrap()
}

#[tokio::test]
async fn ensure_creates_default_state_on_first_access() {
    let kv = MemoryKv::new();

    let user = users::ensure(&kv, "ada").await.unwrap();

    assert_eq!(user.id, "ada");
    assert!(user.name.is_empty());
    assert!(user.email.is_empty());
    assert!(user.avatar_url.is_none());
    assert!(user.tests.is_empty());

    // second access returns the persisted state, not a fresh one
    let again = users::ensure(&kv, "ada").await.unwrap();
    assert_eq!(again.created_at, user.created_at);
}

#[tokio::test]
async fn ensure_backfills_legacy_records_without_a_tests_collection() {
    let kv = MemoryKv::new();
    let legacy =
        br#"{"id":"ada","name":"Ada","email":"ada@example.com","createdAt":"2024-01-01T00:00:00Z"}"#;
    assert!(kv.put_if_version("user:ada", legacy.to_vec(), 0).await.unwrap());

    let user = users::ensure(&kv, "ada").await.unwrap();

    assert_eq!(user.name, "Ada");
    assert_eq!(user.email, "ada@example.com");
    assert!(user.avatar_url.is_none());
    assert!(user.tests.is_empty());
}

#[tokio::test]
async fn adding_a_test_to_a_fresh_user_matches_the_generator_contract() {
    let kv = MemoryKv::new();
    users::ensure(&kv, "new-student").await.unwrap();

    let user = user_service::add_test(
        &kv,
        "new-student",
        "Mathematics".to_string(),
        None,
        date(2024, 3, 15),
        difficulty(2),
    )
    .await
    .unwrap();

    assert_eq!(user.tests.len(), 1);
    let test = &user.tests[0];
    assert_eq!(test.title, "Mathematics Test");
    assert_eq!(test.sessions.len(), 14);
    assert_eq!(test.sessions[0].date, date(2024, 3, 1));
    assert_eq!(test.sessions[13].date, date(2024, 3, 14));
    assert!(test.sessions.iter().all(|s| s.duration_minutes == 55));
    assert!(test.sessions.iter().all(|s| !s.is_completed));
}

#[tokio::test]
async fn toggling_a_session_twice_restores_the_original_flag() {
    let kv = MemoryKv::new();
    let user = seed_user_with_test(&kv, "ada@example.com", "Physics").await;
    let test_id = user.tests[0].id.clone();
    let session_id = user.tests[0].sessions[0].id.clone();

    let once = users::toggle_session(&kv, &user.id, &test_id, &session_id)
        .await
        .unwrap();
    assert!(once.tests[0].sessions[0].is_completed);

    let twice = users::toggle_session(&kv, &user.id, &test_id, &session_id)
        .await
        .unwrap();
    assert!(!twice.tests[0].sessions[0].is_completed);
}

#[tokio::test]
async fn toggling_unknown_nested_ids_is_a_silent_noop() {
    let kv = MemoryKv::new();
    let user = seed_user_with_test(&kv, "ada@example.com", "Physics").await;
    let test_id = user.tests[0].id.clone();
    let before = serde_json::to_string(&user.tests).unwrap();

    let after_bad_session = users::toggle_session(&kv, &user.id, &test_id, "nonexistent")
        .await
        .unwrap();
    assert_eq!(serde_json::to_string(&after_bad_session.tests).unwrap(), before);

    let after_bad_test = users::toggle_session(&kv, &user.id, "nonexistent", "nonexistent")
        .await
        .unwrap();
    assert_eq!(serde_json::to_string(&after_bad_test.tests).unwrap(), before);
}

#[tokio::test]
async fn deleting_a_test_leaves_the_others_untouched() {
    let kv = MemoryKv::new();
    let user = seed_user_with_test(&kv, "ada@example.com", "Physics").await;
    let user = user_service::add_test(
        &kv,
        &user.id,
        "History".to_string(),
        None,
        date(2024, 5, 20),
        difficulty(3),
    )
    .await
    .unwrap();

    let physics_id = user.tests[0].id.clone();
    let history_before = serde_json::to_string(&user.tests[1]).unwrap();

    let after = users::delete_test(&kv, &user.id, &physics_id).await.unwrap();

    assert_eq!(after.tests.len(), 1);
    assert_eq!(serde_json::to_string(&after.tests[0]).unwrap(), history_before);
}

#[tokio::test]
async fn deleting_an_unknown_test_is_a_noop() {
    let kv = MemoryKv::new();
    let user = seed_user_with_test(&kv, "ada@example.com", "Physics").await;

    let after = users::delete_test(&kv, &user.id, "nonexistent").await.unwrap();
    assert_eq!(after.tests.len(), 1);
}

#[tokio::test]
async fn profile_patch_merges_scalars_and_never_touches_tests() {
    let kv = MemoryKv::new();
    let user = seed_user_with_test(&kv, "ada@example.com", "Physics").await;
    let tests_before = serde_json::to_string(&user.tests).unwrap();

    let patched = users::patch_profile(
        &kv,
        &user.id,
        ProfilePatch {
            name: Some("Ada Lovelace".to_string()),
            avatar_url: Some("https://example.com/ada.png".to_string()),
        },
    )
    .await
    .unwrap();

    assert_eq!(patched.name, "Ada Lovelace");
    assert_eq!(patched.avatar_url.as_deref(), Some("https://example.com/ada.png"));
    assert_eq!(patched.email, "ada@example.com");
    assert_eq!(serde_json::to_string(&patched.tests).unwrap(), tests_before);

    // an empty patch changes nothing
    let unchanged = users::patch_profile(&kv, &user.id, ProfilePatch::default())
        .await
        .unwrap();
    assert_eq!(unchanged.name, "Ada Lovelace");
    assert_eq!(serde_json::to_string(&unchanged.tests).unwrap(), tests_before);
}

#[tokio::test]
async fn concurrent_toggles_on_sibling_tests_both_land() {
    let kv = Arc::new(MemoryKv::new());
    let user = user_service::create_or_get_user(kv.as_ref(), "ada@example.com", Some("Ada"))
        .await
        .unwrap();
    let user = user_service::add_test(
        kv.as_ref(),
        &user.id,
        "Physics".to_string(),
        None,
        date(2024, 3, 15),
        difficulty(2),
    )
    .await
    .unwrap();
    let user = user_service::add_test(
        kv.as_ref(),
        &user.id,
        "History".to_string(),
        None,
        date(2024, 5, 20),
        difficulty(1),
    )
    .await
    .unwrap();

    let id = user.id.clone();
    let first = (user.tests[0].id.clone(), user.tests[0].sessions[0].id.clone());
    let second = (user.tests[1].id.clone(), user.tests[1].sessions[0].id.clone());

    let kv_a = kv.clone();
    let id_a = id.clone();
    let toggle_a = tokio::spawn(async move {
        users::toggle_session(kv_a.as_ref(), &id_a, &first.0, &first.1).await
    });

    let kv_b = kv.clone();
    let id_b = id.clone();
    let toggle_b = tokio::spawn(async move {
        users::toggle_session(kv_b.as_ref(), &id_b, &second.0, &second.1).await
    });

    toggle_a.await.unwrap().unwrap();
    toggle_b.await.unwrap().unwrap();

    let settled = user_service::get_user(kv.as_ref(), &id).await.unwrap();
    assert!(settled.tests[0].sessions[0].is_completed, "first toggle lost");
    assert!(settled.tests[1].sessions[0].is_completed, "second toggle lost");
}

#[tokio::test]
async fn index_registration_is_idempotent_and_insertion_ordered() {
    let kv = MemoryKv::new();

    index::register(&kv, "ada").await.unwrap();
    index::register(&kv, "grace").await.unwrap();
    index::register(&kv, "ada").await.unwrap();

    assert_eq!(index::list(&kv).await.unwrap(), vec!["ada", "grace"]);
}

#[tokio::test]
async fn first_login_fills_the_profile_and_registers_the_id() {
    let kv = MemoryKv::new();

    let user = user_service::create_or_get_user(&kv, "Ada.Lovelace@Example.COM ", None)
        .await
        .unwrap();

    assert_eq!(user.id, "ada-lovelace-example-com");
    assert_eq!(user.email, "Ada.Lovelace@Example.COM");
    assert_eq!(user.name, "Student");
    assert_eq!(
        user_service::list_user_ids(&kv).await.unwrap(),
        vec!["ada-lovelace-example-com"]
    );

    // a second login resolves to the same aggregate and keeps the profile
    let again = user_service::create_or_get_user(&kv, "ada.lovelace@example.com", Some("Someone"))
        .await
        .unwrap();
    assert_eq!(again.id, user.id);
    assert_eq!(again.name, "Student");
    assert_eq!(user_service::list_user_ids(&kv).await.unwrap().len(), 1);
}

#[tokio::test]
async fn operations_on_an_unknown_user_report_not_found() {
    let kv = MemoryKv::new();

    assert!(matches!(
        user_service::get_user(&kv, "nobody").await,
        Err(AppError::NotFound)
    ));
    assert!(matches!(
        user_service::toggle_session(&kv, "nobody", "t", "s").await,
        Err(AppError::NotFound)
    ));
    assert!(matches!(
        user_service::delete_test(&kv, "nobody", "t").await,
        Err(AppError::NotFound)
    ));
    assert!(matches!(
        user_service::update_profile(&kv, "nobody", ProfilePatch::default()).await,
        Err(AppError::NotFound)
    ));
}
