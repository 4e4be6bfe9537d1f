//! End-to-end registration flows against both store backends.

use std::sync::Arc;

use chrono::NaiveDateTime;
use party_checkin::{
    default_seed, find_same_day_duplicates, load_names_csv, scan_channel, write_attendance_csv,
    AttendanceQuery, CheckInError, CheckInStore, Clock, FixedClock, MemoryStore, Name,
    Orchestrator, RegistrationState, SortOrder, SqliteStore,
};
use rstest::rstest;
use tempfile::TempDir;

fn at(text: &str) -> NaiveDateTime {
    party_checkin::temporal::parse_timestamp(text).expect("timestamp")
}

fn store(kind: &str) -> Arc<dyn CheckInStore> {
    match kind {
        "memory" => Arc::new(MemoryStore::new()),
        "sqlite" => Arc::new(SqliteStore::open_in_memory(false).expect("sqlite")),
        "memory-unique" => Arc::new(MemoryStore::with_unique_constraints()),
        "sqlite-unique" => Arc::new(SqliteStore::open_in_memory(true).expect("sqlite")),
        other => panic!("unknown store {other}"),
    }
}

// ---------------------------------------------------------------------------
// 1. Daily dedup across backends
// ---------------------------------------------------------------------------

#[rstest]
#[case("memory")]
#[case("sqlite")]
#[case("memory-unique")]
#[case("sqlite-unique")]
#[tokio::test]
async fn one_check_in_per_name_per_local_day(#[case] kind: &str) {
    let store = store(kind);
    let clock = Arc::new(FixedClock::new(at("2024-12-24 10:00:00")));
    let mut orch = Orchestrator::new(store.clone(), clock.clone());

    orch.submit(Some("Alice")).await.expect("first check-in");

    clock.set(at("2024-12-24 23:00:00"));
    let err = orch.submit(Some("Alice")).await.unwrap_err();
    assert!(matches!(err, CheckInError::AlreadyRegisteredToday { .. }), "got: {err}");

    clock.set(at("2024-12-25 00:00:01"));
    orch.submit(Some("Alice")).await.expect("next day");

    let all = store
        .select_attendance(AttendanceQuery::all().order(SortOrder::OldestFirst))
        .await
        .unwrap();
    assert_eq!(all.len(), 2);
    assert!(find_same_day_duplicates(&all).is_empty());
}

#[rstest]
#[case("memory")]
#[case("sqlite")]
#[tokio::test]
async fn names_are_case_sensitive_everywhere(#[case] kind: &str) {
    let store = store(kind);
    let clock = Arc::new(FixedClock::new(at("2024-12-24 10:00:00")));
    let mut orch = Orchestrator::new(store, clock);

    orch.submit(Some("Alice")).await.unwrap();
    let lower = orch.submit(Some("alice")).await.unwrap();

    assert!(lower.name_added);
    assert_eq!(orch.list_names().await.unwrap().len(), 2);
    assert_eq!(orch.todays_attendance().await.unwrap().len(), 2);
}

// ---------------------------------------------------------------------------
// 2. Kiosk session: scan, confirm, retry
// ---------------------------------------------------------------------------

#[tokio::test]
async fn scan_confirm_flow_on_sqlite() {
    let store = store("sqlite");
    let clock = Arc::new(FixedClock::new(at("2024-12-24 18:00:00")));
    let mut orch = Orchestrator::new(store, clock);
    orch.bootstrap_if_empty(&default_seed()).await.unwrap();

    let (scanner, mut scans) = scan_channel();
    scanner.on_scan("https://party.example/door");
    scanner.on_scan("https://party.example/door");

    assert!(orch.poll_scan(&mut scans));
    assert!(!orch.poll_scan(&mut scans), "bursts coalesce into one signal");
    assert_eq!(orch.state(), RegistrationState::AwaitingConfirmation);

    orch.select_name("Fiona Apple").unwrap();
    orch.type_name("Frank Ocean");
    let check_in = orch.submit(None).await.unwrap();

    assert_eq!(check_in.record.name.as_str(), "Frank Ocean");
    assert!(check_in.name_added);
    assert_eq!(orch.state(), RegistrationState::Idle);

    let available = orch.available_names("").await.unwrap();
    assert_eq!(available.len(), 8, "seed names remain, Frank is checked in");
    assert!(!available.iter().any(|n| n.as_str() == "Frank Ocean"));
}

#[tokio::test]
async fn unique_store_rejects_lost_race_as_duplicate() {
    let store = store("sqlite-unique");
    let clock = Arc::new(FixedClock::new(at("2024-12-24 18:00:00")));
    let mut kiosk_a = Orchestrator::new(store.clone(), clock.clone());
    let kiosk_b = Orchestrator::new(store.clone(), clock.clone());

    kiosk_a.submit(Some("Bob")).await.unwrap();

    // Kiosk B already passed its dedup check before A wrote
    let bob = Name::parse("Bob").expect("valid name");
    let err = kiosk_b
        .ledger()
        .record_check_in(&bob, clock.now())
        .await
        .unwrap_err();
    assert!(matches!(err, CheckInError::AlreadyRegisteredToday { .. }));
}

#[rstest]
#[case("memory")]
#[case("sqlite")]
#[tokio::test]
async fn check_then_write_race_is_kept_without_constraints(#[case] kind: &str) {
    let store = store(kind);
    let clock = Arc::new(FixedClock::new(at("2024-12-24 18:00:00")));
    let kiosk_a = Orchestrator::new(store.clone(), clock.clone());
    let kiosk_b = Orchestrator::new(store.clone(), clock.clone());
    let bob = Name::parse("Bob").expect("valid name");

    // Both kiosks pass the dedup check before either writes
    assert!(!kiosk_a.has_checked_in_today(&bob).await.unwrap());
    assert!(!kiosk_b.has_checked_in_today(&bob).await.unwrap());
    kiosk_a.ledger().record_check_in(&bob, clock.now()).await.unwrap();
    clock.advance(chrono::Duration::seconds(1));
    kiosk_b.ledger().record_check_in(&bob, clock.now()).await.unwrap();

    let history = kiosk_a.attendance_history().await.unwrap();
    let duplicates = find_same_day_duplicates(&history);
    assert_eq!(duplicates.len(), 1);
    assert_eq!(duplicates[0].name, bob);
    assert_eq!(duplicates[0].record_ids.len(), 2);
    assert_eq!(duplicates[0].extra_records(), 1);

    // Same interleaving inside ensure_exists: check, check, append, append
    let zed = Name::parse("Zed").expect("valid name");
    assert!(!kiosk_a.registry().contains(&zed).await.unwrap());
    assert!(!kiosk_b.registry().contains(&zed).await.unwrap());
    assert_eq!(store.insert_names(&["Zed".to_string()]).await.unwrap(), 1);
    assert_eq!(store.insert_names(&["Zed".to_string()]).await.unwrap(), 1);

    let rows = store.select_names().await.unwrap();
    assert_eq!(rows.iter().filter(|r| r.as_str() == "Zed").count(), 2);
    assert_eq!(kiosk_a.search("zed").await.unwrap(), vec![zed.clone()]);
    assert!(kiosk_b.ensure_name("Zed").await.unwrap().already_present);
}

// ---------------------------------------------------------------------------
// 3. Persistence, import and export
// ---------------------------------------------------------------------------

#[tokio::test]
async fn attendance_survives_reopen() {
    let dir = TempDir::new().expect("tempdir");
    let path = dir.path().join("attendance.db");
    let clock = Arc::new(FixedClock::new(at("2024-12-24 20:00:00")));

    {
        let store = Arc::new(SqliteStore::open(&path, false).unwrap());
        let mut orch = Orchestrator::new(store, clock.clone());
        orch.submit(Some("Diana Prince")).await.unwrap();
    }

    let store = Arc::new(SqliteStore::open(&path, false).unwrap());
    let mut orch = Orchestrator::new(store, clock);
    let err = orch.submit(Some("Diana Prince")).await.unwrap_err();
    assert!(matches!(err, CheckInError::AlreadyRegisteredToday { .. }));
    assert_eq!(orch.list_recent(10).await.unwrap().len(), 1);
}

#[tokio::test]
async fn import_roster_and_export_day() {
    let dir = TempDir::new().expect("tempdir");
    let roster = dir.path().join("roster.csv");
    std::fs::write(&roster, "name\nAda Lovelace\n  \nGrace Hopper\n").unwrap();

    let names = load_names_csv(&roster).unwrap();
    assert_eq!(names.len(), 2);

    let store = store("sqlite");
    let clock = Arc::new(FixedClock::new(at("2024-12-24 20:00:00")));
    let mut orch = Orchestrator::new(store, clock);
    for name in &names {
        orch.ensure_name(name.as_str()).await.unwrap();
    }
    orch.select_and_submit("Grace Hopper").await.unwrap();

    let day = at("2024-12-24 00:00:00").date();
    let records = orch.checked_in_on(day).await.unwrap();
    let out = dir.path().join("export.csv");
    assert_eq!(write_attendance_csv(&out, &records).unwrap(), 1);

    let text = std::fs::read_to_string(&out).unwrap();
    assert!(text.starts_with("id,name,checked_in_at\n"));
    assert!(text.contains("Grace Hopper,2024-12-24 20:00:00"));
}
