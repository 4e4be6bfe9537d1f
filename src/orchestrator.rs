// 🎟️ Registration Orchestrator
//
// Idle ──scan──▶ AwaitingConfirmation ──submit──▶ Registering ──▶ Idle
//   └────────────────────────submit─────────────────▲
//
// One registration in flight per session; `submit` takes `&mut self`.
// Other sessions (other kiosks, other browsers) share the store and can race
// the check-then-write below. Without store-level constraints that race can
// produce two check-ins for one name on one day.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use chrono::NaiveDate;
use serde::Serialize;
use tracing::{info, warn};

use crate::entities::{
    filter_names, AttendanceLedger, AttendanceRecord, EnsureOutcome, Name, NameRegistry,
};
use crate::error::{CheckInError, StoreError};
use crate::scan::ScanReceiver;
use crate::store::CheckInStore;
use crate::temporal::Clock;

pub const STATUS_READY: &str = "Select your name or register if not in the list";
pub const STATUS_SCANNED: &str = "QR code scanned! Select your name or enter it below";
pub const STATUS_EMPTY_INPUT: &str = "Please select or enter a name";
pub const STATUS_REGISTRY_ERROR: &str = "Error adding name to list";
pub const STATUS_LEDGER_ERROR: &str = "Error registering attendance";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum RegistrationState {
    Idle,
    AwaitingConfirmation,
    Registering,
}

/// Client-local state of one check-in attempt.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RegistrationSession {
    /// Picked from the list, not yet submitted
    pub selected_name: Option<Name>,
    /// Typed during confirmation or free-text entry, raw
    pub pending_name: Option<String>,
    pub qr_confirmation_pending: bool,
    pub status: String,
}

impl Default for RegistrationSession {
    fn default() -> Self {
        RegistrationSession {
            selected_name: None,
            pending_name: None,
            qr_confirmation_pending: false,
            status: STATUS_READY.to_string(),
        }
    }
}

impl RegistrationSession {
    fn clear_pending(&mut self) {
        self.selected_name = None;
        self.pending_name = None;
        self.qr_confirmation_pending = false;
    }
}

/// A completed registration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CheckIn {
    pub record: AttendanceRecord,
    /// The name was new to the registry
    pub name_added: bool,
}

pub struct Orchestrator {
    registry: NameRegistry,
    ledger: AttendanceLedger,
    clock: Arc<dyn Clock>,
    store_timeout: Option<Duration>,
    state: RegistrationState,
    session: RegistrationSession,
}

impl Orchestrator {
    pub fn new(store: Arc<dyn CheckInStore>, clock: Arc<dyn Clock>) -> Self {
        Orchestrator {
            registry: NameRegistry::new(Arc::clone(&store)),
            ledger: AttendanceLedger::new(store),
            clock,
            store_timeout: None,
            state: RegistrationState::Idle,
            session: RegistrationSession::default(),
        }
    }

    /// Bound every store call. `None` waits forever.
    pub fn with_store_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.store_timeout = timeout;
        self
    }

    pub fn state(&self) -> RegistrationState {
        self.state
    }

    pub fn session(&self) -> &RegistrationSession {
        &self.session
    }

    pub fn status(&self) -> &str {
        &self.session.status
    }

    pub fn registry(&self) -> &NameRegistry {
        &self.registry
    }

    pub fn ledger(&self) -> &AttendanceLedger {
        &self.ledger
    }

    // ========================================================================
    // SESSION TRANSITIONS
    // ========================================================================

    /// Scan Bridge callback. Any non-empty payload (re)starts confirmation;
    /// its content is never read.
    pub fn on_scan(&mut self, payload: &str) -> bool {
        if payload.is_empty() {
            return false;
        }
        self.enter_confirmation();
        true
    }

    /// Consume a pending signal from the bridge channel, if any.
    pub fn poll_scan(&mut self, scans: &mut ScanReceiver) -> bool {
        match scans.try_take() {
            Some(_) => {
                self.enter_confirmation();
                true
            }
            None => false,
        }
    }

    fn enter_confirmation(&mut self) {
        if self.state == RegistrationState::Registering {
            // Restart: the in-flight attempt is abandoned, its result ignored
            warn!("scan arrived during registration; restarting confirmation");
        }
        self.session.clear_pending();
        self.session.qr_confirmation_pending = true;
        self.session.status = STATUS_SCANNED.to_string();
        self.state = RegistrationState::AwaitingConfirmation;
        info!("awaiting name confirmation");
    }

    /// Pick a name from the list without submitting it.
    pub fn select_name(&mut self, raw: &str) -> Result<(), CheckInError> {
        let name = Name::parse(raw)?;
        self.session.selected_name = Some(name);
        Ok(())
    }

    /// Record free-text typed by the user; empty text clears it.
    pub fn type_name(&mut self, raw: &str) {
        self.session.pending_name = if raw.is_empty() {
            None
        } else {
            Some(raw.to_string())
        };
    }

    /// Drop everything without writing; back to `Idle`.
    pub fn abandon(&mut self) {
        self.session = RegistrationSession::default();
        self.state = RegistrationState::Idle;
    }

    // ========================================================================
    // REGISTRATION
    // ========================================================================

    /// One-step protocol: select and submit in a single action. The picked
    /// name is submitted explicitly, so stale typed text cannot outrank it.
    pub async fn select_and_submit(&mut self, raw: &str) -> Result<CheckIn, CheckInError> {
        self.select_name(raw).map_err(|e| self.reject_input(e))?;
        self.submit(Some(raw)).await
    }

    /// Register the resolved candidate for today.
    ///
    /// Candidate precedence: `explicit` free text, then the pending typed
    /// name, then the selected list name. A candidate counts once its raw text
    /// is non-empty; it is trimmed and validated afterwards, so whitespace is
    /// rejected rather than skipped. Invalid input leaves the state untouched.
    pub async fn submit(&mut self, explicit: Option<&str>) -> Result<CheckIn, CheckInError> {
        let candidate = explicit
            .filter(|s| !s.is_empty())
            .map(str::to_string)
            .or_else(|| self.session.pending_name.clone().filter(|s| !s.is_empty()))
            .or_else(|| self.session.selected_name.as_ref().map(|n| n.as_str().to_string()));

        let name = match candidate {
            Some(raw) => Name::parse(&raw).map_err(|e| self.reject_input(e))?,
            None => {
                return Err(self.reject_input(CheckInError::InvalidInput(
                    "no name selected or entered".to_string(),
                )))
            }
        };

        self.register(name).await
    }

    async fn register(&mut self, name: Name) -> Result<CheckIn, CheckInError> {
        self.state = RegistrationState::Registering;
        info!(name = %name, "registration started");

        // (b) make sure the roster knows the name; permanent even if (d) fails
        let ensured = match bounded(self.store_timeout, self.registry.ensure_exists(name.as_str())).await {
            Ok(outcome) => outcome,
            Err(e) => return Err(self.fail(e, STATUS_REGISTRY_ERROR)),
        };

        // (c) dedup check against today's ledger
        let now = self.clock.now();
        match bounded(self.store_timeout, self.ledger.has_checked_in_today(&name, now)).await {
            Ok(true) => return Err(self.reject_duplicate(name)),
            Ok(false) => {}
            Err(e) => return Err(self.fail(e, STATUS_LEDGER_ERROR)),
        }

        // (d) write
        match bounded(self.store_timeout, self.ledger.record_check_in(&name, now)).await {
            Ok(record) => {
                self.session.clear_pending();
                self.session.status = format!("{name} registered successfully!");
                self.state = RegistrationState::Idle;
                info!(name = %name, id = %record.id, "registration complete");
                Ok(CheckIn {
                    record,
                    name_added: !ensured.already_present,
                })
            }
            Err(CheckInError::AlreadyRegisteredToday { .. }) => Err(self.reject_duplicate(name)),
            Err(e) => Err(self.fail(e, STATUS_LEDGER_ERROR)),
        }
    }

    fn reject_input(&mut self, err: CheckInError) -> CheckInError {
        self.session.status = STATUS_EMPTY_INPUT.to_string();
        err
    }

    fn reject_duplicate(&mut self, name: Name) -> CheckInError {
        info!(name = %name, "already registered today");
        self.session.clear_pending();
        self.session.status = format!("{name} is already registered for today");
        self.state = RegistrationState::Idle;
        CheckInError::AlreadyRegisteredToday { name }
    }

    /// Store failure: back to Idle, session kept so the user can resubmit.
    fn fail(&mut self, err: CheckInError, status: &str) -> CheckInError {
        warn!(error = %err, "registration failed");
        self.session.status = status.to_string();
        self.state = RegistrationState::Idle;
        err
    }

    // ========================================================================
    // ROSTER + VIEWS
    // ========================================================================

    /// Add a name to the roster without checking it in.
    pub async fn add_name(&mut self, raw: &str) -> Result<EnsureOutcome, CheckInError> {
        let name = Name::parse(raw).map_err(|e| {
            self.session.status = "Please enter a name".to_string();
            e
        })?;

        match bounded(self.store_timeout, self.registry.ensure_exists(name.as_str())).await {
            Ok(outcome) => {
                self.session.status = if outcome.already_present {
                    "Name already exists in list".to_string()
                } else {
                    format!("Added {} to list", outcome.name)
                };
                Ok(outcome)
            }
            Err(e) => {
                warn!(error = %e, "add name failed");
                self.session.status = STATUS_REGISTRY_ERROR.to_string();
                Err(e)
            }
        }
    }

    pub async fn bootstrap_if_empty(&self, seed: &[Name]) -> Result<usize, CheckInError> {
        bounded(self.store_timeout, self.registry.bootstrap_if_empty(seed)).await
    }

    pub async fn list_names(&self) -> Result<Vec<Name>, CheckInError> {
        bounded(self.store_timeout, self.registry.list_names()).await
    }

    /// Roster filtered by `search`, case-insensitive.
    pub async fn search(&self, term: &str) -> Result<Vec<Name>, CheckInError> {
        bounded(self.store_timeout, self.registry.search(term)).await
    }

    /// Bulk roster append; leaves the session status alone.
    pub async fn ensure_name(&self, raw: &str) -> Result<EnsureOutcome, CheckInError> {
        bounded(self.store_timeout, self.registry.ensure_exists(raw)).await
    }

    /// Roster minus names already checked in today, filtered by `search`.
    pub async fn available_names(&self, search: &str) -> Result<Vec<Name>, CheckInError> {
        let names = self.list_names().await?;
        let today = self.clock.now().date();
        let present = bounded(self.store_timeout, self.ledger.names_checked_in_on(today)).await?;

        let remaining: Vec<Name> = names.into_iter().filter(|n| !present.contains(n)).collect();
        Ok(filter_names(&remaining, search))
    }

    pub async fn has_checked_in_today(&self, name: &Name) -> Result<bool, CheckInError> {
        let now = self.clock.now();
        bounded(self.store_timeout, self.ledger.has_checked_in_today(name, now)).await
    }

    pub async fn list_recent(&self, limit: usize) -> Result<Vec<AttendanceRecord>, CheckInError> {
        bounded(self.store_timeout, self.ledger.list_recent(limit)).await
    }

    /// Check-ins on local date `day`, oldest first.
    pub async fn checked_in_on(&self, day: NaiveDate) -> Result<Vec<AttendanceRecord>, CheckInError> {
        bounded(self.store_timeout, self.ledger.checked_in_on(day)).await
    }

    /// Today's check-ins, oldest first.
    pub async fn todays_attendance(&self) -> Result<Vec<AttendanceRecord>, CheckInError> {
        self.checked_in_on(self.clock.now().date()).await
    }

    pub async fn attendance_history(&self) -> Result<Vec<AttendanceRecord>, CheckInError> {
        bounded(self.store_timeout, self.ledger.history()).await
    }
}

/// Apply the optional store timeout. An elapsed timeout is a retryable
/// `StoreUnavailable`; the abandoned store call may still complete.
async fn bounded<T, F>(timeout: Option<Duration>, fut: F) -> Result<T, CheckInError>
where
    F: Future<Output = Result<T, CheckInError>>,
{
    match timeout {
        Some(limit) => match tokio::time::timeout(limit, fut).await {
            Ok(result) => result,
            Err(_) => Err(CheckInError::StoreUnavailable(StoreError::TimedOut(limit))),
        },
        None => fut.await,
    }
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::MemoryStore;
    use crate::temporal::{parse_timestamp, FixedClock};

    struct Harness {
        store: Arc<MemoryStore>,
        clock: Arc<FixedClock>,
        orch: Orchestrator,
    }

    fn harness_with(store: MemoryStore) -> Harness {
        let store = Arc::new(store);
        let clock = Arc::new(FixedClock::new(parse_timestamp("2024-12-24 10:00:00").unwrap()));
        let orch = Orchestrator::new(store.clone(), clock.clone());
        Harness { store, clock, orch }
    }

    fn harness() -> Harness {
        harness_with(MemoryStore::new())
    }

    #[tokio::test]
    async fn test_happy_path_adds_name_and_records() {
        let mut h = harness();

        let check_in = h.orch.submit(Some("Alice")).await.unwrap();

        assert!(check_in.name_added);
        assert_eq!(check_in.record.name.as_str(), "Alice");
        assert_eq!(check_in.record.checked_in_at, h.clock.now());
        assert_eq!(h.store.name_rows(), vec!["Alice"]);
        assert_eq!(h.store.attendance_rows().len(), 1);
        assert_eq!(h.orch.status(), "Alice registered successfully!");
        assert_eq!(h.orch.state(), RegistrationState::Idle);
    }

    #[tokio::test]
    async fn test_second_submit_same_day_is_rejected() {
        let mut h = harness();
        h.orch.submit(Some("Alice")).await.unwrap();

        h.clock.advance(chrono::Duration::hours(3));
        let err = h.orch.submit(Some("Alice")).await.unwrap_err();

        assert!(matches!(err, CheckInError::AlreadyRegisteredToday { .. }));
        assert_eq!(h.store.attendance_rows().len(), 1);
        assert_eq!(h.store.name_rows(), vec!["Alice"]);
        assert_eq!(h.orch.status(), "Alice is already registered for today");
        assert_eq!(h.orch.state(), RegistrationState::Idle);
    }

    #[tokio::test]
    async fn test_next_day_is_allowed_again() {
        let mut h = harness();
        h.orch.submit(Some("Alice")).await.unwrap();

        h.clock.set(parse_timestamp("2024-12-25 00:00:01").unwrap());
        let check_in = h.orch.submit(Some("Alice")).await.unwrap();

        assert!(!check_in.name_added);
        assert_eq!(h.store.attendance_rows().len(), 2);
    }

    #[tokio::test]
    async fn test_blank_input_keeps_state_and_store_untouched() {
        let mut h = harness();
        h.orch.on_scan("payload");

        for raw in ["", "   "] {
            let err = h.orch.submit(Some(raw)).await.unwrap_err();
            assert!(matches!(err, CheckInError::InvalidInput(_)));
            assert_eq!(h.orch.state(), RegistrationState::AwaitingConfirmation);
            assert_eq!(h.orch.status(), STATUS_EMPTY_INPUT);
        }

        assert!(h.store.name_rows().is_empty());
        assert!(h.store.attendance_rows().is_empty());
    }

    #[tokio::test]
    async fn test_nothing_to_submit_from_idle() {
        let mut h = harness();

        let err = h.orch.submit(None).await.unwrap_err();

        assert!(matches!(err, CheckInError::InvalidInput(_)));
        assert_eq!(h.orch.state(), RegistrationState::Idle);
    }

    #[tokio::test]
    async fn test_scan_enters_confirmation_and_ignores_payload() {
        let mut h = harness();

        assert!(!h.orch.on_scan(""));
        assert_eq!(h.orch.state(), RegistrationState::Idle);

        assert!(h.orch.on_scan("Bob Johnson"));
        assert_eq!(h.orch.state(), RegistrationState::AwaitingConfirmation);
        assert!(h.orch.session().qr_confirmation_pending);
        assert!(h.orch.session().pending_name.is_none());
        assert!(h.orch.session().selected_name.is_none());
        assert_eq!(h.orch.status(), STATUS_SCANNED);
    }

    #[tokio::test]
    async fn test_second_scan_restarts_confirmation() {
        let mut h = harness();
        h.orch.on_scan("first");
        h.orch.select_name("Alice").unwrap();
        h.orch.type_name("Bob");

        h.orch.on_scan("second");

        assert_eq!(h.orch.state(), RegistrationState::AwaitingConfirmation);
        assert!(h.orch.session().selected_name.is_none());
        assert!(h.orch.session().pending_name.is_none());
    }

    #[tokio::test]
    async fn test_precedence_explicit_then_pending_then_selected() {
        let mut h = harness();

        h.orch.select_name("Selected").unwrap();
        h.orch.type_name("Typed");
        let first = h.orch.submit(Some("Explicit")).await.unwrap();
        assert_eq!(first.record.name.as_str(), "Explicit");

        h.orch.select_name("Selected").unwrap();
        h.orch.type_name("Typed");
        let second = h.orch.submit(None).await.unwrap();
        assert_eq!(second.record.name.as_str(), "Typed");

        h.orch.select_name("Selected").unwrap();
        let third = h.orch.submit(Some("")).await.unwrap();
        assert_eq!(third.record.name.as_str(), "Selected");
    }

    #[tokio::test]
    async fn test_whitespace_explicit_does_not_fall_through() {
        let mut h = harness();
        h.orch.select_name("Alice").unwrap();

        let err = h.orch.submit(Some("   ")).await.unwrap_err();

        assert!(matches!(err, CheckInError::InvalidInput(_)));
        assert_eq!(h.orch.session().selected_name.as_ref().map(Name::as_str), Some("Alice"));
        assert!(h.store.attendance_rows().is_empty());
    }

    #[tokio::test]
    async fn test_select_then_confirm_two_step() {
        let mut h = harness();
        h.orch.on_scan("qr");
        h.orch.select_name("Diana Prince").unwrap();

        assert_eq!(h.orch.state(), RegistrationState::AwaitingConfirmation);
        assert!(h.store.attendance_rows().is_empty());

        h.orch.submit(None).await.unwrap();
        assert_eq!(h.orch.state(), RegistrationState::Idle);
        assert_eq!(h.orch.session(), &RegistrationSession {
            status: "Diana Prince registered successfully!".to_string(),
            ..RegistrationSession::default()
        });
    }

    #[tokio::test]
    async fn test_select_and_submit_one_step() {
        let mut h = harness();
        let check_in = h.orch.select_and_submit("  Edward Norton ").await.unwrap();
        assert_eq!(check_in.record.name.as_str(), "Edward Norton");
    }

    #[tokio::test]
    async fn test_select_and_submit_beats_stale_typed_text() {
        let mut h = harness();
        h.orch.type_name("Gr");

        let check_in = h.orch.select_and_submit("Alice").await.unwrap();

        assert_eq!(check_in.record.name.as_str(), "Alice");
        assert_eq!(h.store.name_rows(), vec!["Alice"]);
        assert!(h.orch.session().pending_name.is_none());
    }

    #[tokio::test]
    async fn test_duplicate_clears_session() {
        let mut h = harness();
        h.orch.submit(Some("Alice")).await.unwrap();

        h.orch.on_scan("qr");
        h.orch.type_name("Alice");
        h.orch.submit(None).await.unwrap_err();

        assert!(h.orch.session().pending_name.is_none());
        assert!(!h.orch.session().qr_confirmation_pending);
    }

    #[tokio::test]
    async fn test_store_failure_preserves_session_for_retry() {
        let mut h = harness();
        h.orch.on_scan("qr");
        h.orch.type_name("Alice");
        h.store.set_unavailable(true);

        let err = h.orch.submit(None).await.unwrap_err();

        assert!(err.is_retryable());
        assert_eq!(h.orch.state(), RegistrationState::Idle);
        assert_eq!(h.orch.status(), STATUS_REGISTRY_ERROR);
        assert_eq!(h.orch.session().pending_name.as_deref(), Some("Alice"));

        h.store.set_unavailable(false);
        let check_in = h.orch.submit(None).await.unwrap();
        assert_eq!(check_in.record.name.as_str(), "Alice");
        assert_eq!(h.store.attendance_rows().len(), 1);
    }

    #[tokio::test]
    async fn test_store_conflict_maps_to_already_registered() {
        let mut h = harness_with(MemoryStore::with_unique_constraints());

        // Another kiosk wrote Alice's check-in; simulate losing the race by
        // writing directly after our dedup check would have passed.
        h.orch.submit(Some("Alice")).await.unwrap();
        let ledger = h.orch.ledger().clone();
        let err = ledger
            .record_check_in(&Name::parse("Alice").unwrap(), h.clock.now())
            .await
            .unwrap_err();

        assert!(matches!(err, CheckInError::AlreadyRegisteredToday { .. }));
        assert_eq!(h.store.attendance_rows().len(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_stalled_store_times_out() {
        let mut h = harness();
        h.orch = Orchestrator::new(h.store.clone(), h.clock.clone())
            .with_store_timeout(Some(Duration::from_secs(5)));
        h.orch.type_name("Alice");
        h.store.set_stalled(true);

        let err = h.orch.submit(None).await.unwrap_err();

        assert!(matches!(
            err,
            CheckInError::StoreUnavailable(StoreError::TimedOut(_))
        ));
        assert_eq!(h.orch.state(), RegistrationState::Idle);
        assert_eq!(h.orch.session().pending_name.as_deref(), Some("Alice"));
    }

    #[tokio::test(start_paused = true)]
    async fn test_stalled_store_times_out_on_reads() {
        let h = harness();
        h.store.set_stalled(true);
        let orch = Orchestrator::new(h.store.clone(), h.clock.clone())
            .with_store_timeout(Some(Duration::from_millis(500)));
        let alice = Name::parse("Alice").unwrap();
        let today = h.clock.now().date();

        let timed_out = |r: Result<(), CheckInError>| {
            matches!(r, Err(CheckInError::StoreUnavailable(StoreError::TimedOut(_))))
        };
        assert!(timed_out(orch.search("al").await.map(drop)));
        assert!(timed_out(orch.ensure_name("Alice").await.map(drop)));
        assert!(timed_out(orch.has_checked_in_today(&alice).await.map(drop)));
        assert!(timed_out(orch.checked_in_on(today).await.map(drop)));
        assert!(timed_out(orch.attendance_history().await.map(drop)));
        assert_eq!(orch.status(), STATUS_READY);
    }

    #[tokio::test]
    async fn test_read_wrappers_follow_the_clock() {
        let mut h = harness();
        h.orch.ensure_name("Bob").await.unwrap();
        h.orch.submit(Some("Alice")).await.unwrap();
        let alice = Name::parse("Alice").unwrap();

        assert_eq!(h.orch.search("b").await.unwrap(), vec![Name::parse("Bob").unwrap()]);
        assert!(h.orch.has_checked_in_today(&alice).await.unwrap());

        h.clock.advance(chrono::Duration::days(1));
        assert!(!h.orch.has_checked_in_today(&alice).await.unwrap());
        assert!(h.orch.todays_attendance().await.unwrap().is_empty());
        assert_eq!(h.orch.attendance_history().await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_abandon_clears_without_writing() {
        let mut h = harness();
        h.orch.on_scan("qr");
        h.orch.select_name("Alice").unwrap();

        h.orch.abandon();

        assert_eq!(h.orch.state(), RegistrationState::Idle);
        assert_eq!(h.orch.session(), &RegistrationSession::default());
        assert!(h.store.name_rows().is_empty());
    }

    #[tokio::test]
    async fn test_available_names_excludes_todays_attendees() {
        let mut h = harness();
        h.orch.bootstrap_if_empty(&crate::entities::default_seed()).await.unwrap();
        h.orch.select_and_submit("Alice Williams").await.unwrap();

        let available = h.orch.available_names("").await.unwrap();
        assert_eq!(available.len(), 7);
        assert!(!available.iter().any(|n| n.as_str() == "Alice Williams"));

        let searched = h.orch.available_names("brown").await.unwrap();
        assert_eq!(searched.len(), 1);
        assert_eq!(searched[0].as_str(), "Charlie Brown");

        h.clock.advance(chrono::Duration::days(1));
        assert_eq!(h.orch.available_names("").await.unwrap().len(), 8);
    }

    #[tokio::test]
    async fn test_add_name_statuses() {
        let mut h = harness();

        let added = h.orch.add_name("Alice").await.unwrap();
        assert!(!added.already_present);
        assert_eq!(h.orch.status(), "Added Alice to list");

        let again = h.orch.add_name("Alice").await.unwrap();
        assert!(again.already_present);
        assert_eq!(h.orch.status(), "Name already exists in list");

        assert!(h.orch.add_name("  ").await.is_err());
        assert_eq!(h.orch.status(), "Please enter a name");
        assert!(h.store.attendance_rows().is_empty());
    }

    #[tokio::test]
    async fn test_poll_scan_from_bridge() {
        let mut h = harness();
        let (tx, mut rx) = crate::scan::scan_channel();

        assert!(!h.orch.poll_scan(&mut rx));
        tx.on_scan("https://party.example");
        assert!(h.orch.poll_scan(&mut rx));
        assert_eq!(h.orch.state(), RegistrationState::AwaitingConfirmation);
    }
}
