//! Tests for draining the queue through a verification provider.

use async_trait::async_trait;
use lead_verifier::error::VerifyError;
use lead_verifier::queue::{Dispatcher, DrainSummary, DrainSupervisor, EntryOutcome, QueueManager};
use lead_verifier::store::{self, NewLead};
use lead_verifier::verifier::{Reachable, VerificationProvider, VerificationResult};
use sea_orm::{ConnectionTrait, Database, DatabaseConnection, Statement};
use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use tokio::time::{Duration, sleep};

async fn create_test_db() -> DatabaseConnection {
    let db = Database::connect("sqlite::memory:")
        .await
        .expect("Failed to connect to in-memory database");

    for ddl in [
        r#"CREATE TABLE lead_list (
            id TEXT PRIMARY KEY,
            name TEXT NOT NULL,
            created_at TEXT NOT NULL
        )"#,
        r#"CREATE TABLE lead (
            id TEXT PRIMARY KEY,
            email TEXT NOT NULL,
            list_id TEXT NOT NULL,
            lead_data TEXT NOT NULL,
            email_verified INTEGER NOT NULL DEFAULT 0,
            email_is_valid TEXT NOT NULL DEFAULT '',
            verification_result TEXT NULL,
            created_at TEXT NOT NULL
        )"#,
        r#"CREATE TABLE verification_queue (
            id TEXT PRIMARY KEY,
            email TEXT NOT NULL,
            lead_id TEXT NOT NULL,
            list_id TEXT NOT NULL
        )"#,
    ] {
        db.execute(Statement::from_string(db.get_database_backend(), ddl))
            .await
            .expect("Failed to create table");
    }

    db
}

/// Provider with scripted verdicts that records how it was called.
#[derive(Default)]
struct StubProvider {
    verdicts: HashMap<String, Reachable>,
    failing: HashSet<String>,
    delay: Duration,
    in_flight: AtomicUsize,
    high_water: AtomicUsize,
    seen: Mutex<Vec<String>>,
}

impl StubProvider {
    fn with_verdicts(verdicts: &[(&str, Reachable)]) -> Self {
        Self {
            verdicts: verdicts
                .iter()
                .map(|(e, r)| (e.to_string(), *r))
                .collect(),
            ..Default::default()
        }
    }

    fn seen(&self) -> Vec<String> {
        self.seen.lock().unwrap().clone()
    }
}

#[async_trait]
impl VerificationProvider for StubProvider {
    async fn verify(&self, email: &str) -> Result<VerificationResult, VerifyError> {
        let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.high_water.fetch_max(now, Ordering::SeqCst);
        self.seen.lock().unwrap().push(email.to_string());
        if !self.delay.is_zero() {
            sleep(self.delay).await;
        }
        self.in_flight.fetch_sub(1, Ordering::SeqCst);

        if self.failing.contains(email) {
            return Err(VerifyError::Smtp("connection reset".into()));
        }
        let reachable = self
            .verdicts
            .get(email)
            .copied()
            .unwrap_or(Reachable::Unknown);
        Ok(VerificationResult::with_verdict(email, reachable))
    }
}

struct Fixture {
    db: Arc<DatabaseConnection>,
    queue: QueueManager,
    list_id: String,
}

async fn fixture(emails: &[&str]) -> Fixture {
    let db = Arc::new(create_test_db().await);
    let list = store::lists::create_list(db.as_ref(), "prospects")
        .await
        .unwrap();
    let leads = emails.iter().map(|e| NewLead::new(*e)).collect();
    store::leads::import_leads(db.as_ref(), &list.id, leads)
        .await
        .unwrap();
    let queue = QueueManager::new(db.clone());
    Fixture {
        db,
        queue,
        list_id: list.id,
    }
}

async fn lead_by_email(db: &DatabaseConnection, email: &str) -> lead_verifier::entity::lead::Model {
    store::leads::list_leads(db, None)
        .await
        .unwrap()
        .into_iter()
        .find(|l| l.email == email)
        .unwrap()
}

#[tokio::test]
async fn test_drain_resolves_every_entry() {
    let f = fixture(&["a@x.com", "b@x.com"]).await;
    f.queue.enqueue(&f.list_id).await.unwrap();
    let provider = Arc::new(StubProvider::with_verdicts(&[
        ("a@x.com", Reachable::Yes),
        ("b@x.com", Reachable::No),
    ]));

    let summary = Dispatcher::new(f.queue.clone(), provider, 10)
        .drain()
        .await
        .unwrap();

    assert_eq!(
        summary,
        DrainSummary {
            snapshot: 2,
            resolved: 2,
            left_pending: 0
        }
    );
    assert!(f.queue.list_pending().await.unwrap().is_empty());

    let a = lead_by_email(&f.db, "a@x.com").await;
    assert!(a.email_verified);
    assert_eq!(a.email_is_valid, "yes");
    let b = lead_by_email(&f.db, "b@x.com").await;
    assert!(b.email_verified);
    assert_eq!(b.email_is_valid, "no");
}

#[tokio::test]
async fn test_drain_stores_detail_payload() {
    let f = fixture(&["a@x.com"]).await;
    f.queue.enqueue(&f.list_id).await.unwrap();
    let provider = Arc::new(StubProvider::with_verdicts(&[("a@x.com", Reachable::Yes)]));

    Dispatcher::new(f.queue.clone(), provider, 10)
        .drain()
        .await
        .unwrap();

    let lead = lead_by_email(&f.db, "a@x.com").await;
    let detail = lead.verification_result.unwrap();
    assert_eq!(detail["reachable"], "yes");
    let reason: VerificationResult =
        serde_json::from_str(detail["reason"].as_str().unwrap()).unwrap();
    assert_eq!(reason.email, "a@x.com");
    assert_eq!(reason.reachable, Reachable::Yes);
}

#[tokio::test]
async fn test_drain_never_exceeds_concurrency_cap() {
    let emails: Vec<String> = (0..12).map(|i| format!("user{i}@x.com")).collect();
    let refs: Vec<&str> = emails.iter().map(String::as_str).collect();
    let f = fixture(&refs).await;
    f.queue.enqueue(&f.list_id).await.unwrap();
    let provider = Arc::new(StubProvider {
        delay: Duration::from_millis(20),
        ..Default::default()
    });

    let summary = Dispatcher::new(f.queue.clone(), provider.clone(), 3)
        .drain()
        .await
        .unwrap();

    assert_eq!(summary.resolved, 12);
    assert_eq!(provider.seen().len(), 12);
    // Slots are refilled as soon as they free up, so the cap is reached.
    let high_water = provider.high_water.load(Ordering::SeqCst);
    assert_eq!(high_water, 3, "saw {high_water} concurrent calls");
}

#[tokio::test]
async fn test_provider_failure_is_isolated() {
    let f = fixture(&["a@x.com", "bad@x.com", "c@x.com"]).await;
    f.queue.enqueue(&f.list_id).await.unwrap();
    let provider = Arc::new(StubProvider {
        failing: HashSet::from(["bad@x.com".to_string()]),
        ..StubProvider::with_verdicts(&[("a@x.com", Reachable::Yes), ("c@x.com", Reachable::No)])
    });

    let summary = Dispatcher::new(f.queue.clone(), provider, 10)
        .drain()
        .await
        .unwrap();

    assert_eq!(summary.resolved, 2);
    assert_eq!(summary.left_pending, 1);
    let pending = f.queue.list_pending().await.unwrap();
    assert_eq!(pending.len(), 1);
    assert_eq!(pending[0].email, "bad@x.com");

    let bad = lead_by_email(&f.db, "bad@x.com").await;
    assert!(!bad.email_verified);
    assert_eq!(bad.email_is_valid, "");
}

#[tokio::test]
async fn test_drain_verifies_captured_email() {
    let f = fixture(&["old@x.com"]).await;
    f.queue.enqueue(&f.list_id).await.unwrap();
    let lead = lead_by_email(&f.db, "old@x.com").await;
    store::leads::update_lead_email(f.db.as_ref(), &lead.id, "new@x.com")
        .await
        .unwrap();
    let provider = Arc::new(StubProvider::default());

    Dispatcher::new(f.queue.clone(), provider.clone(), 10)
        .drain()
        .await
        .unwrap();

    assert_eq!(provider.seen(), vec!["old@x.com".to_string()]);
    let lead = lead_by_email(&f.db, "new@x.com").await;
    assert!(lead.email_verified);
}

#[tokio::test]
async fn test_entry_for_deleted_lead_stays_pending() {
    let f = fixture(&["a@x.com"]).await;
    f.queue.enqueue(&f.list_id).await.unwrap();
    let entry = f.queue.list_pending().await.unwrap().remove(0);
    store::leads::delete_lead(f.db.as_ref(), &entry.lead_id)
        .await
        .unwrap();
    let provider = Arc::new(StubProvider::default());
    let dispatcher = Dispatcher::new(f.queue.clone(), provider.clone(), 10);

    assert_eq!(
        dispatcher.process_entry(entry).await,
        EntryOutcome::LeadMissing
    );
    assert!(provider.seen().is_empty());
    assert_eq!(f.queue.pending_count().await.unwrap(), 1);
}

#[tokio::test]
async fn test_drain_on_empty_queue() {
    let f = fixture(&[]).await;
    let provider = Arc::new(StubProvider::default());

    let summary = Dispatcher::new(f.queue.clone(), provider, 10)
        .drain()
        .await
        .unwrap();

    assert_eq!(summary, DrainSummary::default());
}

#[tokio::test]
async fn test_zero_concurrency_is_clamped() {
    let f = fixture(&[]).await;
    let dispatcher = Dispatcher::new(f.queue.clone(), Arc::new(StubProvider::default()), 0);
    assert_eq!(dispatcher.max_concurrency(), 1);
}

#[tokio::test]
async fn test_supervised_drain_runs_detached() {
    let f = fixture(&["a@x.com", "b@x.com"]).await;
    f.queue.enqueue(&f.list_id).await.unwrap();
    let provider = Arc::new(StubProvider {
        delay: Duration::from_millis(10),
        ..StubProvider::with_verdicts(&[("a@x.com", Reachable::Yes)])
    });
    let supervisor = Arc::new(DrainSupervisor::new());

    let drain_id = supervisor
        .spawn_drain(Dispatcher::new(f.queue.clone(), provider, 10))
        .await;
    assert!(supervisor.is_running(drain_id).await);

    for _ in 0..100 {
        if !supervisor.is_running(drain_id).await {
            break;
        }
        sleep(Duration::from_millis(10)).await;
    }

    assert!(!supervisor.is_running(drain_id).await);
    assert_eq!(supervisor.active_drains().await, 0);
    assert_eq!(f.queue.pending_count().await.unwrap(), 0);
}
