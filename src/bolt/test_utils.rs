use crate::bolt::backend::{
    AuthenticationError, AuthenticationService, BeginRequest, BoltServices, ConnectionContext, LoginContext, Record,
    RoutingError, RoutingService, RoutingTable, Statement, TelemetryError, TelemetryMonitor, Transaction,
    TransactionError, TransactionId, TransactionManager,
};
use crate::bolt::message::{Bookmark, Parameters, TelemetryApi, Value};
use crate::bolt::session::BoltSession;
use async_trait::async_trait;
use std::collections::{BTreeMap, VecDeque};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio_util::sync::CancellationToken;

/// In-memory stand-in for every backend a session talks to.
///
/// Statements understood by the fake transactions:
/// - `RETURN <int> AS <name>[, ...]`: one record
/// - `ROWS <k>`: k records in field `x`
/// - `CALL db.sleep()`: blocks until the transaction is terminated
/// - `FAIL ...`: fails to run
/// - `EXPIRE ON PULL`: runs, then reports expired credentials when pulled
#[derive(Clone)]
pub(crate) struct FakeBackend {
    transactions: Arc<FakeTransactionManager>,
    telemetry: Arc<FakeTelemetry>,
}

impl FakeBackend {
    pub(crate) fn new() -> Self {
        FakeBackend {
            transactions: Arc::new(FakeTransactionManager::default()),
            telemetry: Arc::new(FakeTelemetry::default()),
        }
    }

    pub(crate) fn services(&self) -> BoltServices {
        BoltServices {
            transactions: self.transactions.clone(),
            routing: Arc::new(FakeRouting),
            authentication: Arc::new(FakeAuthentication),
            telemetry: self.telemetry.clone(),
        }
    }

    pub(crate) fn new_session(&self) -> BoltSession {
        let logger = slog::Logger::root(slog::Discard, slog::o!());
        let connection = ConnectionContext {
            connection_id: "bolt-1".into(),
            login: LoginContext::new("alice"),
            default_database: "neo4j".into(),
        };
        BoltSession::new(logger, self.services(), connection)
    }

    pub(crate) fn transactions(&self) -> Vec<Arc<FakeTransaction>> {
        self.transactions.begun.lock().unwrap().clone()
    }

    pub(crate) fn fail_next_begin(&self, error: TransactionError) {
        *self.transactions.fail_next.lock().unwrap() = Some(error);
    }

    pub(crate) fn fail_telemetry(&self) {
        self.telemetry.failing.store(true, Ordering::SeqCst);
    }

    pub(crate) fn telemetry(&self) -> Vec<TelemetryApi> {
        self.telemetry.recorded.lock().unwrap().clone()
    }

    pub(crate) async fn wait_until_sleeping(&self) {
        loop {
            if self.transactions().iter().any(|tx| tx.sleeping.load(Ordering::SeqCst)) {
                return;
            }
            tokio::task::yield_now().await;
        }
    }
}

#[derive(Default)]
pub(crate) struct FakeTransactionManager {
    next_id: AtomicU64,
    begun: Mutex<Vec<Arc<FakeTransaction>>>,
    fail_next: Mutex<Option<TransactionError>>,
}

#[async_trait]
impl TransactionManager for FakeTransactionManager {
    async fn begin(&self, request: BeginRequest) -> Result<Arc<dyn Transaction>, TransactionError> {
        if let Some(error) = self.fail_next.lock().unwrap().take() {
            return Err(error);
        }

        let id = TransactionId::new(self.next_id.fetch_add(1, Ordering::SeqCst));
        let transaction = Arc::new(FakeTransaction {
            id,
            request,
            terminated: CancellationToken::new(),
            sleeping: AtomicBool::new(false),
            outcome: Mutex::new(Outcome::Open),
            statements: AtomicU64::new(0),
        });
        self.begun.lock().unwrap().push(transaction.clone());

        Ok(transaction)
    }
}

#[derive(Copy, Clone, Debug, PartialEq)]
pub(crate) enum Outcome {
    Open,
    Committed,
    RolledBack,
}

pub(crate) struct FakeTransaction {
    id: TransactionId,
    request: BeginRequest,
    terminated: CancellationToken,
    sleeping: AtomicBool,
    outcome: Mutex<Outcome>,
    statements: AtomicU64,
}

impl FakeTransaction {
    pub(crate) fn request(&self) -> &BeginRequest {
        &self.request
    }

    pub(crate) fn outcome(&self) -> Outcome {
        *self.outcome.lock().unwrap()
    }
}

#[async_trait]
impl Transaction for FakeTransaction {
    fn id(&self) -> TransactionId {
        self.id
    }

    async fn run(&self, statement: &str, _params: &Parameters) -> Result<Box<dyn Statement>, TransactionError> {
        if self.terminated.is_cancelled() {
            return Err(TransactionError::Terminated);
        }
        if statement == "CALL db.sleep()" {
            self.sleeping.store(true, Ordering::SeqCst);
            self.terminated.cancelled().await;
            return Err(TransactionError::Terminated);
        }
        if statement.starts_with("FAIL") {
            return Err(TransactionError::Statement(statement.to_string()));
        }

        let (field_names, records) = evaluate(statement);
        Ok(Box::new(FakeStatement {
            id: self.statements.fetch_add(1, Ordering::SeqCst),
            field_names,
            records,
            expired_user: if statement == "EXPIRE ON PULL" {
                Some(self.request.login.user.clone())
            } else {
                None
            },
        }))
    }

    async fn commit(&self) -> Result<Bookmark, TransactionError> {
        if self.terminated.is_cancelled() {
            return Err(TransactionError::Terminated);
        }
        *self.outcome.lock().unwrap() = Outcome::Committed;
        Ok(Bookmark::new(format!("bookmark:{}", self.id)))
    }

    async fn rollback(&self) -> Result<(), TransactionError> {
        *self.outcome.lock().unwrap() = Outcome::RolledBack;
        Ok(())
    }

    fn terminate(&self) {
        self.terminated.cancel();
    }
}

fn evaluate(statement: &str) -> (Vec<String>, VecDeque<Record>) {
    if let Some(count) = statement.strip_prefix("ROWS ") {
        let count: i64 = count.trim().parse().unwrap_or(0);
        let records = (1..=count).map(|x| vec![Value::Integer(x)]).collect();
        return (vec!["x".to_string()], records);
    }

    if let Some(projection) = statement.strip_prefix("RETURN ") {
        let mut names = vec![];
        let mut record = vec![];
        for item in projection.split(',') {
            let mut parts = item.splitn(2, " AS ");
            let expression = parts.next().unwrap_or("").trim();
            let name = parts.next().unwrap_or(expression).trim();
            names.push(name.to_string());
            record.push(
                expression
                    .parse()
                    .map(Value::Integer)
                    .unwrap_or_else(|_| Value::String(expression.to_string())),
            );
        }
        return (names, VecDeque::from(vec![record]));
    }

    (vec![], VecDeque::new())
}

struct FakeStatement {
    id: u64,
    field_names: Vec<String>,
    records: VecDeque<Record>,
    expired_user: Option<String>,
}

impl FakeStatement {
    fn take(&mut self, n: Option<u64>) -> Vec<Record> {
        let count = n.map_or(self.records.len(), |n| (n as usize).min(self.records.len()));
        self.records.drain(..count).collect()
    }
}

#[async_trait]
impl Statement for FakeStatement {
    fn id(&self) -> u64 {
        self.id
    }

    fn field_names(&self) -> &[String] {
        &self.field_names
    }

    async fn pull(&mut self, n: Option<u64>) -> Result<(Vec<Record>, bool), TransactionError> {
        if let Some(user) = &self.expired_user {
            return Err(TransactionError::CredentialsExpired(user.clone()));
        }
        let records = self.take(n);
        Ok((records, !self.records.is_empty()))
    }

    async fn discard(&mut self, n: Option<u64>) -> Result<bool, TransactionError> {
        self.take(n);
        Ok(!self.records.is_empty())
    }
}

struct FakeRouting;

#[async_trait]
impl RoutingService for FakeRouting {
    async fn route(
        &self,
        database: &str,
        _login: &LoginContext,
        _routing_context: &BTreeMap<String, String>,
    ) -> Result<RoutingTable, RoutingError> {
        if database == "missing" {
            return Err(RoutingError::DatabaseNotFound(database.to_string()));
        }
        Ok(RoutingTable {
            database: database.to_string(),
            ttl: Duration::from_secs(300),
            routers: vec!["core-1:7687".into()],
            readers: vec!["core-2:7687".into(), "core-3:7687".into()],
            writers: vec!["core-1:7687".into()],
        })
    }
}

struct FakeAuthentication;

impl AuthenticationService for FakeAuthentication {
    fn impersonate(&self, login: &LoginContext, target: &str) -> Result<LoginContext, AuthenticationError> {
        match target {
            "mallory" => Err(AuthenticationError::ImpersonationDenied {
                user: login.user.clone(),
                target: target.to_string(),
            }),
            "expired" => Err(AuthenticationError::CredentialsExpired(login.user.clone())),
            _ => Ok(LoginContext::new(target)),
        }
    }
}

#[derive(Default)]
pub(crate) struct FakeTelemetry {
    failing: AtomicBool,
    recorded: Mutex<Vec<TelemetryApi>>,
}

impl TelemetryMonitor for FakeTelemetry {
    fn record(&self, api: TelemetryApi) -> Result<(), TelemetryError> {
        if self.failing.load(Ordering::SeqCst) {
            return Err(TelemetryError("monitor offline".into()));
        }
        self.recorded.lock().unwrap().push(api);
        Ok(())
    }
}
