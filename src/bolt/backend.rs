use crate::bolt::message::{AccessMode, Bookmark, NotificationsConfig, Parameters, TelemetryApi, TransactionType, Value};
use async_trait::async_trait;
use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;
use std::time::Duration;

/// The identity a session acts as.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct LoginContext {
    pub user: String,
}

impl LoginContext {
    pub fn new(user: impl Into<String>) -> Self {
        LoginContext { user: user.into() }
    }
}

/// What a session knows about the connection that owns it.
#[derive(Clone, Debug)]
pub struct ConnectionContext {
    pub connection_id: String,
    pub login: LoginContext,
    pub default_database: String,
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TransactionId(u64);

impl TransactionId {
    pub fn new(id: u64) -> Self {
        TransactionId(id)
    }
}

impl fmt::Display for TransactionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "tx-{}", self.0)
    }
}

pub type Record = Vec<Value>;

#[derive(thiserror::Error, Debug, Clone, PartialEq)]
pub enum TransactionError {
    #[error("the transaction has been terminated")]
    Terminated,
    #[error("database '{0}' does not exist")]
    DatabaseNotFound(String),
    #[error("statement failed: {0}")]
    Statement(String),
    #[error("transaction failed: {0}")]
    Failure(String),
    #[error("credentials of '{0}' expired during the transaction")]
    CredentialsExpired(String),
}

#[derive(Clone, Debug)]
pub struct BeginRequest {
    pub transaction_type: TransactionType,
    pub login: LoginContext,
    pub database: String,
    pub access_mode: AccessMode,
    pub bookmarks: Vec<Bookmark>,
    pub timeout: Option<Duration>,
    pub metadata: BTreeMap<String, Value>,
    pub notifications: NotificationsConfig,
}

#[async_trait]
pub trait TransactionManager: Send + Sync {
    async fn begin(&self, request: BeginRequest) -> Result<Arc<dyn Transaction>, TransactionError>;
}

#[async_trait]
pub trait Transaction: Send + Sync {
    fn id(&self) -> TransactionId;

    async fn run(&self, statement: &str, params: &Parameters) -> Result<Box<dyn Statement>, TransactionError>;

    /// Commits and returns the bookmark of the committed work.
    async fn commit(&self) -> Result<Bookmark, TransactionError>;

    async fn rollback(&self) -> Result<(), TransactionError>;

    /// Marks the transaction terminated. May be called from any thread, at any time, more than
    /// once. In-flight and later operations fail with `TransactionError::Terminated`.
    fn terminate(&self);
}

#[async_trait]
pub trait Statement: Send + Sync {
    fn id(&self) -> u64;

    fn field_names(&self) -> &[String];

    /// Streams up to `n` records, or all remaining when `None`. The flag says whether more remain.
    async fn pull(&mut self, n: Option<u64>) -> Result<(Vec<Record>, bool), TransactionError>;

    async fn discard(&mut self, n: Option<u64>) -> Result<bool, TransactionError>;
}

#[derive(Clone, Debug, PartialEq)]
pub struct RoutingTable {
    pub database: String,
    pub ttl: Duration,
    pub routers: Vec<String>,
    pub readers: Vec<String>,
    pub writers: Vec<String>,
}

#[derive(thiserror::Error, Debug, Clone, PartialEq)]
pub enum RoutingError {
    #[error("database '{0}' does not exist")]
    DatabaseNotFound(String),
    #[error("routing unavailable: {0}")]
    Unavailable(String),
}

#[async_trait]
pub trait RoutingService: Send + Sync {
    async fn route(
        &self,
        database: &str,
        login: &LoginContext,
        routing_context: &BTreeMap<String, String>,
    ) -> Result<RoutingTable, RoutingError>;
}

#[derive(thiserror::Error, Debug, Clone, PartialEq)]
pub enum AuthenticationError {
    #[error("'{user}' is not allowed to impersonate '{target}'")]
    ImpersonationDenied { user: String, target: String },
    #[error("credentials of '{0}' have expired")]
    CredentialsExpired(String),
}

pub trait AuthenticationService: Send + Sync {
    fn impersonate(&self, login: &LoginContext, target: &str) -> Result<LoginContext, AuthenticationError>;
}

#[derive(thiserror::Error, Debug, Clone, PartialEq)]
#[error("telemetry unavailable: {0}")]
pub struct TelemetryError(pub String);

pub trait TelemetryMonitor: Send + Sync {
    fn record(&self, api: TelemetryApi) -> Result<(), TelemetryError>;
}

/// Everything a session delegates to.
#[derive(Clone)]
pub struct BoltServices {
    pub transactions: Arc<dyn TransactionManager>,
    pub routing: Arc<dyn RoutingService>,
    pub authentication: Arc<dyn AuthenticationService>,
    pub telemetry: Arc<dyn TelemetryMonitor>,
}
