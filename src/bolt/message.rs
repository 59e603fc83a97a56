use std::collections::BTreeMap;
use std::convert::TryFrom;
use std::time::Duration;

#[derive(Clone, Debug, PartialEq)]
pub enum Value {
    Null,
    Boolean(bool),
    Integer(i64),
    Float(f64),
    String(String),
    List(Vec<Value>),
    Map(BTreeMap<String, Value>),
}

pub type Parameters = BTreeMap<String, Value>;

#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct Bookmark(String);

impl Bookmark {
    pub fn new(value: impl Into<String>) -> Self {
        Bookmark(value.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum AccessMode {
    Read,
    Write,
}

impl Default for AccessMode {
    fn default() -> Self {
        AccessMode::Write
    }
}

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum TransactionType {
    /// Opened by BEGIN, lives until COMMIT or ROLLBACK.
    Explicit,
    /// Opened by RUN outside a transaction, committed once its result is consumed.
    Implicit,
}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct NotificationsConfig {
    pub minimum_severity: Option<String>,
    pub disabled_categories: Vec<String>,
}

/// Which driver API issued the work, as reported by TELEMETRY.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum TelemetryApi {
    ManagedTransaction,
    UnmanagedTransaction,
    AutoCommitTransaction,
    ExecuteQuery,
}

impl TryFrom<i64> for TelemetryApi {
    type Error = i64;

    fn try_from(value: i64) -> Result<Self, Self::Error> {
        match value {
            0 => Ok(TelemetryApi::ManagedTransaction),
            1 => Ok(TelemetryApi::UnmanagedTransaction),
            2 => Ok(TelemetryApi::AutoCommitTransaction),
            3 => Ok(TelemetryApi::ExecuteQuery),
            other => Err(other),
        }
    }
}

#[derive(Clone, Debug, Default, PartialEq)]
pub struct RunMessage {
    pub statement: String,
    pub params: Parameters,
    pub database: Option<String>,
    pub access_mode: AccessMode,
    pub bookmarks: Vec<Bookmark>,
    pub timeout: Option<Duration>,
    pub metadata: BTreeMap<String, Value>,
    pub notifications: NotificationsConfig,
    pub impersonated_user: Option<String>,
}

impl RunMessage {
    pub fn new(statement: impl Into<String>) -> Self {
        RunMessage {
            statement: statement.into(),
            ..RunMessage::default()
        }
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct BeginMessage {
    pub database: Option<String>,
    pub access_mode: AccessMode,
    pub bookmarks: Vec<Bookmark>,
    pub timeout: Option<Duration>,
    pub metadata: BTreeMap<String, Value>,
    pub notifications: NotificationsConfig,
    pub impersonated_user: Option<String>,
    pub transaction_type: TransactionType,
}

impl Default for BeginMessage {
    fn default() -> Self {
        BeginMessage {
            database: None,
            access_mode: AccessMode::default(),
            bookmarks: vec![],
            timeout: None,
            metadata: BTreeMap::new(),
            notifications: NotificationsConfig::default(),
            impersonated_user: None,
            transaction_type: TransactionType::Explicit,
        }
    }
}

#[derive(Clone, Debug, Default, PartialEq)]
pub struct RouteMessage {
    pub database: Option<String>,
    pub routing_context: BTreeMap<String, String>,
    pub bookmarks: Vec<Bookmark>,
    pub impersonated_user: Option<String>,
}

/// A decoded client request. `n == -1` in PULL/DISCARD means "all remaining records".
#[derive(Clone, Debug, PartialEq)]
pub enum RequestMessage {
    Run(RunMessage),
    Begin(BeginMessage),
    Pull { n: i64 },
    Discard { n: i64 },
    Commit,
    Rollback,
    Reset,
    Route(RouteMessage),
    Telemetry(TelemetryApi),
    Goodbye,
}

impl RequestMessage {
    pub fn name(&self) -> &'static str {
        match self {
            RequestMessage::Run(_) => "RUN",
            RequestMessage::Begin(_) => "BEGIN",
            RequestMessage::Pull { .. } => "PULL",
            RequestMessage::Discard { .. } => "DISCARD",
            RequestMessage::Commit => "COMMIT",
            RequestMessage::Rollback => "ROLLBACK",
            RequestMessage::Reset => "RESET",
            RequestMessage::Route(_) => "ROUTE",
            RequestMessage::Telemetry(_) => "TELEMETRY",
            RequestMessage::Goodbye => "GOODBYE",
        }
    }
}
