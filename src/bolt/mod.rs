mod backend;
mod connection;
mod error;
mod message;
mod response;
mod session;
mod state;
#[cfg(test)]
mod test_utils;
mod transitions;

pub use backend::AuthenticationError;
pub use backend::AuthenticationService;
pub use backend::BeginRequest;
pub use backend::BoltServices;
pub use backend::ConnectionContext;
pub use backend::LoginContext;
pub use backend::Record;
pub use backend::RoutingError;
pub use backend::RoutingService;
pub use backend::RoutingTable;
pub use backend::Statement;
pub use backend::TelemetryError;
pub use backend::TelemetryMonitor;
pub use backend::Transaction;
pub use backend::TransactionError;
pub use backend::TransactionId;
pub use backend::TransactionManager;
pub use connection::spawn_connection;
pub use connection::ConnectionClient;
pub use connection::ConnectionError;
pub use error::StateMachineError;
pub use message::AccessMode;
pub use message::BeginMessage;
pub use message::Bookmark;
pub use message::NotificationsConfig;
pub use message::Parameters;
pub use message::RequestMessage;
pub use message::RouteMessage;
pub use message::RunMessage;
pub use message::TelemetryApi;
pub use message::TransactionType;
pub use message::Value;
pub use response::Response;
pub use response::ResponseHandler;
pub use response::ResponseRecorder;
pub use response::StatementMetadata;
pub use session::BoltSession;
pub use session::InterruptHandle;
pub use state::State;
