mod bolt;
mod commitlog;
mod consensus;
mod logging;
mod membership;
mod options;
mod shipping;
mod timers;
mod transport;
mod grpc {
    include!("../generated/raft.rs");
}

pub use bolt::spawn_connection;
pub use bolt::AccessMode;
pub use bolt::AuthenticationError;
pub use bolt::AuthenticationService;
pub use bolt::BeginMessage;
pub use bolt::BeginRequest;
pub use bolt::BoltServices;
pub use bolt::BoltSession;
pub use bolt::Bookmark;
pub use bolt::ConnectionClient;
pub use bolt::ConnectionContext;
pub use bolt::ConnectionError;
pub use bolt::InterruptHandle;
pub use bolt::LoginContext;
pub use bolt::NotificationsConfig;
pub use bolt::Parameters;
pub use bolt::Record;
pub use bolt::RequestMessage;
pub use bolt::Response;
pub use bolt::ResponseHandler;
pub use bolt::ResponseRecorder;
pub use bolt::RouteMessage;
pub use bolt::RoutingError;
pub use bolt::RoutingService;
pub use bolt::RoutingTable;
pub use bolt::RunMessage;
pub use bolt::State;
pub use bolt::StateMachineError;
pub use bolt::Statement;
pub use bolt::StatementMetadata;
pub use bolt::TelemetryApi;
pub use bolt::TelemetryError;
pub use bolt::TelemetryMonitor;
pub use bolt::Transaction;
pub use bolt::TransactionError;
pub use bolt::TransactionId;
pub use bolt::TransactionManager;
pub use bolt::TransactionType;
pub use bolt::Value;
pub use commitlog::Entry;
pub use commitlog::InMemoryLog;
pub use commitlog::Index;
pub use commitlog::Log;
pub use commitlog::LogError;
pub use commitlog::Term;
pub use consensus::AppendEntriesRequest;
pub use consensus::AppendEntriesResponse;
pub use consensus::LeaderContext;
pub use consensus::LogCompactionInfo;
pub use consensus::MemberId;
pub use consensus::Outbound;
pub use consensus::RaftLogEntry;
pub use consensus::RaftMessage;
pub use logging::create_root_logger_for_file;
pub use logging::create_root_logger_for_stdout;
pub use membership::CatchupFuture;
pub use membership::CatchupHandle;
pub use membership::DecodeError;
pub use membership::JobHandle;
pub use membership::JobScheduler;
pub use membership::Marshal;
pub use membership::MembershipEntry;
pub use membership::MembershipWaiter;
pub use membership::MembershipWaiterError;
pub use membership::MismatchedStoreListener;
pub use membership::ReadableRaftState;
pub use membership::ReplicatedContent;
pub use membership::TokioJobScheduler;
pub use options::ReplicationOptions;
pub use options::ReplicationOptionsValidated;
pub use options::TransportOptions;
pub use options::TransportOptionsValidated;
pub use shipping::LogShippingManager;
pub use shipping::ShipCommand;
pub use transport::shutdown_signal;
pub use transport::GrpcOutbound;
pub use transport::RpcServer;
pub use transport::ShutdownHandle;
pub use transport::ShutdownSignal;
pub use transport::TransportError;

// `crate::{root_mod}` holds no code, only `mod` and `pub use` statements. No `mod` is `pub`; types
// are exported one `pub use` at a time.
