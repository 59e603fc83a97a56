mod log_entry;
mod messages;
mod outbound;
mod types;

pub use log_entry::RaftLogEntry;
pub use messages::AppendEntriesRequest;
pub use messages::AppendEntriesResponse;
pub use messages::LogCompactionInfo;
pub use messages::RaftMessage;
pub use outbound::Outbound;
pub use types::LeaderContext;
pub use types::MemberId;
