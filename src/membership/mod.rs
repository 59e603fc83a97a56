mod content;
mod marshal;
mod membership_entry;
mod scheduler;
mod waiter;

pub use content::ReplicatedContent;
pub use marshal::DecodeError;
pub use marshal::Marshal;
pub use membership_entry::MembershipEntry;
pub use scheduler::JobHandle;
pub use scheduler::JobScheduler;
pub use scheduler::TokioJobScheduler;
pub use waiter::CatchupFuture;
pub use waiter::CatchupHandle;
pub use waiter::MembershipWaiter;
pub use waiter::MembershipWaiterError;
pub use waiter::MismatchedStoreListener;
pub use waiter::ReadableRaftState;
