mod in_memory;
mod log;

pub use in_memory::InMemoryLog;
pub use log::Entry;
pub use log::Index;
pub use log::Log;
pub use log::LogError;
pub use log::Term;
