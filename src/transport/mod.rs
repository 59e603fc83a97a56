mod client;
mod convert;
mod error;
mod server;
mod shutdown;

pub use client::GrpcOutbound;
pub use error::TransportError;
pub use server::RpcServer;
pub use shutdown::shutdown_signal;
pub use shutdown::ShutdownHandle;
pub use shutdown::ShutdownSignal;
