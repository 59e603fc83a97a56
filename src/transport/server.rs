use crate::consensus::RaftMessage;
use crate::grpc::grpc_raft_transport_server::{GrpcRaftTransport, GrpcRaftTransportServer};
use crate::grpc::{ProtoDeliverAck, ProtoRaftMessage};
use crate::transport::convert;
use crate::transport::ShutdownSignal;
use std::net::SocketAddr;
use tokio::sync::mpsc;
use tonic::transport::Server;
use tonic::{Request, Response, Status};

/// Receives raft messages from other members and hands them to `inbound`, in arrival order.
pub struct RpcServer {
    logger: slog::Logger,
    inbound: mpsc::Sender<RaftMessage>,
}

impl RpcServer {
    pub fn new(logger: slog::Logger, inbound: mpsc::Sender<RaftMessage>) -> Self {
        RpcServer { logger, inbound }
    }

    pub async fn run(self, socket_addr: SocketAddr, shutdown_signal: ShutdownSignal) {
        let logger = self.logger.clone();
        slog::info!(logger, "Listening on '{:?}'", socket_addr);

        let result = Server::builder()
            .add_service(GrpcRaftTransportServer::new(self))
            .serve_with_shutdown(socket_addr, shutdown_signal)
            .await;

        slog::info!(logger, "Server run() has exited: {:?}", result);
    }

    async fn handle_deliver(&self, rpc_request: ProtoRaftMessage) -> Result<ProtoDeliverAck, Status> {
        let message =
            convert::convert_inbound_message(rpc_request).map_err(|e| Status::invalid_argument(e.to_string()))?;

        self.inbound
            .send(message)
            .await
            .map_err(|_| Status::unavailable("Inbound queue is closed"))?;

        Ok(ProtoDeliverAck {})
    }
}

#[async_trait::async_trait]
impl GrpcRaftTransport for RpcServer {
    async fn deliver(&self, rpc_request_wrapped: Request<ProtoRaftMessage>) -> Result<Response<ProtoDeliverAck>, Status> {
        let rpc_request = rpc_request_wrapped.into_inner();

        slog::trace!(self.logger, "ServerWire - {:?}", rpc_request);
        let rpc_result = self.handle_deliver(rpc_request).await;
        if let Err(status) = &rpc_result {
            slog::debug!(self.logger, "Rejected delivery: {:?}", status);
        }

        rpc_result.map(Response::new)
    }
}
