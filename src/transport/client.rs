use crate::consensus::{MemberId, Outbound, RaftMessage};
use crate::grpc::grpc_raft_transport_client::GrpcRaftTransportClient;
use crate::grpc::ProtoRaftMessage;
use crate::options::TransportOptionsValidated;
use crate::transport::convert;
use crate::transport::TransportError;
use rand::Rng;
use std::collections::HashMap;
use std::sync::Mutex;
use tokio::sync::mpsc;
use tokio::sync::mpsc::error::TrySendError;
use tokio::time::{Duration, Instant};
use tonic::transport::{Channel, Endpoint};

/// Best-effort delivery of raft messages to other members over gRPC.
///
/// Every peer gets its own queue and sender task, so a slow or unreachable peer never delays the
/// others. Messages that don't fit in a peer's queue, or that arrive while its connection is down,
/// are dropped. The raft layer recovers from loss through its own retries.
pub struct GrpcOutbound {
    logger: slog::Logger,
    options: TransportOptionsValidated,
    peers: Mutex<HashMap<MemberId, mpsc::Sender<ProtoRaftMessage>>>,
}

impl GrpcOutbound {
    pub fn new(logger: slog::Logger, options: TransportOptionsValidated) -> Self {
        GrpcOutbound {
            logger,
            options,
            peers: Mutex::new(HashMap::new()),
        }
    }

    /// Starts delivering to `member` at `address` (`host:port`). Replaces any previous address.
    /// Must be called from within a runtime.
    pub fn add_peer(&self, member: MemberId, address: &str) -> Result<(), TransportError> {
        let endpoint = Endpoint::from_shared(format!("http://{}", address)).map_err(|source| {
            TransportError::InvalidAddress {
                member: member.clone(),
                address: address.to_string(),
                source,
            }
        })?;

        let (tx, rx) = mpsc::channel(self.options.send_queue_size);
        let sender = PeerSender {
            logger: self.logger.new(slog::o!("peer" => member.to_string())),
            endpoint,
            receiver: rx,
            client: None,
            backoff: self.options.connect_backoff_min,
            backoff_max: self.options.connect_backoff_max,
            backoff_min: self.options.connect_backoff_min,
            retry_at: Instant::now(),
        };
        tokio::task::spawn(sender.run());

        slog::info!(self.logger, "Added peer {:?} at {}", member, address);
        self.lock_peers().insert(member, tx);
        Ok(())
    }

    /// Stops delivering to `member`. Queued messages are dropped.
    pub fn remove_peer(&self, member: &MemberId) {
        if self.lock_peers().remove(member).is_some() {
            slog::info!(self.logger, "Removed peer {:?}", member);
        }
    }

    fn lock_peers(&self) -> std::sync::MutexGuard<'_, HashMap<MemberId, mpsc::Sender<ProtoRaftMessage>>> {
        self.peers.lock().expect("Peer map mutex poisoned")
    }
}

impl Outbound for GrpcOutbound {
    fn send(&self, to: &MemberId, message: RaftMessage) {
        let peers = self.lock_peers();
        let sender = match peers.get(to) {
            Some(sender) => sender,
            None => {
                slog::warn!(self.logger, "Dropping message to unknown member {:?}", to);
                return;
            }
        };

        match sender.try_send(convert::convert_outbound_message(message)) {
            Ok(()) => {}
            Err(TrySendError::Full(_)) => slog::debug!(self.logger, "Send queue to {:?} is full, dropping", to),
            Err(TrySendError::Closed(_)) => slog::warn!(self.logger, "Sender task for {:?} has exited", to),
        }
    }
}

struct PeerSender {
    logger: slog::Logger,
    endpoint: Endpoint,
    receiver: mpsc::Receiver<ProtoRaftMessage>,
    client: Option<GrpcRaftTransportClient<Channel>>,
    backoff: Duration,
    backoff_min: Duration,
    backoff_max: Duration,
    // No connect attempts before this.
    retry_at: Instant,
}

impl PeerSender {
    async fn run(mut self) {
        while let Some(message) = self.receiver.recv().await {
            let client = match self.connected_client().await {
                Some(client) => client,
                None => continue,
            };

            let result = client.deliver(message).await;
            if let Err(status) = result {
                slog::debug!(self.logger, "Delivery failed, reconnecting: {:?}", status);
                self.client = None;
            }
        }

        slog::debug!(self.logger, "Peer sender exited");
    }

    async fn connected_client(&mut self) -> Option<&mut GrpcRaftTransportClient<Channel>> {
        if self.client.is_none() {
            if Instant::now() < self.retry_at {
                return None;
            }

            match self.endpoint.connect().await {
                Ok(channel) => {
                    slog::info!(self.logger, "Connected");
                    self.client = Some(GrpcRaftTransportClient::new(channel));
                    self.backoff = self.backoff_min;
                }
                Err(e) => {
                    let delay = jittered(self.backoff);
                    slog::debug!(self.logger, "Connect failed, next attempt in {:?}: {:?}", delay, e);
                    self.retry_at = Instant::now() + delay;
                    self.backoff = std::cmp::min(self.backoff * 2, self.backoff_max);
                    return None;
                }
            }
        }

        self.client.as_mut()
    }
}

// Somewhere in [backoff / 2, backoff].
fn jittered(backoff: Duration) -> Duration {
    let half = backoff.as_millis() as u64 / 2;
    let jitter = rand::thread_rng().gen_range(0..=half);
    Duration::from_millis(half + jitter)
}
