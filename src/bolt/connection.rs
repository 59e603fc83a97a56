use crate::bolt::message::RequestMessage;
use crate::bolt::response::ResponseHandler;
use crate::bolt::session::{BoltSession, InterruptHandle};
use tokio::sync::mpsc;

const CONNECTION_QUEUE_SIZE: usize = 64;

#[derive(thiserror::Error, Debug, Clone, PartialEq)]
pub enum ConnectionError {
    #[error("connection is closed")]
    Closed,
}

/// Feeds decoded messages to one connection's worker.
#[derive(Clone)]
pub struct ConnectionClient {
    sender: mpsc::Sender<RequestMessage>,
    interrupt: InterruptHandle,
}

impl ConnectionClient {
    /// Queues `message`. RESET interrupts the session right away, so work queued ahead of it is
    /// ignored instead of executed.
    pub async fn submit(&self, message: RequestMessage) -> Result<(), ConnectionError> {
        if let RequestMessage::Reset = message {
            self.interrupt.interrupt();
        }

        self.sender.send(message).await.map_err(|_| ConnectionError::Closed)
    }

    pub fn interrupt_handle(&self) -> InterruptHandle {
        self.interrupt.clone()
    }

    /// Resolves once the worker has exited.
    pub async fn closed(&self) {
        self.sender.closed().await
    }
}

struct ConnectionWorker<H: ResponseHandler> {
    logger: slog::Logger,
    receiver: mpsc::Receiver<RequestMessage>,
    session: BoltSession,
    handler: H,
}

/// Runs `session` on its own task. Responses for every message go to `handler`, in order.
pub fn spawn_connection<H>(logger: slog::Logger, session: BoltSession, handler: H) -> ConnectionClient
where
    H: ResponseHandler + 'static,
{
    let (tx, rx) = mpsc::channel(CONNECTION_QUEUE_SIZE);
    let interrupt = session.interrupt_handle();
    let worker = ConnectionWorker {
        logger,
        receiver: rx,
        session,
        handler,
    };
    tokio::task::spawn(worker.run_event_loop());

    ConnectionClient { sender: tx, interrupt }
}

impl<H: ResponseHandler> ConnectionWorker<H> {
    async fn run_event_loop(mut self) {
        while let Some(message) = self.receiver.recv().await {
            if let Err(e) = self.session.process(message, &mut self.handler).await {
                self.handler.on_failure(&e);
                if e.is_fatal() {
                    slog::warn!(self.logger, "Closing connection: {}", e);
                    self.session.close().await;
                }
            }

            if self.session.state().is_terminal() {
                break;
            }
        }

        // Also reached when every client is dropped.
        self.session.close().await;
        slog::info!(self.logger, "Connection worker exited");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bolt::message::{BeginMessage, RunMessage, TelemetryApi};
    use crate::bolt::response::{Response, ResponseRecorder};
    use crate::bolt::state::State;
    use crate::bolt::test_utils::{FakeBackend, Outcome};
    use crate::bolt::StateMachineError;

    fn logger() -> slog::Logger {
        slog::Logger::root(slog::Discard, slog::o!())
    }

    async fn wait_for_responses(recorder: &ResponseRecorder, count: usize) -> Vec<Response> {
        for _ in 0..500 {
            if recorder.len() >= count {
                break;
            }
            tokio::time::sleep(std::time::Duration::from_millis(2)).await;
        }
        recorder.take()
    }

    #[tokio::test]
    async fn messages_are_processed_in_order() {
        // -- setup --
        let backend = FakeBackend::new();
        let recorder = ResponseRecorder::new();
        let client = spawn_connection(logger(), backend.new_session(), recorder.clone());

        // -- execute --
        client
            .submit(RequestMessage::Telemetry(TelemetryApi::ManagedTransaction))
            .await
            .unwrap();
        client
            .submit(RequestMessage::Run(RunMessage::new("RETURN 1 AS n")))
            .await
            .unwrap();
        client.submit(RequestMessage::Pull { n: -1 }).await.unwrap();

        // -- verify --
        let responses = wait_for_responses(&recorder, 7).await;
        assert!(matches!(
            responses.as_slice(),
            [
                Response::Success,
                Response::StatementPrepared(_),
                Response::BeginStreaming,
                Response::Success,
                Response::Records { has_more: false, .. },
                Response::Bookmark(_),
                Response::Success,
            ]
        ));
        assert_eq!(backend.telemetry(), vec![TelemetryApi::ManagedTransaction]);
    }

    #[tokio::test]
    async fn reset_discards_queued_work() {
        // -- setup --
        let backend = FakeBackend::new();
        let recorder = ResponseRecorder::new();
        let client = spawn_connection(logger(), backend.new_session(), recorder.clone());
        client
            .submit(RequestMessage::Begin(BeginMessage::default()))
            .await
            .unwrap();
        client
            .submit(RequestMessage::Run(RunMessage::new("CALL db.sleep()")))
            .await
            .unwrap();
        backend.wait_until_sleeping().await;

        // -- execute --
        client
            .submit(RequestMessage::Run(RunMessage::new("RETURN 1 AS n")))
            .await
            .unwrap();
        client.submit(RequestMessage::Reset).await.unwrap();

        // -- verify --
        let responses = wait_for_responses(&recorder, 4).await;
        assert_eq!(
            responses,
            vec![
                Response::Success,
                Response::Failure(StateMachineError::TransactionStateTransition(
                    crate::bolt::TransactionError::Terminated
                )),
                Response::Ignored,
                Response::Success,
            ]
        );
        assert_eq!(backend.transactions()[0].outcome(), Outcome::RolledBack);
    }

    #[tokio::test]
    async fn fatal_error_closes_connection() {
        // -- setup --
        let backend = FakeBackend::new();
        let recorder = ResponseRecorder::new();
        let client = spawn_connection(logger(), backend.new_session(), recorder.clone());

        // -- execute --
        client.submit(RequestMessage::Commit).await.unwrap();
        client.closed().await;

        // -- verify --
        let responses = recorder.take();
        assert!(matches!(
            responses.as_slice(),
            [Response::Failure(StateMachineError::ProtocolBreach(_))]
        ));
        assert_eq!(
            client.submit(RequestMessage::Reset).await,
            Err(ConnectionError::Closed)
        );
    }

    #[tokio::test]
    async fn goodbye_closes_session() {
        let backend = FakeBackend::new();
        let session = backend.new_session();
        assert_eq!(session.state(), State::Ready);
        let client = spawn_connection(logger(), session, ResponseRecorder::new());

        client
            .submit(RequestMessage::Begin(BeginMessage::default()))
            .await
            .unwrap();
        client.submit(RequestMessage::Goodbye).await.unwrap();
        client.closed().await;

        assert_eq!(backend.transactions()[0].outcome(), Outcome::RolledBack);
    }
}
