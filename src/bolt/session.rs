use crate::bolt::backend::{BoltServices, ConnectionContext, Transaction, TransactionId};
use crate::bolt::error::StateMachineError;
use crate::bolt::message::{RequestMessage, TransactionType};
use crate::bolt::response::ResponseHandler;
use crate::bolt::state::State;
use crate::bolt::transitions::{self, OpenTransaction, TransitionContext};
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

/// Session state reachable from outside the worker that owns the session.
pub(crate) struct SessionShared {
    interrupt_counter: AtomicUsize,
    transactions: Mutex<HashMap<TransactionId, Arc<dyn Transaction>>>,
}

impl SessionShared {
    fn new() -> Self {
        SessionShared {
            interrupt_counter: AtomicUsize::new(0),
            transactions: Mutex::new(HashMap::new()),
        }
    }

    fn interrupt(&self) {
        self.interrupt_counter.fetch_add(1, Ordering::SeqCst);
        for transaction in self.lock_transactions().values() {
            transaction.terminate();
        }
    }

    pub(crate) fn is_interrupted(&self) -> bool {
        self.interrupt_counter.load(Ordering::SeqCst) > 0
    }

    /// Matches one pending interrupt. Returns how many remain.
    fn release_interrupt(&self) -> usize {
        let previous = self
            .interrupt_counter
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |count| Some(count.saturating_sub(1)))
            .unwrap_or_else(|count| count);
        previous.saturating_sub(1)
    }

    pub(crate) fn register(&self, transaction: Arc<dyn Transaction>) {
        self.lock_transactions().insert(transaction.id(), transaction);
    }

    pub(crate) fn unregister(&self, id: TransactionId) {
        self.lock_transactions().remove(&id);
    }

    fn drain(&self) -> Vec<Arc<dyn Transaction>> {
        self.lock_transactions().drain().map(|(_, transaction)| transaction).collect()
    }

    fn lock_transactions(&self) -> std::sync::MutexGuard<'_, HashMap<TransactionId, Arc<dyn Transaction>>> {
        self.transactions.lock().expect("Session transactions mutex poisoned")
    }
}

/// Interrupts a session from outside its worker, e.g. when RESET arrives or an admin terminates
/// the connection's work.
#[derive(Clone)]
pub struct InterruptHandle {
    shared: Arc<SessionShared>,
}

impl InterruptHandle {
    /// Terminates every open transaction and makes the session ignore messages until a RESET
    /// matches this interrupt.
    pub fn interrupt(&self) {
        self.shared.interrupt();
    }
}

/// Per-connection Bolt state machine. Processes one message at a time.
pub struct BoltSession {
    logger: slog::Logger,
    state: State,
    services: BoltServices,
    connection: ConnectionContext,
    shared: Arc<SessionShared>,
    current: Option<OpenTransaction>,
}

impl BoltSession {
    pub fn new(logger: slog::Logger, services: BoltServices, connection: ConnectionContext) -> Self {
        BoltSession {
            logger,
            state: State::Ready,
            services,
            connection,
            shared: Arc::new(SessionShared::new()),
            current: None,
        }
    }

    pub fn state(&self) -> State {
        self.state
    }

    pub fn interrupt_handle(&self) -> InterruptHandle {
        InterruptHandle {
            shared: self.shared.clone(),
        }
    }

    /// Processes one message, reporting its outcome to `handler`.
    ///
    /// A transition error is returned as is and NOT reported to `handler`. The session has already
    /// moved to FAILED (or INTERRUPTED) by then, except after ROUTE and TELEMETRY, which never change
    /// state. Fatal errors additionally require `close()`.
    pub async fn process(
        &mut self,
        message: RequestMessage,
        handler: &mut dyn ResponseHandler,
    ) -> Result<(), StateMachineError> {
        if self.state.is_terminal() {
            handler.on_ignored();
            return Ok(());
        }

        match message {
            RequestMessage::Reset => {
                self.reset(handler).await;
                return Ok(());
            }
            RequestMessage::Goodbye => {
                self.close().await;
                return Ok(());
            }
            _ => {}
        }

        if self.shared.is_interrupted() {
            self.state = State::Interrupted;
        }
        if let State::Failed | State::Interrupted = self.state {
            slog::debug!(self.logger, "Ignoring {} in state {}", message.name(), self.state);
            handler.on_ignored();
            return Ok(());
        }

        slog::trace!(self.logger, "Processing {} in state {}", message.name(), self.state);
        // ROUTE and TELEMETRY leave the session as it was, whatever their outcome.
        let keeps_state = matches!(message, RequestMessage::Route(_) | RequestMessage::Telemetry(_));
        let ctx = TransitionContext {
            logger: &self.logger,
            services: &self.services,
            connection: &self.connection,
            shared: &self.shared,
            current: &mut self.current,
        };
        match transitions::apply(self.state, message, ctx, handler).await {
            Ok(next) => {
                self.state = next;
                handler.on_success();
                Ok(())
            }
            Err(e) if keeps_state => {
                slog::debug!(self.logger, "Failed in state {}, state kept: {}", self.state, e);
                Err(e)
            }
            Err(e) => {
                slog::debug!(self.logger, "Failed in state {}: {}", self.state, e);
                self.fail().await;
                Err(e)
            }
        }
    }

    /// Rolls back everything still open. The session ignores all further messages.
    pub async fn close(&mut self) {
        if self.state.is_terminal() {
            return;
        }

        self.rollback_all().await;
        self.state = State::Defunct;
        slog::debug!(self.logger, "Session closed");
    }

    async fn reset(&mut self, handler: &mut dyn ResponseHandler) {
        let remaining = self.shared.release_interrupt();
        if remaining > 0 {
            slog::debug!(self.logger, "RESET ignored, {} interrupts still pending", remaining);
            self.state = State::Interrupted;
            handler.on_ignored();
            return;
        }

        self.rollback_all().await;
        self.state = State::Ready;
        handler.on_success();
    }

    async fn fail(&mut self) {
        let implicit = matches!(
            &self.current,
            Some(open) if open.transaction_type == TransactionType::Implicit
        );
        if implicit {
            if let Some(open) = self.current.take() {
                transitions::abandon(&self.logger, &self.shared, &open.transaction).await;
            }
        } else if let Some(open) = self.current.as_mut() {
            open.statement = None;
        }

        self.state = if self.shared.is_interrupted() {
            State::Interrupted
        } else {
            State::Failed
        };
    }

    async fn rollback_all(&mut self) {
        self.current = None;
        for transaction in self.shared.drain() {
            if let Err(e) = transaction.rollback().await {
                slog::debug!(self.logger, "Rollback of {} failed: {}", transaction.id(), e);
            }
        }
    }
}
