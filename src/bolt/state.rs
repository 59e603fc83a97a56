use std::fmt;

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum State {
    Ready,
    /// A RUN outside a transaction is streaming its result.
    AutoCommit,
    InTransaction,
    /// A message failed. Only RESET leaves this state.
    Failed,
    /// Interrupts are pending. Only RESET leaves this state.
    Interrupted,
    /// Closed. Terminal.
    Defunct,
}

impl State {
    pub fn is_terminal(&self) -> bool {
        matches!(self, State::Defunct)
    }
}

impl fmt::Display for State {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            State::Ready => "READY",
            State::AutoCommit => "AUTO_COMMIT",
            State::InTransaction => "IN_TRANSACTION",
            State::Failed => "FAILED",
            State::Interrupted => "INTERRUPTED",
            State::Defunct => "DEFUNCT",
        };
        f.write_str(name)
    }
}
