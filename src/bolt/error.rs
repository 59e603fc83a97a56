use crate::bolt::backend::{AuthenticationError, RoutingError, TransactionError};

#[derive(thiserror::Error, Debug, Clone, PartialEq)]
pub enum StateMachineError {
    #[error("authentication failed: {0}")]
    Authentication(#[source] AuthenticationError),
    #[error("transaction state transition failed: {0}")]
    TransactionStateTransition(#[source] TransactionError),
    #[error("internal state transition failed: {0}")]
    InternalStateTransition(#[from] RoutingError),
    #[error("protocol breach: {0}")]
    ProtocolBreach(String),
    #[error("authentication expired: {0}")]
    AuthenticationFatality(#[source] AuthenticationError),
}

impl StateMachineError {
    /// Fatal errors close the connection.
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            StateMachineError::ProtocolBreach(_) | StateMachineError::AuthenticationFatality(_)
        )
    }
}

impl From<AuthenticationError> for StateMachineError {
    fn from(error: AuthenticationError) -> Self {
        match error {
            AuthenticationError::CredentialsExpired(_) => StateMachineError::AuthenticationFatality(error),
            AuthenticationError::ImpersonationDenied { .. } => StateMachineError::Authentication(error),
        }
    }
}

impl From<TransactionError> for StateMachineError {
    fn from(error: TransactionError) -> Self {
        match error {
            TransactionError::CredentialsExpired(user) => {
                StateMachineError::AuthenticationFatality(AuthenticationError::CredentialsExpired(user))
            }
            other => StateMachineError::TransactionStateTransition(other),
        }
    }
}
