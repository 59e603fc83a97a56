use crate::bolt::backend::{
    BeginRequest, BoltServices, ConnectionContext, LoginContext, Statement, Transaction, TransactionError,
};
use crate::bolt::error::StateMachineError;
use crate::bolt::message::{BeginMessage, Parameters, RequestMessage, RouteMessage, RunMessage, TelemetryApi, TransactionType};
use crate::bolt::response::{ResponseHandler, StatementMetadata};
use crate::bolt::session::SessionShared;
use crate::bolt::state::State;
use std::sync::Arc;
use tokio::time::Instant;

pub(crate) struct OpenTransaction {
    pub(crate) transaction: Arc<dyn Transaction>,
    pub(crate) transaction_type: TransactionType,
    // The statement PULL and DISCARD act on.
    pub(crate) statement: Option<Box<dyn Statement>>,
}

/// The parts of a session a transition may touch.
pub(crate) struct TransitionContext<'a> {
    pub(crate) logger: &'a slog::Logger,
    pub(crate) services: &'a BoltServices,
    pub(crate) connection: &'a ConnectionContext,
    pub(crate) shared: &'a SessionShared,
    pub(crate) current: &'a mut Option<OpenTransaction>,
}

#[derive(Copy, Clone)]
enum Consume {
    Pull,
    Discard,
}

/// Applies `message` in `state` and returns the state to move to.
///
/// RESET and GOODBYE never get here. On error the session stays where it was; what happens next
/// is up to the caller.
pub(crate) async fn apply(
    state: State,
    message: RequestMessage,
    ctx: TransitionContext<'_>,
    handler: &mut dyn ResponseHandler,
) -> Result<State, StateMachineError> {
    match (state, message) {
        (State::Ready, RequestMessage::Run(run)) => run_auto_commit(ctx, run, handler).await,
        (State::Ready, RequestMessage::Begin(begin)) => begin_explicit(ctx, begin).await,
        (State::InTransaction, RequestMessage::Run(run)) => run_in_transaction(ctx, run, handler).await,
        (State::AutoCommit, RequestMessage::Pull { n }) | (State::InTransaction, RequestMessage::Pull { n }) => {
            consume(ctx, state, n, Consume::Pull, handler).await
        }
        (State::AutoCommit, RequestMessage::Discard { n }) | (State::InTransaction, RequestMessage::Discard { n }) => {
            consume(ctx, state, n, Consume::Discard, handler).await
        }
        (State::InTransaction, RequestMessage::Commit) => commit(ctx, handler).await,
        (State::InTransaction, RequestMessage::Rollback) => rollback(ctx).await,
        (State::Ready | State::AutoCommit | State::InTransaction, RequestMessage::Route(route)) => {
            resolve_routing_table(ctx, state, route, handler).await
        }
        (State::Ready | State::AutoCommit | State::InTransaction, RequestMessage::Telemetry(api)) => {
            record_telemetry(&ctx, api);
            Ok(state)
        }
        (state, message) => Err(StateMachineError::ProtocolBreach(format!(
            "{} is not allowed in state {}",
            message.name(),
            state
        ))),
    }
}

async fn run_auto_commit(
    ctx: TransitionContext<'_>,
    run: RunMessage,
    handler: &mut dyn ResponseHandler,
) -> Result<State, StateMachineError> {
    let RunMessage {
        statement,
        params,
        database,
        access_mode,
        bookmarks,
        timeout,
        metadata,
        notifications,
        impersonated_user,
    } = run;
    let login = impersonate(ctx.services, ctx.connection, impersonated_user.as_deref())?;
    let started = Instant::now();
    let request = BeginRequest {
        transaction_type: TransactionType::Implicit,
        login,
        database: resolve_database(ctx.connection, database),
        access_mode,
        bookmarks,
        timeout,
        metadata,
        notifications,
    };

    let transaction = begin(&ctx, request).await?;
    let statement = match execute(ctx.shared, &transaction, &statement, &params).await {
        Ok(statement) => statement,
        Err(e) => {
            abandon(ctx.logger, ctx.shared, &transaction).await;
            return Err(e);
        }
    };

    report_prepared(handler, statement.as_ref(), started);
    *ctx.current = Some(OpenTransaction {
        transaction,
        transaction_type: TransactionType::Implicit,
        statement: Some(statement),
    });

    Ok(State::AutoCommit)
}

async fn begin_explicit(ctx: TransitionContext<'_>, begin_message: BeginMessage) -> Result<State, StateMachineError> {
    let login = impersonate(ctx.services, ctx.connection, begin_message.impersonated_user.as_deref())?;
    let request = BeginRequest {
        transaction_type: begin_message.transaction_type,
        login,
        database: resolve_database(ctx.connection, begin_message.database),
        access_mode: begin_message.access_mode,
        bookmarks: begin_message.bookmarks,
        timeout: begin_message.timeout,
        metadata: begin_message.metadata,
        notifications: begin_message.notifications,
    };

    let transaction = begin(&ctx, request).await?;
    slog::debug!(ctx.logger, "Began {}", transaction.id());
    *ctx.current = Some(OpenTransaction {
        transaction,
        transaction_type: begin_message.transaction_type,
        statement: None,
    });

    Ok(State::InTransaction)
}

async fn run_in_transaction(
    ctx: TransitionContext<'_>,
    run: RunMessage,
    handler: &mut dyn ResponseHandler,
) -> Result<State, StateMachineError> {
    let transaction = match ctx.current.as_ref() {
        Some(open) => open.transaction.clone(),
        None => return Err(no_open_transaction()),
    };

    let started = Instant::now();
    let statement = execute(ctx.shared, &transaction, &run.statement, &run.params).await?;
    report_prepared(handler, statement.as_ref(), started);
    if let Some(open) = ctx.current.as_mut() {
        open.statement = Some(statement);
    }

    Ok(State::InTransaction)
}

async fn consume(
    ctx: TransitionContext<'_>,
    state: State,
    n: i64,
    mode: Consume,
    handler: &mut dyn ResponseHandler,
) -> Result<State, StateMachineError> {
    let limit = record_limit(n)?;
    let statement = match ctx.current.as_mut().and_then(|open| open.statement.as_mut()) {
        Some(statement) => statement,
        None => {
            return Err(StateMachineError::ProtocolBreach(format!(
                "no open statement to consume in state {}",
                state
            )))
        }
    };

    let has_more = match mode {
        Consume::Pull => {
            let (records, has_more) = statement.pull(limit).await?;
            handler.on_records(records, has_more);
            has_more
        }
        Consume::Discard => statement.discard(limit).await?,
    };
    if has_more {
        return Ok(state);
    }

    if state == State::AutoCommit {
        if let Some(open) = ctx.current.take() {
            ctx.shared.unregister(open.transaction.id());
            let bookmark = open.transaction.commit().await?;
            handler.on_bookmark(bookmark);
        }
        return Ok(State::Ready);
    }

    if let Some(open) = ctx.current.as_mut() {
        open.statement = None;
    }
    Ok(state)
}

async fn commit(ctx: TransitionContext<'_>, handler: &mut dyn ResponseHandler) -> Result<State, StateMachineError> {
    let open = ctx.current.take().ok_or_else(no_open_transaction)?;
    ctx.shared.unregister(open.transaction.id());

    let bookmark = open.transaction.commit().await?;
    slog::debug!(ctx.logger, "Committed {}", open.transaction.id());
    handler.on_bookmark(bookmark);

    Ok(State::Ready)
}

async fn rollback(ctx: TransitionContext<'_>) -> Result<State, StateMachineError> {
    let open = ctx.current.take().ok_or_else(no_open_transaction)?;
    ctx.shared.unregister(open.transaction.id());

    open.transaction.rollback().await?;
    slog::debug!(ctx.logger, "Rolled back {}", open.transaction.id());

    Ok(State::Ready)
}

async fn resolve_routing_table(
    ctx: TransitionContext<'_>,
    state: State,
    route: RouteMessage,
    handler: &mut dyn ResponseHandler,
) -> Result<State, StateMachineError> {
    let login = impersonate(ctx.services, ctx.connection, route.impersonated_user.as_deref())?;
    let database = resolve_database(ctx.connection, route.database);

    let table = ctx
        .services
        .routing
        .route(&database, &login, &route.routing_context)
        .await?;
    handler.on_routing_table(table);

    Ok(state)
}

fn record_telemetry(ctx: &TransitionContext<'_>, api: TelemetryApi) {
    if let Err(e) = ctx.services.telemetry.record(api) {
        slog::warn!(ctx.logger, "Failed to record {:?} telemetry: {}", api, e);
    }
}

async fn begin(ctx: &TransitionContext<'_>, request: BeginRequest) -> Result<Arc<dyn Transaction>, StateMachineError> {
    let transaction = ctx.services.transactions.begin(request).await?;
    ctx.shared.register(transaction.clone());

    // An interrupt that landed before registration could not terminate this transaction.
    if ctx.shared.is_interrupted() {
        abandon(ctx.logger, ctx.shared, &transaction).await;
        return Err(TransactionError::Terminated.into());
    }

    Ok(transaction)
}

async fn execute(
    shared: &SessionShared,
    transaction: &Arc<dyn Transaction>,
    statement: &str,
    params: &Parameters,
) -> Result<Box<dyn Statement>, StateMachineError> {
    let statement = transaction.run(statement, params).await?;
    if shared.is_interrupted() {
        return Err(TransactionError::Terminated.into());
    }

    Ok(statement)
}

pub(crate) async fn abandon(logger: &slog::Logger, shared: &SessionShared, transaction: &Arc<dyn Transaction>) {
    shared.unregister(transaction.id());
    if let Err(e) = transaction.rollback().await {
        slog::warn!(logger, "Failed to roll back {}: {}", transaction.id(), e);
    }
}

fn impersonate(
    services: &BoltServices,
    connection: &ConnectionContext,
    target: Option<&str>,
) -> Result<LoginContext, StateMachineError> {
    match target {
        Some(target) if target != connection.login.user => {
            Ok(services.authentication.impersonate(&connection.login, target)?)
        }
        _ => Ok(connection.login.clone()),
    }
}

fn resolve_database(connection: &ConnectionContext, database: Option<String>) -> String {
    database
        .filter(|name| !name.is_empty())
        .unwrap_or_else(|| connection.default_database.clone())
}

fn record_limit(n: i64) -> Result<Option<u64>, StateMachineError> {
    match n {
        -1 => Ok(None),
        n if n > 0 => Ok(Some(n as u64)),
        n => Err(StateMachineError::ProtocolBreach(format!("invalid record count {}", n))),
    }
}

fn report_prepared(handler: &mut dyn ResponseHandler, statement: &dyn Statement, started: Instant) {
    handler.on_statement_prepared(StatementMetadata {
        statement_id: statement.id(),
        time_to_prepare: started.elapsed(),
        field_names: statement.field_names().to_vec(),
    });
    handler.on_begin_streaming();
}

fn no_open_transaction() -> StateMachineError {
    StateMachineError::ProtocolBreach("no open transaction".to_string())
}
