use crate::bolt::backend::{Record, RoutingTable};
use crate::bolt::error::StateMachineError;
use crate::bolt::message::Bookmark;
use std::sync::{Arc, Mutex};
use std::time::Duration;

#[derive(Clone, Debug, PartialEq)]
pub struct StatementMetadata {
    pub statement_id: u64,
    pub time_to_prepare: Duration,
    pub field_names: Vec<String>,
}

/// Receives the outcome of each processed message, in order.
///
/// Every message ends in exactly one of `on_success`, `on_failure` or `on_ignored`. The other
/// callbacks carry the payload that precedes a success.
pub trait ResponseHandler: Send {
    fn on_statement_prepared(&mut self, metadata: StatementMetadata);
    fn on_begin_streaming(&mut self);
    fn on_records(&mut self, records: Vec<Record>, has_more: bool);
    fn on_routing_table(&mut self, table: RoutingTable);
    fn on_bookmark(&mut self, bookmark: Bookmark);
    fn on_success(&mut self);
    fn on_failure(&mut self, error: &StateMachineError);
    fn on_ignored(&mut self);
}

#[derive(Clone, Debug, PartialEq)]
pub enum Response {
    StatementPrepared(StatementMetadata),
    BeginStreaming,
    Records { records: Vec<Record>, has_more: bool },
    RoutingTable(RoutingTable),
    Bookmark(Bookmark),
    Success,
    Failure(StateMachineError),
    Ignored,
}

/// Keeps every response in memory. Clones share the same buffer.
#[derive(Clone, Default)]
pub struct ResponseRecorder {
    responses: Arc<Mutex<Vec<Response>>>,
}

impl ResponseRecorder {
    pub fn new() -> Self {
        ResponseRecorder::default()
    }

    pub fn take(&self) -> Vec<Response> {
        std::mem::take(&mut *self.responses.lock().expect("Response buffer mutex poisoned"))
    }

    pub fn len(&self) -> usize {
        self.responses.lock().expect("Response buffer mutex poisoned").len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn push(&self, response: Response) {
        self.responses
            .lock()
            .expect("Response buffer mutex poisoned")
            .push(response);
    }
}

impl ResponseHandler for ResponseRecorder {
    fn on_statement_prepared(&mut self, metadata: StatementMetadata) {
        self.push(Response::StatementPrepared(metadata));
    }

    fn on_begin_streaming(&mut self) {
        self.push(Response::BeginStreaming);
    }

    fn on_records(&mut self, records: Vec<Record>, has_more: bool) {
        self.push(Response::Records { records, has_more });
    }

    fn on_routing_table(&mut self, table: RoutingTable) {
        self.push(Response::RoutingTable(table));
    }

    fn on_bookmark(&mut self, bookmark: Bookmark) {
        self.push(Response::Bookmark(bookmark));
    }

    fn on_success(&mut self) {
        self.push(Response::Success);
    }

    fn on_failure(&mut self, error: &StateMachineError) {
        self.push(Response::Failure(error.clone()));
    }

    fn on_ignored(&mut self) {
        self.push(Response::Ignored);
    }
}
