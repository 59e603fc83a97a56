use crate::commitlog::{Index, Log, Term};
use crate::consensus::{AppendEntriesResponse, LeaderContext, MemberId, Outbound, RaftLogEntry};
use crate::options::ReplicationOptionsValidated;
use crate::shipping::shipper_actor::{self, ShipperClient, ShipperEvent};
use std::collections::{BTreeSet, HashMap};
use std::sync::Arc;

/// Work for the shippers, as decided by the leader.
#[derive(Clone, Debug, PartialEq)]
pub enum ShipCommand {
    /// `target` rejected our last append. Its log goes up to `remote_append_index`.
    Mismatch {
        target: MemberId,
        remote_append_index: Option<Index>,
    },
    /// `target` agrees with the leader up to `match_index`.
    Match {
        target: MemberId,
        match_index: Option<Index>,
    },
    /// The leader appended `entries` right after `(base_index, base_term)`.
    NewEntries {
        base_index: Option<Index>,
        base_term: Term,
        entries: Vec<RaftLogEntry>,
    },
    /// The commit index moved.
    CommitUpdate,
}

impl From<AppendEntriesResponse> for ShipCommand {
    fn from(response: AppendEntriesResponse) -> Self {
        if response.success {
            ShipCommand::Match {
                target: response.from,
                match_index: response.match_index,
            }
        } else {
            ShipCommand::Mismatch {
                target: response.from,
                remote_append_index: response.append_index,
            }
        }
    }
}

/// Owns one shipper per follower while this member leads.
pub struct LogShippingManager<L: Log<RaftLogEntry>> {
    logger: slog::Logger,
    myself: MemberId,
    log: Arc<L>,
    outbound: Arc<dyn Outbound>,
    options: ReplicationOptionsValidated,

    recipients: BTreeSet<MemberId>,
    shippers: HashMap<MemberId, ShipperClient>,
    // Some while leading.
    leader_context: Option<LeaderContext>,
}

impl<L: Log<RaftLogEntry> + 'static> LogShippingManager<L> {
    pub fn new(
        logger: slog::Logger,
        myself: MemberId,
        log: Arc<L>,
        outbound: Arc<dyn Outbound>,
        options: ReplicationOptionsValidated,
    ) -> Self {
        LogShippingManager {
            logger,
            myself,
            log,
            outbound,
            options,
            recipients: BTreeSet::new(),
            shippers: HashMap::new(),
            leader_context: None,
        }
    }

    /// Starts shipping to every known member except ourselves.
    pub async fn start(&mut self, leader_context: LeaderContext) {
        slog::info!(self.logger, "Starting log shipping in term {:?}", leader_context.term);
        self.leader_context = Some(leader_context);
        let recipients: Vec<MemberId> = self.recipients.iter().cloned().collect();
        for member in recipients {
            self.start_shipper(member, leader_context).await;
        }
    }

    pub async fn stop(&mut self) {
        slog::info!(self.logger, "Stopping log shipping");
        self.leader_context = None;
        for (_, shipper) in self.shippers.drain() {
            shipper.send(ShipperEvent::Stop).await;
        }
    }

    /// Keeps exactly one shipper per member other than ourselves.
    pub async fn on_membership_change(&mut self, members: BTreeSet<MemberId>) {
        let mut recipients = members;
        recipients.remove(&self.myself);

        let removed: Vec<MemberId> = self.recipients.difference(&recipients).cloned().collect();
        let added: Vec<MemberId> = recipients.difference(&self.recipients).cloned().collect();
        self.recipients = recipients;

        for member in removed {
            if let Some(shipper) = self.shippers.remove(&member) {
                slog::info!(self.logger, "Stopping shipper to removed member {:?}", member);
                shipper.send(ShipperEvent::Stop).await;
            }
        }
        if let Some(leader_context) = self.leader_context {
            for member in added {
                self.start_shipper(member, leader_context).await;
            }
        }
    }

    pub async fn handle_commands(&mut self, commands: Vec<ShipCommand>, leader_context: LeaderContext) {
        if self.leader_context.is_none() {
            slog::debug!(self.logger, "Not leading, dropping {} ship commands", commands.len());
            return;
        }
        self.leader_context = Some(leader_context);

        for command in commands {
            match command {
                ShipCommand::Mismatch {
                    target,
                    remote_append_index,
                } => {
                    self.send_to(
                        &target,
                        ShipperEvent::Mismatch {
                            remote_append_index,
                            leader_context,
                        },
                    )
                    .await
                }
                ShipCommand::Match { target, match_index } => {
                    self.send_to(
                        &target,
                        ShipperEvent::Match {
                            match_index,
                            leader_context,
                        },
                    )
                    .await
                }
                ShipCommand::NewEntries {
                    base_index,
                    base_term,
                    entries,
                } => {
                    for shipper in self.shippers.values() {
                        shipper
                            .send(ShipperEvent::NewEntries {
                                base_index,
                                base_term,
                                entries: entries.clone(),
                                leader_context,
                            })
                            .await;
                    }
                }
                ShipCommand::CommitUpdate => {
                    for shipper in self.shippers.values() {
                        shipper.send(ShipperEvent::CommitUpdate(leader_context)).await;
                    }
                }
            }
        }
    }

    pub fn followers(&self) -> Vec<MemberId> {
        let mut followers: Vec<MemberId> = self.shippers.keys().cloned().collect();
        followers.sort();
        followers
    }

    async fn start_shipper(&mut self, member: MemberId, leader_context: LeaderContext) {
        if self.shippers.contains_key(&member) {
            return;
        }

        let logger = self.logger.new(slog::o!("follower" => member.to_string()));
        let shipper = shipper_actor::spawn(
            logger,
            self.myself.clone(),
            member.clone(),
            self.log.clone(),
            self.outbound.clone(),
            &self.options,
        );
        shipper.send(ShipperEvent::Start(leader_context)).await;
        self.shippers.insert(member, shipper);
    }

    async fn send_to(&self, target: &MemberId, event: ShipperEvent) {
        match self.shippers.get(target) {
            Some(shipper) => shipper.send(event).await,
            None => slog::debug!(self.logger, "No shipper for {:?}, dropping {:?}", target, event),
        }
    }
}
