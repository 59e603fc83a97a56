use crate::commitlog::{Index, Term};
use crate::consensus::{AppendEntriesRequest, AppendEntriesResponse, LogCompactionInfo, MemberId, RaftLogEntry, RaftMessage};
use crate::grpc::{
    proto_raft_message, ProtoAppendEntriesReq, ProtoAppendEntriesResp, ProtoLogCompactionInfo, ProtoLogEntry,
    ProtoRaftMessage,
};
use crate::transport::TransportError;
use bytes::Bytes;

pub(crate) fn convert_outbound_message(message: RaftMessage) -> ProtoRaftMessage {
    match message {
        RaftMessage::AppendEntriesRequest(request) => ProtoRaftMessage {
            from_member_id: request.from.into_inner(),
            message: Some(proto_raft_message::Message::AppendEntriesRequest(ProtoAppendEntriesReq {
                leader_term: request.leader_term.as_u64(),
                previous_log_entry_index: Index::to_u64(request.prev_log_index),
                previous_log_entry_term: request.prev_log_term.as_u64(),
                entries: request
                    .entries
                    .into_iter()
                    .map(|entry| ProtoLogEntry {
                        term: entry.term.as_u64(),
                        command: entry.command.to_vec(),
                    })
                    .collect(),
                leader_commit_index: Index::to_u64(request.leader_commit),
            })),
        },
        RaftMessage::AppendEntriesResponse(response) => ProtoRaftMessage {
            from_member_id: response.from.into_inner(),
            message: Some(proto_raft_message::Message::AppendEntriesResponse(ProtoAppendEntriesResp {
                term: response.term.as_u64(),
                success: response.success,
                match_index: Index::to_u64(response.match_index),
                append_index: Index::to_u64(response.append_index),
            })),
        },
        RaftMessage::LogCompactionInfo(info) => ProtoRaftMessage {
            from_member_id: info.from.into_inner(),
            message: Some(proto_raft_message::Message::LogCompactionInfo(ProtoLogCompactionInfo {
                leader_term: info.leader_term.as_u64(),
                pruned_index: Index::to_u64(info.pruned_index),
            })),
        },
    }
}

pub(crate) fn convert_inbound_message(proto: ProtoRaftMessage) -> Result<RaftMessage, TransportError> {
    if proto.from_member_id.is_empty() {
        return Err(TransportError::Malformed("Missing sender member id"));
    }
    let from = MemberId::new(proto.from_member_id);

    let message = match proto.message {
        Some(proto_raft_message::Message::AppendEntriesRequest(request)) => {
            let prev_log_index = Index::from_u64(request.previous_log_entry_index);
            if prev_log_index.is_none() && request.previous_log_entry_term != 0 {
                return Err(TransportError::Malformed("PreviousLogEntryIndex 0 and PreviousLogEntryTerm non-0"));
            }

            RaftMessage::AppendEntriesRequest(AppendEntriesRequest {
                from,
                leader_term: Term::new(request.leader_term),
                prev_log_index,
                prev_log_term: Term::new(request.previous_log_entry_term),
                entries: request
                    .entries
                    .into_iter()
                    .map(|entry| RaftLogEntry::new(Term::new(entry.term), Bytes::from(entry.command)))
                    .collect(),
                leader_commit: Index::from_u64(request.leader_commit_index),
            })
        }
        Some(proto_raft_message::Message::AppendEntriesResponse(response)) => {
            RaftMessage::AppendEntriesResponse(AppendEntriesResponse {
                from,
                term: Term::new(response.term),
                success: response.success,
                match_index: Index::from_u64(response.match_index),
                append_index: Index::from_u64(response.append_index),
            })
        }
        Some(proto_raft_message::Message::LogCompactionInfo(info)) => {
            RaftMessage::LogCompactionInfo(LogCompactionInfo {
                from,
                leader_term: Term::new(info.leader_term),
                pruned_index: Index::from_u64(info.pruned_index),
            })
        }
        None => return Err(TransportError::Malformed("Missing message body")),
    };

    Ok(message)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn absent_indexes_travel_as_zero() {
        // -- setup --
        let request = RaftMessage::AppendEntriesRequest(AppendEntriesRequest {
            from: MemberId::new("leader"),
            leader_term: Term::new(3),
            prev_log_index: None,
            prev_log_term: Term::default(),
            entries: vec![RaftLogEntry::new(Term::new(3), vec![7, 7])],
            leader_commit: None,
        });

        // -- execute --
        let proto = convert_outbound_message(request.clone());

        // -- verify --
        match &proto.message {
            Some(proto_raft_message::Message::AppendEntriesRequest(req)) => {
                assert_eq!(req.previous_log_entry_index, 0);
                assert_eq!(req.leader_commit_index, 0);
                assert_eq!(req.entries[0].command, vec![7, 7]);
            }
            other => panic!("Unexpected message {:?}", other),
        }
        assert_eq!(convert_inbound_message(proto).unwrap(), request);
    }

    #[test]
    fn malformed_messages_are_rejected() {
        let missing_body = ProtoRaftMessage {
            from_member_id: "leader".into(),
            message: None,
        };
        assert!(matches!(
            convert_inbound_message(missing_body),
            Err(TransportError::Malformed(_))
        ));

        let missing_sender = convert_outbound_message(RaftMessage::LogCompactionInfo(LogCompactionInfo {
            from: MemberId::new(""),
            leader_term: Term::new(1),
            pruned_index: Some(Index::new(9)),
        }));
        assert!(matches!(
            convert_inbound_message(missing_sender),
            Err(TransportError::Malformed(_))
        ));

        let bad_prev = ProtoRaftMessage {
            from_member_id: "leader".into(),
            message: Some(proto_raft_message::Message::AppendEntriesRequest(ProtoAppendEntriesReq {
                leader_term: 1,
                previous_log_entry_index: 0,
                previous_log_entry_term: 4,
                entries: vec![],
                leader_commit_index: 0,
            })),
        };
        assert!(convert_inbound_message(bad_prev).is_err());
    }
}
