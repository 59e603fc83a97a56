use crate::commitlog::{Entry, Term};
use bytes::{Buf, BufMut, Bytes};
use std::convert::TryFrom;
use std::io;

/// Byte representation:
///
/// ```text
/// |                                         1                           |
/// | 0 | 1 | 2 | 3 | 4 | 5 | 6 | 7 | 8 | 9 | 0 | 1 | 2 | 3 | 4 | 5 | ... |
/// +---+---+---+---+---+---+---+---+---+---+---+---+---+---+---+---+-...-+
/// |Vrs|     Term (8 bytes, BE)        |  Command (variable size)    ... |
/// +---+-------------------------------+-----------------------------...-+
/// ```
///
/// * `Vrs` - version of the serialized payload
/// * `Term` - raft leadership term when this entry was created
/// * `Command` - opaque payload, usually an encoded `ReplicatedContent`
///
/// Size of `Command` is not stored; the underlying log hands back the exact allocation.
#[derive(Clone, Debug, PartialEq)]
pub struct RaftLogEntry {
    pub term: Term,
    pub command: Bytes,
}

const RAFT_LOG_ENTRY_FORMAT_VERSION: u8 = 1;
const HEADER_LEN: usize = 1 + 8;

impl RaftLogEntry {
    pub fn new(term: Term, command: impl Into<Bytes>) -> Self {
        RaftLogEntry {
            term,
            command: command.into(),
        }
    }
}

impl Entry for RaftLogEntry {
    fn term(&self) -> Term {
        self.term
    }
}

impl TryFrom<Vec<u8>> for RaftLogEntry {
    type Error = io::Error;

    fn try_from(bytes: Vec<u8>) -> Result<Self, Self::Error> {
        if bytes.len() < HEADER_LEN {
            return Err(io::Error::new(
                io::ErrorKind::UnexpectedEof,
                format!("Log entry has {} bytes, header needs {}", bytes.len(), HEADER_LEN),
            ));
        }

        let mut buf = Bytes::from(bytes);
        let version = buf.get_u8();
        if version != RAFT_LOG_ENTRY_FORMAT_VERSION {
            return Err(io::Error::new(
                io::ErrorKind::InvalidData,
                format!("Unknown log entry format version {}", version),
            ));
        }
        let term = Term::new(buf.get_u64());

        Ok(RaftLogEntry { term, command: buf })
    }
}

impl From<RaftLogEntry> for Vec<u8> {
    fn from(entry: RaftLogEntry) -> Self {
        let mut bytes = Vec::with_capacity(HEADER_LEN + entry.command.len());
        bytes.put_u8(RAFT_LOG_ENTRY_FORMAT_VERSION);
        bytes.put_u64(entry.term.as_u64());
        bytes.put_slice(&entry.command);

        bytes
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn byte_layout() {
        let entry = RaftLogEntry::new(Term::new(0x0102), &b"cmd"[..]);
        let bytes: Vec<u8> = entry.clone().into();

        assert_eq!(bytes, vec![1, 0, 0, 0, 0, 0, 0, 1, 2, b'c', b'm', b'd']);
        assert_eq!(RaftLogEntry::try_from(bytes).unwrap(), entry);
    }

    #[test]
    fn empty_command_is_valid() {
        let bytes: Vec<u8> = RaftLogEntry::new(Term::new(7), Bytes::new()).into();
        let decoded = RaftLogEntry::try_from(bytes).unwrap();

        assert_eq!(decoded.term, Term::new(7));
        assert!(decoded.command.is_empty());
    }

    #[test]
    fn rejects_short_or_unknown_version() {
        let err = RaftLogEntry::try_from(vec![1, 0, 0]).unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::UnexpectedEof);

        let err = RaftLogEntry::try_from(vec![9, 0, 0, 0, 0, 0, 0, 0, 1]).unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::InvalidData);
    }
}
