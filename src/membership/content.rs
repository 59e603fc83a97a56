use crate::membership::marshal::{self, DecodeError};
use crate::membership::MembershipEntry;
use bytes::{Buf, BufMut, Bytes, BytesMut};

const MEMBERSHIP_CONTENT: u8 = 0;
const COMMAND_CONTENT: u8 = 1;

/// Payload of a raft log entry.
///
/// ```text
/// tag: u8    0 = membership, followed by the `MembershipEntry` encoding
///            1 = command, followed by len: i32 | bytes
/// ```
#[derive(Clone, Debug, PartialEq)]
pub enum ReplicatedContent {
    Membership(Option<MembershipEntry>),
    Command(Bytes),
}

impl ReplicatedContent {
    pub fn encode(&self) -> Bytes {
        let mut buf = BytesMut::new();
        match self {
            ReplicatedContent::Membership(entry) => {
                buf.put_u8(MEMBERSHIP_CONTENT);
                MembershipEntry::encode(entry.as_ref(), &mut buf);
            }
            ReplicatedContent::Command(command) => {
                buf.put_u8(COMMAND_CONTENT);
                marshal::put_length_prefixed(&mut buf, command);
            }
        }

        buf.freeze()
    }

    pub fn decode(mut bytes: Bytes) -> Result<Self, DecodeError> {
        marshal::ensure_remaining(&bytes, 1)?;
        match bytes.get_u8() {
            MEMBERSHIP_CONTENT => Ok(ReplicatedContent::Membership(MembershipEntry::decode(&mut bytes)?)),
            COMMAND_CONTENT => Ok(ReplicatedContent::Command(Bytes::from(marshal::get_length_prefixed(
                &mut bytes,
            )?))),
            other => Err(DecodeError::UnknownContentType(other)),
        }
    }
}
