use crate::consensus::MemberId;
use crate::membership::marshal::{self, DecodeError, Marshal};
use bytes::{Buf, BufMut};
use std::collections::BTreeSet;

/// Cluster membership as of `log_index`.
///
/// Members are kept ordered so the same membership always encodes to the same bytes.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct MembershipEntry {
    pub log_index: u64,
    pub members: BTreeSet<MemberId>,
}

impl MembershipEntry {
    pub fn new(log_index: u64, members: BTreeSet<MemberId>) -> Self {
        MembershipEntry { log_index, members }
    }

    /// Byte representation:
    ///
    /// ```text
    /// presence: i32           0 = absent, nothing follows
    ///                         1 = present
    /// log_index: i64
    /// member_count: i32
    /// member_count x MemberId (len: i32 | utf8 bytes)
    /// ```
    pub fn encode<B: BufMut>(entry: Option<&MembershipEntry>, buf: &mut B) {
        match entry {
            None => buf.put_i32(0),
            Some(entry) => {
                buf.put_i32(1);
                buf.put_i64(entry.log_index as i64);
                buf.put_i32(entry.members.len() as i32);
                for member in &entry.members {
                    member.marshal(buf);
                }
            }
        }
    }

    pub fn decode<B: Buf>(buf: &mut B) -> Result<Option<MembershipEntry>, DecodeError> {
        match marshal::get_i32(buf)? {
            0 => return Ok(None),
            1 => {}
            other => return Err(DecodeError::InvalidPresence(other)),
        }

        let log_index = marshal::get_i64(buf)? as u64;
        let member_count = marshal::get_i32(buf)?;
        if member_count < 0 {
            return Err(DecodeError::NegativeLength(member_count));
        }

        let mut members = BTreeSet::new();
        for _ in 0..member_count {
            let member = MemberId::unmarshal(buf)?;
            if members.contains(&member) {
                return Err(DecodeError::DuplicateMember(member));
            }
            members.insert(member);
        }

        Ok(Some(MembershipEntry { log_index, members }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn encoded(entry: Option<&MembershipEntry>) -> Vec<u8> {
        let mut buf = vec![];
        MembershipEntry::encode(entry, &mut buf);
        buf
    }

    fn members(ids: &[&str]) -> BTreeSet<MemberId> {
        ids.iter().map(|id| MemberId::new(*id)).collect()
    }

    #[test]
    fn round_trip() {
        let entries = vec![
            MembershipEntry::new(0, BTreeSet::new()),
            MembershipEntry::new(42, members(&["core-1"])),
            MembershipEntry::new(u32::MAX as u64 + 7, members(&["core-3", "core-1", "core-2"])),
        ];

        for entry in entries {
            let bytes = encoded(Some(&entry));
            assert_eq!(MembershipEntry::decode(&mut &bytes[..]).unwrap(), Some(entry));
        }
        assert_eq!(MembershipEntry::decode(&mut &encoded(None)[..]).unwrap(), None);
    }

    #[test]
    fn byte_layout() {
        assert_eq!(encoded(None), vec![0, 0, 0, 0]);
        assert_eq!(
            encoded(Some(&MembershipEntry::new(5, members(&["b", "a"])))),
            vec![
                0, 0, 0, 1, // present
                0, 0, 0, 0, 0, 0, 0, 5, // log index
                0, 0, 0, 2, // count
                0, 0, 0, 1, b'a', // ordered members
                0, 0, 0, 1, b'b',
            ]
        );
    }

    #[test]
    fn truncated_input_fails() {
        let bytes = encoded(Some(&MembershipEntry::new(9, members(&["x", "y"]))));

        for len in 0..bytes.len() {
            let result = MembershipEntry::decode(&mut &bytes[..len]);
            assert!(
                matches!(result, Err(DecodeError::EndOfStream { .. })),
                "Expected end of stream at {} bytes, got {:?}",
                len,
                result
            );
        }
    }

    #[test]
    fn invalid_header_fails() {
        assert_eq!(
            MembershipEntry::decode(&mut &[0u8, 0, 0, 2][..]).unwrap_err(),
            DecodeError::InvalidPresence(2)
        );

        let mut bytes = vec![0, 0, 0, 1, 0, 0, 0, 0, 0, 0, 0, 1];
        bytes.extend_from_slice(&(-3i32).to_be_bytes());
        assert_eq!(
            MembershipEntry::decode(&mut &bytes[..]).unwrap_err(),
            DecodeError::NegativeLength(-3)
        );
    }

    #[test]
    fn repeated_member_fails() {
        let bytes = vec![
            0, 0, 0, 1, // present
            0, 0, 0, 0, 0, 0, 0, 3, // log index
            0, 0, 0, 2, // count
            0, 0, 0, 1, b'a', // same member twice
            0, 0, 0, 1, b'a',
        ];

        assert_eq!(
            MembershipEntry::decode(&mut &bytes[..]).unwrap_err(),
            DecodeError::DuplicateMember(MemberId::new("a"))
        );
    }
}
