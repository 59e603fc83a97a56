use crate::consensus::MemberId;
use bytes::{Buf, BufMut};

#[derive(Debug, PartialEq, thiserror::Error)]
pub enum DecodeError {
    #[error("Unexpected end of stream: needed {needed} bytes, {remaining} remaining")]
    EndOfStream { needed: usize, remaining: usize },

    #[error("Invalid presence marker {0}, expected 0 or 1")]
    InvalidPresence(i32),

    #[error("Negative length {0}")]
    NegativeLength(i32),

    #[error("Member id is not valid UTF-8: {0}")]
    InvalidUtf8(#[from] std::string::FromUtf8Error),

    #[error("Unknown replicated content type {0}")]
    UnknownContentType(u8),

    #[error("Member {0:?} listed more than once")]
    DuplicateMember(MemberId),
}

/// Fixed binary representation of a value, big-endian throughout.
pub trait Marshal: Sized {
    fn marshal<B: BufMut>(&self, buf: &mut B);

    fn unmarshal<B: Buf>(buf: &mut B) -> Result<Self, DecodeError>;
}

pub(crate) fn ensure_remaining<B: Buf>(buf: &B, needed: usize) -> Result<(), DecodeError> {
    if buf.remaining() < needed {
        return Err(DecodeError::EndOfStream {
            needed,
            remaining: buf.remaining(),
        });
    }

    Ok(())
}

pub(crate) fn get_i32<B: Buf>(buf: &mut B) -> Result<i32, DecodeError> {
    ensure_remaining(buf, 4)?;
    Ok(buf.get_i32())
}

pub(crate) fn get_i64<B: Buf>(buf: &mut B) -> Result<i64, DecodeError> {
    ensure_remaining(buf, 8)?;
    Ok(buf.get_i64())
}

/// `len: i32 | bytes`
pub(crate) fn get_length_prefixed<B: Buf>(buf: &mut B) -> Result<Vec<u8>, DecodeError> {
    let len = get_i32(buf)?;
    if len < 0 {
        return Err(DecodeError::NegativeLength(len));
    }
    let len = len as usize;
    ensure_remaining(buf, len)?;

    let mut bytes = vec![0; len];
    buf.copy_to_slice(&mut bytes);
    Ok(bytes)
}

pub(crate) fn put_length_prefixed<B: BufMut>(buf: &mut B, bytes: &[u8]) {
    buf.put_i32(bytes.len() as i32);
    buf.put_slice(bytes);
}

/// `len: i32 | utf8 bytes`
impl Marshal for MemberId {
    fn marshal<B: BufMut>(&self, buf: &mut B) {
        put_length_prefixed(buf, self.as_str().as_bytes());
    }

    fn unmarshal<B: Buf>(buf: &mut B) -> Result<Self, DecodeError> {
        let bytes = get_length_prefixed(buf)?;
        Ok(MemberId::new(String::from_utf8(bytes)?))
    }
}
