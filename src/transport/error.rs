use crate::consensus::MemberId;
use tonic::codegen::http::uri;

#[derive(thiserror::Error, Debug)]
pub enum TransportError {
    #[error("invalid address '{address}' for member {member}")]
    InvalidAddress {
        member: MemberId,
        address: String,
        #[source]
        source: uri::InvalidUri,
    },
    #[error("malformed message: {0}")]
    Malformed(&'static str),
}
