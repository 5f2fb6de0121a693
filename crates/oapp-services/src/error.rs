//! Error taxonomy for the stateful OApp pieces.
//!
//! Every variant is a distinct signal callers can match on. Any operation
//! returning one of these has left all state exactly as it found it.

use oapp_core::wire::WireError;

use crate::endpoint::EndpointError;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum OAppError {
    /// No trusted peer is configured for this endpoint id.
    #[error("no peer configured for eid {0}")]
    NoPeer(u32),

    /// A peer is configured but the claimed sender is not it.
    #[error("invalid sender {sender} for eid {src_eid}")]
    InvalidSender { src_eid: u32, sender: String },

    /// Administrative call from someone other than the owner.
    #[error("caller {0} is not the owner")]
    Unauthorized(String),

    /// lz_receive called by something other than the endpoint.
    #[error("caller {0} is not the endpoint")]
    OnlyEndpoint(String),

    #[error("native fee {required} not matched by attached value {provided}")]
    NotEnoughNative { required: u128, provided: u128 },

    #[error("paying fees in the LZ token is not supported")]
    LzTokenUnsupported,

    #[error(transparent)]
    Wire(#[from] WireError),

    #[error(transparent)]
    Endpoint(#[from] EndpointError),
}
