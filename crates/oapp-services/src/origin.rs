//! Inbound origin checks against the peer table.

use crate::error::OAppError;
use crate::peer::{PeerAddress, PeerTable};

/// What an inbound packet claims about where it came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Origin<A> {
    pub src_eid: u32,
    pub sender: A,
    pub nonce: u64,
}

/// Accept only packets whose sender is the configured peer for `src_eid`.
///
/// `NoPeer` takes precedence over `InvalidSender`. Whether the caller is
/// the endpoint is checked by the OApp before this runs.
pub fn validate<A: PeerAddress>(table: &PeerTable<A>, origin: &Origin<A>) -> Result<(), OAppError> {
    let peer = table.get_peer_or_revert(origin.src_eid)?;
    if peer != origin.sender {
        tracing::warn!(
            src_eid = origin.src_eid,
            sender = hex::encode(origin.sender),
            nonce = origin.nonce,
            "rejected origin: sender is not the configured peer"
        );
        return Err(OAppError::InvalidSender {
            src_eid: origin.src_eid,
            sender: hex::encode(origin.sender),
        });
    }
    Ok(())
}

/// Whether the endpoint may open a new nonce sequence for this origin.
/// Same checks as [`validate`] without the error: an unset eid is never
/// allowed, even for a zero sender.
pub fn allow_initialize_path<A: PeerAddress>(table: &PeerTable<A>, origin: &Origin<A>) -> bool {
    table
        .get_peer_or_revert(origin.src_eid)
        .map_or(false, |peer| peer == origin.sender)
}
