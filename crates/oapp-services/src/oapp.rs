//! OApp: the owner-administered application sitting on an endpoint.
//!
//! Outbound: resolve the destination peer, merge enforced options, pay the
//! quoted fee and hand the packet to the endpoint. Inbound: only the
//! endpoint may deliver, and only from the configured peer. Accepted
//! packets are forwarded untouched to a [`MessageHandler`].

use std::collections::HashMap;

use bytes::Bytes;
use oapp_core::options::{combine_options, Options};
use oapp_core::wire::{address_to_bytes32, Address, Bytes32};

use crate::endpoint::{Endpoint, MessagingFee, MessagingParams, MessagingReceipt};
use crate::error::OAppError;
use crate::origin::{self, Origin};
use crate::peer::{PeerTable, PeerTransition};

/// Channel ids at or above this are read channels, not chains.
pub const READ_CHANNEL_THRESHOLD: u32 = 4_294_965_694;

/// Default read channel id.
pub const LZ_READ_CHANNEL: u32 = 4_294_967_294;

pub const SENDER_VERSION: u64 = 1;
pub const RECEIVER_VERSION: u64 = 2;

pub fn is_read_channel(eid: u32) -> bool {
    eid >= READ_CHANNEL_THRESHOLD
}

/// Who is calling and how much native value they attached.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SendContext {
    pub caller: Address,
    pub value: u128,
}

/// Application logic behind an OApp. Only sees packets that passed the
/// endpoint and origin checks.
pub trait MessageHandler {
    fn handle_message(
        &mut self,
        origin: &Origin<Bytes32>,
        guid: &[u8; 32],
        message: &[u8],
        executor: &Address,
        extra_data: &[u8],
    ) -> Result<(), OAppError>;
}

/// An OApp bound to one endpoint.
pub struct OApp<E: Endpoint> {
    address: Address,
    owner: Address,
    endpoint: E,
    peers: PeerTable<Bytes32>,
    enforced_options: HashMap<u32, Bytes>,
}

impl<E: Endpoint> OApp<E> {
    pub fn new(address: Address, owner: Address, endpoint: E) -> Self {
        Self {
            address,
            owner,
            endpoint,
            peers: PeerTable::new(),
            enforced_options: HashMap::new(),
        }
    }

    /// Use a pre-loaded (possibly persistent) peer table.
    pub fn with_peers(mut self, peers: PeerTable<Bytes32>) -> Self {
        self.peers = peers;
        self
    }

    pub fn address(&self) -> Address {
        self.address
    }

    pub fn owner(&self) -> Address {
        self.owner
    }

    pub fn endpoint(&self) -> &E {
        &self.endpoint
    }

    pub fn endpoint_mut(&mut self) -> &mut E {
        &mut self.endpoint
    }

    pub fn peers(&self) -> &PeerTable<Bytes32> {
        &self.peers
    }

    pub fn peer(&self, eid: u32) -> Bytes32 {
        self.peers.peer(eid)
    }

    pub fn oapp_version(&self) -> (u64, u64) {
        (SENDER_VERSION, RECEIVER_VERSION)
    }

    pub(crate) fn only_owner(&self, caller: &Address) -> Result<(), OAppError> {
        if *caller != self.owner {
            tracing::warn!(caller = hex::encode(caller), "rejected admin call from non-owner");
            return Err(OAppError::Unauthorized(hex::encode(caller)));
        }
        Ok(())
    }

    // ── Administration ────────────────────────────────────────────────────────

    pub fn set_peer(
        &mut self,
        caller: &Address,
        eid: u32,
        peer: Bytes32,
    ) -> Result<PeerTransition<Bytes32>, OAppError> {
        self.only_owner(caller)?;
        Ok(self.peers.set_peer(eid, peer))
    }

    /// Apply several peer updates as one unit.
    pub fn set_peers(
        &mut self,
        caller: &Address,
        peers: &[(u32, Bytes32)],
    ) -> Result<Vec<(u32, PeerTransition<Bytes32>)>, OAppError> {
        self.only_owner(caller)?;
        let mut txn = self.peers.begin();
        for &(eid, peer) in peers {
            txn.set_peer(eid, peer);
        }
        Ok(txn.commit())
    }

    /// Activate a read channel by trusting ourselves on it, or deactivate it
    /// by clearing the entry.
    pub fn set_read_channel(
        &mut self,
        caller: &Address,
        channel: u32,
        active: bool,
    ) -> Result<PeerTransition<Bytes32>, OAppError> {
        self.only_owner(caller)?;
        let peer = if active {
            address_to_bytes32(&self.address)
        } else {
            [0u8; 32]
        };
        tracing::info!(channel, active, "read channel toggled");
        Ok(self.peers.set_peer(channel, peer))
    }

    pub fn set_delegate(&mut self, caller: &Address, delegate: &Address) -> Result<(), OAppError> {
        self.only_owner(caller)?;
        self.endpoint.set_delegate(&self.address, delegate)?;
        tracing::info!(delegate = hex::encode(delegate), "delegate set");
        Ok(())
    }

    pub fn transfer_ownership(
        &mut self,
        caller: &Address,
        new_owner: Address,
    ) -> Result<(), OAppError> {
        self.only_owner(caller)?;
        tracing::info!(
            previous = hex::encode(self.owner),
            owner = hex::encode(new_owner),
            "ownership transferred"
        );
        self.owner = new_owner;
        Ok(())
    }

    /// Options prepended to every send towards `eid`. Empty clears them.
    pub fn set_enforced_options(
        &mut self,
        caller: &Address,
        eid: u32,
        options: &[u8],
    ) -> Result<(), OAppError> {
        self.only_owner(caller)?;
        if options.is_empty() {
            self.enforced_options.remove(&eid);
            tracing::info!(eid, "enforced options cleared");
            return Ok(());
        }
        let options = Options::from_bytes(options)?;
        tracing::info!(eid, bytes = options.len(), "enforced options set");
        self.enforced_options.insert(eid, options.into_bytes());
        Ok(())
    }

    pub fn enforced_options(&self, eid: u32) -> &[u8] {
        self.enforced_options
            .get(&eid)
            .map(|b| b.as_ref())
            .unwrap_or(&[])
    }

    /// Enforced options for `eid` merged with the caller's.
    pub fn combine_options(&self, eid: u32, extra: &[u8]) -> Result<Bytes, OAppError> {
        Ok(Bytes::from(combine_options(self.enforced_options(eid), extra)?))
    }

    // ── Sending ───────────────────────────────────────────────────────────────

    fn params(
        &self,
        dst_eid: u32,
        message: &[u8],
        options: &[u8],
        pay_in_lz_token: bool,
    ) -> Result<MessagingParams, OAppError> {
        Ok(MessagingParams {
            dst_eid,
            receiver: self.peers.get_peer_or_revert(dst_eid)?,
            message: Bytes::copy_from_slice(message),
            options: self.combine_options(dst_eid, options)?,
            pay_in_lz_token,
        })
    }

    pub fn quote(
        &self,
        dst_eid: u32,
        message: &[u8],
        options: &[u8],
        pay_in_lz_token: bool,
    ) -> Result<MessagingFee, OAppError> {
        let params = self.params(dst_eid, message, options, pay_in_lz_token)?;
        Ok(self.endpoint.quote(&params, &self.address)?)
    }

    /// Send with an already-quoted fee. The attached value must equal the
    /// native fee exactly and LZ token payment is not supported.
    pub fn lz_send(
        &mut self,
        ctx: &SendContext,
        dst_eid: u32,
        message: &[u8],
        options: &[u8],
        fee: MessagingFee,
        refund: &Address,
    ) -> Result<MessagingReceipt, OAppError> {
        if ctx.value != fee.native_fee {
            return Err(OAppError::NotEnoughNative {
                required: fee.native_fee,
                provided: ctx.value,
            });
        }
        if fee.lz_token_fee > 0 {
            return Err(OAppError::LzTokenUnsupported);
        }

        let params = self.params(dst_eid, message, options, false)?;
        let receipt = self.endpoint.send(params, fee, refund, &self.address)?;
        tracing::info!(
            dst_eid,
            nonce = receipt.nonce,
            guid = hex::encode(receipt.guid),
            native_fee = receipt.fee.native_fee,
            "message sent"
        );
        Ok(receipt)
    }

    // ── Receiving ─────────────────────────────────────────────────────────────

    /// Entry point the endpoint calls to deliver a packet.
    #[allow(clippy::too_many_arguments)]
    pub fn lz_receive<H: MessageHandler>(
        &self,
        handler: &mut H,
        caller: &Address,
        origin: &Origin<Bytes32>,
        guid: &[u8; 32],
        message: &[u8],
        executor: &Address,
        extra_data: &[u8],
    ) -> Result<(), OAppError> {
        if *caller != self.endpoint.address() {
            tracing::warn!(caller = hex::encode(caller), "rejected delivery from non-endpoint");
            return Err(OAppError::OnlyEndpoint(hex::encode(caller)));
        }
        origin::validate(&self.peers, origin)?;

        tracing::debug!(
            src_eid = origin.src_eid,
            nonce = origin.nonce,
            guid = hex::encode(guid),
            bytes = message.len(),
            "message received"
        );
        handler.handle_message(origin, guid, message, executor, extra_data)
    }

    pub fn allow_initialize_path(&self, origin: &Origin<Bytes32>) -> bool {
        origin::allow_initialize_path(&self.peers, origin)
    }

    /// Always 0: this OApp does not enforce ordered nonces.
    pub fn next_nonce(&self, _src_eid: u32, _sender: &Bytes32) -> u64 {
        0
    }

    /// Compose messages are only accepted from this OApp itself.
    pub fn is_compose_msg_sender(
        &self,
        _origin: &Origin<Bytes32>,
        _message: &[u8],
        sender: &Address,
    ) -> bool {
        *sender == self.address
    }
}
