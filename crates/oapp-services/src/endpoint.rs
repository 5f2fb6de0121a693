//! Messaging endpoint collaborator.
//!
//! The real endpoint (fee quoting, transport, settlement) lives outside this
//! workspace. OApps talk to it through [`Endpoint`]. [`LoopbackEndpoint`] is
//! an in-memory stand-in with a linear fee model that records every packet
//! it is asked to send, for tests and dry runs.

use std::collections::HashMap;

use bytes::Bytes;
use oapp_core::options::decode_options;
use oapp_core::wire::{address_to_bytes32, Address, Bytes32, WireError};

use crate::origin::Origin;

/// What an OApp hands the endpoint for quoting and sending.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MessagingParams {
    pub dst_eid: u32,
    pub receiver: Bytes32,
    pub message: Bytes,
    pub options: Bytes,
    pub pay_in_lz_token: bool,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MessagingFee {
    pub native_fee: u128,
    pub lz_token_fee: u128,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MessagingReceipt {
    pub guid: [u8; 32],
    pub nonce: u64,
    pub fee: MessagingFee,
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum EndpointError {
    #[error("fee {supplied} below quoted {required}")]
    InsufficientFee { required: u128, supplied: u128 },

    #[error("no LZ token configured on this endpoint")]
    LzTokenUnavailable,

    #[error("invalid options: {0}")]
    InvalidOptions(WireError),
}

/// The endpoint operations an OApp depends on.
pub trait Endpoint {
    /// Endpoint id of the local chain.
    fn eid(&self) -> u32;

    /// Address the endpoint calls `lz_receive` from.
    fn address(&self) -> Address;

    fn quote(&self, params: &MessagingParams, sender: &Address)
        -> Result<MessagingFee, EndpointError>;

    fn send(
        &mut self,
        params: MessagingParams,
        fee: MessagingFee,
        refund: &Address,
        sender: &Address,
    ) -> Result<MessagingReceipt, EndpointError>;

    fn set_delegate(&mut self, oapp: &Address, delegate: &Address) -> Result<(), EndpointError>;
}

// ── Loopback ──────────────────────────────────────────────────────────────────

/// A packet accepted by [`LoopbackEndpoint::send`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutboundPacket {
    pub guid: [u8; 32],
    pub nonce: u64,
    pub src_eid: u32,
    pub sender: Address,
    pub dst_eid: u32,
    pub receiver: Bytes32,
    pub message: Bytes,
    pub options: Bytes,
    pub fee: MessagingFee,
}

impl OutboundPacket {
    /// The origin a receiving OApp sees for this packet.
    pub fn origin(&self) -> Origin<Bytes32> {
        Origin {
            src_eid: self.src_eid,
            sender: address_to_bytes32(&self.sender),
            nonce: self.nonce,
        }
    }
}

/// `native_fee = base + per_byte * (message + options)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FeeModel {
    pub base: u128,
    pub per_byte: u128,
    /// Flat LZ token fee. `None` = no LZ token on this endpoint.
    pub lz_token: Option<u128>,
}

impl Default for FeeModel {
    fn default() -> Self {
        Self {
            base: 1_000_000_000_000,
            per_byte: 1_000_000_000,
            lz_token: None,
        }
    }
}

type PathKey = (Address, u32, Bytes32);

/// In-memory endpoint.
#[derive(Debug, Clone)]
pub struct LoopbackEndpoint {
    eid: u32,
    address: Address,
    fees: FeeModel,
    nonces: HashMap<PathKey, u64>,
    delegates: HashMap<Address, Address>,
    outbox: Vec<OutboundPacket>,
}

impl LoopbackEndpoint {
    pub fn new(eid: u32, address: Address) -> Self {
        Self {
            eid,
            address,
            fees: FeeModel::default(),
            nonces: HashMap::new(),
            delegates: HashMap::new(),
            outbox: Vec::new(),
        }
    }

    pub fn with_fees(mut self, fees: FeeModel) -> Self {
        self.fees = fees;
        self
    }

    /// Packets sent so far, oldest first.
    pub fn outbox(&self) -> &[OutboundPacket] {
        &self.outbox
    }

    /// Remove and return every recorded packet.
    pub fn drain_outbox(&mut self) -> Vec<OutboundPacket> {
        std::mem::take(&mut self.outbox)
    }

    pub fn delegate(&self, oapp: &Address) -> Option<Address> {
        self.delegates.get(oapp).copied()
    }

    /// Last nonce used on a path, 0 if nothing was sent yet.
    pub fn outbound_nonce(&self, sender: &Address, dst_eid: u32, receiver: &Bytes32) -> u64 {
        self.nonces
            .get(&(*sender, dst_eid, *receiver))
            .copied()
            .unwrap_or(0)
    }

    fn guid(&self, nonce: u64, sender: &Address, dst_eid: u32, receiver: &Bytes32) -> [u8; 32] {
        let mut h = blake3::Hasher::new();
        h.update(&nonce.to_be_bytes());
        h.update(&self.eid.to_be_bytes());
        h.update(&address_to_bytes32(sender));
        h.update(&dst_eid.to_be_bytes());
        h.update(receiver);
        *h.finalize().as_bytes()
    }
}

impl Endpoint for LoopbackEndpoint {
    fn eid(&self) -> u32 {
        self.eid
    }

    fn address(&self) -> Address {
        self.address
    }

    fn quote(
        &self,
        params: &MessagingParams,
        _sender: &Address,
    ) -> Result<MessagingFee, EndpointError> {
        if !params.options.is_empty() {
            decode_options(&params.options).map_err(EndpointError::InvalidOptions)?;
        }
        let lz_token_fee = match (params.pay_in_lz_token, self.fees.lz_token) {
            (false, _) => 0,
            (true, Some(fee)) => fee,
            (true, None) => return Err(EndpointError::LzTokenUnavailable),
        };
        let bytes = (params.message.len() + params.options.len()) as u128;
        Ok(MessagingFee {
            native_fee: self.fees.base + self.fees.per_byte * bytes,
            lz_token_fee,
        })
    }

    fn send(
        &mut self,
        params: MessagingParams,
        fee: MessagingFee,
        _refund: &Address,
        sender: &Address,
    ) -> Result<MessagingReceipt, EndpointError> {
        let required = self.quote(&params, sender)?;
        if fee.native_fee < required.native_fee {
            return Err(EndpointError::InsufficientFee {
                required: required.native_fee,
                supplied: fee.native_fee,
            });
        }
        if fee.lz_token_fee < required.lz_token_fee {
            return Err(EndpointError::InsufficientFee {
                required: required.lz_token_fee,
                supplied: fee.lz_token_fee,
            });
        }

        let key = (*sender, params.dst_eid, params.receiver);
        let nonce = self.nonces.get(&key).copied().unwrap_or(0) + 1;
        let guid = self.guid(nonce, sender, params.dst_eid, &params.receiver);
        self.nonces.insert(key, nonce);

        tracing::debug!(
            dst_eid = params.dst_eid,
            nonce,
            guid = hex::encode(&guid[..8]),
            bytes = params.message.len(),
            "loopback packet sent"
        );

        self.outbox.push(OutboundPacket {
            guid,
            nonce,
            src_eid: self.eid,
            sender: *sender,
            dst_eid: params.dst_eid,
            receiver: params.receiver,
            message: params.message,
            options: params.options,
            fee: required,
        });

        Ok(MessagingReceipt {
            guid,
            nonce,
            fee: required,
        })
    }

    fn set_delegate(&mut self, oapp: &Address, delegate: &Address) -> Result<(), EndpointError> {
        self.delegates.insert(*oapp, *delegate);
        Ok(())
    }
}
