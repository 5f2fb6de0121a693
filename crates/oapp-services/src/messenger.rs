//! Messenger: example OApp that sends text and issues read requests.
//!
//! Inbound packets land in an [`Inbox`]: anything arriving on a read channel
//! is a read response, everything else a regular message. Value attached
//! beyond the quoted fee stays with the messenger until the owner withdraws
//! it.

use bytes::Bytes;
use oapp_core::config::OAppConfig;
use oapp_core::options::{default_message_options, lz_read_options};
use oapp_core::read_cmd::{self, BlockRef, CallRequest};
use oapp_core::wire::{address_to_bytes32, Address, Bytes32};

use crate::endpoint::{Endpoint, MessagingFee, MessagingReceipt};
use crate::error::OAppError;
use crate::oapp::{is_read_channel, MessageHandler, OApp, SendContext};
use crate::origin::Origin;

/// Label every request built by [`Messenger::request_read`] carries.
pub const READ_REQUEST_LABEL: u16 = 1;

/// A delivered packet as the inbox stores it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReceivedMessage {
    pub src_eid: u32,
    pub sender: Bytes32,
    pub nonce: u64,
    pub guid: [u8; 32],
    pub payload: Bytes,
}

impl ReceivedMessage {
    /// Payload as text, lossily.
    pub fn text(&self) -> String {
        String::from_utf8_lossy(&self.payload).into_owned()
    }
}

/// Delivered messages and read responses, oldest first.
#[derive(Debug, Clone, Default)]
pub struct Inbox {
    messages: Vec<ReceivedMessage>,
    read_responses: Vec<ReceivedMessage>,
}

impl Inbox {
    pub fn messages(&self) -> &[ReceivedMessage] {
        &self.messages
    }

    pub fn read_responses(&self) -> &[ReceivedMessage] {
        &self.read_responses
    }
}

impl MessageHandler for Inbox {
    fn handle_message(
        &mut self,
        origin: &Origin<Bytes32>,
        guid: &[u8; 32],
        message: &[u8],
        _executor: &Address,
        _extra_data: &[u8],
    ) -> Result<(), OAppError> {
        let received = ReceivedMessage {
            src_eid: origin.src_eid,
            sender: origin.sender,
            nonce: origin.nonce,
            guid: *guid,
            payload: Bytes::copy_from_slice(message),
        };
        if is_read_channel(origin.src_eid) {
            tracing::info!(channel = origin.src_eid, bytes = message.len(), "read response received");
            self.read_responses.push(received);
        } else {
            tracing::info!(src_eid = origin.src_eid, bytes = message.len(), "message received");
            self.messages.push(received);
        }
        Ok(())
    }
}

/// Parameters of a single view call for [`Messenger::request_read`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReadQuery {
    pub target_eid: u32,
    pub to: Address,
    pub call_data: Bytes,
    /// Block to read at. `None` reads at the current timestamp.
    pub block: Option<BlockRef>,
}

pub struct Messenger<E: Endpoint> {
    oapp: OApp<E>,
    inbox: Inbox,
    default_gas_limit: u128,
    read_channel: u32,
    read_gas_limit: u128,
    read_confirmations: u16,
    read_response_size: u32,
    balance: u128,
}

impl<E: Endpoint> Messenger<E> {
    pub fn new(oapp: OApp<E>, config: &OAppConfig) -> Self {
        Self {
            oapp,
            inbox: Inbox::default(),
            default_gas_limit: u128::from(config.messaging.default_gas_limit),
            read_channel: config.read.channel,
            read_gas_limit: u128::from(config.read.gas_limit),
            read_confirmations: config.read.confirmations,
            read_response_size: config.read.response_size,
            balance: 0,
        }
    }

    pub fn oapp(&self) -> &OApp<E> {
        &self.oapp
    }

    pub fn oapp_mut(&mut self) -> &mut OApp<E> {
        &mut self.oapp
    }

    pub fn inbox(&self) -> &Inbox {
        &self.inbox
    }

    pub fn default_gas_limit(&self) -> u128 {
        self.default_gas_limit
    }

    /// Channel used by [`Messenger::request_default_read`].
    pub fn read_channel(&self) -> u32 {
        self.read_channel
    }

    /// Native value held by the messenger.
    pub fn balance(&self) -> u128 {
        self.balance
    }

    pub fn set_default_gas(&mut self, caller: &Address, gas: u128) -> Result<(), OAppError> {
        self.oapp.only_owner(caller)?;
        self.default_gas_limit = gas;
        tracing::info!(gas, "default gas limit set");
        Ok(())
    }

    // ── Messages ──────────────────────────────────────────────────────────────

    fn message_options(&self) -> Result<Vec<u8>, OAppError> {
        Ok(default_message_options(self.default_gas_limit)?
            .as_bytes()
            .to_vec())
    }

    pub fn quote_message_fee(&self, dst_eid: u32, text: &str) -> Result<MessagingFee, OAppError> {
        self.oapp
            .quote(dst_eid, text.as_bytes(), &self.message_options()?, false)
    }

    /// Send `text` to the peer on `dst_eid`. The attached value must cover
    /// the quote; any surplus is kept.
    pub fn send_message(
        &mut self,
        ctx: &SendContext,
        dst_eid: u32,
        text: &str,
    ) -> Result<MessagingReceipt, OAppError> {
        let options = self.message_options()?;
        let fee = self.oapp.quote(dst_eid, text.as_bytes(), &options, false)?;
        self.pay_and_send(ctx, dst_eid, text.as_bytes(), &options, fee)
    }

    // ── Reads ─────────────────────────────────────────────────────────────────

    fn read_message(&self, query: &ReadQuery) -> Result<Bytes, OAppError> {
        let request = CallRequest {
            app_request_label: READ_REQUEST_LABEL,
            target_eid: query.target_eid,
            block: query.block.unwrap_or_else(BlockRef::now),
            confirmations: self.read_confirmations,
            to: query.to,
            call_data: query.call_data.clone(),
        };
        Ok(read_cmd::encode(0, &[request], None)?)
    }

    fn read_options(&self) -> Result<Vec<u8>, OAppError> {
        Ok(lz_read_options(self.read_gas_limit, self.read_response_size)?
            .as_bytes()
            .to_vec())
    }

    pub fn quote_read_fee(&self, channel: u32, query: &ReadQuery) -> Result<MessagingFee, OAppError> {
        let message = self.read_message(query)?;
        self.oapp
            .quote(channel, &message, &self.read_options()?, false)
    }

    /// Issue a one-request read command on `channel`. The channel must have
    /// been activated with [`OApp::set_read_channel`].
    pub fn request_read(
        &mut self,
        ctx: &SendContext,
        channel: u32,
        query: &ReadQuery,
    ) -> Result<MessagingReceipt, OAppError> {
        let message = self.read_message(query)?;
        let options = self.read_options()?;
        let fee = self.oapp.quote(channel, &message, &options, false)?;
        let receipt = self.pay_and_send(ctx, channel, &message, &options, fee)?;
        tracing::info!(
            channel,
            target_eid = query.target_eid,
            to = hex::encode(query.to),
            "read requested"
        );
        Ok(receipt)
    }

    pub fn quote_default_read_fee(&self, query: &ReadQuery) -> Result<MessagingFee, OAppError> {
        self.quote_read_fee(self.read_channel, query)
    }

    /// [`Messenger::request_read`] on the configured read channel.
    pub fn request_default_read(
        &mut self,
        ctx: &SendContext,
        query: &ReadQuery,
    ) -> Result<MessagingReceipt, OAppError> {
        self.request_read(ctx, self.read_channel, query)
    }

    fn pay_and_send(
        &mut self,
        ctx: &SendContext,
        dst_eid: u32,
        message: &[u8],
        options: &[u8],
        fee: MessagingFee,
    ) -> Result<MessagingReceipt, OAppError> {
        if ctx.value < fee.native_fee {
            return Err(OAppError::NotEnoughNative {
                required: fee.native_fee,
                provided: ctx.value,
            });
        }
        let pay = SendContext {
            caller: ctx.caller,
            value: fee.native_fee,
        };
        let receipt = self
            .oapp
            .lz_send(&pay, dst_eid, message, options, fee, &ctx.caller)?;
        self.balance += ctx.value - fee.native_fee;
        Ok(receipt)
    }

    /// Withdraw held value to the owner. Returns the amount withdrawn.
    pub fn withdraw(&mut self, caller: &Address, amount: u128) -> Result<u128, OAppError> {
        self.oapp.only_owner(caller)?;
        if amount > self.balance {
            return Err(OAppError::NotEnoughNative {
                required: amount,
                provided: self.balance,
            });
        }
        self.balance -= amount;
        tracing::info!(amount, remaining = self.balance, "balance withdrawn");
        Ok(amount)
    }

    /// Top up held value, e.g. native drops or direct transfers.
    pub fn deposit(&mut self, amount: u128) {
        self.balance += amount;
    }

    // ── Receiving ─────────────────────────────────────────────────────────────

    pub fn lz_receive(
        &mut self,
        caller: &Address,
        origin: &Origin<Bytes32>,
        guid: &[u8; 32],
        message: &[u8],
        executor: &Address,
        extra_data: &[u8],
    ) -> Result<(), OAppError> {
        self.oapp
            .lz_receive(&mut self.inbox, caller, origin, guid, message, executor, extra_data)
    }

    /// This messenger's own address in peer form.
    pub fn as_peer(&self) -> Bytes32 {
        address_to_bytes32(&self.oapp.address())
    }
}
