//! Read command codec: batches of remote view calls in one opaque blob.
//!
//! ```text
//! cmd:     version(2)=1 | app_cmd_label(2) | num_requests(2) | request* | compute?
//! request: version(1)=1 | app_request_label(2) | resolver_type(2)=1 | payload_size(2)
//!          | target(35) | call_data
//! compute: version(1)=1 | compute_setting(1) | target(35)
//! ```
//!
//! The command is parsed in full by the off-chain resolver. On this side only
//! the labels are ever needed, so the selective decoders read fixed offsets
//! without walking the blob. [`decode`] exists for tooling and tests.

use bytes::Bytes;
use zerocopy::{AsBytes, FromBytes};

use crate::buf::{ByteReader, ByteWriter};
use crate::wire::{
    Address, Be16, Be32, Be64, CmdHeader, ComputeHeader, EvmCallTarget, RequestHeader, WireError,
    CMD_VERSION, COMPUTE_RECORD_SIZE, COMPUTE_VERSION, MAX_CALLDATA_SIZE, REQUEST_TARGET_SIZE,
    REQUEST_VERSION, RESOLVER_TYPE_SINGLE_VIEW_EVM_CALL,
};

const CMD_HEADER_LEN: usize = core::mem::size_of::<CmdHeader>();
const REQUEST_HEADER_LEN: usize = core::mem::size_of::<RequestHeader>();

/// Which block a view call executes against.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BlockRef {
    Number(u64),
    Timestamp(u64),
}

impl BlockRef {
    /// The current wall-clock time, the usual choice for "latest state".
    pub fn now() -> Self {
        let secs = std::time::SystemTime::now()
            .duration_since(std::time::UNIX_EPOCH)
            .map(|d| d.as_secs())
            .unwrap_or(0);
        Self::Timestamp(secs)
    }

    fn is_block_num(&self) -> bool {
        matches!(self, Self::Number(_))
    }

    fn value(&self) -> u64 {
        match *self {
            Self::Number(n) | Self::Timestamp(n) => n,
        }
    }

    fn from_wire(is_block_num: u8, value: u64) -> Self {
        if is_block_num != 0 {
            Self::Number(value)
        } else {
            Self::Timestamp(value)
        }
    }
}

/// One view call against a remote chain.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CallRequest {
    pub app_request_label: u16,
    pub target_eid: u32,
    pub block: BlockRef,
    pub confirmations: u16,
    pub to: Address,
    pub call_data: Bytes,
}

/// Post-processing run by the resolver once every request has resolved.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ComputeDirective {
    pub compute_setting: u8,
    pub target_eid: u32,
    pub block: BlockRef,
    pub confirmations: u16,
    pub to: Address,
}

/// A fully parsed command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReadCommand {
    pub app_cmd_label: u16,
    pub requests: Vec<CallRequest>,
    pub compute: Option<ComputeDirective>,
}

fn target(target_eid: u32, block: BlockRef, confirmations: u16, to: Address) -> EvmCallTarget {
    EvmCallTarget {
        target_eid: Be32::new(target_eid),
        is_block_num: u8::from(block.is_block_num()),
        block_num_or_timestamp: Be64::new(block.value()),
        confirmations: Be16::new(confirmations),
        to,
    }
}

/// Encode a command.
///
/// Fails before writing anything if the request list is empty, longer than
/// the 16-bit count allows, or any request carries more call data than its
/// 16-bit payload size can describe.
pub fn encode(
    app_cmd_label: u16,
    requests: &[CallRequest],
    compute: Option<&ComputeDirective>,
) -> Result<Bytes, WireError> {
    if requests.is_empty() {
        return Err(WireError::NoRequests);
    }
    let num_requests =
        u16::try_from(requests.len()).map_err(|_| WireError::TooManyRequests(requests.len()))?;
    if let Some(oversized) = requests.iter().find(|r| r.call_data.len() > MAX_CALLDATA_SIZE) {
        return Err(WireError::CallDataTooLarge(oversized.call_data.len()));
    }

    let body: usize = requests
        .iter()
        .map(|r| REQUEST_HEADER_LEN + REQUEST_TARGET_SIZE + r.call_data.len())
        .sum();
    let compute_len = if compute.is_some() { COMPUTE_RECORD_SIZE } else { 0 };
    let mut w = ByteWriter::with_capacity(CMD_HEADER_LEN + body + compute_len);

    let header = CmdHeader {
        version: Be16::new(CMD_VERSION),
        app_cmd_label: Be16::new(app_cmd_label),
        num_requests: Be16::new(num_requests),
    };
    w.put_bytes(header.as_bytes());

    for request in requests {
        // bounded by MAX_CALLDATA_SIZE above
        let payload_size = (REQUEST_TARGET_SIZE + request.call_data.len()) as u16;
        let header = RequestHeader {
            version: REQUEST_VERSION,
            app_request_label: Be16::new(request.app_request_label),
            resolver_type: Be16::new(RESOLVER_TYPE_SINGLE_VIEW_EVM_CALL),
            payload_size: Be16::new(payload_size),
        };
        let call = target(
            request.target_eid,
            request.block,
            request.confirmations,
            request.to,
        );
        w.put_bytes(header.as_bytes())
            .put_bytes(call.as_bytes())
            .put_bytes(&request.call_data);
    }

    if let Some(compute) = compute {
        let header = ComputeHeader {
            version: COMPUTE_VERSION,
            compute_setting: compute.compute_setting,
        };
        let call = target(
            compute.target_eid,
            compute.block,
            compute.confirmations,
            compute.to,
        );
        w.put_bytes(header.as_bytes()).put_bytes(call.as_bytes());
    }

    Ok(w.freeze())
}

/// `app_cmd_label` of a command, read straight from bytes [2:4].
pub fn decode_cmd_app_label(cmd: &[u8]) -> Result<u16, WireError> {
    cmd.read_u16(2)
}

/// `num_requests` of a command, read straight from bytes [4:6].
pub fn decode_num_requests(cmd: &[u8]) -> Result<u16, WireError> {
    cmd.read_u16(4)
}

/// `app_request_label` of a request record. `request` must start at the
/// record's version byte.
pub fn decode_request_app_request_label(request: &[u8]) -> Result<u16, WireError> {
    request.read_u16(1)
}

fn read_target(blob: &[u8], offset: usize) -> Result<EvmCallTarget, WireError> {
    let raw = blob.read_slice(offset, REQUEST_TARGET_SIZE)?;
    EvmCallTarget::read_from(raw).ok_or(WireError::Truncated {
        offset,
        need: REQUEST_TARGET_SIZE,
        have: raw.len(),
    })
}

/// Parse a whole command.
///
/// Anything left after the requests must be exactly one compute record.
pub fn decode(cmd: &[u8]) -> Result<ReadCommand, WireError> {
    let raw = cmd.read_slice(0, CMD_HEADER_LEN)?;
    let header = CmdHeader::read_from(raw).ok_or(WireError::Truncated {
        offset: 0,
        need: CMD_HEADER_LEN,
        have: cmd.len(),
    })?;
    if header.version.get() != CMD_VERSION {
        return Err(WireError::UnsupportedVersion {
            what: "command",
            version: header.version.get(),
        });
    }
    let num_requests = header.num_requests.get() as usize;
    if num_requests == 0 {
        return Err(WireError::NoRequests);
    }

    let mut cursor = CMD_HEADER_LEN;
    let mut requests = Vec::with_capacity(num_requests);
    for _ in 0..num_requests {
        let raw = cmd.read_slice(cursor, REQUEST_HEADER_LEN)?;
        let header = RequestHeader::read_from(raw).ok_or(WireError::Truncated {
            offset: cursor,
            need: REQUEST_HEADER_LEN,
            have: raw.len(),
        })?;
        if header.version != REQUEST_VERSION {
            return Err(WireError::UnsupportedVersion {
                what: "request",
                version: u16::from(header.version),
            });
        }
        let resolver_type = header.resolver_type.get();
        if resolver_type != RESOLVER_TYPE_SINGLE_VIEW_EVM_CALL {
            return Err(WireError::UnsupportedResolver(resolver_type));
        }
        let payload_size = header.payload_size.get() as usize;
        if payload_size < REQUEST_TARGET_SIZE {
            return Err(WireError::Truncated {
                offset: cursor + REQUEST_HEADER_LEN,
                need: REQUEST_TARGET_SIZE,
                have: payload_size,
            });
        }
        cursor += REQUEST_HEADER_LEN;

        let call = read_target(cmd, cursor)?;
        let call_data = cmd.read_slice(
            cursor + REQUEST_TARGET_SIZE,
            payload_size - REQUEST_TARGET_SIZE,
        )?;
        cursor += payload_size;

        requests.push(CallRequest {
            app_request_label: header.app_request_label.get(),
            target_eid: call.target_eid.get(),
            block: BlockRef::from_wire(call.is_block_num, call.block_num_or_timestamp.get()),
            confirmations: call.confirmations.get(),
            to: call.to,
            call_data: Bytes::copy_from_slice(call_data),
        });
    }

    let compute = match cmd.len() - cursor {
        0 => None,
        COMPUTE_RECORD_SIZE => {
            let version = cmd.read_u8(cursor)?;
            if version != COMPUTE_VERSION {
                return Err(WireError::UnsupportedVersion {
                    what: "compute",
                    version: u16::from(version),
                });
            }
            let compute_setting = cmd.read_u8(cursor + 1)?;
            let call = read_target(cmd, cursor + core::mem::size_of::<ComputeHeader>())?;
            Some(ComputeDirective {
                compute_setting,
                target_eid: call.target_eid.get(),
                block: BlockRef::from_wire(call.is_block_num, call.block_num_or_timestamp.get()),
                confirmations: call.confirmations.get(),
                to: call.to,
            })
        }
        extra => return Err(WireError::TrailingBytes(extra)),
    };

    Ok(ReadCommand {
        app_cmd_label: header.app_cmd_label.get(),
        requests,
        compute,
    })
}

impl ReadCommand {
    pub fn encode(&self) -> Result<Bytes, WireError> {
        encode(self.app_cmd_label, &self.requests, self.compute.as_ref())
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
