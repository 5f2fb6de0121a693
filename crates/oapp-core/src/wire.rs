//! OApp wire format: fixed-layout headers and protocol constants.
//!
//! These types ARE the protocol. Every field width here must match what the
//! executors, DVNs and read resolvers on the other side of the endpoint
//! expect byte for byte. All multi-byte integers are big-endian.
//!
//! Header types are #[repr(C, packed)] with zerocopy derives so they can be
//! written and read without hand-rolled offset arithmetic. There is no
//! unsafe code in this module.

use static_assertions::assert_eq_size;
use zerocopy::byteorder::{BigEndian, U16, U32, U64};
use zerocopy::{AsBytes, FromBytes, FromZeroes};

pub type Be16 = U16<BigEndian>;
pub type Be32 = U32<BigEndian>;
pub type Be64 = U64<BigEndian>;

/// 20-byte EVM-style contract address.
pub type Address = [u8; 20];

/// 32-byte universal address. EVM addresses are left-padded with zeros.
pub type Bytes32 = [u8; 32];

/// Left-pad a 20-byte address into the 32-byte universal form.
pub fn address_to_bytes32(address: &Address) -> Bytes32 {
    let mut out = [0u8; 32];
    out[12..].copy_from_slice(address);
    out
}

/// Recover a 20-byte address from its universal form.
/// Returns None if the upper 12 bytes are not zero.
pub fn bytes32_to_address(value: &Bytes32) -> Option<Address> {
    if value[..12].iter().any(|b| *b != 0) {
        return None;
    }
    let mut out = [0u8; 20];
    out.copy_from_slice(&value[12..]);
    Some(out)
}

// ── Options ───────────────────────────────────────────────────────────────────

/// Options format tag. Type 1 and 2 are legacy executor-only encodings.
pub const OPTIONS_TYPE_3: u16 = 3;

pub const EXECUTOR_WORKER_ID: u8 = 1;
pub const DVN_WORKER_ID: u8 = 2;

pub const OPTION_TYPE_LZRECEIVE: u8 = 1;
pub const OPTION_TYPE_NATIVE_DROP: u8 = 2;
pub const OPTION_TYPE_LZCOMPOSE: u8 = 3;
pub const OPTION_TYPE_ORDERED_EXECUTION: u8 = 4;
pub const OPTION_TYPE_LZREAD: u8 = 5;

pub const DVN_OPTION_TYPE_PRECRIME: u8 = 1;

/// Ceiling on the whole options blob, header included.
pub const MAX_OPTIONS_TOTAL_SIZE: usize = 512;

/// Ceiling on a single record's `size` field (option type + option data).
pub const MAX_OPTION_SINGLE_SIZE: usize = 64;

/// Leading 2 bytes of every type-3 options blob.
///
/// Wire size: 2 bytes.
#[derive(Debug, Clone, AsBytes, FromBytes, FromZeroes)]
#[repr(C, packed)]
pub struct OptionsHeader {
    pub format: Be16,
}

assert_eq_size!(OptionsHeader, [u8; 2]);

/// Prefix of an executor option record.
///
/// `size` counts `option_type` plus the option data, not the worker id or
/// the size field itself.
///
/// Wire size: 4 bytes.
#[derive(Debug, Clone, AsBytes, FromBytes, FromZeroes)]
#[repr(C, packed)]
pub struct ExecutorOptionHeader {
    pub worker_id: u8,
    pub size: Be16,
    pub option_type: u8,
}

assert_eq_size!(ExecutorOptionHeader, [u8; 4]);

/// Prefix of a DVN option record. `size` counts `dvn_idx`, `option_type`
/// and the option data.
///
/// Wire size: 5 bytes.
#[derive(Debug, Clone, AsBytes, FromBytes, FromZeroes)]
#[repr(C, packed)]
pub struct DvnOptionHeader {
    pub worker_id: u8,
    pub size: Be16,
    pub dvn_idx: u8,
    pub option_type: u8,
}

assert_eq_size!(DvnOptionHeader, [u8; 5]);

/// Bytes of an executor record header that are not counted by `size`.
pub const EXECUTOR_RECORD_OVERHEAD: usize = 3;

// ── Read commands ─────────────────────────────────────────────────────────────

pub const CMD_VERSION: u16 = 1;
pub const REQUEST_VERSION: u8 = 1;
pub const COMPUTE_VERSION: u8 = 1;

/// Resolver type for a single EVM view call.
pub const RESOLVER_TYPE_SINGLE_VIEW_EVM_CALL: u16 = 1;

pub const COMPUTE_SETTING_MAP_ONLY: u8 = 0;
pub const COMPUTE_SETTING_REDUCE_ONLY: u8 = 1;
pub const COMPUTE_SETTING_MAP_REDUCE: u8 = 2;

/// Command header.
///
/// Wire size: 6 bytes.
#[derive(Debug, Clone, AsBytes, FromBytes, FromZeroes)]
#[repr(C, packed)]
pub struct CmdHeader {
    pub version: Be16,
    pub app_cmd_label: Be16,
    pub num_requests: Be16,
}

assert_eq_size!(CmdHeader, [u8; 6]);

/// Per-request header. `payload_size` covers everything after this header:
/// the call target fields plus the call data.
///
/// Wire size: 7 bytes.
#[derive(Debug, Clone, AsBytes, FromBytes, FromZeroes)]
#[repr(C, packed)]
pub struct RequestHeader {
    pub version: u8,
    pub app_request_label: Be16,
    pub resolver_type: Be16,
    pub payload_size: Be16,
}

assert_eq_size!(RequestHeader, [u8; 7]);

/// Where and when a view call executes. Shared by requests and the compute
/// record.
///
/// Wire size: 35 bytes.
#[derive(Debug, Clone, AsBytes, FromBytes, FromZeroes)]
#[repr(C, packed)]
pub struct EvmCallTarget {
    pub target_eid: Be32,
    pub is_block_num: u8,
    pub block_num_or_timestamp: Be64,
    pub confirmations: Be16,
    pub to: Address,
}

assert_eq_size!(EvmCallTarget, [u8; 35]);

/// Leading bytes of the optional trailing compute record.
///
/// Wire size: 2 bytes.
#[derive(Debug, Clone, AsBytes, FromBytes, FromZeroes)]
#[repr(C, packed)]
pub struct ComputeHeader {
    pub version: u8,
    pub compute_setting: u8,
}

assert_eq_size!(ComputeHeader, [u8; 2]);

/// Fixed part of a request's `payload_size`.
pub const REQUEST_TARGET_SIZE: usize = core::mem::size_of::<EvmCallTarget>();

/// Full size of a compute record.
pub const COMPUTE_RECORD_SIZE: usize =
    core::mem::size_of::<ComputeHeader>() + core::mem::size_of::<EvmCallTarget>();

/// Largest call data whose `payload_size` still fits the 16-bit field.
pub const MAX_CALLDATA_SIZE: usize = u16::MAX as usize - REQUEST_TARGET_SIZE;

// ── Errors ────────────────────────────────────────────────────────────────────

/// Errors that can arise when building or interpreting wire-format data.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum WireError {
    #[error("size {size} exceeds limit {limit}")]
    SizeExceeded { size: usize, limit: usize },

    #[error("{0} requests exceed the 16-bit request count")]
    TooManyRequests(usize),

    #[error("read command has no requests")]
    NoRequests,

    #[error("call data length {0} exceeds maximum {}", MAX_CALLDATA_SIZE)]
    CallDataTooLarge(usize),

    #[error("truncated input: need {need} bytes at offset {offset}, have {have}")]
    Truncated { offset: usize, need: usize, have: usize },

    #[error("unsupported options type: {0}")]
    InvalidOptionsType(u16),

    #[error("unknown worker id: {0}")]
    UnknownWorker(u8),

    #[error("unknown executor option type: {0}")]
    UnknownOptionType(u8),

    #[error("invalid data size {size} for option type {option_type}")]
    InvalidOptionSize { option_type: u8, size: usize },

    #[error("unsupported {what} version: {version}")]
    UnsupportedVersion { what: &'static str, version: u16 },

    #[error("unsupported resolver type: {0}")]
    UnsupportedResolver(u16),

    #[error("{0} unexpected trailing bytes")]
    TrailingBytes(usize),
}

// ── Tests ─────────────────────────────────────────────────────────────────────
