//! Type-3 options: worker execution hints appended to every outbound message.
//!
//! An options blob is `0x0003` followed by worker records:
//!
//! ```text
//! executor: worker_id(1)=1 | size(2) | option_type(1) | params(size-1)
//! dvn:      worker_id(1)=2 | size(2) | dvn_idx(1) | option_type(1) | params(size-2)
//! ```
//!
//! Blobs only ever grow by appending. Every append checks the total and
//! per-record ceilings before touching the buffer, so a failed append leaves
//! the blob exactly as it was.

use std::collections::BTreeMap;
use std::num::NonZeroU128;

use bytes::Bytes;
use zerocopy::AsBytes;

use crate::buf::{ByteReader, ByteWriter};
use crate::wire::{
    Be16, DvnOptionHeader, ExecutorOptionHeader, OptionsHeader, WireError,
    DVN_OPTION_TYPE_PRECRIME, DVN_WORKER_ID, EXECUTOR_WORKER_ID, MAX_OPTIONS_TOTAL_SIZE,
    MAX_OPTION_SINGLE_SIZE, OPTIONS_TYPE_3, OPTION_TYPE_LZCOMPOSE, OPTION_TYPE_LZRECEIVE,
    OPTION_TYPE_LZREAD, OPTION_TYPE_NATIVE_DROP, OPTION_TYPE_ORDERED_EXECUTION,
};

const EXECUTOR_HEADER_LEN: usize = core::mem::size_of::<ExecutorOptionHeader>();
const DVN_HEADER_LEN: usize = core::mem::size_of::<DvnOptionHeader>();

// ── Typed executor options ────────────────────────────────────────────────────

/// A decoded executor option.
///
/// Native value fields are `None` when absent on the wire. A zero value is
/// never encoded: the field is dropped and the record is 16 bytes shorter.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExecutorOption {
    LzReceive {
        gas: u128,
        value: Option<NonZeroU128>,
    },
    NativeDrop {
        amount: u128,
        receiver: [u8; 32],
    },
    LzCompose {
        index: u16,
        gas: u128,
        value: Option<NonZeroU128>,
    },
    OrderedExecution,
    LzRead {
        gas: u128,
        response_size: u32,
        value: Option<NonZeroU128>,
    },
}

impl ExecutorOption {
    pub fn option_type(&self) -> u8 {
        match self {
            Self::LzReceive { .. } => OPTION_TYPE_LZRECEIVE,
            Self::NativeDrop { .. } => OPTION_TYPE_NATIVE_DROP,
            Self::LzCompose { .. } => OPTION_TYPE_LZCOMPOSE,
            Self::OrderedExecution => OPTION_TYPE_ORDERED_EXECUTION,
            Self::LzRead { .. } => OPTION_TYPE_LZREAD,
        }
    }

    /// Serialize the option params (everything after `option_type`).
    pub fn encode_params(&self) -> Vec<u8> {
        let mut w = ByteWriter::with_capacity(52);
        match *self {
            Self::LzReceive { gas, value } => {
                w.put_u128(gas);
                put_value(&mut w, value);
            }
            Self::NativeDrop { amount, receiver } => {
                w.put_u128(amount).put_bytes(&receiver);
            }
            Self::LzCompose { index, gas, value } => {
                w.put_u16(index).put_u128(gas);
                put_value(&mut w, value);
            }
            Self::OrderedExecution => {}
            Self::LzRead {
                gas,
                response_size,
                value,
            } => {
                w.put_u128(gas).put_u32(response_size);
                put_value(&mut w, value);
            }
        }
        w.into_vec()
    }

    /// Parse option params. Presence of the native value is inferred from the
    /// params length.
    ///
    /// An explicit zero value is accepted and read as `None`, so a record
    /// written by another encoder in long form re-encodes 16 bytes shorter.
    /// Both forms ask the executor for the same thing.
    pub fn decode(option_type: u8, params: &[u8]) -> Result<Self, WireError> {
        let invalid = || WireError::InvalidOptionSize {
            option_type,
            size: params.len(),
        };
        match option_type {
            OPTION_TYPE_LZRECEIVE => match params.len() {
                16 | 32 => Ok(Self::LzReceive {
                    gas: params.read_u128(0)?,
                    value: read_value(params, 16)?,
                }),
                _ => Err(invalid()),
            },
            OPTION_TYPE_NATIVE_DROP => match params.len() {
                48 => Ok(Self::NativeDrop {
                    amount: params.read_u128(0)?,
                    receiver: params.read_array(16)?,
                }),
                _ => Err(invalid()),
            },
            OPTION_TYPE_LZCOMPOSE => match params.len() {
                18 | 34 => Ok(Self::LzCompose {
                    index: params.read_u16(0)?,
                    gas: params.read_u128(2)?,
                    value: read_value(params, 18)?,
                }),
                _ => Err(invalid()),
            },
            OPTION_TYPE_ORDERED_EXECUTION if params.is_empty() => Ok(Self::OrderedExecution),
            OPTION_TYPE_ORDERED_EXECUTION => Err(invalid()),
            OPTION_TYPE_LZREAD => match params.len() {
                20 | 36 => Ok(Self::LzRead {
                    gas: params.read_u128(0)?,
                    response_size: params.read_u32(16)?,
                    value: read_value(params, 20)?,
                }),
                _ => Err(invalid()),
            },
            other => Err(WireError::UnknownOptionType(other)),
        }
    }
}

fn put_value(w: &mut ByteWriter, value: Option<NonZeroU128>) {
    if let Some(v) = value {
        w.put_u128(v.get());
    }
}

// A present but zero value collapses to `None`.
fn read_value(params: &[u8], offset: usize) -> Result<Option<NonZeroU128>, WireError> {
    if params.len() == offset {
        return Ok(None);
    }
    Ok(NonZeroU128::new(params.read_u128(offset)?))
}

// ── Builder ───────────────────────────────────────────────────────────────────

/// A type-3 options blob under construction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Options {
    buf: ByteWriter,
}

impl Default for Options {
    fn default() -> Self {
        Self::new()
    }
}

impl Options {
    /// A blob holding only the type-3 header.
    pub fn new() -> Self {
        let header = OptionsHeader {
            format: Be16::new(OPTIONS_TYPE_3),
        };
        Self {
            buf: ByteWriter::from_slice(header.as_bytes()),
        }
    }

    /// Adopt an existing blob so more options can be appended to it.
    /// The header must be type 3 and the blob within the total ceiling.
    pub fn from_bytes(blob: &[u8]) -> Result<Self, WireError> {
        let format = blob.read_u16(0)?;
        if format != OPTIONS_TYPE_3 {
            return Err(WireError::InvalidOptionsType(format));
        }
        if blob.len() > MAX_OPTIONS_TOTAL_SIZE {
            return Err(WireError::SizeExceeded {
                size: blob.len(),
                limit: MAX_OPTIONS_TOTAL_SIZE,
            });
        }
        Ok(Self {
            buf: ByteWriter::from_slice(blob),
        })
    }

    pub fn len(&self) -> usize {
        self.buf.len()
    }

    /// True when no records follow the header.
    pub fn is_empty(&self) -> bool {
        self.buf.len() <= core::mem::size_of::<OptionsHeader>()
    }

    pub fn as_bytes(&self) -> &[u8] {
        self.buf.as_slice()
    }

    pub fn into_bytes(self) -> Bytes {
        self.buf.freeze()
    }

    /// Append a raw executor record.
    pub fn add_executor_option(
        &mut self,
        option_type: u8,
        params: &[u8],
    ) -> Result<&mut Self, WireError> {
        let size = params.len() + 1;
        self.check_sizes(EXECUTOR_HEADER_LEN + params.len(), size)?;

        let header = ExecutorOptionHeader {
            worker_id: EXECUTOR_WORKER_ID,
            size: Be16::new(size as u16),
            option_type,
        };
        self.buf.put_bytes(header.as_bytes()).put_bytes(params);
        Ok(self)
    }

    /// Append a raw DVN record addressed to verifier `dvn_idx`.
    pub fn add_dvn_option(
        &mut self,
        dvn_idx: u8,
        option_type: u8,
        params: &[u8],
    ) -> Result<&mut Self, WireError> {
        let size = params.len() + 2;
        self.check_sizes(DVN_HEADER_LEN + params.len(), size)?;

        let header = DvnOptionHeader {
            worker_id: DVN_WORKER_ID,
            size: Be16::new(size as u16),
            dvn_idx,
            option_type,
        };
        self.buf.put_bytes(header.as_bytes()).put_bytes(params);
        Ok(self)
    }

    pub fn add_executor(&mut self, option: &ExecutorOption) -> Result<&mut Self, WireError> {
        self.add_executor_option(option.option_type(), &option.encode_params())
    }

    /// `None` omits the value field.
    pub fn add_executor_lz_receive_option(
        &mut self,
        gas: u128,
        value: Option<NonZeroU128>,
    ) -> Result<&mut Self, WireError> {
        self.add_executor(&ExecutorOption::LzReceive {
            gas,
            value,
        })
    }

    pub fn add_executor_native_drop_option(
        &mut self,
        amount: u128,
        receiver: [u8; 32],
    ) -> Result<&mut Self, WireError> {
        self.add_executor(&ExecutorOption::NativeDrop { amount, receiver })
    }

    /// `None` omits the value field.
    pub fn add_executor_lz_compose_option(
        &mut self,
        index: u16,
        gas: u128,
        value: Option<NonZeroU128>,
    ) -> Result<&mut Self, WireError> {
        self.add_executor(&ExecutorOption::LzCompose {
            index,
            gas,
            value,
        })
    }

    pub fn add_executor_ordered_execution_option(&mut self) -> Result<&mut Self, WireError> {
        self.add_executor(&ExecutorOption::OrderedExecution)
    }

    /// `None` omits the value field.
    pub fn add_executor_lz_read_option(
        &mut self,
        gas: u128,
        response_size: u32,
        value: Option<NonZeroU128>,
    ) -> Result<&mut Self, WireError> {
        self.add_executor(&ExecutorOption::LzRead {
            gas,
            response_size,
            value,
        })
    }

    pub fn add_dvn_precrime_option(&mut self, dvn_idx: u8) -> Result<&mut Self, WireError> {
        self.add_dvn_option(dvn_idx, DVN_OPTION_TYPE_PRECRIME, &[])
    }

    fn check_sizes(&self, appended: usize, record_size: usize) -> Result<(), WireError> {
        let total = self.buf.len() + appended;
        if total > MAX_OPTIONS_TOTAL_SIZE {
            return Err(WireError::SizeExceeded {
                size: total,
                limit: MAX_OPTIONS_TOTAL_SIZE,
            });
        }
        if record_size > MAX_OPTION_SINGLE_SIZE {
            return Err(WireError::SizeExceeded {
                size: record_size,
                limit: MAX_OPTION_SINGLE_SIZE,
            });
        }
        Ok(())
    }
}

impl AsRef<[u8]> for Options {
    fn as_ref(&self) -> &[u8] {
        self.as_bytes()
    }
}

/// Options carrying a single lzReceive gas hint.
pub fn default_message_options(gas: u128) -> Result<Options, WireError> {
    let mut options = Options::new();
    options.add_executor_lz_receive_option(gas, None)?;
    Ok(options)
}

/// Options carrying a single lzRead gas and response size hint.
pub fn lz_read_options(gas: u128, response_size: u32) -> Result<Options, WireError> {
    let mut options = Options::new();
    options.add_executor_lz_read_option(gas, response_size, None)?;
    Ok(options)
}

// ── Decoding ──────────────────────────────────────────────────────────────────

/// One worker record with its header stripped.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WorkerOption {
    pub option_type: u8,
    pub params: Vec<u8>,
}

/// Options split by worker. DVN options are grouped by verifier index.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DecodedOptions {
    pub executor: Vec<WorkerOption>,
    pub dvn: BTreeMap<u8, Vec<WorkerOption>>,
}

impl DecodedOptions {
    /// Interpret every executor record.
    pub fn executor_options(&self) -> Result<Vec<ExecutorOption>, WireError> {
        self.executor
            .iter()
            .map(|o| ExecutorOption::decode(o.option_type, &o.params))
            .collect()
    }
}

/// Split a type-3 blob into its worker records.
pub fn decode_options(blob: &[u8]) -> Result<DecodedOptions, WireError> {
    let format = blob.read_u16(0)?;
    if format != OPTIONS_TYPE_3 {
        return Err(WireError::InvalidOptionsType(format));
    }

    let mut decoded = DecodedOptions::default();
    let mut cursor = core::mem::size_of::<OptionsHeader>();
    while cursor < blob.len() {
        let worker_id = blob.read_u8(cursor)?;
        let size = blob.read_u16(cursor + 1)? as usize;
        cursor += 3;
        let body = blob.read_slice(cursor, size)?;
        cursor += size;

        match worker_id {
            EXECUTOR_WORKER_ID => {
                let (&option_type, params) = body.split_first().ok_or(
                    WireError::InvalidOptionSize {
                        option_type: 0,
                        size: 0,
                    },
                )?;
                decoded.executor.push(WorkerOption {
                    option_type,
                    params: params.to_vec(),
                });
            }
            DVN_WORKER_ID => {
                if body.len() < 2 {
                    return Err(WireError::InvalidOptionSize {
                        option_type: body.get(1).copied().unwrap_or(0),
                        size: body.len(),
                    });
                }
                decoded.dvn.entry(body[0]).or_default().push(WorkerOption {
                    option_type: body[1],
                    params: body[2..].to_vec(),
                });
            }
            other => return Err(WireError::UnknownWorker(other)),
        }
    }
    Ok(decoded)
}

/// Merge owner-enforced options with caller-supplied ones.
///
/// Empty enforced options pass the caller's through untouched (legacy types
/// included); empty caller options yield the enforced set. Otherwise the
/// caller's blob must be type 3 and its records are appended after the
/// enforced ones.
pub fn combine_options(enforced: &[u8], extra: &[u8]) -> Result<Vec<u8>, WireError> {
    if enforced.is_empty() {
        return Ok(extra.to_vec());
    }
    if extra.is_empty() {
        return Ok(enforced.to_vec());
    }

    let format = extra.read_u16(0)?;
    if format != OPTIONS_TYPE_3 {
        return Err(WireError::InvalidOptionsType(format));
    }

    let total = enforced.len() + extra.len() - core::mem::size_of::<OptionsHeader>();
    if total > MAX_OPTIONS_TOTAL_SIZE {
        return Err(WireError::SizeExceeded {
            size: total,
            limit: MAX_OPTIONS_TOTAL_SIZE,
        });
    }

    let mut combined = ByteWriter::with_capacity(total);
    combined
        .put_bytes(enforced)
        .put_bytes(&extra[core::mem::size_of::<OptionsHeader>()..]);
    Ok(combined.into_vec())
}

// ── Tests ─────────────────────────────────────────────────────────────────────
