//! oapp-core: wire formats and configuration for omnichain applications.
//! Executor options, read commands and the byte primitives under them.
//! All other OApp crates depend on this one.

pub mod buf;
pub mod config;
pub mod options;
pub mod read_cmd;
pub mod wire;

pub use config::OAppConfig;
pub use options::{DecodedOptions, ExecutorOption, Options};
pub use read_cmd::{BlockRef, CallRequest, ComputeDirective, ReadCommand};
pub use wire::{Address, Bytes32, WireError};
