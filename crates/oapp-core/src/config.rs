//! Configuration for an OApp deployment.
//!
//! Resolution order: environment variables → config file → defaults.
//!
//! Config file location:
//!   1. $OAPP_CONFIG (explicit override)
//!   2. $XDG_CONFIG_HOME/oapp/config.toml
//!   3. ~/.config/oapp/config.toml
//!
//! Protocol ceilings (options sizes, call data size) are constants in
//! [`crate::wire`], not configuration.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::wire::{address_to_bytes32, Address, Bytes32};

/// Top-level configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct OAppConfig {
    pub endpoint: EndpointConfig,
    pub app: AppConfig,
    pub messaging: MessagingConfig,
    pub read: ReadConfig,
    pub peers: Vec<PeerEntry>,
    pub storage: StorageConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EndpointConfig {
    /// Endpoint id of the local chain.
    pub eid: u32,
    /// Endpoint contract address (hex, 20 bytes).
    pub address: String,
    /// Loopback fee model: flat part of every native fee.
    pub base_fee: u64,
    /// Loopback fee model: charged per byte of message plus options.
    pub fee_per_byte: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    /// This OApp's own address (hex, 20 bytes).
    pub address: String,
    /// Owner allowed to mutate peers and enforced options (hex, 20 bytes).
    pub owner: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct MessagingConfig {
    /// lzReceive gas hint used when the caller supplies no options.
    pub default_gas_limit: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ReadConfig {
    /// Channel id read requests are sent on.
    pub channel: u32,
    /// Block confirmations the resolver waits for.
    pub confirmations: u16,
    /// Expected response size handed to the executor.
    pub response_size: u32,
    /// lzReceive gas for delivering the response.
    pub gas_limit: u64,
}

/// A trusted peer. `address` is hex; 20-byte addresses are left-padded.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PeerEntry {
    pub eid: u32,
    pub address: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    /// Peer table snapshot. Empty = in-memory only.
    pub peers_path: PathBuf,
}

// ── Defaults ──────────────────────────────────────────────────────────────────

impl Default for EndpointConfig {
    fn default() -> Self {
        Self {
            eid: 30101,
            address: hex::encode([0u8; 20]),
            base_fee: 1_000_000_000_000,
            fee_per_byte: 1_000_000_000,
        }
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            address: hex::encode([0u8; 20]),
            owner: hex::encode([0u8; 20]),
        }
    }
}

impl Default for MessagingConfig {
    fn default() -> Self {
        Self {
            default_gas_limit: 500_000,
        }
    }
}

impl Default for ReadConfig {
    fn default() -> Self {
        Self {
            channel: 4_294_967_294,
            confirmations: 15,
            response_size: 128,
            gas_limit: 500_000,
        }
    }
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            peers_path: data_dir().join("peers.json"),
        }
    }
}

// ── Path helpers ──────────────────────────────────────────────────────────────

fn config_dir() -> PathBuf {
    std::env::var("XDG_CONFIG_HOME")
        .map(PathBuf::from)
        .unwrap_or_else(|_| dirs_or_home().join(".config"))
        .join("oapp")
}

fn data_dir() -> PathBuf {
    std::env::var("XDG_DATA_HOME")
        .map(PathBuf::from)
        .unwrap_or_else(|_| dirs_or_home().join(".local").join("share"))
        .join("oapp")
}

fn dirs_or_home() -> PathBuf {
    std::env::var("HOME")
        .map(PathBuf::from)
        .unwrap_or_else(|_| PathBuf::from("/tmp"))
}

// ── Errors ────────────────────────────────────────────────────────────────────

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to read {0}: {1}")]
    ReadFailed(PathBuf, std::io::Error),
    #[error("failed to parse {0}: {1}")]
    ParseFailed(PathBuf, toml::de::Error),
    #[error("failed to write {0}: {1}")]
    WriteFailed(PathBuf, std::io::Error),
    #[error("failed to serialize: {0}")]
    SerializeFailed(toml::ser::Error),
    #[error("invalid address {0:?}: expected 20 or 32 bytes of hex")]
    InvalidAddress(String),
}

// ── Address parsing ───────────────────────────────────────────────────────────

fn decode_hex(text: &str) -> Result<Vec<u8>, ConfigError> {
    let trimmed = text.strip_prefix("0x").unwrap_or(text);
    hex::decode(trimmed).map_err(|_| ConfigError::InvalidAddress(text.to_string()))
}

/// Parse a 20-byte hex address. A `0x` prefix is accepted.
pub fn parse_address(text: &str) -> Result<Address, ConfigError> {
    decode_hex(text)?
        .try_into()
        .map_err(|_| ConfigError::InvalidAddress(text.to_string()))
}

/// Parse a 32-byte peer. 20-byte input is left-padded.
pub fn parse_bytes32(text: &str) -> Result<Bytes32, ConfigError> {
    let raw = decode_hex(text)?;
    match raw.len() {
        20 => {
            let mut address = [0u8; 20];
            address.copy_from_slice(&raw);
            Ok(address_to_bytes32(&address))
        }
        32 => {
            let mut out = [0u8; 32];
            out.copy_from_slice(&raw);
            Ok(out)
        }
        _ => Err(ConfigError::InvalidAddress(text.to_string())),
    }
}

impl PeerEntry {
    pub fn peer(&self) -> Result<Bytes32, ConfigError> {
        parse_bytes32(&self.address)
    }
}

// ── Loading ───────────────────────────────────────────────────────────────────

impl OAppConfig {
    /// Load config: env vars → file → defaults.
    pub fn load() -> Result<Self, ConfigError> {
        let mut config = Self::load_from(&Self::file_path())?;
        config.apply_env_overrides();
        Ok(config)
    }

    /// Load a specific file, falling back to defaults if it does not exist.
    /// Environment overrides are not applied.
    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        if !path.exists() {
            return Ok(Self::default());
        }
        let text = std::fs::read_to_string(path)
            .map_err(|e| ConfigError::ReadFailed(path.to_path_buf(), e))?;
        toml::from_str(&text).map_err(|e| ConfigError::ParseFailed(path.to_path_buf(), e))
    }

    /// Config file path.
    pub fn file_path() -> PathBuf {
        std::env::var("OAPP_CONFIG")
            .map(PathBuf::from)
            .unwrap_or_else(|_| config_dir().join("config.toml"))
    }

    /// Write default config if none exists. Returns the path.
    pub fn write_default_if_missing() -> Result<PathBuf, ConfigError> {
        let path = Self::file_path();
        if !path.exists() {
            if let Some(parent) = path.parent() {
                std::fs::create_dir_all(parent)
                    .map_err(|e| ConfigError::WriteFailed(path.clone(), e))?;
            }
            let text = toml::to_string_pretty(&OAppConfig::default())
                .map_err(ConfigError::SerializeFailed)?;
            std::fs::write(&path, text).map_err(|e| ConfigError::WriteFailed(path.clone(), e))?;
        }
        Ok(path)
    }

    /// Peers from the `peers` list, parsed. Fails on the first bad entry.
    pub fn peer_entries(&self) -> Result<Vec<(u32, Bytes32)>, ConfigError> {
        self.peers
            .iter()
            .map(|entry| Ok((entry.eid, entry.peer()?)))
            .collect()
    }

    /// `None` when peers are not persisted.
    pub fn peers_path(&self) -> Option<&Path> {
        let path = self.storage.peers_path.as_path();
        (!path.as_os_str().is_empty()).then_some(path)
    }

    /// Apply OAPP_* env var overrides.
    fn apply_env_overrides(&mut self) {
        if let Ok(v) = std::env::var("OAPP_ENDPOINT__EID") {
            if let Ok(eid) = v.parse() {
                self.endpoint.eid = eid;
            }
        }
        if let Ok(v) = std::env::var("OAPP_ENDPOINT__ADDRESS") {
            self.endpoint.address = v;
        }
        if let Ok(v) = std::env::var("OAPP_APP__ADDRESS") {
            self.app.address = v;
        }
        if let Ok(v) = std::env::var("OAPP_APP__OWNER") {
            self.app.owner = v;
        }
        if let Ok(v) = std::env::var("OAPP_MESSAGING__DEFAULT_GAS_LIMIT") {
            if let Ok(gas) = v.parse() {
                self.messaging.default_gas_limit = gas;
            }
        }
        if let Ok(v) = std::env::var("OAPP_READ__CHANNEL") {
            if let Ok(channel) = v.parse() {
                self.read.channel = channel;
            }
        }
        if let Ok(v) = std::env::var("OAPP_READ__GAS_LIMIT") {
            if let Ok(gas) = v.parse() {
                self.read.gas_limit = gas;
            }
        }
        if let Ok(v) = std::env::var("OAPP_STORAGE__PEERS_PATH") {
            self.storage.peers_path = PathBuf::from(v);
        }
    }
}
