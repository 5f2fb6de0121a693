//! Peer and fee commands, run against the local configuration.

use anyhow::{Context, Result};
use oapp_core::config::{parse_address, OAppConfig};
use oapp_core::options::default_message_options;
use oapp_core::wire::Bytes32;
use oapp_services::endpoint::FeeModel;
use oapp_services::{LoopbackEndpoint, OApp, PeerTable};

/// Peers from the persisted snapshot, with config entries layered on top.
pub fn load_peers(config: &OAppConfig) -> Result<PeerTable<Bytes32>> {
    let mut table = match config.peers_path() {
        Some(path) => PeerTable::with_persistence(path.to_path_buf()),
        None => PeerTable::new(),
    };
    table.apply_config(config.peer_entries()?);
    Ok(table)
}

/// An OApp wired to an in-memory endpoint using the configured fee model.
pub fn loopback_oapp(config: &OAppConfig) -> Result<OApp<LoopbackEndpoint>> {
    let endpoint_address =
        parse_address(&config.endpoint.address).context("endpoint.address in config")?;
    let address = parse_address(&config.app.address).context("app.address in config")?;
    let owner = parse_address(&config.app.owner).context("app.owner in config")?;

    let endpoint = LoopbackEndpoint::new(config.endpoint.eid, endpoint_address).with_fees(FeeModel {
        base: u128::from(config.endpoint.base_fee),
        per_byte: u128::from(config.endpoint.fee_per_byte),
        lz_token: None,
    });
    Ok(OApp::new(address, owner, endpoint).with_peers(load_peers(config)?))
}

pub fn cmd_peers(config: &OAppConfig) -> Result<()> {
    let table = load_peers(config)?;

    if table.is_empty() {
        println!("No peers configured.");
        return Ok(());
    }

    println!("═══════════════════════════════════════");
    println!("  Configured Peers ({})", table.len());
    println!("═══════════════════════════════════════");
    for (eid, peer) in table.iter() {
        println!("  {:>10}  0x{}", eid, hex::encode(peer));
    }
    Ok(())
}

/// Quote a text message to `dst_eid` with the default gas options.
pub fn cmd_quote(config: &OAppConfig, dst_eid: u32, text: &str) -> Result<()> {
    let oapp = loopback_oapp(config)?;
    let options = default_message_options(u128::from(config.messaging.default_gas_limit))?;
    let fee = oapp.quote(dst_eid, text.as_bytes(), options.as_bytes(), false)?;

    println!("  destination : {}", dst_eid);
    println!("  peer        : 0x{}", hex::encode(oapp.peer(dst_eid)));
    println!("  options     : 0x{}", hex::encode(options.as_bytes()));
    println!("  native fee  : {}", fee.native_fee);
    println!("  lz token fee: {}", fee.lz_token_fee);
    Ok(())
}
