//! Read command commands: encode requests into a command blob and back.
//!
//! Request spec: `<label>:<target eid>:<to hex>:<calldata hex>[:<block>]`.
//! Without a block the request reads at the current timestamp.
//! An optional trailing `compute:<setting>:<target eid>:<to hex>[:<block>]`
//! appends a compute directive.

use anyhow::{bail, Result};
use bytes::Bytes;
use oapp_core::config::{parse_address, OAppConfig};
use oapp_core::read_cmd::{self, BlockRef, CallRequest, ComputeDirective};

use super::{parse_hex, parse_num};

fn block_at(parts: &[&str], idx: usize) -> Result<BlockRef> {
    match parts.get(idx) {
        Some(b) => Ok(BlockRef::Number(parse_num(b, "block")?)),
        None => Ok(BlockRef::now()),
    }
}

fn parse_request(spec: &str, confirmations: u16) -> Result<CallRequest> {
    let parts: Vec<&str> = spec.split(':').collect();
    if parts.len() != 4 && parts.len() != 5 {
        bail!("request must be <label>:<eid>:<to>:<calldata>[:<block>], got {}", spec);
    }
    Ok(CallRequest {
        app_request_label: parse_num(parts[0], "label")?,
        target_eid: parse_num(parts[1], "eid")?,
        block: block_at(&parts, 4)?,
        confirmations,
        to: parse_address(parts[2])?,
        call_data: Bytes::from(parse_hex(parts[3])?),
    })
}

fn parse_compute(spec: &str, confirmations: u16) -> Result<ComputeDirective> {
    let parts: Vec<&str> = spec.split(':').collect();
    if parts.len() != 4 && parts.len() != 5 {
        bail!("compute must be compute:<setting>:<eid>:<to>[:<block>], got {}", spec);
    }
    Ok(ComputeDirective {
        compute_setting: parse_num(parts[1], "compute setting")?,
        target_eid: parse_num(parts[2], "eid")?,
        block: block_at(&parts, 4)?,
        confirmations,
        to: parse_address(parts[3])?,
    })
}

/// Build a command blob. `args` is `<app label> <request>... [compute:...]`.
pub fn encode_command(args: &[&str], config: &OAppConfig) -> Result<Bytes> {
    let Some((label, rest)) = args.split_first() else {
        bail!("read-command needs an app label and at least one request");
    };
    let confirmations = config.read.confirmations;

    let mut requests = Vec::new();
    let mut compute = None;
    for spec in rest {
        if spec.starts_with("compute:") {
            compute = Some(parse_compute(spec, confirmations)?);
        } else {
            requests.push(parse_request(spec, confirmations)?);
        }
    }
    Ok(read_cmd::encode(
        parse_num(label, "app label")?,
        &requests,
        compute.as_ref(),
    )?)
}

pub fn cmd_read_command(args: &[&str], config: &OAppConfig) -> Result<()> {
    let cmd = encode_command(args, config)?;
    println!("0x{}", hex::encode(&cmd));
    Ok(())
}

fn describe_block(block: &BlockRef) -> String {
    match block {
        BlockRef::Number(n) => format!("block {}", n),
        BlockRef::Timestamp(t) => format!("timestamp {}", t),
    }
}

pub fn cmd_decode_command(blob: &str) -> Result<()> {
    let bytes = parse_hex(blob)?;
    let cmd = read_cmd::decode(&bytes)?;

    println!("═══════════════════════════════════════");
    println!("  Read Command (label {}, {} bytes)", cmd.app_cmd_label, bytes.len());
    println!("═══════════════════════════════════════");
    for r in &cmd.requests {
        println!("  ┌─ request label {}", r.app_request_label);
        println!("  │  target eid    : {}", r.target_eid);
        println!("  │  to            : 0x{}", hex::encode(r.to));
        println!("  │  at            : {}", describe_block(&r.block));
        println!("  │  confirmations : {}", r.confirmations);
        println!("  └─ call data     : 0x{}", hex::encode(&r.call_data));
    }
    if let Some(c) = &cmd.compute {
        println!("  ┌─ compute setting {}", c.compute_setting);
        println!("  │  target eid    : {}", c.target_eid);
        println!("  │  to            : 0x{}", hex::encode(c.to));
        println!("  │  at            : {}", describe_block(&c.block));
        println!("  └─ confirmations : {}", c.confirmations);
    }
    Ok(())
}
