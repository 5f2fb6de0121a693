//! Options commands: build and inspect type-3 options blobs.
//!
//! Build items, applied left to right:
//!   lz-receive:<gas>[:<value>]
//!   native-drop:<amount>:<receiver hex>
//!   compose:<index>:<gas>[:<value>]
//!   ordered
//!   lz-read:<gas>:<response size>[:<value>]
//!   precrime:<dvn index>

use std::num::NonZeroU128;

use anyhow::{bail, Context, Result};
use oapp_core::config::parse_bytes32;
use oapp_core::options::{decode_options, ExecutorOption, Options};
use oapp_core::wire::DVN_OPTION_TYPE_PRECRIME;

use super::{parse_hex, parse_num};

fn value_at(parts: &[&str], idx: usize) -> Result<Option<NonZeroU128>> {
    match parts.get(idx) {
        Some(v) => Ok(NonZeroU128::new(parse_num(v, "value")?)),
        None => Ok(None),
    }
}

fn apply_item(options: &mut Options, item: &str) -> Result<()> {
    let parts: Vec<&str> = item.split(':').collect();
    match parts.as_slice() {
        ["lz-receive", gas] | ["lz-receive", gas, _] => {
            options.add_executor_lz_receive_option(parse_num(gas, "gas")?, value_at(&parts, 2)?)?;
        }
        ["native-drop", amount, receiver] => {
            let receiver = parse_bytes32(receiver)?;
            options.add_executor_native_drop_option(parse_num(amount, "amount")?, receiver)?;
        }
        ["compose", index, gas] | ["compose", index, gas, _] => {
            options.add_executor_lz_compose_option(
                parse_num(index, "index")?,
                parse_num(gas, "gas")?,
                value_at(&parts, 3)?,
            )?;
        }
        ["ordered"] => {
            options.add_executor_ordered_execution_option()?;
        }
        ["lz-read", gas, size] | ["lz-read", gas, size, _] => {
            options.add_executor_lz_read_option(
                parse_num(gas, "gas")?,
                parse_num(size, "response size")?,
                value_at(&parts, 3)?,
            )?;
        }
        ["precrime", idx] => {
            options.add_dvn_precrime_option(parse_num(idx, "dvn index")?)?;
        }
        _ => bail!("unrecognised option item: {}", item),
    }
    Ok(())
}

pub fn cmd_options_build(items: &[&str]) -> Result<()> {
    if items.is_empty() {
        bail!("options needs at least one item (e.g. lz-receive:200000)");
    }
    let mut options = Options::new();
    for item in items {
        apply_item(&mut options, item).with_context(|| format!("while adding {}", item))?;
    }
    println!("0x{}", hex::encode(options.as_bytes()));
    Ok(())
}

fn describe(option: &ExecutorOption) -> String {
    let value = |v: &Option<NonZeroU128>| v.map(|v| v.get()).unwrap_or(0);
    match option {
        ExecutorOption::LzReceive { gas, value: v } => {
            format!("lzReceive     gas={} value={}", gas, value(v))
        }
        ExecutorOption::NativeDrop { amount, receiver } => {
            format!("nativeDrop    amount={} receiver=0x{}", amount, hex::encode(receiver))
        }
        ExecutorOption::LzCompose { index, gas, value: v } => {
            format!("lzCompose     index={} gas={} value={}", index, gas, value(v))
        }
        ExecutorOption::OrderedExecution => "orderedExecution".to_string(),
        ExecutorOption::LzRead {
            gas,
            response_size,
            value: v,
        } => format!(
            "lzRead        gas={} size={} value={}",
            gas,
            response_size,
            value(v)
        ),
    }
}

pub fn cmd_options_decode(blob: &str) -> Result<()> {
    let bytes = parse_hex(blob)?;
    let decoded = decode_options(&bytes)?;

    println!("═══════════════════════════════════════");
    println!("  Options ({} bytes)", bytes.len());
    println!("═══════════════════════════════════════");
    if decoded.executor.is_empty() && decoded.dvn.is_empty() {
        println!("  (no records)");
    }
    for option in decoded.executor_options()? {
        println!("  executor  {}", describe(&option));
    }
    for (idx, records) in &decoded.dvn {
        for record in records {
            let kind = if record.option_type == DVN_OPTION_TYPE_PRECRIME {
                "precrime".to_string()
            } else {
                format!("type {}", record.option_type)
            };
            println!("  dvn[{}]    {} params=0x{}", idx, kind, hex::encode(&record.params));
        }
    }
    Ok(())
}
