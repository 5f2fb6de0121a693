//! oapp-ctl: build and inspect OApp options, read commands, and peers.

mod cmd;

use anyhow::{Context, Result};
use oapp_core::OAppConfig;
use std::path::PathBuf;

fn print_usage() {
    println!("Usage: oapp-ctl [--config <path>] <command>");
    println!();
    println!("Commands:");
    println!("  options <item>...              Build a type-3 options blob");
    println!("  decode-options <hex>           Decode an options blob");
    println!("  read-command <label> <req>...  Encode a read command");
    println!("  decode-command <hex>           Decode a read command");
    println!("  peers                          List configured peers");
    println!("  quote <eid> <text>             Quote a message fee on the loopback endpoint");
    println!("  config                         Write the default config if missing and show it");
    println!();
    println!("Option items:");
    println!("  lz-receive:<gas>[:<value>]     native-drop:<amount>:<receiver>");
    println!("  compose:<index>:<gas>[:<value>] ordered");
    println!("  lz-read:<gas>:<size>[:<value>] precrime:<dvn index>");
    println!();
    println!("Read requests:");
    println!("  <label>:<eid>:<to>:<calldata>[:<block>]");
    println!("  compute:<setting>:<eid>:<to>[:<block>]");
    println!();
    println!("Options:");
    println!("  --config <path>   Config file (default: $OAPP_CONFIG or ~/.config/oapp/config.toml)");
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let args: Vec<String> = std::env::args().skip(1).collect();

    let mut config_path: Option<PathBuf> = None;
    let mut remaining: Vec<&str> = Vec::new();
    let mut i = 0;
    while i < args.len() {
        if args[i] == "--config" {
            i += 1;
            config_path = Some(PathBuf::from(
                args.get(i).context("--config requires a value")?,
            ));
        } else {
            remaining.push(&args[i]);
        }
        i += 1;
    }

    let load_config = || -> Result<OAppConfig> {
        let config = match &config_path {
            Some(path) => OAppConfig::load_from(path)?,
            None => OAppConfig::load()?,
        };
        Ok(config)
    };

    match remaining.as_slice() {
        ["options", items @ ..] if !items.is_empty() => cmd::options::cmd_options_build(items),
        ["decode-options", blob] => cmd::options::cmd_options_decode(blob),
        ["read-command", args @ ..] => cmd::command::cmd_read_command(args, &load_config()?),
        ["decode-command", blob] => cmd::command::cmd_decode_command(blob),
        ["peers"] => cmd::peers::cmd_peers(&load_config()?),
        ["quote", eid, text] => {
            let eid = cmd::parse_num(eid, "eid")?;
            cmd::peers::cmd_quote(&load_config()?, eid, text)
        }
        ["config"] => cmd::config::cmd_config(),
        ["help"] | ["--help"] | ["-h"] | [] => {
            print_usage();
            Ok(())
        }
        other => {
            eprintln!("Unknown command: {}", other.join(" "));
            eprintln!();
            print_usage();
            std::process::exit(1);
        }
    }
}
