//! QC-Callbacks: register webhook URLs for watched addresses.
//!
//! Talks to a running node's registration API.

use std::process::ExitCode;

use anyhow::Result;
use clap::{Parser, Subcommand};
use serde::Serialize;

use qc_callbacks::api::CallbacksApiClient;

/// QC-Callbacks: Quantum-Chain address callback client
#[derive(Parser, Debug)]
#[command(name = "qc-callbacks")]
#[command(about = "Manage payment callbacks for watched addresses")]
struct Args {
    /// Registration API endpoint URL
    #[arg(short, long, env = "QC_ENDPOINT", default_value = "http://127.0.0.1:9888")]
    endpoint: String,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Send payment notifications for <ADDRESS> to <URL>
    AddAddressCallback { address: String, url: String },
    /// List callback URLs registered for <ADDRESS>
    ListAddressCallbacks { address: String },
    /// Stop sending notifications for <ADDRESS> to <URL>
    RemoveAddressCallback { address: String, url: String },
    /// Show recent delivery outcomes
    DeliveryLog {
        /// Only deliveries that never reached their endpoint
        #[arg(long)]
        dead_letters: bool,
    },
}

fn print_json<T: Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

async fn run(args: Args) -> Result<()> {
    let client = CallbacksApiClient::new(&args.endpoint)?;

    match args.command {
        Command::AddAddressCallback { address, url } => {
            print_json(&client.add_address_callback(&address, &url).await?)
        }
        Command::ListAddressCallbacks { address } => {
            for url in client.list_address_callbacks(&address).await? {
                println!("{}", url);
            }
            Ok(())
        }
        Command::RemoveAddressCallback { address, url } => {
            print_json(&client.remove_address_callback(&address, &url).await?)
        }
        Command::DeliveryLog { dead_letters } => {
            print_json(&client.delivery_log(dead_letters).await?)
        }
    }
}

#[tokio::main]
async fn main() -> ExitCode {
    let args = Args::parse();

    match run(args).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("Error: {}", e);
            ExitCode::FAILURE
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parses_subcommands() {
        let args = Args::try_parse_from([
            "qc-callbacks",
            "add-address-callback",
            "addr",
            "https://example.com",
        ])
        .unwrap();
        assert_eq!(args.endpoint, "http://127.0.0.1:9888");
        assert!(matches!(
            args.command,
            Command::AddAddressCallback { ref address, ref url }
                if address == "addr" && url == "https://example.com"
        ));

        let args = Args::try_parse_from([
            "qc-callbacks",
            "--endpoint",
            "http://node:9888",
            "delivery-log",
            "--dead-letters",
        ])
        .unwrap();
        assert_eq!(args.endpoint, "http://node:9888");
        assert!(matches!(args.command, Command::DeliveryLog { dead_letters: true }));
    }

    #[test]
    fn test_missing_url_is_rejected() {
        assert!(Args::try_parse_from(["qc-callbacks", "remove-address-callback", "addr"]).is_err());
    }
}
