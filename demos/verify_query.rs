//! Verifies launch queries passed on the command line.
//!
//! Run with:
//!
//! ```bash
//! cargo run --example verify_query -- payment \
//!     '52333469=5STCdDl55VezBzYt0AUA' \
//!     'app_id=52333469&item=Subscribtion_Item_NoAd30&lang=ru_RU&notification_type=get_item_test&order_id=2256399&receiver_id=262959639&user_id=262959639&sig=871447748e3803be83acb30dec37b5e5'
//! ```
//!
//! The secret argument is `<bot token>` for `init_data` and a comma-separated
//! list of `<app id>=<secret>` for `launch_params` and `payment`.

use launch_sign::{ConfigPreset, Protocol, SignConfig, SingleSecret, Verification, Verifier};
use std::collections::HashMap;

fn parse_protocol(name: &str) -> Option<Protocol> {
    Protocol::ALL.into_iter().find(|p| p.as_str() == name)
}

fn parse_secrets(arg: &str) -> HashMap<String, String> {
    arg.split(',')
        .filter_map(|entry| entry.split_once('='))
        .map(|(id, secret)| (id.to_string(), secret.to_string()))
        .collect()
}

fn report(result: &Verification) {
    match result.params() {
        Some(params) => {
            println!("✅ Signature valid, {} parameters:", params.len());
            for (key, value) in params.iter() {
                println!("  {key} = {value}");
            }
        }
        None => {
            // Diagnostics stay server-side; never echo them to the client.
            println!("❌ Signature invalid");
            if let Some(kind) = result.failure() {
                tracing::info!(failure = kind.as_str(), "verification failed");
            }
        }
    }
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt::init();

    let args: Vec<String> = std::env::args().skip(1).collect();
    let [protocol, secret, query] = args.as_slice() else {
        eprintln!("usage: verify_query <init_data|launch_params|payment> <secret> <query>");
        std::process::exit(2);
    };

    let protocol =
        parse_protocol(protocol).ok_or_else(|| format!("unknown protocol: {protocol}"))?;

    let config = SignConfig::from(ConfigPreset::FromEnv);
    println!("🔧 {}", config.summary());
    let verifier = Verifier::with_config(config);

    let result = match protocol {
        Protocol::InitData => verifier.verify(protocol, query, &SingleSecret(secret.as_bytes())),
        Protocol::LaunchParams | Protocol::Payment => {
            verifier.verify(protocol, query, &parse_secrets(secret))
        }
    };
    report(&result);

    println!("📊 {:?}", verifier.pool_stats());
    Ok(())
}
