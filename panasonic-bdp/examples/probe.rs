//! Connectivity probe for a real player
//!
//! Detects the dialect, prints one status snapshot and optionally sends a
//! remote key.
//!
//! Run with: cargo run -p panasonic-bdp --example probe -- <host> [TOKEN]
//!
//! The host may also come from `BDP_HOST`. UHD players need their key in
//! `BDP_PLAYER_KEY` before they accept commands.

use panasonic_bdp::logging::{init_logging, LoggingMode};
use panasonic_bdp::{Command, Player, PlayerConfig, SdkError};
use std::net::Ipv4Addr;

#[tokio::main]
async fn main() -> Result<(), SdkError> {
    init_logging(LoggingMode::Development)?;

    let mut args = std::env::args().skip(1);
    let host = match args.next().or_else(|| std::env::var("BDP_HOST").ok()) {
        Some(host) => host,
        None => {
            eprintln!("usage: probe <host> [TOKEN]");
            std::process::exit(2);
        }
    };
    let token = args.next();

    let host: Ipv4Addr = host.parse().map_err(|_| {
        panasonic_bdp::ConfigError::Invalid(format!("not an IPv4 address: {}", host))
    })?;
    let mut config = PlayerConfig::new(host).with_name("probe");
    if let Ok(key) = std::env::var("BDP_PLAYER_KEY") {
        config = config.with_player_key(key.parse()?);
    }

    println!("Panasonic BDP probe");
    println!("===================");
    println!("Player: {}", config.endpoint());

    let player = Player::new(config)?;
    let snapshot = player.poll_once().await;

    match snapshot.dialect {
        Some(dialect) => println!("Dialect: {}", dialect),
        None => {
            println!("Dialect: not detected");
            println!("Make sure the player is on and remote operation is enabled in its network settings");
        }
    }
    println!("Available: {}", snapshot.available);
    if let Some(state) = &snapshot.state {
        println!("Status: {} ({:?})", state.status_label, state.state);
        if let Some(position) = state.position {
            println!("Position: {}s", position);
        }
        if let Some(duration) = state.duration {
            println!("Duration: {}s", duration);
        }
        if let (Some(chapter), Some(chapters)) = (state.chapter, state.chapters) {
            println!("Chapter: {}/{}", chapter, chapters);
        }
    }
    if let Ok(json) = serde_json::to_string_pretty(&snapshot) {
        println!("\n{}", json);
    }

    if let Some(token) = token {
        match token.parse::<Command>() {
            Ok(command) => println!("\nSending {} ({})", command, command.description()),
            Err(_) => println!("\nSending {}", token),
        }
        match player.send_command(&token).await {
            Ok(report) => println!("Sent ({} transmission)", report.transmissions),
            Err(e) => println!("Failed: {}", e),
        }
    }

    Ok(())
}
