//! Live radio log capture from a Hubitat hub.
//!
//! Connects to the hub's log websocket with the session cookie from
//! hubitat-config.json and streams every line to stdout, or appends to a
//! file ready for the analyzer.

use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;
use env_logger::Env;
use tungstenite::client::IntoClientRequest;
use tungstenite::http::header::COOKIE;
use tungstenite::Message;

use zigbee_log_cli::hub::HubConfig;

#[derive(Parser)]
#[command(name = "hub-capture")]
#[command(about = "Stream the Hubitat radio log socket to stdout or a file")]
#[command(version)]
struct Cli {
    /// Append captured lines to this file instead of stdout
    #[arg(short, long, value_name = "FILE")]
    output: Option<PathBuf>,
}

fn main() -> Result<()> {
    env_logger::Builder::from_env(Env::default().default_filter_or("info")).init();
    let cli = Cli::parse();
    let config = HubConfig::load()?;

    let mut sink = match &cli.output {
        Some(path) => {
            let file = File::options()
                .create(true)
                .append(true)
                .open(path)
                .with_context(|| format!("could not open {}", path.display()))?;
            Some(BufWriter::new(file))
        }
        None => None,
    };

    let url = config.log_socket_url();
    let mut request = url.as_str().into_client_request()?;
    request.headers_mut().insert(COOKIE, config.cookie().parse()?);

    println!("Connecting to Hubitat log stream at {url}...");
    let (mut socket, _response) = tungstenite::connect(request).with_context(|| {
        format!(
            "Is the Hubitat hub online and reachable at {}?",
            config.hub_ip
        )
    })?;
    println!("Connected. Streaming logs (Press Ctrl+C to stop):");

    loop {
        match socket.read() {
            Ok(Message::Text(text)) => match &mut sink {
                Some(out) => {
                    writeln!(out, "{text}")?;
                    out.flush()?;
                }
                None => println!("{text}"),
            },
            Ok(Message::Close(_)) | Err(tungstenite::Error::ConnectionClosed) => {
                println!("Log stream closed gracefully.");
                break;
            }
            // Ping/pong and binary frames carry no log lines
            Ok(_) => {}
            Err(e) => {
                return Err(e).context("Log stream connection lost");
            }
        }
    }
    Ok(())
}
