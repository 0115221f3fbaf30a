//! Groovy source upload to a Hubitat hub.
//!
//! Pushes an app or driver file through the hub's saveOrUpdateJson
//! endpoint, the same call the web editor makes. The script type is taken
//! from the file's location: anything under apps/ is an app, anything
//! under drivers/ is a driver.

use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{bail, Context, Result};
use clap::Parser;
use env_logger::Env;
use reqwest::blocking::Client;
use reqwest::header::COOKIE;
use serde_json::{json, Value};

use zigbee_log_cli::hub::HubConfig;

#[derive(Parser)]
#[command(name = "hub-push")]
#[command(about = "Push app or driver code to a Hubitat hub")]
#[command(version)]
struct Cli {
    /// Groovy source file, under an apps/ or drivers/ directory
    #[arg(value_name = "FILE")]
    file: PathBuf,
}

fn script_type(path: &Path) -> Option<&'static str> {
    for component in path.components() {
        match component.as_os_str().to_str() {
            Some("apps") => return Some("app"),
            Some("drivers") => return Some("driver"),
            _ => {}
        }
    }
    None
}

fn main() -> Result<()> {
    env_logger::Builder::from_env(Env::default().default_filter_or("info")).init();
    let cli = Cli::parse();
    let config = HubConfig::load()?;

    let Some(script_type) = script_type(&cli.file) else {
        bail!(
            "Could not determine script type (app or driver) from file path: {}\n\
             Please ensure the file is in an 'apps/' or 'drivers/' subdirectory.",
            cli.file.display()
        );
    };

    let source = std::fs::read_to_string(&cli.file)
        .with_context(|| format!("Error reading file {}", cli.file.display()))?;

    let url = config.push_url(script_type);
    println!("Attempting to push {script_type} code to {url}...");

    let client = Client::builder().timeout(Duration::from_secs(10)).build()?;
    let response = client
        .post(&url)
        .header(COOKIE, config.cookie())
        .header("X-Requested-With", "XMLHttpRequest")
        .json(&json!({ "source": source, "version": 1 }))
        .send()
        .with_context(|| {
            format!(
                "Could not connect to Hubitat hub at {}. Is the IP correct?",
                config.hub_ip
            )
        })?;

    let status = response.status();
    let body = response.text().context("Failed to read Hubitat response")?;
    if !status.is_success() {
        bail!("Error pushing code: HTTP {status} - {body}");
    }

    let parsed: Value = serde_json::from_str(&body)
        .with_context(|| format!("Failed to parse Hubitat response as JSON. Raw response: {body}"))?;
    if parsed.get("status").and_then(Value::as_str) == Some("success") {
        let id = parsed.get("id").cloned().unwrap_or(Value::Null);
        println!("Successfully pushed {script_type} code. ID: {id}");
        Ok(())
    } else {
        bail!("Failed to push {script_type} code. Hubitat response: {parsed}");
    }
}
