//! # Site Admin
//!
//! Command-line content management for the agency website. Every command
//! goes through the same cached, fallback-aware client the site uses, so
//! what `list` prints is what a visitor would be served.

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use colored::*;
use serde_json::Value;
use std::io::Read;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing_subscriber::EnvFilter;

use lib_site::content::{default_records, Lead};
use lib_site::{Collection, ContentClient, ContentClientOptions, Origin};

/// Manage the agency website's content through its API.
#[derive(Parser)]
#[clap(name = "site_admin", version, about = "Manage agency website content through its API.")]
pub struct Cli {
    #[clap(long, env = "SITE_API_URL", default_value = "http://localhost:3000/", help = "Base URL of the site.")]
    pub api_url: String,

    #[clap(long, env = "SITE_ADMIN_TOKEN", help = "Admin bearer token.")]
    pub token: Option<String>,

    #[clap(long, default_value_t = 3500, help = "Read timeout in milliseconds before bundled defaults are used.")]
    pub timeout_ms: u64,

    #[clap(subcommand)]
    pub command: Command,
}

#[derive(Subcommand)]
pub enum Command {
    /// List a collection (bundled defaults are shown when the API fails or is empty).
    List { collection: Collection },
    /// Show one record.
    Get { collection: Collection, id: String },
    /// Create or update records from a JSON object or array.
    Save {
        collection: Collection,
        #[clap(long, short = 'f', help = "JSON file to read; stdin when omitted.")]
        file: Option<PathBuf>,
    },
    /// Delete one record.
    Delete { collection: Collection, id: String },
    /// Show the site settings, or replace them from a file.
    Settings {
        #[clap(long, short = 'f', help = "JSON file with the new settings.")]
        file: Option<PathBuf>,
    },
    /// Upload the bundled defaults into every empty collection.
    Seed,
    /// Submit a contact-form lead, as the public site does.
    Lead {
        #[clap(long)]
        name: String,
        #[clap(long)]
        email: String,
        #[clap(long)]
        phone: Option<String>,
        #[clap(long)]
        company: Option<String>,
        #[clap(long)]
        service: Option<String>,
        #[clap(long)]
        message: Option<String>,
    },
}

fn origin_label(origin: Origin) -> ColoredString {
    match origin {
        Origin::Network => "network".green(),
        Origin::Cache => "cache".cyan(),
        Origin::Fallback => "bundled defaults".yellow(),
    }
}

fn print_json(value: &Value) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

fn read_json(file: Option<&Path>) -> Result<Value> {
    let text = match file {
        Some(path) => std::fs::read_to_string(path)
            .with_context(|| format!("Cannot read {}", path.display()))?,
        None => {
            let mut buf = String::new();
            std::io::stdin().read_to_string(&mut buf)?;
            buf
        }
    };
    serde_json::from_str(&text).context("Input is not valid JSON")
}

/// An array is saved record by record; anything else as one record.
fn into_records(input: Value) -> Vec<Value> {
    match input {
        Value::Array(items) => items,
        other => vec![other],
    }
}

async fn run(cli: Cli) -> Result<()> {
    let options = ContentClientOptions {
        timeout: Duration::from_millis(cli.timeout_ms),
        auth_token: cli.token.clone(),
        ..ContentClientOptions::default()
    };
    let client = ContentClient::new(&cli.api_url, options)?;

    match cli.command {
        Command::List { collection } => {
            let loaded = client.load(collection).await;
            eprintln!(
                "{} {} record(s) from {}",
                collection.to_string().bold(),
                loaded.data.len(),
                origin_label(loaded.origin)
            );
            print_json(&Value::Array(loaded.data.to_vec()))?;
        }
        Command::Get { collection, id } => match client.fetch_one(collection, &id).await? {
            Some(record) => print_json(&record)?,
            None => bail!("No {} record with id {}", collection, id),
        },
        Command::Save { collection, file } => {
            for record in into_records(read_json(file.as_deref())?) {
                let saved = client.save(collection, record).await?;
                let id = saved.get("id").and_then(Value::as_str).unwrap_or("?");
                eprintln!("{} {}/{}", "saved".green(), collection, id);
                print_json(&saved)?;
            }
        }
        Command::Delete { collection, id } => {
            client.delete(collection, &id).await?;
            eprintln!("{} {}/{}", "deleted".red(), collection, id);
        }
        Command::Settings { file: Some(file) } => {
            let saved = client.save_settings(read_json(Some(file.as_path()))?).await?;
            eprintln!("{}", "settings saved".green());
            print_json(&saved)?;
        }
        Command::Settings { file: None } => {
            let loaded = client.settings().await;
            eprintln!("settings from {}", origin_label(loaded.origin));
            print_json(&serde_json::to_value(&loaded.data)?)?;
        }
        Command::Seed => seed(&client).await?,
        Command::Lead { name, email, phone, company, service, message } => {
            let lead = Lead {
                name,
                email,
                phone,
                company,
                service,
                message,
                ..Lead::default()
            };
            let saved = client.submit_lead(&lead).await?;
            eprintln!("{}", "lead submitted".green());
            print_json(&saved)?;
        }
    }
    Ok(())
}

async fn seed(client: &ContentClient) -> Result<()> {
    let mut written = 0;
    for collection in Collection::ALL {
        let defaults = default_records(collection);
        if defaults.is_empty() {
            continue;
        }
        // 1. Only empty collections are seeded
        let existing = client
            .fetch_all(collection)
            .await
            .with_context(|| format!("Cannot read {}", collection))?;
        if !existing.is_empty() {
            println!("{:<14} {}", collection.to_string(), "already has content".dimmed());
            continue;
        }
        // 2. Upload each bundled record
        for record in defaults {
            client.save(collection, record).await?;
            written += 1;
        }
        println!("{:<14} {}", collection.to_string(), "seeded".green());
    }
    println!("{} record(s) written", written.to_string().bold());
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")))
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    if let Err(e) = run(cli).await {
        eprintln!("{} {:#}", "error:".red().bold(), e);
        std::process::exit(1);
    }
    Ok(())
}
