//! Resolve CurseForge pack entries into download URLs
//!
//! Reads a JSON array of entries:
//!
//! ```json
//! [
//!   { "name": "Sodium", "dest": "mods/sodium.jar", "curseforge": { "file-id": 4567890, "project-id": 394468 } }
//! ]
//! ```
//!
//! The API key is read from `CURSEFORGE_API_KEY` (a `.env` file is honoured).

use anyhow::{Context, Result};
use clap::Parser;
use packwiz_installer::{CurseForgeConfig, CurseForgeResolver, ModReference, ResolutionReport};
use serde::Serialize;
use std::path::PathBuf;
use std::time::Duration;
use tracing::Level;

#[derive(Parser, Debug)]
#[command(name = "packwiz-cf-resolve", version, about = "Resolve CurseForge download URLs for pack entries")]
struct Args {
    /// JSON file with the entries to resolve
    entries: PathBuf,

    /// Pack folder manual downloads should be saved into
    #[arg(short, long, default_value = ".")]
    pack_folder: PathBuf,

    /// API base URL to use instead of the configured ones (repeat for mirrors)
    #[arg(short, long = "endpoint")]
    endpoints: Vec<String>,

    /// Per-request timeout in seconds
    #[arg(long)]
    timeout: Option<u64>,

    /// Print the result as JSON
    #[arg(long)]
    json: bool,

    /// Enable debug logging
    #[arg(short, long)]
    verbose: bool,
}

#[derive(Serialize)]
struct ResolvedEntry<'a> {
    name: &'a str,
    url: &'a str,
}

#[derive(Serialize)]
struct FailureEntry<'a> {
    label: &'a str,
    kind: &'static str,
    message: &'a str,
    url: Option<&'a str>,
}

#[derive(Serialize)]
struct Output<'a> {
    resolved: Vec<ResolvedEntry<'a>>,
    failures: Vec<FailureEntry<'a>>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    tracing_subscriber::fmt()
        .with_max_level(if args.verbose { Level::DEBUG } else { Level::INFO })
        .with_writer(std::io::stderr)
        .init();

    let mut config = CurseForgeConfig::from_env().context("Failed to load CurseForge configuration")?;
    if !args.endpoints.is_empty() {
        config = config.with_endpoints(args.endpoints.iter().cloned());
    }
    if let Some(secs) = args.timeout {
        config = config.with_timeout(Duration::from_secs(secs));
    }

    let resolver = CurseForgeResolver::new(&config).context("Failed to set up CurseForge resolver")?;

    let raw = tokio::fs::read_to_string(&args.entries)
        .await
        .with_context(|| format!("Failed to read {}", args.entries.display()))?;
    let mut entries: Vec<ModReference> =
        serde_json::from_str(&raw).with_context(|| format!("Failed to parse {}", args.entries.display()))?;

    let report = resolver.resolve(&mut entries, &args.pack_folder).await;

    if args.json {
        print_json(&entries, &report)?;
    } else {
        print_text(&entries, &report);
    }

    if report.has_errors() {
        std::process::exit(1);
    }
    Ok(())
}

fn print_text(entries: &[ModReference], report: &ResolutionReport) {
    for entry in entries {
        if let Some(url) = entry.resolved_url() {
            println!("{} -> {}", entry.name, url);
        }
    }

    let manual: Vec<_> = report.manual_downloads().collect();
    if !manual.is_empty() {
        println!("\n{} file(s) must be downloaded manually:", manual.len());
        for failure in manual {
            println!("- {}\n  {}", failure.label, failure.message.replace('\n', "\n  "));
        }
    }

    let errors: Vec<_> = report.errors().collect();
    if !errors.is_empty() {
        println!("\n{} error(s):", errors.len());
        for failure in errors {
            println!("- {}: {}", failure.label, failure.message);
        }
    }
}

fn print_json(entries: &[ModReference], report: &ResolutionReport) -> Result<()> {
    let output = Output {
        resolved: entries
            .iter()
            .filter_map(|e| {
                e.resolved_url().map(|url| ResolvedEntry {
                    name: &e.name,
                    url: url.as_str(),
                })
            })
            .collect(),
        failures: report
            .failures
            .iter()
            .map(|f| FailureEntry {
                label: &f.label,
                kind: f.kind.as_str(),
                message: &f.message,
                url: f.url.as_deref(),
            })
            .collect(),
    };

    println!("{}", serde_json::to_string_pretty(&output)?);
    Ok(())
}
