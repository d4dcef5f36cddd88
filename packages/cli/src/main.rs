#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Command-line front end for civic issue analytics and triage.
//!
//! ```text
//! civic_triage analyze --input issues.json [--config thresholds.toml] [--now 2024-07-01T00:00:00Z] [--compact]
//! civic_triage classify --title "Pothole on Main St" --description "..." [--image photo.jpg] [--offline]
//! ```
//!
//! Both commands print JSON on stdout. Logging goes to stderr and is
//! controlled by `RUST_LOG`.

use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use civic_triage_ai::TriageClassifier;
use civic_triage_analytics::{AnalyticsConfig, AnalyticsEngine};
use clap::{Parser, Subcommand};

#[derive(Parser)]
#[command(
    name = "civic_triage",
    about = "Predictive analytics and triage for civic issue reports"
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Analyze a JSON array of historical issues
    Analyze {
        /// Path to the issues JSON file, or `-` for stdin
        #[arg(long)]
        input: PathBuf,
        /// TOML file overriding analysis thresholds
        #[arg(long)]
        config: Option<PathBuf>,
        /// Reference time (RFC 3339) instead of the current time
        #[arg(long, value_parser = parse_now)]
        now: Option<DateTime<Utc>>,
        /// Print compact instead of pretty JSON
        #[arg(long)]
        compact: bool,
    },
    /// Classify a single issue report
    Classify {
        /// Short title of the report
        #[arg(long)]
        title: String,
        /// Full description of the report
        #[arg(long, default_value = "")]
        description: String,
        /// Photo attached to the report
        #[arg(long)]
        image: Option<PathBuf>,
        /// Skip the AI provider and use keyword rules only
        #[arg(long)]
        offline: bool,
    },
}

fn parse_now(s: &str) -> Result<DateTime<Utc>, String> {
    DateTime::parse_from_rfc3339(s)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| format!("expected an RFC 3339 timestamp: {e}"))
}

fn read_input(path: &Path) -> std::io::Result<String> {
    if path.as_os_str() == "-" {
        std::io::read_to_string(std::io::stdin())
    } else {
        std::fs::read_to_string(path)
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    pretty_env_logger::init();
    let cli = Cli::parse();

    match cli.command {
        Commands::Analyze {
            input,
            config,
            now,
            compact,
        } => {
            let config = match config {
                Some(path) => AnalyticsConfig::load(&path)?,
                None => AnalyticsConfig::default(),
            };
            let engine = AnalyticsEngine::new(config);

            let text = read_input(&input)?;
            log::info!("Read analytics input from {}", input.display());

            let payload = engine.analyze_str_at(&text, now.unwrap_or_else(Utc::now));

            let json = if compact {
                serde_json::to_string(&payload)?
            } else {
                serde_json::to_string_pretty(&payload)?
            };
            println!("{json}");
        }
        Commands::Classify {
            title,
            description,
            image,
            offline,
        } => {
            let classifier = if offline {
                TriageClassifier::offline()
            } else {
                TriageClassifier::from_env()
            };
            let image = image.map(std::fs::read).transpose()?;

            let result = classifier
                .classify(&title, &description, image.as_deref())
                .await;

            println!("{}", serde_json::to_string_pretty(&result)?);
        }
    }

    Ok(())
}
