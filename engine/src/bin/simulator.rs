// VCN referral reward curve simulator
//
// Prints, for every level of a referral configuration, the rank, the invites
// needed for the next level, the cumulative invites and the effective tier
// rates, so the economics can be checked before the configuration is saved.
//
// Usage:
//   vcn_referral_simulator --config referral.json
//   vcn_referral_simulator --stored --db-dir referral-db --format json
//   vcn_referral_simulator --level 42

use std::{fs, path::PathBuf, sync::Arc};

use anyhow::{bail, Context, Result};
use clap::{Parser, ValueEnum};
use log::{debug, info};
use vcn_referral_common::referral::{format_percent, ReferralConfig, SimulationReport, SimulationRow};
use vcn_referral_engine::{
    config::{EngineConfig, StorageBackend},
    core::{
        settings::ReferralSettings,
        storage::{MemoryStorage, SledStorage, Storage},
    },
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum OutputFormat {
    Table,
    Json,
}

#[derive(Parser, Debug)]
#[command(name = "vcn_referral_simulator")]
#[command(about = "Preview the referral reward curve of a configuration", long_about = None)]
struct Args {
    /// ReferralConfig JSON file to simulate
    #[arg(short, long, conflicts_with = "stored")]
    config: Option<PathBuf>,

    /// Simulate the configuration saved in the referral database
    #[arg(long, default_value_t = false)]
    stored: bool,

    /// Only print this level
    #[arg(short, long)]
    level: Option<u32>,

    /// Output format
    #[arg(short, long, value_enum, default_value_t = OutputFormat::Table)]
    format: OutputFormat,

    /// Enable verbose logging
    #[arg(short, long, default_value_t = false)]
    verbose: bool,

    #[command(flatten)]
    engine: EngineConfig,
}

async fn load_stored<S: Storage>(storage: Arc<S>) -> Result<ReferralConfig> {
    let config = ReferralSettings::new(storage)
        .load()
        .await
        .context("Error while loading the stored referral config")?;
    Ok(config)
}

async fn load_config(args: &Args) -> Result<ReferralConfig> {
    if let Some(path) = &args.config {
        info!("Loading referral config from {}", path.display());
        let content = fs::read_to_string(path)
            .with_context(|| format!("Error while reading {}", path.display()))?;
        let config = serde_json::from_str(&content)
            .with_context(|| format!("Invalid referral config in {}", path.display()))?;
        return Ok(config);
    }

    if args.stored {
        return match args.engine.storage_backend {
            StorageBackend::Sled => {
                let storage = SledStorage::new(&args.engine.db_dir)
                    .with_context(|| format!("Error while opening {}", args.engine.db_dir))?;
                load_stored(Arc::new(storage)).await
            }
            // A fresh memory backend holds no saved config
            StorageBackend::Memory => {
                bail!("--stored reads the saved config and needs --storage-backend sled")
            }
        };
    }

    debug!("No config given, simulating the default referral config");
    Ok(ReferralConfig::default())
}

fn print_header() {
    println!(
        "{:>5}  {:<12} {:>10} {:>12} {:>10} {:>10} {:>10}",
        "LEVEL", "RANK", "TO NEXT", "CUMULATIVE", "MULT", "TIER 1", "TIER 2"
    );
}

fn print_row(row: &SimulationRow) {
    println!(
        "{:>5}  {:<12} {:>10} {:>12} {:>10.4} {:>10} {:>10}",
        row.level,
        row.rank.as_deref().unwrap_or("-"),
        row.invites_to_next,
        row.cumulative,
        row.multiplier,
        row.tier1_percent,
        row.tier2_percent
    );
}

fn print_table(config: &ReferralConfig, report: &SimulationReport) {
    println!(
        "Base rates: tier 1 {}, tier 2 {}",
        format_percent(config.tier1_rate),
        format_percent(config.tier2_rate)
    );
    println!();
    print_header();
    for row in &report.rows {
        print_row(row);
    }

    println!();
    println!("{:<12} {:>8} {:>12}", "RANK", "MIN LVL", "CUMULATIVE");
    for milestone in &report.rank_milestones {
        println!(
            "{:<12} {:>8} {:>12}",
            milestone.name, milestone.min_lvl, milestone.cumulative
        );
    }
    println!();
    println!(
        "Invites needed to reach the max level: {}",
        report.total_invites_to_max()
    );
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    let log_level = if args.verbose {
        log::LevelFilter::Debug
    } else {
        log::LevelFilter::Warn
    };
    env_logger::Builder::from_default_env()
        .filter_level(log_level)
        .format_timestamp_millis()
        .init();

    let config = load_config(&args).await?;
    // Preview never writes, the memory backend is enough here
    let settings = ReferralSettings::new(Arc::new(MemoryStorage::new()));

    if let Some(level) = args.level {
        let row = settings
            .preview_level(&config, level)
            .context("Error while simulating the referral config")?;
        match args.format {
            OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&row)?),
            OutputFormat::Table => {
                print_header();
                print_row(&row);
            }
        }
        return Ok(());
    }

    let report = settings
        .preview(&config)
        .context("Error while simulating the referral config")?;
    match args.format {
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&report)?),
        OutputFormat::Table => print_table(&config, &report),
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempdir::TempDir;

    fn parse(args: &[&str]) -> Args {
        Args::try_parse_from(std::iter::once("vcn_referral_simulator").chain(args.iter().copied()))
            .unwrap()
    }

    #[tokio::test]
    async fn test_stored_config_needs_sled() {
        let args = parse(&["--stored", "--storage-backend", "memory"]);
        let err = load_config(&args).await.unwrap_err();
        assert!(err.to_string().contains("--storage-backend sled"));
    }

    #[tokio::test]
    async fn test_stored_config_from_sled() {
        let temp_dir = TempDir::new("referral_simulator").unwrap();
        let db_dir = temp_dir.path().to_str().unwrap();
        let saved = ReferralConfig {
            tier1_rate: 0.2,
            ..Default::default()
        };
        {
            let storage = Arc::new(SledStorage::new(db_dir).unwrap());
            ReferralSettings::new(Arc::clone(&storage)).save(&saved).await.unwrap();
            storage.flush().await.unwrap();
        }

        let args = parse(&["--stored", "--db-dir", db_dir]);
        assert_eq!(load_config(&args).await.unwrap(), saved);
    }

    #[tokio::test]
    async fn test_default_config_without_source() {
        let args = parse(&[]);
        assert_eq!(load_config(&args).await.unwrap(), ReferralConfig::default());
    }
}
