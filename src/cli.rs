//! Subcommand runners. Human-readable output by default, JSON with `--json`.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::Args;
use serde::Serialize;
use user_events::{
    export::{self, Dimension, ExportFilter, PairSource, PgEventSource, DEFAULT_LISTING_LIMIT},
    index::{self, PgCatalog, USER_EVENTS_INDEXES},
    Config, ExportStats, ExportSummary,
};

const RULE: &str = "================================================================================";

/// Run the indexes subcommand
pub async fn run_indexes(config: &Config, json: bool) -> Result<()> {
    if !json {
        println!("{}", RULE);
        println!("Provisioning indexes on public.user_events");
        println!("{}", RULE);
        println!();
    }

    let mut catalog = PgCatalog::connect(config)
        .await
        .context("Could not connect to database")?;

    let result = index::provision(&mut catalog, &USER_EVENTS_INDEXES).await;

    // Release the connection even if provisioning bailed out
    if let Err(e) = catalog.close().await {
        tracing::warn!(error = %e, "failed to close connection cleanly");
    }

    let report = result.context("Index provisioning aborted")?;

    if json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        print!("{}", report.render());
        println!();
        println!("{}", RULE);
        println!("Done.");
        println!("{}", RULE);
    }
    Ok(())
}

#[derive(Debug, Args)]
pub struct ExportArgs {
    /// First day of the window (YYYY-MM-DD, inclusive)
    #[arg(long)]
    pub start: String,
    /// Last day of the window (YYYY-MM-DD, inclusive)
    #[arg(long)]
    pub end: String,
    /// Event type to include; repeat for several
    #[arg(long = "event-type", required = true)]
    pub event_types: Vec<String>,
    /// Advertiser identifier to include; repeat for several
    #[arg(long = "advertiser", required = true)]
    pub advertisers: Vec<String>,
    /// Minimum converted_amount (inclusive)
    #[arg(long)]
    pub min_deposit: Option<f64>,
    /// Maximum converted_amount (inclusive)
    #[arg(long)]
    pub max_deposit: Option<f64>,
    /// Destination CSV file, replaced once the export succeeds
    #[arg(short, long)]
    pub output: PathBuf,
}

impl ExportArgs {
    fn filter(&self) -> Result<ExportFilter> {
        let filter = ExportFilter::new(
            export::parse_date(&self.start)?,
            export::parse_date(&self.end)?,
            self.event_types.iter().cloned(),
            self.advertisers.iter().cloned(),
        )?
        .with_deposit_range(self.min_deposit, self.max_deposit)?;
        Ok(filter)
    }
}

#[derive(Serialize)]
struct ExportOutput<'a> {
    filter: &'a ExportFilter,
    output: &'a Path,
    #[serde(flatten)]
    summary: ExportSummary,
    stats: ExportStats,
}

/// Run the export subcommand
pub async fn run_export(config: &Config, args: &ExportArgs, json: bool) -> Result<()> {
    let filter = args.filter()?;
    let output = args.output.as_path();

    if !json {
        println!("Connecting to {}...", config.redacted_url());
    }
    let mut source = PgEventSource::connect(config)
        .await
        .context("Could not connect to database")?;

    if !json {
        println!("Running query...");
        println!("  Period: {} to {}", filter.start(), filter.end());
        println!("  Event types: {}", filter.event_types().join(", "));
        println!("  Advertisers: {}", filter.advertisers().join(", "));
        if let Some(min) = filter.min_deposit() {
            println!("  Min deposit: {}", min);
        }
        if let Some(max) = filter.max_deposit() {
            println!("  Max deposit: {}", max);
        }
    }

    let result = async {
        let summary = export::export_to_file(&mut source, &filter, output)
            .await
            .with_context(|| format!("Export to '{}' failed", output.display()))?;
        let stats = source
            .stats(&filter)
            .await
            .context("Statistics query failed")?;
        anyhow::Ok((summary, stats))
    }
    .await;

    if let Err(e) = source.close().await {
        tracing::warn!(error = %e, "failed to close connection cleanly");
    }

    let (summary, stats) = result?;

    if json {
        let out = ExportOutput {
            filter: &filter,
            output,
            summary,
            stats,
        };
        println!("{}", serde_json::to_string_pretty(&out)?);
    } else {
        println!("Exported {} unique pairs to '{}'", summary.rows_written, output.display());
        println!();
        println!("Statistics:");
        println!("  Total events: {}", stats.total_events);
        println!("  Unique users: {}", stats.unique_users);
        println!("  Unique UA/IP pairs: {}", stats.unique_pairs);
    }
    Ok(())
}

#[derive(Serialize)]
struct ListingOutput {
    column: Dimension,
    values: Vec<String>,
}

/// Run the event-types / advertisers subcommands
pub async fn run_listing(config: &Config, dimension: Dimension, limit: Option<usize>, json: bool) -> Result<()> {
    let mut source = PgEventSource::connect(config)
        .await
        .context("Could not connect to database")?;

    let result = export::list_values(&mut source, dimension, limit.unwrap_or(DEFAULT_LISTING_LIMIT))
        .await
        .with_context(|| format!("Listing distinct {} values failed", dimension.column()));

    if let Err(e) = source.close().await {
        tracing::warn!(error = %e, "failed to close connection cleanly");
    }

    let values = result?;

    if json {
        let out = ListingOutput {
            column: dimension,
            values,
        };
        println!("{}", serde_json::to_string_pretty(&out)?);
    } else {
        println!("Distinct {} values ({}):", dimension.column(), values.len());
        for value in &values {
            println!("  - {}", value);
        }
    }
    Ok(())
}
