//! lifestats CLI
//!
//! Command-line interface for the aggregation engine:
//! - Aggregate a series from a records file
//! - List the series keys in a file
//! - Show the placeholder series
//! - Generate a default config file

use anyhow::{anyhow, Context, Result};
use chrono::{DateTime, FixedOffset, Offset, Utc};
use clap::{Parser, Subcommand, ValueEnum};
use lifestats::config::{generate_default_config, Config};
use lifestats::import::{parse_duration, parse_range_end, parse_timestamp, RecordImporter};
use lifestats::logging;
use lifestats::stats::{
    placeholder_series, AggregationMethod, PeriodGranularity, Record, SeriesPoint, SortOrder,
    TimeRange, TimeSeriesAggregator, WeekStart,
};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

#[derive(Parser)]
#[command(name = "lifestats")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Aggregate personal tracking records into time series")]
#[command(long_about = "lifestats groups timestamped records into hourly, daily, weekly, monthly or yearly periods\nand reduces each period to a single value.")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Config file (default: search standard locations)
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// Output format
    #[arg(short, long, value_enum, default_value = "table", global = true)]
    pub format: OutputFormat,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    Table,
    Json,
    Csv,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Aggregate one series from a records file
    Aggregate {
        /// Records file (.json, .ndjson, .jsonl, .csv)
        input: PathBuf,
        /// Series key (empty shows the placeholder series)
        #[arg(short, long, default_value = "")]
        key: String,
        /// Range start: Unix millis, RFC 3339, or a date
        #[arg(long)]
        from: Option<String>,
        /// Range end (a bare date includes the whole day)
        #[arg(long)]
        to: Option<String>,
        /// Relative range ending now (e.g., 7d, 4w, 3m, 1y)
        #[arg(short, long, conflicts_with_all = ["from", "to"])]
        last: Option<String>,
        /// Period size (hour, day, week, month, year)
        #[arg(short, long)]
        granularity: Option<String>,
        /// Aggregation method (sum, mean, min, max, count, first)
        #[arg(short, long)]
        method: Option<String>,
        /// Output order (key, label)
        #[arg(long)]
        sort: Option<String>,
        /// Minutes east of UTC for local calendar days
        #[arg(long, allow_negative_numbers = true)]
        utc_offset: Option<i32>,
        /// First day of the week (monday, sunday)
        #[arg(long)]
        week_start: Option<String>,
    },

    /// List series keys in a records file
    Keys {
        /// Records file
        input: PathBuf,
    },

    /// Show the placeholder series
    Placeholder,

    /// Generate default config file
    Config {
        /// Output path (default: stdout)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let mut config = Config::resolve(cli.config.as_deref()).context("Failed to load config")?;
    logging::init(&config.logging);

    match cli.command {
        Commands::Aggregate {
            input,
            key,
            from,
            to,
            last,
            granularity,
            method,
            sort,
            utc_offset,
            week_start,
        } => {
            // 1. Command-line flags override config
            if let Some(g) = granularity {
                config.stats.granularity = PeriodGranularity::from_str(&g)
                    .ok_or_else(|| anyhow!("Unknown granularity: {}", g))?;
            }
            if let Some(m) = method {
                config.stats.method = AggregationMethod::from_str(&m)
                    .ok_or_else(|| anyhow!("Unknown aggregation method: {}", m))?;
            }
            if let Some(s) = sort {
                config.stats.sort =
                    SortOrder::from_str(&s).ok_or_else(|| anyhow!("Unknown sort order: {}", s))?;
            }
            if let Some(w) = week_start {
                config.stats.week_start =
                    WeekStart::from_str(&w).ok_or_else(|| anyhow!("Unknown week start: {}", w))?;
            }
            if let Some(minutes) = utc_offset {
                config.stats.utc_offset_minutes = minutes;
            }

            let offset = config
                .stats
                .offset()
                .ok_or_else(|| anyhow!("UTC offset out of range: {}", config.stats.utc_offset_minutes))?;

            // 2. Load records
            let records = load_records(&input, offset)?;

            // 3. Resolve the range
            let flags = RangeFlags { last, from, to };
            let range = resolve_range(&flags, &records, &key, &offset, Utc::now())?;

            // 4. Aggregate
            let aggregator = TimeSeriesAggregator::new(config.stats.aggregate_options());
            let series: Vec<SeriesPoint> = aggregator
                .aggregate(
                    &records,
                    &key,
                    range,
                    config.stats.granularity,
                    config.stats.method,
                )
                .iter()
                .map(|b| b.to_point())
                .collect();

            output_series(&series, cli.format)?;
        }

        Commands::Keys { input } => {
            let offset = config.stats.offset().unwrap_or_else(|| Utc.fix());
            let records = load_records(&input, offset)?;
            let keys = summarize_keys(&records);

            match cli.format {
                OutputFormat::Json => {
                    let rows: Vec<serde_json::Value> = keys
                        .iter()
                        .map(|(key, s)| {
                            serde_json::json!({
                                "key": key,
                                "count": s.count,
                                "first": s.first,
                                "last": s.last,
                            })
                        })
                        .collect();
                    println!("{}", serde_json::to_string_pretty(&rows)?);
                }
                OutputFormat::Csv => {
                    let mut writer = csv::Writer::from_writer(std::io::stdout());
                    writer.write_record(["key", "count", "first", "last"])?;
                    for (key, s) in &keys {
                        writer.serialize((key, s.count, s.first, s.last))?;
                    }
                    writer.flush()?;
                }
                OutputFormat::Table => {
                    if keys.is_empty() {
                        println!("No records");
                        return Ok(());
                    }

                    println!("{:<20} | {:>8} | {:<16} | {:<16}", "Key", "Records", "First", "Last");
                    println!("{}", "-".repeat(70));
                    for (key, s) in &keys {
                        println!(
                            "{:<20} | {:>8} | {:<16} | {:<16}",
                            key,
                            s.count,
                            format_millis(s.first, &offset),
                            format_millis(s.last, &offset)
                        );
                    }
                }
            }
        }

        Commands::Placeholder => {
            output_series(&placeholder_series(), cli.format)?;
        }

        Commands::Config { output } => {
            let content = generate_default_config();

            if let Some(path) = output {
                std::fs::write(&path, &content)
                    .with_context(|| format!("Failed to write {:?}", path))?;
                println!("Config written to {:?}", path);
            } else {
                println!("{}", content);
            }
        }
    }

    Ok(())
}

/// Range flags of the `aggregate` command
struct RangeFlags {
    last: Option<String>,
    from: Option<String>,
    to: Option<String>,
}

/// Turn range flags into a time range
///
/// `--last` ends at `now`. Without any flag the range spans the key's
/// records, and a missing `--from` or `--to` falls back to that span.
fn resolve_range(
    flags: &RangeFlags,
    records: &[Record],
    key: &str,
    offset: &FixedOffset,
    now: DateTime<Utc>,
) -> Result<TimeRange> {
    if let Some(last) = &flags.last {
        let span = parse_duration(last).ok_or_else(|| anyhow!("Invalid duration: {}", last))?;
        let start = now
            .checked_sub_signed(span)
            .ok_or_else(|| anyhow!("Duration out of range: {}", last))?;
        return Ok(TimeRange::new(start.timestamp_millis(), now.timestamp_millis()));
    }

    let spanned = TimeRange::spanning(records, key);

    let start = match &flags.from {
        Some(s) => {
            Some(parse_timestamp(s, offset).ok_or_else(|| anyhow!("Invalid --from: {}", s))?)
        }
        None => spanned.start,
    };
    let end = match &flags.to {
        Some(s) => {
            Some(parse_range_end(s, offset).ok_or_else(|| anyhow!("Invalid --to: {}", s))?)
        }
        None => spanned.end,
    };

    Ok(TimeRange { start, end })
}

fn load_records(path: &Path, offset: FixedOffset) -> Result<Vec<Record>> {
    let result = RecordImporter::new()
        .with_offset(offset)
        .import(path)
        .with_context(|| format!("Failed to import {:?}", path))?;

    if result.rows_failed > 0 {
        eprintln!("Skipped {} of {} rows:", result.rows_failed, result.rows_processed);
        for error in result.errors.iter().take(10) {
            eprintln!("  {}", error);
        }
    }

    Ok(result.records)
}

struct KeySummary {
    count: usize,
    first: i64,
    last: i64,
}

fn summarize_keys(records: &[Record]) -> BTreeMap<String, KeySummary> {
    let mut keys: BTreeMap<String, KeySummary> = BTreeMap::new();

    for record in records {
        keys.entry(record.key.clone())
            .and_modify(|s| {
                s.count += 1;
                s.first = s.first.min(record.timestamp);
                s.last = s.last.max(record.timestamp);
            })
            .or_insert(KeySummary {
                count: 1,
                first: record.timestamp,
                last: record.timestamp,
            });
    }

    keys
}

fn format_millis(ts: i64, offset: &FixedOffset) -> String {
    DateTime::from_timestamp_millis(ts)
        .map(|dt| dt.with_timezone(offset).format("%Y-%m-%d %H:%M").to_string())
        .unwrap_or_else(|| "-".to_string())
}

fn output_series(series: &[SeriesPoint], format: OutputFormat) -> Result<()> {
    match format {
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(series)?),
        OutputFormat::Csv => print_csv(series)?,
        OutputFormat::Table => print_table(series),
    }
    Ok(())
}

fn print_table(series: &[SeriesPoint]) {
    if series.is_empty() {
        println!("No data for the selected range");
        return;
    }

    println!("{:<18} | {:<14} | {:>10} | {:>7}", "Period", "Label", "Value", "Samples");
    println!("{}", "-".repeat(58));

    for point in series {
        println!(
            "{:<18} | {:<14} | {:>10.2} | {:>7}",
            point.period_key, point.period_label, point.value, point.sample_count
        );
    }
}

fn print_csv(series: &[SeriesPoint]) -> Result<()> {
    let mut writer = csv::Writer::from_writer(std::io::stdout());
    for point in series {
        writer.serialize(point)?;
    }
    writer.flush()?;
    Ok(())
}
