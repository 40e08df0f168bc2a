#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! CLI entry point for traffic stop analytics.

mod config;

use std::io::Write as _;
use std::path::{Path, PathBuf};

use clap::{Args, Parser, Subcommand, ValueEnum};
use traffic_stops_analytics::{
    AnalyticsError, RangeFilter, ValueFilter, apply_range_filter, apply_value_filter,
    outcome_rates, search_share, summary_statistics,
};
use traffic_stops_ingest::{IngestError, load_searches, load_stops};
use traffic_stops_table::Table;

use crate::config::AnalysisConfig;

#[derive(Parser)]
#[command(name = "traffic_stops", about = "Traffic stop analytics")]
struct Cli {
    /// TOML file with `min_stops` and `[fill_values]` defaults
    #[arg(long, global = true)]
    config: Option<PathBuf>,
    /// Output format for the result table
    #[arg(long, global = true, value_enum, default_value_t = OutputFormat::Csv)]
    format: OutputFormat,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum OutputFormat {
    Csv,
    Json,
}

/// Row filters applied to the stops table before analysis.
#[derive(Debug, Args)]
struct FilterArgs {
    /// Keep rows whose column is one of the listed values (`col=v1,v2`)
    #[arg(long = "filter", value_name = "COL=VALUES")]
    filters: Vec<ValueFilter>,
    /// Keep rows whose column is within an inclusive range (`col=lo..hi`)
    #[arg(long = "range", value_name = "COL=LO..HI")]
    ranges: Vec<RangeFilter>,
}

#[derive(Subcommand)]
enum Commands {
    /// Median and mean of a numeric column per group
    Summary {
        /// Stops CSV file
        #[arg(long)]
        stops: PathBuf,
        /// Comma-separated group columns (e.g., "`driver_gender,driver_race`")
        #[arg(long, value_delimiter = ',', required = true)]
        group_by: Vec<String>,
        /// Column to summarize (default: `driver_age`)
        #[arg(long)]
        value: Option<String>,
        #[command(flatten)]
        filters: FilterArgs,
    },
    /// Share of each outcome value per group
    Rates {
        /// Stops CSV file
        #[arg(long)]
        stops: PathBuf,
        /// Comma-separated group columns
        #[arg(long, value_delimiter = ',', required = true)]
        group_by: Vec<String>,
        /// Outcome column (e.g., "`stop_outcome`")
        #[arg(long)]
        outcome: String,
        #[command(flatten)]
        filters: FilterArgs,
    },
    /// Search rates per group over officers with enough stops
    SearchShare {
        /// Stops CSV file
        #[arg(long)]
        stops: PathBuf,
        /// Searches CSV file
        #[arg(long)]
        searches: PathBuf,
        /// Comma-separated group columns
        #[arg(long, value_delimiter = ',', required = true)]
        group_by: Vec<String>,
        /// Minimum stops per officer (overrides the config file; default 25)
        #[arg(long)]
        min_stops: Option<usize>,
        #[command(flatten)]
        filters: FilterArgs,
    },
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    pretty_env_logger::init();
    let cli = Cli::parse();
    let config = AnalysisConfig::load(cli.config.as_deref())?;

    let Some(result) = run(cli.command, &config)? else {
        return Ok(());
    };

    match result {
        Ok(table) => write_table(&table, cli.format)?,
        Err(e) if e.is_absent() => {
            log::warn!("No result: {e}");
            eprintln!("No result: {e}");
        }
        Err(e) => return Err(e.into()),
    }
    Ok(())
}

/// Loads the inputs and runs one analysis. Returns `Ok(None)` when an
/// input file is missing.
fn run(
    command: Commands,
    config: &AnalysisConfig,
) -> Result<Option<Result<Table, AnalyticsError>>, Box<dyn std::error::Error>> {
    Ok(match command {
        Commands::Summary {
            stops,
            group_by,
            value,
            filters,
        } => {
            let Some(stops) = load_required_stops(&stops)? else {
                return Ok(None);
            };
            let groups = as_strs(&group_by);
            Some(
                filters
                    .apply(&stops)
                    .and_then(|t| summary_statistics(&t, &groups, value.as_deref())),
            )
        }
        Commands::Rates {
            stops,
            group_by,
            outcome,
            filters,
        } => {
            let Some(stops) = load_required_stops(&stops)? else {
                return Ok(None);
            };
            let groups = as_strs(&group_by);
            Some(
                filters
                    .apply(&stops)
                    .and_then(|t| outcome_rates(&t, &groups, &outcome)),
            )
        }
        Commands::SearchShare {
            stops,
            searches,
            group_by,
            min_stops,
            filters,
        } => {
            let Some(stops) = load_required_stops(&stops)? else {
                return Ok(None);
            };
            let Some(searches) = load_searches(&searches, config.fill_values.as_ref())? else {
                eprintln!("Searches file not found: {}", searches.display());
                return Ok(None);
            };
            let groups = as_strs(&group_by);
            let min_stops = min_stops.or(config.min_stops);
            Some(
                filters
                    .apply(&stops)
                    .and_then(|t| search_share(&t, &searches, &groups, min_stops)),
            )
        }
    })
}

fn load_required_stops(path: &Path) -> Result<Option<Table>, IngestError> {
    let stops = load_stops(path)?;
    if stops.is_none() {
        eprintln!("Stops file not found: {}", path.display());
    }
    Ok(stops)
}

fn as_strs(values: &[String]) -> Vec<&str> {
    values.iter().map(String::as_str).collect()
}

impl FilterArgs {
    fn apply(&self, table: &Table) -> Result<Table, AnalyticsError> {
        let table = apply_value_filter(table, &self.filters)?;
        apply_range_filter(&table, &self.ranges)
    }
}

fn write_table(table: &Table, format: OutputFormat) -> Result<(), Box<dyn std::error::Error>> {
    let mut stdout = std::io::stdout().lock();
    match format {
        OutputFormat::Csv => table.write_csv(&mut stdout)?,
        OutputFormat::Json => {
            serde_json::to_writer_pretty(&mut stdout, table)?;
            writeln!(stdout)?;
        }
    }
    stdout.flush()?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use traffic_stops_table::Value;

    use super::*;

    #[test]
    fn parses_search_share_with_filters() {
        let cli = Cli::try_parse_from([
            "traffic_stops",
            "--format",
            "json",
            "search-share",
            "--stops",
            "stops.csv",
            "--searches",
            "searches.csv",
            "--group-by",
            "driver_race,driver_gender",
            "--min-stops",
            "10",
            "--filter",
            "violation=Speeding,Equipment",
            "--range",
            "driver_age=21..36",
            "--range",
            "stop_year=2010..2015",
        ])
        .unwrap();
        assert_eq!(cli.format, OutputFormat::Json);
        let Commands::SearchShare {
            group_by,
            min_stops,
            filters,
            ..
        } = cli.command
        else {
            panic!("expected search-share");
        };
        assert_eq!(group_by, vec!["driver_race", "driver_gender"]);
        assert_eq!(min_stops, Some(10));
        assert_eq!(
            filters.filters,
            vec![ValueFilter::new("violation", ["Speeding", "Equipment"])]
        );
        assert_eq!(filters.ranges.len(), 2);
        assert_eq!(filters.ranges[1].low, Value::from("2010"));
    }

    #[test]
    fn format_defaults_to_csv_and_config_is_global() {
        let cli = Cli::try_parse_from([
            "traffic_stops",
            "summary",
            "--stops",
            "stops.csv",
            "--group-by",
            "driver_gender",
            "--config",
            "analysis.toml",
        ])
        .unwrap();
        assert_eq!(cli.format, OutputFormat::Csv);
        assert_eq!(cli.config, Some(PathBuf::from("analysis.toml")));
    }

    #[test]
    fn rejects_malformed_filters() {
        assert!(
            Cli::try_parse_from([
                "traffic_stops",
                "rates",
                "--stops",
                "stops.csv",
                "--group-by",
                "driver_race",
                "--outcome",
                "stop_outcome",
                "--range",
                "driver_age=21",
            ])
            .is_err()
        );
    }

    #[test]
    fn filters_apply_value_then_range() {
        let table = Table::read_csv(
            "driver_age,violation\n20,Speeding\n30,Speeding\n40,Equipment\n".as_bytes(),
            &[],
        )
        .unwrap();
        let args = FilterArgs {
            filters: vec!["violation=Speeding".parse().unwrap()],
            ranges: vec!["driver_age=25..50".parse().unwrap()],
        };
        let filtered = args.apply(&table).unwrap();
        assert_eq!(filtered.num_rows(), 1);
        assert_eq!(
            filtered.column("driver_age").unwrap().values(),
            &[Value::Int(30)]
        );
    }

    #[test]
    fn numeric_looking_officer_ids_filter_as_text() {
        let stops = traffic_stops_ingest::read_stops(
            "\
stop_id,stop_date,officer_id,driver_gender,driver_age,driver_race,violation,is_arrested,stop_outcome
1,2015-01-02,1234,M,30,White,Speeding,False,Citation
2,2015-01-03,5678,F,41,Black,Speeding,False,Warning
"
            .as_bytes(),
        )
        .unwrap();
        let args = FilterArgs {
            filters: vec!["officer_id=1234".parse().unwrap()],
            ranges: vec![],
        };
        let filtered = args.apply(&stops).unwrap();
        assert_eq!(filtered.num_rows(), 1);
        assert_eq!(
            filtered.column("officer_id").unwrap().values(),
            &[Value::from("1234")]
        );
    }

    #[test]
    fn missing_stops_file_yields_no_result() {
        let command = Commands::Rates {
            stops: PathBuf::from("/nonexistent/stops.csv"),
            group_by: vec!["driver_race".to_owned()],
            outcome: "stop_outcome".to_owned(),
            filters: FilterArgs {
                filters: vec![],
                ranges: vec![],
            },
        };
        assert!(run(command, &AnalysisConfig::default()).unwrap().is_none());
    }
}
