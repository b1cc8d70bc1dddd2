use std::path::PathBuf;
use std::process;
use std::str::FromStr;

use ampol_tgp::pipeline::Pipeline;
use ampol_tgp::scraper::WebScraper;
use ampol_tgp::settings::Settings;
use ampol_tgp::store::read_history;
use ampol_tgp::types::{Fuel, State, TgpRecord};
use ampol_tgp::utils::{HistoryFilter, HistoryStats};
use chrono::NaiveDate;
use clap::{Parser, Subcommand, ValueEnum};
use log::LevelFilter;

#[derive(Parser)]
#[command(name = "ampol-tgp")]
#[command(about = "Ampol terminal gate price scraper", long_about = None)]
struct Cli {
    #[arg(
        short = 'l',
        long = "log-level",
        value_enum,
        default_value = "info",
        global = true,
        help = "Set the logging level"
    )]
    log_level: LogLevel,

    #[arg(
        short = 'c',
        long = "config",
        global = true,
        help = "Settings file (defaults to ./ampol-tgp.toml when present)"
    )]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Clone, ValueEnum)]
enum LogLevel {
    Off,
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

impl From<LogLevel> for LevelFilter {
    fn from(level: LogLevel) -> Self {
        match level {
            LogLevel::Off => LevelFilter::Off,
            LogLevel::Error => LevelFilter::Error,
            LogLevel::Warn => LevelFilter::Warn,
            LogLevel::Info => LevelFilter::Info,
            LogLevel::Debug => LevelFilter::Debug,
            LogLevel::Trace => LevelFilter::Trace,
        }
    }
}

#[derive(Debug, Clone, ValueEnum)]
enum OutputFormat {
    Text,
    Json,
}

#[derive(Subcommand)]
enum Commands {
    /// Install the dependency manifest, then run the scrape command; stops at the first failure
    Run,
    /// Scrape the current terminal gate prices and merge them into the history file
    Scrape {
        #[arg(long, help = "History CSV file to update")]
        output: Option<PathBuf>,

        #[arg(
            short = 'o',
            long = "format",
            value_enum,
            default_value = "text",
            help = "Output format"
        )]
        format: OutputFormat,
    },
    /// Show prices stored in the history file
    History {
        #[arg(long, help = "History CSV file to read")]
        input: Option<PathBuf>,

        #[arg(long, value_parser = parse_state, help = "Filter by state code")]
        state: Option<State>,

        #[arg(long, value_parser = parse_fuel, help = "Filter by fuel grade")]
        fuel: Option<Fuel>,

        #[arg(long, help = "Filter by terminal name (substring, case-insensitive)")]
        terminal: Option<String>,

        #[arg(
            long = "from",
            value_name = "YYYY-MM-DD",
            help = "Prices effective from this date onwards",
            value_parser = parse_date,
        )]
        start_date: Option<NaiveDate>,

        #[arg(
            long = "to",
            value_name = "YYYY-MM-DD",
            help = "Prices effective up to this date",
            value_parser = parse_date,
        )]
        end_date: Option<NaiveDate>,

        #[arg(
            long,
            help = "Show only the most recent N prices",
            value_parser = clap::value_parser!(u16).range(1..)
        )]
        limit: Option<u16>,

        #[arg(
            short = 'o',
            long = "format",
            value_enum,
            default_value = "text",
            help = "Output format"
        )]
        format: OutputFormat,
    },
}

fn parse_date(s: &str) -> Result<NaiveDate, String> {
    NaiveDate::parse_from_str(s, "%Y-%m-%d").map_err(|e| e.to_string())
}

fn parse_state(s: &str) -> Result<State, String> {
    State::from_str(s).map_err(|e| e.to_string())
}

fn parse_fuel(s: &str) -> Result<Fuel, String> {
    Fuel::from_str(s).map_err(|e| e.to_string())
}

fn serialize_json<T: serde::Serialize>(value: &T) {
    match serde_json::to_string_pretty(value) {
        Ok(json) => println!("{}", json),
        Err(e) => {
            log::error!("Error serializing to JSON: {}", e);
            process::exit(1);
        }
    }
}

fn print_records(records: &[TgpRecord], format: OutputFormat) {
    match format {
        OutputFormat::Json => serialize_json(&records),
        OutputFormat::Text => {
            if records.is_empty() {
                println!("No prices to display.");
            } else {
                for record in records {
                    println!("{}", record);
                }
                print!("{}", HistoryStats::from_records(records));
            }
        }
    }
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    env_logger::Builder::new()
        .filter_level(cli.log_level.clone().into())
        .init();

    let settings = Settings::load(cli.config.as_deref()).unwrap_or_else(|e| {
        log::error!("{}", e);
        process::exit(1);
    });

    match cli.command {
        Commands::Run => {
            let pipeline = Pipeline::from_settings(&settings).unwrap_or_else(|e| {
                log::error!("Invalid pipeline: {}", e);
                process::exit(e.exit_code());
            });

            let outcome = tokio::task::spawn_blocking(move || pipeline.run())
                .await
                .unwrap_or_else(|e| {
                    log::error!("Pipeline task panicked: {}", e);
                    process::exit(1);
                });

            if let Err(e) = outcome {
                process::exit(e.exit_code());
            }
        }

        Commands::Scrape { output, format } => {
            let scraper = WebScraper::new(&settings.scrape).unwrap_or_else(|e| {
                log::error!("Error creating scraper: {}", e);
                process::exit(1);
            });
            let output = output.unwrap_or(settings.scrape.output);

            let records = scraper.scrape_into(&output).await.unwrap_or_else(|e| {
                log::error!("Error scraping {}: {}", scraper.page_url(), e);
                process::exit(1);
            });

            print_records(&records, format);
        }

        Commands::History {
            input,
            state,
            fuel,
            terminal,
            start_date,
            end_date,
            limit,
            format,
        } => {
            let filter = HistoryFilter {
                state,
                fuel,
                terminal,
                start_date,
                end_date,
                limit: limit.map(usize::from),
            };

            let filter = filter.validate().unwrap_or_else(|e| {
                log::error!("Invalid args: {e}");
                process::exit(1);
            });

            let input = input.unwrap_or(settings.scrape.output);
            log::info!("Reading history from {}...", input.display());

            let records = read_history(&input).unwrap_or_else(|e| {
                log::error!("Error reading {}: {}", input.display(), e);
                process::exit(1);
            });

            print_records(&filter.apply(records), format);
        }
    }
}
