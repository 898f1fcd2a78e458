//! CLI definition and dispatch.

use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::process::ExitCode;

use crate::adapters::csv_adapter::{CsvOhlcAdapter, CsvTextAdapter};
use crate::adapters::file_config_adapter::FileConfigAdapter;
use crate::domain::config_validation::{validate_engine_config, validate_request_config};
use crate::domain::controller::{AppController, EngineSettings, PromptRequest};
use crate::domain::data_point::{DataPoint, Interval, format_timestamp, parse_timestamp};
use crate::domain::dataset::Dataset;
use crate::domain::default_templates;
use crate::domain::error::FinpromptError;
use crate::ports::config_port::ConfigPort;
use crate::ports::llm_port::LlmPort;
use crate::ports::store_port::StorePort;

#[derive(Parser, Debug)]
#[command(name = "finprompt", about = "Windowed prompt assembly for market prediction")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Compose a prompt from stored data
    Prompt {
        #[arg(short, long)]
        config: PathBuf,
        #[arg(long)]
        symbol: Option<String>,
        #[arg(long)]
        prediction_date: Option<String>,
        #[arg(long)]
        dry_run: bool,
    },
    /// Load a CSV file of bars or news into the store
    Populate {
        #[arg(short, long)]
        config: PathBuf,
        #[arg(long)]
        symbol: String,
        #[arg(long)]
        news: bool,
        #[arg(long)]
        merge_news: bool,
        #[arg(long)]
        data_dir: Option<PathBuf>,
        #[arg(long)]
        interval: Option<String>,
    },
    /// Write the built-in templates into the store
    SeedTemplates {
        #[arg(short, long)]
        config: PathBuf,
    },
    /// Show the stored data range for a symbol
    Info {
        #[arg(long)]
        symbol: Option<String>,
        #[arg(short, long)]
        config: PathBuf,
    },
}

pub fn run(cli: Cli) -> ExitCode {
    match cli.command {
        Command::Prompt {
            config,
            symbol,
            prediction_date,
            dry_run,
        } => {
            if dry_run {
                run_dry_run(&config)
            } else {
                run_prompt(&config, symbol.as_deref(), prediction_date.as_deref())
            }
        }
        Command::Populate {
            config,
            symbol,
            news,
            merge_news,
            data_dir,
            interval,
        } => run_populate(
            &config,
            &symbol,
            news,
            merge_news,
            data_dir.as_ref(),
            interval.as_deref(),
        ),
        Command::SeedTemplates { config } => run_seed_templates(&config),
        Command::Info { symbol, config } => run_info(symbol.as_deref(), &config),
    }
}

pub fn load_config(path: &PathBuf) -> Result<FileConfigAdapter, ExitCode> {
    FileConfigAdapter::from_file(path).map_err(|e| {
        let err = FinpromptError::ConfigParse {
            file: path.display().to_string(),
            reason: e.to_string(),
        };
        eprintln!("error: {err}");
        ExitCode::from(&err)
    })
}

/// Placeholder completion port. The prompt command only composes, so
/// this is never called; wiring a real adapter replaces it.
struct UnconfiguredLlm;

impl LlmPort for UnconfiguredLlm {
    fn complete(&self, _prompt: &str) -> Result<String, FinpromptError> {
        Err(FinpromptError::Llm {
            reason: "no completion adapter configured".to_string(),
        })
    }
}

fn run_prompt(
    config_path: &PathBuf,
    symbol_override: Option<&str>,
    prediction_date_override: Option<&str>,
) -> ExitCode {
    // Stage 1: Load config
    eprintln!("Loading config from {}", config_path.display());
    let config = match load_config(config_path) {
        Ok(c) => c,
        Err(code) => return code,
    };

    // Stage 2: Validate engine settings
    if let Err(e) = validate_engine_config(&config) {
        eprintln!("error: {e}");
        return (&e).into();
    }

    // Stage 3: Build the request, flags overriding [request] keys
    let request = match build_request(&config, symbol_override, prediction_date_override) {
        Ok(r) => r,
        Err(e) => {
            eprintln!("error: {e}");
            return (&e).into();
        }
    };
    let settings = build_engine_settings(&config);

    eprintln!(
        "Composing prompt for {}: history {} to {}, predicting {}",
        request.symbol,
        format_timestamp(request.start),
        format_timestamp(request.end),
        format_timestamp(request.prediction_date),
    );

    // Stages 4-5: Store dependent pipeline
    #[cfg(feature = "sqlite")]
    {
        use crate::adapters::sqlite_adapter::SqliteAdapter;

        let store = match SqliteAdapter::from_config(&config) {
            Ok(a) => a,
            Err(e) => {
                eprintln!("error: {e}");
                return (&e).into();
            }
        };
        if let Err(e) = store.initialize_schema() {
            eprintln!("error: {e}");
            return (&e).into();
        }

        run_prompt_pipeline(&store, &request, settings)
    }

    #[cfg(not(feature = "sqlite"))]
    {
        let _ = (request, settings);
        eprintln!("error: sqlite feature is required for prompt");
        ExitCode::from(1)
    }
}

pub fn run_prompt_pipeline(
    store: &dyn StorePort,
    request: &PromptRequest,
    settings: EngineSettings,
) -> ExitCode {
    let llm = UnconfiguredLlm;
    let controller = AppController::new(store, &llm, settings);

    // Stage 5: Compose and print; the prompt is the artifact, so it goes
    // to stdout while progress stays on stderr.
    match controller.compose_prompt(request) {
        Ok(prompt) => {
            println!("{prompt}");
            ExitCode::SUCCESS
        }
        Err(e) => {
            eprintln!("error: {e}");
            (&e).into()
        }
    }
}

pub fn build_request(
    config: &dyn ConfigPort,
    symbol_override: Option<&str>,
    prediction_date_override: Option<&str>,
) -> Result<PromptRequest, FinpromptError> {
    let symbol = match symbol_override {
        Some(s) => s.trim().to_uppercase(),
        None => config
            .get_string("request", "symbol")
            .map(|s| s.trim().to_uppercase())
            .filter(|s| !s.is_empty())
            .ok_or_else(|| FinpromptError::ConfigMissing {
                section: "request".into(),
                key: "symbol".into(),
            })?,
    };

    let interval_str =
        config
            .get_string("request", "interval")
            .ok_or_else(|| FinpromptError::ConfigMissing {
                section: "request".into(),
                key: "interval".into(),
            })?;
    let interval =
        Interval::parse(interval_str.trim()).ok_or_else(|| FinpromptError::ConfigInvalid {
            section: "request".into(),
            key: "interval".into(),
            reason: format!(
                "unknown interval '{}', expected W, D or H1",
                interval_str.trim()
            ),
        })?;

    let start = request_date(config, "start_date")?;
    let end = request_date(config, "end_date")?;
    let prediction_date = match prediction_date_override {
        Some(raw) => {
            parse_timestamp(raw.trim()).ok_or_else(|| FinpromptError::ConfigInvalid {
                section: "request".into(),
                key: "prediction_date".into(),
                reason: "invalid date format (expected YYYY-MM-DD or YYYY-MM-DD HH:MM:SS)".into(),
            })?
        }
        None => request_date(config, "prediction_date")?,
    };

    if start >= end {
        return Err(FinpromptError::ConfigInvalid {
            section: "request".into(),
            key: "start_date".into(),
            reason: "start_date must be before end_date".into(),
        });
    }
    if prediction_date <= end {
        return Err(FinpromptError::ConfigInvalid {
            section: "request".into(),
            key: "prediction_date".into(),
            reason: "prediction_date must be after end_date".into(),
        });
    }

    Ok(PromptRequest {
        symbol,
        start,
        end,
        interval,
        prediction_date,
    })
}

fn request_date(
    config: &dyn ConfigPort,
    key: &str,
) -> Result<chrono::NaiveDateTime, FinpromptError> {
    let raw = config
        .get_string("request", key)
        .ok_or_else(|| FinpromptError::ConfigMissing {
            section: "request".into(),
            key: key.into(),
        })?;
    parse_timestamp(raw.trim()).ok_or_else(|| FinpromptError::ConfigInvalid {
        section: "request".into(),
        key: key.into(),
        reason: "invalid date format (expected YYYY-MM-DD or YYYY-MM-DD HH:MM:SS)".into(),
    })
}

pub fn build_engine_settings(config: &dyn ConfigPort) -> EngineSettings {
    let window_size = config.get_int("engine", "window_size", 3) as usize;
    // Only treat min_points as set when the key is actually present.
    let min_points = config
        .get_string("engine", "min_points")
        .map(|_| config.get_int("engine", "min_points", 0) as usize);
    let include_predictions = config.get_bool("engine", "include_predictions", true);

    EngineSettings::new(window_size, min_points, include_predictions)
}

pub fn run_dry_run(config_path: &PathBuf) -> ExitCode {
    eprintln!("Loading config from {}", config_path.display());
    let config = match load_config(config_path) {
        Ok(c) => c,
        Err(code) => return code,
    };

    if let Err(e) = validate_engine_config(&config) {
        eprintln!("error: {e}");
        return (&e).into();
    }
    if let Err(e) = validate_request_config(&config) {
        eprintln!("error: {e}");
        return (&e).into();
    }
    eprintln!("Config validated successfully");

    let request = match build_request(&config, None, None) {
        Ok(r) => r,
        Err(e) => {
            eprintln!("error: {e}");
            return (&e).into();
        }
    };
    let settings = build_engine_settings(&config);

    eprintln!("\nRequest:");
    eprintln!("  symbol:          {}", request.symbol);
    eprintln!("  interval:        {}", request.interval);
    eprintln!(
        "  history:         {} to {}",
        format_timestamp(request.start),
        format_timestamp(request.end),
    );
    eprintln!(
        "  prediction date: {}",
        format_timestamp(request.prediction_date)
    );

    eprintln!("\nEngine:");
    eprintln!("  window size:     {}", settings.window_size);
    eprintln!("  min points:      {}", settings.min_points);
    eprintln!("  predictions:     {}", settings.include_predictions);

    eprintln!("\nDry run complete: configuration is valid");
    ExitCode::SUCCESS
}

fn run_populate(
    config_path: &PathBuf,
    symbol: &str,
    news: bool,
    merge_news: bool,
    data_dir_override: Option<&PathBuf>,
    interval_override: Option<&str>,
) -> ExitCode {
    // Stage 1: Load config
    eprintln!("Loading config from {}", config_path.display());
    let config = match load_config(config_path) {
        Ok(c) => c,
        Err(code) => return code,
    };

    // Stage 2: Resolve interval and source directory
    let interval_str = match interval_override {
        Some(s) => s.to_string(),
        None => match config.get_string("request", "interval") {
            Some(s) => s,
            None => {
                eprintln!("error: interval is required (use --interval or set [request] interval)");
                return ExitCode::from(2);
            }
        },
    };
    let interval = match Interval::parse(interval_str.trim()) {
        Some(i) => i,
        None => {
            eprintln!(
                "error: unknown interval '{}', expected W, D or H1",
                interval_str.trim()
            );
            return ExitCode::from(2);
        }
    };

    let dir_key = if news { "news_dir" } else { "ohlc_dir" };
    let base_path = match data_dir_override {
        Some(p) => p.clone(),
        None => match config.get_string("csv", dir_key) {
            Some(d) => PathBuf::from(d),
            None => {
                eprintln!("error: --data-dir or [csv] {dir_key} is required");
                return ExitCode::from(2);
            }
        },
    };

    let symbol = symbol.trim().to_uppercase();

    // Stage 3: Read the CSV file
    eprintln!(
        "Reading {} data for {} from {}",
        if news { "news" } else { "bar" },
        symbol,
        base_path.display(),
    );
    let dataset: Dataset<DataPoint> = if news {
        let adapter = CsvTextAdapter::new(base_path, merge_news);
        match adapter.load(&symbol, interval) {
            Ok(points) => points.into_points().into_iter().map(DataPoint::from).collect(),
            Err(e) => {
                eprintln!("error: {e}");
                return (&e).into();
            }
        }
    } else {
        let adapter = CsvOhlcAdapter::new(base_path);
        match adapter.load(&symbol, interval) {
            Ok(points) => points.into_points().into_iter().map(DataPoint::from).collect(),
            Err(e) => {
                eprintln!("error: {e}");
                return (&e).into();
            }
        }
    };

    eprintln!("Parsed {} points", dataset.len());

    // Stage 4: Store
    #[cfg(feature = "sqlite")]
    {
        use crate::adapters::sqlite_adapter::SqliteAdapter;

        let store = match SqliteAdapter::from_config(&config) {
            Ok(a) => a,
            Err(e) => {
                eprintln!("error: {e}");
                return (&e).into();
            }
        };
        if let Err(e) = store.initialize_schema() {
            eprintln!("error: {e}");
            return (&e).into();
        }

        run_populate_pipeline(&store, &dataset, &symbol)
    }

    #[cfg(not(feature = "sqlite"))]
    {
        let _ = dataset;
        eprintln!("error: sqlite feature is required for populate");
        ExitCode::from(1)
    }
}

pub fn run_populate_pipeline(
    store: &dyn StorePort,
    dataset: &Dataset<DataPoint>,
    symbol: &str,
) -> ExitCode {
    if let Err(e) = store.store_data(dataset) {
        eprintln!("error: {e}");
        return (&e).into();
    }
    eprintln!("Stored {} points for {}", dataset.len(), symbol);
    ExitCode::SUCCESS
}

fn run_seed_templates(config_path: &PathBuf) -> ExitCode {
    eprintln!("Loading config from {}", config_path.display());
    let config = match load_config(config_path) {
        Ok(c) => c,
        Err(code) => return code,
    };

    #[cfg(feature = "sqlite")]
    {
        use crate::adapters::sqlite_adapter::SqliteAdapter;

        let store = match SqliteAdapter::from_config(&config) {
            Ok(a) => a,
            Err(e) => {
                eprintln!("error: {e}");
                return (&e).into();
            }
        };
        if let Err(e) = store.initialize_schema() {
            eprintln!("error: {e}");
            return (&e).into();
        }

        run_seed_pipeline(&store)
    }

    #[cfg(not(feature = "sqlite"))]
    {
        let _ = config;
        eprintln!("error: sqlite feature is required for seed-templates");
        ExitCode::from(1)
    }
}

/// Seed each built-in template whose type is not stored yet. Skipping
/// existing types keeps the exactly-one-per-type lookup intact when the
/// command runs twice.
pub fn run_seed_pipeline(store: &dyn StorePort) -> ExitCode {
    let mut seeded = 0usize;
    for template in default_templates::all() {
        let existing = match store.fetch_templates(Some(&template.prompt_type)) {
            Ok(found) => found,
            Err(e) => {
                eprintln!("error: {e}");
                return (&e).into();
            }
        };
        if !existing.is_empty() {
            eprintln!("  {} already present, skipping", template.prompt_type);
            continue;
        }
        if let Err(e) = store.store_templates(std::slice::from_ref(&template)) {
            eprintln!("error: {e}");
            return (&e).into();
        }
        eprintln!("  seeded {}", template.prompt_type);
        seeded += 1;
    }

    eprintln!("Seeded {} templates", seeded);
    ExitCode::SUCCESS
}

fn run_info(symbol: Option<&str>, config_path: &PathBuf) -> ExitCode {
    let config = match load_config(config_path) {
        Ok(c) => c,
        Err(code) => return code,
    };

    let symbol = match symbol {
        Some(s) => s.trim().to_uppercase(),
        None => match config.get_string("request", "symbol") {
            Some(s) => s.trim().to_uppercase(),
            None => {
                eprintln!("error: symbol is required (use --symbol or set [request] symbol)");
                return ExitCode::from(1);
            }
        },
    };

    #[cfg(feature = "sqlite")]
    {
        use crate::adapters::sqlite_adapter::SqliteAdapter;

        let store = match SqliteAdapter::from_config(&config) {
            Ok(a) => a,
            Err(e) => {
                eprintln!("error: {e}");
                return (&e).into();
            }
        };
        if let Err(e) = store.initialize_schema() {
            eprintln!("error: {e}");
            return (&e).into();
        }

        run_info_pipeline(&store, &symbol)
    }

    #[cfg(not(feature = "sqlite"))]
    {
        let _ = symbol;
        eprintln!("error: sqlite feature is required for info");
        ExitCode::from(1)
    }
}

pub fn run_info_pipeline(store: &dyn StorePort, symbol: &str) -> ExitCode {
    match store.data_range(symbol) {
        Ok(Some((min, max, count))) => {
            println!(
                "{}: {} points, {} to {}",
                symbol,
                count,
                format_timestamp(min),
                format_timestamp(max),
            );
            ExitCode::SUCCESS
        }
        Ok(None) => {
            eprintln!("{}: no data found", symbol);
            ExitCode::SUCCESS
        }
        Err(e) => {
            eprintln!("error querying {}: {}", symbol, e);
            (&e).into()
        }
    }
}
