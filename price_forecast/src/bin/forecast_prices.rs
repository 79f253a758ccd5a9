use anyhow::{Context, Result};
use chrono::{Local, NaiveDate};
use clap::{Parser, Subcommand};
use log::LevelFilter;
use price_forecast::{
    evaluate_model, prepare_training_data, run_batch, write_forecasts, write_prepared,
    DataLoader, ForecastConfig, PriceRegressor, StartPolicy, TreeEnsemble,
};
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[clap(
    name = "forecast_prices",
    version,
    about = "Recursive vegetable price forecasting"
)]
struct Cli {
    #[clap(subcommand)]
    command: Commands,

    #[clap(long, short, help = "JSON config file; flags override its values")]
    config: Option<PathBuf>,

    #[clap(long, short, default_value = "info")]
    log_level: String,

    #[clap(long, help = "Engineered historical dataset (CSV or Parquet)")]
    data: Option<PathBuf>,

    #[clap(long, help = "Model bundle (JSON tree dump)")]
    model: Option<PathBuf>,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Forecast the next days for every item, or a single one
    Forecast {
        #[clap(long, short, help = "Restrict the run to one item, e.g. tomato")]
        item: Option<String>,

        #[clap(long, help = "Forecast CSV, overwritten on each run")]
        output: Option<PathBuf>,

        #[clap(long, help = "First forecast date (YYYY-MM-DD)")]
        start_date: Option<NaiveDate>,

        #[clap(long, conflicts_with = "start_date", help = "Start today even if the config sets a date")]
        from_today: bool,

        #[clap(
            long,
            conflicts_with_all = ["start_date", "from_today"],
            help = "Start each item the day after its last record"
        )]
        from_history: bool,

        #[clap(long, help = "Number of days to forecast")]
        horizon: Option<usize>,

        #[clap(long, help = "Forecast items in parallel")]
        parallel: bool,
    },
    /// Build the training dataset from raw price, rainfall and holiday sheets
    Prepare {
        #[clap(long)]
        prices: Option<PathBuf>,

        #[clap(long)]
        rainfall: Option<PathBuf>,

        #[clap(long)]
        holidays: Option<PathBuf>,

        #[clap(long)]
        output: Option<PathBuf>,
    },
    /// Score the model on rows dated on or after the split date
    Evaluate {
        #[clap(long, help = "First date of the hold-out set (YYYY-MM-DD)")]
        split_date: Option<NaiveDate>,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let log_level_filter = cli.log_level.parse().unwrap_or(LevelFilter::Info);
    env_logger::Builder::new()
        .filter_level(log_level_filter)
        .init();

    let mut config = match &cli.config {
        Some(path) => ForecastConfig::from_file(path)?,
        None => ForecastConfig::default(),
    };
    if let Some(data) = cli.data {
        config.data_path = data;
    }
    if let Some(model) = cli.model {
        config.model_path = model;
    }

    match cli.command {
        Commands::Forecast {
            item,
            output,
            start_date,
            from_today,
            from_history,
            horizon,
            parallel,
        } => {
            if let Some(output) = output {
                config.output_path = output;
            }
            if let Some(horizon) = horizon {
                config.horizon_days = horizon;
            }
            let policy = match start_date {
                Some(date) => StartPolicy::Date(date),
                None if from_today => StartPolicy::ForceToday,
                None if from_history => StartPolicy::FromHistory,
                None => StartPolicy::Today,
            };
            config.resolve_start_date(policy, Local::now().date_naive());
            config.parallel |= parallel;
            run_forecast(&config, item.as_deref())
        }
        Commands::Prepare {
            prices,
            rainfall,
            holidays,
            output,
        } => {
            let prepare = &mut config.prepare;
            if let Some(prices) = prices {
                prepare.prices_path = prices;
            }
            if let Some(rainfall) = rainfall {
                prepare.rainfall_path = rainfall;
            }
            if let Some(holidays) = holidays {
                prepare.holidays_path = holidays;
            }
            if let Some(output) = output {
                prepare.output_path = output;
            }
            run_prepare(&config)
        }
        Commands::Evaluate { split_date } => {
            if let Some(split_date) = split_date {
                config.split_date = split_date;
            }
            run_evaluate(&config)
        }
    }
}

fn run_forecast(config: &ForecastConfig, item: Option<&str>) -> Result<()> {
    config.validate()?;
    log::info!("Loading history from {}", config.data_path.display());
    let histories = DataLoader::from_path(&config.data_path, &config.item_prefix)
        .with_context(|| format!("loading {}", config.data_path.display()))?;
    let model = TreeEnsemble::from_json_file(&config.model_path)
        .with_context(|| format!("loading model {}", config.model_path.display()))?;

    let report = run_batch(&model, &histories, config, item)?;
    let records = report.records();
    write_forecasts(&config.output_path, &records)?;

    for record in &records {
        println!(
            "{}  {:<24} {:>10.2}",
            record.date, record.item, record.predicted_price
        );
    }
    Ok(())
}

fn run_prepare(config: &ForecastConfig) -> Result<()> {
    let paths = &config.prepare;
    let dataset = prepare_training_data(
        &paths.prices_path,
        &paths.rainfall_path,
        &paths.holidays_path,
    )
    .context("preparing training data")?;
    write_prepared(&paths.output_path, &dataset)?;

    println!(
        "Prepared {} rows for {} vegetables -> {}",
        dataset.len(),
        dataset.vegetables().len(),
        paths.output_path.display()
    );
    Ok(())
}

fn run_evaluate(config: &ForecastConfig) -> Result<()> {
    let df = DataLoader::read_frame(&config.data_path)
        .with_context(|| format!("loading {}", config.data_path.display()))?;
    let model = TreeEnsemble::from_json_file(&config.model_path)
        .with_context(|| format!("loading model {}", config.model_path.display()))?;

    log::info!(
        "Evaluating '{}' on rows from {}",
        model.name(),
        config.split_date
    );
    let report = evaluate_model(&model, &df, config.split_date)?;
    print!("{}", report);
    Ok(())
}
