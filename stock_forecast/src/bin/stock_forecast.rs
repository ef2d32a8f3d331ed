use clap::{Parser, Subcommand, ValueEnum};
use std::fs::{self, File};
use std::path::PathBuf;
use std::process::ExitCode;
use stock_forecast::{
    AdditiveModelFactory, BuiltinCalendar, CachedMarketData, CachedUniverse, ConfigInput,
    CsvMarketData, DumbStockApi, ErrorKind, ForecastError, ForecastPipeline, HolidayCalendar,
    MarketDataProvider, Period, Result, Settings, StaticUniverse, TickerUniverse, YahooFinance,
};
use tracing::info;
use tracing_subscriber::EnvFilter;

type Pipeline = ForecastPipeline<
    Box<dyn MarketDataProvider>,
    Box<dyn TickerUniverse>,
    BuiltinCalendar,
    AdditiveModelFactory,
>;

#[derive(Parser)]
#[command(name = "stock-forecast")]
#[command(about = "Forecast daily stock prices with an additive regression model", long_about = None)]
struct Cli {
    /// Settings file (JSON)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Read prices from <DIR>/<TICKER>.csv instead of Yahoo Finance
    #[arg(long, global = true)]
    data_dir: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Clone, Copy, ValueEnum)]
enum ExportFormat {
    Csv,
    Json,
}

#[derive(Subcommand)]
enum Commands {
    /// Fit a model and forecast future prices
    Forecast {
        #[arg(short, long)]
        ticker: Option<String>,
        /// Lookback window: 6mo, 1y, 2y, 5y, 10y or max
        #[arg(short, long)]
        period: Option<String>,
        /// Days to forecast (1-365)
        #[arg(long)]
        horizon: Option<i64>,
        /// Trend growth: linear or logistic
        #[arg(long)]
        growth: Option<String>,
        /// Capacity as a multiple of the last close (logistic growth, 1.0-2.0)
        #[arg(long)]
        capacity: Option<f64>,
        /// Seasonality mode: additive or multiplicative
        #[arg(long)]
        mode: Option<String>,
        #[arg(long)]
        weekly: Option<bool>,
        #[arg(long)]
        monthly: Option<bool>,
        #[arg(long)]
        yearly: Option<bool>,
        /// Holiday country code, or None
        #[arg(long)]
        holidays: Option<String>,
        /// Forecast rows to print
        #[arg(long, default_value_t = 10)]
        rows: usize,
        /// Export the forecast to this file
        #[arg(short, long)]
        output: Option<PathBuf>,
        #[arg(long, value_enum, default_value_t = ExportFormat::Csv)]
        format: ExportFormat,
    },
    /// Show raw price history
    History {
        #[arg(short, long)]
        ticker: String,
        #[arg(short, long, default_value = "1y")]
        period: String,
        /// Store the history as <DIR>/<TICKER>.csv
        #[arg(long)]
        save_dir: Option<PathBuf>,
    },
    /// List selectable tickers
    Tickers,
    /// List holiday countries
    Countries,
}

fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();
    match run(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => report_error(&e),
    }
}

fn report_error(e: &ForecastError) -> ExitCode {
    match e.kind() {
        ErrorKind::DataUnavailable => {
            eprintln!("Warning: {}", e);
            eprintln!("Please select a different ticker or time period.");
            ExitCode::SUCCESS
        }
        ErrorKind::Model | ErrorKind::Environment => {
            eprintln!("Warning: {}", e);
            ExitCode::SUCCESS
        }
        ErrorKind::Validation => {
            eprintln!("Invalid input: {}", e);
            ExitCode::from(2)
        }
        ErrorKind::Defect => {
            eprintln!("Error: {}", e);
            ExitCode::FAILURE
        }
    }
}

fn build_pipeline(settings: Settings, data_dir: Option<PathBuf>) -> Result<Pipeline> {
    let (market, universe): (Box<dyn MarketDataProvider>, Box<dyn TickerUniverse>) = match data_dir
    {
        Some(dir) => {
            let local = CsvMarketData::new(&dir);
            let universe = StaticUniverse::new(local.available_tickers()?);
            info!(dir = %dir.display(), "Using local price files");
            (Box::new(local), Box::new(universe))
        }
        None => (
            Box::new(YahooFinance::new(&settings.providers)?),
            Box::new(DumbStockApi::new(&settings.providers)?),
        ),
    };
    let market: Box<dyn MarketDataProvider> = if settings.cache.price_history {
        Box::new(CachedMarketData::new(market))
    } else {
        market
    };
    let universe: Box<dyn TickerUniverse> = if settings.cache.ticker_universe {
        Box::new(CachedUniverse::new(universe))
    } else {
        universe
    };
    let factory = AdditiveModelFactory::new(settings.engine.clone());
    Ok(ForecastPipeline::new(
        market,
        universe,
        BuiltinCalendar,
        factory,
        settings,
    ))
}

fn run(cli: Cli) -> Result<()> {
    let settings = Settings::load(cli.config.as_deref())?;
    let defaults = settings.defaults.clone();
    let pipeline = build_pipeline(settings, cli.data_dir)?;

    match cli.command {
        Commands::Forecast {
            ticker,
            period,
            horizon,
            growth,
            capacity,
            mode,
            weekly,
            monthly,
            yearly,
            holidays,
            rows,
            output,
            format,
        } => {
            let input = ConfigInput {
                ticker: ticker.unwrap_or(defaults.ticker),
                period: period.unwrap_or(defaults.period),
                horizon_days: horizon.unwrap_or(defaults.horizon_days),
                growth: growth.unwrap_or(defaults.growth),
                capacity_multiplier: capacity.or(defaults.capacity_multiplier),
                seasonality_mode: mode.unwrap_or(defaults.seasonality_mode),
                weekly: weekly.unwrap_or(defaults.weekly),
                monthly: monthly.unwrap_or(defaults.monthly),
                yearly: yearly.unwrap_or(defaults.yearly),
                holiday_country: holidays.unwrap_or(defaults.holiday_country),
            };
            forecast(&pipeline, &input, rows, output, format)
        }
        Commands::History {
            ticker,
            period,
            save_dir,
        } => {
            let period: Period = period.parse()?;
            let series = pipeline.market().price_history(&ticker.to_uppercase(), period)?;
            println!("{}", series.to_dataframe()?);
            if let Some(dir) = save_dir {
                let path = CsvMarketData::new(dir).store(&ticker, &series)?;
                println!("Saved {} rows to {}", series.len(), path.display());
            }
            Ok(())
        }
        Commands::Tickers => {
            for ticker in pipeline.collector().sorted_universe() {
                println!("{}", ticker);
            }
            Ok(())
        }
        Commands::Countries => {
            println!("None");
            for country in pipeline.calendar().countries() {
                println!("{}", country);
            }
            Ok(())
        }
    }
}

fn forecast(
    pipeline: &Pipeline,
    input: &ConfigInput,
    rows: usize,
    output: Option<PathBuf>,
    format: ExportFormat,
) -> Result<()> {
    let config = pipeline.collect(input)?;
    let report = pipeline.run(config)?;

    println!("{}", report.metadata.name);
    println!("{}", report.metadata.summary);
    println!();
    println!(
        "{} observations, {} forecast days",
        report.prepared.len(),
        report.forecast.future_rows().len()
    );
    println!("{}", report.forecast.to_dataframe()?.tail(Some(rows)));

    if let Some(path) = output {
        match format {
            ExportFormat::Csv => report.forecast.write_csv(File::create(&path)?)?,
            ExportFormat::Json => fs::write(&path, report.forecast.to_json()?)?,
        }
        println!("Forecast written to {}", path.display());
    }
    Ok(())
}
