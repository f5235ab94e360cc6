pub mod commands;

use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Parser, Subcommand};
use restock_core::config::{AppConfig, ConfigOverrides, LoadOptions, LogFormat, LoggingConfig};

#[derive(Debug, Parser)]
#[command(
    name = "restock",
    about = "Retail replenishment operator CLI",
    long_about = "Forecast product demand from sales history, recommend reorder quantities, and export replenishment reports.",
    after_help = "Examples:\n  restock seed\n  restock recommend prod-a\n  restock report --output report.csv\n  restock forecast --product prod-b --periods 14"
)]
pub struct Cli {
    #[arg(long, global = true, help = "Path to a restock.toml config file")]
    config: Option<PathBuf>,
    #[arg(long, global = true, help = "Override the configured database URL")]
    database_url: Option<String>,
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    #[command(about = "Apply pending database migrations and return structured status output")]
    Migrate,
    #[command(about = "Load the deterministic demo inventory (two products, four sales)")]
    Seed,
    #[command(about = "Manage the product catalog")]
    Product {
        #[command(subcommand)]
        action: ProductAction,
    },
    #[command(about = "Replace the stored sales history with a `ds,y,product_id` CSV file")]
    ImportSales { path: PathBuf },
    #[command(about = "Forecast one product, or total demand when no product is given")]
    Forecast {
        #[arg(long, help = "Product id to forecast")]
        product: Option<String>,
        #[arg(long, help = "Number of future days to forecast")]
        periods: Option<u32>,
    },
    #[command(about = "Recommend a reorder quantity for one product")]
    Recommend { product: String },
    #[command(about = "Build the replenishment report for every product as CSV")]
    Report {
        #[arg(long, help = "Write the CSV to this file instead of the payload")]
        output: Option<PathBuf>,
    },
    #[command(about = "Render a product's forecast chart as SVG")]
    Plot {
        product: String,
        #[arg(long)]
        periods: Option<u32>,
        #[arg(long, help = "Directory for the chart, defaults to plot.output_dir")]
        output_dir: Option<PathBuf>,
    },
    #[command(about = "Inspect effective configuration values with source attribution")]
    Config,
    #[command(about = "Validate config, chart template, and DB connectivity")]
    Doctor {
        #[arg(long, help = "Emit machine-readable JSON output")]
        json: bool,
    },
}

#[derive(Debug, Subcommand)]
enum ProductAction {
    #[command(about = "Register a product with its stock position")]
    Add {
        name: String,
        #[arg(long, help = "Product id, generated when omitted")]
        id: Option<String>,
        #[arg(long, default_value_t = 0)]
        stock: i64,
        #[arg(long)]
        capacity: Option<i64>,
        #[arg(long = "lead-time")]
        lead_time: Option<i64>,
    },
    #[command(about = "List products in creation order")]
    List,
}

impl Cli {
    fn load_options(&self) -> LoadOptions {
        LoadOptions {
            config_path: self.config.clone(),
            require_file: self.config.is_some(),
            overrides: ConfigOverrides {
                database_url: self.database_url.clone(),
                ..ConfigOverrides::default()
            },
        }
    }
}

pub fn run() -> ExitCode {
    let cli = Cli::parse();
    let options = cli.load_options();

    let logging = AppConfig::load(options.clone())
        .map(|config| config.logging)
        .unwrap_or_default();
    if let Err(error) = init_logging(&logging) {
        eprintln!("logging disabled: {error}");
    }

    let result = match cli.command {
        Command::Migrate => commands::migrate::run(options),
        Command::Seed => commands::seed::run(options),
        Command::Product {
            action: ProductAction::Add { name, id, stock, capacity, lead_time },
        } => {
            let new_product = commands::product::NewProduct {
                name,
                id,
                current_stock: stock,
                capacity,
                lead_time_days: lead_time,
            };
            commands::product::add(options, new_product)
        }
        Command::Product { action: ProductAction::List } => commands::product::list(options),
        Command::ImportSales { path } => commands::import_sales::run(options, &path),
        Command::Forecast { product, periods } => {
            commands::forecast::run(options, product, periods)
        }
        Command::Recommend { product } => commands::recommend::run(options, product),
        Command::Report { output } => commands::report::run(options, output),
        Command::Plot { product, periods, output_dir } => {
            commands::plot::run(options, product, periods, output_dir)
        }
        Command::Config => {
            commands::CommandResult { exit_code: 0, output: commands::config::run(options) }
        }
        Command::Doctor { json } => commands::doctor::run(options, json),
    };

    println!("{}", result.output);
    ExitCode::from(result.exit_code)
}

/// Installs the fmt subscriber on stderr so stdout carries only the payload.
fn init_logging(logging: &LoggingConfig) -> anyhow::Result<()> {
    use tracing::Level;

    let log_level = logging.level.parse::<Level>().unwrap_or(Level::INFO);
    let builder = tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_target(false)
        .with_max_level(log_level);

    match logging.format {
        LogFormat::Compact => builder.compact().try_init(),
        LogFormat::Pretty => builder.pretty().try_init(),
        LogFormat::Json => builder.json().try_init(),
    }
    .map_err(|error| anyhow::anyhow!(error))
}
