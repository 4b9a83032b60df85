//! Housing Price Predictor CLI
//!
//! A command-line tool for requesting price predictions from a running
//! predictor service, or directly from local artifacts with `--offline`.

mod client;
mod commands;
mod config;
mod output;

use anyhow::Result;
use clap::{Args, Parser, Subcommand};
use commands::{predict, service};
use predictor_lib::artifact::{DEFAULT_MODEL_PATH, DEFAULT_SCALER_PATH};
use std::path::PathBuf;

const DEFAULT_API_URL: &str = "http://localhost:8080";

/// Housing Price Predictor CLI
#[derive(Parser)]
#[command(name = "hpp")]
#[command(author, version, about = "CLI for the Housing Price Predictor", long_about = None)]
pub struct Cli {
    /// API endpoint URL (can also be set via HPP_API_URL env var or ~/.config/hpp/config.json)
    #[arg(long, env = "HPP_API_URL")]
    pub api_url: Option<String>,

    /// Output format
    #[arg(long, short, default_value = "table")]
    pub format: output::OutputFormat,

    /// Enable verbose output
    #[arg(long, short)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Predict the price of a house; unspecified features take their defaults
    Predict(PredictArgs),

    /// List the input features, their defaults and constraints
    Features,

    /// Describe the model the service currently loads
    Model,

    /// Show service health and readiness
    Health,
}

#[derive(Args)]
pub struct PredictArgs {
    /// Per-capita crime rate
    #[arg(long)]
    pub crim: Option<f64>,
    /// Residential land proportion
    #[arg(long)]
    pub zn: Option<f64>,
    /// Non-retail business acres proportion
    #[arg(long)]
    pub indus: Option<f64>,
    /// Charles River adjacency (0 or 1)
    #[arg(long)]
    pub chas: Option<f64>,
    /// Nitrogen oxide concentration
    #[arg(long)]
    pub nox: Option<f64>,
    /// Average rooms per dwelling
    #[arg(long)]
    pub rm: Option<f64>,
    /// Pre-1940 unit proportion
    #[arg(long)]
    pub age: Option<f64>,
    /// Weighted distance to employment centers
    #[arg(long)]
    pub dis: Option<f64>,
    /// Highway accessibility index (truncated to an integer)
    #[arg(long)]
    pub rad: Option<f64>,
    /// Property tax rate
    #[arg(long)]
    pub tax: Option<f64>,
    /// Pupil-teacher ratio
    #[arg(long)]
    pub ptratio: Option<f64>,
    /// Demographic composition index
    #[arg(long)]
    pub b: Option<f64>,
    /// Lower-status population percentage
    #[arg(long)]
    pub lstat: Option<f64>,

    /// Predict from local artifacts instead of calling the service
    #[arg(long)]
    pub offline: bool,

    /// Estimator artifact used with --offline
    #[arg(long, default_value = DEFAULT_MODEL_PATH, requires = "offline")]
    pub model: PathBuf,

    /// Scaler artifact used with --offline; a missing file predicts on raw inputs
    #[arg(long, default_value = DEFAULT_SCALER_PATH, requires = "offline")]
    pub scaler: PathBuf,
}

impl PredictArgs {
    /// The features given on the command line, keyed like the form
    pub fn provided(&self) -> Vec<(&'static str, f64)> {
        [
            ("crim", self.crim),
            ("zn", self.zn),
            ("indus", self.indus),
            ("chas", self.chas),
            ("nox", self.nox),
            ("rm", self.rm),
            ("age", self.age),
            ("dis", self.dis),
            ("rad", self.rad),
            ("tax", self.tax),
            ("ptratio", self.ptratio),
            ("b", self.b),
            ("lstat", self.lstat),
        ]
        .into_iter()
        .filter_map(|(key, value)| value.map(|v| (key, v)))
        .collect()
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    match cli.command {
        Commands::Predict(args) if args.offline => {
            predict::predict_offline(&args, cli.format, cli.verbose).await?;
        }
        Commands::Predict(args) => {
            let client = client::ApiClient::new(&resolve_api_url(cli.api_url)?)?;
            predict::predict_remote(&client, &args, cli.format, cli.verbose).await?;
        }
        Commands::Features => {
            service::show_features(cli.format)?;
        }
        Commands::Model => {
            let client = client::ApiClient::new(&resolve_api_url(cli.api_url)?)?;
            service::show_model(&client, cli.format).await?;
        }
        Commands::Health => {
            let client = client::ApiClient::new(&resolve_api_url(cli.api_url)?)?;
            service::show_health(&client, cli.format).await?;
        }
    }

    Ok(())
}

/// Flag or env var first, then the config file, then the local default
fn resolve_api_url(flag: Option<String>) -> Result<String> {
    if let Some(url) = flag {
        return Ok(url);
    }
    let file = config::Config::load()?;
    Ok(file.api_url.unwrap_or_else(|| DEFAULT_API_URL.to_string()))
}
