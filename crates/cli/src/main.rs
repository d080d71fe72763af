//! AdOptima CLI
//!
//! A command-line tool for optimizing marketing budget allocations,
//! comparing market scenarios, and inspecting the optimizer server.

mod client;
mod commands;
mod config;
mod output;

use anyhow::Result;
use clap::{Parser, Subcommand};
use client::Allocation;
use commands::{health, model, optimize, scenarios};

/// AdOptima CLI
#[derive(Parser)]
#[command(name = "adopt")]
#[command(author, version, about = "CLI for the AdOptima budget optimizer", long_about = None)]
pub struct Cli {
    /// API endpoint URL (can also be set via ADOPTIMA_API_URL env var)
    #[arg(long, env = "ADOPTIMA_API_URL")]
    pub api_url: Option<String>,

    /// Output format
    #[arg(long, short, default_value = "table")]
    pub format: output::OutputFormat,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Find the ROI-maximizing split of a budget
    Optimize {
        /// Current social media spend
        #[arg(long)]
        social: f64,

        /// Current search ads spend
        #[arg(long)]
        search: f64,

        /// Current email spend
        #[arg(long)]
        email: f64,

        /// Current promotions spend
        #[arg(long)]
        promotions: f64,

        /// Total budget to allocate (defaults to the sum of current spend)
        #[arg(long)]
        budget: Option<f64>,

        /// Market scenario (normal, holiday, competitor_high)
        #[arg(long)]
        scenario: Option<String>,
    },

    /// Compare optimized allocations across market scenarios
    Scenarios {
        /// Total budget to allocate
        #[arg(long)]
        budget: f64,

        /// Scenario to include; repeat for several (defaults to all)
        #[arg(long = "scenario")]
        scenarios: Vec<String>,
    },

    /// Show the loaded revenue model
    Model,

    /// Show server health
    Health,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let config = config::Config::load()?;
    let client = client::ApiClient::new(&config.resolve_api_url(cli.api_url.as_deref()))?;

    match cli.command {
        Commands::Optimize {
            social,
            search,
            email,
            promotions,
            budget,
            scenario,
        } => {
            let current = Allocation {
                social_media: social,
                search_ads: search,
                email,
                promotions,
            };
            let scenario = scenario.or(config.default_scenario);
            optimize::run(&client, current, budget, scenario, cli.format).await?;
        }
        Commands::Scenarios {
            budget,
            scenarios: names,
        } => {
            scenarios::run(&client, budget, names, cli.format).await?;
        }
        Commands::Model => {
            model::run(&client, cli.format).await?;
        }
        Commands::Health => {
            health::run(&client, cli.format).await?;
        }
    }

    Ok(())
}
