//! Scenario comparison command

use anyhow::Result;
use colored::Colorize;
use tabled::Tabled;

use crate::client::{ApiClient, ScenarioReport, ScenarioRequest};
use crate::output::{format_currency, format_share, print_json, print_success, print_table, OutputFormat};

#[derive(Tabled)]
struct ScenarioRow {
    #[tabled(rename = "Scenario")]
    scenario: String,
    #[tabled(rename = "Revenue")]
    revenue: String,
    #[tabled(rename = "ROI")]
    roi: String,
    #[tabled(rename = "Social")]
    social: String,
    #[tabled(rename = "Search")]
    search: String,
    #[tabled(rename = "Email")]
    email: String,
    #[tabled(rename = "Promotions")]
    promotions: String,
}

fn scenario_rows(report: &ScenarioReport) -> Vec<ScenarioRow> {
    let total = report.comparison.total_budget;
    report
        .comparison
        .outcomes
        .iter()
        .map(|o| {
            let alloc = &o.result.optimized_allocation;
            let scenario = if report.best_scenario.as_deref() == Some(o.scenario.as_str()) {
                format!("{} *", o.scenario)
            } else {
                o.scenario.clone()
            };
            ScenarioRow {
                scenario,
                revenue: format_currency(o.optimized_revenue),
                roi: format!("{:.3}", o.optimized_roi),
                social: format_share(alloc.social_media, total),
                search: format_share(alloc.search_ads, total),
                email: format_share(alloc.email, total),
                promotions: format_share(alloc.promotions, total),
            }
        })
        .collect()
}

/// Compare optimized allocations across scenarios
pub async fn run(
    client: &ApiClient,
    budget: f64,
    scenarios: Vec<String>,
    format: OutputFormat,
) -> Result<()> {
    let request = ScenarioRequest {
        total_budget: budget,
        current_allocation: None,
        scenarios: (!scenarios.is_empty()).then_some(scenarios),
    };

    let report = client.compare_scenarios(&request).await?;

    match format {
        OutputFormat::Json => print_json(&report)?,
        OutputFormat::Table => {
            println!("{}", "Scenario Comparison".bold());
            println!("{}", "=".repeat(60));
            println!(
                "Total budget:    {}",
                format_currency(report.comparison.total_budget)
            );
            println!("Model:           {}", report.model_version.cyan());
            println!();

            print_table(&scenario_rows(&report));

            if let Some(best) = &report.best_scenario {
                println!();
                print_success(&format!("Highest ROI under '{}'", best));
            }
        }
    }

    Ok(())
}
