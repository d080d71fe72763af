//! Budget optimization command

use anyhow::Result;
use colored::Colorize;
use tabled::Tabled;

use crate::client::{Allocation, ApiClient, OptimizationReport, OptimizeRequest};
use crate::output::{
    color_delta, format_change_pct, format_currency, format_share, print_info, print_json,
    print_success, print_table, print_warning, OutputFormat,
};

/// Row for the current vs optimized allocation table
#[derive(Tabled)]
struct AllocationRow {
    #[tabled(rename = "Channel")]
    channel: String,
    #[tabled(rename = "Current")]
    current: String,
    #[tabled(rename = "Share")]
    current_share: String,
    #[tabled(rename = "Optimized")]
    optimized: String,
    #[tabled(rename = "Share")]
    optimized_share: String,
    #[tabled(rename = "Change")]
    change: String,
}

fn allocation_rows(current: &Allocation, optimized: &Allocation, total: f64) -> Vec<AllocationRow> {
    current
        .entries()
        .into_iter()
        .zip(optimized.entries())
        .map(|((label, cur), (_, opt))| {
            let delta = opt - cur;
            AllocationRow {
                channel: label.to_string(),
                current: format_currency(cur),
                current_share: format_share(cur, total),
                optimized: format_currency(opt),
                optimized_share: format_share(opt, total),
                change: color_delta(delta, format_currency(delta)),
            }
        })
        .collect()
}

/// Optimize a channel allocation
pub async fn run(
    client: &ApiClient,
    current: Allocation,
    budget: Option<f64>,
    scenario: Option<String>,
    format: OutputFormat,
) -> Result<()> {
    let request = OptimizeRequest {
        current_allocation: current.to_request_map(),
        total_budget: budget.unwrap_or_else(|| current.total()),
        scenario,
    };

    let report = client.optimize(&request).await?;

    match format {
        OutputFormat::Json => print_json(&report)?,
        OutputFormat::Table => print_report(&report),
    }

    Ok(())
}

fn print_report(report: &OptimizationReport) {
    let result = &report.result;

    println!("{}", "Budget Optimization".bold());
    println!("{}", "=".repeat(60));
    println!("Scenario:        {}", result.scenario.cyan());
    println!("Total budget:    {}", format_currency(result.total_budget));
    println!("Model:           {}", report.model_version.cyan());
    println!(
        "Candidates:      {} evaluated, {} rejected",
        result.candidates_evaluated, result.candidates_rejected
    );
    println!();

    print_table(&allocation_rows(
        &result.current_allocation,
        &result.optimized_allocation,
        result.total_budget,
    ));
    println!();

    println!("{}", "Outcome".bold());
    println!("{}", "-".repeat(60));
    println!(
        "Revenue:         {} -> {} ({})",
        format_currency(result.current_revenue),
        format_currency(result.optimized_revenue),
        color_delta(
            result.revenue_improvement,
            format_change_pct(report.insights.revenue_change_pct)
        )
    );
    println!(
        "ROI:             {:.3} -> {:.3} ({})",
        result.current_roi,
        result.optimized_roi,
        color_delta(
            result.roi_improvement,
            format_change_pct(report.insights.roi_change_pct)
        )
    );
    println!();

    if report.insights.already_optimal {
        print_warning("Current allocation is already optimal for this model");
    } else {
        print_success("Found an allocation with higher ROI");
    }

    for line in &report.summary {
        print_info(line);
    }
}
