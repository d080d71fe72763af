//! Loaded model information command

use anyhow::Result;
use colored::Colorize;
use tabled::Tabled;

use crate::client::ApiClient;
use crate::output::{print_json, print_table, print_warning, OutputFormat};

#[derive(Tabled)]
struct EffectivenessRow {
    #[tabled(rename = "Channel")]
    channel: String,
    #[tabled(rename = "Importance")]
    importance: String,
}

/// Show the model the server is optimizing with
pub async fn run(client: &ApiClient, format: OutputFormat) -> Result<()> {
    let info = client.model_info().await?;

    match format {
        OutputFormat::Json => print_json(&info)?,
        OutputFormat::Table => {
            println!("{}", "Revenue Model".bold());
            println!("{}", "=".repeat(50));
            println!("Version:   {}", info.version.cyan());
            println!("Kind:      {}", info.kind);
            println!("Checksum:  {}", info.checksum);
            println!("Features:  {}", info.features.len());

            if let Some(perf) = &info.performance {
                println!(
                    "Accuracy:  R² {:.3}, RMSE {:.2}, MAE {:.2}",
                    perf.r2, perf.rmse, perf.mae
                );
            }
            println!();

            if info.channel_effectiveness.is_empty() {
                print_warning("Model does not expose feature importance");
                return Ok(());
            }

            let mut rows: Vec<(&String, &f64)> = info.channel_effectiveness.iter().collect();
            rows.sort_by(|a, b| b.1.total_cmp(a.1));
            let rows: Vec<EffectivenessRow> = rows
                .into_iter()
                .map(|(channel, importance)| EffectivenessRow {
                    channel: channel.clone(),
                    importance: format!("{:.3}", importance),
                })
                .collect();

            println!("{}", "Channel Effectiveness".bold());
            print_table(&rows);
        }
    }

    Ok(())
}
