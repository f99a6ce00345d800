use super::ui;
use crate::sync::{RateSynchronizer, SyncReport};
use anyhow::{Context, Result};
use comfy_table::Cell;
use std::sync::Arc;
use std::time::Duration;
use tracing::info;

pub fn display_report(report: &SyncReport) -> String {
    let mut output = format!(
        "{} {}/{}",
        ui::style_text("Updated:", ui::StyleType::TotalLabel),
        ui::style_text(&report.updated.len().to_string(), ui::StyleType::TotalValue),
        report.total()
    );

    if !report.failures.is_empty() {
        let mut table = ui::new_styled_table();
        table.set_header(vec![
            ui::header_cell("Id"),
            ui::header_cell("Pair"),
            ui::header_cell("Reason"),
        ]);
        for failure in &report.failures {
            table.add_row(vec![
                Cell::new(failure.id),
                Cell::new(&failure.pair),
                ui::error_cell(&failure.reason),
            ]);
        }
        output.push_str("\n\n");
        output.push_str(&table.to_string());
    }

    output
}

/// Runs a single synchronization tick right away.
pub async fn sync_now(synchronizer: &RateSynchronizer) -> Result<()> {
    let report = synchronizer
        .sync_once()
        .await
        .context("Synchronization failed")?;
    println!("{}", display_report(&report));
    Ok(())
}

/// Keeps rates fresh in the background until Ctrl-C.
pub async fn run(synchronizer: Arc<RateSynchronizer>, period: Duration) -> Result<()> {
    let handle = synchronizer.spawn(period);
    info!("Press Ctrl-C to stop");

    tokio::signal::ctrl_c()
        .await
        .context("Failed to listen for Ctrl-C")?;
    handle.stop().await;
    Ok(())
}
