use super::ui;
use crate::core::rate::Rate;
use crate::error::Error;
use crate::service::{ConversionResult, ConvertRequest, CreateRateRequest, RateService};
use anyhow::{Result, anyhow};
use comfy_table::Cell;

/// Turns a service error into the status line and JSON body an API client would see.
pub fn api_error(e: Error) -> anyhow::Error {
    let body = serde_json::to_string(&e.to_body()).unwrap_or_else(|_| e.to_string());
    anyhow!("{} {}", e.status_code(), body)
}

pub fn display_rates(rates: &[Rate]) -> String {
    let mut table = ui::new_styled_table();
    table.set_header(vec![
        ui::header_cell("Id"),
        ui::header_cell("Pair"),
        ui::header_cell("Rate"),
        ui::header_cell("Last Update"),
    ]);

    for rate in rates {
        table.add_row(vec![
            Cell::new(rate.id),
            Cell::new(rate.pair()),
            ui::number_cell(rate.value, 4),
            Cell::new(rate.last_update_time.format("%Y-%m-%d %H:%M:%S UTC")),
        ]);
    }

    table.to_string()
}

pub fn display_conversion(result: &ConversionResult) -> String {
    format!(
        "{} {} = {} {}\n{}",
        result.query.value,
        result.query.currency_from,
        ui::style_text(
            &format!("{:.4}", result.conversion_result),
            ui::StyleType::TotalValue
        ),
        ui::style_text(&result.query.currency_to, ui::StyleType::TotalLabel),
        ui::style_text(
            &format!("rate last updated {}", result.last_update_time.to_rfc3339()),
            ui::StyleType::Subtle
        ),
    )
}

pub async fn create(service: &RateService, first: &str, second: &str) -> Result<()> {
    let rate = service
        .create_rate(CreateRateRequest {
            first_currency: Some(first.to_string()),
            second_currency: Some(second.to_string()),
        })
        .await
        .map_err(api_error)?;

    println!("{}", ui::style_text("Created rate", ui::StyleType::Title));
    println!("{}", display_rates(&[rate]));
    Ok(())
}

pub async fn convert(service: &RateService, from: &str, to: &str, value: &str) -> Result<()> {
    let result = service
        .convert(ConvertRequest {
            currency_from: Some(from.to_string()),
            currency_to: Some(to.to_string()),
            value: Some(value.to_string()),
        })
        .await
        .map_err(api_error)?;

    println!("{}", display_conversion(&result));
    Ok(())
}

pub async fn list(service: &RateService) -> Result<()> {
    let rates = service.list_rates().await.map_err(api_error)?;
    if rates.is_empty() {
        println!(
            "{}",
            ui::style_text("No rates stored yet", ui::StyleType::Subtle)
        );
        return Ok(());
    }

    println!("{}", display_rates(&rates));
    Ok(())
}
