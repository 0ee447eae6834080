pub mod accounting;
pub mod commands;
pub mod models;

use std::env;

use anyhow::{anyhow, Context};
use dotenvy::dotenv;

use crate::models::CostBasis;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OutputFormat {
    #[default]
    Text,
    Csv,
    Json,
}

impl std::str::FromStr for OutputFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "text" => Ok(OutputFormat::Text),
            "csv" => Ok(OutputFormat::Csv),
            "json" => Ok(OutputFormat::Json),
            other => Err(format!(
                "Unsupported output format '{}'. Must be 'text', 'csv' or 'json'.",
                other
            )),
        }
    }
}

#[derive(Debug, Clone)]
pub struct ReportConfig {
    pub cost_basis: CostBasis,
    pub format: OutputFormat,
    /// Sales buffered between the replay thread and the report writer.
    pub channel_capacity: usize,
}

impl Default for ReportConfig {
    fn default() -> Self {
        Self {
            cost_basis: CostBasis::Fifo,
            format: OutputFormat::Text,
            channel_capacity: 64,
        }
    }
}

pub fn load_report_config() -> anyhow::Result<ReportConfig> {
    dotenv().ok();
    let defaults = ReportConfig::default();

    let cost_basis = match env::var("COST_BASIS") {
        Ok(value) => value.parse::<CostBasis>().map_err(|e| anyhow!(e))?,
        Err(_) => defaults.cost_basis,
    };
    let format = match env::var("OUTPUT_FORMAT") {
        Ok(value) => value.parse::<OutputFormat>().map_err(|e| anyhow!(e))?,
        Err(_) => defaults.format,
    };
    let channel_capacity = match env::var("SALES_CHANNEL_CAPACITY") {
        Ok(value) => value
            .trim()
            .parse::<usize>()
            .with_context(|| format!("Invalid SALES_CHANNEL_CAPACITY '{}'", value))?,
        Err(_) => defaults.channel_capacity,
    };

    Ok(ReportConfig {
        cost_basis,
        format,
        channel_capacity,
    })
}
