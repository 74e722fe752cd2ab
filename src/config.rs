//! Runtime configuration for logging and reporting policy

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

use crate::types::{LedgerError, LedgerResult};

/// How cost of goods sold is priced
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CostBasis {
    /// Product cost price at report time. Editing a product's cost changes past reports.
    #[default]
    CurrentProductCost,
    /// Unit cost recorded on the sale line, falling back to the current cost when absent
    RecordedUnitCost,
}

/// How business weeks are numbered
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WeekNumbering {
    /// Day of year of the week's Saturday divided by seven, plus one
    #[default]
    DayOfYear,
    /// ISO-8601 week of the week's Saturday
    Iso8601,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ReportingConfig {
    pub cost_basis: CostBasis,
    pub week_numbering: WeekNumbering,
    /// Decimal places kept on margin and growth percentages
    pub margin_decimal_places: i64,
}

impl Default for ReportingConfig {
    fn default() -> Self {
        Self {
            cost_basis: CostBasis::default(),
            week_numbering: WeekNumbering::default(),
            margin_decimal_places: 2,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LedgerConfig {
    /// `tracing_subscriber::EnvFilter` directive used when `RUST_LOG` is unset
    pub log_filter: String,
    pub reporting: ReportingConfig,
}

impl Default for LedgerConfig {
    fn default() -> Self {
        Self {
            log_filter: "trading_ledger_core=info".to_string(),
            reporting: ReportingConfig::default(),
        }
    }
}

impl LedgerConfig {
    /// Parse a JSON document; missing fields take their defaults
    pub fn from_json_str(json: &str) -> LedgerResult<Self> {
        let config: LedgerConfig = serde_json::from_str(json)
            .map_err(|e| LedgerError::Configuration(format!("invalid configuration: {}", e)))?;
        config.validate()?;
        Ok(config)
    }

    /// Load from a JSON file, or return the defaults when the file does not exist
    pub fn load(path: impl AsRef<Path>) -> LedgerResult<Self> {
        let path = path.as_ref();
        if !path.exists() {
            return Ok(Self::default());
        }
        let data = fs::read_to_string(path).map_err(|e| {
            LedgerError::Configuration(format!("cannot read {}: {}", path.display(), e))
        })?;
        Self::from_json_str(&data)
    }

    pub fn validate(&self) -> LedgerResult<()> {
        if !(0..=10).contains(&self.reporting.margin_decimal_places) {
            return Err(LedgerError::Configuration(format!(
                "margin_decimal_places must be between 0 and 10, got {}",
                self.reporting.margin_decimal_places
            )));
        }
        Ok(())
    }
}
