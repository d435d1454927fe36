//! Time-window report types
//!
//! Every report covers emissions whose timestamp lies in `[start, end]`.
//! Sums are plain sums; averages are per-sample means. A window with no
//! emissions yields zeros rather than an error.

use crate::errors::{AppError, Result};
use crate::schemas::parse_agent_timestamp;
use chrono::{DateTime, Utc};
use sea_orm::FromQueryResult;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Inclusive reporting interval, both ends in UTC
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ReportWindow {
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
}

impl ReportWindow {
    /// Build a window, defaulting `start` to the Unix epoch and `end` to `now`
    pub fn new(
        start: Option<DateTime<Utc>>,
        end: Option<DateTime<Utc>>,
        now: DateTime<Utc>,
    ) -> Result<Self> {
        let start = start.unwrap_or(DateTime::UNIX_EPOCH);
        let end = end.unwrap_or(now);
        if start > end {
            return Err(AppError::validation(
                "start",
                format!("start ({}) must not be after end ({})", start, end),
            ));
        }
        Ok(Self { start, end })
    }
}

/// Raw `start`/`end` query parameters
#[derive(Debug, Clone, Default, Deserialize)]
pub struct WindowQuery {
    pub start: Option<String>,
    pub end: Option<String>,
}

impl WindowQuery {
    pub fn into_window(self, now: DateTime<Utc>) -> Result<ReportWindow> {
        let parse = |field: &str, raw: Option<String>| -> Result<Option<DateTime<Utc>>> {
            match raw.as_deref().map(str::trim).filter(|s| !s.is_empty()) {
                None => Ok(None),
                Some(value) => parse_agent_timestamp(value).map(Some).ok_or_else(|| {
                    AppError::validation(field, format!("invalid timestamp '{}'", value))
                }),
            }
        };
        ReportWindow::new(parse("start", self.start)?, parse("end", self.end)?, now)
    }
}

/// Sums and averages over a set of emissions
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct EmissionTotals {
    pub emissions_sum: f64,
    pub energy_consumed: f64,
    pub cpu_energy: f64,
    pub gpu_energy: f64,
    pub ram_energy: f64,
    pub duration: f64,
    pub cpu_power: f64,
    pub gpu_power: f64,
    pub ram_power: f64,
    pub emissions_rate: f64,
    pub emissions_count: i64,
}

/// Aggregate columns as returned by SQL, NULL when nothing matched
#[derive(Debug, Clone, Default, FromQueryResult)]
pub(crate) struct TotalsRow {
    pub emissions_sum: Option<f64>,
    pub energy_consumed: Option<f64>,
    pub cpu_energy: Option<f64>,
    pub gpu_energy: Option<f64>,
    pub ram_energy: Option<f64>,
    pub duration: Option<f64>,
    pub cpu_power: Option<f64>,
    pub gpu_power: Option<f64>,
    pub ram_power: Option<f64>,
    pub emissions_rate: Option<f64>,
    pub emissions_count: Option<i64>,
}

impl From<TotalsRow> for EmissionTotals {
    fn from(row: TotalsRow) -> Self {
        Self {
            emissions_sum: row.emissions_sum.unwrap_or(0.0),
            energy_consumed: row.energy_consumed.unwrap_or(0.0),
            cpu_energy: row.cpu_energy.unwrap_or(0.0),
            gpu_energy: row.gpu_energy.unwrap_or(0.0),
            ram_energy: row.ram_energy.unwrap_or(0.0),
            duration: row.duration.unwrap_or(0.0),
            cpu_power: row.cpu_power.unwrap_or(0.0),
            gpu_power: row.gpu_power.unwrap_or(0.0),
            ram_power: row.ram_power.unwrap_or(0.0),
            emissions_rate: row.emissions_rate.unwrap_or(0.0),
            emissions_count: row.emissions_count.unwrap_or(0),
        }
    }
}

/// Per-run rollup joined to run metadata
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunReport {
    pub run_id: Uuid,
    pub experiment_id: Uuid,
    pub timestamp: DateTime<Utc>,
    #[serde(flatten)]
    pub totals: EmissionTotals,
}

/// Per-experiment rollup joined to experiment metadata
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExperimentReport {
    pub experiment_id: Uuid,
    pub project_id: Uuid,
    pub timestamp: DateTime<Utc>,
    pub name: String,
    pub description: Option<String>,
    pub country_name: Option<String>,
    pub country_iso_code: Option<String>,
    pub region: Option<String>,
    pub on_cloud: bool,
    pub cloud_provider: Option<String>,
    pub cloud_region: Option<String>,
    #[serde(flatten)]
    pub totals: EmissionTotals,
}

/// Scalar totals for one project
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProjectReport {
    pub project_id: Uuid,
    pub name: String,
    pub description: String,
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
    #[serde(flatten)]
    pub totals: EmissionTotals,
}

/// Scalar totals for one organization
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OrganizationReport {
    pub organization_id: Uuid,
    pub name: String,
    pub description: String,
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
    #[serde(flatten)]
    pub totals: EmissionTotals,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn at(s: &str) -> DateTime<Utc> {
        DateTime::parse_from_rfc3339(s).unwrap().with_timezone(&Utc)
    }

    #[test]
    fn test_window_defaults() {
        let now = at("2025-01-01T00:00:00Z");
        let window = ReportWindow::new(None, None, now).unwrap();
        assert_eq!(window.start, DateTime::UNIX_EPOCH);
        assert_eq!(window.end, now);
    }

    #[test]
    fn test_window_rejects_inverted_bounds() {
        let now = at("2025-01-01T00:00:00Z");
        let err = ReportWindow::new(Some(now), Some(at("2024-01-01T00:00:00Z")), now).unwrap_err();
        assert_eq!(err.status_code(), axum::http::StatusCode::BAD_REQUEST);
    }

    #[test]
    fn test_window_allows_single_instant() {
        let t = at("2024-06-01T00:00:00Z");
        let window = ReportWindow::new(Some(t), Some(t), t).unwrap();
        assert_eq!(window.start, window.end);
    }

    #[test]
    fn test_window_query_parsing() {
        let now = at("2025-01-01T00:00:00Z");
        let query = WindowQuery {
            start: Some("2024-01-01T00:00:00+01:00".into()),
            end: Some("".into()),
        };
        let window = query.into_window(now).unwrap();
        assert_eq!(window.start, at("2023-12-31T23:00:00Z"));
        assert_eq!(window.end, now);

        let bad = WindowQuery {
            start: Some("last week".into()),
            end: None,
        };
        assert!(bad.into_window(now).is_err());
    }

    #[test]
    fn test_empty_totals_are_zero() {
        let totals = EmissionTotals::from(TotalsRow::default());
        assert_eq!(totals, EmissionTotals::default());
        let json = serde_json::to_value(totals).unwrap();
        assert_eq!(json["emissions_count"], 0);
        assert_eq!(json["emissions_sum"], 0.0);
    }
}
