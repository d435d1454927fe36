//! Request payloads accepted by the server
//!
//! Every payload rejects unknown fields and carries its numeric bounds as
//! `validator` rules, so parsing plus `.validate()` is the whole schema check.

use crate::db::models::AccessLevel;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use uuid::Uuid;
use validator::Validate;

// ============================================================================
// Organizations, memberships and projects
// ============================================================================

#[derive(Debug, Clone, Deserialize, Serialize, Validate)]
#[serde(deny_unknown_fields)]
pub struct OrganizationCreate {
    #[validate(length(min = 1, max = 255))]
    pub name: String,

    #[serde(default)]
    #[validate(length(max = 1024))]
    pub description: String,
}

#[derive(Debug, Clone, Default, Deserialize, Serialize, Validate)]
#[serde(deny_unknown_fields)]
pub struct OrganizationUpdate {
    #[validate(length(min = 1, max = 255))]
    pub name: Option<String>,

    #[validate(length(max = 1024))]
    pub description: Option<String>,
}

#[derive(Debug, Clone, Deserialize, Serialize, Validate)]
#[serde(deny_unknown_fields)]
pub struct MembershipCreate {
    pub user_id: Uuid,

    #[serde(default)]
    pub is_admin: bool,
}

#[derive(Debug, Clone, Deserialize, Serialize, Validate)]
#[serde(deny_unknown_fields)]
pub struct ProjectCreate {
    #[validate(length(min = 1, max = 255))]
    pub name: String,

    #[serde(default)]
    #[validate(length(max = 1024))]
    pub description: String,

    #[serde(default)]
    pub public: bool,
}

#[derive(Debug, Clone, Default, Deserialize, Serialize, Validate)]
#[serde(deny_unknown_fields)]
pub struct ProjectUpdate {
    #[validate(length(min = 1, max = 255))]
    pub name: Option<String>,

    #[validate(length(max = 1024))]
    pub description: Option<String>,

    pub public: Option<bool>,
}

#[derive(Debug, Clone, Deserialize, Serialize, Validate)]
#[serde(deny_unknown_fields)]
pub struct ProjectTokenCreate {
    #[validate(length(min = 1, max = 255))]
    pub name: String,

    pub access: AccessLevel,

    #[serde(default, deserialize_with = "optional_agent_timestamp")]
    pub expiration_date: Option<DateTime<Utc>>,
}

// ============================================================================
// Ingestion
// ============================================================================

#[derive(Debug, Clone, Deserialize, Serialize, Validate)]
#[serde(deny_unknown_fields)]
pub struct ExperimentCreate {
    #[serde(deserialize_with = "agent_timestamp")]
    pub timestamp: DateTime<Utc>,

    pub project_id: Uuid,

    #[validate(length(min = 1, max = 255))]
    pub name: String,

    pub description: Option<String>,
    pub country_name: Option<String>,

    #[validate(length(max = 3))]
    pub country_iso_code: Option<String>,

    pub region: Option<String>,

    #[serde(default)]
    pub on_cloud: bool,

    pub cloud_provider: Option<String>,
    pub cloud_region: Option<String>,
}

#[derive(Debug, Clone, Deserialize, Serialize, Validate)]
#[serde(deny_unknown_fields)]
pub struct RunCreate {
    #[serde(deserialize_with = "agent_timestamp")]
    pub timestamp: DateTime<Utc>,

    pub experiment_id: Uuid,

    pub os: Option<String>,
    pub python_version: Option<String>,
    pub codecarbon_version: Option<String>,

    #[validate(range(min = 0))]
    pub cpu_count: Option<i32>,

    pub cpu_model: Option<String>,

    #[validate(range(min = 0))]
    pub gpu_count: Option<i32>,

    pub gpu_model: Option<String>,

    #[validate(range(min = -180.0, max = 180.0))]
    pub longitude: Option<f64>,

    #[validate(range(min = -90.0, max = 90.0))]
    pub latitude: Option<f64>,

    pub region: Option<String>,
    pub provider: Option<String>,

    #[validate(range(min = 0.0))]
    pub ram_total_size: Option<f64>,

    pub tracking_mode: Option<String>,
}

#[derive(Debug, Clone, Deserialize, Serialize, Validate)]
#[serde(deny_unknown_fields)]
pub struct EmissionCreate {
    #[serde(deserialize_with = "agent_timestamp")]
    pub timestamp: DateTime<Utc>,

    pub run_id: Uuid,

    /// Seconds
    #[validate(range(exclusive_min = 0.0, message = "must be greater than zero"))]
    pub duration: f64,

    #[validate(range(min = 0.0))]
    pub emissions_sum: f64,
    #[validate(range(min = 0.0))]
    pub emissions_rate: f64,
    #[validate(range(min = 0.0))]
    pub energy_consumed: f64,

    #[validate(range(min = 0.0))]
    pub cpu_power: f64,
    #[validate(range(min = 0.0))]
    pub gpu_power: f64,
    #[validate(range(min = 0.0))]
    pub ram_power: f64,

    #[validate(range(min = 0.0))]
    pub cpu_energy: f64,
    #[validate(range(min = 0.0))]
    pub gpu_energy: f64,
    #[validate(range(min = 0.0))]
    pub ram_energy: f64,

    #[validate(range(min = 0.0, max = 100.0))]
    pub cpu_utilization_percent: Option<f64>,
    #[validate(range(min = 0.0, max = 100.0))]
    pub gpu_utilization_percent: Option<f64>,
    #[validate(range(min = 0.0, max = 100.0))]
    pub ram_utilization_percent: Option<f64>,

    #[validate(range(min = 0.0))]
    pub wue: Option<f64>,
}

// ============================================================================
// Timestamps
// ============================================================================

/// Parse an agent-supplied timestamp and normalize it to UTC.
///
/// RFC 3339 with any offset is accepted; a bare ISO-8601 date-time without an
/// offset is taken as UTC.
pub fn parse_agent_timestamp(raw: &str) -> Option<DateTime<Utc>> {
    let raw = raw.trim();
    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return Some(dt.with_timezone(&Utc));
    }
    ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f"]
        .iter()
        .find_map(|fmt| chrono::NaiveDateTime::parse_from_str(raw, fmt).ok())
        .map(|naive| naive.and_utc())
}

fn agent_timestamp<'de, D>(deserializer: D) -> Result<DateTime<Utc>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = String::deserialize(deserializer)?;
    parse_agent_timestamp(&raw).ok_or_else(|| {
        serde::de::Error::custom(format!("invalid timestamp '{}': expected RFC 3339", raw))
    })
}

fn optional_agent_timestamp<'de, D>(deserializer: D) -> Result<Option<DateTime<Utc>>, D::Error>
where
    D: Deserializer<'de>,
{
    match Option::<String>::deserialize(deserializer)? {
        Some(raw) => parse_agent_timestamp(&raw).map(Some).ok_or_else(|| {
            serde::de::Error::custom(format!("invalid timestamp '{}': expected RFC 3339", raw))
        }),
        None => Ok(None),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn emission_json() -> serde_json::Value {
        json!({
            "timestamp": "2024-03-01T10:00:00+02:00",
            "run_id": Uuid::new_v4(),
            "duration": 10,
            "emissions_sum": 0.5,
            "emissions_rate": 0.05,
            "energy_consumed": 1.2,
            "cpu_power": 0.1,
            "gpu_power": 0.1,
            "ram_power": 0.1,
            "cpu_energy": 0.4,
            "gpu_energy": 0.4,
            "ram_energy": 0.4
        })
    }

    #[test]
    fn test_timestamp_normalized_to_utc() {
        let payload: EmissionCreate = serde_json::from_value(emission_json()).unwrap();
        assert_eq!(payload.timestamp.to_rfc3339(), "2024-03-01T08:00:00+00:00");
        assert!(payload.validate().is_ok());
    }

    #[test]
    fn test_naive_timestamp_is_utc() {
        let ts = parse_agent_timestamp("2024-03-01T10:00:00.250").unwrap();
        assert_eq!(ts.to_rfc3339(), "2024-03-01T10:00:00.250+00:00");
        assert!(parse_agent_timestamp("yesterday").is_none());
    }

    #[test]
    fn test_zero_duration_rejected() {
        let mut body = emission_json();
        body["duration"] = json!(0);
        let payload: EmissionCreate = serde_json::from_value(body).unwrap();
        let errors = payload.validate().unwrap_err();
        assert!(errors.field_errors().contains_key("duration"));
    }

    #[test]
    fn test_negative_energy_rejected() {
        let mut body = emission_json();
        body["cpu_energy"] = json!(-0.1);
        let payload: EmissionCreate = serde_json::from_value(body).unwrap();
        assert!(payload.validate().is_err());
    }

    #[test]
    fn test_unknown_field_rejected() {
        let mut body = emission_json();
        body["gpu_temperature"] = json!(71.0);
        assert!(serde_json::from_value::<EmissionCreate>(body).is_err());
    }

    #[test]
    fn test_run_coordinates_bounded() {
        let body = json!({
            "timestamp": "2024-03-01T10:00:00Z",
            "experiment_id": Uuid::new_v4(),
            "latitude": 91.0
        });
        let payload: RunCreate = serde_json::from_value(body).unwrap();
        assert!(payload.validate().is_err());
    }

    #[test]
    fn test_token_access_must_be_known() {
        let ok: ProjectTokenCreate =
            serde_json::from_value(json!({"name": "agent", "access": 2})).unwrap();
        assert_eq!(ok.access, AccessLevel::Write);
        assert!(ok.expiration_date.is_none());

        let bad = serde_json::from_value::<ProjectTokenCreate>(json!({"name": "a", "access": 9}));
        assert!(bad.is_err());
    }
}
