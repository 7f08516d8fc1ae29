use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Area or disease name used when the source row leaves it blank.
pub const UNKNOWN: &str = "Unknown";

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SurveillanceRecord {
    pub year: Option<i32>,
    pub week: Option<i32>,
    pub area: String,
    pub disease: String,
    pub cases: u64,
    pub deaths: u64,
    pub unique_id: String,
    pub state: String,
    pub date_start: String,
    pub date_reporting: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CredentialStatus {
    Pending,
    Approved,
    Rejected,
}

impl CredentialStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Approved => "approved",
            Self::Rejected => "rejected",
        }
    }
}

impl fmt::Display for CredentialStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for CredentialStatus {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_lowercase().as_str() {
            "pending" => Ok(Self::Pending),
            "approved" => Ok(Self::Approved),
            "rejected" => Ok(Self::Rejected),
            other => Err(format!("unknown credential status: {other}")),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CredentialRecord {
    pub id: Uuid,
    pub name: String,
    pub email: String,
    pub license: String,
    pub specialization: String,
    pub status: CredentialStatus,
    pub created_at: DateTime<Utc>,
}

/// Row shape of the `doctors` table before normalization.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct DoctorRow {
    pub id: Uuid,
    pub full_name: Option<String>,
    pub email: Option<String>,
    pub license_number: Option<String>,
    pub specialization: Option<String>,
    pub status: Option<String>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", content = "area", rename_all = "lowercase")]
pub enum Leader {
    None,
    Area { name: String, cases: u64 },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct KeyIndicators {
    pub year: i32,
    pub week: Option<i32>,
    pub region: Option<String>,
    pub total_cases: u64,
    pub total_deaths: u64,
    pub leader: Leader,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DiseaseSeries {
    pub disease: String,
    pub monthly_cases: [u64; 12],
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DiseaseTrends {
    pub year: i32,
    /// False when no record carries the requested year.
    pub has_data: bool,
    pub series: Vec<DiseaseSeries>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RegionalRanking {
    pub year: i32,
    pub has_data: bool,
    pub labels: Vec<String>,
    pub values: Vec<u64>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MapFeatureSummary {
    pub district: String,
    pub cases: u64,
    pub radius: f64,
    pub marker_color: String,
    pub intensity: f64,
    pub hue: f64,
    pub fill_color: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MapSummary {
    pub year: i32,
    pub max_cases: u64,
    pub features: Vec<MapFeatureSummary>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct AdminStats {
    pub pending: usize,
    pub approved_this_month: usize,
    pub rejected_this_month: usize,
}
