use anyhow::Context;
use chrono::{DateTime, Duration, Utc};
use serde_json::Value;
use sqlx::{PgPool, Row};
use tracing::{debug, info};
use uuid::Uuid;

use crate::admin::DoctorGateway;
use crate::error::{DeskError, Result};
use crate::models::{CredentialRecord, CredentialStatus, DoctorRow};
use crate::normalize::normalize_credential;

pub async fn init_db(pool: &PgPool) -> anyhow::Result<()> {
    sqlx::migrate!("./migrations").run(pool).await?;
    Ok(())
}

pub async fn seed(pool: &PgPool) -> anyhow::Result<()> {
    let doctors = vec![
        (
            Uuid::parse_str("f2322c65-a3a0-4158-88b5-35e6d9d7744b")?,
            "Asha Kulkarni",
            "asha.kulkarni@example.in",
            "MMC-2019-04412",
            "Cardiology",
            CredentialStatus::Pending,
            Utc::now() - Duration::days(2),
        ),
        (
            Uuid::parse_str("447956d9-8486-4924-8fb8-8e34dc016266")?,
            "Rohan Deshmukh",
            "rohan.deshmukh@example.in",
            "MMC-2016-11873",
            "Pediatrics",
            CredentialStatus::Approved,
            Utc::now() - Duration::days(5),
        ),
        (
            Uuid::parse_str("68b9ade9-2edf-4a1d-90ee-3eb4c7e91e22")?,
            "Farah Shaikh",
            "farah.shaikh@example.in",
            "MMC-2021-20931",
            "Neurology",
            CredentialStatus::Pending,
            Utc::now() - Duration::days(9),
        ),
    ];

    for (id, name, email, license, specialization, status, created_at) in doctors {
        sqlx::query(
            r#"
            INSERT INTO doctors
            (id, full_name, email, license_number, specialization, status, created_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            ON CONFLICT (email) DO UPDATE
            SET full_name = EXCLUDED.full_name, specialization = EXCLUDED.specialization
            "#,
        )
        .bind(id)
        .bind(name)
        .bind(email)
        .bind(license)
        .bind(specialization)
        .bind(status.as_str())
        .bind(created_at)
        .execute(pool)
        .await?;
    }

    let rows = vec![
        ("seed-001", "Pune", "Dengue", "2024", "3", "42", "1", "15-01-2024", "19-01-2024"),
        ("seed-002", "Nagpur", "Malaria", "2024", "7", "65", "2", "12-02-2024", "16-02-2024"),
        ("seed-003", "Mumbai", "Cholera", "2024", "30", "18", "0", "22-07-2024", "25-07-2024"),
        ("seed-004", "Pune", "Chikungunya", "2023", "40", "27", "0", "02-10-2023", "06-10-2023"),
        ("seed-005", "Nashik", "Food Poisoning", "2023", "12", "54", "0", "20-03-2023", "21-03-2023"),
    ];

    for (unique_id, area, disease, year, week, cases, deaths, start, reported) in rows {
        insert_surveillance_row(
            pool,
            &GovRow {
                unique_id: Some(unique_id.to_string()),
                state: Some("Maharashtra".to_string()),
                area: Some(area.to_string()),
                disease: Some(disease.to_string()),
                year: Some(year.to_string()),
                week: Some(week.to_string()),
                cases: Some(cases.to_string()),
                deaths: Some(deaths.to_string()),
                date_start: Some(start.to_string()),
                date_reporting: Some(reported.to_string()),
            },
        )
        .await?;
    }

    Ok(())
}

/// Every surveillance row as loosely typed JSON, read in pages of
/// `page_size` rows in insertion order.
pub async fn fetch_surveillance_rows(pool: &PgPool, page_size: i64) -> Result<Vec<Value>> {
    let mut all_rows = Vec::new();
    let mut offset = 0i64;

    loop {
        let page = sqlx::query(
            "SELECT to_jsonb(g) - 'row_id' AS row FROM govdata g ORDER BY row_id LIMIT $1 OFFSET $2",
        )
        .bind(page_size)
        .bind(offset)
        .fetch_all(pool)
        .await?;

        let fetched = page.len() as i64;
        for row in page {
            all_rows.push(row.try_get::<Value, _>("row")?);
        }
        debug!(fetched, total = all_rows.len(), "Loaded surveillance page");

        if fetched == 0 || fetched < page_size {
            break;
        }
        offset += page_size;
    }

    info!(rows = all_rows.len(), "Surveillance rows loaded");
    Ok(all_rows)
}

#[derive(Debug, Default, serde::Deserialize)]
#[serde(default)]
pub struct GovRow {
    #[serde(rename = "Unique id")]
    unique_id: Option<String>,
    #[serde(rename = "State")]
    state: Option<String>,
    #[serde(rename = "Area")]
    area: Option<String>,
    #[serde(rename = "Disease")]
    disease: Option<String>,
    #[serde(rename = "Year")]
    year: Option<String>,
    #[serde(rename = "Week")]
    week: Option<String>,
    #[serde(rename = "No of cases")]
    cases: Option<String>,
    #[serde(rename = "No of deaths")]
    deaths: Option<String>,
    #[serde(rename = "Date of start")]
    date_start: Option<String>,
    #[serde(rename = "Date of reporting")]
    date_reporting: Option<String>,
}

async fn insert_surveillance_row(pool: &PgPool, row: &GovRow) -> Result<bool> {
    let result = sqlx::query(
        r#"
        INSERT INTO govdata
        ("Unique id", "State", "Area", "Disease", "Year", "Week",
         "No of cases", "No of deaths", "Date of start", "Date of reporting")
        VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)
        ON CONFLICT ("Unique id") DO NOTHING
        "#,
    )
    .bind(&row.unique_id)
    .bind(&row.state)
    .bind(&row.area)
    .bind(&row.disease)
    .bind(&row.year)
    .bind(&row.week)
    .bind(&row.cases)
    .bind(&row.deaths)
    .bind(&row.date_start)
    .bind(&row.date_reporting)
    .execute(pool)
    .await?;

    Ok(result.rows_affected() > 0)
}

pub async fn import_csv(pool: &PgPool, csv_path: &std::path::Path) -> anyhow::Result<usize> {
    let mut reader = csv::ReaderBuilder::new()
        .trim(csv::Trim::All)
        .from_path(csv_path)
        .with_context(|| format!("failed to open {}", csv_path.display()))?;
    let mut inserted = 0usize;

    for result in reader.deserialize::<GovRow>() {
        let mut row = result?;
        // blank cells arrive as empty strings; store them as NULL
        for field in [
            &mut row.unique_id,
            &mut row.state,
            &mut row.area,
            &mut row.disease,
            &mut row.year,
            &mut row.week,
            &mut row.cases,
            &mut row.deaths,
            &mut row.date_start,
            &mut row.date_reporting,
        ] {
            if field.as_deref() == Some("") {
                *field = None;
            }
        }

        if insert_surveillance_row(pool, &row).await? {
            inserted += 1;
        }
    }

    Ok(inserted)
}

/// `doctors` table access for the verification desk.
pub struct PgDoctorGateway {
    pool: PgPool,
}

impl PgDoctorGateway {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

impl DoctorGateway for PgDoctorGateway {
    async fn fetch_records(&self) -> Result<Vec<CredentialRecord>> {
        let rows = sqlx::query_as::<_, DoctorRow>(
            "SELECT id, full_name, email, license_number, specialization, status, created_at \
             FROM doctors ORDER BY created_at DESC",
        )
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.into_iter().map(normalize_credential).collect())
    }

    async fn update_status(
        &self,
        id: Uuid,
        status: CredentialStatus,
        reviewed_at: DateTime<Utc>,
    ) -> Result<()> {
        let updated = sqlx::query(
            "UPDATE doctors SET status = $1, gov_reviewed_at = $2 \
             WHERE id = $3 AND status = 'pending' RETURNING id",
        )
        .bind(status.as_str())
        .bind(reviewed_at)
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        match updated {
            Some(_) => Ok(()),
            None => Err(DeskError::NotFound(id.to_string())),
        }
    }
}
