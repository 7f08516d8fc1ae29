//! Doctor verification desk.
//!
//! Holds the full credential record set and a filtered view of it. Approve
//! and reject never touch local state: the status shown is whatever the last
//! reload returned.

use chrono::{DateTime, Datelike, Local, Utc};
use tracing::{error, info};
use uuid::Uuid;

use crate::error::Result;
use crate::models::{AdminStats, CredentialRecord, CredentialStatus};

pub trait DoctorGateway {
    /// Every credential record, newest submission first.
    async fn fetch_records(&self) -> Result<Vec<CredentialRecord>>;

    async fn update_status(
        &self,
        id: Uuid,
        status: CredentialStatus,
        reviewed_at: DateTime<Utc>,
    ) -> Result<()>;
}

/// Asks the operator before a status transition goes out.
pub trait Confirm {
    fn confirm(&mut self, prompt: &str) -> bool;
}

pub trait Notifier {
    fn success(&mut self, message: &str);
    fn failure(&mut self, message: &str);
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum StatusFilter {
    #[default]
    All,
    Only(CredentialStatus),
}

impl StatusFilter {
    pub fn parse(value: &str) -> std::result::Result<Self, String> {
        if value.eq_ignore_ascii_case("all") {
            Ok(Self::All)
        } else {
            value.parse().map(Self::Only)
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TableFilter {
    pub search: String,
    pub status: StatusFilter,
    /// `None` means every specialization.
    pub specialization: Option<String>,
}

impl TableFilter {
    pub fn matches(&self, record: &CredentialRecord) -> bool {
        let term = self.search.to_lowercase();
        let matches_search = [
            &record.name,
            &record.license,
            &record.email,
            &record.specialization,
        ]
        .iter()
        .any(|field| field.to_lowercase().contains(&term));

        let matches_status = match self.status {
            StatusFilter::All => true,
            StatusFilter::Only(status) => record.status == status,
        };

        let matches_specialization = self
            .specialization
            .as_deref()
            .map_or(true, |s| record.specialization.eq_ignore_ascii_case(s));

        matches_search && matches_status && matches_specialization
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Transition {
    Approve,
    Reject,
}

impl Transition {
    fn status(self) -> CredentialStatus {
        match self {
            Self::Approve => CredentialStatus::Approved,
            Self::Reject => CredentialStatus::Rejected,
        }
    }

    fn verb(self) -> &'static str {
        match self {
            Self::Approve => "APPROVE",
            Self::Reject => "REJECT",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransitionOutcome {
    Applied,
    Declined,
    UnknownRecord,
    /// Approved and rejected records are final.
    NotPending,
    Failed,
}

pub struct AdminTable<G> {
    gateway: G,
    records: Vec<CredentialRecord>,
    filter: TableFilter,
    visible: Vec<usize>,
}

impl<G: DoctorGateway> AdminTable<G> {
    pub fn new(gateway: G) -> Self {
        Self {
            gateway,
            records: Vec::new(),
            filter: TableFilter::default(),
            visible: Vec::new(),
        }
    }

    /// Replaces the record set with a fresh read and re-applies the filter.
    pub async fn reload(&mut self) -> Result<()> {
        self.records = self.gateway.fetch_records().await.map_err(|e| {
            error!("Error fetching doctors: {e}");
            e
        })?;
        info!(count = self.records.len(), "Doctors loaded");
        self.refilter();
        Ok(())
    }

    pub fn set_search(&mut self, search: &str) {
        self.filter.search = search.to_string();
        self.refilter();
    }

    pub fn set_status_filter(&mut self, status: StatusFilter) {
        self.filter.status = status;
        self.refilter();
    }

    pub fn set_specialization_filter(&mut self, specialization: Option<String>) {
        self.filter.specialization = specialization;
        self.refilter();
    }

    fn refilter(&mut self) {
        self.visible = self
            .records
            .iter()
            .enumerate()
            .filter(|(_, record)| self.filter.matches(record))
            .map(|(index, _)| index)
            .collect();
    }

    pub fn visible(&self) -> impl Iterator<Item = &CredentialRecord> {
        self.visible.iter().map(|&i| &self.records[i])
    }

    pub fn find(&self, id: Uuid) -> Option<&CredentialRecord> {
        self.records.iter().find(|r| r.id == id)
    }

    pub fn stats(&self, now: DateTime<Local>) -> AdminStats {
        summarize(&self.records, now)
    }

    pub fn details(&self, id: Uuid) -> Option<String> {
        self.find(id).map(|doctor| {
            format!(
                "Doctor Details:\n\nName: {}\nEmail: {}\nLicense: {}\nSpecialization: {}\nStatus: {}",
                doctor.name, doctor.email, doctor.license, doctor.specialization, doctor.status
            )
        })
    }

    pub async fn approve(
        &mut self,
        id: Uuid,
        confirm: &mut impl Confirm,
        notifier: &mut impl Notifier,
    ) -> TransitionOutcome {
        self.transition(id, Transition::Approve, confirm, notifier).await
    }

    pub async fn reject(
        &mut self,
        id: Uuid,
        confirm: &mut impl Confirm,
        notifier: &mut impl Notifier,
    ) -> TransitionOutcome {
        self.transition(id, Transition::Reject, confirm, notifier).await
    }

    async fn transition(
        &mut self,
        id: Uuid,
        transition: Transition,
        confirm: &mut impl Confirm,
        notifier: &mut impl Notifier,
    ) -> TransitionOutcome {
        let Some(doctor) = self.find(id) else {
            return TransitionOutcome::UnknownRecord;
        };
        if doctor.status != CredentialStatus::Pending {
            info!(%id, status = %doctor.status, "Only pending applications can be reviewed");
            return TransitionOutcome::NotPending;
        }
        let name = doctor.name.clone();

        let prompt = format!(
            "Are you sure you want to {} Dr. {name}'s application?",
            transition.verb()
        );
        if !confirm.confirm(&prompt) {
            return TransitionOutcome::Declined;
        }

        let status = transition.status();
        if let Err(e) = self.gateway.update_status(id, status, Utc::now()).await {
            error!(%id, "Status update failed: {e}");
            notifier.failure(&format!("Failed to mark Dr. {name} as {status}: {e}"));
            return TransitionOutcome::Failed;
        }

        notifier.success(&format!("Dr. {name} has been {status}."));
        if let Err(e) = self.reload().await {
            notifier.failure(&format!("Failed to reload doctors list: {e}"));
        }
        TransitionOutcome::Applied
    }
}

/// Pending count over everything; approved and rejected only for records
/// created in the current local calendar month.
pub fn summarize(records: &[CredentialRecord], now: DateTime<Local>) -> AdminStats {
    let in_month = |record: &CredentialRecord| {
        let created = record.created_at.with_timezone(&now.timezone());
        created.year() == now.year() && created.month() == now.month()
    };

    AdminStats {
        pending: records
            .iter()
            .filter(|r| r.status == CredentialStatus::Pending)
            .count(),
        approved_this_month: records
            .iter()
            .filter(|r| r.status == CredentialStatus::Approved && in_month(r))
            .count(),
        rejected_this_month: records
            .iter()
            .filter(|r| r.status == CredentialStatus::Rejected && in_month(r))
            .count(),
    }
}
