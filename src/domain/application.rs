use super::member::{EmploymentSector, MaritalStatus, MembershipNumber};
use super::plan::PlanId;
use crate::error::EnrollmentError;
use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ApplicationId(pub String);

impl ApplicationId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ApplicationId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Debug, Serialize, Deserialize, PartialEq, Eq, Clone, Copy, Default)]
#[serde(rename_all = "lowercase")]
pub enum ApplicationStatus {
    #[default]
    Pending,
    Approved,
    Rejected,
}

impl ApplicationStatus {
    pub fn label(&self) -> &'static str {
        match self {
            ApplicationStatus::Pending => "pending",
            ApplicationStatus::Approved => "approved",
            ApplicationStatus::Rejected => "rejected",
        }
    }

    /// Checks that the review workflow may move an application from `self` to `next`.
    ///
    /// Only pending applications can be decided. Rejecting an already rejected
    /// application is accepted and simply re-applies the update.
    pub fn transition_to(self, next: ApplicationStatus) -> Result<ApplicationStatus, EnrollmentError> {
        use ApplicationStatus::*;
        match (self, next) {
            (Pending, Approved) | (Pending, Rejected) | (Rejected, Rejected) => Ok(next),
            (from, to) => Err(EnrollmentError::InvalidTransition { from, to }),
        }
    }
}

impl fmt::Display for ApplicationStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// A public request to join the cooperative under a chosen plan.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EnrollmentApplication {
    pub id: ApplicationId,
    pub full_name: String,
    pub email: String,
    #[serde(default)]
    pub phone: Option<String>,
    #[serde(default)]
    pub national_id: Option<String>,
    #[serde(default)]
    pub birth_date: Option<NaiveDate>,
    #[serde(default)]
    pub profession: Option<String>,
    #[serde(default)]
    pub monthly_income: Option<Decimal>,
    #[serde(default)]
    pub province: Option<String>,
    #[serde(default)]
    pub municipality: Option<String>,
    #[serde(default)]
    pub full_address: Option<String>,
    pub plan_id: PlanId,
    #[serde(default)]
    pub status: ApplicationStatus,
    #[serde(default)]
    pub marital_status: Option<MaritalStatus>,
    #[serde(default)]
    pub employment_sector: Option<EmploymentSector>,
    #[serde(default)]
    pub nationality: Option<String>,
    #[serde(default)]
    pub approved_on: Option<NaiveDate>,
    #[serde(default)]
    pub rejected_on: Option<NaiveDate>,
    #[serde(default)]
    pub member_number: Option<MembershipNumber>,
}

impl EnrollmentApplication {
    /// Creates a pending application with only the mandatory fields set.
    pub fn new(
        id: ApplicationId,
        full_name: impl Into<String>,
        email: impl Into<String>,
        plan_id: PlanId,
    ) -> Self {
        Self {
            id,
            full_name: full_name.into(),
            email: email.into(),
            phone: None,
            national_id: None,
            birth_date: None,
            profession: None,
            monthly_income: None,
            province: None,
            municipality: None,
            full_address: None,
            plan_id,
            status: ApplicationStatus::Pending,
            marital_status: None,
            employment_sector: None,
            nationality: None,
            approved_on: None,
            rejected_on: None,
            member_number: None,
        }
    }
}

/// Fields written to the application record once it is approved.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ApprovalUpdate {
    pub status: ApplicationStatus,
    pub member_number: MembershipNumber,
    pub approved_on: NaiveDate,
}

impl ApprovalUpdate {
    pub fn new(member_number: MembershipNumber, approved_on: NaiveDate) -> Self {
        Self {
            status: ApplicationStatus::Approved,
            member_number,
            approved_on,
        }
    }
}

/// Fields written to the application record when it is rejected.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RejectionUpdate {
    pub status: ApplicationStatus,
    pub rejected_on: NaiveDate,
}

impl RejectionUpdate {
    pub fn new(rejected_on: NaiveDate) -> Self {
        Self {
            status: ApplicationStatus::Rejected,
            rejected_on,
        }
    }
}
