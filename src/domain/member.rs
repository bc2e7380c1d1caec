use super::application::EnrollmentApplication;
use super::plan::PlanId;
use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Nationality recorded for members whose application leaves it blank.
pub const DEFAULT_NATIONALITY: &str = "Angolan";

#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct MembershipNumber(pub String);

impl MembershipNumber {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for MembershipNumber {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Key of a member record in the entity store.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct MemberId(pub String);

impl fmt::Display for MemberId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Debug, Serialize, Deserialize, PartialEq, Eq, Clone, Copy, Default)]
#[serde(rename_all = "snake_case")]
pub enum MaritalStatus {
    #[default]
    Single,
    Married,
    Divorced,
    Widowed,
}

#[derive(Debug, Serialize, Deserialize, PartialEq, Eq, Clone, Copy, Default)]
#[serde(rename_all = "snake_case")]
pub enum EmploymentSector {
    Public,
    #[default]
    Private,
    SelfEmployed,
    Informal,
}

#[derive(Debug, Serialize, Deserialize, PartialEq, Eq, Clone, Copy, Default)]
#[serde(rename_all = "lowercase")]
pub enum MemberStatus {
    #[default]
    Active,
    Suspended,
    Inactive,
}

/// The fields sent to the entity store when an application is approved.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewMember {
    pub membership_number: MembershipNumber,
    pub full_name: String,
    pub email: String,
    pub phone: Option<String>,
    pub national_id: Option<String>,
    pub birth_date: Option<NaiveDate>,
    pub profession: Option<String>,
    pub monthly_income: Option<Decimal>,
    pub province: Option<String>,
    pub municipality: Option<String>,
    pub full_address: Option<String>,
    pub plan_id: PlanId,
    pub status: MemberStatus,
    pub enrolled_on: NaiveDate,
    pub marital_status: MaritalStatus,
    pub employment_sector: EmploymentSector,
    pub nationality: String,
}

impl NewMember {
    /// Copies the applicant's personal data, filling the categorical fields the member
    /// record requires when the application left them unset.
    pub fn from_application(
        application: &EnrollmentApplication,
        membership_number: MembershipNumber,
        enrolled_on: NaiveDate,
    ) -> Self {
        Self {
            membership_number,
            full_name: application.full_name.clone(),
            email: application.email.clone(),
            phone: application.phone.clone(),
            national_id: application.national_id.clone(),
            birth_date: application.birth_date,
            profession: application.profession.clone(),
            monthly_income: application.monthly_income,
            province: application.province.clone(),
            municipality: application.municipality.clone(),
            full_address: application.full_address.clone(),
            plan_id: application.plan_id.clone(),
            status: MemberStatus::Active,
            enrolled_on,
            marital_status: application.marital_status.unwrap_or_default(),
            employment_sector: application.employment_sector.unwrap_or_default(),
            nationality: application
                .nationality
                .as_deref()
                .map(str::trim)
                .filter(|value| !value.is_empty())
                .unwrap_or(DEFAULT_NATIONALITY)
                .to_string(),
        }
    }
}

/// A member record as returned by the entity store.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Member {
    pub id: MemberId,
    #[serde(flatten)]
    pub profile: NewMember,
}

impl Member {
    pub fn membership_number(&self) -> &MembershipNumber {
        &self.profile.membership_number
    }
}
