use super::application::{ApplicationId, EnrollmentApplication};
use super::member::MembershipNumber;
use super::money::Money;
use super::plan::Plan;
use crate::error::EnrollmentError;
use chrono::{DateTime, NaiveDate, TimeDelta, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Days an applicant has to settle the enrollment fee after approval.
pub const DEFAULT_PAYMENT_DUE_DAYS: i64 = 30;

/// Key of a payment record in the entity store.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PaymentId(pub String);

impl fmt::Display for PaymentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Debug, Serialize, Deserialize, PartialEq, Eq, Clone, Copy)]
#[serde(rename_all = "snake_case")]
pub enum PaymentMethod {
    BankTransfer,
    BankDeposit,
    Multicaixa,
    Cash,
}

impl PaymentMethod {
    pub const ALL: [PaymentMethod; 4] = [
        PaymentMethod::BankTransfer,
        PaymentMethod::BankDeposit,
        PaymentMethod::Multicaixa,
        PaymentMethod::Cash,
    ];

    pub fn code(&self) -> &'static str {
        match self {
            PaymentMethod::BankTransfer => "bank_transfer",
            PaymentMethod::BankDeposit => "bank_deposit",
            PaymentMethod::Multicaixa => "multicaixa",
            PaymentMethod::Cash => "cash",
        }
    }

    /// Human readable label shown in the method picker.
    pub fn label(&self) -> &'static str {
        match self {
            PaymentMethod::BankTransfer => "Bank transfer",
            PaymentMethod::BankDeposit => "Bank deposit",
            PaymentMethod::Multicaixa => "Multicaixa",
            PaymentMethod::Cash => "Cash (in person)",
        }
    }
}

impl FromStr for PaymentMethod {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        PaymentMethod::ALL
            .into_iter()
            .find(|method| method.code() == s)
            .ok_or_else(|| format!("unknown payment method '{s}'"))
    }
}

impl fmt::Display for PaymentMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

#[derive(Debug, Serialize, Deserialize, PartialEq, Eq, Clone, Copy, Default)]
#[serde(rename_all = "lowercase")]
pub enum PaymentStatus {
    #[default]
    Pending,
}

#[derive(Debug, Serialize, Deserialize, PartialEq, Eq, Clone, Copy)]
#[serde(rename_all = "snake_case")]
pub enum PaymentKind {
    EnrollmentFee,
}

/// The payable obligation raised for a freshly approved member.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PendingPayment {
    pub member_number: MembershipNumber,
    pub application_id: ApplicationId,
    pub amount: Money,
    pub kind: PaymentKind,
    pub due_date: NaiveDate,
    pub status: PaymentStatus,
    pub description: String,
    pub notes: String,
}

impl PendingPayment {
    /// Builds the enrollment fee obligation, due `due_days` after `now`.
    pub fn enrollment_fee(
        member_number: MembershipNumber,
        application: &EnrollmentApplication,
        plan: &Plan,
        now: DateTime<Utc>,
        due_days: i64,
    ) -> Result<Self, EnrollmentError> {
        let due_date = TimeDelta::try_days(due_days)
            .and_then(|delta| now.checked_add_signed(delta))
            .ok_or_else(|| {
                EnrollmentError::ValidationError(format!(
                    "Payment due date out of range: {due_days} days after {now}"
                ))
            })?
            .date_naive();

        Ok(Self {
            member_number,
            application_id: application.id.clone(),
            amount: plan.enrollment_fee,
            kind: PaymentKind::EnrollmentFee,
            due_date,
            status: PaymentStatus::Pending,
            description: format!("Enrollment fee - {}", application.full_name),
            notes: format!("Pending payment for application {}", application.id),
        })
    }
}

/// What the applicant reports having paid, produced by the payment form.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PaymentSubmission {
    pub method: PaymentMethod,
    pub reference: String,
    pub proof_url: Option<String>,
    pub notes: Option<String>,
    pub amount: Money,
    pub payment_date: NaiveDate,
}
