use super::application::ApplicationId;
use super::member::{MemberId, MembershipNumber};
use super::payment::PaymentId;
use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// One side-effecting step of the approval sequence, in execution order.
#[derive(Debug, Serialize, Deserialize, PartialEq, Eq, Clone, Copy, PartialOrd, Ord, Hash)]
#[serde(rename_all = "snake_case")]
pub enum ApprovalStep {
    CreateMember,
    CreatePendingPayment,
    MarkApproved,
}

impl ApprovalStep {
    pub const ORDER: [ApprovalStep; 3] = [
        ApprovalStep::CreateMember,
        ApprovalStep::CreatePendingPayment,
        ApprovalStep::MarkApproved,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            ApprovalStep::CreateMember => "create_member",
            ApprovalStep::CreatePendingPayment => "create_pending_payment",
            ApprovalStep::MarkApproved => "mark_approved",
        }
    }
}

impl fmt::Display for ApprovalStep {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Persisted cursor of an approval in progress, keyed by the application id.
///
/// Each completed step is appended together with the identifiers it produced, so a
/// retried approval skips work that already reached the entity store.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ApprovalJournal {
    pub id: ApplicationId,
    pub completed: Vec<ApprovalStep>,
    pub member_id: Option<MemberId>,
    pub member_number: Option<MembershipNumber>,
    pub payment_id: Option<PaymentId>,
    pub approved_on: Option<NaiveDate>,
    /// First attempt; the enrollment fee is due counting from here.
    pub started_at: DateTime<Utc>,
}

impl ApprovalJournal {
    pub fn new(application_id: ApplicationId, started_at: DateTime<Utc>) -> Self {
        Self {
            id: application_id,
            completed: Vec::new(),
            member_id: None,
            member_number: None,
            payment_id: None,
            approved_on: None,
            started_at,
        }
    }

    pub fn is_done(&self, step: ApprovalStep) -> bool {
        self.completed.contains(&step)
    }

    /// The first step that has not completed yet.
    pub fn next_step(&self) -> Option<ApprovalStep> {
        ApprovalStep::ORDER
            .into_iter()
            .find(|step| !self.is_done(*step))
    }

    pub fn is_complete(&self) -> bool {
        self.next_step().is_none()
    }

    pub fn record_member(&mut self, id: MemberId, number: MembershipNumber) {
        self.member_id = Some(id);
        self.member_number = Some(number);
        self.mark(ApprovalStep::CreateMember);
    }

    pub fn record_payment(&mut self, id: PaymentId) {
        self.payment_id = Some(id);
        self.mark(ApprovalStep::CreatePendingPayment);
    }

    pub fn record_approved(&mut self, approved_on: NaiveDate) {
        self.approved_on = Some(approved_on);
        self.mark(ApprovalStep::MarkApproved);
    }

    fn mark(&mut self, step: ApprovalStep) {
        if !self.is_done(step) {
            self.completed.push(step);
        }
    }
}
