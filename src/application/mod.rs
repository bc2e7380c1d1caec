//! Application layer containing the enrollment screens' orchestration logic.
//!
//! `ReviewScreen` wraps the `ApprovalWorkflow` behind a confirmation gate for
//! administrators; `PaymentForm` collects the applicant's fee payment report.

pub mod approval;
pub mod payment_form;
pub mod review;
