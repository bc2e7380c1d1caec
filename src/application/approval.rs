use crate::config::WorkflowConfig;
use crate::domain::application::{
    ApplicationId, ApplicationStatus, ApprovalUpdate, EnrollmentApplication, RejectionUpdate,
};
use crate::domain::entity::{EntityKind, to_fields};
use crate::domain::journal::{ApprovalJournal, ApprovalStep};
use crate::domain::member::{Member, MemberId, NewMember};
use crate::domain::payment::{PaymentId, PendingPayment};
use crate::domain::plan::{Plan, find_plan};
use crate::domain::ports::{ClockBox, EntityStoreBox, MembershipNumberGeneratorBox};
use crate::error::{EnrollmentError, Result};
use chrono::{DateTime, NaiveDate, Utc};
use tracing::{debug, info};

/// Result of a completed approval.
#[derive(Debug, Clone, PartialEq)]
pub struct Approval {
    pub application_id: ApplicationId,
    pub member: Member,
    pub payment_id: PaymentId,
    pub approved_on: NaiveDate,
    /// True when earlier progress was found in the journal and skipped.
    pub resumed: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Rejection {
    pub application_id: ApplicationId,
    pub rejected_on: NaiveDate,
}

/// Commits review decisions to the entity store.
///
/// Approval runs `ApprovalStep::ORDER` one step at a time and persists an
/// `ApprovalJournal` after each one. A failed step aborts the run without undoing
/// earlier steps; calling `approve` again picks up at the first unfinished step.
/// Status transitions are checked against the stored application, not the caller's copy.
pub struct ApprovalWorkflow {
    store: EntityStoreBox,
    numbers: MembershipNumberGeneratorBox,
    clock: ClockBox,
    config: WorkflowConfig,
}

impl ApprovalWorkflow {
    pub fn new(
        store: EntityStoreBox,
        numbers: MembershipNumberGeneratorBox,
        clock: ClockBox,
        config: WorkflowConfig,
    ) -> Self {
        Self {
            store,
            numbers,
            clock,
            config,
        }
    }

    /// Approves a pending application: creates the member, raises the enrollment fee
    /// payment and marks the application approved, in that order.
    pub async fn approve(
        &self,
        application: &EnrollmentApplication,
        plans: &[Plan],
    ) -> Result<Approval> {
        self.stored_status(application)
            .await?
            .transition_to(ApplicationStatus::Approved)?;
        let plan = find_plan(plans, &application.plan_id)
            .ok_or_else(|| EnrollmentError::PlanNotFound(application.plan_id.clone()))?;

        let now = self.clock.now();
        let stored = self.load_journal(&application.id).await?;
        let resumed = stored.as_ref().is_some_and(|j| !j.completed.is_empty());
        let mut journal_saved = stored.is_some();
        let mut journal =
            stored.unwrap_or_else(|| ApprovalJournal::new(application.id.clone(), now));

        if resumed {
            info!(
                application_id = %application.id,
                next_step = ?journal.next_step(),
                "resuming approval"
            );
        }

        let mut member = None;
        for step in ApprovalStep::ORDER {
            if journal.is_done(step) {
                debug!(application_id = %application.id, %step, "step already completed");
                continue;
            }

            self.run_step(step, application, plan, now, &mut journal, &mut member)
                .await
                .map_err(|source| EnrollmentError::StepFailed {
                    step,
                    source: Box::new(source),
                })?;
            self.save_journal(&journal, &mut journal_saved)
                .await
                .map_err(|source| EnrollmentError::StepFailed {
                    step,
                    source: Box::new(source),
                })?;

            info!(application_id = %application.id, %step, "approval step completed");
        }

        let member = match member {
            Some(member) => member,
            None => self.fetch_member(&journal).await?,
        };
        let payment_id = journal.payment_id.clone().ok_or_else(|| {
            EnrollmentError::StoreError("approval journal is missing the payment id".to_string())
        })?;
        let approved_on = journal.approved_on.unwrap_or_else(|| now.date_naive());

        Ok(Approval {
            application_id: application.id.clone(),
            member,
            payment_id,
            approved_on,
            resumed,
        })
    }

    /// Rejects an application. Rejecting twice re-applies the same update.
    pub async fn reject(&self, application: &EnrollmentApplication) -> Result<Rejection> {
        self.stored_status(application)
            .await?
            .transition_to(ApplicationStatus::Rejected)?;
        if let Some(journal) = self.load_journal(&application.id).await?
            && !journal.completed.is_empty()
        {
            return Err(EnrollmentError::ApprovalInProgress(application.id.clone()));
        }

        let rejected_on = self.clock.now().date_naive();
        let update = RejectionUpdate::new(rejected_on);
        self.store
            .update(
                EntityKind::Application,
                application.id.as_str(),
                to_fields(&update)?,
            )
            .await?;

        info!(application_id = %application.id, %rejected_on, "application rejected");
        Ok(Rejection {
            application_id: application.id.clone(),
            rejected_on,
        })
    }

    async fn run_step(
        &self,
        step: ApprovalStep,
        application: &EnrollmentApplication,
        plan: &Plan,
        now: DateTime<Utc>,
        journal: &mut ApprovalJournal,
        member: &mut Option<Member>,
    ) -> Result<()> {
        match step {
            ApprovalStep::CreateMember => {
                let number = self.numbers.next_number();
                let new_member = NewMember::from_application(application, number, now.date_naive());
                let record = self
                    .store
                    .create(EntityKind::Member, to_fields(&new_member)?)
                    .await?;
                let created: Member = record.into_entity()?;
                journal.record_member(created.id.clone(), created.membership_number().clone());
                *member = Some(created);
            }
            ApprovalStep::CreatePendingPayment => {
                let number = journal.member_number.clone().ok_or_else(|| {
                    EnrollmentError::StoreError(
                        "approval journal is missing the membership number".to_string(),
                    )
                })?;
                let payment = PendingPayment::enrollment_fee(
                    number,
                    application,
                    plan,
                    journal.started_at,
                    self.config.payment_due_days,
                )?;
                let record = self
                    .store
                    .create(EntityKind::Payment, to_fields(&payment)?)
                    .await?;
                journal.record_payment(PaymentId(record.id));
            }
            ApprovalStep::MarkApproved => {
                let number = journal.member_number.clone().ok_or_else(|| {
                    EnrollmentError::StoreError(
                        "approval journal is missing the membership number".to_string(),
                    )
                })?;
                let update = ApprovalUpdate::new(number, now.date_naive());
                self.store
                    .update(
                        EntityKind::Application,
                        application.id.as_str(),
                        to_fields(&update)?,
                    )
                    .await?;
                journal.record_approved(update.approved_on);
            }
        }
        Ok(())
    }

    /// Status held by the entity store, which may be newer than the caller's copy.
    async fn stored_status(&self, application: &EnrollmentApplication) -> Result<ApplicationStatus> {
        let Some(record) = self
            .store
            .get(EntityKind::Application, application.id.as_str())
            .await?
        else {
            return Ok(application.status);
        };
        match record.fields.get("status") {
            Some(status) => Ok(serde_json::from_value(status.clone())?),
            None => Ok(ApplicationStatus::default()),
        }
    }

    async fn load_journal(&self, application_id: &ApplicationId) -> Result<Option<ApprovalJournal>> {
        match self
            .store
            .get(EntityKind::ApprovalJournal, application_id.as_str())
            .await?
        {
            Some(record) => Ok(Some(record.into_entity()?)),
            None => Ok(None),
        }
    }

    async fn save_journal(&self, journal: &ApprovalJournal, saved: &mut bool) -> Result<()> {
        let fields = to_fields(journal)?;
        if *saved {
            self.store
                .update(EntityKind::ApprovalJournal, journal.id.as_str(), fields)
                .await?;
        } else {
            self.store.create(EntityKind::ApprovalJournal, fields).await?;
            *saved = true;
        }
        Ok(())
    }

    async fn fetch_member(&self, journal: &ApprovalJournal) -> Result<Member> {
        let MemberId(id) = journal.member_id.clone().ok_or_else(|| {
            EnrollmentError::StoreError("approval journal is missing the member id".to_string())
        })?;
        let record = self
            .store
            .get(EntityKind::Member, &id)
            .await?
            .ok_or(EnrollmentError::NotFound {
                kind: EntityKind::Member,
                id,
            })?;
        record.into_entity()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::member::{EmploymentSector, MaritalStatus};
    use crate::domain::money::Money;
    use crate::domain::plan::PlanId;
    use crate::infrastructure::clock::FixedClock;
    use crate::infrastructure::identity::SequentialMembershipNumbers;
    use crate::infrastructure::in_memory::{InMemoryEntityStore, StoreOp};
    use crate::domain::ports::EntityStore;
    use chrono::TimeZone;
    use rust_decimal_macros::dec;

    fn plans() -> Vec<Plan> {
        vec![Plan {
            id: PlanId::new("basic"),
            name: "Basic".to_string(),
            monthly_fee: Money::new(dec!(10000)).unwrap(),
            enrollment_fee: Money::new(dec!(5000)).unwrap(),
        }]
    }

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 5, 4, 9, 0, 0).unwrap()
    }

    async fn seeded_store(application: &EnrollmentApplication) -> InMemoryEntityStore {
        let store = InMemoryEntityStore::new();
        store
            .seed(EntityKind::Application, to_fields(application).unwrap())
            .await
            .unwrap();
        store
    }

    fn workflow(store: &InMemoryEntityStore) -> ApprovalWorkflow {
        ApprovalWorkflow::new(
            Box::new(store.clone()),
            Box::new(SequentialMembershipNumbers::new("CS", 1)),
            Box::new(FixedClock::new(now())),
            WorkflowConfig::default(),
        )
    }

    fn application() -> EnrollmentApplication {
        EnrollmentApplication::new(
            ApplicationId::new("app-1"),
            "Ana Silva",
            "ana@example.com",
            PlanId::new("basic"),
        )
    }

    #[tokio::test]
    async fn test_approve_creates_member_payment_and_updates_application() {
        let application = application();
        let store = seeded_store(&application).await;

        let approval = workflow(&store).approve(&application, &plans()).await.unwrap();

        assert_eq!(approval.member.membership_number().as_str(), "CS000001");
        assert_eq!(approval.approved_on, now().date_naive());
        assert!(!approval.resumed);

        let stored = store
            .get(EntityKind::Application, "app-1")
            .await
            .unwrap()
            .unwrap();
        let stored: EnrollmentApplication = stored.into_entity().unwrap();
        assert_eq!(stored.status, ApplicationStatus::Approved);
        assert_eq!(stored.approved_on, Some(now().date_naive()));
        assert_eq!(stored.member_number.unwrap().as_str(), "CS000001");

        let payment: PendingPayment = store
            .get(EntityKind::Payment, &approval.payment_id.0)
            .await
            .unwrap()
            .unwrap()
            .into_entity()
            .unwrap();
        assert_eq!(payment.amount.value(), dec!(5000));
        assert_eq!(payment.member_number.as_str(), "CS000001");
    }

    #[tokio::test]
    async fn test_approve_defaults_member_fields() {
        let application = application();
        let store = seeded_store(&application).await;

        let approval = workflow(&store).approve(&application, &plans()).await.unwrap();

        assert_eq!(approval.member.profile.marital_status, MaritalStatus::Single);
        assert_eq!(
            approval.member.profile.employment_sector,
            EmploymentSector::Private
        );
        assert_eq!(approval.member.profile.nationality, "Angolan");
    }

    #[tokio::test]
    async fn test_approve_with_unknown_plan_has_no_side_effects() {
        let mut application = application();
        application.plan_id = PlanId::new("gold");
        let store = seeded_store(&application).await;

        let result = workflow(&store).approve(&application, &plans()).await;

        assert!(matches!(result, Err(EnrollmentError::PlanNotFound(_))));
        assert!(store.records(EntityKind::Member).await.is_empty());
        assert!(store.records(EntityKind::Payment).await.is_empty());
    }

    #[tokio::test]
    async fn test_approve_refuses_decided_application() {
        let mut application = application();
        application.status = ApplicationStatus::Rejected;
        let store = seeded_store(&application).await;

        let result = workflow(&store).approve(&application, &plans()).await;
        assert!(matches!(
            result,
            Err(EnrollmentError::InvalidTransition { .. })
        ));
    }

    #[tokio::test]
    async fn test_failed_payment_step_resumes_without_second_member() {
        let application = application();
        let store = seeded_store(&application).await;
        store.fail_on(EntityKind::Payment, StoreOp::Create).await;
        let workflow = workflow(&store);

        let err = workflow.approve(&application, &plans()).await.unwrap_err();
        assert_eq!(err.failed_step(), Some(ApprovalStep::CreatePendingPayment));
        assert_eq!(store.records(EntityKind::Member).await.len(), 1);

        let approval = workflow.approve(&application, &plans()).await.unwrap();
        assert!(approval.resumed);
        assert_eq!(store.records(EntityKind::Member).await.len(), 1);
        assert_eq!(store.records(EntityKind::Payment).await.len(), 1);
        assert_eq!(approval.member.membership_number().as_str(), "CS000001");
    }

    #[tokio::test]
    async fn test_approve_after_reject_is_refused() {
        let application = application();
        let store = seeded_store(&application).await;
        let workflow = workflow(&store);

        workflow.reject(&application).await.unwrap();
        let result = workflow.approve(&application, &plans()).await;

        assert!(matches!(
            result,
            Err(EnrollmentError::InvalidTransition {
                from: ApplicationStatus::Rejected,
                to: ApplicationStatus::Approved,
            })
        ));
        assert!(store.records(EntityKind::Member).await.is_empty());
        assert!(store.records(EntityKind::Payment).await.is_empty());

        let stored: EnrollmentApplication = store
            .get(EntityKind::Application, "app-1")
            .await
            .unwrap()
            .unwrap()
            .into_entity()
            .unwrap();
        assert_eq!(stored.status, ApplicationStatus::Rejected);
        assert!(stored.approved_on.is_none());
    }

    #[tokio::test]
    async fn test_second_approval_is_refused() {
        let application = application();
        let store = seeded_store(&application).await;
        let workflow = workflow(&store);

        workflow.approve(&application, &plans()).await.unwrap();
        let again = workflow.approve(&application, &plans()).await;
        assert!(matches!(
            again,
            Err(EnrollmentError::InvalidTransition {
                from: ApplicationStatus::Approved,
                ..
            })
        ));

        let rejected = workflow.reject(&application).await;
        assert!(matches!(
            rejected,
            Err(EnrollmentError::InvalidTransition { .. })
        ));
        assert_eq!(store.records(EntityKind::Member).await.len(), 1);
    }

    #[tokio::test]
    async fn test_resumed_payment_due_date_counts_from_first_attempt() {
        let application = application();
        let store = seeded_store(&application).await;
        store.fail_on(EntityKind::Payment, StoreOp::Create).await;
        assert!(workflow(&store).approve(&application, &plans()).await.is_err());

        let later = ApprovalWorkflow::new(
            Box::new(store.clone()),
            Box::new(SequentialMembershipNumbers::new("CS", 1)),
            Box::new(FixedClock::new(now() + chrono::TimeDelta::days(10))),
            WorkflowConfig::default(),
        );
        let approval = later.approve(&application, &plans()).await.unwrap();

        let payment: PendingPayment = store
            .get(EntityKind::Payment, &approval.payment_id.0)
            .await
            .unwrap()
            .unwrap()
            .into_entity()
            .unwrap();
        assert_eq!(
            payment.due_date,
            (now() + chrono::TimeDelta::days(30)).date_naive()
        );
    }

    #[tokio::test]
    async fn test_reject_updates_status_only() {
        let application = application();
        let store = seeded_store(&application).await;

        let rejection = workflow(&store).reject(&application).await.unwrap();
        assert_eq!(rejection.rejected_on, now().date_naive());

        let stored: EnrollmentApplication = store
            .get(EntityKind::Application, "app-1")
            .await
            .unwrap()
            .unwrap()
            .into_entity()
            .unwrap();
        assert_eq!(stored.status, ApplicationStatus::Rejected);
        assert_eq!(stored.rejected_on, Some(now().date_naive()));
        assert!(store.records(EntityKind::Member).await.is_empty());
        assert!(store.records(EntityKind::Payment).await.is_empty());
    }

    #[tokio::test]
    async fn test_reject_refused_while_approval_half_done() {
        let application = application();
        let store = seeded_store(&application).await;
        store.fail_on(EntityKind::Application, StoreOp::Update).await;
        let workflow = workflow(&store);

        assert!(workflow.approve(&application, &plans()).await.is_err());

        let result = workflow.reject(&application).await;
        assert!(matches!(result, Err(EnrollmentError::ApprovalInProgress(_))));
    }
}
