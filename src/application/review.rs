use super::approval::{Approval, ApprovalWorkflow, Rejection};
use crate::domain::application::{ApplicationId, EnrollmentApplication};
use crate::domain::member::Member;
use crate::domain::money::Money;
use crate::domain::plan::{Plan, find_plan};
use crate::domain::ports::NotifierBox;
use crate::error::{EnrollmentError, Result};
use tracing::{error, info};

pub const GENERIC_FAILURE_MESSAGE: &str = "Error processing action. Please try again.";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReviewAction {
    Approve,
    Reject,
}

/// Where the review screen is in its confirm-then-commit flow.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ReviewState {
    #[default]
    Idle,
    Confirming(ReviewAction),
    Processing(ReviewAction),
}

/// Completion callbacks supplied by the screen that hosts the review.
pub trait ReviewListener: Send + Sync {
    fn on_approved(&self, _application_id: &ApplicationId, _member: &Member) {}
    fn on_rejected(&self, _application_id: &ApplicationId) {}
}

#[derive(Debug)]
pub enum ReviewOutcome {
    Approved(Approval),
    Rejected(Rejection),
    /// The user saw the generic failure notification; the error is kept for the caller.
    Failed(EnrollmentError),
}

/// What the review card shows above the action buttons.
#[derive(Debug, Clone, PartialEq)]
pub struct ReviewSummary {
    pub candidate_name: String,
    pub candidate_email: String,
    pub plan_name: Option<String>,
    pub monthly_fee: Option<Money>,
    pub enrollment_fee: Option<Money>,
}

/// Contents of the confirmation dialog.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConfirmationPrompt {
    pub action: ReviewAction,
    pub title: String,
    pub message: String,
    pub confirm_label: String,
}

/// Administrator screen deciding one pending application.
///
/// Both actions go through `ReviewState`: a request opens the confirmation, `confirm`
/// commits it and `cancel` backs out. The application passed in is never modified; the
/// entity store holds the authoritative status.
pub struct ReviewScreen {
    application: EnrollmentApplication,
    plans: Vec<Plan>,
    workflow: ApprovalWorkflow,
    notifier: NotifierBox,
    listener: Option<Box<dyn ReviewListener>>,
    state: ReviewState,
}

impl ReviewScreen {
    pub fn new(
        application: EnrollmentApplication,
        plans: Vec<Plan>,
        workflow: ApprovalWorkflow,
        notifier: NotifierBox,
    ) -> Self {
        Self {
            application,
            plans,
            workflow,
            notifier,
            listener: None,
            state: ReviewState::Idle,
        }
    }

    pub fn with_listener(mut self, listener: Box<dyn ReviewListener>) -> Self {
        self.listener = Some(listener);
        self
    }

    pub fn state(&self) -> ReviewState {
        self.state
    }

    pub fn application(&self) -> &EnrollmentApplication {
        &self.application
    }

    pub fn is_processing(&self) -> bool {
        matches!(self.state, ReviewState::Processing(_))
    }

    pub fn summary(&self) -> ReviewSummary {
        let plan = find_plan(&self.plans, &self.application.plan_id);
        ReviewSummary {
            candidate_name: self.application.full_name.clone(),
            candidate_email: self.application.email.clone(),
            plan_name: plan.map(|p| p.name.clone()),
            monthly_fee: plan.map(|p| p.monthly_fee),
            enrollment_fee: plan.map(|p| p.enrollment_fee),
        }
    }

    /// The open confirmation dialog, if any. Stays visible while processing.
    pub fn confirmation(&self) -> Option<ConfirmationPrompt> {
        let (action, processing) = match self.state {
            ReviewState::Idle => return None,
            ReviewState::Confirming(action) => (action, false),
            ReviewState::Processing(action) => (action, true),
        };
        let name = &self.application.full_name;
        let (title, message, label) = match action {
            ReviewAction::Approve => (
                "Confirm approval",
                format!(
                    "Are you sure you want to approve the application from {name}? \
                     This will create a new member and generate a pending payment."
                ),
                "Approve",
            ),
            ReviewAction::Reject => (
                "Confirm rejection",
                format!("Are you sure you want to reject the application from {name}?"),
                "Reject",
            ),
        };
        Some(ConfirmationPrompt {
            action,
            title: title.to_string(),
            message,
            confirm_label: (if processing { "Processing..." } else { label }).to_string(),
        })
    }

    pub fn request_approve(&mut self) -> Result<()> {
        self.request(ReviewAction::Approve)
    }

    pub fn request_reject(&mut self) -> Result<()> {
        self.request(ReviewAction::Reject)
    }

    fn request(&mut self, action: ReviewAction) -> Result<()> {
        if let ReviewState::Processing(current) = self.state {
            return Err(EnrollmentError::ReviewUnavailable(format!(
                "{current:?} is still being processed"
            )));
        }
        self.state = ReviewState::Confirming(action);
        Ok(())
    }

    /// Closes the confirmation without side effects.
    pub fn cancel(&mut self) -> Result<()> {
        match self.state {
            ReviewState::Processing(current) => Err(EnrollmentError::ReviewUnavailable(format!(
                "{current:?} is still being processed"
            ))),
            _ => {
                self.state = ReviewState::Idle;
                Ok(())
            }
        }
    }

    /// Commits the pending action and returns to idle whatever the outcome.
    ///
    /// Workflow failures are logged, reported through the notifier and returned as
    /// `ReviewOutcome::Failed`; only calling this with nothing to confirm is an `Err`.
    pub async fn confirm(&mut self) -> Result<ReviewOutcome> {
        let action = match self.state {
            ReviewState::Confirming(action) => action,
            ReviewState::Idle => {
                return Err(EnrollmentError::ReviewUnavailable(
                    "no action awaiting confirmation".to_string(),
                ));
            }
            ReviewState::Processing(current) => {
                return Err(EnrollmentError::ReviewUnavailable(format!(
                    "{current:?} is still being processed"
                )));
            }
        };

        self.state = ReviewState::Processing(action);
        let result = match action {
            ReviewAction::Approve => self
                .workflow
                .approve(&self.application, &self.plans)
                .await
                .map(ReviewOutcome::Approved),
            ReviewAction::Reject => self
                .workflow
                .reject(&self.application)
                .await
                .map(ReviewOutcome::Rejected),
        };
        self.state = ReviewState::Idle;

        let outcome = match result {
            Ok(outcome) => outcome,
            Err(err) => {
                error!(
                    application_id = %self.application.id,
                    ?action,
                    step = ?err.failed_step(),
                    error = %err,
                    "error processing review action"
                );
                self.notifier.error(GENERIC_FAILURE_MESSAGE);
                return Ok(ReviewOutcome::Failed(err));
            }
        };

        match &outcome {
            ReviewOutcome::Approved(approval) => {
                info!(
                    application_id = %approval.application_id,
                    member_number = %approval.member.membership_number(),
                    "application approved"
                );
                self.notifier.success(&format!(
                    "Application approved! Member created with number {}",
                    approval.member.membership_number()
                ));
                if let Some(listener) = &self.listener {
                    listener.on_approved(&approval.application_id, &approval.member);
                }
            }
            ReviewOutcome::Rejected(rejection) => {
                self.notifier.success("Application rejected successfully!");
                if let Some(listener) = &self.listener {
                    listener.on_rejected(&rejection.application_id);
                }
            }
            ReviewOutcome::Failed(_) => {}
        }
        Ok(outcome)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::WorkflowConfig;
    use crate::domain::entity::{EntityKind, to_fields};
    use crate::domain::plan::PlanId;
    use crate::infrastructure::clock::FixedClock;
    use crate::infrastructure::identity::SequentialMembershipNumbers;
    use crate::infrastructure::in_memory::{
        InMemoryEntityStore, NotificationLevel, RecordingNotifier, StoreOp,
    };
    use chrono::Utc;
    use rust_decimal_macros::dec;
    use std::sync::{Arc, Mutex};

    #[derive(Default, Clone)]
    struct Calls(Arc<Mutex<Vec<String>>>);

    impl ReviewListener for Calls {
        fn on_approved(&self, application_id: &ApplicationId, member: &Member) {
            self.0.lock().unwrap().push(format!(
                "approved:{application_id}:{}",
                member.membership_number()
            ));
        }

        fn on_rejected(&self, application_id: &ApplicationId) {
            self.0.lock().unwrap().push(format!("rejected:{application_id}"));
        }
    }

    async fn screen() -> (ReviewScreen, InMemoryEntityStore, RecordingNotifier, Calls) {
        let application = EnrollmentApplication::new(
            ApplicationId::new("app-9"),
            "Maria Costa",
            "maria@example.com",
            PlanId::new("basic"),
        );
        let plans = vec![Plan {
            id: PlanId::new("basic"),
            name: "Basic".to_string(),
            monthly_fee: Money::new(dec!(10000)).unwrap(),
            enrollment_fee: Money::new(dec!(5000)).unwrap(),
        }];
        let store = InMemoryEntityStore::new();
        store
            .seed(EntityKind::Application, to_fields(&application).unwrap())
            .await
            .unwrap();
        let workflow = ApprovalWorkflow::new(
            Box::new(store.clone()),
            Box::new(SequentialMembershipNumbers::new("CS", 7)),
            Box::new(FixedClock::new(Utc::now())),
            WorkflowConfig::default(),
        );
        let notifier = RecordingNotifier::new();
        let calls = Calls::default();
        let screen = ReviewScreen::new(application, plans, workflow, Box::new(notifier.clone()))
            .with_listener(Box::new(calls.clone()));
        (screen, store, notifier, calls)
    }

    #[tokio::test]
    async fn test_cancel_has_no_side_effects() {
        let (mut screen, store, notifier, calls) = screen().await;

        screen.request_approve().unwrap();
        assert_eq!(screen.state(), ReviewState::Confirming(ReviewAction::Approve));
        screen.cancel().unwrap();

        assert_eq!(screen.state(), ReviewState::Idle);
        assert!(store.operations().await.is_empty());
        assert!(notifier.notifications().is_empty());
        assert!(calls.0.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_confirm_approve_notifies_and_calls_back() {
        let (mut screen, _store, notifier, calls) = screen().await;

        screen.request_approve().unwrap();
        let outcome = screen.confirm().await.unwrap();

        assert!(matches!(outcome, ReviewOutcome::Approved(_)));
        assert_eq!(screen.state(), ReviewState::Idle);
        assert_eq!(
            notifier.notifications()[0].message,
            "Application approved! Member created with number CS000007"
        );
        assert_eq!(
            calls.0.lock().unwrap().as_slice(),
            ["approved:app-9:CS000007".to_string()]
        );
    }

    #[tokio::test]
    async fn test_confirm_reject_calls_back() {
        let (mut screen, _store, notifier, calls) = screen().await;

        screen.request_reject().unwrap();
        let outcome = screen.confirm().await.unwrap();

        assert!(matches!(outcome, ReviewOutcome::Rejected(_)));
        assert_eq!(notifier.notifications()[0].level, NotificationLevel::Success);
        assert_eq!(
            calls.0.lock().unwrap().as_slice(),
            ["rejected:app-9".to_string()]
        );
    }

    #[tokio::test]
    async fn test_approve_after_reject_fails() {
        let (mut screen, store, notifier, calls) = screen().await;

        screen.request_reject().unwrap();
        assert!(matches!(
            screen.confirm().await.unwrap(),
            ReviewOutcome::Rejected(_)
        ));

        screen.request_approve().unwrap();
        let outcome = screen.confirm().await.unwrap();

        assert!(matches!(
            outcome,
            ReviewOutcome::Failed(EnrollmentError::InvalidTransition { .. })
        ));
        assert!(store.records(EntityKind::Member).await.is_empty());
        assert!(store.records(EntityKind::Payment).await.is_empty());
        let stored = store.records(EntityKind::Application).await.remove(0);
        assert_eq!(stored.fields["status"], "rejected");
        assert!(stored.fields.get("approved_on").is_none_or(|v| v.is_null()));
        assert_eq!(
            calls.0.lock().unwrap().as_slice(),
            ["rejected:app-9".to_string()]
        );
        assert_eq!(notifier.notifications()[1].message, GENERIC_FAILURE_MESSAGE);
    }

    #[tokio::test]
    async fn test_second_approve_fails_without_repeating_callbacks() {
        let (mut screen, store, notifier, calls) = screen().await;

        screen.request_approve().unwrap();
        assert!(matches!(
            screen.confirm().await.unwrap(),
            ReviewOutcome::Approved(_)
        ));
        screen.request_approve().unwrap();
        let outcome = screen.confirm().await.unwrap();

        assert!(matches!(
            outcome,
            ReviewOutcome::Failed(EnrollmentError::InvalidTransition { .. })
        ));
        assert_eq!(store.records(EntityKind::Member).await.len(), 1);
        assert_eq!(calls.0.lock().unwrap().len(), 1);
        let successes = notifier
            .notifications()
            .into_iter()
            .filter(|n| n.level == NotificationLevel::Success)
            .count();
        assert_eq!(successes, 1);
    }

    #[tokio::test]
    async fn test_failure_surfaces_generic_message_and_returns_to_idle() {
        let (mut screen, store, notifier, calls) = screen().await;
        store.fail_on(EntityKind::Member, StoreOp::Create).await;

        screen.request_approve().unwrap();
        let outcome = screen.confirm().await.unwrap();

        match outcome {
            ReviewOutcome::Failed(err) => {
                assert_eq!(
                    err.failed_step(),
                    Some(crate::domain::journal::ApprovalStep::CreateMember)
                )
            }
            other => panic!("expected failure, got {other:?}"),
        }
        assert_eq!(screen.state(), ReviewState::Idle);
        let notifications = notifier.notifications();
        assert_eq!(notifications.len(), 1);
        assert_eq!(notifications[0].level, NotificationLevel::Error);
        assert_eq!(notifications[0].message, GENERIC_FAILURE_MESSAGE);
        assert!(calls.0.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_triggers_refused_while_processing() {
        let (mut screen, _store, _notifier, _calls) = screen().await;
        screen.state = ReviewState::Processing(ReviewAction::Approve);

        assert!(screen.request_reject().is_err());
        assert!(screen.cancel().is_err());
        assert!(screen.confirm().await.is_err());
        assert_eq!(
            screen.confirmation().unwrap().confirm_label,
            "Processing..."
        );
    }

    #[tokio::test]
    async fn test_confirm_without_request_is_refused() {
        let (mut screen, store, _notifier, _calls) = screen().await;
        assert!(matches!(
            screen.confirm().await,
            Err(EnrollmentError::ReviewUnavailable(_))
        ));
        assert!(store.operations().await.is_empty());
    }

    #[tokio::test]
    async fn test_summary_and_prompt() {
        let (mut screen, _store, _notifier, _calls) = screen().await;

        let summary = screen.summary();
        assert_eq!(summary.plan_name.as_deref(), Some("Basic"));
        assert_eq!(summary.enrollment_fee.unwrap().value(), dec!(5000));

        assert!(screen.confirmation().is_none());
        screen.request_reject().unwrap();
        let prompt = screen.confirmation().unwrap();
        assert_eq!(prompt.title, "Confirm rejection");
        assert!(prompt.message.contains("Maria Costa"));
        assert_eq!(prompt.confirm_label, "Reject");
    }
}
