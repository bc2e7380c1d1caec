#![allow(dead_code)]

use chrono::{DateTime, TimeZone, Utc};
use coop_enrollment::application::approval::ApprovalWorkflow;
use coop_enrollment::config::WorkflowConfig;
use coop_enrollment::domain::application::{ApplicationId, EnrollmentApplication};
use coop_enrollment::domain::entity::{EntityKind, to_fields};
use coop_enrollment::domain::money::Money;
use coop_enrollment::domain::plan::{Plan, PlanId};
use coop_enrollment::infrastructure::clock::FixedClock;
use coop_enrollment::infrastructure::identity::SequentialMembershipNumbers;
use coop_enrollment::infrastructure::in_memory::InMemoryEntityStore;
use rust_decimal_macros::dec;
use std::io::{Error, Write};
use std::path::Path;

pub fn review_time() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 3, 1, 9, 30, 0).unwrap()
}

pub fn plans() -> Vec<Plan> {
    vec![
        Plan {
            id: PlanId::new("basic"),
            name: "Basic".to_string(),
            monthly_fee: Money::new(dec!(10000)).unwrap(),
            enrollment_fee: Money::new(dec!(5000)).unwrap(),
        },
        Plan {
            id: PlanId::new("premium"),
            name: "Premium".to_string(),
            monthly_fee: Money::new(dec!(25000)).unwrap(),
            enrollment_fee: Money::new(dec!(15000)).unwrap(),
        },
    ]
}

pub fn application(id: &str, plan: &str) -> EnrollmentApplication {
    EnrollmentApplication::new(ApplicationId::new(id), "Ana Silva", "ana@example.com", PlanId::new(plan))
}

pub async fn seeded_store(applications: &[&EnrollmentApplication]) -> InMemoryEntityStore {
    let store = InMemoryEntityStore::new();
    for application in applications {
        store
            .seed(EntityKind::Application, to_fields(application).unwrap())
            .await
            .unwrap();
    }
    store
}

pub fn workflow(store: &InMemoryEntityStore) -> ApprovalWorkflow {
    ApprovalWorkflow::new(
        Box::new(store.clone()),
        Box::new(SequentialMembershipNumbers::new("CS", 1)),
        Box::new(FixedClock::new(review_time())),
        WorkflowConfig::default(),
    )
}

pub fn write_plans_csv(path: &Path) -> Result<(), Error> {
    let mut file = std::fs::File::create(path)?;
    writeln!(file, "id, name, monthly_fee, enrollment_fee")?;
    writeln!(file, "basic, Basic, 10000, 5000")?;
    writeln!(file, "premium, Premium, 25000, 15000")?;
    Ok(())
}

pub fn write_applications_csv(path: &Path) -> Result<(), Error> {
    let mut file = std::fs::File::create(path)?;
    writeln!(
        file,
        "id, full_name, email, plan_id, status, marital_status, nationality"
    )?;
    writeln!(file, "app-1, Ana Silva, ana@example.com, basic, pending, married, ")?;
    writeln!(file, "app-2, Joao Manuel, joao@example.com, premium, pending, , Portuguese")?;
    writeln!(file, "app-3, Rosa Neto, rosa@example.com, gold, pending, , ")?;
    writeln!(file, "app-4, Paulo Costa, paulo@example.com, basic, approved, , ")?;
    Ok(())
}
