use super::money::Money;
use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PlanId(pub String);

impl PlanId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for PlanId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// A subscription tier: monthly dues plus a one-time enrollment fee.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Plan {
    pub id: PlanId,
    pub name: String,
    pub monthly_fee: Money,
    pub enrollment_fee: Money,
}

/// Looks a plan up in the catalog by id.
pub fn find_plan<'a>(plans: &'a [Plan], id: &PlanId) -> Option<&'a Plan> {
    plans.iter().find(|plan| &plan.id == id)
}
