use crate::domain::payment::DEFAULT_PAYMENT_DUE_DAYS;
use crate::error::{EnrollmentError, Result};

pub const DEFAULT_MEMBERSHIP_PREFIX: &str = "CS";
pub const DEFAULT_LOG_LEVEL: &str = "info";
/// Longest payment term accepted, ten years.
pub const MAX_PAYMENT_DUE_DAYS: i64 = 3650;

/// Tunables of the approval workflow.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WorkflowConfig {
    /// Prefix of generated membership numbers.
    pub membership_prefix: String,
    /// Days between approval and the enrollment fee due date.
    pub payment_due_days: i64,
}

impl Default for WorkflowConfig {
    fn default() -> Self {
        Self {
            membership_prefix: DEFAULT_MEMBERSHIP_PREFIX.to_string(),
            payment_due_days: DEFAULT_PAYMENT_DUE_DAYS,
        }
    }
}

impl WorkflowConfig {
    pub fn new(membership_prefix: impl Into<String>, payment_due_days: i64) -> Result<Self> {
        let membership_prefix = membership_prefix.into();
        if membership_prefix.trim().is_empty() {
            return Err(EnrollmentError::ValidationError(
                "Membership prefix must not be empty".to_string(),
            ));
        }
        if !(1..=MAX_PAYMENT_DUE_DAYS).contains(&payment_due_days) {
            return Err(EnrollmentError::ValidationError(format!(
                "Payment due days must be between 1 and {MAX_PAYMENT_DUE_DAYS}"
            )));
        }
        Ok(Self {
            membership_prefix,
            payment_due_days,
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TelemetryConfig {
    pub log_level: String,
}

impl Default for TelemetryConfig {
    fn default() -> Self {
        Self {
            log_level: DEFAULT_LOG_LEVEL.to_string(),
        }
    }
}
