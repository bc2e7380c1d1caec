use crate::domain::member::MembershipNumber;
use crate::domain::ports::MembershipNumberGenerator;
use std::sync::atomic::{AtomicU64, Ordering};
use uuid::Uuid;

/// Issues `PREFIX000001`, `PREFIX000002`, ... from an in-process counter.
///
/// Numbers are unique for the lifetime of the generator only; seed `start` from the
/// highest number already issued when the process restarts.
#[derive(Debug)]
pub struct SequentialMembershipNumbers {
    prefix: String,
    next: AtomicU64,
}

impl SequentialMembershipNumbers {
    pub fn new(prefix: impl Into<String>, start: u64) -> Self {
        Self {
            prefix: prefix.into(),
            next: AtomicU64::new(start),
        }
    }
}

impl MembershipNumberGenerator for SequentialMembershipNumbers {
    fn next_number(&self) -> MembershipNumber {
        let n = self.next.fetch_add(1, Ordering::Relaxed);
        MembershipNumber(format!("{}{n:06}", self.prefix))
    }
}

/// Issues `PREFIX-<uuid>` numbers, unique without any shared counter.
#[derive(Debug, Clone)]
pub struct UuidMembershipNumbers {
    prefix: String,
}

impl UuidMembershipNumbers {
    pub fn new(prefix: impl Into<String>) -> Self {
        Self {
            prefix: prefix.into(),
        }
    }
}

impl MembershipNumberGenerator for UuidMembershipNumbers {
    fn next_number(&self) -> MembershipNumber {
        let id = Uuid::new_v4().simple().to_string().to_uppercase();
        MembershipNumber(format!("{}-{id}", self.prefix))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn test_sequential_numbers() {
        let numbers = SequentialMembershipNumbers::new("CS", 41);
        assert_eq!(numbers.next_number().as_str(), "CS000041");
        assert_eq!(numbers.next_number().as_str(), "CS000042");
    }

    #[test]
    fn test_uuid_numbers_are_distinct() {
        let numbers = UuidMembershipNumbers::new("CS");
        let issued: HashSet<_> = (0..100).map(|_| numbers.next_number()).collect();
        assert_eq!(issued.len(), 100);
        assert!(issued.iter().all(|n| n.as_str().starts_with("CS-")));
    }
}
