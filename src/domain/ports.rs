use super::entity::{EntityKind, EntityRecord, Fields};
use super::member::MembershipNumber;
use crate::error::Result;
use async_trait::async_trait;
use chrono::{DateTime, Utc};

/// Remote create/update record API.
///
/// Each call is assumed atomic and durable once it returns `Ok`; nothing is assumed
/// about transactions spanning several calls.
#[async_trait]
pub trait EntityStore: Send + Sync {
    /// Creates a record. A non-empty `id` string inside `fields` is used as the key,
    /// otherwise the store assigns one.
    async fn create(&self, kind: EntityKind, fields: Fields) -> Result<EntityRecord>;
    /// Merges `fields` into an existing record and returns the updated record.
    async fn update(&self, kind: EntityKind, id: &str, fields: Fields) -> Result<EntityRecord>;
    async fn get(&self, kind: EntityKind, id: &str) -> Result<Option<EntityRecord>>;
}

/// A file picked by the applicant as proof of payment.
#[derive(Debug, Clone, PartialEq)]
pub struct ProofFile {
    pub name: String,
    pub content_type: String,
    pub bytes: Vec<u8>,
}

impl ProofFile {
    pub fn new(name: impl Into<String>, content_type: impl Into<String>, bytes: Vec<u8>) -> Self {
        Self {
            name: name.into(),
            content_type: content_type.into(),
            bytes,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadedFile {
    pub file_url: String,
}

#[async_trait]
pub trait FileUploader: Send + Sync {
    async fn upload(&self, file: ProofFile) -> Result<UploadedFile>;
}

/// User-facing toast notifications.
pub trait Notifier: Send + Sync {
    fn success(&self, message: &str);
    fn error(&self, message: &str);
}

pub trait MembershipNumberGenerator: Send + Sync {
    fn next_number(&self) -> MembershipNumber;
}

pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Utc>;
}

pub type EntityStoreBox = Box<dyn EntityStore>;
pub type FileUploaderBox = Box<dyn FileUploader>;
pub type NotifierBox = Box<dyn Notifier>;
pub type MembershipNumberGeneratorBox = Box<dyn MembershipNumberGenerator>;
pub type ClockBox = Box<dyn Clock>;
