use crate::domain::entity::{EntityKind, EntityRecord, Fields, merge_fields, take_id};
use crate::domain::ports::{EntityStore, FileUploader, Notifier, ProofFile, UploadedFile};
use crate::error::{EnrollmentError, Result};
use async_trait::async_trait;
use std::collections::{BTreeMap, HashSet};
use std::sync::{Arc, Mutex};
use tokio::sync::RwLock;
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StoreOp {
    Create,
    Update,
}

/// One successful write, in the order the store accepted it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoreOperation {
    pub op: StoreOp,
    pub kind: EntityKind,
    pub id: String,
}

#[derive(Default)]
struct StoreState {
    records: BTreeMap<(EntityKind, String), Fields>,
    operations: Vec<StoreOperation>,
    armed_failures: HashSet<(EntityKind, StoreOp)>,
}

/// A thread-safe in-memory entity store.
///
/// Clones share the same underlying state, so a test can keep a handle while the
/// workflow owns a boxed copy. Every accepted write is appended to an operation log.
#[derive(Default, Clone)]
pub struct InMemoryEntityStore {
    state: Arc<RwLock<StoreState>>,
}

impl InMemoryEntityStore {
    /// Creates a new, empty in-memory store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Inserts a record without logging it, unless one with the same key exists.
    /// Returns false when the record was already present.
    pub async fn seed(&self, kind: EntityKind, mut fields: Fields) -> Result<bool> {
        let id = take_id(&mut fields).ok_or_else(|| {
            EnrollmentError::ValidationError("Seeded records need an id".to_string())
        })?;
        let mut state = self.state.write().await;
        if state.records.contains_key(&(kind, id.clone())) {
            return Ok(false);
        }
        state.records.insert((kind, id), fields);
        Ok(true)
    }

    /// Makes the next `op` on `kind` fail with a store error.
    pub async fn fail_on(&self, kind: EntityKind, op: StoreOp) {
        self.state.write().await.armed_failures.insert((kind, op));
    }

    pub async fn operations(&self) -> Vec<StoreOperation> {
        self.state.read().await.operations.clone()
    }

    pub async fn records(&self, kind: EntityKind) -> Vec<EntityRecord> {
        let state = self.state.read().await;
        state
            .records
            .iter()
            .filter(|((k, _), _)| *k == kind)
            .map(|((k, id), fields)| EntityRecord {
                kind: *k,
                id: id.clone(),
                fields: fields.clone(),
            })
            .collect()
    }
}

fn check_armed(state: &mut StoreState, kind: EntityKind, op: StoreOp) -> Result<()> {
    if state.armed_failures.remove(&(kind, op)) {
        Err(EnrollmentError::StoreError(format!(
            "{kind} {op:?} rejected by the store"
        )))
    } else {
        Ok(())
    }
}

#[async_trait]
impl EntityStore for InMemoryEntityStore {
    async fn create(&self, kind: EntityKind, mut fields: Fields) -> Result<EntityRecord> {
        let mut state = self.state.write().await;
        check_armed(&mut state, kind, StoreOp::Create)?;

        let id = take_id(&mut fields).unwrap_or_else(|| Uuid::new_v4().to_string());
        if state.records.contains_key(&(kind, id.clone())) {
            return Err(EnrollmentError::StoreError(format!(
                "{kind} record {id} already exists"
            )));
        }
        state.records.insert((kind, id.clone()), fields.clone());
        state.operations.push(StoreOperation {
            op: StoreOp::Create,
            kind,
            id: id.clone(),
        });
        Ok(EntityRecord { kind, id, fields })
    }

    async fn update(&self, kind: EntityKind, id: &str, fields: Fields) -> Result<EntityRecord> {
        let mut state = self.state.write().await;
        check_armed(&mut state, kind, StoreOp::Update)?;

        let existing = state
            .records
            .get_mut(&(kind, id.to_string()))
            .ok_or_else(|| EnrollmentError::NotFound {
                kind,
                id: id.to_string(),
            })?;
        merge_fields(existing, fields);
        let merged = existing.clone();
        state.operations.push(StoreOperation {
            op: StoreOp::Update,
            kind,
            id: id.to_string(),
        });
        Ok(EntityRecord {
            kind,
            id: id.to_string(),
            fields: merged,
        })
    }

    async fn get(&self, kind: EntityKind, id: &str) -> Result<Option<EntityRecord>> {
        let state = self.state.read().await;
        Ok(state
            .records
            .get(&(kind, id.to_string()))
            .map(|fields| EntityRecord {
                kind,
                id: id.to_string(),
                fields: fields.clone(),
            }))
    }
}

/// Keeps uploaded files in memory and hands out `memory://` URLs.
#[derive(Default, Clone)]
pub struct InMemoryFileUploader {
    files: Arc<RwLock<BTreeMap<String, ProofFile>>>,
}

impl InMemoryFileUploader {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn get(&self, file_url: &str) -> Option<ProofFile> {
        self.files.read().await.get(file_url).cloned()
    }
}

#[async_trait]
impl FileUploader for InMemoryFileUploader {
    async fn upload(&self, file: ProofFile) -> Result<UploadedFile> {
        let file_url = format!("memory://uploads/{}-{}", Uuid::new_v4(), file.name);
        self.files.write().await.insert(file_url.clone(), file);
        Ok(UploadedFile { file_url })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NotificationLevel {
    Success,
    Error,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notification {
    pub level: NotificationLevel,
    pub message: String,
}

/// Notifier that remembers every message.
#[derive(Default, Clone)]
pub struct RecordingNotifier {
    notifications: Arc<Mutex<Vec<Notification>>>,
}

impl RecordingNotifier {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn notifications(&self) -> Vec<Notification> {
        self.notifications
            .lock()
            .map(|guard| guard.clone())
            .unwrap_or_default()
    }

    fn push(&self, level: NotificationLevel, message: &str) {
        if let Ok(mut guard) = self.notifications.lock() {
            guard.push(Notification {
                level,
                message: message.to_string(),
            });
        }
    }
}

impl Notifier for RecordingNotifier {
    fn success(&self, message: &str) {
        self.push(NotificationLevel::Success, message);
    }

    fn error(&self, message: &str) {
        self.push(NotificationLevel::Error, message);
    }
}
