use crate::domain::entity::{EntityKind, EntityRecord, Fields, merge_fields, take_id};
use crate::domain::ports::EntityStore;
use crate::error::{EnrollmentError, Result};
use async_trait::async_trait;
use rocksdb::{ColumnFamilyDescriptor, DB, Options};
use std::path::Path;
use std::sync::Arc;
use tokio::sync::Mutex;
use uuid::Uuid;

/// A persistent entity store backed by RocksDB.
///
/// Each `EntityKind` lives in its own column family, named after the kind. Records are
/// stored as JSON objects keyed by their id.
///
/// This struct is thread-safe (`Clone` shares the underlying `Arc<DB>`). Read-modify-write
/// sequences are serialized through `write_lock`.
#[derive(Clone)]
pub struct RocksDBEntityStore {
    db: Arc<DB>,
    write_lock: Arc<Mutex<()>>,
}

impl RocksDBEntityStore {
    /// Opens or creates a RocksDB instance at the specified path, with one column family
    /// per entity kind.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let mut opts = Options::default();
        opts.create_if_missing(true);
        opts.create_missing_column_families(true);

        let families = EntityKind::ALL
            .iter()
            .map(|kind| ColumnFamilyDescriptor::new(kind.name(), Options::default()))
            .collect::<Vec<_>>();

        let db = DB::open_cf_descriptors(&opts, path, families)?;

        Ok(Self {
            db: Arc::new(db),
            write_lock: Arc::new(Mutex::new(())),
        })
    }

    /// Inserts a record unless one with the same key exists. Returns false when it did.
    pub async fn seed(&self, kind: EntityKind, mut fields: Fields) -> Result<bool> {
        let id = take_id(&mut fields).ok_or_else(|| {
            EnrollmentError::ValidationError("Seeded records need an id".to_string())
        })?;
        let _guard = self.write_lock.lock().await;
        if self.read(kind, &id)?.is_some() {
            return Ok(false);
        }
        self.write(kind, &id, &fields)?;
        Ok(true)
    }

    fn read(&self, kind: EntityKind, id: &str) -> Result<Option<Fields>> {
        let cf = self.db.cf_handle(kind.name()).ok_or_else(|| missing_family(kind))?;
        match self.db.get_cf(&cf, id.as_bytes())? {
            Some(bytes) => Ok(Some(serde_json::from_slice(&bytes)?)),
            None => Ok(None),
        }
    }

    fn write(&self, kind: EntityKind, id: &str, fields: &Fields) -> Result<()> {
        let cf = self.db.cf_handle(kind.name()).ok_or_else(|| missing_family(kind))?;
        let value = serde_json::to_vec(fields)?;
        self.db.put_cf(&cf, id.as_bytes(), value)?;
        Ok(())
    }
}

fn missing_family(kind: EntityKind) -> EnrollmentError {
    EnrollmentError::InternalError(Box::new(std::io::Error::other(format!(
        "{kind} column family not found"
    ))))
}

#[async_trait]
impl EntityStore for RocksDBEntityStore {
    async fn create(&self, kind: EntityKind, mut fields: Fields) -> Result<EntityRecord> {
        let id = take_id(&mut fields).unwrap_or_else(|| Uuid::new_v4().to_string());
        let _guard = self.write_lock.lock().await;
        if self.read(kind, &id)?.is_some() {
            return Err(EnrollmentError::StoreError(format!(
                "{kind} record {id} already exists"
            )));
        }
        self.write(kind, &id, &fields)?;
        Ok(EntityRecord { kind, id, fields })
    }

    async fn update(&self, kind: EntityKind, id: &str, fields: Fields) -> Result<EntityRecord> {
        let _guard = self.write_lock.lock().await;
        let mut existing = self.read(kind, id)?.ok_or_else(|| EnrollmentError::NotFound {
            kind,
            id: id.to_string(),
        })?;
        merge_fields(&mut existing, fields);
        self.write(kind, id, &existing)?;
        Ok(EntityRecord {
            kind,
            id: id.to_string(),
            fields: existing,
        })
    }

    async fn get(&self, kind: EntityKind, id: &str) -> Result<Option<EntityRecord>> {
        Ok(self.read(kind, id)?.map(|fields| EntityRecord {
            kind,
            id: id.to_string(),
            fields,
        }))
    }
}
