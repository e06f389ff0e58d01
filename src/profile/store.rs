//! In-memory index of captured profiles.
//!
//! Records are reachable by request id and by request path. Both indexes live
//! behind one lock so a reader never sees a record in one index but not the
//! other.

use super::schema::{ProfileRecord, RequestId};
use crate::utils::error::StoreError;
use log::debug;
use parking_lot::RwLock;
use std::collections::{BTreeMap, HashMap};

#[derive(Debug, Default)]
struct Indexes {
    by_id: HashMap<RequestId, ProfileRecord>,
    by_path: BTreeMap<String, Vec<ProfileRecord>>,
    next_sequence: u64,
}

/// Profile store shared between the interceptor (writer) and the viewer (reader)
///
/// Records are retained for the lifetime of the store.
#[derive(Debug, Default)]
pub struct ProfileStore {
    indexes: RwLock<Indexes>,
}

impl ProfileStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Rebuild a store from records, keeping their order as arrival order
    pub fn from_records(records: impl IntoIterator<Item = ProfileRecord>) -> Result<Self, StoreError> {
        let store = Self::new();
        for record in records {
            store.put(record)?;
        }
        Ok(store)
    }

    /// Insert a record into both indexes
    ///
    /// # Errors
    /// * `StoreError::DuplicateId` - a record with the same id already exists
    pub fn put(&self, record: ProfileRecord) -> Result<(), StoreError> {
        let mut indexes = self.indexes.write();

        if indexes.by_id.contains_key(record.request_id()) {
            return Err(StoreError::DuplicateId(record.request_id().clone()));
        }

        let sequence = indexes.next_sequence;
        indexes.next_sequence += 1;
        let record = record.with_sequence(sequence);

        debug!(
            "Storing profile {} for {} ({} functions)",
            record.request_id(),
            record.path(),
            record.data().len()
        );

        indexes
            .by_path
            .entry(record.path().to_string())
            .or_default()
            .push(record.clone());
        indexes.by_id.insert(record.request_id().clone(), record);

        Ok(())
    }

    /// Look up the record of one request
    ///
    /// # Errors
    /// * `StoreError::NotFound` - no record with this id
    pub fn get_by_id(&self, id: &RequestId) -> Result<ProfileRecord, StoreError> {
        self.indexes
            .read()
            .by_id
            .get(id)
            .cloned()
            .ok_or_else(|| StoreError::NotFound(id.clone()))
    }

    /// All records whose path starts with `prefix`, in arrival order
    ///
    /// An empty prefix matches every record.
    pub fn get_by_path_prefix(&self, prefix: &str) -> Vec<ProfileRecord> {
        let mut records: Vec<ProfileRecord> = {
            let indexes = self.indexes.read();
            indexes
                .by_path
                .range(prefix.to_string()..)
                .take_while(|(path, _)| path.starts_with(prefix))
                .flat_map(|(_, records)| records.iter().cloned())
                .collect()
        };
        records.sort_by_key(ProfileRecord::sequence);
        records
    }

    /// Resolve the viewer's `request_id` / `request_path_prefix` pair
    ///
    /// A non-empty id takes precedence; an unknown id resolves to nothing.
    pub fn resolve(&self, request_id: Option<&RequestId>, path_prefix: &str) -> Vec<ProfileRecord> {
        match request_id {
            Some(id) => match self.get_by_id(id) {
                Ok(record) => vec![record],
                Err(err) => {
                    debug!("{}", err);
                    Vec::new()
                }
            },
            None => self.get_by_path_prefix(path_prefix),
        }
    }

    /// Every record in arrival order
    pub fn snapshot(&self) -> Vec<ProfileRecord> {
        self.get_by_path_prefix("")
    }

    pub fn len(&self) -> usize {
        self.indexes.read().by_id.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
