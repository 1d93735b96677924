//! Typed views over a [`RecordStore`].

use std::{marker::PhantomData, ops::Deref, path::Path};

use super::{
    record::{Record, RecordId},
    record_store::{RecordStore, StoreError},
};

/// A value that can be stored as one row of a data file.
///
/// Implementors define the field layout between the id and the status
/// marker.
pub trait Entity: Sized {
    /// Human-readable name used in messages, e.g. `"book"`.
    const KIND: &'static str;

    /// Default name of the data file.
    const FILE_NAME: &'static str;

    /// Cells per row, including the id and the status marker.
    const MIN_FIELDS: usize;

    /// Encodes the data fields, in file order.
    fn to_fields(&self) -> Vec<String>;

    /// Decodes the data fields of an active record.
    ///
    /// # Errors
    ///
    /// Returns an error if a field that identifies another record cannot be
    /// parsed.
    fn from_record(record: &Record) -> Result<Self, DecodeError>;
}

/// A field of a row could not be interpreted.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("field {index} ('{value}') is not a valid {expected}")]
pub struct DecodeError {
    /// Zero-based index of the data field.
    pub index: usize,
    /// The raw cell.
    pub value: String,
    /// What the field should hold.
    pub expected: &'static str,
}

impl DecodeError {
    /// Creates an error for data field `index` of `record`.
    #[must_use]
    pub fn new(record: &Record, index: usize, expected: &'static str) -> Self {
        Self {
            index,
            value: record.field(index).to_string(),
            expected,
        }
    }
}

/// An entity together with the id it is stored under.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Stored<T> {
    /// The record id.
    pub id: RecordId,
    /// The decoded entity.
    pub value: T,
}

impl<T> Deref for Stored<T> {
    type Target = T;

    fn deref(&self) -> &Self::Target {
        &self.value
    }
}

/// Typed access to the records of one entity kind.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Repository<E> {
    store: RecordStore,
    entity: PhantomData<E>,
}

impl<E: Entity> Repository<E> {
    /// Opens the repository stored in `E::FILE_NAME` under `root`.
    #[must_use]
    pub fn open(root: &Path) -> Self {
        Self::with_store(RecordStore::new(root.join(E::FILE_NAME), E::MIN_FIELDS))
    }

    /// Wraps an existing store.
    #[must_use]
    pub const fn with_store(store: RecordStore) -> Self {
        Self {
            store,
            entity: PhantomData,
        }
    }

    /// The underlying record store.
    #[must_use]
    pub const fn store(&self) -> &RecordStore {
        &self.store
    }

    /// Every active record that decodes, in file order.
    ///
    /// # Errors
    ///
    /// Returns an error if the data file cannot be read.
    pub fn active(&self) -> Result<Vec<Stored<E>>, StoreError> {
        Ok(self
            .store
            .read_all()?
            .iter()
            .filter(|record| record.is_active())
            .filter_map(decode::<E>)
            .collect())
    }

    /// The active record with this id.
    ///
    /// # Errors
    ///
    /// Returns an error if the data file cannot be read.
    pub fn get(&self, id: RecordId) -> Result<Option<Stored<E>>, StoreError> {
        Ok(self
            .store
            .read_all()?
            .iter()
            .find(|record| record.is_active_with_id(id))
            .and_then(decode::<E>))
    }

    /// Whether an active record with this id exists.
    ///
    /// # Errors
    ///
    /// Returns an error if the data file cannot be read.
    pub fn exists(&self, id: RecordId) -> Result<bool, StoreError> {
        self.store.exists(id)
    }

    /// Stores a new entity, returning its id.
    ///
    /// # Errors
    ///
    /// Returns an error if the data file cannot be read or written.
    pub fn add(&self, entity: &E) -> Result<RecordId, StoreError> {
        let id = self.store.add(entity.to_fields())?;
        tracing::info!("added {} {id}", E::KIND);
        Ok(id)
    }

    /// Overwrites the entity stored under `id`.
    ///
    /// # Errors
    ///
    /// Returns an error if no active record has this id, or if the data file
    /// cannot be read or written.
    pub fn update(&self, id: RecordId, entity: &E) -> Result<(), StoreError> {
        self.store.update(id, entity.to_fields())?;
        tracing::info!("updated {} {id}", E::KIND);
        Ok(())
    }

    /// Soft-deletes the entity stored under `id`.
    ///
    /// # Errors
    ///
    /// Returns an error if no active record has this id, or if the data file
    /// cannot be read or written.
    pub fn delete(&self, id: RecordId) -> Result<(), StoreError> {
        self.store.soft_delete(id)?;
        tracing::info!("deleted {} {id}", E::KIND);
        Ok(())
    }

    /// Reads the whole file, lets `f` edit the active records that decode,
    /// and writes the edits back in one rewrite.
    ///
    /// `f` receives each decoded entity and may change it; changed entities
    /// are re-encoded. Rows that do not decode are left untouched.
    ///
    /// # Errors
    ///
    /// Returns an error if the data file cannot be read or written.
    pub fn modify<F>(&self, mut f: F) -> Result<usize, StoreError>
    where
        E: Clone + PartialEq,
        F: FnMut(&mut Stored<E>),
    {
        let mut records = self.store.read_all()?;
        let mut changed = 0;
        for record in records.iter_mut().filter(|record| record.is_active()) {
            let Some(mut entity) = decode::<E>(record) else {
                continue;
            };
            let before = entity.value.clone();
            f(&mut entity);
            if entity.value != before {
                record.set_fields(entity.value.to_fields());
                changed += 1;
            }
        }
        if changed > 0 {
            self.store.write_all(&records)?;
        }
        Ok(changed)
    }
}

fn decode<E: Entity>(record: &Record) -> Option<Stored<E>> {
    let Some(id) = record.id() else {
        tracing::debug!("skipping {} row without a valid id: {}", E::KIND, record.to_line());
        return None;
    };
    match E::from_record(record) {
        Ok(value) => Some(Stored { id, value }),
        Err(e) => {
            tracing::debug!("skipping {} {id}: {e}", E::KIND);
            None
        }
    }
}
