//! Line-oriented storage of one entity type.
//!
//! A [`RecordStore`] owns a single data file. Every operation reads the whole
//! file, mutates the rows in memory and rewrites the file. Records are never
//! physically removed: deletion flips the status marker, and the first
//! tombstoned row is overwritten by the next insert.

use std::{
    fs::File,
    io::{self, BufRead, BufReader, Write},
    path::{Path, PathBuf},
};

use tempfile::NamedTempFile;

use super::record::{Record, RecordId, Status};

/// A delimited text file holding records of one kind.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordStore {
    path: PathBuf,
    min_fields: usize,
}

impl RecordStore {
    /// Creates a store over `path`, padding rows to `min_fields` cells.
    ///
    /// The file is not touched until the first operation.
    #[must_use]
    pub const fn new(path: PathBuf, min_fields: usize) -> Self {
        Self { path, min_fields }
    }

    /// The backing file.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// The padding length applied on read.
    #[must_use]
    pub const fn min_fields(&self) -> usize {
        self.min_fields
    }

    /// Loads every row, padded to this store's minimum width.
    ///
    /// # Errors
    ///
    /// Returns an error if the file exists but cannot be read.
    pub fn read_all(&self) -> Result<Vec<Record>, StoreError> {
        self.read_all_padded(self.min_fields)
    }

    /// Loads every row, padding short rows with empty cells up to
    /// `min_fields`.
    ///
    /// A missing file is an empty store.
    ///
    /// # Errors
    ///
    /// Returns an error if the file exists but cannot be read.
    pub fn read_all_padded(&self, min_fields: usize) -> Result<Vec<Record>, StoreError> {
        let file = match File::open(&self.path) {
            Ok(file) => file,
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                tracing::debug!("{} does not exist yet, treating as empty", self.path.display());
                return Ok(Vec::new());
            }
            Err(e) => return Err(self.io_error(e)),
        };

        let mut records = Vec::new();
        for line in BufReader::new(file).lines() {
            let line = line.map_err(|e| self.io_error(e))?;
            if let Some(record) = Record::parse(&line, min_fields) {
                records.push(record);
            }
        }
        Ok(records)
    }

    /// Replaces the file contents with `records`.
    ///
    /// The rows are written to a temporary file in the same directory which is
    /// then renamed over the target, so a failure leaves the previous file in
    /// place.
    ///
    /// # Errors
    ///
    /// Returns an error if the temporary file cannot be created, written or
    /// renamed.
    pub fn write_all(&self, records: &[Record]) -> Result<(), StoreError> {
        let dir = match self.path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent,
            _ => Path::new("."),
        };

        let mut tmp = NamedTempFile::new_in(dir).map_err(|e| self.io_error(e))?;
        for record in records {
            writeln!(tmp, "{}", record.to_line()).map_err(|e| self.io_error(e))?;
        }
        tmp.as_file().sync_all().map_err(|e| self.io_error(e))?;
        tmp.persist(&self.path)
            .map_err(|e| self.io_error(e.error))?;

        tracing::trace!("wrote {} rows to {}", records.len(), self.path.display());
        Ok(())
    }

    /// The id the next insert receives: one past the highest active id.
    ///
    /// Tombstoned ids are ignored. Returns `None` once the highest active id
    /// is `u32::MAX`.
    #[must_use]
    pub fn next_id(records: &[Record]) -> Option<RecordId> {
        records
            .iter()
            .filter(|record| record.is_active())
            .filter_map(Record::id)
            .max()
            .map_or(Some(RecordId::FIRST), RecordId::next)
    }

    /// The index of the first tombstoned row, if any.
    #[must_use]
    pub fn find_free_slot(records: &[Record]) -> Option<usize> {
        records.iter().position(Record::is_deleted)
    }

    /// Inserts a new active record and returns its id.
    ///
    /// The record takes the row of the first tombstone if there is one,
    /// otherwise it is appended. Either way its id is [`Self::next_id`]; the
    /// row position says nothing about the id.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::IdsExhausted`] if no id is left, or an I/O error
    /// if the file cannot be read or written.
    pub fn add(&self, fields: Vec<String>) -> Result<RecordId, StoreError> {
        let mut records = self.read_all()?;
        let id = Self::next_id(&records).ok_or_else(|| StoreError::IdsExhausted {
            path: self.path.clone(),
        })?;
        let record = Record::active(id, fields);

        match Self::find_free_slot(&records) {
            Some(slot) => {
                tracing::debug!("reusing free slot {slot} in {}", self.path.display());
                records[slot] = record;
            }
            None => records.push(record),
        }

        self.write_all(&records)?;
        Ok(id)
    }

    /// Overwrites the fields of the active record `id`.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::NotFound`] if there is no active record with that
    /// id, or an I/O error if the file cannot be read or written.
    pub fn update(&self, id: RecordId, fields: Vec<String>) -> Result<(), StoreError> {
        let mut records = self.read_all()?;
        let record = records
            .iter_mut()
            .find(|record| record.is_active_with_id(id))
            .ok_or_else(|| self.not_found(id))?;
        record.set_fields(fields);
        self.write_all(&records)
    }

    /// Marks the active record `id` as deleted.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::NotFound`] if there is no active record with that
    /// id, or an I/O error if the file cannot be read or written.
    pub fn soft_delete(&self, id: RecordId) -> Result<(), StoreError> {
        let mut records = self.read_all()?;
        let record = records
            .iter_mut()
            .find(|record| record.is_active_with_id(id))
            .ok_or_else(|| self.not_found(id))?;
        record.set_status(Status::Deleted);
        self.write_all(&records)
    }

    /// Marks every active record matching `predicate` as deleted in a single
    /// rewrite, returning how many were deleted.
    ///
    /// The file is not rewritten when nothing matches.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or written.
    pub fn soft_delete_where<F>(&self, mut predicate: F) -> Result<usize, StoreError>
    where
        F: FnMut(&Record) -> bool,
    {
        let mut records = self.read_all()?;
        let mut deleted = 0;
        for record in records.iter_mut().filter(|r| r.is_active()) {
            if predicate(record) {
                record.set_status(Status::Deleted);
                deleted += 1;
            }
        }
        if deleted > 0 {
            self.write_all(&records)?;
        }
        Ok(deleted)
    }

    /// Whether an active record with this id exists.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read.
    pub fn exists(&self, id: RecordId) -> Result<bool, StoreError> {
        Ok(self
            .read_all()?
            .iter()
            .any(|record| record.is_active_with_id(id)))
    }

    fn io_error(&self, source: io::Error) -> StoreError {
        StoreError::Io {
            path: self.path.clone(),
            source,
        }
    }

    fn not_found(&self, id: RecordId) -> StoreError {
        StoreError::NotFound {
            path: self.path.clone(),
            id,
        }
    }
}

/// Errors raised by a [`RecordStore`].
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// The data file could not be read or written.
    #[error("failed to access {}: {source}", path.display())]
    Io {
        /// The data file.
        path: PathBuf,
        /// The underlying error.
        #[source]
        source: io::Error,
    },
    /// No active record has the requested id.
    #[error("no record with id {id} in {}", path.display())]
    NotFound {
        /// The data file.
        path: PathBuf,
        /// The requested id.
        id: RecordId,
    },
    /// The highest active id is already the largest representable id.
    #[error("no ids left in {}", path.display())]
    IdsExhausted {
        /// The data file.
        path: PathBuf,
    },
}

#[cfg(test)]
mod tests {
    use tempfile::TempDir;

    use super::*;

    fn setup_store() -> (TempDir, RecordStore) {
        let tmp = TempDir::new().expect("failed to create temp dir");
        let store = RecordStore::new(tmp.path().join("members.txt"), 4);
        (tmp, store)
    }

    fn id(value: u32) -> RecordId {
        RecordId::new(value).unwrap()
    }

    fn fields(name: &str) -> Vec<String> {
        vec![name.to_string(), "0800000000".to_string()]
    }

    #[test]
    fn missing_file_reads_as_empty() {
        let (_tmp, store) = setup_store();
        assert!(store.read_all().unwrap().is_empty());
    }

    #[test]
    fn add_assigns_sequential_ids() {
        let (_tmp, store) = setup_store();

        assert_eq!(store.add(fields("Ann")).unwrap(), id(1));
        assert_eq!(store.add(fields("Ben")).unwrap(), id(2));

        let contents = std::fs::read_to_string(store.path()).unwrap();
        assert_eq!(contents, "1|Ann|0800000000|A\n2|Ben|0800000000|A\n");
    }

    #[test]
    fn soft_delete_keeps_row() {
        let (_tmp, store) = setup_store();
        store.add(fields("Ann")).unwrap();

        store.soft_delete(id(1)).unwrap();

        let records = store.read_all().unwrap();
        assert_eq!(records.len(), 1);
        assert!(records[0].is_deleted());
        assert!(!store.exists(id(1)).unwrap());
    }

    #[test]
    fn add_reuses_first_free_slot_with_fresh_id() {
        let (_tmp, store) = setup_store();
        store.add(fields("Ann")).unwrap();
        store.add(fields("Ben")).unwrap();
        store.add(fields("Cat")).unwrap();
        store.soft_delete(id(1)).unwrap();

        let new_id = store.add(fields("Dan")).unwrap();

        // one past the highest active id, written into the first tombstone row
        assert_eq!(new_id, id(4));
        let records = store.read_all().unwrap();
        assert_eq!(records.len(), 3);
        assert_eq!(records[0].id(), Some(id(4)));
        assert_eq!(records[0].field(0), "Dan");
    }

    #[test]
    fn deleted_max_id_can_be_handed_out_again() {
        let (_tmp, store) = setup_store();
        store.add(fields("Ann")).unwrap();
        store.add(fields("Ben")).unwrap();
        store.soft_delete(id(2)).unwrap();

        assert_eq!(store.add(fields("Cat")).unwrap(), id(2));
    }

    #[test]
    fn next_id_ignores_tombstones_and_garbage() {
        let records = vec![
            Record::parse("5|x|y|D", 4).unwrap(),
            Record::parse("oops|x|y|A", 4).unwrap(),
            Record::parse("2|x|y|A", 4).unwrap(),
        ];

        assert_eq!(RecordStore::next_id(&records), Some(id(3)));
        assert_eq!(RecordStore::find_free_slot(&records), Some(0));
    }

    #[test]
    fn next_id_of_empty_file_is_one() {
        assert_eq!(RecordStore::next_id(&[]), Some(RecordId::FIRST));
    }

    #[test]
    fn add_fails_once_ids_run_out() {
        let (_tmp, store) = setup_store();
        let full = format!("{}|Ann|0800000000|A\n", u32::MAX);
        std::fs::write(store.path(), &full).unwrap();

        assert!(matches!(
            store.add(fields("Ben")),
            Err(StoreError::IdsExhausted { .. })
        ));
        assert_eq!(std::fs::read_to_string(store.path()).unwrap(), full);
    }

    #[test]
    fn update_preserves_id_and_status() {
        let (_tmp, store) = setup_store();
        store.add(fields("Ann")).unwrap();

        store.update(id(1), fields("Anne")).unwrap();

        let records = store.read_all().unwrap();
        assert_eq!(records[0].to_line(), "1|Anne|0800000000|A");
    }

    #[test]
    fn update_and_delete_require_active_record() {
        let (_tmp, store) = setup_store();
        store.add(fields("Ann")).unwrap();
        store.soft_delete(id(1)).unwrap();

        assert!(matches!(
            store.update(id(1), fields("Anne")),
            Err(StoreError::NotFound { .. })
        ));
        assert!(matches!(
            store.soft_delete(id(1)),
            Err(StoreError::NotFound { .. })
        ));
    }

    #[test]
    fn soft_delete_where_counts_matches() {
        let (_tmp, store) = setup_store();
        store.add(fields("Ann")).unwrap();
        store.add(fields("Ben")).unwrap();
        store.add(fields("Ann")).unwrap();

        let deleted = store.soft_delete_where(|r| r.field(0) == "Ann").unwrap();

        assert_eq!(deleted, 2);
        assert!(store.exists(id(2)).unwrap());
        assert!(!store.exists(id(1)).unwrap());
        assert!(!store.exists(id(3)).unwrap());
    }

    #[test]
    fn failed_write_leaves_previous_file() {
        let (tmp, store) = setup_store();
        store.add(fields("Ann")).unwrap();

        let orphan = RecordStore::new(tmp.path().join("missing").join("members.txt"), 4);
        assert!(matches!(
            orphan.write_all(&store.read_all().unwrap()),
            Err(StoreError::Io { .. })
        ));

        assert_eq!(store.read_all().unwrap().len(), 1);
    }

    #[test]
    fn short_legacy_rows_are_padded() {
        let (_tmp, store) = setup_store();
        std::fs::write(store.path(), "1|Ann\n\n2|Ben|0811111111|A\n").unwrap();

        let records = store.read_all().unwrap();

        assert_eq!(records.len(), 2);
        assert_eq!(records[0].field(1), "");
        assert!(!records[0].is_active());
        assert!(records[1].is_active());
    }
}
