mod library;
mod record;
mod record_store;
mod repository;

pub use library::{Availability, CONFIG_FILE, Library, LibraryError, UNKNOWN_BOOK, UNKNOWN_MEMBER};
pub use record::{InvalidId, Record, RecordId, Status, DELIMITER};
pub use record_store::{RecordStore, StoreError};
pub use repository::{DecodeError, Entity, Repository, Stored};
