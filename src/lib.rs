//! Plain-text Library Management
//!
//! Books, members and borrows are stored as `|`-delimited rows in text files
//! inside a data directory. Records are never removed from disk; deleting one
//! marks its row, and the next insert into that file reuses the row.

pub mod domain;
pub use domain::{Book, Borrow, BorrowItem, Config, LoanDate, LoanStatus, Member};

/// Data files, typed repositories and the cross-file queries over them.
pub mod storage;
pub use storage::{Library, RecordId};

pub mod circulation;
pub use circulation::{BorrowDraft, BorrowError, Circulation};

pub mod report;
pub use report::Report;
