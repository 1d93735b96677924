//! Domain models for library management.
//!
//! Books, members, borrow transactions and the dates and fines that govern
//! them.

mod book;
pub use book::Book;

mod member;
pub use member::Member;

/// Borrow headers and line items.
pub mod borrow;
pub use borrow::{Borrow, BorrowItem, LoanStatus};

mod config;
pub use config::Config;

/// Loan dates, due dates and fines.
pub mod date;
pub use date::{fine_for, DateError, LoanDate, RecordedDate};
