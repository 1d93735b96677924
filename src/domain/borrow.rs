//! Borrow headers and their per-book line items.

use std::{fmt, str::FromStr};

use serde::Serialize;

use super::date::{LoanDate, RecordedDate};
use crate::storage::{DecodeError, Entity, Record, RecordId};

/// Whether a book, or a whole borrow, is still out.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum LoanStatus {
    /// At least one book is still with the member.
    Borrowing,
    /// Everything has been brought back.
    Returned,
}

impl LoanStatus {
    /// The text written to the data files.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Borrowing => "borrowing",
            Self::Returned => "returned",
        }
    }

    /// The status of a borrow given whether any of its items is still out.
    #[must_use]
    pub const fn from_outstanding(any_outstanding: bool) -> Self {
        if any_outstanding {
            Self::Borrowing
        } else {
            Self::Returned
        }
    }
}

impl fmt::Display for LoanStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for LoanStatus {
    type Err = UnknownStatus;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        // Thai labels are accepted so older data files load unchanged.
        match s.trim() {
            "borrowing" | "กำลังยืม" => Ok(Self::Borrowing),
            "returned" | "คืนแล้ว" => Ok(Self::Returned),
            other => Err(UnknownStatus(other.to_string())),
        }
    }
}

/// Error returned when parsing a [`LoanStatus`].
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown loan status '{0}'")]
pub struct UnknownStatus(pub String);

/// One borrow transaction: a member taking up to three books at once.
///
/// The `status` field is a cache. The authoritative status of a borrow is
/// derived from its items.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Borrow {
    /// The borrowing member.
    pub member_id: RecordId,
    /// When the books were taken.
    pub borrow_date: RecordedDate,
    /// When the books are due back. No fine accrues while it is unreadable.
    pub due_date: RecordedDate,
    /// Header-level fine. Fines are tracked per item; this stays zero unless
    /// edited by hand.
    pub fine: u32,
    /// Cached loan status.
    pub status: LoanStatus,
}

impl Borrow {
    /// A new borrow starting on `borrow_date`, due a loan period later.
    #[must_use]
    pub fn starting(member_id: RecordId, borrow_date: LoanDate) -> Self {
        Self {
            member_id,
            borrow_date: borrow_date.into(),
            due_date: borrow_date.due_date().into(),
            fine: 0,
            status: LoanStatus::Borrowing,
        }
    }
}

impl Entity for Borrow {
    const KIND: &'static str = "borrow";
    const FILE_NAME: &'static str = "borrows.txt";
    const MIN_FIELDS: usize = 7;

    fn to_fields(&self) -> Vec<String> {
        vec![
            self.member_id.to_string(),
            self.borrow_date.to_string(),
            self.due_date.to_string(),
            self.fine.to_string(),
            self.status.to_string(),
        ]
    }

    fn from_record(record: &Record) -> Result<Self, DecodeError> {
        Ok(Self {
            member_id: parse_field(record, 0, "member id")?,
            // only the member id can disqualify a header
            borrow_date: RecordedDate::from(record.field(1)),
            due_date: RecordedDate::from(record.field(2)),
            fine: parse_amount(record.field(3)),
            // a stale or garbled cache is harmless, it is recomputed from items
            status: record.field(4).parse().unwrap_or(LoanStatus::Borrowing),
        })
    }
}

/// One book lent as part of a [`Borrow`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BorrowItem {
    /// The borrow this line belongs to.
    pub borrow_id: RecordId,
    /// The book lent.
    pub book_id: RecordId,
    /// Whether this copy is still out.
    pub status: LoanStatus,
    /// Fine charged when the copy came back.
    pub fine: u32,
}

impl BorrowItem {
    /// A copy of `book_id` newly lent under `borrow_id`.
    #[must_use]
    pub const fn lent(borrow_id: RecordId, book_id: RecordId) -> Self {
        Self {
            borrow_id,
            book_id,
            status: LoanStatus::Borrowing,
            fine: 0,
        }
    }

    /// Whether this copy is still out.
    #[must_use]
    pub fn is_outstanding(&self) -> bool {
        self.status == LoanStatus::Borrowing
    }
}

impl Entity for BorrowItem {
    const KIND: &'static str = "borrow item";
    const FILE_NAME: &'static str = "borrow_items.txt";
    const MIN_FIELDS: usize = 6;

    fn to_fields(&self) -> Vec<String> {
        vec![
            self.borrow_id.to_string(),
            self.book_id.to_string(),
            self.status.to_string(),
            self.fine.to_string(),
        ]
    }

    fn from_record(record: &Record) -> Result<Self, DecodeError> {
        Ok(Self {
            borrow_id: parse_field(record, 0, "borrow id")?,
            book_id: parse_field(record, 1, "book id")?,
            status: parse_field(record, 2, "loan status")?,
            fine: parse_amount(record.field(3)),
        })
    }
}

fn parse_field<T: FromStr>(
    record: &Record,
    index: usize,
    expected: &'static str,
) -> Result<T, DecodeError> {
    record
        .field(index)
        .parse()
        .map_err(|_| DecodeError::new(record, index, expected))
}

/// Reads a money amount leniently.
///
/// Decimal amounts are truncated to whole units; anything unreadable is zero.
fn parse_amount(value: &str) -> u32 {
    let value = value.trim();
    value.parse().unwrap_or_else(|_| {
        value
            .parse::<f64>()
            .ok()
            .filter(|amount| amount.is_finite() && *amount >= 0.0)
            .map_or(0, |amount| {
                #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
                let whole = amount.min(f64::from(u32::MAX)) as u32;
                whole
            })
    })
}

#[cfg(test)]
mod tests {
    use test_case::test_case;

    use super::*;

    fn id(value: u32) -> RecordId {
        RecordId::new(value).unwrap()
    }

    #[test_case("borrowing", LoanStatus::Borrowing; "english borrowing")]
    #[test_case("returned", LoanStatus::Returned; "english returned")]
    #[test_case("กำลังยืม", LoanStatus::Borrowing; "legacy borrowing")]
    #[test_case("คืนแล้ว", LoanStatus::Returned; "legacy returned")]
    fn parses_status(input: &str, expected: LoanStatus) {
        assert_eq!(input.parse::<LoanStatus>().unwrap(), expected);
    }

    #[test_case("15", 15; "integer")]
    #[test_case("15.00", 15; "decimal")]
    #[test_case("", 0; "empty")]
    #[test_case("n/a", 0; "garbage")]
    #[test_case("-3", 0; "negative")]
    fn amounts(input: &str, expected: u32) {
        assert_eq!(parse_amount(input), expected);
    }

    #[test]
    fn borrow_row_layout() {
        let borrow = Borrow::starting(id(2), "01/03/2024".parse().unwrap());
        let record = Record::active(id(9), borrow.to_fields());

        assert_eq!(record.to_line(), "9|2|01/03/2024|08/03/2024|0|borrowing|A");
        assert_eq!(Borrow::from_record(&record).unwrap(), borrow);
    }

    #[test]
    fn header_with_legacy_dates_decodes() {
        let line = "1|1|1/3/2024|8/3/2024|0|borrowing|A";
        let record = Record::parse(line, Borrow::MIN_FIELDS).unwrap();

        let borrow = Borrow::from_record(&record).unwrap();

        assert_eq!(borrow.member_id, id(1));
        assert_eq!(borrow.due_date, RecordedDate::Unreadable("8/3/2024".to_string()));
        assert_eq!(borrow.due_date.date(), None);
        // written back as it was read
        assert_eq!(Record::active(id(1), borrow.to_fields()).to_line(), line);
    }

    #[test]
    fn header_without_member_is_rejected() {
        let line = "1|x|01/03/2024|08/03/2024|0|borrowing|A";
        let record = Record::parse(line, Borrow::MIN_FIELDS).unwrap();

        assert_eq!(Borrow::from_record(&record).unwrap_err().index, 0);
    }

    #[test]
    fn legacy_item_row_decodes() {
        let record = Record::parse("4|1|3|คืนแล้ว|15|A", BorrowItem::MIN_FIELDS).unwrap();

        let item = BorrowItem::from_record(&record).unwrap();

        assert_eq!(item.borrow_id, id(1));
        assert_eq!(item.book_id, id(3));
        assert_eq!(item.status, LoanStatus::Returned);
        assert_eq!(item.fine, 15);
    }

    #[test]
    fn item_with_unknown_status_is_rejected() {
        let record = Record::parse("4|1|3|lost|0|A", BorrowItem::MIN_FIELDS).unwrap();

        let error = BorrowItem::from_record(&record).unwrap_err();
        assert_eq!(error.index, 2);
    }
}
