use std::{convert::Infallible, fmt, str::FromStr, sync::LazyLock};

use chrono::{Days, NaiveDate};
use regex::Regex;
use serde::{Serialize, Serializer};

/// Number of days a book may be kept before fines accrue.
pub const LOAN_PERIOD_DAYS: u64 = 7;

/// Fine charged for each day a book is returned late.
pub const FINE_PER_DAY: u32 = 5;

const FORMAT: &str = "%d/%m/%Y";

static SHAPE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\d{2}/\d{2}/\d{4}$").expect("date pattern is valid"));

/// A calendar date written as `dd/mm/yyyy`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct LoanDate(NaiveDate);

impl LoanDate {
    /// Wraps a calendar date.
    #[must_use]
    pub const fn new(date: NaiveDate) -> Self {
        Self(date)
    }

    /// Builds a date from its components.
    ///
    /// # Errors
    ///
    /// Returns an error if the components do not form a valid date.
    pub fn from_ymd(year: i32, month: u32, day: u32) -> Result<Self, DateError> {
        NaiveDate::from_ymd_opt(year, month, day)
            .map(Self)
            .ok_or_else(|| DateError::Invalid(format!("{day:02}/{month:02}/{year:04}")))
    }

    /// Today's date in the local timezone.
    #[must_use]
    pub fn today() -> Self {
        Self(chrono::Local::now().date_naive())
    }

    /// The underlying calendar date.
    #[must_use]
    pub const fn as_naive(self) -> NaiveDate {
        self.0
    }

    /// The date `days` days later.
    #[must_use]
    pub fn plus_days(self, days: u64) -> Self {
        Self(self.0.checked_add_days(Days::new(days)).unwrap_or(self.0))
    }

    /// The due date of a loan starting on this date.
    #[must_use]
    pub fn due_date(self) -> Self {
        self.plus_days(LOAN_PERIOD_DAYS)
    }

    /// Signed number of days from `earlier` to `self`.
    #[must_use]
    pub fn days_since(self, earlier: Self) -> i64 {
        (self.0 - earlier.0).num_days()
    }
}

/// The fine for returning a book on `returned` when it was due on `due`.
///
/// Nothing is charged for on-time or early returns.
#[must_use]
pub fn fine_for(due: LoanDate, returned: LoanDate) -> u32 {
    let days_late = u32::try_from(returned.days_since(due).max(0)).unwrap_or(u32::MAX);
    days_late.saturating_mul(FINE_PER_DAY)
}

impl fmt::Display for LoanDate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0.format(FORMAT))
    }
}

impl Serialize for LoanDate {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl FromStr for LoanDate {
    type Err = DateError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if !SHAPE.is_match(s) {
            return Err(DateError::Format(s.to_string()));
        }
        NaiveDate::parse_from_str(s, FORMAT)
            .map(Self)
            .map_err(|_| DateError::Invalid(s.to_string()))
    }
}

/// A date as written in a data file.
///
/// Older files may hold dates in other shapes. Those are kept verbatim so the
/// row stays usable and is written back unchanged.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum RecordedDate {
    /// A valid `dd/mm/yyyy` date.
    Valid(LoanDate),
    /// Text that is not a valid date.
    Unreadable(String),
}

impl RecordedDate {
    /// The date, if the text was valid.
    #[must_use]
    pub const fn date(&self) -> Option<LoanDate> {
        match self {
            Self::Valid(date) => Some(*date),
            Self::Unreadable(_) => None,
        }
    }
}

impl From<LoanDate> for RecordedDate {
    fn from(date: LoanDate) -> Self {
        Self::Valid(date)
    }
}

impl fmt::Display for RecordedDate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Valid(date) => date.fmt(f),
            Self::Unreadable(raw) => f.write_str(raw),
        }
    }
}

impl Serialize for RecordedDate {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl From<&str> for RecordedDate {
    fn from(s: &str) -> Self {
        s.parse::<LoanDate>()
            .map_or_else(|_| Self::Unreadable(s.to_string()), Self::Valid)
    }
}

impl FromStr for RecordedDate {
    type Err = Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Self::from(s))
    }
}

/// Error returned when parsing a [`LoanDate`].
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum DateError {
    /// The text is not shaped like `dd/mm/yyyy`.
    #[error("invalid date '{0}': expected dd/mm/yyyy")]
    Format(String),
    /// The text is shaped correctly but names no calendar day.
    #[error("invalid date '{0}': no such day")]
    Invalid(String),
}
