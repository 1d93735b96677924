//! A single delimited row of a data file.

use std::{fmt, num::NonZeroU32, str::FromStr};

use serde::{Serialize, Serializer};

/// Separator between the fields of a row.
pub const DELIMITER: char = '|';

/// The positive integer that identifies a record within one data file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct RecordId(NonZeroU32);

impl RecordId {
    /// The first id handed out in an empty file.
    pub const FIRST: Self = Self(NonZeroU32::MIN);

    /// Creates an id from a raw integer.
    ///
    /// # Errors
    ///
    /// Returns an error if `value` is zero.
    pub const fn new(value: u32) -> Result<Self, InvalidId> {
        match NonZeroU32::new(value) {
            Some(id) => Ok(Self(id)),
            None => Err(InvalidId::Zero),
        }
    }

    /// The raw integer value.
    #[must_use]
    pub const fn get(self) -> u32 {
        self.0.get()
    }

    /// The id following this one, or `None` past `u32::MAX`.
    #[must_use]
    pub const fn next(self) -> Option<Self> {
        match self.0.checked_add(1) {
            Some(next) => Some(Self(next)),
            None => None,
        }
    }
}

impl fmt::Display for RecordId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl Serialize for RecordId {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_u32(self.get())
    }
}

impl FromStr for RecordId {
    type Err = InvalidId;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let value: u32 = s
            .trim()
            .parse()
            .map_err(|_| InvalidId::NotANumber(s.to_string()))?;
        Self::new(value)
    }
}

impl TryFrom<u32> for RecordId {
    type Error = InvalidId;

    fn try_from(value: u32) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

/// Error returned when parsing a [`RecordId`].
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum InvalidId {
    /// The text was not a non-negative integer.
    #[error("invalid id '{0}': expected a positive integer")]
    NotANumber(String),
    /// Ids start at 1.
    #[error("invalid id: cannot be zero")]
    Zero,
}

/// The soft-delete marker stored in the last field of every row.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Status {
    /// A live record.
    Active,
    /// A tombstoned record whose row may be overwritten by the next insert.
    Deleted,
}

impl Status {
    /// The on-disk marker.
    #[must_use]
    pub const fn marker(self) -> &'static str {
        match self {
            Self::Active => "A",
            Self::Deleted => "D",
        }
    }

    fn from_marker(marker: &str) -> Option<Self> {
        match marker {
            "A" => Some(Self::Active),
            "D" => Some(Self::Deleted),
            _ => None,
        }
    }
}

/// One row of a data file: `id|field1|...|fieldN|status`.
///
/// The raw cells are kept as read so that rows which cannot be interpreted
/// survive a rewrite unchanged.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Record {
    cells: Vec<String>,
}

impl Record {
    /// Builds an active record from an id and its data fields.
    #[must_use]
    pub fn active(id: RecordId, fields: Vec<String>) -> Self {
        let mut cells = Vec::with_capacity(fields.len() + 2);
        cells.push(id.to_string());
        cells.extend(fields);
        cells.push(Status::Active.marker().to_string());
        Self { cells }
    }

    /// Parses a line, padding it with empty cells up to `min_fields`.
    ///
    /// Returns `None` for blank lines.
    #[must_use]
    pub fn parse(line: &str, min_fields: usize) -> Option<Self> {
        let line = line.trim();
        if line.is_empty() {
            return None;
        }
        let mut cells: Vec<String> = line.split(DELIMITER).map(str::to_string).collect();
        if cells.len() < min_fields {
            cells.resize(min_fields, String::new());
        }
        Some(Self { cells })
    }

    /// The id in the first cell, if it parses.
    #[must_use]
    pub fn id(&self) -> Option<RecordId> {
        self.cells.first()?.parse().ok()
    }

    /// The soft-delete status, if the last cell is a known marker.
    #[must_use]
    pub fn status(&self) -> Option<Status> {
        self.cells.last().and_then(|marker| Status::from_marker(marker))
    }

    /// Whether this row is live.
    #[must_use]
    pub fn is_active(&self) -> bool {
        self.status() == Some(Status::Active)
    }

    /// Whether this row is a tombstone.
    #[must_use]
    pub fn is_deleted(&self) -> bool {
        self.status() == Some(Status::Deleted)
    }

    /// Whether this row is the live record with the given id.
    #[must_use]
    pub fn is_active_with_id(&self, id: RecordId) -> bool {
        self.is_active() && self.id() == Some(id)
    }

    /// The data fields between the id and the status marker.
    #[must_use]
    pub fn fields(&self) -> &[String] {
        match self.cells.len() {
            0..=2 => &[],
            len => &self.cells[1..len - 1],
        }
    }

    /// The `index`th data field, or `""` if the row is too short.
    #[must_use]
    pub fn field(&self, index: usize) -> &str {
        self.fields().get(index).map_or("", |field| field.trim())
    }

    /// Replaces the data fields and marks the record active, keeping its id.
    pub fn set_fields(&mut self, fields: Vec<String>) {
        let id = self.cells.first().cloned().unwrap_or_default();
        self.cells = Vec::with_capacity(fields.len() + 2);
        self.cells.push(id);
        self.cells.extend(fields);
        self.cells.push(Status::Active.marker().to_string());
    }

    /// Flips the status marker.
    pub fn set_status(&mut self, status: Status) {
        let marker = status.marker().to_string();
        if self.cells.len() > 1 {
            if let Some(last) = self.cells.last_mut() {
                *last = marker;
            }
        } else {
            self.cells.push(marker);
        }
    }

    /// Serializes the row without a trailing newline.
    #[must_use]
    pub fn to_line(&self) -> String {
        let mut separator = [0; 4];
        self.cells.join(DELIMITER.encode_utf8(&mut separator))
    }
}
