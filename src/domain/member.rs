use serde::Serialize;

use crate::storage::{DecodeError, Entity, Record};

/// A registered borrower.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Member {
    /// The member's name.
    pub name: String,
    /// Contact phone number, stored as entered.
    pub phone: String,
}

impl Member {
    /// Creates a member.
    #[must_use]
    pub fn new(name: impl Into<String>, phone: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            phone: phone.into(),
        }
    }
}

impl Entity for Member {
    const KIND: &'static str = "member";
    const FILE_NAME: &'static str = "members.txt";
    const MIN_FIELDS: usize = 4;

    fn to_fields(&self) -> Vec<String> {
        vec![self.name.clone(), self.phone.clone()]
    }

    fn from_record(record: &Record) -> Result<Self, DecodeError> {
        Ok(Self {
            name: record.field(0).to_string(),
            phone: record.field(1).to_string(),
        })
    }
}
