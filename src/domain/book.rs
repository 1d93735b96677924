use serde::Serialize;

use crate::storage::{DecodeError, Entity, Record};

/// A title held by the library, with the number of physical copies owned.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Book {
    /// The book's title.
    pub title: String,
    /// The book's author.
    pub author: String,
    /// How many copies the library owns.
    ///
    /// This is the physical inventory; copies out on loan are still counted.
    pub total_copies: u32,
}

impl Book {
    /// Creates a book.
    #[must_use]
    pub fn new(title: impl Into<String>, author: impl Into<String>, total_copies: u32) -> Self {
        Self {
            title: title.into(),
            author: author.into(),
            total_copies,
        }
    }
}

impl Entity for Book {
    const KIND: &'static str = "book";
    const FILE_NAME: &'static str = "books.txt";
    const MIN_FIELDS: usize = 5;

    fn to_fields(&self) -> Vec<String> {
        vec![
            self.title.clone(),
            self.author.clone(),
            self.total_copies.to_string(),
        ]
    }

    fn from_record(record: &Record) -> Result<Self, DecodeError> {
        // an unreadable copy count means no copies can be lent
        let total_copies = record.field(2).parse().unwrap_or(0);
        Ok(Self {
            title: record.field(0).to_string(),
            author: record.field(1).to_string(),
            total_copies,
        })
    }
}
