//! Lending and returning books.
//!
//! A borrow is created through a [`BorrowDraft`], which collects up to
//! [`MAX_BOOKS_PER_BORROW`] books in memory and writes nothing until it is
//! committed. Dropping a draft cancels it.
//!
//! Every multi-file mutation writes the item file before the header file, so
//! the header's cached status can always be recomputed from the items if a
//! write is interrupted between the two.

use std::collections::{HashMap, HashSet};

use nonempty::NonEmpty;

use crate::{
    domain::{fine_for, Borrow, BorrowItem, LoanDate, LoanStatus, RecordedDate},
    storage::{Library, RecordId, StoreError, Stored, UNKNOWN_BOOK, UNKNOWN_MEMBER},
};

/// The most books a member may take in one borrow.
pub const MAX_BOOKS_PER_BORROW: usize = 3;

/// The borrow and return workflow over a [`Library`].
#[derive(Debug, Clone, Copy)]
pub struct Circulation<'a> {
    library: &'a Library,
}

impl<'a> Circulation<'a> {
    /// Creates the workflow over `library`.
    #[must_use]
    pub const fn new(library: &'a Library) -> Self {
        Self { library }
    }

    /// Starts collecting books for `member_id`.
    ///
    /// # Errors
    ///
    /// Returns [`BorrowError::MemberNotFound`] if the member does not exist.
    pub fn begin_borrow(&self, member_id: RecordId) -> Result<BorrowDraft<'a>, BorrowError> {
        if !self.library.member_exists(member_id)? {
            return Err(BorrowError::MemberNotFound(member_id));
        }
        Ok(BorrowDraft {
            library: self.library,
            member_id,
            books: Vec::with_capacity(MAX_BOOKS_PER_BORROW),
        })
    }

    /// The items of a borrow that are still out.
    ///
    /// # Errors
    ///
    /// Returns [`BorrowError::BorrowNotFound`] if the borrow does not exist,
    /// or [`BorrowError::NothingToReturn`] if every item is back.
    pub fn open_items(&self, borrow_id: RecordId) -> Result<Vec<Stored<BorrowItem>>, BorrowError> {
        if !self.library.borrows().exists(borrow_id)? {
            return Err(BorrowError::BorrowNotFound(borrow_id));
        }
        let open: Vec<_> = self
            .library
            .items_of(borrow_id)?
            .into_iter()
            .filter(|item| item.is_outstanding())
            .collect();
        if open.is_empty() {
            return Err(BorrowError::NothingToReturn(borrow_id));
        }
        Ok(open)
    }

    /// Checks in the given books of a borrow on `returned`.
    ///
    /// Each returned copy is fined for every day past the borrow's due date,
    /// or not at all if the recorded due date is unreadable. The borrow's
    /// status is then recomputed from its items.
    ///
    /// # Errors
    ///
    /// Fails without writing anything if the borrow does not exist, has
    /// nothing out, or if any of `books` is not out on this borrow.
    pub fn return_books(
        &self,
        borrow_id: RecordId,
        books: &NonEmpty<RecordId>,
        returned: LoanDate,
    ) -> Result<ReturnReceipt, BorrowError> {
        let Some(mut header) = self.library.borrows().get(borrow_id)? else {
            return Err(BorrowError::BorrowNotFound(borrow_id));
        };
        let items = self.library.items_of(borrow_id)?;
        if !items.iter().any(|item| item.is_outstanding()) {
            return Err(BorrowError::NothingToReturn(borrow_id));
        }

        let mut chosen: Vec<RecordId> = Vec::with_capacity(books.len());
        let mut seen = HashSet::new();
        for &book_id in books.iter() {
            if !seen.insert(book_id) {
                continue;
            }
            let item = items
                .iter()
                .find(|item| item.book_id == book_id && item.is_outstanding());
            match item {
                Some(item) => chosen.push(item.id),
                None if items.iter().any(|item| item.book_id == book_id) => {
                    return Err(BorrowError::AlreadyReturned { borrow_id, book_id });
                }
                None => return Err(BorrowError::ItemNotFound { borrow_id, book_id }),
            }
        }

        let fine = header
            .due_date
            .date()
            .map_or(0, |due| fine_for(due, returned));
        let mut receipt_books = Vec::with_capacity(chosen.len());
        self.library.borrow_items().modify(|item| {
            if chosen.contains(&item.id) {
                item.value.status = LoanStatus::Returned;
                item.value.fine = fine;
                receipt_books.push(item.book_id);
            }
        })?;

        let status = self.library.borrow_status(borrow_id)?;
        header.value.status = status;
        self.library.borrows().update(borrow_id, &header.value)?;

        let returned_books: Vec<_> = receipt_books
            .into_iter()
            .map(|book_id| ReturnedBook {
                book_id,
                title: self.library.book_title(book_id),
                fine,
            })
            .collect();
        tracing::info!(
            "returned {} books on borrow {borrow_id}, borrow is now {status}",
            returned_books.len()
        );

        Ok(ReturnReceipt {
            borrow_id,
            due_date: header.value.due_date,
            returned_on: returned,
            books: returned_books,
            status,
        })
    }

    /// Overwrites the editable fields of a borrow header.
    ///
    /// The status is not editable: it is recomputed from the items.
    ///
    /// # Errors
    ///
    /// Returns an error if the borrow or the new member does not exist.
    pub fn update_borrow(&self, borrow_id: RecordId, edit: BorrowEdit) -> Result<(), BorrowError> {
        if !self.library.borrows().exists(borrow_id)? {
            return Err(BorrowError::BorrowNotFound(borrow_id));
        }
        if !self.library.member_exists(edit.member_id)? {
            return Err(BorrowError::MemberNotFound(edit.member_id));
        }
        let header = Borrow {
            member_id: edit.member_id,
            borrow_date: edit.borrow_date.into(),
            due_date: edit.due_date.into(),
            fine: edit.fine,
            status: self.library.borrow_status(borrow_id)?,
        };
        self.library.borrows().update(borrow_id, &header)?;
        Ok(())
    }

    /// Deletes a borrow and all of its items, returning how many items were
    /// deleted.
    ///
    /// Items go first, matched on their raw borrow id so that rows which do
    /// not otherwise decode are deleted too. An interrupted cascade leaves at
    /// worst a header with no items, which reads as fully returned.
    ///
    /// # Errors
    ///
    /// Returns [`BorrowError::BorrowNotFound`] if the borrow does not exist.
    pub fn delete_borrow(&self, borrow_id: RecordId) -> Result<usize, BorrowError> {
        if !self.library.borrows().exists(borrow_id)? {
            return Err(BorrowError::BorrowNotFound(borrow_id));
        }
        let items = self
            .library
            .borrow_items()
            .store()
            .soft_delete_where(|record| {
                record.field(0).parse::<RecordId>().ok() == Some(borrow_id)
            })?;
        self.library.borrows().delete(borrow_id)?;
        tracing::info!("deleted {items} items of borrow {borrow_id}");
        Ok(items)
    }

    /// An overview of every borrow, in file order.
    ///
    /// # Errors
    ///
    /// Returns an error if the data files cannot be read.
    pub fn summaries(&self) -> Result<Vec<BorrowSummary>, BorrowError> {
        let titles: HashMap<RecordId, String> = self
            .library
            .books()
            .active()?
            .into_iter()
            .map(|book| (book.id, book.value.title))
            .collect();
        let names: HashMap<RecordId, String> = self
            .library
            .members()
            .active()?
            .into_iter()
            .map(|member| (member.id, member.value.name))
            .collect();
        let items = self.library.borrow_items().active()?;

        let summaries = self
            .library
            .borrows()
            .active()?
            .into_iter()
            .map(|borrow| {
                let own: Vec<_> = items
                    .iter()
                    .filter(|item| item.borrow_id == borrow.id)
                    .collect();
                let books_out = own
                    .iter()
                    .filter(|item| item.is_outstanding())
                    .map(|item| {
                        titles
                            .get(&item.book_id)
                            .cloned()
                            .unwrap_or_else(|| UNKNOWN_BOOK.to_string())
                    })
                    .collect::<Vec<_>>();
                BorrowSummary {
                    id: borrow.id,
                    member_name: names
                        .get(&borrow.member_id)
                        .cloned()
                        .unwrap_or_else(|| UNKNOWN_MEMBER.to_string()),
                    status: LoanStatus::from_outstanding(!books_out.is_empty()),
                    books_out,
                    total_fine: own.iter().map(|item| u64::from(item.fine)).sum(),
                    borrow: borrow.value,
                }
            })
            .collect();
        Ok(summaries)
    }

    /// Borrows that still have books out.
    ///
    /// # Errors
    ///
    /// Returns an error if the data files cannot be read.
    pub fn outstanding(&self) -> Result<Vec<BorrowSummary>, BorrowError> {
        Ok(self
            .summaries()?
            .into_iter()
            .filter(|summary| summary.status == LoanStatus::Borrowing)
            .collect())
    }
}

/// A borrow being assembled; nothing is written until [`Self::commit`].
#[derive(Debug)]
pub struct BorrowDraft<'a> {
    library: &'a Library,
    member_id: RecordId,
    books: Vec<RecordId>,
}

impl BorrowDraft<'_> {
    /// The borrowing member.
    #[must_use]
    pub const fn member_id(&self) -> RecordId {
        self.member_id
    }

    /// The books selected so far.
    #[must_use]
    pub fn books(&self) -> &[RecordId] {
        &self.books
    }

    /// Whether no more books can be added.
    #[must_use]
    pub fn is_full(&self) -> bool {
        self.books.len() >= MAX_BOOKS_PER_BORROW
    }

    /// Adds a book to the draft.
    ///
    /// Availability is checked against the files as they are now; it is not
    /// checked again on commit.
    ///
    /// # Errors
    ///
    /// Fails if the draft is full, the book is already selected, does not
    /// exist, or has no copy on the shelf. The draft is unchanged on failure.
    pub fn select(&mut self, book_id: RecordId) -> Result<Selection, BorrowError> {
        if self.is_full() {
            return Err(BorrowError::BookLimitReached(MAX_BOOKS_PER_BORROW));
        }
        if self.books.contains(&book_id) {
            return Err(BorrowError::AlreadySelected(book_id));
        }
        let Some(available) = self.library.available_copies(book_id)? else {
            return Err(BorrowError::BookNotFound(book_id));
        };
        if available <= 0 {
            return Err(BorrowError::BookUnavailable(book_id));
        }

        self.books.push(book_id);
        Ok(Selection {
            book_id,
            title: self.library.book_title(book_id),
            remaining: available - 1,
        })
    }

    /// Writes the borrow header and one item per selected book.
    ///
    /// # Errors
    ///
    /// Returns [`BorrowError::NoBooksSelected`] for an empty draft, or an
    /// error if the data files cannot be written. A failure while writing
    /// items can leave the header without all of its items.
    pub fn commit(self, borrow_date: LoanDate) -> Result<BorrowReceipt, BorrowError> {
        let Some(books) = NonEmpty::from_vec(self.books) else {
            return Err(BorrowError::NoBooksSelected);
        };

        let header = Borrow::starting(self.member_id, borrow_date);
        let borrow_id = self.library.borrows().add(&header)?;
        for &book_id in books.iter() {
            self.library
                .borrow_items()
                .add(&BorrowItem::lent(borrow_id, book_id))?;
        }
        tracing::info!(
            "member {} borrowed {} books (borrow {borrow_id}, due {})",
            self.member_id,
            books.len(),
            header.due_date
        );

        Ok(BorrowReceipt {
            borrow_id,
            member_id: self.member_id,
            borrow_date,
            due_date: borrow_date.due_date(),
            books,
        })
    }
}

/// A book accepted into a draft.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Selection {
    /// The book.
    pub book_id: RecordId,
    /// Its title.
    pub title: String,
    /// Copies left on the shelf once this borrow is committed.
    pub remaining: i64,
}

/// The outcome of a committed borrow.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BorrowReceipt {
    /// The new borrow.
    pub borrow_id: RecordId,
    /// The borrowing member.
    pub member_id: RecordId,
    /// When the books were taken.
    pub borrow_date: LoanDate,
    /// When they are due back.
    pub due_date: LoanDate,
    /// The books lent.
    pub books: NonEmpty<RecordId>,
}

/// The outcome of a return.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReturnReceipt {
    /// The borrow the books belonged to.
    pub borrow_id: RecordId,
    /// When the books were due.
    pub due_date: RecordedDate,
    /// When they came back.
    pub returned_on: LoanDate,
    /// The books checked in.
    pub books: Vec<ReturnedBook>,
    /// The borrow's status after the return.
    pub status: LoanStatus,
}

impl ReturnReceipt {
    /// Sum of the fines charged on this return.
    #[must_use]
    pub fn total_fine(&self) -> u64 {
        self.books.iter().map(|book| u64::from(book.fine)).sum()
    }
}

/// One book checked in by a return.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReturnedBook {
    /// The book.
    pub book_id: RecordId,
    /// Its title.
    pub title: String,
    /// Fine charged for this copy.
    pub fine: u32,
}

/// New values for the editable fields of a borrow header.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BorrowEdit {
    /// The borrowing member.
    pub member_id: RecordId,
    /// When the books were taken.
    pub borrow_date: LoanDate,
    /// When they are due back.
    pub due_date: LoanDate,
    /// Header-level fine.
    pub fine: u32,
}

/// One row of the borrow listing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BorrowSummary {
    /// The borrow id.
    pub id: RecordId,
    /// The header as stored.
    pub borrow: Borrow,
    /// The borrowing member's name.
    pub member_name: String,
    /// Titles still out.
    pub books_out: Vec<String>,
    /// Status derived from the items.
    pub status: LoanStatus,
    /// Fines charged across all items.
    pub total_fine: u64,
}

/// Errors raised by the borrow workflow.
#[derive(Debug, thiserror::Error)]
pub enum BorrowError {
    /// No active member has this id.
    #[error("member {0} not found")]
    MemberNotFound(RecordId),
    /// No active book has this id.
    #[error("book {0} not found")]
    BookNotFound(RecordId),
    /// Every copy of the book is out.
    #[error("book {0} has no copies available")]
    BookUnavailable(RecordId),
    /// The book is already part of this borrow.
    #[error("book {0} is already selected")]
    AlreadySelected(RecordId),
    /// The draft holds the maximum number of books.
    #[error("a borrow may contain at most {0} books")]
    BookLimitReached(usize),
    /// A borrow needs at least one book.
    #[error("no books selected")]
    NoBooksSelected,
    /// No active borrow has this id.
    #[error("borrow {0} not found")]
    BorrowNotFound(RecordId),
    /// Every book of the borrow has been returned.
    #[error("borrow {0} has no books left to return")]
    NothingToReturn(RecordId),
    /// The book is not part of the borrow.
    #[error("book {book_id} is not part of borrow {borrow_id}")]
    ItemNotFound {
        /// The borrow.
        borrow_id: RecordId,
        /// The book.
        book_id: RecordId,
    },
    /// The book was part of the borrow but has already come back.
    #[error("book {book_id} of borrow {borrow_id} has already been returned")]
    AlreadyReturned {
        /// The borrow.
        borrow_id: RecordId,
        /// The book.
        book_id: RecordId,
    },
    /// The underlying data files failed.
    #[error(transparent)]
    Store(#[from] StoreError),
}
