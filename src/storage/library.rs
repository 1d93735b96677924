//! A directory of library data files.
//!
//! The [`Library`] owns one [`Repository`] per entity kind and answers the
//! questions that span more than one file, such as how many copies of a book
//! are on the shelf.

use std::{
    collections::HashMap,
    path::{Path, PathBuf},
};

use super::{
    record::RecordId,
    record_store::StoreError,
    repository::{Repository, Stored},
};
use crate::domain::{Book, Borrow, BorrowItem, Config, LoanStatus, Member};

/// Shown in place of a title when a book id does not resolve.
pub const UNKNOWN_BOOK: &str = "Unknown book";

/// Shown in place of a name when a member id does not resolve.
pub const UNKNOWN_MEMBER: &str = "Unknown member";

/// Name of the configuration file inside a data directory.
pub const CONFIG_FILE: &str = "config.toml";

/// A filesystem backed store of books, members and borrows.
#[derive(Debug, Clone)]
pub struct Library {
    root: PathBuf,
    config: Config,
    books: Repository<Book>,
    members: Repository<Member>,
    borrows: Repository<Borrow>,
    items: Repository<BorrowItem>,
}

/// Stock levels of one book.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Availability {
    /// The book.
    pub book: Stored<Book>,
    /// Copies currently out on loan.
    pub borrowed: u32,
}

impl Availability {
    /// Copies on the shelf.
    ///
    /// Negative if the copy count was lowered below the number on loan.
    #[must_use]
    pub fn available(&self) -> i64 {
        i64::from(self.book.total_copies) - i64::from(self.borrowed)
    }
}

impl Library {
    /// Opens the data directory at `root`, reading `config.toml` if present.
    #[must_use]
    pub fn open(root: PathBuf) -> Self {
        let config = Config::load_or_default(&root.join(CONFIG_FILE));
        Self::with_config(root, config)
    }

    /// Opens the data directory at `root` with an explicit configuration.
    #[must_use]
    pub fn with_config(root: PathBuf, config: Config) -> Self {
        Self {
            books: Repository::open(&root),
            members: Repository::open(&root),
            borrows: Repository::open(&root),
            items: Repository::open(&root),
            root,
            config,
        }
    }

    /// The data directory.
    #[must_use]
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// The active configuration.
    #[must_use]
    pub const fn config(&self) -> &Config {
        &self.config
    }

    /// The book repository.
    #[must_use]
    pub const fn books(&self) -> &Repository<Book> {
        &self.books
    }

    /// The member repository.
    #[must_use]
    pub const fn members(&self) -> &Repository<Member> {
        &self.members
    }

    /// The borrow header repository.
    #[must_use]
    pub const fn borrows(&self) -> &Repository<Borrow> {
        &self.borrows
    }

    /// The borrow item repository.
    #[must_use]
    pub const fn borrow_items(&self) -> &Repository<BorrowItem> {
        &self.items
    }

    /// Adds a book to the catalogue.
    ///
    /// # Errors
    ///
    /// Returns an error if the book has no copies or the catalogue cannot be
    /// written.
    pub fn add_book(&self, book: &Book) -> Result<RecordId, LibraryError> {
        validate_copies(book)?;
        Ok(self.books.add(book)?)
    }

    /// Replaces the details of a book.
    ///
    /// # Errors
    ///
    /// Returns an error if the book has no copies, does not exist, or the
    /// catalogue cannot be written.
    pub fn update_book(&self, id: RecordId, book: &Book) -> Result<(), LibraryError> {
        validate_copies(book)?;
        Ok(self.books.update(id, book)?)
    }

    /// Removes a book from the catalogue.
    ///
    /// Refused while copies are out on loan, unless the configuration allows
    /// deleting referenced records.
    ///
    /// # Errors
    ///
    /// Returns an error if copies are on loan, the book does not exist, or
    /// the catalogue cannot be written.
    pub fn delete_book(&self, id: RecordId) -> Result<(), LibraryError> {
        let copies = self.borrowed_count(id)?;
        if copies > 0 {
            if !self.config.allow_deleting_referenced {
                tracing::warn!("refusing to delete book {id}: {copies} copies on loan");
                return Err(LibraryError::BookOnLoan { id, copies });
            }
            tracing::warn!("deleting book {id} with {copies} copies on loan");
        }
        Ok(self.books.delete(id)?)
    }

    /// Registers a member.
    ///
    /// # Errors
    ///
    /// Returns an error if the member file cannot be written.
    pub fn add_member(&self, member: &Member) -> Result<RecordId, LibraryError> {
        Ok(self.members.add(member)?)
    }

    /// Replaces the details of a member.
    ///
    /// # Errors
    ///
    /// Returns an error if the member does not exist or the member file
    /// cannot be written.
    pub fn update_member(&self, id: RecordId, member: &Member) -> Result<(), LibraryError> {
        Ok(self.members.update(id, member)?)
    }

    /// Removes a member.
    ///
    /// Refused while the member has books out, unless the configuration
    /// allows deleting referenced records.
    ///
    /// # Errors
    ///
    /// Returns an error if the member has books out, does not exist, or the
    /// member file cannot be written.
    pub fn delete_member(&self, id: RecordId) -> Result<(), LibraryError> {
        let borrows = self.open_borrows_of(id)?;
        if !borrows.is_empty() {
            if !self.config.allow_deleting_referenced {
                tracing::warn!("refusing to delete member {id}: {} open borrows", borrows.len());
                return Err(LibraryError::MemberHasLoans { id, borrows });
            }
            tracing::warn!("deleting member {id} with {} open borrows", borrows.len());
        }
        Ok(self.members.delete(id)?)
    }

    /// Whether an active book with this id exists.
    ///
    /// # Errors
    ///
    /// Returns an error if the catalogue cannot be read.
    pub fn book_exists(&self, id: RecordId) -> Result<bool, StoreError> {
        self.books.exists(id)
    }

    /// Whether an active member with this id exists.
    ///
    /// # Errors
    ///
    /// Returns an error if the member file cannot be read.
    pub fn member_exists(&self, id: RecordId) -> Result<bool, StoreError> {
        self.members.exists(id)
    }

    /// Number of copies of `book_id` currently out on loan.
    ///
    /// # Errors
    ///
    /// Returns an error if the item file cannot be read.
    pub fn borrowed_count(&self, book_id: RecordId) -> Result<u32, StoreError> {
        let count = self
            .items
            .active()?
            .iter()
            .filter(|item| item.book_id == book_id && item.is_outstanding())
            .count();
        Ok(u32::try_from(count).unwrap_or(u32::MAX))
    }

    /// Copies of `book_id` on the shelf, or `None` if there is no such book.
    ///
    /// # Errors
    ///
    /// Returns an error if the catalogue or item file cannot be read.
    pub fn available_copies(&self, book_id: RecordId) -> Result<Option<i64>, StoreError> {
        let Some(book) = self.books.get(book_id)? else {
            return Ok(None);
        };
        let borrowed = self.borrowed_count(book_id)?;
        Ok(Some(Availability { book, borrowed }.available()))
    }

    /// Stock levels of every book in the catalogue.
    ///
    /// # Errors
    ///
    /// Returns an error if the catalogue or item file cannot be read.
    pub fn inventory(&self) -> Result<Vec<Availability>, StoreError> {
        let mut borrowed: HashMap<RecordId, u32> = HashMap::new();
        for item in self.items.active()? {
            if item.is_outstanding() {
                *borrowed.entry(item.book_id).or_insert(0) += 1;
            }
        }

        Ok(self
            .books
            .active()?
            .into_iter()
            .map(|book| Availability {
                borrowed: borrowed.get(&book.id).copied().unwrap_or(0),
                book,
            })
            .collect())
    }

    /// Books with at least one copy on the shelf.
    ///
    /// # Errors
    ///
    /// Returns an error if the catalogue or item file cannot be read.
    pub fn available_books(&self) -> Result<Vec<Availability>, StoreError> {
        Ok(self
            .inventory()?
            .into_iter()
            .filter(|stock| stock.available() > 0)
            .collect())
    }

    /// The title of a book, or [`UNKNOWN_BOOK`].
    #[must_use]
    pub fn book_title(&self, id: RecordId) -> String {
        match self.books.get(id) {
            Ok(Some(book)) => book.value.title,
            Ok(None) => UNKNOWN_BOOK.to_string(),
            Err(e) => {
                tracing::debug!("could not look up book {id}: {e}");
                UNKNOWN_BOOK.to_string()
            }
        }
    }

    /// The name of a member, or [`UNKNOWN_MEMBER`].
    #[must_use]
    pub fn member_name(&self, id: RecordId) -> String {
        match self.members.get(id) {
            Ok(Some(member)) => member.value.name,
            Ok(None) => UNKNOWN_MEMBER.to_string(),
            Err(e) => {
                tracing::debug!("could not look up member {id}: {e}");
                UNKNOWN_MEMBER.to_string()
            }
        }
    }

    /// The active items of a borrow, in file order.
    ///
    /// # Errors
    ///
    /// Returns an error if the item file cannot be read.
    pub fn items_of(&self, borrow_id: RecordId) -> Result<Vec<Stored<BorrowItem>>, StoreError> {
        Ok(self
            .items
            .active()?
            .into_iter()
            .filter(|item| item.borrow_id == borrow_id)
            .collect())
    }

    /// The status of a borrow, derived from its items.
    ///
    /// The cached status on the header is ignored: a borrow is returned
    /// exactly when none of its active items is still out.
    ///
    /// # Errors
    ///
    /// Returns an error if the item file cannot be read.
    pub fn borrow_status(&self, borrow_id: RecordId) -> Result<LoanStatus, StoreError> {
        let outstanding = self
            .items_of(borrow_id)?
            .iter()
            .any(|item| item.is_outstanding());
        Ok(LoanStatus::from_outstanding(outstanding))
    }

    /// Ids of the member's borrows that still have books out.
    fn open_borrows_of(&self, member_id: RecordId) -> Result<Vec<RecordId>, StoreError> {
        let items = self.items.active()?;
        Ok(self
            .borrows
            .active()?
            .into_iter()
            .filter(|borrow| borrow.member_id == member_id)
            .filter(|borrow| {
                items
                    .iter()
                    .any(|item| item.borrow_id == borrow.id && item.is_outstanding())
            })
            .map(|borrow| borrow.id)
            .collect())
    }
}

fn validate_copies(book: &Book) -> Result<(), LibraryError> {
    if book.total_copies == 0 {
        return Err(LibraryError::NoCopies);
    }
    Ok(())
}

/// Errors raised by catalogue and membership operations.
#[derive(Debug, thiserror::Error)]
pub enum LibraryError {
    /// A book must have at least one copy.
    #[error("total copies must be greater than zero")]
    NoCopies,
    /// The book cannot be removed while copies are out.
    #[error("book {id} has {copies} copies out on loan")]
    BookOnLoan {
        /// The book.
        id: RecordId,
        /// Copies out.
        copies: u32,
    },
    /// The member cannot be removed while they have books out.
    #[error("member {id} still has books out (borrows: {})", join_ids(borrows))]
    MemberHasLoans {
        /// The member.
        id: RecordId,
        /// Borrows with books still out.
        borrows: Vec<RecordId>,
    },
    /// The underlying data files failed.
    #[error(transparent)]
    Store(#[from] StoreError),
}

fn join_ids(ids: &[RecordId]) -> String {
    ids.iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(", ")
}

#[cfg(test)]
mod tests {
    use tempfile::TempDir;

    use super::*;
    use crate::domain::LoanDate;

    fn setup_library() -> (TempDir, Library) {
        let tmp = TempDir::new().expect("failed to create temp dir");
        let library = Library::open(tmp.path().to_path_buf());
        (tmp, library)
    }

    fn lend(library: &Library, member: RecordId, books: &[RecordId]) -> RecordId {
        let date: LoanDate = "01/03/2024".parse().unwrap();
        let borrow = library.borrows().add(&Borrow::starting(member, date)).unwrap();
        for &book in books {
            library
                .borrow_items()
                .add(&BorrowItem::lent(borrow, book))
                .unwrap();
        }
        borrow
    }

    #[test]
    fn books_round_trip_through_files() {
        let (tmp, library) = setup_library();
        let id = library.add_book(&Book::new("Dune", "Herbert", 2)).unwrap();

        let reopened = Library::open(tmp.path().to_path_buf());
        let book = reopened.books().get(id).unwrap().unwrap();

        assert_eq!(book.value, Book::new("Dune", "Herbert", 2));
        assert_eq!(
            std::fs::read_to_string(tmp.path().join("books.txt")).unwrap(),
            "1|Dune|Herbert|2|A\n"
        );
    }

    #[test]
    fn zero_copies_are_rejected() {
        let (_tmp, library) = setup_library();
        let id = library.add_book(&Book::new("Dune", "Herbert", 1)).unwrap();

        assert!(matches!(
            library.add_book(&Book::new("Emma", "Austen", 0)),
            Err(LibraryError::NoCopies)
        ));
        assert!(matches!(
            library.update_book(id, &Book::new("Dune", "Herbert", 0)),
            Err(LibraryError::NoCopies)
        ));
    }

    #[test]
    fn available_copies_subtracts_outstanding_items() {
        let (_tmp, library) = setup_library();
        let member = library.add_member(&Member::new("Ann", "081")).unwrap();
        let book = library.add_book(&Book::new("Dune", "Herbert", 3)).unwrap();
        lend(&library, member, &[book]);
        lend(&library, member, &[book]);

        assert_eq!(library.borrowed_count(book).unwrap(), 2);
        assert_eq!(library.available_copies(book).unwrap(), Some(1));
    }

    #[test]
    fn available_copies_of_missing_book_is_none() {
        let (_tmp, library) = setup_library();
        assert_eq!(
            library.available_copies(RecordId::FIRST).unwrap(),
            None
        );
    }

    #[test]
    fn display_names_fall_back_to_sentinels() {
        let (_tmp, library) = setup_library();
        let member = library.add_member(&Member::new("Ann", "081")).unwrap();
        let missing = RecordId::new(42).unwrap();

        assert_eq!(library.member_name(member), "Ann");
        assert_eq!(library.member_name(missing), UNKNOWN_MEMBER);
        assert_eq!(library.book_title(missing), UNKNOWN_BOOK);
    }

    #[test]
    fn deleted_records_leave_listings() {
        let (_tmp, library) = setup_library();
        let ann = library.add_member(&Member::new("Ann", "081")).unwrap();
        library.add_member(&Member::new("Ben", "082")).unwrap();

        library.delete_member(ann).unwrap();

        let names: Vec<_> = library
            .members()
            .active()
            .unwrap()
            .into_iter()
            .map(|m| m.value.name)
            .collect();
        assert_eq!(names, ["Ben"]);
        assert!(!library.member_exists(ann).unwrap());
    }

    #[test]
    fn book_on_loan_cannot_be_deleted() {
        let (_tmp, library) = setup_library();
        let member = library.add_member(&Member::new("Ann", "081")).unwrap();
        let book = library.add_book(&Book::new("Dune", "Herbert", 1)).unwrap();
        lend(&library, member, &[book]);

        assert!(matches!(
            library.delete_book(book),
            Err(LibraryError::BookOnLoan { copies: 1, .. })
        ));
        assert!(library.book_exists(book).unwrap());
    }

    #[test]
    fn member_with_loans_cannot_be_deleted() {
        let (_tmp, library) = setup_library();
        let member = library.add_member(&Member::new("Ann", "081")).unwrap();
        let book = library.add_book(&Book::new("Dune", "Herbert", 1)).unwrap();
        let borrow = lend(&library, member, &[book]);

        let error = library.delete_member(member).unwrap_err();

        assert!(
            matches!(error, LibraryError::MemberHasLoans { ref borrows, .. } if borrows == &[borrow])
        );
    }

    #[test]
    fn override_allows_deleting_referenced_records() {
        let tmp = TempDir::new().unwrap();
        let mut config = Config::default();
        config.allow_deleting_referenced = true;
        let library = Library::with_config(tmp.path().to_path_buf(), config);
        let member = library.add_member(&Member::new("Ann", "081")).unwrap();
        let book = library.add_book(&Book::new("Dune", "Herbert", 1)).unwrap();
        lend(&library, member, &[book]);

        library.delete_book(book).unwrap();
        library.delete_member(member).unwrap();

        assert!(!library.book_exists(book).unwrap());
        assert!(!library.member_exists(member).unwrap());
    }

    #[test]
    fn borrow_status_ignores_stale_header() {
        let (_tmp, library) = setup_library();
        let member = library.add_member(&Member::new("Ann", "081")).unwrap();
        let book = library.add_book(&Book::new("Dune", "Herbert", 1)).unwrap();
        let borrow = lend(&library, member, &[book]);

        library
            .borrow_items()
            .modify(|item| item.value.status = LoanStatus::Returned)
            .unwrap();

        // the header still says "borrowing"
        let header = library.borrows().get(borrow).unwrap().unwrap();
        assert_eq!(header.status, LoanStatus::Borrowing);
        assert_eq!(library.borrow_status(borrow).unwrap(), LoanStatus::Returned);
    }

    #[test]
    fn undecodable_rows_are_skipped_but_preserved() {
        let (tmp, library) = setup_library();
        std::fs::write(
            tmp.path().join("borrow_items.txt"),
            "1|1|1|borrowing|0|A\n2|x|1|borrowing|0|A\n",
        )
        .unwrap();

        assert_eq!(library.borrowed_count(RecordId::FIRST).unwrap(), 1);

        library
            .borrow_items()
            .modify(|item| item.value.status = LoanStatus::Returned)
            .unwrap();
        assert_eq!(
            std::fs::read_to_string(tmp.path().join("borrow_items.txt")).unwrap(),
            "1|1|1|returned|0|A\n2|x|1|borrowing|0|A\n"
        );
    }
}
