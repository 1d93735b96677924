//! A read-only summary of the library's holdings, loans and fines.

use std::collections::HashMap;

use serde::Serialize;

use crate::{
    domain::{LoanDate, LoanStatus, RecordedDate},
    storage::{Library, RecordId, StoreError, UNKNOWN_BOOK, UNKNOWN_MEMBER},
};

/// How many titles the popularity ranking lists.
pub const POPULAR_TITLES: usize = 5;

/// Summary of the library at a point in time.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Report {
    /// Currency fines are quoted in.
    pub currency: String,
    /// Distinct titles in the catalogue.
    pub titles: usize,
    /// Copies owned across all titles.
    pub total_copies: u64,
    /// Registered members.
    pub members: usize,
    /// Borrow transactions on record.
    pub borrows: usize,
    /// Borrows with at least one book still out.
    pub open_borrows: usize,
    /// Borrows with every book back.
    pub completed_borrows: usize,
    /// Copies out on loan.
    pub copies_on_loan: u64,
    /// Copies on the shelf.
    pub copies_on_shelf: i64,
    /// Fines charged on all items.
    pub total_fines: u64,
    /// Fines charged on returned items, not yet settled.
    pub uncollected_fines: u64,
    /// Every copy currently out.
    pub on_loan: Vec<LoanLine>,
    /// Every item carrying a fine.
    pub fines: Vec<FineLine>,
    /// The most borrowed titles, most popular first.
    pub popular: Vec<Popularity>,
}

/// One copy out on loan.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LoanLine {
    /// The borrow.
    pub borrow_id: RecordId,
    /// The borrowing member's name.
    pub member: String,
    /// The book's title.
    pub title: String,
    /// When the book was taken.
    pub borrow_date: RecordedDate,
    /// When it is due back.
    pub due_date: RecordedDate,
    /// Days past the due date as of the report date; zero or negative if not
    /// yet due, and zero if the due date is unreadable.
    pub days_overdue: i64,
}

impl LoanLine {
    /// Whether the copy is past its due date.
    #[must_use]
    pub const fn is_overdue(&self) -> bool {
        self.days_overdue > 0
    }
}

/// One fined item.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FineLine {
    /// The borrowing member's name.
    pub member: String,
    /// The book's title.
    pub title: String,
    /// The fine charged.
    pub fine: u32,
    /// Whether the copy is back.
    pub status: LoanStatus,
}

/// How often a title has been borrowed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Popularity {
    /// The book.
    pub book_id: RecordId,
    /// Its title.
    pub title: String,
    /// Items on record for the book.
    pub times_borrowed: usize,
}

impl Report {
    /// Builds the report, measuring lateness against `today`.
    ///
    /// Borrow status is derived from the items, not from the headers.
    ///
    /// # Errors
    ///
    /// Returns an error if the data files cannot be read.
    pub fn generate(library: &Library, today: LoanDate) -> Result<Self, StoreError> {
        let books = library.books().active()?;
        let members = library.members().active()?;
        let borrows = library.borrows().active()?;
        let items = library.borrow_items().active()?;

        let titles: HashMap<_, _> = books
            .iter()
            .map(|book| (book.id, book.title.as_str()))
            .collect();
        let names: HashMap<_, _> = members
            .iter()
            .map(|member| (member.id, member.name.as_str()))
            .collect();
        let headers: HashMap<_, _> = borrows.iter().map(|borrow| (borrow.id, borrow)).collect();
        let title_of = |id: &RecordId| titles.get(id).copied().unwrap_or(UNKNOWN_BOOK).to_string();
        let name_of = |id: &RecordId| names.get(id).copied().unwrap_or(UNKNOWN_MEMBER).to_string();

        let open_borrows = borrows
            .iter()
            .filter(|borrow| {
                items
                    .iter()
                    .any(|item| item.borrow_id == borrow.id && item.is_outstanding())
            })
            .count();

        let total_copies: u64 = books.iter().map(|book| u64::from(book.total_copies)).sum();
        let copies_on_loan = items.iter().filter(|item| item.is_outstanding()).count() as u64;
        let total_fines: u64 = items.iter().map(|item| u64::from(item.fine)).sum();
        let uncollected_fines: u64 = items
            .iter()
            .filter(|item| !item.is_outstanding())
            .map(|item| u64::from(item.fine))
            .sum();

        let on_loan = items
            .iter()
            .filter(|item| item.is_outstanding())
            .filter_map(|item| {
                let borrow = headers.get(&item.borrow_id)?;
                Some(LoanLine {
                    borrow_id: borrow.id,
                    member: name_of(&borrow.member_id),
                    title: title_of(&item.book_id),
                    borrow_date: borrow.borrow_date.clone(),
                    due_date: borrow.due_date.clone(),
                    days_overdue: borrow
                        .due_date
                        .date()
                        .map_or(0, |due| today.days_since(due)),
                })
            })
            .collect();

        let fines = items
            .iter()
            .filter(|item| item.fine > 0)
            .filter_map(|item| {
                let borrow = headers.get(&item.borrow_id)?;
                Some(FineLine {
                    member: name_of(&borrow.member_id),
                    title: title_of(&item.book_id),
                    fine: item.fine,
                    status: item.status,
                })
            })
            .collect();

        // first-appearance order breaks ties
        let mut counts: Vec<(RecordId, usize)> = Vec::new();
        for item in &items {
            match counts.iter_mut().find(|(id, _)| *id == item.book_id) {
                Some((_, count)) => *count += 1,
                None => counts.push((item.book_id, 1)),
            }
        }
        counts.sort_by(|a, b| b.1.cmp(&a.1));
        let popular = counts
            .into_iter()
            .take(POPULAR_TITLES)
            .map(|(book_id, times_borrowed)| Popularity {
                book_id,
                title: title_of(&book_id),
                times_borrowed,
            })
            .collect();

        Ok(Self {
            currency: library.config().currency().to_string(),
            titles: books.len(),
            total_copies,
            members: members.len(),
            borrows: borrows.len(),
            open_borrows,
            completed_borrows: borrows.len() - open_borrows,
            copies_on_loan,
            copies_on_shelf: i64::try_from(total_copies).unwrap_or(i64::MAX)
                - i64::try_from(copies_on_loan).unwrap_or(i64::MAX),
            total_fines,
            uncollected_fines,
            on_loan,
            fines,
            popular,
        })
    }
}
