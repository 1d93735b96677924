//! End-to-end lending scenarios against a data directory on disk.

use std::fs;

use libman::{
    Book, BorrowError, Circulation, Library, LoanDate, LoanStatus, Member, RecordId, Report,
    storage::Status,
};
use nonempty::NonEmpty;
use tempfile::TempDir;

fn date(s: &str) -> LoanDate {
    s.parse().unwrap()
}

fn setup() -> (TempDir, Library) {
    let tmp = TempDir::new().expect("failed to create temp dir");
    let library = Library::open(tmp.path().to_path_buf());
    (tmp, library)
}

#[test]
fn late_return_of_one_copy() {
    let (_tmp, library) = setup();
    let circulation = Circulation::new(&library);
    let member = library.add_member(&Member::new("Ann", "081")).unwrap();
    let book = library.add_book(&Book::new("Dune", "Herbert", 2)).unwrap();

    let mut draft = circulation.begin_borrow(member).unwrap();
    draft.select(book).unwrap();
    let borrowed_on = date("01/03/2024");
    let receipt = draft.commit(borrowed_on).unwrap();

    assert_eq!(receipt.due_date, borrowed_on.plus_days(7));
    assert_eq!(library.available_copies(book).unwrap(), Some(1));

    let returned = circulation
        .return_books(receipt.borrow_id, &NonEmpty::new(book), borrowed_on.plus_days(10))
        .unwrap();

    assert_eq!(returned.total_fine(), 15);
    assert_eq!(library.available_copies(book).unwrap(), Some(2));
}

#[test]
fn deleting_a_borrow_clears_it_from_the_report() {
    let (_tmp, library) = setup();
    let circulation = Circulation::new(&library);
    let member = library.add_member(&Member::new("Ann", "081")).unwrap();
    let dune = library.add_book(&Book::new("Dune", "Herbert", 1)).unwrap();
    let emma = library.add_book(&Book::new("Emma", "Austen", 1)).unwrap();

    let mut draft = circulation.begin_borrow(member).unwrap();
    draft.select(dune).unwrap();
    draft.select(emma).unwrap();
    let receipt = draft.commit(date("01/03/2024")).unwrap();

    assert_eq!(circulation.delete_borrow(receipt.borrow_id).unwrap(), 2);

    let items = library.borrow_items().store().read_all().unwrap();
    assert_eq!(items.len(), 2);
    assert!(items.iter().all(|item| item.status() == Some(Status::Deleted)));

    let report = Report::generate(&library, date("02/03/2024")).unwrap();
    assert_eq!(report.copies_on_loan, 0);
    assert!(report.on_loan.is_empty());
}

#[test]
fn fourth_book_is_refused_before_the_date_is_asked() {
    let (_tmp, library) = setup();
    let circulation = Circulation::new(&library);
    let member = library.add_member(&Member::new("Ann", "081")).unwrap();
    let books: Vec<_> = ["A", "B", "C", "D"]
        .into_iter()
        .map(|title| library.add_book(&Book::new(title, "Anon", 1)).unwrap())
        .collect();

    let mut draft = circulation.begin_borrow(member).unwrap();
    for &book in &books[..3] {
        draft.select(book).unwrap();
    }

    assert!(matches!(
        draft.select(books[3]),
        Err(BorrowError::BookLimitReached(3))
    ));
    // nothing is written until the date is supplied and the draft committed
    assert!(library.borrows().active().unwrap().is_empty());
}

#[test]
fn soft_deleted_rows_stay_on_disk_but_out_of_view() {
    let (_tmp, library) = setup();
    let ann = library.add_member(&Member::new("Ann", "081")).unwrap();
    let ben = library.add_member(&Member::new("Ben", "082")).unwrap();

    library.delete_member(ann).unwrap();

    let rows = library.members().store().read_all().unwrap();
    assert_eq!(rows.len(), 2);
    assert_eq!(rows[0].status(), Some(Status::Deleted));
    let active = library.members().active().unwrap();
    assert_eq!(active.len(), 1);
    assert_eq!(active[0].id, ben);
}

#[test]
fn insert_reuses_the_deleted_row_with_a_fresh_id() {
    let (_tmp, library) = setup();
    let ids: Vec<_> = ["A", "B", "C"]
        .into_iter()
        .map(|title| library.add_book(&Book::new(title, "Anon", 1)).unwrap())
        .collect();

    library.delete_book(ids[0]).unwrap();
    let added = library.add_book(&Book::new("D", "Anon", 1)).unwrap();

    assert_eq!(added, RecordId::new(4).unwrap());
    let rows = library.books().store().read_all().unwrap();
    assert_eq!(rows.len(), 3);
    assert_eq!(rows[0].id(), Some(added));
    assert!(rows[0].is_active());
}

#[test]
fn availability_holds_across_borrows_and_returns() {
    let (_tmp, library) = setup();
    let circulation = Circulation::new(&library);
    let ann = library.add_member(&Member::new("Ann", "081")).unwrap();
    let ben = library.add_member(&Member::new("Ben", "082")).unwrap();
    let dune = library.add_book(&Book::new("Dune", "Herbert", 3)).unwrap();

    let mut receipts = Vec::new();
    for member in [ann, ben, ann] {
        let mut draft = circulation.begin_borrow(member).unwrap();
        draft.select(dune).unwrap();
        receipts.push(draft.commit(date("01/03/2024")).unwrap());
    }
    assert_eq!(library.available_copies(dune).unwrap(), Some(0));

    let mut draft = circulation.begin_borrow(ben).unwrap();
    assert!(matches!(
        draft.select(dune),
        Err(BorrowError::BookUnavailable(_))
    ));

    circulation
        .return_books(receipts[1].borrow_id, &NonEmpty::new(dune), date("03/03/2024"))
        .unwrap();
    assert_eq!(library.available_copies(dune).unwrap(), Some(1));
    assert_eq!(library.borrowed_count(dune).unwrap(), 2);

    for receipt in &receipts {
        let header = library.borrows().get(receipt.borrow_id).unwrap().unwrap();
        assert_eq!(header.status, library.borrow_status(receipt.borrow_id).unwrap());
    }
}

#[test]
fn data_files_with_legacy_status_labels_load() {
    let (tmp, library) = setup();
    fs::write(tmp.path().join("books.txt"), "1|Dune|Herbert|2|A\n").unwrap();
    fs::write(tmp.path().join("members.txt"), "1|Ann|081|A\n").unwrap();
    fs::write(
        tmp.path().join("borrows.txt"),
        "1|1|01/03/2024|08/03/2024|0|กำลังยืม|A\n",
    )
    .unwrap();
    fs::write(tmp.path().join("borrow_items.txt"), "1|1|1|กำลังยืม|0|A\n").unwrap();

    let book = RecordId::FIRST;
    assert_eq!(library.available_copies(book).unwrap(), Some(1));

    let receipt = Circulation::new(&library)
        .return_books(RecordId::FIRST, &NonEmpty::new(book), date("11/03/2024"))
        .unwrap();

    assert_eq!(receipt.status, LoanStatus::Returned);
    let items = fs::read_to_string(tmp.path().join("borrow_items.txt")).unwrap();
    assert_eq!(items, "1|1|1|returned|15|A\n");
    let borrows = fs::read_to_string(tmp.path().join("borrows.txt")).unwrap();
    assert_eq!(borrows, "1|1|01/03/2024|08/03/2024|0|returned|A\n");
}
