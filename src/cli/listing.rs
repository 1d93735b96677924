//! Tables shared by the menu and the listing subcommands.

use libman::{
    circulation::{BorrowSummary, Circulation},
    domain::BorrowItem,
    report::Report,
    storage::{Availability, Library, Stored},
};

use super::{table, terminal::Colorize};

/// Every book with its stock levels.
pub fn books(library: &Library) -> anyhow::Result<()> {
    let rows = stock_rows(&library.inventory()?);
    table::print(
        &["ID", "Title", "Author", "Copies", "Available"],
        &rows,
        "No books on record.",
    );
    Ok(())
}

/// Books with a copy on the shelf.
pub fn available_books(library: &Library) -> anyhow::Result<()> {
    let rows = stock_rows(&library.available_books()?);
    table::print(
        &["ID", "Title", "Author", "Copies", "Available"],
        &rows,
        "No books available.",
    );
    Ok(())
}

fn stock_rows(stock: &[Availability]) -> Vec<Vec<String>> {
    stock
        .iter()
        .map(|entry| {
            vec![
                entry.book.id.to_string(),
                entry.book.title.clone(),
                entry.book.author.clone(),
                entry.book.total_copies.to_string(),
                entry.available().to_string(),
            ]
        })
        .collect()
}

/// Every member.
pub fn members(library: &Library) -> anyhow::Result<()> {
    let rows = library
        .members()
        .active()?
        .into_iter()
        .map(|member| {
            vec![
                member.id.to_string(),
                member.value.name,
                member.value.phone,
            ]
        })
        .collect::<Vec<_>>();
    table::print(&["ID", "Name", "Phone"], &rows, "No members on record.");
    Ok(())
}

/// Every borrow.
pub fn borrows(library: &Library) -> anyhow::Result<()> {
    let summaries = Circulation::new(library).summaries()?;
    print_summaries(&summaries, "No borrows on record.");
    Ok(())
}

/// Borrows with books still out.
pub fn outstanding(library: &Library) -> anyhow::Result<()> {
    let summaries = Circulation::new(library).outstanding()?;
    print_summaries(&summaries, "No books are out.");
    Ok(())
}

fn print_summaries(summaries: &[BorrowSummary], empty: &str) {
    let rows = summaries
        .iter()
        .map(|summary| {
            vec![
                summary.id.to_string(),
                summary.member_name.clone(),
                summary.borrow.borrow_date.to_string(),
                summary.borrow.due_date.to_string(),
                if summary.books_out.is_empty() {
                    "-".to_string()
                } else {
                    summary.books_out.join(", ")
                },
                summary.total_fine.to_string(),
                summary.status.to_string(),
            ]
        })
        .collect::<Vec<_>>();
    table::print(
        &["ID", "Member", "Borrowed", "Due", "Books out", "Fine", "Status"],
        &rows,
        empty,
    );
}

/// Items of one borrow that are still out.
pub fn open_items(library: &Library, items: &[Stored<BorrowItem>]) {
    let rows = items
        .iter()
        .map(|item| {
            vec![
                item.book_id.to_string(),
                library.book_title(item.book_id),
                item.status.to_string(),
            ]
        })
        .collect::<Vec<_>>();
    table::print(&["Book ID", "Title", "Status"], &rows, "Nothing to return.");
}

/// The library report in human readable form.
pub fn report(report: &Report) {
    let currency = &report.currency;

    println!("{}", "Library report".info());
    println!("  Titles:              {}", report.titles);
    println!("  Copies owned:        {}", report.total_copies);
    println!("  Members:             {}", report.members);
    println!(
        "  Borrows:             {} ({} open, {} completed)",
        report.borrows, report.open_borrows, report.completed_borrows
    );
    println!("  Copies on loan:      {}", report.copies_on_loan);
    println!("  Copies on shelf:     {}", report.copies_on_shelf);
    println!("  Fines charged:       {} {currency}", report.total_fines);
    println!("  Fines uncollected:   {} {currency}", report.uncollected_fines);

    println!();
    println!("{}", "Books on loan".info());
    let rows = report
        .on_loan
        .iter()
        .map(|line| {
            let overdue = if line.is_overdue() {
                format!("{} days", line.days_overdue)
            } else {
                "-".to_string()
            };
            vec![
                line.borrow_id.to_string(),
                line.member.clone(),
                line.title.clone(),
                line.borrow_date.to_string(),
                line.due_date.to_string(),
                overdue,
            ]
        })
        .collect::<Vec<_>>();
    table::print(
        &["Borrow", "Member", "Title", "Borrowed", "Due", "Overdue"],
        &rows,
        "No books are out.",
    );

    println!();
    println!("{}", "Fines".info());
    let rows = report
        .fines
        .iter()
        .map(|line| {
            vec![
                line.member.clone(),
                line.title.clone(),
                format!("{} {currency}", line.fine),
                line.status.to_string(),
            ]
        })
        .collect::<Vec<_>>();
    table::print(&["Member", "Title", "Fine", "Status"], &rows, "No fines.");

    println!();
    println!("{}", "Most borrowed".info());
    let rows = report
        .popular
        .iter()
        .enumerate()
        .map(|(rank, entry)| {
            vec![
                (rank + 1).to_string(),
                entry.title.clone(),
                entry.times_borrowed.to_string(),
            ]
        })
        .collect::<Vec<_>>();
    table::print(&["#", "Title", "Times borrowed"], &rows, "Nothing borrowed yet.");
}
