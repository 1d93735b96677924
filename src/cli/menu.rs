//! The interactive numbered menu.

use std::{fmt, str::FromStr};

use anyhow::Context;
use libman::{
    circulation::{BorrowEdit, Circulation, MAX_BOOKS_PER_BORROW},
    domain::{Book, LoanDate, Member},
    report::Report,
    storage::Library,
};
use nonempty::NonEmpty;
use tracing::instrument;

use super::{
    listing,
    prompt::{self, Answer},
    terminal::{self, Colorize},
};

/// One entry of the menu.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    Exit,
    AddBook,
    ViewBooks,
    UpdateBook,
    DeleteBook,
    AddMember,
    ViewMembers,
    UpdateMember,
    DeleteMember,
    Borrow,
    ViewBorrows,
    Return,
    UpdateBorrow,
    DeleteBorrow,
    Report,
}

impl Action {
    /// Menu order.
    const ALL: [Self; 15] = [
        Self::AddBook,
        Self::ViewBooks,
        Self::UpdateBook,
        Self::DeleteBook,
        Self::AddMember,
        Self::ViewMembers,
        Self::UpdateMember,
        Self::DeleteMember,
        Self::Borrow,
        Self::ViewBorrows,
        Self::Return,
        Self::UpdateBorrow,
        Self::DeleteBorrow,
        Self::Report,
        Self::Exit,
    ];

    const fn number(self) -> u8 {
        match self {
            Self::Exit => 0,
            Self::AddBook => 1,
            Self::ViewBooks => 2,
            Self::UpdateBook => 3,
            Self::DeleteBook => 4,
            Self::AddMember => 5,
            Self::ViewMembers => 6,
            Self::UpdateMember => 7,
            Self::DeleteMember => 8,
            Self::Borrow => 9,
            Self::ViewBorrows => 10,
            Self::Return => 11,
            Self::UpdateBorrow => 12,
            Self::DeleteBorrow => 13,
            Self::Report => 14,
        }
    }

    const fn label(self) -> &'static str {
        match self {
            Self::Exit => "Exit",
            Self::AddBook => "Add book",
            Self::ViewBooks => "View books",
            Self::UpdateBook => "Update book",
            Self::DeleteBook => "Delete book",
            Self::AddMember => "Add member",
            Self::ViewMembers => "View members",
            Self::UpdateMember => "Update member",
            Self::DeleteMember => "Delete member",
            Self::Borrow => "Borrow books",
            Self::ViewBorrows => "View borrows",
            Self::Return => "Return books",
            Self::UpdateBorrow => "Update borrow",
            Self::DeleteBorrow => "Delete borrow",
            Self::Report => "Report",
        }
    }
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:>2}. {}", self.number(), self.label())
    }
}

impl FromStr for Action {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let number: u8 = s
            .trim()
            .parse()
            .map_err(|_| format!("'{}' is not a menu number", s.trim()))?;
        Self::ALL
            .into_iter()
            .find(|action| action.number() == number)
            .ok_or_else(|| format!("no menu entry {number}"))
    }
}

fn print_menu() {
    println!();
    println!("{}", "Library menu".info());
    if terminal::is_narrow() {
        for action in Action::ALL {
            println!("{action}");
        }
        return;
    }

    // two columns, exit on its own line
    let entries: Vec<_> = Action::ALL
        .into_iter()
        .filter(|action| *action != Action::Exit)
        .collect();
    let half = entries.len().div_ceil(2);
    for row in 0..half {
        let left = entries[row].to_string();
        match entries.get(row + half) {
            Some(right) => println!("{left:<28}{right}"),
            None => println!("{left}"),
        }
    }
    println!("{}", Action::Exit);
}

/// Runs the menu until the user exits.
///
/// Errors raised by an action are reported and the menu is shown again;
/// only a failure to read the choice itself ends the loop.
#[instrument(skip(library))]
pub fn run(library: &Library) -> anyhow::Result<()> {
    loop {
        print_menu();
        let Some(action) = prompt::value::<Action>("Choose")? else {
            continue;
        };
        if action == Action::Exit {
            println!("Goodbye.");
            return Ok(());
        }
        if let Err(e) = dispatch(library, action) {
            eprintln!("{}", format!("Error: {e:#}").error());
        }
    }
}

fn dispatch(library: &Library, action: Action) -> anyhow::Result<()> {
    match action {
        Action::Exit => Ok(()),
        Action::AddBook => add_book(library),
        Action::ViewBooks => listing::books(library),
        Action::UpdateBook => update_book(library),
        Action::DeleteBook => delete_book(library),
        Action::AddMember => add_member(library),
        Action::ViewMembers => listing::members(library),
        Action::UpdateMember => update_member(library),
        Action::DeleteMember => delete_member(library),
        Action::Borrow => borrow(library),
        Action::ViewBorrows => listing::borrows(library),
        Action::Return => return_books(library),
        Action::UpdateBorrow => update_borrow(library),
        Action::DeleteBorrow => delete_borrow(library),
        Action::Report => {
            let report = Report::generate(library, LoanDate::today())?;
            listing::report(&report);
            Ok(())
        }
    }
}

fn cancelled() -> anyhow::Result<()> {
    println!("{}", "Cancelled.".dim());
    Ok(())
}

fn add_book(library: &Library) -> anyhow::Result<()> {
    let Some(title) = prompt::text("Title")? else {
        return cancelled();
    };
    let Some(author) = prompt::text("Author")? else {
        return cancelled();
    };
    let Some(copies) = prompt::copies("Copies", None)? else {
        return cancelled();
    };
    let id = library.add_book(&Book::new(title, author, copies))?;
    println!("{}", format!("Added book {id}.").success());
    Ok(())
}

fn update_book(library: &Library) -> anyhow::Result<()> {
    listing::books(library)?;
    let Some(id) = prompt::id("Book ID")? else {
        return cancelled();
    };
    let book = library
        .books()
        .get(id)?
        .with_context(|| format!("book {id} not found"))?;

    let Some(title) = prompt::text_or("Title", &book.title)? else {
        return cancelled();
    };
    let Some(author) = prompt::text_or("Author", &book.author)? else {
        return cancelled();
    };
    let Some(copies) = prompt::copies("Copies", Some(book.total_copies))? else {
        return cancelled();
    };
    library.update_book(id, &Book::new(title, author, copies))?;
    println!("{}", format!("Updated book {id}.").success());
    Ok(())
}

fn delete_book(library: &Library) -> anyhow::Result<()> {
    listing::books(library)?;
    let Some(id) = prompt::id("Book ID")? else {
        return cancelled();
    };
    if !library.book_exists(id)? {
        anyhow::bail!("book {id} not found");
    }
    if !prompt::confirm(&format!("Delete '{}'?", library.book_title(id)))? {
        return cancelled();
    }
    library.delete_book(id)?;
    println!("{}", format!("Deleted book {id}.").success());
    Ok(())
}

fn add_member(library: &Library) -> anyhow::Result<()> {
    let Some(name) = prompt::text("Name")? else {
        return cancelled();
    };
    let Some(phone) = prompt::text("Phone")? else {
        return cancelled();
    };
    let id = library.add_member(&Member::new(name, phone))?;
    println!("{}", format!("Added member {id}.").success());
    Ok(())
}

fn update_member(library: &Library) -> anyhow::Result<()> {
    listing::members(library)?;
    let Some(id) = prompt::id("Member ID")? else {
        return cancelled();
    };
    let member = library
        .members()
        .get(id)?
        .with_context(|| format!("member {id} not found"))?;

    let Some(name) = prompt::text_or("Name", &member.name)? else {
        return cancelled();
    };
    let Some(phone) = prompt::text_or("Phone", &member.phone)? else {
        return cancelled();
    };
    library.update_member(id, &Member::new(name, phone))?;
    println!("{}", format!("Updated member {id}.").success());
    Ok(())
}

fn delete_member(library: &Library) -> anyhow::Result<()> {
    listing::members(library)?;
    let Some(id) = prompt::id("Member ID")? else {
        return cancelled();
    };
    if !library.member_exists(id)? {
        anyhow::bail!("member {id} not found");
    }
    if !prompt::confirm(&format!("Delete '{}'?", library.member_name(id)))? {
        return cancelled();
    }
    library.delete_member(id)?;
    println!("{}", format!("Deleted member {id}.").success());
    Ok(())
}

fn borrow(library: &Library) -> anyhow::Result<()> {
    let circulation = Circulation::new(library);

    listing::members(library)?;
    let Some(member) = prompt::id("Member ID")? else {
        return cancelled();
    };
    let mut draft = circulation.begin_borrow(member)?;
    println!("Borrowing for {}.", library.member_name(member));

    listing::available_books(library)?;
    println!(
        "{}",
        format!("Enter up to {MAX_BOOKS_PER_BORROW} book IDs, 'done' to finish or 'cancel'.").dim()
    );
    while !draft.is_full() {
        let label = format!("Book ID ({}/{MAX_BOOKS_PER_BORROW})", draft.books().len() + 1);
        match prompt::id_or_done(&label)? {
            Answer::Value(book) => match draft.select(book) {
                Ok(selection) => println!(
                    "  + {} ({} left on the shelf)",
                    selection.title, selection.remaining
                ),
                Err(e) => eprintln!("{}", e.to_string().warning()),
            },
            Answer::Done => break,
            Answer::Cancel => return cancelled(),
        }
    }
    if draft.is_full() {
        println!(
            "{}",
            format!("Limit of {MAX_BOOKS_PER_BORROW} books reached.").dim()
        );
    }
    if draft.books().is_empty() {
        println!("{}", "No books selected.".dim());
        return cancelled();
    }

    let Some(date) = prompt::date("Borrow date")? else {
        return cancelled();
    };
    let receipt = draft.commit(date)?;
    println!(
        "{}",
        format!(
            "Borrow {} recorded: {} books, due {}.",
            receipt.borrow_id,
            receipt.books.len(),
            receipt.due_date
        )
        .success()
    );
    Ok(())
}

fn return_books(library: &Library) -> anyhow::Result<()> {
    let circulation = Circulation::new(library);

    listing::outstanding(library)?;
    let Some(borrow_id) = prompt::id("Borrow ID")? else {
        return cancelled();
    };
    let open = circulation.open_items(borrow_id)?;
    listing::open_items(library, &open);

    let mut books = Vec::with_capacity(open.len());
    println!("{}", "Enter the returned book IDs, 'done' to finish.".dim());
    while books.len() < open.len() {
        match prompt::id_or_done("Book ID")? {
            Answer::Value(book) if open.iter().any(|item| item.book_id == book) => {
                if !books.contains(&book) {
                    books.push(book);
                }
            }
            Answer::Value(book) => {
                eprintln!(
                    "{}",
                    format!("book {book} is not out on borrow {borrow_id}").warning()
                );
            }
            Answer::Done => break,
            Answer::Cancel => return cancelled(),
        }
    }
    let Some(books) = NonEmpty::from_vec(books) else {
        return cancelled();
    };

    let Some(date) = prompt::date("Return date")? else {
        return cancelled();
    };
    let receipt = circulation.return_books(borrow_id, &books, date)?;
    for book in &receipt.books {
        println!("  {} returned, fine {}", book.title, book.fine);
    }
    let summary = format!(
        "Total fine {} {}. Borrow {} is {}.",
        receipt.total_fine(),
        library.config().currency(),
        receipt.borrow_id,
        receipt.status
    );
    if receipt.total_fine() > 0 {
        println!("{}", summary.warning());
    } else {
        println!("{}", summary.success());
    }
    Ok(())
}

fn update_borrow(library: &Library) -> anyhow::Result<()> {
    let circulation = Circulation::new(library);

    listing::borrows(library)?;
    let Some(id) = prompt::id("Borrow ID")? else {
        return cancelled();
    };
    let current = library
        .borrows()
        .get(id)?
        .with_context(|| format!("borrow {id} not found"))?;

    let Some(member_id) = prompt::value_or("Member ID", &current.member_id)? else {
        return cancelled();
    };
    let Some(borrow_date) = prompt::date_or("Borrow date", current.borrow_date.date())? else {
        return cancelled();
    };
    let Some(due_date) = prompt::date_or("Due date", current.due_date.date())? else {
        return cancelled();
    };
    let Some(fine) = prompt::value_or("Fine", &current.fine)? else {
        return cancelled();
    };

    circulation.update_borrow(
        id,
        BorrowEdit {
            member_id,
            borrow_date,
            due_date,
            fine,
        },
    )?;
    println!("{}", format!("Updated borrow {id}.").success());
    Ok(())
}

fn delete_borrow(library: &Library) -> anyhow::Result<()> {
    let circulation = Circulation::new(library);

    listing::borrows(library)?;
    let Some(id) = prompt::id("Borrow ID")? else {
        return cancelled();
    };
    if !library.borrows().exists(id)? {
        anyhow::bail!("borrow {id} not found");
    }
    if !prompt::confirm(&format!("Delete borrow {id} and all of its items?"))? {
        return cancelled();
    }
    let items = circulation.delete_borrow(id)?;
    println!(
        "{}",
        format!("Deleted borrow {id} and {items} items.").success()
    );
    Ok(())
}

#[cfg(test)]
mod tests {
    use test_case::test_case;

    use super::*;

    #[test_case("0", Action::Exit; "exit")]
    #[test_case("9", Action::Borrow; "borrow")]
    #[test_case(" 14 ", Action::Report; "padded report")]
    fn parses_menu_numbers(input: &str, expected: Action) {
        assert_eq!(input.parse::<Action>().unwrap(), expected);
    }

    #[test_case("15"; "past the end")]
    #[test_case("books"; "words")]
    fn rejects_unknown_entries(input: &str) {
        assert!(input.parse::<Action>().is_err());
    }

    #[test]
    fn numbers_are_unique_and_complete() {
        let mut numbers: Vec<_> = Action::ALL.iter().map(|action| action.number()).collect();
        numbers.sort_unstable();
        assert_eq!(numbers, (0..=14).collect::<Vec<_>>());
    }
}
