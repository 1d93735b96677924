//! Line prompts for the interactive menu.
//!
//! Every prompt re-asks until the input parses. Typing `cancel` abandons the
//! current action; list prompts also accept `done`.

use std::{fmt::Display, str::FromStr};

use dialoguer::{Confirm, Input};
use libman::{domain::LoanDate, storage::RecordId};

/// Abandons the action in progress.
pub const CANCEL: &str = "cancel";

/// Ends a list of entries.
pub const DONE: &str = "done";

/// An answer to a list prompt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Answer<T> {
    /// A parsed entry.
    Value(T),
    /// The list is complete.
    Done,
    /// The whole action is abandoned.
    Cancel,
}

fn is_keyword(input: &str, keyword: &str) -> bool {
    input.trim().eq_ignore_ascii_case(keyword)
}

fn check<T>(input: &str, keywords: &[&str]) -> Result<(), String>
where
    T: FromStr,
    T::Err: Display,
{
    if keywords.iter().any(|keyword| is_keyword(input, keyword)) {
        return Ok(());
    }
    input
        .trim()
        .parse::<T>()
        .map(|_| ())
        .map_err(|e| e.to_string())
}

fn ask<T>(
    prompt: &str,
    default: Option<String>,
    keywords: &'static [&'static str],
) -> anyhow::Result<Answer<T>>
where
    T: FromStr,
    T::Err: Display,
{
    let mut input = Input::<String>::new().with_prompt(prompt);
    if let Some(default) = default {
        input = input.default(default);
    }
    let reply = input
        .validate_with(move |input: &String| check::<T>(input, keywords))
        .interact_text()?;

    if is_keyword(&reply, CANCEL) {
        return Ok(Answer::Cancel);
    }
    if keywords.contains(&DONE) && is_keyword(&reply, DONE) {
        return Ok(Answer::Done);
    }
    // validated above
    Ok(reply
        .trim()
        .parse()
        .map_or(Answer::Cancel, Answer::Value))
}

/// Asks for a value of type `T`; `None` if the user cancelled.
pub fn value<T>(prompt: &str) -> anyhow::Result<Option<T>>
where
    T: FromStr,
    T::Err: Display,
{
    match ask(prompt, None, &[CANCEL])? {
        Answer::Value(value) => Ok(Some(value)),
        Answer::Done | Answer::Cancel => Ok(None),
    }
}

/// Asks for a value, offering `current` as the default.
pub fn value_or<T>(prompt: &str, current: &T) -> anyhow::Result<Option<T>>
where
    T: FromStr + Display,
    T::Err: Display,
{
    match ask(prompt, Some(current.to_string()), &[CANCEL])? {
        Answer::Value(value) => Ok(Some(value)),
        Answer::Done | Answer::Cancel => Ok(None),
    }
}

/// Asks for a non-empty line of text; `None` if the user cancelled.
pub fn text(prompt: &str) -> anyhow::Result<Option<String>> {
    value::<NonBlank>(prompt).map(|text| text.map(|text| text.0))
}

/// Asks for a line of text, offering `current` as the default.
pub fn text_or(prompt: &str, current: &str) -> anyhow::Result<Option<String>> {
    value_or(prompt, &NonBlank(current.to_string())).map(|text| text.map(|text| text.0))
}

/// Asks for a record id.
pub fn id(prompt: &str) -> anyhow::Result<Option<RecordId>> {
    value(prompt)
}

/// Asks for the next id of a list.
pub fn id_or_done(prompt: &str) -> anyhow::Result<Answer<RecordId>> {
    ask(prompt, None, &[CANCEL, DONE])
}

/// Asks for a copy count greater than zero.
pub fn copies(prompt: &str, current: Option<u32>) -> anyhow::Result<Option<u32>> {
    let answer = match current {
        Some(current) => value_or(prompt, &Copies(current))?,
        None => value(prompt)?,
    };
    Ok(answer.map(|copies: Copies| copies.0))
}

/// Asks for a `dd/mm/yyyy` date. There is no default; an empty reply is
/// rejected.
pub fn date(prompt: &str) -> anyhow::Result<Option<LoanDate>> {
    value(&format!("{prompt} (dd/mm/yyyy)"))
}

/// Asks for a date, offering `current` when there is one.
pub fn date_or(prompt: &str, current: Option<LoanDate>) -> anyhow::Result<Option<LoanDate>> {
    match current {
        Some(current) => value_or(&format!("{prompt} (dd/mm/yyyy)"), &current),
        None => date(prompt),
    }
}

/// Asks a yes/no question, defaulting to no.
pub fn confirm(prompt: &str) -> anyhow::Result<bool> {
    Ok(Confirm::new()
        .with_prompt(prompt)
        .default(false)
        .interact()?)
}

/// Text that is not empty once trimmed.
#[derive(Debug, Clone, PartialEq, Eq)]
struct NonBlank(String);

impl FromStr for NonBlank {
    type Err = &'static str;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        if s.is_empty() {
            Err("value cannot be empty")
        } else {
            Ok(Self(s.to_string()))
        }
    }
}

impl Display for NonBlank {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// A copy count of at least one.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Copies(u32);

impl FromStr for Copies {
    type Err = &'static str;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().parse::<u32>() {
            Ok(0) => Err("copies must be greater than zero"),
            Ok(n) => Ok(Self(n)),
            Err(_) => Err("copies must be a whole number"),
        }
    }
}

impl Display for Copies {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[cfg(test)]
mod tests {
    use test_case::test_case;

    use super::*;

    #[test_case("cancel"; "lowercase")]
    #[test_case(" CANCEL "; "padded uppercase")]
    fn cancel_is_always_accepted(input: &str) {
        assert!(check::<RecordId>(input, &[CANCEL]).is_ok());
    }

    #[test]
    fn done_only_counts_where_offered() {
        assert!(check::<RecordId>("done", &[CANCEL, DONE]).is_ok());
        assert!(check::<RecordId>("done", &[CANCEL]).is_err());
    }

    #[test_case("0"; "zero")]
    #[test_case("two"; "words")]
    #[test_case(""; "empty")]
    fn copies_must_be_positive(input: &str) {
        assert!(input.parse::<Copies>().is_err());
    }

    #[test]
    fn blank_text_is_rejected() {
        assert!("   ".parse::<NonBlank>().is_err());
        assert_eq!("  Dune ".parse::<NonBlank>().unwrap().0, "Dune");
    }

    #[test]
    fn empty_date_is_not_accepted() {
        assert!(check::<LoanDate>("", &[CANCEL]).is_err());
        assert!(check::<LoanDate>("   ", &[CANCEL]).is_err());
    }

    #[test]
    fn date_errors_are_shown_to_the_user() {
        let error = check::<LoanDate>("2024-01-01", &[CANCEL]).unwrap_err();
        assert!(error.contains("dd/mm/yyyy"));
    }
}
