//! Splitting a command line into words.
#![forbid(unsafe_code)]

use std::{iter::Peekable, str::Chars};

#[derive(Debug, Default, PartialEq, Eq)]
pub(crate) struct CommandLine {
    pub(crate) argv: Vec<String>,
    pub(crate) background: bool,
}

/// Parse `line`, expanding `$NAME` words from the environment.
pub(crate) fn parse_line(line: &str) -> CommandLine {
    parse_line_with(line, |name| std::env::var(name).ok())
}

/// Parse `line`, expanding `$NAME` words through `lookup`.
///
/// Words are separated by whitespace. A word that starts with `'` runs until the next `'` and
/// keeps its spaces; it is never expanded. A `$NAME` word whose variable is unset is dropped. A
/// final `&` word requests a background job and is not part of the arguments.
pub(crate) fn parse_line_with(
    line: &str,
    lookup: impl Fn(&str) -> Option<String>,
) -> CommandLine {
    let mut argv = Vec::new();
    let mut chars = line.chars().peekable();

    while let Some(word) = next_word(&mut chars) {
        match word {
            Word::Quoted(text) => argv.push(text),
            Word::Bare(text) => match text.strip_prefix('$').filter(|name| !name.is_empty()) {
                Some(name) => argv.extend(lookup(name)),
                None => argv.push(text),
            },
        }
    }

    let background = argv.last().is_some_and(|word| word == "&");
    if background {
        argv.pop();
    }

    CommandLine { argv, background }
}

enum Word {
    Bare(String),
    Quoted(String),
}

fn next_word(chars: &mut Peekable<Chars<'_>>) -> Option<Word> {
    while chars.next_if(|c| c.is_whitespace()).is_some() {}

    if chars.next_if_eq(&'\'').is_some() {
        // an unterminated quote runs to the end of the line
        return Some(Word::Quoted(chars.by_ref().take_while(|&c| c != '\'').collect()));
    }

    let mut word = String::new();
    while let Some(c) = chars.next_if(|c| !c.is_whitespace()) {
        word.push(c);
    }

    (!word.is_empty()).then_some(Word::Bare(word))
}
