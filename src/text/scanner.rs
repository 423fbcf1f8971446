//! Tokenizer for the text form: `'lexeme':1A,3 plain 'it''s':2`.
//!
//! Tokens are separated by whitespace. A lexeme is either quoted (`''` and
//! `\x` escape inside) or bare (ends at whitespace or `:`, `\x` escapes).
//! An optional `:`-prefixed list of `offset[weight]` follows.

use nom::branch::alt;
use nom::bytes::complete::tag;
use nom::character::complete::{anychar, char, digit1, none_of, one_of, satisfy};
use nom::combinator::{map, opt, value};
use nom::multi::{many0, separated_list1};
use nom::sequence::{delimited, pair, preceded};
use nom::{IResult, Parser};
use crate::core::error::{Error, ErrorKind, Result};
use crate::vector::position::{Weight, WordPos};

/// One lexeme with its positions, exactly as written (not yet sorted or merged).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScannedToken {
    pub lexeme: Vec<u8>,
    pub positions: Vec<WordPos>,
}

type RawPos = (u32, Option<char>);

fn escaped_char(i: &str) -> IResult<&str, char> {
    preceded(char('\\'), anychar).parse(i)
}

fn quoted(i: &str) -> IResult<&str, String> {
    let body = many0(alt((escaped_char, value('\'', tag("''")), none_of("'\\"))));
    let (i, chars) = delimited(char('\''), body, char('\'')).parse(i)?;
    Ok((i, chars.into_iter().collect()))
}

fn bare(i: &str) -> IResult<&str, String> {
    let first = alt((escaped_char, satisfy(|c| !c.is_whitespace() && c != '\'' && c != '\\')));
    let rest = many0(alt((escaped_char, satisfy(|c| !c.is_whitespace() && c != ':' && c != '\\'))));
    let (i, (head, tail)) = pair(first, rest).parse(i)?;
    let mut word = String::with_capacity(tail.len() + 1);
    word.push(head);
    word.extend(tail);
    Ok((i, word))
}

fn position(i: &str) -> IResult<&str, RawPos> {
    map(pair(digit1, opt(one_of("aAbBcCdD"))), |(digits, weight): (&str, Option<char>)| {
        // Too many digits to fit: clamped together with other large offsets
        (digits.parse::<u32>().unwrap_or(u32::MAX), weight)
    })
    .parse(i)
}

fn token(i: &str) -> IResult<&str, (String, Option<Vec<RawPos>>)> {
    pair(
        alt((quoted, bare)),
        opt(preceded(char(':'), separated_list1(char(','), position))),
    )
    .parse(i)
}

/// Pulls tokens from the input one at a time. Stops at the first error.
pub struct Scanner<'a> {
    input: &'a str,
    rest: &'a str,
    failed: bool,
}

impl<'a> Scanner<'a> {
    pub fn new(input: &'a str) -> Self {
        Scanner {
            input,
            rest: input,
            failed: false,
        }
    }

    pub fn next_token(&mut self) -> Result<Option<ScannedToken>> {
        let rest = self.rest.trim_start();
        if rest.is_empty() || self.failed {
            self.rest = rest;
            return Ok(None);
        }

        let result = self.scan(rest);
        if result.is_err() {
            self.failed = true;
        }
        result.map(Some)
    }

    fn scan(&mut self, rest: &'a str) -> Result<ScannedToken> {
        let (after, (lexeme, raw)) = token(rest).map_err(|_| self.syntax_error())?;
        if lexeme.is_empty() || after.chars().next().is_some_and(|c| !c.is_whitespace()) {
            return Err(self.syntax_error());
        }

        let positions = raw
            .unwrap_or_default()
            .into_iter()
            .map(|raw| self.word_pos(raw))
            .collect::<Result<Vec<_>>>()?;

        self.rest = after;
        Ok(ScannedToken {
            lexeme: lexeme.into_bytes(),
            positions,
        })
    }

    fn word_pos(&self, (offset, letter): RawPos) -> Result<WordPos> {
        if offset == 0 {
            return Err(Error::new(
                ErrorKind::Syntax,
                format!("wrong position info in tsvector: \"{}\"", self.input),
            ));
        }
        let weight = match letter {
            Some('a' | 'A') => Weight::A,
            Some('b' | 'B') => Weight::B,
            Some('c' | 'C') => Weight::C,
            _ => Weight::D,
        };
        let offset = offset.min(WordPos::MAX_OFFSET as u32) as u16;
        WordPos::new(offset, weight)
    }

    fn syntax_error(&self) -> Error {
        Error::new(ErrorKind::Syntax, format!("syntax error in tsvector: \"{}\"", self.input))
    }
}

impl Iterator for Scanner<'_> {
    type Item = Result<ScannedToken>;

    fn next(&mut self) -> Option<Self::Item> {
        self.next_token().transpose()
    }
}
