//! # Parsing Module
//!
//! This module parses program images: a list of signed decimal integers
//! separated by commas, like `1,9,10,3,2,3,11,0,99,30,40,50`.
//! Whitespace (including line breaks) is allowed around the commas and
//! at either end, so images split across several lines load too.
//!
//! #### Error Types
//!
//! Syntax errors remember where they happened, so they can be printed
//! with the offending line underlined, or handed to a diagnostic
//! renderer by byte offset.
use core::fmt;
use std::num::ParseIntError;

use nom::{
    character::complete::{char, digit1, multispace0, one_of},
    combinator::{all_consuming, cut, map_res, opt, recognize},
    error::{context, ContextError, ErrorKind, FromExternalError, ParseError, VerboseError, VerboseErrorKind},
    multi::separated_list1,
    sequence::{delimited, pair},
    IResult,
};

use crate::vm::Program;

/// A syntax error in a program image.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SyntaxError {
    /// Byte offset of the offending text.
    pub offset: usize,
    /// Byte length of the offending text (zero at the end of input).
    pub length: usize,
    /// One-based line number.
    pub line: usize,
    /// Zero-based column, counted in characters.
    pub column: usize,
    /// What went wrong.
    pub message: String,
    source_line: String,
}

impl fmt::Display for SyntaxError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(
            f,
            "{}",
            make_error(&self.source_line, &self.message, self.line, self.column, self.length)
        )
    }
}

impl std::error::Error for SyntaxError {}

/// Parse a program image.
pub fn parse_program(input: &str) -> Result<Program, SyntaxError> {
    match image::<VerboseError<&str>>(input) {
        Ok((_, words)) => Ok(Program::new(words)),
        Err(nom::Err::Error(e)) | Err(nom::Err::Failure(e)) => Err(locate(input, e)),
        Err(nom::Err::Incomplete(_)) => Err(at(input, input.len(), 0, "unexpected end of input".to_string())),
    }
}

/// A single signed decimal integer.
fn integer<'a, E>(input: &'a str) -> IResult<&'a str, i64, E>
where
    E: ParseError<&'a str> + ContextError<&'a str> + FromExternalError<&'a str, ParseIntError>,
{
    context(
        "integer",
        map_res(recognize(pair(opt(one_of("+-")), digit1)), str::parse::<i64>),
    )(input)
}

/// A comma separated list of integers, and nothing else.
fn image<'a, E>(input: &'a str) -> IResult<&'a str, Vec<i64>, E>
where
    E: ParseError<&'a str> + ContextError<&'a str> + FromExternalError<&'a str, ParseIntError>,
{
    all_consuming(delimited(
        multispace0,
        separated_list1(delimited(multispace0, char(','), multispace0), cut(integer)),
        multispace0,
    ))(input)
}

/// Turn nom's error into a located syntax error.
fn locate(input: &str, err: VerboseError<&str>) -> SyntaxError {
    let Some(&(rest, _)) = err.errors.first() else {
        return at(input, 0, 0, "invalid program".to_string());
    };
    let offset = input.len() - rest.len();
    let token = rest
        .split(|ch: char| ch == ',' || ch.is_whitespace())
        .next()
        .unwrap_or_default();

    let out_of_range = err
        .errors
        .iter()
        .any(|(_, kind)| matches!(kind, VerboseErrorKind::Nom(ErrorKind::MapRes)));

    let message = if out_of_range {
        format!("integer `{token}` does not fit in 64 bits")
    } else if token.is_empty() && rest.trim().is_empty() {
        "expected an integer, found end of input".to_string()
    } else if token.is_empty() {
        format!("expected an integer, found `{}`", rest.chars().next().unwrap_or(' '))
    } else {
        format!("unexpected `{token}`")
    };
    at(input, offset, token.len().max(1).min(rest.len()), message)
}

fn at(input: &str, offset: usize, length: usize, message: String) -> SyntaxError {
    let (line, source_line, column) = get_line(input, offset);
    SyntaxError {
        offset,
        length,
        line,
        column,
        message,
        source_line,
    }
}

/// This formats an error properly given the line, the message, the line
/// number, and the column number of the unexpected text.
fn make_error(line: &str, message: &str, line_number: usize, column_number: usize, length: usize) -> String {
    // The string used to underline the unexpected token
    let underline = format!(
        "{}^{}",
        " ".repeat(column_number),
        "-".repeat(length.saturating_sub(1))
    );

    format!(
        "{WS} |
{line_number} | {line}
{WS} | {underline}
{WS} |
{WS} = {message}",
        WS = " ".repeat(line_number.to_string().len()),
    )
}

// Gets the line number, the line, and the column number of an offset
fn get_line(script: &str, location: usize) -> (usize, String, usize) {
    let location = location.min(script.len());
    let before = &script[..location];
    let line_number = before.matches('\n').count() + 1;
    let start = before.rfind('\n').map(|i| i + 1).unwrap_or(0);
    let line = script[start..]
        .lines()
        .next()
        .unwrap_or_default()
        .trim_end_matches('\r')
        .to_string();
    let column = script[start..location].chars().count();
    (line_number, line, column)
}
