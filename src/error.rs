// Copyright 2018 Steven Bosnick
//
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE-2.0 or
// http://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms

//! Error types for pattern parsing and grammar compilation.

use std::result;

/// The error type for parsing a regular-expression pattern.
///
/// Every variant carries the byte offset into the pattern at which the
/// parse failed.
#[derive(Debug, Fail, PartialEq, Eq, Clone)]
pub enum ParseError {
    /// The pattern parsed but trailing input remained.
    #[fail(display = "non-exhaustive parse: trailing input at offset {}", _0)]
    NonExhaustive(usize),

    /// A parenthesized group was not closed with `)`.
    #[fail(display = "expected `)` at offset {}", _0)]
    ExpectedCloseParen(usize),

    /// A byte that cannot begin an atom appeared where an atom was
    /// expected.
    #[fail(display = "expected an atom at offset {}", _0)]
    ExpectedAtom(usize),

    /// A `\` introduced an escape sequence the pattern surface does not
    /// define.
    #[fail(display = "invalid escape sequence at offset {}", _0)]
    InvalidEscape(usize),

    /// A `\uHH` escape contained a non-hex digit.
    #[fail(display = "invalid hex digit in `\\u` escape at offset {}", _0)]
    InvalidHexDigit(usize),

    /// One of `\d \D \w \W \s \S` appeared inside a character class, where
    /// set-valued escapes are not permitted.
    #[fail(display = "illegal escape sequence in character class at offset {}", _0)]
    ClassEscape(usize),

    /// The pattern ended in the middle of a construct (an escape, a range,
    /// or an unclosed character class).
    #[fail(display = "unexpected end of pattern at offset {}", _0)]
    UnexpectedEnd(usize),
}

/// The error type for compiling a `Specification` into a `Grammar`.
#[derive(Debug, Fail)]
pub enum CompileError {
    /// A regex token's pattern failed to parse.
    #[fail(display = "invalid regular expression for token `{}`: {}", name, cause)]
    Regex {
        /// The name of the offending token.
        name: String,
        /// The underlying parse failure.
        #[cause]
        cause: ParseError,
    },

    /// An NFA token's builder produced an automaton that is empty or that
    /// violates the one-start/at-least-one-accepting shape.
    #[fail(display = "user automaton for token `{}` is invalid: {}", name, reason)]
    InvalidUserAutomaton {
        /// The name of the offending token.
        name: String,
        /// A short description of the violated invariant.
        reason: &'static str,
    },
}

/// A specialized `Result` type for grammar compilation.
pub type Result<T> = result::Result<T, CompileError>;

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn parse_error_displays_offset() {
        let sut = ParseError::ExpectedCloseParen(3);

        assert_eq!(sut.to_string(), "expected `)` at offset 3");
    }

    #[test]
    fn compile_error_displays_token_name_and_cause() {
        let sut = CompileError::Regex {
            name: "Literal".to_string(),
            cause: ParseError::UnexpectedEnd(5),
        };

        assert_eq!(
            sut.to_string(),
            "invalid regular expression for token `Literal`: \
             unexpected end of pattern at offset 5"
        );
    }
}
