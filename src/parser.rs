// Copyright 2018 Steven Bosnick
//
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE-2.0 or
// http://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms

//! Recursive-descent parser for the regular-expression surface syntax.
//!
//! The grammar, lowest precedence first:
//!
//! ```text
//! alternative   := concatenation ('|' concatenation)*
//! concatenation := postfix postfix*
//! postfix       := atom ('*' | '+' | '?')*
//! atom          := '(' alternative ')'
//!               |  '[' class_body ']'
//!               |  top_level_atom
//! ```
//!
//! Concatenation continues for as long as the next byte can begin an atom;
//! postfix operators stack in left-to-right wrapping order, so `a*+?` is
//! `Optional(PositiveKleene(Kleene(Atom('a'))))`.
//!
//! The set-valued escapes `\d \D \w \W \s \S` are available at the top
//! level only; inside a character class they are rejected so that range
//! endpoints are always single bytes. `\uHH` consumes exactly two hex
//! digits wherever it appears.

use crate::charset::CharSet;
use crate::error::ParseError;
use crate::regex::{RegexContext, RegExp};

type Result<T> = std::result::Result<T, ParseError>;

/// A parser turning a pattern in the surface syntax into a [`RegExp`].
///
/// The parser allocates the resulting tree from the supplied
/// [`RegexContext`]; the tree is valid for the lifetime of that context.
pub struct RegexParser<'a, 'p> {
    ctx: &'a RegexContext<'a>,
    input: &'p [u8],
    offset: usize,
}

impl<'a, 'p> RegexParser<'a, 'p> {
    /// Create a parser for `input` that allocates from `ctx`.
    pub fn new(ctx: &'a RegexContext<'a>, input: &'p [u8]) -> RegexParser<'a, 'p> {
        RegexParser {
            ctx,
            input,
            offset: 0,
        }
    }

    /// Parse the whole input as a single regular expression.
    ///
    /// It is an error for input to remain after the outermost alternative.
    pub fn parse(mut self) -> Result<RegExp<'a>> {
        let exp = self.parse_alternative()?;
        if self.can_peek() {
            return Err(ParseError::NonExhaustive(self.offset));
        }
        Ok(exp)
    }

    fn parse_alternative(&mut self) -> Result<RegExp<'a>> {
        let mut result = self.parse_concatenation()?;

        while self.peek() == Some(b'|') {
            self.advance()?;
            let exp = self.parse_concatenation()?;
            result = self.ctx.alternative(result, exp);
        }

        Ok(result)
    }

    fn parse_concatenation(&mut self) -> Result<RegExp<'a>> {
        let mut result = self.parse_postfix()?;

        while self.peek().map_or(false, can_be_atom) {
            let exp = self.parse_postfix()?;
            result = self.ctx.concatenation(result, exp);
        }

        Ok(result)
    }

    fn parse_postfix(&mut self) -> Result<RegExp<'a>> {
        let mut result = self.parse_atom()?;

        while let Some(c) = self.peek() {
            result = match c {
                b'*' => self.ctx.kleene(result),
                b'+' => self.ctx.positive_kleene(result),
                b'?' => self.ctx.optional(result),
                _ => break,
            };
            self.advance()?;
        }

        Ok(result)
    }

    fn parse_atom(&mut self) -> Result<RegExp<'a>> {
        match self.peek() {
            Some(b'(') => self.parse_nested_atom(),
            Some(b'[') => self.parse_class_atom(),
            Some(c) if can_be_top_level_atom(c) => self.parse_top_level_atom(),
            Some(_) => Err(ParseError::ExpectedAtom(self.offset)),
            None => Err(ParseError::UnexpectedEnd(self.offset)),
        }
    }

    fn parse_nested_atom(&mut self) -> Result<RegExp<'a>> {
        self.advance()?; // '('
        let exp = self.parse_alternative()?;
        if self.peek() != Some(b')') {
            return Err(ParseError::ExpectedCloseParen(self.offset));
        }
        self.advance()?;
        Ok(exp)
    }

    fn parse_class_atom(&mut self) -> Result<RegExp<'a>> {
        self.advance()?; // '['

        let negate = self.peek() == Some(b'^');
        if negate {
            self.advance()?;
        }

        let mut char_set = CharSet::new();
        loop {
            match self.peek() {
                Some(b']') => {
                    self.advance()?;
                    break;
                }
                Some(_) => char_set |= self.parse_class_segment()?,
                None => return Err(ParseError::UnexpectedEnd(self.offset)),
            }
        }

        if negate {
            char_set.negate();
        }

        Ok(self.ctx.atom(char_set))
    }

    // One segment of a class body: a literal '-', a single char, a range
    // 'a-b', or 'a' followed by a '-' that immediately precedes ']'.
    fn parse_class_segment(&mut self) -> Result<CharSet> {
        if self.peek() == Some(b'-') {
            self.advance()?;
            return Ok(CharSet::single(b'-'));
        }

        let first = self.parse_class_char()?;
        if self.peek() == Some(b'-') {
            self.advance()?;
            if self.peek() == Some(b']') {
                return Ok(CharSet::single(first) | CharSet::single(b'-'));
            }
            let last = self.parse_class_char()?;
            return Ok(CharSet::range(first, last));
        }

        Ok(CharSet::single(first))
    }

    fn parse_class_char(&mut self) -> Result<u8> {
        let offset = self.offset;
        let c = match self.peek() {
            Some(c) => c,
            None => return Err(ParseError::UnexpectedEnd(offset)),
        };
        if !can_be_class_atom(c) {
            return Err(ParseError::ExpectedAtom(offset));
        }
        self.advance()?;

        if c != b'\\' {
            return Ok(c);
        }

        let escape_offset = self.offset;
        match self.advance()? {
            c @ (b'|' | b'.' | b'\\' | b'^' | b'$' | b'%' | b'&' | b'+' | b'!' | b'#' | b'\'') => {
                Ok(c)
            }
            b't' => Ok(b'\t'),
            b'r' => Ok(b'\r'),
            b'n' => Ok(b'\n'),
            b'd' | b'D' | b'w' | b'W' | b's' | b'S' => Err(ParseError::ClassEscape(escape_offset)),
            b'u' => self.parse_hex_byte(),
            _ => Err(ParseError::InvalidEscape(escape_offset)),
        }
    }

    fn parse_top_level_atom(&mut self) -> Result<RegExp<'a>> {
        let char_set = self.parse_top_level_chars()?;
        Ok(self.ctx.atom(char_set))
    }

    fn parse_top_level_chars(&mut self) -> Result<CharSet> {
        match self.advance()? {
            b'.' => Ok(CharSet::full()),
            b'\\' => self.parse_top_level_escape(),
            c => Ok(CharSet::single(c)),
        }
    }

    fn parse_top_level_escape(&mut self) -> Result<CharSet> {
        let escape_offset = self.offset;
        match self.advance()? {
            c @ (b'|' | b'.' | b'\\' | b'^' | b'$' | b'%' | b'&' | b'+' | b'!' | b'#' | b'\'') => {
                Ok(CharSet::single(c))
            }
            b't' => Ok(CharSet::single(b'\t')),
            b'r' => Ok(CharSet::single(b'\r')),
            b'n' => Ok(CharSet::single(b'\n')),
            b'd' => Ok(digit_set()),
            b'D' => Ok(!digit_set()),
            b'w' => Ok(word_set()),
            b'W' => Ok(!word_set()),
            b's' => Ok(space_set()),
            b'S' => Ok(!space_set()),
            b'u' => Ok(CharSet::single(self.parse_hex_byte()?)),
            _ => Err(ParseError::InvalidEscape(escape_offset)),
        }
    }

    // Exactly two hex digits; any further hex digit in the input is an
    // ordinary atom that follows the escape.
    fn parse_hex_byte(&mut self) -> Result<u8> {
        let hi_offset = self.offset;
        let hi = unhex(self.advance()?).ok_or(ParseError::InvalidHexDigit(hi_offset))?;
        let lo_offset = self.offset;
        let lo = unhex(self.advance()?).ok_or(ParseError::InvalidHexDigit(lo_offset))?;
        Ok(hi * 16 + lo)
    }

    fn can_peek(&self) -> bool {
        self.offset < self.input.len()
    }

    fn peek(&self) -> Option<u8> {
        self.input.get(self.offset).copied()
    }

    fn advance(&mut self) -> Result<u8> {
        match self.input.get(self.offset) {
            Some(&c) => {
                self.offset += 1;
                Ok(c)
            }
            None => Err(ParseError::UnexpectedEnd(self.offset)),
        }
    }
}

fn can_be_atom(c: u8) -> bool {
    c == b'(' || c == b'[' || can_be_top_level_atom(c)
}

fn can_be_top_level_atom(c: u8) -> bool {
    match c {
        b'a'..=b'z' | b'A'..=b'Z' | b'0'..=b'9' => true,
        b'.' | b'\\' | b' ' | b'-' | b':' | b'/' | b'_' | b'^' | b'$' | b'%' | b'&' | b'!'
        | b'#' | b'\'' | b'\n' | b'\r' | b'\t' => true,
        _ => false,
    }
}

// The class alphabet additionally admits '+', which is a postfix operator
// at the top level.
fn can_be_class_atom(c: u8) -> bool {
    c == b'+' || can_be_top_level_atom(c)
}

fn unhex(c: u8) -> Option<u8> {
    match c {
        b'0'..=b'9' => Some(c - b'0'),
        b'a'..=b'f' => Some(10 + c - b'a'),
        b'A'..=b'F' => Some(10 + c - b'A'),
        _ => None,
    }
}

fn digit_set() -> CharSet {
    CharSet::range(b'0', b'9')
}

fn word_set() -> CharSet {
    CharSet::range(b'a', b'z') | CharSet::range(b'A', b'Z') | digit_set() | CharSet::single(b'_')
}

fn space_set() -> CharSet {
    CharSet::single(b'\t')
        | CharSet::single(b'\n')
        | CharSet::single(0x0B)
        | CharSet::single(0x0C)
        | CharSet::single(b'\r')
        | CharSet::single(b' ')
}

#[cfg(test)]
mod test {
    use super::*;

    fn parse(pattern: &str) -> String {
        let ctx = RegexContext::new();
        match RegexParser::new(&ctx, pattern.as_bytes()).parse() {
            Ok(exp) => exp.to_string(),
            Err(err) => format!("Parse error: {}", err),
        }
    }

    fn parse_err(pattern: &str) -> ParseError {
        let ctx = RegexContext::new();
        RegexParser::new(&ctx, pattern.as_bytes())
            .parse()
            .expect_err("unexpected successful parse")
    }

    #[test]
    fn single_atoms_parse_to_singleton_sets() {
        assert_eq!(parse("a"), "Atom('a')");
        assert_eq!(parse(" "), "Atom(' ')");
        assert_eq!(parse("\\n"), "Atom('\\n')");
        assert_eq!(parse("\\u5E"), "Atom('^')");
    }

    #[test]
    fn dot_parses_to_full_alphabet() {
        assert_eq!(parse("."), "Atom('\\u0' - '\\uFF')");
    }

    #[test]
    fn bare_minus_parses_to_literal_minus() {
        assert_eq!(parse("-"), "Atom('-')");
    }

    #[test]
    fn alternatives_parse_left_associated() {
        assert_eq!(parse("a|b"), "Alternative(Atom('a'), Atom('b'))");
        assert_eq!(parse("a| "), "Alternative(Atom('a'), Atom(' '))");
        assert_eq!(parse("a|\\n"), "Alternative(Atom('a'), Atom('\\n'))");
        assert_eq!(parse("a|\\u5E"), "Alternative(Atom('a'), Atom('^'))");
    }

    #[test]
    fn concatenations_parse_left_associated() {
        assert_eq!(parse("aa"), "Concatenation(Atom('a'), Atom('a'))");
        assert_eq!(parse("a "), "Concatenation(Atom('a'), Atom(' '))");
        assert_eq!(parse("\\\\n"), "Concatenation(Atom('\\\\'), Atom('n'))");
        assert_eq!(parse("a\\n"), "Concatenation(Atom('a'), Atom('\\n'))");
        assert_eq!(parse("a\\u5E"), "Concatenation(Atom('a'), Atom('^'))");
    }

    #[test]
    fn postfix_operators_wrap_in_order() {
        assert_eq!(parse("a*"), "Kleene(Atom('a'))");
        assert_eq!(parse("a+"), "PositiveKleene(Atom('a'))");
        assert_eq!(parse("a?"), "Optional(Atom('a'))");
        assert_eq!(parse("a*+?"), "Optional(PositiveKleene(Kleene(Atom('a'))))");
    }

    #[test]
    fn concatenation_binds_tighter_than_alternative() {
        assert_eq!(
            parse("ab|c"),
            "Alternative(Concatenation(Atom('a'), Atom('b')), Atom('c'))"
        );
        assert_eq!(
            parse("a|bc"),
            "Alternative(Atom('a'), Concatenation(Atom('b'), Atom('c')))"
        );
    }

    #[test]
    fn groups_are_transparent() {
        assert_eq!(parse("(a)"), "Atom('a')");
        assert_eq!(
            parse("a(b|c)"),
            "Concatenation(Atom('a'), Alternative(Atom('b'), Atom('c')))"
        );
    }

    #[test]
    fn empty_class_parses_to_empty_atom() {
        // the parser accepts the empty character class; it matches nothing
        assert_eq!(parse("[]"), "Atom()");
    }

    #[test]
    fn classes_parse_to_range_sets() {
        assert_eq!(parse("[a]"), "Atom('a')");
        assert_eq!(parse("[ab]"), "Atom('a' - 'b')");
        assert_eq!(parse("[a-c]"), "Atom('a' - 'c')");
        assert_eq!(parse("[a-zA-Z]"), "Atom('A' - 'Z', 'a' - 'z')");
    }

    #[test]
    fn leading_minus_in_class_is_literal() {
        assert_eq!(parse("[-a]"), "Atom('-', 'a')");
    }

    #[test]
    fn trailing_minus_in_class_is_literal() {
        assert_eq!(parse("[a-]"), "Atom('-', 'a')");
    }

    #[test]
    fn negated_class_inverts_the_whole_set() {
        assert_eq!(parse("[^\\u00-/:-\\uFF]"), "Atom('0' - '9')");
    }

    #[test]
    fn class_range_endpoints_accept_escapes() {
        assert_eq!(parse("[\\u30-\\u39]"), "Atom('0' - '9')");
    }

    #[test]
    fn top_level_shorthand_escapes_expand_to_sets() {
        assert_eq!(parse("\\d"), "Atom('0' - '9')");
        assert_eq!(parse("\\w"), "Atom('0' - '9', 'A' - 'Z', '_', 'a' - 'z')");
        assert_eq!(parse("\\s"), "Atom('\\t' - '\\r', ' ')");
        assert_eq!(
            parse("\\S"),
            "Atom('\\u0' - '\\u8', '\\uE' - '\\u1F', '!' - '\\uFF')"
        );
    }

    #[test]
    fn hex_escape_takes_exactly_two_digits() {
        // the trailing 'a' is an ordinary atom, not a third hex digit
        assert_eq!(
            parse("\\u41a"),
            "Concatenation(Atom('A'), Atom('a'))"
        );
    }

    #[test]
    fn trailing_input_is_non_exhaustive() {
        assert_matches!(parse_err("a)"), ParseError::NonExhaustive(1));
    }

    #[test]
    fn unclosed_group_reports_expected_close_paren() {
        assert_matches!(parse_err("(a"), ParseError::ExpectedCloseParen(_));
    }

    #[test]
    fn unknown_escape_is_an_error() {
        assert_matches!(parse_err("\\q"), ParseError::InvalidEscape(_));
    }

    #[test]
    fn bad_hex_digit_is_an_error() {
        assert_matches!(parse_err("\\uZ1"), ParseError::InvalidHexDigit(_));
    }

    #[test]
    fn set_escapes_are_rejected_inside_classes() {
        assert_matches!(parse_err("[\\d]"), ParseError::ClassEscape(_));
        assert_matches!(parse_err("[a\\s]"), ParseError::ClassEscape(_));
    }

    #[test]
    fn unterminated_class_reports_unexpected_end() {
        assert_matches!(parse_err("[abc"), ParseError::UnexpectedEnd(_));
    }

    #[test]
    fn escape_at_end_of_pattern_reports_unexpected_end() {
        assert_matches!(parse_err("\\"), ParseError::UnexpectedEnd(_));
    }

    #[test]
    fn caret_and_dollar_are_ordinary_atoms() {
        assert_eq!(parse("^"), "Atom('^')");
        assert_eq!(parse("$"), "Atom('$')");
        assert_eq!(
            parse("^a$"),
            "Concatenation(Concatenation(Atom('^'), Atom('a')), Atom('$'))"
        );
    }

    #[test]
    fn postfix_operator_without_atom_is_an_error() {
        assert_matches!(parse_err("*"), ParseError::ExpectedAtom(0));
    }

    #[test]
    fn patterns_round_trip_through_to_pattern() {
        let patterns: &[&str] = &[
            "a",
            "ab|c",
            "a(b|c)*",
            "[a-zA-Z_][a-zA-Z0-9_]*",
            "(\\d+(\\.\\d*)?|\\d*\\.\\d+)([eE][+-]?\\d+)?",
            "[-a-zA-Z/]+",
            "a*+?",
            "\\S",
        ];

        for pattern in patterns {
            let ctx = RegexContext::new();
            let first = RegexParser::new(&ctx, pattern.as_bytes())
                .parse()
                .expect("unexpected parse error");
            let second = RegexParser::new(&ctx, first.to_pattern().as_bytes())
                .parse()
                .expect("unexpected re-parse error");

            assert_eq!(first, second, "pattern {:?} did not round trip", pattern);
        }
    }
}
