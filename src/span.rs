// Copyright 2018 Steven Bosnick
//
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE-2.0 or
// http://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms

//! Source positions and ranges for scanner output.

use std::cmp;
use std::fmt::{self, Display};

/// A 0-based line and column position within an input.
///
/// A `\n` byte ends its line: the following byte is at the next line,
/// column 0. Every other byte (including `\r`) advances the column.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Debug, Default, Hash)]
pub struct FilePosition {
    /// The 0-based line number.
    pub line: u64,
    /// The 0-based column number.
    pub column: u64,
}

impl FilePosition {
    /// Create a new `FilePosition` for a given line and column.
    pub fn new(line: u64, column: u64) -> FilePosition {
        FilePosition { line, column }
    }
}

impl Display for FilePosition {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}:{}", self.line, self.column)
    }
}

/// A half-open range of positions within a named input.
///
/// `end` is exclusive: it names the position just past the last byte of
/// the range.
#[derive(Clone, Copy, PartialEq, Eq, Debug, Default)]
pub struct FileRange<'a> {
    /// The path (or other designator) of the input the range refers to.
    pub file_path: &'a str,
    /// The first position of the range.
    pub first: FilePosition,
    /// The position just past the end of the range.
    pub end: FilePosition,
}

impl<'a> FileRange<'a> {
    /// Create a new `FileRange` for a given path and position pair.
    pub fn new(file_path: &'a str, first: FilePosition, end: FilePosition) -> FileRange<'a> {
        FileRange {
            file_path,
            first,
            end,
        }
    }

    /// Merge two ranges over the same input into their covering range.
    ///
    /// # Panics
    /// `merge` panics if the two ranges refer to different inputs.
    pub fn merge(a: FileRange<'a>, b: FileRange<'a>) -> FileRange<'a> {
        assert_eq!(
            a.file_path, b.file_path,
            "cannot merge ranges from different inputs"
        );
        FileRange {
            file_path: a.file_path,
            first: cmp::min(a.first, b.first),
            end: cmp::max(a.end, b.end),
        }
    }
}

impl<'a> Display for FileRange<'a> {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}:{}-{}", self.file_path, self.first, self.end)
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn position_default_is_origin() {
        let sut: FilePosition = Default::default();

        assert_eq!(sut, FilePosition::new(0, 0));
    }

    #[test]
    fn positions_order_by_line_before_column() {
        assert!(FilePosition::new(0, 9) < FilePosition::new(1, 0));
        assert!(FilePosition::new(1, 0) < FilePosition::new(1, 1));
    }

    #[test]
    fn merge_covers_both_ranges() {
        let a = FileRange::new("<input>", FilePosition::new(0, 2), FilePosition::new(0, 5));
        let b = FileRange::new("<input>", FilePosition::new(0, 4), FilePosition::new(1, 1));

        let sut = FileRange::merge(a, b);

        assert_eq!(sut.first, FilePosition::new(0, 2));
        assert_eq!(sut.end, FilePosition::new(1, 1));
    }

    #[test]
    #[should_panic]
    fn merge_of_ranges_from_different_inputs_panics() {
        let a = FileRange::new("a", FilePosition::new(0, 0), FilePosition::new(0, 1));
        let b = FileRange::new("b", FilePosition::new(0, 0), FilePosition::new(0, 1));

        FileRange::merge(a, b);
    }

    #[test]
    fn range_displays_path_and_positions() {
        let sut = FileRange::new("lex.in", FilePosition::new(0, 2), FilePosition::new(0, 5));

        assert_eq!(sut.to_string(), "lex.in:0:2-0:5");
    }
}
