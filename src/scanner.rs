// Copyright 2018 Steven Bosnick
//
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE-2.0 or
// http://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms

//! The longest-match scanner and its automaton drivers.
//!
//! `Scanner` performs a maximal-munch scan of a byte slice using a
//! supplied deterministic automaton. The automaton is abstracted behind
//! the [`Driver`] trait so the same scan loop can run against the compiled
//! [`dfa::Automaton`] graph directly ([`DfaDriver`]) or against a
//! flattened [`StaticTable`] ([`TableDriver`]). The table form is a single
//! array lookup per byte and is the one to prefer at runtime.
//!
//! For every token the scanner remembers the position of the last
//! accepting state it has seen and, once the automaton dies, backtracks
//! to it: the emitted lexeme is the longest accepted prefix and scanning
//! resumes immediately after it. A byte that cannot begin any token
//! produces one [`ERROR_TOKEN`] and ends the stream; end of input
//! produces one [`EOF_TOKEN`].

use arrayvec::ArrayVec;

use crate::dfa;
use crate::span::{FilePosition, FileRange};
use crate::table::StaticTable;

/// A scanner-level automaton state handle.
pub type State = u32;

/// The integer type of a token class, as supplied in the specification.
pub type TokenType = i32;

/// The token type of the synthetic end-of-input token.
pub const EOF_TOKEN: TokenType = -2;

/// The token type reported for input that matches no token class.
pub const ERROR_TOKEN: TokenType = -1;

/// The number of tokens the lookahead buffer can hold.
pub const LOOKAHEAD: usize = 64;

/// A token produced by a [`Scanner`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Token<'a> {
    /// The user-supplied token type, or one of the sentinels.
    pub token_type: TokenType,
    /// The matched bytes; a view into the scanner's input.
    pub lexeme: &'a [u8],
    /// The source range of the lexeme.
    pub range: FileRange<'a>,
}

/// The capability set a [`Scanner`] needs from an automaton.
pub trait Driver {
    /// The state scanning starts in.
    fn start_state(&self) -> State;

    /// The unique dead state.
    fn error_state(&self) -> State;

    /// The successor of `state` on the byte `c`.
    fn next_state(&self, state: State, c: u8) -> State;

    /// Check whether `state` accepts a token.
    fn is_accepting_state(&self, state: State) -> bool;

    /// Check whether `state` is the dead state.
    fn is_error_state(&self, state: State) -> bool;

    /// The token type accepted at `state`.
    fn accepting_token(&self, state: State) -> TokenType;
}

/// A [`Driver`] that walks a borrowed [`dfa::Automaton`] graph.
pub struct DfaDriver<'g> {
    dfa: &'g dfa::Automaton,
    start: State,
    error: State,
}

impl<'g> DfaDriver<'g> {
    /// Create a driver over `dfa`.
    ///
    /// # Panics
    /// Panics if `dfa` does not have exactly one start state and exactly
    /// one error state.
    pub fn new(dfa: &'g dfa::Automaton) -> DfaDriver<'g> {
        DfaDriver {
            dfa,
            start: dfa.start_state().0,
            error: dfa.error_state().0,
        }
    }
}

impl<'g> Driver for DfaDriver<'g> {
    fn start_state(&self) -> State {
        self.start
    }

    fn error_state(&self) -> State {
        self.error
    }

    fn next_state(&self, state: State, c: u8) -> State {
        self.dfa
            .arcs_from(dfa::StateId(state))
            .find(|arc| arc.char_set.contains(c))
            .map(|arc| arc.target.0)
            .expect("dfa transitions are total")
    }

    fn is_accepting_state(&self, state: State) -> bool {
        self.dfa.state(dfa::StateId(state)).is_accepting()
    }

    fn is_error_state(&self, state: State) -> bool {
        self.dfa.state(dfa::StateId(state)).is_error()
    }

    fn accepting_token(&self, state: State) -> TokenType {
        self.dfa.state(dfa::StateId(state)).token_type
    }
}

/// A [`Driver`] that indexes an owned [`StaticTable`].
pub struct TableDriver {
    table: StaticTable,
}

impl TableDriver {
    /// Create a driver over an existing table.
    pub fn new(table: StaticTable) -> TableDriver {
        TableDriver { table }
    }

    /// Flatten `dfa` into a table and create a driver over it.
    pub fn from_dfa(dfa: &dfa::Automaton) -> TableDriver {
        TableDriver::new(StaticTable::from_dfa(dfa))
    }

    /// The table backing this driver.
    pub fn static_table(&self) -> &StaticTable {
        &self.table
    }
}

impl Driver for TableDriver {
    fn start_state(&self) -> State {
        self.table.start_state()
    }

    fn error_state(&self) -> State {
        self.table.error_state()
    }

    fn next_state(&self, state: State, c: u8) -> State {
        self.table.next_state(state, c)
    }

    fn is_accepting_state(&self, state: State) -> bool {
        self.table.accepting_token(state) >= 0
    }

    fn is_error_state(&self, state: State) -> bool {
        self.table.error_state() == state
    }

    fn accepting_token(&self, state: State) -> TokenType {
        self.table.accepting_token(state)
    }
}

// A cursor into the input: byte offset, human position and the automaton
// state that was live when the cursor was recorded.
#[derive(Debug, Clone, Copy, Default)]
struct Position {
    offset: u64,
    line: u64,
    column: u64,
    state: State,
}

/// The longest-match tokenizer.
///
/// A scanner is created over a [`Driver`] and then pointed at an input
/// with [`initialize`]; tokens are pulled with [`has_next`]/[`next`] or
/// through the bounded lookahead interface. The scanner borrows the input
/// slice, so the emitted lexemes are views into it.
///
/// [`initialize`]: Scanner::initialize
/// [`has_next`]: Scanner::has_next
/// [`next`]: Scanner::next
pub struct Scanner<'a, D> {
    driver: D,
    file_path: &'a str,
    input: &'a [u8],

    first_accepting: Position,
    last_accepting: Position,
    current: Position,

    has_next_token: bool,
    scan_error: bool,
    eof_returned: bool,
    next_token: Option<Token<'a>>,

    buffer: RingBuffer<Token<'a>>,
}

impl<'a, D: Driver> Scanner<'a, D> {
    /// Create a scanner over `driver` with no input.
    pub fn new(driver: D) -> Scanner<'a, D> {
        Scanner {
            driver,
            file_path: "",
            input: &[],
            first_accepting: Position::default(),
            last_accepting: Position::default(),
            current: Position::default(),
            has_next_token: false,
            scan_error: false,
            eof_returned: false,
            next_token: None,
            buffer: RingBuffer::new(),
        }
    }

    /// Point the scanner at an input, resetting all positions and buffers.
    pub fn initialize(&mut self, file_path: &'a str, input: &'a [u8]) {
        self.file_path = file_path;
        self.input = input;

        self.first_accepting = Position::default();
        self.last_accepting = Position::default();
        self.current = Position::default();

        self.has_next_token = false;
        self.scan_error = false;
        self.eof_returned = false;
        self.next_token = None;
        self.buffer.clear();
    }

    /// Check whether another token is available.
    ///
    /// Returns false only once end of input has been reported by [`next`]
    /// or a scan error token has been consumed.
    ///
    /// [`next`]: Scanner::next
    pub fn has_next(&mut self) -> bool {
        if self.has_next_token {
            return true;
        }
        if self.scan_error {
            return false;
        }

        self.get_next_token();
        self.has_next_token || !self.eof_returned
    }

    /// Take the next token.
    ///
    /// When the input is exhausted this returns a synthetic end-of-input
    /// token (type [`EOF_TOKEN`], empty lexeme, range pinned to the final
    /// position) exactly once.
    ///
    /// # Panics
    /// Panics if called after the token stream ended.
    pub fn next(&mut self) -> Token<'a> {
        assert!(self.has_next(), "next() called after the token stream ended");

        if !self.has_next_token {
            self.eof_returned = true;
            return Token {
                token_type: EOF_TOKEN,
                lexeme: &[],
                range: self.accepting_range(),
            };
        }

        self.has_next_token = false;
        self.next_token
            .take()
            .expect("a token is buffered whenever has_next_token is set")
    }

    /// Check whether the token `offset` positions ahead can be inspected.
    pub fn can_lookahead(&mut self, offset: usize) -> bool {
        self.require_offset(offset)
    }

    /// Inspect the token `offset` positions ahead without consuming it.
    ///
    /// # Panics
    /// Panics if `can_lookahead(offset)` is false.
    pub fn lookahead(&mut self, offset: usize) -> &Token<'a> {
        assert!(
            self.can_lookahead(offset),
            "lookahead({}) past the end of the token stream",
            offset
        );
        self.buffer.get(offset)
    }

    /// Check whether `count` tokens can be consumed.
    pub fn can_consume(&mut self, count: usize) -> bool {
        count >= 1 && self.require_offset(count - 1)
    }

    /// Consume `count` tokens and return the last one.
    ///
    /// # Panics
    /// Panics if `can_consume(count)` is false.
    pub fn consume(&mut self, count: usize) -> Token<'a> {
        assert!(
            self.can_consume(count),
            "consume({}) past the end of the token stream",
            count
        );

        let mut token = self.buffer.consume();
        for _ in 1..count {
            token = self.buffer.consume();
        }
        token
    }

    fn require_offset(&mut self, offset: usize) -> bool {
        assert!(offset < LOOKAHEAD, "lookahead window is {} tokens", LOOKAHEAD);

        if self.buffer.len() <= offset {
            while !self.buffer.full() && self.has_next() {
                let token = self.next();
                self.buffer.write(token);
            }
        }
        offset < self.buffer.len()
    }

    fn get_char(&mut self) -> u8 {
        let c = self.input[self.current.offset as usize];
        self.current.offset += 1;
        if c == b'\n' {
            self.current.line += 1;
            self.current.column = 0;
        } else {
            self.current.column += 1;
        }
        c
    }

    fn get_next_token(&mut self) {
        let mut state = self.driver.start_state();
        self.current.state = self.driver.error_state();
        self.last_accepting = self.current;
        self.first_accepting = self.current;

        // an accepting start state permits an empty match, though any
        // longer match found below still wins
        if self.driver.is_accepting_state(state) {
            self.current.state = state;
            self.first_accepting = self.current;
            self.last_accepting = self.current;
        }

        while !self.driver.is_error_state(state) && (self.current.offset as usize) < self.input.len()
        {
            let c = self.get_char();
            state = self.driver.next_state(state, c);
            if self.driver.is_accepting_state(state) {
                self.current.state = state;
                self.last_accepting = self.current;
            }
        }

        if !self.driver.is_error_state(self.last_accepting.state) {
            let lexeme =
                &self.input[self.first_accepting.offset as usize..self.last_accepting.offset as usize];
            let token = Token {
                token_type: self.driver.accepting_token(self.last_accepting.state),
                lexeme,
                range: self.accepting_range(),
            };

            // resume scanning right after the accepted lexeme
            self.current = self.last_accepting;
            self.has_next_token = true;
            self.next_token = Some(token);
        } else if self.driver.is_error_state(self.current.state)
            && (self.first_accepting.offset as usize) < self.input.len()
        {
            let token = Token {
                token_type: ERROR_TOKEN,
                lexeme: &[],
                range: self.accepting_range(),
            };

            self.has_next_token = true;
            self.scan_error = true;
            self.next_token = Some(token);
        }
    }

    fn accepting_range(&self) -> FileRange<'a> {
        FileRange::new(
            self.file_path,
            FilePosition::new(self.first_accepting.line, self.first_accepting.column),
            FilePosition::new(self.last_accepting.line, self.last_accepting.column),
        )
    }
}

// A fixed-capacity FIFO of buffered tokens.
struct RingBuffer<T> {
    items: ArrayVec<T, LOOKAHEAD>,
}

impl<T> RingBuffer<T> {
    fn new() -> RingBuffer<T> {
        RingBuffer {
            items: ArrayVec::new(),
        }
    }

    fn len(&self) -> usize {
        self.items.len()
    }

    fn full(&self) -> bool {
        self.items.is_full()
    }

    fn clear(&mut self) {
        self.items.clear();
    }

    fn write(&mut self, item: T) {
        self.items.push(item);
    }

    fn get(&self, offset: usize) -> &T {
        &self.items[offset]
    }

    fn consume(&mut self) -> T {
        self.items.remove(0)
    }
}
