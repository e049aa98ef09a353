// Copyright 2018 Steven Bosnick
//
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE-2.0 or
// http://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms

//! A flat transition-table projection of a scanner automaton.
//!
//! A `StaticTable` is a pure value with no pointers back into the
//! [`dfa::Automaton`] it was built from: one `u32` per (state, byte) pair
//! and one `i32` acceptance entry per state. Its `Display` implementation
//! emits a Rust expression that rebuilds the table from byte-string
//! literals, which is how a compiled grammar can be embedded into source
//! at build time.

use std::fmt::{self, Display};

use crate::dfa;
use crate::scanner::{State, TokenType, ERROR_TOKEN};

const CHAR_COUNT: usize = 256;

/// A flattened scanner automaton.
///
/// `transitions` holds `state_count * 256` entries in row-major order
/// (`state * 256 + byte`); every entry not covered by a DFA arc is the
/// error state. `accepting` holds one entry per state: the token type of
/// an accepting state, or the [`ERROR_TOKEN`] sentinel.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StaticTable {
    start_state: State,
    error_state: State,
    transitions: Vec<State>,
    accepting: Vec<TokenType>,
}

impl StaticTable {
    /// Assemble a table from its parts.
    pub fn new(
        start_state: State,
        error_state: State,
        transitions: Vec<State>,
        accepting: Vec<TokenType>,
    ) -> StaticTable {
        StaticTable {
            start_state,
            error_state,
            transitions,
            accepting,
        }
    }

    /// Flatten a scanner automaton into a table.
    pub fn from_dfa(dfa: &dfa::Automaton) -> StaticTable {
        let start_state = dfa.start_state().0;
        let error_state = dfa.error_state().0;
        let state_count = dfa.states().len();

        let mut transitions = vec![error_state; state_count * CHAR_COUNT];
        let mut accepting = vec![ERROR_TOKEN; state_count];

        for arc in dfa.arcs() {
            for (first, last) in arc.char_set.ranges() {
                for c in first..=last {
                    transitions[table_index(arc.origin.0, c)] = arc.target.0;
                }
            }
        }
        for state in dfa.states() {
            if state.is_accepting() {
                accepting[state.id.index()] = state.token_type;
            }
        }

        StaticTable {
            start_state,
            error_state,
            transitions,
            accepting,
        }
    }

    /// Rebuild a table from the little-endian byte images of its arrays.
    ///
    /// This is the constructor the `Display` serialization form calls.
    ///
    /// # Panics
    /// Panics if either byte string's length is not a multiple of four.
    pub fn from_raw(
        start_state: State,
        error_state: State,
        transitions: &[u8],
        accepting: &[u8],
    ) -> StaticTable {
        assert!(
            transitions.len() % 4 == 0 && accepting.len() % 4 == 0,
            "raw table bytes must be a sequence of 4-byte little-endian words"
        );

        StaticTable {
            start_state,
            error_state,
            transitions: transitions
                .chunks_exact(4)
                .map(|word| State::from_le_bytes([word[0], word[1], word[2], word[3]]))
                .collect(),
            accepting: accepting
                .chunks_exact(4)
                .map(|word| TokenType::from_le_bytes([word[0], word[1], word[2], word[3]]))
                .collect(),
        }
    }

    /// The start state of the automaton.
    pub fn start_state(&self) -> State {
        self.start_state
    }

    /// The error state of the automaton.
    pub fn error_state(&self) -> State {
        self.error_state
    }

    /// The flattened transition array.
    pub fn transitions(&self) -> &[State] {
        &self.transitions
    }

    /// The per-state acceptance array.
    pub fn accepting(&self) -> &[TokenType] {
        &self.accepting
    }

    /// The number of states in the flattened automaton.
    pub fn state_count(&self) -> usize {
        self.accepting.len()
    }

    /// Look up the successor of `state` on the byte `c`.
    pub fn next_state(&self, state: State, c: u8) -> State {
        self.transitions[table_index(state, c)]
    }

    /// Look up the acceptance entry for `state`.
    pub fn accepting_token(&self, state: State) -> TokenType {
        self.accepting[state as usize]
    }
}

fn table_index(state: State, c: u8) -> usize {
    c as usize + state as usize * CHAR_COUNT
}

impl Display for StaticTable {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(
            f,
            "StaticTable::from_raw({}, {}, b\"",
            self.start_state, self.error_state
        )?;
        for word in &self.transitions {
            write_word(f, word.to_le_bytes())?;
        }
        write!(f, "\", b\"")?;
        for word in &self.accepting {
            write_word(f, word.to_le_bytes())?;
        }
        write!(f, "\")")
    }
}

fn write_word(f: &mut fmt::Formatter, bytes: [u8; 4]) -> fmt::Result {
    for byte in &bytes {
        write!(f, "\\x{:02X}", byte)?;
    }
    Ok(())
}
