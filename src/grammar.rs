// Copyright 2018 Steven Bosnick
//
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE-2.0 or
// http://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms

//! Token specifications and their compilation into a scanner automaton.
//!
//! A [`Specification`] is an ordered list of token classes, each defined
//! by a literal string, a regular expression, or a user-supplied NFA
//! builder. The order is significant: when two token classes accept the
//! same longest prefix, the one added first wins.
//!
//! [`Grammar::compile`] runs the whole pipeline: it parses regex patterns
//! into arena-allocated syntax trees, builds one Thompson NFA per token,
//! and projects the combined NFA onto a DFA by subset construction. The
//! subset of NFA states behind each DFA state remembers which token each
//! accepting member belongs to, which is where the priority tie-break is
//! decided.

use std::collections::{BTreeSet, HashMap};

use crate::charset::CharSet;
use crate::dfa;
use crate::error::{CompileError, Result};
use crate::nfa;
use crate::parser::RegexParser;
use crate::regex::{RegexContext, RegExp, RegExpKind};

/// The kind of pattern a [`TokenSpec`] carries.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TokenKind {
    /// The pattern is matched byte for byte.
    Literal,
    /// The pattern is a regular expression in the surface syntax.
    Regex,
    /// The token's automaton is built by a user-supplied callback.
    Nfa,
}

/// A single token class of a [`Specification`].
#[derive(Debug, Clone)]
pub struct TokenSpec {
    kind: TokenKind,
    token_type: i32,
    name: String,
    pattern: Vec<u8>,
    build: Option<fn(&mut nfa::Automaton)>,
}

impl TokenSpec {
    /// The kind of pattern this token carries.
    pub fn kind(&self) -> TokenKind {
        self.kind
    }

    /// The user-supplied token type emitted for this token.
    pub fn token_type(&self) -> i32 {
        self.token_type
    }

    /// The name of the token class.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// The pattern bytes; empty for `Nfa` tokens.
    pub fn pattern(&self) -> &[u8] {
        &self.pattern
    }

    /// The NFA builder callback for `Nfa` tokens.
    pub fn build(&self) -> Option<fn(&mut nfa::Automaton)> {
        self.build
    }
}

/// An ordered collection of token classes.
///
/// Tokens are appended in insertion order and the index of a token is its
/// priority: on a longest-match tie the smallest index wins. Token types
/// are user-chosen integers; they should not collide with the
/// [`EOF_TOKEN`] and [`ERROR_TOKEN`] sentinels.
///
/// [`EOF_TOKEN`]: crate::scanner::EOF_TOKEN
/// [`ERROR_TOKEN`]: crate::scanner::ERROR_TOKEN
#[derive(Debug, Clone, Default)]
pub struct Specification {
    tokens: Vec<TokenSpec>,
}

impl Specification {
    /// Create an empty specification.
    pub fn new() -> Specification {
        Specification::default()
    }

    /// Append a token class that matches `literal` byte for byte.
    pub fn add_literal_token<P: AsRef<[u8]>>(&mut self, token_type: i32, name: &str, literal: P) {
        self.tokens.push(TokenSpec {
            kind: TokenKind::Literal,
            token_type,
            name: name.to_string(),
            pattern: literal.as_ref().to_vec(),
            build: None,
        });
    }

    /// Append a token class that matches the regular expression `regex`.
    pub fn add_regex_token<P: AsRef<[u8]>>(&mut self, token_type: i32, name: &str, regex: P) {
        self.tokens.push(TokenSpec {
            kind: TokenKind::Regex,
            token_type,
            name: name.to_string(),
            pattern: regex.as_ref().to_vec(),
            build: None,
        });
    }

    /// Append a token class whose NFA is populated by `build`.
    ///
    /// The callback receives a fresh automaton and must leave it with
    /// exactly one start state and at least one accepting state.
    pub fn add_nfa_token(&mut self, token_type: i32, name: &str, build: fn(&mut nfa::Automaton)) {
        self.tokens.push(TokenSpec {
            kind: TokenKind::Nfa,
            token_type,
            name: name.to_string(),
            pattern: Vec::new(),
            build: Some(build),
        });
    }

    /// The token classes in insertion (priority) order.
    pub fn tokens(&self) -> &[TokenSpec] {
        &self.tokens
    }
}

/// A compiled specification: the token names and the scanner DFA.
///
/// A `Grammar` is logically immutable once `compile` returns; scanners
/// borrow its DFA (or copy a [`StaticTable`] projection of it) and may
/// then run independently.
///
/// [`StaticTable`]: crate::table::StaticTable
#[derive(Debug)]
pub struct Grammar {
    token_names: Vec<String>,
    dfa: dfa::Automaton,
}

impl Grammar {
    /// Compile a specification into a `Grammar`.
    ///
    /// The first malformed token short-circuits the compilation.
    pub fn compile(specification: &Specification) -> Result<Grammar> {
        let ctx = RegexContext::new();

        let mut nfas = Vec::with_capacity(specification.tokens().len());
        let mut token_names = Vec::with_capacity(specification.tokens().len());
        for token in specification.tokens() {
            nfas.push(build_token_nfa(&ctx, token)?);
            token_names.push(token.name().to_string());
        }

        let mut dfa = subset_construction(&nfas);

        for index in 0..dfa.states().len() {
            let id = dfa::StateId(index as u32);
            if dfa.state(id).is_accepting() {
                let token_index = dfa.state(id).token_index;
                debug_assert!(token_index >= 0);
                let token = &specification.tokens()[token_index as usize];
                dfa.state_mut(id).token_type = token.token_type();
            }
        }

        Ok(Grammar { token_names, dfa })
    }

    /// The scanner automaton.
    pub fn dfa(&self) -> &dfa::Automaton {
        &self.dfa
    }

    /// The token names, parallel to the specification's token list.
    pub fn token_names(&self) -> &[String] {
        &self.token_names
    }
}

/// The outcome of running a grammar's DFA over a whole input.
///
/// This is the return type of [`simulate`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Simulation<'g> {
    /// The input is a prefix of some token but is not itself one.
    Any,
    /// The input drove the automaton into the error state.
    Error,
    /// The whole input is a token with the given name.
    Accept(&'g str),
}

/// Run the grammar's DFA over all of `source` and classify the result.
///
/// Unlike the scanner this performs no longest-match backtracking: the
/// whole input must drive the automaton to a single final state.
pub fn simulate<'g, S: AsRef<[u8]>>(grammar: &'g Grammar, source: S) -> Simulation<'g> {
    let dfa = grammar.dfa();
    let mut state = dfa.start_state();

    for &c in source.as_ref() {
        state = transition(dfa, state, c);
    }

    let state = dfa.state(state);
    if state.is_error() {
        Simulation::Error
    } else if state.is_accepting() {
        Simulation::Accept(&grammar.token_names()[state.token_index as usize])
    } else {
        Simulation::Any
    }
}

fn transition(dfa: &dfa::Automaton, state: dfa::StateId, c: u8) -> dfa::StateId {
    dfa.arcs_from(state)
        .find(|arc| arc.char_set.contains(c))
        .map(|arc| arc.target)
        .expect("dfa transitions are total")
}

// A sub-automaton with designated entry and exit states.
#[derive(Clone, Copy)]
struct Frag {
    start: nfa::StateId,
    end: nfa::StateId,
}

fn build_token_nfa<'a>(ctx: &'a RegexContext<'a>, token: &TokenSpec) -> Result<nfa::Automaton> {
    match token.kind() {
        TokenKind::Literal => {
            let mut automaton = nfa::Automaton::new();
            let mut current = automaton.create_state();
            automaton.state_mut(current).start = true;
            for &c in token.pattern() {
                let next = automaton.create_state();
                automaton.create_character_arc(current, next, CharSet::single(c));
                current = next;
            }
            automaton.state_mut(current).accepting = true;
            Ok(automaton)
        }

        TokenKind::Regex => {
            let exp = RegexParser::new(ctx, token.pattern())
                .parse()
                .map_err(|cause| CompileError::Regex {
                    name: token.name().to_string(),
                    cause,
                })?;
            let mut automaton = nfa::Automaton::new();
            build_regex_nfa(&mut automaton, exp);
            Ok(automaton)
        }

        TokenKind::Nfa => {
            let mut automaton = nfa::Automaton::new();
            if let Some(build) = token.build() {
                build(&mut automaton);
            }
            validate_user_automaton(&automaton, token.name())?;
            Ok(automaton)
        }
    }
}

fn validate_user_automaton(automaton: &nfa::Automaton, name: &str) -> Result<()> {
    let invalid = |reason| {
        Err(CompileError::InvalidUserAutomaton {
            name: name.to_string(),
            reason,
        })
    };

    if automaton.is_empty() {
        return invalid("automaton has no states or arcs");
    }
    if automaton.start_state().is_none() {
        return invalid("automaton must have exactly one start state");
    }
    if !automaton.states().iter().any(|state| state.accepting) {
        return invalid("automaton must have at least one accepting state");
    }
    Ok(())
}

// Thompson construction. Every case allocates a fresh start/end pair and
// wires the recursively built sub-automata between them; the sub-automata
// give up their start/accepting flags so only the outermost pair keeps
// them.
fn build_regex_nfa(automaton: &mut nfa::Automaton, exp: RegExp) -> Frag {
    let start = automaton.create_state();
    automaton.state_mut(start).start = true;
    let end = automaton.create_state();
    automaton.state_mut(end).accepting = true;

    match exp.kind() {
        RegExpKind::Atom(char_set) => {
            automaton.create_character_arc(start, end, *char_set);
        }

        RegExpKind::Alternative(left, right) => {
            let left = build_inner_nfa(automaton, *left);
            let right = build_inner_nfa(automaton, *right);

            automaton.create_epsilon_arc(start, left.start);
            automaton.create_epsilon_arc(start, right.start);
            automaton.create_epsilon_arc(left.end, end);
            automaton.create_epsilon_arc(right.end, end);
        }

        RegExpKind::Concatenation(left, right) => {
            let left = build_inner_nfa(automaton, *left);
            let right = build_inner_nfa(automaton, *right);

            automaton.create_epsilon_arc(start, left.start);
            automaton.create_epsilon_arc(left.end, right.start);
            automaton.create_epsilon_arc(right.end, end);
        }

        RegExpKind::Kleene(exp) => {
            let inner = build_inner_nfa(automaton, *exp);

            automaton.create_epsilon_arc(start, inner.start);
            automaton.create_epsilon_arc(start, end);
            automaton.create_epsilon_arc(inner.end, end);
            automaton.create_epsilon_arc(end, start);
        }

        RegExpKind::PositiveKleene(exp) => {
            let inner = build_inner_nfa(automaton, *exp);

            automaton.create_epsilon_arc(start, inner.start);
            automaton.create_epsilon_arc(inner.end, end);
            automaton.create_epsilon_arc(end, start);
        }

        RegExpKind::Optional(exp) => {
            let inner = build_inner_nfa(automaton, *exp);

            automaton.create_epsilon_arc(start, inner.start);
            automaton.create_epsilon_arc(inner.end, end);
            automaton.create_epsilon_arc(start, end);
        }
    }

    Frag { start, end }
}

fn build_inner_nfa(automaton: &mut nfa::Automaton, exp: RegExp) -> Frag {
    let frag = build_regex_nfa(automaton, exp);
    automaton.state_mut(frag.start).start = false;
    automaton.state_mut(frag.end).accepting = false;
    frag
}

// Subset construction. DFA states are identified by the set of
// (nfa index, nfa state) pairs they represent; the sorted set is both the
// memoization key and the record from which acceptance is decided.
type Subset = BTreeSet<(usize, nfa::StateId)>;

fn subset_construction(nfas: &[nfa::Automaton]) -> dfa::Automaton {
    let mut dfa = dfa::Automaton::new();
    let mut mapping: HashMap<Subset, dfa::StateId> = HashMap::new();
    let mut queue: Vec<Subset> = Vec::new();

    let mut start_set = Subset::new();
    for (index, nfa) in nfas.iter().enumerate() {
        let start = nfa
            .start_state()
            .expect("per-token automaton has exactly one start state");
        start_set.insert((index, start));
    }
    let start_set = epsilon_closure(nfas, start_set);
    let start_id = find_or_create_state(&mut dfa, &mut mapping, &mut queue, start_set);
    dfa.state_mut(start_id).start = true;

    let mut next = 0;
    while next < queue.len() {
        let subset = queue[next].clone();
        next += 1;
        let origin = mapping[&subset];

        // one coalesced arc per reachable target
        let mut targets: Vec<(dfa::StateId, CharSet)> = Vec::new();
        for c in 0..=u8::MAX {
            let closure = epsilon_closure(nfas, move_by_char(nfas, &subset, c));
            let target = find_or_create_state(&mut dfa, &mut mapping, &mut queue, closure);
            match targets.iter().position(|&(id, _)| id == target) {
                Some(index) => targets[index].1.insert(c),
                None => targets.push((target, CharSet::single(c))),
            }
        }
        for (target, char_set) in targets {
            dfa.create_arc(origin, target, char_set);
        }

        if !dfa.state(origin).is_error() {
            let token_index = subset
                .iter()
                .filter(|&&(nfa_index, state)| nfas[nfa_index].state(state).accepting)
                .map(|&(nfa_index, _)| nfa_index)
                .min();
            if let Some(token_index) = token_index {
                let state = dfa.state_mut(origin);
                state.kind = dfa::StateKind::Accepting;
                state.token_index = token_index as i32;
            }
        }
    }

    dfa
}

fn find_or_create_state(
    dfa: &mut dfa::Automaton,
    mapping: &mut HashMap<Subset, dfa::StateId>,
    queue: &mut Vec<Subset>,
    subset: Subset,
) -> dfa::StateId {
    if let Some(&id) = mapping.get(&subset) {
        return id;
    }

    let id = dfa.create_state();
    if subset.is_empty() {
        dfa.state_mut(id).kind = dfa::StateKind::Error;
    }
    mapping.insert(subset.clone(), id);
    queue.push(subset);
    id
}

fn epsilon_closure(nfas: &[nfa::Automaton], states: Subset) -> Subset {
    let mut result = states;

    let mut modified = true;
    while modified {
        modified = false;

        let mut reachable = Vec::new();
        for &(nfa_index, state) in &result {
            for arc in nfas[nfa_index].arcs_from(state) {
                if arc.is_epsilon() {
                    reachable.push((nfa_index, arc.target));
                }
            }
        }

        for item in reachable {
            if result.insert(item) {
                modified = true;
            }
        }
    }

    result
}

fn move_by_char(nfas: &[nfa::Automaton], states: &Subset, c: u8) -> Subset {
    let mut reachable = Subset::new();

    for &(nfa_index, state) in states {
        for arc in nfas[nfa_index].arcs_from(state) {
            if arc.is_character() && arc.char_set.contains(c) {
                reachable.insert((nfa_index, arc.target));
            }
        }
    }

    reachable
}
