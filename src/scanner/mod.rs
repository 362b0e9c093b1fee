// Copyright (c) 2026 Redglyph (@gmail.com). All Rights Reserved.

pub(crate) mod tests;

use std::fmt::{Display, Formatter};
use std::ops::Range;
use crate::char_iter::{escape_string, CharItem, CharIter, IterState, Pos};
use crate::{ClassId, ModeId, StateId, TokenTypeId};

// ---------------------------------------------------------------------------------------------
// Types used in scanner tables

/// Half-open byte range `[start, end)` of a match in the input.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub struct Span {
    pub start: usize,
    pub end: usize,
}

impl Span {
    #[inline(always)]
    pub fn new(start: usize, end: usize) -> Self {
        Span { start, end }
    }

    #[inline(always)]
    pub fn len(&self) -> usize {
        self.end - self.start
    }

    #[inline(always)]
    pub fn is_empty(&self) -> bool {
        self.end <= self.start
    }

    #[inline(always)]
    pub fn range(&self) -> Range<usize> {
        self.start..self.end
    }
}

impl Display for Span {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "[{}, {})", self.start, self.end)
    }
}

/// Start and end [position](Pos) of a match, where `end` is the position *after* the
/// last matched character. A trailing newline advances the line and resets the column.
#[derive(Clone, Copy, PartialEq, Debug)]
pub struct Positions {
    pub start: Pos,
    pub end: Pos,
}

impl Positions {
    #[inline(always)]
    pub fn new(start: Pos, end: Pos) -> Self {
        Positions { start, end }
    }
}

impl Display for Positions {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}-{}", self.start, self.end)
    }
}

/// Output unit of the match finder.
#[derive(Clone, PartialEq, Debug)]
pub struct Match {
    pub span: Span,
    pub token_type: TokenTypeId,
    pub positions: Positions,
}

/// A match together with the text it covers.
#[derive(Clone, PartialEq, Debug)]
pub struct Token {
    pub text: String,
    pub token_type: TokenTypeId,
    pub matched: Match,
}

impl Token {
    #[inline]
    pub fn span(&self) -> Span {
        self.matched.span
    }

    #[inline]
    pub fn positions(&self) -> Positions {
        self.matched.positions
    }
}

impl Display for Token {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, ":{}(\"{}\")", self.token_type, escape_string(&self.text))
    }
}

/// Zero-width constraint attached to an accepting entry: the sub-DFA must match
/// (`Positive`) or must not match (`Negative`) at the position right after the
/// candidate match.
#[derive(Clone, PartialEq, Debug, Default)]
pub enum Lookahead {
    #[default]
    None,
    Positive(Vec<DfaState>),
    Negative(Vec<DfaState>),
}

/// One way of accepting in a DFA state. The entries of a state are evaluated in
/// their given order and the first one with a satisfied lookahead is taken;
/// `priority` only breaks length ties between candidates of different states.
#[derive(Clone, PartialEq, Debug)]
pub struct AcceptData {
    pub token_type: TokenTypeId,
    pub priority: u32,
    pub lookahead: Lookahead,
}

/// State of a scanner DFA. `transitions` is indexed by character class; an absent
/// slot is a dead transition. State 0 is the initial state of every DFA.
#[derive(Clone, PartialEq, Debug)]
pub struct DfaState {
    pub transitions: Vec<Option<StateId>>,
    pub accepts: Vec<AcceptData>,
}

/// Mode change triggered by an accepted token type.
#[derive(Clone, Copy, PartialEq, Debug)]
pub enum ModeAction {
    SetMode(ModeId),
    PushMode(ModeId),
    PopMode,
}

impl Display for ModeAction {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            ModeAction::SetMode(m) => write!(f, "mode({m})"),
            ModeAction::PushMode(m) => write!(f, "push({m})"),
            ModeAction::PopMode => write!(f, "pop"),
        }
    }
}

/// One scanner mode: a DFA plus the mode transitions applied when one of its
/// tokens is accepted.
#[derive(Clone, Debug)]
pub struct ScannerMode {
    pub name: String,
    pub transitions: Vec<(TokenTypeId, ModeAction)>,
    pub dfa: Vec<DfaState>,
}

impl ScannerMode {
    pub fn new<S: Into<String>>(name: S, dfa: Vec<DfaState>, transitions: Vec<(TokenTypeId, ModeAction)>) -> Self {
        ScannerMode { name: name.into(), transitions, dfa }
    }
}

// ---------------------------------------------------------------------------------------------
// Scanner context

/// Active mode and mode stack of a running scan. Mode 0 is active initially.
pub struct ScannerContext<'a> {
    modes: &'a [ScannerMode],
    current_mode: usize,
    mode_stack: Vec<usize>,
}

impl<'a> ScannerContext<'a> {
    pub fn new(modes: &'a [ScannerMode]) -> Self {
        ScannerContext { modes, current_mode: 0, mode_stack: Vec::new() }
    }

    pub fn current_mode(&self) -> usize {
        self.current_mode
    }

    pub fn current_mode_name(&self) -> &'a str {
        &self.modes[self.current_mode].name
    }

    pub fn current_dfa(&self) -> &'a [DfaState] {
        &self.modes[self.current_mode].dfa
    }

    /// Applies the first mode transition of the current mode matching `token_type`,
    /// if any. Popping an empty mode stack is silently ignored.
    pub fn handle_mode_transition(&mut self, token_type: TokenTypeId) {
        let mode = &self.modes[self.current_mode];
        if let Some((_, action)) = mode.transitions.iter().find(|(t, _)| *t == token_type) {
            match action {
                ModeAction::SetMode(m) => self.current_mode = *m as usize,
                ModeAction::PushMode(m) => {
                    self.mode_stack.push(self.current_mode);
                    self.current_mode = *m as usize;
                }
                ModeAction::PopMode => {
                    if let Some(m) = self.mode_stack.pop() {
                        self.current_mode = m;
                    }
                }
            }
        }
    }
}

// ---------------------------------------------------------------------------------------------
// Match finder

/// Decides whether a candidate accept beats the running best: the longer span wins,
/// and on equal length the smaller `priority` value wins.
#[inline]
pub(crate) fn better_candidate(len: usize, priority: u32, best: Option<(usize, u32)>) -> bool {
    match best {
        None => true,
        Some((best_len, best_priority)) => len > best_len || (len == best_len && priority < best_priority),
    }
}

struct BestAccept {
    len: usize,
    priority: u32,
    token_type: TokenTypeId,
    end: CharItem,
    rollback: IterState,
}

/// Iterator over the matches of an input, driving the active mode's DFA with
/// maximal munch.
///
/// Characters that cannot start any match are silently dropped, one at a time, so
/// the only visible trace of unrecognized input is a gap between the spans of two
/// consecutive matches. Mode transitions are applied after each accepted match,
/// before it is yielded.
pub struct FindMatches<'a, F> {
    chars: CharIter<'a>,
    context: ScannerContext<'a>,
    classify: F,
}

impl<'a, F: Fn(char) -> Option<ClassId>> FindMatches<'a, F> {
    pub fn new(input: &'a str, classify: F, modes: &'a [ScannerMode]) -> Self {
        FindMatches {
            chars: CharIter::new(input),
            context: ScannerContext::new(modes),
            classify,
        }
    }

    pub fn context(&self) -> &ScannerContext<'a> {
        &self.context
    }

    /// Finds the longest accepting match starting at the current position, leaving the
    /// iterator right after it, or restores the initial position and returns `None`.
    fn find_next(&mut self) -> Option<Match> {
        let initial = self.chars.save_state();
        let dfa = self.context.current_dfa();
        let mut state: StateId = 0;
        let mut start: Option<CharItem> = None;
        let mut best: Option<BestAccept> = None;
        loop {
            let Some(next) = self.chars.peek() else { break };
            let Some(class) = (self.classify)(next.char) else { break };
            let Some(&Some(target)) = dfa[state].transitions.get(class as usize) else { break };
            state = target;
            let item = self.chars.get_char().unwrap();
            let start_item = *start.get_or_insert(item);
            let mut satisfied: Option<&AcceptData> = None;
            for accept in &dfa[state].accepts {
                let ok = match &accept.lookahead {
                    Lookahead::None => true,
                    Lookahead::Positive(sub) => self.check_lookahead(sub),
                    Lookahead::Negative(sub) => !self.check_lookahead(sub),
                };
                if ok {
                    satisfied = Some(accept);
                    break;
                }
            }
            if let Some(accept) = satisfied {
                let len = item.index + item.char.len_utf8() - start_item.index;
                if better_candidate(len, accept.priority, best.as_ref().map(|b| (b.len, b.priority))) {
                    best = Some(BestAccept {
                        len,
                        priority: accept.priority,
                        token_type: accept.token_type,
                        end: item,
                        rollback: self.chars.save_state(),
                    });
                }
            }
        }
        match best {
            Some(b) => {
                self.chars.restore_state(b.rollback);
                let first = start.unwrap();
                let end_pos = if b.end.char == '\n' {
                    Pos(b.end.pos.line() + 1, 1)
                } else {
                    Pos(b.end.pos.line(), b.end.pos.col() + 1)
                };
                Some(Match {
                    span: Span::new(first.index, b.end.index + b.end.char.len_utf8()),
                    token_type: b.token_type,
                    positions: Positions::new(first.pos, end_pos),
                })
            }
            None => {
                self.chars.restore_state(initial);
                None
            }
        }
    }

    /// Runs a lookahead sub-DFA at the current position and tells whether an accepting
    /// state was ever reached. The iterator state is restored before returning, so
    /// lookahead is zero-width.
    fn check_lookahead(&mut self, sub: &[DfaState]) -> bool {
        let saved = self.chars.save_state();
        let mut state: StateId = 0;
        let mut accepted = false;
        loop {
            let Some(next) = self.chars.peek() else { break };
            let Some(class) = (self.classify)(next.char) else { break };
            let Some(&Some(target)) = sub[state].transitions.get(class as usize) else { break };
            state = target;
            self.chars.get_char();
            if !sub[state].accepts.is_empty() {
                accepted = true;
            }
        }
        self.chars.restore_state(saved);
        accepted
    }
}

impl<'a, F: Fn(char) -> Option<ClassId>> Iterator for FindMatches<'a, F> {
    type Item = Match;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            if let Some(matched) = self.find_next() {
                self.context.handle_mode_transition(matched.token_type);
                return Some(matched);
            }
            // no match can start here: drop one character to guarantee progress
            self.chars.get_char()?;
        }
    }
}

/// Iterates over all matches of `input`, including trivia.
pub fn find_matches<'a, F>(input: &'a str, classify: F, modes: &'a [ScannerMode]) -> FindMatches<'a, F>
where F: Fn(char) -> Option<ClassId>
{
    FindMatches::new(input, classify, modes)
}

// ---------------------------------------------------------------------------------------------
// Scanner façade

/// Token types dropped by [scan] before tokens are yielded (whitespace, comments, ...).
/// This set is the generator's convention; [Tokens::set_trivia_types] overrides it.
pub const TRIVIA_TOKEN_TYPES: &[TokenTypeId] = &[1, 2, 3, 4];

/// Scans `input` and yields its non-trivia [tokens](Token).
///
/// `file_name` only tags the returned iterator for diagnostics, the scanner itself
/// doesn't use it.
pub fn scan<'a, F>(input: &'a str, file_name: &'a str, classify: F, modes: &'a [ScannerMode]) -> Tokens<'a, F>
where F: Fn(char) -> Option<ClassId>
{
    Tokens {
        input,
        file_name,
        matches: FindMatches::new(input, classify, modes),
        trivia: TRIVIA_TOKEN_TYPES.to_vec(),
        trivia_sink: None,
    }
}

/// Token iterator returned by [scan].
pub struct Tokens<'a, F> {
    input: &'a str,
    /// Name of the scanned source, carried for diagnostics.
    pub file_name: &'a str,
    matches: FindMatches<'a, F>,
    trivia: Vec<TokenTypeId>,
    trivia_sink: Option<Box<dyn FnMut(Token) + 'a>>,
}

impl<'a, F: Fn(char) -> Option<ClassId>> Tokens<'a, F> {
    /// Replaces the default trivia set [TRIVIA_TOKEN_TYPES].
    pub fn set_trivia_types(mut self, trivia: Vec<TokenTypeId>) -> Self {
        self.trivia = trivia;
        self
    }

    /// Hands dropped trivia tokens to `f` instead of discarding them, for example to
    /// forward comments to the user actions.
    ///
    /// ## Example
    /// ```ignore
    /// let tokens = scan(text, "demo", classify, &modes)
    ///     .split_trivia(|token| comments.borrow_mut().push(token));
    /// let result = parser.parse(&mut actions, tokens);
    /// ```
    pub fn split_trivia<G: FnMut(Token) + 'a>(mut self, f: G) -> Self {
        self.trivia_sink = Some(Box::new(f));
        self
    }

    pub fn context(&self) -> &ScannerContext<'a> {
        self.matches.context()
    }
}

impl<'a, F: Fn(char) -> Option<ClassId>> Iterator for Tokens<'a, F> {
    type Item = Token;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            let matched = self.matches.next()?;
            let token = Token {
                text: self.input[matched.span.range()].to_string(),
                token_type: matched.token_type,
                matched,
            };
            if self.trivia.contains(&token.token_type) {
                if let Some(sink) = self.trivia_sink.as_mut() {
                    sink(token);
                }
                continue;
            }
            return Some(token);
        }
    }
}
