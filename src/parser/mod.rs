// Copyright (c) 2026 Redglyph (@gmail.com). All Rights Reserved.


use std::any::{type_name, Any};
use std::error::Error;
use std::fmt::{Debug, Display, Formatter};
use std::rc::Rc;
use iter_index::IndexerIterator;
use crate::char_iter::Pos;
use crate::convert::{ConverterScope, ValueConverter};
use crate::log::Logger;
use crate::scanner::Token;
use crate::sym_table::SymTable;
use crate::token_stream::TokenStream;
use crate::{CollectJoin, ProdId, StateId, TokenTypeId, VarId, EOF_TOKEN};

// ---------------------------------------------------------------------------------------------
// Types used in parser tables

/// One item of a production's right-hand side, or the synthetic end-of-production
/// marker on the parse stack.
///
/// * `T` matches a terminal and forwards its token to the semantic action
/// * `C` matches a terminal but clips it: the token is consumed, not forwarded
/// * `N` expands into a production of the nonterminal
/// * `E` marks the end of a production and triggers its semantic action
#[derive(Clone, Copy, PartialEq, Eq, Debug, Hash)]
pub enum ParseItem {
    T(TokenTypeId),
    C(TokenTypeId),
    N(VarId),
    E(ProdId),
}

impl ParseItem {
    /// Does this item contribute a value to the value stack?
    pub fn is_value(&self) -> bool {
        !matches!(self, ParseItem::C(_))
    }
}

impl Display for ParseItem {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            ParseItem::T(t) => write!(f, ":{t}"),
            ParseItem::C(t) => write!(f, "~{t}"),
            ParseItem::N(v) => write!(f, "►{v}"),
            ParseItem::E(p) => write!(f, "◄{p}"),
        }
    }
}

/// A production of the grammar: `lhs -> rhs`.
#[derive(Clone, PartialEq, Debug)]
pub struct Production {
    pub lhs: VarId,
    pub rhs: Vec<ParseItem>,
}

impl Production {
    pub fn new(lhs: VarId, rhs: Vec<ParseItem>) -> Self {
        Production { lhs, rhs }
    }

    /// Number of RHS items contributing a value to the value stack.
    pub fn child_count(&self) -> usize {
        self.rhs.iter().filter(|item| item.is_value()).count()
    }
}

impl Display for Production {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} -> {}", self.lhs, self.rhs.iter().join(" "))
    }
}

/// One transition of a [LookaheadDfa]. `prod` is the production selected when the
/// transition is taken, or −1 when the walk must continue to decide.
#[derive(Clone, Copy, PartialEq, Debug)]
pub struct LaTransition {
    pub from: StateId,
    pub term: TokenTypeId,
    pub to: StateId,
    pub prod: i32,
}

/// Lookahead automaton of one nonterminal, walked over at most `k` peeked tokens to
/// select a production. State 0 is the initial state; without any transition,
/// `default_prod` is always selected.
#[derive(Clone, PartialEq, Debug)]
pub struct LookaheadDfa {
    pub default_prod: i32,
    pub transitions: Vec<LaTransition>,
    pub k: usize,
}

impl LookaheadDfa {
    /// Automaton of a nonterminal with a single production.
    pub fn unconditional(prod: ProdId) -> Self {
        LookaheadDfa { default_prod: prod as i32, transitions: Vec::new(), k: 0 }
    }
}

/// Immutable grammar tables produced by the generator.
pub struct Grammar {
    pub productions: Vec<Production>,
    /// lookahead automata, indexed by nonterminal
    pub lookahead: Vec<LookaheadDfa>,
    pub sym_table: SymTable,
    pub start: VarId,
}

impl Grammar {
    /// Verifies that every index used by the tables is in range, returning the first
    /// inconsistency found. Useful to vet hand-written tables; generated tables are
    /// consistent by construction.
    pub fn check(&self) -> Result<(), String> {
        let num_t = self.sym_table.get_num_t();
        let num_nt = self.sym_table.get_num_nt();
        let num_prods = self.productions.len() as i32;
        if self.lookahead.len() != num_nt {
            return Err(format!("{} lookahead automata for {num_nt} nonterminals", self.lookahead.len()));
        }
        if self.start as usize >= num_nt {
            return Err(format!("start symbol {} out of range", self.start));
        }
        for (p, production) in self.productions.iter().index::<ProdId>() {
            if production.lhs as usize >= num_nt {
                return Err(format!("production {p}: lhs {} out of range", production.lhs));
            }
            for item in &production.rhs {
                match item {
                    ParseItem::T(t) | ParseItem::C(t) if *t as usize >= num_t =>
                        return Err(format!("production {p}: terminal {t} out of range")),
                    ParseItem::N(n) if *n as usize >= self.lookahead.len() =>
                        return Err(format!("production {p}: nonterminal {n} has no lookahead automaton")),
                    ParseItem::E(q) if *q as usize >= self.productions.len() =>
                        return Err(format!("production {p}: end marker references unknown production {q}")),
                    _ => {}
                }
            }
        }
        for (v, dfa) in self.lookahead.iter().index::<VarId>() {
            if dfa.default_prod >= num_prods {
                return Err(format!("lookahead of nonterminal {v}: default production {} out of range", dfa.default_prod));
            }
            for transition in &dfa.transitions {
                if transition.prod >= num_prods {
                    return Err(format!("lookahead of nonterminal {v}: production {} out of range", transition.prod));
                }
                if transition.term as usize >= num_t {
                    return Err(format!("lookahead of nonterminal {v}: terminal {} out of range", transition.term));
                }
            }
        }
        Ok(())
    }
}

// ---------------------------------------------------------------------------------------------
// Semantic values

/// Type-erased value produced by a semantic action.
pub struct UserValue {
    value: Box<dyn Any>,
    type_name: &'static str,
}

impl UserValue {
    pub fn new<T: Any>(value: T) -> Self {
        UserValue { value: Box::new(value), type_name: type_name::<T>() }
    }

    pub fn type_name(&self) -> &'static str {
        self.type_name
    }

    pub fn is<T: Any>(&self) -> bool {
        self.value.is::<T>()
    }

    pub fn downcast<T: Any>(self) -> Result<T, UserValue> {
        let UserValue { value, type_name } = self;
        match value.downcast::<T>() {
            Ok(v) => Ok(*v),
            Err(value) => Err(UserValue { value, type_name }),
        }
    }
}

impl Debug for UserValue {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "UserValue<{}>", self.type_name)
    }
}

/// Item of the value stack: either a matched token or a user value synthesized by a
/// semantic action.
#[derive(Debug)]
pub enum ParseValue {
    Token(Token),
    User(UserValue),
}

impl ParseValue {
    pub fn user<T: Any>(value: T) -> Self {
        ParseValue::User(UserValue::new(value))
    }

    pub fn is_token(&self) -> bool {
        matches!(self, ParseValue::Token(_))
    }

    /// Short name of the value's type, for diagnostics.
    pub fn kind_name(&self) -> &str {
        match self {
            ParseValue::Token(_) => "Token",
            ParseValue::User(user) => user.type_name(),
        }
    }

    pub fn into_token(self) -> Option<Token> {
        if let ParseValue::Token(token) = self { Some(token) } else { None }
    }
}

// ---------------------------------------------------------------------------------------------
// User actions

/// Failure modes of a semantic action.
#[derive(Debug)]
pub enum ActionError {
    /// The action cannot map this children list onto its parameters. The rejected
    /// children are handed back so the parser can retry with a filtered list.
    Mapping { children: Vec<ParseValue>, detail: String },
    /// Any other failure; propagated without retry.
    Failed(Box<dyn Error + Send + Sync>),
}

impl ActionError {
    pub fn mapping<T: Into<String>>(children: Vec<ParseValue>, detail: T) -> Self {
        ActionError::Mapping { children, detail: detail.into() }
    }
}

/// Contract between the parser and the user-supplied semantic actions.
///
/// The parser only sees the generated/user action object through this trait: it
/// dispatches one [call_semantic_action](UserActions::call_semantic_action) per
/// reduced production, in leftmost-derivation order, and reports its errors to the
/// actions' log.
pub trait UserActions {
    /// Synthesizes the value of `production` from its children values, given in RHS
    /// order (clipped terminals excluded).
    fn call_semantic_action(&mut self, production: ProdId, children: Vec<ParseValue>) -> Result<ParseValue, ActionError>;

    /// Receives the comment tokens set aside by the scanner.
    fn on_comment(&mut self, _token: &Token) {}

    /// Converter activated while the parse runs, used by
    /// [convert_to](crate::convert::convert_to) to coerce value-stack items.
    fn value_converter(&self) -> Option<Rc<dyn ValueConverter>> {
        None
    }

    /// Gets access to the actions' log to report errors and information about the parsing.
    fn get_mut_log(&mut self) -> &mut impl Logger;
}

// ---------------------------------------------------------------------------------------------
// Errors

#[derive(Debug)]
pub enum ParseError {
    /// The next token doesn't match the expected terminal. Fatal, no recovery.
    Syntax { expected: String, found: String, pos: Option<Pos> },
    /// The lookahead automaton of `non_terminal` ended without selecting a production.
    Prediction { non_terminal: String },
    /// Value-stack underrun while reducing a production; the tables are inconsistent.
    Internal { production: ProdId },
    /// The semantic action rejected both the raw and the filtered children lists.
    SemanticMapping { production: ProdId, raw: String, filtered: Option<String>, cause: Box<dyn Error + Send + Sync> },
    /// The semantic action failed for another reason.
    Action { production: ProdId, source: Box<dyn Error + Send + Sync> },
}

impl Display for ParseError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            ParseError::Syntax { expected, found, pos } => {
                write!(f, "syntax error: found {found} instead of '{expected}'")?;
                if let Some(Pos(line, col)) = pos {
                    write!(f, ", line {line}, col {col}")?;
                }
                Ok(())
            }
            ParseError::Prediction { non_terminal } =>
                write!(f, "prediction error: no production of '{non_terminal}' matches the lookahead"),
            ParseError::Internal { production } =>
                write!(f, "internal parser error: value stack underrun while reducing production {production}"),
            ParseError::SemanticMapping { production, raw, filtered, cause } => {
                write!(f, "semantic action of production {production} rejected its children [{raw}]")?;
                if let Some(filtered) = filtered {
                    write!(f, " and the filtered children [{filtered}]")?;
                }
                write!(f, ": {cause}")
            }
            ParseError::Action { production, source } =>
                write!(f, "semantic action of production {production} failed: {source}"),
        }
    }
}

impl Error for ParseError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            ParseError::SemanticMapping { cause, .. } => Some(cause.as_ref()),
            ParseError::Action { source, .. } => Some(source.as_ref()),
            ParseError::Syntax { .. }
            | ParseError::Prediction { .. }
            | ParseError::Internal { .. } => None,
        }
    }
}

fn report<A: UserActions>(actions: &mut A, error: ParseError) -> ParseError {
    actions.get_mut_log().add_error(error.to_string());
    error
}

// ---------------------------------------------------------------------------------------------
// Table-based LL(k) parser

/// Predictive parser over generated [Grammar] tables.
///
/// The grammar is immutable and may be shared by concurrent parses; everything
/// mutable lives on the stacks of one [parse](Parser::parse) call.
pub struct Parser<'a> {
    grammar: &'a Grammar,
}

impl<'a> Parser<'a> {
    pub fn new(grammar: &'a Grammar) -> Self {
        Parser { grammar }
    }

    pub fn get_grammar(&self) -> &'a Grammar {
        self.grammar
    }

    /// Selects a production of `nt` by walking its lookahead automaton over peeked
    /// tokens; the stream is never consumed. An absent token stands for terminal 0
    /// (end of stream).
    pub fn predict_production<I>(&self, nt: VarId, stream: &mut TokenStream<I>) -> Result<ProdId, ParseError>
        where I: Iterator<Item = Token>
    {
        let dfa = &self.grammar.lookahead[nt as usize];
        let mut prod = dfa.default_prod;
        let mut last_valid = -1;
        if !dfa.transitions.is_empty() {
            let mut state: StateId = 0;
            for i in 0..dfa.k {
                let term = stream.peek(i).map(|t| t.token_type).unwrap_or(EOF_TOKEN);
                let Some(transition) = dfa.transitions.iter().find(|tr| tr.from == state && tr.term == term) else {
                    break;
                };
                state = transition.to;
                prod = transition.prod;
                if transition.prod >= 0 {
                    last_valid = transition.prod;
                }
            }
        }
        for candidate in [prod, last_valid, dfa.default_prod] {
            if candidate >= 0 {
                return Ok(candidate as ProdId);
            }
        }
        Err(ParseError::Prediction { non_terminal: self.grammar.sym_table.get_nt_name(nt) })
    }

    /// Parses a whole token sequence and returns the root semantic value.
    pub fn parse<I, A>(&self, actions: &mut A, tokens: I) -> Result<ParseValue, ParseError>
        where I: Iterator<Item = Token>,
              A: UserActions,
    {
        let mut stream = TokenStream::new(tokens);
        self.parse_stream(actions, &mut stream)
    }

    /// Parses `stream` using `actions`, and returns the root semantic value if the
    /// start symbol could be completely derived, or the first error otherwise.
    ///
    /// All errors are also reported to the actions' log. Trailing tokens that the
    /// grammar doesn't reach are left in the stream.
    pub fn parse_stream<I, A>(&self, actions: &mut A, stream: &mut TokenStream<I>) -> Result<ParseValue, ParseError>
        where I: Iterator<Item = Token>,
              A: UserActions,
    {
        let _converter = actions.value_converter().map(ConverterScope::activate);
        let mut parse_stack: Vec<ParseItem> = vec![ParseItem::N(self.grammar.start)];
        let mut value_stack: Vec<ParseValue> = Vec::new();
        while let Some(item) = parse_stack.pop() {
            match item {
                ParseItem::T(t) => {
                    let token = self.expect_terminal(actions, stream, t)?;
                    value_stack.push(ParseValue::Token(token));
                }
                ParseItem::C(t) => {
                    self.expect_terminal(actions, stream, t)?;
                }
                ParseItem::N(n) => {
                    let p = match self.predict_production(n, stream) {
                        Ok(p) => p,
                        Err(error) => return Err(report(actions, error)),
                    };
                    parse_stack.push(ParseItem::E(p));
                    parse_stack.extend(self.grammar.productions[p as usize].rhs.iter().rev());
                }
                ParseItem::E(p) => {
                    let production = &self.grammar.productions[p as usize];
                    let count = production.child_count();
                    if value_stack.len() < count {
                        return Err(report(actions, ParseError::Internal { production: p }));
                    }
                    let children = value_stack.split_off(value_stack.len() - count);
                    let value = self.dispatch_action(actions, p, children)?;
                    value_stack.push(value);
                }
            }
        }
        let root = value_stack.pop().expect("value stack is empty after parsing");
        assert!(value_stack.is_empty(), "value stack isn't empty after parsing");
        Ok(root)
    }

    fn expect_terminal<I, A>(&self, actions: &mut A, stream: &mut TokenStream<I>, expected: TokenTypeId) -> Result<Token, ParseError>
        where I: Iterator<Item = Token>,
              A: UserActions,
    {
        if matches!(stream.peek(0), Some(token) if token.token_type == expected) {
            return Ok(stream.consume().unwrap());
        }
        let expected = self.grammar.sym_table.get_t_name(expected);
        let error = match stream.peek(0) {
            Some(token) => ParseError::Syntax {
                expected,
                found: format!("input '{}'", token.text),
                pos: Some(token.positions().start),
            },
            None => ParseError::Syntax {
                expected,
                found: "end of stream".to_string(),
                pos: None,
            },
        };
        Err(report(actions, error))
    }

    fn dispatch_action<A: UserActions>(&self, actions: &mut A, production: ProdId, children: Vec<ParseValue>) -> Result<ParseValue, ParseError> {
        let raw_kinds = children.iter().map(|c| c.kind_name()).join(", ");
        match actions.call_semantic_action(production, children) {
            Ok(value) => Ok(value),
            Err(ActionError::Mapping { children, detail }) => {
                let has_token = children.iter().any(|c| c.is_token());
                let has_value = children.iter().any(|c| !c.is_token());
                if has_token && has_value {
                    // actions declared over the structural children only get a second
                    // chance, without the token children
                    let filtered = children.into_iter().filter(|c| !c.is_token()).collect::<Vec<_>>();
                    let filtered_kinds = filtered.iter().map(|c| c.kind_name()).join(", ");
                    match actions.call_semantic_action(production, filtered) {
                        Ok(value) => Ok(value),
                        Err(ActionError::Mapping { detail: cause, .. }) => {
                            Err(report(actions, ParseError::SemanticMapping {
                                production,
                                raw: raw_kinds,
                                filtered: Some(filtered_kinds),
                                cause: cause.into(),
                            }))
                        }
                        Err(ActionError::Failed(source)) =>
                            Err(report(actions, ParseError::Action { production, source })),
                    }
                } else {
                    Err(report(actions, ParseError::SemanticMapping {
                        production,
                        raw: raw_kinds,
                        filtered: None,
                        cause: detail.into(),
                    }))
                }
            }
            Err(ActionError::Failed(source)) =>
                Err(report(actions, ParseError::Action { production, source })),
        }
    }
}
