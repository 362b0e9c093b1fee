// Copyright (c) 2026 Redglyph (@gmail.com). All Rights Reserved.

use crate::{TokenTypeId, VarId, EOF_TOKEN};

/// Stores the names of the terminal and nonterminal symbols used by a parser.
///
/// Terminal names come from the generator's lexicon, nonterminal names from its
/// grammar. The parser only uses them to build diagnostics; missing entries fall
/// back to a `T(n?)` / `NT(n?)` notation so a truncated table never makes error
/// reporting itself fail.
#[derive(Clone, Debug)]
pub struct SymTable {
    t: Vec<String>,     // terminal names, indexed by token type
    nt: Vec<String>,    // nonterminal names
}

impl SymTable {
    pub fn new(t: Vec<String>, nt: Vec<String>) -> Self {
        SymTable { t, nt }
    }

    pub fn from_strs(t: &[&str], nt: &[&str]) -> Self {
        SymTable {
            t: t.iter().map(|s| s.to_string()).collect(),
            nt: nt.iter().map(|s| s.to_string()).collect(),
        }
    }

    // -------------------------------------------------------------------------

    pub fn get_terminals(&self) -> impl Iterator<Item = &String> {
        self.t.iter()
    }

    pub fn get_num_t(&self) -> usize {
        self.t.len()
    }

    pub fn get_t_name(&self, token_type: TokenTypeId) -> String {
        match token_type {
            _ if (token_type as usize) < self.t.len() => self.t[token_type as usize].clone(),
            EOF_TOKEN => "<EOF>".to_string(),
            _ => format!("T({token_type}?)"),
        }
    }

    // -------------------------------------------------------------------------

    pub fn get_nonterminals(&self) -> impl Iterator<Item = &String> {
        self.nt.iter()
    }

    pub fn get_num_nt(&self) -> usize {
        self.nt.len()
    }

    pub fn get_nt_name(&self, var: VarId) -> String {
        if var as usize >= self.nt.len() { return format!("NT({var}?)") }
        self.nt[var as usize].clone()
    }
}

// ---------------------------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------------------------
