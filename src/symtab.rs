// SPDX-License-Identifier: GPL-2.0-only

//
// Symbol table
//

use crate::ast::Type;
use crate::lex::Position;
use std::collections::HashMap;
use std::rc::Rc;
use tracing::trace;

#[derive(Clone,Copy,Debug,PartialEq,Eq,Hash)]
struct ScopeId(usize);

#[derive(Clone,Debug,PartialEq)]
pub struct Symbol {
    pub ty: Type,
    pub pos: Position,
}

#[derive(Debug)]
struct Scope {
    parent: Option<ScopeId>,
}

//
// Scope tree with symbols keyed by (scope, name)
//

pub struct SymTab {
    scopes: Vec<Scope>,
    symbols: HashMap<(ScopeId, Rc<str>), Symbol>,
    current: ScopeId,
}

impl SymTab {
    pub fn new() -> SymTab {
        SymTab {
            scopes: vec![Scope { parent: None }],
            symbols: HashMap::new(),
            current: ScopeId(0),
        }
    }

    pub fn push_scope(&mut self, name: &str) {
        let id = ScopeId(self.scopes.len());
        trace!(scope = name, depth = self.depth(), "entering scope");
        self.scopes.push(Scope { parent: Some(self.current) });
        self.current = id;
    }

    // Number of scopes enclosing the current one
    fn depth(&self) -> usize {
        let mut depth = 0;
        let mut scope = self.scopes[self.current.0].parent;
        while let Some(id) = scope {
            depth += 1;
            scope = self.scopes[id.0].parent;
        }
        depth
    }

    pub fn pop_scope(&mut self) {
        match self.scopes[self.current.0].parent {
            Some(parent) => self.current = parent,
            None => unreachable!("popped the global scope"),
        }
    }

    /// Declare a symbol in the current scope, returns the clashing symbol on redefinition
    pub fn insert(&mut self, name: Rc<str>, symbol: Symbol) -> Result<(), &Symbol> {
        let key = (self.current, name);
        if self.symbols.contains_key(&key) {
            return Err(&self.symbols[&key]);
        }
        self.symbols.insert(key, symbol);
        Ok(())
    }

    /// Look a name up from the current scope outwards
    pub fn lookup(&self, name: &str) -> Option<&Symbol> {
        let name: Rc<str> = name.into();
        let mut scope = Some(self.current);
        while let Some(id) = scope {
            if let Some(symbol) = self.symbols.get(&(id, name.clone())) {
                return Some(symbol);
            }
            scope = self.scopes[id.0].parent;
        }
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sym(line: usize) -> Symbol {
        Symbol { ty: Type::Int, pos: Position { line: line, column: 1, offset: 0 } }
    }

    #[test]
    fn shadowing_and_redefinition() {
        let mut tab = SymTab::new();
        tab.insert("a".into(), sym(1)).unwrap();
        assert_eq!(tab.insert("a".into(), sym(2)).unwrap_err().pos.line, 1);

        tab.push_scope("main");
        assert_eq!(tab.depth(), 1);
        assert!(tab.insert("a".into(), sym(3)).is_ok());
        assert_eq!(tab.lookup("a").map(|s| s.pos.line), Some(3));
        tab.pop_scope();

        assert_eq!(tab.lookup("a").map(|s| s.pos.line), Some(1));
        assert!(tab.lookup("b").is_none());
        assert_eq!(tab.depth(), 0);
    }
}
