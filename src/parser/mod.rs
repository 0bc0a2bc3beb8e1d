//! Syntactic analysis.
//!
//! The driver is a predictive parser over the expansion table in
//! [`grammar`]; expressions are handed off to the bottom-up
//! operator-precedence parser in [`precedence`], which re-enters the driver
//! for function calls nested inside expressions. After every grammar symbol
//! the semantic analyser is consulted, so a semantic error aborts the parse
//! at the exact offending token.

pub mod grammar;
mod precedence;

#[cfg(test)]
mod tests;

use log::trace;

use crate::ast::node::{Declaration, Node, NodeList, Symbol};
use crate::error::CompileError;
use crate::semantic::Analyzer;
use crate::token::{Lexer, Term, Token, TokenValue};
use crate::types::Type;

use grammar::{Nterm, Sym};

/// Where the node produced by an expansion lands: a single child slot or
/// the tail of a sibling list.
pub(crate) enum Dest<'a> {
    Slot(&'a mut Option<Box<Node>>),
    List(&'a mut NodeList),
}

impl<'a> Dest<'a> {
    fn place(&mut self, node: Node) {
        match self {
            Dest::Slot(slot) => **slot = Some(Box::new(node)),
            Dest::List(list) => list.push(node),
        }
    }

    /// The node most recently placed here, if any.
    fn current(&mut self) -> Option<&mut Node> {
        match self {
            Dest::Slot(slot) => slot.as_deref_mut(),
            Dest::List(list) => list.last_mut(),
        }
    }

    fn reborrow(&mut self) -> Dest<'_> {
        match self {
            Dest::Slot(slot) => Dest::Slot(&mut **slot),
            Dest::List(list) => Dest::List(&mut **list),
        }
    }
}

pub struct Parser<'a> {
    lexer: &'a mut Lexer,
    sem: &'a mut Analyzer,
}

/// Parses a whole program, leaving resolved symbols and type annotations
/// behind in the analyser.
pub fn parse_program(lexer: &mut Lexer, sem: &mut Analyzer) -> Result<Node, CompileError> {
    let mut parser = Parser { lexer, sem };
    let mut root: Option<Box<Node>> = None;
    parser.parse(Nterm::Program, &mut Dest::Slot(&mut root))?;
    root.map(|node| *node)
        .ok_or_else(|| CompileError::Internal("parser produced no program".to_string()))
}

impl<'a> Parser<'a> {
    fn next_token(&mut self) -> Result<Token, CompileError> {
        let token = self.lexer.next_token()?;
        self.sem.set_cursor(token.row, token.column);
        Ok(token)
    }

    fn syntax_error(&self, token: &Token, message: String) -> CompileError {
        CompileError::Syntax { row: token.row, column: token.column, message }
    }

    pub(crate) fn parse(&mut self, nterm: Nterm, dest: &mut Dest) -> Result<(), CompileError> {
        if nterm == Nterm::Expression {
            let node = precedence::parse_expression(self)?;
            dest.place(node);
            return Ok(());
        }

        // `identifier (` opens a call, `identifier =` or `identifier ,`
        // an assignment; decide with one more token, then rewind both
        if nterm == Nterm::ParenExpListOrIdList {
            let decider = self.next_token()?;
            self.lexer.unget()?;
            self.lexer.unget()?;
            return match decider.term {
                Term::LParen => self.parse(Nterm::FuncCall, dest),
                Term::Comma | Term::Equals => self.parse(Nterm::Assignment, dest),
                _ => Err(self.syntax_error(
                    &decider,
                    format!("unexpected token \"{}\" after identifier", decider.term),
                )),
            };
        }

        let look = self.next_token()?;
        let Some(exp) = grammar::expansion(nterm, look.term) else {
            return Err(self.syntax_error(
                &look,
                format!(
                    "unexpected token \"{}\" (expanding {})",
                    look.term,
                    nterm.readable()
                ),
            ));
        };
        self.lexer.unget()?;
        trace!("expanding {} at \"{}\"", nterm.readable(), look.term);

        match new_node(nterm) {
            Some(mut node) => {
                let mut visited = 0usize;
                self.expand_on_node(nterm, exp, &mut node, &mut visited)?;
                dest.place(node);
                Ok(())
            }
            None => self.expand_on_dest(nterm, exp, dest),
        }
    }

    /// Re-expands a continuation non-terminal against an existing node
    /// (the `elseif` chain keeps extending the same `if`).
    fn descend_stay(
        &mut self,
        nterm: Nterm,
        node: &mut Node,
        visited: &mut usize,
    ) -> Result<(), CompileError> {
        let look = self.next_token()?;
        let Some(exp) = grammar::expansion(nterm, look.term) else {
            return Err(self.syntax_error(
                &look,
                format!(
                    "unexpected token \"{}\" (expanding {})",
                    look.term,
                    nterm.readable()
                ),
            ));
        };
        self.lexer.unget()?;
        self.expand_on_node(nterm, exp, node, visited)
    }

    fn expand_on_node(
        &mut self,
        nterm: Nterm,
        exp: &'static [Sym],
        node: &mut Node,
        visited: &mut usize,
    ) -> Result<(), CompileError> {
        for sym in exp {
            match *sym {
                Sym::N(child) => {
                    let slot = *visited;
                    *visited += 1;
                    if stays_on_node(nterm, slot) {
                        self.descend_stay(child, node, visited)?;
                    } else {
                        let mut dest = child_dest(node, nterm, slot)?;
                        self.parse(child, &mut dest)?;
                    }
                }
                Sym::T(term) => {
                    let token = self.expect_terminal(term)?;
                    put_term_node(&token, nterm, node, visited);
                }
            }
            self.sem.check(node, *sym)?;
        }
        Ok(())
    }

    fn expand_on_dest(
        &mut self,
        nterm: Nterm,
        exp: &'static [Sym],
        dest: &mut Dest,
    ) -> Result<(), CompileError> {
        for sym in exp {
            match *sym {
                Sym::N(child) => {
                    let mut child_dest = dest.reborrow();
                    self.parse(child, &mut child_dest)?;
                }
                Sym::T(term) => {
                    let token = self.expect_terminal(term)?;
                    put_term_dest(token, nterm, dest);
                }
            }
            if let Some(node) = dest.current() {
                self.sem.check(node, *sym)?;
            }
        }
        Ok(())
    }

    fn expect_terminal(&mut self, expected: Term) -> Result<Token, CompileError> {
        let mut token = self.next_token()?;
        // `nil` doubles as a type keyword in type positions
        if expected == Term::TypeName && token.term == Term::Nil {
            token.term = Term::TypeName;
            token.value = TokenValue::TypeTag(Type::Nil);
        }
        if token.term != expected {
            return Err(self.syntax_error(
                &token,
                format!("expected \"{}\" but got \"{}\"", expected, token.term),
            ));
        }
        Ok(token)
    }
}

/// Non-terminals that build a fresh AST node when expanded.
fn new_node(nterm: Nterm) -> Option<Node> {
    Some(match nterm {
        Nterm::Program => Node::Program(Default::default()),
        Nterm::Declaration => Node::Declaration(Default::default()),
        Nterm::Assignment => Node::Assignment(Default::default()),
        Nterm::FuncDecl => Node::FuncDecl(Default::default()),
        Nterm::FuncDef => Node::FuncDef(Default::default()),
        Nterm::FuncCall => Node::FuncCall(Default::default()),
        Nterm::CondStatement => Node::If(Default::default()),
        Nterm::WhileLoop => Node::While(Default::default()),
        Nterm::RepeatUntil => Node::Repeat(Default::default()),
        Nterm::ForLoop => Node::For(Default::default()),
        Nterm::StatementList => Node::Body(Default::default()),
        Nterm::ReturnStatement => Node::Return(Default::default()),
        _ => return None,
    })
}

/// Continuation descents that keep extending the same node (the `elseif`
/// chain), sharing its child counter.
fn stays_on_node(parent: Nterm, slot: usize) -> bool {
    matches!(parent, Nterm::CondStatement | Nterm::CondOptElseif) && slot % 3 == 2
}

/// Child slot selection; the counter advances on every descent so each
/// slot is picked exactly once, in grammar order.
fn child_dest<'n>(
    node: &'n mut Node,
    parent: Nterm,
    slot: usize,
) -> Result<Dest<'n>, CompileError> {
    let dest = match (parent, node) {
        (Nterm::Program, Node::Program(p)) => Dest::List(&mut p.statements),
        (Nterm::Declaration, Node::Declaration(d)) => Dest::Slot(&mut d.init),
        (Nterm::Assignment, Node::Assignment(a)) => match slot {
            0 => Dest::List(&mut a.identifiers),
            _ => Dest::List(&mut a.expressions),
        },
        (Nterm::FuncDecl, Node::FuncDecl(d)) => match slot {
            0 => Dest::List(&mut d.argument_types),
            _ => Dest::List(&mut d.return_types),
        },
        (Nterm::FuncDef, Node::FuncDef(d)) => match slot {
            0 => Dest::List(&mut d.parameters),
            1 => Dest::List(&mut d.return_types),
            _ => Dest::Slot(&mut d.body),
        },
        (Nterm::FuncCall, Node::FuncCall(c)) => Dest::List(&mut c.arguments),
        (Nterm::CondStatement | Nterm::CondOptElseif, Node::If(i)) => match slot % 3 {
            0 => Dest::List(&mut i.conditions),
            _ => Dest::List(&mut i.bodies),
        },
        (Nterm::WhileLoop, Node::While(w)) => match slot {
            0 => Dest::Slot(&mut w.condition),
            _ => Dest::Slot(&mut w.body),
        },
        (Nterm::RepeatUntil, Node::Repeat(r)) => match slot {
            0 => Dest::Slot(&mut r.body),
            _ => Dest::Slot(&mut r.condition),
        },
        (Nterm::ForLoop, Node::For(l)) => match slot {
            0 => Dest::Slot(&mut l.setup),
            1 => Dest::Slot(&mut l.condition),
            2 => Dest::Slot(&mut l.step),
            _ => Dest::Slot(&mut l.body),
        },
        (Nterm::StatementList, Node::Body(b)) => Dest::List(&mut b.statements),
        (Nterm::ReturnStatement, Node::Return(r)) => Dest::List(&mut r.values),
        _ => {
            return Err(CompileError::Internal(format!(
                "no child slot for {}",
                parent.readable()
            )))
        }
    };
    Ok(dest)
}

/// Terminal side effects on the node being built.
fn put_term_node(token: &Token, parent: Nterm, node: &mut Node, visited: &mut usize) {
    match (token.term, parent, node) {
        (Term::Str, Nterm::Program, Node::Program(p)) => {
            p.require = token.text().to_string();
        }
        (Term::Identifier, Nterm::FuncCall, Node::FuncCall(c)) => {
            c.name = token.text().to_string();
        }
        (Term::Identifier, Nterm::FuncDecl, Node::FuncDecl(d)) => {
            d.name = token.text().to_string();
        }
        (Term::Identifier, Nterm::FuncDef, Node::FuncDef(d)) => {
            d.name = token.text().to_string();
        }
        (Term::Identifier, Nterm::ForLoop, Node::For(l)) => {
            l.iterator = Some(Box::new(Node::Symbol(Symbol::new(token.text().to_string()))));
        }
        (Term::Identifier, Nterm::Declaration, Node::Declaration(d)) => {
            d.name = token.text().to_string();
        }
        (Term::TypeName, Nterm::Declaration, Node::Declaration(d)) => {
            if let TokenValue::TypeTag(ty) = token.value {
                d.ty = Some(ty);
            }
        }
        // the else branch has no condition: skip the condition slot so the
        // final statement list lands in `bodies`
        (Term::Else, Nterm::CondStatement | Nterm::CondOptElseif, _) => {
            *visited += 1;
        }
        _ => {}
    }
}

/// Terminal side effects on list destinations.
fn put_term_dest(token: Token, parent: Nterm, dest: &mut Dest) {
    match (token.term, parent) {
        (Term::Identifier, Nterm::IdentifierList | Nterm::IdentifierList2) => {
            dest.place(Node::Symbol(Symbol::new(token.text().to_string())));
        }
        (Term::Identifier, Nterm::IdentifierWithType) => {
            dest.place(Node::Declaration(Declaration {
                name: token.text().to_string(),
                ..Default::default()
            }));
        }
        (Term::TypeName, Nterm::IdentifierWithType) => {
            if let (TokenValue::TypeTag(ty), Some(Node::Declaration(d))) =
                (token.value, dest.current())
            {
                d.ty = Some(ty);
            }
        }
        (Term::TypeName, Nterm::FuncTypeList | Nterm::FuncTypeList2) => {
            if let TokenValue::TypeTag(ty) = token.value {
                dest.place(Node::TypeSpec(ty));
            }
        }
        (Term::Break, Nterm::Statement) => {
            dest.place(Node::Break);
        }
        _ => {}
    }
}
