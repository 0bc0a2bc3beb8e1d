//! Bottom-up operator-precedence parser for expressions.
//!
//! Shift/reduce decisions come from a fixed table of precedence relations
//! between the topmost terminal on the stack and the lookahead. Reductions
//! are recorded on a right-analysis list which, walked backwards, rebuilds
//! the expression tree. A function call inside an expression switches back
//! to the top-down parser and splices the finished subtree in as a single
//! reduction.

use std::collections::VecDeque;

use crate::ast::node::{Binop, BinopType, Node, Symbol, Unop, UnopType};
use crate::error::CompileError;
use crate::parser::grammar::Nterm;
use crate::token::{Term, Token, TokenValue};

use super::{Dest, Parser};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Prec {
    Ze,
    Lt,
    Gt,
    Eq,
}

use Prec::{Eq as E, Gt as G, Lt as L, Ze as Z};

const TABLE_SIZE: usize = 27;
const EOF_INDEX: usize = 26;

/// Rows and columns are indexed by [`term_index`]; `Ze` cells have no
/// relation and either hand control back or are an error.
#[rustfmt::skip]
static TABLE: [[Prec; TABLE_SIZE]; TABLE_SIZE] = [
    // ^
    [L, G, G, G, G, G, G, G, G, G, G, G, G, G, G, G, G, G, L, G, L, L, L, L, L, L, G],
    // not (and unary minus)
    [L, G, G, G, G, G, G, G, G, G, G, G, G, G, G, G, G, G, L, G, L, L, L, L, L, L, G],
    // *
    [L, L, G, G, G, G, G, G, G, G, G, G, G, G, G, G, G, G, L, G, L, L, L, L, L, L, G],
    // /
    [L, L, G, G, G, G, G, G, G, G, G, G, G, G, G, G, G, G, L, G, L, L, L, L, L, L, G],
    // +
    [L, L, L, L, G, G, G, G, G, G, G, G, G, G, G, G, G, G, L, G, L, L, L, L, L, L, G],
    // -
    [L, L, L, L, G, G, G, G, G, G, G, G, G, G, G, G, G, G, L, G, L, L, L, L, L, L, G],
    // ..
    [L, L, L, L, L, L, L, G, G, G, G, G, G, G, G, G, G, G, L, G, L, L, L, L, L, L, G],
    // <
    [L, L, L, L, L, L, L, G, G, G, G, G, G, G, G, G, G, G, L, G, L, L, L, L, L, L, G],
    // <=
    [L, L, L, L, L, L, L, G, G, G, G, G, G, G, G, G, G, G, L, G, L, L, L, L, L, L, G],
    // >
    [L, L, L, L, L, L, L, G, G, G, G, G, G, G, G, G, G, G, L, G, L, L, L, L, L, L, G],
    // >=
    [L, L, L, L, L, L, L, G, G, G, G, G, G, G, G, G, G, G, L, G, L, L, L, L, L, L, G],
    // ==
    [L, L, L, L, L, L, L, G, G, G, G, G, G, G, G, G, G, G, L, G, L, L, L, L, L, L, G],
    // ~=
    [L, L, L, L, L, L, L, G, G, G, G, G, G, G, G, G, G, G, L, G, L, L, L, L, L, L, G],
    // and
    [L, L, L, L, L, L, L, L, L, L, L, L, L, G, G, G, G, G, L, G, L, L, L, L, L, L, G],
    // or
    [L, L, L, L, L, L, L, L, L, L, L, L, L, L, G, G, G, G, L, G, L, L, L, L, L, L, G],
    // //
    [L, L, L, L, L, L, L, L, L, L, L, L, L, L, L, Z, Z, Z, L, G, L, L, L, L, L, L, G],
    // %
    [L, L, L, L, L, L, L, L, L, L, L, L, L, L, L, Z, Z, Z, L, G, L, L, L, L, L, L, G],
    // #
    [L, L, L, L, L, L, L, L, L, L, L, L, L, L, L, Z, Z, Z, L, G, L, L, L, L, L, L, G],
    // (
    [L, L, L, L, L, L, L, L, L, L, L, L, L, L, L, L, L, L, L, E, L, L, L, L, L, L, Z],
    // )
    [G, L, G, G, G, G, G, G, G, G, G, G, G, G, G, G, G, Z, Z, G, Z, Z, Z, Z, Z, Z, G],
    // identifier
    [G, Z, G, G, G, G, G, G, G, G, G, G, G, G, G, G, G, Z, Z, G, Z, Z, Z, Z, Z, Z, G],
    // integer literal
    [G, Z, G, G, G, G, G, G, G, G, G, G, G, G, G, G, G, Z, Z, G, Z, Z, Z, Z, Z, Z, G],
    // number literal
    [G, Z, G, G, G, G, G, G, G, G, G, G, G, G, G, G, G, Z, Z, G, Z, Z, Z, Z, Z, Z, G],
    // string literal
    [G, Z, G, G, G, G, G, G, G, G, G, G, G, G, G, G, G, Z, Z, G, Z, Z, Z, Z, Z, Z, G],
    // boolean literal
    [G, Z, G, G, G, G, G, G, G, G, G, G, G, G, G, G, G, Z, Z, G, Z, Z, Z, Z, Z, Z, G],
    // nil
    [G, Z, G, G, G, G, G, G, G, G, G, G, G, G, G, G, G, Z, Z, G, Z, Z, Z, Z, Z, Z, G],
    // end of expression (sentinel)
    [L, L, L, L, L, L, L, L, L, L, L, L, L, L, L, L, L, L, L, Z, L, L, L, L, L, L, Z],
];

/// Table index of a terminal; unary minus shares the relations of `not`.
fn term_index(term: Term, unary: bool) -> Option<usize> {
    Some(match term {
        Term::Caret => 0,
        Term::Not => 1,
        Term::Minus if unary => 1,
        Term::Asterisk => 2,
        Term::Slash => 3,
        Term::Plus => 4,
        Term::Minus => 5,
        Term::DoubleDot => 6,
        Term::Lt => 7,
        Term::Lte => 8,
        Term::Gt => 9,
        Term::Gte => 10,
        Term::DoubleEquals => 11,
        Term::TildeEquals => 12,
        Term::And => 13,
        Term::Or => 14,
        Term::DoubleSlash => 15,
        Term::Percent => 16,
        Term::Hash => 17,
        Term::LParen => 18,
        Term::RParen => 19,
        Term::Identifier => 20,
        Term::Integer => 21,
        Term::Number => 22,
        Term::Str => 23,
        Term::Bool => 24,
        Term::Nil => 25,
        Term::Eof => 26,
        _ => return None,
    })
}

fn is_binary(term: Term, unary: bool) -> bool {
    match term {
        Term::Minus => !unary,
        Term::Plus
        | Term::Asterisk
        | Term::Slash
        | Term::DoubleSlash
        | Term::Percent
        | Term::Caret
        | Term::DoubleDot
        | Term::And
        | Term::Or
        | Term::Lt
        | Term::Lte
        | Term::Gt
        | Term::Gte
        | Term::DoubleEquals
        | Term::TildeEquals => true,
        _ => false,
    }
}

fn is_unary(term: Term, unary: bool) -> bool {
    match term {
        Term::Minus => unary,
        Term::Hash | Term::Not => true,
        _ => false,
    }
}

fn is_literal(term: Term) -> bool {
    matches!(
        term,
        Term::Nil | Term::Str | Term::Integer | Term::Number | Term::Bool
    )
}

fn binop_of(term: Term) -> Option<BinopType> {
    Some(match term {
        Term::Plus => BinopType::Add,
        Term::Minus => BinopType::Sub,
        Term::Asterisk => BinopType::Mul,
        Term::Slash => BinopType::Div,
        Term::DoubleSlash => BinopType::IntDiv,
        Term::Percent => BinopType::Mod,
        Term::Caret => BinopType::Power,
        Term::DoubleDot => BinopType::Concat,
        Term::And => BinopType::And,
        Term::Or => BinopType::Or,
        Term::Lt => BinopType::Lt,
        Term::Lte => BinopType::Lte,
        Term::Gt => BinopType::Gt,
        Term::Gte => BinopType::Gte,
        Term::DoubleEquals => BinopType::Eq,
        Term::TildeEquals => BinopType::Ne,
        _ => return None,
    })
}

fn unop_of(term: Term, unary: bool) -> Option<UnopType> {
    Some(match term {
        Term::Minus if unary => UnopType::Neg,
        Term::Hash => UnopType::Len,
        Term::Not => UnopType::Not,
        _ => return None,
    })
}

enum EntryKind {
    Term { token: Token, unary: bool },
    Nonterm,
}

struct Entry {
    kind: EntryKind,
    mark: bool,
    sentinel: bool,
}

impl Entry {
    fn sentinel() -> Self {
        Self {
            kind: EntryKind::Term {
                token: Token::new(Term::Eof, TokenValue::None, 0, 0),
                unary: false,
            },
            mark: false,
            sentinel: true,
        }
    }

    fn term(token: Token, unary: bool) -> Self {
        Self { kind: EntryKind::Term { token, unary }, mark: false, sentinel: false }
    }

    fn nonterm() -> Self {
        Self { kind: EntryKind::Nonterm, mark: false, sentinel: false }
    }
}

/// One record of the right analysis.
enum Red {
    Unop(UnopType),
    Binop(BinopType),
    Ident(String),
    Literal(Token),
    Parens,
    Call(Node),
}

/// Topmost terminal on the stack: `(term, unary, sentinel, deque index)`.
fn topmost(stack: &VecDeque<Entry>) -> Result<(Term, bool, bool, usize), CompileError> {
    for (i, entry) in stack.iter().enumerate() {
        if let EntryKind::Term { token, unary } = &entry.kind {
            return Ok((token.term, *unary, entry.sentinel, i));
        }
    }
    Err(CompileError::Internal("no terminal on precedence stack".to_string()))
}

/// Whether an identifier in this position ends the expression: something
/// that cannot be extended is already on top of the stack.
fn check_condition(stack: &VecDeque<Entry>) -> bool {
    match stack.front() {
        Some(entry) => match &entry.kind {
            EntryKind::Term { token, unary } => {
                let can_extend = is_binary(token.term, *unary)
                    || is_unary(token.term, *unary)
                    || token.term == Term::LParen;
                !can_extend && !entry.sentinel
            }
            EntryKind::Nonterm => true,
        },
        None => false,
    }
}

fn syntax_error(token: &Token, message: &str) -> CompileError {
    CompileError::Syntax {
        row: token.row,
        column: token.column,
        message: message.to_string(),
    }
}

fn expression_error(token: &Token) -> CompileError {
    CompileError::Semantic {
        row: token.row,
        column: token.column,
        message: "ill-formed expression".to_string(),
    }
}

/// Pops one handle element, refusing to cross the reduction mark.
fn pop_handle(stack: &mut VecDeque<Entry>, at: &Token) -> Result<Entry, CompileError> {
    match stack.front() {
        Some(entry) if !entry.mark => Ok(stack.pop_front().expect("peeked above")),
        _ => Err(syntax_error(at, "malformed expression (reduction underflow)")),
    }
}

fn expect_nonterm(entry: &Entry, at: &Token) -> Result<(), CompileError> {
    match entry.kind {
        EntryKind::Nonterm => Ok(()),
        _ => Err(syntax_error(at, "malformed expression (missing operand)")),
    }
}

/// Reduces the handle below the mark into a right-analysis record.
fn reduce(
    stack: &mut VecDeque<Entry>,
    output: &mut Vec<Red>,
    at: &Token,
) -> Result<(), CompileError> {
    let (term, unary, sentinel, _) = topmost(stack)?;
    if sentinel {
        return Err(syntax_error(at, "malformed expression (nothing to reduce)"));
    }

    if is_unary(term, unary) {
        let operand = pop_handle(stack, at)?;
        expect_nonterm(&operand, at)?;
        let op = pop_handle(stack, at)?;
        let EntryKind::Term { token, unary } = op.kind else {
            return Err(syntax_error(at, "malformed expression (missing operator)"));
        };
        let op = unop_of(token.term, unary)
            .ok_or_else(|| syntax_error(at, "malformed expression (missing operator)"))?;
        output.push(Red::Unop(op));
    } else if is_binary(term, unary) {
        let right = pop_handle(stack, at)?;
        expect_nonterm(&right, at)?;
        let op = pop_handle(stack, at)?;
        let EntryKind::Term { token, .. } = op.kind else {
            return Err(syntax_error(at, "malformed expression (missing operator)"));
        };
        let op = binop_of(token.term)
            .ok_or_else(|| syntax_error(at, "malformed expression (missing operator)"))?;
        let left = pop_handle(stack, at)?;
        expect_nonterm(&left, at)?;
        output.push(Red::Binop(op));
    } else if term == Term::Identifier {
        let id = pop_handle(stack, at)?;
        let EntryKind::Term { token, .. } = id.kind else {
            return Err(syntax_error(at, "malformed expression"));
        };
        output.push(Red::Ident(token.text().to_string()));
    } else if term == Term::RParen {
        let rparen = pop_handle(stack, at)?;
        drop(rparen);
        let inner = pop_handle(stack, at)?;
        expect_nonterm(&inner, at)?;
        let lparen = pop_handle(stack, at)?;
        match lparen.kind {
            EntryKind::Term { token, .. } if token.term == Term::LParen => {}
            _ => return Err(syntax_error(at, "malformed expression (unmatched ')')")),
        }
        output.push(Red::Parens);
    } else if is_literal(term) {
        let lit = pop_handle(stack, at)?;
        let EntryKind::Term { token, .. } = lit.kind else {
            return Err(syntax_error(at, "malformed expression"));
        };
        output.push(Red::Literal(token));
    } else {
        return Err(syntax_error(at, "malformed expression (no rule applies)"));
    }

    // the handle must reach exactly down to the mark
    match stack.front_mut() {
        Some(entry) if entry.mark => entry.mark = false,
        _ => return Err(syntax_error(at, "malformed expression (reduction overflow)")),
    }
    stack.push_front(Entry::nonterm());
    Ok(())
}

/// Rebuilds the expression tree from the right analysis, newest record
/// first.
fn assemble(output: &mut Vec<Red>) -> Result<Node, CompileError> {
    let record = output
        .pop()
        .ok_or_else(|| CompileError::Internal("right analysis underflow".to_string()))?;
    Ok(match record {
        Red::Unop(op) => {
            let operand = assemble(output)?;
            Node::Unop(Unop { op, operand: Box::new(operand), result: None })
        }
        Red::Binop(op) => {
            let right = assemble(output)?;
            let left = assemble(output)?;
            Node::Binop(Binop {
                op,
                left: Box::new(left),
                right: Box::new(right),
                result: None,
            })
        }
        Red::Ident(name) => Node::Symbol(Symbol::new(name)),
        Red::Literal(token) => match (token.term, token.value) {
            (Term::Integer, TokenValue::Int(v)) => Node::Integer(v),
            (Term::Number, TokenValue::Num(v)) => Node::Number(v),
            (Term::Str, TokenValue::Text(v)) => Node::Str(v),
            (Term::Bool, TokenValue::Bool(v)) => Node::Boolean(v),
            (Term::Nil, _) => Node::Nil,
            _ => {
                return Err(CompileError::Internal(
                    "literal token without payload".to_string(),
                ))
            }
        },
        Red::Parens => assemble(output)?,
        Red::Call(node) => node,
    })
}

/// Entry point: parses one expression, leaving the terminator token for the
/// top-down parser.
pub(super) fn parse_expression(p: &mut Parser) -> Result<Node, CompileError> {
    let mut stack: VecDeque<Entry> = VecDeque::new();
    stack.push_front(Entry::sentinel());
    let mut output: Vec<Red> = Vec::new();

    let mut parens_level: i32 = 0;
    let mut current = next_for_expr(p, &mut parens_level)?;
    let mut current_unary = false;
    let mut return_control = false;

    loop {
        let (top_term, top_unary, top_sentinel, _) = topmost(&stack)?;

        if current.term == Term::Identifier && !return_control {
            return_control = check_condition(&stack);
            if !return_control {
                let look = p.lexer.next_token()?;
                let is_call = look.term == Term::LParen;
                p.lexer.unget()?;
                if is_call {
                    // hand the call to the top-down parser, splice the
                    // subtree back in as a finished operand
                    p.lexer.unget()?;
                    let mut slot: Option<Box<Node>> = None;
                    p.parse(Nterm::FuncCall, &mut Dest::Slot(&mut slot))?;
                    let node = slot.map(|n| *n).ok_or_else(|| {
                        CompileError::Internal("call subtree missing".to_string())
                    })?;
                    output.push(Red::Call(node));
                    stack.push_front(Entry::nonterm());
                    current = next_for_expr(p, &mut parens_level)?;
                    current_unary = false;
                    if current.term == Term::Identifier {
                        return_control = true;
                    }
                    continue;
                }
            }
        }

        // a ')' below the expression's own nesting ends a call argument
        if current.term == Term::RParen && parens_level == -1 && top_sentinel {
            p.lexer.unget()?;
            break;
        }

        if current.term == Term::Minus && !current_unary {
            if let Some(front) = stack.front() {
                let operand_missing = match &front.kind {
                    EntryKind::Term { token, unary } => {
                        front.sentinel
                            || is_binary(token.term, *unary)
                            || is_unary(token.term, *unary)
                    }
                    EntryKind::Nonterm => false,
                };
                if operand_missing {
                    current_unary = true;
                }
            }
        }

        let col = term_index(current.term, current_unary).unwrap_or(EOF_INDEX);

        if top_sentinel && (col == EOF_INDEX || return_control) {
            p.lexer.unget()?;
            break;
        }

        let row = term_index(top_term, top_unary)
            .ok_or_else(|| CompileError::Internal("operator not in table".to_string()))?;
        let mut prec = TABLE[row][col];
        if return_control {
            prec = Prec::Gt;
        }

        match prec {
            Prec::Eq => {
                stack.push_front(Entry::term(current, current_unary));
                current = next_for_expr(p, &mut parens_level)?;
                current_unary = false;
            }
            Prec::Lt => {
                let (.., index) = topmost(&stack)?;
                stack[index].mark = true;
                stack.push_front(Entry::term(current, current_unary));
                current = next_for_expr(p, &mut parens_level)?;
                current_unary = false;
            }
            Prec::Gt => reduce(&mut stack, &mut output, &current)?,
            Prec::Ze => {
                if current.term == Term::Identifier {
                    // two operands in a row: finish this expression and
                    // hand the identifier back
                    reduce(&mut stack, &mut output, &current)?;
                    return_control = true;
                    let (.., sentinel, _) = topmost(&stack)?;
                    if sentinel {
                        p.lexer.unget()?;
                        break;
                    }
                } else {
                    return Err(expression_error(&current));
                }
            }
        }
    }

    let (.., top_sentinel, _) = topmost(&stack)?;
    if !top_sentinel {
        return Err(expression_error(&current));
    }
    if output.is_empty() {
        return Err(syntax_error(&current, "expected expression"));
    }
    assemble(&mut output)
}

fn next_for_expr(p: &mut Parser, parens_level: &mut i32) -> Result<Token, CompileError> {
    let token = p.next_token()?;
    match token.term {
        Term::LParen => *parens_level += 1,
        Term::RParen => *parens_level -= 1,
        _ => {}
    }
    Ok(token)
}
