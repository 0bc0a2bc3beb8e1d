//! Grammar data for the predictive parser.
//!
//! [`expansion`] is the expansion table: for a non-terminal and a lookahead
//! terminal it yields the right-hand side of the matching rule, or `None`
//! when no rule applies (a syntax error). List-shaped non-terminals expand
//! to an empty slice on their follow set.

use crate::token::Term;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Nterm {
    Program,
    GlobalStatementList,
    GlobalStatement,
    FuncDecl,
    FuncDef,
    FuncCall,
    FuncTypeList,
    FuncTypeList2,
    IdentifierListWithTypes,
    IdentifierListWithTypes2,
    IdentifierWithType,
    StatementList,
    StatementList2,
    Statement,
    Declaration,
    DeclOptionalAssignment,
    ParenExpListOrIdList,
    Assignment,
    IdentifierList,
    IdentifierList2,
    ExpressionList,
    ExpressionList2,
    CondStatement,
    CondOptElseif,
    WhileLoop,
    RepeatUntil,
    ForLoop,
    OptionalForStep,
    ReturnStatement,
    RetExpressionList,
    RetExpressionList2,
    OptionalFunExpressionList,
    FunExpressionList2,
    Expression,
}

impl Nterm {
    pub fn readable(self) -> &'static str {
        match self {
            Nterm::Program => "program",
            Nterm::GlobalStatementList => "global statement list",
            Nterm::GlobalStatement => "global statement",
            Nterm::FuncDecl => "function declaration",
            Nterm::FuncDef => "function definition",
            Nterm::FuncCall => "function call",
            Nterm::FuncTypeList => "type list",
            Nterm::FuncTypeList2 => "type list",
            Nterm::IdentifierListWithTypes => "parameter list",
            Nterm::IdentifierListWithTypes2 => "parameter list",
            Nterm::IdentifierWithType => "parameter",
            Nterm::StatementList => "statement list",
            Nterm::StatementList2 => "statement list",
            Nterm::Statement => "statement",
            Nterm::Declaration => "declaration",
            Nterm::DeclOptionalAssignment => "declaration initialiser",
            Nterm::ParenExpListOrIdList => "call or assignment",
            Nterm::Assignment => "assignment",
            Nterm::IdentifierList => "identifier list",
            Nterm::IdentifierList2 => "identifier list",
            Nterm::ExpressionList => "expression list",
            Nterm::ExpressionList2 => "expression list",
            Nterm::CondStatement => "if statement",
            Nterm::CondOptElseif => "elseif branch",
            Nterm::WhileLoop => "while loop",
            Nterm::RepeatUntil => "repeat loop",
            Nterm::ForLoop => "for loop",
            Nterm::OptionalForStep => "for step",
            Nterm::ReturnStatement => "return statement",
            Nterm::RetExpressionList => "return values",
            Nterm::RetExpressionList2 => "return values",
            Nterm::OptionalFunExpressionList => "argument list",
            Nterm::FunExpressionList2 => "argument list",
            Nterm::Expression => "expression",
        }
    }
}

/// One grammar symbol of a rule's right-hand side.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Sym {
    T(Term),
    N(Nterm),
}

use Nterm as N;
use Sym::N as n;
use Sym::T as t;
use Term as T;

const EMPTY: &[Sym] = &[];

macro_rules! rule {
    ($($sym:expr),*) => {{
        const RULE: &[Sym] = &[$($sym),*];
        Some(RULE)
    }};
}

/// First set of an expression, as seen by the table.
fn starts_expression(term: Term) -> bool {
    matches!(
        term,
        T::Identifier
            | T::Integer
            | T::Number
            | T::Str
            | T::Bool
            | T::Nil
            | T::LParen
            | T::Minus
            | T::Hash
            | T::Not
    )
}

fn starts_statement(term: Term) -> bool {
    matches!(
        term,
        T::Local
            | T::Identifier
            | T::If
            | T::While
            | T::For
            | T::Repeat
            | T::Break
            | T::Return
    )
}

pub fn expansion(nterm: Nterm, look: Term) -> Option<&'static [Sym]> {
    match (nterm, look) {
        (N::Program, T::Require) => {
            rule![t(T::Require), t(T::Str), n(N::GlobalStatementList)]
        }

        (N::GlobalStatementList, T::Global | T::Function | T::Identifier) => {
            rule![n(N::GlobalStatement), n(N::GlobalStatementList)]
        }
        (N::GlobalStatementList, T::Eof) => rule![t(T::Eof)],

        (N::GlobalStatement, T::Global) => rule![n(N::FuncDecl)],
        (N::GlobalStatement, T::Function) => rule![n(N::FuncDef)],
        (N::GlobalStatement, T::Identifier) => rule![n(N::FuncCall)],

        (N::FuncDecl, T::Global) => rule![
            t(T::Global),
            t(T::Identifier),
            t(T::Colon),
            t(T::Function),
            t(T::LParen),
            n(N::FuncTypeList),
            t(T::RParen),
            n(N::FuncTypeList)
        ],

        (N::FuncDef, T::Function) => rule![
            t(T::Function),
            t(T::Identifier),
            t(T::LParen),
            n(N::IdentifierListWithTypes),
            t(T::RParen),
            n(N::FuncTypeList),
            n(N::StatementList),
            t(T::End)
        ],

        (N::FuncCall, T::Identifier) => rule![
            t(T::Identifier),
            t(T::LParen),
            n(N::OptionalFunExpressionList),
            t(T::RParen)
        ],

        (N::FuncTypeList, T::TypeName | T::Nil) => rule![t(T::TypeName), n(N::FuncTypeList2)],
        (N::FuncTypeList, T::Colon) => {
            rule![t(T::Colon), t(T::TypeName), n(N::FuncTypeList2)]
        }
        (N::FuncTypeList, _) => Some(EMPTY),
        (N::FuncTypeList2, T::Comma) => {
            rule![t(T::Comma), t(T::TypeName), n(N::FuncTypeList2)]
        }
        (N::FuncTypeList2, _) => Some(EMPTY),

        (N::IdentifierListWithTypes, T::Identifier) => {
            rule![n(N::IdentifierWithType), n(N::IdentifierListWithTypes2)]
        }
        (N::IdentifierListWithTypes, T::RParen) => Some(EMPTY),
        (N::IdentifierListWithTypes2, T::Comma) => rule![
            t(T::Comma),
            n(N::IdentifierWithType),
            n(N::IdentifierListWithTypes2)
        ],
        (N::IdentifierListWithTypes2, T::RParen) => Some(EMPTY),
        (N::IdentifierWithType, T::Identifier) => {
            rule![t(T::Identifier), t(T::Colon), t(T::TypeName)]
        }

        (N::StatementList | N::StatementList2, look) if starts_statement(look) => {
            rule![n(N::Statement), n(N::StatementList2)]
        }
        (
            N::StatementList | N::StatementList2,
            T::End | T::Else | T::Elseif | T::Until | T::Eof,
        ) => Some(EMPTY),

        (N::Statement, T::Local) => rule![n(N::Declaration)],
        (N::Statement, T::Identifier) => {
            rule![t(T::Identifier), n(N::ParenExpListOrIdList)]
        }
        (N::Statement, T::If) => rule![n(N::CondStatement)],
        (N::Statement, T::While) => rule![n(N::WhileLoop)],
        (N::Statement, T::For) => rule![n(N::ForLoop)],
        (N::Statement, T::Repeat) => rule![n(N::RepeatUntil)],
        (N::Statement, T::Break) => rule![t(T::Break)],
        (N::Statement, T::Return) => rule![n(N::ReturnStatement)],

        (N::Declaration, T::Local) => rule![
            t(T::Local),
            t(T::Identifier),
            t(T::Colon),
            t(T::TypeName),
            n(N::DeclOptionalAssignment)
        ],
        (N::DeclOptionalAssignment, T::Equals) => rule![t(T::Equals), n(N::Expression)],
        (N::DeclOptionalAssignment, _) => Some(EMPTY),

        (N::Assignment, T::Identifier) => {
            rule![n(N::IdentifierList), t(T::Equals), n(N::ExpressionList)]
        }
        (N::IdentifierList, T::Identifier) => {
            rule![t(T::Identifier), n(N::IdentifierList2)]
        }
        (N::IdentifierList2, T::Comma) => {
            rule![t(T::Comma), t(T::Identifier), n(N::IdentifierList2)]
        }
        (N::IdentifierList2, T::Equals) => Some(EMPTY),

        (N::ExpressionList, look) if starts_expression(look) => {
            rule![n(N::Expression), n(N::ExpressionList2)]
        }
        (N::ExpressionList2, T::Comma) => {
            rule![t(T::Comma), n(N::Expression), n(N::ExpressionList2)]
        }
        (N::ExpressionList2, _) => Some(EMPTY),

        (N::CondStatement, T::If) => rule![
            t(T::If),
            n(N::Expression),
            t(T::Then),
            n(N::StatementList),
            n(N::CondOptElseif),
            t(T::End)
        ],
        (N::CondOptElseif, T::Elseif) => rule![
            t(T::Elseif),
            n(N::Expression),
            t(T::Then),
            n(N::StatementList),
            n(N::CondOptElseif)
        ],
        (N::CondOptElseif, T::Else) => rule![t(T::Else), n(N::StatementList)],
        (N::CondOptElseif, T::End) => Some(EMPTY),

        (N::WhileLoop, T::While) => rule![
            t(T::While),
            n(N::Expression),
            t(T::Do),
            n(N::StatementList),
            t(T::End)
        ],

        (N::RepeatUntil, T::Repeat) => rule![
            t(T::Repeat),
            n(N::StatementList),
            t(T::Until),
            n(N::Expression)
        ],

        (N::ForLoop, T::For) => rule![
            t(T::For),
            t(T::Identifier),
            t(T::Equals),
            n(N::Expression),
            t(T::Comma),
            n(N::Expression),
            n(N::OptionalForStep),
            t(T::Do),
            n(N::StatementList),
            t(T::End)
        ],
        (N::OptionalForStep, T::Comma) => rule![t(T::Comma), n(N::Expression)],
        (N::OptionalForStep, T::Do) => Some(EMPTY),

        (N::ReturnStatement, T::Return) => rule![t(T::Return), n(N::RetExpressionList)],
        (N::RetExpressionList, look) if starts_expression(look) => {
            rule![n(N::Expression), n(N::RetExpressionList2)]
        }
        (N::RetExpressionList, look)
            if starts_statement(look)
                || matches!(look, T::End | T::Else | T::Elseif | T::Until | T::Eof) =>
        {
            Some(EMPTY)
        }
        (N::RetExpressionList2, T::Comma) => {
            rule![t(T::Comma), n(N::Expression), n(N::RetExpressionList2)]
        }
        (N::RetExpressionList2, _) => Some(EMPTY),

        (N::OptionalFunExpressionList, T::RParen) => Some(EMPTY),
        (N::OptionalFunExpressionList, look) if starts_expression(look) => {
            rule![n(N::Expression), n(N::FunExpressionList2)]
        }
        (N::FunExpressionList2, T::Comma) => {
            rule![t(T::Comma), n(N::Expression), n(N::FunExpressionList2)]
        }
        (N::FunExpressionList2, T::RParen) => Some(EMPTY),

        _ => None,
    }
}
