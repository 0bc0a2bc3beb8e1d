use super::*;
use crate::error::CompileError;
use crate::types::Type;

fn lex_terms(source: &str) -> Vec<Term> {
    let mut lexer = Lexer::new(source);
    let mut terms = Vec::new();
    loop {
        let token = lexer.next_token().expect("lexing failed");
        let done = token.term == Term::Eof;
        terms.push(token.term);
        if done {
            break;
        }
    }
    terms
}

fn lex_error(source: &str) -> CompileError {
    let mut lexer = Lexer::new(source);
    loop {
        match lexer.next_token() {
            Ok(token) if token.term == Term::Eof => panic!("expected a lexical error"),
            Ok(_) => {}
            Err(e) => return e,
        }
    }
}

#[test]
fn keywords_and_identifiers() {
    let terms = lex_terms("if foo then end while_ do");
    assert_eq!(
        terms,
        vec![
            Term::If,
            Term::Identifier,
            Term::Then,
            Term::End,
            Term::Identifier,
            Term::Do,
            Term::Eof
        ]
    );
}

#[test]
fn type_keywords_carry_tags() {
    let mut lexer = Lexer::new("integer number string boolean");
    for expected in [Type::Integer, Type::Number, Type::String, Type::Boolean] {
        let token = lexer.next_token().unwrap();
        assert_eq!(token.term, Term::TypeName);
        assert_eq!(token.value, TokenValue::TypeTag(expected));
    }
}

#[test]
fn integer_and_number_literals() {
    let mut lexer = Lexer::new("42 3.25 1e3 2.5e-2 7E+1");
    let token = lexer.next_token().unwrap();
    assert_eq!(token.value, TokenValue::Int(42));
    let token = lexer.next_token().unwrap();
    assert_eq!(token.value, TokenValue::Num(3.25));
    let token = lexer.next_token().unwrap();
    assert_eq!(token.value, TokenValue::Num(1000.0));
    let token = lexer.next_token().unwrap();
    assert_eq!(token.value, TokenValue::Num(0.025));
    let token = lexer.next_token().unwrap();
    assert_eq!(token.value, TokenValue::Num(70.0));
}

#[test]
fn exponent_needs_digits() {
    assert!(matches!(lex_error("1e"), CompileError::Lex { .. }));
    assert!(matches!(lex_error("1e+"), CompileError::Lex { .. }));
    assert!(matches!(lex_error("2.x"), CompileError::Lex { .. }));
}

#[test]
fn multi_character_operators() {
    let terms = lex_terms("< <= > >= == ~= = // / .. # ^");
    assert_eq!(
        terms,
        vec![
            Term::Lt,
            Term::Lte,
            Term::Gt,
            Term::Gte,
            Term::DoubleEquals,
            Term::TildeEquals,
            Term::Equals,
            Term::DoubleSlash,
            Term::Slash,
            Term::DoubleDot,
            Term::Hash,
            Term::Caret,
            Term::Eof
        ]
    );
}

#[test]
fn tilde_without_equals_fails() {
    assert!(matches!(lex_error("~5"), CompileError::Lex { .. }));
}

#[test]
fn string_escapes() {
    let mut lexer = Lexer::new("\"a\\nb\\tc\\\"d\\\\e\\065\"");
    let token = lexer.next_token().unwrap();
    assert_eq!(token.term, Term::Str);
    assert_eq!(token.value, TokenValue::Text("a\nb\tc\"d\\eA".to_string()));
}

#[test]
fn bad_escapes_fail() {
    assert!(matches!(lex_error("\"\\000\""), CompileError::Lex { .. }));
    assert!(matches!(lex_error("\"\\999\""), CompileError::Lex { .. }));
    assert!(matches!(lex_error("\"\\q\""), CompileError::Lex { .. }));
    assert!(matches!(lex_error("\"\\12\""), CompileError::Lex { .. }));
}

#[test]
fn unterminated_string_fails() {
    assert!(matches!(lex_error("\"abc"), CompileError::Lex { .. }));
}

#[test]
fn comments_are_skipped() {
    let terms = lex_terms("a -- comment\nb --[[ block\ncomment ]] c");
    assert_eq!(
        terms,
        vec![Term::Identifier, Term::Identifier, Term::Identifier, Term::Eof]
    );
}

#[test]
fn line_comment_at_eof_is_fine() {
    let terms = lex_terms("a -- trailing");
    assert_eq!(terms, vec![Term::Identifier, Term::Eof]);
}

#[test]
fn unterminated_block_comment_fails() {
    assert!(matches!(lex_error("--[[ never closed"), CompileError::Lex { .. }));
}

#[test]
fn minus_is_always_binary_for_the_lexer() {
    let terms = lex_terms("-5");
    assert_eq!(terms, vec![Term::Minus, Term::Integer, Term::Eof]);
}

#[test]
fn rows_and_columns() {
    let mut lexer = Lexer::new("ab\n  cd");
    let token = lexer.next_token().unwrap();
    assert_eq!((token.row, token.column), (1, 1));
    let token = lexer.next_token().unwrap();
    assert_eq!((token.row, token.column), (2, 3));
}

#[test]
fn newline_inside_string_advances_row() {
    let mut lexer = Lexer::new("\"a\nb\" x");
    let token = lexer.next_token().unwrap();
    assert_eq!(token.value, TokenValue::Text("a\nb".to_string()));
    let token = lexer.next_token().unwrap();
    assert_eq!(token.row, 2);
}

#[test]
fn pushback_holds_two_tokens() {
    let mut lexer = Lexer::new("a b c");
    let a = lexer.next_token().unwrap();
    let b = lexer.next_token().unwrap();
    lexer.unget().unwrap();
    lexer.unget().unwrap();
    assert!(lexer.unget().is_err());
    assert_eq!(lexer.next_token().unwrap(), a);
    assert_eq!(lexer.next_token().unwrap(), b);
    assert_eq!(lexer.next_token().unwrap().term, Term::Identifier);
}
