use crate::ast::node::Node;
use crate::ast::BinopType;
use crate::error::CompileError;
use crate::semantic::Analyzer;
use crate::token::Lexer;

use super::parse_program;

fn parse(source: &str) -> Result<(Node, Analyzer), CompileError> {
    let mut lexer = Lexer::new(source);
    let mut sem = Analyzer::new();
    let ast = parse_program(&mut lexer, &mut sem)?;
    Ok((ast, sem))
}

fn program(body: &str) -> String {
    format!(
        "require \"ifj21\"\nfunction main()\n{}\nend\nmain()\n",
        body
    )
}

fn main_body(ast: &Node) -> &[Node] {
    let Node::Program(p) = ast else {
        panic!("expected a program");
    };
    for statement in &p.statements {
        if let Node::FuncDef(d) = statement {
            if d.name == "main" {
                let Some(Node::Body(b)) = d.body.as_deref() else {
                    panic!("main has no body");
                };
                return &b.statements;
            }
        }
    }
    panic!("no main function");
}

#[test]
fn parses_a_minimal_program() {
    let (ast, _) = parse("require \"ifj21\"\n").expect("parse failed");
    let Node::Program(p) = &ast else {
        panic!("expected a program");
    };
    assert_eq!(p.require, "ifj21");
    assert!(p.statements.is_empty());
}

#[test]
fn parses_function_and_global_call() {
    let (ast, _) = parse(&program("")).expect("parse failed");
    let Node::Program(p) = &ast else {
        panic!("expected a program");
    };
    assert_eq!(p.statements.len(), 2);
    assert!(matches!(p.statements[0], Node::FuncDef(_)));
    assert!(matches!(p.statements[1], Node::FuncCall(_)));
}

#[test]
fn multiplication_binds_tighter_than_addition() {
    let (ast, _) =
        parse(&program("local x: integer = 2 + 3 * 4")).expect("parse failed");
    let body = main_body(&ast);
    let Node::Declaration(d) = &body[0] else {
        panic!("expected a declaration");
    };
    let Some(Node::Binop(add)) = d.init.as_deref() else {
        panic!("expected a binary operator");
    };
    assert_eq!(add.op, BinopType::Add);
    assert!(matches!(*add.left, Node::Integer(2)));
    let Node::Binop(mul) = add.right.as_ref() else {
        panic!("expected a nested operator");
    };
    assert_eq!(mul.op, BinopType::Mul);
}

#[test]
fn concatenation_is_right_associative() {
    let (ast, _) =
        parse(&program("local s: string = \"a\" .. \"b\" .. \"c\"")).expect("parse failed");
    let body = main_body(&ast);
    let Node::Declaration(d) = &body[0] else {
        panic!("expected a declaration");
    };
    let Some(Node::Binop(outer)) = d.init.as_deref() else {
        panic!("expected a binary operator");
    };
    assert_eq!(outer.op, BinopType::Concat);
    assert!(matches!(*outer.left, Node::Str(_)));
    assert!(matches!(*outer.right, Node::Binop(_)));
}

#[test]
fn parenthesised_expression_overrides_precedence() {
    let (ast, _) =
        parse(&program("local x: integer = (2 + 3) * 4")).expect("parse failed");
    let body = main_body(&ast);
    let Node::Declaration(d) = &body[0] else {
        panic!("expected a declaration");
    };
    let Some(Node::Binop(mul)) = d.init.as_deref() else {
        panic!("expected a binary operator");
    };
    assert_eq!(mul.op, BinopType::Mul);
    assert!(matches!(*mul.left, Node::Binop(_)));
}

#[test]
fn unary_minus_is_reclassified() {
    let (ast, _) = parse(&program("local x: integer = -5")).expect("parse failed");
    let body = main_body(&ast);
    let Node::Declaration(d) = &body[0] else {
        panic!("expected a declaration");
    };
    assert!(matches!(d.init.as_deref(), Some(Node::Unop(_))));
}

#[test]
fn if_bodies_are_one_longer_with_else() {
    let source = program(
        "local a: integer = 1\n\
         if a < 1 then a = 1 elseif a < 2 then a = 2 else a = 3 end",
    );
    let (ast, _) = parse(&source).expect("parse failed");
    let body = main_body(&ast);
    let Node::If(i) = &body[1] else {
        panic!("expected an if");
    };
    assert_eq!(i.conditions.len(), 2);
    assert_eq!(i.bodies.len(), 3);
}

#[test]
fn if_without_else_has_matching_lists() {
    let source = program("local a: integer = 1\nif a < 1 then a = 1 end");
    let (ast, _) = parse(&source).expect("parse failed");
    let body = main_body(&ast);
    let Node::If(i) = &body[1] else {
        panic!("expected an if");
    };
    assert_eq!(i.conditions.len(), 1);
    assert_eq!(i.bodies.len(), 1);
}

#[test]
fn call_nested_in_expression_is_spliced() {
    let source = "require \"ifj21\"\n\
                  function f(n: integer): integer return n end\n\
                  function main()\n\
                  local x: integer = f(1) + 2\n\
                  write(x)\n\
                  end\n\
                  main()\n";
    let (ast, _) = parse(source).expect("parse failed");
    let body = main_body(&ast);
    let Node::Declaration(d) = &body[0] else {
        panic!("expected a declaration");
    };
    let Some(Node::Binop(add)) = d.init.as_deref() else {
        panic!("expected a binary operator");
    };
    assert!(matches!(*add.left, Node::FuncCall(_)));
    assert!(matches!(*add.right, Node::Integer(2)));
}

#[test]
fn identifier_statement_dispatches_to_call_or_assignment() {
    let source = "require \"ifj21\"\n\
                  function tick() end\n\
                  function main()\n\
                  local a: integer = 0\n\
                  local b: integer = 0\n\
                  tick()\n\
                  a = 1\n\
                  a, b = b, a\n\
                  end\n\
                  main()\n";
    let (ast, _) = parse(source).expect("parse failed");
    let body = main_body(&ast);
    assert!(matches!(body[2], Node::FuncCall(_)));
    assert!(matches!(body[3], Node::Assignment(_)));
    let Node::Assignment(a) = &body[4] else {
        panic!("expected an assignment");
    };
    assert_eq!(a.identifiers.len(), 2);
    assert_eq!(a.expressions.len(), 2);
}

#[test]
fn for_loop_parses_with_and_without_step() {
    parse(&program("for i = 1, 10 do write(i) end")).expect("parse failed");
    parse(&program("for i = 1, 10, 2 do write(i) end")).expect("parse failed");
}

#[test]
fn repeat_until_parses() {
    let source = program(
        "local i: integer = 0\n\
         repeat i = i + 1 until i > 3",
    );
    let (ast, _) = parse(&source).expect("parse failed");
    let body = main_body(&ast);
    assert!(matches!(body[1], Node::Repeat(_)));
}

#[test]
fn missing_end_is_a_syntax_error() {
    let err = parse("require \"ifj21\"\nfunction main()\n").unwrap_err();
    assert_eq!(err.exit_code(), 2);
}

#[test]
fn stray_token_is_a_syntax_error() {
    let err = parse("require \"ifj21\"\nfunction main() local end\n").unwrap_err();
    assert_eq!(err.exit_code(), 2);
}

#[test]
fn missing_preamble_is_a_syntax_error() {
    let err = parse("function main() end\n").unwrap_err();
    assert_eq!(err.exit_code(), 2);
}

#[test]
fn empty_expression_is_rejected() {
    let err = parse(&program("local x: integer =")).unwrap_err();
    assert_eq!(err.exit_code(), 2);
}

#[test]
fn two_operands_in_a_row_are_rejected() {
    let err = parse(&program("local x: integer = 5 6")).unwrap_err();
    assert_ne!(err.exit_code(), 0);
}
