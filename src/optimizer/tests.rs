use crate::ast::node::Node;
use crate::error::CompileError;
use crate::parser::parse_program;
use crate::semantic::Analyzer;
use crate::token::Lexer;

use super::{optimize, GenUsage, GfReg, Helper};

fn program(body: &str) -> String {
    format!(
        "require \"ifj21\"\nfunction main()\n{}\nend\nmain()\n",
        body
    )
}

fn optimized(source: &str) -> Result<(Node, Analyzer, GenUsage), CompileError> {
    let mut lexer = Lexer::new(source);
    let mut sem = Analyzer::new();
    let mut ast = parse_program(&mut lexer, &mut sem)?;
    let usage = optimize(&mut ast, &mut sem.decls, &sem.funcs, true)?;
    Ok((ast, sem, usage))
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
fn folds_integer_arithmetic() {
    let (ast, ..) =
        optimized(&program("local x: integer = 2 + 3 * 4\nwrite(x)")).expect("pipeline failed");
    let body = main_body(&ast);
    let Node::Declaration(d) = &body[0] else {
        panic!("expected a declaration");
    };
    assert!(matches!(d.init.as_deref(), Some(Node::Integer(14))));
}

#[test]
fn folds_mixed_arithmetic_to_number() {
    let (ast, ..) =
        optimized(&program("local x: number = 1 + 0.5\nwrite(x)")).expect("pipeline failed");
    let body = main_body(&ast);
    let Node::Declaration(d) = &body[0] else {
        panic!("expected a declaration");
    };
    assert!(matches!(d.init.as_deref(), Some(Node::Number(v)) if *v == 1.5));
}

#[test]
fn folds_comparison_and_concat() {
    let body = "local b: boolean = 2 < 3\n\
                local s: string = \"a\" .. \"b\"\n\
                write(b, s)";
    let (ast, ..) = optimized(&program(body)).expect("pipeline failed");
    let statements = main_body(&ast);
    let Node::Declaration(b) = &statements[0] else { panic!() };
    assert!(matches!(b.init.as_deref(), Some(Node::Boolean(true))));
    let Node::Declaration(s) = &statements[1] else { panic!() };
    assert!(matches!(s.init.as_deref(), Some(Node::Str(v)) if v == "ab"));
}

#[test]
fn string_inequality_folds_correctly() {
    let body = "local b: boolean = \"a\" ~= \"b\"\nwrite(b)";
    let (ast, ..) = optimized(&program(body)).expect("pipeline failed");
    let statements = main_body(&ast);
    let Node::Declaration(b) = &statements[0] else { panic!() };
    assert!(matches!(b.init.as_deref(), Some(Node::Boolean(true))));
}

#[test]
fn folded_zero_divisor_is_an_error() {
    let err = optimized(&program("local x: number = 1 / (2 - 2)\nwrite(x)")).unwrap_err();
    assert_eq!(err.exit_code(), 9);
    let err = optimized(&program("local x: integer = 1 // (3 - 3)\nwrite(x)")).unwrap_err();
    assert_eq!(err.exit_code(), 9);
}

#[test]
fn zero_to_the_zero_is_an_error() {
    let err = optimized(&program("local x: integer = 0 ^ 0\nwrite(x)")).unwrap_err();
    assert_eq!(err.exit_code(), 9);
}

#[test]
fn propagates_constant_locals() {
    let body = "local a: integer = 5\nlocal b: integer = a\nwrite(b)";
    let (ast, ..) = optimized(&program(body)).expect("pipeline failed");
    let statements = main_body(&ast);
    let Node::Declaration(b) = &statements[1] else { panic!() };
    assert!(matches!(b.init.as_deref(), Some(Node::Integer(5))));
}

#[test]
fn does_not_propagate_into_loop_bodies() {
    let body = "local a: integer = 5\n\
                local i: integer = 0\n\
                while i < 3 do write(a) i = i + 1 end";
    let (ast, ..) = optimized(&program(body)).expect("pipeline failed");
    let statements = main_body(&ast);
    let Node::While(w) = &statements[2] else { panic!("expected a while") };
    let Some(Node::Body(b)) = w.body.as_deref() else { panic!() };
    let Node::FuncCall(c) = &b.statements[0] else { panic!() };
    assert!(matches!(c.arguments[0], Node::Symbol(_)));
}

#[test]
fn dirty_variables_are_not_propagated() {
    let body = "local a: integer = 5\na = 6\nwrite(a)";
    let (ast, ..) = optimized(&program(body)).expect("pipeline failed");
    let statements = main_body(&ast);
    let Node::FuncCall(c) = &statements[2] else { panic!() };
    assert!(matches!(c.arguments[0], Node::Symbol(_)));
}

#[test]
fn unused_declaration_is_dropped() {
    let (ast, ..) = optimized(&program("local x: integer = 1")).expect("pipeline failed");
    let statements = main_body(&ast);
    assert!(matches!(statements[0], Node::Invalid));
}

#[test]
fn overwritten_initialiser_is_dropped() {
    let body = "local x: integer = 5\nx = 7\nwrite(x)";
    let (ast, ..) = optimized(&program(body)).expect("pipeline failed");
    let statements = main_body(&ast);
    let Node::Declaration(d) = &statements[0] else { panic!() };
    assert!(d.init.is_none());
}

#[test]
fn dead_assignment_is_dropped() {
    let body = "local x: integer = 0\nwrite(x)\nx = 9";
    let (ast, ..) = optimized(&program(body)).expect("pipeline failed");
    let statements = main_body(&ast);
    assert!(matches!(statements[2], Node::Invalid));
}

#[test]
fn false_branch_is_removed() {
    let body = "local x: integer = 0\nif false then x = 1 end\nwrite(x)";
    let (ast, ..) = optimized(&program(body)).expect("pipeline failed");
    let statements = main_body(&ast);
    let Node::If(i) = &statements[1] else { panic!("expected an if") };
    assert!(i.conditions.is_empty());
    assert!(i.bodies.is_empty());
}

#[test]
fn true_branch_becomes_a_plain_body() {
    let body = "local x: integer = 0\n\
                if true then x = 1 else x = 2 end\n\
                write(x)";
    let (ast, ..) = optimized(&program(body)).expect("pipeline failed");
    let statements = main_body(&ast);
    assert!(matches!(statements[1], Node::Body(_)));
}

#[test]
fn false_while_is_removed() {
    let body = "local x: integer = 0\nwhile false do x = 1 end\nwrite(x)";
    let (ast, ..) = optimized(&program(body)).expect("pipeline failed");
    let statements = main_body(&ast);
    assert!(matches!(statements[1], Node::Invalid));
}

#[test]
fn unused_function_is_removed() {
    let source = "require \"ifj21\"\n\
                  function ghost() end\n\
                  function main() end\n\
                  main()\n";
    let (ast, ..) = optimized(source).expect("pipeline failed");
    let Node::Program(p) = &ast else { panic!() };
    assert!(matches!(p.statements[0], Node::Invalid));
    assert!(matches!(p.statements[1], Node::FuncDef(_)));
}

#[test]
fn usage_map_tracks_reachable_helpers() {
    let (.., usage) = optimized(&program("write(\"x\")")).expect("pipeline failed");
    assert!(usage.helper(Helper::NilWrite));
    assert!(usage.reg(GfReg::Op1));
    assert!(usage.reg(GfReg::Type1));
    assert!(!usage.helper(Helper::Exponentiation));
    assert!(!usage.reg(GfReg::Exponent));
    assert!(!usage.reg(GfReg::String0));
}

#[test]
fn division_marks_its_helpers() {
    let body = "local a: integer = readi()\nlocal x: number = a / a\nwrite(x)";
    let (.., usage) = optimized(&program(body)).expect("pipeline failed");
    assert!(usage.helper(Helper::ConvToFloat));
    assert!(usage.helper(Helper::FloatZeroDiv));
    assert!(usage.helper(Helper::NilCheck));
    assert!(usage.reg(GfReg::Op2));
}

#[test]
fn disabled_optimizer_reports_everything_used() {
    let mut lexer = Lexer::new(&program("write(\"x\")"));
    let mut sem = Analyzer::new();
    let mut ast = parse_program(&mut lexer, &mut sem).expect("parse failed");
    let usage = optimize(&mut ast, &mut sem.decls, &sem.funcs, false).expect("optimizer failed");
    assert!(usage.helper(Helper::Exponentiation));
    assert!(usage.reg(GfReg::Base));
    // nothing was rewritten
    let statements = main_body(&ast);
    assert!(matches!(statements[0], Node::FuncCall(_)));
}
