use crate::ast::node::Node;
use crate::error::CompileError;
use crate::parser::parse_program;
use crate::token::Lexer;
use crate::types::Type;

use super::Analyzer;

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

fn error_code(source: &str) -> u8 {
    parse(source).expect_err("expected an error").exit_code()
}

#[test]
fn wrong_preamble_is_rejected() {
    assert_eq!(error_code("require \"ifj20\"\n"), 7);
}

#[test]
fn undefined_variable() {
    assert_eq!(error_code(&program("x = 1")), 3);
    assert_eq!(error_code(&program("write(x)")), 3);
}

#[test]
fn undefined_function() {
    assert_eq!(error_code("require \"ifj21\"\nmain()\n"), 3);
}

#[test]
fn redeclaration_in_same_scope() {
    let body = "local x: integer = 1\nlocal x: integer = 2";
    assert_eq!(error_code(&program(body)), 3);
}

#[test]
fn shadowing_in_nested_scope_is_fine() {
    let body = "local x: integer = 1\n\
                while x < 2 do local x: integer = 5 write(x) end";
    parse(&program(body)).expect("shadowing should be allowed");
}

#[test]
fn local_may_not_collide_with_a_function() {
    assert_eq!(error_code(&program("local write: integer = 1")), 3);
}

#[test]
fn duplicate_function_definition() {
    let source = "require \"ifj21\"\n\
                  function f() end\n\
                  function f() end\n";
    assert_eq!(error_code(source), 3);
}

#[test]
fn declaration_definition_mismatch() {
    let source = "require \"ifj21\"\n\
                  global f : function(integer) : integer\n\
                  function f(x: string): integer return 1 end\n";
    assert_eq!(error_code(source), 7);
}

#[test]
fn declaration_definition_match_is_fine() {
    let source = "require \"ifj21\"\n\
                  global f : function(integer) : integer\n\
                  function f(x: integer): integer return x end\n\
                  function main() write(f(1)) end\n\
                  main()\n";
    parse(source).expect("matching signatures should be accepted");
}

#[test]
fn assignment_type_mismatch() {
    assert_eq!(error_code(&program("local x: integer = \"s\"")), 4);
}

#[test]
fn not_enough_values_without_trailing_call() {
    let body = "local a: integer = 0\nlocal b: integer = 0\na, b = 1";
    assert_eq!(error_code(&program(body)), 4);
}

#[test]
fn trailing_call_pads_missing_values() {
    let source = "require \"ifj21\"\n\
                  function one(): integer return 1 end\n\
                  function main()\n\
                  local a: integer = 0\n\
                  local b: integer = 0\n\
                  a, b = one()\n\
                  end\n\
                  main()\n";
    parse(source).expect("trailing call should pad with nil");
}

#[test]
fn extra_values_are_discarded() {
    let body = "local a: integer = 0\na = 1, 2";
    parse(&program(body)).expect("extra right-hand values are dropped");
}

#[test]
fn integer_widens_to_number() {
    parse(&program("local n: number = 3")).expect("widening should be accepted");
    let source = "require \"ifj21\"\n\
                  function g(x: number): number return x end\n\
                  function main() write(g(3)) end\n\
                  main()\n";
    parse(source).expect("argument widening should be accepted");
}

#[test]
fn number_does_not_narrow_to_integer() {
    assert_eq!(error_code(&program("local x: integer = 1.5")), 4);
}

#[test]
fn call_arity_is_checked() {
    let source = "require \"ifj21\"\n\
                  function f(x: integer) end\n\
                  function main() f(1, 2) end\n\
                  main()\n";
    assert_eq!(error_code(source), 5);
    let source = "require \"ifj21\"\n\
                  function f(x: integer) end\n\
                  function main() f() end\n\
                  main()\n";
    assert_eq!(error_code(source), 5);
}

#[test]
fn builtin_arity_is_checked() {
    assert_eq!(error_code(&program("local s: string = substr(\"a\", 1)")), 5);
}

#[test]
fn write_is_variadic() {
    parse(&program("write(1, \"a\", 2.5, nil)")).expect("write takes anything");
}

#[test]
fn global_call_must_not_return_values() {
    let source = "require \"ifj21\"\n\
                  function f(): integer return 1 end\n\
                  f()\n";
    assert_eq!(error_code(source), 5);
}

#[test]
fn returning_too_many_values() {
    let source = "require \"ifj21\"\n\
                  function f(): integer return 1, 2 end\n\
                  function main() write(f()) end\n\
                  main()\n";
    assert_eq!(error_code(source), 5);
}

#[test]
fn returning_fewer_values_is_fine() {
    let source = "require \"ifj21\"\n\
                  function f(): integer, integer return 1 end\n\
                  function main() write(f()) end\n\
                  main()\n";
    parse(source).expect("missing return values default to nil");
}

#[test]
fn operator_type_mismatch() {
    assert_eq!(error_code(&program("local x: integer = 1 + \"a\"")), 6);
    assert_eq!(error_code(&program("local s: string = \"a\" .. 1")), 6);
    assert_eq!(error_code(&program("local x: integer = 1.0 // 2.0")), 6);
}

#[test]
fn division_is_always_number_typed() {
    assert_eq!(error_code(&program("local x: integer = 4 / 2")), 4);
    parse(&program("local x: number = 4 / 2")).expect("int / int is a number");
}

#[test]
fn nil_operand_is_rejected() {
    assert_eq!(error_code(&program("local x: integer = nil + 1")), 8);
}

#[test]
fn nil_compares_against_anything() {
    let body = "local b: boolean = false\nb = 1 == nil\nwrite(b)";
    parse(&program(body)).expect("nil comparison should be accepted");
}

#[test]
fn literal_zero_divisor_is_rejected() {
    assert_eq!(error_code(&program("local x: number = 1 / 0")), 9);
    assert_eq!(error_code(&program("local x: integer = 1 // 0")), 9);
}

#[test]
fn declared_names_are_mangled_with_scope_level() {
    let (ast, sem) = parse(&program("local x: integer = 1\nwrite(x)")).expect("parse failed");
    let Node::Program(p) = &ast else { panic!() };
    let Node::FuncDef(d) = &p.statements[0] else { panic!() };
    let Some(Node::Body(b)) = d.body.as_deref() else { panic!() };
    let Node::Declaration(decl) = &b.statements[0] else { panic!() };
    let id = decl.decl.expect("declaration should be resolved");
    assert_eq!(sem.decls.get(id).name, "x%1");
}

#[test]
fn for_loop_is_desugared_into_four_declarations() {
    let source = program("for i = 1, 10, 2 do write(i) end");
    let (ast, sem) = parse(&source).expect("parse failed");
    let Node::Program(p) = &ast else { panic!() };
    let Node::FuncDef(d) = &p.statements[0] else { panic!() };
    let Some(Node::Body(b)) = d.body.as_deref() else { panic!() };
    let Node::For(l) = &b.statements[0] else { panic!("expected a for") };

    let name_of = |slot: &Option<Box<Node>>| -> String {
        let Some(Node::Declaration(d)) = slot.as_deref() else {
            panic!("for slot is not a declaration");
        };
        sem.decls.get(d.decl.expect("unresolved for slot")).name.clone()
    };
    assert_eq!(name_of(&l.iterator), "i%2&");
    assert_eq!(name_of(&l.setup), "i%2");
    assert_eq!(name_of(&l.condition), "i%2&cond");
    assert_eq!(name_of(&l.step), "i%2&step");

    for slot in [&l.iterator, &l.setup, &l.condition, &l.step] {
        let Some(Node::Declaration(d)) = slot.as_deref() else {
            panic!("for slot is not a declaration");
        };
        assert_eq!(sem.decls.get(d.decl.unwrap()).ty, Type::Integer);
    }
}

#[test]
fn for_type_is_number_when_any_bound_is() {
    let source = program("for i = 1, 10.0 do write(i) end");
    let (ast, sem) = parse(&source).expect("parse failed");
    let Node::Program(p) = &ast else { panic!() };
    let Node::FuncDef(d) = &p.statements[0] else { panic!() };
    let Some(Node::Body(b)) = d.body.as_deref() else { panic!() };
    let Node::For(l) = &b.statements[0] else { panic!("expected a for") };
    let Some(Node::Declaration(step)) = l.step.as_deref() else { panic!() };
    assert_eq!(sem.decls.get(step.decl.unwrap()).ty, Type::Number);
    assert!(matches!(step.init.as_deref(), Some(Node::Number(_))));
}

#[test]
fn for_bounds_must_be_numeric() {
    assert_eq!(
        error_code(&program("for i = 1, \"x\" do write(i) end")),
        6
    );
}
