// Integration tests for the IFJ21 compiler
// These tests drive the public pipeline from source text to emitted
// IFJcode21 and check both the generated code and the error contract.

use ifjcompiler::compile;

// ========================================
// Complete Program Tests
// ========================================

#[test]
fn test_hello_world() {
    let code = r#"
        require "ifj21"
        function main()
            write("Hello world!\n")
        end
        main()
    "#;

    let output = compile(code, true).expect("hello world should compile");
    assert!(output.starts_with(".IFJcode21"));
    assert!(output.contains("LABEL $main"));
    assert!(output.contains("PUSHS string@Hello\\032world!\\010"));
    assert!(output.contains("CALL nil_write"));
    assert!(output.contains("LABEL $$main"));
    assert!(output.contains("CALL $main"));
}

#[test]
fn test_factorial_program() {
    let code = r#"
        require "ifj21"
        function factorial(n: integer): integer
            local result: integer = 1
            local counter: integer = n
            while counter > 1 do
                result = result * counter
                counter = counter - 1
            end
            return result
        end

        function main()
            local fact: integer = factorial(5)
            write(fact)
        end
        main()
    "#;

    let output = compile(code, true).expect("factorial should compile");
    assert!(output.contains("LABEL $factorial"));
    assert!(output.contains("MULS"));
    assert!(output.contains("CALL $factorial"));
}

#[test]
fn test_recursion_and_conditionals() {
    let code = r#"
        require "ifj21"
        function fib(n: integer): integer
            if n < 2 then
                return n
            end
            return fib(n - 1) + fib(n - 2)
        end

        function main()
            write(fib(10))
        end
        main()
    "#;

    compile(code, true).expect("recursive program should compile");
}

#[test]
fn test_multiple_return_values() {
    let code = r#"
        require "ifj21"
        function divmod(a: integer, b: integer): integer, integer
            return a // b, a % b
        end

        function main()
            local q: integer = 0
            local r: integer = 0
            q, r = divmod(17, 5)
            write(q, " ", r, "\n")
        end
        main()
    "#;

    let output = compile(code, true).expect("multi-value program should compile");
    assert!(output.contains("DEFVAR LF@retval1"));
    assert!(output.contains("IDIVS"));
}

#[test]
fn test_repeat_until_and_concat() {
    let code = r#"
        require "ifj21"
        function main()
            local line: string = ""
            local i: integer = 0
            repeat
                line = line .. "*"
                i = i + 1
            until i >= 3
            write(line)
        end
        main()
    "#;

    let output = compile(code, true).expect("repeat program should compile");
    assert!(output.contains("CONCAT GF@result GF@string0 GF@string1"));
}

#[test]
fn test_builtins_are_emitted_when_used() {
    let code = r#"
        require "ifj21"
        function main()
            local s: string = reads()
            local n: integer = ord(s, 1)
            write(chr(n))
        end
        main()
    "#;

    let output = compile(code, true).expect("builtin program should compile");
    assert!(output.contains("LABEL $reads"));
    assert!(output.contains("LABEL $ord"));
    assert!(output.contains("LABEL $chr"));
    assert!(!output.contains("LABEL $substr"));
}

// ========================================
// Observable Behaviour Scenarios
// ========================================

#[test]
fn test_constant_folding_scenario() {
    let code = r#"
        require "ifj21"
        function f(): integer
            local x: integer = 2 + 3 * 4
            return x
        end
        function main()
            local v: integer = 0
            v = f()
            write(v)
        end
        main()
    "#;

    let output = compile(code, true).expect("folding scenario should compile");
    assert!(output.contains("MOVE LF@x%1 int@14"));
}

#[test]
fn test_widening_in_call_scenario() {
    let code = r#"
        require "ifj21"
        function g(x: number): number
            return x
        end
        function main()
            write(g(3))
        end
        main()
    "#;

    let output = compile(code, true).expect("widening scenario should compile");
    assert!(output.contains("CALL $g"));
}

#[test]
fn test_for_desugar_scenario() {
    let code = r#"
        require "ifj21"
        function main()
            for i = 1, 10, 2 do
                write(i)
            end
        end
        main()
    "#;

    let output = compile(code, true).expect("for scenario should compile");
    assert!(output.contains("CALL FOR_CONVERT"));
    assert!(output.contains("CALL ZERO_STEP"));
    assert!(output.contains("CALL SHOULD_I_JUMP"));
}

#[test]
fn test_dead_store_scenario() {
    let code = r#"
        require "ifj21"
        function main()
            local x: integer = 5
            x = 7
            write(x)
        end
        main()
    "#;

    let output = compile(code, true).expect("dead store scenario should compile");
    assert!(output.contains("MOVE LF@x%1 int@7"));
    assert!(!output.contains("int@5"));
}

#[test]
fn test_nil_arithmetic_scenario() {
    let code = r#"
        require "ifj21"
        function main()
            local x: integer = nil + 1
        end
        main()
    "#;

    let err = compile(code, true).expect_err("nil arithmetic must be rejected");
    assert_eq!(err.exit_code(), 8);
}

// ========================================
// Error Contract Tests
// ========================================

#[test]
fn test_lexical_error_code() {
    let err = compile("require \"ifj21\n", true).expect_err("unterminated string");
    assert_eq!(err.exit_code(), 1);
}

#[test]
fn test_syntax_error_code() {
    let err = compile("require \"ifj21\"\nfunction main(\n", true).expect_err("bad syntax");
    assert_eq!(err.exit_code(), 2);
}

#[test]
fn test_undefined_error_code() {
    let code = "require \"ifj21\"\nfunction main() write(x) end\nmain()\n";
    let err = compile(code, true).expect_err("undefined variable");
    assert_eq!(err.exit_code(), 3);
}

#[test]
fn test_assignment_error_code() {
    let code = "require \"ifj21\"\nfunction main() local x: integer = \"s\" end\nmain()\n";
    let err = compile(code, true).expect_err("bad assignment");
    assert_eq!(err.exit_code(), 4);
}

#[test]
fn test_call_type_error_code() {
    let code = "require \"ifj21\"\nfunction main() local s: string = chr(\"a\") end\nmain()\n";
    let err = compile(code, true).expect_err("bad argument");
    assert_eq!(err.exit_code(), 5);
}

#[test]
fn test_expression_type_error_code() {
    let code = "require \"ifj21\"\nfunction main() local x: integer = 1 + \"a\" end\nmain()\n";
    let err = compile(code, true).expect_err("bad operand");
    assert_eq!(err.exit_code(), 6);
}

#[test]
fn test_semantic_error_code() {
    let err = compile("require \"wrong\"\n", true).expect_err("bad preamble");
    assert_eq!(err.exit_code(), 7);
}

#[test]
fn test_zero_division_error_code() {
    let code = "require \"ifj21\"\nfunction main() local x: number = 1 / 0 end\nmain()\n";
    let err = compile(code, true).expect_err("zero division");
    assert_eq!(err.exit_code(), 9);
}

// ========================================
// Optimisation Contract Tests
// ========================================

#[test]
fn test_unoptimised_output_is_a_defvar_superset() {
    let code = r#"
        require "ifj21"
        function main()
            local x: integer = 2 + 2
            write(x)
        end
        main()
    "#;

    let fast = compile(code, true).expect("optimised build failed");
    let slow = compile(code, false).expect("unoptimised build failed");
    for line in fast.lines().filter(|l| l.starts_with("DEFVAR GF@")) {
        assert!(
            slow.lines().any(|other| other == line),
            "{} missing from unoptimised output",
            line
        );
    }
}

#[test]
fn test_unused_function_is_not_emitted() {
    let code = r#"
        require "ifj21"
        function ghost() write("never") end
        function main() write("x") end
        main()
    "#;

    let output = compile(code, true).expect("program should compile");
    assert!(!output.contains("LABEL $ghost"));
    assert!(output.contains("LABEL $main"));
}

#[test]
fn test_every_emitted_gf_defvar_is_known() {
    let expected = [
        "result",
        "trash",
        "op1",
        "op2",
        "type1",
        "type2",
        "stackresult",
        "string0",
        "string1",
        "loop_iterator",
        "exponent",
        "base",
        "for_iter",
        "for_condition",
        "for_step",
    ];
    let code = r#"
        require "ifj21"
        function main()
            local a: integer = readi()
            local b: number = a / 2 + 2 ^ a
            for i = 1, a do
                write(b, "\n")
            end
        end
        main()
    "#;

    let output = compile(code, true).expect("program should compile");
    for line in output.lines().filter(|l| l.starts_with("DEFVAR GF@")) {
        let name = line.trim_start_matches("DEFVAR GF@");
        assert!(expected.contains(&name), "unexpected register {}", name);
    }
}
