//! A compiler from the IFJ21 language to IFJcode21 assembly.
//!
//! IFJ21 is a statically-typed, procedural subset of a Lua-flavoured
//! scripting language: integers, numbers, strings, booleans and nil,
//! first-order functions with multiple return values, block scoping and
//! the usual control flow. The target is a stack-based intermediate
//! machine whose programs are plain text.
//!
//! ## Compilation stages
//!
//! ### 1. Lexical analysis
//! [`token::Lexer`] walks the source one byte at a time and produces
//! tokens with their positions. It keeps a two-slot pushback buffer; the
//! parsers lean on it for their limited lookahead.
//!
//! ### 2. Parsing
//! [`parser`] combines two techniques. Statements are handled by a
//! predictive top-down driver over a precomputed expansion table;
//! expressions are handled by a bottom-up operator-precedence parser. The
//! two re-enter each other: an expression hands a nested call back to the
//! top-down driver and splices the finished subtree into its analysis.
//!
//! ### 3. Semantic analysis
//! [`semantic::Analyzer`] runs during parsing, invoked after every grammar
//! symbol. It keeps the scoped symbol table, resolves identifiers into a
//! declaration arena, checks types (with the implicit integer→number
//! widening), verifies function signatures and calls, and rewrites the
//! numeric `for` header into four synthesised declarations.
//!
//! ### 4. Optimisation
//! [`optimizer`] folds constant expressions, propagates constant locals,
//! drops dead declarations, stores, branches and functions, and records
//! which helper registers and subroutines the generator will need.
//!
//! ### 5. Code generation
//! [`codegen`] lowers the tree to IFJcode21 text: hoisted `DEFVAR`s,
//! stack-machine expression code guarded by nil/conversion/zero-division
//! helpers, structural short-circuiting, and the helper subroutine
//! library — trimmed down to what the usage map says is reachable.

pub mod ast;
pub mod codegen;
pub mod error;
pub mod optimizer;
pub mod parser;
pub mod semantic;
pub mod token;
pub mod types;

pub mod prelude {
    pub use super::codegen::generate;
    pub use super::compile;
    pub use super::error::CompileError;
    pub use super::optimizer::optimize;
    pub use super::parser::parse_program;
    pub use super::semantic::Analyzer;
    pub use super::token::Lexer;
}

use error::CompileError;

/// Runs the whole pipeline over a source program and returns the emitted
/// IFJcode21 text.
pub fn compile(source: &str, optimize: bool) -> Result<String, CompileError> {
    let (code, _) = compile_with_ast(source, optimize)?;
    Ok(code)
}

/// Like [`compile`], but also hands back the analysed and optimised AST
/// for inspection.
pub fn compile_with_ast(
    source: &str,
    optimize: bool,
) -> Result<(String, ast::Node), CompileError> {
    let mut lexer = token::Lexer::new(source);
    let mut analyzer = semantic::Analyzer::new();
    let mut ast = parser::parse_program(&mut lexer, &mut analyzer)?;
    let usage = optimizer::optimize(&mut ast, &mut analyzer.decls, &analyzer.funcs, optimize)?;
    let code = codegen::generate(&ast, &analyzer.decls, &analyzer.funcs, &usage);
    Ok((code, ast))
}
