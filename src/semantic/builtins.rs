use crate::types::Type;

use super::symbols::{Function, Functions, Signature};
use super::symtable::{ScopeEntry, SymbolTable};

/// Seeds the global scope with the language's built-in functions.
pub(super) fn install(funcs: &mut Functions, table: &mut SymbolTable) {
    let mut add = |name: &str, args: Vec<Type>, rets: Vec<Type>, variadic: bool| {
        let id = funcs.add(Function {
            name: name.to_string(),
            declared: None,
            defined: Some(Signature { args, rets }),
            params: Vec::new(),
            used: false,
            builtin: true,
            variadic,
        });
        table.put_global(name, ScopeEntry::Func(id));
    };

    add("write", vec![], vec![], true);
    add("reads", vec![], vec![Type::String], false);
    add("readi", vec![], vec![Type::Integer], false);
    add("readn", vec![], vec![Type::Number], false);
    add("tointeger", vec![Type::Number], vec![Type::Integer], false);
    add(
        "substr",
        vec![Type::String, Type::Number, Type::Number],
        vec![Type::String],
        false,
    );
    add("ord", vec![Type::String, Type::Integer], vec![Type::Integer], false);
    add("chr", vec![Type::Integer], vec![Type::String], false);
}
