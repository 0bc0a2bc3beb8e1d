//! Semantic analysis.
//!
//! The analyser is driven by the top-down parser: after every grammar
//! symbol of an expansion the parser hands it the node under construction
//! together with the symbol just completed, and the analyser performs
//! whatever checks become possible at that point — scope pushes and pops,
//! identifier resolution, declaration bookkeeping, expression typing and
//! the numeric-for rewrite.

mod builtins;
mod symbols;
mod symtable;

pub use symbols::{
    ConstValue, Decl, Declarations, DeclId, FuncId, Function, Functions, Signature, SiteId,
};
pub use symtable::{ScopeEntry, SymbolTable};

#[cfg(test)]
mod tests;

use crate::ast::node::{
    Assignment, Declaration, For, FuncCall, FuncDecl, FuncDef, Node, Return, Symbol, UnopType,
};
use crate::ast::BinopType;
use crate::error::CompileError;
use crate::parser::grammar::{Nterm, Sym};
use crate::token::Term;
use crate::types::Type;

/// Whether a value of `source` type may be passed into a slot of `dest`
/// type: exact match, nil into anything, or the implicit integer→number
/// widening.
pub fn pass_compatible(source: Type, dest: Type) -> bool {
    source == Type::Nil || source == dest || (source == Type::Integer && dest == Type::Number)
}

/// Type of an already-analysed expression node.
pub fn expr_type(
    node: &Node,
    decls: &Declarations,
    funcs: &Functions,
) -> Result<Type, CompileError> {
    match node {
        Node::Integer(_) => Ok(Type::Integer),
        Node::Number(_) => Ok(Type::Number),
        Node::Str(_) => Ok(Type::String),
        Node::Boolean(_) => Ok(Type::Boolean),
        Node::Nil => Ok(Type::Nil),
        Node::TypeSpec(t) => Ok(*t),
        Node::Symbol(s) => match s.decl {
            Some(id) => Ok(decls.get(id).ty),
            None => Err(CompileError::Internal("unresolved symbol".to_string())),
        },
        Node::Binop(b) => b
            .result
            .ok_or_else(|| CompileError::Internal("untyped binary operator".to_string())),
        Node::Unop(u) => u
            .result
            .ok_or_else(|| CompileError::Internal("untyped unary operator".to_string())),
        Node::FuncCall(c) => {
            let id = c
                .func
                .ok_or_else(|| CompileError::Internal("unresolved call".to_string()))?;
            Ok(funcs.get(id).return_types().first().copied().unwrap_or(Type::Nil))
        }
        _ => Err(CompileError::Internal("node has no expression type".to_string())),
    }
}

#[derive(Debug)]
pub struct Analyzer {
    pub table: SymbolTable,
    pub decls: Declarations,
    pub funcs: Functions,
    current_def: Option<FuncId>,
    cursor: (u32, u32),
}

impl Analyzer {
    pub fn new() -> Self {
        let mut table = SymbolTable::new();
        let mut funcs = Functions::new();
        builtins::install(&mut funcs, &mut table);
        Self {
            table,
            decls: Declarations::new(),
            funcs,
            current_def: None,
            cursor: (0, 0),
        }
    }

    /// Source position used for subsequent diagnostics; the parser updates
    /// it as it consumes tokens.
    pub fn set_cursor(&mut self, row: u32, column: u32) {
        self.cursor = (row, column);
    }

    pub fn expr_type(&self, node: &Node) -> Result<Type, CompileError> {
        expr_type(node, &self.decls, &self.funcs)
    }

    /// Incremental check, invoked after every symbol of a grammar-rule
    /// expansion. `expected` is the symbol just completed.
    pub fn check(&mut self, node: &mut Node, expected: Sym) -> Result<(), CompileError> {
        // every `end` terminal closes the scope of the construct it ends
        if expected == Sym::T(Term::End) {
            self.table.pop_scope()?;
        }

        match node {
            Node::Program(p) => {
                if expected == Sym::T(Term::Str) && p.require != "ifj21" {
                    return Err(self.err_sem("wrong preamble".to_string()));
                }
            }
            Node::While(w) => {
                if expected == Sym::T(Term::Do) {
                    self.table.push_scope();
                    if let Some(cond) = w.condition.as_deref_mut() {
                        self.check_expression(cond)?;
                    }
                }
            }
            Node::Repeat(r) => match expected {
                Sym::T(Term::Repeat) => self.table.push_scope(),
                Sym::T(Term::Until) => self.table.pop_scope()?,
                Sym::N(Nterm::Expression) => {
                    if let Some(cond) = r.condition.as_deref_mut() {
                        self.check_expression(cond)?;
                    }
                }
                _ => {}
            },
            Node::For(l) => {
                if expected == Sym::T(Term::Do) {
                    self.desugar_for(l)?;
                }
            }
            Node::If(i) => {
                if matches!(expected, Sym::T(Term::Elseif) | Sym::T(Term::Else)) {
                    self.table.pop_scope()?;
                }
                if matches!(expected, Sym::T(Term::Then) | Sym::T(Term::Else)) {
                    self.table.push_scope();
                }
                if expected == Sym::T(Term::End) {
                    for cond in &mut i.conditions {
                        self.check_expression(cond)?;
                    }
                }
            }
            Node::Assignment(a) => {
                if expected == Sym::N(Nterm::ExpressionList) {
                    self.check_assignment(a)?;
                }
            }
            Node::Declaration(d) => {
                if expected == Sym::N(Nterm::Declaration) {
                    self.check_declaration(d)?;
                }
            }
            Node::FuncDecl(d) => {
                if expected == Sym::N(Nterm::FuncDecl) {
                    self.check_func_decl(d)?;
                }
            }
            Node::FuncDef(d) => {
                if expected == Sym::N(Nterm::FuncTypeList) {
                    self.check_func_def(d)?;
                }
            }
            Node::FuncCall(c) => {
                if expected == Sym::N(Nterm::GlobalStatement) {
                    self.check_func_call(c, true)?;
                } else if expected == Sym::N(Nterm::ParenExpListOrIdList) {
                    self.check_func_call(c, false)?;
                }
            }
            Node::Return(r) => {
                if expected == Sym::N(Nterm::RetExpressionList) {
                    self.check_return(r)?;
                }
            }
            _ => {}
        }
        Ok(())
    }

    // ---- expressions ----

    pub fn check_expression(&mut self, node: &mut Node) -> Result<Type, CompileError> {
        match node {
            Node::Binop(_) => self.check_binop(node),
            Node::Unop(_) => self.check_unop(node),
            Node::Symbol(s) => {
                self.check_variable(s, true, false)?;
                let id = s.decl.expect("just resolved");
                Ok(self.decls.get(id).ty)
            }
            Node::FuncCall(c) => {
                self.check_func_call(c, false)?;
                let id = c.func.expect("just resolved");
                Ok(self
                    .funcs
                    .get(id)
                    .return_types()
                    .first()
                    .copied()
                    .unwrap_or(Type::Nil))
            }
            Node::Integer(_) => Ok(Type::Integer),
            Node::Number(_) => Ok(Type::Number),
            Node::Str(_) => Ok(Type::String),
            Node::Boolean(_) => Ok(Type::Boolean),
            Node::Nil => Ok(Type::Nil),
            _ => Err(CompileError::Internal(
                "unexpected node in expression position".to_string(),
            )),
        }
    }

    fn check_binop(&mut self, node: &mut Node) -> Result<Type, CompileError> {
        let Node::Binop(b) = node else {
            return Err(CompileError::Internal("expected binary operator".to_string()));
        };
        let left = self.check_expression(&mut b.left)?;
        let right = self.check_expression(&mut b.right)?;
        let op = b.op;

        // nil may only be compared, never computed with
        if matches!(op, BinopType::Eq | BinopType::Ne)
            && (left == Type::Nil || right == Type::Nil)
        {
            b.result = Some(Type::Boolean);
            return Ok(Type::Boolean);
        }

        if matches!(op, BinopType::Div | BinopType::IntDiv) {
            let zero = match b.right.as_ref() {
                Node::Integer(0) => true,
                Node::Number(n) => *n == 0.0,
                _ => false,
            };
            if zero {
                return Err(self.err_zerodiv("division by 0".to_string()));
            }
        }

        let mismatch = |s: &Self| {
            s.err_type_expr(format!(
                "cannot use operator '{}' for types {} and {}",
                op, left, right
            ))
        };

        if left == Type::Nil || right == Type::Nil {
            return Err(self.err_nil(format!(
                "cannot use operator '{}' for types {} and {}",
                op, left, right
            )));
        }

        // common operand type with the implicit widening
        let source = if left == Type::Integer && right == Type::Integer {
            Type::Integer
        } else if left.is_numeric() && right.is_numeric() {
            Type::Number
        } else if left == right {
            left
        } else {
            return Err(mismatch(self));
        };

        let result = match op {
            BinopType::Add | BinopType::Sub | BinopType::Mul | BinopType::Mod | BinopType::Power => {
                source.is_numeric().then_some(source)
            }
            // division is always number-valued
            BinopType::Div => source.is_numeric().then_some(Type::Number),
            BinopType::IntDiv => (source == Type::Integer).then_some(Type::Integer),
            BinopType::Concat => (source == Type::String).then_some(Type::String),
            BinopType::And | BinopType::Or => {
                (source == Type::Boolean).then_some(Type::Boolean)
            }
            BinopType::Lt
            | BinopType::Gt
            | BinopType::Lte
            | BinopType::Gte
            | BinopType::Eq
            | BinopType::Ne => Some(Type::Boolean),
        };

        match result {
            Some(result) => {
                b.result = Some(result);
                Ok(result)
            }
            None => Err(mismatch(self)),
        }
    }

    fn check_unop(&mut self, node: &mut Node) -> Result<Type, CompileError> {
        let Node::Unop(u) = node else {
            return Err(CompileError::Internal("expected unary operator".to_string()));
        };
        let operand = self.check_expression(&mut u.operand)?;
        if operand == Type::Nil {
            return Err(self.err_nil(format!("cannot use operator '{}' for type nil", u.op)));
        }
        let result = match u.op {
            UnopType::Len => (operand == Type::String).then_some(Type::Integer),
            UnopType::Neg => operand.is_numeric().then_some(operand),
            UnopType::Not => (operand == Type::Boolean).then_some(Type::Boolean),
        };
        match result {
            Some(result) => {
                u.result = Some(result);
                Ok(result)
            }
            None => Err(self.err_type_expr(format!(
                "cannot use operator '{}' for type {}",
                u.op, operand
            ))),
        }
    }

    // ---- identifiers and declarations ----

    /// Resolves a symbol occurrence and updates the read/write bookkeeping
    /// on its declaration.
    pub fn check_variable(
        &mut self,
        symbol: &mut Symbol,
        read: bool,
        write: bool,
    ) -> Result<(), CompileError> {
        if symbol.decl.is_none() {
            let id = match self.table.find(&symbol.name) {
                Some(ScopeEntry::Var(id)) => id,
                Some(ScopeEntry::Func(_)) => {
                    return Err(
                        self.err_undef(format!("{} is a function, not a variable", symbol.name))
                    );
                }
                None => {
                    return Err(self.err_undef(format!("variable {} not defined", symbol.name)));
                }
            };
            symbol.decl = Some(id);
        }
        let id = symbol.decl.expect("resolved above");

        if read {
            let decl = self.decls.get_mut(id);
            decl.used = true;
            decl.read_count += 1;
            let site = decl.last_site;
            self.decls.bump_site(site);
        }
        if write {
            let site = self.decls.new_site();
            let decl = self.decls.get_mut(id);
            decl.dirty = true;
            decl.last_site = site;
            symbol.write_site = Some(site);
        }
        Ok(())
    }

    /// Inserts a new local into the current scope, mangling its emission
    /// name with the scope level.
    fn declare_variable(&mut self, name: &str, ty: Type) -> Result<DeclId, CompileError> {
        if self.table.find_in_current(name).is_some() {
            return Err(self.err_redef(format!("redeclaration of {}", name)));
        }
        if matches!(self.table.find_in_global(name), Some(ScopeEntry::Func(_))) {
            return Err(self.err_redef(format!("{} collides with a function", name)));
        }
        let mangled = format!("{}%{}", name, self.table.level());
        let id = self.decls.declare(mangled, ty);
        self.table.put(name, ScopeEntry::Var(id));
        Ok(id)
    }

    fn check_declaration(&mut self, d: &mut Declaration) -> Result<(), CompileError> {
        let dest = d
            .ty
            .ok_or_else(|| CompileError::Internal("declaration without a type".to_string()))?;
        if let Some(init) = d.init.as_deref_mut() {
            let source = self.check_expression(init)?;
            if !pass_compatible(source, dest) {
                return Err(self.err_assign("incompatible types in declaration".to_string()));
            }
        }
        let name = d.name.clone();
        d.decl = Some(self.declare_variable(&name, dest)?);
        Ok(())
    }

    // ---- functions ----

    fn type_list(&self, nodes: &[Node]) -> Result<Vec<Type>, CompileError> {
        nodes
            .iter()
            .map(|n| match n {
                Node::TypeSpec(t) => Ok(*t),
                _ => Err(CompileError::Internal("expected a type node".to_string())),
            })
            .collect()
    }

    fn register_function(
        &mut self,
        name: &str,
        sig: Signature,
        is_def: bool,
    ) -> Result<FuncId, CompileError> {
        match self.table.find_in_global(name) {
            Some(ScopeEntry::Func(id)) => {
                if is_def {
                    if self.funcs.get(id).defined.is_some() {
                        return Err(self.err_redef(format!("duplicate definition of function {}", name)));
                    }
                    self.funcs.get_mut(id).defined = Some(sig);
                } else {
                    if self.funcs.get(id).declared.is_some() {
                        return Err(
                            self.err_redef(format!("duplicate declaration of function {}", name))
                        );
                    }
                    self.funcs.get_mut(id).declared = Some(sig);
                }
                let f = self.funcs.get(id);
                if let (Some(declared), Some(defined)) = (&f.declared, &f.defined) {
                    if declared != defined {
                        return Err(self.err_sem(format!(
                            "declaration and definition of function {} differ",
                            name
                        )));
                    }
                }
                Ok(id)
            }
            Some(ScopeEntry::Var(_)) => Err(CompileError::Internal(
                "variable in global scope".to_string(),
            )),
            None => {
                let id = self.funcs.add(Function {
                    name: name.to_string(),
                    declared: (!is_def).then_some(sig.clone()),
                    defined: is_def.then_some(sig),
                    params: Vec::new(),
                    used: false,
                    builtin: false,
                    variadic: false,
                });
                self.table.put_global(name, ScopeEntry::Func(id));
                Ok(id)
            }
        }
    }

    fn check_func_decl(&mut self, d: &mut FuncDecl) -> Result<(), CompileError> {
        let sig = Signature {
            args: self.type_list(&d.argument_types)?,
            rets: self.type_list(&d.return_types)?,
        };
        let name = d.name.clone();
        d.func = Some(self.register_function(&name, sig, false)?);
        Ok(())
    }

    /// Registers a definition, then opens the function scope and inserts
    /// its parameters, so that the body parses against them.
    fn check_func_def(&mut self, d: &mut FuncDef) -> Result<(), CompileError> {
        let args = d
            .parameters
            .iter()
            .map(|p| match p {
                Node::Declaration(p) => p
                    .ty
                    .ok_or_else(|| CompileError::Internal("untyped parameter".to_string())),
                _ => Err(CompileError::Internal("expected a parameter node".to_string())),
            })
            .collect::<Result<Vec<_>, _>>()?;
        let sig = Signature { args, rets: self.type_list(&d.return_types)? };
        let name = d.name.clone();
        let id = self.register_function(&name, sig, true)?;
        d.func = Some(id);

        self.table.push_scope();
        let mut params = Vec::new();
        for p in &mut d.parameters {
            let Node::Declaration(p) = p else {
                return Err(CompileError::Internal("expected a parameter node".to_string()));
            };
            let name = p.name.clone();
            let ty = p.ty.expect("checked above");
            let decl = self.declare_variable(&name, ty)?;
            p.decl = Some(decl);
            params.push(decl);
        }
        self.funcs.get_mut(id).params = params;
        self.current_def = Some(id);
        Ok(())
    }

    pub fn check_func_call(
        &mut self,
        c: &mut FuncCall,
        main_body: bool,
    ) -> Result<(), CompileError> {
        if c.func.is_none() {
            c.func = match self.table.find_in_global(&c.name) {
                Some(ScopeEntry::Func(id)) => Some(id),
                _ => {
                    return Err(self.err_undef(format!("function {} not defined", c.name)));
                }
            };
        }
        let id = c.func.expect("resolved above");
        self.funcs.get_mut(id).used = true;

        if main_body && !self.funcs.get(id).return_types().is_empty() {
            return Err(
                self.err_type_call("function called at global scope can't return values".to_string())
            );
        }

        for arg in &mut c.arguments {
            self.check_expression(arg)?;
        }

        if self.funcs.get(id).variadic {
            return Ok(());
        }

        let ptypes = self.funcs.get(id).argument_types().to_vec();
        let count = c.arguments.len();
        let mut pi = 0;
        for (i, arg) in c.arguments.iter().enumerate() {
            // a trailing call contributes all of its return values
            if i + 1 == count {
                if let Node::FuncCall(inner) = arg {
                    let inner_id = inner
                        .func
                        .ok_or_else(|| CompileError::Internal("unresolved call".to_string()))?;
                    for rt in self.funcs.get(inner_id).return_types().to_vec() {
                        if pi >= ptypes.len() || !pass_compatible(rt, ptypes[pi]) {
                            return Err(self.err_type_call(format!(
                                "invalid arguments in call of {}",
                                c.name
                            )));
                        }
                        pi += 1;
                    }
                    continue;
                }
            }
            if pi >= ptypes.len() {
                return Err(
                    self.err_type_call(format!("too many arguments in call of {}", c.name))
                );
            }
            let source = self.expr_type(arg)?;
            if !pass_compatible(source, ptypes[pi]) {
                return Err(self.err_type_call(format!(
                    "incompatible argument type in call of {}",
                    c.name
                )));
            }
            pi += 1;
        }
        if pi != ptypes.len() {
            return Err(
                self.err_type_call(format!("wrong number of arguments in call of {}", c.name))
            );
        }
        Ok(())
    }

    // ---- multi-value forms ----

    /// Value types supplied by an expression list; a trailing function call
    /// contributes all of its declared return values.
    fn value_types(&self, expressions: &[Node]) -> Result<Vec<Type>, CompileError> {
        let mut values = Vec::new();
        let count = expressions.len();
        for (i, e) in expressions.iter().enumerate() {
            if i + 1 == count {
                if let Node::FuncCall(c) = e {
                    let id = c
                        .func
                        .ok_or_else(|| CompileError::Internal("unresolved call".to_string()))?;
                    values.extend_from_slice(self.funcs.get(id).return_types());
                    continue;
                }
            }
            values.push(expr_type(e, &self.decls, &self.funcs)?);
        }
        Ok(values)
    }

    fn check_assignment(&mut self, a: &mut Assignment) -> Result<(), CompileError> {
        for e in &mut a.expressions {
            self.check_expression(e)?;
        }
        for id in &mut a.identifiers {
            let Node::Symbol(s) = id else {
                return Err(CompileError::Internal("expected an identifier".to_string()));
            };
            self.check_variable(s, false, true)?;
        }

        let values = self.value_types(&a.expressions)?;
        let trailing_call = matches!(a.expressions.last(), Some(Node::FuncCall(_)));

        for (i, id) in a.identifiers.iter().enumerate() {
            let Node::Symbol(s) = id else {
                return Err(CompileError::Internal("expected an identifier".to_string()));
            };
            let dest = self.decls.get(s.decl.expect("resolved above")).ty;
            match values.get(i) {
                Some(&source) => {
                    if !pass_compatible(source, dest) {
                        return Err(
                            self.err_assign("incompatible types in assignment".to_string())
                        );
                    }
                }
                // a trailing call pads missing values with nil at runtime
                None if trailing_call => {}
                None => {
                    return Err(self.err_assign("not enough values in assignment".to_string()));
                }
            }
        }
        Ok(())
    }

    fn check_return(&mut self, r: &mut Return) -> Result<(), CompileError> {
        let id = self
            .current_def
            .ok_or_else(|| CompileError::Internal("return outside of a function".to_string()))?;
        r.func = Some(id);

        for v in &mut r.values {
            self.check_expression(v)?;
        }

        let rets = self.funcs.get(id).return_types().to_vec();
        let values = self.value_types(&r.values)?;
        for (i, &source) in values.iter().enumerate() {
            match rets.get(i) {
                Some(&dest) => {
                    if !pass_compatible(source, dest) {
                        return Err(self.err_type_call("incompatible types in return".to_string()));
                    }
                }
                None => {
                    return Err(self.err_type_call("returning too many values".to_string()));
                }
            }
        }
        Ok(())
    }

    // ---- numeric for ----

    /// Rewrites the loop header into four synthesised declarations: the
    /// loop-internal iterator (`&`, initialised with the start expression),
    /// the user-visible copy, the bound (`&cond`) and the step (`&step`,
    /// defaulting to one). All four share the common numeric type.
    fn desugar_for(&mut self, l: &mut For) -> Result<(), CompileError> {
        self.table.push_scope();

        let name = match l.iterator.as_deref() {
            Some(Node::Symbol(s)) => s.name.clone(),
            _ => return Err(CompileError::Internal("for loop without iterator".to_string())),
        };
        let it_id = self.declare_variable(&name, Type::Integer)?;

        let t_setup = match l.setup.as_deref_mut() {
            Some(e) => self.check_expression(e)?,
            None => return Err(CompileError::Internal("for loop without start".to_string())),
        };
        let t_cond = match l.condition.as_deref_mut() {
            Some(e) => self.check_expression(e)?,
            None => return Err(CompileError::Internal("for loop without bound".to_string())),
        };
        let t_step = match l.step.as_deref_mut() {
            Some(e) => Some(self.check_expression(e)?),
            None => None,
        };

        if !t_setup.is_numeric() {
            return Err(self.err_type_expr("incompatible type in for (start)".to_string()));
        }
        if !t_cond.is_numeric() {
            return Err(self.err_type_expr("incompatible type in for (bound)".to_string()));
        }
        if let Some(t) = t_step {
            if !t.is_numeric() {
                return Err(self.err_type_expr("incompatible type in for (step)".to_string()));
            }
        }

        let for_type = if t_setup == Type::Number
            || t_cond == Type::Number
            || t_step == Some(Type::Number)
        {
            Type::Number
        } else {
            Type::Integer
        };
        self.decls.get_mut(it_id).ty = for_type;

        let base = self.decls.get(it_id).name.clone();
        let iter_id = self.decls.declare(format!("{}&", base), for_type);
        let cond_id = self.decls.declare(format!("{}&cond", base), for_type);
        let step_id = self.decls.declare(format!("{}&step", base), for_type);

        let setup_expr = l.setup.take();
        let cond_expr = l.condition.take();
        let step_expr = l.step.take().or_else(|| {
            Some(Box::new(match for_type {
                Type::Number => Node::Number(1.0),
                _ => Node::Integer(1),
            }))
        });

        let synth = |name: &str, decl: DeclId, init: Option<Box<Node>>| {
            Box::new(Node::Declaration(Declaration {
                name: name.to_string(),
                ty: Some(for_type),
                init,
                decl: Some(decl),
            }))
        };
        l.iterator = Some(synth(&name, iter_id, setup_expr));
        l.setup = Some(synth(&name, it_id, None));
        l.condition = Some(synth(&name, cond_id, cond_expr));
        l.step = Some(synth(&name, step_id, step_expr));
        Ok(())
    }

    // ---- diagnostics ----

    fn err_sem(&self, message: String) -> CompileError {
        CompileError::Semantic { row: self.cursor.0, column: self.cursor.1, message }
    }

    fn err_undef(&self, message: String) -> CompileError {
        CompileError::Undef { row: self.cursor.0, column: self.cursor.1, message }
    }

    fn err_redef(&self, message: String) -> CompileError {
        CompileError::Redef { row: self.cursor.0, column: self.cursor.1, message }
    }

    fn err_assign(&self, message: String) -> CompileError {
        CompileError::Assign { row: self.cursor.0, column: self.cursor.1, message }
    }

    fn err_type_call(&self, message: String) -> CompileError {
        CompileError::TypeCall { row: self.cursor.0, column: self.cursor.1, message }
    }

    fn err_type_expr(&self, message: String) -> CompileError {
        CompileError::TypeExpr { row: self.cursor.0, column: self.cursor.1, message }
    }

    fn err_nil(&self, message: String) -> CompileError {
        CompileError::NilUsage { row: self.cursor.0, column: self.cursor.1, message }
    }

    fn err_zerodiv(&self, message: String) -> CompileError {
        CompileError::ZeroDiv { row: self.cursor.0, column: self.cursor.1, message }
    }
}

impl Default for Analyzer {
    fn default() -> Self {
        Self::new()
    }
}
