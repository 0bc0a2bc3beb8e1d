//! IFJcode21 generation.
//!
//! Walks the optimised AST and emits text-format assembly for the stack
//! machine: a header with the global-frame `DEFVAR`s gated by the usage
//! map, the helper subroutine library, the used built-in functions, user
//! function subroutines, and the main body under `$$main`. Local `DEFVAR`s
//! are hoisted to the top of each function so loop bodies never redefine a
//! variable.

mod helpers;


use std::collections::BTreeSet;

use crate::ast::node::{
    Assignment, Binop, Declaration, For, FuncCall, If, Node, Repeat, Return, Symbol, Unop, While,
};
use crate::ast::{BinopType, UnopType};
use crate::optimizer::{is_not_nil, GenUsage, GfReg, Helper};
use crate::semantic::{expr_type, Declarations, DeclId, FuncId, Functions};
use crate::types::Type;

/// Formats a double in the C99 hexadecimal notation the IM expects.
pub fn hex_float(value: f64) -> String {
    if value == 0.0 {
        return if value.is_sign_negative() {
            "-0x0p+0".to_string()
        } else {
            "0x0p+0".to_string()
        };
    }
    let bits = value.to_bits();
    let sign = if bits >> 63 != 0 { "-" } else { "" };
    let exponent = ((bits >> 52) & 0x7ff) as i64;
    let fraction = bits & 0x000f_ffff_ffff_ffff;
    if exponent == 0x7ff {
        // not representable in a program; keep the output readable
        return format!("{}inf", sign);
    }
    let (lead, e) = if exponent == 0 {
        (0, -1022)
    } else {
        (1, exponent - 1023)
    };
    let mut mantissa = format!("{:013x}", fraction);
    while mantissa.ends_with('0') {
        mantissa.pop();
    }
    if mantissa.is_empty() {
        format!("{}0x{}p{:+}", sign, lead, e)
    } else {
        format!("{}0x{}.{}p{:+}", sign, lead, mantissa, e)
    }
}

/// Escapes a string literal for emission: control bytes, `#`, `\` and
/// everything past ASCII become `\DDD` escapes.
fn escape_string(text: &str) -> String {
    let mut out = String::new();
    for c in text.chars() {
        let v = c as u32;
        if v <= 32 || c == '#' || c == '\\' || v > 126 {
            out.push_str(&format!("\\{:03}", v));
        } else {
            out.push(c);
        }
    }
    out
}

pub fn generate(
    ast: &Node,
    decls: &Declarations,
    funcs: &Functions,
    usage: &GenUsage,
) -> String {
    let mut generator = Generator {
        decls,
        funcs,
        usage,
        out: String::new(),
        labels: 0,
        declared: BTreeSet::new(),
    };
    generator.header();
    generator.program(ast);
    generator.out
}

struct Generator<'a> {
    decls: &'a Declarations,
    funcs: &'a Functions,
    usage: &'a GenUsage,
    out: String,
    labels: u32,
    /// Per-function seen-set for hoisted `DEFVAR`s.
    declared: BTreeSet<String>,
}

impl<'a> Generator<'a> {
    fn emit(&mut self, line: &str) {
        self.out.push_str(line);
        self.out.push('\n');
    }

    fn fresh_label(&mut self) -> u32 {
        self.labels += 1;
        self.labels
    }

    fn decl_name(&self, id: Option<DeclId>) -> String {
        match id {
            Some(id) => self.decls.get(id).name.clone(),
            None => String::new(),
        }
    }

    fn symbol_name(&self, symbol: &Symbol) -> String {
        self.decl_name(symbol.decl)
    }

    fn return_count(&self, id: Option<FuncId>) -> usize {
        match id {
            Some(id) => self.funcs.get(id).return_types().len(),
            None => 0,
        }
    }

    fn builtin_used(&self, name: &str) -> bool {
        self.funcs
            .find(name)
            .map(|id| self.funcs.get(id).used)
            .unwrap_or(false)
    }

    /// Immediate operand text for literal and symbol leaves.
    fn operand(&self, node: &Node) -> Option<String> {
        match node {
            Node::Integer(v) => Some(format!("int@{}", v)),
            Node::Number(v) => Some(format!("float@{}", hex_float(*v))),
            Node::Boolean(v) => Some(format!("bool@{}", if *v { "true" } else { "false" })),
            Node::Str(s) => Some(format!("string@{}", escape_string(s))),
            Node::Nil => Some("nil@nil".to_string()),
            Node::Symbol(s) => Some(format!("LF@{}", self.symbol_name(s))),
            _ => None,
        }
    }

    // ---- program skeleton ----

    fn header(&mut self) {
        self.emit(".IFJcode21");
        self.emit("");
        self.emit("# Global variables:");
        self.emit("DEFVAR GF@result");
        self.emit("DEFVAR GF@trash");
        for reg in GfReg::ALL {
            if self.usage.reg(reg) {
                self.emit(&format!("DEFVAR GF@{}", reg.name()));
            }
        }
        self.emit("JUMP $$main");
        self.emit("");
        self.emit("# Built-in functions:");
    }

    fn program(&mut self, node: &Node) {
        self.builtins();
        let Node::Program(p) = node else {
            return;
        };
        for statement in &p.statements {
            if matches!(statement, Node::FuncDef(_)) {
                self.statement(statement, 0);
            }
        }
        self.emit("LABEL $$main");
        for statement in &p.statements {
            if matches!(statement, Node::FuncCall(_)) {
                self.statement(statement, 0);
            }
        }
    }

    fn builtins(&mut self) {
        let everything = !self.usage.optimize();
        let functions: [(&str, &str); 7] = [
            ("reads", helpers::READS),
            ("readi", helpers::READI),
            ("readn", helpers::READN),
            ("tointeger", helpers::TOINTEGER),
            ("chr", helpers::CHR),
            ("ord", helpers::ORD),
            ("substr", helpers::SUBSTR),
        ];
        for (name, text) in functions {
            if everything || self.builtin_used(name) {
                self.emit(text);
                self.emit("");
            }
        }

        let routines: [(Helper, &str); 13] = [
            (Helper::IntZeroDiv, helpers::INT_ZERODIVCHECK),
            (Helper::FloatZeroDiv, helpers::FLOAT_ZERODIVCHECK),
            (Helper::NilCheck, helpers::NIL_CHECK),
            (Helper::ConvCheck, helpers::CONV_CHECK),
            (Helper::NilWrite, helpers::NIL_WRITE),
            (Helper::EvalCondition, helpers::EVAL_CONDITION),
            (Helper::Exponentiation, helpers::EXPONENTIATION),
            (Helper::CheckIfInt, helpers::CHECK_IF_INT),
            (Helper::ConvToFloat, helpers::CONV_TO_FLOAT),
            (Helper::ZeroStep, helpers::ZERO_STEP),
            (Helper::ForConvert, helpers::FOR_CONVERT),
            (Helper::ShouldIJump, helpers::SHOULD_I_JUMP),
            (Helper::ConvToInt, helpers::CONV_TO_INT),
        ];
        for (helper, text) in routines {
            if self.usage.helper(helper) {
                self.emit(text);
                self.emit("");
            }
        }
    }

    // ---- statements ----

    fn statement(&mut self, node: &Node, break_label: u32) {
        match node {
            Node::Invalid | Node::FuncDecl(_) => {}
            Node::FuncDef(_) => self.func_def(node),
            Node::FuncCall(c) => self.func_call(c),
            Node::Declaration(d) => self.declaration(d),
            Node::Assignment(a) => self.assignment(a),
            Node::If(i) => self.if_node(i, break_label),
            Node::While(w) => self.while_node(w),
            Node::Repeat(r) => self.repeat_node(r),
            Node::For(l) => self.for_node(l),
            Node::Return(r) => self.return_node(r),
            Node::Body(b) => {
                for statement in &b.statements {
                    self.statement(statement, break_label);
                }
            }
            Node::Break => self.emit(&format!("JUMP %{}", break_label)),
            _ => {}
        }
    }

    fn func_def(&mut self, node: &Node) {
        let Node::FuncDef(d) = node else {
            return;
        };
        self.emit(&format!("LABEL ${}", d.name));
        self.emit("PUSHFRAME");
        for (i, parameter) in d.parameters.iter().enumerate() {
            if let Node::Declaration(p) = parameter {
                let name = self.decl_name(p.decl);
                self.emit(&format!("DEFVAR LF@{}", name));
                self.emit(&format!("MOVE LF@{} LF@%{}", name, i));
            }
        }
        for i in 0..self.return_count(d.func) {
            self.emit(&format!("DEFVAR LF@retval{}", i));
            self.emit(&format!("MOVE LF@retval{} nil@nil", i));
        }
        self.declared.clear();
        if let Some(body) = d.body.as_deref() {
            self.hoist_declarations(body);
            self.statement(body, 0);
        }
        self.emit("POPFRAME");
        self.emit("RETURN");
        self.emit("");
    }

    /// Emits every local `DEFVAR` of a function up front, once per mangled
    /// name, so that re-entered loop bodies never redefine.
    fn hoist_declarations(&mut self, node: &Node) {
        match node {
            Node::Declaration(d) => {
                let name = self.decl_name(d.decl);
                if self.declared.insert(name.clone()) {
                    self.emit(&format!("DEFVAR LF@{}", name));
                }
            }
            Node::Body(b) => {
                for statement in &b.statements {
                    self.hoist_declarations(statement);
                }
            }
            Node::If(i) => {
                for body in &i.bodies {
                    self.hoist_declarations(body);
                }
            }
            Node::While(w) => {
                if let Some(body) = w.body.as_deref() {
                    self.hoist_declarations(body);
                }
            }
            Node::Repeat(r) => {
                if let Some(body) = r.body.as_deref() {
                    self.hoist_declarations(body);
                }
            }
            Node::For(l) => {
                for slot in [&l.iterator, &l.condition, &l.step, &l.setup] {
                    if let Some(declaration) = slot.as_deref() {
                        self.hoist_declarations(declaration);
                    }
                }
                if let Some(body) = l.body.as_deref() {
                    self.hoist_declarations(body);
                }
            }
            _ => {}
        }
    }

    fn declaration(&mut self, d: &Declaration) {
        let name = self.decl_name(d.decl);
        match d.init.as_deref() {
            None => self.emit(&format!("MOVE LF@{} nil@nil", name)),
            Some(init) => match init {
                Node::FuncCall(c) => {
                    self.func_call(c);
                    self.emit("MOVE GF@result TF@retval0");
                    self.emit(&format!("MOVE LF@{} GF@result", name));
                }
                Node::Binop(_) | Node::Unop(_) => {
                    self.expr(init);
                    self.emit("POPS GF@result");
                    self.emit(&format!("MOVE LF@{} GF@result", name));
                }
                other => {
                    if let Some(value) = self.operand(other) {
                        self.emit(&format!("MOVE LF@{} {}", name, value));
                    }
                }
            },
        }
    }

    fn assignment(&mut self, a: &Assignment) {
        let targets: Vec<&Symbol> = a
            .identifiers
            .iter()
            .filter_map(|n| match n {
                Node::Symbol(s) => Some(s),
                _ => None,
            })
            .collect();
        let target_decls: Vec<Option<DeclId>> = targets.iter().map(|s| s.decl).collect();

        // names whose values sit on the operand stack, in push order
        let mut pending: Vec<String> = Vec::new();
        let count = a.expressions.len();
        for (i, expression) in a.expressions.iter().enumerate() {
            let Some(target) = targets.get(i) else {
                break;
            };
            let target_name = self.symbol_name(target);
            match expression {
                Node::Symbol(source) => {
                    // a source that is also a target must go through the
                    // stack, otherwise it can be moved directly
                    if source.decl.is_some() && target_decls.contains(&source.decl) {
                        self.emit(&format!("PUSHS LF@{}", self.symbol_name(source)));
                        pending.push(target_name);
                    } else {
                        self.emit(&format!(
                            "MOVE LF@{} LF@{}",
                            target_name,
                            self.symbol_name(source)
                        ));
                    }
                }
                Node::FuncCall(c) => {
                    let last = i + 1 == count;
                    self.func_call(c);
                    if !last {
                        self.emit("PUSHS TF@retval0");
                        pending.push(target_name);
                    } else {
                        let needed = targets.len() - i;
                        let rets = self.return_count(c.func);
                        for k in 0..needed.min(rets) {
                            self.emit(&format!("PUSHS TF@retval{}", k));
                        }
                        for _ in rets.min(needed)..needed {
                            self.emit("PUSHS nil@nil");
                        }
                        for target in &targets[i..] {
                            pending.push(self.symbol_name(target));
                        }
                        break;
                    }
                }
                Node::Binop(_) | Node::Unop(_) => {
                    self.expr(expression);
                    pending.push(target_name);
                }
                other => {
                    if let Some(value) = self.operand(other) {
                        self.emit(&format!("MOVE LF@{} {}", target_name, value));
                    }
                }
            }
        }

        for name in pending.iter().rev() {
            self.emit(&format!("POPS LF@{}", name));
        }
    }

    fn func_call(&mut self, c: &FuncCall) {
        let Some(id) = c.func else {
            return;
        };
        let variadic = self.funcs.get(id).variadic;
        let name = self.funcs.get(id).name.clone();
        let param_count = self.funcs.get(id).argument_types().len();

        let mut pushed = 0usize;
        let count = c.arguments.len();
        for (i, arg) in c.arguments.iter().enumerate() {
            let last = i + 1 == count;
            match arg {
                Node::FuncCall(inner) => {
                    let rets = self.return_count(inner.func);
                    self.func_call(inner);
                    if last && variadic {
                        for k in 0..rets {
                            self.emit(&format!("PUSHS TF@retval{}", k));
                        }
                        pushed += rets;
                    } else if last {
                        let needed = param_count.saturating_sub(pushed);
                        for k in 0..needed.min(rets) {
                            self.emit(&format!("PUSHS TF@retval{}", k));
                        }
                        for _ in rets.min(needed)..needed {
                            self.emit("PUSHS nil@nil");
                        }
                        pushed = param_count;
                    } else {
                        self.emit("PUSHS TF@retval0");
                        pushed += 1;
                    }
                }
                Node::Binop(_) | Node::Unop(_) => {
                    self.expr(arg);
                    pushed += 1;
                }
                other => {
                    if let Some(value) = self.operand(other) {
                        self.emit(&format!("PUSHS {}", value));
                        pushed += 1;
                    }
                }
            }
        }

        let slots = if variadic { pushed } else { param_count };
        self.emit("CREATEFRAME");
        for l in 0..slots {
            self.emit("POPS GF@result");
            self.emit(&format!("DEFVAR TF@%{}", slots - 1 - l));
            self.emit(&format!("MOVE TF@%{} GF@result", slots - 1 - l));
        }
        if variadic {
            for k in 0..slots {
                self.emit(&format!("PUSHS TF@%{}", k));
                self.emit("CALL nil_write");
                self.emit(&format!("POPS TF@%{}", k));
            }
        } else {
            self.emit(&format!("CALL ${}", name));
        }
        self.emit("");
    }

    fn return_node(&mut self, r: &Return) {
        let ret_count = self.return_count(r.func);
        let mut filled = 0usize;
        let count = r.values.len();
        for (i, value) in r.values.iter().enumerate() {
            if filled >= ret_count {
                break;
            }
            let last = i + 1 == count;
            match value {
                Node::FuncCall(c) if last => {
                    let rets = self.return_count(c.func);
                    self.func_call(c);
                    let needed = ret_count - filled;
                    for k in 0..needed.min(rets) {
                        self.emit(&format!("PUSHS TF@retval{}", k));
                    }
                    for _ in rets.min(needed)..needed {
                        self.emit("PUSHS nil@nil");
                    }
                    filled = ret_count;
                }
                Node::FuncCall(c) => {
                    self.func_call(c);
                    self.emit("PUSHS TF@retval0");
                    filled += 1;
                }
                Node::Binop(_) | Node::Unop(_) => {
                    self.expr(value);
                    filled += 1;
                }
                other => {
                    if let Some(operand) = self.operand(other) {
                        self.emit(&format!("PUSHS {}", operand));
                        filled += 1;
                    }
                }
            }
        }
        while filled < ret_count {
            self.emit("PUSHS nil@nil");
            filled += 1;
        }
        for l in 0..ret_count {
            self.emit("POPS GF@result");
            self.emit(&format!("MOVE LF@retval{} GF@result", ret_count - 1 - l));
        }
        self.emit("POPFRAME");
        self.emit("RETURN");
    }

    fn condition_value(&mut self, condition: &Node) {
        self.expr(condition);
        self.emit("CALL EVAL_CONDITION");
        self.emit("POPS GF@result");
    }

    fn if_node(&mut self, i: &If, break_label: u32) {
        let end = self.fresh_label();
        let mut bodies = i.bodies.iter();
        for condition in &i.conditions {
            let next = self.fresh_label();
            self.condition_value(condition);
            self.emit(&format!("JUMPIFEQ %{} GF@result bool@false", next));
            if let Some(body) = bodies.next() {
                self.statement(body, break_label);
            }
            self.emit(&format!("JUMP %{}", end));
            self.emit(&format!("LABEL %{}", next));
        }
        if let Some(body) = bodies.next() {
            self.statement(body, break_label);
        }
        self.emit(&format!("LABEL %{}", end));
    }

    fn while_node(&mut self, w: &While) {
        let head = self.fresh_label();
        let end = self.fresh_label();
        self.emit(&format!("LABEL %{}", head));
        if let Some(condition) = w.condition.as_deref() {
            self.condition_value(condition);
        }
        self.emit(&format!("JUMPIFEQ %{} GF@result bool@false", end));
        if let Some(body) = w.body.as_deref() {
            self.statement(body, end);
        }
        self.emit(&format!("JUMP %{}", head));
        self.emit(&format!("LABEL %{}", end));
    }

    fn repeat_node(&mut self, r: &Repeat) {
        let head = self.fresh_label();
        let end = self.fresh_label();
        self.emit(&format!("LABEL %{}", head));
        if let Some(body) = r.body.as_deref() {
            self.statement(body, end);
        }
        if let Some(condition) = r.condition.as_deref() {
            self.condition_value(condition);
        }
        self.emit(&format!("JUMPIFEQ %{} GF@result bool@false", head));
        self.emit(&format!("LABEL %{}", end));
    }

    fn for_decl_name(&self, slot: &Option<Box<Node>>) -> String {
        match slot.as_deref() {
            Some(Node::Declaration(d)) => self.decl_name(d.decl),
            _ => String::new(),
        }
    }

    fn for_node(&mut self, l: &For) {
        let head = self.fresh_label();
        let end = self.fresh_label();

        for slot in [&l.iterator, &l.step, &l.condition, &l.setup] {
            if let Some(Node::Declaration(d)) = slot.as_deref() {
                self.declaration(d);
            }
        }

        let iterator = self.for_decl_name(&l.iterator);
        let step = self.for_decl_name(&l.step);
        let condition = self.for_decl_name(&l.condition);
        let copy = self.for_decl_name(&l.setup);

        // coerce everything to float, refuse a zero step
        self.emit(&format!("PUSHS LF@{}", iterator));
        self.emit("CALL FOR_CONVERT");
        self.emit(&format!("POPS LF@{}", iterator));
        self.emit(&format!("PUSHS LF@{}", step));
        self.emit("CALL ZERO_STEP");
        self.emit(&format!("POPS LF@{}", step));
        self.emit(&format!("PUSHS LF@{}", condition));
        self.emit("CALL FOR_CONVERT");
        self.emit(&format!("POPS LF@{}", condition));

        self.emit(&format!("LABEL %{}", head));
        self.emit(&format!("MOVE LF@{} LF@{}", copy, iterator));
        self.emit(&format!("MOVE GF@for_condition LF@{}", condition));
        self.emit(&format!("MOVE GF@for_step LF@{}", step));
        self.emit(&format!("MOVE GF@for_iter LF@{}", iterator));
        self.emit("CALL SHOULD_I_JUMP");
        self.emit("POPS GF@result");
        self.emit(&format!("JUMPIFEQ %{} GF@result bool@true", end));

        if let Some(body) = l.body.as_deref() {
            self.statement(body, end);
        }

        self.emit(&format!("ADD LF@{} LF@{} LF@{}", iterator, iterator, step));
        self.emit(&format!("JUMP %{}", head));
        self.emit(&format!("LABEL %{}", end));
    }

    // ---- expressions ----

    /// Evaluates an expression onto the operand stack.
    fn expr(&mut self, node: &Node) {
        match node {
            Node::Binop(b) => self.binop(b, node),
            Node::Unop(u) => self.unop(u, node),
            Node::FuncCall(c) => {
                self.func_call(c);
                self.emit("PUSHS TF@retval0");
            }
            other => {
                if let Some(operand) = self.operand(other) {
                    self.emit(&format!("PUSHS {}", operand));
                }
            }
        }
    }

    fn can_be_nil(&self, node: &Node) -> bool {
        if !self.usage.optimize() {
            return true;
        }
        match node {
            Node::Binop(b) => {
                !is_not_nil(&b.left, self.decls) || !is_not_nil(&b.right, self.decls)
            }
            Node::Unop(u) => !is_not_nil(&u.operand, self.decls),
            other => !is_not_nil(other, self.decls),
        }
    }

    /// A widening conversion is needed unless both operands are already
    /// number-typed.
    fn needs_conversion(&self, node: &Node) -> bool {
        match node {
            Node::Binop(b) => {
                if b.result == Some(Type::Number) {
                    let left = expr_type(&b.left, self.decls, self.funcs);
                    let right = expr_type(&b.right, self.decls, self.funcs);
                    !matches!(left, Ok(Type::Number)) || !matches!(right, Ok(Type::Number))
                } else {
                    true
                }
            }
            Node::Unop(u) => {
                if u.result == Some(Type::Number) {
                    let operand = expr_type(&u.operand, self.decls, self.funcs);
                    !matches!(operand, Ok(Type::Number))
                } else {
                    true
                }
            }
            _ => true,
        }
    }

    fn nil_check(&mut self, node: &Node) {
        if self.can_be_nil(node) {
            self.emit("CALL NIL_CHECK");
        }
    }

    fn conv_check(&mut self, node: &Node) {
        if self.needs_conversion(node) {
            self.emit("CALL CONV_CHECK");
        }
    }

    fn binop(&mut self, b: &Binop, node: &Node) {
        if matches!(b.op, BinopType::And | BinopType::Or) {
            // short-circuit: skip the right operand once the left decides
            let skip = self.fresh_label();
            let join = self.fresh_label();
            let (decides, literal) = match b.op {
                BinopType::Or => ("bool@true", "PUSHS bool@true"),
                _ => ("bool@false", "PUSHS bool@false"),
            };
            self.expr(&b.left);
            self.emit("POPS GF@result");
            self.emit("PUSHS GF@result");
            self.emit(&format!("JUMPIFEQ %{} GF@result {}", skip, decides));
            self.expr(&b.right);
            self.emit(&format!("JUMP %{}", join));
            self.emit(&format!("LABEL %{}", skip));
            self.emit(literal);
            self.emit(&format!("LABEL %{}", join));
        } else {
            self.expr(&b.left);
            self.expr(&b.right);
        }

        match b.op {
            BinopType::Add => {
                self.nil_check(node);
                self.conv_check(node);
                self.emit("ADDS");
            }
            BinopType::Sub => {
                self.nil_check(node);
                self.conv_check(node);
                self.emit("SUBS");
            }
            BinopType::Mul => {
                self.nil_check(node);
                self.conv_check(node);
                self.emit("MULS");
            }
            BinopType::Div => {
                self.nil_check(node);
                self.emit("CALL CONV_TO_FLOAT");
                self.emit("CALL float_zerodivcheck");
                self.emit("DIVS");
            }
            BinopType::IntDiv => {
                self.nil_check(node);
                self.emit("CALL CHECK_IF_INT");
                self.emit("CALL int_zerodivcheck");
                self.emit("IDIVS");
            }
            BinopType::Mod => {
                // a % b  =  a - (a // b) * b
                self.nil_check(node);
                self.emit("CALL CONV_TO_INT");
                self.emit("CALL int_zerodivcheck");
                self.emit("POPS GF@op2");
                self.emit("POPS GF@op1");
                self.emit("PUSHS GF@op1");
                self.emit("PUSHS GF@op2");
                self.emit("IDIVS");
                self.emit("PUSHS GF@op2");
                self.emit("MULS");
                self.emit("POPS GF@op2");
                self.emit("PUSHS GF@op1");
                self.emit("PUSHS GF@op2");
                self.emit("SUBS");
            }
            BinopType::Power => self.emit("CALL EXPONENTIATION"),
            BinopType::Lt => {
                self.nil_check(node);
                self.conv_check(node);
                self.emit("LTS");
            }
            BinopType::Gt => {
                self.nil_check(node);
                self.conv_check(node);
                self.emit("GTS");
            }
            BinopType::Lte => {
                self.nil_check(node);
                self.conv_check(node);
                self.emit("GTS");
                self.emit("NOTS");
            }
            BinopType::Gte => {
                self.nil_check(node);
                self.conv_check(node);
                self.emit("LTS");
                self.emit("NOTS");
            }
            BinopType::Eq => {
                self.conv_check(node);
                self.emit("EQS");
            }
            BinopType::Ne => {
                self.conv_check(node);
                self.emit("EQS");
                self.emit("NOTS");
            }
            BinopType::And => {
                self.emit("CALL EVAL_CONDITION");
                self.emit("POPS GF@op1");
                self.emit("CALL EVAL_CONDITION");
                self.emit("PUSHS GF@op1");
                self.emit("ANDS");
            }
            BinopType::Or => {
                self.emit("CALL EVAL_CONDITION");
                self.emit("POPS GF@op1");
                self.emit("CALL EVAL_CONDITION");
                self.emit("PUSHS GF@op1");
                self.emit("ORS");
            }
            BinopType::Concat => {
                self.emit("POPS GF@string1");
                self.emit("POPS GF@string0");
                self.emit("CONCAT GF@result GF@string0 GF@string1");
                self.emit("PUSHS GF@result");
            }
        }
    }

    fn unop(&mut self, u: &Unop, node: &Node) {
        match u.op {
            UnopType::Len => {
                self.expr(&u.operand);
                self.emit("POPS GF@result");
                if self.can_be_nil(node) {
                    self.emit("JUMPIFEQ NIL_FOUND GF@result nil@nil");
                }
                self.emit("STRLEN GF@result GF@result");
                self.emit("PUSHS GF@result");
            }
            UnopType::Not => {
                self.expr(&u.operand);
                self.emit("PUSHS int@2");
                self.nil_check(node);
                self.emit("POPS GF@trash");
                self.emit("NOTS");
            }
            UnopType::Neg => {
                self.expr(&u.operand);
                self.emit("PUSHS int@-1");
                self.nil_check(node);
                self.conv_check(node);
                self.emit("MULS");
            }
        }
    }
}
