//! AST optimisation.
//!
//! One walk does two jobs: constant folding with copy propagation and
//! dead-code elimination, and collecting the generator usage map — which
//! helper registers and helper subroutines the surviving code can reach, so
//! the generator only emits those. A scope stack mirrors the walk; scopes
//! belonging to loop bodies are flagged, and both copy propagation and
//! assignment dropping stay out of them because statically computed read
//! counts say nothing about back edges.

use log::debug;

use crate::ast::node::{Body, Node};
use crate::ast::{BinopType, UnopType};
use crate::error::CompileError;
use crate::semantic::{ConstValue, Declarations, Functions};
use crate::types::Type;

#[cfg(test)]
mod tests;

/// Helper registers in the generated program's global frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GfReg {
    Op1,
    Op2,
    Type1,
    Type2,
    StackResult,
    String0,
    String1,
    LoopIterator,
    Exponent,
    Base,
    ForIter,
    ForCondition,
    ForStep,
}

impl GfReg {
    pub const COUNT: usize = 13;

    pub const ALL: [GfReg; GfReg::COUNT] = [
        GfReg::Op1,
        GfReg::Op2,
        GfReg::Type1,
        GfReg::Type2,
        GfReg::StackResult,
        GfReg::String0,
        GfReg::String1,
        GfReg::LoopIterator,
        GfReg::Exponent,
        GfReg::Base,
        GfReg::ForIter,
        GfReg::ForCondition,
        GfReg::ForStep,
    ];

    pub fn name(self) -> &'static str {
        match self {
            GfReg::Op1 => "op1",
            GfReg::Op2 => "op2",
            GfReg::Type1 => "type1",
            GfReg::Type2 => "type2",
            GfReg::StackResult => "stackresult",
            GfReg::String0 => "string0",
            GfReg::String1 => "string1",
            GfReg::LoopIterator => "loop_iterator",
            GfReg::Exponent => "exponent",
            GfReg::Base => "base",
            GfReg::ForIter => "for_iter",
            GfReg::ForCondition => "for_condition",
            GfReg::ForStep => "for_step",
        }
    }
}

/// Helper subroutines embedded at the start of the emitted program.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Helper {
    NilCheck,
    ConvCheck,
    ConvToFloat,
    ConvToInt,
    CheckIfInt,
    IntZeroDiv,
    FloatZeroDiv,
    Exponentiation,
    EvalCondition,
    NilWrite,
    ForConvert,
    ZeroStep,
    ShouldIJump,
}

impl Helper {
    pub const COUNT: usize = 13;
}

/// Which helper registers and subroutines the generated code will touch.
/// With optimisation disabled every query answers true.
#[derive(Debug)]
pub struct GenUsage {
    optimize: bool,
    regs: [bool; GfReg::COUNT],
    helpers: [bool; Helper::COUNT],
}

impl GenUsage {
    fn new(optimize: bool) -> Self {
        Self {
            optimize,
            regs: [false; GfReg::COUNT],
            helpers: [false; Helper::COUNT],
        }
    }

    pub fn optimize(&self) -> bool {
        self.optimize
    }

    pub fn reg(&self, reg: GfReg) -> bool {
        !self.optimize || self.regs[reg as usize]
    }

    pub fn helper(&self, helper: Helper) -> bool {
        !self.optimize || self.helpers[helper as usize]
    }

    fn add_regs(&mut self, regs: &[GfReg]) {
        for reg in regs {
            self.regs[*reg as usize] = true;
        }
    }

    fn add_helper(&mut self, helper: Helper) {
        self.helpers[helper as usize] = true;
    }
}

fn decl_not_nil(id: crate::semantic::DeclId, decls: &Declarations) -> bool {
    let decl = decls.get(id);
    if !decl.constant || decl.dirty {
        return false;
    }
    match &decl.value {
        Some(ConstValue::Int(_))
        | Some(ConstValue::Number(_))
        | Some(ConstValue::Str(_))
        | Some(ConstValue::Bool(_)) => true,
        Some(ConstValue::Alias(alias)) => decl_not_nil(*alias, decls),
        _ => false,
    }
}

/// Returns true when the node is statically known to hold a non-nil value.
pub fn is_not_nil(node: &Node, decls: &Declarations) -> bool {
    match node {
        Node::Integer(_) | Node::Number(_) | Node::Str(_) | Node::Boolean(_) => true,
        Node::Symbol(s) => s.decl.map(|id| decl_not_nil(id, decls)).unwrap_or(false),
        _ => false,
    }
}

/// Runs the optimiser over the finished AST and produces the usage map.
pub fn optimize(
    ast: &mut Node,
    decls: &mut Declarations,
    funcs: &Functions,
    enabled: bool,
) -> Result<GenUsage, CompileError> {
    let mut usage = GenUsage::new(enabled);
    if !enabled {
        return Ok(usage);
    }
    let mut optimizer = Optimizer {
        decls,
        funcs,
        scopes: vec![false],
        usage: &mut usage,
    };
    optimizer.pass_node(ast)?;

    if let Some(write) = funcs.find("write") {
        if funcs.get(write).used {
            usage.add_regs(&[GfReg::Op1, GfReg::Type1]);
            usage.add_helper(Helper::NilWrite);
        }
    }
    Ok(usage)
}

struct Optimizer<'a> {
    decls: &'a mut Declarations,
    funcs: &'a Functions,
    /// One flag per open scope: true inside loop bodies.
    scopes: Vec<bool>,
    usage: &'a mut GenUsage,
}

impl<'a> Optimizer<'a> {
    fn in_cycle(&self) -> bool {
        *self.scopes.last().expect("scope stack never empty")
    }

    // ---- statement walk ----

    fn pass_node(&mut self, node: &mut Node) -> Result<(), CompileError> {
        match node {
            Node::Program(p) => {
                for statement in &mut p.statements {
                    self.pass_node(statement)?;
                }
                Ok(())
            }
            Node::Body(b) => {
                for statement in &mut b.statements {
                    self.pass_node(statement)?;
                }
                Ok(())
            }
            Node::FuncDef(_) => self.opt_func_def(node),
            Node::Assignment(_) => self.opt_assignment(node),
            Node::Declaration(_) => self.opt_declaration(node),
            Node::If(_) => self.opt_if(node),
            Node::While(_) => self.opt_while(node),
            Node::For(_) => self.opt_for(node),
            Node::Repeat(_) => self.opt_repeat(node),
            Node::FuncCall(c) => {
                for arg in &mut c.arguments {
                    self.check_expr(arg, false)?;
                }
                Ok(())
            }
            Node::Return(r) => {
                for value in &mut r.values {
                    self.check_expr(value, false)?;
                }
                Ok(())
            }
            _ => Ok(()),
        }
    }

    fn opt_func_def(&mut self, node: &mut Node) -> Result<(), CompileError> {
        let used = match &*node {
            Node::FuncDef(d) => {
                let id = d
                    .func
                    .ok_or_else(|| CompileError::Internal("unresolved definition".to_string()))?;
                self.funcs.get(id).used
            }
            _ => return Err(CompileError::Internal("expected a definition".to_string())),
        };
        if !used {
            debug!("dropping unused function");
            *node = Node::Invalid;
            return Ok(());
        }
        let Node::FuncDef(d) = node else { unreachable!() };
        self.scopes.push(false);
        if let Some(body) = d.body.as_deref_mut() {
            self.pass_node(body)?;
        }
        self.scopes.pop();
        Ok(())
    }

    fn opt_declaration(&mut self, node: &mut Node) -> Result<(), CompileError> {
        let (id, used, init_unread) = match &*node {
            Node::Declaration(d) => {
                let id = d
                    .decl
                    .ok_or_else(|| CompileError::Internal("unresolved declaration".to_string()))?;
                let decl = self.decls.get(id);
                (id, decl.used, self.decls.site_reads(decl.own_site) == 0)
            }
            _ => return Err(CompileError::Internal("expected a declaration".to_string())),
        };

        if !used {
            *node = Node::Invalid;
            return Ok(());
        }

        let Node::Declaration(d) = node else { unreachable!() };
        // the declared value is overwritten before any read: drop it
        if init_unread {
            d.init = None;
        }
        if let Some(init) = d.init.as_deref_mut() {
            self.check_expr(init, false)?;
        }
        if let Some(init) = d.init.as_deref() {
            if let Some(value) = self.const_value(init) {
                let decl = self.decls.get_mut(id);
                decl.constant = true;
                decl.value = Some(value);
            }
        }
        Ok(())
    }

    fn opt_assignment(&mut self, node: &mut Node) -> Result<(), CompileError> {
        let in_cycle = self.in_cycle();

        let all_unused = match &*node {
            Node::Assignment(a) => a.identifiers.iter().all(|id| self.target_unread(id)),
            _ => return Err(CompileError::Internal("expected an assignment".to_string())),
        };
        if !in_cycle && all_unused {
            debug!("dropping dead assignment");
            *node = Node::Invalid;
            return Ok(());
        }

        let Node::Assignment(a) = node else { unreachable!() };
        let mut drop_targets = !in_cycle;
        if matches!(a.expressions.last(), Some(Node::FuncCall(_))) {
            drop_targets = false;
        }

        if drop_targets {
            let pairs = a.identifiers.len().min(a.expressions.len());
            let dead: Vec<bool> = a.identifiers[..pairs]
                .iter()
                .map(|id| self.target_unread(id))
                .collect();
            if dead.iter().any(|d| *d) {
                let identifiers = std::mem::take(&mut a.identifiers);
                let expressions = std::mem::take(&mut a.expressions);
                for (i, id) in identifiers.into_iter().enumerate() {
                    if i >= pairs || !dead[i] {
                        a.identifiers.push(id);
                    }
                }
                for (i, expression) in expressions.into_iter().enumerate() {
                    if i >= pairs || !dead[i] {
                        a.expressions.push(expression);
                    }
                }
            }
        }

        for expression in &mut a.expressions {
            self.check_expr(expression, false)?;
        }
        Ok(())
    }

    /// Whether an assignment target's value is never read afterwards.
    fn target_unread(&self, target: &Node) -> bool {
        match target {
            Node::Symbol(s) => match s.write_site {
                Some(site) => self.decls.site_reads(site) == 0,
                None => false,
            },
            _ => false,
        }
    }

    fn opt_if(&mut self, node: &mut Node) -> Result<(), CompileError> {
        let mut index = 0;
        let mut always_taken = false;
        loop {
            let Node::If(i) = &mut *node else {
                return Err(CompileError::Internal("expected an if".to_string()));
            };
            if index >= i.conditions.len() || index >= i.bodies.len() {
                break;
            }
            self.check_expr(&mut i.conditions[index], true)?;
            self.usage_condition();

            let Node::If(i) = &mut *node else { unreachable!() };
            let folded = match &i.conditions[index] {
                Node::Boolean(value) => Some(*value),
                _ => None,
            };
            match folded {
                Some(false) => {
                    debug!("dropping never-taken branch");
                    i.conditions.remove(index);
                    i.bodies.remove(index);
                }
                Some(true) => {
                    // this branch always runs; everything after it is dead
                    i.conditions.truncate(index);
                    i.bodies.truncate(index + 1);
                    self.scopes.push(false);
                    let Node::If(i) = &mut *node else { unreachable!() };
                    self.pass_node(&mut i.bodies[index])?;
                    self.scopes.pop();
                    always_taken = true;
                    break;
                }
                None => {
                    self.scopes.push(false);
                    self.pass_node(&mut i.bodies[index])?;
                    self.scopes.pop();
                    index += 1;
                }
            }
        }

        let Node::If(i) = &mut *node else { unreachable!() };
        if !always_taken && i.bodies.len() > i.conditions.len() {
            let last = i.bodies.len() - 1;
            self.scopes.push(false);
            self.pass_node(&mut i.bodies[last])?;
            self.scopes.pop();
        }

        let Node::If(i) = &mut *node else { unreachable!() };
        if i.conditions.is_empty() && !i.bodies.is_empty() {
            // only an unconditional branch survived
            let statements = std::mem::take(&mut i.bodies);
            *node = Node::Body(Body { statements });
        }
        Ok(())
    }

    fn opt_while(&mut self, node: &mut Node) -> Result<(), CompileError> {
        {
            let Node::While(w) = &mut *node else {
                return Err(CompileError::Internal("expected a while".to_string()));
            };
            if let Some(condition) = w.condition.as_deref_mut() {
                self.check_expr(condition, true)?;
            }
            self.usage_condition();
        }

        let never_runs = matches!(
            node,
            Node::While(w) if matches!(w.condition.as_deref(), Some(Node::Boolean(false)))
        );
        if never_runs {
            debug!("dropping never-entered loop");
            *node = Node::Invalid;
            return Ok(());
        }

        let Node::While(w) = node else { unreachable!() };
        self.scopes.push(true);
        if let Some(body) = w.body.as_deref_mut() {
            self.pass_node(body)?;
        }
        self.scopes.pop();
        Ok(())
    }

    fn opt_for(&mut self, node: &mut Node) -> Result<(), CompileError> {
        let Node::For(l) = node else {
            return Err(CompileError::Internal("expected a for".to_string()));
        };
        // condition first, then the three value slots
        self.check_decl_init(l.condition.as_deref_mut(), true)?;
        self.check_decl_init(l.iterator.as_deref_mut(), false)?;
        self.check_decl_init(l.setup.as_deref_mut(), false)?;
        self.check_decl_init(l.step.as_deref_mut(), false)?;
        self.usage_for();

        self.scopes.push(true);
        if let Some(body) = l.body.as_deref_mut() {
            self.pass_node(body)?;
        }
        self.scopes.pop();
        Ok(())
    }

    fn check_decl_init(
        &mut self,
        slot: Option<&mut Node>,
        is_cond: bool,
    ) -> Result<(), CompileError> {
        if let Some(Node::Declaration(d)) = slot {
            if let Some(init) = d.init.as_deref_mut() {
                self.check_expr(init, is_cond)?;
            }
        }
        Ok(())
    }

    fn opt_repeat(&mut self, node: &mut Node) -> Result<(), CompileError> {
        let Node::Repeat(r) = node else {
            return Err(CompileError::Internal("expected a repeat".to_string()));
        };
        if let Some(condition) = r.condition.as_deref_mut() {
            self.check_expr(condition, true)?;
        }
        self.usage_condition();

        self.scopes.push(true);
        if let Some(body) = r.body.as_deref_mut() {
            self.pass_node(body)?;
        }
        self.scopes.pop();
        Ok(())
    }

    // ---- expressions ----

    fn check_expr(&mut self, node: &mut Node, is_cond: bool) -> Result<Type, CompileError> {
        match node {
            Node::Binop(_) => self.opt_binop(node, is_cond),
            Node::Unop(_) => self.opt_unop(node, is_cond),
            Node::Symbol(_) => self.opt_symbol(node),
            Node::FuncCall(c) => {
                for arg in &mut c.arguments {
                    self.check_expr(arg, is_cond)?;
                }
                let id = c
                    .func
                    .ok_or_else(|| CompileError::Internal("unresolved call".to_string()))?;
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

    fn opt_symbol(&mut self, node: &mut Node) -> Result<Type, CompileError> {
        let Node::Symbol(s) = node else {
            return Err(CompileError::Internal("expected a symbol".to_string()));
        };
        let id = s
            .decl
            .ok_or_else(|| CompileError::Internal("unresolved symbol".to_string()))?;
        let ty = self.decls.get(id).ty;

        // no propagation inside loop bodies
        if self.in_cycle() {
            return Ok(ty);
        }
        let decl = self.decls.get(id);
        if decl.constant && !decl.dirty {
            match &decl.value {
                Some(ConstValue::Int(v)) => *node = Node::Integer(*v),
                Some(ConstValue::Number(v)) => *node = Node::Number(*v),
                Some(ConstValue::Str(v)) => *node = Node::Str(v.clone()),
                Some(ConstValue::Bool(v)) => *node = Node::Boolean(*v),
                Some(ConstValue::Nil) => *node = Node::Nil,
                _ => {}
            }
        }
        Ok(ty)
    }

    fn opt_binop(&mut self, node: &mut Node, is_cond: bool) -> Result<Type, CompileError> {
        let Node::Binop(b) = node else {
            return Err(CompileError::Internal("expected a binary operator".to_string()));
        };
        let left_t = self.check_expr(&mut b.left, is_cond)?;
        let right_t = self.check_expr(&mut b.right, is_cond)?;
        let result_t = b
            .result
            .ok_or_else(|| CompileError::Internal("untyped binary operator".to_string()))?;
        let op = b.op;

        let folded = if self.is_constant(&b.left) && self.is_constant(&b.right) {
            fold_binop(op, &b.left, &b.right, left_t, right_t, result_t)?
        } else {
            None
        };

        match folded {
            Some(replacement) => *node = replacement,
            None => self.usage_binop(op),
        }
        Ok(result_t)
    }

    fn opt_unop(&mut self, node: &mut Node, is_cond: bool) -> Result<Type, CompileError> {
        let Node::Unop(u) = node else {
            return Err(CompileError::Internal("expected a unary operator".to_string()));
        };
        let operand_t = self.check_expr(&mut u.operand, is_cond)?;
        let result_t = u
            .result
            .ok_or_else(|| CompileError::Internal("untyped unary operator".to_string()))?;
        let op = u.op;

        let folded = if self.is_constant(&u.operand) {
            fold_unop(op, &u.operand, operand_t)
        } else {
            None
        };

        match folded {
            Some(replacement) => *node = replacement,
            None => self.usage_unop(op),
        }
        Ok(result_t)
    }

    fn is_constant(&self, node: &Node) -> bool {
        match node {
            Node::Integer(_) | Node::Number(_) | Node::Str(_) | Node::Boolean(_) | Node::Nil => {
                true
            }
            Node::Symbol(s) => match s.decl {
                Some(id) => {
                    let decl = self.decls.get(id);
                    decl.constant && !decl.dirty
                }
                None => false,
            },
            _ => false,
        }
    }

    /// Constant value of a folded initialiser, when there is one.
    fn const_value(&self, node: &Node) -> Option<ConstValue> {
        match node {
            Node::Integer(v) => Some(ConstValue::Int(*v)),
            Node::Number(v) => Some(ConstValue::Number(*v)),
            Node::Str(v) => Some(ConstValue::Str(v.clone())),
            Node::Boolean(v) => Some(ConstValue::Bool(*v)),
            Node::Nil => Some(ConstValue::Nil),
            Node::Symbol(s) => {
                let id = s.decl?;
                let decl = self.decls.get(id);
                (decl.constant && !decl.dirty).then_some(ConstValue::Alias(id))
            }
            _ => None,
        }
    }

    // ---- usage map ----

    fn usage_nil_check(&mut self) {
        self.usage.add_regs(&[GfReg::Op1, GfReg::Op2]);
        self.usage.add_helper(Helper::NilCheck);
    }

    fn usage_conv_check(&mut self) {
        self.usage.add_regs(&[GfReg::Op1, GfReg::Op2, GfReg::Type1, GfReg::Type2]);
        self.usage.add_helper(Helper::ConvCheck);
    }

    fn usage_condition(&mut self) {
        self.usage.add_regs(&[GfReg::Type1]);
        self.usage.add_helper(Helper::EvalCondition);
    }

    fn usage_for(&mut self) {
        self.usage.add_regs(&[
            GfReg::Op1,
            GfReg::Type1,
            GfReg::ForIter,
            GfReg::ForCondition,
            GfReg::ForStep,
        ]);
        self.usage.add_helper(Helper::ForConvert);
        self.usage.add_helper(Helper::ZeroStep);
        self.usage.add_helper(Helper::ShouldIJump);
    }

    fn usage_binop(&mut self, op: BinopType) {
        match op {
            BinopType::Add
            | BinopType::Sub
            | BinopType::Mul
            | BinopType::Lt
            | BinopType::Gt
            | BinopType::Lte
            | BinopType::Gte => {
                self.usage_nil_check();
                self.usage_conv_check();
            }
            BinopType::Div => {
                self.usage_nil_check();
                self.usage.add_regs(&[GfReg::Op1, GfReg::Op2, GfReg::Type1, GfReg::Type2]);
                self.usage.add_helper(Helper::ConvToFloat);
                self.usage.add_helper(Helper::FloatZeroDiv);
            }
            BinopType::IntDiv => {
                self.usage_nil_check();
                self.usage.add_regs(&[GfReg::Op1, GfReg::Op2, GfReg::Type1, GfReg::Type2]);
                self.usage.add_helper(Helper::CheckIfInt);
                self.usage.add_helper(Helper::IntZeroDiv);
            }
            BinopType::Mod => {
                self.usage_nil_check();
                self.usage.add_regs(&[GfReg::Op1, GfReg::Op2, GfReg::Type1, GfReg::Type2]);
                self.usage.add_helper(Helper::ConvToInt);
                self.usage.add_helper(Helper::IntZeroDiv);
            }
            BinopType::Power => {
                self.usage.add_regs(&[
                    GfReg::Exponent,
                    GfReg::Base,
                    GfReg::Type1,
                    GfReg::Type2,
                    GfReg::StackResult,
                    GfReg::LoopIterator,
                ]);
                self.usage.add_helper(Helper::Exponentiation);
                self.usage_conv_check();
            }
            BinopType::Eq | BinopType::Ne => self.usage_conv_check(),
            BinopType::And | BinopType::Or => {
                self.usage.add_regs(&[GfReg::Op1]);
                self.usage_condition();
            }
            BinopType::Concat => {
                self.usage.add_regs(&[GfReg::String0, GfReg::String1]);
            }
        }
    }

    fn usage_unop(&mut self, op: UnopType) {
        match op {
            UnopType::Len | UnopType::Not => self.usage_nil_check(),
            UnopType::Neg => {
                self.usage_nil_check();
                self.usage_conv_check();
            }
        }
    }
}

// ---- constant folding ----

fn lit_i64(node: &Node) -> Option<i64> {
    match node {
        Node::Integer(v) => Some(*v),
        _ => None,
    }
}

fn lit_f64(node: &Node) -> Option<f64> {
    match node {
        Node::Integer(v) => Some(*v as f64),
        Node::Number(v) => Some(*v),
        _ => None,
    }
}

fn lit_str(node: &Node) -> Option<&str> {
    match node {
        Node::Str(v) => Some(v),
        _ => None,
    }
}

fn lit_bool(node: &Node) -> Option<bool> {
    match node {
        Node::Boolean(v) => Some(*v),
        _ => None,
    }
}

fn zero_division() -> CompileError {
    CompileError::ZeroDiv {
        row: 0,
        column: 0,
        message: "division by 0".to_string(),
    }
}

/// Evaluates a binary operator over constant operands with the exact
/// semantics of the runtime helpers. `Ok(None)` means the combination is
/// not foldable and the node stays as it is.
fn fold_binop(
    op: BinopType,
    left: &Node,
    right: &Node,
    left_t: Type,
    right_t: Type,
    result_t: Type,
) -> Result<Option<Node>, CompileError> {
    match result_t {
        Type::Integer => {
            let (Some(lhs), Some(rhs)) = (lit_i64(left), lit_i64(right)) else {
                return Ok(None);
            };
            let value = match op {
                BinopType::Add => lhs.wrapping_add(rhs),
                BinopType::Sub => lhs.wrapping_sub(rhs),
                BinopType::Mul => lhs.wrapping_mul(rhs),
                BinopType::IntDiv => {
                    if rhs == 0 {
                        return Err(zero_division());
                    }
                    lhs.wrapping_div(rhs)
                }
                BinopType::Mod => {
                    if rhs == 0 {
                        return Err(zero_division());
                    }
                    lhs.wrapping_rem(rhs)
                }
                BinopType::Power => {
                    if lhs == 0 && rhs == 0 {
                        return Err(zero_division());
                    }
                    (lhs as f64).powf(rhs as f64) as i64
                }
                _ => return Ok(None),
            };
            Ok(Some(Node::Integer(value)))
        }
        Type::Number => {
            let (Some(lhs), Some(rhs)) = (lit_f64(left), lit_f64(right)) else {
                return Ok(None);
            };
            let value = match op {
                BinopType::Add => lhs + rhs,
                BinopType::Sub => lhs - rhs,
                BinopType::Mul => lhs * rhs,
                BinopType::Div => {
                    if rhs == 0.0 {
                        return Err(zero_division());
                    }
                    lhs / rhs
                }
                BinopType::Mod => {
                    if rhs == 0.0 {
                        return Err(zero_division());
                    }
                    lhs % rhs
                }
                BinopType::Power => {
                    if lhs == 0.0 && rhs == 0.0 {
                        return Err(zero_division());
                    }
                    lhs.powf(rhs)
                }
                _ => return Ok(None),
            };
            Ok(Some(Node::Number(value)))
        }
        Type::String => {
            if op != BinopType::Concat {
                return Ok(None);
            }
            let (Some(lhs), Some(rhs)) = (lit_str(left), lit_str(right)) else {
                return Ok(None);
            };
            Ok(Some(Node::Str(format!("{}{}", lhs, rhs))))
        }
        Type::Boolean => fold_comparison(op, left, right, left_t, right_t),
        Type::Nil => Ok(None),
    }
}

fn fold_comparison(
    op: BinopType,
    left: &Node,
    right: &Node,
    left_t: Type,
    right_t: Type,
) -> Result<Option<Node>, CompileError> {
    let value = if left_t == Type::Boolean && right_t == Type::Boolean {
        let (Some(lhs), Some(rhs)) = (lit_bool(left), lit_bool(right)) else {
            return Ok(None);
        };
        match op {
            BinopType::And => lhs && rhs,
            BinopType::Or => lhs || rhs,
            BinopType::Eq => lhs == rhs,
            BinopType::Ne => lhs != rhs,
            _ => return Ok(None),
        }
    } else if left_t == Type::Nil && right_t == Type::Nil {
        match op {
            BinopType::Eq => true,
            BinopType::Ne => false,
            _ => return Ok(None),
        }
    } else if left_t == Type::Nil || right_t == Type::Nil {
        // nil compared against a non-nil constant
        match op {
            BinopType::Eq => false,
            BinopType::Ne => true,
            _ => return Ok(None),
        }
    } else if left_t.is_numeric() && right_t.is_numeric() {
        let (Some(lhs), Some(rhs)) = (lit_f64(left), lit_f64(right)) else {
            return Ok(None);
        };
        match op {
            BinopType::Eq => lhs == rhs,
            BinopType::Ne => lhs != rhs,
            BinopType::Lt => lhs < rhs,
            BinopType::Lte => lhs <= rhs,
            BinopType::Gt => lhs > rhs,
            BinopType::Gte => lhs >= rhs,
            _ => return Ok(None),
        }
    } else if left_t == Type::String && right_t == Type::String {
        let (Some(lhs), Some(rhs)) = (lit_str(left), lit_str(right)) else {
            return Ok(None);
        };
        // code points compare like the source bytes
        let ordering = lhs.chars().cmp(rhs.chars());
        match op {
            BinopType::Eq => ordering.is_eq(),
            BinopType::Ne => !ordering.is_eq(),
            BinopType::Lt => ordering.is_lt(),
            BinopType::Lte => ordering.is_le(),
            BinopType::Gt => ordering.is_gt(),
            BinopType::Gte => ordering.is_ge(),
            _ => return Ok(None),
        }
    } else {
        return Ok(None);
    };
    Ok(Some(Node::Boolean(value)))
}

fn fold_unop(op: UnopType, operand: &Node, operand_t: Type) -> Option<Node> {
    match op {
        UnopType::Len => {
            let value = lit_str(operand)?;
            Some(Node::Integer(value.chars().count() as i64))
        }
        UnopType::Neg => match operand_t {
            Type::Integer => Some(Node::Integer(lit_i64(operand)?.wrapping_neg())),
            Type::Number => Some(Node::Number(-lit_f64(operand)?)),
            _ => None,
        },
        UnopType::Not => Some(Node::Boolean(!lit_bool(operand)?)),
    }
}
