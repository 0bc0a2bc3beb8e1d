pub mod node;

pub use node::{
    Assignment, Binop, BinopType, Body, Declaration, For, FuncCall, FuncDecl, FuncDef, If, Node,
    NodeList, Program, Repeat, Return, Symbol, Unop, UnopType, While,
};

use std::fmt;

fn pad(f: &mut fmt::Formatter<'_>, depth: usize) -> fmt::Result {
    for _ in 0..depth {
        write!(f, "    ")?;
    }
    Ok(())
}

fn print_list(f: &mut fmt::Formatter<'_>, depth: usize, list: &[Node]) -> fmt::Result {
    for node in list {
        print_node(f, depth, node)?;
    }
    Ok(())
}

fn print_opt(f: &mut fmt::Formatter<'_>, depth: usize, node: &Option<Box<Node>>) -> fmt::Result {
    if let Some(node) = node {
        print_node(f, depth, node)?;
    }
    Ok(())
}

fn print_node(f: &mut fmt::Formatter<'_>, depth: usize, node: &Node) -> fmt::Result {
    pad(f, depth)?;
    match node {
        Node::Invalid => writeln!(f, "invalid"),
        Node::Program(p) => {
            writeln!(f, "program: require \"{}\"", p.require)?;
            print_list(f, depth + 1, &p.statements)
        }
        Node::Body(b) => {
            writeln!(f, "body:")?;
            print_list(f, depth + 1, &b.statements)
        }
        Node::FuncDecl(d) => {
            writeln!(f, "func-decl: {}", d.name)?;
            pad(f, depth + 1)?;
            writeln!(f, "argument types:")?;
            print_list(f, depth + 2, &d.argument_types)?;
            pad(f, depth + 1)?;
            writeln!(f, "return types:")?;
            print_list(f, depth + 2, &d.return_types)
        }
        Node::FuncDef(d) => {
            writeln!(f, "func-def: {}", d.name)?;
            pad(f, depth + 1)?;
            writeln!(f, "parameters:")?;
            print_list(f, depth + 2, &d.parameters)?;
            pad(f, depth + 1)?;
            writeln!(f, "return types:")?;
            print_list(f, depth + 2, &d.return_types)?;
            print_opt(f, depth + 1, &d.body)
        }
        Node::FuncCall(c) => {
            writeln!(f, "call: {}", c.name)?;
            print_list(f, depth + 1, &c.arguments)
        }
        Node::Declaration(d) => {
            match d.ty {
                Some(ty) => writeln!(f, "declare: {}: {}", d.name, ty)?,
                None => writeln!(f, "declare: {}", d.name)?,
            }
            print_opt(f, depth + 1, &d.init)
        }
        Node::Assignment(a) => {
            writeln!(f, "assignment:")?;
            pad(f, depth + 1)?;
            writeln!(f, "identifiers:")?;
            print_list(f, depth + 2, &a.identifiers)?;
            pad(f, depth + 1)?;
            writeln!(f, "expressions:")?;
            print_list(f, depth + 2, &a.expressions)
        }
        Node::If(i) => {
            writeln!(f, "if:")?;
            let mut bodies = i.bodies.iter();
            for cond in &i.conditions {
                pad(f, depth + 1)?;
                writeln!(f, "cond:")?;
                print_node(f, depth + 2, cond)?;
                if let Some(body) = bodies.next() {
                    print_node(f, depth + 1, body)?;
                }
            }
            if let Some(body) = bodies.next() {
                pad(f, depth + 1)?;
                writeln!(f, "else:")?;
                print_node(f, depth + 2, body)?;
            }
            Ok(())
        }
        Node::While(w) => {
            writeln!(f, "while:")?;
            print_opt(f, depth + 1, &w.condition)?;
            print_opt(f, depth + 1, &w.body)
        }
        Node::Repeat(r) => {
            writeln!(f, "repeat:")?;
            print_opt(f, depth + 1, &r.body)?;
            pad(f, depth + 1)?;
            writeln!(f, "until:")?;
            print_opt(f, depth + 2, &r.condition)
        }
        Node::For(l) => {
            writeln!(f, "for:")?;
            print_opt(f, depth + 1, &l.iterator)?;
            print_opt(f, depth + 1, &l.setup)?;
            print_opt(f, depth + 1, &l.condition)?;
            print_opt(f, depth + 1, &l.step)?;
            print_opt(f, depth + 1, &l.body)
        }
        Node::Break => writeln!(f, "break"),
        Node::Return(r) => {
            writeln!(f, "return:")?;
            print_list(f, depth + 1, &r.values)
        }
        Node::Binop(b) => {
            writeln!(f, "binop: {}", b.op)?;
            print_node(f, depth + 1, &b.left)?;
            print_node(f, depth + 1, &b.right)
        }
        Node::Unop(u) => {
            writeln!(f, "unop: {}", u.op)?;
            print_node(f, depth + 1, &u.operand)
        }
        Node::TypeSpec(t) => writeln!(f, "type: {}", t),
        Node::Symbol(s) => writeln!(f, "sym: {}", s.name),
        Node::Integer(i) => writeln!(f, "int: {}", i),
        Node::Number(n) => writeln!(f, "number: {}", n),
        Node::Boolean(b) => writeln!(f, "bool: {}", b),
        Node::Str(s) => writeln!(f, "str: {:?}", s),
        Node::Nil => writeln!(f, "nil"),
    }
}

impl fmt::Display for Node {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        print_node(f, 0, self)
    }
}
