//! Source pretty-printer.
//!
//! Prints a [`Program`] back as canonical source: two-space indentation,
//! one statement per line, double-quoted strings and only the
//! parentheses the grammar needs. Printing the reparsed output again
//! gives the same text.

use std::fmt::Write;

use crate::ast::{
    ArrowFunction, BinaryOp, BlockStatement, Expr, ExprKind, Program, Stmt, TypeExpr,
};

pub fn format(program: &Program) -> String {
    let mut printer = Printer::default();
    for stmt in &program.body {
        printer.statement(stmt);
    }
    printer.out
}

/// Binding strength, loosest first.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
enum Prec {
    Conditional,
    Additive,
    Multiplicative,
    Postfix,
}

fn precedence(expr: &Expr) -> Prec {
    match &expr.kind {
        ExprKind::Conditional { .. } => Prec::Conditional,
        ExprKind::Binary {
            op: BinaryOp::Add, ..
        } => Prec::Additive,
        ExprKind::Binary {
            op: BinaryOp::Mul, ..
        } => Prec::Multiplicative,
        // An arrow function only appears bare where a full expression is
        // allowed; anywhere tighter it needs parentheses.
        ExprKind::Arrow(_) => Prec::Conditional,
        _ => Prec::Postfix,
    }
}

#[derive(Default)]
struct Printer {
    out: String,
    indent: usize,
}

impl Printer {
    fn line_start(&mut self) {
        for _ in 0..self.indent {
            self.out.push_str("  ");
        }
    }

    fn statement(&mut self, stmt: &Stmt) {
        self.line_start();
        match stmt {
            Stmt::Const(decl) => {
                self.out.push_str("const ");
                self.out.push_str(&decl.name);
                if let Some(ty) = &decl.type_annotation {
                    self.out.push_str(": ");
                    self.type_expr(ty);
                }
                self.out.push_str(" = ");
                self.expr(&decl.init);
            }
            Stmt::Return(ret) => {
                self.out.push_str("return");
                if let Some(argument) = &ret.argument {
                    self.out.push(' ');
                    self.expr(argument);
                }
            }
            Stmt::Expr(expr) => self.expr(expr),
        }
        self.out.push_str(";\n");
    }

    /// Print `expr`, parenthesised if it binds looser than `min`.
    fn operand(&mut self, expr: &Expr, min: Prec) {
        if precedence(expr) < min {
            self.out.push('(');
            self.expr(expr);
            self.out.push(')');
        } else {
            self.expr(expr);
        }
    }

    fn expr(&mut self, expr: &Expr) {
        match &expr.kind {
            ExprKind::Identifier(name) => self.out.push_str(name),
            ExprKind::Number(value) => {
                let _ = write!(self.out, "{value}");
            }
            ExprKind::String(value) => self.string(value),
            ExprKind::Boolean(value) => self.out.push_str(if *value { "true" } else { "false" }),
            ExprKind::Binary { op, left, right } => {
                let (same, tighter) = match op {
                    BinaryOp::Add => (Prec::Additive, Prec::Multiplicative),
                    BinaryOp::Mul => (Prec::Multiplicative, Prec::Postfix),
                };
                self.operand(left, same);
                self.out.push(' ');
                self.out.push_str(op.symbol());
                self.out.push(' ');
                self.operand(right, tighter);
            }
            ExprKind::Conditional {
                test,
                consequent,
                alternate,
            } => {
                self.operand(test, Prec::Additive);
                self.out.push_str(" ? ");
                self.expr(consequent);
                self.out.push_str(" : ");
                self.expr(alternate);
            }
            ExprKind::Call { callee, arguments } => {
                self.operand(callee, Prec::Postfix);
                self.out.push('(');
                self.comma_separated(arguments);
                self.out.push(')');
            }
            ExprKind::Member { object, index } => {
                self.operand(object, Prec::Postfix);
                self.out.push('[');
                self.expr(index);
                self.out.push(']');
            }
            ExprKind::Array(elements) => {
                self.out.push('[');
                self.comma_separated(elements);
                self.out.push(']');
            }
            ExprKind::Arrow(func) => self.arrow(func),
        }
    }

    fn comma_separated(&mut self, exprs: &[Expr]) {
        for (i, expr) in exprs.iter().enumerate() {
            if i > 0 {
                self.out.push_str(", ");
            }
            self.expr(expr);
        }
    }

    fn arrow(&mut self, func: &ArrowFunction) {
        self.out.push('(');
        for (i, param) in func.params.iter().enumerate() {
            if i > 0 {
                self.out.push_str(", ");
            }
            self.out.push_str(&param.name);
            if let Some(ty) = &param.type_annotation {
                self.out.push_str(": ");
                self.type_expr(ty);
            }
        }
        self.out.push(')');
        if let Some(ty) = &func.return_type {
            self.out.push_str(": ");
            self.type_expr(ty);
        }
        self.out.push_str(" => ");
        self.block(&func.body);
    }

    fn block(&mut self, block: &BlockStatement) {
        if block.body.is_empty() {
            self.out.push_str("{}");
            return;
        }
        self.out.push_str("{\n");
        self.indent += 1;
        for stmt in &block.body {
            self.statement(stmt);
        }
        self.indent -= 1;
        self.line_start();
        self.out.push('}');
    }

    fn string(&mut self, value: &str) {
        self.out.push('"');
        for c in value.chars() {
            match c {
                '"' => self.out.push_str("\\\""),
                '\\' => self.out.push_str("\\\\"),
                '\n' => self.out.push_str("\\n"),
                '\t' => self.out.push_str("\\t"),
                '\r' => self.out.push_str("\\r"),
                c => self.out.push(c),
            }
        }
        self.out.push('"');
    }

    fn type_expr(&mut self, ty: &TypeExpr) {
        match ty {
            TypeExpr::Scalar { keyword, .. } => self.out.push_str(keyword.keyword()),
            TypeExpr::ArrayOf { element, .. } => {
                self.out.push_str("Array<");
                self.type_expr(element);
                self.out.push('>');
            }
            TypeExpr::FunctionOf { params, result, .. } => {
                self.out.push('(');
                for (i, (name, ty)) in params.iter().enumerate() {
                    if i > 0 {
                        self.out.push_str(", ");
                    }
                    self.out.push_str(name);
                    self.out.push_str(": ");
                    self.type_expr(ty);
                }
                self.out.push_str(") => ");
                self.type_expr(result);
            }
        }
    }
}
