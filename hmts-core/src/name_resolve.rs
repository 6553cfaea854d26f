//! Lexical scope checking.
//!
//! Only the program root and arrow functions open a scope; blocks do not.
//! A `const` initialiser is resolved before its name is declared, so it
//! never sees its own binding. Every problem is collected; the walk never
//! stops early.

use std::collections::HashMap;

use log::debug;

use crate::ast::{ArrowFunction, Expr, ExprKind, NodeId, Program, Stmt};
use crate::error::{NameError, NameErrorKind};
use crate::span::Span;

#[derive(Debug, Clone, Default)]
pub struct NameCheckResult {
    pub errors: Vec<NameError>,
    /// Use-site identifier to the node that declared it.
    pub resolutions: HashMap<NodeId, NodeId>,
}

impl NameCheckResult {
    pub fn is_ok(&self) -> bool {
        self.errors.is_empty()
    }

    pub fn declaration_of(&self, use_site: NodeId) -> Option<NodeId> {
        self.resolutions.get(&use_site).copied()
    }
}

pub fn name_check(program: &Program) -> NameCheckResult {
    let mut resolver = Resolver {
        scopes: vec![HashMap::new()],
        result: NameCheckResult::default(),
    };
    resolver.resolve_statements(&program.body);
    debug!(
        "name check: {} resolution(s), {} error(s)",
        resolver.result.resolutions.len(),
        resolver.result.errors.len()
    );
    resolver.result
}

struct Resolver<'ast> {
    scopes: Vec<HashMap<&'ast str, NodeId>>,
    result: NameCheckResult,
}

impl<'ast> Resolver<'ast> {
    fn resolve_statements(&mut self, body: &'ast [Stmt]) {
        for stmt in body {
            self.resolve_statement(stmt);
        }
    }

    fn resolve_statement(&mut self, stmt: &'ast Stmt) {
        match stmt {
            Stmt::Const(decl) => {
                self.resolve_expr(&decl.init);
                if !self.declare(&decl.name, decl.id) {
                    self.error(
                        NameErrorKind::DuplicateDeclaration(decl.name.clone()),
                        decl.id,
                        decl.span,
                    );
                }
            }
            Stmt::Return(ret) => {
                if let Some(argument) = &ret.argument {
                    self.resolve_expr(argument);
                }
            }
            Stmt::Expr(expr) => self.resolve_expr(expr),
        }
    }

    fn resolve_expr(&mut self, expr: &'ast Expr) {
        match &expr.kind {
            ExprKind::Identifier(name) => match self.lookup(name) {
                Some(declaration) => {
                    self.result.resolutions.insert(expr.id, declaration);
                }
                None => self.error(
                    NameErrorKind::UndeclaredReference(name.clone()),
                    expr.id,
                    expr.span,
                ),
            },
            ExprKind::Binary { left, right, .. } => {
                self.resolve_expr(left);
                self.resolve_expr(right);
            }
            ExprKind::Conditional {
                test,
                consequent,
                alternate,
            } => {
                self.resolve_expr(test);
                self.resolve_expr(consequent);
                self.resolve_expr(alternate);
            }
            ExprKind::Call { callee, arguments } => {
                self.resolve_expr(callee);
                for argument in arguments {
                    self.resolve_expr(argument);
                }
            }
            ExprKind::Array(elements) => {
                for element in elements {
                    self.resolve_expr(element);
                }
            }
            ExprKind::Member { object, index } => {
                self.resolve_expr(object);
                self.resolve_expr(index);
            }
            ExprKind::Arrow(func) => self.resolve_function(func),
            ExprKind::Number(_) | ExprKind::String(_) | ExprKind::Boolean(_) => {}
        }
    }

    fn resolve_function(&mut self, func: &'ast ArrowFunction) {
        self.scopes.push(HashMap::new());
        for param in &func.params {
            if !self.declare(&param.name, param.id) {
                self.error(
                    NameErrorKind::DuplicateParameter(param.name.clone()),
                    param.id,
                    param.span,
                );
            }
        }
        self.resolve_statements(&func.body.body);
        self.scopes.pop();
    }

    /// Bind `name` in the innermost scope; `false` if it is already bound
    /// there, in which case the earlier binding is kept.
    fn declare(&mut self, name: &'ast str, node: NodeId) -> bool {
        let Some(scope) = self.scopes.last_mut() else {
            return false;
        };
        if scope.contains_key(name) {
            return false;
        }
        scope.insert(name, node);
        true
    }

    fn lookup(&self, name: &str) -> Option<NodeId> {
        self.scopes
            .iter()
            .rev()
            .find_map(|scope| scope.get(name).copied())
    }

    fn error(&mut self, kind: NameErrorKind, node: NodeId, span: Span) {
        self.result.errors.push(NameError { kind, node, span });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lexer::tokenize;
    use crate::parser::parse;

    fn program(source: &str) -> Program {
        let output = parse(tokenize(source).expect("lex"));
        assert!(output.errors.is_empty(), "parse errors: {:?}", output.errors);
        output.program
    }

    fn check(source: &str) -> NameCheckResult {
        name_check(&program(source))
    }

    fn collect_identifiers(expr: &Expr, out: &mut Vec<(NodeId, String)>) {
        match &expr.kind {
            ExprKind::Identifier(name) => out.push((expr.id, name.clone())),
            ExprKind::Binary { left, right, .. } => {
                collect_identifiers(left, out);
                collect_identifiers(right, out);
            }
            ExprKind::Conditional {
                test,
                consequent,
                alternate,
            } => {
                collect_identifiers(test, out);
                collect_identifiers(consequent, out);
                collect_identifiers(alternate, out);
            }
            ExprKind::Call { callee, arguments } => {
                collect_identifiers(callee, out);
                arguments.iter().for_each(|a| collect_identifiers(a, out));
            }
            ExprKind::Array(elements) => elements.iter().for_each(|e| collect_identifiers(e, out)),
            ExprKind::Member { object, index } => {
                collect_identifiers(object, out);
                collect_identifiers(index, out);
            }
            ExprKind::Arrow(func) => {
                for stmt in &func.body.body {
                    match stmt {
                        Stmt::Const(decl) => collect_identifiers(&decl.init, out),
                        Stmt::Return(ret) => {
                            if let Some(arg) = &ret.argument {
                                collect_identifiers(arg, out);
                            }
                        }
                        Stmt::Expr(e) => collect_identifiers(e, out),
                    }
                }
            }
            ExprKind::Number(_) | ExprKind::String(_) | ExprKind::Boolean(_) => {}
        }
    }

    #[test]
    fn shadowing_a_global_is_legal() {
        let source = "const x = 1; const f = (x) => { return x; };";
        let program = program(source);
        let result = name_check(&program);
        assert!(result.is_ok(), "{:?}", result.errors);

        let Stmt::Const(global) = &program.body[0] else {
            panic!("expected const");
        };
        let Stmt::Const(f) = &program.body[1] else {
            panic!("expected const");
        };
        let ExprKind::Arrow(func) = &f.init.kind else {
            panic!("expected arrow");
        };
        let Stmt::Return(ret) = &func.body.body[0] else {
            panic!("expected return");
        };
        let use_site = ret.argument.as_ref().map(|a| a.id).expect("argument");
        assert_eq!(result.declaration_of(use_site), Some(func.params[0].id));
        assert_ne!(result.declaration_of(use_site), Some(global.id));
    }

    #[test]
    fn duplicate_in_same_scope_is_reported_once() {
        let result = check("const x = 1; const x = 2;");
        assert_eq!(result.errors.len(), 1);
        assert_eq!(
            result.errors[0].kind,
            NameErrorKind::DuplicateDeclaration("x".into())
        );
    }

    #[test]
    fn duplicate_keeps_earlier_binding() {
        let program = program("const x = 1; const x = 2; const y = x;");
        let result = name_check(&program);
        let Stmt::Const(first) = &program.body[0] else {
            panic!("expected const");
        };
        let Stmt::Const(y) = &program.body[2] else {
            panic!("expected const");
        };
        assert_eq!(result.declaration_of(y.init.id), Some(first.id));
    }

    #[test]
    fn duplicate_parameter_is_reported() {
        let result = check("const foo = (a, a) => { return a; };");
        assert_eq!(result.errors.len(), 1);
        assert!(result.errors[0].to_string().contains("Duplicate parameter"));
    }

    #[test]
    fn reports_undeclared_reference() {
        let result = check("const y = z + 1;");
        assert_eq!(
            result.errors[0].kind,
            NameErrorKind::UndeclaredReference("z".into())
        );
    }

    #[test]
    fn initialiser_does_not_see_its_own_binding() {
        let result = check("const x = x;");
        assert_eq!(result.errors.len(), 1);
        assert!(matches!(
            result.errors[0].kind,
            NameErrorKind::UndeclaredReference(_)
        ));
    }

    #[test]
    fn function_locals_do_not_escape() {
        let result = check("const f = () => { const a = 1; return a; }; const b = a;");
        assert_eq!(result.errors.len(), 1);
        assert_eq!(
            result.errors[0].kind,
            NameErrorKind::UndeclaredReference("a".into())
        );
    }

    #[test]
    fn block_body_shares_the_function_scope() {
        let result = check("const f = (p) => { const p = 1; return p; };");
        assert_eq!(result.errors.len(), 1);
        assert_eq!(
            result.errors[0].kind,
            NameErrorKind::DuplicateDeclaration("p".into())
        );
    }

    #[test]
    fn collects_every_error() {
        let result = check("const a = b; const c = d; const a = 1;");
        assert_eq!(result.errors.len(), 3);
    }

    #[test]
    fn unreported_identifiers_always_resolve() {
        let source = "const g = 1;\
            const f = (x, y) => { const z = x + g; return (w) => { return w(z, y, q); }; };\
            const r = f(1, 2)[0] ? g : h;";
        let program = program(source);
        let result = name_check(&program);

        let mut identifiers = Vec::new();
        for stmt in &program.body {
            if let Stmt::Const(decl) = stmt {
                collect_identifiers(&decl.init, &mut identifiers);
            }
        }
        let undeclared: Vec<NodeId> = result.errors.iter().map(|e| e.node).collect();
        assert_eq!(undeclared.len(), 2);
        for (id, name) in identifiers {
            if !undeclared.contains(&id) {
                assert!(
                    result.declaration_of(id).is_some(),
                    "{name} has no declaration"
                );
            }
        }
    }
}
