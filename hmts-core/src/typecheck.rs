//! Hindley–Milner type inference.
//!
//! A single [`InferenceContext`] is threaded through the walk. It owns the
//! type store, the environment frames and the error list. Failed
//! unifications are reported and the walk carries on, so one run reports
//! every independent problem in the program.
//!
//! `const` bindings are generalised over the variables that no enclosing
//! parameter mentions; parameters stay monomorphic inside their own body.

use std::collections::HashMap;

use log::debug;

use crate::ast::{ArrowFunction, BinaryOp, Expr, ExprKind, NodeId, Program, Stmt, TypeExpr};
use crate::error::{TypeError, TypeErrorKind};
use crate::span::Span;
use crate::types::{Scalar, Shape, Slot, TypeId, TypeStore, UnifyError};

/// Output of [`type_check`]: the errors plus the side table giving each
/// expression, parameter, `const` and `return` its type.
#[derive(Debug, Clone)]
pub struct TypeCheckResult {
    pub errors: Vec<TypeError>,
    pub store: TypeStore,
    pub node_types: HashMap<NodeId, TypeId>,
}

impl TypeCheckResult {
    pub fn is_ok(&self) -> bool {
        self.errors.is_empty()
    }

    pub fn type_of(&self, node: NodeId) -> Option<TypeId> {
        self.node_types.get(&node).copied()
    }

    /// Shape at the root of the node's type; `None` when unknown or still
    /// an unbound variable.
    pub fn shape_of(&self, node: NodeId) -> Option<Shape> {
        let root = self.store.find(self.type_of(node)?);
        match self.store.slot(root) {
            Slot::Known(shape) => Some(shape),
            Slot::Unbound | Slot::Link(_) => None,
        }
    }

    pub fn display_type(&self, node: NodeId) -> Option<String> {
        self.type_of(node).map(|ty| self.store.display(ty))
    }
}

pub fn type_check(program: &Program) -> TypeCheckResult {
    let mut cx = InferenceContext::new();
    for stmt in &program.body {
        cx.infer_statement(stmt);
    }
    debug!(
        "type check: {} type slot(s), {} typed node(s), {} error(s)",
        cx.store.len(),
        cx.node_types.len(),
        cx.errors.len()
    );
    TypeCheckResult {
        errors: cx.errors,
        store: cx.store,
        node_types: cx.node_types,
    }
}

/// A binding's type together with the variables to rename on each use.
#[derive(Debug, Clone)]
struct Scheme {
    ty: TypeId,
    quantified: Vec<TypeId>,
    /// `false` for the stand-in bound to a name nothing declares.
    declared: bool,
}

impl Scheme {
    fn mono(ty: TypeId) -> Self {
        Scheme {
            ty,
            quantified: Vec::new(),
            declared: true,
        }
    }

    fn placeholder(ty: TypeId) -> Self {
        Scheme {
            declared: false,
            ..Scheme::mono(ty)
        }
    }
}

struct InferenceContext {
    store: TypeStore,
    frames: Vec<HashMap<String, Scheme>>,
    /// Types of the monomorphic bindings currently in scope.
    non_generic: Vec<TypeId>,
    errors: Vec<TypeError>,
    node_types: HashMap<NodeId, TypeId>,
}

impl InferenceContext {
    fn new() -> Self {
        InferenceContext {
            store: TypeStore::new(),
            frames: vec![HashMap::new()],
            non_generic: Vec::new(),
            errors: Vec::new(),
            node_types: HashMap::new(),
        }
    }

    // ── Statements ───────────────────────────────────────────────────

    /// Infer one statement; a `return` yields the type it returns.
    fn infer_statement(&mut self, stmt: &Stmt) -> Option<TypeId> {
        match stmt {
            Stmt::Const(decl) => {
                let ty = self.infer_expr(&decl.init);
                if let Some(annotation) = &decl.type_annotation {
                    let expected = self.lower_annotation(annotation);
                    self.unify_or_report(ty, expected, decl.id, decl.span, type_mismatch);
                }
                self.record(decl.id, ty);
                let scheme = self.generalize(ty);
                self.declare(&decl.name, scheme);
                None
            }
            Stmt::Return(ret) => {
                let ty = match &ret.argument {
                    Some(argument) => self.infer_expr(argument),
                    None => self.store.scalar(Scalar::Void),
                };
                self.record(ret.id, ty);
                Some(ty)
            }
            Stmt::Expr(expr) => {
                self.infer_expr(expr);
                None
            }
        }
    }

    // ── Expressions ──────────────────────────────────────────────────

    fn infer_expr(&mut self, expr: &Expr) -> TypeId {
        let ty = match &expr.kind {
            ExprKind::Number(_) => self.store.scalar(Scalar::Number),
            ExprKind::String(_) => self.store.scalar(Scalar::String),
            ExprKind::Boolean(_) => self.store.scalar(Scalar::Boolean),
            ExprKind::Identifier(name) => self.infer_identifier(name),
            ExprKind::Array(elements) => self.infer_array(elements),
            ExprKind::Member { object, index } => self.infer_member(object, index),
            ExprKind::Binary { op, left, right } => self.infer_binary(expr, *op, left, right),
            ExprKind::Conditional {
                test,
                consequent,
                alternate,
            } => {
                let test_ty = self.infer_expr(test);
                let consequent_ty = self.infer_expr(consequent);
                let alternate_ty = self.infer_expr(alternate);
                let boolean = self.store.scalar(Scalar::Boolean);
                self.unify_or_report(test_ty, boolean, test.id, test.span, |found, _| {
                    TypeErrorKind::ConditionNotBoolean { found }
                });
                self.unify_or_report(
                    consequent_ty,
                    alternate_ty,
                    expr.id,
                    expr.span,
                    |left, right| TypeErrorKind::BranchMismatch { left, right },
                );
                consequent_ty
            }
            ExprKind::Call { callee, arguments } => self.infer_call(expr, callee, arguments),
            ExprKind::Arrow(func) => self.infer_function(func),
        };
        self.record(expr.id, ty);
        ty
    }

    fn infer_identifier(&mut self, name: &str) -> TypeId {
        match self.lookup(name) {
            Some(scheme) => self.instantiate(&scheme),
            None => {
                // Unbound names were already reported by the name check;
                // a fresh variable keeps inference going.
                let ty = self.store.fresh();
                self.non_generic.push(ty);
                self.bind(name, Scheme::placeholder(ty));
                ty
            }
        }
    }

    fn infer_array(&mut self, elements: &[Expr]) -> TypeId {
        let Some((first, rest)) = elements.split_first() else {
            let element = self.store.fresh();
            return self.store.array(element);
        };
        let first_ty = self.infer_expr(first);
        for element in rest {
            let ty = self.infer_expr(element);
            self.unify_or_report(first_ty, ty, element.id, element.span, |first, found| {
                TypeErrorKind::ArrayElementMismatch { first, found }
            });
        }
        self.store.array(first_ty)
    }

    fn infer_member(&mut self, object: &Expr, index: &Expr) -> TypeId {
        let object_ty = self.infer_expr(object);
        let index_ty = self.infer_expr(index);
        let number = self.store.scalar(Scalar::Number);
        self.unify_or_report(index_ty, number, index.id, index.span, |found, _| {
            TypeErrorKind::ArrayIndexNotNumber { found }
        });
        let element = self.store.fresh();
        let array = self.store.array(element);
        self.unify_or_report(object_ty, array, object.id, object.span, type_mismatch);
        element
    }

    fn infer_binary(&mut self, expr: &Expr, op: BinaryOp, left: &Expr, right: &Expr) -> TypeId {
        let left_ty = self.infer_expr(left);
        let right_ty = self.infer_expr(right);
        match op {
            BinaryOp::Add => {
                let unified =
                    self.unify_or_report(left_ty, right_ty, expr.id, expr.span, type_mismatch);
                if unified {
                    match self.store.shape(left_ty) {
                        None | Some(Shape::Scalar(Scalar::Number | Scalar::String)) => {}
                        Some(_) => {
                            let found = self.store.display(left_ty);
                            self.error(
                                TypeErrorKind::AddOperandNotNumberOrString { found },
                                expr.id,
                                expr.span,
                            );
                        }
                    }
                }
                left_ty
            }
            BinaryOp::Mul => {
                let number = self.store.scalar(Scalar::Number);
                for (operand, ty) in [(left, left_ty), (right, right_ty)] {
                    self.unify_or_report(ty, number, operand.id, operand.span, |found, _| {
                        TypeErrorKind::MulOperandNotNumber { found }
                    });
                }
                number
            }
        }
    }

    /// Apply the callee to each argument in turn through its curried
    /// arrows. A call without arguments applies it to `Void`.
    fn infer_call(&mut self, expr: &Expr, callee: &Expr, arguments: &[Expr]) -> TypeId {
        let callee_ty = self.infer_expr(callee);
        let mut applied: Vec<(TypeId, NodeId, Span)> = Vec::with_capacity(arguments.len().max(1));
        for argument in arguments {
            let ty = self.infer_expr(argument);
            applied.push((ty, argument.id, argument.span));
        }
        if applied.is_empty() {
            let void = self.store.scalar(Scalar::Void);
            applied.push((void, expr.id, expr.span));
        }

        let mut current = callee_ty;
        for (position, (argument_ty, node, span)) in applied.into_iter().enumerate() {
            let (param, result) = match self.store.shape(current) {
                Some(Shape::Arrow(param, result)) => (param, result),
                None => {
                    let param = self.store.fresh();
                    let result = self.store.fresh();
                    let arrow = self.store.arrow(param, result);
                    self.unify_or_report(current, arrow, callee.id, callee.span, type_mismatch);
                    (param, result)
                }
                Some(_) => {
                    let kind = if position == 0 {
                        TypeErrorKind::CalledValueNotFunction {
                            found: self.store.display(current),
                        }
                    } else {
                        TypeErrorKind::TooManyArguments {
                            accepted: position,
                            given: arguments.len(),
                        }
                    };
                    self.error(kind, expr.id, expr.span);
                    return self.store.fresh();
                }
            };
            self.unify_or_report(param, argument_ty, node, span, type_mismatch);
            current = result;
        }
        current
    }

    fn infer_function(&mut self, func: &ArrowFunction) -> TypeId {
        let body = &func.body.body;
        let last = body.len().saturating_sub(1);
        for (position, stmt) in body.iter().enumerate() {
            if let Stmt::Return(ret) = stmt {
                if position != last {
                    self.error(TypeErrorKind::MisplacedReturn, ret.id, ret.span);
                }
            }
        }

        self.frames.push(HashMap::new());
        let outer_non_generic = self.non_generic.len();

        let mut params = Vec::with_capacity(func.params.len());
        for param in &func.params {
            let ty = self.store.fresh();
            if let Some(annotation) = &param.type_annotation {
                let expected = self.lower_annotation(annotation);
                self.unify_or_report(ty, expected, param.id, param.span, type_mismatch);
            }
            self.record(param.id, ty);
            self.non_generic.push(ty);
            self.declare(&param.name, Scheme::mono(ty));
            params.push(ty);
        }

        let mut returned = None;
        for (position, stmt) in body.iter().enumerate() {
            let ty = self.infer_statement(stmt);
            if position == last {
                returned = ty;
            }
        }
        let result = match returned {
            Some(ty) => ty,
            None => self.store.scalar(Scalar::Void),
        };
        if let Some(annotation) = &func.return_type {
            let expected = self.lower_annotation(annotation);
            self.unify_or_report(
                result,
                expected,
                func.body.id,
                annotation.span(),
                type_mismatch,
            );
        }

        self.non_generic.truncate(outer_non_generic);
        self.frames.pop();
        self.store.curried(&params, result)
    }

    // ── Environment ──────────────────────────────────────────────────

    fn bind(&mut self, name: &str, scheme: Scheme) {
        if let Some(frame) = self.frames.last_mut() {
            frame.insert(name.to_string(), scheme);
        }
    }

    /// Bind a declared name. A second declaration in the same frame is a
    /// name error and leaves the first binding in place.
    fn declare(&mut self, name: &str, scheme: Scheme) {
        let redeclared = self
            .frames
            .last()
            .and_then(|frame| frame.get(name))
            .is_some_and(|existing| existing.declared);
        if !redeclared {
            self.bind(name, scheme);
        }
    }

    fn lookup(&self, name: &str) -> Option<Scheme> {
        self.frames
            .iter()
            .rev()
            .find_map(|frame| frame.get(name).cloned())
    }

    /// Quantify over the free variables of `ty` that no monomorphic
    /// binding in scope refers to.
    fn generalize(&mut self, ty: TypeId) -> Scheme {
        let mut quantified = Vec::new();
        self.store.free_vars(ty, &mut quantified);
        if quantified.is_empty() {
            return Scheme::mono(ty);
        }
        let mut pinned = Vec::new();
        for index in 0..self.non_generic.len() {
            let bound = self.non_generic[index];
            self.store.free_vars(bound, &mut pinned);
        }
        quantified.retain(|var| !pinned.contains(var));
        Scheme {
            ty,
            quantified,
            declared: true,
        }
    }

    fn instantiate(&mut self, scheme: &Scheme) -> TypeId {
        if scheme.quantified.is_empty() {
            return scheme.ty;
        }
        let mut mapping = HashMap::with_capacity(scheme.quantified.len());
        for &var in &scheme.quantified {
            let root = self.store.resolve(var);
            let fresh = self.store.fresh();
            mapping.insert(root, fresh);
        }
        self.store.substitute(scheme.ty, &mapping)
    }

    fn lower_annotation(&mut self, annotation: &TypeExpr) -> TypeId {
        match annotation {
            TypeExpr::Scalar { keyword, .. } => self.store.scalar(keyword.scalar()),
            TypeExpr::ArrayOf { element, .. } => {
                let element = self.lower_annotation(element);
                self.store.array(element)
            }
            TypeExpr::FunctionOf { params, result, .. } => {
                let params: Vec<TypeId> = params
                    .iter()
                    .map(|(_, ty)| self.lower_annotation(ty))
                    .collect();
                let result = self.lower_annotation(result);
                self.store.curried(&params, result)
            }
        }
    }

    // ── Bookkeeping ──────────────────────────────────────────────────

    fn record(&mut self, node: NodeId, ty: TypeId) {
        let previous = self.node_types.insert(node, ty);
        debug_assert!(previous.is_none(), "node {node} typed twice");
    }

    fn error(&mut self, kind: TypeErrorKind, node: NodeId, span: Span) {
        self.errors.push(TypeError { kind, node, span });
    }

    /// Unify and report a failure against `node`. A shape mismatch is
    /// described by `on_mismatch`, called with the rendered pair of
    /// conflicting types; a cycle is always a `RecursiveType`.
    fn unify_or_report(
        &mut self,
        a: TypeId,
        b: TypeId,
        node: NodeId,
        span: Span,
        on_mismatch: impl FnOnce(String, String) -> TypeErrorKind,
    ) -> bool {
        match self.store.unify(a, b) {
            Ok(()) => true,
            Err(UnifyError::Mismatch { left, right }) => {
                let kind = on_mismatch(self.store.display(left), self.store.display(right));
                self.error(kind, node, span);
                false
            }
            Err(UnifyError::Recursive { var, ty }) => {
                let kind = TypeErrorKind::RecursiveType {
                    var: self.store.display(var),
                    ty: self.store.display(ty),
                };
                self.error(kind, node, span);
                false
            }
        }
    }
}

fn type_mismatch(left: String, right: String) -> TypeErrorKind {
    TypeErrorKind::TypeMismatch { left, right }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ast::ConstDeclaration;
    use crate::lexer::tokenize;
    use crate::parser::parse;

    fn program(source: &str) -> Program {
        let output = parse(tokenize(source).expect("lex"));
        assert!(output.errors.is_empty(), "parse errors: {:?}", output.errors);
        output.program
    }

    fn check(source: &str) -> (Program, TypeCheckResult) {
        let program = program(source);
        let result = type_check(&program);
        (program, result)
    }

    fn find_const<'a>(program: &'a Program, name: &str) -> &'a ConstDeclaration {
        program
            .body
            .iter()
            .find_map(|stmt| match stmt {
                Stmt::Const(decl) if decl.name == name => Some(decl),
                _ => None,
            })
            .expect("const declared")
    }

    fn type_of_const(source: &str, name: &str) -> String {
        let (program, result) = check(source);
        assert!(result.is_ok(), "type errors: {:?}", result.errors);
        let decl = find_const(&program, name);
        result.display_type(decl.id).expect("typed")
    }

    fn messages(source: &str) -> Vec<String> {
        let (_, result) = check(source);
        result.errors.iter().map(|e| e.to_string()).collect()
    }

    #[test]
    fn literals_have_scalar_types() {
        assert_eq!(type_of_const("const a = 1.5;", "a"), "Number");
        assert_eq!(type_of_const("const a = 'x';", "a"), "String");
        assert_eq!(type_of_const("const a = false;", "a"), "Boolean");
    }

    #[test]
    fn infers_array_types() {
        assert_eq!(type_of_const("const a = [1, 2, 3];", "a"), "Array<Number>");
        assert_eq!(type_of_const("const a = [[true]];", "a"), "Array<Array<Boolean>>");
        assert_eq!(type_of_const("const a = [1, 2][0];", "a"), "Number");
    }

    #[test]
    fn infers_curried_function_types() {
        let source = "const add = (a, b) => { return a + b * 2; };";
        assert_eq!(
            type_of_const(source, "add"),
            "(Number) => (Number) => Number"
        );
    }

    #[test]
    fn function_without_return_yields_void() {
        let source = "const f = (x: string) => { const y = x; };";
        assert_eq!(type_of_const(source, "f"), "(String) => Void");
    }

    #[test]
    fn zero_parameter_function_takes_void() {
        let source = "const f = () => { return 1; }; const a = f();";
        assert_eq!(type_of_const(source, "f"), "(Void) => Number");
        assert_eq!(type_of_const(source, "a"), "Number");
    }

    #[test]
    fn let_bound_functions_are_polymorphic() {
        let source = "const id = (x) => { return x; }; const a = id(1); const b = id(\"x\");";
        let (program, result) = check(source);
        assert!(result.is_ok(), "{:?}", result.errors);
        let a = find_const(&program, "a");
        let b = find_const(&program, "b");
        assert_eq!(result.display_type(a.id).as_deref(), Some("Number"));
        assert_eq!(result.display_type(b.id).as_deref(), Some("String"));
    }

    #[test]
    fn parameters_are_monomorphic_inside_their_body() {
        let messages = messages("const f = (g) => { const a = g(1); const b = g(\"s\"); return a; };");
        assert_eq!(messages.len(), 1);
        assert!(messages[0].contains("Type mismatch"));
    }

    #[test]
    fn inner_const_generalises_only_free_variables() {
        let source = "const f = (x) => {\
            const k = (y) => { return x; };\
            const a = k(1);\
            const b = k(\"s\");\
            return a;\
        };";
        let ty = type_of_const(source, "f");
        let (program, result) = check(source);
        let f = find_const(&program, "f");
        let Some(Shape::Arrow(param, result_ty)) = result.shape_of(f.id) else {
            panic!("expected function, got {ty}");
        };
        assert_eq!(result.store.find(param), result.store.find(result_ty));
    }

    #[test]
    fn partial_application_is_legal() {
        let source = "const add = (a, b) => { return a + b; };\
            const inc = add(1);\
            const r = inc(2);";
        assert_eq!(type_of_const(source, "inc"), "(Number) => Number");
        assert_eq!(type_of_const(source, "r"), "Number");
    }

    #[test]
    fn higher_order_arguments_unify() {
        let source = "const apply = (f, x) => { return f(x); };\
            const r = apply((n) => { return n * 2; }, 3);";
        assert_eq!(type_of_const(source, "r"), "Number");
    }

    #[test]
    fn string_concatenation_is_allowed() {
        assert_eq!(type_of_const("const s = 'a' + \"b\";", "s"), "String");
    }

    #[test]
    fn addition_rejects_booleans() {
        let (_, result) = check("const a = true + false;");
        assert_eq!(result.errors.len(), 1);
        assert!(matches!(
            result.errors[0].kind,
            TypeErrorKind::AddOperandNotNumberOrString { .. }
        ));
    }

    #[test]
    fn addition_mismatch_names_both_types() {
        let messages = messages("const a = 1 + 'x';");
        assert_eq!(messages, vec!["Type mismatch: Number and String".to_string()]);
    }

    #[test]
    fn multiplication_requires_numbers() {
        let (_, result) = check("const a = 'x' * 2;");
        assert_eq!(result.errors.len(), 1);
        assert_eq!(
            result.errors[0].kind,
            TypeErrorKind::MulOperandNotNumber {
                found: "String".into()
            }
        );
    }

    #[test]
    fn condition_must_be_boolean() {
        let messages = messages("const a = 1 ? 2 : 3;");
        assert_eq!(messages.len(), 1);
        assert!(messages[0].contains("condition"));
    }

    #[test]
    fn branches_must_agree() {
        let messages = messages("const a = true ? 2 : 'x';");
        assert_eq!(messages.len(), 1);
        assert!(messages[0].contains("branches"));
    }

    #[test]
    fn array_elements_must_agree() {
        let messages = messages("const a = [1, 'x', 3];");
        assert_eq!(messages.len(), 1);
        assert!(messages[0].contains("array"));
    }

    #[test]
    fn index_must_be_number() {
        let (_, result) = check("const xs = [1]; const a = xs['0'];");
        assert_eq!(result.errors.len(), 1);
        assert!(matches!(
            result.errors[0].kind,
            TypeErrorKind::ArrayIndexNotNumber { .. }
        ));
    }

    #[test]
    fn indexing_a_non_array_is_a_mismatch() {
        let messages = messages("const n = 1; const a = n[0];");
        assert_eq!(messages, vec!["Type mismatch: Number and Array<T3>".to_string()]);
    }

    #[test]
    fn self_application_is_recursive() {
        let messages = messages("const f = (x) => { return x(x); };");
        assert_eq!(messages.len(), 1);
        assert!(messages[0].contains("Recursive"));
    }

    #[test]
    fn reports_too_many_arguments() {
        let (_, result) = check("const f = (x) => { return x + 1; }; const a = f(1, 2);");
        assert_eq!(result.errors.len(), 1);
        assert_eq!(
            result.errors[0].kind,
            TypeErrorKind::TooManyArguments {
                accepted: 1,
                given: 2
            }
        );
    }

    #[test]
    fn reports_call_of_non_function() {
        let (_, result) = check("const a = 1; const b = a(2);");
        assert_eq!(result.errors.len(), 1);
        assert_eq!(
            result.errors[0].kind,
            TypeErrorKind::CalledValueNotFunction {
                found: "Number".into()
            }
        );
    }

    #[test]
    fn argument_types_are_checked() {
        let messages = messages("const f = (x: number) => { return x; }; const a = f('s');");
        assert_eq!(messages, vec!["Type mismatch: Number and String".to_string()]);
    }

    #[test]
    fn const_annotation_is_enforced() {
        let messages = messages("const x: string = 5;");
        assert_eq!(messages, vec!["Type mismatch: Number and String".to_string()]);
    }

    #[test]
    fn return_annotation_is_enforced() {
        let messages = messages("const f = (x: number): string => { return x; };");
        assert_eq!(messages.len(), 1);
        assert!(messages[0].contains("Type mismatch"));
    }

    #[test]
    fn function_type_annotation_constrains_parameter() {
        let source = "const twice = (f: (x: number) => number, v) => { return f(f(v)); };";
        assert_eq!(
            type_of_const(source, "twice"),
            "((Number) => Number) => (Number) => Number"
        );
    }

    #[test]
    fn misplaced_return_is_reported() {
        let messages = messages("const bad = () => { return 1; const x = 2; };");
        assert_eq!(messages.len(), 1);
        assert!(messages[0].contains("Return statement"));
    }

    #[test]
    fn unknown_identifiers_do_not_cascade() {
        let (_, result) = check("const a = missing + 1; const b = missing * 2;");
        assert!(result.is_ok(), "{:?}", result.errors);
    }

    #[test]
    fn every_expression_is_typed() {
        let source = "const f = (a, b) => { return a ? [b][0] : b * 2; }; f(true, 3);";
        let (program, result) = check(source);
        assert!(result.is_ok(), "{:?}", result.errors);

        fn visit(expr: &Expr, result: &TypeCheckResult) {
            assert!(result.type_of(expr.id).is_some(), "untyped {:?}", expr.kind);
            match &expr.kind {
                ExprKind::Binary { left, right, .. } => {
                    visit(left, result);
                    visit(right, result);
                }
                ExprKind::Conditional {
                    test,
                    consequent,
                    alternate,
                } => {
                    visit(test, result);
                    visit(consequent, result);
                    visit(alternate, result);
                }
                ExprKind::Call { callee, arguments } => {
                    visit(callee, result);
                    arguments.iter().for_each(|a| visit(a, result));
                }
                ExprKind::Array(elements) => elements.iter().for_each(|e| visit(e, result)),
                ExprKind::Member { object, index } => {
                    visit(object, result);
                    visit(index, result);
                }
                ExprKind::Arrow(func) => {
                    for stmt in &func.body.body {
                        match stmt {
                            Stmt::Const(decl) => visit(&decl.init, result),
                            Stmt::Return(ret) => {
                                if let Some(arg) = &ret.argument {
                                    visit(arg, result);
                                }
                            }
                            Stmt::Expr(e) => visit(e, result),
                        }
                    }
                }
                ExprKind::Identifier(_)
                | ExprKind::Number(_)
                | ExprKind::String(_)
                | ExprKind::Boolean(_) => {}
            }
        }

        for stmt in &program.body {
            match stmt {
                Stmt::Const(decl) => visit(&decl.init, &result),
                Stmt::Expr(expr) => visit(expr, &result),
                Stmt::Return(_) => {}
            }
        }
    }

    #[test]
    fn errors_follow_source_order() {
        let (_, result) = check("const a = 1 + 'x'; const b = 1 ? 2 : 3; const c = [1, true];");
        let starts: Vec<u32> = result.errors.iter().map(|e| e.span.start).collect();
        let mut sorted = starts.clone();
        sorted.sort();
        assert_eq!(starts.len(), 3);
        assert_eq!(starts, sorted);
    }

    #[test]
    fn scalar_alias_annotations_lower_to_their_types() {
        assert_eq!(type_of_const("const x: Float = 1;", "x"), "Number");
        assert_eq!(type_of_const("const b: Bool = true;", "b"), "Boolean");
        assert_eq!(type_of_const("const f = (): Unit => {};", "f"), "(Void) => Void");
        assert_eq!(type_of_const("const f = (): void => {};", "f"), "(Void) => Void");
        assert_eq!(type_of_const("const f = (u: Void) => { return u; };", "f"), "(Void) => Void");
    }

    #[test]
    fn alias_annotations_still_reject_other_types() {
        let messages = messages("const b: Bool = 1;");
        assert_eq!(messages, vec!["Type mismatch: Number and Boolean".to_string()]);
    }

    #[test]
    fn postfix_array_annotation_is_enforced() {
        assert_eq!(type_of_const("const xs: number[] = [];", "xs"), "Array<Number>");
        let messages = messages("const xs: number[] = ['a'];");
        assert_eq!(messages.len(), 1);
        assert!(messages[0].contains("Type mismatch"));
    }

    #[test]
    fn nested_generic_array_annotation_is_enforced() {
        assert_eq!(
            type_of_const("const ys: Array<Array<string>> = [['a']];", "ys"),
            "Array<Array<String>>"
        );
        let messages = messages("const ys: Array<Array<string>> = [[1]];");
        assert_eq!(messages, vec!["Type mismatch: Number and String".to_string()]);
    }

    #[test]
    fn duplicate_const_keeps_the_first_binding() {
        let (program, result) = check("const x = 1; const x = 'a'; const y = x * 2;");
        assert!(result.is_ok(), "{:?}", result.errors);
        let y = find_const(&program, "y");
        assert_eq!(result.display_type(y.id).as_deref(), Some("Number"));
    }

    #[test]
    fn declaration_replaces_an_undeclared_stand_in() {
        let (_, result) = check("const a = b + 'x'; const b = 1; const c = b * 2;");
        assert!(result.is_ok(), "{:?}", result.errors);
    }
}
