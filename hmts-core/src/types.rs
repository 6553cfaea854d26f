//! Type store and unification.
//!
//! Types live in a grow-only table indexed by [`TypeId`]. Each slot is
//! either an unbound variable, a forwarding link to another slot, or a
//! known shape whose children are themselves type ids. Unification
//! mutates the table; `resolve` compresses every link chain it walks so
//! later lookups go straight to the root.

use std::collections::HashMap;
use std::fmt;

use log::trace;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TypeId(pub u32);

impl TypeId {
    fn index(self) -> usize {
        self.0 as usize
    }
}

/// Built-in scalar types.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Scalar {
    Number,
    String,
    Boolean,
    Void,
}

impl Scalar {
    pub fn name(self) -> &'static str {
        match self {
            Scalar::Number => "Number",
            Scalar::String => "String",
            Scalar::Boolean => "Boolean",
            Scalar::Void => "Void",
        }
    }
}

impl fmt::Display for Scalar {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// A known type constructor applied to child type ids.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Shape {
    Scalar(Scalar),
    Array(TypeId),
    /// Single-argument function; multi-parameter functions are curried.
    Arrow(TypeId, TypeId),
}

impl Shape {
    /// Head constructor name, used when two shapes fail to match.
    pub fn head(&self) -> &'static str {
        match self {
            Shape::Scalar(scalar) => scalar.name(),
            Shape::Array(_) => "Array",
            Shape::Arrow(..) => "Function",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Slot {
    Unbound,
    Link(TypeId),
    Known(Shape),
}

/// Why two types could not be made equal.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnifyError {
    /// The innermost pair of roots whose shapes differ.
    Mismatch { left: TypeId, right: TypeId },
    /// Binding `var` to `ty` would create a cycle.
    Recursive { var: TypeId, ty: TypeId },
}

#[derive(Debug, Clone, Default)]
pub struct TypeStore {
    slots: Vec<Slot>,
}

impl TypeStore {
    pub fn new() -> Self {
        TypeStore { slots: Vec::new() }
    }

    pub fn len(&self) -> usize {
        self.slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    /// Append a fresh unbound variable.
    pub fn fresh(&mut self) -> TypeId {
        self.push(Slot::Unbound)
    }

    pub fn scalar(&mut self, scalar: Scalar) -> TypeId {
        self.push(Slot::Known(Shape::Scalar(scalar)))
    }

    pub fn array(&mut self, element: TypeId) -> TypeId {
        self.push(Slot::Known(Shape::Array(element)))
    }

    pub fn arrow(&mut self, param: TypeId, result: TypeId) -> TypeId {
        self.push(Slot::Known(Shape::Arrow(param, result)))
    }

    /// Right-curried function `p0 -> p1 -> ... -> result`.
    ///
    /// A function without parameters takes `Void`.
    pub fn curried(&mut self, params: &[TypeId], result: TypeId) -> TypeId {
        if params.is_empty() {
            let void = self.scalar(Scalar::Void);
            return self.arrow(void, result);
        }
        params
            .iter()
            .rev()
            .fold(result, |acc, &param| self.arrow(param, acc))
    }

    fn push(&mut self, slot: Slot) -> TypeId {
        let id = TypeId(self.slots.len() as u32);
        self.slots.push(slot);
        id
    }

    pub fn slot(&self, id: TypeId) -> Slot {
        self.slots[id.index()]
    }

    /// Follow links to the root, pointing every visited slot at it.
    pub fn resolve(&mut self, id: TypeId) -> TypeId {
        let root = self.find(id);
        let mut current = id;
        while let Slot::Link(next) = self.slots[current.index()] {
            if next != root {
                self.slots[current.index()] = Slot::Link(root);
            }
            current = next;
        }
        root
    }

    /// Root of `id` without compressing the chain.
    pub fn find(&self, id: TypeId) -> TypeId {
        let mut current = id;
        while let Slot::Link(next) = self.slots[current.index()] {
            current = next;
        }
        current
    }

    /// Shape at the root of `id`, or `None` if it is an unbound variable.
    pub fn shape(&mut self, id: TypeId) -> Option<Shape> {
        let root = self.resolve(id);
        match self.slots[root.index()] {
            Slot::Known(shape) => Some(shape),
            Slot::Unbound | Slot::Link(_) => None,
        }
    }

    pub fn is_scalar(&mut self, id: TypeId, scalar: Scalar) -> bool {
        self.shape(id) == Some(Shape::Scalar(scalar))
    }

    /// Whether the variable `var` appears anywhere inside `ty`.
    pub fn occurs(&mut self, var: TypeId, ty: TypeId) -> bool {
        let var = self.resolve(var);
        let ty = self.resolve(ty);
        if var == ty {
            return true;
        }
        match self.slots[ty.index()] {
            Slot::Known(Shape::Array(element)) => self.occurs(var, element),
            Slot::Known(Shape::Arrow(param, result)) => {
                self.occurs(var, param) || self.occurs(var, result)
            }
            Slot::Known(Shape::Scalar(_)) | Slot::Unbound | Slot::Link(_) => false,
        }
    }

    /// Make `a` and `b` the same type.
    ///
    /// On failure the store keeps whatever bindings were made before the
    /// conflicting pair was reached.
    pub fn unify(&mut self, a: TypeId, b: TypeId) -> Result<(), UnifyError> {
        let a = self.resolve(a);
        let b = self.resolve(b);
        if a == b {
            return Ok(());
        }
        match (self.slots[a.index()], self.slots[b.index()]) {
            (Slot::Unbound, _) => self.bind(a, b),
            (_, Slot::Unbound) => self.bind(b, a),
            (Slot::Known(Shape::Scalar(l)), Slot::Known(Shape::Scalar(r))) if l == r => Ok(()),
            (Slot::Known(Shape::Array(l)), Slot::Known(Shape::Array(r))) => self.unify(l, r),
            (Slot::Known(Shape::Arrow(lp, lr)), Slot::Known(Shape::Arrow(rp, rr))) => {
                self.unify(lp, rp)?;
                self.unify(lr, rr)
            }
            _ => Err(UnifyError::Mismatch { left: a, right: b }),
        }
    }

    fn bind(&mut self, var: TypeId, ty: TypeId) -> Result<(), UnifyError> {
        if self.occurs(var, ty) {
            return Err(UnifyError::Recursive { var, ty });
        }
        trace!("bind T{} := T{}", var.0, ty.0);
        self.slots[var.index()] = Slot::Link(ty);
        Ok(())
    }

    /// Unbound variables reachable from `id`, in first-seen order.
    pub fn free_vars(&mut self, id: TypeId, out: &mut Vec<TypeId>) {
        let root = self.resolve(id);
        match self.slots[root.index()] {
            Slot::Unbound => {
                if !out.contains(&root) {
                    out.push(root);
                }
            }
            Slot::Known(Shape::Array(element)) => self.free_vars(element, out),
            Slot::Known(Shape::Arrow(param, result)) => {
                self.free_vars(param, out);
                self.free_vars(result, out);
            }
            Slot::Known(Shape::Scalar(_)) | Slot::Link(_) => {}
        }
    }

    /// Copy `id`, replacing each root in `mapping`'s keys by its value.
    ///
    /// Subtrees without any mapped variable are shared, not copied.
    pub fn substitute(&mut self, id: TypeId, mapping: &HashMap<TypeId, TypeId>) -> TypeId {
        let root = self.resolve(id);
        if let Some(&replacement) = mapping.get(&root) {
            return replacement;
        }
        match self.slots[root.index()] {
            Slot::Known(Shape::Array(element)) => {
                let copied = self.substitute(element, mapping);
                if copied == self.find(element) {
                    root
                } else {
                    self.array(copied)
                }
            }
            Slot::Known(Shape::Arrow(param, result)) => {
                let new_param = self.substitute(param, mapping);
                let new_result = self.substitute(result, mapping);
                if new_param == self.find(param) && new_result == self.find(result) {
                    root
                } else {
                    self.arrow(new_param, new_result)
                }
            }
            Slot::Known(Shape::Scalar(_)) | Slot::Unbound | Slot::Link(_) => root,
        }
    }

    /// Human-readable rendering, e.g. `(Number) => Array<T3>`.
    pub fn display(&self, id: TypeId) -> String {
        let mut out = String::new();
        self.write_type(id, &mut out);
        out
    }

    fn write_type(&self, id: TypeId, out: &mut String) {
        let root = self.find(id);
        match self.slots[root.index()] {
            Slot::Unbound | Slot::Link(_) => out.push_str(&format!("T{}", root.0)),
            Slot::Known(Shape::Scalar(scalar)) => out.push_str(scalar.name()),
            Slot::Known(Shape::Array(element)) => {
                out.push_str("Array<");
                self.write_type(element, out);
                out.push('>');
            }
            Slot::Known(Shape::Arrow(param, result)) => {
                out.push('(');
                self.write_type(param, out);
                out.push_str(") => ");
                self.write_type(result, out);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fresh_variables_are_distinct_roots() {
        let mut store = TypeStore::new();
        let a = store.fresh();
        let b = store.fresh();
        assert_ne!(a, b);
        assert_eq!(store.resolve(a), a);
        assert_eq!(store.slot(b), Slot::Unbound);
    }

    #[test]
    fn unifies_variable_with_scalar() {
        let mut store = TypeStore::new();
        let var = store.fresh();
        let number = store.scalar(Scalar::Number);
        store.unify(var, number).expect("unify");
        assert!(store.is_scalar(var, Scalar::Number));
        assert_eq!(store.display(var), "Number");
    }

    #[test]
    fn scalar_mismatch_reports_both_roots() {
        let mut store = TypeStore::new();
        let number = store.scalar(Scalar::Number);
        let string = store.scalar(Scalar::String);
        assert_eq!(
            store.unify(number, string),
            Err(UnifyError::Mismatch {
                left: number,
                right: string
            })
        );
    }

    #[test]
    fn mismatch_points_at_innermost_pair() {
        let mut store = TypeStore::new();
        let number = store.scalar(Scalar::Number);
        let boolean = store.scalar(Scalar::Boolean);
        let xs = store.array(number);
        let ys = store.array(boolean);
        assert_eq!(
            store.unify(xs, ys),
            Err(UnifyError::Mismatch {
                left: number,
                right: boolean
            })
        );
    }

    #[test]
    fn unifies_arrows_componentwise() {
        let mut store = TypeStore::new();
        let p = store.fresh();
        let r = store.fresh();
        let f = store.arrow(p, r);
        let number = store.scalar(Scalar::Number);
        let string = store.scalar(Scalar::String);
        let g = store.arrow(number, string);
        store.unify(f, g).expect("unify");
        assert_eq!(store.display(f), "(Number) => String");
    }

    #[test]
    fn occurs_check_rejects_cycles() {
        let mut store = TypeStore::new();
        let var = store.fresh();
        let list = store.array(var);
        assert_eq!(
            store.unify(var, list),
            Err(UnifyError::Recursive { var, ty: list })
        );
        assert_eq!(store.slot(var), Slot::Unbound);
    }

    #[test]
    fn unification_is_symmetric() {
        let cases: [fn(&mut TypeStore) -> (TypeId, TypeId); 4] = [
            |s| {
                let v = s.fresh();
                let n = s.scalar(Scalar::Number);
                (v, n)
            },
            |s| {
                let n = s.scalar(Scalar::Number);
                let t = s.scalar(Scalar::String);
                (n, t)
            },
            |s| {
                let v = s.fresh();
                let a = s.array(v);
                (v, a)
            },
            |s| {
                let v = s.fresh();
                let n = s.scalar(Scalar::Number);
                let f = s.arrow(v, v);
                let g = s.arrow(n, n);
                (f, g)
            },
        ];
        for build in cases {
            let mut forward = TypeStore::new();
            let (a, b) = build(&mut forward);
            let mut backward = TypeStore::new();
            let (c, d) = build(&mut backward);
            assert_eq!(
                forward.unify(a, b).is_ok(),
                backward.unify(d, c).is_ok()
            );
        }
    }

    #[test]
    fn resolve_compresses_link_chains() {
        let mut store = TypeStore::new();
        let vars: Vec<TypeId> = (0..5).map(|_| store.fresh()).collect();
        for pair in vars.windows(2) {
            store.unify(pair[0], pair[1]).expect("unify");
        }
        let naive = store.find(vars[0]);
        assert_eq!(store.resolve(vars[0]), naive);
        for &var in &vars[..4] {
            assert_eq!(store.slot(var), Slot::Link(naive));
        }
    }

    #[test]
    fn compression_agrees_with_naive_walk() {
        let mut store = TypeStore::new();
        let vars: Vec<TypeId> = (0..8).map(|_| store.fresh()).collect();
        let number = store.scalar(Scalar::Number);
        for i in (1..vars.len()).rev() {
            store.unify(vars[i - 1], vars[i]).expect("unify");
        }
        store.unify(vars[7], number).expect("unify");
        for &var in &vars {
            let naive = store.find(var);
            assert_eq!(store.resolve(var), naive);
            assert_eq!(naive, number);
        }
    }

    #[test]
    fn curried_function_of_no_parameters_takes_void() {
        let mut store = TypeStore::new();
        let number = store.scalar(Scalar::Number);
        let f = store.curried(&[], number);
        assert_eq!(store.display(f), "(Void) => Number");
        let string = store.scalar(Scalar::String);
        let g = store.curried(&[number, string], number);
        assert_eq!(store.display(g), "(Number) => (String) => Number");
    }

    #[test]
    fn substitute_copies_only_mapped_variables() {
        let mut store = TypeStore::new();
        let a = store.fresh();
        let number = store.scalar(Scalar::Number);
        let f = store.arrow(a, number);
        let fresh = store.fresh();
        let mapping = HashMap::from([(a, fresh)]);
        let copy = store.substitute(f, &mapping);
        assert_ne!(copy, f);
        assert_eq!(store.display(copy), format!("(T{}) => Number", fresh.0));

        let untouched = store.substitute(number, &mapping);
        assert_eq!(untouched, number);
    }

    #[test]
    fn collects_free_variables_once() {
        let mut store = TypeStore::new();
        let a = store.fresh();
        let b = store.fresh();
        let inner = store.arrow(a, b);
        let f = store.arrow(a, inner);
        let mut vars = Vec::new();
        store.free_vars(f, &mut vars);
        assert_eq!(vars, vec![a, b]);
    }
}
