//! Syntax tree produced by the parser.
//!
//! Every node carries a [`NodeId`] unique within one parse and the
//! [`Span`] it was parsed from. Later stages refer to nodes by id; the
//! tree itself is never mutated after parsing.

use std::fmt;

use crate::span::Span;
use crate::types::Scalar;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(pub u32);

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Program {
    pub id: NodeId,
    pub body: Vec<Stmt>,
    pub span: Span,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Stmt {
    Const(ConstDeclaration),
    Return(ReturnStatement),
    Expr(Expr),
}

impl Stmt {
    pub fn id(&self) -> NodeId {
        match self {
            Stmt::Const(decl) => decl.id,
            Stmt::Return(ret) => ret.id,
            Stmt::Expr(expr) => expr.id,
        }
    }

    pub fn span(&self) -> Span {
        match self {
            Stmt::Const(decl) => decl.span,
            Stmt::Return(ret) => ret.span,
            Stmt::Expr(expr) => expr.span,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ConstDeclaration {
    pub id: NodeId,
    pub name: String,
    pub type_annotation: Option<TypeExpr>,
    pub init: Expr,
    pub span: Span,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ReturnStatement {
    pub id: NodeId,
    pub argument: Option<Expr>,
    pub span: Span,
}

#[derive(Debug, Clone, PartialEq)]
pub struct BlockStatement {
    pub id: NodeId,
    pub body: Vec<Stmt>,
    pub span: Span,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ArrowFunction {
    pub params: Vec<Param>,
    pub return_type: Option<TypeExpr>,
    pub body: BlockStatement,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Param {
    pub id: NodeId,
    pub name: String,
    pub type_annotation: Option<TypeExpr>,
    pub span: Span,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinaryOp {
    Add,
    Mul,
}

impl BinaryOp {
    pub fn symbol(self) -> &'static str {
        match self {
            BinaryOp::Add => "+",
            BinaryOp::Mul => "*",
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Expr {
    pub id: NodeId,
    pub kind: ExprKind,
    pub span: Span,
}

#[derive(Debug, Clone, PartialEq)]
pub enum ExprKind {
    Identifier(String),
    Binary {
        op: BinaryOp,
        left: Box<Expr>,
        right: Box<Expr>,
    },
    Conditional {
        test: Box<Expr>,
        consequent: Box<Expr>,
        alternate: Box<Expr>,
    },
    Call {
        callee: Box<Expr>,
        arguments: Vec<Expr>,
    },
    Array(Vec<Expr>),
    Member {
        object: Box<Expr>,
        index: Box<Expr>,
    },
    Arrow(ArrowFunction),
    Number(f64),
    String(String),
    Boolean(bool),
}

/// Scalar type keywords as written in source.
///
/// Several spellings denote the same type; [`ScalarKeyword::scalar`]
/// maps each to its type.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScalarKeyword {
    Number,
    String,
    Boolean,
    Void,
    CapitalVoid,
    Unit,
    Float,
    Bool,
}

impl ScalarKeyword {
    pub fn keyword(self) -> &'static str {
        match self {
            ScalarKeyword::Number => "number",
            ScalarKeyword::String => "string",
            ScalarKeyword::Boolean => "boolean",
            ScalarKeyword::Void => "void",
            ScalarKeyword::CapitalVoid => "Void",
            ScalarKeyword::Unit => "Unit",
            ScalarKeyword::Float => "Float",
            ScalarKeyword::Bool => "Bool",
        }
    }

    pub fn scalar(self) -> Scalar {
        match self {
            ScalarKeyword::Number | ScalarKeyword::Float => Scalar::Number,
            ScalarKeyword::String => Scalar::String,
            ScalarKeyword::Boolean | ScalarKeyword::Bool => Scalar::Boolean,
            ScalarKeyword::Void | ScalarKeyword::CapitalVoid | ScalarKeyword::Unit => Scalar::Void,
        }
    }
}

/// Surface syntax of a type annotation.
#[derive(Debug, Clone, PartialEq)]
pub enum TypeExpr {
    Scalar {
        keyword: ScalarKeyword,
        span: Span,
    },
    ArrayOf {
        element: Box<TypeExpr>,
        span: Span,
    },
    FunctionOf {
        params: Vec<(String, TypeExpr)>,
        result: Box<TypeExpr>,
        span: Span,
    },
}

impl TypeExpr {
    pub fn span(&self) -> Span {
        match self {
            TypeExpr::Scalar { span, .. }
            | TypeExpr::ArrayOf { span, .. }
            | TypeExpr::FunctionOf { span, .. } => *span,
        }
    }
}
