use thiserror::Error;

use crate::ast::NodeId;
use crate::diagnostic::Diagnostic;
use crate::lexer::TokenKind;
use crate::span::Span;

#[derive(Debug, Error)]
pub enum CoreError {
    #[error("failed to read source: {0}")]
    SourceIo(#[from] std::io::Error),
    #[error(transparent)]
    Lex(#[from] LexError),
    #[error("{} parse error(s); first: {}", .0.len(), first_message(.0))]
    Parse(Vec<ParseError>),
}

fn first_message(errors: &[ParseError]) -> String {
    errors
        .first()
        .map(|err| err.to_string())
        .unwrap_or_default()
}

/// The lexer stops at the first character no token rule accepts.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LexError {
    #[error("unexpected character '{ch}' at byte {position}")]
    UnexpectedCharacter { position: usize, ch: char },
    /// Spans are 32-bit byte offsets.
    #[error("source is {len} bytes; at most {} are supported", u32::MAX)]
    SourceTooLarge { len: usize },
}

impl LexError {
    pub fn position(&self) -> usize {
        match self {
            LexError::UnexpectedCharacter { position, .. } => *position,
            LexError::SourceTooLarge { .. } => 0,
        }
    }

    pub fn to_diagnostic(&self) -> Diagnostic {
        let position = u32::try_from(self.position()).unwrap_or(u32::MAX);
        let span = match self {
            LexError::UnexpectedCharacter { .. } => {
                Span::new(position, position.saturating_add(1))
            }
            LexError::SourceTooLarge { .. } => Span::point(position),
        };
        Diagnostic::error(self.to_string(), span).with_code("E0001")
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ParseErrorKind {
    #[error("expected {expected} but found {found}")]
    ExpectedToken {
        expected: &'static str,
        found: TokenKind,
    },
    #[error("unexpected token {0} in expression")]
    UnexpectedTokenInExpression(TokenKind),
    #[error("the 'any' type is not supported")]
    UnsupportedAnyType,
    #[error("unknown type name '{0}'")]
    UnknownTypeName(String),
    #[error("Return statement is only allowed inside a function body")]
    ReturnOutsideFunction,
}

impl ParseErrorKind {
    pub fn code(&self) -> &'static str {
        match self {
            ParseErrorKind::ExpectedToken { .. } => "E0002",
            ParseErrorKind::UnexpectedTokenInExpression(_) => "E0003",
            ParseErrorKind::UnsupportedAnyType => "E0004",
            ParseErrorKind::UnknownTypeName(_) => "E0005",
            ParseErrorKind::ReturnOutsideFunction => "E0006",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{kind}")]
pub struct ParseError {
    pub kind: ParseErrorKind,
    pub span: Span,
}

impl ParseError {
    pub fn to_diagnostic(&self) -> Diagnostic {
        Diagnostic::error(self.kind.to_string(), self.span).with_code(self.kind.code())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum NameErrorKind {
    #[error("Duplicate declaration of '{0}' in the same scope")]
    DuplicateDeclaration(String),
    #[error("Duplicate parameter '{0}'")]
    DuplicateParameter(String),
    #[error("Undeclared reference '{0}'")]
    UndeclaredReference(String),
}

impl NameErrorKind {
    pub fn code(&self) -> &'static str {
        match self {
            NameErrorKind::DuplicateDeclaration(_) => "E0101",
            NameErrorKind::DuplicateParameter(_) => "E0102",
            NameErrorKind::UndeclaredReference(_) => "E0103",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{kind}")]
pub struct NameError {
    pub kind: NameErrorKind,
    pub node: NodeId,
    pub span: Span,
}

impl NameError {
    pub fn to_diagnostic(&self) -> Diagnostic {
        Diagnostic::error(self.kind.to_string(), self.span).with_code(self.kind.code())
    }
}

/// Type errors. Type names are rendered by the store at the moment the
/// error is found.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TypeErrorKind {
    #[error("Type mismatch: {left} and {right}")]
    TypeMismatch { left: String, right: String },
    #[error("Ternary condition must be Boolean, found {found}")]
    ConditionNotBoolean { found: String },
    #[error("Ternary branches have different types: {left} and {right}")]
    BranchMismatch { left: String, right: String },
    #[error("All array elements must have the same type: {first} and {found}")]
    ArrayElementMismatch { first: String, found: String },
    #[error("Array index must be Number, found {found}")]
    ArrayIndexNotNumber { found: String },
    #[error("Operands of '+' must be Number or String, found {found}")]
    AddOperandNotNumberOrString { found: String },
    #[error("Operands of '*' must be Number, found {found}")]
    MulOperandNotNumber { found: String },
    #[error("Return statement must be the last statement of a function body")]
    MisplacedReturn,
    #[error("Recursive type: {var} occurs in {ty}")]
    RecursiveType { var: String, ty: String },
    #[error("Too many arguments: callee accepts {accepted} but {given} were given")]
    TooManyArguments { accepted: usize, given: usize },
    #[error("Called value of type {found} is not a function")]
    CalledValueNotFunction { found: String },
}

impl TypeErrorKind {
    pub fn code(&self) -> &'static str {
        match self {
            TypeErrorKind::TypeMismatch { .. } => "E0201",
            TypeErrorKind::ConditionNotBoolean { .. } => "E0202",
            TypeErrorKind::BranchMismatch { .. } => "E0203",
            TypeErrorKind::ArrayElementMismatch { .. } => "E0204",
            TypeErrorKind::ArrayIndexNotNumber { .. } => "E0205",
            TypeErrorKind::AddOperandNotNumberOrString { .. } => "E0206",
            TypeErrorKind::MulOperandNotNumber { .. } => "E0207",
            TypeErrorKind::MisplacedReturn => "E0208",
            TypeErrorKind::RecursiveType { .. } => "E0209",
            TypeErrorKind::TooManyArguments { .. } => "E0210",
            TypeErrorKind::CalledValueNotFunction { .. } => "E0211",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{kind}")]
pub struct TypeError {
    pub kind: TypeErrorKind,
    pub node: NodeId,
    pub span: Span,
}

impl TypeError {
    pub fn to_diagnostic(&self) -> Diagnostic {
        Diagnostic::error(self.kind.to_string(), self.span).with_code(self.kind.code())
    }
}
