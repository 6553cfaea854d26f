//! Core front-end for the hmts language.
//!
//! hmts is a small TypeScript-like language: `const` bindings, arrow
//! functions, arrays, `+`, `*` and the ternary operator. The pipeline is:
//!
//!   source .hmts
//!     -> lexer        (tokens)
//!     -> parser       (syntax tree, per-statement recovery)
//!     -> name_resolve (scoping errors)
//!     -> typecheck    (Hindley–Milner inference over a union-find store)
//!
//! Higher-level tools (the CLI, editors) should depend on this crate
//! rather than reimplementing the pipeline.

// ---------------------------------------------------------------------
// Error handling and diagnostics
// ---------------------------------------------------------------------

pub mod span;
pub mod diagnostic;
pub mod error;

// ---------------------------------------------------------------------
// Front-end: lexing, parsing and printing
// ---------------------------------------------------------------------

pub mod lexer;
pub mod parser;
pub mod ast;
pub mod printer;

// ---------------------------------------------------------------------
// Semantic layers: name resolution, types and inference
// ---------------------------------------------------------------------

pub mod types;
pub mod name_resolve;
pub mod typecheck;

// ---------------------------------------------------------------------
// Pipeline orchestration
// ---------------------------------------------------------------------

pub mod compiler;

// ---------------------------------------------------------------------
// Public API re-exports
// ---------------------------------------------------------------------

pub use compiler::{CheckReport, check_file, check_source, compile, parse_source};
pub use error::CoreError;
pub use lexer::tokenize;
pub use name_resolve::name_check;
pub use printer::format;
pub use typecheck::type_check;
