//! Abstract syntax tree for the expression language.
//!
//! The AST is produced by the [`crate::parser`] and consumed by both the
//! dependency/type resolver and the evaluator:
//!
//! - **[tokens]** - classified tokens with source positions
//! - **[expressions]** - the expression node sum type
//! - **[operators]** - binary and unary operators
pub mod expressions;
pub mod operators;
pub mod tokens;

pub use expressions::Expr;
pub use operators::MathOperation;
pub use tokens::{Token, TokenKind};
