//! # Trellis expressions
//!
//! An embeddable expression language for workflow engines. Expressions
//! reference values in a workflow's data tree with JSONPath-style
//! accessors, call host-registered functions, and combine values with
//! arithmetic, comparison, and boolean operators. The language is
//! deliberately not Turing complete.
//!
//! ```text
//! $.steps.read_config.output["success"].credentials
//! multiply($.val, 2) > 10 && !$.flags.disabled
//! ```
//!
//! A parsed [`Expression`] offers three independent queries:
//!
//! - [`Expression::result_type`] statically types the result against a
//!   schema,
//! - [`Expression::dependencies`] reports which input paths the
//!   expression reads,
//! - [`Expression::evaluate`] interprets it over runtime data.
pub mod ast;
pub mod evaluator;
pub mod expression;
pub mod functions;
pub mod lexer;
pub mod parser;
pub mod path;
pub mod resolver;
pub mod schema;
pub mod value;

pub use ast::{Expr, MathOperation, Token, TokenKind};
pub use evaluator::EvalError;
pub use expression::{Expression, WorkflowContext};
pub use functions::{Function, FunctionMap};
pub use lexer::{InvalidTokenError, Lexer};
pub use parser::{ParseError, Parser};
pub use path::{Path, PathItem, PathNodeKind, PathTree, UnpackRequirements};
pub use resolver::ResolveError;
pub use schema::{MapSchema, ObjectSchema, Property, SchemaType, TypeId};
pub use value::{Value, ValueMap};
