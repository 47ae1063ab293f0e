use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;

use indexmap::IndexMap;

use crate::ast::Expr;
use crate::evaluator::{self, EvalError};
use crate::functions::FunctionMap;
use crate::parser::{self, ParseError};
use crate::path::{Path, UnpackRequirements};
use crate::resolver::{self, ResolveError};
use crate::schema::SchemaType;
use crate::value::Value;

/// Files attached to the running workflow, keyed by name. Threaded
/// through resolution and evaluation for downstream extensions; the
/// expression core never reads it.
pub type WorkflowContext = HashMap<String, Vec<u8>>;

/// A parsed expression.
///
/// The expression is immutable once parsed; typing, dependency
/// extraction, and evaluation each build their own temporary state, so
/// a single parsed expression can serve many concurrent queries.
///
/// # Examples
///
/// ```
/// use trellis_expr::{Expression, Value};
/// use serde_json::json;
///
/// let expr = Expression::parse("$.foo.bar").unwrap();
/// let data = Value::from(json!({"foo": {"bar": 42}}));
/// let result = expr.evaluate(&data, &Default::default(), &Default::default()).unwrap();
/// assert_eq!(result, Value::Int(42));
/// ```
#[derive(Debug, Clone)]
pub struct Expression {
    source: String,
    ast: Expr,
}

impl Expression {
    /// Tokenizes and parses an expression.
    pub fn parse(source: &str) -> Result<Self, ParseError> {
        let ast = parser::parse(source, "expression")?;
        Ok(Expression {
            source: source.to_string(),
            ast,
        })
    }

    /// The parsed syntax tree.
    pub fn ast(&self) -> &Expr {
        &self.ast
    }

    /// Statically types the expression's result against a schema.
    /// Returns `None` when the expression is a call to a void function.
    pub fn result_type(
        &self,
        schema: &SchemaType,
        functions: &FunctionMap,
        workflow_context: &WorkflowContext,
    ) -> Result<Option<SchemaType>, ResolveError> {
        resolver::resolve_type(&self.ast, schema, functions, workflow_context)
    }

    /// The input paths this expression reads, filtered by the unpack
    /// requirements, deduplicated by string form in first-seen order.
    pub fn dependencies(
        &self,
        schema: &SchemaType,
        functions: &FunctionMap,
        workflow_context: &WorkflowContext,
        requirements: &UnpackRequirements,
    ) -> Result<Vec<Path>, ResolveError> {
        let trees =
            resolver::resolve_dependency_trees(&self.ast, schema, functions, workflow_context)?;
        let mut unique: IndexMap<String, Path> = IndexMap::new();
        for tree in trees {
            for path in tree.unpack(requirements) {
                unique.entry(path.to_string()).or_insert(path);
            }
        }
        Ok(unique.into_values().collect())
    }

    /// Evaluates the expression on the given data set regardless of
    /// any schema. The caller is responsible for validating that the
    /// data matches the expected shape.
    pub fn evaluate(
        &self,
        data: &Value,
        functions: &FunctionMap,
        workflow_context: &WorkflowContext,
    ) -> Result<Value, EvalError> {
        evaluator::evaluate(&self.ast, data, functions, workflow_context)
    }
}

impl fmt::Display for Expression {
    /// The original source text of the expression.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.source)
    }
}

impl FromStr for Expression {
    type Err = ParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Expression::parse(s)
    }
}
