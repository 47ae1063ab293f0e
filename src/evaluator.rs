use thiserror::Error;
use tracing::trace;

use crate::ast::{Expr, MathOperation};
use crate::expression::WorkflowContext;
use crate::functions::FunctionMap;
use crate::value::Value;

/// Runtime failures raised while evaluating an expression on data.
#[derive(Debug, Clone, Error, PartialEq)]
pub enum EvalError {
    #[error("map key {0} not found")]
    MapKeyNotFound(Value),

    #[error("unsupported list index type '{0}', expected integer")]
    ListIndexType(&'static str),

    #[error("index {index} is larger than the list items length ({length})")]
    IndexOutOfRange { index: i64, length: usize },

    #[error("invalid index ({0}); must be non-negative integer")]
    NegativeIndex(i64),

    #[error("cannot evaluate identifier {key} on a {type_name}")]
    UnsupportedLookup { key: Value, type_name: &'static str },

    #[error("function with ID '{0}' not found")]
    UnknownFunction(String),

    #[error("function '{id}' called with incorrect number of arguments; expected {expected}, got {actual}")]
    FunctionArity {
        id: String,
        expected: usize,
        actual: usize,
    },

    /// A host function reported an error; the message is surfaced
    /// unchanged.
    #[error("{message}")]
    FunctionFailure { id: String, message: String },

    #[error("left type '{left}' and right type '{right}' of binary operation '{op}' do not match")]
    OperandMismatch {
        op: MathOperation,
        left: &'static str,
        right: &'static str,
    },

    #[error("attempted logical operation '{op}' on numeric input")]
    LogicalOperationOnNumber { op: MathOperation },

    #[error("string operations do not support operator '{op}'")]
    UnsupportedStringOperation { op: MathOperation },

    #[error("attempted to perform invalid operation '{op}' on boolean")]
    UnsupportedBooleanOperation { op: MathOperation },

    #[error("unsupported type to perform binary operation on: {0}")]
    UnsupportedOperandType(&'static str),

    #[error("unsupported type for arithmetic negation: {0}; expected 64-bit int or float")]
    UnsupportedNegation(&'static str),

    #[error("unsupported type for boolean complement: {0}; expected boolean")]
    UnsupportedComplement(&'static str),

    #[error("division by zero")]
    DivisionByZero,
}

/// Evaluation context holding the root data and the function registry,
/// so the recursion does not have to pass them along every call.
pub struct EvalContext<'a> {
    root_data: &'a Value,
    functions: &'a FunctionMap,
    // Threaded for downstream extensions; the core never reads it.
    _workflow_context: &'a WorkflowContext,
}

/// Evaluates an expression on the given data, with `data` serving as
/// both the current subject and the root.
pub fn evaluate(
    node: &Expr,
    data: &Value,
    functions: &FunctionMap,
    workflow_context: &WorkflowContext,
) -> Result<Value, EvalError> {
    trace!(expression = %node, "evaluating expression");
    let context = EvalContext {
        root_data: data,
        functions,
        _workflow_context: workflow_context,
    };
    context.evaluate(node, data)
}

impl<'a> EvalContext<'a> {
    /// Evaluates a node against the current subject value. Bracket
    /// keys, function arguments, and operator operands are evaluated
    /// from the root data, mirroring how the resolver re-roots them.
    fn evaluate(&self, node: &Expr, data: &Value) -> Result<Value, EvalError> {
        match node {
            Expr::Int(n) => Ok(Value::Int(*n)),
            Expr::Float(n) => Ok(Value::Float(*n)),
            Expr::Str(s) => Ok(Value::String(s.clone())),
            Expr::Bool(b) => Ok(Value::Bool(*b)),
            Expr::Identifier(name) => self.evaluate_identifier(name, data),
            Expr::DotNotation { left, right } => {
                let left_result = self.evaluate(left, data)?;
                self.evaluate(right, &left_result)
            }
            Expr::BracketAccessor { left, right } => {
                let left_result = self.evaluate(left, data)?;
                let key = self.evaluate(right, self.root_data)?;
                apply_key(&left_result, &key)
            }
            Expr::FunctionCall { identifier, args } => self.evaluate_function_call(identifier, args),
            Expr::BinaryOperation { op, left, right } => {
                self.evaluate_binary_operation(*op, left, right)
            }
            Expr::UnaryOperation { op, right } => self.evaluate_unary_operation(*op, right),
        }
    }

    fn evaluate_identifier(&self, name: &str, data: &Value) -> Result<Value, EvalError> {
        if name == "$" {
            // The root of the data structure.
            return Ok(self.root_data.clone());
        }
        // A plain accessor key, looked up like a map key.
        apply_key(data, &Value::String(name.to_string()))
    }

    fn evaluate_function_call(&self, identifier: &str, args: &[Expr]) -> Result<Value, EvalError> {
        let function = self
            .functions
            .get(identifier)
            .ok_or_else(|| EvalError::UnknownFunction(identifier.to_string()))?;

        let mut evaluated_args = Vec::with_capacity(args.len());
        for arg in args {
            evaluated_args.push(self.evaluate(arg, self.root_data)?);
        }
        let expected = function.parameters().len();
        if evaluated_args.len() != expected {
            return Err(EvalError::FunctionArity {
                id: function.id().to_string(),
                expected,
                actual: evaluated_args.len(),
            });
        }
        function
            .call(evaluated_args)
            .map_err(|message| EvalError::FunctionFailure {
                id: function.id().to_string(),
                message,
            })
    }

    fn evaluate_binary_operation(
        &self,
        op: MathOperation,
        left: &Expr,
        right: &Expr,
    ) -> Result<Value, EvalError> {
        let left_value = self.evaluate(left, self.root_data)?;
        let right_value = self.evaluate(right, self.root_data)?;

        match (&left_value, &right_value) {
            (Value::Int(a), Value::Int(b)) => evaluate_int_operation(*a, *b, op),
            (Value::Float(a), Value::Float(b)) => evaluate_float_operation(*a, *b, op),
            (Value::String(a), Value::String(b)) => evaluate_string_operation(a, b, op),
            (Value::Bool(a), Value::Bool(b)) => evaluate_bool_operation(*a, *b, op),
            (a, b) if a.type_name() == b.type_name() => {
                Err(EvalError::UnsupportedOperandType(a.type_name()))
            }
            (a, b) => Err(EvalError::OperandMismatch {
                op,
                left: a.type_name(),
                right: b.type_name(),
            }),
        }
    }

    fn evaluate_unary_operation(&self, op: MathOperation, right: &Expr) -> Result<Value, EvalError> {
        let value = self.evaluate(right, self.root_data)?;
        match op {
            MathOperation::Subtract => match value {
                Value::Int(n) => Ok(Value::Int(n.wrapping_neg())),
                Value::Float(n) => Ok(Value::Float(-n)),
                other => Err(EvalError::UnsupportedNegation(other.type_name())),
            },
            MathOperation::Not => match value {
                Value::Bool(b) => Ok(Value::Bool(!b)),
                other => Err(EvalError::UnsupportedComplement(other.type_name())),
            },
            other => unreachable!("'{}' is not a unary operator", other),
        }
    }
}

/// Looks a key up in a map or a sequence. Identifiers and bracket
/// accessors both funnel into this.
fn apply_key(data: &Value, key: &Value) -> Result<Value, EvalError> {
    match data {
        Value::Map(entries) => entries
            .get(key)
            .cloned()
            .ok_or_else(|| EvalError::MapKeyNotFound(key.clone())),
        Value::List(items) => {
            // Sequences take integer indexes only; the caller is
            // responsible for converting other types first.
            let index = match key {
                Value::Int(n) => *n,
                other => return Err(EvalError::ListIndexType(other.type_name())),
            };
            if index >= 0 && index as usize >= items.len() {
                return Err(EvalError::IndexOutOfRange {
                    index,
                    length: items.len(),
                });
            }
            if index < 0 {
                return Err(EvalError::NegativeIndex(index));
            }
            Ok(items[index as usize].clone())
        }
        other => Err(EvalError::UnsupportedLookup {
            key: key.clone(),
            type_name: other.type_name(),
        }),
    }
}

fn evaluate_int_operation(a: i64, b: i64, op: MathOperation) -> Result<Value, EvalError> {
    use MathOperation::*;
    match op {
        Add => Ok(Value::Int(a.wrapping_add(b))),
        Subtract => Ok(Value::Int(a.wrapping_sub(b))),
        Multiply => Ok(Value::Int(a.wrapping_mul(b))),
        Divide => {
            if b == 0 {
                return Err(EvalError::DivisionByZero);
            }
            Ok(Value::Int(a.wrapping_div(b)))
        }
        Modulo => {
            if b == 0 {
                return Err(EvalError::DivisionByZero);
            }
            Ok(Value::Int(a.wrapping_rem(b)))
        }
        Power => Ok(Value::Int((a as f64).powf(b as f64) as i64)),
        Equal => Ok(Value::Bool(a == b)),
        NotEqual => Ok(Value::Bool(a != b)),
        GreaterThan => Ok(Value::Bool(a > b)),
        LessThan => Ok(Value::Bool(a < b)),
        GreaterEqual => Ok(Value::Bool(a >= b)),
        LessEqual => Ok(Value::Bool(a <= b)),
        And | Or => Err(EvalError::LogicalOperationOnNumber { op }),
        Not => unreachable!("'!' is not a binary operator"),
    }
}

fn evaluate_float_operation(a: f64, b: f64, op: MathOperation) -> Result<Value, EvalError> {
    use MathOperation::*;
    match op {
        Add => Ok(Value::Float(a + b)),
        Subtract => Ok(Value::Float(a - b)),
        Multiply => Ok(Value::Float(a * b)),
        Divide => Ok(Value::Float(a / b)),
        // IEEE remainder, keeping the sign of the dividend.
        Modulo => Ok(Value::Float(a % b)),
        Power => Ok(Value::Float(a.powf(b))),
        Equal => Ok(Value::Bool(a == b)),
        NotEqual => Ok(Value::Bool(a != b)),
        GreaterThan => Ok(Value::Bool(a > b)),
        LessThan => Ok(Value::Bool(a < b)),
        GreaterEqual => Ok(Value::Bool(a >= b)),
        LessEqual => Ok(Value::Bool(a <= b)),
        And | Or => Err(EvalError::LogicalOperationOnNumber { op }),
        Not => unreachable!("'!' is not a binary operator"),
    }
}

fn evaluate_string_operation(a: &str, b: &str, op: MathOperation) -> Result<Value, EvalError> {
    use MathOperation::*;
    match op {
        // Concatenation.
        Add => Ok(Value::String(format!("{}{}", a, b))),
        Equal => Ok(Value::Bool(a == b)),
        NotEqual => Ok(Value::Bool(a != b)),
        GreaterThan => Ok(Value::Bool(a > b)),
        LessThan => Ok(Value::Bool(a < b)),
        GreaterEqual => Ok(Value::Bool(a >= b)),
        LessEqual => Ok(Value::Bool(a <= b)),
        Subtract | Multiply | Divide | Modulo | Power | And | Or => {
            Err(EvalError::UnsupportedStringOperation { op })
        }
        Not => unreachable!("'!' is not a binary operator"),
    }
}

fn evaluate_bool_operation(a: bool, b: bool, op: MathOperation) -> Result<Value, EvalError> {
    use MathOperation::*;
    match op {
        Equal => Ok(Value::Bool(a == b)),
        NotEqual => Ok(Value::Bool(a != b)),
        And => Ok(Value::Bool(a && b)),
        Or => Ok(Value::Bool(a || b)),
        Add | Subtract | Multiply | Divide | Modulo | Power | GreaterThan | LessThan
        | GreaterEqual | LessEqual => Err(EvalError::UnsupportedBooleanOperation { op }),
        Not => unreachable!("'!' is not a binary operator"),
    }
}
