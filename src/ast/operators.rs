use std::fmt;

/// Binary and unary operators.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MathOperation {
    // Arithmetic
    /// Addition or string concatenation (`+`)
    Add,
    /// Subtraction, also unary negation (`-`)
    Subtract,
    /// Multiplication (`*`)
    Multiply,
    /// Division (`/`)
    Divide,
    /// Remainder (`%`)
    Modulo,
    /// Exponentiation (`^`)
    Power,

    // Comparison
    /// Equal (`==`)
    Equal,
    /// Not equal (`!=`)
    NotEqual,
    /// Greater than (`>`)
    GreaterThan,
    /// Less than (`<`)
    LessThan,
    /// Greater than or equal (`>=`)
    GreaterEqual,
    /// Less than or equal (`<=`)
    LessEqual,

    // Logical
    /// Logical AND (`&&`)
    And,
    /// Logical OR (`||`)
    Or,
    /// Boolean complement, unary (`!`)
    Not,
}

impl fmt::Display for MathOperation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let symbol = match self {
            MathOperation::Add => "+",
            MathOperation::Subtract => "-",
            MathOperation::Multiply => "*",
            MathOperation::Divide => "÷",
            MathOperation::Modulo => "%",
            MathOperation::Power => "^",
            MathOperation::Equal => "==",
            MathOperation::NotEqual => "!=",
            MathOperation::GreaterThan => ">",
            MathOperation::LessThan => "<",
            MathOperation::GreaterEqual => ">=",
            MathOperation::LessEqual => "<=",
            MathOperation::And => "&&",
            MathOperation::Or => "||",
            MathOperation::Not => "!",
        };
        f.write_str(symbol)
    }
}
