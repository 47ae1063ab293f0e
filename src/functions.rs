use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use crate::schema::SchemaType;
use crate::value::Value;

/// Registry of host-provided functions, keyed by call name.
pub type FunctionMap = HashMap<String, Function>;

type CallHandler = Arc<dyn Fn(Vec<Value>) -> Result<Value, String> + Send + Sync>;
type OutputHandler = Arc<dyn Fn(&[SchemaType]) -> Result<SchemaType, String> + Send + Sync>;

/// How a function's return type is determined at resolve time.
#[derive(Clone)]
enum FunctionOutput {
    /// A fixed return type; `None` for void functions.
    Static(Option<SchemaType>),
    /// Computed from the argument types, for functions whose return
    /// type follows their input (identity, list-of, ...).
    Dynamic(OutputHandler),
}

/// A host-registered callable the expression language can invoke.
///
/// Handlers must be `Send + Sync` so that a parsed expression and its
/// registry can be shared across threads.
#[derive(Clone)]
pub struct Function {
    id: String,
    parameters: Vec<SchemaType>,
    output: FunctionOutput,
    handler: CallHandler,
}

impl Function {
    /// A function with a fixed output type (`None` means void).
    pub fn new(
        id: impl Into<String>,
        parameters: Vec<SchemaType>,
        output: Option<SchemaType>,
        handler: impl Fn(Vec<Value>) -> Result<Value, String> + Send + Sync + 'static,
    ) -> Self {
        Function {
            id: id.into(),
            parameters,
            output: FunctionOutput::Static(output),
            handler: Arc::new(handler),
        }
    }

    /// A function whose output type is computed from its argument
    /// types at resolve time.
    pub fn new_dynamic(
        id: impl Into<String>,
        parameters: Vec<SchemaType>,
        output: impl Fn(&[SchemaType]) -> Result<SchemaType, String> + Send + Sync + 'static,
        handler: impl Fn(Vec<Value>) -> Result<Value, String> + Send + Sync + 'static,
    ) -> Self {
        Function {
            id: id.into(),
            parameters,
            output: FunctionOutput::Dynamic(Arc::new(output)),
            handler: Arc::new(handler),
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn parameters(&self) -> &[SchemaType] {
        &self.parameters
    }

    /// The return type for a call with the given argument types, or
    /// `None` for void.
    pub fn output(&self, arg_types: &[SchemaType]) -> Result<Option<SchemaType>, String> {
        match &self.output {
            FunctionOutput::Static(output) => Ok(output.clone()),
            FunctionOutput::Dynamic(handler) => handler(arg_types).map(Some),
        }
    }

    /// Invokes the handler. Arity is validated by the caller so the
    /// error message can carry call-site context.
    pub fn call(&self, args: Vec<Value>) -> Result<Value, String> {
        (self.handler)(args)
    }
}

impl fmt::Display for Function {
    /// The callable signature used in diagnostics, e.g.
    /// `multiply(integer, integer) integer` or `log(string) void`.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}(", self.id)?;
        for (i, parameter) in self.parameters.iter().enumerate() {
            if i > 0 {
                f.write_str(", ")?;
            }
            write!(f, "{}", parameter)?;
        }
        f.write_str(") ")?;
        match &self.output {
            FunctionOutput::Static(Some(output)) => write!(f, "{}", output),
            FunctionOutput::Static(None) => f.write_str("void"),
            FunctionOutput::Dynamic(_) => f.write_str("dynamic"),
        }
    }
}

impl fmt::Debug for Function {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Function({})", self)
    }
}
