use thiserror::Error;
use tracing::trace;

use crate::ast::{Expr, MathOperation};
use crate::expression::WorkflowContext;
use crate::functions::FunctionMap;
use crate::path::{PathItem, PathNodeKind, PathTree};
use crate::schema::{SchemaType, TypeId};

/// Schema-checking failures raised while resolving an expression's
/// type and dependencies.
#[derive(Debug, Clone, Error, PartialEq)]
pub enum ResolveError {
    #[error("object {object_id} does not have a property named {property:?}")]
    UnknownProperty { object_id: String, property: String },

    #[error("cannot evaluate expression identifier {identifier} on data type {type_id}")]
    UnsupportedAccess {
        identifier: String,
        type_id: TypeId,
    },

    #[error("root access chained after non-root")]
    RootAfterNonRoot,

    #[error("could not find function '{0}'")]
    UnknownFunction(String),

    #[error(
        "invalid call to function '{id}'. Expected {expected} args, got {actual} args. Function schema: {schema}"
    )]
    FunctionArity {
        id: String,
        expected: usize,
        actual: usize,
        schema: String,
    },

    #[error(
        "error while validating arg/param type compatibility for function '{id}' at 0-index {index} ({message}). Function schema: {schema}"
    )]
    IncompatibleArgument {
        id: String,
        index: usize,
        message: String,
        schema: String,
    },

    #[error("error while getting return type of function '{id}' ({message})")]
    FunctionOutput { id: String, message: String },

    #[error("bracket access is not supported for {0} types; use dot notation to access object properties")]
    BracketOnObject(TypeId),

    #[error("subexpression evaluates to type '{actual}' for a map key, '{expected}' expected")]
    MapKeyType { actual: TypeId, expected: TypeId },

    #[error("subexpression resulted in a {0} type for a list key, integer expected")]
    ListKeyType(TypeId),

    #[error("bracket subexpressions are only supported on map, list, and any types, {0} given")]
    BracketUnsupported(TypeId),

    #[error("could not normalize literal map key ({message})")]
    KeyCoercion { message: String },

    #[error("operand types do not match for operation '{op}': {left} and {right}")]
    OperandTypeMismatch {
        op: MathOperation,
        left: TypeId,
        right: TypeId,
    },

    #[error("attempted logical operation '{op}' on non-boolean type {type_id}")]
    NonBooleanOperand {
        op: MathOperation,
        type_id: TypeId,
    },

    #[error("attempted numeric operation '{op}' on non-numeric type {type_id}")]
    NonNumericOperand {
        op: MathOperation,
        type_id: TypeId,
    },

    #[error("attempted quantity inequality comparison operation '{op}' on boolean operands")]
    QuantityComparisonOnBool { op: MathOperation },

    #[error("incompatible type {type_id} for operation '{op}'")]
    IncompatibleOperand {
        op: MathOperation,
        type_id: TypeId,
    },

    #[error("attempted boolean complement on non-boolean type {0}")]
    NonBooleanComplement(TypeId),

    #[error("attempted arithmetic negation on non-numeric type {0}")]
    NonNumericNegation(TypeId),

    #[error("void function result cannot be used as a value")]
    VoidResult,
}

/// Outcome of resolving one AST node.
///
/// `chainable_path` is the tree node further dot/bracket segments
/// extend; `root_path` is the root of the tree that node lives in;
/// `completed_paths` are finished dependency trees contributed by
/// re-rooted subexpressions (function arguments, bracket keys, operator
/// operands).
#[derive(Debug)]
struct DependencyResult {
    resolved_type: Option<SchemaType>,
    chainable_path: Option<NodeId>,
    root_path: Option<NodeId>,
    completed_paths: Vec<NodeId>,
}

impl DependencyResult {
    fn of_type(schema: SchemaType) -> Self {
        DependencyResult {
            resolved_type: Some(schema),
            chainable_path: None,
            root_path: None,
            completed_paths: Vec::new(),
        }
    }
}

type NodeId = usize;

/// Append-only path-tree storage. Chainable paths are node ids, so a
/// tree can keep growing while earlier references into it stay valid.
#[derive(Debug, Default)]
struct PathArena {
    nodes: Vec<ArenaNode>,
}

#[derive(Debug)]
struct ArenaNode {
    item: PathItem,
    kind: PathNodeKind,
    children: Vec<NodeId>,
}

impl PathArena {
    fn add_root(&mut self, item: impl Into<PathItem>, kind: PathNodeKind) -> NodeId {
        self.nodes.push(ArenaNode {
            item: item.into(),
            kind,
            children: Vec::new(),
        });
        self.nodes.len() - 1
    }

    fn add_child(&mut self, parent: NodeId, item: impl Into<PathItem>, kind: PathNodeKind) -> NodeId {
        let child = self.add_root(item, kind);
        self.nodes[parent].children.push(child);
        child
    }

    fn kind(&self, id: NodeId) -> PathNodeKind {
        self.nodes[id].kind
    }

    fn to_tree(&self, id: NodeId) -> PathTree {
        let node = &self.nodes[id];
        PathTree {
            item: node.item.clone(),
            kind: node.kind,
            subtrees: node.children.iter().map(|child| self.to_tree(*child)).collect(),
        }
    }
}

/// Resolves the static type of an expression against a schema.
pub fn resolve_type(
    node: &Expr,
    root_type: &SchemaType,
    functions: &FunctionMap,
    workflow_context: &WorkflowContext,
) -> Result<Option<SchemaType>, ResolveError> {
    trace!(expression = %node, "resolving expression type");
    let mut context = DependencyContext::new(root_type, functions, workflow_context);
    let result = context.root_dependencies(node)?;
    Ok(result.resolved_type)
}

/// Resolves the dependency trees of an expression against a schema.
/// The caller unpacks them into flat paths with its own
/// [`crate::path::UnpackRequirements`].
pub fn resolve_dependency_trees(
    node: &Expr,
    root_type: &SchemaType,
    functions: &FunctionMap,
    workflow_context: &WorkflowContext,
) -> Result<Vec<PathTree>, ResolveError> {
    trace!(expression = %node, "resolving expression dependencies");
    let mut context = DependencyContext::new(root_type, functions, workflow_context);
    let result = context.root_dependencies(node)?;
    Ok(result
        .completed_paths
        .iter()
        .map(|id| context.arena.to_tree(*id))
        .collect())
}

/// Holds the root schema and registries for one resolution pass, so
/// the recursion does not have to pass them along every call.
struct DependencyContext<'a> {
    root_type: &'a SchemaType,
    functions: &'a FunctionMap,
    // Threaded for downstream extensions; the core never reads it.
    _workflow_context: &'a WorkflowContext,
    arena: PathArena,
}

impl<'a> DependencyContext<'a> {
    fn new(
        root_type: &'a SchemaType,
        functions: &'a FunctionMap,
        workflow_context: &'a WorkflowContext,
    ) -> Self {
        DependencyContext {
            root_type,
            functions,
            _workflow_context: workflow_context,
            arena: PathArena::default(),
        }
    }

    /// Resolves a node as its own dependency tree, rooted at a fresh
    /// data root. When the node actually touched data (or produced a
    /// function root), the tree it is rooted in becomes a completed
    /// path.
    fn root_dependencies(&mut self, node: &Expr) -> Result<DependencyResult, ResolveError> {
        let root = self.arena.add_root("$", PathNodeKind::DataRoot);
        let mut result = self.dependencies(node, self.root_type, Some(root), Some(root))?;
        if result.chainable_path.is_some() {
            if let Some(root_path) = result.root_path {
                result.completed_paths.push(root_path);
            }
        }
        Ok(result)
    }

    /// Walks an AST node, computing its schema type while extending
    /// the path tree with the accesses it performs.
    ///
    /// - `current_type`: the schema the node is evaluated against.
    /// - `path`: the chainable tree node accesses extend.
    /// - `root`: the root of the tree `path` belongs to.
    fn dependencies(
        &mut self,
        node: &Expr,
        current_type: &SchemaType,
        path: Option<NodeId>,
        root: Option<NodeId>,
    ) -> Result<DependencyResult, ResolveError> {
        match node {
            Expr::Int(_) => Ok(DependencyResult::of_type(SchemaType::Int)),
            Expr::Float(_) => Ok(DependencyResult::of_type(SchemaType::Float)),
            Expr::Str(_) => Ok(DependencyResult::of_type(SchemaType::String)),
            Expr::Bool(_) => Ok(DependencyResult::of_type(SchemaType::Bool)),
            Expr::Identifier(name) => self.identifier_dependencies(name, current_type, path, root),
            Expr::DotNotation { left, right } => {
                self.dot_notation_dependencies(left, right, current_type, path, root)
            }
            Expr::BracketAccessor { left, right } => {
                self.bracket_accessor_dependencies(left, right, current_type, path, root)
            }
            Expr::FunctionCall { identifier, args } => self.function_dependencies(identifier, args),
            Expr::BinaryOperation { op, left, right } => {
                self.binary_operation_dependencies(*op, left, right)
            }
            Expr::UnaryOperation { op, right } => self.unary_operation_dependencies(*op, right),
        }
    }

    fn identifier_dependencies(
        &mut self,
        name: &str,
        current_type: &SchemaType,
        path: Option<NodeId>,
        root: Option<NodeId>,
    ) -> Result<DependencyResult, ResolveError> {
        if name == "$" {
            // The root sentinel is only valid at the start of a chain.
            match path {
                Some(id) if self.arena.kind(id) == PathNodeKind::DataRoot => Ok(DependencyResult {
                    resolved_type: Some(self.root_type.clone()),
                    chainable_path: path,
                    root_path: root,
                    completed_paths: Vec::new(),
                }),
                _ => Err(ResolveError::RootAfterNonRoot),
            }
        } else {
            self.access_object(current_type, name, path, root)
        }
    }

    /// Reads the object-like type on the left to determine the type of
    /// the property referenced, extending the path by one segment.
    fn access_object(
        &mut self,
        left_type: &SchemaType,
        identifier: &str,
        path: Option<NodeId>,
        root: Option<NodeId>,
    ) -> Result<DependencyResult, ResolveError> {
        match left_type {
            SchemaType::Scope(object) | SchemaType::Ref(object) | SchemaType::Object(object) => {
                let property = object.properties().get(identifier).ok_or_else(|| {
                    ResolveError::UnknownProperty {
                        object_id: object.id().to_string(),
                        property: identifier.to_string(),
                    }
                })?;
                let segment = self.append_segment(path, identifier, PathNodeKind::Access);
                Ok(DependencyResult {
                    resolved_type: Some(property.schema().clone()),
                    chainable_path: Some(segment),
                    root_path: root,
                    completed_paths: Vec::new(),
                })
            }
            SchemaType::Any => {
                // Access into an unvalidated value. The segment is
                // recorded as past-terminal so unpacking can cut it.
                let segment = self.append_segment(path, identifier, PathNodeKind::PastTerminal);
                Ok(DependencyResult {
                    resolved_type: Some(SchemaType::Any),
                    chainable_path: Some(segment),
                    root_path: root,
                    completed_paths: Vec::new(),
                })
            }
            other => Err(ResolveError::UnsupportedAccess {
                identifier: identifier.to_string(),
                type_id: other.type_id(),
            }),
        }
    }

    fn append_segment(
        &mut self,
        path: Option<NodeId>,
        item: impl Into<PathItem>,
        kind: PathNodeKind,
    ) -> NodeId {
        match path {
            Some(parent) => self.arena.add_child(parent, item, kind),
            None => self.arena.add_root(item, kind),
        }
    }

    /// `left.right`: resolve the left side, then resolve the right
    /// identifier against the left's type, extending the same path.
    fn dot_notation_dependencies(
        &mut self,
        left: &Expr,
        right: &Expr,
        current_type: &SchemaType,
        path: Option<NodeId>,
        root: Option<NodeId>,
    ) -> Result<DependencyResult, ResolveError> {
        let left_result = self.dependencies(left, current_type, path, root)?;
        let left_type = require_type(&left_result)?;
        let right_result = self.dependencies(
            right,
            &left_type,
            left_result.chainable_path,
            left_result.root_path.or(root),
        )?;
        let mut completed_paths = left_result.completed_paths;
        completed_paths.extend(right_result.completed_paths);
        Ok(DependencyResult {
            resolved_type: right_result.resolved_type,
            chainable_path: right_result.chainable_path,
            root_path: right_result.root_path,
            completed_paths,
        })
    }

    /// `left[expr]`: resolve the left side as usual; the bracket
    /// subexpression is its own dependency subtree, resolved from the
    /// root, and its type is checked against the container's key type.
    fn bracket_accessor_dependencies(
        &mut self,
        left: &Expr,
        key_expr: &Expr,
        current_type: &SchemaType,
        path: Option<NodeId>,
        root: Option<NodeId>,
    ) -> Result<DependencyResult, ResolveError> {
        let left_result = self.dependencies(left, current_type, path, root)?;
        let left_type = require_type(&left_result)?;

        let key_result = self.root_dependencies(key_expr)?;
        let key_type = require_type(&key_result)?;

        let mut completed_paths = left_result.completed_paths;
        completed_paths.extend(key_result.completed_paths);

        let resolved_type = match &left_type {
            SchemaType::Map(map) => {
                // Compare the subexpression's type with the key type so
                // the lookup cannot fail on types at runtime.
                if key_type.type_id() != map.keys().type_id() {
                    return Err(ResolveError::MapKeyType {
                        actual: key_type.type_id(),
                        expected: map.keys().type_id(),
                    });
                }
                map.values().clone()
            }
            SchemaType::List(items) => {
                if key_type.type_id() != TypeId::Int {
                    return Err(ResolveError::ListKeyType(key_type.type_id()));
                }
                items.as_ref().clone()
            }
            SchemaType::Any => SchemaType::Any,
            // Picking object properties with a subexpression would make
            // type evaluation impossible, so it is rejected outright.
            SchemaType::Scope(_) | SchemaType::Ref(_) | SchemaType::Object(_) => {
                return Err(ResolveError::BracketOnObject(left_type.type_id()))
            }
            other => return Err(ResolveError::BracketUnsupported(other.type_id())),
        };

        // A concrete key is recorded on the path so consumers that want
        // exact per-key dependencies can see it.
        let mut chainable_path = left_result.chainable_path;
        if let (Some(parent), Some(literal)) = (chainable_path, key_expr.literal_value()) {
            let key_value = match &left_type {
                SchemaType::Map(map) => map
                    .keys()
                    .unserialize(&literal)
                    .map_err(|e| ResolveError::KeyCoercion {
                        message: e.to_string(),
                    })?,
                _ => literal,
            };
            if let Some(item) = PathItem::from_value(&key_value) {
                chainable_path = Some(self.arena.add_child(parent, item, PathNodeKind::Key));
            }
        }

        Ok(DependencyResult {
            resolved_type: Some(resolved_type),
            chainable_path,
            root_path: left_result.root_path,
            completed_paths,
        })
    }

    /// A function call starts a fresh tree rooted at the function's
    /// name; its arguments are each their own dependency subtree.
    fn function_dependencies(
        &mut self,
        identifier: &str,
        args: &[Expr],
    ) -> Result<DependencyResult, ResolveError> {
        let function = self
            .functions
            .get(identifier)
            .ok_or_else(|| ResolveError::UnknownFunction(identifier.to_string()))?;
        let parameters = function.parameters();
        if args.len() != parameters.len() {
            return Err(ResolveError::FunctionArity {
                id: function.id().to_string(),
                expected: parameters.len(),
                actual: args.len(),
                schema: function.to_string(),
            });
        }

        let mut completed_paths = Vec::new();
        let mut arg_types = Vec::with_capacity(args.len());
        for (index, arg) in args.iter().enumerate() {
            let arg_result = self.root_dependencies(arg)?;
            let arg_type = require_type(&arg_result)?;
            parameters[index]
                .validate_compatibility(&arg_type)
                .map_err(|e| ResolveError::IncompatibleArgument {
                    id: function.id().to_string(),
                    index,
                    message: e.to_string(),
                    schema: function.to_string(),
                })?;
            arg_types.push(arg_type);
            completed_paths.extend(arg_result.completed_paths);
        }

        let output = function
            .output(&arg_types)
            .map_err(|message| ResolveError::FunctionOutput {
                id: function.id().to_string(),
                message,
            })?;

        let function_root = self
            .arena
            .add_root(function.id().to_string(), PathNodeKind::Function);
        Ok(DependencyResult {
            resolved_type: output,
            chainable_path: Some(function_root),
            root_path: Some(function_root),
            completed_paths,
        })
    }

    /// Both operands are re-rooted; the operation itself adds no path
    /// segment and cannot be chained.
    fn binary_operation_dependencies(
        &mut self,
        op: MathOperation,
        left: &Expr,
        right: &Expr,
    ) -> Result<DependencyResult, ResolveError> {
        let left_result = self.root_dependencies(left)?;
        let right_result = self.root_dependencies(right)?;
        let left_type = require_type(&left_result)?;
        let right_type = require_type(&right_result)?;

        let resolved_type =
            binary_operation_type(op, left_type.type_id(), right_type.type_id())?;

        let mut completed_paths = left_result.completed_paths;
        completed_paths.extend(right_result.completed_paths);
        Ok(DependencyResult {
            resolved_type: Some(resolved_type),
            chainable_path: None,
            root_path: None,
            completed_paths,
        })
    }

    fn unary_operation_dependencies(
        &mut self,
        op: MathOperation,
        right: &Expr,
    ) -> Result<DependencyResult, ResolveError> {
        let right_result = self.root_dependencies(right)?;
        let right_type = require_type(&right_result)?;
        let resolved_type = match op {
            MathOperation::Not => match right_type.type_id() {
                TypeId::Bool => SchemaType::Bool,
                other => return Err(ResolveError::NonBooleanComplement(other)),
            },
            MathOperation::Subtract => match right_type.type_id() {
                TypeId::Int => SchemaType::Int,
                TypeId::Float => SchemaType::Float,
                other => return Err(ResolveError::NonNumericNegation(other)),
            },
            other => unreachable!("'{}' is not a unary operator", other),
        };
        Ok(DependencyResult {
            resolved_type: Some(resolved_type),
            chainable_path: None,
            root_path: None,
            completed_paths: right_result.completed_paths,
        })
    }
}

fn require_type(result: &DependencyResult) -> Result<SchemaType, ResolveError> {
    result.resolved_type.clone().ok_or(ResolveError::VoidResult)
}

/// Static typing rules for binary operations. Operand types must match
/// exactly; the language performs no coercion.
fn binary_operation_type(
    op: MathOperation,
    left: TypeId,
    right: TypeId,
) -> Result<SchemaType, ResolveError> {
    use MathOperation::*;

    if left != right {
        return Err(ResolveError::OperandTypeMismatch { op, left, right });
    }
    let operand = left;
    match op {
        And | Or => match operand {
            TypeId::Bool => Ok(SchemaType::Bool),
            TypeId::Int | TypeId::Float | TypeId::String => {
                Err(ResolveError::NonBooleanOperand {
                    op,
                    type_id: operand,
                })
            }
            _ => Err(ResolveError::IncompatibleOperand {
                op,
                type_id: operand,
            }),
        },
        Equal | NotEqual => match operand {
            TypeId::Int | TypeId::Float | TypeId::String | TypeId::Bool => Ok(SchemaType::Bool),
            _ => Err(ResolveError::IncompatibleOperand {
                op,
                type_id: operand,
            }),
        },
        GreaterThan | LessThan | GreaterEqual | LessEqual => match operand {
            TypeId::Int | TypeId::Float | TypeId::String => Ok(SchemaType::Bool),
            TypeId::Bool => Err(ResolveError::QuantityComparisonOnBool { op }),
            _ => Err(ResolveError::IncompatibleOperand {
                op,
                type_id: operand,
            }),
        },
        Add => match operand {
            TypeId::Int => Ok(SchemaType::Int),
            TypeId::Float => Ok(SchemaType::Float),
            TypeId::String => Ok(SchemaType::String),
            TypeId::Bool => Err(ResolveError::NonNumericOperand {
                op,
                type_id: operand,
            }),
            _ => Err(ResolveError::IncompatibleOperand {
                op,
                type_id: operand,
            }),
        },
        Subtract | Multiply | Divide | Modulo | Power => match operand {
            TypeId::Int => Ok(SchemaType::Int),
            TypeId::Float => Ok(SchemaType::Float),
            TypeId::String | TypeId::Bool => Err(ResolveError::NonNumericOperand {
                op,
                type_id: operand,
            }),
            _ => Err(ResolveError::IncompatibleOperand {
                op,
                type_id: operand,
            }),
        },
        Not => unreachable!("'!' is not a binary operator"),
    }
}
