use std::fmt;

use crate::value::Value;

/// One segment of a dependency path. Segments are usually property
/// names, but bracket keys can contribute integers, floats, and
/// booleans.
#[derive(Debug, Clone, PartialEq)]
pub enum PathItem {
    Str(String),
    Int(i64),
    Float(f64),
    Bool(bool),
}

impl PathItem {
    /// Converts a literal value into a path segment. Lists and maps do
    /// not appear as path segments.
    pub fn from_value(value: &Value) -> Option<PathItem> {
        match value {
            Value::String(s) => Some(PathItem::Str(s.clone())),
            Value::Int(n) => Some(PathItem::Int(*n)),
            Value::Float(n) => Some(PathItem::Float(*n)),
            Value::Bool(b) => Some(PathItem::Bool(*b)),
            _ => None,
        }
    }
}

impl fmt::Display for PathItem {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PathItem::Str(s) => f.write_str(s),
            PathItem::Int(n) => write!(f, "{}", n),
            PathItem::Float(n) => write!(f, "{}", n),
            PathItem::Bool(b) => write!(f, "{}", b),
        }
    }
}

impl From<&str> for PathItem {
    fn from(s: &str) -> Self {
        PathItem::Str(s.to_string())
    }
}

impl From<String> for PathItem {
    fn from(s: String) -> Self {
        PathItem::Str(s)
    }
}

impl From<i64> for PathItem {
    fn from(n: i64) -> Self {
        PathItem::Int(n)
    }
}

/// The path to one value an expression depends on, as segments from a
/// data or function root.
#[derive(Debug, Clone, PartialEq)]
pub struct Path(pub Vec<PathItem>);

impl fmt::Display for Path {
    /// The dot-concatenated form, itself a valid accessor expression
    /// for string segments.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, item) in self.0.iter().enumerate() {
            if i > 0 {
                f.write_str(".")?;
            }
            write!(f, "{}", item)?;
        }
        Ok(())
    }
}

/// What a path-tree node represents, which decides how unpacking
/// treats it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PathNodeKind {
    /// The `$` root of the data tree. Always a tree root.
    DataRoot,
    /// A function call; named after the function. Always a tree root.
    Function,
    /// A schema-validated property access.
    Access,
    /// A concrete bracket key recorded from a literal. Elidable.
    Key,
    /// Descent into an `any`-typed value; nothing below is
    /// schema-validated.
    PastTerminal,
}

/// Controls which parts of a path tree are turned into flat paths.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct UnpackRequirements {
    /// Drop trees rooted at the data root.
    pub exclude_data_root_paths: bool,
    /// Drop trees rooted at a function call.
    pub exclude_function_root_paths: bool,
    /// Cut paths where they descend into an `any`-typed value.
    pub stop_at_terminals: bool,
    /// Keep concrete bracket keys as path segments.
    pub include_keys: bool,
}

impl UnpackRequirements {
    /// A stopped node is dropped together with its whole subtree.
    fn should_stop(&self, kind: PathNodeKind) -> bool {
        match kind {
            PathNodeKind::DataRoot => self.exclude_data_root_paths,
            PathNodeKind::Function => self.exclude_function_root_paths,
            PathNodeKind::PastTerminal => self.stop_at_terminals,
            PathNodeKind::Access | PathNodeKind::Key => false,
        }
    }

    /// A skipped node omits its own segment but carries its subtree's
    /// paths up.
    fn should_skip(&self, kind: PathNodeKind) -> bool {
        kind == PathNodeKind::Key && !self.include_keys
    }
}

/// Holds multiple dependency paths in a branching fashion.
#[derive(Debug, Clone, PartialEq)]
pub struct PathTree {
    pub item: PathItem,
    pub kind: PathNodeKind,
    pub subtrees: Vec<PathTree>,
}

impl PathTree {
    pub fn new(item: impl Into<PathItem>, kind: PathNodeKind) -> Self {
        PathTree {
            item: item.into(),
            kind,
            subtrees: Vec::new(),
        }
    }

    /// Unpacks the tree into one flat path per retained leaf.
    ///
    /// Depth first: a stopped node drops itself and its descendants, a
    /// skipped node contributes only its subtrees' paths, and a node
    /// whose children produced nothing emits a path ending at itself.
    pub fn unpack(&self, requirements: &UnpackRequirements) -> Vec<Path> {
        if requirements.should_stop(self.kind) {
            return Vec::new();
        }
        let skip_self = requirements.should_skip(self.kind);

        let mut result = Vec::new();
        for subtree in &self.subtrees {
            for sub_path in subtree.unpack(requirements) {
                if skip_self {
                    result.push(sub_path);
                } else {
                    let mut items = Vec::with_capacity(sub_path.0.len() + 1);
                    items.push(self.item.clone());
                    items.extend(sub_path.0);
                    result.push(Path(items));
                }
            }
        }
        if result.is_empty() && !skip_self {
            result.push(Path(vec![self.item.clone()]));
        }
        result
    }
}
