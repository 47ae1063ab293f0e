use std::fmt;

use indexmap::IndexMap;
use thiserror::Error;

use crate::value::Value;

/// Classification of a schema type, used for dispatch and diagnostics.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TypeId {
    Scope,
    Ref,
    Object,
    Map,
    List,
    Any,
    String,
    Int,
    Float,
    Bool,
}

impl TypeId {
    /// True for the three object-like kinds that are accessed by
    /// property name.
    pub fn is_object_like(&self) -> bool {
        matches!(self, TypeId::Scope | TypeId::Ref | TypeId::Object)
    }
}

impl fmt::Display for TypeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            TypeId::Scope => "scope",
            TypeId::Ref => "ref",
            TypeId::Object => "object",
            TypeId::Map => "map",
            TypeId::List => "list",
            TypeId::Any => "any",
            TypeId::String => "string",
            TypeId::Int => "integer",
            TypeId::Float => "float",
            TypeId::Bool => "boolean",
        };
        f.write_str(name)
    }
}

/// Raised when two schema types cannot be used in place of each other,
/// or when a value cannot be read as a schema's kind.
#[derive(Debug, Clone, Error, PartialEq)]
#[error("unsupported data type: expected {expected}, got {actual}")]
pub struct CompatibilityError {
    pub expected: String,
    pub actual: String,
}

/// A named property of an object-like schema.
#[derive(Debug, Clone, PartialEq)]
pub struct Property {
    schema: SchemaType,
}

impl Property {
    pub fn new(schema: SchemaType) -> Self {
        Property { schema }
    }

    pub fn schema(&self) -> &SchemaType {
        &self.schema
    }
}

/// An object-like schema: an id for diagnostics plus named properties.
/// Property order is preserved so diagnostics stay deterministic.
#[derive(Debug, Clone, PartialEq)]
pub struct ObjectSchema {
    id: String,
    properties: IndexMap<String, Property>,
}

impl ObjectSchema {
    pub fn new(id: impl Into<String>, properties: IndexMap<String, Property>) -> Self {
        ObjectSchema {
            id: id.into(),
            properties,
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn properties(&self) -> &IndexMap<String, Property> {
        &self.properties
    }
}

/// Key and value types of a map schema.
#[derive(Debug, Clone, PartialEq)]
pub struct MapSchema {
    keys: SchemaType,
    values: SchemaType,
}

impl MapSchema {
    pub fn new(keys: SchemaType, values: SchemaType) -> Self {
        MapSchema { keys, values }
    }

    pub fn keys(&self) -> &SchemaType {
        &self.keys
    }

    pub fn values(&self) -> &SchemaType {
        &self.values
    }
}

/// The schema capability set the expression core consumes.
///
/// The workflow engine's schema library is richer than this; the core
/// only needs classification, property/key/value/item traversal, and
/// compatibility checking, so that is all this models.
#[derive(Debug, Clone, PartialEq)]
pub enum SchemaType {
    Scope(ObjectSchema),
    Ref(ObjectSchema),
    Object(ObjectSchema),
    Map(Box<MapSchema>),
    List(Box<SchemaType>),
    Any,
    String,
    Int,
    Float,
    Bool,
}

impl SchemaType {
    pub fn map(keys: SchemaType, values: SchemaType) -> Self {
        SchemaType::Map(Box::new(MapSchema::new(keys, values)))
    }

    pub fn list(items: SchemaType) -> Self {
        SchemaType::List(Box::new(items))
    }

    pub fn type_id(&self) -> TypeId {
        match self {
            SchemaType::Scope(_) => TypeId::Scope,
            SchemaType::Ref(_) => TypeId::Ref,
            SchemaType::Object(_) => TypeId::Object,
            SchemaType::Map(_) => TypeId::Map,
            SchemaType::List(_) => TypeId::List,
            SchemaType::Any => TypeId::Any,
            SchemaType::String => TypeId::String,
            SchemaType::Int => TypeId::Int,
            SchemaType::Float => TypeId::Float,
            SchemaType::Bool => TypeId::Bool,
        }
    }

    /// The object-like view, for the three kinds accessed by property
    /// name.
    pub fn as_object(&self) -> Option<&ObjectSchema> {
        match self {
            SchemaType::Scope(o) | SchemaType::Ref(o) | SchemaType::Object(o) => Some(o),
            _ => None,
        }
    }

    pub fn as_map(&self) -> Option<&MapSchema> {
        match self {
            SchemaType::Map(m) => Some(m),
            _ => None,
        }
    }

    /// Item type of a list schema.
    pub fn items(&self) -> Option<&SchemaType> {
        match self {
            SchemaType::List(items) => Some(items),
            _ => None,
        }
    }

    /// Checks that a value of type `other` can be used where this type
    /// is expected. `any` is compatible in both directions; container
    /// types are checked recursively.
    pub fn validate_compatibility(&self, other: &SchemaType) -> Result<(), CompatibilityError> {
        let mismatch = || CompatibilityError {
            expected: self.to_string(),
            actual: other.to_string(),
        };
        match (self, other) {
            (SchemaType::Any, _) | (_, SchemaType::Any) => Ok(()),
            (SchemaType::Map(a), SchemaType::Map(b)) => {
                a.keys().validate_compatibility(b.keys())?;
                a.values().validate_compatibility(b.values())
            }
            (SchemaType::List(a), SchemaType::List(b)) => a.validate_compatibility(b),
            (
                SchemaType::Scope(expected) | SchemaType::Ref(expected) | SchemaType::Object(expected),
                SchemaType::Scope(actual) | SchemaType::Ref(actual) | SchemaType::Object(actual),
            ) => {
                for (name, property) in expected.properties() {
                    let other_property =
                        actual.properties().get(name).ok_or_else(|| mismatch())?;
                    property
                        .schema()
                        .validate_compatibility(other_property.schema())?;
                }
                Ok(())
            }
            _ if self.type_id() == other.type_id() => Ok(()),
            _ => Err(mismatch()),
        }
    }

    /// Reads a literal value as this schema's kind, coercing from a
    /// string form where that is unambiguous. Used to normalize
    /// concrete bracket keys.
    pub fn unserialize(&self, value: &Value) -> Result<Value, CompatibilityError> {
        let mismatch = || CompatibilityError {
            expected: self.to_string(),
            actual: value.type_name().to_string(),
        };
        match (self, value) {
            (SchemaType::Any, v) => Ok(v.clone()),
            (SchemaType::Int, Value::Int(_))
            | (SchemaType::Float, Value::Float(_))
            | (SchemaType::Bool, Value::Bool(_))
            | (SchemaType::String, Value::String(_)) => Ok(value.clone()),
            (SchemaType::Int, Value::String(s)) => {
                s.parse::<i64>().map(Value::Int).map_err(|_| mismatch())
            }
            (SchemaType::Float, Value::String(s)) => {
                s.parse::<f64>().map(Value::Float).map_err(|_| mismatch())
            }
            (SchemaType::Float, Value::Int(n)) => Ok(Value::Float(*n as f64)),
            (SchemaType::Bool, Value::String(s)) => match s.as_str() {
                "true" => Ok(Value::Bool(true)),
                "false" => Ok(Value::Bool(false)),
                _ => Err(mismatch()),
            },
            (SchemaType::String, Value::Int(n)) => Ok(Value::String(n.to_string())),
            (SchemaType::String, Value::Float(n)) => Ok(Value::String(n.to_string())),
            (SchemaType::String, Value::Bool(b)) => Ok(Value::String(b.to_string())),
            _ => Err(mismatch()),
        }
    }
}

impl fmt::Display for SchemaType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SchemaType::Scope(o) | SchemaType::Ref(o) | SchemaType::Object(o) => {
                f.write_str(o.id())
            }
            SchemaType::Map(m) => write!(f, "map[{}]{}", m.keys(), m.values()),
            SchemaType::List(items) => write!(f, "list[{}]", items),
            _ => write!(f, "{}", self.type_id()),
        }
    }
}

/// Builds an object schema from `(name, type)` pairs.
pub fn object_schema<const N: usize>(
    id: &str,
    properties: [(&str, SchemaType); N],
) -> ObjectSchema {
    ObjectSchema::new(
        id,
        properties
            .into_iter()
            .map(|(name, schema)| (name.to_string(), Property::new(schema)))
            .collect(),
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn any_is_compatible_both_ways() {
        assert!(SchemaType::Any.validate_compatibility(&SchemaType::Int).is_ok());
        assert!(SchemaType::Int.validate_compatibility(&SchemaType::Any).is_ok());
    }

    #[test]
    fn mismatch_names_both_types() {
        let err = SchemaType::Int
            .validate_compatibility(&SchemaType::String)
            .unwrap_err();
        assert!(err.to_string().contains("unsupported data type"));
        assert!(err.to_string().contains("integer"));
        assert!(err.to_string().contains("string"));
    }

    #[test]
    fn object_like_kinds() {
        assert!(TypeId::Scope.is_object_like());
        assert!(TypeId::Ref.is_object_like());
        assert!(TypeId::Object.is_object_like());
        assert!(!TypeId::Map.is_object_like());
        assert!(!TypeId::Any.is_object_like());
        assert!(!TypeId::Int.is_object_like());
    }

    #[test]
    fn unserialize_coerces_string_keys() {
        assert_eq!(
            SchemaType::Int.unserialize(&Value::String("42".into())),
            Ok(Value::Int(42))
        );
        assert!(SchemaType::Int.unserialize(&Value::String("x".into())).is_err());
    }
}
