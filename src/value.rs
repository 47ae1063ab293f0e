use std::collections::hash_map::DefaultHasher;
use std::fmt;
use std::hash::{Hash, Hasher};

use indexmap::IndexMap;

/// Insertion-ordered map used for object-like runtime data. Keys are
/// values themselves so that integer-keyed maps work without coercion.
pub type ValueMap = IndexMap<Value, Value>;

/// A runtime value handled by the evaluator.
///
/// This is the untyped data model the expression language operates on:
/// all JSON shapes, with integers and floats kept distinct because the
/// language performs no numeric coercion.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Null,
    Bool(bool),
    Int(i64),
    Float(f64),
    String(String),
    List(Vec<Value>),
    Map(ValueMap),
}

// Equality is total for our purposes: floats are compared with IEEE
// semantics and never used as NaN map keys by the language itself.
impl Eq for Value {}

impl Hash for Value {
    fn hash<H: Hasher>(&self, state: &mut H) {
        std::mem::discriminant(self).hash(state);
        match self {
            Value::Null => {}
            Value::Bool(b) => b.hash(state),
            Value::Int(n) => n.hash(state),
            Value::Float(n) => n.to_bits().hash(state),
            Value::String(s) => s.hash(state),
            Value::List(items) => items.hash(state),
            Value::Map(entries) => {
                // Map equality ignores insertion order, so the hash has
                // to as well: per-entry hashes are combined
                // commutatively.
                state.write_usize(entries.len());
                let mut combined: u64 = 0;
                for (k, v) in entries {
                    let mut entry_hasher = DefaultHasher::new();
                    k.hash(&mut entry_hasher);
                    v.hash(&mut entry_hasher);
                    combined ^= entry_hasher.finish();
                }
                state.write_u64(combined);
            }
        }
    }
}

impl Value {
    /// Human-readable type name used in diagnostics.
    pub fn type_name(&self) -> &'static str {
        match self {
            Value::Null => "null",
            Value::Bool(_) => "boolean",
            Value::Int(_) => "integer",
            Value::Float(_) => "float",
            Value::String(_) => "string",
            Value::List(_) => "list",
            Value::Map(_) => "map",
        }
    }

    pub fn as_int(&self) -> Option<i64> {
        match self {
            Value::Int(n) => Some(*n),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::String(s) => Some(s),
            _ => None,
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Null => f.write_str("null"),
            Value::Bool(b) => write!(f, "{}", b),
            Value::Int(n) => write!(f, "{}", n),
            Value::Float(n) => write!(f, "{}", n),
            Value::String(s) => f.write_str(s),
            Value::List(items) => {
                f.write_str("[")?;
                for (i, item) in items.iter().enumerate() {
                    if i > 0 {
                        f.write_str(", ")?;
                    }
                    write!(f, "{}", item)?;
                }
                f.write_str("]")
            }
            Value::Map(entries) => {
                f.write_str("{")?;
                for (i, (k, v)) in entries.iter().enumerate() {
                    if i > 0 {
                        f.write_str(", ")?;
                    }
                    write!(f, "{}: {}", k, v)?;
                }
                f.write_str("}")
            }
        }
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::Bool(b)
    }
}

impl From<i64> for Value {
    fn from(n: i64) -> Self {
        Value::Int(n)
    }
}

impl From<f64> for Value {
    fn from(n: f64) -> Self {
        Value::Float(n)
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::String(s.to_string())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::String(s)
    }
}

impl<T: Into<Value>> From<Vec<T>> for Value {
    fn from(items: Vec<T>) -> Self {
        Value::List(items.into_iter().map(Into::into).collect())
    }
}

impl From<serde_json::Value> for Value {
    fn from(v: serde_json::Value) -> Self {
        match v {
            serde_json::Value::Null => Value::Null,
            serde_json::Value::Bool(b) => Value::Bool(b),
            serde_json::Value::Number(n) => {
                if let Some(i) = n.as_i64() {
                    Value::Int(i)
                } else {
                    Value::Float(n.as_f64().unwrap_or(f64::NAN))
                }
            }
            serde_json::Value::String(s) => Value::String(s),
            serde_json::Value::Array(items) => {
                Value::List(items.into_iter().map(Value::from).collect())
            }
            serde_json::Value::Object(entries) => Value::Map(
                entries
                    .into_iter()
                    .map(|(k, v)| (Value::String(k), Value::from(v)))
                    .collect(),
            ),
        }
    }
}

impl From<Value> for serde_json::Value {
    fn from(v: Value) -> Self {
        match v {
            Value::Null => serde_json::Value::Null,
            Value::Bool(b) => serde_json::Value::Bool(b),
            Value::Int(n) => serde_json::Value::Number(n.into()),
            Value::Float(n) => serde_json::Number::from_f64(n)
                .map(serde_json::Value::Number)
                .unwrap_or(serde_json::Value::Null),
            Value::String(s) => serde_json::Value::String(s),
            Value::List(items) => {
                serde_json::Value::Array(items.into_iter().map(Into::into).collect())
            }
            Value::Map(entries) => serde_json::Value::Object(
                entries
                    .into_iter()
                    .map(|(k, v)| (k.to_string(), serde_json::Value::from(v)))
                    .collect(),
            ),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn json_round_trip_preserves_integers() {
        let value = Value::from(json!({"count": 3, "ratio": 0.5}));
        let Value::Map(map) = &value else {
            panic!("expected a map");
        };
        assert_eq!(map.get(&Value::from("count")), Some(&Value::Int(3)));
        assert_eq!(map.get(&Value::from("ratio")), Some(&Value::Float(0.5)));
        assert_eq!(serde_json::Value::from(value), json!({"count": 3, "ratio": 0.5}));
    }

    #[test]
    fn int_keyed_maps_survive_lookup() {
        let mut map = ValueMap::new();
        map.insert(Value::Int(2), Value::from("two"));
        assert_eq!(map.get(&Value::Int(2)), Some(&Value::from("two")));
    }

    #[test]
    fn equal_maps_hash_equal_regardless_of_insertion_order() {
        let mut forward = ValueMap::new();
        forward.insert(Value::from("a"), Value::Int(1));
        forward.insert(Value::from("b"), Value::Int(2));
        let mut reverse = ValueMap::new();
        reverse.insert(Value::from("b"), Value::Int(2));
        reverse.insert(Value::from("a"), Value::Int(1));

        let forward = Value::Map(forward);
        let reverse = Value::Map(reverse);
        assert_eq!(forward, reverse);

        let hash_of = |value: &Value| {
            let mut hasher = DefaultHasher::new();
            value.hash(&mut hasher);
            hasher.finish()
        };
        assert_eq!(hash_of(&forward), hash_of(&reverse));

        // The contract is what makes map-valued keys findable.
        let mut outer = ValueMap::new();
        outer.insert(forward, Value::from("found"));
        assert_eq!(outer.get(&reverse), Some(&Value::from("found")));
    }

    #[test]
    fn as_int_reads_integers_only() {
        assert_eq!(Value::Int(7).as_int(), Some(7));
        assert_eq!(Value::Float(7.0).as_int(), None);
        assert_eq!(Value::from("7").as_int(), None);
    }

    #[test]
    fn as_str_reads_strings_only() {
        assert_eq!(Value::from("seven").as_str(), Some("seven"));
        assert_eq!(Value::Int(7).as_str(), None);
        assert_eq!(Value::Null.as_str(), None);
    }
}
