use std::cmp::Ordering;
use std::collections::BTreeMap;
use std::fmt::{self, Write};

use serde::{Deserialize, Serialize};

pub mod number;

pub use self::number::Number;

pub type Array = Vec<Value>;
pub type Object = BTreeMap<String, Value>;

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub enum Value {
	#[default]
	None,
	Null,
	Bool(bool),
	Number(Number),
	Strand(String),
	Array(Array),
	Object(Object),
}

impl Value {
	/// Check if this Value is NONE or NULL
	pub fn is_nullish(&self) -> bool {
		matches!(self, Value::None | Value::Null)
	}

	pub fn is_none(&self) -> bool {
		matches!(self, Value::None)
	}

	pub fn is_null(&self) -> bool {
		matches!(self, Value::Null)
	}

	/// Check if this Value is truthy
	pub fn is_truthy(&self) -> bool {
		match self {
			Value::Bool(v) => *v,
			Value::Number(v) => v.is_truthy(),
			Value::Strand(v) => !v.is_empty(),
			Value::Array(v) => !v.is_empty(),
			Value::Object(v) => !v.is_empty(),
			Value::None | Value::Null => false,
		}
	}

	pub fn kind_of(&self) -> &'static str {
		match self {
			Self::None => "none",
			Self::Null => "null",
			Self::Bool(_) => "bool",
			Self::Number(Number::Int(_)) => "int",
			Self::Number(Number::Float(_)) => "float",
			Self::Strand(_) => "string",
			Self::Array(_) => "array",
			Self::Object(_) => "object",
		}
	}

	/// Fetch a field of an object, NONE for anything else
	pub fn pick(&self, field: &str) -> Value {
		match self {
			Value::Object(v) => v.get(field).cloned().unwrap_or_default(),
			_ => Value::None,
		}
	}

	/// Check if this Value is equal to another Value, comparing
	/// integers and floats numerically
	pub fn equal(&self, other: &Value) -> bool {
		match (self, other) {
			(Value::None, Value::None) | (Value::Null, Value::Null) => true,
			(Value::Bool(a), Value::Bool(b)) => a == b,
			(Value::Number(a), Value::Number(b)) => a == b,
			(Value::Strand(a), Value::Strand(b)) => a == b,
			(Value::Array(a), Value::Array(b)) => {
				a.len() == b.len() && a.iter().zip(b).all(|(a, b)| a.equal(b))
			}
			(Value::Object(a), Value::Object(b)) => {
				a.len() == b.len()
					&& a.iter().zip(b).all(|((ak, av), (bk, bv))| ak == bk && av.equal(bv))
			}
			_ => false,
		}
	}

	/// Compare two values of the same kind
	pub fn compare(&self, other: &Value) -> Option<Ordering> {
		match (self, other) {
			(Value::Bool(a), Value::Bool(b)) => Some(a.cmp(b)),
			(Value::Number(a), Value::Number(b)) => a.partial_cmp(b),
			(Value::Strand(a), Value::Strand(b)) => Some(a.cmp(b)),
			_ => None,
		}
	}
}

impl From<bool> for Value {
	fn from(v: bool) -> Self {
		Value::Bool(v)
	}
}

impl From<i64> for Value {
	fn from(v: i64) -> Self {
		Value::Number(Number::Int(v))
	}
}

impl From<i32> for Value {
	fn from(v: i32) -> Self {
		Value::Number(Number::from(v))
	}
}

impl From<f64> for Value {
	fn from(v: f64) -> Self {
		Value::Number(Number::Float(v))
	}
}

impl From<Number> for Value {
	fn from(v: Number) -> Self {
		Value::Number(v)
	}
}

impl From<&str> for Value {
	fn from(v: &str) -> Self {
		Value::Strand(v.to_owned())
	}
}

impl From<String> for Value {
	fn from(v: String) -> Self {
		Value::Strand(v)
	}
}

impl<T: Into<Value>> From<Vec<T>> for Value {
	fn from(v: Vec<T>) -> Self {
		Value::Array(v.into_iter().map(Into::into).collect())
	}
}

impl From<Object> for Value {
	fn from(v: Object) -> Self {
		Value::Object(v)
	}
}

impl<T: Into<Value>> From<Option<T>> for Value {
	fn from(v: Option<T>) -> Self {
		v.map(Into::into).unwrap_or_default()
	}
}

impl From<serde_json::Value> for Value {
	fn from(v: serde_json::Value) -> Self {
		match v {
			serde_json::Value::Null => Value::Null,
			serde_json::Value::Bool(b) => Value::Bool(b),
			serde_json::Value::Number(n) => match n.as_i64() {
				Some(i) => Value::from(i),
				None => Value::from(n.as_f64().unwrap_or(f64::NAN)),
			},
			serde_json::Value::String(s) => Value::Strand(s),
			serde_json::Value::Array(a) => Value::Array(a.into_iter().map(Value::from).collect()),
			serde_json::Value::Object(o) => {
				Value::Object(o.into_iter().map(|(k, v)| (k, Value::from(v))).collect())
			}
		}
	}
}

impl fmt::Display for Value {
	fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
		match self {
			Value::None => f.write_str("NONE"),
			Value::Null => f.write_str("NULL"),
			Value::Bool(v) => fmt::Display::fmt(v, f),
			Value::Number(v) => fmt::Display::fmt(v, f),
			Value::Strand(v) => {
				f.write_char('\'')?;
				for c in v.chars() {
					if matches!(c, '\'' | '\\') {
						f.write_char('\\')?;
					}
					f.write_char(c)?;
				}
				f.write_char('\'')
			}
			Value::Array(v) => {
				f.write_char('[')?;
				for (i, x) in v.iter().enumerate() {
					if i > 0 {
						f.write_str(", ")?;
					}
					fmt::Display::fmt(x, f)?;
				}
				f.write_char(']')
			}
			Value::Object(v) => {
				if v.is_empty() {
					return f.write_str("{}");
				}
				f.write_str("{ ")?;
				for (i, (k, x)) in v.iter().enumerate() {
					if i > 0 {
						f.write_str(", ")?;
					}
					write!(f, "{k}: {x}")?;
				}
				f.write_str(" }")
			}
		}
	}
}
