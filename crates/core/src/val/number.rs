use std::cmp::Ordering;
use std::fmt;

use serde::{Deserialize, Serialize};

#[derive(Clone, Copy, Debug, Serialize, Deserialize)]
pub enum Number {
	Int(i64),
	Float(f64),
}

impl Default for Number {
	fn default() -> Self {
		Self::Int(0)
	}
}

impl From<i64> for Number {
	fn from(i: i64) -> Self {
		Self::Int(i)
	}
}

impl From<i32> for Number {
	fn from(i: i32) -> Self {
		Self::Int(i64::from(i))
	}
}

impl From<f64> for Number {
	fn from(f: f64) -> Self {
		Self::Float(f)
	}
}

impl fmt::Display for Number {
	fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
		match self {
			Number::Int(v) => fmt::Display::fmt(v, f),
			Number::Float(v) => {
				if v.is_finite() && v.fract() == 0.0 {
					write!(f, "{v:.1}f")
				} else {
					write!(f, "{v}f")
				}
			}
		}
	}
}

impl Number {
	pub fn is_int(&self) -> bool {
		matches!(self, Number::Int(_))
	}

	pub fn is_truthy(&self) -> bool {
		match self {
			Number::Int(v) => v != &0,
			Number::Float(v) => v != &0.0,
		}
	}

	pub fn to_float(self) -> f64 {
		match self {
			Number::Int(v) => v as f64,
			Number::Float(v) => v,
		}
	}

	/// Returns the integer value, if this number is an integer
	pub fn as_int(&self) -> Option<i64> {
		match self {
			Number::Int(v) => Some(*v),
			Number::Float(_) => None,
		}
	}

	pub fn try_neg(self) -> Option<Self> {
		match self {
			Number::Int(v) => v.checked_neg().map(Number::Int),
			Number::Float(v) => Some(Number::Float(-v)),
		}
	}

	pub fn try_add(self, other: Self) -> Option<Self> {
		match (self, other) {
			(Number::Int(a), Number::Int(b)) => a.checked_add(b).map(Number::Int),
			(a, b) => Some(Number::Float(a.to_float() + b.to_float())),
		}
	}

	pub fn try_sub(self, other: Self) -> Option<Self> {
		match (self, other) {
			(Number::Int(a), Number::Int(b)) => a.checked_sub(b).map(Number::Int),
			(a, b) => Some(Number::Float(a.to_float() - b.to_float())),
		}
	}

	pub fn try_mul(self, other: Self) -> Option<Self> {
		match (self, other) {
			(Number::Int(a), Number::Int(b)) => a.checked_mul(b).map(Number::Int),
			(a, b) => Some(Number::Float(a.to_float() * b.to_float())),
		}
	}

	/// Integer division by zero returns `None`, float division follows IEEE 754
	pub fn try_div(self, other: Self) -> Option<Self> {
		match (self, other) {
			(Number::Int(a), Number::Int(b)) => a.checked_div(b).map(Number::Int),
			(a, b) => Some(Number::Float(a.to_float() / b.to_float())),
		}
	}
}

impl PartialEq for Number {
	fn eq(&self, other: &Self) -> bool {
		match (self, other) {
			(Number::Int(a), Number::Int(b)) => a == b,
			(a, b) => a.to_float() == b.to_float(),
		}
	}
}

impl PartialOrd for Number {
	fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
		match (self, other) {
			(Number::Int(a), Number::Int(b)) => Some(a.cmp(b)),
			(a, b) => a.to_float().partial_cmp(&b.to_float()),
		}
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn mixed_equality() {
		assert_eq!(Number::Int(3), Number::Float(3.0));
		assert_ne!(Number::Int(3), Number::Float(3.5));
	}

	#[test]
	fn checked_arithmetic() {
		assert_eq!(Number::Int(i64::MAX).try_add(Number::Int(1)), None);
		assert_eq!(Number::Int(7).try_div(Number::Int(0)), None);
		assert_eq!(Number::Int(7).try_div(Number::Int(2)), Some(Number::Int(3)));
		assert_eq!(Number::Int(1).try_add(Number::Float(0.5)), Some(Number::Float(1.5)));
	}

	#[test]
	fn display() {
		assert_eq!(Number::Int(-4).to_string(), "-4");
		assert_eq!(Number::Float(2.0).to_string(), "2.0f");
		assert_eq!(Number::Float(2.5).to_string(), "2.5f");
	}
}
