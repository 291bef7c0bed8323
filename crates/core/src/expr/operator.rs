use std::fmt;

use serde::{Deserialize, Serialize};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PrefixOperator {
	/// `-`
	Negate,
	/// `!`
	Not,
}

impl fmt::Display for PrefixOperator {
	fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
		match self {
			Self::Negate => f.write_str("-"),
			Self::Not => f.write_str("!"),
		}
	}
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum BinaryOperator {
	/// `+`
	Add,
	/// `-`
	Subtract,
	/// `*`
	Multiply,
	/// `/`
	Divide,
	/// `==`
	Equal,
	/// `!=`
	NotEqual,
	/// `<`
	LessThan,
	/// `<=`
	LessThanEqual,
	/// `>`
	MoreThan,
	/// `>=`
	MoreThanEqual,
	/// `&&`
	And,
	/// `||`
	Or,
}

impl fmt::Display for BinaryOperator {
	fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
		f.write_str(match self {
			Self::Add => "+",
			Self::Subtract => "-",
			Self::Multiply => "*",
			Self::Divide => "/",
			Self::Equal => "==",
			Self::NotEqual => "!=",
			Self::LessThan => "<",
			Self::LessThanEqual => "<=",
			Self::MoreThan => ">",
			Self::MoreThanEqual => ">=",
			Self::And => "&&",
			Self::Or => "||",
		})
	}
}
