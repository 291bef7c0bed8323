//! The query expression tree.
//!
//! Queries are stored as a closed set of node kinds ([`Expr`]) inside an
//! append-only [`ExprArena`], and nodes refer to their children through
//! [`NodeId`] handles. A handle identifies a node: two structurally equal
//! nodes pushed separately have different handles. Derived trees are built
//! in a [forked](ExprArena::fork) arena, so they share every unchanged node
//! with the tree they were derived from.

use std::fmt;

use anyhow::{Result, ensure};
use serde::{Deserialize, Serialize};

use crate::err::Error;
use crate::val::Value;

pub mod arena;
pub mod build;
pub mod display;
pub mod eval;
pub mod operator;
pub mod rewrite;
pub mod visit;

pub use self::arena::{ExprArena, Query};
pub use self::build::QueryBuilder;
pub use self::operator::{BinaryOperator, PrefixOperator};

/// A handle to a node stored in an [`ExprArena`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct NodeId(pub(crate) usize);

impl NodeId {
	pub fn index(self) -> usize {
		self.0
	}
}

impl fmt::Display for NodeId {
	fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
		write!(f, "#{}", self.0)
	}
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub enum Expr {
	Literal(Value),
	Array(Vec<NodeId>),
	Object(Vec<(String, NodeId)>),
	/// A reference to a parameter of the surrounding context
	Param(String),
	/// A reference to a parameter of an enclosing lambda
	Var(String),
	/// A source of rows
	Table(String),
	Member {
		object: NodeId,
		field: String,
	},
	Prefix {
		op: PrefixOperator,
		expr: NodeId,
	},
	Binary {
		left: NodeId,
		op: BinaryOperator,
		right: NodeId,
	},
	/// A method call when `receiver` is set, a function call otherwise
	Call {
		name: String,
		receiver: Option<NodeId>,
		args: Vec<NodeId>,
	},
	Lambda {
		params: Vec<String>,
		body: NodeId,
	},
	/// A placeholder which is bound to a list of values at execution time
	Slot(String),
}

impl Expr {
	/// A short name for the kind of this node
	pub fn kind(&self) -> &'static str {
		match self {
			Expr::Literal(_) => "literal",
			Expr::Array(_) => "array",
			Expr::Object(_) => "object",
			Expr::Param(_) => "parameter",
			Expr::Var(_) => "variable",
			Expr::Table(_) => "table",
			Expr::Member {
				..
			} => "member",
			Expr::Prefix {
				..
			} => "prefix",
			Expr::Binary {
				..
			} => "binary",
			Expr::Call {
				..
			} => "call",
			Expr::Lambda {
				..
			} => "lambda",
			Expr::Slot(_) => "slot",
		}
	}

	/// Check if this node is a call with the given name
	pub fn is_call(&self, function: &str) -> bool {
		matches!(self, Expr::Call { name, .. } if name == function)
	}

	/// The handles of the direct children of this node, in evaluation order
	pub fn children(&self) -> Vec<NodeId> {
		match self {
			Expr::Literal(_) | Expr::Param(_) | Expr::Var(_) | Expr::Table(_) | Expr::Slot(_) => {
				Vec::new()
			}
			Expr::Array(items) => items.clone(),
			Expr::Object(entries) => entries.iter().map(|(_, v)| *v).collect(),
			Expr::Member {
				object,
				..
			} => vec![*object],
			Expr::Prefix {
				expr,
				..
			} => vec![*expr],
			Expr::Binary {
				left,
				right,
				..
			} => vec![*left, *right],
			Expr::Call {
				receiver,
				args,
				..
			} => receiver.iter().chain(args).copied().collect(),
			Expr::Lambda {
				body,
				..
			} => vec![*body],
		}
	}

	/// Rebuild this node with new children, given in the order
	/// returned by [`Expr::children`]
	pub fn with_children(&self, children: &[NodeId]) -> Result<Expr> {
		let expected = self.children().len();
		ensure!(
			children.len() == expected,
			Error::unreachable(format!(
				"a {} node has {expected} children, but {} were given",
				self.kind(),
				children.len()
			))
		);
		let expr = match self {
			Expr::Literal(_) | Expr::Param(_) | Expr::Var(_) | Expr::Table(_) | Expr::Slot(_) => {
				self.clone()
			}
			Expr::Array(_) => Expr::Array(children.to_vec()),
			Expr::Object(entries) => Expr::Object(
				entries.iter().zip(children).map(|((k, _), v)| (k.clone(), *v)).collect(),
			),
			Expr::Member {
				field,
				..
			} => Expr::Member {
				object: children[0],
				field: field.clone(),
			},
			Expr::Prefix {
				op,
				..
			} => Expr::Prefix {
				op: *op,
				expr: children[0],
			},
			Expr::Binary {
				op,
				..
			} => Expr::Binary {
				left: children[0],
				op: *op,
				right: children[1],
			},
			Expr::Call {
				name,
				receiver,
				..
			} => {
				let skip = usize::from(receiver.is_some());
				Expr::Call {
					name: name.clone(),
					receiver: receiver.map(|_| children[0]),
					args: children[skip..].to_vec(),
				}
			}
			Expr::Lambda {
				params,
				..
			} => Expr::Lambda {
				params: params.clone(),
				body: children[0],
			},
		};
		Ok(expr)
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn call_children_start_with_receiver() {
		let call = Expr::Call {
			name: "contains".to_owned(),
			receiver: Some(NodeId(4)),
			args: vec![NodeId(2), NodeId(3)],
		};
		assert_eq!(call.children(), vec![NodeId(4), NodeId(2), NodeId(3)]);
		let rebuilt = call.with_children(&[NodeId(7), NodeId(8), NodeId(9)]).unwrap();
		assert_eq!(
			rebuilt,
			Expr::Call {
				name: "contains".to_owned(),
				receiver: Some(NodeId(7)),
				args: vec![NodeId(8), NodeId(9)],
			}
		);
	}

	#[test]
	fn with_children_rejects_wrong_arity() {
		let expr = Expr::Binary {
			left: NodeId(0),
			op: BinaryOperator::Add,
			right: NodeId(1),
		};
		let err = expr.with_children(&[NodeId(0)]).unwrap_err();
		assert!(matches!(err.downcast_ref::<Error>(), Some(Error::Unreachable(_))));
	}

	#[test]
	fn object_children_keep_keys() {
		let expr = Expr::Object(vec![("a".to_owned(), NodeId(0)), ("b".to_owned(), NodeId(1))]);
		let rebuilt = expr.with_children(&[NodeId(5), NodeId(1)]).unwrap();
		assert_eq!(
			rebuilt,
			Expr::Object(vec![("a".to_owned(), NodeId(5)), ("b".to_owned(), NodeId(1))])
		);
	}
}
