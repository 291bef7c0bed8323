use std::sync::Arc;

use crate::expr::{BinaryOperator, Expr, ExprArena, NodeId, PrefixOperator, Query};
use crate::val::Value;

/// Builds a [`Query`] bottom-up.
///
/// ```
/// use chunkq_core::expr::{BinaryOperator, QueryBuilder};
///
/// let mut b = QueryBuilder::new();
/// let person = b.table("person");
/// let p = b.var("p");
/// let age = b.member(p, "age");
/// let limit = b.literal(18);
/// let adult = b.binary(age, BinaryOperator::MoreThanEqual, limit);
/// let filter = b.lambda(["p"], adult);
/// let root = b.method(person, "filter", [filter]);
/// let query = b.build(root);
/// assert_eq!(query.to_string(), "person.filter(|p| p.age >= 18)");
/// ```
#[derive(Debug, Default)]
pub struct QueryBuilder {
	arena: ExprArena,
}

impl QueryBuilder {
	pub fn new() -> Self {
		Self::default()
	}

	pub fn push(&mut self, expr: Expr) -> NodeId {
		self.arena.push(expr)
	}

	pub fn literal(&mut self, value: impl Into<Value>) -> NodeId {
		self.push(Expr::Literal(value.into()))
	}

	/// A literal array of values
	pub fn values<V: Into<Value>>(&mut self, values: impl IntoIterator<Item = V>) -> NodeId {
		self.literal(Value::Array(values.into_iter().map(Into::into).collect()))
	}

	/// An array built from other expressions
	pub fn array(&mut self, items: impl IntoIterator<Item = NodeId>) -> NodeId {
		self.push(Expr::Array(items.into_iter().collect()))
	}

	pub fn object<K: Into<String>>(
		&mut self,
		entries: impl IntoIterator<Item = (K, NodeId)>,
	) -> NodeId {
		self.push(Expr::Object(entries.into_iter().map(|(k, v)| (k.into(), v)).collect()))
	}

	pub fn param(&mut self, name: impl Into<String>) -> NodeId {
		self.push(Expr::Param(name.into()))
	}

	pub fn var(&mut self, name: impl Into<String>) -> NodeId {
		self.push(Expr::Var(name.into()))
	}

	pub fn table(&mut self, name: impl Into<String>) -> NodeId {
		self.push(Expr::Table(name.into()))
	}

	pub fn slot(&mut self, name: impl Into<String>) -> NodeId {
		self.push(Expr::Slot(name.into()))
	}

	pub fn member(&mut self, object: NodeId, field: impl Into<String>) -> NodeId {
		self.push(Expr::Member {
			object,
			field: field.into(),
		})
	}

	pub fn prefix(&mut self, op: PrefixOperator, expr: NodeId) -> NodeId {
		self.push(Expr::Prefix {
			op,
			expr,
		})
	}

	pub fn binary(&mut self, left: NodeId, op: BinaryOperator, right: NodeId) -> NodeId {
		self.push(Expr::Binary {
			left,
			op,
			right,
		})
	}

	/// A call of `name` on `receiver`, e.g. `receiver.name(args)`
	pub fn method(
		&mut self,
		receiver: NodeId,
		name: impl Into<String>,
		args: impl IntoIterator<Item = NodeId>,
	) -> NodeId {
		self.push(Expr::Call {
			name: name.into(),
			receiver: Some(receiver),
			args: args.into_iter().collect(),
		})
	}

	/// A call of `name` without a receiver, e.g. `name(args)`
	pub fn function(
		&mut self,
		name: impl Into<String>,
		args: impl IntoIterator<Item = NodeId>,
	) -> NodeId {
		self.push(Expr::Call {
			name: name.into(),
			receiver: None,
			args: args.into_iter().collect(),
		})
	}

	pub fn lambda<P: Into<String>>(
		&mut self,
		params: impl IntoIterator<Item = P>,
		body: NodeId,
	) -> NodeId {
		self.push(Expr::Lambda {
			params: params.into_iter().map(Into::into).collect(),
			body,
		})
	}

	/// Finish the query with the given root node
	pub fn build(self, root: NodeId) -> Query {
		Query::new(Arc::new(self.arena), root)
	}
}
