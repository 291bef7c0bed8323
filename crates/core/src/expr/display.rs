use std::fmt::{self, Display, Formatter, Write};

use crate::expr::{Expr, ExprArena, NodeId};

/// Renders the tree below a node in a compact method-chain syntax.
pub struct Render<'a> {
	arena: &'a ExprArena,
	id: NodeId,
}

impl<'a> Render<'a> {
	pub fn new(arena: &'a ExprArena, id: NodeId) -> Self {
		Self {
			arena,
			id,
		}
	}

	fn child(&self, id: NodeId) -> Render<'a> {
		Render::new(self.arena, id)
	}

	/// Render a child, wrapping it in parentheses when it binds looser
	/// than a method call or an operator
	fn operand(&self, f: &mut Formatter, id: NodeId) -> fmt::Result {
		match self.arena.get(id) {
			Some(Expr::Binary {
				..
			}
			| Expr::Prefix {
				..
			}
			| Expr::Lambda {
				..
			}) => write!(f, "({})", self.child(id)),
			_ => Display::fmt(&self.child(id), f),
		}
	}

	fn list(&self, f: &mut Formatter, ids: &[NodeId]) -> fmt::Result {
		for (i, id) in ids.iter().enumerate() {
			if i > 0 {
				f.write_str(", ")?;
			}
			Display::fmt(&self.child(*id), f)?;
		}
		Ok(())
	}
}

impl Display for Render<'_> {
	fn fmt(&self, f: &mut Formatter) -> fmt::Result {
		let Some(expr) = self.arena.get(self.id) else {
			return write!(f, "<invalid {}>", self.id);
		};
		match expr {
			Expr::Literal(v) => Display::fmt(v, f),
			Expr::Array(items) => {
				f.write_char('[')?;
				self.list(f, items)?;
				f.write_char(']')
			}
			Expr::Object(entries) => {
				if entries.is_empty() {
					return f.write_str("{}");
				}
				f.write_str("{ ")?;
				for (i, (k, v)) in entries.iter().enumerate() {
					if i > 0 {
						f.write_str(", ")?;
					}
					write!(f, "{k}: {}", self.child(*v))?;
				}
				f.write_str(" }")
			}
			Expr::Param(name) => write!(f, "${name}"),
			Expr::Var(name) | Expr::Table(name) => f.write_str(name),
			Expr::Slot(name) => write!(f, ":{name}"),
			Expr::Member {
				object,
				field,
			} => {
				self.operand(f, *object)?;
				write!(f, ".{field}")
			}
			Expr::Prefix {
				op,
				expr,
			} => {
				Display::fmt(op, f)?;
				self.operand(f, *expr)
			}
			Expr::Binary {
				left,
				op,
				right,
			} => {
				self.operand(f, *left)?;
				write!(f, " {op} ")?;
				self.operand(f, *right)
			}
			Expr::Call {
				name,
				receiver,
				args,
			} => {
				if let Some(receiver) = receiver {
					self.operand(f, *receiver)?;
					f.write_char('.')?;
				}
				write!(f, "{name}(")?;
				self.list(f, args)?;
				f.write_char(')')
			}
			Expr::Lambda {
				params,
				body,
			} => {
				write!(f, "|{}| ", params.join(", "))?;
				Display::fmt(&self.child(*body), f)
			}
		}
	}
}

#[cfg(test)]
mod tests {
	use crate::expr::{BinaryOperator, PrefixOperator, QueryBuilder};

	#[test]
	fn render_method_chain() {
		let mut b = QueryBuilder::new();
		let person = b.table("person");
		let ids = b.values([1, 2, 3]);
		let p = b.var("p");
		let id = b.member(p, "id");
		let contains = b.method(ids, "contains", [id]);
		let filter = b.lambda(["p"], contains);
		let root = b.method(person, "filter", [filter]);
		let query = b.build(root);
		assert_eq!(query.to_string(), "person.filter(|p| [1, 2, 3].contains(p.id))");
	}

	#[test]
	fn render_operators_and_slots() {
		let mut b = QueryBuilder::new();
		let slot = b.slot("__chunk");
		let x = b.var("x");
		let contains = b.function("contains", [slot, x]);
		let one = b.literal(1);
		let two = b.literal(2);
		let sum = b.binary(one, BinaryOperator::Add, two);
		let neg = b.prefix(PrefixOperator::Negate, sum);
		let both = b.binary(contains, BinaryOperator::And, neg);
		let limit = b.param("limit");
		let obj = b.object([("ok", both), ("limit", limit)]);
		let query = b.build(obj);
		assert_eq!(
			query.to_string(),
			"{ ok: contains(:__chunk, x) && (-(1 + 2)), limit: $limit }"
		);
	}
}
