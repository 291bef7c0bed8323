//! Generic pre-order traversal of an expression tree.

use crate::expr::{Expr, ExprArena, NodeId};

pub trait Visitor {
	fn visit_expr(&mut self, id: NodeId, expr: &Expr);
}

/// Visit every node reachable from `root`, parents before children and
/// children in the order given by [`Expr::children`].
///
/// Handles which do not resolve in the arena are skipped.
pub fn walk<V: Visitor + ?Sized>(arena: &ExprArena, root: NodeId, visitor: &mut V) {
	let mut stack = vec![root];
	while let Some(id) = stack.pop() {
		let Some(expr) = arena.get(id) else {
			trace!("Skipping dangling node {id}");
			continue;
		};
		visitor.visit_expr(id, expr);
		stack.extend(expr.children().into_iter().rev());
	}
}

/// Collects every node matching a predicate.
pub struct Finder<F> {
	predicate: F,
	found: Vec<NodeId>,
}

impl<F> Finder<F>
where
	F: FnMut(NodeId, &Expr) -> bool,
{
	pub fn new(predicate: F) -> Self {
		Self {
			predicate,
			found: Vec::new(),
		}
	}

	pub fn found(&self) -> &[NodeId] {
		&self.found
	}

	pub fn into_found(self) -> Vec<NodeId> {
		self.found
	}
}

impl<F> Visitor for Finder<F>
where
	F: FnMut(NodeId, &Expr) -> bool,
{
	fn visit_expr(&mut self, id: NodeId, expr: &Expr) {
		if (self.predicate)(id, expr) {
			self.found.push(id);
		}
	}
}

/// Collect all nodes below `root` (inclusive) which match `predicate`, in pre-order
pub fn collect<F>(arena: &ExprArena, root: NodeId, predicate: F) -> Vec<NodeId>
where
	F: FnMut(NodeId, &Expr) -> bool,
{
	let mut finder = Finder::new(predicate);
	walk(arena, root, &mut finder);
	finder.into_found()
}

/// Collect all calls named `name` below `root` (inclusive), in pre-order
pub fn find_calls(arena: &ExprArena, root: NodeId, name: &str) -> Vec<NodeId> {
	collect(arena, root, |_, expr| expr.is_call(name))
}
