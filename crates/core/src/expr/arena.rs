use std::fmt;
use std::sync::Arc;

use anyhow::Result;

use crate::err::Error;
use crate::expr::display::Render;
use crate::expr::{Expr, NodeId};

/// An append-only store of expression nodes.
///
/// An arena may be layered on top of a shared parent arena. Handles below
/// the fork point resolve into the parent, so a forked arena can reference
/// any node of its parent without copying it, while the parent itself is
/// never modified.
#[derive(Debug, Default)]
pub struct ExprArena {
	parent: Option<Arc<ExprArena>>,
	offset: usize,
	nodes: Vec<Expr>,
}

impl ExprArena {
	pub fn new() -> Self {
		Self::default()
	}

	/// Create a new arena layered on top of `parent`
	pub fn fork(parent: &Arc<ExprArena>) -> Self {
		Self {
			parent: Some(Arc::clone(parent)),
			offset: parent.len(),
			nodes: Vec::new(),
		}
	}

	/// The total number of nodes, including the nodes of parent arenas
	pub fn len(&self) -> usize {
		self.offset + self.nodes.len()
	}

	pub fn is_empty(&self) -> bool {
		self.len() == 0
	}

	/// The number of nodes stored in this layer only
	pub fn layer_len(&self) -> usize {
		self.nodes.len()
	}

	pub fn push(&mut self, expr: Expr) -> NodeId {
		let id = NodeId(self.len());
		self.nodes.push(expr);
		id
	}

	pub fn get(&self, id: NodeId) -> Option<&Expr> {
		if id.0 < self.offset {
			self.parent.as_ref().and_then(|p| p.get(id))
		} else {
			self.nodes.get(id.0 - self.offset)
		}
	}

	/// Fetch a node, failing if the handle does not exist
	pub fn node(&self, id: NodeId) -> Result<&Expr> {
		self.get(id).ok_or_else(|| Error::InvalidNode(id).into())
	}
}

/// A query expression tree: an arena together with the handle of its root.
#[derive(Clone, Debug)]
pub struct Query {
	arena: Arc<ExprArena>,
	root: NodeId,
}

impl Query {
	pub fn new(arena: Arc<ExprArena>, root: NodeId) -> Self {
		Self {
			arena,
			root,
		}
	}

	pub fn root(&self) -> NodeId {
		self.root
	}

	pub fn arena(&self) -> &Arc<ExprArena> {
		&self.arena
	}

	pub fn get(&self, id: NodeId) -> Option<&Expr> {
		self.arena.get(id)
	}

	pub fn node(&self, id: NodeId) -> Result<&Expr> {
		self.arena.node(id)
	}

	/// Check if both queries share the same arena and root
	pub fn same_tree(&self, other: &Query) -> bool {
		Arc::ptr_eq(&self.arena, &other.arena) && self.root == other.root
	}
}

impl fmt::Display for Query {
	fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
		fmt::Display::fmt(&Render::new(&self.arena, self.root), f)
	}
}
